//! Filter preview application.

use std::sync::{Arc, Mutex};

use ifx_compute::{ComputeError, FilterProcessor};
use ifx_core::{HostImage, MenuCommand, menu_text};

use crate::display::DisplayContext;

/// Window title.
pub const WINDOW_TITLE: &str = "Instagram filters";

/// Viewer configuration.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Window title.
    pub title: String,
    /// Initial inner size in logical pixels.
    pub size: [f32; 2],
    /// Print the filter menu when the window opens.
    pub show_menu: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: WINDOW_TITLE.to_string(),
            size: [700.0, 700.0],
            show_menu: true,
        }
    }
}

/// Image and status handed back when the window closes.
#[derive(Debug, Default)]
pub(crate) struct SessionSlot {
    pub image: Option<HostImage>,
    pub exit_code: i32,
}

/// eframe application driving a [`FilterProcessor`].
pub struct FilterViewerApp {
    processor: Option<FilterProcessor>,
    image: Option<HostImage>,
    display: DisplayContext,
    slot: Arc<Mutex<SessionSlot>>,
    dirty: bool,
    failed: bool,
}

impl FilterViewerApp {
    pub(crate) fn new(image: HostImage, processor: FilterProcessor, slot: Arc<Mutex<SessionSlot>>) -> Self {
        Self {
            processor: Some(processor),
            image: Some(image),
            display: DisplayContext::new(),
            slot,
            dirty: true,
            failed: false,
        }
    }

    /// Parses typed text into commands; anything else is ignored.
    pub fn parse_input(text: &str) -> Vec<MenuCommand> {
        text.chars()
            .filter_map(|c| {
                let cmd = MenuCommand::parse(c);
                if cmd.is_none() && !c.is_whitespace() {
                    tracing::warn!("ignoring input {c:?}");
                }
                cmd
            })
            .collect()
    }

    /// Runs one command against the working image.
    pub fn execute(&mut self, command: MenuCommand) -> Result<(), ComputeError> {
        match command {
            MenuCommand::ShowMenu => print!("{}", menu_text()),
            MenuCommand::Apply(filter) => {
                let (Some(processor), Some(image)) = (self.processor.as_mut(), self.image.as_mut()) else {
                    return Ok(());
                };
                let stats = processor.apply(filter, image)?;
                tracing::info!(
                    "Kernel {} took {:.2} ms",
                    stats.entry_point,
                    stats.elapsed.as_secs_f64() * 1000.0
                );
                self.display.set_status(format!("{filter} applied on {}", processor.device_name()));
                self.dirty = true;
            }
        }
        Ok(())
    }

    /// Collects typed commands; returns true when the window should close.
    fn handle_input(&mut self, ctx: &egui::Context) -> (Vec<MenuCommand>, bool) {
        let mut commands = Vec::new();
        let mut exit = false;
        ctx.input(|i| {
            if i.key_pressed(egui::Key::Escape) {
                exit = true;
            }
            for event in &i.events {
                if let egui::Event::Text(text) = event {
                    commands.extend(Self::parse_input(text));
                }
            }
        });
        (commands, exit)
    }

    fn present(&mut self, ctx: &egui::Context) {
        if let Some(image) = &self.image {
            let took = self.display.present(ctx, image);
            tracing::info!("Display took {:.2} ms", took.as_secs_f64() * 1000.0);
        }
        self.dirty = false;
    }

    fn draw(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            let [w, h] = self.display.size();
            ui.label(format!("{w}x{h}  {}", self.display.status()));
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(texture) = self.display.texture() {
                ui.centered_and_justified(|ui| {
                    ui.add(egui::Image::new(texture).shrink_to_fit());
                });
            }
        });
    }

    /// Stores the image and exit status for the caller, then releases the
    /// device session and the texture.
    fn shutdown(&mut self) {
        if let Ok(mut slot) = self.slot.lock() {
            if let Some(image) = self.image.take() {
                slot.image = Some(image);
            }
            if self.failed {
                slot.exit_code = 1;
            }
        }
        if let Some(processor) = self.processor.take() {
            processor.close();
        }
        self.display.destroy();
    }
}

impl eframe::App for FilterViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let (commands, exit) = self.handle_input(ctx);
        if exit {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        for command in commands {
            if let Err(e) = self.execute(command) {
                tracing::error!("error[{}]: {e}", e.code());
                self.failed = true;
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                return;
            }
        }

        if self.dirty {
            self.present(ctx);
        }
        self.draw(ctx);
    }
}

impl Drop for FilterViewerApp {
    fn drop(&mut self) {
        self.shutdown();
    }
}
