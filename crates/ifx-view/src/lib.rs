//! # ifx-view
//!
//! Preview window for interactive filtering.
//!
//! The window shows the working image. Typing a digit applies the matching
//! filter through the compute session and re-presents the result; `0`
//! prints the filter menu to stdout.
//!
//! ```ignore
//! use ifx_view::{run, ViewerConfig};
//!
//! let outcome = run(image, processor, ViewerConfig::default());
//! if outcome.exit_code == 0 { /* save outcome.image */ }
//! ```
//!
//! # Keyboard
//!
//! | Key | Action |
//! |-----|--------|
//! | `1`..`9` | Apply filter |
//! | `0` | Print menu |
//! | `Esc` | Close |

#![warn(missing_docs)]
#![warn(clippy::all)]

mod app;
mod display;

pub use app::{FilterViewerApp, ViewerConfig, WINDOW_TITLE};
pub use display::{DisplayContext, to_color_image};

use std::sync::{Arc, Mutex};

use app::SessionSlot;
use ifx_compute::FilterProcessor;
use ifx_core::{HostImage, menu_text};

/// Result of a window session.
#[derive(Debug)]
pub struct ViewerOutcome {
    /// The image as last filtered.
    pub image: HostImage,
    /// 0 on normal close, 1 if the window or a dispatch failed.
    pub exit_code: i32,
}

/// Opens the window and blocks until it is closed.
pub fn run(image: HostImage, processor: FilterProcessor, config: ViewerConfig) -> ViewerOutcome {
    let fallback = image.clone();
    let slot = Arc::new(Mutex::new(SessionSlot::default()));

    if config.show_menu {
        print!("{}", menu_text());
    }

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(&config.title)
            .with_inner_size(config.size),
        ..Default::default()
    };

    let app_slot = slot.clone();
    let result = eframe::run_native(
        &config.title,
        native_options,
        Box::new(move |_cc| Ok(Box::new(FilterViewerApp::new(image, processor, app_slot)))),
    );

    let mut exit_code = match result {
        Ok(()) => {
            tracing::debug!("viewer closed");
            0
        }
        Err(e) => {
            tracing::error!("viewer error: {e}");
            1
        }
    };

    let (image, failed) = match slot.lock() {
        Ok(mut s) => (s.image.take(), s.exit_code),
        Err(_) => (None, 1),
    };
    exit_code = exit_code.max(failed);

    ViewerOutcome {
        image: image.unwrap_or(fallback),
        exit_code,
    }
}
