//! Display surface state.

use std::time::{Duration, Instant};

use egui::{Color32, ColorImage, TextureHandle, TextureOptions};
use ifx_core::HostImage;

/// Everything needed to show the working image: the uploaded texture, its
/// size and the last status line.
#[derive(Default)]
pub struct DisplayContext {
    texture: Option<TextureHandle>,
    size: [usize; 2],
    status: String,
}

/// Converts pixels for display. Alpha is ignored, as on an RGB surface.
pub fn to_color_image(image: &HostImage) -> ColorImage {
    let (w, h) = image.dimensions();
    ColorImage {
        size: [w as usize, h as usize],
        pixels: image
            .pixels()
            .iter()
            .map(|p| Color32::from_rgb(p.red, p.green, p.blue))
            .collect(),
    }
}

impl DisplayContext {
    /// Empty context; nothing is shown until the first [`present`](Self::present).
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads `image`, replacing the previous texture. Returns the time
    /// spent converting and uploading.
    pub fn present(&mut self, ctx: &egui::Context, image: &HostImage) -> Duration {
        let start = Instant::now();
        let color = to_color_image(image);
        self.size = color.size;
        match &mut self.texture {
            Some(tex) => tex.set(color, TextureOptions::LINEAR),
            None => self.texture = Some(ctx.load_texture("ifx_image", color, TextureOptions::LINEAR)),
        }
        start.elapsed()
    }

    /// Frees the texture.
    pub fn destroy(&mut self) {
        if self.texture.take().is_some() {
            tracing::debug!("display texture released");
        }
        self.size = [0, 0];
    }

    /// Texture of the last presented image.
    pub fn texture(&self) -> Option<&TextureHandle> {
        self.texture.as_ref()
    }

    /// `[width, height]` of the presented image.
    pub fn size(&self) -> [usize; 2] {
        self.size
    }

    /// Last status line.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Replaces the status line.
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifx_core::Pixel;

    #[test]
    fn color_image_drops_alpha() {
        let img = HostImage::new(2, 1, vec![Pixel::new(1, 2, 3, 0), Pixel::WHITE]).unwrap();
        let c = to_color_image(&img);
        assert_eq!(c.size, [2, 1]);
        assert_eq!(c.pixels[0], Color32::from_rgb(1, 2, 3));
        assert_eq!(c.pixels[1], Color32::WHITE);
    }

    #[test]
    fn present_then_destroy() {
        let ctx = egui::Context::default();
        let img = HostImage::filled(3, 2, Pixel::BLACK).unwrap();
        let mut display = DisplayContext::new();
        display.present(&ctx, &img);
        assert_eq!(display.size(), [3, 2]);
        assert!(display.texture().is_some());

        display.present(&ctx, &img);
        display.destroy();
        assert!(display.texture().is_none());
        assert_eq!(display.size(), [0, 0]);
    }
}
