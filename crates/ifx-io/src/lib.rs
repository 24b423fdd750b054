//! Image load/save for ifx.
//!
//! Decodes JPEG and PNG files into [`HostImage`] (RGBA8) and encodes them
//! back, picking the format from the file extension.
//!
//! ```ignore
//! let mut image = ifx_io::load_image("nature.jpg")?;
//! // ... filter ...
//! ifx_io::save_image("result.jpg", &image)?;
//! ```

mod error;

#[cfg(feature = "jpeg")]
pub mod jpeg;
#[cfg(feature = "png")]
pub mod png;

pub use error::{IoError, IoResult};

use std::path::Path;

use ifx_core::HostImage;

/// JPEG quality used by [`save_image`].
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Jpeg,
    Png,
}

impl Format {
    /// Detects the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> IoResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            _ => Err(IoError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Loads an image, converting it to RGBA.
pub fn load_image<P: AsRef<Path>>(path: P) -> IoResult<HostImage> {
    let path = path.as_ref();
    tracing::trace!("load_image({})", path.display());
    let image = match Format::from_path(path)? {
        #[cfg(feature = "jpeg")]
        Format::Jpeg => jpeg::read(path)?,
        #[cfg(feature = "png")]
        Format::Png => png::read(path)?,
        #[allow(unreachable_patterns)]
        other => return Err(IoError::UnsupportedFormat(format!("{other:?} support not compiled in"))),
    };
    tracing::info!("loaded {} ({}x{})", path.display(), image.width(), image.height());
    Ok(image)
}

/// Saves an image; JPEG at [`DEFAULT_JPEG_QUALITY`], PNG as RGBA.
pub fn save_image<P: AsRef<Path>>(path: P, image: &HostImage) -> IoResult<()> {
    let path = path.as_ref();
    tracing::trace!("save_image({})", path.display());
    match Format::from_path(path)? {
        #[cfg(feature = "jpeg")]
        Format::Jpeg => jpeg::write(path, image, DEFAULT_JPEG_QUALITY)?,
        #[cfg(feature = "png")]
        Format::Png => png::write(path, image)?,
        #[allow(unreachable_patterns)]
        other => return Err(IoError::UnsupportedFormat(format!("{other:?} support not compiled in"))),
    }
    tracing::info!("saved {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifx_core::Pixel;

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a/b.JPG")).unwrap(), Format::Jpeg);
        assert_eq!(Format::from_path(Path::new("x.jpeg")).unwrap(), Format::Jpeg);
        assert_eq!(Format::from_path(Path::new("x.png")).unwrap(), Format::Png);
        assert!(matches!(
            Format::from_path(Path::new("x.bmp")),
            Err(IoError::UnsupportedFormat(_))
        ));
        assert!(Format::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn save_then_load_by_extension() {
        let img = HostImage::filled(8, 4, Pixel::rgb(30, 60, 90)).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let png_path = dir.path().join("out.png");
        save_image(&png_path, &img).unwrap();
        assert_eq!(load_image(&png_path).unwrap(), img);

        let jpg_path = dir.path().join("out.jpg");
        save_image(&jpg_path, &img).unwrap();
        assert_eq!(load_image(&jpg_path).unwrap().dimensions(), (8, 4));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_image("/nonexistent/nature.jpg").unwrap_err();
        assert_eq!(err.code(), "io");
    }
}
