//! JPEG read/write via `jpeg-decoder` and `jpeg-encoder`.
//!
//! Decoded images are expanded to RGBA with opaque alpha. Alpha is dropped
//! on write.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use ifx_core::{HostImage, Pixel};

use crate::{IoError, IoResult};

/// Decodes a JPEG stream.
pub fn decode<R: Read>(reader: R) -> IoResult<HostImage> {
    let mut decoder = jpeg_decoder::Decoder::new(BufReader::new(reader));
    let data = decoder
        .decode()
        .map_err(|e| IoError::DecodeError(e.to_string()))?;
    let info = decoder
        .info()
        .ok_or_else(|| IoError::DecodeError("missing JPEG info".into()))?;

    let pixels: Vec<Pixel> = match info.pixel_format {
        jpeg_decoder::PixelFormat::RGB24 => data.chunks_exact(3).map(|c| Pixel::rgb(c[0], c[1], c[2])).collect(),
        jpeg_decoder::PixelFormat::L8 => data.iter().map(|&g| Pixel::rgb(g, g, g)).collect(),
        jpeg_decoder::PixelFormat::L16 => {
            // High byte of big-endian samples
            data.chunks_exact(2).map(|c| Pixel::rgb(c[0], c[0], c[0])).collect()
        }
        jpeg_decoder::PixelFormat::CMYK32 => data
            .chunks_exact(4)
            .map(|cmyk| {
                let k = 1.0 - cmyk[3] as f32 / 255.0;
                let ch = |v: u8| ((1.0 - v as f32 / 255.0) * k * 255.0) as u8;
                Pixel::rgb(ch(cmyk[0]), ch(cmyk[1]), ch(cmyk[2]))
            })
            .collect(),
    };

    tracing::debug!(width = info.width, height = info.height, format = ?info.pixel_format, "jpeg decoded");
    Ok(HostImage::new(info.width as u32, info.height as u32, pixels)?)
}

/// Encodes `image` as baseline RGB JPEG.
pub fn encode(image: &HostImage, quality: u8) -> IoResult<Vec<u8>> {
    let (width, height) = image.dimensions();
    let (w, h) = match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => {
            return Err(IoError::EncodeError(format!(
                "{width}x{height} exceeds JPEG limit of 65535"
            )));
        }
    };
    let rgb: Vec<u8> = image
        .pixels()
        .iter()
        .flat_map(|p| [p.red, p.green, p.blue])
        .collect();

    let mut buffer = Vec::new();
    let encoder = jpeg_encoder::Encoder::new(&mut buffer, quality.clamp(1, 100));
    encoder
        .encode(&rgb, w, h, jpeg_encoder::ColorType::Rgb)
        .map_err(|e: jpeg_encoder::EncodingError| IoError::EncodeError(e.to_string()))?;
    Ok(buffer)
}

/// Reads a JPEG file.
pub fn read<P: AsRef<Path>>(path: P) -> IoResult<HostImage> {
    decode(File::open(path.as_ref())?)
}

/// Writes a JPEG file.
pub fn write<P: AsRef<Path>>(path: P, image: &HostImage, quality: u8) -> IoResult<()> {
    let bytes = encode(image, quality)?;
    std::fs::write(path.as_ref(), bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_JPEG_QUALITY;

    fn gradient(w: u32, h: u32) -> HostImage {
        let pixels = (0..h)
            .flat_map(|y| (0..w).map(move |x| Pixel::rgb((x * 8) as u8, (y * 8) as u8, 128)))
            .collect();
        HostImage::new(w, h, pixels).unwrap()
    }

    #[test]
    fn test_roundtrip() {
        let img = gradient(32, 16);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gradient.jpg");
        write(&path, &img, DEFAULT_JPEG_QUALITY).unwrap();

        let loaded = read(&path).unwrap();
        assert_eq!(loaded.dimensions(), (32, 16));
        assert!(loaded.pixels().iter().all(|p| p.alpha == 255));
        // Lossy, but close.
        let p = loaded.get(8, 8).unwrap();
        assert!((p.red as i32 - 64).abs() < 12, "{p:?}");
        assert!((p.blue as i32 - 128).abs() < 12, "{p:?}");
    }

    #[test]
    fn test_quality_affects_size() {
        let img = gradient(64, 64);
        let low = encode(&img, 10).unwrap();
        let high = encode(&img, 100).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = decode(&b"not a jpeg"[..]).unwrap_err();
        assert!(matches!(err, IoError::DecodeError(_)));
    }
}
