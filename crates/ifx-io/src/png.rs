//! PNG read/write via the `png` crate.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, Write};
use std::path::Path;

use ifx_core::{HostImage, Pixel};

use crate::{IoError, IoResult};

/// Decodes a PNG stream. Palette and low bit depths are expanded, 16-bit
/// samples are reduced to 8 bits.
pub fn decode<R: BufRead + Seek>(reader: R) -> IoResult<HostImage> {
    let mut decoder = png::Decoder::new(reader);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder
        .read_info()
        .map_err(|e: png::DecodingError| IoError::DecodeError(e.to_string()))?;

    let buf_size = reader
        .output_buffer_size()
        .ok_or_else(|| IoError::DecodeError("cannot determine output buffer size".into()))?;
    let mut buf = vec![0u8; buf_size];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e: png::DecodingError| IoError::DecodeError(e.to_string()))?;
    let data = &buf[..info.buffer_size()];

    let pixels: Vec<Pixel> = match info.color_type {
        png::ColorType::Rgb => data.chunks_exact(3).map(|c| Pixel::rgb(c[0], c[1], c[2])).collect(),
        png::ColorType::Rgba => data
            .chunks_exact(4)
            .map(|c| Pixel::new(c[0], c[1], c[2], c[3]))
            .collect(),
        png::ColorType::Grayscale => data.iter().map(|&g| Pixel::rgb(g, g, g)).collect(),
        png::ColorType::GrayscaleAlpha => data
            .chunks_exact(2)
            .map(|c| Pixel::new(c[0], c[0], c[0], c[1]))
            .collect(),
        other => {
            return Err(IoError::UnsupportedFormat(format!("PNG color type {other:?}")));
        }
    };

    tracing::debug!(width = info.width, height = info.height, color = ?info.color_type, "png decoded");
    Ok(HostImage::new(info.width, info.height, pixels)?)
}

/// Encodes `image` as 8-bit RGBA.
pub fn encode<W: Write>(writer: W, image: &HostImage) -> IoResult<()> {
    let (width, height) = image.dimensions();
    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_source_srgb(png::SrgbRenderingIntent::Perceptual);

    let mut png_writer = encoder
        .write_header()
        .map_err(|e| IoError::EncodeError(e.to_string()))?;
    png_writer
        .write_image_data(image.as_bytes())
        .map_err(|e| IoError::EncodeError(e.to_string()))?;
    png_writer
        .finish()
        .map_err(|e| IoError::EncodeError(e.to_string()))?;
    Ok(())
}

/// Reads a PNG file.
pub fn read<P: AsRef<Path>>(path: P) -> IoResult<HostImage> {
    decode(BufReader::new(File::open(path.as_ref())?))
}

/// Writes a PNG file.
pub fn write<P: AsRef<Path>>(path: P, image: &HostImage) -> IoResult<()> {
    let file = File::create(path.as_ref())?;
    encode(BufWriter::new(file), image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_roundtrip_rgba_is_lossless() {
        let pixels = (0..12u8).map(|i| Pixel::new(i * 20, 255 - i, i, 100 + i)).collect();
        let img = HostImage::new(4, 3, pixels).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lossless.png");

        write(&path, &img).unwrap();
        assert_eq!(read(&path).unwrap(), img);
    }

    #[test]
    fn test_grayscale_expands() {
        let mut bytes = Vec::new();
        {
            let mut enc = png::Encoder::new(&mut bytes, 2, 1);
            enc.set_color(png::ColorType::Grayscale);
            enc.set_depth(png::BitDepth::Eight);
            let mut w = enc.write_header().unwrap();
            w.write_image_data(&[7, 200]).unwrap();
        }
        let img = decode(Cursor::new(bytes)).unwrap();
        assert_eq!(img.pixels(), &[Pixel::rgb(7, 7, 7), Pixel::rgb(200, 200, 200)]);
    }

    #[test]
    fn test_truncated_file() {
        let err = decode(Cursor::new(b"\x89PNG\r\n".to_vec())).unwrap_err();
        assert!(matches!(err, IoError::DecodeError(_)));
    }
}
