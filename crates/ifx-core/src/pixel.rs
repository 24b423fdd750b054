//! Host pixel type.
//!
//! # Memory Layout
//!
//! [`Pixel`] is `#[repr(C)]` with four `u8` channels in `red, green, blue,
//! alpha` order. Read as a little-endian `u32` the red channel occupies the
//! low byte, which is how the device kernels unpack it:
//!
//! ```text
//! bits  0..8   red
//! bits  8..16  green
//! bits 16..24  blue
//! bits 24..32  alpha
//! ```
//!
//! Because the type is [`bytemuck::Pod`] a `&[Pixel]` can be handed to a
//! device transfer as bytes without copying.

use bytemuck::{Pod, Zeroable};
use std::fmt;

/// 8-bit RGBA pixel.
#[repr(C)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Pixel {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
    /// Alpha channel; decoders without alpha fill it with 255.
    pub alpha: u8,
}

impl Pixel {
    /// Size of one pixel in bytes.
    pub const SIZE: usize = std::mem::size_of::<Pixel>();

    /// Opaque black.
    pub const BLACK: Pixel = Pixel::rgb(0, 0, 0);

    /// Opaque white.
    pub const WHITE: Pixel = Pixel::rgb(255, 255, 255);

    /// Creates a pixel from all four channels.
    #[inline]
    pub const fn new(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self { red, green, blue, alpha }
    }

    /// Creates an opaque pixel.
    #[inline]
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self::new(red, green, blue, 255)
    }
}

impl fmt::Debug for Pixel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pixel({}, {}, {}, {})", self.red, self.green, self.blue, self.alpha)
    }
}
