//! Filter identifiers.
//!
//! [`FilterId`] is the closed set of filters the dispatcher knows about.
//! The per-pixel math lives in the device kernel source; this type only
//! names the filters and carries their menu metadata.

use std::fmt;

/// Number of filters in [`FilterId::ALL`].
pub const FILTER_COUNT: usize = 9;

/// A filter kernel that can be dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterId {
    /// `255 - c` on every colour channel.
    Invert,
    /// Luminance broadcast to all colour channels.
    Gray,
    /// Luminance thresholded to black or white.
    GrayToBinary,
    /// Arc-cosine tone curve.
    Acos,
    /// Sepia tone matrix.
    Sepia,
    /// 7x7 weighted blur using the session's constant mask.
    GaussianBlur,
    /// Keep red, zero green and blue.
    RedChannel,
    /// Keep green, zero red and blue.
    GreenChannel,
    /// Keep blue, zero red and green.
    BlueChannel,
}

impl FilterId {
    /// All filters in menu order.
    pub const ALL: [FilterId; FILTER_COUNT] = [
        FilterId::Invert,
        FilterId::Gray,
        FilterId::GrayToBinary,
        FilterId::Acos,
        FilterId::Sepia,
        FilterId::GaussianBlur,
        FilterId::RedChannel,
        FilterId::GreenChannel,
        FilterId::BlueChannel,
    ];

    /// Position in [`FilterId::ALL`].
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Menu label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Invert => "Invert",
            Self::Gray => "Grayscale",
            Self::GrayToBinary => "Gray to binary",
            Self::Acos => "Acos",
            Self::Sepia => "Sepia",
            Self::GaussianBlur => "Gaussian blur",
            Self::RedChannel => "Red channel",
            Self::GreenChannel => "Green channel",
            Self::BlueChannel => "Blue channel",
        }
    }

    /// Menu key, `'1'..='9'`.
    pub const fn shortcut(self) -> char {
        (b'1' + self as u8) as char
    }

    /// Inverse of [`FilterId::shortcut`].
    pub fn from_shortcut(c: char) -> Option<Self> {
        let digit = c.to_digit(10)? as usize;
        digit.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    /// Standard filters take `(input, output, count)`; only the blur differs.
    #[inline]
    pub const fn is_standard(self) -> bool {
        !matches!(self, Self::GaussianBlur)
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
