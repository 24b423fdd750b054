//! # ifx-core
//!
//! Core host-side types shared by every ifx crate.
//!
//! - [`Pixel`] - 4-byte RGBA pixel, the unit of every host and device buffer
//! - [`HostImage`] - decoded image owned by the host (width, height, pixels)
//! - [`FilterId`] - the closed set of filter kernels the dispatcher can run
//! - [`MenuCommand`] - single-character filter selection commands
//!
//! ## Crate Structure
//!
//! ```text
//! ifx-core (this crate)
//!    ^
//!    |
//!    +-- ifx-compute (device dispatch)
//!    +-- ifx-io (decode / encode)
//!    +-- ifx-view (display window)
//!    +-- ifx-cli (binary)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod command;
pub mod error;
pub mod filter;
pub mod image;
pub mod pixel;

pub use command::{MenuCommand, menu_text};
pub use error::{CoreError, Result};
pub use filter::{FILTER_COUNT, FilterId};
pub use image::HostImage;
pub use pixel::Pixel;
