//! Grayscale image containers and the conversions feeding the fingerprint
//! and feature stages.
//!
//! Every image enters the core as 8-bit single-channel intensity: colour
//! inputs are converted with [`color::rgb_to_gray`] when decoded.
pub mod color;
pub mod draw;
pub mod f32;
pub mod io;
pub mod resize;
pub mod traits;
pub mod u8;

pub use self::f32::ImageF32;
pub use self::traits::{ImageView, ImageViewMut, Rows};
pub use self::u8::{GrayImageU8, ImageU8};
