//! Single-file conversion.
//!
//! The [`FormatResolver`] maps a declared MIME type to an ordered chain of
//! [`Strategy`] values; the [`Converter`] walks that chain for one file
//! until a strategy yields a valid PDF.

mod converter;
mod resolver;
mod strategy;

pub use converter::Converter;
pub use resolver::{FormatClass, FormatResolver, Strategy, normalize_mime};
