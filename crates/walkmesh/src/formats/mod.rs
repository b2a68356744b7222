//! Walkmesh file formats

pub mod binary;
pub mod text;
pub mod tiles;

pub use binary::{read_bwm, write_bwm, BwmHeader};
pub use text::{read_text, write_text};
