//! Renderers
//!
//! Export logic turning the score model into output formats.

pub mod mnx;

pub use mnx::{write_mnx, MnxDocument, MnxWriter};
