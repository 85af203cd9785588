//! MusicXML → MNX converter
//!
//! Reads MusicXML (partwise or timewise) into a format-neutral score model,
//! resolves ties, slurs, tuplets, beams and octave shifts, and writes the
//! result as an MNX JSON document. Usable natively and as a WASM module.

pub mod api;
pub mod converters;
pub mod models;
pub mod renderers;

// Re-export commonly used types
pub use converters::{
    convert_musicxml_to_mnx, convert_musicxml_to_mnx_string, read_musicxml, ConversionError,
    ConversionResult, ConversionSettings, Diagnostic, DiagnosticKind, ExportError, ImportError,
};
pub use models::Score;
pub use renderers::mnx::{write_mnx, MnxDocument};

use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(feature = "console_log")]
    if console_log::init_with_level(log::Level::Debug).is_err() {
        return;
    }

    log::info!("MNX converter WASM module initialized");
}
