//! Format converters
//!
//! The full MusicXML → MNX pipeline:
//!
//! ```text
//! MusicXML text
//!   ↓ [musicxml::read_musicxml]
//! Score + diagnostics
//!   ↓ [renderers::mnx::write_mnx]
//! MnxDocument
//!   ↓ [serde_json, optional]
//! JSON text
//! ```

pub mod errors;
pub mod musicxml;
pub mod types;

pub use errors::{ConversionError, ExportError, ImportError};
pub use types::{ConversionResult, ConversionSettings, Diagnostic, DiagnosticKind};

use crate::models::Score;
use crate::renderers::mnx::write_mnx;

/// Convert MusicXML text into an MNX document plus import diagnostics
pub fn convert_musicxml_to_mnx(
    xml: &str,
    settings: Option<ConversionSettings>,
) -> Result<ConversionResult, ConversionError> {
    let settings = settings.unwrap_or_default();

    let (score, diagnostics) = musicxml::read_musicxml(xml)?;
    log::debug!(
        "Imported {} part(s), {} bar(s), {} diagnostic(s)",
        score.parts.len(),
        score.bars.len(),
        diagnostics.len()
    );

    let document = write_mnx(&score, &settings)?;
    Ok(ConversionResult {
        document,
        diagnostics,
    })
}

/// Same as [`convert_musicxml_to_mnx`], serialized to JSON text
pub fn convert_musicxml_to_mnx_string(
    xml: &str,
    settings: Option<ConversionSettings>,
) -> Result<String, ConversionError> {
    let settings = settings.unwrap_or_default();
    let pretty = settings.pretty;
    let result = convert_musicxml_to_mnx(xml, Some(settings))?;

    let json = if pretty {
        serde_json::to_string_pretty(&result.document)
    } else {
        serde_json::to_string(&result.document)
    };
    json.map_err(|e| ConversionError::Serialization(e.to_string()))
}

/// Import MusicXML into the score model, dropping diagnostics
pub fn read_musicxml(xml: &str) -> Result<Score, ImportError> {
    musicxml::read_musicxml(xml).map(|(score, _)| score)
}
