//! Public API types for conversion
//!
//! Settings in, document plus diagnostics out.

use crate::renderers::mnx::MnxDocument;
use serde::{Deserialize, Serialize};

/// Configuration options for conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionSettings {
    /// Value written to `mnx.version`
    pub mnx_version: u32,

    /// Emit each part measure's `beams` list
    pub include_beams: bool,

    /// Pretty-print JSON text output
    pub pretty: bool,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            mnx_version: 1,
            include_beams: false,
            pretty: true,
        }
    }
}

/// Kinds of tolerated input anomalies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    UnmatchedTieStop,
    UnmatchedSlurStop,
    UnmatchedBeam,
    UnmatchedOctaveShiftStop,
    InvalidTranspose,
    InvalidDuration,
    InvalidRepeatTimes,
    UnclosedTuplet,
    UnclosedBeam,
    InvalidKey,
    UnsupportedSlurAnchor,
}

/// A non-fatal problem found while importing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,

    /// 0-based bar index, when inside a measure
    pub bar: Option<usize>,

    pub part_id: Option<String>,

    /// Human-readable explanation
    pub message: String,
}

/// Result of MusicXML to MNX conversion
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    pub document: MnxDocument,
    pub diagnostics: Vec<Diagnostic>,
}
