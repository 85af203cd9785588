//! MusicXML import
//!
//! ```text
//! MusicXML string
//!   ↓ [parse_xml: roxmltree → owned element tree]
//! score-partwise | score-timewise
//!   ↓ [to_timewise]
//! score-timewise
//!   ↓ [MusicXmlReader]
//! Score + diagnostics
//! ```

pub mod parser;
pub mod reader;
pub mod timewise;
pub mod xml;

pub use reader::MusicXmlReader;
pub use timewise::to_timewise;
pub use xml::{parse_xml, XmlElement};

use crate::converters::errors::ImportError;
use crate::converters::types::Diagnostic;
use crate::models::Score;

/// Parse MusicXML text (partwise or timewise) into a score
pub fn read_musicxml(xml: &str) -> Result<(Score, Vec<Diagnostic>), ImportError> {
    let root = to_timewise(parse_xml(xml)?)?;
    MusicXmlReader::new(&root).read()
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
