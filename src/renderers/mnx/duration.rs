//! Note-value helpers for MNX export

use crate::converters::errors::ExportError;
use crate::models::{fraction_key, Rational, RhythmicDuration};
use crate::renderers::mnx::types::MnxNoteValue;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Base fractions of a whole note and their MNX names, longest first
const NOTE_VALUE_BASES: [(i32, i32, &str); 17] = [
    (16, 1, "duplexMaxima"),
    (8, 1, "maxima"),
    (4, 1, "longa"),
    (2, 1, "breve"),
    (1, 1, "whole"),
    (1, 2, "half"),
    (1, 4, "quarter"),
    (1, 8, "eighth"),
    (1, 16, "16th"),
    (1, 32, "32nd"),
    (1, 64, "64th"),
    (1, 128, "128th"),
    (1, 256, "256th"),
    (1, 512, "512th"),
    (1, 1024, "1024th"),
    (1, 2048, "2048th"),
    (1, 4096, "4096th"),
];

static BASE_BY_FRACTION: Lazy<HashMap<String, &'static str>> = Lazy::new(|| {
    NOTE_VALUE_BASES
        .iter()
        .map(|&(numer, denom, name)| (fraction_key(&Rational::new(numer, denom)), name))
        .collect()
});

/// MNX base name for a fraction of a whole note
///
/// # Examples
/// ```
/// use mnx_converter::models::Rational;
/// use mnx_converter::renderers::mnx::duration::note_value_base;
///
/// assert_eq!(note_value_base(&Rational::new(1, 4)).unwrap(), "quarter");
/// assert!(note_value_base(&Rational::new(1, 3)).is_err());
/// ```
pub fn note_value_base(frac: &Rational) -> Result<&'static str, ExportError> {
    BASE_BY_FRACTION
        .get(&fraction_key(frac))
        .copied()
        .ok_or_else(|| ExportError::UnmappedDuration(fraction_key(frac)))
}

/// `{ base, dots? }` for a notated duration
pub fn encode_note_value(duration: &RhythmicDuration) -> Result<MnxNoteValue, ExportError> {
    Ok(MnxNoteValue {
        base: note_value_base(&duration.frac)?.to_string(),
        dots: (duration.dots > 0).then_some(duration.dots),
    })
}
