//! Element-level MusicXML parsing helpers
//!
//! Each helper reads one small element (a `<pitch>`, a `<type>`, a `<clef>`)
//! and returns model values. Helpers never touch reader state; the reader
//! decides what a failure means (fatal data error or a diagnostic).

use crate::converters::errors::ImportError;
use crate::converters::musicxml::xml::XmlElement;
use crate::models::{
    Accidental, Clef, EndingType, OctaveShiftType, Pitch, Rational, SlurSide, Step,
    TimeSignature, TupletRatio,
};
use once_cell::sync::Lazy;
use regex::Regex;

/// MusicXML counts `<divisions>` per quarter note
pub const DIVISIONS_PER_WHOLE_NOTE: i32 = 4;

static ENDING_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s,]+").expect("ending separator regex must compile"));
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("digits regex must compile"));

/// Read the integer at the start of `text`, ignoring surrounding blanks and
/// anything after the digits (`"3+2"` is 3, `"-1.0"` is -1)
pub fn parse_leading_int(text: &str) -> Option<i32> {
    let trimmed = text.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse::<i32>().ok().map(|n| sign * n)
}

// ===== RHYTHM =====

/// Symbolic note-type name to its fraction of a whole note.
///
/// Several misspellings seen in the wild are accepted alongside the
/// standard names.
pub fn rhythm_type_fraction(name: &str) -> Option<Rational> {
    let (numer, denom) = match name {
        "breve" => (2, 1),
        "whole" => (1, 1),
        "half" => (1, 2),
        "quarter" | "quater" => (1, 4),
        "eighth" | "eigth" | "quaver" | "8th" => (1, 8),
        "16th" | "sixteenth" | "semiquaver" => (1, 16),
        "32nd" | "32th" => (1, 32),
        "64th" => (1, 64),
        "128th" => (1, 128),
        "256th" => (1, 256),
        "512th" => (1, 512),
        "1024th" => (1, 1024),
        _ => return None,
    };
    Some(Rational::new(numer, denom))
}

/// Every name [`rhythm_type_fraction`] accepts
pub const RHYTHM_TYPE_NAMES: [&str; 19] = [
    "breve", "whole", "half", "quarter", "quater", "eighth", "eigth", "quaver", "8th",
    "semiquaver", "sixteenth", "16th", "32nd", "32th", "64th", "128th", "256th", "512th",
    "1024th",
];

/// `<type>` or `<normal-type>`
pub fn parse_type(el: &XmlElement) -> Result<Rational, ImportError> {
    rhythm_type_fraction(el.text()).ok_or_else(|| {
        ImportError::data(format!("<{}> got unsupported value \"{}\".", el.name, el.text()))
    })
}

/// `<duration>` in divisions. `None` when the content is not a number.
pub fn parse_duration(el: &XmlElement) -> Option<i32> {
    parse_leading_int(el.text())
}

pub fn parse_divisions(el: &XmlElement) -> Result<i32, ImportError> {
    match parse_leading_int(el.text()) {
        Some(divisions) if divisions > 0 => Ok(divisions),
        _ => Err(ImportError::data(format!(
            "<divisions> has invalid content \"{}\".",
            el.text()
        ))),
    }
}

/// `<time-modification>`: `normal-notes` of the normal type in the time of
/// `actual-notes`. Without `<normal-type>` the note's own type is used.
pub fn parse_time_modification(
    el: &XmlElement,
    note_type: Option<Rational>,
) -> Result<TupletRatio, ImportError> {
    let mut actual_notes = None;
    let mut normal_notes = None;
    let mut normal_type = None;

    for child in &el.children {
        match child.name.as_str() {
            "actual-notes" | "normal-notes" => {
                let count = parse_leading_int(child.text()).ok_or_else(|| {
                    ImportError::data(format!("<time-modification> has an invalid <{}>.", child.name))
                })?;
                if child.name == "actual-notes" {
                    actual_notes = Some(count);
                } else {
                    normal_notes = Some(count);
                }
            }
            "normal-type" => normal_type = Some(parse_type(child)?),
            _ => {}
        }
    }

    let actual_notes = actual_notes
        .ok_or_else(|| ImportError::data("<time-modification> is missing <actual-notes>."))?;
    let normal_notes = normal_notes
        .ok_or_else(|| ImportError::data("<time-modification> is missing <normal-notes>."))?;
    let unit = normal_type
        .or(note_type)
        .ok_or_else(|| ImportError::data("<time-modification> must come after <type>."))?;

    Ok(TupletRatio::new(
        normal_notes * unit.numer(),
        *unit.denom(),
        actual_notes * unit.numer(),
        *unit.denom(),
    ))
}

// ===== PITCH =====

pub fn parse_pitch(el: &XmlElement) -> Result<Pitch, ImportError> {
    let mut step = None;
    let mut octave = None;
    let mut alter = 0;

    for child in &el.children {
        match child.name.as_str() {
            "step" => {
                let parsed: Step = child
                    .text()
                    .trim()
                    .parse()
                    .map_err(|_| ImportError::data("<pitch> has an invalid <step>."))?;
                step = Some(parsed);
            }
            "octave" => {
                octave = Some(
                    parse_leading_int(child.text())
                        .ok_or_else(|| ImportError::data("<pitch> has an invalid <octave>."))?,
                );
            }
            "alter" => {
                alter = parse_leading_int(child.text())
                    .ok_or_else(|| ImportError::data("<pitch> has an invalid <alter>."))?;
            }
            _ => {}
        }
    }

    let step = step.ok_or_else(|| ImportError::data("<pitch> is missing <step>."))?;
    let octave = octave.ok_or_else(|| ImportError::data("<pitch> is missing <octave>."))?;
    Ok(Pitch::new(step, octave, alter))
}

pub fn parse_accidental(el: &XmlElement) -> Result<Accidental, ImportError> {
    match el.text() {
        "sharp" => Ok(Accidental::Sharp),
        "natural" => Ok(Accidental::Natural),
        "flat" => Ok(Accidental::Flat),
        "double-sharp" | "sharp-sharp" => Ok(Accidental::DoubleSharp),
        "flat-flat" => Ok(Accidental::DoubleFlat),
        "natural-sharp" => Ok(Accidental::NaturalSharp),
        "natural-flat" => Ok(Accidental::NaturalFlat),
        other => Err(ImportError::data(format!(
            "Got unsupported value \"{}\" for <accidental>.",
            other
        ))),
    }
}

// ===== ATTRIBUTES =====

/// `<clef>` as a staff position (0 = middle line of a five-line staff)
pub fn parse_clef(el: &XmlElement, part_id: &str) -> Result<Clef, ImportError> {
    let sign = el.child_text("sign").map(str::trim).filter(|s| !s.is_empty());
    let line = el.child_text("line").and_then(parse_leading_int);

    match (sign, line) {
        (Some(sign), Some(line)) => Ok(Clef {
            sign: sign.to_string(),
            position: 2 * line - 6,
        }),
        _ => Err(ImportError::data(format!("Invalid clef in part {}", part_id))),
    }
}

pub fn parse_time(el: &XmlElement) -> Result<TimeSignature, ImportError> {
    let count = el.child_text("beats").and_then(parse_leading_int);
    let unit = el.child_text("beat-type").and_then(parse_leading_int);

    match (count, unit) {
        (Some(count), Some(unit)) if count > 0 && unit > 0 => Ok(TimeSignature {
            count: count as u32,
            unit: unit as u32,
        }),
        _ if el.attribute("symbol") == Some("common") => Ok(TimeSignature::default()),
        _ => Err(ImportError::data("Invalid data in <time> element.")),
    }
}

/// `<key>` fifths as written. `None` when missing or not a number.
pub fn parse_key_fifths(el: &XmlElement) -> Option<i32> {
    el.child_text("fifths").and_then(parse_leading_int)
}

/// Semitone offset of a `<transpose>` element: `chromatic + 12 * octave-change`.
///
/// Components that are not integers are skipped and reported back by name.
pub fn parse_transpose(el: &XmlElement) -> (i32, Vec<String>) {
    let mut semitones = 0;
    let mut invalid = Vec::new();

    for (tag, factor) in [("chromatic", 1), ("octave-change", 12)] {
        let Some(text) = el.child_text(tag) else {
            continue;
        };
        match text.trim().parse::<i32>() {
            Ok(value) => semitones += value * factor,
            Err(_) => invalid.push(format!("<{}> value \"{}\"", tag, text)),
        }
    }

    (semitones, invalid)
}

// ===== BARLINES =====

/// Integer labels of an `<ending number="...">`, e.g. `"1, 2"` → `[1, 2]`
pub fn parse_ending_numbers(number: &str) -> Vec<u32> {
    ENDING_SEPARATOR
        .split(number.trim())
        .filter(|token| DIGITS.is_match(token))
        .filter_map(|token| token.parse().ok())
        .collect()
}

pub fn ending_type(value: &str) -> Option<EndingType> {
    match value {
        "start" => Some(EndingType::Start),
        "stop" => Some(EndingType::Stop),
        "discontinue" => Some(EndingType::Discontinue),
        _ => None,
    }
}

// ===== NOTATIONS =====

/// `<beam number="n">value</beam>` as `(n, value)`; number defaults to 1
pub fn parse_beam(el: &XmlElement) -> Result<(i32, String), ImportError> {
    let number = match el.attribute("number") {
        None => 1,
        Some(value) => parse_leading_int(value).ok_or_else(|| {
            ImportError::data("<beam> has an invalid \"number\" attribute.")
        })?,
    };
    Ok((number, el.text().trim().to_string()))
}

pub fn slur_side(placement: Option<&str>) -> Option<SlurSide> {
    match placement {
        Some("above") => Some(SlurSide::Up),
        Some("below") => Some(SlurSide::Down),
        _ => None,
    }
}

/// Octave shift for a `size` and `type="up"|"down"` pair.
///
/// MusicXML names the direction the notes are moved on the page: a shift
/// "down" is written for notes that sound higher (8va).
pub fn octave_shift_type(size: &str, direction: &str) -> Option<OctaveShiftType> {
    match (size, direction) {
        ("8", "down") => Some(OctaveShiftType::EightVa),
        ("8", "up") => Some(OctaveShiftType::EightVb),
        ("15" | "16", "down") => Some(OctaveShiftType::FifteenMa),
        ("15" | "16", "up") => Some(OctaveShiftType::FifteenMb),
        ("22", "down") => Some(OctaveShiftType::TwentySecondMa),
        ("22", "up") => Some(OctaveShiftType::TwentySecondMb),
        _ => None,
    }
}
