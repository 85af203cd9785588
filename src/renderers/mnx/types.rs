//! Serde model of the MNX JSON emitted by the writer
//!
//! Only the subset of the MNX schema the converter produces is modelled.
//! Optional members are skipped when absent so the output carries no
//! `null`s.

use serde::{Deserialize, Serialize};

/// Serializes as `{}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyObject {}

// ===== DOCUMENT =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MnxDocument {
    pub mnx: MnxHeader,
    pub global: MnxGlobal,
    pub parts: Vec<MnxPart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnxHeader {
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MnxGlobal {
    pub measures: Vec<MnxGlobalMeasure>,
}

// ===== GLOBAL MEASURES =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MnxGlobalMeasure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<MnxTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<MnxKey>,

    #[serde(rename = "repeat-start", skip_serializing_if = "Option::is_none")]
    pub repeat_start: Option<EmptyObject>,

    #[serde(rename = "repeat-end", skip_serializing_if = "Option::is_none")]
    pub repeat_end: Option<MnxRepeatEnd>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ending: Option<MnxEnding>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnxTime {
    pub count: u32,
    pub unit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnxKey {
    pub fifths: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnxRepeatEnd {
    /// Only written for more than two passes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub times: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnxEnding {
    pub numbers: Vec<u32>,
}

// ===== PARTS =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MnxPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub measures: Vec<MnxPartMeasure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MnxPartMeasure {
    pub sequences: Vec<MnxSequence>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub clefs: Option<Vec<MnxPositionedClef>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub beams: Option<Vec<MnxBeam>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MnxPositionedClef {
    pub clef: MnxClef,

    /// Omitted at the start of the bar
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<MnxRhythmicPosition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnxClef {
    pub position: i32,
    pub sign: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnxRhythmicPosition {
    /// `[numerator, denominator]`
    pub fraction: [i32; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MnxBeam {
    pub events: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hooks: Option<Vec<MnxBeamHook>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner: Option<Vec<MnxBeam>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnxBeamHook {
    pub event: String,
    /// `"left"` or `"right"`
    pub direction: String,
}

// ===== SEQUENCE CONTENT =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MnxSequence {
    pub content: Vec<MnxContent>,
}

/// One entry of a sequence's `content`, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MnxContent {
    Event(MnxEvent),
    Tuplet(MnxTuplet),
    Grace(MnxGrace),
    OctaveShift(MnxOctaveShift),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnxNoteValue {
    pub base: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dots: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MnxEvent {
    pub duration: MnxNoteValue,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rest: Option<EmptyObject>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<MnxNote>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub slurs: Option<Vec<MnxSlur>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MnxNote {
    pub pitch: MnxPitch,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "accidentalDisplay", skip_serializing_if = "Option::is_none")]
    pub accidental_display: Option<MnxAccidentalDisplay>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tied: Option<MnxTied>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnxPitch {
    pub step: String,
    pub octave: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alter: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnxAccidentalDisplay {
    pub show: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnxTied {
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnxSlur {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(rename = "start-note", skip_serializing_if = "Option::is_none")]
    pub start_note: Option<String>,

    #[serde(rename = "end-note", skip_serializing_if = "Option::is_none")]
    pub end_note: Option<String>,

    /// `"incoming"` or `"outgoing"` on slurs with one missing end
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MnxTuplet {
    pub inner: MnxNoteValueQuantity,
    pub outer: MnxNoteValueQuantity,
    pub content: Vec<MnxContent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnxNoteValueQuantity {
    pub duration: MnxNoteValue,
    pub multiple: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MnxGrace {
    pub content: Vec<MnxContent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnxOctaveShift {
    /// Measure location of the last affected event
    pub end: String,
    pub value: i32,
}
