//! Format-neutral score model
//!
//! Shared contract between the MusicXML importer and the MNX writer. Nothing
//! in here knows about either format's vocabulary.

pub mod duration;
pub mod pitch;
pub mod score;
pub mod sequence;

// Re-export commonly used types
pub use duration::{fraction_key, Rational, RhythmicDuration};
pub use pitch::{KeySignature, Pitch, Step, DEFAULT_KEYSIG};
pub use score::{
    Bar, BarPart, BeamPath, Clef, Ending, EndingType, Part, PositionedClef, Score, TimeSignature,
};
pub use sequence::{
    Accidental, Beam, BeamChild, BeamHook, Event, EventItem, GraceNoteGroup, HookDirection,
    IncompleteSlur, ItemKey, Note, OctaveShift, OctaveShiftType, Rest, Sequence, SequenceContent,
    SequenceDirection, SequenceItem, Slur, SlurKind, SlurSide, Tuplet, TupletRatio,
};
