//! Score, parts, bars and the score-wide lookups
//!
//! The score owns everything: parts, bars, each bar's per-part content.
//! References between structures are ids, resolved here by scanning the
//! whole tree. The scans are linear but only run while the importer
//! resolves cross-references at the end of each measure.

use crate::models::duration::Rational;
use crate::models::pitch::KeySignature;
use crate::models::sequence::{
    Beam, Event, ItemKey, Note, Sequence, SequenceContent, SequenceItem,
};

/// An instrument's line through the whole piece
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub part_id: String,
    pub name: Option<String>,

    /// Semitones from written to concert pitch
    pub transpose: i32,
}

impl Part {
    pub fn new(part_id: impl Into<String>, name: Option<String>, transpose: i32) -> Self {
        Self {
            part_id: part_id.into(),
            name,
            transpose,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    pub count: u32,
    pub unit: u32,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self { count: 4, unit: 4 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndingType {
    Start,
    Stop,
    Discontinue,
}

/// Volta bracket marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ending {
    pub ending_type: EndingType,

    /// Repeat passes the bracket applies to (start endings only)
    pub numbers: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clef {
    pub sign: String,

    /// Staff position, 0 = middle line
    pub position: i32,
}

/// A clef change at a rhythmic offset from the start of the bar
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedClef {
    pub clef: Clef,
    pub position: Rational,
}

/// One part's content for one bar
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BarPart {
    pub part_id: String,
    pub sequences: Vec<Sequence>,
    pub clefs: Vec<PositionedClef>,
}

impl BarPart {
    pub fn new(part_id: impl Into<String>) -> Self {
        Self {
            part_id: part_id.into(),
            sequences: Vec::new(),
            clefs: Vec::new(),
        }
    }

    pub fn sequence_mut(&mut self, sequence_id: &str) -> Option<&mut Sequence> {
        self.sequences.iter_mut().find(|s| s.sequence_id == sequence_id)
    }

    pub fn get_or_create_sequence(&mut self, sequence_id: &str) -> &mut Sequence {
        let idx = match self.sequences.iter().position(|s| s.sequence_id == sequence_id) {
            Some(idx) => idx,
            None => {
                self.sequences.push(Sequence::new(sequence_id));
                self.sequences.len() - 1
            }
        };
        &mut self.sequences[idx]
    }
}

/// One unit of metrical time across all parts
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bar {
    pub index: usize,

    /// Time signature set explicitly in this bar
    pub time_signature: Option<TimeSignature>,

    /// Key signature set explicitly in this bar (concert pitch)
    pub key_signature: Option<KeySignature>,

    pub repeat_start: bool,

    /// Number of passes for a backward repeat ending in this bar
    pub repeat_end: Option<u32>,

    pub start_ending: Option<Ending>,
    pub stop_ending: Option<Ending>,

    pub bar_parts: Vec<BarPart>,
}

impl Bar {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    pub fn bar_part(&self, part_id: &str) -> Option<&BarPart> {
        self.bar_parts.iter().find(|bp| bp.part_id == part_id)
    }

    pub fn bar_part_mut(&mut self, part_id: &str) -> Option<&mut BarPart> {
        self.bar_parts.iter_mut().find(|bp| bp.part_id == part_id)
    }
}

/// Address of a beam inside the score: the primary beam of a sequence,
/// followed by child indices for each nested level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeamPath {
    pub bar: usize,
    pub part_id: String,
    pub sequence_id: String,
    pub root: usize,
    pub children: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Score {
    pub parts: Vec<Part>,
    pub bars: Vec<Bar>,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn part(&self, part_id: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.part_id == part_id)
    }

    fn sequences(&self) -> impl Iterator<Item = (usize, &Sequence)> {
        self.bars.iter().enumerate().flat_map(|(idx, bar)| {
            bar.bar_parts
                .iter()
                .flat_map(move |bp| bp.sequences.iter().map(move |s| (idx, s)))
        })
    }

    fn sequences_mut(&mut self) -> impl Iterator<Item = &mut Sequence> {
        self.bars
            .iter_mut()
            .flat_map(|bar| bar.bar_parts.iter_mut())
            .flat_map(|bp| bp.sequences.iter_mut())
    }

    /// The event holding the given note or rest
    pub fn event_containing_item(&self, key: ItemKey) -> Option<&Event> {
        self.sequences()
            .flat_map(|(_, seq)| seq.events())
            .find(|event| event.contains_item(key))
    }

    pub fn event_mut(&mut self, event_id: &str) -> Option<&mut Event> {
        self.sequences_mut().find_map(|seq| seq.event_mut(event_id))
    }

    pub fn note_mut(&mut self, key: ItemKey) -> Option<&mut Note> {
        self.sequences_mut()
            .find_map(|seq| seq.event_with_item_mut(key))
            .and_then(|event| event.note_mut(key))
    }

    /// Bar index and offset from the start of that bar at which the event
    /// begins. Dots and tuplet ratios count; grace notes take no time.
    pub fn event_metrical_position(&self, event_id: &str) -> Option<(usize, Rational)> {
        for (bar_idx, seq) in self.sequences() {
            let mut offset = Rational::from_integer(0);
            if locate_event(&seq.items, event_id, &mut offset, Rational::from_integer(1)) {
                return Some((bar_idx, offset));
            }
        }
        None
    }

    /// Measure location string for an event: 1-based bar number and the
    /// offset always written as `n/d`, e.g. `"2:1/4"` or `"1:0/1"`
    pub fn event_measure_location(&self, event_id: &str) -> Option<String> {
        self.event_metrical_position(event_id)
            .map(|(bar, offset)| format!("{}:{}/{}", bar + 1, offset.numer(), offset.denom()))
    }

    /// Insert an item right before the given event wherever it lives
    pub fn insert_before_event(&mut self, event_id: &str, item: SequenceItem) -> Result<(), SequenceItem> {
        let mut item = item;
        for seq in self.sequences_mut() {
            match seq.insert_before_event(event_id, item) {
                Ok(()) => return Ok(()),
                Err(returned) => item = returned,
            }
        }
        Err(item)
    }

    pub fn sequence_mut(&mut self, bar: usize, part_id: &str, sequence_id: &str) -> Option<&mut Sequence> {
        self.bars
            .get_mut(bar)?
            .bar_part_mut(part_id)?
            .sequence_mut(sequence_id)
    }

    pub fn beam_mut(&mut self, path: &BeamPath) -> Option<&mut Beam> {
        let seq = self.sequence_mut(path.bar, &path.part_id, &path.sequence_id)?;
        let mut beam = seq.beams.get_mut(path.root)?;
        for &child in &path.children {
            beam = beam.child_beam_mut(child)?;
        }
        Some(beam)
    }

    /// Time signature in force at a bar
    pub fn active_time_signature(&self, bar_idx: usize) -> TimeSignature {
        let end = (bar_idx + 1).min(self.bars.len());
        self.bars[..end]
            .iter()
            .rev()
            .find_map(|bar| bar.time_signature)
            .unwrap_or_default()
    }

    /// Whether a bar restates its time signature with a new value
    pub fn time_signature_changed(&self, bar_idx: usize) -> bool {
        match self.bars.get(bar_idx).and_then(|bar| bar.time_signature) {
            None => false,
            Some(_) if bar_idx == 0 => true,
            Some(time) => self.active_time_signature(bar_idx - 1) != time,
        }
    }

    /// Key signature in force at a bar, walking back to the nearest bar
    /// that sets one
    pub fn active_key_signature(&self, bar_idx: usize) -> KeySignature {
        let end = (bar_idx + 1).min(self.bars.len());
        self.bars[..end]
            .iter()
            .rev()
            .find_map(|bar| bar.key_signature)
            .unwrap_or_default()
    }

    /// Whether a bar sets a key signature that differs from the one before.
    /// The first bar reports any explicit key.
    pub fn key_signature_changed(&self, bar_idx: usize) -> bool {
        match self.bars.get(bar_idx).and_then(|bar| bar.key_signature) {
            None => false,
            Some(_) if bar_idx == 0 => true,
            Some(key) => self.active_key_signature(bar_idx - 1) != key,
        }
    }
}

fn locate_event(items: &[SequenceItem], event_id: &str, offset: &mut Rational, scale: Rational) -> bool {
    for item in items {
        match item {
            SequenceItem::Event(event) => {
                if event.event_id == event_id {
                    return true;
                }
                *offset += event.duration.total() * scale;
            }
            SequenceItem::Tuplet(tuplet) => {
                if locate_event(&tuplet.items, event_id, offset, scale * tuplet.ratio.time_factor()) {
                    return true;
                }
            }
            SequenceItem::GraceNoteGroup(group) => {
                if group.events.iter().any(|e| e.event_id == event_id) {
                    return true;
                }
            }
            SequenceItem::Direction(_) => {}
        }
    }
    false
}
