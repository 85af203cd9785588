//! Sequence trees: voices, events, tuplets, grace groups and directions
//!
//! A `Sequence` is one voice of one part in one bar. Its items form a tree:
//! tuplets nest further items, grace groups hold events. Anything that points
//! across the tree (tie targets, slur targets, beam members) does so by id.

use crate::models::duration::{Rational, RhythmicDuration};
use crate::models::pitch::Pitch;

/// Internal handle for a note or rest, unique within one score.
///
/// Unlike note ids these are never serialized; they let the importer find
/// the event holding a given rest as easily as one holding a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey(pub u32);

/// Accidental explicitly rendered on a note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accidental {
    Sharp,
    Natural,
    Flat,
    DoubleSharp,
    DoubleFlat,
    NaturalSharp,
    NaturalFlat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub key: ItemKey,
    pub note_id: String,
    pub pitch: Pitch,
    pub rendered_accidental: Option<Accidental>,

    /// Id of the note this one is tied into
    pub tie_end_note: Option<String>,

    /// Set when another structure refers to this note by id
    pub is_referenced: bool,
}

impl Note {
    pub fn new(key: ItemKey, note_id: String, pitch: Pitch) -> Self {
        Self {
            key,
            note_id,
            pitch,
            rendered_accidental: None,
            tie_end_note: None,
            is_referenced: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rest {
    pub key: ItemKey,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventItem {
    Note(Note),
    Rest(Rest),
}

impl EventItem {
    pub fn key(&self) -> ItemKey {
        match self {
            EventItem::Note(note) => note.key,
            EventItem::Rest(rest) => rest.key,
        }
    }

    pub fn as_note(&self) -> Option<&Note> {
        match self {
            EventItem::Note(note) => Some(note),
            EventItem::Rest(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlurSide {
    Up,
    Down,
}

/// Which way an incomplete slur leaves the excerpt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncompleteSlur {
    Incoming,
    Outgoing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlurKind {
    /// Slur ending on another event
    Complete {
        target: String,
        start_note: Option<String>,
        end_note: Option<String>,
    },
    /// Slur that continues past the notated boundary
    Incomplete(IncompleteSlur),
}

/// A slur, attached to the event where it starts.
///
/// `kind` stays `None` until the importer has resolved both ends.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Slur {
    pub side: Option<SlurSide>,
    pub kind: Option<SlurKind>,
}

impl Slur {
    pub fn new(side: Option<SlurSide>) -> Self {
        Self { side, kind: None }
    }
}

/// One rhythmic moment: a rest or a chord of notes
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_id: String,
    pub duration: RhythmicDuration,
    pub items: Vec<EventItem>,
    pub slurs: Vec<Slur>,
    pub is_referenced: bool,
}

impl Event {
    pub fn new(event_id: String, duration: RhythmicDuration) -> Self {
        Self {
            event_id,
            duration,
            items: Vec::new(),
            slurs: Vec::new(),
            is_referenced: false,
        }
    }

    pub fn is_rest(&self) -> bool {
        !self.items.iter().any(|item| matches!(item, EventItem::Note(_)))
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.items.iter().filter_map(EventItem::as_note)
    }

    pub fn contains_item(&self, key: ItemKey) -> bool {
        self.items.iter().any(|item| item.key() == key)
    }

    pub fn note_mut(&mut self, key: ItemKey) -> Option<&mut Note> {
        self.items.iter_mut().find_map(|item| match item {
            EventItem::Note(note) if note.key == key => Some(note),
            _ => None,
        })
    }
}

/// `outer` units of time hold `inner` notes, e.g. 2 eighths : 3 eighths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TupletRatio {
    pub outer_numerator: i32,
    pub outer_denominator: i32,
    pub inner_numerator: i32,
    pub inner_denominator: i32,
}

impl TupletRatio {
    pub fn new(
        outer_numerator: i32,
        outer_denominator: i32,
        inner_numerator: i32,
        inner_denominator: i32,
    ) -> Self {
        Self {
            outer_numerator,
            outer_denominator,
            inner_numerator,
            inner_denominator,
        }
    }

    /// Factor applied to the notated durations of the tuplet's content
    pub fn time_factor(&self) -> Rational {
        if self.inner_numerator == 0
            || self.outer_denominator == 0
            || self.inner_denominator == 0
        {
            return Rational::from_integer(1);
        }
        let outer = Rational::new(self.outer_numerator, self.outer_denominator);
        let inner = Rational::new(self.inner_numerator, self.inner_denominator);
        outer / inner
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tuplet {
    pub items: Vec<SequenceItem>,
    pub ratio: TupletRatio,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraceNoteGroup {
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OctaveShiftType {
    /// 8va: sounds an octave higher than written
    EightVa,
    /// 8vb: sounds an octave lower than written
    EightVb,
    FifteenMa,
    FifteenMb,
    TwentySecondMa,
    TwentySecondMb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OctaveShift {
    pub shift_type: OctaveShiftType,

    /// Metrical location (`bar:n/d`) of the last affected event
    pub end: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SequenceDirection {
    OctaveShift(OctaveShift),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SequenceItem {
    Event(Event),
    Tuplet(Tuplet),
    GraceNoteGroup(GraceNoteGroup),
    Direction(SequenceDirection),
}

impl SequenceItem {
    /// Whether this item is, or contains, the event with `event_id`
    pub fn contains_event(&self, event_id: &str) -> bool {
        match self {
            SequenceItem::Event(event) => event.event_id == event_id,
            SequenceItem::Tuplet(tuplet) => tuplet.find_item_idx_by_event(event_id).is_some(),
            SequenceItem::GraceNoteGroup(group) => {
                group.events.iter().any(|e| e.event_id == event_id)
            }
            SequenceItem::Direction(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookDirection {
    Forward,
    Backward,
}

/// Beam fragment attached to a single event
#[derive(Debug, Clone, PartialEq)]
pub struct BeamHook {
    pub event_id: String,
    pub direction: HookDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BeamChild {
    Beam(Beam),
    Hook(BeamHook),
}

/// A beam over events; secondary levels nest as children
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Beam {
    pub events: Vec<String>,
    pub children: Vec<BeamChild>,
}

impl Beam {
    pub fn child_beam_mut(&mut self, idx: usize) -> Option<&mut Beam> {
        match self.children.get_mut(idx) {
            Some(BeamChild::Beam(beam)) => Some(beam),
            _ => None,
        }
    }
}

/// Shared behaviour of sequences and tuplets: an ordered list of items
pub trait SequenceContent {
    fn items(&self) -> &[SequenceItem];
    fn items_mut(&mut self) -> &mut Vec<SequenceItem>;

    /// All events in document order, descending into tuplets and grace groups
    fn events(&self) -> Vec<&Event> {
        let mut out = Vec::new();
        collect_events(self.items(), &mut out);
        out
    }

    /// Sibling index of the item that is, or contains, the given event
    fn find_item_idx_by_event(&self, event_id: &str) -> Option<usize> {
        self.items().iter().position(|item| item.contains_event(event_id))
    }

    /// Replace the run of items from the one holding `first` to the one
    /// holding `last` with a single tuplet wrapping exactly that run
    fn fold_tuplet(&mut self, first: &str, last: &str, ratio: TupletRatio) -> Result<(), String> {
        let start = self.find_item_idx_by_event(first);
        let end = self.find_item_idx_by_event(last);
        match (start, end) {
            (Some(start), Some(end)) if start <= end => {
                let items = self.items_mut();
                let folded: Vec<SequenceItem> = items.drain(start..=end).collect();
                items.insert(start, SequenceItem::Tuplet(Tuplet { items: folded, ratio }));
                Ok(())
            }
            _ => Err(format!("Could not fold items from {} to {}", first, last)),
        }
    }

    fn event_mut(&mut self, event_id: &str) -> Option<&mut Event> {
        find_event_mut(self.items_mut(), event_id)
    }

    fn event_with_item_mut(&mut self, key: ItemKey) -> Option<&mut Event> {
        find_event_with_item_mut(self.items_mut(), key)
    }

    /// Insert `item` directly before the event with `event_id`, in whichever
    /// list holds it. Events inside a grace group get the item placed before
    /// the group. Hands the item back when the event is not here.
    fn insert_before_event(&mut self, event_id: &str, item: SequenceItem) -> Result<(), SequenceItem> {
        insert_before_event(self.items_mut(), event_id, item)
    }
}

fn collect_events<'a>(items: &'a [SequenceItem], out: &mut Vec<&'a Event>) {
    for item in items {
        match item {
            SequenceItem::Event(event) => out.push(event),
            SequenceItem::Tuplet(tuplet) => collect_events(&tuplet.items, out),
            SequenceItem::GraceNoteGroup(group) => out.extend(group.events.iter()),
            SequenceItem::Direction(_) => {}
        }
    }
}

fn find_event_mut<'a>(items: &'a mut [SequenceItem], event_id: &str) -> Option<&'a mut Event> {
    for item in items.iter_mut() {
        let found = match item {
            SequenceItem::Event(event) if event.event_id == event_id => Some(event),
            SequenceItem::Event(_) | SequenceItem::Direction(_) => None,
            SequenceItem::Tuplet(tuplet) => find_event_mut(&mut tuplet.items, event_id),
            SequenceItem::GraceNoteGroup(group) => {
                group.events.iter_mut().find(|e| e.event_id == event_id)
            }
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

fn find_event_with_item_mut(items: &mut [SequenceItem], key: ItemKey) -> Option<&mut Event> {
    for item in items.iter_mut() {
        let found = match item {
            SequenceItem::Event(event) if event.contains_item(key) => Some(event),
            SequenceItem::Event(_) | SequenceItem::Direction(_) => None,
            SequenceItem::Tuplet(tuplet) => find_event_with_item_mut(&mut tuplet.items, key),
            SequenceItem::GraceNoteGroup(group) => {
                group.events.iter_mut().find(|e| e.contains_item(key))
            }
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

fn insert_before_event(
    items: &mut Vec<SequenceItem>,
    event_id: &str,
    item: SequenceItem,
) -> Result<(), SequenceItem> {
    let mut item = item;
    for idx in 0..items.len() {
        let holds_event = match &items[idx] {
            SequenceItem::Event(event) => event.event_id == event_id,
            SequenceItem::GraceNoteGroup(group) => {
                group.events.iter().any(|e| e.event_id == event_id)
            }
            SequenceItem::Tuplet(_) | SequenceItem::Direction(_) => false,
        };
        if holds_event {
            items.insert(idx, item);
            return Ok(());
        }
        if let SequenceItem::Tuplet(tuplet) = &mut items[idx] {
            match insert_before_event(&mut tuplet.items, event_id, item) {
                Ok(()) => return Ok(()),
                Err(returned) => item = returned,
            }
        }
    }
    Err(item)
}

/// One voice within one part's bar
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sequence {
    pub sequence_id: String,
    pub items: Vec<SequenceItem>,

    /// Primary beams; secondary levels live inside them
    pub beams: Vec<Beam>,
}

impl Sequence {
    pub fn new(sequence_id: impl Into<String>) -> Self {
        Self {
            sequence_id: sequence_id.into(),
            items: Vec::new(),
            beams: Vec::new(),
        }
    }

    /// Last event sitting directly in this sequence
    pub fn last_event_mut(&mut self) -> Option<&mut Event> {
        self.items.iter_mut().rev().find_map(|item| match item {
            SequenceItem::Event(event) => Some(event),
            _ => None,
        })
    }

    /// Grace group at the end of the sequence, if the last item is one
    pub fn trailing_grace_group_mut(&mut self) -> Option<&mut GraceNoteGroup> {
        match self.items.last_mut() {
            Some(SequenceItem::GraceNoteGroup(group)) => Some(group),
            _ => None,
        }
    }
}

impl SequenceContent for Sequence {
    fn items(&self) -> &[SequenceItem] {
        &self.items
    }

    fn items_mut(&mut self) -> &mut Vec<SequenceItem> {
        &mut self.items
    }
}

impl SequenceContent for Tuplet {
    fn items(&self) -> &[SequenceItem] {
        &self.items
    }

    fn items_mut(&mut self) -> &mut Vec<SequenceItem> {
        &mut self.items
    }
}
