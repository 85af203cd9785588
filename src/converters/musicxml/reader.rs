//! MusicXML importer
//!
//! Walks a timewise document in order and builds a [`Score`]. MusicXML marks
//! ties, slurs, tuplets, beams and octave shifts with open/close markers on
//! individual notes; the reader keeps a registry of open structures for each
//! and resolves them into id references once the measure part is complete.
//!
//! Registry lifetimes:
//! - open ties: whole document, voice-agnostic
//! - open slurs: whole document, keyed by part and slur number
//! - open beams: per part, persisting across measures
//! - open tuplets: discarded (with a diagnostic) at the end of each measure part
//! - octave shift: one slot for the whole reader
//!
//! Queues of completed slurs, tuplets, beam markers and octave shifts drain
//! at the end of every measure part.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::converters::errors::ImportError;
use crate::converters::musicxml::parser::{
    ending_type, octave_shift_type, parse_accidental, parse_beam, parse_clef, parse_divisions,
    parse_duration, parse_ending_numbers, parse_key_fifths, parse_leading_int, parse_pitch,
    parse_time, parse_time_modification, parse_transpose, parse_type, slur_side,
    DIVISIONS_PER_WHOLE_NOTE,
};
use crate::converters::musicxml::xml::XmlElement;
use crate::converters::types::{Diagnostic, DiagnosticKind};
use crate::models::{
    Accidental, Bar, BarPart, Beam, BeamChild, BeamHook, BeamPath, Ending, EndingType, Event,
    EventItem, GraceNoteGroup, HookDirection, IncompleteSlur, ItemKey, KeySignature, Note,
    OctaveShift, OctaveShiftType, Part, Pitch, PositionedClef, Rational, Rest, RhythmicDuration,
    Score, Sequence, SequenceContent, SequenceDirection, SequenceItem, Slur, SlurKind,
    TupletRatio, DEFAULT_KEYSIG,
};

/// Where the measure part currently being read lives in the score
#[derive(Debug, Clone)]
struct MeasurePart {
    bar: usize,
    part_id: String,
    bar_part: usize,
}

#[derive(Debug, Clone)]
struct OpenTie {
    key: ItemKey,
    pitch: Pitch,
}

#[derive(Debug, Clone)]
struct OpenSlur {
    slur: Slur,
    start: ItemKey,
    start_default_x: Option<String>,
}

#[derive(Debug, Clone)]
struct CompletedSlur {
    slur: Slur,
    start: ItemKey,
    end: ItemKey,
    start_default_x: Option<String>,
}

#[derive(Debug, Clone)]
struct PendingTuplet {
    bar: usize,
    part_id: String,
    sequence_id: String,
    events: Vec<String>,
    ratio: TupletRatio,
}

#[derive(Debug, Clone)]
struct PendingBeams {
    bar: usize,
    part_id: String,
    sequence_id: String,
    event_id: String,
    beams: Vec<(i32, String)>,
}

#[derive(Debug, Clone)]
struct OpenOctaveShift {
    shift_type: OctaveShiftType,
    items: Vec<ItemKey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TieMarker {
    Start,
    Stop,
}

#[derive(Debug, Clone)]
struct SlurMarker {
    is_start: bool,
    number: i32,
    placement: Option<String>,
    default_x: Option<String>,
}

/// Everything one `<note>` element says, before it touches the score
#[derive(Debug, Default)]
struct NoteElement {
    voice: String,
    is_chord: bool,
    is_grace: bool,
    is_rest: bool,
    duration: i32,
    note_type: Option<Rational>,
    dots: u8,
    pitch: Option<Pitch>,
    accidental: Option<Accidental>,
    time_modification: Option<TupletRatio>,
    beams: Vec<(i32, String)>,
    ties: Vec<TieMarker>,
    slurs: Vec<SlurMarker>,
    tuplet_starts: Vec<String>,
    tuplet_stops: Vec<String>,
}

/// Importer state for one document
pub struct MusicXmlReader<'a> {
    root: &'a XmlElement,
    score: Score,
    part_divisions: HashMap<String, i32>,

    open_ties: Vec<OpenTie>,
    open_slurs: HashMap<(String, i32), OpenSlur>,
    complete_slurs: Vec<CompletedSlur>,
    open_tuplets: BTreeMap<String, Vec<String>>,
    current_tuplets: Vec<PendingTuplet>,
    open_beams: HashMap<String, BTreeMap<i32, BeamPath>>,
    current_beams: Vec<PendingBeams>,
    open_grace_voices: HashSet<String>,
    current_octave_shift: Option<OpenOctaveShift>,
    complete_octave_shifts: Vec<OpenOctaveShift>,

    next_event_id: u32,
    next_note_id: u32,
    next_item_key: u32,

    current_bar: Option<usize>,
    current_part: Option<String>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> MusicXmlReader<'a> {
    /// `root` must already be `score-timewise`
    pub fn new(root: &'a XmlElement) -> Self {
        Self {
            root,
            score: Score::new(),
            part_divisions: HashMap::new(),
            open_ties: Vec::new(),
            open_slurs: HashMap::new(),
            complete_slurs: Vec::new(),
            open_tuplets: BTreeMap::new(),
            current_tuplets: Vec::new(),
            open_beams: HashMap::new(),
            current_beams: Vec::new(),
            open_grace_voices: HashSet::new(),
            current_octave_shift: None,
            complete_octave_shifts: Vec::new(),
            next_event_id: 1,
            next_note_id: 1,
            next_item_key: 1,
            current_bar: None,
            current_part: None,
            diagnostics: Vec::new(),
        }
    }

    /// Build the score, returning it with every tolerated anomaly found
    pub fn read(mut self) -> Result<(Score, Vec<Diagnostic>), ImportError> {
        self.parse_part_list()?;
        self.parse_measures()?;
        self.report_unclosed_structures();
        log::debug!(
            "Read {} parts, {} bars, {} diagnostics",
            self.score.parts.len(),
            self.score.bars.len(),
            self.diagnostics.len()
        );
        Ok((self.score, self.diagnostics))
    }

    fn add_diagnostic(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.diagnostics.push(Diagnostic {
            kind,
            bar: self.current_bar,
            part_id: self.current_part.clone(),
            message,
        });
    }

    fn next_key(&mut self) -> ItemKey {
        let key = ItemKey(self.next_item_key);
        self.next_item_key += 1;
        key
    }

    fn divisions(&self, part_id: &str) -> Result<i32, ImportError> {
        self.part_divisions.get(part_id).copied().ok_or_else(|| {
            ImportError::data(format!(
                "Part {} has no <divisions> before its first <duration>.",
                part_id
            ))
        })
    }

    /// Divisions per whole note, the denominator of every position and
    /// duration read from `<duration>`
    fn whole_note_divisions(&self, part_id: &str) -> Result<i32, ImportError> {
        let divisions = self.divisions(part_id)?;
        divisions.checked_mul(DIVISIONS_PER_WHOLE_NOTE).ok_or_else(|| {
            ImportError::data(format!("<divisions> {} in part {} is too large.", divisions, part_id))
        })
    }

    // ===== PARTS =====

    fn parse_part_list(&mut self) -> Result<(), ImportError> {
        let root = self.root;
        let Some(part_list) = root.descendant("part-list") else {
            return Ok(());
        };

        for score_part in part_list.descendants_named("score-part") {
            let part_id = score_part
                .attribute("id")
                .ok_or_else(|| ImportError::data("<score-part> is missing an 'id' attribute."))?;
            let name = score_part.descendant("part-name").map(|el| el.text().to_string());
            let transpose = self.first_measure_transpose(part_id);
            self.score.parts.push(Part::new(part_id, name, transpose));
        }
        Ok(())
    }

    /// Transpose declared in the part's first measure, 0 when absent
    fn first_measure_transpose(&mut self, part_id: &str) -> i32 {
        let root = self.root;
        let transpose_el = root
            .children_named("measure")
            .flat_map(|measure| measure.children_named("part"))
            .find(|part| part.attribute("id") == Some(part_id))
            .and_then(|part| {
                part.children_named("attributes")
                    .find_map(|attributes| attributes.child("transpose"))
            });

        let Some(transpose_el) = transpose_el else {
            return 0;
        };

        let (semitones, invalid) = parse_transpose(transpose_el);
        for value in invalid {
            self.add_diagnostic(
                DiagnosticKind::InvalidTranspose,
                format!("Ignoring non-integer transpose {} in part {}", value, part_id),
            );
        }
        semitones
    }

    // ===== MEASURES =====

    fn parse_measures(&mut self) -> Result<(), ImportError> {
        let root = self.root;
        for (idx, measure_el) in root.children_named("measure").enumerate() {
            log::debug!("Reading measure {}", measure_el.attribute("number").unwrap_or("?"));
            self.score.bars.push(Bar::new(idx));

            for (position, part_el) in measure_el.children_named("part").enumerate() {
                let part_id = self.resolve_part_id(part_el, position)?;
                self.parse_measure_part(part_el, idx, part_id)?;
            }
        }
        self.current_bar = None;
        self.current_part = None;
        Ok(())
    }

    /// Match a measure's `<part>` to a declared part by id, falling back to
    /// its position among the measure's parts
    fn resolve_part_id(&self, part_el: &XmlElement, position: usize) -> Result<String, ImportError> {
        if let Some(part) = part_el.attribute("id").and_then(|id| self.score.part(id)) {
            return Ok(part.part_id.clone());
        }
        self.score
            .parts
            .get(position)
            .map(|part| part.part_id.clone())
            .ok_or_else(|| {
                ImportError::data(format!(
                    "<part id=\"{}\"> is not declared in <part-list>.",
                    part_el.attribute("id").unwrap_or("")
                ))
            })
    }

    fn parse_measure_part(
        &mut self,
        part_el: &XmlElement,
        bar: usize,
        part_id: String,
    ) -> Result<(), ImportError> {
        self.current_bar = Some(bar);
        self.current_part = Some(part_id.clone());

        let bar_parts = &mut self.score.bars[bar].bar_parts;
        bar_parts.push(BarPart::new(part_id.clone()));
        let cursor = MeasurePart {
            bar,
            part_id,
            bar_part: bar_parts.len() - 1,
        };

        let mut position = 0;
        for el in &part_el.children {
            match el.name.as_str() {
                "attributes" => self.parse_attributes(el, &cursor, position)?,
                "backup" => position = position.saturating_sub(self.parse_forward_backup(el)),
                "forward" => position = position.saturating_add(self.parse_forward_backup(el)),
                "barline" => self.parse_barline(el, bar)?,
                "direction" => self.parse_direction(el)?,
                "note" => position = position.saturating_add(self.parse_note(el, &cursor)?),
                _ => {}
            }
        }
        self.open_grace_voices.clear();

        self.resolve_slurs();
        self.discard_open_tuplets();
        self.fold_tuplets()?;
        self.process_beams(&cursor.part_id)?;
        self.insert_octave_shifts()
    }

    fn parse_attributes(
        &mut self,
        attributes_el: &XmlElement,
        cursor: &MeasurePart,
        position: i32,
    ) -> Result<(), ImportError> {
        for el in &attributes_el.children {
            match el.name.as_str() {
                "clef" => {
                    let clef = parse_clef(el, &cursor.part_id)?;
                    let offset = if position == 0 {
                        Rational::from_integer(0)
                    } else {
                        Rational::new(position, self.whole_note_divisions(&cursor.part_id)?)
                    };
                    self.score.bars[cursor.bar].bar_parts[cursor.bar_part]
                        .clefs
                        .push(PositionedClef { clef, position: offset });
                }
                "divisions" => {
                    let divisions = parse_divisions(el)?;
                    self.part_divisions.insert(cursor.part_id.clone(), divisions);
                }
                "key" => {
                    let key = self.parse_key(el, &cursor.part_id);
                    self.score.bars[cursor.bar].key_signature = Some(key);
                }
                "time" => {
                    self.score.bars[cursor.bar].time_signature = Some(parse_time(el)?);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Key in concert pitch. Anything unusable falls back to C major.
    fn parse_key(&mut self, key_el: &XmlElement, part_id: &str) -> KeySignature {
        let transpose = self.score.part(part_id).map_or(0, |part| part.transpose);

        let fifths = match parse_key_fifths(key_el) {
            Some(fifths) => fifths,
            None => {
                self.add_diagnostic(DiagnosticKind::InvalidKey, "<key> has no valid <fifths>");
                DEFAULT_KEYSIG
            }
        };

        match KeySignature::new(fifths).to_concert(transpose) {
            Ok(key) => key,
            Err(message) => {
                self.add_diagnostic(DiagnosticKind::InvalidKey, message);
                KeySignature::new(DEFAULT_KEYSIG)
                    .to_concert(transpose)
                    .unwrap_or_default()
            }
        }
    }

    fn parse_forward_backup(&mut self, el: &XmlElement) -> i32 {
        self.open_grace_voices.clear();
        let Some(duration_el) = el.child("duration") else {
            return 0;
        };
        self.read_duration(duration_el)
    }

    fn read_duration(&mut self, duration_el: &XmlElement) -> i32 {
        match parse_duration(duration_el) {
            Some(duration) => duration,
            None => {
                self.add_diagnostic(
                    DiagnosticKind::InvalidDuration,
                    format!("Treating <duration> \"{}\" as 0", duration_el.text()),
                );
                0
            }
        }
    }

    fn parse_barline(&mut self, barline_el: &XmlElement, bar: usize) -> Result<(), ImportError> {
        for el in &barline_el.children {
            match el.name.as_str() {
                "ending" => match el.attribute("type").and_then(ending_type) {
                    Some(EndingType::Start) => {
                        let numbers = parse_ending_numbers(el.attribute("number").unwrap_or(""));
                        if !numbers.is_empty() {
                            self.score.bars[bar].start_ending = Some(Ending {
                                ending_type: EndingType::Start,
                                numbers,
                            });
                        }
                    }
                    Some(ending_type) => {
                        self.score.bars[bar].stop_ending = Some(Ending {
                            ending_type,
                            numbers: Vec::new(),
                        });
                    }
                    None => {}
                },
                "repeat" => {
                    let direction = el.attribute("direction").filter(|d| !d.is_empty()).ok_or_else(
                        || ImportError::data("<repeat> is missing a 'direction' attribute."),
                    )?;
                    match direction {
                        "forward" => self.score.bars[bar].repeat_start = true,
                        "backward" => {
                            let times = self.parse_repeat_times(el.attribute("times"));
                            self.score.bars[bar].repeat_end = Some(times);
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_repeat_times(&mut self, times: Option<&str>) -> u32 {
        let Some(times) = times else {
            return 2;
        };
        match parse_leading_int(times) {
            Some(count) if count > 0 => count as u32,
            _ => {
                self.add_diagnostic(
                    DiagnosticKind::InvalidRepeatTimes,
                    format!("Invalid repeat times \"{}\", using 2", times),
                );
                2
            }
        }
    }

    // ===== DIRECTIONS =====

    fn parse_direction(&mut self, direction_el: &XmlElement) -> Result<(), ImportError> {
        for direction_type in direction_el.children_named("direction-type") {
            for el in direction_type.children_named("octave-shift") {
                self.parse_octave_shift(el)?;
            }
        }
        Ok(())
    }

    fn parse_octave_shift(&mut self, el: &XmlElement) -> Result<(), ImportError> {
        match el.attribute("type") {
            Some(direction @ ("up" | "down")) => {
                let size = el.attribute("size").unwrap_or("8");
                let shift_type = octave_shift_type(size, direction).ok_or_else(|| {
                    ImportError::data("<octave-shift> has an unsupported type/size combination.")
                })?;
                if self.current_octave_shift.is_some() {
                    log::debug!("Octave shift started while another is open; replacing it");
                }
                self.current_octave_shift = Some(OpenOctaveShift {
                    shift_type,
                    items: Vec::new(),
                });
            }
            Some("stop") => match self.current_octave_shift.take() {
                None => self.add_diagnostic(
                    DiagnosticKind::UnmatchedOctaveShiftStop,
                    "Got <octave-shift type=\"stop\"> with no open octave shift",
                ),
                Some(shift) if shift.items.is_empty() => self.add_diagnostic(
                    DiagnosticKind::UnmatchedOctaveShiftStop,
                    "Octave shift stopped before covering any note",
                ),
                Some(shift) => self.complete_octave_shifts.push(shift),
            },
            _ => {}
        }
        Ok(())
    }

    // ===== NOTES =====

    fn read_note_element(&mut self, note_el: &XmlElement) -> Result<NoteElement, ImportError> {
        let mut note = NoteElement::default();

        for el in &note_el.children {
            match el.name.as_str() {
                "accidental" => note.accidental = Some(parse_accidental(el)?),
                "beam" => note.beams.push(parse_beam(el)?),
                "chord" => note.is_chord = true,
                "dot" => note.dots += 1,
                "duration" => note.duration = self.read_duration(el),
                "grace" => note.is_grace = true,
                "notations" => read_notations(el, &mut note),
                "pitch" => note.pitch = Some(parse_pitch(el)?),
                "rest" => note.is_rest = true,
                "time-modification" => {
                    note.time_modification = Some(parse_time_modification(el, note.note_type)?)
                }
                "type" => note.note_type = Some(parse_type(el)?),
                "voice" => note.voice = el.text().to_string(),
                _ => {}
            }
        }
        if note.voice.is_empty() {
            note.voice = "1".to_string();
        }

        Ok(note)
    }

    /// Read one `<note>` and return how far it advances the position
    fn parse_note(&mut self, note_el: &XmlElement, cursor: &MeasurePart) -> Result<i32, ImportError> {
        let note = self.read_note_element(note_el)?;

        if note.time_modification.is_none() && !note.tuplet_stops.is_empty() {
            return Err(ImportError::data("<note> is missing a valid <time-modification>"));
        }

        let duration = match note.note_type {
            Some(frac) => RhythmicDuration::new(frac, note.dots),
            None => {
                let whole = self.whole_note_divisions(&cursor.part_id)?;
                RhythmicDuration::plain(Rational::new(note.duration, whole))
            }
        };

        let key = self.next_key();
        let item = self.build_event_item(&note, key)?;
        let event_id = self.place_item(&note, cursor, duration, item)?;

        self.register_tuplets(&note, cursor, &event_id);

        if !note.beams.is_empty() {
            self.current_beams.push(PendingBeams {
                bar: cursor.bar,
                part_id: cursor.part_id.clone(),
                sequence_id: note.voice.clone(),
                event_id,
                beams: note.beams.clone(),
            });
        }

        if let Some(shift) = self.current_octave_shift.as_mut() {
            shift.items.push(key);
        }

        self.register_slurs(&note, &cursor.part_id, key);

        Ok(if note.is_chord { 0 } else { note.duration })
    }

    /// The note or rest itself, with ties resolved against earlier notes
    fn build_event_item(&mut self, note: &NoteElement, key: ItemKey) -> Result<EventItem, ImportError> {
        if note.is_rest {
            if !note.ties.is_empty() {
                return Err(ImportError::data("<tied> needs a pitched <note>."));
            }
            return Ok(EventItem::Rest(Rest { key }));
        }

        let pitch = note
            .pitch
            .ok_or_else(|| ImportError::data("The <note> is missing <pitch>."))?;
        let mut item = Note::new(key, format!("note{}", self.next_note_id), pitch);
        self.next_note_id += 1;
        item.rendered_accidental = note.accidental;

        for tie in &note.ties {
            match tie {
                TieMarker::Start => self.open_ties.push(OpenTie { key, pitch }),
                TieMarker::Stop => {
                    let open = self
                        .open_ties
                        .iter()
                        .position(|tie| tie.key != key && tie.pitch == pitch);
                    match open {
                        Some(idx) => {
                            let start = self.open_ties.remove(idx);
                            if let Some(start_note) = self.score.note_mut(start.key) {
                                start_note.tie_end_note = Some(item.note_id.clone());
                                item.is_referenced = true;
                            }
                        }
                        None => self.add_diagnostic(
                            DiagnosticKind::UnmatchedTieStop,
                            format!("Got <tied type=\"stop\"> on {} with no open tie", pitch),
                        ),
                    }
                }
            }
        }

        Ok(EventItem::Note(item))
    }

    /// Put the item into a new event, or into the previous event for a chord
    /// note. Returns the event id.
    fn place_item(
        &mut self,
        note: &NoteElement,
        cursor: &MeasurePart,
        duration: RhythmicDuration,
        item: EventItem,
    ) -> Result<String, ImportError> {
        let in_grace_group = self.open_grace_voices.contains(&note.voice);
        let sequence = self.score.bars[cursor.bar].bar_parts[cursor.bar_part]
            .get_or_create_sequence(&note.voice);

        let chord_event_id = if note.is_chord {
            match chord_target(sequence, in_grace_group) {
                Some(event) if event.duration != duration => {
                    return Err(ImportError::data(
                        "Two separate <note>s within the same chord had different durations.",
                    ));
                }
                Some(event) => Some(event.event_id.clone()),
                None => None,
            }
        } else {
            None
        };

        let event_id = match chord_event_id {
            Some(event_id) => event_id,
            None => {
                let event_id = format!("ev{}", self.next_event_id);
                self.next_event_id += 1;
                let event = Event::new(event_id.clone(), duration);

                if note.is_grace && !note.is_chord {
                    match sequence.trailing_grace_group_mut().filter(|_| in_grace_group) {
                        Some(group) => group.events.push(event),
                        None => {
                            sequence.items.push(SequenceItem::GraceNoteGroup(GraceNoteGroup {
                                events: vec![event],
                            }));
                            self.open_grace_voices.insert(note.voice.clone());
                        }
                    }
                } else {
                    if !note.is_chord {
                        self.open_grace_voices.remove(&note.voice);
                    }
                    sequence.items.push(SequenceItem::Event(event));
                }
                event_id
            }
        };

        let event = sequence
            .event_mut(&event_id)
            .ok_or_else(|| ImportError::data(format!("Lost track of event {}", event_id)))?;
        event.items.push(item);
        Ok(event_id)
    }

    fn register_tuplets(&mut self, note: &NoteElement, cursor: &MeasurePart, event_id: &str) {
        for number in &note.tuplet_starts {
            self.open_tuplets.insert(number.clone(), Vec::new());
        }

        for events in self.open_tuplets.values_mut() {
            if events.last().map(String::as_str) != Some(event_id) {
                events.push(event_id.to_string());
            }
        }

        let Some(ratio) = note.time_modification else {
            return;
        };
        for number in &note.tuplet_stops {
            match self.open_tuplets.remove(number) {
                Some(events) => self.current_tuplets.push(PendingTuplet {
                    bar: cursor.bar,
                    part_id: cursor.part_id.clone(),
                    sequence_id: note.voice.clone(),
                    events,
                    ratio,
                }),
                None => log::debug!("Ignoring stop for tuplet {} that was never started", number),
            }
        }
    }

    fn register_slurs(&mut self, note: &NoteElement, part_id: &str, key: ItemKey) {
        for marker in &note.slurs {
            let slot = (part_id.to_string(), marker.number);
            if marker.is_start {
                self.open_slurs.insert(
                    slot,
                    OpenSlur {
                        slur: Slur::new(slur_side(marker.placement.as_deref())),
                        start: key,
                        start_default_x: marker.default_x.clone(),
                    },
                );
                continue;
            }

            match self.open_slurs.remove(&slot) {
                Some(open) => self.complete_slurs.push(CompletedSlur {
                    slur: open.slur,
                    start: open.start,
                    end: key,
                    start_default_x: open.start_default_x,
                }),
                None => self.add_diagnostic(
                    DiagnosticKind::UnmatchedSlurStop,
                    format!(
                        "Got <slur type=\"stop\" number=\"{}\"> without a matching start",
                        marker.number
                    ),
                ),
            }
        }
    }

    // ===== RESOLUTION =====

    fn resolve_slurs(&mut self) {
        let completed = std::mem::take(&mut self.complete_slurs);
        let anchors: Vec<Option<(String, String)>> = completed
            .iter()
            .map(|slur| {
                let start = self.score.event_containing_item(slur.start)?.event_id.clone();
                let end = self.score.event_containing_item(slur.end)?.event_id.clone();
                Some((start, end))
            })
            .collect();

        for (idx, done) in completed.into_iter().enumerate() {
            let Some((start_event, end_event)) = anchors[idx].clone() else {
                self.add_diagnostic(
                    DiagnosticKind::UnsupportedSlurAnchor,
                    "Dropping slur whose notes could not be found",
                );
                continue;
            };

            let mut slur = done.slur;
            if start_event == end_event {
                let incoming = done
                    .start_default_x
                    .as_deref()
                    .and_then(parse_leading_int)
                    .is_some_and(|x| x < 0);
                slur.kind = Some(SlurKind::Incomplete(if incoming {
                    IncompleteSlur::Incoming
                } else {
                    IncompleteSlur::Outgoing
                }));
            } else {
                if let Some(event) = self.score.event_mut(&end_event) {
                    event.is_referenced = true;
                }

                // Two slurs over the same pair of events belong to
                // different notes of the chords
                let shares_events = anchors.iter().enumerate().any(|(other, anchor)| {
                    other != idx
                        && anchor.as_ref().is_some_and(|(s, e)| *s == start_event && *e == end_event)
                });
                let (start_note, end_note) = if shares_events {
                    (self.reference_note(done.start), self.reference_note(done.end))
                } else {
                    (None, None)
                };

                slur.kind = Some(SlurKind::Complete {
                    target: end_event,
                    start_note,
                    end_note,
                });
            }

            if let Some(event) = self.score.event_mut(&start_event) {
                event.slurs.push(slur);
            }
        }
    }

    /// Mark a note referenced and return its id. Rests have no id.
    fn reference_note(&mut self, key: ItemKey) -> Option<String> {
        let note = self.score.note_mut(key)?;
        note.is_referenced = true;
        Some(note.note_id.clone())
    }

    fn discard_open_tuplets(&mut self) {
        let unclosed = std::mem::take(&mut self.open_tuplets);
        for (number, events) in unclosed {
            self.add_diagnostic(
                DiagnosticKind::UnclosedTuplet,
                format!(
                    "Tuplet {} over {} event(s) was not closed in its measure",
                    number,
                    events.len()
                ),
            );
        }
    }

    fn fold_tuplets(&mut self) -> Result<(), ImportError> {
        let mut pending = std::mem::take(&mut self.current_tuplets);
        // Inner tuplets first, so an outer fold sees them as single items
        pending.sort_by_key(|tuplet| tuplet.events.len());

        for tuplet in pending {
            let (Some(first), Some(last)) = (tuplet.events.first(), tuplet.events.last()) else {
                continue;
            };
            let sequence = self
                .score
                .sequence_mut(tuplet.bar, &tuplet.part_id, &tuplet.sequence_id)
                .ok_or_else(|| {
                    ImportError::data(format!("Tuplet voice {} disappeared", tuplet.sequence_id))
                })?;
            sequence
                .fold_tuplet(first, last, tuplet.ratio)
                .map_err(ImportError::Data)?;
        }
        Ok(())
    }

    fn process_beams(&mut self, part_id: &str) -> Result<(), ImportError> {
        let pending = std::mem::take(&mut self.current_beams);
        let mut open = self.open_beams.remove(part_id).unwrap_or_default();

        for entry in pending {
            if let Some(event) = self.score.event_mut(&entry.event_id) {
                event.is_referenced = true;
            }

            let mut beams = entry.beams.clone();
            beams.sort_by_key(|(number, _)| *number);
            let mut pending_ends = Vec::new();

            for (number, value) in beams {
                match value.as_str() {
                    "begin" => {
                        let path = self.begin_beam(&entry, number, &open)?;
                        open.insert(number, path);
                    }
                    "continue" | "end" => {
                        let beam = open.get(&number).and_then(|path| self.score.beam_mut(path));
                        match beam {
                            Some(beam) => {
                                beam.events.push(entry.event_id.clone());
                                if value == "end" {
                                    pending_ends.push(number);
                                }
                            }
                            None => self.add_diagnostic(
                                DiagnosticKind::UnmatchedBeam,
                                format!(
                                    "Got <beam number=\"{}\">{}</beam> on {} with no open beam",
                                    number, value, entry.event_id
                                ),
                            ),
                        }
                    }
                    "forward hook" | "backward hook" => {
                        let direction = if value == "forward hook" {
                            HookDirection::Forward
                        } else {
                            HookDirection::Backward
                        };
                        let parent = open
                            .get(&(number - 1))
                            .and_then(|path| self.score.beam_mut(path))
                            .ok_or_else(|| beam_nesting_error(number))?;
                        parent.children.push(BeamChild::Hook(BeamHook {
                            event_id: entry.event_id.clone(),
                            direction,
                        }));
                    }
                    other => log::debug!("Ignoring beam value \"{}\"", other),
                }
            }

            for number in pending_ends {
                open.remove(&number);
            }
        }

        self.open_beams.insert(part_id.to_string(), open);
        Ok(())
    }

    fn begin_beam(
        &mut self,
        entry: &PendingBeams,
        number: i32,
        open: &BTreeMap<i32, BeamPath>,
    ) -> Result<BeamPath, ImportError> {
        let beam = Beam {
            events: vec![entry.event_id.clone()],
            children: Vec::new(),
        };

        if number == 1 {
            let sequence = self
                .score
                .sequence_mut(entry.bar, &entry.part_id, &entry.sequence_id)
                .ok_or_else(|| {
                    ImportError::data(format!("Beamed voice {} disappeared", entry.sequence_id))
                })?;
            sequence.beams.push(beam);
            return Ok(BeamPath {
                bar: entry.bar,
                part_id: entry.part_id.clone(),
                sequence_id: entry.sequence_id.clone(),
                root: sequence.beams.len() - 1,
                children: Vec::new(),
            });
        }

        let parent_path = open
            .get(&(number - 1))
            .ok_or_else(|| beam_nesting_error(number))?;
        let parent = self
            .score
            .beam_mut(parent_path)
            .ok_or_else(|| beam_nesting_error(number))?;
        parent.children.push(BeamChild::Beam(beam));

        let mut path = parent_path.clone();
        path.children.push(parent.children.len() - 1);
        Ok(path)
    }

    fn insert_octave_shifts(&mut self) -> Result<(), ImportError> {
        for shift in std::mem::take(&mut self.complete_octave_shifts) {
            let (Some(first), Some(last)) = (shift.items.first(), shift.items.last()) else {
                continue;
            };
            let start_event = self
                .score
                .event_containing_item(*first)
                .map(|event| event.event_id.clone())
                .ok_or_else(|| ImportError::data("Octave shift start note not found"))?;
            let end = self
                .score
                .event_containing_item(*last)
                .and_then(|event| self.score.event_measure_location(&event.event_id))
                .ok_or_else(|| ImportError::data("Octave shift end note not found"))?;

            let direction = SequenceItem::Direction(SequenceDirection::OctaveShift(OctaveShift {
                shift_type: shift.shift_type,
                end,
            }));
            self.score
                .insert_before_event(&start_event, direction)
                .map_err(|_| {
                    ImportError::data(format!("Could not place octave shift before {}", start_event))
                })?;
        }
        Ok(())
    }

    fn report_unclosed_structures(&mut self) {
        let part_ids: Vec<String> = self.score.parts.iter().map(|p| p.part_id.clone()).collect();
        for part_id in part_ids {
            let numbers: Vec<i32> = self
                .open_beams
                .get(&part_id)
                .map(|open| open.keys().copied().collect())
                .unwrap_or_default();
            for number in numbers {
                self.current_part = Some(part_id.clone());
                self.add_diagnostic(
                    DiagnosticKind::UnclosedBeam,
                    format!("Beam {} in part {} was never ended", number, part_id),
                );
            }
        }
        self.current_part = None;

        if self.current_octave_shift.is_some() {
            log::debug!("Octave shift still open at the end of the document");
        }
    }
}

fn read_notations(notations_el: &XmlElement, note: &mut NoteElement) {
    for el in &notations_el.children {
        match el.name.as_str() {
            "tied" => match el.attribute("type") {
                Some("start") => note.ties.push(TieMarker::Start),
                Some("stop") => note.ties.push(TieMarker::Stop),
                _ => {}
            },
            "slur" => {
                let is_start = match el.attribute("type") {
                    Some("start") => true,
                    Some("stop") => false,
                    _ => continue,
                };
                let number = el
                    .attribute("number")
                    .and_then(parse_leading_int)
                    .filter(|n| *n != 0)
                    .unwrap_or(1);
                note.slurs.push(SlurMarker {
                    is_start,
                    number,
                    placement: el.attribute("placement").map(str::to_string),
                    default_x: el.attribute("default-x").map(str::to_string),
                });
            }
            "tuplet" => {
                let number = el.attribute("number").unwrap_or("1").to_string();
                match el.attribute("type") {
                    Some("start") => note.tuplet_starts.push(number),
                    Some("stop") => note.tuplet_stops.push(number),
                    _ => {}
                }
            }
            _ => {}
        }
    }
}

/// Event a chord note joins: the last one in the open grace group, or the
/// last top-level event of the voice
fn chord_target(sequence: &mut Sequence, in_grace_group: bool) -> Option<&mut Event> {
    if in_grace_group {
        sequence
            .trailing_grace_group_mut()
            .and_then(|group| group.events.last_mut())
    } else {
        sequence.last_event_mut()
    }
}

fn beam_nesting_error(number: i32) -> ImportError {
    ImportError::data(format!(
        "Got <beam number=\"{}\"> outside of <beam number=\"{}\">",
        number,
        number - 1
    ))
}
