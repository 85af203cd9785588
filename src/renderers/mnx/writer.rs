//! Score → MNX document
//!
//! A read-only walk over a resolved [`Score`]. Every cross-reference (tie
//! targets, slur targets, beam members, octave-shift ends) was settled by
//! the importer; the writer only translates structure and vocabulary.

use crate::converters::errors::ExportError;
use crate::converters::types::ConversionSettings;
use crate::models::{
    Bar, BarPart, Beam, BeamChild, Event, GraceNoteGroup, HookDirection, IncompleteSlur, Note,
    OctaveShift, OctaveShiftType, Part, PositionedClef, Rational, Score, Sequence,
    SequenceDirection, SequenceItem, Slur, SlurKind, SlurSide, Tuplet,
};
use crate::renderers::mnx::duration::{encode_note_value, note_value_base};
use crate::renderers::mnx::types::*;

/// Export an already-built score
pub fn write_mnx(score: &Score, settings: &ConversionSettings) -> Result<MnxDocument, ExportError> {
    MnxWriter::new(score, settings).write()
}

pub struct MnxWriter<'a> {
    score: &'a Score,
    settings: &'a ConversionSettings,
}

impl<'a> MnxWriter<'a> {
    pub fn new(score: &'a Score, settings: &'a ConversionSettings) -> Self {
        Self { score, settings }
    }

    pub fn write(&self) -> Result<MnxDocument, ExportError> {
        log::debug!(
            "Writing MNX for {} part(s), {} bar(s)",
            self.score.parts.len(),
            self.score.bars.len()
        );

        let measures = self
            .score
            .bars
            .iter()
            .map(|bar| self.encode_global_measure(bar))
            .collect();

        let parts = self
            .score
            .parts
            .iter()
            .map(|part| self.encode_part(part))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MnxDocument {
            mnx: MnxHeader {
                version: self.settings.mnx_version,
            },
            global: MnxGlobal { measures },
            parts,
        })
    }

    // ===== GLOBAL =====

    fn encode_global_measure(&self, bar: &Bar) -> MnxGlobalMeasure {
        let time = bar
            .time_signature
            .filter(|_| self.score.time_signature_changed(bar.index))
            .map(|time| MnxTime {
                count: time.count,
                unit: time.unit,
            });

        let key = bar
            .key_signature
            .filter(|_| self.score.key_signature_changed(bar.index))
            .map(|key| MnxKey { fifths: key.fifths });

        MnxGlobalMeasure {
            time,
            key,
            repeat_start: bar.repeat_start.then(EmptyObject::default),
            repeat_end: bar.repeat_end.map(|times| MnxRepeatEnd {
                times: (times > 2).then_some(times),
            }),
            // Stop endings have no MNX counterpart here
            ending: bar.start_ending.as_ref().map(|ending| MnxEnding {
                numbers: ending.numbers.clone(),
            }),
        }
    }

    // ===== PARTS =====

    fn encode_part(&self, part: &Part) -> Result<MnxPart, ExportError> {
        let measures = self
            .score
            .bars
            .iter()
            .map(|bar| match bar.bar_part(&part.part_id) {
                Some(bar_part) => self.encode_part_measure(bar_part),
                None => Ok(MnxPartMeasure {
                    sequences: Vec::new(),
                    clefs: None,
                    beams: None,
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MnxPart {
            name: part.name.clone(),
            measures,
        })
    }

    fn encode_part_measure(&self, bar_part: &BarPart) -> Result<MnxPartMeasure, ExportError> {
        let sequences = bar_part
            .sequences
            .iter()
            .map(|sequence| self.encode_sequence(sequence))
            .collect::<Result<Vec<_>, _>>()?;

        let clefs = if bar_part.clefs.is_empty() {
            None
        } else {
            Some(bar_part.clefs.iter().map(encode_positioned_clef).collect())
        };

        let beams = if self.settings.include_beams {
            let beams: Vec<MnxBeam> = bar_part
                .sequences
                .iter()
                .flat_map(|sequence| sequence.beams.iter())
                .map(encode_beam)
                .collect();
            (!beams.is_empty()).then_some(beams)
        } else {
            None
        };

        Ok(MnxPartMeasure {
            sequences,
            clefs,
            beams,
        })
    }

    fn encode_sequence(&self, sequence: &Sequence) -> Result<MnxSequence, ExportError> {
        Ok(MnxSequence {
            content: self.encode_items(&sequence.items)?,
        })
    }

    // ===== SEQUENCE CONTENT =====

    fn encode_items(&self, items: &[SequenceItem]) -> Result<Vec<MnxContent>, ExportError> {
        items.iter().map(|item| self.encode_item(item)).collect()
    }

    fn encode_item(&self, item: &SequenceItem) -> Result<MnxContent, ExportError> {
        match item {
            SequenceItem::Event(event) => Ok(MnxContent::Event(self.encode_event(event)?)),
            SequenceItem::Tuplet(tuplet) => Ok(MnxContent::Tuplet(self.encode_tuplet(tuplet)?)),
            SequenceItem::GraceNoteGroup(group) => Ok(MnxContent::Grace(self.encode_grace(group)?)),
            SequenceItem::Direction(SequenceDirection::OctaveShift(shift)) => {
                Ok(MnxContent::OctaveShift(encode_octave_shift(shift)))
            }
        }
    }

    fn encode_event(&self, event: &Event) -> Result<MnxEvent, ExportError> {
        let duration = encode_note_value(&event.duration)?;

        let (rest, notes) = if event.is_rest() {
            (Some(EmptyObject::default()), None)
        } else {
            (None, Some(event.notes().map(encode_note).collect()))
        };

        let slurs: Vec<MnxSlur> = event.slurs.iter().filter_map(encode_slur).collect();

        Ok(MnxEvent {
            duration,
            id: event.is_referenced.then(|| event.event_id.clone()),
            rest,
            notes,
            slurs: (!slurs.is_empty()).then_some(slurs),
        })
    }

    fn encode_tuplet(&self, tuplet: &Tuplet) -> Result<MnxTuplet, ExportError> {
        let ratio = &tuplet.ratio;
        Ok(MnxTuplet {
            inner: encode_quantity(ratio.inner_numerator, ratio.inner_denominator)?,
            outer: encode_quantity(ratio.outer_numerator, ratio.outer_denominator)?,
            content: self.encode_items(&tuplet.items)?,
        })
    }

    fn encode_grace(&self, group: &GraceNoteGroup) -> Result<MnxGrace, ExportError> {
        let content = group
            .events
            .iter()
            .map(|event| self.encode_event(event).map(MnxContent::Event))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MnxGrace { content })
    }
}

/// `multiple` notes of value `1/denominator`
fn encode_quantity(multiple: i32, denominator: i32) -> Result<MnxNoteValueQuantity, ExportError> {
    if denominator <= 0 {
        return Err(ExportError::UnmappedDuration(format!("1/{}", denominator)));
    }
    Ok(MnxNoteValueQuantity {
        duration: MnxNoteValue {
            base: note_value_base(&Rational::new(1, denominator))?.to_string(),
            dots: None,
        },
        multiple,
    })
}

fn encode_note(note: &Note) -> MnxNote {
    let pitch = &note.pitch;
    MnxNote {
        pitch: MnxPitch {
            step: pitch.step.as_str().to_string(),
            octave: pitch.octave,
            alter: (pitch.alter != 0).then_some(pitch.alter),
        },
        id: note.is_referenced.then(|| note.note_id.clone()),
        accidental_display: note
            .rendered_accidental
            .map(|_| MnxAccidentalDisplay { show: true }),
        tied: note.tie_end_note.as_ref().map(|target| MnxTied {
            target: target.clone(),
        }),
    }
}

/// `None` when the slur never got enough data to be valid MNX
fn encode_slur(slur: &Slur) -> Option<MnxSlur> {
    let mut result = match slur.kind.as_ref()? {
        SlurKind::Incomplete(location) => MnxSlur {
            location: Some(
                match location {
                    IncompleteSlur::Incoming => "incoming",
                    IncompleteSlur::Outgoing => "outgoing",
                }
                .to_string(),
            ),
            ..MnxSlur::default()
        },
        SlurKind::Complete {
            target,
            start_note,
            end_note,
        } => MnxSlur {
            target: Some(target.clone()),
            start_note: start_note.clone(),
            end_note: end_note.clone(),
            ..MnxSlur::default()
        },
    };

    result.side = slur.side.map(|side| {
        match side {
            SlurSide::Up => "up",
            SlurSide::Down => "down",
        }
        .to_string()
    });
    Some(result)
}

fn octave_shift_value(shift_type: OctaveShiftType) -> i32 {
    match shift_type {
        OctaveShiftType::EightVa => -8,
        OctaveShiftType::EightVb => 8,
        OctaveShiftType::FifteenMa => -15,
        OctaveShiftType::FifteenMb => 15,
        OctaveShiftType::TwentySecondMa => -22,
        OctaveShiftType::TwentySecondMb => 22,
    }
}

fn encode_octave_shift(shift: &OctaveShift) -> MnxOctaveShift {
    MnxOctaveShift {
        end: shift.end.clone(),
        value: octave_shift_value(shift.shift_type),
    }
}

fn encode_positioned_clef(positioned: &PositionedClef) -> MnxPositionedClef {
    let offset = positioned.position;
    MnxPositionedClef {
        clef: MnxClef {
            position: positioned.clef.position,
            sign: positioned.clef.sign.clone(),
        },
        position: (*offset.numer() != 0).then(|| MnxRhythmicPosition {
            fraction: [*offset.numer(), *offset.denom()],
        }),
    }
}

fn encode_beam(beam: &Beam) -> MnxBeam {
    let mut hooks = Vec::new();
    let mut inner = Vec::new();
    for child in &beam.children {
        match child {
            BeamChild::Beam(child) => inner.push(encode_beam(child)),
            BeamChild::Hook(hook) => hooks.push(MnxBeamHook {
                event: hook.event_id.clone(),
                direction: match hook.direction {
                    HookDirection::Forward => "right",
                    HookDirection::Backward => "left",
                }
                .to_string(),
            }),
        }
    }

    MnxBeam {
        events: beam.events.clone(),
        hooks: (!hooks.is_empty()).then_some(hooks),
        inner: (!inner.is_empty()).then_some(inner),
    }
}
