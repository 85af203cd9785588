//! Importer tests: registry resolution over small MusicXML fixtures

use super::*;
use crate::converters::types::DiagnosticKind;
use crate::models::{
    BeamChild, EventItem, HookDirection, IncompleteSlur, KeySignature, OctaveShiftType, Rational,
    SequenceContent, SequenceDirection, SequenceItem, SlurKind, SlurSide, TimeSignature,
    TupletRatio,
};

const DIVISIONS: &str = "<attributes><divisions>2</divisions></attributes>";

/// Single-part partwise document, one string per measure body
fn document(measures: &[&str]) -> String {
    let body: String = measures
        .iter()
        .enumerate()
        .map(|(idx, content)| format!("<measure number=\"{}\">{}</measure>", idx + 1, content))
        .collect();
    format!(
        r#"<?xml version="1.0"?>
<score-partwise version="3.1">
  <part-list><score-part id="P1"><part-name>Flute</part-name></score-part></part-list>
  <part id="P1">{}</part>
</score-partwise>"#,
        body
    )
}

/// `<note>` for a pitch written like `"C4"` or `"F#5"`; `extra` goes after `<type>`
fn note(pitch: &str, duration: i32, note_type: &str, extra: &str) -> String {
    let step = &pitch[..1];
    let (alter, octave) = match &pitch[1..2] {
        "#" => ("<alter>1</alter>", &pitch[2..]),
        "b" => ("<alter>-1</alter>", &pitch[2..]),
        _ => ("", &pitch[1..]),
    };
    format!(
        "<note><pitch><step>{}</step>{}<octave>{}</octave></pitch><duration>{}</duration><voice>1</voice><type>{}</type>{}</note>",
        step, alter, octave, duration, note_type, extra
    )
}

fn rest(duration: i32, note_type: &str) -> String {
    format!(
        "<note><rest/><duration>{}</duration><voice>1</voice><type>{}</type></note>",
        duration, note_type
    )
}

fn read(measures: &[&str]) -> (Score, Vec<Diagnostic>) {
    read_musicxml(&document(measures)).unwrap()
}

fn read_err(measures: &[&str]) -> ImportError {
    read_musicxml(&document(measures)).unwrap_err()
}

fn first_sequence(score: &Score, bar: usize) -> &crate::models::Sequence {
    &score.bars[bar].bar_parts[0].sequences[0]
}

fn kinds(diagnostics: &[Diagnostic]) -> Vec<DiagnosticKind> {
    diagnostics.iter().map(|d| d.kind).collect()
}

// ===== PARTS AND ATTRIBUTES =====

#[test]
fn test_part_list_and_events() {
    let measure = format!("{}{}{}", DIVISIONS, note("C4", 2, "quarter", ""), rest(2, "quarter"));
    let (score, diagnostics) = read(&[&measure]);

    assert!(diagnostics.is_empty());
    assert_eq!(score.parts.len(), 1);
    assert_eq!(score.parts[0].part_id, "P1");
    assert_eq!(score.parts[0].name.as_deref(), Some("Flute"));

    let events = first_sequence(&score, 0).events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_id, "ev1");
    assert_eq!(events[0].duration.frac, Rational::new(1, 4));
    assert!(!events[0].is_rest());
    assert!(events[1].is_rest());

    let note = events[0].notes().next().unwrap();
    assert_eq!(note.note_id, "note1");
    assert!(!note.is_referenced);
}

#[test]
fn test_duration_from_divisions_without_type() {
    let measure = format!(
        "{}<note><pitch><step>E</step><octave>4</octave></pitch><duration>3</duration></note>",
        DIVISIONS
    );
    let (score, _) = read(&[&measure]);
    let events = first_sequence(&score, 0).events();
    assert_eq!(events[0].duration.frac, Rational::new(3, 8));
    assert_eq!(events[0].duration.dots, 0);
}

#[test]
fn test_missing_divisions_is_data_error() {
    let measure = "<note><pitch><step>E</step><octave>4</octave></pitch><duration>1</duration></note>";
    assert!(matches!(read_err(&[measure]), ImportError::Data(_)));
}

#[test]
fn test_huge_divisions_is_data_error() {
    let measure = "<attributes><divisions>600000000</divisions></attributes>\
        <note><pitch><step>E</step><octave>4</octave></pitch><duration>600000000</duration></note>";
    match read_err(&[measure]) {
        ImportError::Data(message) => assert!(message.contains("too large"), "{}", message),
        other => panic!("Expected data error, got {:?}", other),
    }
}

#[test]
fn test_dotted_type() {
    let measure = format!("{}{}", DIVISIONS, note("G4", 3, "quarter", "<dot/>"));
    let (score, _) = read(&[&measure]);
    let event = first_sequence(&score, 0).events()[0];
    assert_eq!(event.duration.frac, Rational::new(1, 4));
    assert_eq!(event.duration.dots, 1);
}

#[test]
fn test_note_and_event_counters() {
    let measure = format!(
        "{}{}{}{}",
        DIVISIONS,
        rest(2, "quarter"),
        note("C4", 2, "quarter", ""),
        note("D4", 2, "quarter", "")
    );
    let (score, _) = read(&[&measure]);
    let events = first_sequence(&score, 0).events();
    let ids: Vec<_> = events.iter().map(|e| e.event_id.as_str()).collect();
    assert_eq!(ids, vec!["ev1", "ev2", "ev3"]);

    // Rests don't consume note ids
    assert_eq!(events[1].notes().next().unwrap().note_id, "note1");
    assert_eq!(events[2].notes().next().unwrap().note_id, "note2");
}

#[test]
fn test_accidental_and_unsupported_accidental() {
    let measure = format!("{}{}", DIVISIONS, note("F#4", 2, "quarter", "<accidental>sharp</accidental>"));
    let (score, _) = read(&[&measure]);
    let sharp = first_sequence(&score, 0).events()[0].notes().next().unwrap().clone();
    assert_eq!(sharp.pitch.alter, 1);
    assert_eq!(sharp.rendered_accidental, Some(crate::models::Accidental::Sharp));

    let bad = format!("{}{}", DIVISIONS, note("F4", 2, "quarter", "<accidental>slash-quarter-sharp</accidental>"));
    assert!(matches!(read_err(&[&bad]), ImportError::Data(_)));
}

#[test]
fn test_key_time_and_clef() {
    let measure = format!(
        "<attributes><divisions>2</divisions><key><fifths>-3</fifths></key>\
         <time><beats>3</beats><beat-type>4</beat-type></time>\
         <clef><sign>F</sign><line>4</line></clef></attributes>{}\
         <attributes><clef><sign>G</sign><line>2</line></clef></attributes>{}",
        note("C3", 2, "quarter", ""),
        note("C4", 2, "quarter", "")
    );
    let (score, _) = read(&[&measure]);
    let bar = &score.bars[0];
    assert_eq!(bar.key_signature, Some(KeySignature::new(-3)));
    assert_eq!(bar.time_signature, Some(TimeSignature { count: 3, unit: 4 }));

    let clefs = &bar.bar_parts[0].clefs;
    assert_eq!(clefs.len(), 2);
    assert_eq!(clefs[0].clef.sign, "F");
    assert_eq!(clefs[0].clef.position, 2);
    assert_eq!(clefs[0].position, Rational::new(0, 1));
    assert_eq!(clefs[1].clef.position, -2);
    assert_eq!(clefs[1].position, Rational::new(1, 4));
}

#[test]
fn test_invalid_clef_is_data_error() {
    let measure = "<attributes><divisions>1</divisions><clef><line>2</line></clef></attributes>";
    assert_eq!(read_err(&[measure]), ImportError::data("Invalid clef in part P1"));
}

#[test]
fn test_transposing_part_key_in_concert_pitch() {
    let measure = format!(
        "<attributes><divisions>2</divisions><key><fifths>2</fifths></key>\
         <transpose><diatonic>-1</diatonic><chromatic>-2</chromatic></transpose></attributes>{}",
        note("E4", 2, "quarter", "")
    );
    let (score, diagnostics) = read(&[&measure]);
    assert!(diagnostics.is_empty());
    assert_eq!(score.parts[0].transpose, -2);
    assert_eq!(score.bars[0].key_signature, Some(KeySignature::new(0)));
}

#[test]
fn test_non_integer_transpose_is_diagnostic() {
    let measure = format!(
        "<attributes><divisions>2</divisions>\
         <transpose><chromatic>minus two</chromatic><octave-change>-1</octave-change></transpose></attributes>{}",
        note("E4", 2, "quarter", "")
    );
    let (score, diagnostics) = read(&[&measure]);
    assert_eq!(score.parts[0].transpose, -12);
    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::InvalidTranspose]);
}

#[test]
fn test_unusable_key_falls_back_to_c_major() {
    let measure = format!(
        "<attributes><divisions>2</divisions><key><fifths>9</fifths></key></attributes>{}",
        note("E4", 2, "quarter", "")
    );
    let (score, diagnostics) = read(&[&measure]);
    assert_eq!(score.bars[0].key_signature, Some(KeySignature::new(0)));
    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::InvalidKey]);
}

// ===== BARLINES =====

#[test]
fn test_repeats_and_endings() {
    let first = format!(
        "{}<barline location=\"left\"><repeat direction=\"forward\"/></barline>{}",
        DIVISIONS,
        note("C4", 8, "whole", "")
    );
    let second = format!(
        "<barline location=\"left\"><ending number=\"1, 2\" type=\"start\"/></barline>{}\
         <barline location=\"right\"><ending number=\"1, 2\" type=\"stop\"/><repeat direction=\"backward\" times=\"3\"/></barline>",
        note("D4", 8, "whole", "")
    );
    let third = format!(
        "<barline><ending number=\"3\" type=\"start\"/></barline>{}\
         <barline><ending number=\"3\" type=\"discontinue\"/><repeat direction=\"backward\"/></barline>",
        note("E4", 8, "whole", "")
    );
    let (score, diagnostics) = read(&[&first, &second, &third]);
    assert!(diagnostics.is_empty());

    assert!(score.bars[0].repeat_start);
    assert_eq!(score.bars[0].repeat_end, None);

    let start = score.bars[1].start_ending.as_ref().unwrap();
    assert_eq!(start.numbers, vec![1, 2]);
    assert_eq!(score.bars[1].stop_ending.as_ref().unwrap().ending_type, crate::models::EndingType::Stop);
    assert_eq!(score.bars[1].repeat_end, Some(3));

    assert_eq!(score.bars[2].start_ending.as_ref().unwrap().numbers, vec![3]);
    assert_eq!(
        score.bars[2].stop_ending.as_ref().unwrap().ending_type,
        crate::models::EndingType::Discontinue
    );
    assert_eq!(score.bars[2].repeat_end, Some(2));
}

#[test]
fn test_ending_without_numbers_is_not_recorded() {
    let measure = format!(
        "{}<barline><ending number=\"\" type=\"start\"/></barline>{}",
        DIVISIONS,
        note("C4", 8, "whole", "")
    );
    let (score, _) = read(&[&measure]);
    assert!(score.bars[0].start_ending.is_none());
}

#[test]
fn test_repeat_without_direction_is_data_error() {
    let measure = format!("{}<barline><repeat/></barline>", DIVISIONS);
    assert!(matches!(read_err(&[&measure]), ImportError::Data(_)));
}

#[test]
fn test_invalid_repeat_times_defaults_to_two() {
    let measure = format!(
        "{}{}<barline><repeat direction=\"backward\" times=\"many\"/></barline>",
        DIVISIONS,
        note("C4", 8, "whole", "")
    );
    let (score, diagnostics) = read(&[&measure]);
    assert_eq!(score.bars[0].repeat_end, Some(2));
    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::InvalidRepeatTimes]);
}

// ===== CHORDS, VOICES, GRACE NOTES =====

#[test]
fn test_chord_notes_share_event_and_position() {
    let measure = format!(
        "{}{}{}{}",
        DIVISIONS,
        note("C4", 2, "quarter", ""),
        note("E4", 2, "quarter", "").replace("<note>", "<note><chord/>"),
        note("G4", 2, "quarter", "")
    );
    let (score, _) = read(&[&measure]);
    let events = first_sequence(&score, 0).events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].items.len(), 2);
    assert_eq!(score.event_measure_location("ev2").unwrap(), "1:1/4");
}

#[test]
fn test_chord_duration_mismatch_is_data_error() {
    let measure = format!(
        "{}{}{}",
        DIVISIONS,
        note("C4", 2, "quarter", ""),
        note("E4", 4, "half", "").replace("<note>", "<note><chord/>")
    );
    assert!(matches!(read_err(&[&measure]), ImportError::Data(_)));
}

#[test]
fn test_chord_without_previous_event_starts_one() {
    let measure = format!(
        "{}{}",
        DIVISIONS,
        note("E4", 2, "quarter", "").replace("<note>", "<note><chord/>")
    );
    let (score, _) = read(&[&measure]);
    assert_eq!(first_sequence(&score, 0).events().len(), 1);
}

#[test]
fn test_backup_starts_second_voice() {
    let measure = format!(
        "{}{}<backup><duration>8</duration></backup>{}",
        DIVISIONS,
        note("C5", 8, "whole", ""),
        note("C4", 8, "whole", "").replace("<voice>1</voice>", "<voice>2</voice>")
    );
    let (score, _) = read(&[&measure]);
    let sequences = &score.bars[0].bar_parts[0].sequences;
    assert_eq!(sequences.len(), 2);
    assert_eq!(sequences[0].sequence_id, "1");
    assert_eq!(sequences[1].sequence_id, "2");
}

#[test]
fn test_grace_notes_group_until_regular_note() {
    let grace = |pitch: &str| {
        format!(
            "<note><grace slash=\"yes\"/><pitch><step>{}</step><octave>5</octave></pitch><voice>1</voice><type>16th</type></note>",
            pitch
        )
    };
    let measure = format!(
        "{}{}{}{}{}",
        DIVISIONS,
        grace("D"),
        grace("E"),
        note("F5", 2, "quarter", ""),
        grace("G")
    );
    let (score, _) = read(&[&measure]);
    let items = &first_sequence(&score, 0).items;
    assert_eq!(items.len(), 3);
    match &items[0] {
        SequenceItem::GraceNoteGroup(group) => assert_eq!(group.events.len(), 2),
        other => panic!("Expected grace group, got {:?}", other),
    }
    assert!(matches!(items[1], SequenceItem::Event(_)));
    assert!(matches!(items[2], SequenceItem::GraceNoteGroup(_)));

    // Grace notes take no time
    assert_eq!(score.event_measure_location("ev3").unwrap(), "1:0/1");
}

// ===== TIES =====

#[test]
fn test_tie_links_same_pitch() {
    let measure = format!(
        "{}{}{}",
        DIVISIONS,
        note("C4", 2, "quarter", "<notations><tied type=\"start\"/></notations>"),
        note("C4", 2, "quarter", "<notations><tied type=\"stop\"/></notations>")
    );
    let (score, diagnostics) = read(&[&measure]);
    assert!(diagnostics.is_empty());

    let events = first_sequence(&score, 0).events();
    let first = events[0].notes().next().unwrap();
    let second = events[1].notes().next().unwrap();
    assert_eq!(first.tie_end_note.as_deref(), Some("note2"));
    assert!(!first.is_referenced);
    assert!(second.is_referenced);
}

#[test]
fn test_tie_across_barline() {
    let first = format!(
        "{}{}",
        DIVISIONS,
        note("A4", 8, "whole", "<notations><tied type=\"start\"/></notations>")
    );
    let second = note("A4", 8, "whole", "<notations><tied type=\"stop\"/></notations>");
    let (score, _) = read(&[&first, &second]);
    let first_note = first_sequence(&score, 0).events()[0].notes().next().unwrap().clone();
    assert_eq!(first_note.tie_end_note.as_deref(), Some("note2"));
}

#[test]
fn test_unmatched_tie_stop_leaves_notes_untied() {
    let measure = format!(
        "{}{}{}",
        DIVISIONS,
        note("C4", 2, "quarter", "<notations><tied type=\"start\"/></notations>"),
        note("D4", 2, "quarter", "<notations><tied type=\"stop\"/></notations>")
    );
    let (score, diagnostics) = read(&[&measure]);
    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnmatchedTieStop]);
    assert_eq!(diagnostics[0].bar, Some(0));
    assert_eq!(diagnostics[0].part_id.as_deref(), Some("P1"));

    for event in first_sequence(&score, 0).events() {
        let note = event.notes().next().unwrap();
        assert!(note.tie_end_note.is_none());
        assert!(!note.is_referenced);
    }
}

// ===== SLURS =====

#[test]
fn test_slur_targets_end_event() {
    let measure = format!(
        "{}{}{}",
        DIVISIONS,
        note("C4", 2, "quarter", "<notations><slur number=\"1\" placement=\"above\" type=\"start\"/></notations>"),
        note("D4", 2, "quarter", "<notations><slur number=\"1\" type=\"stop\"/></notations>")
    );
    let (score, diagnostics) = read(&[&measure]);
    assert!(diagnostics.is_empty());

    let events = first_sequence(&score, 0).events();
    assert_eq!(events[0].slurs.len(), 1);
    let slur = &events[0].slurs[0];
    assert_eq!(slur.side, Some(SlurSide::Up));
    assert_eq!(
        slur.kind,
        Some(SlurKind::Complete {
            target: "ev2".into(),
            start_note: None,
            end_note: None,
        })
    );
    assert!(events[1].is_referenced);
    assert!(!events[0].is_referenced);
}

#[test]
fn test_unmatched_slur_stop_is_diagnostic() {
    let measure = format!(
        "{}{}{}",
        DIVISIONS,
        note("C4", 2, "quarter", ""),
        note("D4", 2, "quarter", "<notations><slur number=\"2\" type=\"stop\"/></notations>")
    );
    let (score, diagnostics) = read(&[&measure]);
    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnmatchedSlurStop]);
    assert!(first_sequence(&score, 0).events().iter().all(|e| e.slurs.is_empty()));
}

#[test]
fn test_slurs_between_same_chords_name_notes() {
    let chord_note = |pitch: &str, slur: &str| {
        note(pitch, 2, "quarter", &format!("<notations>{}</notations>", slur)).replace("<note>", "<note><chord/>")
    };
    let measure = format!(
        "{}{}{}{}{}",
        DIVISIONS,
        note("C4", 2, "quarter", "<notations><slur number=\"1\" type=\"start\" placement=\"below\"/></notations>"),
        chord_note("G4", "<slur number=\"2\" type=\"start\" placement=\"above\"/>"),
        note("D4", 2, "quarter", "<notations><slur number=\"1\" type=\"stop\"/></notations>"),
        chord_note("A4", "<slur number=\"2\" type=\"stop\"/>")
    );
    let (score, _) = read(&[&measure]);
    let events = first_sequence(&score, 0).events();
    assert_eq!(events.len(), 2);

    let slurs = &events[0].slurs;
    assert_eq!(slurs.len(), 2);
    assert_eq!(
        slurs[0].kind,
        Some(SlurKind::Complete {
            target: "ev2".into(),
            start_note: Some("note1".into()),
            end_note: Some("note3".into()),
        })
    );
    assert_eq!(slurs[0].side, Some(SlurSide::Down));
    assert_eq!(
        slurs[1].kind,
        Some(SlurKind::Complete {
            target: "ev2".into(),
            start_note: Some("note2".into()),
            end_note: Some("note4".into()),
        })
    );
    assert!(events[0].notes().all(|n| n.is_referenced));
    assert!(events[1].notes().all(|n| n.is_referenced));
}

#[test]
fn test_slur_on_single_note_is_incomplete() {
    let incoming = format!(
        "{}{}",
        DIVISIONS,
        note(
            "C4",
            2,
            "quarter",
            "<notations><slur number=\"1\" type=\"start\" default-x=\"-12.5\"/><slur number=\"1\" type=\"stop\"/></notations>"
        )
    );
    let (score, _) = read(&[&incoming]);
    let slur = &first_sequence(&score, 0).events()[0].slurs[0];
    assert_eq!(slur.kind, Some(SlurKind::Incomplete(IncompleteSlur::Incoming)));

    let outgoing = format!(
        "{}{}",
        DIVISIONS,
        note(
            "C4",
            2,
            "quarter",
            "<notations><slur type=\"start\" default-x=\"8\"/><slur type=\"stop\"/></notations>"
        )
    );
    let (score, _) = read(&[&outgoing]);
    let slur = &first_sequence(&score, 0).events()[0].slurs[0];
    assert_eq!(slur.kind, Some(SlurKind::Incomplete(IncompleteSlur::Outgoing)));
}

#[test]
fn test_slur_across_barline() {
    let first = format!(
        "{}{}",
        DIVISIONS,
        note("C4", 8, "whole", "<notations><slur type=\"start\"/></notations>")
    );
    let second = note("D4", 8, "whole", "<notations><slur type=\"stop\"/></notations>");
    let (score, diagnostics) = read(&[&first, &second]);
    assert!(diagnostics.is_empty());

    let slur = &first_sequence(&score, 0).events()[0].slurs[0];
    assert!(matches!(&slur.kind, Some(SlurKind::Complete { target, .. }) if target == "ev2"));
}

#[test]
fn test_slurs_with_same_number_stay_in_their_part() {
    let slur = |kind: &str| format!("<notations><slur number=\"1\" type=\"{}\"/></notations>", kind);
    let xml = format!(
        r#"<score-partwise>
  <part-list><score-part id="P1"/><score-part id="P2"/></part-list>
  <part id="P1">
    <measure number="1">{}{}</measure>
    <measure number="2">{}</measure>
  </part>
  <part id="P2">
    <measure number="1">{}{}</measure>
    <measure number="2">{}</measure>
  </part>
</score-partwise>"#,
        DIVISIONS,
        note("C4", 8, "whole", &slur("start")),
        note("D4", 8, "whole", &slur("stop")),
        DIVISIONS,
        note("E3", 8, "whole", &slur("start")),
        note("F3", 8, "whole", &slur("stop"))
    );
    let (score, diagnostics) = read_musicxml(&xml).unwrap();
    assert!(diagnostics.is_empty());

    // Events are numbered measure by measure: P1 C, P2 E, P1 D, P2 F
    let target = |part: usize| {
        let event = score.bars[0].bar_parts[part].sequences[0].events()[0];
        match &event.slurs[0].kind {
            Some(SlurKind::Complete { target, .. }) => target.clone(),
            other => panic!("Expected complete slur, got {:?}", other),
        }
    };
    assert_eq!(target(0), "ev3");
    assert_eq!(target(1), "ev4");
}

#[test]
fn test_slur_starting_on_rest() {
    let measure = format!(
        "{}{}{}",
        DIVISIONS,
        rest(2, "quarter").replace("</type>", "</type><notations><slur type=\"start\"/></notations>"),
        note("D4", 2, "quarter", "<notations><slur type=\"stop\"/></notations>")
    );
    let (score, _) = read(&[&measure]);
    let events = first_sequence(&score, 0).events();
    assert!(events[0].is_rest());
    assert_eq!(events[0].slurs.len(), 1);
}

// ===== TUPLETS =====

const TRIPLET: &str =
    "<time-modification><actual-notes>3</actual-notes><normal-notes>2</normal-notes></time-modification>";

fn triplet_note(pitch: &str, tuplet: &str) -> String {
    note(pitch, 1, "eighth", &format!("{}<notations>{}</notations>", TRIPLET, tuplet))
}

#[test]
fn test_tuplet_folds_its_events() {
    let measure = format!(
        "<attributes><divisions>3</divisions></attributes>{}{}{}{}",
        triplet_note("C4", "<tuplet number=\"1\" type=\"start\"/>"),
        triplet_note("D4", ""),
        triplet_note("E4", "<tuplet number=\"1\" type=\"stop\"/>"),
        note("F4", 3, "quarter", "")
    );
    let (score, diagnostics) = read(&[&measure]);
    assert!(diagnostics.is_empty());

    let sequence = first_sequence(&score, 0);
    assert_eq!(sequence.items.len(), 2);
    match &sequence.items[0] {
        SequenceItem::Tuplet(tuplet) => {
            assert_eq!(tuplet.ratio, TupletRatio::new(2, 8, 3, 8));
            let ids: Vec<_> = tuplet.events().iter().map(|e| e.event_id.clone()).collect();
            assert_eq!(ids, vec!["ev1", "ev2", "ev3"]);
        }
        other => panic!("Expected tuplet, got {:?}", other),
    }
    assert_eq!(score.event_measure_location("ev4").unwrap(), "1:1/4");
}

#[test]
fn test_nested_tuplets_fold_inner_first() {
    let measure = format!(
        "<attributes><divisions>3</divisions></attributes>{}{}{}{}{}",
        triplet_note("C4", "<tuplet number=\"1\" type=\"start\"/>"),
        triplet_note("D4", "<tuplet number=\"2\" type=\"start\"/>"),
        triplet_note("E4", ""),
        triplet_note("F4", "<tuplet number=\"2\" type=\"stop\"/>"),
        triplet_note("G4", "<tuplet number=\"1\" type=\"stop\"/>")
    );
    let (score, _) = read(&[&measure]);
    let sequence = first_sequence(&score, 0);
    assert_eq!(sequence.items.len(), 1);
    match &sequence.items[0] {
        SequenceItem::Tuplet(outer) => {
            assert_eq!(outer.items.len(), 3);
            assert!(matches!(outer.items[1], SequenceItem::Tuplet(_)));
            assert_eq!(outer.events().len(), 5);
        }
        other => panic!("Expected tuplet, got {:?}", other),
    }
}

#[test]
fn test_tuplet_stop_without_time_modification_is_data_error() {
    let measure = format!(
        "{}{}",
        DIVISIONS,
        note("C4", 1, "eighth", "<notations><tuplet type=\"start\"/><tuplet type=\"stop\"/></notations>")
    );
    assert_eq!(
        read_err(&[&measure]),
        ImportError::data("<note> is missing a valid <time-modification>")
    );
}

#[test]
fn test_unclosed_tuplet_is_discarded() {
    let measure = format!(
        "<attributes><divisions>3</divisions></attributes>{}{}",
        triplet_note("C4", "<tuplet number=\"1\" type=\"start\"/>"),
        triplet_note("D4", "")
    );
    let (score, diagnostics) = read(&[&measure]);
    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnclosedTuplet]);
    assert!(first_sequence(&score, 0)
        .items
        .iter()
        .all(|item| matches!(item, SequenceItem::Event(_))));
}

// ===== BEAMS =====

fn eighth(pitch: &str, beams: &str) -> String {
    note(pitch, 1, "eighth", beams)
}

#[test]
fn test_primary_beam() {
    let measure = format!(
        "{}{}{}{}",
        DIVISIONS,
        eighth("C4", "<beam number=\"1\">begin</beam>"),
        eighth("D4", "<beam number=\"1\">continue</beam>"),
        eighth("E4", "<beam number=\"1\">end</beam>")
    );
    let (score, diagnostics) = read(&[&measure]);
    assert!(diagnostics.is_empty());

    let sequence = first_sequence(&score, 0);
    assert_eq!(sequence.beams.len(), 1);
    assert_eq!(sequence.beams[0].events, vec!["ev1", "ev2", "ev3"]);
    assert!(sequence.events().iter().all(|e| e.is_referenced));
}

#[test]
fn test_secondary_beam_and_hook() {
    let sixteenth = |pitch: &str, beams: &str| note(pitch, 1, "16th", beams);
    let measure = format!(
        "<attributes><divisions>4</divisions></attributes>{}{}{}",
        sixteenth("C4", "<beam number=\"1\">begin</beam><beam number=\"2\">begin</beam>"),
        sixteenth("D4", "<beam number=\"2\">end</beam><beam number=\"1\">continue</beam>"),
        note("E4", 2, "eighth", "<beam number=\"1\">end</beam>")
    );
    let (score, diagnostics) = read(&[&measure]);
    assert!(diagnostics.is_empty());

    let beam = &first_sequence(&score, 0).beams[0];
    assert_eq!(beam.events, vec!["ev1", "ev2", "ev3"]);
    assert_eq!(beam.children.len(), 1);
    match &beam.children[0] {
        BeamChild::Beam(inner) => assert_eq!(inner.events, vec!["ev1", "ev2"]),
        other => panic!("Expected beam, got {:?}", other),
    }

    let hooked = format!(
        "<attributes><divisions>4</divisions></attributes>{}{}",
        note("C4", 3, "eighth", "<dot/><beam number=\"1\">begin</beam>"),
        sixteenth("D4", "<beam number=\"1\">end</beam><beam number=\"2\">backward hook</beam>")
    );
    let (score, _) = read(&[&hooked]);
    let beam = &first_sequence(&score, 0).beams[0];
    match &beam.children[0] {
        BeamChild::Hook(hook) => {
            assert_eq!(hook.event_id, "ev2");
            assert_eq!(hook.direction, HookDirection::Backward);
        }
        other => panic!("Expected hook, got {:?}", other),
    }
}

#[test]
fn test_secondary_beam_without_primary_is_data_error() {
    let measure = format!("{}{}", DIVISIONS, eighth("C4", "<beam number=\"2\">begin</beam>"));
    assert_eq!(
        read_err(&[&measure]),
        ImportError::data("Got <beam number=\"2\"> outside of <beam number=\"1\">")
    );
}

#[test]
fn test_ended_beams_leave_registry() {
    let measure = format!(
        "{}{}{}{}{}",
        DIVISIONS,
        eighth("C4", "<beam number=\"1\">begin</beam>"),
        eighth("D4", "<beam number=\"1\">end</beam>"),
        eighth("E4", "<beam number=\"1\">continue</beam>"),
        eighth("F4", "")
    );
    let (score, diagnostics) = read(&[&measure]);
    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnmatchedBeam]);
    assert_eq!(first_sequence(&score, 0).beams[0].events, vec!["ev1", "ev2"]);
}

#[test]
fn test_unclosed_beam_is_reported() {
    let measure = format!("{}{}", DIVISIONS, eighth("C4", "<beam number=\"1\">begin</beam>"));
    let (_, diagnostics) = read(&[&measure]);
    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnclosedBeam]);
}

// ===== OCTAVE SHIFTS =====

fn octave_shift(attrs: &str) -> String {
    format!(
        "<direction><direction-type><octave-shift {}/></direction-type></direction>",
        attrs
    )
}

#[test]
fn test_octave_shift_inserted_before_first_event() {
    let measure = format!(
        "{}{}{}{}{}{}",
        DIVISIONS,
        note("C4", 2, "quarter", ""),
        octave_shift("type=\"down\" size=\"8\""),
        note("C6", 2, "quarter", ""),
        note("D6", 2, "quarter", ""),
        octave_shift("type=\"stop\" size=\"8\"")
    );
    let (score, diagnostics) = read(&[&measure]);
    assert!(diagnostics.is_empty());

    let items = &first_sequence(&score, 0).items;
    assert_eq!(items.len(), 4);
    match &items[1] {
        SequenceItem::Direction(SequenceDirection::OctaveShift(shift)) => {
            assert_eq!(shift.shift_type, OctaveShiftType::EightVa);
            assert_eq!(shift.end, "1:1/2");
        }
        other => panic!("Expected octave shift, got {:?}", other),
    }
}

#[test]
fn test_octave_shift_across_measures() {
    let first = format!(
        "{}{}{}",
        DIVISIONS,
        octave_shift("type=\"up\" size=\"15\""),
        note("C2", 8, "whole", "")
    );
    let second = format!("{}{}", note("D2", 8, "whole", ""), octave_shift("type=\"stop\" size=\"15\""));
    let (score, _) = read(&[&first, &second]);

    match &first_sequence(&score, 0).items[0] {
        SequenceItem::Direction(SequenceDirection::OctaveShift(shift)) => {
            assert_eq!(shift.shift_type, OctaveShiftType::FifteenMb);
            assert_eq!(shift.end, "2:0/1");
        }
        other => panic!("Expected octave shift, got {:?}", other),
    }
}

#[test]
fn test_unsupported_octave_shift_size_is_data_error() {
    let measure = format!("{}{}", DIVISIONS, octave_shift("type=\"down\" size=\"9\""));
    assert!(matches!(read_err(&[&measure]), ImportError::Data(_)));
}

#[test]
fn test_octave_shift_stop_without_start_is_diagnostic() {
    let measure = format!(
        "{}{}{}",
        DIVISIONS,
        note("C4", 8, "whole", ""),
        octave_shift("type=\"stop\"")
    );
    let (_, diagnostics) = read(&[&measure]);
    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnmatchedOctaveShiftStop]);
}

// ===== DOCUMENT SHAPE =====

#[test]
fn test_timewise_input_is_read_directly() {
    let xml = format!(
        r#"<score-timewise>
  <part-list><score-part id="P1"/><score-part id="P2"/></part-list>
  <measure number="1">
    <part id="P1">{}{}</part>
    <part id="P2">{}{}</part>
  </measure>
</score-timewise>"#,
        DIVISIONS,
        note("C5", 8, "whole", ""),
        DIVISIONS,
        note("C3", 8, "whole", "")
    );
    let (score, _) = read_musicxml(&xml).unwrap();
    assert_eq!(score.parts.len(), 2);
    assert_eq!(score.bars.len(), 1);
    assert_eq!(score.bars[0].bar_parts.len(), 2);
    assert_eq!(score.bars[0].bar_parts[1].part_id, "P2");

    let event = first_sequence(&score, 0).events()[0];
    match &event.items[0] {
        EventItem::Note(note) => assert_eq!(note.pitch.octave, 5),
        other => panic!("Expected note, got {:?}", other),
    }
}

#[test]
fn test_wrong_root_is_syntax_error() {
    assert!(matches!(
        read_musicxml("<score/>").unwrap_err(),
        ImportError::Syntax(_)
    ));
}

#[test]
fn test_malformed_xml_is_syntax_error() {
    assert!(matches!(
        read_musicxml("<score-partwise><part>").unwrap_err(),
        ImportError::Syntax(_)
    ));
}

#[test]
fn test_missing_pitch_is_data_error() {
    let measure = format!("{}<note><duration>2</duration><type>quarter</type></note>", DIVISIONS);
    assert_eq!(read_err(&[&measure]), ImportError::data("The <note> is missing <pitch>."));
}
