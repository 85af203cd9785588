//! Pitches and key signatures
//!
//! A `Pitch` is a spelled pitch: one of the seven natural steps, an octave in
//! scientific notation (middle C = C4) and a chromatic alteration in
//! semitones. Key signatures are stored as a signed count of fifths and are
//! transposed by way of their tonic.

use std::fmt;
use std::str::FromStr;

const NUM_PITCHES_IN_OCTAVE: i32 = 12;

/// The seven natural (white-key) steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    /// Semitones above C
    pub fn semitone(self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 2,
            Step::E => 4,
            Step::F => 5,
            Step::G => 7,
            Step::A => 9,
            Step::B => 11,
        }
    }

    /// Natural step sitting exactly `semitone` above C, if any
    pub fn from_semitone(semitone: i32) -> Option<Step> {
        match semitone {
            0 => Some(Step::C),
            2 => Some(Step::D),
            4 => Some(Step::E),
            5 => Some(Step::F),
            7 => Some(Step::G),
            9 => Some(Step::A),
            11 => Some(Step::B),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Step::C => "C",
            Step::D => "D",
            Step::E => "E",
            Step::F => "F",
            Step::G => "G",
            Step::A => "A",
            Step::B => "B",
        }
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "C" => Ok(Step::C),
            "D" => Ok(Step::D),
            "E" => Ok(Step::E),
            "F" => Ok(Step::F),
            "G" => Ok(Step::G),
            "A" => Ok(Step::A),
            "B" => Ok(Step::B),
            _ => Err(format!("Invalid step: {}", s)),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spelled musical pitch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pitch {
    pub step: Step,

    /// Octave number (4 = middle C octave)
    pub octave: i32,

    /// Semitone alteration (-1 = flat, 0 = natural, +1 = sharp)
    pub alter: i32,
}

impl Pitch {
    pub fn new(step: Step, octave: i32, alter: i32) -> Self {
        Self { step, octave, alter }
    }

    /// Spell a MIDI note number. Black keys become flats unless
    /// `prefer_flat` is false.
    pub fn from_midi_number(midi_number: i32, prefer_flat: bool) -> Pitch {
        let octave = midi_number.div_euclid(NUM_PITCHES_IN_OCTAVE) - 1;
        let semitone = midi_number.rem_euclid(NUM_PITCHES_IN_OCTAVE);

        if let Some(step) = Step::from_semitone(semitone) {
            return Pitch::new(step, octave, 0);
        }

        // Every black key has a white neighbour on both sides, and none sits
        // at the octave boundary, so the neighbour stays in the same octave.
        let (neighbour, alter) = if prefer_flat {
            (semitone + 1, -1)
        } else {
            (semitone - 1, 1)
        };
        let step = Step::from_semitone(neighbour).unwrap_or(Step::C);
        Pitch::new(step, octave, alter)
    }

    /// MIDI note number (C4 = 60)
    pub fn midi_number(&self) -> i32 {
        NUM_PITCHES_IN_OCTAVE * (self.octave + 1) + self.step.semitone() + self.alter
    }

    /// Transpose by semitones, respelling with flats. Zero leaves the
    /// spelling untouched.
    pub fn transpose_chromatic(&self, semitones: i32) -> Pitch {
        if semitones == 0 {
            return *self;
        }
        Pitch::from_midi_number(self.midi_number() + semitones, true)
    }

    pub fn accidental_string(&self) -> String {
        match self.alter {
            0 => String::new(),
            a if a > 0 => "#".repeat(a as usize),
            a => "b".repeat(a.unsigned_abs() as usize),
        }
    }

    /// e.g. `"C#4"`, `"Bb3"`
    pub fn scientific_pitch_string(&self) -> String {
        format!("{}{}{}", self.step, self.accidental_string(), self.octave)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.scientific_pitch_string())
    }
}

/// Tonic (major key) for every conventional key signature
const KEYSIG_PITCHES: [(i32, Step, i32); 15] = [
    (0, Step::C, 0),
    (1, Step::G, 0),
    (2, Step::D, 0),
    (3, Step::A, 0),
    (4, Step::E, 0),
    (5, Step::B, 0),
    (6, Step::F, 1),
    (7, Step::C, 1),
    (-1, Step::F, 0),
    (-2, Step::B, -1),
    (-3, Step::E, -1),
    (-4, Step::A, -1),
    (-5, Step::D, -1),
    (-6, Step::G, -1),
    (-7, Step::C, -1),
];

/// Default key signature at the start of a piece
pub const DEFAULT_KEYSIG: i32 = 0;

/// Key signature as a signed count of fifths (sharps positive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySignature {
    pub fifths: i32,
}

impl Default for KeySignature {
    fn default() -> Self {
        Self { fifths: DEFAULT_KEYSIG }
    }
}

impl KeySignature {
    pub fn new(fifths: i32) -> Self {
        Self { fifths }
    }

    /// Key signature whose major tonic is `pitch` (octave ignored)
    pub fn from_pitch(pitch: &Pitch) -> Result<KeySignature, String> {
        KEYSIG_PITCHES
            .iter()
            .find(|(_, step, alter)| *step == pitch.step && *alter == pitch.alter)
            .map(|(fifths, _, _)| KeySignature::new(*fifths))
            .ok_or_else(|| {
                format!(
                    "Pitch {} doesn't have a clear key signature",
                    pitch.scientific_pitch_string()
                )
            })
    }

    /// Major tonic of this key, in octave 4
    pub fn pitch(&self) -> Result<Pitch, String> {
        KEYSIG_PITCHES
            .iter()
            .find(|(fifths, _, _)| *fifths == self.fifths)
            .map(|(_, step, alter)| Pitch::new(*step, 4, *alter))
            .ok_or_else(|| format!("Unsupported key signature: {} fifths", self.fifths))
    }

    pub fn transpose_chromatic(&self, semitones: i32) -> Result<KeySignature, String> {
        let tonic = self.pitch()?;
        if semitones == 0 {
            return Ok(*self);
        }
        KeySignature::from_pitch(&tonic.transpose_chromatic(semitones))
    }

    pub fn to_concert(&self, transpose: i32) -> Result<KeySignature, String> {
        self.transpose_chromatic(transpose)
    }
}
