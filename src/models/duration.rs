//! Rhythmic durations
//!
//! Durations are exact fractions of a whole note. A quarter note is `1/4`,
//! a breve is `2`. Dots are carried separately so the notated value
//! (base + dots) survives the trip between formats.

use num_rational::Rational32;
use std::fmt;

/// Exact fraction used for every rhythmic quantity in the model
pub type Rational = Rational32;

/// Canonical string form of a fraction, used as a lookup key.
///
/// Integers print without a denominator (`"2"`), everything else as
/// `"n/d"` in lowest terms.
pub fn fraction_key(frac: &Rational) -> String {
    frac.to_string()
}

/// A notated duration: base fraction plus augmentation dots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RhythmicDuration {
    /// Base value as a fraction of a whole note (dots excluded)
    pub frac: Rational,

    /// Number of augmentation dots
    pub dots: u8,
}

impl RhythmicDuration {
    pub fn new(frac: Rational, dots: u8) -> Self {
        Self { frac, dots }
    }

    /// Undotted duration
    pub fn plain(frac: Rational) -> Self {
        Self { frac, dots: 0 }
    }

    /// Sounding length including dots: `base * (2 - 1/2^dots)`
    pub fn total(&self) -> Rational {
        let mut total = self.frac;
        let mut addition = self.frac;
        for _ in 0..self.dots {
            addition /= 2;
            total += addition;
        }
        total
    }
}

impl fmt::Display for RhythmicDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", fraction_key(&self.frac), ".".repeat(self.dots as usize))
    }
}
