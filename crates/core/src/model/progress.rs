use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Completion percentage of a single AC, always an integer in [0, 100].
///
/// Construction is total: any raw input is clamped into range rather than
/// rejected, so a `set` on the store can never fail on a bad value.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Progress(u8);

impl Progress {
    pub const ZERO: Self = Self(0);
    pub const COMPLETE: Self = Self(100);

    /// Clamps an integer into [0, 100].
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Self(value.clamp(0, 100) as u8)
    }

    /// The stored percentage.
    #[must_use]
    pub fn value(&self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn as_f64(&self) -> f64 {
        f64::from(self.0)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.0 == 100
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Progress({})", self.0)
    }
}

impl Serialize for Progress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

// Persisted snapshots may have been written by older drafts or edited by
// hand; out-of-range or fractional numbers are clamped on the way in so a
// single odd value does not poison the whole document.
impl<'de> Deserialize<'de> for Progress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        Ok(RawProgress::Number(raw).coerce())
    }
}

//
// ─── RAW INPUT ─────────────────────────────────────────────────────────────────
//

/// Untrusted progress input as the UI hands it over: a number or a string.
#[derive(Debug, Clone, PartialEq)]
pub enum RawProgress {
    Number(f64),
    Text(String),
}

impl RawProgress {
    /// Coerces the input into a valid `Progress`.
    ///
    /// Numbers are truncated to integers and clamped into [0, 100]; strings
    /// are parsed as numbers first. Anything unparsable (or NaN) becomes 0.
    #[must_use]
    pub fn coerce(&self) -> Progress {
        let numeric = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        };
        if numeric.is_nan() {
            return Progress::ZERO;
        }
        // `as` saturates on overflow and infinities, clamped() does the rest.
        #[allow(clippy::cast_possible_truncation)]
        Progress::clamped(numeric.trunc() as i64)
    }
}

impl From<f64> for RawProgress {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for RawProgress {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u8> for RawProgress {
    fn from(value: u8) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for RawProgress {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for RawProgress {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Progress> for RawProgress {
    fn from(value: Progress) -> Self {
        Self::Number(value.as_f64())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_above_and_below_range() {
        assert_eq!(RawProgress::from(150).coerce(), Progress::COMPLETE);
        assert_eq!(RawProgress::from(-5).coerce(), Progress::ZERO);
        assert_eq!(RawProgress::from(50).coerce().value(), 50);
    }

    #[test]
    fn non_numeric_text_becomes_zero() {
        assert_eq!(RawProgress::from("abc").coerce(), Progress::ZERO);
        assert_eq!(RawProgress::from("").coerce(), Progress::ZERO);
    }

    #[test]
    fn numeric_text_parses() {
        assert_eq!(RawProgress::from("75").coerce().value(), 75);
        assert_eq!(RawProgress::from(" 30 ").coerce().value(), 30);
    }

    #[test]
    fn fractions_truncate() {
        assert_eq!(RawProgress::from(50.9).coerce().value(), 50);
        assert_eq!(RawProgress::from("99.99").coerce().value(), 99);
    }

    #[test]
    fn nan_becomes_zero() {
        assert_eq!(RawProgress::from(f64::NAN).coerce(), Progress::ZERO);
    }

    #[test]
    fn deserialization_clamps_out_of_range_values() {
        let p: Progress = serde_json::from_str("250").unwrap();
        assert_eq!(p, Progress::COMPLETE);
        let p: Progress = serde_json::from_str("-3").unwrap();
        assert_eq!(p, Progress::ZERO);
    }

    #[test]
    fn serializes_as_bare_integer() {
        assert_eq!(serde_json::to_string(&Progress::clamped(42)).unwrap(), "42");
    }
}
