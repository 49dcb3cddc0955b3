use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors raised when a string does not have the `AC<level><skill>.<seq>` shape.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MalformedCodeError {
    #[error("AC code must be 8 characters long, got {found}")]
    WrongLength { found: usize },

    #[error("AC code must start with 'AC'")]
    MissingPrefix,

    #[error("AC code must have '.' at position 4")]
    MissingSeparator,

    #[error("AC code has a non-digit character at position {position}")]
    NonDigit { position: usize },

    #[error("AC code {field} ordinal must be >= 1")]
    ZeroOrdinal { field: &'static str },

    #[error("AC code {field} ordinal {found} is out of range (max {max})")]
    OrdinalOutOfRange {
        field: &'static str,
        found: u8,
        max: u8,
    },
}

//
// ─── AC CODE ───────────────────────────────────────────────────────────────────
//

/// Identity of a single learning-outcome leaf, parsed once from its
/// position-encoded string form `AC<level><skill>.<seq>` (e.g. `AC11.01`).
///
/// The string layout is the compatibility contract with the stored referential
/// data: character 2 is the level ordinal, character 3 the skill ordinal and
/// characters 5-6 the zero-padded sequence within the level. `Display`
/// re-synthesizes that exact form, so parsing and formatting round-trip
/// bit-for-bit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AcCode {
    level: u8,
    skill: u8,
    sequence: u8,
}

impl AcCode {
    /// Builds a code from its structural ordinals (all 1-based).
    ///
    /// # Errors
    ///
    /// Returns `MalformedCodeError` if an ordinal is zero, if level or skill
    /// exceed 9 (single encoded digit), or if the sequence exceeds 99.
    pub fn new(level: u8, skill: u8, sequence: u8) -> Result<Self, MalformedCodeError> {
        for (field, value, max) in [
            ("level", level, 9),
            ("skill", skill, 9),
            ("sequence", sequence, 99),
        ] {
            if value == 0 {
                return Err(MalformedCodeError::ZeroOrdinal { field });
            }
            if value > max {
                return Err(MalformedCodeError::OrdinalOutOfRange {
                    field,
                    found: value,
                    max,
                });
            }
        }

        Ok(Self {
            level,
            skill,
            sequence,
        })
    }

    /// Level ordinal (program year), 1-based.
    #[must_use]
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Skill (competency) ordinal, 1-based.
    #[must_use]
    pub fn skill(&self) -> u8 {
        self.skill
    }

    /// Sequence within the level, 1-based.
    #[must_use]
    pub fn sequence(&self) -> u8 {
        self.sequence
    }
}

fn digit_at(bytes: &[u8], position: usize) -> Result<u8, MalformedCodeError> {
    let c = bytes[position];
    if c.is_ascii_digit() {
        Ok(c - b'0')
    } else {
        Err(MalformedCodeError::NonDigit { position })
    }
}

impl FromStr for AcCode {
    type Err = MalformedCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 8 {
            return Err(MalformedCodeError::WrongLength { found: s.len() });
        }
        if &bytes[..2] != b"AC" {
            return Err(MalformedCodeError::MissingPrefix);
        }
        if bytes[4] != b'.' {
            return Err(MalformedCodeError::MissingSeparator);
        }

        let level = digit_at(bytes, 2)?;
        let skill = digit_at(bytes, 3)?;
        let sequence = digit_at(bytes, 5)? * 10 + digit_at(bytes, 6)?;

        Self::new(level, skill, sequence)
    }
}

impl fmt::Display for AcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AC{}{}.{:02}", self.level, self.skill, self.sequence)
    }
}

impl fmt::Debug for AcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AcCode({self})")
    }
}

// Serialized as the plain code string so persisted documents keep the
// original key shape (`{ "AC11.01": 50 }`).
impl Serialize for AcCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AcCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_position_encoded_code() {
        let code: AcCode = "AC11.01".parse().unwrap();
        assert_eq!(code.level(), 1);
        assert_eq!(code.skill(), 1);
        assert_eq!(code.sequence(), 1);
    }

    #[test]
    fn parses_two_digit_sequence() {
        let code: AcCode = "AC25.13".parse().unwrap();
        assert_eq!(code.level(), 2);
        assert_eq!(code.skill(), 5);
        assert_eq!(code.sequence(), 13);
    }

    #[test]
    fn display_round_trips() {
        for raw in ["AC11.01", "AC34.02", "AC25.13"] {
            let code: AcCode = raw.parse().unwrap();
            assert_eq!(code.to_string(), raw);
        }
    }

    #[test]
    fn rejects_wrong_length() {
        let err = "AC1".parse::<AcCode>().unwrap_err();
        assert_eq!(err, MalformedCodeError::WrongLength { found: 3 });
    }

    #[test]
    fn rejects_bad_prefix() {
        let err = "XX11.01".parse::<AcCode>().unwrap_err();
        assert_eq!(err, MalformedCodeError::MissingPrefix);
    }

    #[test]
    fn rejects_missing_separator() {
        let err = "AC11x01".parse::<AcCode>().unwrap_err();
        assert_eq!(err, MalformedCodeError::MissingSeparator);
    }

    #[test]
    fn rejects_non_digit_ordinal() {
        let err = "ACx1.01".parse::<AcCode>().unwrap_err();
        assert_eq!(err, MalformedCodeError::NonDigit { position: 2 });
    }

    #[test]
    fn rejects_zero_ordinals() {
        assert!(matches!(
            "AC01.01".parse::<AcCode>(),
            Err(MalformedCodeError::ZeroOrdinal { field: "level" })
        ));
        assert!(matches!(
            "AC11.00".parse::<AcCode>(),
            Err(MalformedCodeError::ZeroOrdinal { field: "sequence" })
        ));
    }

    #[test]
    fn constructor_bounds_ordinals() {
        assert!(AcCode::new(1, 1, 99).is_ok());
        assert!(matches!(
            AcCode::new(10, 1, 1),
            Err(MalformedCodeError::OrdinalOutOfRange { field: "level", .. })
        ));
    }

    #[test]
    fn serde_uses_plain_string() {
        let code: AcCode = "AC11.02".parse().unwrap();
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"AC11.02\"");
        let back: AcCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);
    }
}
