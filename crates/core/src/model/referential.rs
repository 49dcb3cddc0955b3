use serde::Deserialize;
use thiserror::Error;

use crate::model::code::{AcCode, MalformedCodeError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors raised while loading and validating a referential document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReferentialError {
    #[error("invalid referential JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("referential declares no competency")]
    Empty,

    #[error("competency '{competency}' declares level {found} where level {expected} was expected")]
    LevelOutOfOrder {
        competency: String,
        found: u8,
        expected: u8,
    },

    #[error("AC {code} is declared at (level {level}, skill {skill}, seq {sequence}), which does not match its encoding")]
    MisplacedCode {
        code: AcCode,
        level: u8,
        skill: u8,
        sequence: u8,
    },

    #[error("structural position cannot be encoded: {0}")]
    UnencodablePosition(#[from] MalformedCodeError),
}

/// A code that does not resolve to any AC of the referential.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("AC code {code} does not resolve in the referential")]
pub struct UnknownCodeError {
    pub code: AcCode,
}

//
// ─── TREE NODES ────────────────────────────────────────────────────────────────
//

/// One learning-outcome leaf as declared by the program.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AcDef {
    code: AcCode,
    libelle: String,
}

impl AcDef {
    #[must_use]
    pub fn code(&self) -> AcCode {
        self.code
    }

    #[must_use]
    pub fn libelle(&self) -> &str {
        &self.libelle
    }
}

/// A per-year subdivision of a competency, grouping several ACs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Level {
    ordre: u8,
    annee: String,
    libelle: String,
    acs: Vec<AcDef>,
}

impl Level {
    #[must_use]
    pub fn ordre(&self) -> u8 {
        self.ordre
    }

    #[must_use]
    pub fn annee(&self) -> &str {
        &self.annee
    }

    #[must_use]
    pub fn libelle(&self) -> &str {
        &self.libelle
    }

    #[must_use]
    pub fn acs(&self) -> &[AcDef] {
        &self.acs
    }
}

/// One of the five top-level skill axes of the program.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Competency {
    nom_court: String,
    libelle_long: String,
    couleur: String,
    niveaux: Vec<Level>,
}

impl Competency {
    #[must_use]
    pub fn nom_court(&self) -> &str {
        &self.nom_court
    }

    #[must_use]
    pub fn libelle_long(&self) -> &str {
        &self.libelle_long
    }

    #[must_use]
    pub fn couleur(&self) -> &str {
        &self.couleur
    }

    #[must_use]
    pub fn niveaux(&self) -> &[Level] {
        &self.niveaux
    }
}

/// Full structural context of one AC, resolved in a single lookup.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedAc<'a> {
    pub competency: &'a Competency,
    pub level: &'a Level,
    pub ac: &'a AcDef,
}

//
// ─── REFERENTIAL ───────────────────────────────────────────────────────────────
//

static MMI_PROGRAM: &str = include_str!("../../data/programme_mmi.json");

/// The static competency → level → AC tree, read-only after construction.
///
/// Loading validates that every declared code matches its structural position
/// (skill = competency index + 1, level = declared `ordre`, sequence = its
/// rank in the level), which also guarantees codes are unique across the
/// tree. All lookups resolve through the position encoded in the code, so
/// they are bounds checks, not searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Referential {
    competencies: Vec<Competency>,
}

impl Referential {
    /// Parses and validates a referential from its JSON document.
    ///
    /// # Errors
    ///
    /// Returns `ReferentialError` if the document does not parse, declares
    /// levels out of order, or declares an AC code that does not match its
    /// position in the tree.
    pub fn from_json(raw: &str) -> Result<Self, ReferentialError> {
        let competencies: Vec<Competency> = serde_json::from_str(raw)?;
        Self::from_competencies(competencies)
    }

    /// Builds a referential from already-parsed competencies, validating
    /// structural consistency.
    ///
    /// # Errors
    ///
    /// Same contract as [`Referential::from_json`], minus JSON parsing.
    pub fn from_competencies(competencies: Vec<Competency>) -> Result<Self, ReferentialError> {
        if competencies.is_empty() {
            return Err(ReferentialError::Empty);
        }

        for (ci, competency) in competencies.iter().enumerate() {
            let skill = ordinal(ci);
            for (li, level) in competency.niveaux.iter().enumerate() {
                let expected = ordinal(li);
                if level.ordre != expected {
                    return Err(ReferentialError::LevelOutOfOrder {
                        competency: competency.nom_court.clone(),
                        found: level.ordre,
                        expected,
                    });
                }
                for (ai, ac) in level.acs.iter().enumerate() {
                    let sequence = ordinal(ai);
                    let expected = AcCode::new(level.ordre, skill, sequence)?;
                    if ac.code != expected {
                        return Err(ReferentialError::MisplacedCode {
                            code: ac.code,
                            level: level.ordre,
                            skill,
                            sequence,
                        });
                    }
                }
            }
        }

        Ok(Self { competencies })
    }

    /// The embedded BUT MMI program referential.
    ///
    /// # Panics
    ///
    /// Panics if the embedded program data is invalid, which would be a
    /// packaging defect.
    #[must_use]
    pub fn mmi() -> Self {
        Self::from_json(MMI_PROGRAM).expect("embedded MMI program referential should be valid")
    }

    #[must_use]
    pub fn competencies(&self) -> &[Competency] {
        &self.competencies
    }

    #[must_use]
    pub fn skill_count(&self) -> u8 {
        ordinal(self.competencies.len().saturating_sub(1))
    }

    /// Competency for a 1-based skill ordinal.
    #[must_use]
    pub fn competency(&self, skill: u8) -> Option<&Competency> {
        skill
            .checked_sub(1)
            .and_then(|i| self.competencies.get(usize::from(i)))
    }

    /// Resolves a code to its (competency, level, AC) context.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCodeError` if any encoded ordinal falls outside the
    /// tree.
    pub fn resolve(&self, code: AcCode) -> Result<ResolvedAc<'_>, UnknownCodeError> {
        let missing = UnknownCodeError { code };
        let competency = self.competency(code.skill()).ok_or(missing)?;
        let level = competency
            .niveaux
            .get(usize::from(code.level()) - 1)
            .ok_or(missing)?;
        let ac = level
            .acs
            .get(usize::from(code.sequence()) - 1)
            .ok_or(missing)?;
        Ok(ResolvedAc {
            competency,
            level,
            ac,
        })
    }

    #[must_use]
    pub fn contains(&self, code: AcCode) -> bool {
        self.resolve(code).is_ok()
    }

    /// Label text of the AC.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCodeError` if the code does not resolve.
    pub fn label(&self, code: AcCode) -> Result<&str, UnknownCodeError> {
        Ok(self.resolve(code)?.ac.libelle())
    }

    /// Year label of the AC's level.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCodeError` if the code does not resolve.
    pub fn year_of(&self, code: AcCode) -> Result<&str, UnknownCodeError> {
        Ok(self.resolve(code)?.level.annee())
    }

    /// Short name of the AC's competency.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCodeError` if the code does not resolve.
    pub fn competency_short_name(&self, code: AcCode) -> Result<&str, UnknownCodeError> {
        Ok(self.resolve(code)?.competency.nom_court())
    }

    /// Long label of the AC's competency.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCodeError` if the code does not resolve.
    pub fn competency_long_label(&self, code: AcCode) -> Result<&str, UnknownCodeError> {
        Ok(self.resolve(code)?.competency.libelle_long())
    }

    /// Display color token of the AC's competency.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCodeError` if the code does not resolve.
    pub fn color_of(&self, code: AcCode) -> Result<&str, UnknownCodeError> {
        Ok(self.resolve(code)?.competency.couleur())
    }

    /// All AC codes of one skill, walking its levels in order.
    ///
    /// Codes were validated against their positions at load time, so the
    /// stored codes and position-synthesized codes are the same values.
    #[must_use]
    pub fn codes_for_skill(&self, skill: u8) -> Vec<AcCode> {
        self.competency(skill)
            .map(|competency| {
                competency
                    .niveaux
                    .iter()
                    .flat_map(|level| level.acs.iter().map(AcDef::code))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// AC codes of one (level, skill) pair, in sequence order.
    #[must_use]
    pub fn codes_for_level(&self, level: u8, skill: u8) -> Vec<AcCode> {
        self.competency(skill)
            .and_then(|competency| {
                competency
                    .niveaux
                    .iter()
                    .find(|candidate| candidate.ordre == level)
            })
            .map(|level| level.acs.iter().map(AcDef::code).collect())
            .unwrap_or_default()
    }

    /// Every AC code of the whole tree, skills then levels in order.
    pub fn all_codes(&self) -> impl Iterator<Item = AcCode> + '_ {
        self.competencies
            .iter()
            .flat_map(|competency| competency.niveaux.iter())
            .flat_map(|level| level.acs.iter().map(AcDef::code))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn ordinal(index: usize) -> u8 {
    (index + 1).min(u8::MAX as usize) as u8
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
