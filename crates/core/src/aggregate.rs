use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

use crate::model::{AcCode, Progress, Referential};

//
// ─── SNAPSHOT ──────────────────────────────────────────────────────────────────
//

/// Immutable view of the progress state at one point in time.
///
/// Absent codes read as 0, mirroring the store: an AC that was never set is
/// simply not started. Aggregation only ever consults a snapshot, so
/// recomputing from scratch is deterministic and side-effect-free.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    values: BTreeMap<AcCode, Progress>,
}

impl ProgressSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored value for a code, 0 when absent.
    #[must_use]
    pub fn get(&self, code: AcCode) -> Progress {
        self.values.get(&code).copied().unwrap_or_default()
    }

    pub fn insert(&mut self, code: AcCode, value: Progress) {
        self.values.insert(code, value);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AcCode, Progress)> + '_ {
        self.values.iter().map(|(code, value)| (*code, *value))
    }
}

impl FromIterator<(AcCode, Progress)> for ProgressSnapshot {
    fn from_iter<T: IntoIterator<Item = (AcCode, Progress)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

//
// ─── KEYS AND EVENTS ───────────────────────────────────────────────────────────
//

/// Identifies one (level, skill) pair; displays as the two concatenated
/// digits (`"11"`, `"23"`, ...), the key shape the renderer addresses its
/// level widgets with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LevelKey {
    pub level: u8,
    pub skill: u8,
}

impl LevelKey {
    #[must_use]
    pub fn new(level: u8, skill: u8) -> Self {
        Self { level, skill }
    }

    #[must_use]
    pub fn of(code: AcCode) -> Self {
        Self::new(code.level(), code.skill())
    }
}

impl fmt::Display for LevelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.level, self.skill)
    }
}

/// A one-time crossing into the fully-complete state.
///
/// Fired by [`Aggregator::detect_transitions`] only on the write that takes
/// the entity from below 100 to exactly 100; repeated writes of 100 and
/// descending writes never produce one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    LeafCompleted { code: AcCode },
    LevelCompleted { level: u8, skill: u8 },
    SkillCompleted { skill: u8 },
}

/// Everything the renderer needs after one leaf write: the changed leaf, the
/// recomputed aggregates and the completion transitions, as one value object.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateUpdate {
    pub leaf: AcCode,
    pub leaf_value: Progress,
    pub level_averages: BTreeMap<LevelKey, f64>,
    pub competency_averages: BTreeMap<String, f64>,
    pub transitions: Vec<Transition>,
}

//
// ─── AGGREGATOR ────────────────────────────────────────────────────────────────
//

/// Pure aggregation over a referential and a progress snapshot.
///
/// Averages are plain arithmetic means kept at full `f64` precision; any
/// rounding is the renderer's business. A competency average is the mean
/// over all of its ACs flattened across levels, not a mean of level means,
/// because levels carry different AC counts.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    referential: &'a Referential,
}

impl<'a> Aggregator<'a> {
    #[must_use]
    pub fn new(referential: &'a Referential) -> Self {
        Self { referential }
    }

    /// Mean progress of one (level, skill) pair, 0 when the level declares
    /// no AC.
    #[must_use]
    pub fn level_average(&self, level: u8, skill: u8, snapshot: &ProgressSnapshot) -> f64 {
        mean(&self.referential.codes_for_level(level, skill), snapshot)
    }

    /// Mean progress over all ACs of one skill, flattened across its levels.
    #[must_use]
    pub fn competency_average(&self, skill: u8, snapshot: &ProgressSnapshot) -> f64 {
        mean(&self.referential.codes_for_skill(skill), snapshot)
    }

    /// One entry per (level, skill) pair declared by the referential.
    #[must_use]
    pub fn all_level_averages(&self, snapshot: &ProgressSnapshot) -> BTreeMap<LevelKey, f64> {
        let mut averages = BTreeMap::new();
        for (ci, competency) in self.referential.competencies().iter().enumerate() {
            let skill = index_ordinal(ci);
            for level in competency.niveaux() {
                averages.insert(
                    LevelKey::new(level.ordre(), skill),
                    self.level_average(level.ordre(), skill, snapshot),
                );
            }
        }
        averages
    }

    /// One entry per competency, keyed by its short name.
    #[must_use]
    pub fn all_competency_averages(&self, snapshot: &ProgressSnapshot) -> BTreeMap<String, f64> {
        self.referential
            .competencies()
            .iter()
            .enumerate()
            .map(|(ci, competency)| {
                let skill = index_ordinal(ci);
                (
                    competency.nom_court().to_owned(),
                    self.competency_average(skill, snapshot),
                )
            })
            .collect()
    }

    /// Completion transitions caused by writing `new` over `old` at `code`.
    ///
    /// `snapshot` must already contain the new value; level and skill
    /// completion are re-derived from it by checking every sibling AC, never
    /// from a stored flag. Nothing fires unless the leaf itself crossed
    /// from below 100 to exactly 100.
    #[must_use]
    pub fn detect_transitions(
        &self,
        code: AcCode,
        old: Progress,
        new: Progress,
        snapshot: &ProgressSnapshot,
    ) -> Vec<Transition> {
        if !new.is_complete() || old.is_complete() {
            return Vec::new();
        }

        let mut transitions = vec![Transition::LeafCompleted { code }];

        let level_codes = self.referential.codes_for_level(code.level(), code.skill());
        if all_complete(&level_codes, snapshot) {
            transitions.push(Transition::LevelCompleted {
                level: code.level(),
                skill: code.skill(),
            });
        }

        let skill_codes = self.referential.codes_for_skill(code.skill());
        if all_complete(&skill_codes, snapshot) {
            transitions.push(Transition::SkillCompleted { skill: code.skill() });
        }

        transitions
    }

    /// Full recompute-after-write: aggregates for the whole tree plus the
    /// transitions triggered by this specific change.
    #[must_use]
    pub fn recompute(
        &self,
        code: AcCode,
        old: Progress,
        new: Progress,
        snapshot: &ProgressSnapshot,
    ) -> AggregateUpdate {
        self.warn_stray_keys(snapshot);
        AggregateUpdate {
            leaf: code,
            leaf_value: new,
            level_averages: self.all_level_averages(snapshot),
            competency_averages: self.all_competency_averages(snapshot),
            transitions: self.detect_transitions(code, old, new, snapshot),
        }
    }

    // Hydrated state may carry codes the current referential does not
    // declare (older program data, hand-edited saves). They never count
    // toward an average; say so instead of silently ignoring them.
    fn warn_stray_keys(&self, snapshot: &ProgressSnapshot) {
        for (code, _) in snapshot.iter() {
            if !self.referential.contains(code) {
                warn!(%code, "snapshot entry not declared by the referential, ignored");
            }
        }
    }
}

fn mean(codes: &[AcCode], snapshot: &ProgressSnapshot) -> f64 {
    if codes.is_empty() {
        return 0.0;
    }
    let total: f64 = codes.iter().map(|code| snapshot.get(*code).as_f64()).sum();
    #[allow(clippy::cast_precision_loss)]
    let count = codes.len() as f64;
    total / count
}

fn all_complete(codes: &[AcCode], snapshot: &ProgressSnapshot) -> bool {
    !codes.is_empty() && codes.iter().all(|code| snapshot.get(*code).is_complete())
}

#[allow(clippy::cast_possible_truncation)]
fn index_ordinal(index: usize) -> u8 {
    (index + 1).min(usize::from(u8::MAX)) as u8
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn code(raw: &str) -> AcCode {
        raw.parse().unwrap()
    }

    fn snapshot(entries: &[(&str, i64)]) -> ProgressSnapshot {
        entries
            .iter()
            .map(|(raw, value)| (code(raw), Progress::clamped(*value)))
            .collect()
    }

    #[test]
    fn level_average_follows_the_leaves() {
        let referential = Referential::mmi();
        let aggregator = Aggregator::new(&referential);

        // Level 1 of "Comprendre" has 4 ACs.
        let s = snapshot(&[("AC11.01", 50)]);
        assert!((aggregator.level_average(1, 1, &s) - 12.5).abs() < f64::EPSILON);

        let s = snapshot(&[("AC11.01", 50), ("AC11.02", 50)]);
        assert!((aggregator.level_average(1, 1, &s) - 25.0).abs() < f64::EPSILON);

        let s = snapshot(&[
            ("AC11.01", 100),
            ("AC11.02", 100),
            ("AC11.03", 100),
            ("AC11.04", 100),
        ]);
        assert!((aggregator.level_average(1, 1, &s) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn competency_average_flattens_levels() {
        let referential = Referential::mmi();
        let aggregator = Aggregator::new(&referential);

        // "Comprendre" has 11 ACs across levels of size 4, 4 and 3. A mean
        // of level means would weight AC31.01 more than AC11.01; the
        // flattened mean weights every AC equally.
        let s = snapshot(&[("AC31.01", 99)]);
        let flattened = 99.0 / 11.0;
        assert!((aggregator.competency_average(1, &s) - flattened).abs() < 1e-12);
    }

    #[test]
    fn averages_depend_only_on_the_final_snapshot() {
        let referential = Referential::mmi();
        let aggregator = Aggregator::new(&referential);

        let a = snapshot(&[("AC11.01", 40), ("AC11.02", 80)]);
        let b = snapshot(&[("AC11.02", 80), ("AC11.01", 40)]);
        assert_eq!(
            aggregator.all_level_averages(&a),
            aggregator.all_level_averages(&b)
        );
        assert_eq!(
            aggregator.all_competency_averages(&a),
            aggregator.all_competency_averages(&b)
        );
    }

    #[test]
    fn all_level_averages_covers_the_whole_grid() {
        let referential = Referential::mmi();
        let aggregator = Aggregator::new(&referential);
        let averages = aggregator.all_level_averages(&ProgressSnapshot::new());

        // 3 levels × 5 skills.
        assert_eq!(averages.len(), 15);
        assert!(averages.values().all(|v| *v == 0.0));
        assert!(averages.contains_key(&LevelKey::new(3, 5)));
        assert_eq!(LevelKey::new(2, 3).to_string(), "23");
    }

    #[test]
    fn leaf_completion_fires_only_on_the_upward_crossing() {
        let referential = Referential::mmi();
        let aggregator = Aggregator::new(&referential);
        let c = code("AC11.01");

        let s = snapshot(&[("AC11.01", 100)]);
        let up = aggregator.detect_transitions(c, Progress::clamped(60), Progress::COMPLETE, &s);
        assert_eq!(up, vec![Transition::LeafCompleted { code: c }]);

        // Already complete: no event.
        assert!(
            aggregator
                .detect_transitions(c, Progress::COMPLETE, Progress::COMPLETE, &s)
                .is_empty()
        );

        // Descending: no event.
        let s = snapshot(&[("AC11.01", 40)]);
        assert!(
            aggregator
                .detect_transitions(c, Progress::COMPLETE, Progress::clamped(40), &s)
                .is_empty()
        );
    }

    #[test]
    fn level_completion_requires_every_sibling() {
        let referential = Referential::mmi();
        let aggregator = Aggregator::new(&referential);

        // Three of four siblings complete: leaf event only.
        let s = snapshot(&[("AC11.01", 100), ("AC11.02", 100), ("AC11.03", 100)]);
        let events = aggregator.detect_transitions(
            code("AC11.03"),
            Progress::ZERO,
            Progress::COMPLETE,
            &s,
        );
        assert_eq!(
            events,
            vec![Transition::LeafCompleted {
                code: code("AC11.03")
            }]
        );

        // Last sibling closes the level.
        let s = snapshot(&[
            ("AC11.01", 100),
            ("AC11.02", 100),
            ("AC11.03", 100),
            ("AC11.04", 100),
        ]);
        let events = aggregator.detect_transitions(
            code("AC11.04"),
            Progress::ZERO,
            Progress::COMPLETE,
            &s,
        );
        assert!(events.contains(&Transition::LevelCompleted { level: 1, skill: 1 }));
        assert!(!events.contains(&Transition::SkillCompleted { skill: 1 }));
    }

    #[test]
    fn skill_completion_requires_every_level() {
        let referential = Referential::mmi();
        let aggregator = Aggregator::new(&referential);

        let s: ProgressSnapshot = referential
            .codes_for_skill(1)
            .into_iter()
            .map(|c| (c, Progress::COMPLETE))
            .collect();

        let events = aggregator.detect_transitions(
            code("AC31.03"),
            Progress::clamped(90),
            Progress::COMPLETE,
            &s,
        );
        assert_eq!(
            events,
            vec![
                Transition::LeafCompleted {
                    code: code("AC31.03")
                },
                Transition::LevelCompleted { level: 3, skill: 1 },
                Transition::SkillCompleted { skill: 1 },
            ]
        );
    }

    #[test]
    fn recompute_bundles_aggregates_and_transitions() {
        let referential = Referential::mmi();
        let aggregator = Aggregator::new(&referential);

        let s = snapshot(&[("AC11.01", 100)]);
        let update =
            aggregator.recompute(code("AC11.01"), Progress::ZERO, Progress::COMPLETE, &s);

        assert_eq!(update.leaf, code("AC11.01"));
        assert_eq!(update.leaf_value, Progress::COMPLETE);
        assert_eq!(update.level_averages.len(), 15);
        assert_eq!(update.competency_averages.len(), 5);
        assert!((update.level_averages[&LevelKey::new(1, 1)] - 25.0).abs() < f64::EPSILON);
        assert_eq!(
            update.transitions,
            vec![Transition::LeafCompleted {
                code: code("AC11.01")
            }]
        );
    }

    #[test]
    fn stray_snapshot_keys_do_not_contribute() {
        let referential = Referential::mmi();
        let aggregator = Aggregator::new(&referential);

        // AC11.99 parses but is not declared by the program.
        let s = snapshot(&[("AC11.99", 100)]);
        assert_eq!(aggregator.level_average(1, 1, &s), 0.0);
        assert_eq!(aggregator.competency_average(1, &s), 0.0);
    }
}
