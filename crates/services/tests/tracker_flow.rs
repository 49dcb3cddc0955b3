use std::sync::{Arc, Mutex};

use services::{Clock, ProgressStore, ProgressTracker, ProgressView};
use skilltree_core::aggregate::{LevelKey, Transition};
use skilltree_core::model::{AcCode, Progress, Referential};
use skilltree_core::time::fixed_now;

// Minimal program: one skill with a single two-AC level, so level and
// competency boundaries are easy to reason about.
const TWO_AC_PROGRAM: &str = r#"[
  {
    "nom_court": "Comprendre",
    "libelle_long": "Comprendre les écosystèmes",
    "couleur": "c1",
    "niveaux": [
      {
        "ordre": 1,
        "annee": "1ère année",
        "libelle": "Découvrir",
        "acs": [
          { "code": "AC11.01", "libelle": "Analyser un besoin" },
          { "code": "AC11.02", "libelle": "Identifier les usages" }
        ]
      }
    ]
  }
]"#;

#[derive(Debug, PartialEq)]
enum Event {
    Leaf(AcCode, u8),
    Level(String, f64),
    Competency(String, f64),
    Transition(Transition),
}

#[derive(Default)]
struct RecordingView {
    events: Mutex<Vec<Event>>,
}

impl RecordingView {
    fn take(&self) -> Vec<Event> {
        std::mem::take(&mut self.events.lock().unwrap())
    }
}

impl ProgressView for RecordingView {
    fn on_leaf_changed(&self, code: AcCode, value: Progress) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Leaf(code, value.value()));
    }

    fn on_level_changed(&self, level: LevelKey, average: f64) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Level(level.to_string(), average));
    }

    fn on_competency_changed(&self, competency: &str, average: f64) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Competency(competency.to_owned(), average));
    }

    fn on_transition(&self, transition: Transition) {
        self.events.lock().unwrap().push(Event::Transition(transition));
    }
}

fn two_ac_tracker() -> (ProgressTracker, Arc<RecordingView>) {
    let referential = Referential::from_json(TWO_AC_PROGRAM).unwrap();
    let store = ProgressStore::in_memory(Clock::fixed(fixed_now()));
    let mut tracker = ProgressTracker::new(referential, store);
    let view = Arc::new(RecordingView::default());
    tracker.register_view(Arc::clone(&view) as Arc<dyn ProgressView>);
    (tracker, view)
}

fn code(raw: &str) -> AcCode {
    raw.parse().unwrap()
}

#[test]
fn averages_follow_the_two_ac_scenario() {
    let (mut tracker, _view) = two_ac_tracker();
    let key = LevelKey::new(1, 1);

    tracker.set_progress("AC11.01", 50);
    assert!((tracker.aggregates().levels[&key] - 25.0).abs() < f64::EPSILON);

    tracker.set_progress("AC11.02", 50);
    assert!((tracker.aggregates().levels[&key] - 50.0).abs() < f64::EPSILON);

    tracker.set_progress("AC11.01", 100);
    tracker.set_progress("AC11.02", 100);
    assert!((tracker.aggregates().levels[&key] - 100.0).abs() < f64::EPSILON);
}

#[test]
fn level_completion_fires_exactly_once_on_the_completing_call() {
    let (mut tracker, view) = two_ac_tracker();

    tracker.set_progress("AC11.01", 100);
    let events = view.take();
    assert!(events.contains(&Event::Transition(Transition::LeafCompleted {
        code: code("AC11.01")
    })));
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, Event::Transition(Transition::LevelCompleted { .. })))
    );

    // The call completing the last sibling closes level and skill.
    tracker.set_progress("AC11.02", 100);
    let events = view.take();
    assert!(events.contains(&Event::Transition(Transition::LevelCompleted {
        level: 1,
        skill: 1
    })));
    assert!(events.contains(&Event::Transition(Transition::SkillCompleted { skill: 1 })));

    // Re-writing 100 changes nothing and fires nothing.
    tracker.set_progress("AC11.02", 100);
    assert!(view.take().is_empty());

    // Descending then re-completing crosses the boundary again.
    tracker.set_progress("AC11.02", 40);
    tracker.set_progress("AC11.02", 100);
    let completions = view
        .take()
        .into_iter()
        .filter(|e| matches!(e, Event::Transition(Transition::LevelCompleted { .. })))
        .count();
    assert_eq!(completions, 1);
}

#[test]
fn effective_change_notifies_leaf_level_and_competency() {
    let (mut tracker, view) = two_ac_tracker();

    tracker.set_progress("AC11.01", 40);
    let events = view.take();
    assert_eq!(events[0], Event::Leaf(code("AC11.01"), 40));
    assert_eq!(events[1], Event::Level("11".to_owned(), 20.0));
    assert_eq!(events[2], Event::Competency("Comprendre".to_owned(), 20.0));

    // Idempotent repeat: stored again, but nothing to render.
    tracker.set_progress("AC11.01", 40);
    assert!(view.take().is_empty());
}

#[test]
fn skipped_writes_do_not_reach_views() {
    let (mut tracker, view) = two_ac_tracker();
    tracker.set_progress("garbage", 50);
    tracker.set_progress("AC99.99", 50);
    assert!(view.take().is_empty());
}

#[test]
fn export_reflects_exactly_the_effective_writes() {
    let (mut tracker, _view) = two_ac_tracker();
    tracker.set_progress("AC11.01", 30);
    tracker.set_progress("AC11.02", 70);

    let doc = tracker.export_snapshot();
    assert_eq!(doc.progressions.len(), 2);
    assert_eq!(doc.progressions[&code("AC11.01")].value(), 30);
    assert_eq!(doc.progressions[&code("AC11.02")].value(), 70);

    // History is exported in insertion order.
    assert_eq!(doc.historique.len(), 2);
    assert_eq!(doc.historique[0].ac, code("AC11.01"));
    assert_eq!(doc.historique[1].ac, code("AC11.02"));
}

#[test]
fn export_writes_a_date_stamped_file() {
    let (mut tracker, _view) = two_ac_tracker();
    tracker.set_progress("AC11.01", 30);

    let dir = tempfile::tempdir().unwrap();
    let path = tracker.export_to_dir(dir.path(), fixed_now()).unwrap();
    assert!(path.ends_with("sauvegarde-2023-11-14.json"));
    assert!(path.is_file());
}

#[test]
fn clear_all_resets_the_whole_tracker() {
    let (mut tracker, _view) = two_ac_tracker();
    tracker.set_progress("AC11.01", 100);
    tracker.set_progress("AC11.02", 100);

    assert!(tracker.clear_all().is_none());
    assert_eq!(tracker.get_progress("AC11.01"), Progress::ZERO);
    assert!(tracker.history(None).is_empty());
    assert_eq!(tracker.aggregates().levels[&LevelKey::new(1, 1)], 0.0);
    assert!(tracker.export_snapshot().progressions.is_empty());
}

#[test]
fn final_aggregates_are_invariant_to_write_order() {
    let final_values = [("AC11.01", 40), ("AC11.02", 80)];

    let (mut forward, _) = two_ac_tracker();
    forward.set_progress("AC11.01", 10);
    for (ac, value) in final_values {
        forward.set_progress(ac, value);
    }

    let (mut backward, _) = two_ac_tracker();
    for (ac, value) in final_values.iter().rev() {
        backward.set_progress(ac, *value);
    }

    assert_eq!(forward.aggregates(), backward.aggregates());
}

#[test]
fn full_program_scenario_rolls_up_to_the_competency() {
    let referential = Referential::mmi();
    let store = ProgressStore::in_memory(Clock::fixed(fixed_now()));
    let mut tracker = ProgressTracker::new(referential, store);

    // Complete all of "Développer" level 1 (4 ACs).
    for seq in ["AC14.01", "AC14.02", "AC14.03", "AC14.04"] {
        let report = tracker.set_progress(seq, 100);
        assert!(report.is_applied());
    }

    let aggregates = tracker.aggregates();
    assert!((aggregates.levels[&LevelKey::new(1, 4)] - 100.0).abs() < f64::EPSILON);
    // 4 of the 11 "Développer" ACs are complete.
    let expected = 400.0 / 11.0;
    assert!((aggregates.competencies["Développer"] - expected).abs() < 1e-12);
}
