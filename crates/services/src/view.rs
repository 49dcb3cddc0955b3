use skilltree_core::aggregate::{LevelKey, Transition};
use skilltree_core::model::{AcCode, Progress};

/// Callback contract toward the external renderer.
///
/// The tracker invokes these synchronously after each effective progress
/// write, once per changed entity. `on_transition` fires at most once per
/// actual completion crossing; all methods default to no-ops so an embedder
/// implements only what it renders.
pub trait ProgressView: Send + Sync {
    fn on_leaf_changed(&self, code: AcCode, value: Progress) {
        let _ = (code, value);
    }

    fn on_level_changed(&self, level: LevelKey, average: f64) {
        let _ = (level, average);
    }

    fn on_competency_changed(&self, competency: &str, average: f64) {
        let _ = (competency, average);
    }

    fn on_transition(&self, transition: Transition) {
        let _ = transition;
    }
}
