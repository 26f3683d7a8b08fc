//! Session-scoped persistence: one directory of single-value slots.
//!
//! The composer snapshot is best-effort. Saves are gated on `load` having
//! run first so a write can never race ahead of a pending restore and
//! clobber newer on-disk state with in-memory defaults, and writes are
//! skipped entirely while presenting.

use std::path::{Path, PathBuf};

use deck_common::{ComposerPhase, ComposerState};
use serde::{Deserialize, Serialize};

use crate::error::Result;

const SNAPSHOT_FILE: &str = "composer_state.json";
const MODEL_PREF_FILE: &str = "ai_model";

/// Handoff slots for routing a generated simulation back to the slide that
/// requested it. Each is consumed read-then-delete exactly once.
pub const FLAG_TARGET_SLIDE: &str = "simugen_target_slide";
pub const FLAG_RETURN: &str = "simugen_return";
pub const FLAG_PREFILL: &str = "simugen_prefill";
pub const FLAG_RESULT_HTML: &str = "simugen_result_html";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Snapshot {
    saved_at: chrono::DateTime<chrono::Utc>,
    state: ComposerState,
}

#[derive(Debug)]
pub struct SessionStore {
    dir: PathBuf,
    hydrated: bool,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            hydrated: false,
        }
    }

    /// Whether `load` has already resolved. Callers suppress writes until
    /// then.
    pub fn hydrated(&self) -> bool {
        self.hydrated
    }

    fn slot(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Restore the committed composer state, if a snapshot exists. Marks
    /// the store hydrated regardless of outcome; an unreadable snapshot
    /// falls back to fresh defaults rather than erroring.
    pub fn load(&mut self) -> Option<ComposerState> {
        self.hydrated = true;
        let path = self.slot(SNAPSHOT_FILE);
        let raw = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<Snapshot>(&raw) {
            Ok(snapshot) => Some(snapshot.state),
            Err(err) => {
                tracing::warn!("discarding unreadable session snapshot: {err}");
                None
            }
        }
    }

    /// Persist the committed composer state. Best-effort: skipped before
    /// hydration and while presenting; IO failures are swallowed.
    pub fn save(&self, state: &ComposerState) {
        if !self.hydrated {
            return;
        }
        if state.phase == ComposerPhase::Presenting {
            return;
        }
        if let Err(err) = self.write_snapshot(state) {
            tracing::warn!("session snapshot write failed: {err}");
        }
    }

    fn write_snapshot(&self, state: &ComposerState) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let snapshot = Snapshot {
            saved_at: chrono::Utc::now(),
            state: state.clone(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(self.slot(SNAPSHOT_FILE), json)?;
        Ok(())
    }

    /// Drop the snapshot (hard reset). Missing file is fine.
    pub fn clear_snapshot(&self) {
        let _ = std::fs::remove_file(self.slot(SNAPSHOT_FILE));
    }

    /// Store a short-lived cross-view flag.
    pub fn put_flag(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.slot(key), value)?;
        Ok(())
    }

    /// Consume a cross-view flag: read it and delete it in one step so it
    /// is observed at most once.
    pub fn take_flag(&self, key: &str) -> Option<String> {
        let path = self.slot(key);
        let value = std::fs::read_to_string(&path).ok()?;
        let _ = std::fs::remove_file(&path);
        Some(value)
    }

    pub fn peek_flag(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.slot(key)).ok()
    }

    /// Backend preference, read fresh on every pipeline invocation so the
    /// model can be switched mid-session.
    pub fn model_preference(&self) -> Option<String> {
        let value = std::fs::read_to_string(self.slot(MODEL_PREF_FILE)).ok()?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    pub fn set_model_preference(&self, model: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.slot(MODEL_PREF_FILE), model)?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_common::{default_slide, Presentation, SlideKind};

    fn sample_state() -> ComposerState {
        ComposerState {
            phase: ComposerPhase::Editor,
            presentation: Some(Presentation {
                title: "Waves".to_string(),
                subject: None,
                slides: vec![default_slide(SlideKind::Intro, "Waves")],
            }),
            active_slide_index: 0,
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut store = SessionStore::new(tmp.path());
        assert!(store.load().is_none());

        let state = sample_state();
        store.save(&state);

        let mut reopened = SessionStore::new(tmp.path());
        assert_eq!(reopened.load(), Some(state));
    }

    #[test]
    fn saves_are_suppressed_until_hydrated() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(tmp.path());
        store.save(&sample_state());

        let mut reopened = SessionStore::new(tmp.path());
        assert!(reopened.load().is_none());
    }

    #[test]
    fn presenting_phase_is_never_persisted() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut store = SessionStore::new(tmp.path());
        store.load();

        let editing = sample_state();
        store.save(&editing);

        let mut presenting = editing.clone();
        presenting.phase = ComposerPhase::Presenting;
        presenting.active_slide_index = 0;
        store.save(&presenting);

        let mut reopened = SessionStore::new(tmp.path());
        assert_eq!(reopened.load(), Some(editing));
    }

    #[test]
    fn corrupt_snapshot_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join(SNAPSHOT_FILE), "{not json").expect("write");
        let mut store = SessionStore::new(tmp.path());
        assert!(store.load().is_none());
        assert!(store.hydrated());
    }

    #[test]
    fn flags_are_consumed_exactly_once() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(tmp.path());
        store.put_flag(FLAG_TARGET_SLIDE, "slide-abc").expect("put");

        assert_eq!(store.take_flag(FLAG_TARGET_SLIDE).as_deref(), Some("slide-abc"));
        assert_eq!(store.take_flag(FLAG_TARGET_SLIDE), None);
    }

    #[test]
    fn model_preference_round_trips() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(tmp.path());
        assert_eq!(store.model_preference(), None);
        store.set_model_preference("claude").expect("set");
        assert_eq!(store.model_preference().as_deref(), Some("claude"));
    }
}
