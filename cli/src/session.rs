use deck_common::{ComposerAction, ComposerState};
use deck_core::persist::{FLAG_RESULT_HTML, FLAG_TARGET_SLIDE};
use deck_core::{composer_store, Backend, ComposerStore, Config, SessionStore};

/// View preferences scoped to one session context, passed down explicitly
/// instead of living in a process-wide static.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub sidebar_collapsed: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            sidebar_collapsed: true,
        }
    }
}

/// One document session: the undoable store, its persistence, and
/// session-scoped view state. Commits flow through here so the snapshot
/// only ever observes committed values.
pub struct SessionContext {
    pub config: Config,
    pub session: SessionStore,
    pub store: ComposerStore,
    pub view: ViewState,
}

impl SessionContext {
    /// Restore the previous session (hydrating the persistence adapter
    /// before any write can happen) and build the store from it.
    pub fn open(config: Config) -> Self {
        let mut session = SessionStore::new(config.session_dir());
        let initial = session.load().unwrap_or_default();
        Self {
            config,
            session,
            store: composer_store(initial),
            view: ViewState::default(),
        }
    }

    pub fn state(&self) -> &ComposerState {
        self.store.current()
    }

    /// Apply an edit and persist the committed result.
    pub fn commit(&mut self, action: &ComposerAction) {
        if matches!(action, ComposerAction::Reset) {
            self.session.clear_snapshot();
        }
        self.store.commit(action);
        self.session.save(self.store.current());
    }

    /// The persisted backend preference, read fresh on every invocation so
    /// the model can be switched mid-session.
    pub fn backend(&self) -> Backend {
        self.session
            .model_preference()
            .as_deref()
            .and_then(Backend::parse)
            .unwrap_or_default()
    }

    /// Adopt a pending simulation handoff, if one is waiting: consume the
    /// result and target-slide flags and route the artifact into the slide
    /// with that stable id. Returns the slide index on adoption.
    pub fn adopt_pending_simulation(&mut self) -> Option<usize> {
        let html = self.session.peek_flag(FLAG_RESULT_HTML)?;
        let target_id = self.session.peek_flag(FLAG_TARGET_SLIDE)?;

        let presentation = self.state().presentation.as_ref()?;
        let index = presentation.slides.iter().position(|s| s.id == target_id);
        if let Some(index) = index {
            let mut slide = presentation.slides[index].clone();
            slide.simulation_html = Some(html);
            self.commit(&ComposerAction::UpdateSlide { index, slide });
        } else {
            tracing::warn!("simulation handoff targets unknown slide {target_id}");
        }
        // Consumed either way; the handoff is single-use.
        self.session.take_flag(FLAG_RESULT_HTML);
        self.session.take_flag(FLAG_TARGET_SLIDE);
        index
    }
}
