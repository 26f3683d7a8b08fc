//! Reducer over the composer view-state.
//!
//! The reducer is total: every action has a defined effect, and slide edits
//! against an absent presentation return the state unchanged instead of
//! failing. `active_slide_index` is re-clamped after any removal/reorder.

use deck_common::{ComposerAction, ComposerPhase, ComposerState};

use crate::store::{UndoableAction, UndoableStore};

pub type ComposerStore = UndoableStore<ComposerState, ComposerAction>;

impl UndoableAction for ComposerAction {
    fn is_history_exempt(&self) -> bool {
        ComposerAction::is_history_exempt(self)
    }
}

/// Build the store every editing session starts from.
pub fn composer_store(initial: ComposerState) -> ComposerStore {
    UndoableStore::new(reduce, initial)
}

fn clamp_index(index: usize, len: usize) -> usize {
    index.min(len.saturating_sub(1))
}

pub fn reduce(state: &ComposerState, action: &ComposerAction) -> ComposerState {
    match action {
        ComposerAction::SetPhase { phase } => ComposerState {
            phase: *phase,
            ..state.clone()
        },
        ComposerAction::SetPresentation { presentation } => ComposerState {
            phase: ComposerPhase::Editor,
            presentation: Some(presentation.clone()),
            active_slide_index: 0,
        },
        ComposerAction::SetActive { index } => {
            let len = state
                .presentation
                .as_ref()
                .map(|p| p.slides.len())
                .unwrap_or(0);
            ComposerState {
                active_slide_index: clamp_index(*index, len),
                ..state.clone()
            }
        }
        ComposerAction::UpdateSlide { index, slide } => {
            let Some(presentation) = &state.presentation else {
                return state.clone();
            };
            if *index >= presentation.slides.len() {
                return state.clone();
            }
            let mut presentation = presentation.clone();
            presentation.slides[*index] = slide.clone();
            ComposerState {
                presentation: Some(presentation),
                ..state.clone()
            }
        }
        ComposerAction::DeleteSlide { index } => {
            let Some(presentation) = &state.presentation else {
                return state.clone();
            };
            if *index >= presentation.slides.len() {
                return state.clone();
            }
            let mut presentation = presentation.clone();
            presentation.slides.remove(*index);
            let active = clamp_index(state.active_slide_index, presentation.slides.len());
            ComposerState {
                presentation: Some(presentation),
                active_slide_index: active,
                ..state.clone()
            }
        }
        ComposerAction::AddSlide { slide, after_index } => {
            let Some(presentation) = &state.presentation else {
                return state.clone();
            };
            let mut presentation = presentation.clone();
            let insert_at = match after_index {
                Some(i) => (*i + 1).min(presentation.slides.len()),
                None => presentation.slides.len(),
            };
            presentation.slides.insert(insert_at, slide.clone());
            ComposerState {
                presentation: Some(presentation),
                active_slide_index: insert_at,
                ..state.clone()
            }
        }
        ComposerAction::ReorderSlides {
            from_index,
            to_index,
        } => {
            let Some(presentation) = &state.presentation else {
                return state.clone();
            };
            let len = presentation.slides.len();
            if *from_index >= len || *to_index >= len {
                return state.clone();
            }
            let mut presentation = presentation.clone();
            let moved = presentation.slides.remove(*from_index);
            presentation.slides.insert(*to_index, moved);
            ComposerState {
                presentation: Some(presentation),
                active_slide_index: *to_index,
                ..state.clone()
            }
        }
        ComposerAction::Reset => ComposerState::default(),
    }
}
