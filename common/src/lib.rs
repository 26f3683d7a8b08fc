//! Shared document model for the deck workspace: presentations, slides,
//! positioned elements, and the composer view-state they live in.

pub mod defaults;
pub mod migrate;
pub mod types;

pub use defaults::{default_slide, SLIDE_ASPECT, SLIDE_HEIGHT, SLIDE_WIDTH};
pub use migrate::migrate_to_elements;
pub use types::{
    ComposerAction, ComposerPhase, ComposerState, ElementKind, Presentation, Slide, SlideElement,
    SlideKind, TextAlign,
};
