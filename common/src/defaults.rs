use uuid::Uuid;

use crate::types::{Slide, SlideKind};

/// Logical canvas size. Downstream renderers scale from these units; the
/// model never stores physical pixels.
pub const SLIDE_WIDTH: f64 = 960.0;
pub const SLIDE_HEIGHT: f64 = 540.0;
pub const SLIDE_ASPECT: f64 = SLIDE_WIDTH / SLIDE_HEIGHT;

/// Create an empty slide of the given kind with a fresh stable id.
pub fn default_slide(kind: SlideKind, title: impl Into<String>) -> Slide {
    Slide {
        id: Uuid::new_v4().to_string(),
        kind,
        title: title.into(),
        subtitle: None,
        elements: Vec::new(),
        bg_color: Some("#ffffff".to_string()),
        notes: None,
        simulation_html: None,
    }
}
