use serde::{Deserialize, Serialize};

/// Slide category. Determines which template the renderer picks and how
/// generated content is routed (simulation slides receive pipeline output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlideKind {
    Intro,
    Concept,
    Formula,
    Quiz,
    Simulation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Text,
    Image,
    Formula,
    Shape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// One positioned content element on a slide. Coordinates are in the
/// 960x540 logical canvas, independent of any physical pixel density.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideElement {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_decoration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<TextAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
}

/// A single slide. `id` is stable for the slide's lifetime; it is the join
/// key used to route generated simulation markup back to the slide that
/// requested it across views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SlideKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub elements: Vec<SlideElement>,
    #[serde(rename = "bgColor", skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "simulationHtml", skip_serializing_if = "Option::is_none")]
    pub simulation_html: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default)]
    pub slides: Vec<Slide>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComposerPhase {
    Input,
    Generating,
    Editor,
    Presenting,
}

/// The full editable view of one presentation-in-progress plus UI phase.
/// Invariant: when `presentation` is present, `active_slide_index` is a
/// valid index into its slides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposerState {
    pub phase: ComposerPhase,
    pub presentation: Option<Presentation>,
    pub active_slide_index: usize,
}

impl Default for ComposerState {
    fn default() -> Self {
        Self {
            phase: ComposerPhase::Input,
            presentation: None,
            active_slide_index: 0,
        }
    }
}

/// Edit protocol over `ComposerState`. Content edits are remembered for
/// undo; navigation actions (`SetPhase`, `SetActive`, `Reset`) are not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComposerAction {
    SetPhase { phase: ComposerPhase },
    SetPresentation { presentation: Presentation },
    SetActive { index: usize },
    UpdateSlide { index: usize, slide: Slide },
    DeleteSlide { index: usize },
    AddSlide { slide: Slide, after_index: Option<usize> },
    ReorderSlides { from_index: usize, to_index: usize },
    Reset,
}

impl ComposerAction {
    /// Navigation-only transitions mutate the present state without
    /// producing an undo frame.
    pub fn is_history_exempt(&self) -> bool {
        matches!(
            self,
            ComposerAction::SetPhase { .. } | ComposerAction::SetActive { .. } | ComposerAction::Reset
        )
    }
}
