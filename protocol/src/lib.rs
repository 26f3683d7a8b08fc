//! Reply envelopes for the simulation agent pipeline and deck generation.
//!
//! These mirror the JSON shapes the generation backends are instructed to
//! produce, so field names stay lowercase on the wire.

use serde::{Deserialize, Serialize};

/// Reply to an analyze step: a plan plus optional clarifying questions.
/// `questions: null` means the request was already unambiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReply {
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub questions: Option<Vec<String>>,
}

/// Reply to a generate or review step: a self-contained HTML artifact and,
/// for review, an optional summary of repairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactReply {
    pub html: String,
    #[serde(default)]
    pub fixes: Option<String>,
}
