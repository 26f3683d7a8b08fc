//! One-shot deck generation: a whole presentation from a topic and/or
//! lesson-plan text. The result replaces the store's presentation
//! wholesale via `SetPresentation`.

use deck_common::{migrate_to_elements, Presentation};

use crate::backend::{Backend, GenerativeBackend};
use crate::decode;
use crate::error::{DeckError, Result};
use crate::prompts;

const DECK_GEN_BUDGET: u32 = 8192;

pub async fn generate_presentation<B: GenerativeBackend>(
    client: &B,
    backend: Backend,
    topic: Option<&str>,
    lesson_content: Option<&str>,
) -> Result<Presentation> {
    let topic = topic.map(str::trim).filter(|t| !t.is_empty());
    let lesson_content = lesson_content.map(str::trim).filter(|c| !c.is_empty());
    if topic.is_none() && lesson_content.is_none() {
        return Err(DeckError::Validation(
            "a topic or lesson content is required".to_string(),
        ));
    }

    let user_message = match (topic, lesson_content) {
        (topic, Some(content)) => format!(
            "Topic: {}\n\nLesson plan content:\n{content}",
            topic.unwrap_or("unspecified")
        ),
        (Some(topic), None) => format!("Topic: {topic}"),
        (None, None) => unreachable!(),
    };

    tracing::info!(backend = backend.id(), "generating presentation");
    let raw = client
        .invoke(backend, prompts::DECK_GEN, &user_message, DECK_GEN_BUDGET, true, None)
        .await?;
    let mut presentation = decode::parse_presentation(&raw)?;
    // Backends sometimes return template-only slides; give those a
    // renderable element layout.
    for slide in &mut presentation.slides {
        *slide = migrate_to_elements(slide);
    }
    Ok(presentation)
}
