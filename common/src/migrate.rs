use uuid::Uuid;

use crate::types::{ElementKind, Slide, SlideElement, SlideKind, TextAlign};

/// Convert old template-based slides (title/subtitle only) into
/// element-based slides so canvas renderers can draw them.
pub fn migrate_to_elements(slide: &Slide) -> Slide {
    if !slide.elements.is_empty() {
        return slide.clone();
    }

    let intro = slide.kind == SlideKind::Intro;
    let mut elements: Vec<SlideElement> = Vec::new();

    if !slide.title.is_empty() {
        elements.push(SlideElement {
            id: Uuid::new_v4().to_string(),
            kind: ElementKind::Text,
            x: 60.0,
            y: if intro { 180.0 } else { 30.0 },
            width: 840.0,
            height: 60.0,
            content: slide.title.clone(),
            font_size: Some(if intro { 40.0 } else { 32.0 }),
            font_style: None,
            font_weight: Some("bold".to_string()),
            text_decoration: None,
            fill: Some(if intro { "#ffffff" } else { "#0f172a" }.to_string()),
            align: Some(if intro { TextAlign::Center } else { TextAlign::Left }),
            rotation: None,
            src: None,
        });
    }

    if let Some(subtitle) = slide.subtitle.as_ref().filter(|s| !s.is_empty()) {
        elements.push(SlideElement {
            id: Uuid::new_v4().to_string(),
            kind: ElementKind::Text,
            x: 60.0,
            y: if intro { 260.0 } else { 100.0 },
            width: 840.0,
            height: 40.0,
            content: subtitle.clone(),
            font_size: Some(if intro { 22.0 } else { 18.0 }),
            font_style: None,
            font_weight: None,
            text_decoration: None,
            fill: Some(if intro { "#cccccc" } else { "#64748b" }.to_string()),
            align: Some(if intro { TextAlign::Center } else { TextAlign::Left }),
            rotation: None,
            src: None,
        });
    }

    Slide {
        elements,
        ..slide.clone()
    }
}
