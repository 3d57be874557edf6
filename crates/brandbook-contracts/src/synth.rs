use serde::{Deserialize, Serialize};

use crate::guideline::VisualGuideRules;

/// Positive and exclusionary instruction strings for the downstream
/// image-generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePromptPair {
    pub base_prompt: String,
    pub negative_prompt: String,
}

/// Fixed exclusion list appended to every generation request.
pub const NEGATIVE_PROMPT: &str = "blurry, low resolution, distorted anatomy, extra limbs, \
watermark, text overlay, oversaturated colours, harsh flash, cluttered composition, \
stock-photo staging";

/// Builds the base/negative prompt pair from a canonical guideline.
///
/// The base prompt concatenates, in order: the first image category's
/// subject matter, context and name; the four style-direction fields; the
/// primary and secondary palette hex lists; the four producer-notes fields;
/// and the full prompting-guidance list.
pub fn synthesize_prompts(guide: &VisualGuideRules) -> ImagePromptPair {
    let mut fragments: Vec<String> = Vec::new();

    if let Some(category) = guide.types_of_images.first() {
        if let Some(subject) = &category.subject_matter {
            fragments.push(subject.clone());
        }
        if let Some(context) = &category.context {
            fragments.push(context.clone());
        }
        fragments.push(category.category_name.clone());
    }

    fragments.push(guide.style_direction.lighting.clone());
    fragments.push(guide.style_direction.colour.clone());
    fragments.push(guide.style_direction.composition.clone());
    fragments.push(guide.style_direction.format.clone());

    fragments.push(format!("colour palette {}", guide.palette.primary.join(" ")));
    fragments.push(format!(
        "accent colours {}",
        guide.palette.secondary.join(" ")
    ));

    fragments.push(guide.producer_notes.camera.clone());
    fragments.push(guide.producer_notes.lighting.clone());
    fragments.push(guide.producer_notes.angle.clone());
    fragments.push(guide.producer_notes.scene.clone());

    fragments.extend(guide.prompting_guidance.iter().cloned());

    let base_prompt = fragments
        .into_iter()
        .map(|fragment| fragment.trim().trim_end_matches('.').to_string())
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    ImagePromptPair {
        base_prompt,
        negative_prompt: NEGATIVE_PROMPT.to_string(),
    }
}
