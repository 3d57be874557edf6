use super::partial::{PartialGuideline, PartialImageCategory};
use super::rules::{ImageCategory, Palette, ProducerNotes, StyleDirection, VisualGuideRules};

// One fixed default per field, independent of locale and brand context.
// These are what a guideline degrades to when the model omits a field.
pub const DEFAULT_GENERAL_PRINCIPLES: &[&str] = &[
    "Favour authentic, candid moments over staged stock photography.",
    "Keep every image consistent with the brand's voice and values.",
];
pub const DEFAULT_LIGHTING: &str = "Soft, natural daylight with gentle shadows.";
pub const DEFAULT_COLOUR: &str = "True-to-life colour with moderate saturation.";
pub const DEFAULT_COMPOSITION: &str = "Clean, uncluttered framing with a single clear subject.";
pub const DEFAULT_FORMAT: &str = "High-resolution photography, landscape orientation.";
pub const DEFAULT_PRIMARY: &[&str] = &["#1A1A1A"];
pub const DEFAULT_SECONDARY: &[&str] = &["#4A6FA5"];
pub const DEFAULT_NEUTRALS: &[&str] = &["#FFFFFF", "#F2F2F2"];
pub const DEFAULT_PEOPLE_AND_EMOTIONS: &[&str] =
    &["Genuine, relaxed expressions rather than posed smiles."];
pub const DEFAULT_CATEGORY_NAME: &str = "Lifestyle";
pub const DEFAULT_SUBJECT_MATTER: &str =
    "People interacting naturally with the product or service.";
pub const DEFAULT_CATEGORY_CONTEXT: &str = "Everyday environments relevant to the brand.";
pub const DEFAULT_EXAMPLES: &[&str] =
    &["A customer using the product in a bright, everyday setting."];
pub const DEFAULT_NEURO_TRIGGERS: &[&str] =
    &["Warm, familiar scenes that build immediate trust."];
pub const DEFAULT_VARIATION_RULES: &[&str] =
    &["Vary subjects, settings and angles so no two images feel duplicated."];
pub const DEFAULT_PROMPTING_GUIDANCE: &[&str] =
    &["Describe the subject, setting and mood before stylistic modifiers."];
pub const DEFAULT_CAMERA: &str = "50mm lens look with shallow depth of field.";
pub const DEFAULT_PRODUCER_LIGHTING: &str = "Diffused natural light; avoid harsh on-camera flash.";
pub const DEFAULT_ANGLE: &str = "Eye level, straight on.";
pub const DEFAULT_SCENE: &str = "Real environments with believable props.";

/// Converts a parsed partial guideline into the canonical total form.
///
/// Every absent, null or empty field is replaced by its documented default;
/// present values copy through verbatim. Total and idempotent: it never
/// fails, and normalizing an already-canonical guideline is a no-op.
pub fn normalize(partial: PartialGuideline) -> VisualGuideRules {
    let style = partial.style_direction.unwrap_or_default();
    let palette = partial.palette.unwrap_or_default();
    let notes = partial.producer_notes.unwrap_or_default();

    VisualGuideRules {
        general_principles: list_or(partial.general_principles, DEFAULT_GENERAL_PRINCIPLES),
        style_direction: StyleDirection {
            lighting: text_or(style.lighting, DEFAULT_LIGHTING),
            colour: text_or(style.colour, DEFAULT_COLOUR),
            composition: text_or(style.composition, DEFAULT_COMPOSITION),
            format: text_or(style.format, DEFAULT_FORMAT),
        },
        palette: Palette {
            primary: list_or(palette.primary, DEFAULT_PRIMARY),
            secondary: list_or(palette.secondary, DEFAULT_SECONDARY),
            neutrals: list_or(palette.neutrals, DEFAULT_NEUTRALS),
        },
        people_and_emotions: list_or(partial.people_and_emotions, DEFAULT_PEOPLE_AND_EMOTIONS),
        types_of_images: normalize_categories(partial.types_of_images),
        neuro_triggers: list_or(partial.neuro_triggers, DEFAULT_NEURO_TRIGGERS),
        variation_rules: list_or(partial.variation_rules, DEFAULT_VARIATION_RULES),
        prompting_guidance: list_or(partial.prompting_guidance, DEFAULT_PROMPTING_GUIDANCE),
        producer_notes: ProducerNotes {
            camera: text_or(notes.camera, DEFAULT_CAMERA),
            lighting: text_or(notes.lighting, DEFAULT_PRODUCER_LIGHTING),
            angle: text_or(notes.angle, DEFAULT_ANGLE),
            scene: text_or(notes.scene, DEFAULT_SCENE),
        },
    }
}

fn list_or(value: Option<Vec<String>>, default: &[&str]) -> Vec<String> {
    match value {
        Some(items) if !items.is_empty() => items,
        _ => default.iter().map(|item| (*item).to_string()).collect(),
    }
}

fn text_or(value: Option<String>, default: &str) -> String {
    match value {
        Some(text) if !text.trim().is_empty() => text,
        _ => default.to_string(),
    }
}

fn normalize_categories(value: Option<Vec<PartialImageCategory>>) -> Vec<ImageCategory> {
    let entries = value.unwrap_or_default();
    if entries.is_empty() {
        return vec![ImageCategory {
            category_name: DEFAULT_CATEGORY_NAME.to_string(),
            subject_matter: Some(DEFAULT_SUBJECT_MATTER.to_string()),
            context: Some(DEFAULT_CATEGORY_CONTEXT.to_string()),
            examples: DEFAULT_EXAMPLES.iter().map(|e| (*e).to_string()).collect(),
        }];
    }
    entries
        .into_iter()
        .map(|entry| ImageCategory {
            category_name: text_or(entry.category_name, DEFAULT_CATEGORY_NAME),
            subject_matter: entry
                .subject_matter
                .filter(|text| !text.trim().is_empty()),
            context: entry.context.filter(|text| !text.trim().is_empty()),
            examples: list_or(entry.examples, DEFAULT_EXAMPLES),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::partial::{PartialPalette, PartialStyleDirection};
    use super::*;

    fn assert_total(rules: &VisualGuideRules) {
        assert!(!rules.general_principles.is_empty());
        assert!(!rules.style_direction.lighting.trim().is_empty());
        assert!(!rules.style_direction.colour.trim().is_empty());
        assert!(!rules.style_direction.composition.trim().is_empty());
        assert!(!rules.style_direction.format.trim().is_empty());
        assert!(!rules.palette.primary.is_empty());
        assert!(!rules.palette.secondary.is_empty());
        assert!(!rules.palette.neutrals.is_empty());
        assert!(!rules.people_and_emotions.is_empty());
        assert!(!rules.types_of_images.is_empty());
        for category in &rules.types_of_images {
            assert!(!category.category_name.trim().is_empty());
            assert!(!category.examples.is_empty());
        }
        assert!(!rules.neuro_triggers.is_empty());
        assert!(!rules.variation_rules.is_empty());
        assert!(!rules.prompting_guidance.is_empty());
        assert!(!rules.producer_notes.camera.trim().is_empty());
        assert!(!rules.producer_notes.lighting.trim().is_empty());
        assert!(!rules.producer_notes.angle.trim().is_empty());
        assert!(!rules.producer_notes.scene.trim().is_empty());
    }

    #[test]
    fn empty_partial_yields_fully_defaulted_guideline() {
        let rules = normalize(PartialGuideline::default());
        assert_total(&rules);
        assert_eq!(rules.style_direction.lighting, DEFAULT_LIGHTING);
        assert_eq!(rules.palette.primary, vec!["#1A1A1A".to_string()]);
        assert_eq!(rules.types_of_images[0].category_name, DEFAULT_CATEGORY_NAME);
    }

    #[test]
    fn present_values_copy_through_verbatim() {
        let partial = PartialGuideline {
            palette: Some(PartialPalette {
                primary: Some(vec!["#AA0000".to_string(), "#BB1111".to_string()]),
                ..PartialPalette::default()
            }),
            style_direction: Some(PartialStyleDirection {
                composition: Some("Rule of thirds, lots of negative space".to_string()),
                ..PartialStyleDirection::default()
            }),
            ..PartialGuideline::default()
        };
        let rules = normalize(partial);
        assert_total(&rules);
        assert_eq!(
            rules.palette.primary,
            vec!["#AA0000".to_string(), "#BB1111".to_string()]
        );
        assert_eq!(rules.palette.secondary, vec!["#4A6FA5".to_string()]);
        assert_eq!(
            rules.style_direction.composition,
            "Rule of thirds, lots of negative space"
        );
        assert_eq!(rules.style_direction.lighting, DEFAULT_LIGHTING);
    }

    #[test]
    fn empty_lists_and_blank_scalars_fall_back_to_defaults() {
        let partial = PartialGuideline {
            general_principles: Some(Vec::new()),
            style_direction: Some(PartialStyleDirection {
                lighting: Some("  ".to_string()),
                ..PartialStyleDirection::default()
            }),
            ..PartialGuideline::default()
        };
        let rules = normalize(partial);
        assert_eq!(
            rules.general_principles,
            DEFAULT_GENERAL_PRINCIPLES
                .iter()
                .map(|p| (*p).to_string())
                .collect::<Vec<_>>()
        );
        assert_eq!(rules.style_direction.lighting, DEFAULT_LIGHTING);
    }

    #[test]
    fn normalize_is_idempotent() {
        let partial = PartialGuideline {
            people_and_emotions: Some(vec!["Joyful but understated".to_string()]),
            ..PartialGuideline::default()
        };
        let once = normalize(partial);
        let twice = normalize(PartialGuideline::from(once.clone()));
        assert_eq!(once, twice);
    }

    #[test]
    fn category_entries_keep_their_content_and_backfill_examples() {
        let partial = PartialGuideline {
            types_of_images: Some(vec![PartialImageCategory {
                category_name: Some("Product close-ups".to_string()),
                subject_matter: Some("Macro shots of materials".to_string()),
                context: None,
                examples: None,
            }]),
            ..PartialGuideline::default()
        };
        let rules = normalize(partial);
        assert_eq!(rules.types_of_images.len(), 1);
        let category = &rules.types_of_images[0];
        assert_eq!(category.category_name, "Product close-ups");
        assert_eq!(
            category.subject_matter.as_deref(),
            Some("Macro shots of materials")
        );
        assert!(category.context.is_none());
        assert!(!category.examples.is_empty());
    }
}
