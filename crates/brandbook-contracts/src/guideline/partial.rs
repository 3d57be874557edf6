use serde::{Deserialize, Serialize};

use super::rules::{ImageCategory, Palette, ProducerNotes, StyleDirection, VisualGuideRules};

/// Possibly-incomplete guideline as extracted from model output.
///
/// Same shape as [`VisualGuideRules`] with every field optional. Produced
/// only by the response parser and consumed only by [`super::normalize`];
/// it never crosses the subsystem boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialGuideline {
    pub general_principles: Option<Vec<String>>,
    pub style_direction: Option<PartialStyleDirection>,
    pub palette: Option<PartialPalette>,
    pub people_and_emotions: Option<Vec<String>>,
    pub types_of_images: Option<Vec<PartialImageCategory>>,
    pub neuro_triggers: Option<Vec<String>>,
    pub variation_rules: Option<Vec<String>>,
    pub prompting_guidance: Option<Vec<String>>,
    pub producer_notes: Option<PartialProducerNotes>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialStyleDirection {
    pub lighting: Option<String>,
    pub colour: Option<String>,
    pub composition: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialPalette {
    pub primary: Option<Vec<String>>,
    pub secondary: Option<Vec<String>>,
    pub neutrals: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialImageCategory {
    pub category_name: Option<String>,
    pub subject_matter: Option<String>,
    pub context: Option<String>,
    pub examples: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialProducerNotes {
    pub camera: Option<String>,
    pub lighting: Option<String>,
    pub angle: Option<String>,
    pub scene: Option<String>,
}

impl PartialGuideline {
    /// True when parsing recovered no recognizable content at all.
    pub fn is_empty(&self) -> bool {
        fn no_items(list: &Option<Vec<String>>) -> bool {
            list.as_ref().map(|items| items.is_empty()).unwrap_or(true)
        }
        fn no_text(text: &Option<String>) -> bool {
            text.as_ref()
                .map(|value| value.trim().is_empty())
                .unwrap_or(true)
        }

        let style_empty = self
            .style_direction
            .as_ref()
            .map(|style| {
                no_text(&style.lighting)
                    && no_text(&style.colour)
                    && no_text(&style.composition)
                    && no_text(&style.format)
            })
            .unwrap_or(true);
        let palette_empty = self
            .palette
            .as_ref()
            .map(|palette| {
                no_items(&palette.primary)
                    && no_items(&palette.secondary)
                    && no_items(&palette.neutrals)
            })
            .unwrap_or(true);
        let types_empty = self
            .types_of_images
            .as_ref()
            .map(|entries| {
                entries.iter().all(|entry| {
                    no_text(&entry.category_name)
                        && no_text(&entry.subject_matter)
                        && no_text(&entry.context)
                        && no_items(&entry.examples)
                })
            })
            .unwrap_or(true);
        let notes_empty = self
            .producer_notes
            .as_ref()
            .map(|notes| {
                no_text(&notes.camera)
                    && no_text(&notes.lighting)
                    && no_text(&notes.angle)
                    && no_text(&notes.scene)
            })
            .unwrap_or(true);

        no_items(&self.general_principles)
            && style_empty
            && palette_empty
            && no_items(&self.people_and_emotions)
            && types_empty
            && no_items(&self.neuro_triggers)
            && no_items(&self.variation_rules)
            && no_items(&self.prompting_guidance)
            && notes_empty
    }
}

impl From<VisualGuideRules> for PartialGuideline {
    fn from(rules: VisualGuideRules) -> Self {
        Self {
            general_principles: Some(rules.general_principles),
            style_direction: Some(rules.style_direction.into()),
            palette: Some(rules.palette.into()),
            people_and_emotions: Some(rules.people_and_emotions),
            types_of_images: Some(
                rules
                    .types_of_images
                    .into_iter()
                    .map(PartialImageCategory::from)
                    .collect(),
            ),
            neuro_triggers: Some(rules.neuro_triggers),
            variation_rules: Some(rules.variation_rules),
            prompting_guidance: Some(rules.prompting_guidance),
            producer_notes: Some(rules.producer_notes.into()),
        }
    }
}

impl From<StyleDirection> for PartialStyleDirection {
    fn from(style: StyleDirection) -> Self {
        Self {
            lighting: Some(style.lighting),
            colour: Some(style.colour),
            composition: Some(style.composition),
            format: Some(style.format),
        }
    }
}

impl From<Palette> for PartialPalette {
    fn from(palette: Palette) -> Self {
        Self {
            primary: Some(palette.primary),
            secondary: Some(palette.secondary),
            neutrals: Some(palette.neutrals),
        }
    }
}

impl From<ImageCategory> for PartialImageCategory {
    fn from(category: ImageCategory) -> Self {
        Self {
            category_name: Some(category.category_name),
            subject_matter: category.subject_matter,
            context: category.context,
            examples: Some(category.examples),
        }
    }
}

impl From<ProducerNotes> for PartialProducerNotes {
    fn from(notes: ProducerNotes) -> Self {
        Self {
            camera: Some(notes.camera),
            lighting: Some(notes.lighting),
            angle: Some(notes.angle),
            scene: Some(notes.scene),
        }
    }
}
