use serde::{Deserialize, Serialize};

/// Canonical visual brand guideline.
///
/// Always total: every list has at least one entry and every scalar is
/// non-empty once it has passed through [`super::normalize`]. Instances are
/// built once per analysis, handed whole to the renderer and prompt
/// synthesizer, and persisted replace-not-merge by the guideline store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualGuideRules {
    pub general_principles: Vec<String>,
    pub style_direction: StyleDirection,
    pub palette: Palette,
    pub people_and_emotions: Vec<String>,
    pub types_of_images: Vec<ImageCategory>,
    pub neuro_triggers: Vec<String>,
    pub variation_rules: Vec<String>,
    pub prompting_guidance: Vec<String>,
    pub producer_notes: ProducerNotes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDirection {
    pub lighting: String,
    pub colour: String,
    pub composition: String,
    pub format: String,
}

/// Hex color groups, e.g. `["#1A1A1A", "#FFFFFF"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
    pub neutrals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageCategory {
    pub category_name: String,
    pub subject_matter: Option<String>,
    pub context: Option<String>,
    pub examples: Vec<String>,
}

/// Camera/lighting/angle/scene guidance for photographers and for
/// image-generation prompting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerNotes {
    pub camera: String,
    pub lighting: String,
    pub angle: String,
    pub scene: String,
}
