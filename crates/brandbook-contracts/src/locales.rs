/// Section headings used by the markdown renderer for one locale.
///
/// This is the single label table for the subsystem: the renderer takes its
/// headings from here and the analysis prompt takes its target-language name
/// from [`language_name_for`], so both share one fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocaleLabels {
    pub title: &'static str,
    pub general_principles: &'static str,
    pub style_direction: &'static str,
    pub lighting: &'static str,
    pub colour: &'static str,
    pub composition: &'static str,
    pub format: &'static str,
    pub palette: &'static str,
    pub primary_colours: &'static str,
    pub secondary_colours: &'static str,
    pub neutrals: &'static str,
    pub people_and_emotions: &'static str,
    pub types_of_images: &'static str,
    pub subject_matter: &'static str,
    pub context: &'static str,
    pub examples: &'static str,
    pub neuro_triggers: &'static str,
    pub variation_rules: &'static str,
    pub prompting_guidance: &'static str,
    pub producer_notes: &'static str,
    pub camera: &'static str,
    pub angle: &'static str,
    pub scene: &'static str,
}

pub const SUPPORTED_LOCALES: &[&str] = &["en-US", "en-GB", "pt-BR", "pt-PT"];

const EN_US: LocaleLabels = LocaleLabels {
    title: "Brand Visual Guidelines",
    general_principles: "General Principles",
    style_direction: "Style Direction",
    lighting: "Lighting",
    colour: "Color",
    composition: "Composition",
    format: "Format",
    palette: "Color Palette",
    primary_colours: "Primary Colors",
    secondary_colours: "Secondary Colors",
    neutrals: "Neutrals",
    people_and_emotions: "People & Emotions",
    types_of_images: "Types of Images",
    subject_matter: "Subject matter",
    context: "Context",
    examples: "Examples",
    neuro_triggers: "Neuro Triggers",
    variation_rules: "Variation Rules",
    prompting_guidance: "Prompting Guidance",
    producer_notes: "Producer Notes",
    camera: "Camera",
    angle: "Angle",
    scene: "Scene",
};

const EN_GB: LocaleLabels = LocaleLabels {
    colour: "Colour",
    palette: "Colour Palette",
    primary_colours: "Primary Colours",
    secondary_colours: "Secondary Colours",
    ..EN_US
};

const PT_BR: LocaleLabels = LocaleLabels {
    title: "Diretrizes Visuais da Marca",
    general_principles: "Princípios Gerais",
    style_direction: "Direção de Estilo",
    lighting: "Iluminação",
    colour: "Cor",
    composition: "Composição",
    format: "Formato",
    palette: "Paleta de Cores",
    primary_colours: "Cores Primárias",
    secondary_colours: "Cores Secundárias",
    neutrals: "Neutros",
    people_and_emotions: "Pessoas e Emoções",
    types_of_images: "Tipos de Imagens",
    subject_matter: "Tema",
    context: "Contexto",
    examples: "Exemplos",
    neuro_triggers: "Gatilhos Neurais",
    variation_rules: "Regras de Variação",
    prompting_guidance: "Orientações de Prompt",
    producer_notes: "Notas de Produção",
    camera: "Câmera",
    angle: "Ângulo",
    scene: "Cena",
};

const PT_PT: LocaleLabels = LocaleLabels {
    camera: "Câmara",
    ..PT_BR
};

/// Headings for a locale code; unsupported codes fall back to `en-US`.
pub fn labels_for(locale: &str) -> &'static LocaleLabels {
    match locale {
        "en-GB" => &EN_GB,
        "pt-BR" => &PT_BR,
        "pt-PT" => &PT_PT,
        _ => &EN_US,
    }
}

/// Human-readable language name the analysis prompt asks the model to
/// answer in; unmapped codes default to `English (US)`.
pub fn language_name_for(locale: &str) -> &'static str {
    match locale {
        "en-GB" => "English (UK)",
        "pt-BR" => "Portuguese (Brazil)",
        "pt-PT" => "Portuguese (Portugal)",
        _ => "English (US)",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_supported_locale_has_labels() {
        for locale in SUPPORTED_LOCALES {
            let labels = labels_for(locale);
            assert!(!labels.title.is_empty());
        }
    }

    #[test]
    fn unknown_locale_falls_back_to_en_us() {
        assert_eq!(labels_for("fr-FR"), labels_for("en-US"));
        assert_eq!(language_name_for("fr-FR"), "English (US)");
    }

    #[test]
    fn british_english_uses_colour_spelling() {
        let labels = labels_for("en-GB");
        assert_eq!(labels.colour, "Colour");
        assert_eq!(labels.palette, "Colour Palette");
        assert_eq!(labels.title, labels_for("en-US").title);
    }

    #[test]
    fn brazilian_portuguese_title_matches_rendered_document() {
        assert_eq!(labels_for("pt-BR").title, "Diretrizes Visuais da Marca");
        assert_eq!(language_name_for("pt-BR"), "Portuguese (Brazil)");
    }

    #[test]
    fn european_portuguese_differs_only_where_usage_differs() {
        let br = labels_for("pt-BR");
        let pt = labels_for("pt-PT");
        assert_eq!(br.title, pt.title);
        assert_ne!(br.camera, pt.camera);
    }
}
