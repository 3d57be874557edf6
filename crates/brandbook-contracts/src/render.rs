use crate::guideline::VisualGuideRules;
use crate::locales::labels_for;

/// Renders the canonical guideline as a markdown document.
///
/// Deterministic: identical `(guide, locale)` input yields byte-identical
/// output. Only the heading labels vary with the locale; data values are
/// emitted verbatim. Unknown locales render with `en-US` headings.
pub fn render_markdown(guide: &VisualGuideRules, locale: &str) -> String {
    let labels = labels_for(locale);
    let mut doc = String::new();

    push_heading(&mut doc, 1, labels.title);

    push_heading(&mut doc, 2, labels.general_principles);
    push_bullets(&mut doc, &guide.general_principles);

    push_heading(&mut doc, 2, labels.style_direction);
    push_text_section(&mut doc, labels.lighting, &guide.style_direction.lighting);
    push_text_section(&mut doc, labels.colour, &guide.style_direction.colour);
    push_text_section(
        &mut doc,
        labels.composition,
        &guide.style_direction.composition,
    );
    push_text_section(&mut doc, labels.format, &guide.style_direction.format);

    push_heading(&mut doc, 2, labels.palette);
    push_heading(&mut doc, 3, labels.primary_colours);
    push_bullets(&mut doc, &guide.palette.primary);
    push_heading(&mut doc, 3, labels.secondary_colours);
    push_bullets(&mut doc, &guide.palette.secondary);
    push_heading(&mut doc, 3, labels.neutrals);
    push_bullets(&mut doc, &guide.palette.neutrals);

    push_heading(&mut doc, 2, labels.people_and_emotions);
    push_bullets(&mut doc, &guide.people_and_emotions);

    push_heading(&mut doc, 2, labels.types_of_images);
    for category in &guide.types_of_images {
        push_heading(&mut doc, 3, &category.category_name);
        if let Some(subject) = &category.subject_matter {
            doc.push_str(labels.subject_matter);
            doc.push_str(": ");
            doc.push_str(subject);
            doc.push_str("\n\n");
        }
        if let Some(context) = &category.context {
            doc.push_str(labels.context);
            doc.push_str(": ");
            doc.push_str(context);
            doc.push_str("\n\n");
        }
        doc.push_str(labels.examples);
        doc.push_str(":\n\n");
        push_bullets(&mut doc, &category.examples);
    }

    push_heading(&mut doc, 2, labels.neuro_triggers);
    push_bullets(&mut doc, &guide.neuro_triggers);

    push_heading(&mut doc, 2, labels.variation_rules);
    push_bullets(&mut doc, &guide.variation_rules);

    push_heading(&mut doc, 2, labels.prompting_guidance);
    push_bullets(&mut doc, &guide.prompting_guidance);

    push_heading(&mut doc, 2, labels.producer_notes);
    push_text_section(&mut doc, labels.camera, &guide.producer_notes.camera);
    push_text_section(&mut doc, labels.lighting, &guide.producer_notes.lighting);
    push_text_section(&mut doc, labels.angle, &guide.producer_notes.angle);
    push_text_section(&mut doc, labels.scene, &guide.producer_notes.scene);

    doc
}

/// Convenience for callers that only need the document title line.
pub fn document_title(locale: &str) -> &'static str {
    labels_for(locale).title
}

fn push_heading(doc: &mut String, level: usize, text: &str) {
    for _ in 0..level {
        doc.push('#');
    }
    doc.push(' ');
    doc.push_str(text);
    doc.push_str("\n\n");
}

fn push_text_section(doc: &mut String, label: &str, text: &str) {
    push_heading(doc, 3, label);
    doc.push_str(text);
    doc.push_str("\n\n");
}

fn push_bullets(doc: &mut String, items: &[String]) {
    for item in items {
        doc.push_str("- ");
        doc.push_str(item);
        doc.push('\n');
    }
    doc.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guideline::{normalize, PartialGuideline};

    fn sample_guide() -> VisualGuideRules {
        normalize(PartialGuideline {
            general_principles: Some(vec![
                "Show real customers".to_string(),
                "Avoid clichés".to_string(),
            ]),
            ..PartialGuideline::default()
        })
    }

    #[test]
    fn render_is_deterministic() {
        let guide = sample_guide();
        assert_eq!(
            render_markdown(&guide, "en-US"),
            render_markdown(&guide, "en-US")
        );
    }

    #[test]
    fn unsupported_locale_renders_with_en_us_labels() {
        let guide = sample_guide();
        assert_eq!(
            render_markdown(&guide, "fr-FR"),
            render_markdown(&guide, "en-US")
        );
    }

    #[test]
    fn pt_br_document_starts_with_localized_title() {
        let guide = sample_guide();
        let doc = render_markdown(&guide, "pt-BR");
        assert!(doc.starts_with("# Diretrizes Visuais da Marca"));
        assert!(doc.contains("## Princípios Gerais"));
        // Data values are never localized.
        assert!(doc.contains("- Show real customers"));
    }

    #[test]
    fn sections_appear_in_fixed_order() {
        let guide = sample_guide();
        let doc = render_markdown(&guide, "en-US");
        let order = [
            "# Brand Visual Guidelines",
            "## General Principles",
            "## Style Direction",
            "### Lighting",
            "### Color",
            "### Composition",
            "### Format",
            "## Color Palette",
            "### Primary Colors",
            "## People & Emotions",
            "## Types of Images",
            "## Neuro Triggers",
            "## Variation Rules",
            "## Prompting Guidance",
            "## Producer Notes",
            "### Camera",
            "### Angle",
            "### Scene",
        ];
        let mut cursor = 0;
        for marker in order {
            let found = doc[cursor..]
                .find(marker)
                .unwrap_or_else(|| panic!("missing section {marker}"));
            cursor += found + marker.len();
        }
    }

    #[test]
    fn palette_hex_values_render_as_bullets() {
        let guide = sample_guide();
        let doc = render_markdown(&guide, "en-US");
        assert!(doc.contains("- #1A1A1A"));
        assert!(doc.contains("- #FFFFFF"));
    }
}
