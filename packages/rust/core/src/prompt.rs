//! Prompt projection: the document flattened into labeled plain text for
//! downstream AI generation calls.
//!
//! Output is a pure function of the document. Content preferences and
//! metadata are not part of the projection.

use brandctx_shared::ContextDocument;

const NOT_SPECIFIED: &str = "(not specified)";

/// Render `doc`, or `placeholder` when no document is loaded.
pub fn render_prompt_context(doc: Option<&ContextDocument>, placeholder: &str) -> String {
    match doc {
        Some(doc) => render_document(doc),
        None => placeholder.to_string(),
    }
}

fn render_document(doc: &ContextDocument) -> String {
    let mut out = String::with_capacity(2048);

    let company = &doc.company;
    field(&mut out, "Company", &company.name);
    field(&mut out, "Industry", &company.industry);
    field(&mut out, "Size", company.size.as_str());
    field(&mut out, "Description", &company.description);
    if let Some(website) = &company.website {
        field(&mut out, "Website", website.as_str());
    }

    let brand = &doc.brand_identity;
    section(&mut out, "Brand Identity");
    item(&mut out, "Value Propositions", &join(&brand.value_propositions));
    item(&mut out, "Core Offerings", &join(&brand.core_offerings));
    item(&mut out, "Target Demographics", &brand.target_audience.demographics);
    item(&mut out, "Target Psychographics", &brand.target_audience.psychographics);
    item(&mut out, "Pain Points", &join(&brand.target_audience.pain_points));
    if let Some(impact) = &brand.target_audience.impact_narrative {
        item(&mut out, "Impact", impact);
    }
    item(&mut out, "Brand Personality", &join(&brand.brand_tone.personality));
    item(&mut out, "Voice", &join(&brand.brand_tone.voice_attributes));
    item(
        &mut out,
        "Communication Style",
        brand.brand_tone.communication_style.as_str(),
    );
    let colors = &brand.brand_colors;
    item(
        &mut out,
        "Brand Colors",
        &format!(
            "primary {}, secondary {}, accent {}",
            colors.primary, colors.secondary, colors.accent
        ),
    );

    let goals = &doc.marketing_goals;
    section(&mut out, "Marketing Goals");
    item(&mut out, "Primary Goals", &join(&goals.primary_goals));
    item(&mut out, "KPIs", &join(&goals.kpis));
    item(&mut out, "Content Cadence", goals.content_cadence.as_str());
    if let Some(budget) = &goals.budget {
        item(&mut out, "Budget", budget);
    }
    item(&mut out, "Primary Channels", &join(&goals.channels.primary));
    item(&mut out, "Secondary Channels", &join(&goals.channels.secondary));
    item(&mut out, "Experimental Channels", &join(&goals.channels.experimental));

    let gtm = &doc.go_to_market_strategy;
    section(&mut out, "Go-To-Market Strategy");
    item(&mut out, "Competitive Advantage", &gtm.competitive_advantage);
    item(&mut out, "Market Position", &gtm.market_position);
    if gtm.audience_segments.is_empty() {
        item(&mut out, "Audience Segments", "");
    } else {
        out.push_str("- Audience Segments:\n");
        for segment in &gtm.audience_segments {
            out.push_str(&format!(
                "  * {}: {} (channels: {}; messaging: {})\n",
                or_unspecified(&segment.name),
                or_unspecified(&segment.description),
                join(&segment.channels),
                or_unspecified(&segment.messaging),
            ));
        }
    }

    let persona = &doc.ai_persona;
    section(&mut out, "AI Persona");
    item(&mut out, "Personality", &join(&persona.personality));
    item(&mut out, "Communication Pattern", &persona.communication_pattern);
    item(&mut out, "Knowledge Areas", &join(&persona.knowledge_areas));
    item(&mut out, "Constraints", &join(&persona.constraints));

    out.truncate(out.trim_end().len());
    out
}

fn field(out: &mut String, label: &str, value: &str) {
    out.push_str(&format!("{label}: {}\n", or_unspecified(value)));
}

fn section(out: &mut String, title: &str) {
    out.push_str(&format!("\n{title}:\n"));
}

fn item(out: &mut String, label: &str, value: &str) {
    out.push_str(&format!("- {label}: {}\n", or_unspecified(value)));
}

fn join(values: &[String]) -> String {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn or_unspecified(value: &str) -> &str {
    let value = value.trim();
    if value.is_empty() { NOT_SPECIFIED } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandctx_shared::{AudienceSegment, ContentCadence, DEFAULT_PROMPT_PLACEHOLDER};
    use chrono::Utc;

    fn acme() -> ContextDocument {
        let mut doc = ContextDocument::with_defaults(Utc::now());
        doc.company.name = "Acme Corp".into();
        doc.company.industry = "Logistics".into();
        doc.marketing_goals.content_cadence = ContentCadence::Weekly;
        doc.marketing_goals.kpis = vec!["MQLs".into(), "Demo rate".into()];
        doc.go_to_market_strategy.audience_segments = vec![AudienceSegment {
            name: "3PL operators".into(),
            description: "Third-party logistics".into(),
            channels: vec!["Email".into()],
            messaging: "One planner for every lane".into(),
        }];
        doc.ai_persona.constraints = vec!["Never promise savings".into()];
        doc
    }

    #[test]
    fn contains_company_and_cadence() {
        let text = render_prompt_context(Some(&acme()), DEFAULT_PROMPT_PLACEHOLDER);
        assert!(text.contains("Acme Corp"));
        assert!(text.contains("weekly"));
    }

    #[test]
    fn covers_every_projected_section() {
        let text = render_prompt_context(Some(&acme()), DEFAULT_PROMPT_PLACEHOLDER);
        for heading in [
            "Company: Acme Corp",
            "Brand Identity:",
            "Marketing Goals:",
            "- KPIs: MQLs, Demo rate",
            "Go-To-Market Strategy:",
            "* 3PL operators: Third-party logistics (channels: Email; messaging: One planner for every lane)",
            "AI Persona:",
            "- Constraints: Never promise savings",
        ] {
            assert!(text.contains(heading), "missing {heading:?} in:\n{text}");
        }
        assert!(!text.contains("Content Preferences"));
    }

    #[test]
    fn empty_fields_are_labelled() {
        let doc = ContextDocument::with_defaults(Utc::now());
        let text = render_prompt_context(Some(&doc), DEFAULT_PROMPT_PLACEHOLDER);
        assert!(text.starts_with("Company: (not specified)"));
        assert!(!text.contains("Website:"));
    }

    #[test]
    fn deterministic() {
        let doc = acme();
        assert_eq!(
            render_prompt_context(Some(&doc), ""),
            render_prompt_context(Some(&doc), "")
        );
    }

    #[test]
    fn absent_document_uses_placeholder() {
        assert_eq!(
            render_prompt_context(None, DEFAULT_PROMPT_PLACEHOLDER),
            DEFAULT_PROMPT_PLACEHOLDER
        );
    }
}
