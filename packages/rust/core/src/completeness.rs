//! Onboarding completeness: which sections carry user-supplied data.

use serde::Serialize;

use brandctx_shared::ContextDocument;

/// One section's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionStatus {
    pub section: &'static str,
    pub populated: bool,
}

/// Per-section report plus an overall percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completeness {
    pub sections: Vec<SectionStatus>,
    pub percent: u8,
}

impl Completeness {
    pub fn is_complete(&self) -> bool {
        self.sections.iter().all(|s| s.populated)
    }

    /// Names of sections still waiting for input.
    pub fn missing(&self) -> Vec<&'static str> {
        self.sections
            .iter()
            .filter(|s| !s.populated)
            .map(|s| s.section)
            .collect()
    }
}

/// Inspect `doc`. Defaults (enums, colors, length targets) do not count as
/// populated; only free-text and list fields the user fills in do.
pub fn completeness(doc: &ContextDocument) -> Completeness {
    let company = &doc.company;
    let brand = &doc.brand_identity;
    let goals = &doc.marketing_goals;
    let gtm = &doc.go_to_market_strategy;
    let content = &doc.content_preferences;
    let persona = &doc.ai_persona;

    let sections = vec![
        status("company", has(&company.name) && has(&company.industry)),
        status(
            "brandIdentity",
            !brand.value_propositions.is_empty()
                || !brand.core_offerings.is_empty()
                || has(&brand.target_audience.demographics),
        ),
        status("marketingGoals", !goals.primary_goals.is_empty() || !goals.kpis.is_empty()),
        status(
            "goToMarketStrategy",
            !gtm.audience_segments.is_empty()
                || has(&gtm.competitive_advantage)
                || has(&gtm.market_position),
        ),
        status(
            "contentPreferences",
            !content.content_types.is_empty() || !content.style_guidelines.is_empty(),
        ),
        status(
            "aiPersonaConfig",
            !persona.personality.is_empty()
                || has(&persona.communication_pattern)
                || !persona.knowledge_areas.is_empty(),
        ),
    ];

    let populated = sections.iter().filter(|s| s.populated).count();
    let percent = (populated * 100 / sections.len()) as u8;

    Completeness { sections, percent }
}

fn status(section: &'static str, populated: bool) -> SectionStatus {
    SectionStatus { section, populated }
}

fn has(value: &str) -> bool {
    !value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn fresh_document_is_empty() {
        let report = completeness(&ContextDocument::with_defaults(Utc::now()));
        assert_eq!(report.percent, 0);
        assert_eq!(report.missing().len(), 6);
        assert!(!report.is_complete());
    }

    #[test]
    fn counts_populated_sections() {
        let mut doc = ContextDocument::with_defaults(Utc::now());
        doc.company.name = "Acme".into();
        doc.company.industry = "Robotics".into();
        doc.marketing_goals.kpis = vec!["Signups".into()];
        doc.ai_persona.communication_pattern = "Short and direct".into();

        let report = completeness(&doc);
        assert_eq!(report.percent, 50);
        assert_eq!(
            report.missing(),
            vec!["brandIdentity", "goToMarketStrategy", "contentPreferences"]
        );
    }

    #[test]
    fn whitespace_does_not_count() {
        let mut doc = ContextDocument::with_defaults(Utc::now());
        doc.company.name = "   ".into();
        doc.company.industry = "Robotics".into();
        assert!(!completeness(&doc).sections[0].populated);
    }
}
