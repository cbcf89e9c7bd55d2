//! The Context Document: company, brand, marketing and AI-persona data.
//!
//! Serialized as camelCase JSON. Every section tolerates missing fields so a
//! document that is only partly filled in during onboarding still loads.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ContextError, Result};

/// Schema version stamped on newly created documents.
pub const CURRENT_DOCUMENT_VERSION: &str = "1.0.0";

/// Whether a stored schema version can be read by this build (same major).
pub fn is_compatible_version(version: &str) -> bool {
    fn major(v: &str) -> Option<u64> {
        v.trim().trim_start_matches('v').split('.').next()?.parse().ok()
    }
    match (major(version), major(CURRENT_DOCUMENT_VERSION)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// ContextDocument
// ---------------------------------------------------------------------------

/// The single root record owned by the Context Store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextDocument {
    #[serde(default)]
    pub company: Company,
    #[serde(default)]
    pub brand_identity: BrandIdentity,
    #[serde(default)]
    pub marketing_goals: MarketingGoals,
    #[serde(default)]
    pub go_to_market_strategy: GoToMarketStrategy,
    #[serde(default)]
    pub content_preferences: ContentPreferences,
    #[serde(default, rename = "aiPersonaConfig")]
    pub ai_persona: AiPersonaConfig,
    pub metadata: Metadata,
}

impl ContextDocument {
    /// A document holding only the section defaults, stamped at `now`.
    pub fn with_defaults(now: DateTime<Utc>) -> Self {
        Self {
            company: Company::default(),
            brand_identity: BrandIdentity::default(),
            marketing_goals: MarketingGoals::default(),
            go_to_market_strategy: GoToMarketStrategy::default(),
            content_preferences: ContentPreferences::default(),
            ai_persona: AiPersonaConfig::default(),
            metadata: Metadata::stamped(now),
        }
    }

    /// Check the semantic rules that serde alone cannot express.
    pub fn validate(&self) -> Result<()> {
        if !is_compatible_version(&self.metadata.version) {
            return Err(ContextError::validation(format!(
                "schema version {} is not compatible with {CURRENT_DOCUMENT_VERSION}",
                self.metadata.version
            )));
        }
        if self.metadata.updated_at < self.metadata.created_at {
            return Err(ContextError::validation(
                "metadata.updatedAt precedes metadata.createdAt",
            ));
        }
        if let Some(website) = &self.company.website {
            if !matches!(website.scheme(), "http" | "https") {
                return Err(ContextError::validation(format!(
                    "company website must be http(s), got {website}"
                )));
            }
        }
        let lengths = &self.content_preferences.length_preferences;
        if lengths.blog_post_words == 0
            || lengths.social_post_chars == 0
            || lengths.email_words == 0
        {
            return Err(ContextError::validation(
                "content length targets must be greater than zero",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Company
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Company {
    pub name: String,
    pub industry: String,
    pub size: CompanySize,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<Url>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanySize {
    #[default]
    Startup,
    Small,
    Medium,
    Enterprise,
}

impl CompanySize {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Enterprise => "enterprise",
        }
    }
}

impl std::fmt::Display for CompanySize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CompanySize {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "startup" => Ok(Self::Startup),
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(ContextError::format(format!(
                "unknown company size '{other}': expected startup, small, medium, or enterprise"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// BrandIdentity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrandIdentity {
    /// Ordered, most important first.
    pub value_propositions: Vec<String>,
    /// Ordered, most important first.
    pub core_offerings: Vec<String>,
    pub target_audience: TargetAudience,
    pub brand_tone: BrandTone,
    pub brand_colors: BrandColors,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TargetAudience {
    pub demographics: String,
    pub psychographics: String,
    pub pain_points: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact_narrative: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrandTone {
    pub personality: Vec<String>,
    pub voice_attributes: Vec<String>,
    pub communication_style: CommunicationStyle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationStyle {
    #[default]
    Professional,
    Casual,
    Friendly,
    Authoritative,
    Playful,
}

impl CommunicationStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Professional => "professional",
            Self::Casual => "casual",
            Self::Friendly => "friendly",
            Self::Authoritative => "authoritative",
            Self::Playful => "playful",
        }
    }
}

impl std::fmt::Display for CommunicationStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrandColors {
    pub primary: HexColor,
    pub secondary: HexColor,
    pub accent: HexColor,
}

impl Default for BrandColors {
    fn default() -> Self {
        Self {
            primary: HexColor::from_static("#1E3A8A"),
            secondary: HexColor::from_static("#F59E0B"),
            accent: HexColor::from_static("#10B981"),
        }
    }
}

/// A CSS hex color (`#RGB` or `#RRGGBB`). Only constructible when valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

static HEX_COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid regex"));

impl HexColor {
    /// Parse a hex color, normalizing to uppercase.
    pub fn new(value: impl AsRef<str>) -> Result<Self> {
        let value = value.as_ref().trim();
        if HEX_COLOR_RE.is_match(value) {
            Ok(Self(value.to_ascii_uppercase()))
        } else {
            Err(ContextError::format(format!(
                "invalid color '{value}': expected #RGB or #RRGGBB"
            )))
        }
    }

    fn from_static(value: &'static str) -> Self {
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HexColor {
    type Error = ContextError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.0
    }
}

impl std::fmt::Display for HexColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// MarketingGoals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarketingGoals {
    pub primary_goals: Vec<String>,
    pub kpis: Vec<String>,
    pub content_cadence: ContentCadence,
    /// Free-form band such as "$1k-$5k / month".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    pub channels: ChannelSets,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentCadence {
    Daily,
    #[default]
    Weekly,
    BiWeekly,
    Monthly,
}

impl ContentCadence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::BiWeekly => "bi-weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for ContentCadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChannelSets {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
    pub experimental: Vec<String>,
}

// ---------------------------------------------------------------------------
// GoToMarketStrategy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoToMarketStrategy {
    pub audience_segments: Vec<AudienceSegment>,
    pub competitive_advantage: String,
    pub market_position: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AudienceSegment {
    pub name: String,
    pub description: String,
    pub channels: Vec<String>,
    pub messaging: String,
}

// ---------------------------------------------------------------------------
// ContentPreferences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentPreferences {
    pub content_types: Vec<String>,
    pub length_preferences: LengthPreferences,
    pub style_guidelines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LengthPreferences {
    pub blog_post_words: u32,
    pub social_post_chars: u32,
    pub email_words: u32,
}

impl Default for LengthPreferences {
    fn default() -> Self {
        Self {
            blog_post_words: 2000,
            social_post_chars: 280,
            email_words: 500,
        }
    }
}

// ---------------------------------------------------------------------------
// AiPersonaConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AiPersonaConfig {
    pub personality: Vec<String>,
    pub communication_pattern: String,
    pub knowledge_areas: Vec<String>,
    pub constraints: Vec<String>,
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// False when the document was written by an older, unmigrated schema.
    #[serde(default = "default_true")]
    pub compatible: bool,
}

fn default_true() -> bool {
    true
}

impl Metadata {
    /// Fresh metadata with `createdAt == updatedAt == now`.
    pub fn stamped(now: DateTime<Utc>) -> Self {
        Self {
            version: CURRENT_DOCUMENT_VERSION.to_string(),
            created_at: now,
            updated_at: now,
            compatible: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_defaults() {
        let prefs = LengthPreferences::default();
        assert_eq!(prefs.blog_post_words, 2000);
        assert_eq!(prefs.social_post_chars, 280);
        assert_eq!(prefs.email_words, 500);
    }

    #[test]
    fn document_serializes_camel_case() {
        let doc = ContextDocument::with_defaults(Utc::now());
        let json = serde_json::to_value(&doc).expect("serialize");
        assert!(json.get("brandIdentity").is_some());
        assert!(json.get("aiPersonaConfig").is_some());
        assert_eq!(
            json["contentPreferences"]["lengthPreferences"]["blogPostWords"],
            2000
        );
        assert_eq!(json["metadata"]["version"], "1.0.0");
    }

    #[test]
    fn cadence_uses_kebab_case() {
        let json = serde_json::to_string(&ContentCadence::BiWeekly).unwrap();
        assert_eq!(json, "\"bi-weekly\"");
        let parsed: ContentCadence = serde_json::from_str("\"monthly\"").unwrap();
        assert_eq!(parsed, ContentCadence::Monthly);
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let json = r#"{
            "company": { "name": "Acme" },
            "metadata": {
                "version": "1.0.0",
                "createdAt": "2026-01-01T00:00:00Z",
                "updatedAt": "2026-01-02T00:00:00Z"
            }
        }"#;
        let doc: ContextDocument = serde_json::from_str(json).expect("deserialize");
        assert_eq!(doc.company.name, "Acme");
        assert_eq!(doc.company.size, CompanySize::Startup);
        assert!(doc.metadata.compatible);
        assert_eq!(doc.content_preferences.length_preferences.email_words, 500);
    }

    #[test]
    fn missing_metadata_is_rejected() {
        let result = serde_json::from_str::<ContextDocument>(r#"{"company":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn hex_color_validation() {
        assert_eq!(HexColor::new("#abc").unwrap().as_str(), "#ABC");
        assert!(HexColor::new("#12345G").is_err());
        assert!(HexColor::new("red").is_err());

        let bad = r##"{"primary": "blue"}"##;
        assert!(serde_json::from_str::<BrandColors>(bad).is_err());
    }

    #[test]
    fn version_compatibility() {
        assert!(is_compatible_version("1.0.0"));
        assert!(is_compatible_version("1.4.2"));
        assert!(!is_compatible_version("2.0.0"));
        assert!(!is_compatible_version("garbage"));
    }

    #[test]
    fn validate_rejects_non_http_website() {
        let mut doc = ContextDocument::with_defaults(Utc::now());
        doc.company.website = Some(Url::parse("ftp://acme.example").unwrap());
        let err = doc.validate().unwrap_err();
        assert!(err.to_string().contains("http"));

        doc.company.website = Some(Url::parse("https://acme.example").unwrap());
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_lengths() {
        let mut doc = ContextDocument::with_defaults(Utc::now());
        doc.content_preferences.length_preferences.social_post_chars = 0;
        assert!(matches!(
            doc.validate(),
            Err(ContextError::Validation { .. })
        ));
    }

    #[test]
    fn context_fixture_validates() {
        let fixture = std::fs::read_to_string(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../../fixtures/json/context.fixture.json"
        ))
        .expect("read fixture");
        let parsed: ContextDocument =
            serde_json::from_str(&fixture).expect("deserialize fixture document");
        assert_eq!(parsed.company.name, "Acme Corp");
        assert_eq!(parsed.company.size, CompanySize::Medium);
        assert_eq!(parsed.marketing_goals.content_cadence, ContentCadence::Weekly);
        assert_eq!(parsed.go_to_market_strategy.audience_segments.len(), 2);
        assert_eq!(parsed.brand_identity.brand_colors.accent.as_str(), "#F97316");
        assert!(parsed.validate().is_ok());
    }
}
