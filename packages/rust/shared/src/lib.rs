//! Shared types, error model, and configuration for brandctx.
//!
//! This crate is the foundation depended on by all other brandctx crates.
//! It provides:
//! - [`ContextError`]: the unified error type
//! - The Context Document ([`ContextDocument`] and its sections)
//! - Configuration ([`AppConfig`], [`StorageConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BackendKind, DEFAULT_PROMPT_PLACEHOLDER, PromptConfig, StorageConfig, config_dir,
    config_file_path, expand_home, init_config, load_config, load_config_from,
};
pub use error::{ContextError, Result};
pub use types::{
    AiPersonaConfig, AudienceSegment, BrandColors, BrandIdentity, BrandTone, ChannelSets,
    CommunicationStyle, Company, CompanySize, ContentCadence, ContentPreferences,
    ContextDocument, CURRENT_DOCUMENT_VERSION, GoToMarketStrategy, HexColor, LengthPreferences,
    MarketingGoals, Metadata, TargetAudience, is_compatible_version,
};
