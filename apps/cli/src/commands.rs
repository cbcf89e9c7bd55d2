//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use serde_json::{Map, Value, json};
use tracing::info;

use brandctx_core::{ContextStore, deep_merge};
use brandctx_shared::{
    AppConfig, BackendKind, CompanySize, ContextError, init_config, load_config, load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// brandctx: the company context every generated asset is written against.
#[derive(Parser)]
#[command(
    name = "brandctx",
    version,
    about = "Manage the company Context Document used to personalize AI-generated content.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.brandctx/brandctx.toml).
    #[arg(long, env = "BRANDCTX_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Storage backend override: file, sqlite, or memory.
    #[arg(long, global = true)]
    pub backend: Option<BackendKind>,

    /// Storage path override (directory for file, database for sqlite).
    #[arg(long, global = true)]
    pub data: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Create the initial Context Document from defaults.
    Init {
        /// Company name.
        #[arg(short, long)]
        name: Option<String>,

        /// Company industry.
        #[arg(short, long)]
        industry: Option<String>,

        /// Company size: startup, small, medium, or enterprise.
        #[arg(short, long)]
        size: Option<CompanySize>,

        /// Partial JSON document to merge over the defaults.
        #[arg(long)]
        from: Option<PathBuf>,

        /// Replace an existing document.
        #[arg(long)]
        force: bool,
    },

    /// Print the current document as JSON.
    Show,

    /// Show onboarding completeness and timestamps.
    Status,

    /// Print the prompt projection of the current document.
    Prompt,

    /// Export the current document as a JSON snapshot.
    Export {
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Replace the current document with a JSON snapshot.
    Import {
        /// Snapshot file produced by `export`.
        file: PathBuf,
    },

    /// Deep-merge a partial JSON document over the current one.
    Patch {
        /// Partial document file.
        file: PathBuf,
    },

    /// Delete the persisted document.
    Clear,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so `show` and
/// `export` output stays pipeable.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "brandctx=warn",
        1 => "brandctx=info",
        2 => "brandctx=debug",
        _ => "brandctx=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;

    if let Command::Config { action } = &cli.command {
        return match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        };
    }

    let store = open_store(&config).await?;
    let result = match cli.command {
        Command::Init {
            name,
            industry,
            size,
            from,
            force,
        } => {
            cmd_init(
                &store,
                name.as_deref(),
                industry.as_deref(),
                size,
                from.as_deref(),
                force,
            )
            .await
        }
        Command::Show => cmd_show(&store),
        Command::Status => cmd_status(&store),
        Command::Prompt => cmd_prompt(&store),
        Command::Export { out } => cmd_export(&store, out.as_deref()),
        Command::Import { file } => cmd_import(&store, &file).await,
        Command::Patch { file } => cmd_patch(&store, &file).await,
        Command::Clear => cmd_clear(&store).await,
        Command::Config { .. } => Ok(()),
    };
    store.dispose();
    result
}

/// File config with CLI overrides applied.
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if let Some(backend) = cli.backend {
        config.storage.backend = backend;
    }
    if let Some(data) = &cli.data {
        config.storage.path = data.clone();
    }
    Ok(config)
}

/// Open the store and load whatever is persisted.
///
/// A corrupt document is reported but not fatal, so `init --force` and
/// `import` can still replace it.
async fn open_store(config: &AppConfig) -> Result<ContextStore> {
    let store = ContextStore::from_config(config)
        .await
        .wrap_err("failed to open context storage")?;

    store.subscribe(|doc| {
        info!(
            company = %doc.company.name,
            updated_at = %doc.metadata.updated_at,
            "context document changed"
        );
        Ok(())
    });

    match store.init().await {
        Ok(_) => {}
        Err(ContextError::Format { message }) => {
            eprintln!("warning: stored context document is unreadable: {message}");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(store)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_init(
    store: &ContextStore,
    name: Option<&str>,
    industry: Option<&str>,
    size: Option<CompanySize>,
    from: Option<&Path>,
    force: bool,
) -> Result<()> {
    if store.get_current().is_some() && !force {
        return Err(eyre!(
            "a context document already exists; pass --force to replace it"
        ));
    }

    let base = match from {
        Some(path) => read_json(path)?,
        None => Value::Object(Map::new()),
    };
    let partial = deep_merge(base, company_overrides(name, industry, size));

    let doc = store.create_initial_document(&partial)?;
    let doc = store.save(doc).await?;

    println!();
    println!("  Context document created.");
    println!("  Company:  {}", display_or_dash(&doc.company.name));
    println!("  Industry: {}", display_or_dash(&doc.company.industry));
    println!("  Size:     {}", doc.company.size);
    println!("  Created:  {}", doc.metadata.created_at.to_rfc3339());
    println!();
    Ok(())
}

fn cmd_show(store: &ContextStore) -> Result<()> {
    match store.export_snapshot() {
        Ok(json) => {
            println!("{json}");
            Ok(())
        }
        Err(ContextError::NoDocument) => {
            println!("Onboarding not yet started. Run `brandctx init` to create a context document.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_status(store: &ContextStore) -> Result<()> {
    let Some(doc) = store.get_current() else {
        println!("Onboarding not yet started.");
        return Ok(());
    };
    let report = store.completeness()?;

    println!();
    println!("  Company:  {}", display_or_dash(&doc.company.name));
    println!("  Version:  {}", doc.metadata.version);
    println!("  Created:  {}", doc.metadata.created_at.to_rfc3339());
    println!("  Updated:  {}", doc.metadata.updated_at.to_rfc3339());
    println!("  Complete: {}%", report.percent);
    println!();
    for section in &report.sections {
        let mark = if section.populated { "x" } else { " " };
        println!("  [{mark}] {}", section.section);
    }
    println!();
    Ok(())
}

fn cmd_prompt(store: &ContextStore) -> Result<()> {
    println!("{}", store.get_prompt_context());
    Ok(())
}

fn cmd_export(store: &ContextStore, out: Option<&Path>) -> Result<()> {
    let json = store.export_snapshot().map_err(|e| match e {
        ContextError::NoDocument => eyre!("nothing to export: no context document yet"),
        other => other.into(),
    })?;

    match out {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = json.len(), "exported snapshot");
            println!("Exported to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn cmd_import(store: &ContextStore, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .wrap_err_with(|| format!("failed to read {}", file.display()))?;
    let doc = store
        .import_snapshot(&raw)
        .await
        .wrap_err_with(|| format!("could not import {}", file.display()))?;
    println!(
        "Imported context for {} (updated {}).",
        display_or_dash(&doc.company.name),
        doc.metadata.updated_at.to_rfc3339()
    );
    Ok(())
}

async fn cmd_patch(store: &ContextStore, file: &Path) -> Result<()> {
    let patch = read_json(file)?;
    let doc = store.apply_patch(&patch).await.map_err(|e| match e {
        ContextError::NoDocument => eyre!("no context document to patch; run `brandctx init` first"),
        other => other.into(),
    })?;
    println!("Patched. Updated {}.", doc.metadata.updated_at.to_rfc3339());
    Ok(())
}

async fn cmd_clear(store: &ContextStore) -> Result<()> {
    store.clear().await?;
    println!("Context document cleared.");
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_json(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).wrap_err_with(|| format!("{} is not valid JSON", path.display()))
}

/// `{"company": {...}}` holding only the flags that were given.
fn company_overrides(
    name: Option<&str>,
    industry: Option<&str>,
    size: Option<CompanySize>,
) -> Value {
    let mut company = Map::new();
    if let Some(name) = name {
        company.insert("name".into(), json!(name));
    }
    if let Some(industry) = industry {
        company.insert("industry".into(), json!(industry));
    }
    if let Some(size) = size {
        company.insert("size".into(), json!(size.as_str()));
    }
    json!({ "company": company })
}

fn display_or_dash(value: &str) -> &str {
    if value.trim().is_empty() { "-" } else { value }
}
