use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use po_core::config::{Config, WarnLevel, CONFIG_FILE};
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the effective configuration (file plus environment)
    Show,

    /// Validate the config for common mistakes
    Validate,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(config: Option<&Path>, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(config, json),
        ConfigSubcommand::Validate => validate(config, json),
        ConfigSubcommand::Init { force } => init(config, force),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let mut config = Config::load(path).context("failed to load config")?;
    if let Some(key) = config.completion.api_key.as_mut() {
        *key = mask(key);
    }

    if json {
        return print_json(&config);
    }

    println!("completion:");
    println!(
        "  api_key:     {}",
        config.completion.api_key.as_deref().unwrap_or("(not set)")
    );
    println!("  base_url:    {}", config.completion.base_url);
    println!("  model:       {}", config.completion.model);
    println!("  temperature: {}", config.completion.temperature);
    println!("  max_tokens:  {}", config.completion.max_tokens);
    println!("  timeout:     {}s", config.completion.timeout_secs);
    println!("storage:       {}", config.storage.url);
    println!("cache:         {}:{}", config.cache.host, config.cache.port);
    println!("agent:         {}", config.agent.kind);
    println!("training:      {} samples per category", config.training.capacity);
    Ok(())
}

fn mask(key: &str) -> String {
    let n = key.chars().count();
    if n <= 8 {
        return "****".to_string();
    }
    let tail: String = key.chars().skip(n - 4).collect();
    format!("****{tail}")
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let config = Config::load(path).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    let has_errors = warnings.iter().any(|w| w.level == WarnLevel::Error);
    if has_errors {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

fn init(path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = path.unwrap_or(Path::new(CONFIG_FILE));
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    Config::default()
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}
