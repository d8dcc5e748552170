//! The `taleweaver config` command for configuration management.

use std::path::Path;

use anyhow::Context;
use clap::{Args, Subcommand};
use console::Style;
use taleweaver_core::Config;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,

    /// Show config file path
    Path,

    /// Initialize a new config file with defaults
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Set one value, e.g. `story.api_key <token>` or `server.port 8080`
    Set {
        /// Dotted key, `section.field`
        key: String,

        /// New value
        value: String,
    },
}

/// Execute the config command.
pub fn execute(args: ConfigArgs, config: &Config, path: &Path) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            println!("{}", config.redacted().to_toml()?);
        }

        ConfigCommand::Path => {
            println!("{}", path.display());
        }

        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at: {}\nUse --force to overwrite.",
                    path.display()
                );
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, Config::default().to_toml()?)?;

            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
        }

        ConfigCommand::Set { key, value } => {
            set_value(path, &key, &value)?;
            let dim = Style::new().for_stderr().dim();
            eprintln!("{}", dim.apply_to(format!("Saved {key} to {}", path.display())));
        }
    }

    Ok(())
}

/// Write `key = value` into the config file, preserving existing comments.
///
/// The key must exist in the default configuration. String settings take the
/// value verbatim; other settings parse it as a TOML literal. The edited file
/// must still load before it is written.
fn set_value(path: &Path, key: &str, raw: &str) -> anyhow::Result<()> {
    let (section, field) = key
        .split_once('.')
        .filter(|(s, f)| !s.is_empty() && !f.is_empty() && !f.contains('.'))
        .ok_or_else(|| anyhow::anyhow!("Config keys look like `section.field`, got `{key}`"))?;

    let defaults: toml_edit::DocumentMut = Config::default().to_toml()?.parse()?;
    let template = defaults
        .get(section)
        .and_then(|table| table.get(field))
        .and_then(|item| item.as_value())
        .ok_or_else(|| anyhow::anyhow!("Unknown config key: {key}"))?;

    let value = match template {
        toml_edit::Value::String(_) => toml_edit::Value::from(raw),
        _ => raw
            .parse::<toml_edit::Value>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {key}: {e}"))?,
    };

    let content = if path.exists() {
        std::fs::read_to_string(path)?
    } else {
        String::new()
    };
    let mut doc: toml_edit::DocumentMut = content
        .parse()
        .with_context(|| format!("Cannot edit {}", path.display()))?;

    if !doc.contains_key(section) {
        doc[section] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc[section][field] = toml_edit::value(value);

    let updated = doc.to_string();
    Config::from_toml(&updated).with_context(|| format!("Rejected {key} = {raw}"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, updated)?;
    Ok(())
}
