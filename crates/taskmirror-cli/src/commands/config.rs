//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use taskmirror_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "base_url": config.base_url,
                    "api_token": config.api_token.as_deref().map(mask_token),
                    "data_dir": config.data_dir,
                    "log_file": config.log_path(),
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  base_url:  {}", config.base_url);
            println!(
                "  api_token: {}",
                config
                    .api_token
                    .as_deref()
                    .map(mask_token)
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!("  data_dir:  {}", config.data_dir.display());
            println!("  log_file:  {}", config.log_path().display());
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    let shown = if key == "api_token" {
        mask_token(&value)
    } else {
        value
    };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "base_url" => {
            let candidate = Config {
                base_url: value.to_string(),
                ..config.clone()
            };
            candidate.sync_endpoint()?;
            config.base_url = candidate.base_url;
        }
        "api_token" => {
            config.api_token = none_if_empty(value);
        }
        "data_dir" => {
            config.data_dir = value.into();
        }
        "log_file" => {
            config.log_file = none_if_empty(value).map(PathBuf::from);
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: base_url, api_token, data_dir, log_file",
                key
            );
        }
    }
    Ok(())
}

fn none_if_empty(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

/// Show only the last four characters of a token
fn mask_token(token: &str) -> String {
    let count = token.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = token.chars().skip(count - 4).collect();
    format!("****{}", tail)
}
