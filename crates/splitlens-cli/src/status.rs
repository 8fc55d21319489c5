//! `splitlens status`: show configuration and credential status.
//!
//! Never prints credential values, only whether they are set and how many.

use anyhow::Result;
use colored::Colorize;

use splitlens_core::config::{get_config_path, load_config, Config};
use splitlens_providers::KeyPool;

fn set_or_missing(configured: bool, detail: &str) -> String {
    if configured {
        format!("{} {}", "✓".green(), detail)
    } else {
        format!("{}", "· not configured".dimmed())
    }
}

/// Lines for the credential section, split out so they can be checked without a terminal.
fn credential_lines(config: &Config) -> Vec<(&'static str, String)> {
    let pool = KeyPool::from_settings(&config.provider);
    let pool_detail = format!("({} key{})", pool.size(), if pool.size() == 1 { "" } else { "s" });
    let rotation = if pool.rotation_enabled() {
        "✓ round-robin".green().to_string()
    } else {
        "· off (needs 2+ keys)".dimmed().to_string()
    };

    vec![
        ("Server keys:", set_or_missing(pool.available(), &pool_detail)),
        ("Key rotation:", rotation),
        (
            "Amplitude:",
            set_or_missing(config.amplitude.is_configured(), "(key + secret set)"),
        ),
    ]
}

/// Run the status command.
pub fn run() -> Result<()> {
    let config = load_config(None);
    let config_path = get_config_path();

    println!();
    println!("{}", "🔬 Splitlens Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found, using defaults)".yellow().to_string()
        }
    );

    let provider = &config.provider;
    println!("  {:<18} {}", "Provider:".bold(), provider.display_name);
    println!("  {:<18} {}", "API base:".bold(), provider.api_base.dimmed());
    println!("  {:<18} {}", "Model:".bold(), provider.model);
    println!(
        "  {:<18} {} | max_tokens: {} | timeout: {}s",
        "Parameters:".bold(),
        format!("temp: {}", provider.temperature).dimmed(),
        format!("{}", provider.max_tokens).dimmed(),
        format!("{}", provider.timeout_secs).dimmed(),
    );

    println!();
    for (label, value) in credential_lines(&config) {
        println!("  {:<18} {}", label.bold(), value);
    }

    println!();
    println!(
        "  {:<18} {}:{}",
        "Service:".bold(),
        config.server.host,
        config.server.port
    );
    println!("  {:<18} {}", "Report:".bold(), config.report.output);
    println!();

    Ok(())
}
