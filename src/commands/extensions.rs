use colored::*;
use eyre::Result;
use serde::Serialize;
use std::sync::Arc;

use msgtap::config::Config;
use msgtap::{Broadcaster, ExtensionRegistry};

use crate::cli::OutputFormat;

#[derive(Serialize)]
struct ExtensionInfo {
    name: String,
    behavior_type: String,
    enabled: bool,
}

pub fn run(format: OutputFormat, config: &Config) -> Result<()> {
    let registry = ExtensionRegistry::with_defaults(Arc::new(Broadcaster::new()));

    let infos: Vec<ExtensionInfo> = registry
        .list()
        .map(|e| ExtensionInfo {
            name: e.name().to_string(),
            behavior_type: e.behavior_type().to_string(),
            enabled: config.host.behaviors.iter().any(|b| b == e.name()),
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&infos)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&infos)?),
        OutputFormat::Text => {
            println!("{}", "Behavior extensions:".bold());
            println!();
            for info in &infos {
                let marker = if info.enabled { "●".green() } else { "○".dimmed() };
                println!("  {} {} {}", marker, info.name.cyan(), info.behavior_type.dimmed());
            }

            for name in &config.host.behaviors {
                if !registry.has(name) {
                    println!("  {} {} (configured but not registered)", "✗".red(), name);
                }
            }
        }
    }

    Ok(())
}
