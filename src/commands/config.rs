use colored::*;
use eyre::Result;
use std::path::PathBuf;

use msgtap::config::Config;

use crate::cli::{ConfigAction, OutputFormat};

pub fn run(action: ConfigAction, explicit: Option<&PathBuf>, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
        ConfigAction::Get { key } => get(&key, config),
        ConfigAction::Path => path(explicit),
    }
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputFormat::Text => {
            println!("{}", "msgtap Configuration".bold());
            println!();

            println!("log_level: {}", config.log_level.as_filter());
            println!();

            println!("{}:", "tap".cyan());
            println!("  delivery: {:?}", config.tap.delivery());
            println!("  failure_policy: {:?}", config.tap.failure_policy);
            println!();

            println!("{}:", "sinks".cyan());
            println!("  enabled: {}", config.sinks.enabled);
            println!("  sinks: {:?}", config.sinks.sinks);
            println!("  path: {}", config.sinks.path.display());
            if let Some(ref endpoint) = config.sinks.http_endpoint {
                println!("  http_endpoint: {}", endpoint);
            }
            println!();

            println!("{}: {}", "host".cyan(), config.host.name);
            for dispatcher in &config.host.dispatchers {
                println!("  {}", dispatcher.listen_uri);
                for endpoint in &dispatcher.endpoints {
                    println!("    {} ({})", endpoint.name, endpoint.contract.dimmed());
                }
            }
            println!("  behaviors: {}", config.host.behaviors.join(", "));
        }
    }

    Ok(())
}

fn lookup(key: &str, config: &Config) -> Option<String> {
    match key {
        "log_level" | "log-level" => Some(config.log_level.as_filter().to_string()),
        "tap.delivery" => Some(format!("{:?}", config.tap.delivery).to_lowercase()),
        "tap.queue_capacity" => Some(config.tap.queue_capacity.to_string()),
        "tap.failure_policy" => Some(format!("{:?}", config.tap.failure_policy).to_lowercase()),
        "sinks.enabled" => Some(config.sinks.enabled.to_string()),
        "sinks.path" => Some(config.sinks.path.display().to_string()),
        "sinks.include_message" => Some(config.sinks.include_message.to_string()),
        "sinks.http_endpoint" => config.sinks.http_endpoint.clone(),
        "host.name" => Some(config.host.name.clone()),
        "host.behaviors" => Some(config.host.behaviors.join(",")),
        _ => None,
    }
}

fn get(key: &str, config: &Config) -> Result<()> {
    match lookup(key, config) {
        Some(v) => println!("{}", v),
        None => eyre::bail!("Unknown config key: {}", key),
    }

    Ok(())
}

fn path(explicit: Option<&PathBuf>) -> Result<()> {
    let path = match explicit {
        Some(p) => p.clone(),
        None => std::env::var("MSGTAP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Config::msgtap_dir().join("msgtap.yaml")),
    };

    let marker = if path.exists() { "✓".green() } else { "✗".red() };
    println!("{} {}", marker, path.display());

    Ok(())
}
