//! Replay calls through a configured host with the tap attached

use colored::*;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use msgtap::broadcast::DEFAULT_DRAIN_TIMEOUT;
use msgtap::config::Config;
use msgtap::{LogEvent, Message, TapStack, TextMessage};

use crate::cli::OutputFormat;

/// One call to replay. No reply means a one-way call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Call {
    #[serde(default)]
    pub endpoint: Option<String>,
    pub request: String,
    #[serde(default)]
    pub reply: Option<String>,
}

#[derive(Debug, Serialize)]
struct Summary {
    host: String,
    endpoints: usize,
    hooks_attached: usize,
    calls: usize,
    one_way: usize,
    inbound_events: usize,
    outbound_events: usize,
    dropped: u64,
}

/// Load a YAML list of calls
pub fn load_script(path: &Path) -> Result<Vec<Call>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read call script {}", path.display()))?;
    let calls: Vec<Call> = serde_yaml::from_str(&content).context("Failed to parse call script")?;
    Ok(calls)
}

pub fn run(calls: &[Call], format: OutputFormat, config: &Config) -> Result<()> {
    let stack = TapStack::from_config(config)?;

    let inbound = Arc::new(AtomicUsize::new(0));
    let outbound = Arc::new(AtomicUsize::new(0));
    {
        let inbound = Arc::clone(&inbound);
        let outbound = Arc::clone(&outbound);
        stack.broadcaster.subscribe(move |event: &LogEvent| -> Result<()> {
            let counter = if event.is_inbound() { &inbound } else { &outbound };
            counter.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });
    }

    let default_endpoint = stack
        .host
        .endpoints()
        .next()
        .map(|e| e.name.clone())
        .ok_or_else(|| eyre::eyre!("Host '{}' has no endpoints", stack.host.name))?;

    let mut one_way = 0;
    for call in calls {
        let endpoint = call.endpoint.as_deref().unwrap_or(&default_endpoint);
        let reply = call.reply.clone();
        let request = match reply {
            Some(_) => TextMessage::new(&call.request),
            None => {
                one_way += 1;
                TextMessage::one_way(&call.request)
            }
        };

        log::info!("Simulating call to {}", endpoint);
        stack.host.dispatch(
            endpoint,
            &request,
            Box::new(move |_: &dyn Message| -> Result<Option<Box<dyn Message>>> {
                Ok(reply.map(|text| Box::new(TextMessage::new(text)) as Box<dyn Message>))
            }),
        )?;
    }

    stack.broadcaster.shutdown(DEFAULT_DRAIN_TIMEOUT);

    let summary = Summary {
        host: stack.host.name.clone(),
        endpoints: stack.host.endpoint_count(),
        hooks_attached: stack.attached,
        calls: calls.len(),
        one_way,
        inbound_events: inbound.load(Ordering::Relaxed),
        outbound_events: outbound.load(Ordering::Relaxed),
        dropped: stack.broadcaster.dropped(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&summary)?),
        OutputFormat::Text => {
            println!();
            println!("{} {}", "Host".bold(), summary.host.cyan());
            println!("  endpoints:      {}", summary.endpoints);
            println!("  hooks attached: {}", summary.hooks_attached);
            println!("  calls:          {} ({} one-way)", summary.calls, summary.one_way);
            println!("  inbound:        {}", summary.inbound_events.to_string().green());
            println!("  outbound:       {}", summary.outbound_events.to_string().blue());
            if summary.dropped > 0 {
                println!("  dropped:        {}", summary.dropped.to_string().red());
            }
        }
    }

    Ok(())
}
