//! One-shot event discovery from the command line.
//! Run with: cargo run --bin events-query -- "Rust conference"

use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use it_events_agent::events::format::{MAX_MESSAGE_CHARS, format_events, split_message};
use it_events_agent::start_events_agent;

fn main() -> ExitCode {
    start_events_agent::init_tracing();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<()> {
    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        bail!("usage: events-query <query>");
    }

    let rt = tokio::runtime::Runtime::new().context("failed to create runtime")?;
    let batch = rt.block_on(async {
        let (state, _) = start_events_agent::initialize()
            .map_err(|e| anyhow::anyhow!("failed to initialize agent: {e}"))?;
        Ok::<_, anyhow::Error>(state.pipeline.get_events(&query).await)
    })?;

    if batch.is_empty() {
        tracing::warn!("No upcoming events found for: {query}");
    }

    let mut out = std::io::stdout().lock();
    for message in split_message(&format_events(&batch.events, false), MAX_MESSAGE_CHARS) {
        writeln!(out, "{message}")?;
    }
    writeln!(out, "---\n{}", batch.stats)?;
    Ok(())
}
