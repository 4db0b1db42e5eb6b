use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use collapser_core::{global_toggle, load_settings, Collapser};
use shared::domain::CollapseState;
use tracing::info;

mod host;

use host::ChatHost;

/// Runs the message collapser against a simulated streaming chat page.
#[derive(Parser, Debug)]
struct Args {
    /// Messages already on the page before the engine starts.
    #[arg(long, default_value_t = 6)]
    messages: usize,
    /// Mutation batches the simulated host streams after startup.
    #[arg(long, default_value_t = 3)]
    stream_batches: usize,
    /// Messages per streamed batch.
    #[arg(long, default_value_t = 10)]
    batch_size: usize,
    /// Pause between streamed batches.
    #[arg(long, default_value_t = 200)]
    interval_ms: u64,
    /// Activate the global toggle once everything is wrapped.
    #[arg(long)]
    collapse_all: bool,
    /// Settings file; `collapser.toml` in the working directory is used when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print wrapper summaries as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let settings = load_settings(args.config.as_deref()).context("loading settings")?;
    let startup_delay = settings.startup_delay();
    let settle = settings.debounce() + Duration::from_millis(100);

    let mut host = ChatHost::new()?;
    host.render_initial(args.messages)?;

    let collapser = Arc::new(
        Collapser::new(host.document().clone(), settings).context("compiling heuristics")?,
    );
    let handle = Arc::clone(&collapser).start();
    tokio::time::sleep(startup_delay + Duration::from_millis(100)).await;

    for batch in 0..args.stream_batches {
        let records = host.stream(args.batch_size)?;
        info!(batch, records, turns = host.turns(), "host streamed a batch");
        tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
    }
    while handle.scheduler().is_pending() {
        tokio::time::sleep(settle).await;
    }

    if args.collapse_all {
        let activation = collapser.toggle_all();
        info!(state = ?activation.state, wrappers = activation.wrappers, "collapse all");
    }

    let stats = handle.stats();
    let summaries = collapser.summaries();
    handle.stop();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            let role = match (summary.roles.is_user(), summary.roles.is_assistant()) {
                (true, _) => "user",
                (false, true) => "assistant",
                (false, false) => "-",
            };
            println!(
                "{:>6} {:<9} {:<9} {}",
                summary.wrapper.to_string(),
                role,
                match summary.state {
                    CollapseState::Expanded => "expanded",
                    CollapseState::Collapsed => "collapsed",
                },
                summary.preview
            );
        }
    }

    let label = collapser
        .document()
        .with(|doc| global_toggle::label(doc))
        .unwrap_or_else(|| "<missing>".to_owned());
    println!(
        "turns={} wrappers={} scans requested={} absorbed={} completed={} global toggle=\"{label}\"",
        host.turns(),
        summaries.len(),
        stats.requested,
        stats.absorbed,
        stats.completed,
    );
    Ok(())
}
