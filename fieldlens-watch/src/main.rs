//! Terminal watcher over a document's attribute-view fields.
//!
//! Connects to a host backend, renders the extracted field values for one
//! document (and optionally one block) as plain rows, and keeps them fresh
//! with the library's refresh scheduler until interrupted.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fieldlens::prelude::*;
use fieldlens::schedule::RedrawFn;
use tokio::sync::Mutex;

mod logging;
use logging::init_logging;

#[derive(Debug, Parser)]
#[command(name = "fieldlens-watch")]
#[command(about = "Watch a document's attribute-view fields from the terminal", long_about = None)]
struct Cli {
    /// Document id to watch
    doc_id: String,

    /// Also watch this block id
    #[arg(short, long)]
    block: Option<String>,

    /// Backend base URL
    #[arg(short, long, default_value = "http://127.0.0.1:6806", env = "FIELDLENS_URL")]
    url: String,

    /// API token, sent as `Authorization: Token <token>`
    #[arg(long, env = "FIELDLENS_TOKEN")]
    token: Option<String>,

    /// Poll interval in seconds; 0 renders once and exits
    #[arg(short, long, default_value = "10")]
    interval: u64,

    /// Truncate labels to this many characters
    #[arg(long, default_value = "30")]
    max_len: usize,

    /// Show created/updated timestamp fields
    #[arg(long)]
    timestamps: bool,

    /// increase verbosity
    #[arg(short, long)]
    verbose: bool,

    /// enable debug logging
    #[arg(short, long)]
    debug: bool,
}

/// Prints each scope's decorations as aligned rows.
struct StdoutSink;

impl DecorationSink for StdoutSink {
    fn replace(&self, scope: &Scope, decorations: &[Decoration]) {
        let heading = match scope {
            Scope::Document(id) => format!("document {id}"),
            Scope::Block(id) => format!("block {id}"),
        };
        println!("== {heading} ({} values)", decorations.len());
        let width = decorations
            .iter()
            .map(|decoration| decoration.record.key_name.chars().count())
            .max()
            .unwrap_or(0);
        for decoration in decorations {
            println!(
                "  {:width$}  {}",
                decoration.record.key_name, decoration.label,
            );
        }
    }
}

/// Routes user-facing messages to stderr, away from the value rows.
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn info(&self, message: &str) {
        eprintln!("info: {message}");
    }

    fn error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug, cli.verbose)?;

    let mut options = RemoteOptions::default();
    if let Some(token) = &cli.token {
        options
            .headers
            .push(("Authorization".to_string(), format!("Token {token}")));
    }
    let client = RemoteClient::with_options(&cli.url, options);
    let manager = AvManager::new(Arc::new(client)).with_notifier(Arc::new(StderrNotifier));

    let settings = DisplaySettings {
        max_display_length: cli.max_len.clamp(10, 200),
        poll_interval_secs: cli.interval,
        show_timestamps: cli.timestamps,
        ..Default::default()
    };

    let mut lens = FieldLens::new(
        manager,
        settings,
        Arc::new(StdoutSink),
        Arc::new(StderrNotifier),
    );
    lens.set_current_doc(&cli.doc_id);
    if let Some(block) = &cli.block {
        lens.set_current_block(block);
    }

    if cli.interval == 0 {
        lens.redraw().await;
        return Ok(());
    }

    let lens = Arc::new(Mutex::new(lens));
    let redraw: RedrawFn = {
        let lens = lens.clone();
        Arc::new(move |cause| {
            let lens = lens.clone();
            Box::pin(async move {
                lens.lock().await.handle_refresh(cause).await;
            })
        })
    };

    let mut scheduler = RefreshScheduler::spawn(cli.interval, redraw);
    lens.lock().await.attach_scheduler(scheduler.sender());

    // first paint, then let the scheduler take over
    lens.lock().await.redraw().await;

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;
    scheduler.shutdown();
    Ok(())
}
