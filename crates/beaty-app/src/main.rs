//! Beaty client binary - composition root.
//!
//! 1. Parse the command line and load configuration from TOML
//! 2. Initialize tracing
//! 3. Build the HTTP query client and the session runtime
//! 4. Answer one query, or read queries from stdin until EOF

mod cli;
mod console;

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use beaty_core::config::BeatyConfig;
use beaty_session::{ChannelObserver, SessionRuntime, SessionSettings};
use beaty_stream::QueryClient;

use cli::CliArgs;
use console::{ConsoleCamera, ConsolePrinter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = BeatyConfig::load_or_default(&config_file);
    args.apply(&mut config);
    config.validate()?;

    // Tracing. Logs go to stderr so they never interleave with the bubble text.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Beaty v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    // Transport.
    let client = QueryClient::new(&config.api)?;
    tracing::info!(url = client.url(), mode = ?config.api.mode, "Query client ready");

    // UI events are printed by their own task, in emission order.
    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        let mut printer = ConsolePrinter::new();
        while let Some(event) = ui_rx.recv().await {
            printer.print(&event);
        }
    });

    let mut runtime = SessionRuntime::new(
        Arc::new(client),
        ConsoleCamera::new(),
        ChannelObserver::new(ui_tx),
        SessionSettings::from_config(&config),
    );
    let mode = config.api.mode;

    if let Some(ref query) = args.query {
        runtime.submit(args.request(query, mode))?;
        runtime.run_until_settled().await;
    } else {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    if let Err(e) = runtime.submit(args.request(&line, mode)) {
                        tracing::warn!(error = %e, "Query rejected");
                    }
                }
                alive = runtime.step() => {
                    if !alive {
                        break;
                    }
                }
            }
        }
        runtime.run_until_settled().await;
    }

    drop(runtime);
    let _ = printer.await;
    println!();
    tracing::info!("Beaty shut down");
    Ok(())
}
