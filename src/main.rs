//! twingraph command-line interface.
//!
//! Usage:
//!   twingraph serve --port 8080
//!   twingraph --source sqlite pit --timestamp 2024-03-01T12:00:00Z
//!   twingraph ingest --input readings.jsonl --kind sensor-json

use std::fs::File;
use std::io::{BufReader, Write};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use twingraph::config::{Cli, Command, IngestKind};
use twingraph::http::start_server;
use twingraph::mapping::ComponentMapping;
use twingraph::parsing::parse_log;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received, stopping server");
}

fn print_graph(body: &str) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(body.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "twingraph=info,tower_http=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Command::Serve { host, port } => {
            // Sources may own blocking HTTP clients, which must be created and
            // dropped outside the async runtime.
            let source = cli.source.open_source()?;
            let reader = cli.reader.build_reader(source)?;
            let addr = format!("{}:{}", host, port);

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(start_server(&addr, reader.clone(), shutdown_signal()))?;
            drop(runtime);
            drop(reader);
        }
        Command::Latest => {
            let reader = cli.reader.build_reader(cli.source.open_source()?)?;
            print_graph(&reader.latest_graph()?.body)?;
        }
        Command::Pit { timestamp } => {
            let reader = cli.reader.build_reader(cli.source.open_source()?)?;
            print_graph(&reader.point_in_time_graph(timestamp)?.body)?;
        }
        Command::Ingest { input, kind } => {
            let file = File::open(input)
                .with_context(|| format!("failed to open {}", input.display()))?;
            let entries = match kind {
                IngestKind::Ntriples => parse_log(BufReader::new(file))?,
                IngestKind::SensorJson => {
                    ComponentMapping::default().map_json_lines(BufReader::new(file))?
                }
            };

            let sink = cli.source.open_sink()?;
            for entry in &entries {
                sink.append_entry(entry)?;
            }
            sink.flush()?;
            info!(entries = entries.len(), input = %input.display(), "ingested log entries");
        }
    }

    Ok(())
}
