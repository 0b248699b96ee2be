use std::fs::File;
use std::io::{self, BufRead, BufReader};

use campus_map_bridge::channel::{CommandChannel, script_log};
use campus_map_bridge::command::Command as MapCommand;
use campus_map_bridge::config::{ConfigError, MapConfig};
use campus_map_bridge::coordinator::{HostUpdate, MapCoordinator};
use campus_map_bridge::event::{self, EventChannel, EventError};
use campus_map_bridge::page::host_page;
use campus_map_bridge::script;
use clap::{Parser, Subcommand};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("line {line}: invalid host update: {source}")]
    InvalidUpdate { line: usize, source: serde_json::Error },
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("message rejected: {0}")]
    Event(#[from] EventError),
    #[error("script printer failed: {0}")]
    Printer(#[from] tokio::task::JoinError),
}

#[derive(Parser, Debug)]
#[command(name = "campus-map", about = "Campus map bridge: host page, script fragments, and session replay")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the host page the embedded surface loads.
    Page,
    /// Render one command envelope, e.g. `{"type":"removeMarker"}`, to its script.
    Script { json: String },
    /// Decode one message as posted by the page.
    Decode { message: String },
    /// Replay a session through the coordinator and print every script it emits.
    ///
    /// One entry per line: a host update envelope, or `<` followed by a raw
    /// inbound message. Blank lines and lines starting with `#` are skipped.
    Replay {
        #[arg(default_value = "-", help = "Session file path, or - for stdin")]
        input: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "failed to load .env");
        }
    }

    let cli = Cli::parse();
    let config = MapConfig::from_env()?;

    match cli.command {
        Command::Page => {
            print!("{}", host_page(&config));
            Ok(())
        }
        Command::Script { json } => {
            let command: MapCommand = serde_json::from_str(&json)?;
            print!("{}", script::render(&command));
            Ok(())
        }
        Command::Decode { message } => {
            let event = event::decode(&message)?;
            println!("{event:#?}");
            Ok(())
        }
        Command::Replay { input } => run_replay(&config, &input).await,
    }
}

fn open_input(input: &str) -> Result<Box<dyn BufRead>, CliError> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    Ok(Box::new(BufReader::new(File::open(input)?)))
}

async fn run_replay(config: &MapConfig, input: &str) -> Result<(), CliError> {
    let reader = open_input(input)?;

    let (writer, mut scripts) = script_log();
    let printer = tokio::spawn(async move {
        let mut printed = 0_u64;
        while let Some(script) = scripts.recv().await {
            printed += 1;
            println!("// script {printed}");
            print!("{script}");
        }
        printed
    });

    let mut map = MapCoordinator::from_config(CommandChannel::new(writer), config);
    let mut events = EventChannel::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let entry = line.trim();
        if entry.is_empty() || entry.starts_with('#') {
            continue;
        }
        if let Some(raw) = entry.strip_prefix('<') {
            if let Some(event) = events.receive(raw.trim()) {
                map.observe(&event);
            }
        } else {
            let update: HostUpdate =
                serde_json::from_str(entry).map_err(|source| CliError::InvalidUpdate { line: index + 1, source })?;
            map.apply(update);
        }
        map.sync();
    }

    let dispatched = map.sink().dispatched();
    let dropped = map.dropped();
    let readiness = map.readiness();
    // Dropping the coordinator closes the script log so the printer can finish.
    drop(map);
    let printed = printer.await?;

    tracing::info!(
        dispatched,
        printed,
        dropped,
        malformed = events.dropped(),
        readiness = ?readiness,
        "replay finished"
    );
    Ok(())
}
