//! Snakeboard CLI - leaderboard sync from the command line
//!
//! Usage:
//! ```bash
//! snakeboard show --top 10
//! snakeboard submit Maya 130
//! snakeboard watch
//! snakeboard status
//! snakeboard --in-memory --offline submit Alex 200
//! ```

use clap::{Parser, Subcommand};
use snakeboard_client::{ClientConfig, FileKv, HttpRemote, MemoryRemote, Reconciler, RemoteStore};
use snakeboard_engine::Leaderboard;
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Snakeboard - offline-first leaderboard for the Snake game
#[derive(Parser)]
#[command(name = "snakeboard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Server base URL (overrides SNAKEBOARD_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Cache directory (overrides SNAKEBOARD_CACHE_DIR)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Use an in-process remote store instead of a server
    #[arg(long, global = true)]
    in_memory: bool,

    /// Start the in-process remote store unreachable
    #[arg(long, global = true, requires = "in_memory")]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the leaderboard
    Show {
        /// Number of entries to show
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Submit the final score of a game
    Submit {
        /// Player name
        name: String,
        /// Final score
        score: u64,
    },

    /// Print the leaderboard on every remote change until Ctrl-C
    Watch {
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Show connection status and scores waiting for sync
    Status,

    /// Reconnect and push scores waiting for sync
    Sync,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snakeboard_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.url {
        config.remote_url = url;
    }
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = dir;
    }
    let cache = FileKv::open(&config.cache_dir)?;

    if cli.in_memory {
        let remote = MemoryRemote::new();
        remote.set_online(!cli.offline);
        run(Reconciler::new(remote, cache, config.reconciler), cli.command).await
    } else {
        let remote = HttpRemote::new(&config.remote_url, config.reconciler.step_timeout)?;
        run(Reconciler::new(remote, cache, config.reconciler), cli.command).await
    }
}

async fn run<R: RemoteStore>(
    reconciler: Reconciler<R, FileKv>,
    command: Command,
) -> Result<(), Box<dyn Error>> {
    let state = reconciler.start().await;
    println!("Status: {}", state.status_text());

    match command {
        Command::Show { top } => {
            print_leaderboard(&reconciler.load_leaderboard(true).await, top);
        }
        Command::Submit { name, score } => {
            let result = reconciler.on_game_over(&name, score).await?;
            println!("{}", result.message());
            print_leaderboard(&reconciler.leaderboard(), 10);
        }
        Command::Watch { top } => {
            let _subscription = reconciler.subscribe(move |board| print_leaderboard(board, top));
            tokio::signal::ctrl_c().await?;
        }
        Command::Status => {
            let status = reconciler.connection_status();
            println!("Connection: {}", status.state);
            if let Some(contact) = status.last_contact {
                println!("Last contact: {}", contact.to_rfc3339());
            }
            if let Some(error) = status.last_error {
                println!("Last error: {error}");
            }
            let pending = reconciler.pending();
            println!("Pending scores: {}", pending.len());
            for record in pending {
                println!("  {} {}", record.name, record.score);
            }
        }
        Command::Sync => {
            let before = reconciler.pending().len();
            let state = reconciler.reconnect().await;
            let left = reconciler.pending().len();
            println!(
                "Status: {} ({} synced, {left} still pending)",
                state.status_text(),
                before.saturating_sub(left)
            );
        }
    }

    reconciler.shutdown();
    Ok(())
}

fn print_leaderboard(board: &Leaderboard, top: usize) {
    println!();
    if board.is_empty() {
        println!("No scores yet");
        return;
    }
    for (rank, record) in board.top(top).iter().enumerate() {
        println!("{:>3}. {:<20} {:>8}", rank + 1, record.name.as_str(), record.score);
    }
    println!("Unique Players: {}", board.len());
    if let Some(high) = board.high_score() {
        println!("High Score: {high}");
    }
}
