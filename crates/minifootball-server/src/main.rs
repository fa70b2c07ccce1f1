//! Headless match runner.
//!
//! Runs one authoritative match with loopback bot clients on their own
//! threads, talking to the session through lossy in-process links, and
//! prints the final result as JSON.
//!
//! ```text
//! minifootball-server --clients 2 --loss-every 10 --seconds 60
//! RUST_LOG=minifootball_core=debug minifootball-server --realtime
//! ```

mod bot;

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use minifootball_core::config::MatchConfig;
use minifootball_core::pitch::{Bounds, OpenPitch};
use minifootball_core::replication::Loss;
use minifootball_core::session::MatchSession;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "minifootball-server")]
#[command(about = "Run a mini football match with loopback clients", version)]
struct Cli {
    /// JSON match configuration; defaults apply to missing fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of bot clients to connect
    #[arg(long, default_value_t = 1)]
    clients: usize,

    /// Drop every n-th server message to each client (0 disables loss)
    #[arg(long, default_value_t = 0)]
    loss_every: u32,

    /// Override the match length in seconds
    #[arg(long)]
    seconds: Option<f32>,

    /// Pace ticks at the configured tick rate instead of running flat out
    #[arg(long)]
    realtime: bool,
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => MatchConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => MatchConfig::default(),
    };
    if let Some(seconds) = cli.seconds {
        config.match_duration_secs = seconds;
    }

    let nav = OpenPitch::new(Bounds::centered(config.field.length, config.field.width));
    let mut session = MatchSession::new(config.clone(), Box::new(nav))?;

    let loss = if cli.loss_every == 0 {
        Loss::None
    } else {
        Loss::EveryNth(cli.loss_every)
    };
    let mut bots = Vec::with_capacity(cli.clients);
    for _ in 0..cli.clients {
        let endpoint = session.connect_with_loss(loss.clone())?;
        let config = config.clone();
        info!(client = %endpoint.client, entity = %endpoint.entity, "bot joining");
        bots.push(thread::spawn(move || bot::play(endpoint, &config)));
    }

    session.start();
    let ticks = if cli.realtime {
        session.run_realtime(Duration::from_secs_f32(config.match_duration_secs * 10.0))?
    } else {
        session.run(u64::MAX)?
    };

    for handle in bots {
        let report = handle.join().map_err(|_| anyhow!("bot thread panicked"))?;
        info!(
            applied = report.stats.applied,
            missing_baseline = report.stats.missing_baseline,
            corrections = report.stats.corrections,
            max_correction = report.stats.max_correction,
            score = ?report.final_score,
            "bot finished"
        );
    }

    let result = session
        .match_result()
        .ok_or_else(|| anyhow!("match stopped after {ticks} ticks without reaching full time"))?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
