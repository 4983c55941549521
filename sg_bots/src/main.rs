//! Headless Set game between simulated players.
//!
//! Every player is driven by random key presses. UI events are rendered to
//! the log; the final scores are printed as JSON on stdout.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Error};
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;
use set_game::{FeatureOracle, Game, GameConfig, LogUi};

const HELP: &str = "\
Play a headless game of Set between simulated players

USAGE:
  sg_bots [OPTIONS]

OPTIONS:
  --config     FILE        JSON game configuration  [default: env SET_* variables]
  --players    N           Number of simulated players  [default: env SET_PLAYERS or 2]
  --seed       N           Seed for deck shuffles and simulated presses
  --max-secs   N           Stop the game after N seconds

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  RUST_LOG                 Log filter (e.g., info, set_game=debug)
  SET_ROUND_DURATION_MS    Round length before a reshuffle
  SET_HINTS                Log every set on the table after each deal
  (See GameConfig for all SET_* variables)
";

struct Args {
    config: Option<String>,
    players: Option<usize>,
    seed: Option<u64>,
    max_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        config: pargs.opt_value_from_str("--config")?,
        players: pargs.opt_value_from_str("--players")?,
        seed: pargs.opt_value_from_str("--seed")?,
        max_secs: pargs.opt_value_from_str("--max-secs")?,
    };

    env_logger::builder().format_target(false).init();

    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {path}"))?;
            GameConfig::from_json(&json)?
        }
        None => GameConfig::from_env()?,
    };
    if let Some(players) = args.players {
        config.players = players;
    }
    config.human_players = 0;

    let oracle = Arc::new(FeatureOracle::from_config(&config));
    let mut game = Game::new(config, oracle, Arc::new(LogUi))?;
    if let Some(seed) = args.seed {
        game = game.with_seed(seed);
    }

    info!(
        "Starting game with {} simulated players",
        game.config().players
    );
    let handle = game.start()?;

    // Catching signals for a clean stop.
    let terminator = handle.terminator();
    set_handler(move || terminator.terminate())?;

    if let Some(secs) = args.max_secs {
        let terminator = handle.terminator();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            info!("Time limit of {}s reached", secs);
            terminator.terminate();
        });
    }

    let outcome = handle.join().await?;
    info!("Game over after {} reshuffles", outcome.reshuffles);
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}
