#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter for resolving, replaying and auditing Grid Skirmish battles.

mod files;
mod render;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use grid_skirmish_core::{BattleInput, BattleResult, Winner};
use grid_skirmish_system_replay::{verify, Replay, Verification};
use grid_skirmish_system_scheduler::{resolve, BattleWorker, EngineConfig};
use rayon::prelude::*;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Deterministic grid battle engine.
#[derive(Parser, Debug)]
#[command(name = "grid-skirmish")]
#[command(about = "Resolve, replay and verify deterministic grid battles")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log filter used when `RUST_LOG` is unset (e.g. `info`, `grid_skirmish_system_scheduler=trace`)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a battle input into a complete event log
    Resolve {
        /// JSON battle input
        #[arg(long)]
        input: PathBuf,
        /// TOML engine configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Where to write the JSON output; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Draw the reconstructed grid from a stored battle log
    Replay {
        /// JSON battle output written by `resolve`
        #[arg(long)]
        log: PathBuf,
        /// Tick to draw; the final tick when omitted
        #[arg(long, conflicts_with = "every")]
        tick: Option<u64>,
        /// Draw every tick from deployment to the end
        #[arg(long)]
        every: bool,
    },
    /// Re-resolve a stored battle and confirm the log is reproduced exactly
    Verify {
        /// JSON battle output written by `resolve`
        #[arg(long)]
        log: PathBuf,
        /// TOML engine configuration the log was produced with; logs do not record it
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Resolve one input under a range of seeds and tally the outcomes
    Sweep {
        /// JSON battle input; its own seed is ignored
        #[arg(long)]
        input: PathBuf,
        /// TOML engine configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// First seed of the range
        #[arg(long, default_value_t = 0)]
        first_seed: u64,
        /// Number of consecutive seeds to resolve
        #[arg(long, default_value_t = 100)]
        seeds: u64,
    },
}

#[derive(Debug, Default, Serialize)]
struct SweepTally {
    red: u64,
    blue: u64,
    draw: u64,
}

#[derive(Debug, Serialize)]
struct SweepRow {
    seed: u64,
    result: BattleResult,
}

#[derive(Debug, Serialize)]
struct SweepReport {
    tally: SweepTally,
    battles: Vec<SweepRow>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .with_context(|| format!("invalid log filter `{}`", cli.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Resolve {
            input,
            config,
            output,
        } => {
            let input = files::load_input(&input)?;
            let config = files::load_config(config.as_deref())?;
            let resolved = BattleWorker::spawn(input, config)?.join()?;
            tracing::info!(
                winner = ?resolved.result.winner,
                reason = ?resolved.result.reason,
                tick = resolved.result.tick,
                events = resolved.events.len(),
                "battle resolved"
            );
            files::write_json(output.as_deref(), &resolved)
        }
        Commands::Replay { log, tick, every } => {
            let output = files::load_output(&log)?;
            let replay = Replay::new(&output)?;
            let ticks = if every {
                0..=replay.end_tick()
            } else {
                let tick = tick.unwrap_or_else(|| replay.end_tick());
                tick..=tick
            };
            for tick in ticks {
                print!("{}", render::frame(&replay.frame_at(tick)?));
                if every {
                    println!();
                }
            }
            Ok(())
        }
        Commands::Verify { log, config } => {
            let output = files::load_output(&log)?;
            let config = files::load_config(config.as_deref())?;
            match verify(&output, &config)? {
                Verification::Identical => {
                    println!(
                        "{}: {} events reproduced exactly",
                        log.display(),
                        output.events.len()
                    );
                    Ok(())
                }
                Verification::Diverged { first_difference } => bail!(
                    "{} diverges from a fresh resolution at event {first_difference} \
                     (is --config the one it was resolved with?)",
                    log.display()
                ),
            }
        }
        Commands::Sweep {
            input,
            config,
            first_seed,
            seeds,
        } => {
            let input = files::load_input(&input)?;
            let config = files::load_config(config.as_deref())?;
            let report = sweep(&input, &config, first_seed, seeds)?;
            files::write_json(None, &report)
        }
    }
}

fn sweep(
    input: &BattleInput,
    config: &EngineConfig,
    first_seed: u64,
    seeds: u64,
) -> Result<SweepReport> {
    let last_seed = first_seed
        .checked_add(seeds)
        .context("seed range overflows u64")?;
    let battles = (first_seed..last_seed)
        .into_par_iter()
        .map(|seed| -> Result<SweepRow> {
            let mut input = input.clone();
            input.seed = seed;
            let output = resolve(&input, config)?;
            Ok(SweepRow {
                seed,
                result: output.result,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut tally = SweepTally::default();
    for row in &battles {
        match row.result.winner {
            Winner::Red => tally.red += 1,
            Winner::Blue => tally.blue += 1,
            Winner::Draw => tally.draw += 1,
        }
    }
    tracing::info!(red = tally.red, blue = tally.blue, draw = tally.draw, "sweep finished");
    Ok(SweepReport { tally, battles })
}
