//! Loading and storing the documents the CLI works with.

use std::{
    fs,
    io::{self, Write},
    path::Path,
};

use anyhow::{Context, Result};
use grid_skirmish_core::{BattleInput, BattleOutput};
use grid_skirmish_system_scheduler::EngineConfig;
use serde::Serialize;

/// Reads a JSON battle input.
pub(crate) fn load_input(path: &Path) -> Result<BattleInput> {
    let text = read(path)?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid battle input", path.display()))
}

/// Reads a JSON battle output produced by `resolve`.
pub(crate) fn load_output(path: &Path) -> Result<BattleOutput> {
    let text = read(path)?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid battle log", path.display()))
}

/// Reads the engine configuration, falling back to defaults when no path is given.
pub(crate) fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    parse_config(&read(path)?).with_context(|| format!("{} is not a valid config", path.display()))
}

fn parse_config(text: &str) -> Result<EngineConfig> {
    Ok(toml::from_str(text)?)
}

/// Writes pretty JSON to the file, or to stdout when no path is given.
pub(crate) fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to encode JSON")?;
    match path {
        Some(path) => fs::write(path, json + "\n")
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}").context("failed to write to stdout")
        }
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
