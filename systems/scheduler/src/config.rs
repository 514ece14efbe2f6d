//! Engine tuning knobs loaded alongside a battle input.

use serde::{Deserialize, Serialize};

/// Stall threshold applied when the configuration does not name one.
pub const DEFAULT_STALL_TICKS: u64 = 100;

/// Settings that shape termination without touching the battle input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Consecutive ticks without any event after which the battle ends in a
    /// stalled draw. Zero disables stall detection.
    pub stall_ticks: u64,
}

impl EngineConfig {
    /// Returns a copy with the provided stall threshold.
    #[must_use]
    pub const fn with_stall_ticks(self, stall_ticks: u64) -> Self {
        Self { stall_ticks }
    }

    /// Reports whether `idle_ticks` quiet ticks end the battle.
    #[must_use]
    pub const fn is_stalled(&self, idle_ticks: u64) -> bool {
        self.stall_ticks != 0 && idle_ticks >= self.stall_ticks
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stall_ticks: DEFAULT_STALL_TICKS,
        }
    }
}
