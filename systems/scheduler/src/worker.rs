//! Off-thread resolution of a single battle.

use std::thread::{self, JoinHandle};

use grid_skirmish_core::{BattleInput, BattleOutput};

use crate::{resolve, EngineConfig, ResolveError};

/// Handle to a battle being resolved on its own thread.
///
/// The worker owns its input snapshot and hands back an independent output,
/// so nothing mutable is shared with the caller. Dropping the handle without
/// joining discards the result.
#[derive(Debug)]
pub struct BattleWorker {
    handle: JoinHandle<Result<BattleOutput, ResolveError>>,
}

impl BattleWorker {
    /// Starts resolving `input` on a dedicated, named thread.
    pub fn spawn(input: BattleInput, config: EngineConfig) -> Result<Self, ResolveError> {
        let handle = thread::Builder::new()
            .name(format!("battle-seed-{}", input.seed))
            .spawn(move || resolve(&input, &config))
            .map_err(|error| ResolveError::WorkerSpawn(error.to_string()))?;
        Ok(Self { handle })
    }

    /// Reports whether the battle has finished resolving.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Blocks until the battle is resolved and returns its output.
    pub fn join(self) -> Result<BattleOutput, ResolveError> {
        self.handle
            .join()
            .unwrap_or_else(|_| Err(ResolveError::WorkerPanicked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_skirmish_core::{GridSize, Position, Side, TileCaps, UnitId, UnitKind, UnitPlacement};

    fn skirmish(seed: u64) -> BattleInput {
        BattleInput {
            grid: GridSize::new(8, 4),
            caps: TileCaps::new(2, 3),
            seed,
            tick_limit: 200,
            units: vec![
                UnitPlacement::new(UnitId::new(1), Side::Red, UnitKind::Archer, Position::new(0, 1)),
                UnitPlacement::new(UnitId::new(2), Side::Red, UnitKind::Cavalry, Position::new(2, 2)),
                UnitPlacement::new(UnitId::new(3), Side::Blue, UnitKind::Mage, Position::new(7, 0)),
                UnitPlacement::new(UnitId::new(4), Side::Blue, UnitKind::Infantry, Position::new(5, 3)),
            ],
        }
    }

    #[test]
    fn worker_matches_inline_resolution() {
        let config = EngineConfig::default();
        let worker = BattleWorker::spawn(skirmish(11), config).expect("thread starts");
        let inline = resolve(&skirmish(11), &config).expect("valid battle");
        while !worker.is_finished() {
            thread::yield_now();
        }
        assert_eq!(worker.join().expect("valid battle"), inline);
    }

    #[test]
    fn concurrent_workers_stay_independent() {
        let config = EngineConfig::default();
        let workers: Vec<BattleWorker> = (0..4)
            .map(|seed| BattleWorker::spawn(skirmish(seed), config).expect("thread starts"))
            .collect();

        for (seed, worker) in (0..4).zip(workers) {
            let output = worker.join().expect("valid battle");
            assert_eq!(output, resolve(&skirmish(seed), &config).expect("valid battle"));
        }
    }

    #[test]
    fn validation_failures_cross_the_thread_boundary() {
        let mut input = skirmish(1);
        input.units[1].id = UnitId::new(1);
        let worker = BattleWorker::spawn(input, EngineConfig::default()).expect("thread starts");
        assert!(matches!(worker.join(), Err(ResolveError::Validation(_))));
    }
}
