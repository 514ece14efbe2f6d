#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tick scheduler that drives a battle from its input to its result.
//!
//! Every tick runs the impact phase, then lets each ready unit act in
//! ascending id order, then checks for termination. Events produced during a
//! tick are stamped with that tick and ordered by sequencing key before they
//! join the log, and the log always closes with a single `battle_ended`.

mod config;
mod worker;

use grid_skirmish_core::{
    BattleInput, BattleOutput, BattleResult, Command, EndReason, Event, EventRecord,
    SurvivorCounts, Winner,
};
use grid_skirmish_system_combat::Combat;
use grid_skirmish_world::{self as world, query, InvariantViolation, ValidationError, World};
use thiserror::Error;

pub use config::{EngineConfig, DEFAULT_STALL_TICKS};
pub use worker::BattleWorker;

/// Reasons a battle could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The input was rejected before the first tick.
    #[error("battle input rejected: {0}")]
    Validation(#[from] ValidationError),
    /// The resolver broke one of its own invariants and aborted.
    #[error("battle aborted: {0}")]
    Invariant(#[from] InvariantViolation),
    /// The background thread could not be started.
    #[error("failed to start battle worker: {0}")]
    WorkerSpawn(String),
    /// The background thread panicked before producing a result.
    #[error("battle worker panicked")]
    WorkerPanicked,
}

/// Resolves the battle described by `input` and returns its complete log.
///
/// Identical inputs and configurations always produce identical outputs.
pub fn resolve(input: &BattleInput, config: &EngineConfig) -> Result<BattleOutput, ResolveError> {
    let world = World::new(input).map_err(|error| {
        tracing::warn!(%error, "battle input rejected");
        error
    })?;

    Battle::new(world, input, *config).run().map_err(|error| {
        tracing::error!(seed = input.seed, %error, "battle aborted");
        error
    })
}

struct Battle<'a> {
    world: World,
    input: &'a BattleInput,
    config: EngineConfig,
    combat: Combat,
    log: Vec<EventRecord>,
    scratch: Vec<Event>,
    last_activity_tick: u64,
}

impl<'a> Battle<'a> {
    fn new(world: World, input: &'a BattleInput, config: EngineConfig) -> Self {
        let mut log = Vec::with_capacity(input.units.len() + 2);
        log.push(EventRecord::new(
            0,
            Event::BattleInitialized {
                input: input.clone(),
            },
        ));
        for unit in query::unit_view(&world).into_vec() {
            log.push(EventRecord::new(0, Event::UnitSpawned { unit }));
        }

        Self {
            world,
            input,
            config,
            combat: Combat::new(),
            log,
            scratch: Vec::new(),
            last_activity_tick: 0,
        }
    }

    fn run(mut self) -> Result<BattleOutput, ResolveError> {
        let turn_order = query::living_unit_ids(&self.world);
        let ceiling = self.input.tick_limit.saturating_add(1);
        tracing::debug!(
            units = turn_order.len(),
            tick_limit = self.input.tick_limit,
            stall_ticks = self.config.stall_ticks,
            "battle started"
        );

        for tick in 0..ceiling {
            self.scratch.clear();
            world::apply(
                &mut self.world,
                Command::ResolveImpacts { tick },
                &mut self.scratch,
            )?;

            for &id in &turn_order {
                let Some(unit) = query::unit(&self.world, id) else {
                    continue;
                };
                if !unit.ready_at(tick) {
                    continue;
                }
                let command = self.combat.decide(&unit, query::occupancy_view(&self.world));
                world::apply(&mut self.world, command, &mut self.scratch)?;
            }

            self.commit(tick);

            if let Some(result) = self.termination(tick) {
                return Ok(self.finish(result));
            }
        }

        Err(InvariantViolation::IterationCeiling { ceiling }.into())
    }

    fn commit(&mut self, tick: u64) {
        let emitted = self.scratch.len();
        if emitted > 0 {
            self.last_activity_tick = tick;
        }

        let start = self.log.len();
        self.log.extend(
            self.scratch
                .drain(..)
                .map(|event| EventRecord::new(tick, event)),
        );
        self.log[start..].sort_by_key(|record| record.seq);

        tracing::debug!(tick, events = emitted, "tick resolved");
    }

    fn termination(&self, tick: u64) -> Option<BattleResult> {
        let survivors = query::survivors(&self.world);
        let idle_ticks = tick - self.last_activity_tick;
        let (winner, reason) = match (survivors.red, survivors.blue) {
            (0, 0) => (Winner::Draw, EndReason::Eliminated),
            (0, _) => (Winner::Blue, EndReason::Eliminated),
            (_, 0) => (Winner::Red, EndReason::Eliminated),
            _ if tick >= self.input.tick_limit => (Winner::Draw, EndReason::TimeLimit),
            _ if self.config.is_stalled(idle_ticks) => (Winner::Draw, EndReason::Stalled),
            _ => return None,
        };

        Some(BattleResult {
            winner,
            reason,
            tick,
            survivors,
        })
    }

    fn finish(mut self, result: BattleResult) -> BattleOutput {
        tracing::info!(
            winner = ?result.winner,
            reason = ?result.reason,
            tick = result.tick,
            red = result.survivors.red,
            blue = result.survivors.blue,
            "battle ended"
        );
        self.log
            .push(EventRecord::new(result.tick, Event::BattleEnded { result }));

        BattleOutput {
            input: self.input.clone(),
            events: self.log,
            result,
        }
    }
}

/// Counts units per side at deployment, as announced by the spawn events.
#[must_use]
pub fn deployed(output: &BattleOutput) -> SurvivorCounts {
    let mut counts = SurvivorCounts::default();
    for record in &output.events {
        if let Event::UnitSpawned { unit } = &record.event {
            counts.increment(unit.side);
        }
    }
    counts
}
