#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Read-side reconstruction of battle state from a finished event log.
//!
//! Frames are folded from the log alone: no random draws and no simulation.
//! A separate [`verify`] entry point re-resolves the echoed input to confirm
//! that a stored log is what the engine produces.

use std::collections::BTreeMap;

use grid_skirmish_core::{
    BattleInput, BattleOutput, BattleResult, Event, EventRecord, GridSize, Position,
    ProjectileKind, Side, SurvivorCounts, UnitId, UnitKind,
};
use grid_skirmish_system_scheduler::{resolve, EngineConfig, ResolveError};
use thiserror::Error;

/// Defects found while folding an event log.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ReplayError {
    /// The log does not open with `battle_initialized`.
    #[error("event log does not open with battle_initialized")]
    MissingInitialization,
    /// An event referenced a unit that was never spawned.
    #[error("tick {tick} references unit {unit}, which was never spawned")]
    UnknownUnit {
        /// Unit referenced by the event.
        unit: UnitId,
        /// Tick of the offending record.
        tick: u64,
    },
    /// An impact had no matching launch.
    #[error("tick {tick} lands a projectile from {shooter} that was never fired")]
    UnknownProjectile {
        /// Unit credited with the impact.
        shooter: UnitId,
        /// Tick of the offending record.
        tick: u64,
    },
}

/// Unit as seen by an observer of the log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameUnit {
    /// Identifier of the unit.
    pub id: UnitId,
    /// Faction that owns the unit.
    pub side: Side,
    /// Archetype of the unit.
    pub kind: UnitKind,
    /// Current tile, or the last tile held before removal.
    pub position: Position,
    /// Whether the unit is still on the field.
    pub alive: bool,
}

/// Projectile that has been fired but has not landed yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InFlight {
    /// Unit that fired it.
    pub source: UnitId,
    /// Side of the firing unit.
    pub side: Side,
    /// Kind of projectile.
    pub kind: ProjectileKind,
    /// Tile it left from.
    pub origin: Position,
    /// Tile it will land on.
    pub target: Position,
    /// Tick of the launch.
    pub fire_tick: u64,
    /// Tick of the landing.
    pub impact_tick: u64,
}

impl InFlight {
    /// Share of the flight completed at `tick`, clamped to `[0, 1]`.
    #[must_use]
    pub fn progress(&self, tick: u64) -> f64 {
        let span = self.impact_tick.saturating_sub(self.fire_tick);
        if span == 0 {
            return 1.0;
        }
        let elapsed = tick.saturating_sub(self.fire_tick).min(span);
        elapsed as f64 / span as f64
    }
}

/// Battle state reconstructed at a given tick.
#[derive(Clone, Debug, PartialEq)]
pub struct BattleFrame {
    tick: u64,
    grid: GridSize,
    units: BTreeMap<UnitId, FrameUnit>,
    projectiles: Vec<InFlight>,
    result: Option<BattleResult>,
}

impl BattleFrame {
    /// Tick the frame describes.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Dimensions of the battle grid.
    #[must_use]
    pub const fn grid(&self) -> GridSize {
        self.grid
    }

    /// Every spawned unit in ascending id order, including removed ones.
    pub fn units(&self) -> impl Iterator<Item = &FrameUnit> {
        self.units.values()
    }

    /// Looks up a single unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&FrameUnit> {
        self.units.get(&id)
    }

    /// Living units on the tile in ascending id order.
    pub fn occupants(&self, position: Position) -> impl Iterator<Item = &FrameUnit> {
        self.units
            .values()
            .filter(move |unit| unit.alive && unit.position == position)
    }

    /// Counts living units per side.
    #[must_use]
    pub fn survivors(&self) -> SurvivorCounts {
        let mut counts = SurvivorCounts::default();
        for unit in self.units.values().filter(|unit| unit.alive) {
            counts.increment(unit.side);
        }
        counts
    }

    /// Projectiles in flight at the frame's tick, in launch order.
    #[must_use]
    pub fn projectiles(&self) -> &[InFlight] {
        &self.projectiles
    }

    /// Battle result, once the terminal record has been folded.
    #[must_use]
    pub const fn result(&self) -> Option<&BattleResult> {
        self.result.as_ref()
    }

    fn apply(&mut self, record: &EventRecord) -> Result<(), ReplayError> {
        let tick = record.tick;
        match &record.event {
            Event::BattleInitialized { .. } => {}
            Event::UnitSpawned { unit } => {
                let _ = self.units.insert(
                    unit.id,
                    FrameUnit {
                        id: unit.id,
                        side: unit.side,
                        kind: unit.kind,
                        position: unit.position,
                        alive: unit.alive,
                    },
                );
            }
            Event::UnitMoved { unit, to, .. } => {
                self.unit_mut(*unit, tick)?.position = *to;
            }
            Event::UnitRemoved { unit, .. } => {
                self.unit_mut(*unit, tick)?.alive = false;
            }
            Event::MeleeAttackResolved { .. } => {}
            Event::ProjectileFired {
                source,
                side,
                kind,
                origin,
                target,
                fire_tick,
                impact_tick,
                ..
            } => self.projectiles.push(InFlight {
                source: *source,
                side: *side,
                kind: *kind,
                origin: *origin,
                target: *target,
                fire_tick: *fire_tick,
                impact_tick: *impact_tick,
            }),
            Event::ProjectileImpacted {
                source,
                kind,
                target,
                impact_tick,
                ..
            } => {
                let landed = self
                    .projectiles
                    .iter()
                    .position(|flight| {
                        flight.source == *source
                            && flight.kind == *kind
                            && flight.target == *target
                            && flight.impact_tick == *impact_tick
                    })
                    .ok_or(ReplayError::UnknownProjectile {
                        shooter: *source,
                        tick,
                    })?;
                let _ = self.projectiles.remove(landed);
            }
            Event::BattleEnded { result } => self.result = Some(*result),
        }
        Ok(())
    }

    fn unit_mut(&mut self, unit: UnitId, tick: u64) -> Result<&mut FrameUnit, ReplayError> {
        self.units
            .get_mut(&unit)
            .ok_or(ReplayError::UnknownUnit { unit, tick })
    }
}

/// Cursor over a finished battle log.
#[derive(Clone, Copy, Debug)]
pub struct Replay<'a> {
    input: &'a BattleInput,
    events: &'a [EventRecord],
}

impl<'a> Replay<'a> {
    /// Wraps a battle output, checking that its log opens correctly.
    pub fn new(output: &'a BattleOutput) -> Result<Self, ReplayError> {
        match output.events.first() {
            Some(EventRecord {
                event: Event::BattleInitialized { .. },
                ..
            }) => Ok(Self {
                input: &output.input,
                events: &output.events,
            }),
            _ => Err(ReplayError::MissingInitialization),
        }
    }

    /// Tick of the last record in the log.
    #[must_use]
    pub fn end_tick(&self) -> u64 {
        self.events.last().map_or(0, |record| record.tick)
    }

    /// Reconstructs the state after every record stamped at or before `tick`.
    ///
    /// Ticks past the end of the log clamp to the final state.
    pub fn frame_at(&self, tick: u64) -> Result<BattleFrame, ReplayError> {
        let mut frame = BattleFrame {
            tick: tick.min(self.end_tick()),
            grid: self.input.grid,
            units: BTreeMap::new(),
            projectiles: Vec::new(),
            result: None,
        };
        for record in self.events.iter().take_while(|record| record.tick <= tick) {
            frame.apply(record)?;
        }
        Ok(frame)
    }

    /// Reconstructs the state at the end of the battle.
    pub fn final_frame(&self) -> Result<BattleFrame, ReplayError> {
        self.frame_at(self.end_tick())
    }
}

/// Outcome of re-resolving a stored battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verification {
    /// The stored log and result match a fresh resolution exactly.
    Identical,
    /// The logs differ; the index is the first record that disagrees.
    Diverged {
        /// Index of the first differing record.
        first_difference: usize,
    },
}

/// Re-resolves the input echoed in `output` and compares the two logs.
///
/// The output records the battle input but not the engine configuration, so
/// `config` must be the one the log was resolved with. A different stall
/// threshold ends the battle elsewhere and is reported as
/// [`Verification::Diverged`].
pub fn verify(output: &BattleOutput, config: &EngineConfig) -> Result<Verification, ResolveError> {
    let fresh = resolve(&output.input, config)?;
    if fresh == *output {
        return Ok(Verification::Identical);
    }

    let first_difference = fresh
        .events
        .iter()
        .zip(&output.events)
        .position(|(expected, stored)| expected != stored)
        .unwrap_or_else(|| fresh.events.len().min(output.events.len()));
    tracing::warn!(first_difference, "stored battle log diverges from resolution");
    Ok(Verification::Diverged { first_difference })
}
