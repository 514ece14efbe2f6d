//! Failure types raised by the world.

use grid_skirmish_core::{Position, UnitId};
use thiserror::Error;

/// Ways a single tile can break the occupancy rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum TileViolation {
    /// Units of both sides share the tile.
    #[error("units of both sides share the tile")]
    MixedSides,
    /// More living units than the per-tile unit cap.
    #[error("{count} units exceed the per-tile cap of {cap}")]
    UnitCap {
        /// Units found on the tile.
        count: u32,
        /// Configured cap.
        cap: u32,
    },
    /// Combined unit size above the per-tile size cap.
    #[error("combined size {total} exceeds the per-tile cap of {cap}")]
    SizeCap {
        /// Combined size found on the tile.
        total: u32,
        /// Configured cap.
        cap: u32,
    },
}

/// Defects detected while resolving a battle from validated input.
///
/// None of these can be produced by a correct resolver, so callers abort the
/// whole computation when one surfaces.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// A tile broke the occupancy rules after a mutation.
    #[error("tile {position} violates occupancy: {violation}")]
    Tile {
        /// Tile that broke the rules.
        position: Position,
        /// Rule that was broken.
        violation: TileViolation,
    },
    /// A command referenced a unit missing from the unit table or its tile.
    #[error("unit {0} is not known to the world")]
    UnknownUnit(UnitId),
    /// A command asked a removed unit to act or be removed again.
    #[error("unit {0} is no longer on the field")]
    InactiveUnit(UnitId),
    /// A unit was asked to act before its readiness tick.
    #[error("unit {unit} acted at tick {tick} but is not ready until tick {ready_at}")]
    NotReady {
        /// Acting unit.
        unit: UnitId,
        /// Tick the world is on.
        tick: u64,
        /// Earliest tick the unit may act.
        ready_at: u64,
    },
    /// An attack or shot referenced a target the unit may not engage.
    #[error("unit {unit} cannot engage {target}")]
    IllegalTarget {
        /// Acting unit.
        unit: UnitId,
        /// Requested target tile.
        target: Position,
    },
    /// A move skipped tiles or entered a tile it may not enter.
    #[error("unit {unit} cannot step from {from} to {to}")]
    IllegalStep {
        /// Moving unit.
        unit: UnitId,
        /// Tile the unit stood on.
        from: Position,
        /// Requested destination.
        to: Position,
    },
    /// The impact phase was requested for a tick earlier than the clock.
    #[error("clock regression from tick {current} to tick {requested}")]
    TickRegression {
        /// Tick the world is on.
        current: u64,
        /// Tick that was requested.
        requested: u64,
    },
    /// The scheduler processed more ticks than the battle can legally last.
    #[error("resolution exceeded the iteration ceiling of {ceiling} ticks")]
    IterationCeiling {
        /// Largest number of ticks the battle may process.
        ceiling: u64,
    },
}
