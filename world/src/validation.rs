//! Setup-time validation of battle inputs.

use std::collections::BTreeSet;

use grid_skirmish_core::{BattleInput, GridSize, Position, Side, UnitId, UnitKind, MAX_GRID_TILES};
use thiserror::Error;

use crate::{
    error::TileViolation,
    spatial::{SpatialIndex, TileOccupant},
};

/// Reasons a battle input is rejected before any simulation step.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The grid holds more tiles than the engine indexes.
    #[error("{}x{} grid exceeds the limit of {limit} tiles", .grid.width, .grid.height)]
    GridTooLarge {
        /// Requested grid dimensions.
        grid: GridSize,
        /// Largest tile count accepted.
        limit: u64,
    },
    /// A unit used the reserved identifier zero.
    #[error("unit at input index {index} uses the reserved id 0")]
    InvalidUnitId {
        /// Position of the offending unit in the input list.
        index: usize,
    },
    /// Two units share an identifier.
    #[error("unit id {0} is assigned more than once")]
    DuplicateUnitId(UnitId),
    /// A unit declared a size different from its archetype's size.
    #[error("unit {unit} is a {kind:?} declared with size {declared}, expected {expected}")]
    SizeMismatch {
        /// Offending unit.
        unit: UnitId,
        /// Archetype of the unit.
        kind: UnitKind,
        /// Size supplied by the input.
        declared: u32,
        /// Size fixed by the archetype table.
        expected: u32,
    },
    /// A unit starts outside the grid.
    #[error("unit {unit} starts at {position}, outside the {}x{} grid", .grid.width, .grid.height)]
    OutOfBounds {
        /// Offending unit.
        unit: UnitId,
        /// Requested starting tile.
        position: Position,
        /// Grid dimensions.
        grid: GridSize,
    },
    /// A unit starts outside the columns reserved for its side.
    #[error("unit {unit} of side {side:?} starts at {position}, outside its deployment columns")]
    OutsideDeploymentZone {
        /// Offending unit.
        unit: UnitId,
        /// Side of the unit.
        side: Side,
        /// Requested starting tile.
        position: Position,
    },
    /// The combined starting units of a tile break the occupancy rules.
    #[error("tile {position} is over capacity at setup: {violation}")]
    TileCapacity {
        /// Offending tile.
        position: Position,
        /// Rule that was broken.
        violation: TileViolation,
    },
}

/// Whether starting positions must respect the per-side deployment columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ZoneRule {
    Enforce,
    #[cfg(feature = "scaffolding")]
    Ignore,
}

/// Checks every input rule and returns the populated occupancy index.
///
/// Per-unit rules are checked in input order, tile rules in row-major order,
/// so the reported error is deterministic.
pub(crate) fn validate(
    input: &BattleInput,
    zones: ZoneRule,
) -> Result<SpatialIndex, ValidationError> {
    let tiles = u64::from(input.grid.width).checked_mul(u64::from(input.grid.height));
    if !tiles.is_some_and(|tiles| tiles <= MAX_GRID_TILES) {
        return Err(ValidationError::GridTooLarge {
            grid: input.grid,
            limit: MAX_GRID_TILES,
        });
    }

    let mut seen = BTreeSet::new();
    let mut index = SpatialIndex::new(input.grid, input.caps);

    for (position_in_input, unit) in input.units.iter().enumerate() {
        if unit.id.get() == 0 {
            return Err(ValidationError::InvalidUnitId {
                index: position_in_input,
            });
        }

        if !seen.insert(unit.id) {
            return Err(ValidationError::DuplicateUnitId(unit.id));
        }

        let expected = unit.kind.size();
        if unit.size != expected {
            return Err(ValidationError::SizeMismatch {
                unit: unit.id,
                kind: unit.kind,
                declared: unit.size,
                expected,
            });
        }

        if !input.grid.contains(unit.position) {
            return Err(ValidationError::OutOfBounds {
                unit: unit.id,
                position: unit.position,
                grid: input.grid,
            });
        }

        if zones == ZoneRule::Enforce && !input.grid.in_deployment_zone(unit.side, unit.position)
        {
            return Err(ValidationError::OutsideDeploymentZone {
                unit: unit.id,
                side: unit.side,
                position: unit.position,
            });
        }

        let occupant = TileOccupant {
            id: unit.id,
            side: unit.side,
            size: unit.size,
        };
        if !index.place(occupant, unit.position) {
            return Err(ValidationError::OutOfBounds {
                unit: unit.id,
                position: unit.position,
                grid: input.grid,
            });
        }
    }

    index
        .verify_all()
        .map_err(|(position, violation)| ValidationError::TileCapacity {
            position,
            violation,
        })?;

    Ok(index)
}
