//! Tile occupancy index enforcing the per-tile side and capacity rules.

use grid_skirmish_core::{GridSize, Position, Side, TileCaps, UnitId};

use crate::error::{InvariantViolation, TileViolation};

/// Living unit registered on a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileOccupant {
    /// Identifier of the unit.
    pub id: UnitId,
    /// Faction that owns the unit.
    pub side: Side,
    /// Tile capacity consumed by the unit.
    pub size: u32,
}

/// Dense row-major grid of occupant lists, each kept sorted by unit id.
#[derive(Clone, Debug)]
pub(crate) struct SpatialIndex {
    grid: GridSize,
    caps: TileCaps,
    tiles: Vec<Vec<TileOccupant>>,
}

impl SpatialIndex {
    pub(crate) fn new(grid: GridSize, caps: TileCaps) -> Self {
        Self {
            grid,
            caps,
            tiles: vec![Vec::new(); grid.tile_count()],
        }
    }

    pub(crate) fn grid(&self) -> GridSize {
        self.grid
    }

    /// Adds the occupant without checking the rules; setup validation
    /// verifies every tile afterwards.
    pub(crate) fn place(&mut self, occupant: TileOccupant, position: Position) -> bool {
        let Some(tile) = self.tile_mut(position) else {
            return false;
        };
        let slot = tile.partition_point(|existing| existing.id < occupant.id);
        tile.insert(slot, occupant);
        true
    }

    pub(crate) fn insert(
        &mut self,
        occupant: TileOccupant,
        position: Position,
    ) -> Result<(), InvariantViolation> {
        if !self.place(occupant, position) {
            return Err(InvariantViolation::UnknownUnit(occupant.id));
        }
        self.verify_touched(position)
    }

    pub(crate) fn remove(
        &mut self,
        unit: UnitId,
        position: Position,
    ) -> Result<TileOccupant, InvariantViolation> {
        let tile = self
            .tile_mut(position)
            .ok_or(InvariantViolation::UnknownUnit(unit))?;
        let slot = tile
            .binary_search_by_key(&unit, |occupant| occupant.id)
            .map_err(|_| InvariantViolation::UnknownUnit(unit))?;
        let removed = tile.remove(slot);
        self.verify_touched(position)?;
        Ok(removed)
    }

    pub(crate) fn occupants_of(&self, position: Position) -> &[TileOccupant] {
        self.index(position)
            .and_then(|index| self.tiles.get(index))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Reports whether a unit of `side` and `size` may step onto the tile.
    ///
    /// Failing the check never mutates the index.
    pub(crate) fn can_enter(&self, side: Side, size: u32, position: Position) -> bool {
        let Some(tile) = self.index(position).and_then(|index| self.tiles.get(index)) else {
            return false;
        };

        if tile.iter().any(|occupant| occupant.side != side) {
            return false;
        }

        let count = u32::try_from(tile.len()).unwrap_or(u32::MAX);
        let total = tile_size(tile);
        count.saturating_add(1) <= self.caps.max_units
            && total.saturating_add(size) <= self.caps.max_size
    }

    pub(crate) fn verify(&self, position: Position) -> Result<(), TileViolation> {
        check_tile(self.occupants_of(position), self.caps)
    }

    /// Sweeps every tile in row-major order, returning the first violation.
    pub(crate) fn verify_all(&self) -> Result<(), (Position, TileViolation)> {
        for (position, occupants) in self.occupied_tiles() {
            check_tile(occupants, self.caps).map_err(|violation| (position, violation))?;
        }
        Ok(())
    }

    /// Non-empty tiles in row-major order.
    pub(crate) fn occupied_tiles(&self) -> impl Iterator<Item = (Position, &[TileOccupant])> + '_ {
        let width = self.grid.width;
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, occupants)| !occupants.is_empty())
            .filter_map(move |(index, occupants)| {
                let index = u32::try_from(index).ok()?;
                let position = Position::new(index % width, index / width);
                Some((position, occupants.as_slice()))
            })
    }

    fn verify_touched(&self, position: Position) -> Result<(), InvariantViolation> {
        self.verify(position)
            .map_err(|violation| InvariantViolation::Tile {
                position,
                violation,
            })
    }

    fn tile_mut(&mut self, position: Position) -> Option<&mut Vec<TileOccupant>> {
        let index = self.index(position)?;
        self.tiles.get_mut(index)
    }

    fn index(&self, position: Position) -> Option<usize> {
        if !self.grid.contains(position) {
            return None;
        }
        let row = usize::try_from(position.y()).ok()?;
        let column = usize::try_from(position.x()).ok()?;
        let width = usize::try_from(self.grid.width).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

fn tile_size(occupants: &[TileOccupant]) -> u32 {
    occupants
        .iter()
        .fold(0u32, |total, occupant| total.saturating_add(occupant.size))
}

fn check_tile(occupants: &[TileOccupant], caps: TileCaps) -> Result<(), TileViolation> {
    let Some(first) = occupants.first() else {
        return Ok(());
    };

    if occupants.iter().any(|occupant| occupant.side != first.side) {
        return Err(TileViolation::MixedSides);
    }

    let count = u32::try_from(occupants.len()).unwrap_or(u32::MAX);
    if count > caps.max_units {
        return Err(TileViolation::UnitCap {
            count,
            cap: caps.max_units,
        });
    }

    let total = tile_size(occupants);
    if total > caps.max_size {
        return Err(TileViolation::SizeCap {
            total,
            cap: caps.max_size,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupant(id: u32, side: Side, size: u32) -> TileOccupant {
        TileOccupant {
            id: UnitId::new(id),
            side,
            size,
        }
    }

    fn index() -> SpatialIndex {
        SpatialIndex::new(GridSize::new(4, 3), TileCaps::new(2, 3))
    }

    #[test]
    fn occupants_are_ordered_by_id() {
        let mut index = index();
        let tile = Position::new(1, 1);
        index.insert(occupant(7, Side::Red, 1), tile).expect("insert");
        index.insert(occupant(2, Side::Red, 1), tile).expect("insert");

        let ids: Vec<u32> = index.occupants_of(tile).iter().map(|o| o.id.get()).collect();
        assert_eq!(ids, vec![2, 7]);
    }

    #[test]
    fn can_enter_rejects_enemy_tiles_and_full_tiles() {
        let mut index = index();
        let tile = Position::new(0, 0);
        index.insert(occupant(1, Side::Red, 2), tile).expect("insert");

        assert!(!index.can_enter(Side::Blue, 1, tile));
        assert!(index.can_enter(Side::Red, 1, tile));
        assert!(!index.can_enter(Side::Red, 2, tile), "size cap of 3");

        index.insert(occupant(2, Side::Red, 1), tile).expect("insert");
        assert!(!index.can_enter(Side::Red, 1, tile), "unit cap of 2");
        assert!(index.can_enter(Side::Blue, 1, Position::new(1, 0)));
    }

    #[test]
    fn can_enter_rejects_out_of_bounds() {
        let index = index();
        assert!(!index.can_enter(Side::Red, 1, Position::new(4, 0)));
        assert!(!index.can_enter(Side::Red, 1, Position::new(0, 3)));
    }

    #[test]
    fn insert_reports_mixed_sides() {
        let mut index = index();
        let tile = Position::new(2, 2);
        index.insert(occupant(1, Side::Red, 1), tile).expect("insert");

        let error = index
            .insert(occupant(2, Side::Blue, 1), tile)
            .expect_err("mixed tile must be fatal");
        assert_eq!(
            error,
            InvariantViolation::Tile {
                position: tile,
                violation: TileViolation::MixedSides,
            }
        );
    }

    #[test]
    fn remove_unknown_unit_is_fatal() {
        let mut index = index();
        let error = index
            .remove(UnitId::new(3), Position::new(0, 0))
            .expect_err("nothing to remove");
        assert_eq!(error, InvariantViolation::UnknownUnit(UnitId::new(3)));
    }

    #[test]
    fn verify_all_reports_first_tile_in_row_major_order() {
        let mut index = index();
        assert!(index.place(occupant(1, Side::Red, 2), Position::new(3, 0)));
        assert!(index.place(occupant(2, Side::Red, 2), Position::new(3, 0)));
        assert!(index.place(occupant(3, Side::Red, 1), Position::new(0, 1)));
        assert!(index.place(occupant(4, Side::Blue, 1), Position::new(0, 1)));

        assert_eq!(
            index.verify_all(),
            Err((
                Position::new(3, 0),
                TileViolation::SizeCap { total: 4, cap: 3 }
            ))
        );
    }

    #[test]
    fn occupied_tiles_report_positions() {
        let mut index = index();
        assert!(index.place(occupant(1, Side::Blue, 1), Position::new(3, 2)));
        assert!(!index.place(occupant(2, Side::Blue, 1), Position::new(9, 9)));

        let tiles: Vec<Position> = index.occupied_tiles().map(|(position, _)| position).collect();
        assert_eq!(tiles, vec![Position::new(3, 2)]);
    }
}
