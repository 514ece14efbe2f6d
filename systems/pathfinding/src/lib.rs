#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Breadth-first pathfinder that steers units toward the nearest enemy.
//!
//! The search starts on the unit's tile and expands neighbours in the fixed
//! order `+x`, `-x`, `+y`, `-y`, traversing only tiles the unit may enter. The
//! first dequeued tile bordering an enemy is the goal, and only the first step
//! of the path toward it is reported. Every tile is visited at most once, so
//! the search terminates even on a saturated board.

use std::collections::VecDeque;

use grid_skirmish_core::{GridSize, Position, Side, UnitSnapshot};
use grid_skirmish_world::query::OccupancyView;

/// Pathfinder that keeps its search buffers between calls.
#[derive(Debug, Default)]
pub struct Pathfinder {
    first_steps: Vec<Option<Position>>,
    queue: VecDeque<Position>,
}

impl Pathfinder {
    /// Returns the tile the unit should step onto next, or `None` when no
    /// enemy exists, the unit already borders one, or every route is blocked.
    pub fn next_step(
        &mut self,
        unit: &UnitSnapshot,
        occupancy: OccupancyView<'_>,
    ) -> Option<Position> {
        if !unit.alive || !occupancy.has_enemies(unit.side) {
            return None;
        }

        let grid = occupancy.dimensions();
        let start = unit.position;
        if borders_enemy(start, unit.side, grid, &occupancy) {
            return None;
        }

        self.prepare(grid);
        let start_index = tile_index(grid, start)?;
        self.first_steps[start_index] = Some(start);
        self.queue.push_back(start);

        while let Some(tile) = self.queue.pop_front() {
            let first_step = if tile == start {
                None
            } else {
                let step = tile_index(grid, tile).and_then(|index| self.first_steps[index]);
                if borders_enemy(tile, unit.side, grid, &occupancy) {
                    return step;
                }
                step
            };

            for neighbor in neighbors(tile, grid) {
                let Some(index) = tile_index(grid, neighbor) else {
                    continue;
                };
                if self.first_steps[index].is_some() {
                    continue;
                }
                if !occupancy.can_enter(unit.side, unit.size, neighbor) {
                    continue;
                }

                self.first_steps[index] = Some(first_step.unwrap_or(neighbor));
                self.queue.push_back(neighbor);
            }
        }

        None
    }

    fn prepare(&mut self, grid: GridSize) {
        let tiles = grid.tile_count();
        if self.first_steps.len() != tiles {
            self.first_steps = vec![None; tiles];
        } else {
            self.first_steps.fill(None);
        }
        self.queue.clear();
    }
}

fn borders_enemy(tile: Position, side: Side, grid: GridSize, occupancy: &OccupancyView<'_>) -> bool {
    neighbors(tile, grid).any(|neighbor| occupancy.side_at(neighbor) == Some(side.opponent()))
}

/// In-bounds orthogonal neighbours in the order `+x`, `-x`, `+y`, `-y`.
pub fn neighbors(tile: Position, grid: GridSize) -> impl Iterator<Item = Position> {
    let (x, y) = (tile.x(), tile.y());
    let candidates = [
        x.checked_add(1).map(|column| Position::new(column, y)),
        x.checked_sub(1).map(|column| Position::new(column, y)),
        y.checked_add(1).map(|row| Position::new(x, row)),
        y.checked_sub(1).map(|row| Position::new(x, row)),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter(move |candidate| grid.contains(*candidate))
}

fn tile_index(grid: GridSize, tile: Position) -> Option<usize> {
    if !grid.contains(tile) {
        return None;
    }
    let width = usize::try_from(grid.width).ok()?;
    let row = usize::try_from(tile.y()).ok()?;
    let column = usize::try_from(tile.x()).ok()?;
    row.checked_mul(width)?.checked_add(column)
}
