#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that chooses one action for every ready unit.
//!
//! The policy is evaluated in priority order and the first applicable action
//! wins: melee strike, ranged shot, a step toward the nearest enemy, and
//! finally a silent wait.

use grid_skirmish_core::{
    Command, Engagement, Position, ProjectileKind, UnitId, UnitSnapshot, MIN_RANGED_DISTANCE,
};
use grid_skirmish_system_pathfinding::{neighbors, Pathfinder};
use grid_skirmish_world::query::OccupancyView;

/// Action policy that reuses scratch buffers between decisions.
#[derive(Debug, Default)]
pub struct Combat {
    pathfinder: Pathfinder,
    candidates: Vec<TileCandidate>,
}

impl Combat {
    /// Creates a new combat system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Chooses the command the unit performs this tick.
    pub fn decide(&mut self, unit: &UnitSnapshot, occupancy: OccupancyView<'_>) -> Command {
        let engaged = match unit.kind.engagement() {
            Engagement::Melee => {
                melee_target(unit, &occupancy).map(|target| Command::MeleeStrike {
                    attacker: unit.id,
                    target,
                })
            }
            Engagement::Ranged(kind) => {
                self.ranged_target(unit, kind, &occupancy)
                    .map(|target| Command::FireProjectile {
                        source: unit.id,
                        target,
                    })
            }
        };
        if let Some(command) = engaged {
            return command;
        }

        match self.pathfinder.next_step(unit, occupancy) {
            Some(to) => Command::MoveUnit { unit: unit.id, to },
            None => Command::Wait { unit: unit.id },
        }
    }

    fn ranged_target(
        &mut self,
        unit: &UnitSnapshot,
        kind: ProjectileKind,
        occupancy: &OccupancyView<'_>,
    ) -> Option<Position> {
        self.candidates.clear();
        let range = unit.kind.range();
        for (position, occupants) in occupancy.enemy_tiles(unit.side) {
            let distance = unit.position.manhattan_distance(position);
            if distance < MIN_RANGED_DISTANCE || distance > range {
                continue;
            }
            let enemies = occupants
                .iter()
                .filter(|occupant| occupant.side != unit.side)
                .count();
            self.candidates.push(TileCandidate {
                position,
                distance,
                enemies,
            });
        }

        let mut best: Option<&TileCandidate> = None;
        for candidate in &self.candidates {
            match best {
                Some(existing) if !candidate.precedes(existing, kind) => {}
                _ => best = Some(candidate),
            }
        }
        best.map(|candidate| candidate.position)
    }
}

/// Lowest-id enemy standing on one of the four adjacent tiles.
fn melee_target(unit: &UnitSnapshot, occupancy: &OccupancyView<'_>) -> Option<UnitId> {
    let enemy = unit.side.opponent();
    neighbors(unit.position, occupancy.dimensions())
        .flat_map(|position| occupancy.occupants(position))
        .filter(|occupant| occupant.side == enemy)
        .map(|occupant| occupant.id)
        .min()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TileCandidate {
    position: Position,
    distance: u32,
    enemies: usize,
}

impl TileCandidate {
    /// Fireballs rank by crowd size first. Remaining ties go to distance and
    /// then to row-major tile order.
    fn precedes(&self, other: &Self, kind: ProjectileKind) -> bool {
        if kind == ProjectileKind::Fireball && self.enemies != other.enemies {
            return self.enemies > other.enemies;
        }

        if self.distance != other.distance {
            return self.distance < other.distance;
        }

        self.position.row_major_key() < other.position.row_major_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(x: u32, y: u32, distance: u32, enemies: usize) -> TileCandidate {
        TileCandidate {
            position: Position::new(x, y),
            distance,
            enemies,
        }
    }

    #[test]
    fn arrows_prefer_nearest_then_row_then_column() {
        let near = candidate(4, 2, 2, 1);
        let far_crowded = candidate(1, 0, 3, 3);
        assert!(near.precedes(&far_crowded, ProjectileKind::Arrow));

        let upper = candidate(5, 0, 2, 1);
        assert!(upper.precedes(&near, ProjectileKind::Arrow));

        let left = candidate(3, 0, 2, 1);
        assert!(left.precedes(&upper, ProjectileKind::Arrow));
        assert!(!upper.precedes(&left, ProjectileKind::Arrow));
    }

    #[test]
    fn fireballs_prefer_crowds_before_distance() {
        let near = candidate(4, 2, 2, 1);
        let far_crowded = candidate(1, 0, 3, 3);
        assert!(far_crowded.precedes(&near, ProjectileKind::Fireball));

        let equally_crowded_nearer = candidate(6, 4, 1, 3);
        assert!(equally_crowded_nearer.precedes(&far_crowded, ProjectileKind::Fireball));

        let same_distance_lower_row = candidate(7, 3, 1, 3);
        assert!(same_distance_lower_row.precedes(&equally_crowded_nearer, ProjectileKind::Fireball));
    }
}
