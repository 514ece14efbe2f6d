//! Pending projectile schedule keyed by impact tick.

use std::collections::BTreeMap;

use grid_skirmish_core::{Position, ProjectileId, ProjectileKind, Side, UnitId};

/// Projectile in flight, frozen at the moment it was fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Projectile {
    /// Identifier allocated at launch.
    pub id: ProjectileId,
    /// Kind of projectile.
    pub kind: ProjectileKind,
    /// Unit that fired it.
    pub source: UnitId,
    /// Side of the firing unit.
    pub side: Side,
    /// Tile the projectile left from.
    pub origin: Position,
    /// Tile the projectile will land on.
    pub target: Position,
    /// Tick of the launch.
    pub fire_tick: u64,
    /// Tick of the landing.
    pub impact_tick: u64,
}

/// Launch parameters supplied when scheduling a projectile.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Launch {
    pub(crate) kind: ProjectileKind,
    pub(crate) source: UnitId,
    pub(crate) side: Side,
    pub(crate) origin: Position,
    pub(crate) target: Position,
    pub(crate) fire_tick: u64,
}

/// Registry that stores projectiles and manages identifier allocation.
#[derive(Clone, Debug)]
pub(crate) struct ProjectileSchedule {
    pending: BTreeMap<u64, Vec<Projectile>>,
    next_projectile_id: ProjectileId,
}

impl ProjectileSchedule {
    /// Creates an empty schedule whose first projectile receives id 1.
    pub(crate) fn new() -> Self {
        Self {
            pending: BTreeMap::new(),
            next_projectile_id: ProjectileId::new(1),
        }
    }

    /// Stores a projectile under its impact tick and returns it.
    pub(crate) fn schedule(&mut self, launch: Launch) -> Projectile {
        let distance = launch.origin.manhattan_distance(launch.target);
        let projectile = Projectile {
            id: self.next_projectile_id,
            kind: launch.kind,
            source: launch.source,
            side: launch.side,
            origin: launch.origin,
            target: launch.target,
            fire_tick: launch.fire_tick,
            impact_tick: launch.kind.impact_tick(launch.fire_tick, distance),
        };
        self.next_projectile_id = self.next_projectile_id.successor();
        self.pending
            .entry(projectile.impact_tick)
            .or_default()
            .push(projectile);
        projectile
    }

    /// Removes every projectile landing on `tick`, ordered by source then id.
    pub(crate) fn take_due(&mut self, tick: u64) -> Vec<Projectile> {
        let mut due = self.pending.remove(&tick).unwrap_or_default();
        due.sort_by_key(|projectile| (projectile.source, projectile.id));
        due
    }

    /// Projectiles still in flight, ordered by impact tick then launch order.
    pub(crate) fn in_flight(&self) -> impl Iterator<Item = &Projectile> {
        self.pending.values().flatten()
    }
}
