#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative battle state for Grid Skirmish.
//!
//! The world owns every unit, the occupancy index, the projectile schedule and
//! the random generator of a single battle. It changes only through [`apply`],
//! which executes one [`Command`] and reports what happened as [`Event`]s.
//! Systems observe the world exclusively through the [`query`] module.

mod error;
mod projectiles;
mod rng;
mod spatial;
mod validation;

use std::collections::BTreeMap;

use grid_skirmish_core::{
    BattleInput, Command, Engagement, Event, GridSize, Position, ProjectileKind, RemovalCause,
    Side, UnitId, UnitKind, UnitPlacement, UnitSnapshot, MELEE_HIT_THRESHOLD,
    MIN_RANGED_DISTANCE, WAIT_COST,
};

pub use error::{InvariantViolation, TileViolation};
pub use projectiles::Projectile;
pub use rng::BattleRng;
pub use spatial::TileOccupant;
pub use validation::ValidationError;

use projectiles::{Launch, ProjectileSchedule};
use spatial::SpatialIndex;
use validation::ZoneRule;

#[derive(Clone, Copy, Debug)]
struct Unit {
    id: UnitId,
    side: Side,
    kind: UnitKind,
    size: u32,
    position: Position,
    alive: bool,
    next_available_tick: u64,
}

impl Unit {
    fn deploy(placement: &UnitPlacement) -> Self {
        Self {
            id: placement.id,
            side: placement.side,
            kind: placement.kind,
            size: placement.size,
            position: placement.position,
            alive: true,
            next_available_tick: placement.kind.deployment_ready_tick(),
        }
    }

    fn occupant(&self) -> TileOccupant {
        TileOccupant {
            id: self.id,
            side: self.side,
            size: self.size,
        }
    }

    fn snapshot(&self) -> UnitSnapshot {
        UnitSnapshot {
            id: self.id,
            side: self.side,
            kind: self.kind,
            size: self.size,
            position: self.position,
            alive: self.alive,
            next_available_tick: self.next_available_tick,
        }
    }
}

/// Represents the authoritative state of a single battle.
#[derive(Clone, Debug)]
pub struct World {
    grid: GridSize,
    units: BTreeMap<UnitId, Unit>,
    spatial: SpatialIndex,
    projectiles: ProjectileSchedule,
    rng: BattleRng,
    tick: u64,
}

impl World {
    /// Validates the input and deploys every unit at tick zero.
    pub fn new(input: &BattleInput) -> Result<Self, ValidationError> {
        Self::deploy(input, ZoneRule::Enforce)
    }

    /// Builds a world that accepts starting positions outside the deployment
    /// columns. Every other input rule still applies.
    #[cfg(feature = "scaffolding")]
    pub fn scaffold(input: &BattleInput) -> Result<Self, ValidationError> {
        Self::deploy(input, ZoneRule::Ignore)
    }

    fn deploy(input: &BattleInput, zones: ZoneRule) -> Result<Self, ValidationError> {
        let spatial = validation::validate(input, zones)?;
        let units = input
            .units
            .iter()
            .map(|placement| (placement.id, Unit::deploy(placement)))
            .collect();

        Ok(Self {
            grid: input.grid,
            units,
            spatial,
            projectiles: ProjectileSchedule::new(),
            rng: BattleRng::new(input.seed),
            tick: 0,
        })
    }

    fn living(&self, id: UnitId) -> Result<Unit, InvariantViolation> {
        let unit = self
            .units
            .get(&id)
            .ok_or(InvariantViolation::UnknownUnit(id))?;
        if !unit.alive {
            return Err(InvariantViolation::InactiveUnit(id));
        }
        Ok(*unit)
    }

    fn acting(&self, id: UnitId) -> Result<Unit, InvariantViolation> {
        let unit = self.living(id)?;
        if unit.next_available_tick > self.tick {
            return Err(InvariantViolation::NotReady {
                unit: id,
                tick: self.tick,
                ready_at: unit.next_available_tick,
            });
        }
        Ok(unit)
    }

    fn ready_after(&mut self, id: UnitId, cost: u64) -> Result<(), InvariantViolation> {
        let tick = self.tick;
        let unit = self
            .units
            .get_mut(&id)
            .ok_or(InvariantViolation::UnknownUnit(id))?;
        unit.next_available_tick = tick.saturating_add(cost);
        Ok(())
    }

    fn remove_unit(
        &mut self,
        id: UnitId,
        cause: RemovalCause,
        source: UnitId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), InvariantViolation> {
        let unit = self
            .units
            .get_mut(&id)
            .ok_or(InvariantViolation::UnknownUnit(id))?;
        if !unit.alive {
            return Err(InvariantViolation::InactiveUnit(id));
        }
        unit.alive = false;
        let (position, side) = (unit.position, unit.side);

        let _ = self.spatial.remove(id, position)?;
        out_events.push(Event::UnitRemoved {
            unit: id,
            side,
            cause,
            source,
        });
        Ok(())
    }

    fn resolve_impacts(
        &mut self,
        tick: u64,
        out_events: &mut Vec<Event>,
    ) -> Result<(), InvariantViolation> {
        if tick < self.tick {
            return Err(InvariantViolation::TickRegression {
                current: self.tick,
                requested: tick,
            });
        }
        self.tick = tick;

        for projectile in self.projectiles.take_due(tick) {
            out_events.push(Event::ProjectileImpacted {
                source: projectile.source,
                side: projectile.side,
                kind: projectile.kind,
                target: projectile.target,
                impact_tick: projectile.impact_tick,
            });

            let enemies: Vec<UnitId> = self
                .spatial
                .occupants_of(projectile.target)
                .iter()
                .filter(|occupant| occupant.side != projectile.side)
                .map(|occupant| occupant.id)
                .collect();
            if enemies.is_empty() {
                continue;
            }

            let cause = projectile.kind.removal_cause();
            match projectile.kind {
                ProjectileKind::Arrow => {
                    let count = u32::try_from(enemies.len()).unwrap_or(u32::MAX);
                    let pick = usize::try_from(self.rng.next_int(count)).unwrap_or(0);
                    if let Some(&victim) = enemies.get(pick) {
                        self.remove_unit(victim, cause, projectile.source, out_events)?;
                    }
                }
                ProjectileKind::Fireball => {
                    for victim in enemies {
                        self.remove_unit(victim, cause, projectile.source, out_events)?;
                    }
                }
            }
        }

        Ok(())
    }

    fn strike(
        &mut self,
        attacker: UnitId,
        target: UnitId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), InvariantViolation> {
        let striker = self.acting(attacker)?;
        let victim = self.living(target)?;
        if striker.kind.engagement() != Engagement::Melee
            || victim.side == striker.side
            || striker.position.manhattan_distance(victim.position) != 1
        {
            return Err(InvariantViolation::IllegalTarget {
                unit: attacker,
                target: victim.position,
            });
        }

        let hit = self.rng.next() < MELEE_HIT_THRESHOLD;
        out_events.push(Event::MeleeAttackResolved {
            attacker,
            target,
            hit,
        });
        if hit {
            self.remove_unit(target, RemovalCause::Melee, attacker, out_events)?;
        }

        self.ready_after(attacker, striker.kind.attack_cost())
    }

    fn fire(
        &mut self,
        source: UnitId,
        target: Position,
        out_events: &mut Vec<Event>,
    ) -> Result<(), InvariantViolation> {
        let shooter = self.acting(source)?;
        let illegal = InvariantViolation::IllegalTarget {
            unit: source,
            target,
        };
        let Engagement::Ranged(kind) = shooter.kind.engagement() else {
            return Err(illegal);
        };
        let distance = shooter.position.manhattan_distance(target);
        if !self.grid.contains(target)
            || distance < MIN_RANGED_DISTANCE
            || distance > shooter.kind.range()
        {
            return Err(illegal);
        }

        let projectile = self.projectiles.schedule(Launch {
            kind,
            source,
            side: shooter.side,
            origin: shooter.position,
            target,
            fire_tick: self.tick,
        });
        out_events.push(Event::ProjectileFired {
            source,
            side: projectile.side,
            kind,
            origin: projectile.origin,
            target,
            fire_tick: projectile.fire_tick,
            impact_tick: projectile.impact_tick,
            distance,
        });

        self.ready_after(source, shooter.kind.attack_cost())
    }

    fn step(
        &mut self,
        id: UnitId,
        to: Position,
        out_events: &mut Vec<Event>,
    ) -> Result<(), InvariantViolation> {
        let walker = self.acting(id)?;
        let from = walker.position;
        if from.manhattan_distance(to) != 1 || !self.spatial.can_enter(walker.side, walker.size, to)
        {
            return Err(InvariantViolation::IllegalStep { unit: id, from, to });
        }

        let occupant = self.spatial.remove(id, from)?;
        debug_assert_eq!(occupant, walker.occupant());
        self.spatial.insert(occupant, to)?;
        if let Some(unit) = self.units.get_mut(&id) {
            unit.position = to;
        }
        out_events.push(Event::UnitMoved { unit: id, from, to });

        self.ready_after(id, walker.kind.move_cost())
    }

    fn idle(&mut self, id: UnitId) -> Result<(), InvariantViolation> {
        let _ = self.acting(id)?;
        self.ready_after(id, WAIT_COST)
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Events are appended to `out_events` in the order they happen. An error means
/// the command contradicted the battle rules; the world must then be discarded.
pub fn apply(
    world: &mut World,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), InvariantViolation> {
    tracing::trace!(tick = world.tick, ?command, "applying command");
    match command {
        Command::ResolveImpacts { tick } => world.resolve_impacts(tick, out_events),
        Command::MeleeStrike { attacker, target } => world.strike(attacker, target, out_events),
        Command::FireProjectile { source, target } => world.fire(source, target, out_events),
        Command::MoveUnit { unit, to } => world.step(unit, to, out_events),
        Command::Wait { unit } => world.idle(unit),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use grid_skirmish_core::{
        GridSize, Position, Side, SurvivorCounts, UnitId, UnitSnapshot, UnitView,
    };

    use super::{InvariantViolation, Projectile, SpatialIndex, TileOccupant, World};

    /// Tick the world clock is on.
    #[must_use]
    pub fn tick(world: &World) -> u64 {
        world.tick
    }

    /// Dimensions of the battle grid.
    #[must_use]
    pub fn grid(world: &World) -> GridSize {
        world.grid
    }

    /// Snapshot of a single unit, living or removed.
    #[must_use]
    pub fn unit(world: &World, id: UnitId) -> Option<UnitSnapshot> {
        world.units.get(&id).map(super::Unit::snapshot)
    }

    /// Captures a read-only view of every unit in ascending id order.
    #[must_use]
    pub fn unit_view(world: &World) -> UnitView {
        UnitView::from_snapshots(world.units.values().map(super::Unit::snapshot).collect())
    }

    /// Identifiers of the living units in ascending order.
    #[must_use]
    pub fn living_unit_ids(world: &World) -> Vec<UnitId> {
        world
            .units
            .values()
            .filter(|unit| unit.alive)
            .map(|unit| unit.id)
            .collect()
    }

    /// Counts living units per side.
    #[must_use]
    pub fn survivors(world: &World) -> SurvivorCounts {
        let mut counts = SurvivorCounts::default();
        for unit in world.units.values().filter(|unit| unit.alive) {
            counts.increment(unit.side);
        }
        counts
    }

    /// Projectiles still in flight, ordered by impact tick then launch order.
    #[must_use]
    pub fn projectiles_in_flight(world: &World) -> Vec<Projectile> {
        world.projectiles.in_flight().copied().collect()
    }

    /// Exposes a read-only view of the tile occupancy index.
    #[must_use]
    pub fn occupancy_view(world: &World) -> OccupancyView<'_> {
        OccupancyView {
            index: &world.spatial,
        }
    }

    /// Re-checks every tile against the occupancy rules.
    pub fn verify_tiles(world: &World) -> Result<(), InvariantViolation> {
        world
            .spatial
            .verify_all()
            .map_err(|(position, violation)| InvariantViolation::Tile {
                position,
                violation,
            })
    }

    /// Read-only view into the tile occupancy index.
    #[derive(Clone, Copy, Debug)]
    pub struct OccupancyView<'a> {
        index: &'a SpatialIndex,
    }

    impl<'a> OccupancyView<'a> {
        /// Provides the dimensions of the underlying grid.
        #[must_use]
        pub fn dimensions(&self) -> GridSize {
            self.index.grid()
        }

        /// Living units on the tile in ascending id order.
        #[must_use]
        pub fn occupants(&self, position: Position) -> &'a [TileOccupant] {
            self.index.occupants_of(position)
        }

        /// Side holding the tile, if any unit stands on it.
        #[must_use]
        pub fn side_at(&self, position: Position) -> Option<Side> {
            self.occupants(position).first().map(|occupant| occupant.side)
        }

        /// Reports whether a unit of `side` and `size` may step onto the tile.
        #[must_use]
        pub fn can_enter(&self, side: Side, size: u32, position: Position) -> bool {
            self.index.can_enter(side, size, position)
        }

        /// Tiles held by the opponents of `side`, in row-major order.
        pub fn enemy_tiles(
            &self,
            side: Side,
        ) -> impl Iterator<Item = (Position, &'a [TileOccupant])> + 'a {
            let index: &'a SpatialIndex = self.index;
            index
                .occupied_tiles()
                .filter(move |(_, occupants)| occupants.iter().any(|o| o.side != side))
        }

        /// Reports whether any opponent of `side` is still on the field.
        #[must_use]
        pub fn has_enemies(&self, side: Side) -> bool {
            self.enemy_tiles(side).next().is_some()
        }
    }
}
