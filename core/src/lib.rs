#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Grid Skirmish engine.
//!
//! This crate defines the message surface that connects the battle input, the
//! authoritative world, and pure systems. Systems inspect immutable views of
//! the world and answer with a single [`Command`] per acting unit, the world
//! executes those commands via its `apply` entry point, and every resulting
//! state change is broadcast as an [`Event`]. The ordered [`EventRecord`] log
//! is the only transcript of a battle and is sufficient to replay it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of ticks a unit spends idle when it has nothing else to do.
pub const WAIT_COST: u64 = 1;

/// Closest Manhattan distance at which a ranged unit may pick a target tile.
pub const MIN_RANGED_DISTANCE: u32 = 1;

/// Largest number of tiles a battle grid may hold.
pub const MAX_GRID_TILES: u64 = 1 << 20;

/// Melee rolls strictly below this value hit.
pub const MELEE_HIT_THRESHOLD: f64 = 0.5;

/// Unique identifier assigned to a unit by the battle author.
///
/// Identifiers are positive; zero is reserved for global events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier allocated to a projectile when it is fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectileId(u32);

impl ProjectileId {
    /// Creates a new projectile identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Identifier that follows this one in allocation order.
    #[must_use]
    pub const fn successor(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// One of the two factions taking part in a battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Faction deploying along the low columns of the grid.
    Red,
    /// Faction deploying along the high columns of the grid.
    Blue,
}

impl Side {
    /// Returns the opposing faction.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Red => Self::Blue,
            Self::Blue => Self::Red,
        }
    }
}

/// Fixed unit archetypes available to both sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Light melee unit.
    Infantry,
    /// Heavy, fast melee unit that occupies two size slots.
    Cavalry,
    /// Ranged unit firing single-target arrows.
    Archer,
    /// Ranged unit casting area fireballs.
    Mage,
}

impl UnitKind {
    /// All archetypes in declaration order.
    pub const ALL: [UnitKind; 4] = [Self::Infantry, Self::Cavalry, Self::Archer, Self::Mage];

    /// How the archetype engages enemies.
    #[must_use]
    pub const fn engagement(self) -> Engagement {
        match self {
            Self::Infantry | Self::Cavalry => Engagement::Melee,
            Self::Archer => Engagement::Ranged(ProjectileKind::Arrow),
            Self::Mage => Engagement::Ranged(ProjectileKind::Fireball),
        }
    }

    /// Tile capacity consumed by a unit of this archetype.
    #[must_use]
    pub const fn size(self) -> u32 {
        match self {
            Self::Infantry | Self::Archer | Self::Mage => 1,
            Self::Cavalry => 2,
        }
    }

    /// Farthest Manhattan distance a ranged archetype can target.
    ///
    /// Melee archetypes report zero.
    #[must_use]
    pub const fn range(self) -> u32 {
        match self {
            Self::Infantry | Self::Cavalry => 0,
            Self::Archer => 5,
            Self::Mage => 4,
        }
    }

    /// Ticks a unit waits after attacking or firing.
    #[must_use]
    pub const fn attack_cost(self) -> u64 {
        match self {
            Self::Infantry => 2,
            Self::Cavalry => 3,
            Self::Archer => 4,
            Self::Mage => 6,
        }
    }

    /// Ticks a unit waits after stepping to an adjacent tile.
    #[must_use]
    pub const fn move_cost(self) -> u64 {
        match self {
            Self::Infantry | Self::Archer => 2,
            Self::Cavalry => 1,
            Self::Mage => 3,
        }
    }

    /// Tick at which a freshly deployed unit may act for the first time.
    #[must_use]
    pub const fn deployment_ready_tick(self) -> u64 {
        self.attack_cost()
    }
}

/// Engagement style derived from a unit archetype.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Engagement {
    /// Attacks an adjacent enemy directly.
    Melee,
    /// Fires projectiles of the carried kind.
    Ranged(ProjectileKind),
}

/// Kinds of projectiles produced by ranged archetypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileKind {
    /// Single-target projectile removing one random enemy on impact.
    Arrow,
    /// Area projectile removing every enemy on the impacted tile.
    Fireball,
}

impl ProjectileKind {
    /// Flight time per tile of Manhattan distance.
    #[must_use]
    pub const fn ticks_per_tile(self) -> u64 {
        match self {
            Self::Arrow => 1,
            Self::Fireball => 2,
        }
    }

    /// Tick at which a projectile fired at `fire_tick` over `distance` lands.
    #[must_use]
    pub const fn impact_tick(self, fire_tick: u64, distance: u32) -> u64 {
        fire_tick.saturating_add(self.ticks_per_tile().saturating_mul(distance as u64))
    }

    /// Removal cause attributed to units destroyed by this projectile.
    #[must_use]
    pub const fn removal_cause(self) -> RemovalCause {
        match self {
            Self::Arrow => RemovalCause::Arrow,
            Self::Fireball => RemovalCause::Fireball,
        }
    }
}

/// Location of a single grid tile expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    x: u32,
    y: u32,
}

impl Position {
    /// Creates a new tile position.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column of the tile.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row of the tile.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Computes the Manhattan distance between two positions.
    #[must_use]
    pub fn manhattan_distance(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Ordering key that sorts tiles by row, then by column.
    #[must_use]
    pub const fn row_major_key(self) -> (u32, u32) {
        (self.y, self.x)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Dimensions of the battle grid measured in tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    /// Number of tile columns.
    pub width: u32,
    /// Number of tile rows.
    pub height: u32,
}

impl GridSize {
    /// Creates a new grid size descriptor.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Reports whether the position lies within the grid.
    #[must_use]
    pub const fn contains(&self, position: Position) -> bool {
        position.x < self.width && position.y < self.height
    }

    /// Total number of tiles in the grid.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        let tiles = u64::from(self.width) * u64::from(self.height);
        usize::try_from(tiles).unwrap_or(usize::MAX)
    }

    /// Reports whether the side may deploy onto the provided position.
    ///
    /// Each side owns `width / 2` columns on its own edge of the grid. The
    /// middle column of an odd-width grid belongs to neither side.
    #[must_use]
    pub const fn in_deployment_zone(&self, side: Side, position: Position) -> bool {
        if !self.contains(position) {
            return false;
        }
        let depth = self.width / 2;
        match side {
            Side::Red => position.x < depth,
            Side::Blue => position.x >= self.width - depth,
        }
    }
}

/// Per-tile occupancy limits shared by every tile of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCaps {
    /// Largest number of living units a tile may hold.
    pub max_units: u32,
    /// Largest combined unit size a tile may hold.
    pub max_size: u32,
}

impl TileCaps {
    /// Creates a new set of tile caps.
    #[must_use]
    pub const fn new(max_units: u32, max_size: u32) -> Self {
        Self {
            max_units,
            max_size,
        }
    }
}

/// Starting description of a single unit supplied by the battle author.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Caller-assigned identifier, unique across the battle.
    pub id: UnitId,
    /// Faction that owns the unit.
    pub side: Side,
    /// Archetype of the unit.
    pub kind: UnitKind,
    /// Declared size; must match [`UnitKind::size`].
    pub size: u32,
    /// Tile the unit starts on.
    pub position: Position,
}

impl UnitPlacement {
    /// Creates a placement whose size is taken from the archetype table.
    #[must_use]
    pub const fn new(id: UnitId, side: Side, kind: UnitKind, position: Position) -> Self {
        Self {
            id,
            side,
            kind,
            size: kind.size(),
            position,
        }
    }
}

/// Complete, immutable description of a battle to resolve.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattleInput {
    /// Grid dimensions.
    pub grid: GridSize,
    /// Occupancy limits applied to every tile.
    pub caps: TileCaps,
    /// Seed for the deterministic random generator.
    pub seed: u64,
    /// Tick at which the battle ends in a draw if still undecided.
    pub tick_limit: u64,
    /// Units in the order the author placed them.
    pub units: Vec<UnitPlacement>,
}

/// Immutable representation of a single unit's state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitSnapshot {
    /// Identifier of the unit.
    pub id: UnitId,
    /// Faction that owns the unit.
    pub side: Side,
    /// Archetype of the unit.
    pub kind: UnitKind,
    /// Tile capacity consumed by the unit.
    pub size: u32,
    /// Tile the unit occupies, or last occupied if removed.
    pub position: Position,
    /// Whether the unit is still on the field.
    pub alive: bool,
    /// Earliest tick at which the unit may act again.
    pub next_available_tick: u64,
}

impl UnitSnapshot {
    /// Reports whether the unit is alive and allowed to act on `tick`.
    #[must_use]
    pub const fn ready_at(&self, tick: u64) -> bool {
        self.alive && self.next_available_tick <= tick
    }
}

/// Read-only snapshot describing every unit in ascending id order.
#[derive(Clone, Debug, Default)]
pub struct UnitView {
    snapshots: Vec<UnitSnapshot>,
}

impl UnitView {
    /// Creates a new unit view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<UnitSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot of a single unit.
    #[must_use]
    pub fn get(&self, unit: UnitId) -> Option<&UnitSnapshot> {
        self.snapshots
            .binary_search_by_key(&unit, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Counts living units per side.
    #[must_use]
    pub fn survivors(&self) -> SurvivorCounts {
        let mut counts = SurvivorCounts::default();
        for snapshot in self.snapshots.iter().filter(|snapshot| snapshot.alive) {
            counts.increment(snapshot.side);
        }
        counts
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<UnitSnapshot> {
        self.snapshots
    }
}

/// Commands that express all permissible world mutations during a battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Lands every projectile scheduled to impact on the provided tick.
    ResolveImpacts {
        /// Tick whose impact phase is being resolved.
        tick: u64,
    },
    /// Melee attack against an adjacent enemy.
    MeleeStrike {
        /// Unit performing the attack.
        attacker: UnitId,
        /// Adjacent enemy being attacked.
        target: UnitId,
    },
    /// Launches a projectile at a tile.
    FireProjectile {
        /// Ranged unit firing the projectile.
        source: UnitId,
        /// Tile the projectile is aimed at.
        target: Position,
    },
    /// Moves a unit onto an adjacent tile.
    MoveUnit {
        /// Unit being moved.
        unit: UnitId,
        /// Adjacent destination tile.
        to: Position,
    },
    /// Idles a unit for the minimum readiness advance.
    Wait {
        /// Unit that waits.
        unit: UnitId,
    },
}

/// Reason a unit left the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalCause {
    /// Removed by a successful melee attack.
    Melee,
    /// Removed by an arrow impact.
    Arrow,
    /// Removed by a fireball impact.
    Fireball,
}

/// Winner of a finished battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    /// Red side won.
    Red,
    /// Blue side won.
    Blue,
    /// Neither side won.
    Draw,
}

impl From<Side> for Winner {
    fn from(side: Side) -> Self {
        match side {
            Side::Red => Self::Red,
            Side::Blue => Self::Blue,
        }
    }
}

/// Reason a battle terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// At least one side has no living units.
    Eliminated,
    /// The configured tick limit was reached.
    TimeLimit,
    /// No observable activity for the configured number of ticks.
    Stalled,
}

/// Living unit counts per side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurvivorCounts {
    /// Living Red units.
    pub red: u32,
    /// Living Blue units.
    pub blue: u32,
}

impl SurvivorCounts {
    /// Living units of the provided side.
    #[must_use]
    pub const fn of(&self, side: Side) -> u32 {
        match side {
            Side::Red => self.red,
            Side::Blue => self.blue,
        }
    }

    /// Sum of living units across both sides.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.red + self.blue
    }

    /// Records one more living unit for the side.
    pub fn increment(&mut self, side: Side) {
        match side {
            Side::Red => self.red += 1,
            Side::Blue => self.blue += 1,
        }
    }
}

/// Terminal summary of a resolved battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattleResult {
    /// Side that won, or a draw.
    pub winner: Winner,
    /// Why the battle ended.
    pub reason: EndReason,
    /// Tick on which the battle ended.
    pub tick: u64,
    /// Units left alive per side.
    pub survivors: SurvivorCounts,
}

/// Events broadcast by the world and scheduler as the battle unfolds.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Opens the log with the validated input.
    BattleInitialized {
        /// Input snapshot the battle was resolved from.
        input: BattleInput,
    },
    /// Announces a unit entering the field.
    UnitSpawned {
        /// Initial state of the unit.
        unit: UnitSnapshot,
    },
    /// Confirms that a unit stepped between two tiles.
    UnitMoved {
        /// Unit that moved.
        unit: UnitId,
        /// Tile occupied before the step.
        from: Position,
        /// Tile occupied after the step.
        to: Position,
    },
    /// Reports the outcome of a melee roll, hit or miss.
    MeleeAttackResolved {
        /// Unit that attacked.
        attacker: UnitId,
        /// Unit that was attacked.
        target: UnitId,
        /// Whether the attack removed the target.
        hit: bool,
    },
    /// Announces a projectile launch.
    ProjectileFired {
        /// Unit that fired.
        source: UnitId,
        /// Side of the firing unit.
        side: Side,
        /// Kind of projectile.
        kind: ProjectileKind,
        /// Tile the projectile left from.
        origin: Position,
        /// Tile the projectile will land on.
        target: Position,
        /// Tick of the launch.
        fire_tick: u64,
        /// Tick of the landing.
        impact_tick: u64,
        /// Manhattan distance between origin and target.
        distance: u32,
    },
    /// Announces a projectile landing, before any removal it causes.
    ProjectileImpacted {
        /// Unit that fired the projectile.
        source: UnitId,
        /// Side of the firing unit.
        side: Side,
        /// Kind of projectile.
        kind: ProjectileKind,
        /// Tile the projectile landed on.
        target: Position,
        /// Tick of the landing.
        impact_tick: u64,
    },
    /// Announces that a unit left the field.
    UnitRemoved {
        /// Unit that was removed.
        unit: UnitId,
        /// Side of the removed unit.
        side: Side,
        /// What removed it.
        cause: RemovalCause,
        /// Unit responsible for the removal.
        source: UnitId,
    },
    /// Closes the log with the battle result.
    BattleEnded {
        /// Terminal summary.
        result: BattleResult,
    },
}

impl Event {
    /// Sequencing key of the event: the acting unit's id, or zero for
    /// battle-wide events.
    #[must_use]
    pub const fn seq(&self) -> u32 {
        match self {
            Self::BattleInitialized { .. } | Self::BattleEnded { .. } => 0,
            Self::UnitSpawned { unit } => unit.id.get(),
            Self::UnitMoved { unit, .. } => unit.get(),
            Self::MeleeAttackResolved { attacker, .. } => attacker.get(),
            Self::ProjectileFired { source, .. }
            | Self::ProjectileImpacted { source, .. }
            | Self::UnitRemoved { source, .. } => source.get(),
        }
    }

    /// Reports whether the event is a unit removal.
    #[must_use]
    pub const fn is_removal(&self) -> bool {
        matches!(self, Self::UnitRemoved { .. })
    }
}

/// Event stamped with its position in the battle log.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventRecord {
    /// Tick on which the event happened.
    pub tick: u64,
    /// Sequencing key, see [`Event::seq`].
    pub seq: u32,
    /// The event itself.
    pub event: Event,
}

impl EventRecord {
    /// Stamps an event with its tick, deriving the sequencing key.
    #[must_use]
    pub fn new(tick: u64, event: Event) -> Self {
        Self {
            tick,
            seq: event.seq(),
            event,
        }
    }
}

/// Self-contained output of a resolved battle.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattleOutput {
    /// Input echoed for self-contained replay.
    pub input: BattleInput,
    /// Complete ordered event log, terminated by `battle_ended`.
    pub events: Vec<EventRecord>,
    /// Terminal result, identical to the one carried by the last event.
    pub result: BattleResult,
}
