use std::collections::BTreeMap;

use grid_skirmish_core::{
    BattleInput, BattleOutput, Event, GridSize, Position, Side, TileCaps, UnitId, UnitKind,
    UnitPlacement,
};
use grid_skirmish_system_scheduler::{deployed, resolve, EngineConfig};
use proptest::prelude::*;

#[derive(Clone, Copy, Debug)]
struct Tracked {
    side: Side,
    size: u32,
    position: Position,
    alive: bool,
}

#[derive(Clone, Copy, Default)]
struct Deployed {
    side: Option<Side>,
    count: u32,
    size: u32,
}

/// Random inputs that pass validation: every unit stands in its own side's
/// columns, tiles may stack friendly units up to randomly drawn caps, and ids
/// are sparse and listed out of order.
fn battles() -> impl Strategy<Value = (BattleInput, EngineConfig)> {
    let shape = (2u32..9, 1u32..6, 1u32..4, 1u32..5);
    let timing = (any::<u64>(), 1u64..120, 0u64..30);
    (shape, timing).prop_flat_map(
        |((width, height, max_units, max_size), (seed, tick_limit, stall_ticks))| {
            let grid = GridSize::new(width, height);
            let caps = TileCaps::new(max_units, max_size);
            let slot = (any::<bool>(), 0u32..width, 0u32..height, 0usize..4);
            let ids = prop::collection::btree_set(1u32..1_000, 14)
                .prop_map(|ids| ids.into_iter().collect::<Vec<_>>())
                .prop_shuffle();
            (prop::collection::vec(slot, 0..14), ids).prop_map(move |(slots, ids)| {
                let mut tiles: BTreeMap<Position, Deployed> = BTreeMap::new();
                let mut units = Vec::new();
                for (red, x, y, kind) in slots {
                    let side = if red { Side::Red } else { Side::Blue };
                    let kind = UnitKind::ALL[kind];
                    let position = Position::new(x, y);
                    if !grid.in_deployment_zone(side, position) {
                        continue;
                    }
                    let tile = tiles.entry(position).or_default();
                    if tile.side.is_some_and(|held| held != side)
                        || tile.count + 1 > caps.max_units
                        || tile.size + kind.size() > caps.max_size
                    {
                        continue;
                    }
                    tile.side = Some(side);
                    tile.count += 1;
                    tile.size += kind.size();
                    let id = UnitId::new(ids[units.len()]);
                    units.push(UnitPlacement::new(id, side, kind, position));
                }
                let input = BattleInput {
                    grid,
                    caps,
                    seed,
                    tick_limit,
                    units,
                };
                (input, EngineConfig::default().with_stall_ticks(stall_ticks))
            })
        },
    )
}

fn replay_tiles(output: &BattleOutput) -> Result<(), TestCaseError> {
    let caps = output.input.caps;
    let mut units: BTreeMap<UnitId, Tracked> = BTreeMap::new();
    let mut index = 0;

    while index < output.events.len() {
        let tick = output.events[index].tick;
        while index < output.events.len() && output.events[index].tick == tick {
            match &output.events[index].event {
                Event::UnitSpawned { unit } => {
                    let _ = units.insert(
                        unit.id,
                        Tracked {
                            side: unit.side,
                            size: unit.size,
                            position: unit.position,
                            alive: true,
                        },
                    );
                }
                Event::UnitMoved { unit, to, .. } => {
                    let tracked = units.get_mut(unit).expect("moved unit spawned");
                    prop_assert!(tracked.alive, "{unit} moved after removal");
                    tracked.position = *to;
                }
                Event::UnitRemoved { unit, .. } => {
                    let tracked = units.get_mut(unit).expect("removed unit spawned");
                    prop_assert!(tracked.alive, "{unit} removed twice");
                    tracked.alive = false;
                }
                _ => {}
            }
            index += 1;
        }

        let mut tiles: BTreeMap<Position, Vec<Tracked>> = BTreeMap::new();
        for tracked in units.values().filter(|tracked| tracked.alive) {
            tiles.entry(tracked.position).or_default().push(*tracked);
        }
        for (position, occupants) in tiles {
            let side = occupants[0].side;
            prop_assert!(
                occupants.iter().all(|tracked| tracked.side == side),
                "mixed tile {position} at tick {tick}"
            );
            prop_assert!(occupants.len() as u32 <= caps.max_units);
            prop_assert!(occupants.iter().map(|tracked| tracked.size).sum::<u32>() <= caps.max_size);
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn resolution_is_deterministic((input, config) in battles()) {
        let first = resolve(&input, &config).expect("valid battle");
        let second = resolve(&input, &config).expect("valid battle");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn tiles_respect_occupancy_rules_every_tick((input, config) in battles()) {
        let output = resolve(&input, &config).expect("valid battle");
        replay_tiles(&output)?;
    }

    #[test]
    fn battle_terminates_exactly_once_within_limit((input, config) in battles()) {
        let output = resolve(&input, &config).expect("valid battle");
        let terminals = output
            .events
            .iter()
            .filter(|record| matches!(record.event, Event::BattleEnded { .. }))
            .count();
        prop_assert_eq!(terminals, 1);
        prop_assert!(matches!(
            output.events.last().map(|record| &record.event),
            Some(Event::BattleEnded { result }) if *result == output.result
        ), "last event must be BattleEnded carrying the final result");
        prop_assert!(output.result.tick <= input.tick_limit);
    }

    #[test]
    fn units_are_conserved((input, config) in battles()) {
        let output = resolve(&input, &config).expect("valid battle");
        let removed = output
            .events
            .iter()
            .filter(|record| record.event.is_removal())
            .count() as u32;
        prop_assert_eq!(deployed(&output).total(), input.units.len() as u32);
        prop_assert_eq!(removed + output.result.survivors.total(), input.units.len() as u32);
    }

    #[test]
    fn events_follow_tick_then_seq_order((input, config) in battles()) {
        let output = resolve(&input, &config).expect("valid battle");
        let body = &output.events[..output.events.len() - 1];
        for pair in body.windows(2) {
            let (earlier, later) = (&pair[0], &pair[1]);
            prop_assert!(
                (earlier.tick, earlier.seq) <= (later.tick, later.seq),
                "{:?} precedes {:?}",
                earlier,
                later
            );
        }
        let terminal = &output.events[output.events.len() - 1];
        prop_assert!(body.iter().all(|record| record.tick <= terminal.tick));
    }
}
