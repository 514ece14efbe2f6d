use grid_skirmish_core::{
    BattleInput, GridSize, Position, Side, TileCaps, UnitId, UnitKind, UnitPlacement,
};
use grid_skirmish_system_pathfinding::Pathfinder;
use grid_skirmish_world::{query, World};
use proptest::prelude::*;

fn layout(grid: GridSize, caps: TileCaps, units: Vec<UnitPlacement>) -> Option<World> {
    World::scaffold(&BattleInput {
        grid,
        caps,
        seed: 0,
        tick_limit: 1,
        units,
    })
    .ok()
}

#[test]
fn saturated_board_terminates_without_step() {
    let grid = GridSize::new(6, 6);
    let mut units = Vec::new();
    let mut next_id = 1;
    for y in 0..6 {
        for x in 0..6 {
            let side = if x < 3 { Side::Red } else { Side::Blue };
            units.push(UnitPlacement::new(
                UnitId::new(next_id),
                side,
                UnitKind::Infantry,
                Position::new(x, y),
            ));
            next_id += 1;
        }
    }
    let world = layout(grid, TileCaps::new(1, 1), units).expect("one unit per tile");
    let mut pathfinder = Pathfinder::default();

    for snapshot in query::unit_view(&world).iter() {
        assert_eq!(
            pathfinder.next_step(snapshot, query::occupancy_view(&world)),
            None,
            "{} has nowhere to go",
            snapshot.id
        );
    }
}

#[test]
fn cavalry_respects_size_cap_on_friendly_tiles() {
    let grid = GridSize::new(5, 2);
    let cavalry = UnitPlacement::new(
        UnitId::new(1),
        Side::Red,
        UnitKind::Cavalry,
        Position::new(0, 0),
    );
    let blocker = UnitPlacement::new(
        UnitId::new(2),
        Side::Red,
        UnitKind::Infantry,
        Position::new(1, 0),
    );
    let enemy = UnitPlacement::new(
        UnitId::new(3),
        Side::Blue,
        UnitKind::Infantry,
        Position::new(4, 0),
    );
    let world = layout(grid, TileCaps::new(2, 2), vec![cavalry, blocker, enemy])
        .expect("valid layout");

    let snapshot = query::unit(&world, UnitId::new(1)).expect("cavalry");
    let step = Pathfinder::default().next_step(&snapshot, query::occupancy_view(&world));
    assert_eq!(step, Some(Position::new(0, 1)), "size 2 + 1 exceeds the cap");
}

fn placements() -> impl Strategy<Value = (GridSize, Vec<UnitPlacement>)> {
    (2u32..8, 1u32..6).prop_flat_map(|(width, height)| {
        let unit = (0..width, 0..height, any::<bool>(), 0usize..4);
        (
            Just(GridSize::new(width, height)),
            prop::collection::vec(unit, 1..12),
        )
            .prop_map(|(grid, raw)| {
                let units = raw
                    .into_iter()
                    .enumerate()
                    .map(|(index, (x, y, red, kind))| {
                        let side = if red { Side::Red } else { Side::Blue };
                        UnitPlacement::new(
                            UnitId::new(index as u32 + 1),
                            side,
                            UnitKind::ALL[kind],
                            Position::new(x, y),
                        )
                    })
                    .collect();
                (grid, units)
            })
    })
}

proptest! {
    #[test]
    fn steps_are_adjacent_and_enterable((grid, units) in placements()) {
        let world = layout(grid, TileCaps::new(3, 4), units);
        prop_assume!(world.is_some());
        let world = world.expect("checked above");
        let occupancy = query::occupancy_view(&world);
        let mut pathfinder = Pathfinder::default();

        for snapshot in query::unit_view(&world).iter() {
            let first = pathfinder.next_step(snapshot, occupancy);
            let second = pathfinder.next_step(snapshot, occupancy);
            prop_assert_eq!(first, second);

            if let Some(step) = first {
                prop_assert_eq!(snapshot.position.manhattan_distance(step), 1);
                prop_assert!(occupancy.can_enter(snapshot.side, snapshot.size, step));
                prop_assert!(occupancy.has_enemies(snapshot.side));
            }
        }
    }
}
