//! Text presentation of reconstructed battle frames.
//!
//! Each tile is drawn two characters wide: the glyph of its lowest-id
//! occupant followed by the stack height when more than one unit shares it.
//! Red glyphs are upper case and Blue glyphs lower case. Empty tiles show
//! `*` while a projectile is inbound and `.` otherwise.

use std::fmt::Write as _;

use grid_skirmish_core::{Position, Side, UnitKind};
use grid_skirmish_system_replay::{BattleFrame, FrameUnit};

fn glyph(unit: &FrameUnit) -> char {
    let letter = match unit.kind {
        UnitKind::Infantry => 'I',
        UnitKind::Cavalry => 'C',
        UnitKind::Archer => 'A',
        UnitKind::Mage => 'M',
    };
    match unit.side {
        Side::Red => letter,
        Side::Blue => letter.to_ascii_lowercase(),
    }
}

fn tile(frame: &BattleFrame, position: Position) -> [char; 2] {
    let mut occupants = frame.occupants(position);
    let Some(first) = occupants.next() else {
        let inbound = frame
            .projectiles()
            .iter()
            .any(|flight| flight.target == position);
        return [if inbound { '*' } else { '.' }, ' '];
    };
    let stacked = 1 + occupants.count();
    let height = if stacked > 1 {
        char::from_digit(stacked.min(9) as u32, 10).unwrap_or('+')
    } else {
        ' '
    };
    [glyph(first), height]
}

/// Draws the frame as a header line followed by one text row per grid row.
#[must_use]
pub(crate) fn frame(frame: &BattleFrame) -> String {
    let grid = frame.grid();
    let survivors = frame.survivors();
    let mut out = String::new();
    let _ = write!(
        out,
        "tick {}  red {}  blue {}  in flight {}",
        frame.tick(),
        survivors.red,
        survivors.blue,
        frame.projectiles().len()
    );
    if let Some(result) = frame.result() {
        let _ = write!(out, "  ended: {:?} ({:?})", result.winner, result.reason);
    }
    out.push('\n');

    for y in 0..grid.height {
        let row: String = (0..grid.width)
            .flat_map(|x| tile(frame, Position::new(x, y)))
            .collect();
        out.push_str(row.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_skirmish_core::{
        BattleInput, BattleOutput, GridSize, TileCaps, UnitId, UnitPlacement,
    };
    use grid_skirmish_system_replay::Replay;
    use grid_skirmish_system_scheduler::{resolve, EngineConfig};

    fn skirmish() -> BattleOutput {
        let input = BattleInput {
            grid: GridSize::new(6, 2),
            caps: TileCaps::new(2, 3),
            seed: 4,
            tick_limit: 120,
            units: vec![
                UnitPlacement::new(UnitId::new(1), Side::Red, UnitKind::Archer, Position::new(0, 0)),
                UnitPlacement::new(UnitId::new(2), Side::Red, UnitKind::Infantry, Position::new(0, 0)),
                UnitPlacement::new(UnitId::new(3), Side::Blue, UnitKind::Mage, Position::new(5, 1)),
            ],
        };
        resolve(&input, &EngineConfig::default()).expect("valid battle")
    }

    #[test]
    fn deployment_frame_shows_stacks_and_sides() {
        let output = skirmish();
        let frame = Replay::new(&output)
            .expect("valid log")
            .frame_at(0)
            .expect("frame");

        let text = super::frame(&frame);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "tick 0  red 2  blue 1  in flight 0");
        assert_eq!(lines[1], "A2. . . . .");
        assert_eq!(lines[2], ". . . . . m");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn final_frame_reports_the_outcome() {
        let output = skirmish();
        let frame = Replay::new(&output)
            .expect("valid log")
            .final_frame()
            .expect("frame");

        let text = super::frame(&frame);
        let header = text.lines().next().expect("header");
        assert!(header.starts_with(&format!("tick {}", output.result.tick)));
        assert!(header.contains("ended:"));
    }
}
