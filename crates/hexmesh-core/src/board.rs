//! A 48-chip hexagonal board (SpiNNaker-103-style), internally wired with
//! asynchronous handshake links and exposing its outward-facing edges for
//! inter-board assembly.

use std::collections::HashMap;
use std::rc::Rc;

use crate::chip::{Chip, ChipParams};
use crate::clock::System;
use crate::link::{handle, silistix::SilistixLink, LinkHandle};
use crate::scheduler::Scheduler;
use crate::topology::{self, Direction, Edge, Position};

/// Radius of the hexagon every board tiles: `hexagon(4)` yields exactly 48
/// chip positions.
const BOARD_RADIUS: i64 = 4;
/// Outward-facing link slots per edge at that radius.
pub const SLOTS_PER_EDGE: usize = 8;

/// Link timing used for every intra-board asynchronous handshake link.
#[derive(Debug, Clone, Copy)]
pub struct SilistixParams {
    pub send_cycles: u64,
    pub ack_cycles: u64,
}

pub struct Board {
    chips: HashMap<Position, Chip>,
}

impl Board {
    pub fn new(
        scheduler: &Scheduler,
        system: Rc<System>,
        seed: u64,
        chip_params: ChipParams,
        silistix_params: SilistixParams,
        mesh_dimensions: (i64, i64),
    ) -> Self {
        let positions = topology::hexagon(BOARD_RADIUS);
        let mut chips: HashMap<Position, Chip> = positions
            .iter()
            .enumerate()
            .map(|(i, &pos)| {
                let chip = Chip::new(
                    scheduler,
                    system.clone(),
                    seed.wrapping_add(i as u64),
                    pos,
                    mesh_dimensions,
                    chip_params,
                );
                (pos, chip)
            })
            .collect();

        let position_set: std::collections::HashSet<Position> = positions.iter().copied().collect();

        for &pos in &positions {
            for &dir in &[Direction::North, Direction::NorthEast, Direction::East] {
                let neighbor = topology::to_xy(topology::add_direction(topology::zero_pad(pos), dir));
                if !position_set.contains(&neighbor) {
                    continue;
                }

                let forward = handle(SilistixLink::new(silistix_params.send_cycles, silistix_params.ack_cycles));
                let backward = handle(SilistixLink::new(silistix_params.send_cycles, silistix_params.ack_cycles));

                chips.get_mut(&pos).unwrap().set_out_link(dir, forward.clone());
                chips.get_mut(&neighbor).unwrap().set_in_link(dir, forward);

                chips.get_mut(&neighbor).unwrap().set_out_link(dir.opposite(), backward.clone());
                chips.get_mut(&pos).unwrap().set_in_link(dir.opposite(), backward);
            }
        }

        let chip_count = chips.len();
        tracing::info!(chips = chip_count, "assembled board");

        Board { chips }
    }

    pub fn chip(&self, position: Position) -> &Chip {
        self.chips.get(&position).expect("position not inside this board")
    }

    pub fn chip_mut(&mut self, position: Position) -> &mut Chip {
        self.chips.get_mut(&position).expect("position not inside this board")
    }

    pub fn positions(&self) -> Vec<Position> {
        topology::hexagon(BOARD_RADIUS)
    }

    /// The (chip, direction) edge-facing link slot at `(edge, index)`.
    pub fn edge_link_slot(&self, edge: Edge, index: usize) -> (Position, Direction) {
        topology::hexagon_edge_link(edge, index, BOARD_RADIUS)
    }

    fn left_half(&self) -> Vec<Position> {
        self.positions().into_iter().filter(|&(x, _)| x < 0).collect()
    }

    fn right_half(&self) -> Vec<Position> {
        self.positions().into_iter().filter(|&(x, _)| x >= 0).collect()
    }

    fn bottom_half(&self) -> Vec<Position> {
        self.positions().into_iter().filter(|&(_, y)| y <= 0).collect()
    }

    fn top_half(&self) -> Vec<Position> {
        self.positions().into_iter().filter(|&(_, y)| y >= 1).collect()
    }

    /// Moves the left half only, leaving the right half untouched: chip at
    /// local `pos` lands at `(x + pos.x + 4, y + pos.y + 3)`.
    pub fn set_mesh_position_left(&mut self, x: i64, y: i64) {
        for pos in self.left_half() {
            let new_pos = (x + pos.0 + 4, y + pos.1 + 3);
            self.chip_mut(pos).set_mesh_position(new_pos);
        }
    }

    /// Moves the right half only, leaving the left half untouched: chip at
    /// local `pos` lands at `(x + pos.x, y + pos.y + 3)`.
    pub fn set_mesh_position_right(&mut self, x: i64, y: i64) {
        for pos in self.right_half() {
            let new_pos = (x + pos.0, y + pos.1 + 3);
            self.chip_mut(pos).set_mesh_position(new_pos);
        }
    }

    /// Moves the top half only, leaving the bottom half untouched: chip at
    /// local `pos` lands at `(x + pos.x + 3, y + pos.y - 1)`.
    pub fn set_mesh_position_top(&mut self, x: i64, y: i64) {
        for pos in self.top_half() {
            let new_pos = (x + pos.0 + 3, y + pos.1 - 1);
            self.chip_mut(pos).set_mesh_position(new_pos);
        }
    }

    /// Moves the bottom half only, leaving the top half untouched: chip at
    /// local `pos` lands at `(x + pos.x + 4, y + pos.y + 3)`.
    pub fn set_mesh_position_bottom(&mut self, x: i64, y: i64) {
        for pos in self.bottom_half() {
            let new_pos = (x + pos.0 + 4, y + pos.1 + 3);
            self.chip_mut(pos).set_mesh_position(new_pos);
        }
    }

    /// Places the whole board so its bottom-leftmost chip lands at `(x, y)`:
    /// delegates to the left/right half setters, both of which land their
    /// half at offset `(x+4, y+3)` from local coordinates.
    pub fn set_mesh_position(&mut self, x: i64, y: i64) {
        self.set_mesh_position_left(x, y);
        self.set_mesh_position_right(x + 4, y);
    }

    pub fn set_mesh_dimensions(&mut self, dimensions: (i64, i64)) {
        for chip in self.chips.values_mut() {
            chip.set_mesh_dimensions(dimensions);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::DestinationSpread;

    fn default_chip_params() -> ChipParams {
        ChipParams {
            injection_buffer_length: Some(4),
            router_period: 1,
            wait_before_emergency: 8,
            wait_before_drop: 16,
            generator_clock_period: 1,
            packet_prob: 0.0,
            spread: DestinationSpread::Uniform,
        }
    }

    fn make_board() -> (Rc<Scheduler>, Board) {
        let scheduler = Scheduler::new();
        let system = System::new(scheduler.clone(), 1000);
        let board = Board::new(
            &scheduler,
            system,
            1,
            default_chip_params(),
            SilistixParams { send_cycles: 1, ack_cycles: 1 },
            (48, 48),
        );
        (scheduler, board)
    }

    #[test]
    fn board_has_forty_eight_chips() {
        let (_scheduler, board) = make_board();
        assert_eq!(board.positions().len(), 48);
    }

    #[test]
    fn interior_links_are_wired_both_ways() {
        let (_scheduler, board) = make_board();
        // (0,0) and its East neighbour (1,0) are both inside hexagon(4).
        let east_out = board.chip((0, 0)).out_link(Direction::East);
        let east_in = board.chip((1, 0)).in_link(Direction::East);
        assert!(Rc::ptr_eq(&east_out, &east_in));

        let west_out = board.chip((1, 0)).out_link(Direction::West);
        let west_in = board.chip((0, 0)).in_link(Direction::West);
        assert!(Rc::ptr_eq(&west_out, &west_in));
    }

    #[test]
    fn edge_link_slots_cover_every_outward_facing_pair() {
        let (_scheduler, board) = make_board();
        for &edge in &topology::ALL_EDGES {
            for i in 0..SLOTS_PER_EDGE {
                let (pos, dir) = board.edge_link_slot(edge, i);
                assert!(board.positions().contains(&pos));
                let _ = dir;
            }
        }
    }

    #[test]
    fn set_mesh_position_relocates_every_chip() {
        let (_scheduler, mut board) = make_board();
        board.set_mesh_position(100, 200);
        // Both halves land at the same (x+4, y+3) offset from local
        // coordinates: `set_mesh_position(x,y)` moves the left half by
        // `(x, y)` (which bakes in another `+4, +3`) and the right half by
        // `(x+4, y)` (which bakes in `+0, +3`) — both resolve to `+4, +3`.
        for pos in board.positions() {
            let relocated = board.chip(pos).position();
            let expected = (pos.0 + 104, pos.1 + 203);
            assert_eq!(relocated, expected);
        }
    }

    #[test]
    fn set_mesh_position_gives_every_chip_a_unique_position() {
        let (_scheduler, mut board) = make_board();
        board.set_mesh_position(0, 0);
        let positions: std::collections::HashSet<Position> =
            board.positions().into_iter().map(|pos| board.chip(pos).position()).collect();
        assert_eq!(positions.len(), board.positions().len());
    }
}
