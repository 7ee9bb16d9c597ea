//! Tiles boards into a toroidal mesh: `width * height * 3` boards, wired
//! together with aggregated inter-board links.

use std::rc::Rc;

use crate::board::{Board, SilistixParams, SLOTS_PER_EDGE};
use crate::chip::ChipParams;
use crate::clock::System;
use crate::link::sata::SATALink;
use crate::scheduler::Scheduler;
use crate::topology::Edge;

/// Timing/sizing parameters for every inter-board aggregated link.
#[derive(Debug, Clone, Copy)]
pub struct SataParams {
    pub num_channels: usize,
    pub accept_period: u64,
    pub buffer_length: i64,
    pub latency: u64,
    pub silistix_send_cycles: u64,
    pub silistix_ack_cycles: u64,
}

/// Identifies one of the three board kinds tiled into each `(x, y)` torus
/// cell: the bottom-left board, the top board, and the right board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoardKind {
    BottomLeft,
    Top,
    Right,
}

const BOARD_KINDS: [BoardKind; 3] = [BoardKind::BottomLeft, BoardKind::Top, BoardKind::Right];

impl BoardKind {
    fn board_coords(self, x: i64, y: i64) -> (i64, i64) {
        match self {
            BoardKind::BottomLeft => (3 * x, 3 * y),
            BoardKind::Top => (3 * x + 1, 3 * y + 2),
            BoardKind::Right => (3 * x + 2, 3 * y + 1),
        }
    }
}

/// A width×height grid of board-triples, replicated into a toroidal mesh of
/// `12*width` by `12*height` chips.
pub struct Torus {
    width: i64,
    height: i64,
    boards: std::collections::HashMap<(i64, i64), Board>,
}

impl Torus {
    pub fn new(
        scheduler: &Scheduler,
        system: Rc<System>,
        width: i64,
        height: i64,
        seed: u64,
        chip_params: ChipParams,
        silistix_params: SilistixParams,
        sata_params: SataParams,
    ) -> Self {
        assert!(width >= 1 && height >= 1, "torus must be at least 1x1 board-tiles");

        let mesh_dimensions = (12 * width, 12 * height);
        let mut boards = std::collections::HashMap::new();

        for tx in 0..width {
            for ty in 0..height {
                for (z, &kind) in BOARD_KINDS.iter().enumerate() {
                    let (bx, by) = kind.board_coords(tx, ty);
                    let board_seed = seed
                        .wrapping_add((tx as u64) * 1_000_003)
                        .wrapping_add((ty as u64) * 97)
                        .wrapping_add(z as u64);
                    let mut board = Board::new(
                        scheduler,
                        system.clone(),
                        board_seed,
                        chip_params,
                        silistix_params,
                        mesh_dimensions,
                    );
                    board.set_mesh_position(bx * 4, by * 4);
                    if bx == 3 * width - 1 {
                        board.set_mesh_position_right(0, by * 4);
                    }
                    if by == 3 * height - 1 {
                        board.set_mesh_position_top(bx * 4 + 1, 0);
                    }
                    boards.insert((bx, by), board);
                }
            }
        }

        let board_count = (3 * width * 3 * height) as usize;
        let mut torus = Torus { width, height, boards };
        torus.wire_inter_board_links(scheduler, &sata_params);

        tracing::info!(width, height, chips = board_count * 48, "assembled torus");

        torus
    }

    fn board_grid_size(&self) -> (i64, i64) {
        (3 * self.width, 3 * self.height)
    }

    fn wire_inter_board_links(&mut self, scheduler: &Scheduler, sata_params: &SataParams) {
        let (gw, gh) = self.board_grid_size();
        let neighbor_edges = [
            ((1, 2), Edge::Top),
            ((2, 1), Edge::TopRight),
            ((1, -1), Edge::BottomRight),
        ];

        for bx in 0..gw {
            for by in 0..gh {
                for &(delta, edge) in &neighbor_edges {
                    let nbx = (bx + delta.0).rem_euclid(gw);
                    let nby = (by + delta.1).rem_euclid(gh);

                    self.wire_direction(scheduler, sata_params, (bx, by), (nbx, nby), edge);
                    self.wire_direction(scheduler, sata_params, (nbx, nby), (bx, by), edge.opposite());
                }
            }
        }
    }

    /// Installs one aggregated link carrying traffic from `from` to `to`
    /// across `edge` (on `from`'s side) / `edge.opposite()` (on `to`'s
    /// side), wiring channel `k` of the link to slot `k` on each side.
    fn wire_direction(
        &mut self,
        scheduler: &Scheduler,
        sata_params: &SataParams,
        from: (i64, i64),
        to: (i64, i64),
        edge: Edge,
    ) {
        let link = SATALink::new(
            scheduler,
            sata_params.num_channels,
            sata_params.accept_period,
            sata_params.buffer_length,
            sata_params.latency,
            sata_params.silistix_send_cycles,
            sata_params.silistix_ack_cycles,
        );

        for k in 0..SLOTS_PER_EDGE.min(sata_params.num_channels) {
            let (from_pos, from_dir) = self.boards[&from].edge_link_slot(edge, k);
            let (to_pos, to_dir) = self.boards[&to].edge_link_slot(edge.opposite(), k);

            let channel = crate::link::handle(link.channel(k));
            self.boards.get_mut(&from).unwrap().chip_mut(from_pos).set_out_link(from_dir, channel.clone());
            self.boards.get_mut(&to).unwrap().chip_mut(to_pos).set_in_link(to_dir, channel);
        }
    }

    pub fn board(&self, coords: (i64, i64)) -> &Board {
        self.boards.get(&coords).expect("board coordinate out of range")
    }

    pub fn board_mut(&mut self, coords: (i64, i64)) -> &mut Board {
        self.boards.get_mut(&coords).expect("board coordinate out of range")
    }

    pub fn width(&self) -> i64 {
        self.width
    }

    pub fn height(&self) -> i64 {
        self.height
    }

    pub fn board_coords(&self) -> Vec<(i64, i64)> {
        self.boards.keys().copied().collect()
    }

    pub fn chip_count(&self) -> usize {
        self.boards.len() * 48
    }
}
