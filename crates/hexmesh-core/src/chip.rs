//! A single SpiNNaker-101-style chip: one router, one traffic generator,
//! and the six mesh-facing link slots between them.

use std::cell::RefCell;
use std::rc::Rc;

use crate::clock::System;
use crate::generator::{DestinationSpread, TrafficGenerator};
use crate::link::{handle, buffer::BufferLink, DeadLink, LinkHandle};
use crate::router::{Router, RouterCounters};
use crate::scheduler::Scheduler;
use crate::topology::{Direction, Position};

/// Construction parameters shared by every chip in a run.
#[derive(Debug, Clone, Copy)]
pub struct ChipParams {
    pub injection_buffer_length: Option<usize>,
    pub router_period: u64,
    pub wait_before_emergency: u32,
    pub wait_before_drop: u32,
    pub generator_clock_period: u64,
    pub packet_prob: f64,
    pub spread: DestinationSpread,
}

/// One chip: owns its router and traffic generator, and the six in/out link
/// slots that start out as [`DeadLink`] sentinels until board/torus assembly
/// wires real links (or SATA channels) onto them.
pub struct Chip {
    position: Position,
    injection_link: LinkHandle,
    exit_link: LinkHandle,
    in_links: [LinkHandle; 6],
    out_links: [LinkHandle; 6],
    router: Rc<RefCell<Router>>,
    generator: Rc<RefCell<TrafficGenerator>>,
}

impl Chip {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scheduler: &Scheduler,
        system: Rc<System>,
        seed: u64,
        position: Position,
        mesh_dimensions: (i64, i64),
        params: ChipParams,
    ) -> Self {
        let injection_link = handle(BufferLink::new(params.injection_buffer_length));
        let exit_link = handle(BufferLink::unbounded());
        let in_links: [LinkHandle; 6] = std::array::from_fn(|_| handle(DeadLink));
        let out_links: [LinkHandle; 6] = std::array::from_fn(|_| handle(DeadLink));

        let generator = TrafficGenerator::new(
            scheduler,
            system.clone(),
            seed,
            params.generator_clock_period,
            params.packet_prob,
            injection_link.clone(),
            exit_link.clone(),
            mesh_dimensions,
            position,
            params.spread,
        );

        let router = Router::new(
            scheduler,
            system,
            params.router_period,
            params.wait_before_emergency,
            params.wait_before_drop,
            position,
            mesh_dimensions,
            injection_link.clone(),
            exit_link.clone(),
            in_links.clone(),
            out_links.clone(),
        );

        Chip {
            position,
            injection_link,
            exit_link,
            in_links,
            out_links,
            router,
            generator,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn in_link(&self, direction: Direction) -> LinkHandle {
        self.in_links[direction.index()].clone()
    }

    pub fn out_link(&self, direction: Direction) -> LinkHandle {
        self.out_links[direction.index()].clone()
    }

    /// Replace the dead-link sentinel on an incoming edge with a real link.
    pub fn set_in_link(&mut self, direction: Direction, link: LinkHandle) {
        self.in_links[direction.index()] = link;
    }

    /// Replace the dead-link sentinel on an outgoing edge with a real link.
    pub fn set_out_link(&mut self, direction: Direction, link: LinkHandle) {
        self.out_links[direction.index()] = link;
    }

    pub fn injection_link(&self) -> LinkHandle {
        self.injection_link.clone()
    }

    pub fn exit_link(&self) -> LinkHandle {
        self.exit_link.clone()
    }

    /// Propagates a new mesh position to both the router (for routing
    /// decisions) and the generator (for destination sampling).
    pub fn set_mesh_position(&mut self, position: Position) {
        self.position = position;
        self.router.borrow_mut().set_mesh_position(position);
        self.generator.borrow_mut().set_mesh_position(position);
    }

    pub fn set_mesh_dimensions(&mut self, dimensions: (i64, i64)) {
        self.router.borrow_mut().set_mesh_dimensions(dimensions);
        self.generator.borrow_mut().set_mesh_dimensions(dimensions);
    }

    pub fn router_counters(&self) -> RouterCounters {
        self.router.borrow().counters()
    }

    pub fn generator_counters(&self) -> crate::generator::GeneratorCounters {
        self.generator.borrow().counters()
    }
}
