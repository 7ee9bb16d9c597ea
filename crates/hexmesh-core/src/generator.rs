//! Per-chip stochastic traffic source/sink, standing in for the 18 cores
//! that share a SpiNNaker chip's network interface.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::rc::Rc;

use crate::clock::System;
use crate::link::LinkHandle;
use crate::scheduler::Scheduler;
use crate::topology::Position;

/// Every packet a traffic generator injects is the same fixed length.
pub const PACKET_LENGTH: u32 = 40;

/// How a generator spreads its packets' destinations across the mesh.
#[derive(Debug, Clone, Copy)]
pub enum DestinationSpread {
    /// Every mesh position is equally likely.
    Uniform,
    /// Destinations follow a 2D Gaussian random walk from the generator's
    /// own mesh position, wrapping at the mesh bounds.
    Normal { std_dev: f64 },
}

/// Traffic injected and absorbed counters, mirroring the original's
/// dictionary of named counters with named fields instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratorCounters {
    pub injected_packets: u64,
    pub dropped_packets: u64,
    pub packets_received: u64,
    pub cycles: u64,
}

/// Generates traffic at a random per-cycle probability and absorbs whatever
/// arrives on its exit link, discarding it. One of these sits behind each
/// chip's local injection/exit link pair.
pub struct TrafficGenerator {
    system: Rc<System>,
    clock_period: u64,
    packet_prob: f64,
    injection_link: LinkHandle,
    exit_link: LinkHandle,
    mesh_dimensions: (i64, i64),
    mesh_position: Position,
    spread: DestinationSpread,
    rng: StdRng,
    counters: GeneratorCounters,
}

impl TrafficGenerator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scheduler: &Scheduler,
        system: Rc<System>,
        seed: u64,
        clock_period: u64,
        packet_prob: f64,
        injection_link: LinkHandle,
        exit_link: LinkHandle,
        mesh_dimensions: (i64, i64),
        mesh_position: Position,
        spread: DestinationSpread,
    ) -> Rc<std::cell::RefCell<Self>> {
        let generator = Rc::new(std::cell::RefCell::new(TrafficGenerator {
            system,
            clock_period,
            packet_prob,
            injection_link,
            exit_link,
            mesh_dimensions,
            mesh_position,
            spread,
            rng: StdRng::seed_from_u64(seed),
            counters: GeneratorCounters::default(),
        }));

        TrafficGenerator::arm(scheduler, generator.clone());
        generator
    }

    fn arm(scheduler: &Scheduler, generator: Rc<std::cell::RefCell<Self>>) {
        let period = generator.borrow().clock_period;
        scheduler.schedule_later(
            move |scheduler: &Scheduler| {
                generator.borrow_mut().tick(scheduler);
                TrafficGenerator::arm(scheduler, generator.clone());
            },
            period,
        );
    }

    fn tick(&mut self, scheduler: &Scheduler) {
        self.counters.cycles += 1;

        while self.exit_link.borrow().can_receive() {
            let packet = self.exit_link.borrow_mut().receive(scheduler);
            packet.borrow_mut().receive_time = Some(scheduler.clock());
            self.counters.packets_received += 1;
        }

        if self.rng.random() < self.packet_prob {
            if !self.injection_link.borrow().can_send() {
                self.counters.dropped_packets += 1;
            } else {
                let destination = self.choose_destination();
                let packet = self.system.create_packet(destination, PACKET_LENGTH);
                {
                    let mut p = packet.borrow_mut();
                    p.source = Some(self.mesh_position);
                    p.send_time = Some(scheduler.clock());
                }
                self.injection_link.borrow_mut().send(scheduler, packet);
                self.counters.injected_packets += 1;
            }
        }
    }

    fn choose_destination(&mut self) -> Position {
        match self.spread {
            DestinationSpread::Uniform => (
                self.rng.random_range(0..self.mesh_dimensions.0),
                self.rng.random_range(0..self.mesh_dimensions.1),
            ),
            DestinationSpread::Normal { std_dev } => {
                let (dx, dy) = self.sample_normal_offset(std_dev);
                (
                    (self.mesh_position.0 + dx).rem_euclid(self.mesh_dimensions.0),
                    (self.mesh_position.1 + dy).rem_euclid(self.mesh_dimensions.1),
                )
            }
        }
    }

    /// The original relied on `normalvariate`; rather than pull in
    /// `rand_distr` for one call site, a Box-Muller standard normal is
    /// sampled directly from two uniform draws.
    fn sample_normal_offset(&mut self, std_dev: f64) -> (i64, i64) {
        let dx = (standard_normal(&mut self.rng) * std_dev) as i64;
        let dy = (standard_normal(&mut self.rng) * std_dev) as i64;
        (dx, dy)
    }

    pub fn counters(&self) -> GeneratorCounters {
        self.counters
    }

    pub fn set_mesh_position(&mut self, position: Position) {
        self.mesh_position = position;
    }

    pub fn set_mesh_dimensions(&mut self, dimensions: (i64, i64)) {
        self.mesh_dimensions = dimensions;
    }
}

/// Box-Muller standard normal sample.
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random();
    (-2.0_f64 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
