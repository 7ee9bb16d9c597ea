//! Typed configuration aggregate: the constructor parameters scattered across
//! `generator.rs`/`router.rs`/`board.rs`/`torus.rs` collected into one place
//! with sensible `Default`s, so a caller assembles a whole run from one
//! struct instead of threading two dozen arguments by hand.

use std::rc::Rc;

use crate::board::SilistixParams;
use crate::chip::ChipParams;
use crate::clock::System;
use crate::generator::DestinationSpread;
use crate::scheduler::Scheduler;
use crate::torus::{SataParams, Torus};

/// Per-link timing, shared by every asynchronous handshake link in the mesh
/// and folded into the aggregated S-ATA channels that connect boards.
#[derive(Debug, Clone, Copy)]
pub struct LinkConfig {
    pub silistix_send_cycles: u64,
    pub silistix_ack_cycles: u64,
    pub injection_buffer_length: Option<usize>,
    pub sata_num_channels: usize,
    pub sata_accept_period: u64,
    pub sata_buffer_length: i64,
    pub sata_latency: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            silistix_send_cycles: 1,
            silistix_ack_cycles: 1,
            injection_buffer_length: Some(4),
            sata_num_channels: 8,
            sata_accept_period: 1,
            sata_buffer_length: 4,
            sata_latency: 16,
        }
    }
}

/// Router arbitration timing: how long a packet waits before emergency
/// routing kicks in, and before it is dropped outright.
#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    pub period: u64,
    pub wait_before_emergency: u32,
    pub wait_before_drop: u32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            period: 1,
            wait_before_emergency: 8,
            wait_before_drop: 32,
        }
    }
}

/// Per-chip traffic generator behaviour.
#[derive(Debug, Clone, Copy)]
pub struct TrafficConfig {
    pub clock_period: u64,
    pub packet_prob: f64,
    pub spread: DestinationSpread,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        TrafficConfig {
            clock_period: 1,
            packet_prob: 0.01,
            spread: DestinationSpread::Uniform,
        }
    }
}

/// Top-level run configuration: board-set grid dimensions plus the three
/// nested parameter bags and the system clock's phase period.
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    pub width: i64,
    pub height: i64,
    pub time_phase_period: u64,
    pub router: RouterConfig,
    pub link: LinkConfig,
    pub traffic: TrafficConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            width: 1,
            height: 1,
            time_phase_period: 4,
            router: RouterConfig::default(),
            link: LinkConfig::default(),
            traffic: TrafficConfig::default(),
        }
    }
}

impl SimConfig {
    /// Builds the `System` clock and a fully-wired `Torus` from this
    /// configuration. `seed` is the base RNG seed every chip's traffic
    /// generator derives its own seed from.
    pub fn build(&self, scheduler: &Rc<Scheduler>, seed: u64) -> (Rc<System>, Torus) {
        let system = System::new(scheduler.clone(), self.time_phase_period);

        let chip_params = ChipParams {
            injection_buffer_length: self.link.injection_buffer_length,
            router_period: self.router.period,
            wait_before_emergency: self.router.wait_before_emergency,
            wait_before_drop: self.router.wait_before_drop,
            generator_clock_period: self.traffic.clock_period,
            packet_prob: self.traffic.packet_prob,
            spread: self.traffic.spread,
        };

        let silistix_params = SilistixParams {
            send_cycles: self.link.silistix_send_cycles,
            ack_cycles: self.link.silistix_ack_cycles,
        };

        let sata_params = SataParams {
            num_channels: self.link.sata_num_channels,
            accept_period: self.link.sata_accept_period,
            buffer_length: self.link.sata_buffer_length,
            latency: self.link.sata_latency,
            silistix_send_cycles: self.link.silistix_send_cycles,
            silistix_ack_cycles: self.link.silistix_ack_cycles,
        };

        let torus = Torus::new(
            scheduler,
            system.clone(),
            self.width,
            self.height,
            seed,
            chip_params,
            silistix_params,
            sata_params,
        );

        (system, torus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_a_one_by_one_torus() {
        let scheduler = Scheduler::new();
        let config = SimConfig::default();
        let (_system, torus) = config.build(&scheduler, 7);
        assert_eq!(torus.chip_count(), 144);
    }

    #[test]
    fn wider_config_scales_chip_count() {
        let scheduler = Scheduler::new();
        let config = SimConfig {
            width: 2,
            height: 2,
            ..SimConfig::default()
        };
        let (_system, torus) = config.build(&scheduler, 7);
        assert_eq!(torus.chip_count(), 4 * 144);
    }
}
