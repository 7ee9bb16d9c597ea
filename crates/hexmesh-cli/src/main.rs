//! Demo binary driving the hexmesh-core interconnect simulator for a fixed
//! number of cycles and printing the aggregate counters on completion.

use std::rc::Rc;

use clap::Parser;
use hexmesh_core::config::{LinkConfig, RouterConfig, SimConfig, TrafficConfig};
use hexmesh_core::generator::DestinationSpread;
use hexmesh_core::Scheduler;
use tracing_subscriber::EnvFilter;

/// Runs the hexmesh interconnect simulator for a fixed cycle count.
#[derive(Parser, Debug)]
#[command(name = "hexmesh-cli", about = "Hexagonal-toroidal interconnect simulator")]
struct Cli {
    /// Board-set grid width.
    #[arg(long, default_value_t = 1)]
    width: i64,

    /// Board-set grid height.
    #[arg(long, default_value_t = 1)]
    height: i64,

    /// Number of scheduler cycles to run.
    #[arg(long, default_value_t = 10_000)]
    cycles: u64,

    /// Per-cycle packet injection probability at every chip.
    #[arg(long, default_value_t = 0.01)]
    packet_prob: f64,

    /// Base RNG seed every chip's traffic generator derives its own seed from.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = SimConfig {
        width: cli.width,
        height: cli.height,
        router: RouterConfig::default(),
        link: LinkConfig::default(),
        traffic: TrafficConfig {
            packet_prob: cli.packet_prob,
            spread: DestinationSpread::Uniform,
            ..TrafficConfig::default()
        },
        ..SimConfig::default()
    };

    tracing::info!(
        width = cli.width,
        height = cli.height,
        cycles = cli.cycles,
        packet_prob = cli.packet_prob,
        "hexmesh-cli starting"
    );

    let scheduler: Rc<Scheduler> = Scheduler::new();
    let (system, torus) = config.build(&scheduler, cli.seed);
    scheduler.run_until(cli.cycles);

    let (received, dropped, in_flight) = system.summarize();
    println!("ran {} cycles over {} chips", cli.cycles, torus.chip_count());
    println!(
        "packets: created={} received={} dropped={} in_flight={}",
        system.packet_count(),
        received,
        dropped,
        in_flight
    );

    let mut total_routed = 0u64;
    let mut total_emergency = 0u64;
    let mut total_timeout = 0u64;
    let mut total_injected = 0u64;
    let mut total_generator_dropped = 0u64;

    for &coords in &torus.board_coords() {
        let board = torus.board(coords);
        for pos in board.positions() {
            let chip = board.chip(pos);
            let router_counters = chip.router_counters();
            let generator_counters = chip.generator_counters();
            total_routed += router_counters.packets_routed;
            total_emergency += router_counters.packet_emergency_routed;
            total_timeout += router_counters.router_packet_timeout + router_counters.timestamp_packet_timeout;
            total_injected += generator_counters.injected_packets;
            total_generator_dropped += generator_counters.dropped_packets;
        }
    }

    println!(
        "routing: routed={} emergency={} router_timeouts={}",
        total_routed, total_emergency, total_timeout
    );
    println!(
        "generation: injected={} injection_dropped={}",
        total_injected, total_generator_dropped
    );

    Ok(())
}
