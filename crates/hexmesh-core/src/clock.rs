//! The system-wide 2-bit time-phase clock and the global packet registry.

use std::cell::RefCell;
use std::rc::Rc;

use crate::packet::{Packet, PacketRef, TimePhase};
use crate::scheduler::Scheduler;
use crate::topology::Position;

/// Gray-coded time-phase advance: `00 -> 01 -> 11 -> 10 -> 00`.
fn advance(phase: TimePhase) -> TimePhase {
    match phase {
        0b00 => 0b01,
        0b01 => 0b11,
        0b11 => 0b10,
        _ => 0b00,
    }
}

/// Owns the global 2-bit time-phase and the append-only record of every
/// packet ever created, for post-run analysis. Every chip's traffic
/// generator creates packets through this struct so their `time_phase` is
/// stamped consistently and the registry holds the very same `PacketRef`
/// that goes on to travel through the mesh's links and routers.
pub struct System {
    scheduler: Rc<Scheduler>,
    time_phase_period: u64,
    time_phase: RefCell<TimePhase>,
    packets: RefCell<Vec<PacketRef>>,
}

impl System {
    pub fn new(scheduler: Rc<Scheduler>, time_phase_period: u64) -> Rc<Self> {
        let system = Rc::new(System {
            scheduler: scheduler.clone(),
            time_phase_period,
            time_phase: RefCell::new(0b00),
            packets: RefCell::new(Vec::new()),
        });
        let weak = Rc::downgrade(&system);
        scheduler.schedule_later(
            move |scheduler: &Scheduler| {
                if let Some(system) = weak.upgrade() {
                    System::retick(&system, scheduler);
                }
            },
            time_phase_period,
        );
        system
    }

    // Each tick re-arms itself as a fresh scheduled task rather than
    // recursing through the Rust call stack.
    fn retick(system: &Rc<Self>, scheduler: &Scheduler) {
        let mut phase = system.time_phase.borrow_mut();
        *phase = advance(*phase);
        drop(phase);
        let weak = Rc::downgrade(system);
        scheduler.schedule_later(
            move |scheduler: &Scheduler| {
                if let Some(system) = weak.upgrade() {
                    System::retick(&system, scheduler);
                }
            },
            system.time_phase_period,
        );
    }

    /// Current 2-bit time-phase.
    pub fn time_phase(&self) -> TimePhase {
        *self.time_phase.borrow()
    }

    /// The scheduler this system's clock is ticking on.
    pub fn scheduler(&self) -> &Rc<Scheduler> {
        &self.scheduler
    }

    /// Create a new packet stamped with the current time-phase, publish it
    /// into the append-only registry, and hand back the shared reference
    /// every holder downstream (the injecting link, the routers it passes
    /// through, the exit link) will mutate in place.
    pub fn create_packet(&self, destination: Position, length: u32) -> PacketRef {
        let packet = Rc::new(RefCell::new(Packet::new(destination, length, self.time_phase())));
        self.packets.borrow_mut().push(packet.clone());
        packet
    }

    /// Total number of packets ever created.
    pub fn packet_count(&self) -> usize {
        self.packets.borrow().len()
    }

    /// Snapshot counts used by the demo binary: (routed-to-exit, dropped,
    /// still in flight).
    pub fn summarize(&self) -> (usize, usize, usize) {
        let packets = self.packets.borrow();
        let mut received = 0;
        let mut dropped = 0;
        for p in packets.iter() {
            let p = p.borrow();
            if p.receive_time.is_some() {
                received += 1;
            } else if p.drop_time.is_some() {
                dropped += 1;
            }
        }
        let in_flight = packets.len() - received - dropped;
        (received, dropped, in_flight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_phase_starts_at_zero() {
        let s = Scheduler::new();
        let sys = System::new(s, 10);
        assert_eq!(sys.time_phase(), 0b00);
    }

    #[test]
    fn time_phase_cycles_gray_code() {
        let s = Scheduler::new();
        let sys = System::new(s.clone(), 10);
        s.run_until(10);
        assert_eq!(sys.time_phase(), 0b01);
        s.run_until(20);
        assert_eq!(sys.time_phase(), 0b11);
        s.run_until(30);
        assert_eq!(sys.time_phase(), 0b10);
        s.run_until(40);
        assert_eq!(sys.time_phase(), 0b00);
    }

    #[test]
    fn packet_expires_after_two_phase_advances() {
        let s = Scheduler::new();
        let sys = System::new(s.clone(), 10);

        let packet = sys.create_packet((0, 0), 1);
        assert!(!packet.borrow().has_expired(sys.time_phase()));

        s.run_until(10);
        assert!(!packet.borrow().has_expired(sys.time_phase()));

        s.run_until(20);
        assert!(packet.borrow().has_expired(sys.time_phase()));
    }

    #[test]
    fn created_packets_are_counted_in_the_registry() {
        let s = Scheduler::new();
        let sys = System::new(s, 10);
        sys.create_packet((0, 0), 1);
        sys.create_packet((1, 1), 1);
        assert_eq!(sys.packet_count(), 2);
        assert_eq!(sys.summarize(), (0, 0, 2));
    }
}
