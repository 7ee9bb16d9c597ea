//! Packet payload, routing metadata, and post-run trace fields.

use std::cell::RefCell;
use std::rc::Rc;

use crate::topology::Position;

/// The 2-bit time-phase cycling through the Gray-coded sequence
/// `00 -> 01 -> 11 -> 10 -> 00`.
pub type TimePhase = u8;

/// A single emergency-routed hop: the clock value and the router position at
/// which the detour happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmergencyHop {
    pub time: u64,
    pub location: Position,
}

/// The original model's payload is always a self-reference from the
/// generator that injected the packet, and nothing downstream ever reads it
/// (the generator that eventually drains the exit link discards it
/// unexamined). It carries no information the core needs to model, so it is
/// represented here as a true opaque unit rather than a generic type
/// parameter threaded through every component.
pub type Payload = ();

/// A packet in flight through the mesh.
///
/// Packets are never removed from the system's packet registry once
/// created — this struct is the append-only trace record as well as the
/// live, mutable state a router mutates while the packet is in transit.
#[derive(Debug, Clone)]
pub struct Packet {
    pub payload: Payload,
    pub destination: Position,
    /// Length in bits.
    pub length: u32,
    /// The time-phase in effect when this packet was created.
    pub time_phase: TimePhase,

    /// Whether this packet is currently being emergency-routed.
    pub emergency: bool,
    /// Cycles this packet has been waiting at the head of its current link.
    pub wait: u32,
    /// Number of hops taken so far.
    pub distance: u32,

    pub source: Option<Position>,
    pub send_time: Option<u64>,
    pub receive_time: Option<u64>,
    pub drop_time: Option<u64>,
    pub drop_location: Option<Position>,
    pub emergency_trace: Vec<EmergencyHop>,
}

impl Packet {
    pub fn new(destination: Position, length: u32, time_phase: TimePhase) -> Self {
        Packet {
            payload: (),
            destination,
            length,
            time_phase,
            emergency: false,
            wait: 0,
            distance: 0,
            source: None,
            send_time: None,
            receive_time: None,
            drop_time: None,
            drop_location: None,
            emergency_trace: Vec::new(),
        }
    }

    /// A packet has expired once two time-phase advances have elapsed since
    /// its birth: the Gray code guarantees `birth XOR current == 0b11`
    /// exactly at that point (one advance always differs by a single bit).
    pub fn has_expired(&self, current_time_phase: TimePhase) -> bool {
        (self.time_phase ^ current_time_phase) == 0b11
    }
}

/// Packets are shared rather than copied between the system's packet
/// registry, the link they currently sit in, and the router that is about to
/// forward them — exactly one live `Packet` per in-flight packet, the same
/// way the original aliases a single packet object across all of these.
/// Mutating a field (e.g. `wait`) through any held `PacketRef` is visible to
/// everyone else holding it.
pub type PacketRef = Rc<RefCell<Packet>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_packet_has_not_expired() {
        let p: Packet = Packet::new((0, 0), 40, 0b00);
        assert!(!p.has_expired(0b00));
        assert!(!p.has_expired(0b01));
    }

    #[test]
    fn expires_after_two_phase_advances() {
        let p: Packet = Packet::new((0, 0), 40, 0b00);
        // Gray sequence: 00 -> 01 -> 11 -> 10 -> 00
        assert!(!p.has_expired(0b01)); // one advance
        assert!(p.has_expired(0b11)); // two advances
    }

    #[test]
    fn expiration_law_for_every_birth_phase() {
        let sequence = [0b00u8, 0b01, 0b11, 0b10];
        for &birth in &sequence {
            let p: Packet = Packet::new((0, 0), 40, birth);
            let expired_at = birth ^ 0b11;
            for &phase in &sequence {
                assert_eq!(p.has_expired(phase), phase == expired_at);
            }
        }
    }
}
