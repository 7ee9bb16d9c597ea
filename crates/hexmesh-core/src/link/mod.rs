//! The `Link` abstraction and its variants.
//!
//! A `Link` is the point-to-point connection between two router ports (or a
//! router port and a chip's local injection/exit point). All four variants
//! — [`DeadLink`], [`silistix::SilistixLink`], [`buffer::BufferLink`], and
//! [`delay_line::DelayLineLink`] — plus the aggregated [`sata::SATALink`]
//! share this one contract, so a router never needs to know which kind of
//! physical link it is driving.

pub mod buffer;
pub mod delay_line;
pub mod sata;
pub mod silistix;

use std::cell::RefCell;
use std::rc::Rc;

use crate::packet::PacketRef;
use crate::scheduler::Scheduler;

/// A handle to any link implementation, shared between the two routers (or
/// router and chip-local endpoint) it connects.
pub type LinkHandle = Rc<RefCell<dyn Link>>;

/// The send/receive contract every link variant implements.
///
/// `can_send`/`can_receive` are pure capacity checks a router uses before
/// committing to `send`/`receive` — calling `send` when `can_send` is false,
/// or `receive` when `can_receive` is false, is a caller error.
pub trait Link {
    /// Whether a packet can be accepted into this link right now.
    fn can_send(&self) -> bool;

    /// Hand a packet into the link. `scheduler` lets the link arm whatever
    /// internal timers it needs (handshake timing, delay-line countdown).
    fn send(&mut self, scheduler: &Scheduler, packet: PacketRef);

    /// Whether a packet is available to take off the far end right now.
    fn can_receive(&self) -> bool;

    /// Remove and return the packet at the head of the link. `scheduler`
    /// lets handshake-based links (e.g. [`silistix::SilistixLink`]) arm the
    /// acknowledgement timer this triggers.
    fn receive(&mut self, scheduler: &Scheduler) -> PacketRef;

    /// The head-of-line packet, without removing it. Cloning a `PacketRef`
    /// is a cheap `Rc` bump — the clone still refers to the one shared
    /// packet, so mutating fields through it (e.g. bumping `wait`) is
    /// visible to whoever else is holding the same packet.
    fn peek(&self) -> Option<PacketRef>;
}

/// A link with nothing attached — the initial state of every chip's six
/// mesh-facing ports before board/torus assembly wires them up. Always
/// refuses to send or receive.
#[derive(Debug, Default)]
pub struct DeadLink;

impl Link for DeadLink {
    fn can_send(&self) -> bool {
        false
    }

    fn send(&mut self, _scheduler: &Scheduler, _packet: PacketRef) {
        panic!("attempted to send on a DeadLink");
    }

    fn can_receive(&self) -> bool {
        false
    }

    fn receive(&mut self, _scheduler: &Scheduler) -> PacketRef {
        panic!("attempted to receive on a DeadLink");
    }

    fn peek(&self) -> Option<PacketRef> {
        None
    }
}

/// Wrap any link value in the shared handle type links are passed around as.
pub fn handle(link: impl Link + 'static) -> LinkHandle {
    Rc::new(RefCell::new(link))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Packet;
    use std::cell::RefCell;

    #[test]
    fn dead_link_never_sends_or_receives() {
        let link = DeadLink;
        assert!(!link.can_send());
        assert!(!link.can_receive());
        assert!(link.peek().is_none());
    }

    #[test]
    #[should_panic(expected = "DeadLink")]
    fn dead_link_panics_on_send() {
        let scheduler = Scheduler::new();
        let mut link = DeadLink;
        let packet = Rc::new(RefCell::new(Packet::new((0, 0), 1, 0b00)));
        link.send(&scheduler, packet);
    }
}
