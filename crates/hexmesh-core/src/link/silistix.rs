//! Asynchronous handshake link modelling a real Silistix-style serial link.

use std::cell::RefCell;
use std::rc::Rc;

use super::Link;
use crate::packet::PacketRef;
use crate::scheduler::Scheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ready,
    Sending,
    Stable,
    Acking,
}

/// Sends and acknowledges every packet; a packet is received before it is
/// acknowledged, so the sender only frees up once the ack round-trip
/// completes.
///
/// `state` and `cur_packet` are wrapped in their own `Rc<RefCell<_>>` (rather
/// than being plain fields) so the scheduler tasks this link arms on
/// `send`/`receive` can mutate them later without needing a handle back to
/// the outer `Link` trait object.
pub struct SilistixLink {
    send_cycles: u64,
    ack_cycles: u64,
    state: Rc<RefCell<State>>,
    cur_packet: Rc<RefCell<Option<PacketRef>>>,
}

impl SilistixLink {
    /// `send_cycles` is the time for data to arrive at the receiver per unit
    /// of packet length; `ack_cycles` is the time for the link to become
    /// ready again after an ack.
    pub fn new(send_cycles: u64, ack_cycles: u64) -> Self {
        SilistixLink {
            send_cycles,
            ack_cycles,
            state: Rc::new(RefCell::new(State::Ready)),
            cur_packet: Rc::new(RefCell::new(None)),
        }
    }
}

impl Link for SilistixLink {
    fn can_send(&self) -> bool {
        *self.state.borrow() == State::Ready
    }

    fn send(&mut self, scheduler: &Scheduler, packet: PacketRef) {
        assert!(self.can_send(), "SilistixLink::send called while not READY");
        let length = packet.borrow().length;
        assert!(length >= 1, "packet length must be at least 1");

        let delay = self.send_cycles * length as u64 + self.ack_cycles * (length as u64 - 1);

        *self.cur_packet.borrow_mut() = Some(packet);
        *self.state.borrow_mut() = State::Sending;

        let state = self.state.clone();
        scheduler.schedule_later(
            move |_: &Scheduler| {
                *state.borrow_mut() = State::Stable;
            },
            delay,
        );
    }

    fn can_receive(&self) -> bool {
        *self.state.borrow() == State::Stable
    }

    fn receive(&mut self, scheduler: &Scheduler) -> PacketRef {
        assert!(self.can_receive(), "SilistixLink::receive called while not STABLE");

        *self.state.borrow_mut() = State::Acking;
        let packet = self
            .cur_packet
            .borrow_mut()
            .take()
            .expect("STABLE implies cur_packet is Some");

        let state = self.state.clone();
        scheduler.schedule_later(
            move |_: &Scheduler| {
                *state.borrow_mut() = State::Ready;
            },
            self.ack_cycles,
        );

        packet
    }

    fn peek(&self) -> Option<PacketRef> {
        if *self.state.borrow() == State::Stable {
            self.cur_packet.borrow().clone()
        } else {
            None
        }
    }
}
