//! A latency-only link: packets sent in are only receivable `latency` cycles
//! later, with no bandwidth limit.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use super::Link;
use crate::packet::PacketRef;
use crate::scheduler::Scheduler;

type Entry = (PacketRef, Rc<Cell<u64>>);

/// Bandwidth-unlimited fixed-latency link. A background tick (re-armed every
/// cycle, started at construction) runs in the READY phase, snapshots the
/// counters present in the buffer *at that point*, and schedules their
/// decrement via `schedule_later(.., 0)` so it lands in the INACTIVE
/// sub-phase at the end of the same cycle. Packets accepted this cycle are
/// appended straight into the buffer at delay 0 too, but since the snapshot
/// was taken before that append ran, a packet is never decremented on the
/// cycle it arrives.
pub struct DelayLineLink {
    latency: u64,
    buffer: Rc<RefCell<VecDeque<Entry>>>,
}

impl DelayLineLink {
    pub fn new(scheduler: &Scheduler, latency: u64) -> Self {
        let buffer = Rc::new(RefCell::new(VecDeque::new()));
        DelayLineLink::arm(scheduler, buffer.clone());
        DelayLineLink { latency, buffer }
    }

    fn arm(scheduler: &Scheduler, buffer: Rc<RefCell<VecDeque<Entry>>>) {
        scheduler.schedule_later(
            move |scheduler: &Scheduler| {
                let snapshot: Vec<Rc<Cell<u64>>> =
                    buffer.borrow().iter().map(|(_, counter)| counter.clone()).collect();

                scheduler.schedule_later(
                    move |_: &Scheduler| {
                        for counter in &snapshot {
                            counter.set(counter.get().saturating_sub(1));
                        }
                    },
                    0,
                );

                DelayLineLink::arm(scheduler, buffer.clone());
            },
            1,
        );
    }
}

impl Link for DelayLineLink {
    fn can_send(&self) -> bool {
        true
    }

    fn send(&mut self, scheduler: &Scheduler, packet: PacketRef) {
        let buffer = self.buffer.clone();
        let latency = self.latency;
        scheduler.schedule_later(
            move |_: &Scheduler| {
                buffer.borrow_mut().push_back((packet, Rc::new(Cell::new(latency))));
            },
            0,
        );
    }

    fn can_receive(&self) -> bool {
        self.buffer.borrow().front().is_some_and(|(_, c)| c.get() == 0)
    }

    fn receive(&mut self, _scheduler: &Scheduler) -> PacketRef {
        let (packet, counter) = self
            .buffer
            .borrow_mut()
            .pop_front()
            .expect("DelayLineLink::receive called while empty");
        assert_eq!(counter.get(), 0, "head-of-line packet had not finished its countdown");
        packet
    }

    fn peek(&self) -> Option<PacketRef> {
        match self.buffer.borrow().front() {
            Some((packet, counter)) if counter.get() == 0 => Some(packet.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Packet;

    fn make_packet(destination: crate::topology::Position) -> PacketRef {
        Rc::new(RefCell::new(Packet::new(destination, 1, 0b00)))
    }

    #[test]
    fn packet_not_receivable_before_latency_elapses() {
        let scheduler = Scheduler::new();
        let mut link = DelayLineLink::new(&scheduler, 3);
        link.send(&scheduler, make_packet((0, 0)));

        scheduler.run_until(1);
        assert!(!link.can_receive());
        scheduler.run_until(2);
        assert!(!link.can_receive());
        scheduler.run_until(3);
        assert!(link.can_receive());
        assert_eq!(link.receive(&scheduler).borrow().destination, (0, 0));
    }

    #[test]
    fn multiple_in_flight_packets_keep_fifo_order() {
        let scheduler = Scheduler::new();
        let mut link = DelayLineLink::new(&scheduler, 2);
        link.send(&scheduler, make_packet((0, 0)));
        scheduler.run_until(1);
        link.send(&scheduler, make_packet((1, 1)));

        scheduler.run_until(2);
        assert!(link.can_receive());
        assert_eq!(link.receive(&scheduler).borrow().destination, (0, 0));

        scheduler.run_until(3);
        assert!(link.can_receive());
        assert_eq!(link.receive(&scheduler).borrow().destination, (1, 1));
    }

    #[test]
    fn can_send_is_never_blocked() {
        let scheduler = Scheduler::new();
        let mut link = DelayLineLink::new(&scheduler, 1);
        for _ in 0..50 {
            assert!(link.can_send());
            link.send(&scheduler, make_packet((0, 0)));
        }
    }

    #[test]
    fn mutation_through_peek_is_visible_after_receive() {
        let scheduler = Scheduler::new();
        let mut link = DelayLineLink::new(&scheduler, 1);
        let packet = make_packet((0, 0));
        link.send(&scheduler, packet.clone());
        scheduler.run_until(1);
        link.peek().unwrap().borrow_mut().wait += 5;
        assert_eq!(link.receive(&scheduler).borrow().wait, 5);
    }
}
