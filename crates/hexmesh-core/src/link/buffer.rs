//! A zero-latency FIFO buffer link.

use std::collections::VecDeque;

use super::Link;
use crate::packet::PacketRef;
use crate::scheduler::Scheduler;

/// Queues packets up for later retrieval with no extra latency — a packet
/// sent in a cycle is visible to `receive`/`peek` in that very same cycle.
pub struct BufferLink {
    /// `None` means unlimited.
    capacity: Option<usize>,
    queue: VecDeque<PacketRef>,
}

impl BufferLink {
    pub fn new(capacity: Option<usize>) -> Self {
        BufferLink {
            capacity,
            queue: VecDeque::new(),
        }
    }

    pub fn unbounded() -> Self {
        BufferLink::new(None)
    }
}

impl Link for BufferLink {
    fn can_send(&self) -> bool {
        self.capacity.map_or(true, |cap| self.queue.len() < cap)
    }

    fn send(&mut self, _scheduler: &Scheduler, packet: PacketRef) {
        assert!(self.can_send(), "BufferLink::send called while full");
        self.queue.push_back(packet);
    }

    fn can_receive(&self) -> bool {
        !self.queue.is_empty()
    }

    fn receive(&mut self, _scheduler: &Scheduler) -> PacketRef {
        self.queue
            .pop_front()
            .expect("BufferLink::receive called while empty")
    }

    fn peek(&self) -> Option<PacketRef> {
        self.queue.front().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Packet;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn make_packet(destination: crate::topology::Position) -> PacketRef {
        Rc::new(RefCell::new(Packet::new(destination, 1, 0b00)))
    }

    #[test]
    fn unbounded_buffer_never_fills() {
        let scheduler = Scheduler::new();
        let mut link = BufferLink::unbounded();
        for _ in 0..100 {
            link.send(&scheduler, make_packet((0, 0)));
        }
        assert!(link.can_send());
    }

    #[test]
    fn bounded_buffer_blocks_once_full() {
        let scheduler = Scheduler::new();
        let mut link = BufferLink::new(Some(2));
        link.send(&scheduler, make_packet((0, 0)));
        link.send(&scheduler, make_packet((1, 1)));
        assert!(!link.can_send());

        let p = link.receive(&scheduler);
        assert_eq!(p.borrow().destination, (0, 0));
        assert!(link.can_send());
    }

    #[test]
    fn send_and_receive_same_cycle() {
        let scheduler = Scheduler::new();
        let mut link = BufferLink::unbounded();
        link.send(&scheduler, make_packet((2, 2)));
        assert!(link.can_receive());
        assert_eq!(link.receive(&scheduler).borrow().destination, (2, 2));
    }

    #[test]
    fn fifo_ordering() {
        let scheduler = Scheduler::new();
        let mut link = BufferLink::unbounded();
        link.send(&scheduler, make_packet((0, 0)));
        link.send(&scheduler, make_packet((1, 1)));
        assert_eq!(link.receive(&scheduler).borrow().destination, (0, 0));
        assert_eq!(link.receive(&scheduler).borrow().destination, (1, 1));
    }

    #[test]
    fn peek_shares_the_same_packet_as_receive() {
        let scheduler = Scheduler::new();
        let mut link = BufferLink::unbounded();
        let packet = make_packet((0, 0));
        link.send(&scheduler, packet.clone());
        packet.borrow_mut().wait += 3;
        assert_eq!(link.peek().unwrap().borrow().wait, 3);
    }
}
