//! Aggregated, multiplexed link modelling the inter-board S-ATA connection.
//!
//! The real device is a set of incoming [`SilistixLink`]s into an FPGA that
//! queues packets and sends them multiplexed over a high-bandwidth,
//! high-latency physical link to another board's FPGA, which demultiplexes
//! them back out onto per-channel [`SilistixLink`]s. This link is
//! unidirectional — a real bidirectional connection is modelled as a pair of
//! these.

use std::cell::RefCell;
use std::rc::Rc;

use super::delay_line::DelayLineLink;
use super::silistix::SilistixLink;
use super::Link;
use crate::packet::PacketRef;
use crate::scheduler::Scheduler;

struct Channel {
    in_link: SilistixLink,
    out_link: SilistixLink,
    delay_link: DelayLineLink,
    credit: i64,
}

/// Shared inner state, since both the `SATALink` itself and every
/// [`SataChannel`] proxy handed out via [`SATALink::channel`] need to reach
/// the same channel set.
struct Inner {
    channels: Vec<RefCell<Channel>>,
    sata_buffer_length: i64,
    last_input: RefCell<usize>,
    last_output: RefCell<usize>,
}

pub struct SATALink {
    inner: Rc<Inner>,
}

impl SATALink {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scheduler: &Scheduler,
        num_channels: usize,
        sata_accept_period: u64,
        sata_buffer_length: i64,
        sata_latency: u64,
        silistix_send_cycles: u64,
        silistix_ack_cycles: u64,
    ) -> Self {
        assert!(num_channels >= 1, "SATALink needs at least one channel");

        let channels = (0..num_channels)
            .map(|_| {
                RefCell::new(Channel {
                    in_link: SilistixLink::new(silistix_send_cycles, silistix_ack_cycles),
                    out_link: SilistixLink::new(silistix_send_cycles, silistix_ack_cycles),
                    delay_link: DelayLineLink::new(scheduler, sata_latency),
                    credit: sata_buffer_length,
                })
            })
            .collect();

        let inner = Rc::new(Inner {
            channels,
            sata_buffer_length,
            last_input: RefCell::new(0),
            last_output: RefCell::new(0),
        });

        SATALink::arm(scheduler, inner.clone(), sata_accept_period);

        SATALink { inner }
    }

    fn arm(scheduler: &Scheduler, inner: Rc<Inner>, accept_period: u64) {
        scheduler.schedule_later(
            move |scheduler: &Scheduler| {
                SATALink::handler(scheduler, &inner);
                SATALink::arm(scheduler, inner.clone(), accept_period);
            },
            accept_period,
        );
    }

    /// Services at most one outgoing and one incoming channel per call,
    /// round-robin, starting just after the channel serviced last time.
    fn handler(scheduler: &Scheduler, inner: &Rc<Inner>) {
        let num_channels = inner.channels.len();

        let last_output = *inner.last_output.borrow();
        for offset in 1..=num_channels {
            let idx = (last_output + offset) % num_channels;
            let mut channel = inner.channels[idx].borrow_mut();
            if channel.delay_link.can_receive() && channel.out_link.can_send() {
                let packet = channel.delay_link.receive(scheduler);
                channel.out_link.send(scheduler, packet);
                channel.credit += 1;
                drop(channel);
                *inner.last_output.borrow_mut() = idx;
                break;
            }
        }

        let last_input = *inner.last_input.borrow();
        for offset in 1..=num_channels {
            let idx = (last_input + offset) % num_channels;
            let mut channel = inner.channels[idx].borrow_mut();
            if channel.credit >= 0 && channel.in_link.can_receive() {
                assert!(channel.delay_link.can_send());
                let packet = channel.in_link.receive(scheduler);
                channel.delay_link.send(scheduler, packet);
                channel.credit -= 1;
                drop(channel);
                *inner.last_input.borrow_mut() = idx;
                break;
            }
        }
    }

    /// A link-shaped handle onto a single channel of this aggregated link.
    pub fn channel(&self, channel_num: usize) -> SataChannel {
        assert!(
            channel_num < self.inner.channels.len(),
            "channel {channel_num} out of range"
        );
        SataChannel {
            inner: self.inner.clone(),
            channel_num,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.inner.channels.len()
    }

    pub fn buffer_capacity(&self) -> i64 {
        self.inner.sata_buffer_length
    }
}

/// Per-channel view onto a [`SATALink`], implementing [`Link`] so routers can
/// treat a single S-ATA channel exactly like any other link.
pub struct SataChannel {
    inner: Rc<Inner>,
    channel_num: usize,
}

impl Link for SataChannel {
    fn can_send(&self) -> bool {
        self.inner.channels[self.channel_num].borrow().in_link.can_send()
    }

    fn send(&mut self, scheduler: &Scheduler, packet: PacketRef) {
        self.inner.channels[self.channel_num]
            .borrow_mut()
            .in_link
            .send(scheduler, packet);
    }

    fn can_receive(&self) -> bool {
        self.inner.channels[self.channel_num].borrow().out_link.can_receive()
    }

    fn receive(&mut self, scheduler: &Scheduler) -> PacketRef {
        self.inner.channels[self.channel_num]
            .borrow_mut()
            .out_link
            .receive(scheduler)
    }

    fn peek(&self) -> Option<PacketRef> {
        self.inner.channels[self.channel_num].borrow().out_link.peek()
    }
}
