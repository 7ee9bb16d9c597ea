//! Per-cycle forwarding state machine: packet expiry, direction-order
//! routing, and emergency re-routing around a blocked output.

use std::cell::RefCell;
use std::rc::Rc;

use crate::clock::System;
use crate::link::LinkHandle;
use crate::packet::{EmergencyHop, PacketRef};
use crate::scheduler::Scheduler;
use crate::topology::{get_path, Direction, Position, Vector3};

/// Where a routing decision sends a packet: one of the six mesh-facing
/// output links, or the chip-local exit link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Output(Direction),
    Exit,
}

/// Router-side counters, mirroring the original's counter dictionary with
/// named fields instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterCounters {
    pub timestamp_packet_timeout: u64,
    pub router_packet_timeout: u64,
    pub packets_routed: u64,
    pub packet_emergency_routed: u64,
    pub router_cycles: u64,
    pub router_idle_cycles: u64,
    pub router_blocked_cycles: u64,
}

/// Forwards packets between a chip's injection link, exit link, and its six
/// mesh-facing in/out link pairs, once per `period` scheduler ticks.
pub struct Router {
    system: Rc<System>,
    period: u64,
    wait_before_emergency: u32,
    wait_before_drop: u32,
    mesh_position: Position,
    mesh_dimensions: (i64, i64),
    injection_link: LinkHandle,
    exit_link: LinkHandle,
    in_links: [LinkHandle; 6],
    out_links: [LinkHandle; 6],
    first_link: usize,
    counters: RouterCounters,
}

impl Router {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scheduler: &Scheduler,
        system: Rc<System>,
        period: u64,
        wait_before_emergency: u32,
        wait_before_drop: u32,
        mesh_position: Position,
        mesh_dimensions: (i64, i64),
        injection_link: LinkHandle,
        exit_link: LinkHandle,
        in_links: [LinkHandle; 6],
        out_links: [LinkHandle; 6],
    ) -> Rc<RefCell<Self>> {
        let router = Rc::new(RefCell::new(Router {
            system,
            period,
            wait_before_emergency,
            wait_before_drop,
            mesh_position,
            mesh_dimensions,
            injection_link,
            exit_link,
            in_links,
            out_links,
            first_link: 0,
            counters: RouterCounters::default(),
        }));
        Router::arm(scheduler, router.clone());
        router
    }

    fn arm(scheduler: &Scheduler, router: Rc<RefCell<Self>>) {
        let period = router.borrow().period;
        scheduler.schedule_later(
            move |scheduler: &Scheduler| {
                router.borrow_mut().tick(scheduler);
                Router::arm(scheduler, router.clone());
            },
            period,
        );
    }

    pub fn set_mesh_position(&mut self, position: Position) {
        self.mesh_position = position;
    }

    pub fn set_mesh_dimensions(&mut self, dimensions: (i64, i64)) {
        self.mesh_dimensions = dimensions;
    }

    pub fn counters(&self) -> RouterCounters {
        self.counters
    }

    fn input_link(&self, idx: usize) -> &LinkHandle {
        if idx < 6 {
            &self.in_links[idx]
        } else {
            &self.injection_link
        }
    }

    fn target_link(&self, target: Target) -> &LinkHandle {
        match target {
            Target::Output(d) => &self.out_links[d.index()],
            Target::Exit => &self.exit_link,
        }
    }

    fn tick(&mut self, scheduler: &Scheduler) {
        let current_time_phase = self.system.time_phase();
        self.expire(scheduler, current_time_phase);
        self.route(scheduler);
    }

    /// Drains each of the 7 inputs of expired/timed-out head-of-line
    /// packets, stopping at the first packet on a link that is neither.
    fn expire(&mut self, scheduler: &Scheduler, current_time_phase: u8) {
        for idx in 0..7 {
            loop {
                let link = self.input_link(idx);
                let Some(packet) = link.borrow().peek() else {
                    break;
                };
                let expired = packet.borrow().has_expired(current_time_phase);
                let timed_out = packet.borrow().wait > self.wait_before_drop;
                if !expired && !timed_out {
                    break;
                }

                let dropped = self.input_link(idx).borrow_mut().receive(scheduler);
                {
                    let mut dropped = dropped.borrow_mut();
                    dropped.drop_time = Some(scheduler.clock());
                    dropped.drop_location = Some(self.mesh_position);
                }
                if expired {
                    self.counters.timestamp_packet_timeout += 1;
                    tracing::debug!(position = ?self.mesh_position, input = idx, "packet expired");
                } else {
                    self.counters.router_packet_timeout += 1;
                    tracing::warn!(position = ?self.mesh_position, input = idx, "packet dropped after wait_before_drop exceeded");
                }
            }
        }
    }

    /// Services the 7 inputs in round-robin order starting at `first_link`,
    /// advancing `first_link` exactly once regardless of outcome.
    fn route(&mut self, scheduler: &Scheduler) {
        let order: [usize; 7] = std::array::from_fn(|i| (self.first_link + i) % 7);
        self.first_link = (self.first_link + 1) % 7;

        let mut had_packet = false;
        let mut forwarded = false;

        for idx in order {
            let Some(packet) = self.input_link(idx).borrow().peek() else {
                continue;
            };
            had_packet = true;
            packet.borrow_mut().wait += 1;

            let in_dir = if idx < 6 { Some(Direction::from_index(idx)) } else { None };
            let (primary, emergency) = self.packet_destination(&packet, in_dir);

            if self.target_link(primary).borrow().can_send() {
                let packet = self.input_link(idx).borrow_mut().receive(scheduler);
                {
                    let mut p = packet.borrow_mut();
                    p.emergency = false;
                    p.wait = 0;
                    p.distance += 1;
                }
                self.target_link(primary).borrow_mut().send(scheduler, packet);
                self.counters.packets_routed += 1;
                forwarded = true;
                continue;
            }

            let wait = packet.borrow().wait;
            if wait > self.wait_before_emergency
                && emergency != primary
                && self.target_link(emergency).borrow().can_send()
            {
                let packet = self.input_link(idx).borrow_mut().receive(scheduler);
                {
                    let mut p = packet.borrow_mut();
                    p.emergency = true;
                    p.wait = 0;
                    p.distance += 1;
                    p.emergency_trace.push(EmergencyHop {
                        time: scheduler.clock(),
                        location: self.mesh_position,
                    });
                }
                self.target_link(emergency).borrow_mut().send(scheduler, packet);
                self.counters.packet_emergency_routed += 1;
                forwarded = true;
                tracing::debug!(position = ?self.mesh_position, input = idx, "packet emergency-routed");
            }
        }

        self.counters.router_cycles += 1;
        if !had_packet {
            self.counters.router_idle_cycles += 1;
        } else if !forwarded {
            self.counters.router_blocked_cycles += 1;
        }
    }

    fn packet_destination(&self, packet: &PacketRef, in_dir: Option<Direction>) -> (Target, Target) {
        let p = packet.borrow();
        if p.emergency {
            let in_dir = in_dir.expect("an emergency-flagged packet must arrive on a real link");
            let target = Target::Output(in_dir.next_ccw());
            return (target, target);
        }
        if p.destination == self.mesh_position {
            return (Target::Exit, Target::Exit);
        }
        let path = get_path(self.mesh_position, p.destination, Some(self.mesh_dimensions));
        let primary = direction_from_shortest_path(path);
        (Target::Output(primary), Target::Output(primary.next_ccw()))
    }
}

/// Priority order E/W, then N/S, then SW/NE — the first non-zero axis wins.
fn direction_from_shortest_path(v: Vector3) -> Direction {
    if v.0 != 0 {
        if v.0 > 0 { Direction::East } else { Direction::West }
    } else if v.1 != 0 {
        if v.1 > 0 { Direction::North } else { Direction::South }
    } else if v.2 != 0 {
        if v.2 > 0 { Direction::SouthWest } else { Direction::NorthEast }
    } else {
        // A zero vector implies `destination == mesh_position`, already
        // handled before this is called; reaching here is a logic error.
        panic!("direction_from_shortest_path called on a zero vector");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::buffer::BufferLink;
    use crate::link::handle;
    use crate::packet::Packet;

    #[allow(clippy::type_complexity)]
    fn make_router(
        mesh_position: Position,
        mesh_dimensions: (i64, i64),
        wait_before_emergency: u32,
        wait_before_drop: u32,
    ) -> (
        Rc<Scheduler>,
        Rc<RefCell<Router>>,
        LinkHandle,
        LinkHandle,
        [LinkHandle; 6],
        [LinkHandle; 6],
    ) {
        make_router_with_out_capacity(mesh_position, mesh_dimensions, wait_before_emergency, wait_before_drop, None)
    }

    #[allow(clippy::type_complexity)]
    fn make_router_with_out_capacity(
        mesh_position: Position,
        mesh_dimensions: (i64, i64),
        wait_before_emergency: u32,
        wait_before_drop: u32,
        out_capacity: Option<usize>,
    ) -> (
        Rc<Scheduler>,
        Rc<RefCell<Router>>,
        LinkHandle,
        LinkHandle,
        [LinkHandle; 6],
        [LinkHandle; 6],
    ) {
        let scheduler = Scheduler::new();
        let system = System::new(scheduler.clone(), 1000);
        let injection = handle(BufferLink::unbounded());
        let exit = handle(BufferLink::unbounded());
        let in_links: [LinkHandle; 6] = std::array::from_fn(|_| handle(BufferLink::unbounded()));
        let out_links: [LinkHandle; 6] =
            std::array::from_fn(|_| handle(BufferLink::new(out_capacity)));

        let router = Router::new(
            &scheduler,
            system,
            1,
            wait_before_emergency,
            wait_before_drop,
            mesh_position,
            mesh_dimensions,
            injection.clone(),
            exit.clone(),
            in_links.clone(),
            out_links.clone(),
        );

        (scheduler, router, injection, exit, in_links, out_links)
    }

    fn make_packet(destination: Position, length: u32) -> PacketRef {
        Rc::new(RefCell::new(Packet::new(destination, length, 0b00)))
    }

    #[test]
    fn loopback_packet_reaches_exit_in_one_cycle() {
        let (scheduler, _router, injection, exit, _in_links, _out_links) =
            make_router((1, 1), (16, 16), 4, 8);
        let packet = make_packet((1, 1), 1);
        injection.borrow_mut().send(&scheduler, packet.clone());

        scheduler.run_until(1);

        assert!(exit.borrow().can_receive());
        let received = exit.borrow_mut().receive(&scheduler);
        assert_eq!(received.borrow().distance, 1);
        assert_eq!(received.borrow().wait, 0);
        assert!(!received.borrow().emergency);
    }

    #[test]
    fn direction_order_prefers_east_west_then_north_south_then_diagonal() {
        assert_eq!(direction_from_shortest_path(Vector3(3, -1, 2)), Direction::East);
        assert_eq!(direction_from_shortest_path(Vector3(0, -1, 2)), Direction::South);
        assert_eq!(direction_from_shortest_path(Vector3(0, 0, -4)), Direction::NorthEast);
        assert_eq!(direction_from_shortest_path(Vector3(0, 0, 4)), Direction::SouthWest);
    }

    #[test]
    fn packet_routes_onto_the_expected_output_direction() {
        let (scheduler, _router, injection, _exit, _in_links, out_links) =
            make_router((0, 0), (16, 16), 4, 100);
        let packet = make_packet((5, 0), 1);
        injection.borrow_mut().send(&scheduler, packet);

        scheduler.run_until(1);

        assert!(out_links[Direction::East.index()].borrow().can_receive());
    }

    #[test]
    fn packet_dropped_after_wait_before_drop_exceeded() {
        // All out-links have zero capacity, so no output can ever accept —
        // the packet is stuck at the injection link until it times out.
        let (scheduler, _router, injection, _exit, _in_links, _out_links) =
            make_router_with_out_capacity((0, 0), (16, 16), 100, 2, Some(0));

        let packet = make_packet((5, 0), 1);
        injection.borrow_mut().send(&scheduler, packet.clone());

        // cycle 1: wait -> 1 (1 > 2 is false)
        scheduler.run_until(1);
        assert_eq!(packet.borrow().wait, 1);
        // cycle 2: wait -> 2 (2 > 2 is false)
        scheduler.run_until(2);
        assert_eq!(packet.borrow().wait, 2);
        // cycle 3: routing bumps wait to 3 before expiry can see it; expiry
        // at the *start* of cycle 4 observes wait=3 > wait_before_drop=2.
        scheduler.run_until(3);
        assert_eq!(packet.borrow().wait, 3);
        scheduler.run_until(4);
        assert!(packet.borrow().drop_time.is_some());
        assert_eq!(packet.borrow().drop_location, Some((0, 0)));
    }

    #[test]
    fn emergency_route_engages_when_primary_output_is_blocked() {
        let scheduler = Scheduler::new();
        let system = System::new(scheduler.clone(), 1000);
        let injection = handle(BufferLink::unbounded());
        let exit = handle(BufferLink::unbounded());
        let in_links: [LinkHandle; 6] = std::array::from_fn(|_| handle(BufferLink::unbounded()));
        let mut out_links: [LinkHandle; 6] =
            std::array::from_fn(|_| handle(BufferLink::unbounded()));
        // East (the primary output for a due-east destination) is saturated;
        // its counter-clockwise neighbour (North-East) stays open.
        out_links[Direction::East.index()] = handle(BufferLink::new(Some(0)));

        let _router = Router::new(
            &scheduler,
            system,
            1,
            0,
            1000,
            (0, 0),
            (16, 16),
            injection.clone(),
            exit,
            in_links,
            out_links.clone(),
        );

        let packet = make_packet((5, 0), 1);
        injection.borrow_mut().send(&scheduler, packet.clone());

        scheduler.run_until(1);
        assert!(packet.borrow().emergency);
        assert_eq!(packet.borrow().emergency_trace.len(), 1);
        let north_east = Direction::East.next_ccw();
        assert!(out_links[north_east.index()].borrow().can_receive());
    }
}
