//! Verilog-style two-queue discrete-event scheduler with delta cycles.
//!
//! Every active component in the network (link state transitions, router
//! ticks, generator ticks, the system's time-phase advance) re-arms itself by
//! calling back into the scheduler. There is no other suspension mechanism:
//! the scheduler's inner loop *is* the simulation's control flow.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::rc::Rc;

/// A unit of scheduled work. Implementors close over whatever component
/// state they need to observe and mutate — typically an `Rc<RefCell<_>>`
/// handle to a link, router, or generator — and re-arm themselves by calling
/// back into the `Scheduler` they're passed.
pub trait Task {
    fn run(&mut self, scheduler: &Scheduler);
}

/// Adapts any `FnMut(&Scheduler)` closure into a `Task`, for callers that
/// don't need a named type.
impl<F: FnMut(&Scheduler)> Task for F {
    fn run(&mut self, scheduler: &Scheduler) {
        self(scheduler)
    }
}

type BoxedTask = Box<dyn Task>;

/// The three-queue delta-cycle discrete-event scheduler.
///
/// `ready` and `postponed` are interior-mutable so that a `&Scheduler`
/// (rather than `&mut Scheduler`) can be threaded into running tasks, letting
/// a task re-schedule itself (or other tasks) without needing unique access
/// to the scheduler it's currently being driven by.
pub struct Scheduler {
    clock: RefCell<u64>,
    ready: RefCell<VecDeque<BoxedTask>>,
    inactive: RefCell<VecDeque<BoxedTask>>,
    postponed: RefCell<BTreeMap<u64, Vec<BoxedTask>>>,
}

impl Scheduler {
    pub fn new() -> Rc<Self> {
        Rc::new(Scheduler {
            clock: RefCell::new(0),
            ready: RefCell::new(VecDeque::new()),
            inactive: RefCell::new(VecDeque::new()),
            postponed: RefCell::new(BTreeMap::new()),
        })
    }

    /// Current simulated clock value.
    pub fn clock(&self) -> u64 {
        *self.clock.borrow()
    }

    /// Schedule a task to run as soon as possible, in the current delta
    /// cycle's READY phase.
    pub fn schedule_now(&self, task: impl Task + 'static) {
        self.ready.borrow_mut().push_back(Box::new(task));
    }

    /// Schedule a task `delay` ticks from now. `delay == 0` means "run in the
    /// INACTIVE sub-phase of the current instant, after everything currently
    /// READY" — the delta-cycle mechanism. `delay` must be non-negative.
    pub fn schedule_later(&self, task: impl Task + 'static, delay: u64) {
        if delay == 0 {
            self.inactive.borrow_mut().push_back(Box::new(task));
        } else {
            let at = self.clock() + delay;
            self.postponed
                .borrow_mut()
                .entry(at)
                .or_default()
                .push(Box::new(task));
        }
    }

    fn queues_empty(&self) -> bool {
        self.ready.borrow().is_empty() && self.inactive.borrow().is_empty()
    }

    /// Drive the simulation, calling `on_tick` with the clock value after
    /// every task runs (the scheduler's "clock stream"). Returns once READY,
    /// INACTIVE, and POSTPONED are all empty.
    ///
    /// This is the owning-handle equivalent of the original's lazy generator
    /// `run()`: rather than returning an iterator (which would need to hold a
    /// live borrow across task execution that itself schedules further
    /// tasks), the loop is driven here and observers are pushed a clock value
    /// per step via the callback.
    pub fn run(self: &Rc<Self>, mut on_tick: impl FnMut(u64)) {
        self.run_while(|clock| {
            on_tick(clock);
            true
        });
    }

    /// Drive the simulation like [`Scheduler::run`], but stop as soon as
    /// `keep_going` returns `false` for a clock value (it is still called
    /// once more, with that final value, before stopping). Returns early if
    /// the queues drain naturally, same as `run`.
    pub fn run_while(self: &Rc<Self>, mut keep_going: impl FnMut(u64) -> bool) {
        'outer: loop {
            while !self.queues_empty() {
                loop {
                    // The pop happens in its own statement so the `RefMut`
                    // temporary is dropped before `task.run` — which may
                    // itself re-borrow `ready`/`inactive` to reschedule.
                    let next = self.ready.borrow_mut().pop_front();
                    match next {
                        Some(mut task) => {
                            task.run(self);
                            if !keep_going(self.clock()) {
                                break 'outer;
                            }
                        }
                        None => break,
                    }
                }
                // READY is empty: promote INACTIVE, unless a task we just ran
                // re-populated READY (checked by looping the outer `while`).
                let drained: Vec<BoxedTask> = self.inactive.borrow_mut().drain(..).collect();
                if !drained.is_empty() {
                    self.ready.borrow_mut().extend(drained);
                }
            }

            let next_key = {
                let postponed = self.postponed.borrow();
                postponed.keys().next().copied()
            };
            match next_key {
                Some(at) => {
                    *self.clock.borrow_mut() = at;
                    let tasks = self.postponed.borrow_mut().remove(&at).unwrap();
                    self.ready.borrow_mut().extend(tasks);
                    tracing::trace!(clock = at, "scheduler clock advance");
                }
                None => return,
            }
        }
    }

    /// Run every task scheduled at or before `target`, then stop — without
    /// touching anything postponed for a later clock value. Used by drivers
    /// that want a fixed cycle budget rather than running every queued task
    /// to exhaustion.
    ///
    /// This is deliberately its own loop rather than a call through
    /// [`Scheduler::run_while`]: `run_while`'s `keep_going` is checked after
    /// every individual READY-queue task, which would let it stop
    /// mid-delta-cycle (some but not all of the simultaneous events at
    /// `target` having run). `run_until` instead always drains READY and
    /// INACTIVE to exhaustion for a clock value before deciding whether to
    /// advance to the next one, so every event timestamped `target` is
    /// guaranteed to have run by the time this returns.
    pub fn run_until(self: &Rc<Self>, target: u64) {
        loop {
            while !self.queues_empty() {
                loop {
                    let next = self.ready.borrow_mut().pop_front();
                    match next {
                        Some(mut task) => task.run(self),
                        None => break,
                    }
                }
                let drained: Vec<BoxedTask> = self.inactive.borrow_mut().drain(..).collect();
                if !drained.is_empty() {
                    self.ready.borrow_mut().extend(drained);
                }
            }

            let next_key = {
                let postponed = self.postponed.borrow();
                postponed.keys().next().copied()
            };
            match next_key {
                Some(at) if at <= target => {
                    *self.clock.borrow_mut() = at;
                    let tasks = self.postponed.borrow_mut().remove(&at).unwrap();
                    self.ready.borrow_mut().extend(tasks);
                    tracing::trace!(clock = at, "scheduler clock advance");
                }
                _ => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scheduler_yields_nothing() {
        let s = Scheduler::new();
        let mut ticks = Vec::new();
        s.run(|c| ticks.push(c));
        assert!(ticks.is_empty());
    }

    #[test]
    fn ready_inactive_postponed_ordering() {
        let s = Scheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let order_a = order.clone();
        s.schedule_now(move |_: &Scheduler| order_a.borrow_mut().push('a'));

        let order_b = order.clone();
        s.schedule_later(move |_: &Scheduler| order_b.borrow_mut().push('b'), 0);

        let order_c = order.clone();
        s.schedule_later(move |_: &Scheduler| order_c.borrow_mut().push('c'), 10);

        let mut ticks = Vec::new();
        s.run(|c| ticks.push(c));

        assert_eq!(*order.borrow(), vec!['a', 'b', 'c']);
        assert_eq!(ticks, vec![0, 0, 10]);
    }

    #[test]
    fn delay_zero_runs_after_all_ready_before_later_postponed() {
        let s = Scheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let o1 = order.clone();
        s.schedule_now(move |sched: &Scheduler| {
            o1.borrow_mut().push("ready-1");
            let o2 = o1.clone();
            sched.schedule_later(move |_: &Scheduler| o2.borrow_mut().push("inactive"), 0);
        });
        let o3 = order.clone();
        s.schedule_now(move |_: &Scheduler| o3.borrow_mut().push("ready-2"));
        let o4 = order.clone();
        s.schedule_later(move |_: &Scheduler| o4.borrow_mut().push("postponed"), 1);

        s.run(|_| {});
        assert_eq!(
            *order.borrow(),
            vec!["ready-1", "ready-2", "inactive", "postponed"]
        );
    }

    #[test]
    fn self_rescheduling_task_runs_repeatedly() {
        let s = Scheduler::new();
        let count = Rc::new(RefCell::new(0u32));
        let count_ref = count.clone();

        struct Ticker {
            count: Rc<RefCell<u32>>,
        }
        impl Task for Ticker {
            fn run(&mut self, scheduler: &Scheduler) {
                *self.count.borrow_mut() += 1;
                if *self.count.borrow() < 5 {
                    scheduler.schedule_later(
                        Ticker {
                            count: self.count.clone(),
                        },
                        1,
                    );
                }
            }
        }

        s.schedule_later(
            Ticker {
                count: count_ref.clone(),
            },
            1,
        );
        s.run(|_| {});
        assert_eq!(*count.borrow(), 5);
    }

    #[test]
    fn negative_delay_is_rejected_at_the_type_level() {
        // `delay` is a u64: there is no representable negative delay to pass,
        // which is the Rust equivalent of the original's `assert(delay >= 0)`
        // precondition — the precondition is made impossible to violate.
        let s = Scheduler::new();
        s.schedule_later(|_: &Scheduler| {}, 0);
        s.run(|_| {});
    }

    #[test]
    fn run_until_never_executes_events_past_target() {
        let s = Scheduler::new();
        let fired = Rc::new(RefCell::new(false));
        let fired_ref = fired.clone();
        s.schedule_later(move |_: &Scheduler| *fired_ref.borrow_mut() = true, 18);

        s.run_until(17);
        assert!(!*fired.borrow(), "event at 18 must not run before target 17");

        s.run_until(18);
        assert!(*fired.borrow(), "event at 18 must run once target reaches 18");
    }

    #[test]
    fn run_until_runs_every_simultaneous_event_at_the_target() {
        let s = Scheduler::new();
        let count = Rc::new(RefCell::new(0u32));
        for _ in 0..3 {
            let count_ref = count.clone();
            s.schedule_later(move |_: &Scheduler| *count_ref.borrow_mut() += 1, 5);
        }
        s.run_until(5);
        assert_eq!(*count.borrow(), 3);
    }
}
