//! # Scheduler
//!
//! Strict-priority selection over the task registry plus the run loop step
//! that starts, preempts, and resumes tasks.
//!
//! ## Selection
//!
//! Slots are scanned in ascending index order and the first `Ready` one
//! wins. Because the registry is priority-major this gives strict band
//! precedence, and inside a band the lowest index always wins. There is no
//! rotation.
//!
//! ## Control transfer
//!
//! `tick()` hands the processor to a task through [`ContextSwitch::restore`]
//! and regains it only when that task yields or its entry returns. The task
//! runs on its own stack and comes back through a context switch into the
//! suspended `tick()` frame, so the transfer depth stays at one no matter
//! how many tasks have run.

use log::{debug, trace, warn};

use crate::context::{ContextSwitch, Handback};
use crate::registry::{band_of, AllocError, TaskRegistry};
use crate::task::{TaskEntry, TaskState};

/// What a single `tick()` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Nothing was runnable.
    Idle,
    /// First activation of the scheduler.
    Started(usize),
    /// `from` was replaced by `to`.
    Preempted { from: usize, to: usize },
    /// The current task kept the processor.
    Resumed(usize),
}

/// Owns the registry, the `current` slot, and the context-switch port. All
/// scheduling state is mutated through its methods only.
pub struct Scheduler<C> {
    registry: TaskRegistry,
    /// Slot presently executing. `None` until the first task starts.
    current: Option<usize>,
    port: C,
}

impl<C: ContextSwitch> Scheduler<C> {
    /// Create a scheduler with an empty registry.
    pub const fn new(port: C) -> Self {
        Self {
            registry: TaskRegistry::new(),
            current: None,
            port,
        }
    }

    /// Register a new task. See [`TaskRegistry::allocate`].
    pub fn allocate(
        &mut self,
        priority: u8,
        entry: Option<TaskEntry>,
        stack_size: usize,
    ) -> Result<usize, AllocError> {
        let result = self.registry.allocate(priority, entry, stack_size);
        match result {
            Ok(slot) => debug!("slot {} claimed in band {}", slot, band_of(slot)),
            Err(e) => warn!("allocate(priority {}, {} bytes): {}", priority, stack_size, e),
        }
        result
    }

    /// Index of the first occupied `Ready` slot, if any.
    pub fn select_next(&self) -> Option<usize> {
        self.registry.slots().iter().position(|tcb| tcb.is_runnable())
    }

    /// Run one scheduling decision and, if a task is given the processor,
    /// return after it hands control back.
    pub fn tick(&mut self) -> Tick {
        let next = self.select_next();

        let Some(current) = self.current else {
            return match next {
                Some(next) => {
                    trace!("starting slot {}", next);
                    self.current = Some(next);
                    self.registry.slot_mut(next).state = TaskState::Running;
                    self.switch_to(next);
                    Tick::Started(next)
                }
                None => Tick::Idle,
            };
        };

        match next {
            Some(next) if next != current => {
                trace!("preempting slot {} for slot {}", current, next);
                self.preempt(current, next);
                Tick::Preempted { from: current, to: next }
            }
            _ if self.registry.slots()[current].state() == TaskState::Running => {
                self.resume(current);
                Tick::Resumed(current)
            }
            _ => Tick::Idle,
        }
    }

    /// Mark a slot `Suspended`. A terminated task is never selected again.
    ///
    /// The current slot's context is captured for diagnostics; any other
    /// slot already holds the context saved when it was last preempted.
    ///
    /// # Panics
    /// If `slot` is out of range or unclaimed.
    pub fn terminate(&mut self, slot: usize) {
        let tcb = self.registry.slot_mut(slot);
        assert!(tcb.occupied, "terminating unclaimed slot {}", slot);
        if tcb.state == TaskState::Suspended {
            return;
        }
        tcb.state = TaskState::Suspended;

        if self.current == Some(slot) {
            self.port.save(&mut self.registry.slot_mut(slot).context);
        }
        debug!("slot {} suspended", slot);
    }

    #[inline]
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    #[inline]
    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    fn preempt(&mut self, current: usize, next: usize) {
        let old = self.registry.slot_mut(current);
        if old.state == TaskState::Running {
            old.state = TaskState::Ready;
            self.port.save(&mut old.context);
        }

        self.registry.slot_mut(next).state = TaskState::Running;
        self.current = Some(next);
        self.switch_to(next);
    }

    fn resume(&mut self, current: usize) {
        self.port.save(&mut self.registry.slot_mut(current).context);
        self.switch_to(current);
    }

    /// Restore `slot` and deal with how it handed control back.
    fn switch_to(&mut self, slot: usize) {
        let (context, launch) = self.registry.activation(slot);
        match self.port.restore(context, launch) {
            Handback::Yielded => {}
            Handback::Returned => {
                debug!("slot {} returned from its entry", slot);
                self.terminate(slot);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    extern crate std;

    use std::boxed::Box;
    use std::collections::VecDeque;
    use std::vec::Vec;

    use super::*;
    use crate::config::{MAX_TASKS, SLOTS_PER_PRIORITY};
    use crate::context::{Launch, TaskContext};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Save,
        Restore { fresh: bool, stack_top: usize },
    }

    /// Records every save/restore and hands back from a script
    /// (`Yielded` once the script runs out).
    #[derive(Default)]
    struct MockPort {
        events: Vec<Event>,
        script: VecDeque<Handback>,
        /// Incremented on every restore so saves are distinguishable.
        generation: usize,
    }

    impl ContextSwitch for MockPort {
        fn save(&mut self, context: &mut TaskContext) {
            self.events.push(Event::Save);
            *context = TaskContext::first_activation(task_a, 0x1000 + self.generation, 0x1);
        }

        fn restore(&mut self, context: &mut TaskContext, launch: Launch) -> Handback {
            self.events.push(Event::Restore {
                fresh: context.is_fresh(),
                stack_top: launch.stack_top,
            });
            if context.is_fresh() {
                *context = TaskContext::first_activation(launch.entry, launch.stack_top, 0x1);
            }
            self.generation += 1;
            self.script.pop_front().unwrap_or(Handback::Yielded)
        }
    }

    fn task_a() {}
    fn task_b() {}

    fn scheduler() -> Box<Scheduler<MockPort>> {
        Box::new(Scheduler::new(MockPort::default()))
    }

    fn state(s: &Scheduler<MockPort>, slot: usize) -> TaskState {
        s.registry().get(slot).unwrap().state()
    }

    #[test]
    fn test_idle_when_empty() {
        let mut s = scheduler();
        assert_eq!(s.select_next(), None);
        assert_eq!(s.tick(), Tick::Idle);
        assert_eq!(s.current(), None);
        assert!(s.port.events.is_empty());
    }

    #[test]
    fn test_lower_band_wins_regardless_of_creation_order() {
        let mut s = scheduler();
        s.allocate(2, Some(task_a), 1024).unwrap();
        let b = s.allocate(0, Some(task_b), 1024).unwrap();
        assert_eq!(s.select_next(), Some(b));
    }

    #[test]
    fn test_lowest_index_wins_within_band() {
        let mut s = scheduler();
        let first = s.allocate(1, Some(task_a), 1024).unwrap();
        s.allocate(1, Some(task_b), 1024).unwrap();
        assert_eq!(s.select_next(), Some(first));
    }

    #[test]
    fn test_selection_skips_waiting_and_suspended() {
        let mut s = scheduler();
        let a = s.allocate(0, Some(task_a), 1024).unwrap();
        let b = s.allocate(0, Some(task_b), 1024).unwrap();
        let c = s.allocate(1, Some(task_b), 1024).unwrap();

        s.registry.slot_mut(a).state = TaskState::Waiting;
        s.terminate(b);
        assert_eq!(s.select_next(), Some(c));

        s.terminate(c);
        assert_eq!(s.select_next(), None);
    }

    #[test]
    fn test_first_tick_starts_task() {
        let mut s = scheduler();
        let slot = s.allocate(1, Some(task_a), 2048).unwrap();

        assert_eq!(s.tick(), Tick::Started(slot));
        assert_eq!(s.current(), Some(slot));
        assert_eq!(state(&s, slot), TaskState::Running);

        match s.port.events.as_slice() {
            [Event::Restore { fresh: true, stack_top }] => assert_ne!(*stack_top, 0),
            other => panic!("unexpected events {:?}", other),
        }
    }

    #[test]
    fn test_two_band_scenario() {
        let mut s = scheduler();
        let a = s.allocate(2, Some(task_a), 8 * 1024).unwrap();
        let b = s.allocate(1, Some(task_b), 8 * 1024).unwrap();
        assert_eq!(a, 2 * SLOTS_PER_PRIORITY);
        assert_eq!(b, SLOTS_PER_PRIORITY);

        // B wins even though A was created first
        assert_eq!(s.tick(), Tick::Started(b));
        assert_eq!(state(&s, b), TaskState::Running);
        assert_eq!(state(&s, a), TaskState::Ready);

        // B yielded; A is the only Ready task
        assert_eq!(s.tick(), Tick::Preempted { from: b, to: a });
        assert_eq!(state(&s, a), TaskState::Running);
        assert_eq!(state(&s, b), TaskState::Ready);
        assert_eq!(s.current(), Some(a));

        // And back again: B is Ready in a lower band
        assert_eq!(s.tick(), Tick::Preempted { from: a, to: b });
        assert_eq!(s.current(), Some(b));
        assert_eq!(state(&s, a), TaskState::Ready);
        assert_eq!(s.registry().occupied_count(), 2);
    }

    #[test]
    fn test_preempt_saves_then_restores() {
        let mut s = scheduler();
        let a = s.allocate(2, Some(task_a), 1024).unwrap();
        s.allocate(1, Some(task_b), 1024).unwrap();

        s.tick();
        s.tick();
        s.tick();

        let events: Vec<_> = s
            .port
            .events
            .iter()
            .map(|e| match e {
                Event::Save => "save",
                Event::Restore { fresh: true, .. } => "start",
                Event::Restore { fresh: false, .. } => "restore",
            })
            .collect();
        assert_eq!(events, ["start", "save", "start", "save", "restore"]);
        assert!(!s.registry().get(a).unwrap().context().is_fresh());
    }

    #[test]
    fn test_single_task_is_resumed() {
        let mut s = scheduler();
        let slot = s.allocate(0, Some(task_a), 1024).unwrap();

        assert_eq!(s.tick(), Tick::Started(slot));
        for _ in 0..10 {
            assert_eq!(s.tick(), Tick::Resumed(slot));
            assert_eq!(state(&s, slot), TaskState::Running);
            assert_eq!(s.current(), Some(slot));
        }
        assert_eq!(s.port.events.len(), 1 + 2 * 10);
    }

    #[test]
    fn test_returned_task_is_terminated() {
        let mut s = scheduler();
        let a = s.allocate(0, Some(task_a), 1024).unwrap();
        let b = s.allocate(1, Some(task_b), 1024).unwrap();
        s.port.script.push_back(Handback::Returned);

        assert_eq!(s.tick(), Tick::Started(a));
        assert_eq!(state(&s, a), TaskState::Suspended);

        // The suspended slot is not demoted back to Ready
        assert_eq!(s.tick(), Tick::Preempted { from: a, to: b });
        assert_eq!(state(&s, a), TaskState::Suspended);
        assert_eq!(state(&s, b), TaskState::Running);

        assert_eq!(s.tick(), Tick::Resumed(b));
    }

    #[test]
    fn test_idle_after_last_task_returns() {
        let mut s = scheduler();
        let a = s.allocate(0, Some(task_a), 1024).unwrap();
        s.port.script.push_back(Handback::Returned);

        s.tick();
        let events = s.port.events.len();
        assert_eq!(s.tick(), Tick::Idle);
        assert_eq!(s.tick(), Tick::Idle);
        assert_eq!(s.current(), Some(a));
        assert_eq!(s.port.events.len(), events);
    }

    #[test]
    fn test_terminate_any_state() {
        let mut s = scheduler();
        let a = s.allocate(0, Some(task_a), 1024).unwrap();
        let b = s.allocate(1, Some(task_b), 1024).unwrap();
        let c = s.allocate(2, Some(task_b), 1024).unwrap();
        s.registry.slot_mut(c).state = TaskState::Waiting;

        s.tick();
        s.terminate(a); // Running
        s.terminate(b); // Ready
        s.terminate(c); // Waiting
        for slot in [a, b, c] {
            assert_eq!(state(&s, slot), TaskState::Suspended);
        }
        assert_eq!(s.select_next(), None);
        assert_eq!(s.tick(), Tick::Idle);
        assert_eq!(s.registry().occupied_count(), 3);
    }

    #[test]
    fn test_terminate_captures_only_current() {
        let mut s = scheduler();
        let a = s.allocate(0, Some(task_a), 1024).unwrap();
        let b = s.allocate(0, Some(task_b), 1024).unwrap();

        s.tick();
        s.port.events.clear();

        s.terminate(b);
        assert!(s.port.events.is_empty());
        s.terminate(a);
        assert_eq!(s.port.events, [Event::Save]);

        // Already suspended: nothing to do
        s.terminate(a);
        assert_eq!(s.port.events.len(), 1);
    }

    #[test]
    #[should_panic]
    fn test_terminate_unclaimed_slot_halts() {
        let mut s = scheduler();
        s.terminate(0);
    }

    #[test]
    #[should_panic]
    fn test_terminate_out_of_range_halts() {
        let mut s = scheduler();
        s.terminate(MAX_TASKS);
    }

    #[test]
    fn test_occupied_count_unchanged_by_scheduling() {
        let mut s = scheduler();
        for priority in 0..3 {
            s.allocate(priority, Some(task_a), 1024).unwrap();
        }
        for _ in 0..20 {
            s.tick();
            assert_eq!(s.registry().occupied_count(), 3);
        }
    }

    #[test]
    fn test_failed_allocate_leaves_scheduler_untouched() {
        let mut s = scheduler();
        assert_eq!(s.allocate(0, None, 1024), Err(AllocError::NullEntry));
        assert_eq!(s.tick(), Tick::Idle);
        assert_eq!(s.current(), None);
    }
}
