//! # Task Control Block
//!
//! Defines the task model for BandOS: the lifecycle state machine, the
//! task entry type, the per-slot stack region, and the control block that
//! ties them together.

use crate::config::MAX_STACK_SIZE;
use crate::context::TaskContext;

// ---------------------------------------------------------------------------
// Task state machine
// ---------------------------------------------------------------------------

/// Execution state of a task.
///
/// ```text
///   ┌──────────┐      tick()       ┌─────────┐
///   │  Ready   │ ────────────────► │ Running │
///   └──────────┘                   └─────────┘
///        ▲                              │
///        │           preempt            │
///        └──────────────────────────────┤
///                                       │ terminate() / entry returned
///   ┌──────────┐                        ▼
///   │ Waiting  │ ─────────────► ┌───────────┐
///   └──────────┘   terminate()  │ Suspended │  (terminal)
///                               └───────────┘
/// ```
///
/// `Waiting` is reserved for blocking primitives; nothing in the core
/// enters it, and selection skips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Runnable, waiting to be selected.
    Ready,
    /// The task `current` refers to.
    Running,
    /// Terminated. Never selected again.
    Suspended,
    /// Blocked on an event.
    Waiting,
}

/// A task body: a zero-argument procedure. Returning from it terminates
/// the task.
pub type TaskEntry = fn();

// ---------------------------------------------------------------------------
// Stack region
// ---------------------------------------------------------------------------

/// Private stack memory of one slot. Aligned to 8 bytes as required by
/// the ARM AAPCS.
#[repr(C, align(8))]
pub struct TaskStack([u8; MAX_STACK_SIZE]);

impl TaskStack {
    pub const EMPTY: Self = Self([0; MAX_STACK_SIZE]);

    /// Address of the lowest byte of the region.
    #[inline]
    pub fn base(&mut self) -> usize {
        self.0.as_mut_ptr() as usize
    }
}

// ---------------------------------------------------------------------------
// Task Control Block
// ---------------------------------------------------------------------------

/// Task Control Block (TCB) — one per registry slot.
///
/// The saved context is written only through the context-switch port; the
/// scheduler reads and writes `state`, and the registry owns everything
/// else.
#[derive(Debug, Clone, Copy)]
pub struct TaskControlBlock {
    /// Saved registers, stack pointer, and frame pointer.
    pub(crate) context: TaskContext,

    /// Band this slot belongs to. Lower value = higher precedence.
    pub(crate) priority: u8,

    pub(crate) state: TaskState,

    /// Bytes of the slot's stack region reserved for this task.
    pub(crate) stack_size: usize,

    /// Whether the slot has been claimed. Never cleared.
    pub(crate) occupied: bool,

    pub(crate) entry: Option<TaskEntry>,
}

impl TaskControlBlock {
    /// An unclaimed slot. Used to initialize the registry.
    pub const EMPTY: Self = Self {
        context: TaskContext::FRESH,
        priority: 0,
        state: TaskState::Ready,
        stack_size: 0,
        occupied: false,
        entry: None,
    };

    /// Claim this slot for a new task in the `Ready` state.
    pub(crate) fn claim(&mut self, priority: u8, entry: TaskEntry, stack_size: usize) {
        self.context = TaskContext::FRESH;
        self.priority = priority;
        self.state = TaskState::Ready;
        self.stack_size = stack_size;
        self.occupied = true;
        self.entry = Some(entry);
    }

    /// Check if this task can be selected (claimed and `Ready`).
    #[inline]
    pub fn is_runnable(&self) -> bool {
        self.occupied && self.state == TaskState::Ready
    }

    #[inline]
    pub fn state(&self) -> TaskState {
        self.state
    }

    #[inline]
    pub fn priority(&self) -> u8 {
        self.priority
    }

    #[inline]
    pub fn stack_size(&self) -> usize {
        self.stack_size
    }

    #[inline]
    pub fn is_occupied(&self) -> bool {
        self.occupied
    }

    #[inline]
    pub fn entry(&self) -> Option<TaskEntry> {
        self.entry
    }

    /// Last saved context. Fresh until the task has run and been captured.
    #[inline]
    pub fn context(&self) -> &TaskContext {
        &self.context
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
