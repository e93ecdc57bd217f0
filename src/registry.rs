//! # Task Registry
//!
//! Fixed-capacity store of task control blocks, laid out priority-major:
//!
//! ```text
//! index   0   1 │  2   3 │  4   5
//! band    ──0── │  ──1── │  ──2──
//! ```
//!
//! A slot's priority is implied by its position and slots are never
//! reordered or released. Each slot also owns a private stack region.

use core::fmt;
use core::ops::Range;

use crate::config::{MAX_STACK_SIZE, MAX_TASKS, MIN_STACK_SIZE, PRIORITY_LEVELS, SLOTS_PER_PRIORITY};
use crate::context::{Launch, TaskContext};
use crate::task::{TaskControlBlock, TaskEntry, TaskStack};

/// Reasons `allocate` refuses a task. No variant mutates the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Priority outside `[0, PRIORITY_LEVELS)`.
    InvalidPriority,
    /// Stack larger than `MAX_STACK_SIZE`.
    StackTooLarge,
    /// Stack smaller than `MIN_STACK_SIZE`.
    StackTooSmall,
    /// No task body given.
    NullEntry,
    /// Every slot in the requested band is occupied.
    Full,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::InvalidPriority => {
                write!(f, "priority out of range (0..{})", PRIORITY_LEVELS)
            }
            AllocError::StackTooLarge => write!(f, "stack exceeds {} bytes", MAX_STACK_SIZE),
            AllocError::StackTooSmall => write!(f, "stack below {} bytes", MIN_STACK_SIZE),
            AllocError::NullEntry => f.write_str("missing task entry"),
            AllocError::Full => f.write_str("priority band is full"),
        }
    }
}

/// Slot index range of a priority band.
#[inline]
pub const fn band_range(priority: usize) -> Range<usize> {
    priority * SLOTS_PER_PRIORITY..(priority + 1) * SLOTS_PER_PRIORITY
}

/// Band a slot index belongs to.
#[inline]
pub const fn band_of(index: usize) -> u8 {
    (index / SLOTS_PER_PRIORITY) as u8
}

pub struct TaskRegistry {
    slots: [TaskControlBlock; MAX_TASKS],
    stacks: [TaskStack; MAX_TASKS],
}

impl TaskRegistry {
    /// An empty registry: every slot unclaimed.
    pub const fn new() -> Self {
        Self {
            slots: [TaskControlBlock::EMPTY; MAX_TASKS],
            stacks: [TaskStack::EMPTY; MAX_TASKS],
        }
    }

    /// Claim the first free slot of `priority`'s band for a new `Ready` task.
    ///
    /// Parameters are validated before the band is scanned, in the order
    /// priority, stack size, entry. The band is scanned in ascending index
    /// order.
    ///
    /// The lower stack bound (`StackTooSmall`, [`MIN_STACK_SIZE`]) is imposed
    /// by the port rather than by the scheduling model: a first activation
    /// on a smaller region would run into the neighbouring slot's stack.
    pub fn allocate(
        &mut self,
        priority: u8,
        entry: Option<TaskEntry>,
        stack_size: usize,
    ) -> Result<usize, AllocError> {
        if priority as usize >= PRIORITY_LEVELS {
            return Err(AllocError::InvalidPriority);
        }
        if stack_size > MAX_STACK_SIZE {
            return Err(AllocError::StackTooLarge);
        }
        if stack_size < MIN_STACK_SIZE {
            return Err(AllocError::StackTooSmall);
        }
        let entry = entry.ok_or(AllocError::NullEntry)?;

        let index = band_range(priority as usize)
            .find(|&i| !self.slots[i].occupied)
            .ok_or(AllocError::Full)?;

        debug_assert_eq!(band_of(index), priority);
        self.slots[index].claim(priority, entry, stack_size);
        Ok(index)
    }

    /// Read-only view of every slot in priority-major order.
    #[inline]
    pub fn slots(&self) -> &[TaskControlBlock] {
        &self.slots
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&TaskControlBlock> {
        self.slots.get(index)
    }

    /// Number of claimed slots.
    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|tcb| tcb.occupied).count()
    }

    #[inline]
    pub(crate) fn slot_mut(&mut self, index: usize) -> &mut TaskControlBlock {
        &mut self.slots[index]
    }

    /// Saved context and first-activation parameters of an occupied slot.
    ///
    /// # Panics
    /// If the slot is unclaimed.
    pub(crate) fn activation(&mut self, index: usize) -> (&mut TaskContext, Launch) {
        let tcb = &mut self.slots[index];
        let entry = match tcb.entry {
            Some(entry) if tcb.occupied => entry,
            _ => panic!("activating unclaimed slot {}", index),
        };
        let launch = Launch::new(entry, self.stacks[index].base(), tcb.stack_size);
        (&mut tcb.context, launch)
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
