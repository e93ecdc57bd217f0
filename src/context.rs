//! # Execution Context
//!
//! The saved-context value type and the [`ContextSwitch`] seam between the
//! portable scheduler and the architecture port.
//!
//! Everything outside the port treats a [`TaskContext`] as an opaque blob:
//! the scheduler only moves it between `save` and `restore`, and never
//! inspects or computes on the registers it holds.

use core::mem::offset_of;

use crate::config::{REGISTER_FILE_WIDTH, STACK_ALIGN};
use crate::task::TaskEntry;

/// Snapshot of the callee-saved general-purpose registers.
pub type RegisterFile = [usize; REGISTER_FILE_WIDTH];

/// Saved execution context of one task.
///
/// The layout is shared with the assembly switch routine:
///
/// ```text
/// offset  field
///   0     registers[0..REGISTER_FILE_WIDTH]
///  28     stack_pointer
///  32     frame_pointer
///  36     resume        (0 = never saved)
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskContext {
    registers: RegisterFile,
    stack_pointer: usize,
    frame_pointer: usize,
    resume: usize,
}

/// Byte offsets of the context fields, as seen by the switch routine.
pub const STACK_POINTER_OFFSET: usize = offset_of!(TaskContext, stack_pointer);
pub const FRAME_POINTER_OFFSET: usize = offset_of!(TaskContext, frame_pointer);
pub const RESUME_OFFSET: usize = offset_of!(TaskContext, resume);

impl TaskContext {
    /// A context that has never been saved.
    pub const FRESH: Self = Self {
        registers: [0; REGISTER_FILE_WIDTH],
        stack_pointer: 0,
        frame_pointer: 0,
        resume: 0,
    };

    /// Build a first-activation context.
    ///
    /// `trampoline` is the port's start routine; it finds the task entry in
    /// the first register slot. The stack starts empty at `stack_top`.
    pub fn first_activation(entry: TaskEntry, stack_top: usize, trampoline: usize) -> Self {
        let mut registers = [0; REGISTER_FILE_WIDTH];
        registers[0] = entry as usize;
        Self {
            registers,
            stack_pointer: stack_top,
            frame_pointer: 0,
            resume: trampoline,
        }
    }

    /// True until the context has been captured or prepared at least once.
    #[inline]
    pub fn is_fresh(&self) -> bool {
        self.resume == 0
    }

    #[inline]
    pub fn stack_pointer(&self) -> usize {
        self.stack_pointer
    }

    #[inline]
    pub fn frame_pointer(&self) -> usize {
        self.frame_pointer
    }
}

impl Default for TaskContext {
    fn default() -> Self {
        Self::FRESH
    }
}

/// Where a slot's first activation begins.
#[derive(Debug, Clone, Copy)]
pub struct Launch {
    pub entry: TaskEntry,
    /// One past the highest usable byte of the task's stack, aligned down
    /// to [`STACK_ALIGN`].
    pub stack_top: usize,
}

impl Launch {
    /// Launch parameters for a stack region starting at `base` that
    /// reserves `size` bytes.
    pub fn new(entry: TaskEntry, base: usize, size: usize) -> Self {
        Self {
            entry,
            stack_top: (base + size) & !(STACK_ALIGN - 1),
        }
    }
}

/// How a task gave the processor back to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Handback {
    /// The task called `yield_task` and can be resumed where it stopped.
    Yielded = 0,
    /// The task's entry procedure returned. Its slot must be terminated.
    Returned = 1,
}

/// Capture and restore of task execution contexts.
///
/// A switch is the pair `save(outgoing)` then `restore(incoming)`. The pair
/// must run as one unit with respect to any other scheduling activity. With
/// a single core and no asynchronous preemption that holds by construction;
/// an interrupt-driven port has to perform it inside
/// [`crate::sync::critical_section`] together with the scheduler's
/// bookkeeping.
pub trait ContextSwitch {
    /// Capture the context of the task that most recently handed control
    /// back into `context`.
    fn save(&mut self, context: &mut TaskContext);

    /// Transfer execution into `context` and return once the task hands
    /// control back. A fresh context is first prepared from `launch` so the
    /// task starts at its entry on an empty stack.
    fn restore(&mut self, context: &mut TaskContext, launch: Launch) -> Handback;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() {}

    #[test]
    fn test_fresh_context() {
        let ctx = TaskContext::default();
        assert!(ctx.is_fresh());
        assert_eq!(ctx.stack_pointer(), 0);
    }

    #[test]
    fn test_first_activation_layout() {
        let ctx = TaskContext::first_activation(body, 0x2000_2000, 0x0800_0101);
        assert!(!ctx.is_fresh());
        assert_eq!(ctx.stack_pointer(), 0x2000_2000);
        assert_eq!(ctx.frame_pointer(), 0);
        assert_eq!(ctx.registers[0], body as fn() as usize);
    }

    #[test]
    fn test_field_offsets_follow_register_file() {
        let word = core::mem::size_of::<usize>();
        assert_eq!(offset_of!(TaskContext, registers), 0);
        assert_eq!(STACK_POINTER_OFFSET, REGISTER_FILE_WIDTH * word);
        assert_eq!(FRAME_POINTER_OFFSET, STACK_POINTER_OFFSET + word);
        assert_eq!(RESUME_OFFSET, FRAME_POINTER_OFFSET + word);
        assert_eq!(core::mem::size_of::<TaskContext>(), RESUME_OFFSET + word);
    }

    #[test]
    fn test_launch_aligns_stack_top() {
        let launch = Launch::new(body, 0x2000_0000, 1021);
        assert_eq!(launch.stack_top, 0x2000_0000 + 1016);
        assert_eq!(launch.stack_top % STACK_ALIGN, 0);

        let launch = Launch::new(body, 0x2000_0000, 8 * 1024);
        assert_eq!(launch.stack_top, 0x2000_2000);
    }
}
