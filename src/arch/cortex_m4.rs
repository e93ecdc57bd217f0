//! # Cortex-M4 Port Layer
//!
//! Hardware-specific half of the context switch for the ARM Cortex-M4
//! (Thumb-2, soft-float ABI).
//!
//! No FPU state is saved, so the firmware must be built for
//! `thumbv7em-none-eabi`. Building for `thumbv7em-none-eabihf` is a compile
//! error. The [`TaskContext`] offsets the assembly uses are checked against
//! the Rust layout at compile time.
//!
//! ## Context Switch Mechanism
//!
//! Everything runs in Thread mode on the main stack pointer; no exception
//! is involved. A switch is a call to `bandos_switch(save, load)`:
//!
//! 1. Store r4–r6, r8–r11, r7 (frame pointer), sp, and lr into `save`
//! 2. Load the same registers from `load`
//! 3. Branch to the loaded lr
//!
//! Caller-saved registers need no handling because the switch is an
//! ordinary procedure call from the compiler's point of view.
//!
//! The driver loop's context lives in `KERNEL`. `restore` switches from
//! `KERNEL` into a task; a task hands the processor back by switching from
//! the `HANDBACK` slot into `KERNEL`, which lands in the suspended
//! `restore` frame. `save` then copies `HANDBACK` into the task's control
//! block. Neither direction nests a call, so the kernel stack never grows
//! with the number of switches.
//!
//! ## First Activation
//!
//! A fresh context resumes at `bandos_task_start` with the entry in r4 and
//! sp at the top of the task's reserved stack region:
//!
//! ```text
//! registers[0]  = entry            (r4)
//! stack_pointer = stack_top        (8-byte aligned, empty)
//! frame_pointer = 0                (r7, terminates backtraces)
//! resume        = bandos_task_start
//! ```

use core::arch::global_asm;
use core::ptr::{addr_of, addr_of_mut};
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::config::REGISTER_FILE_WIDTH;
use crate::context::{
    ContextSwitch, Handback, Launch, TaskContext, FRAME_POINTER_OFFSET, RESUME_OFFSET,
    STACK_POINTER_OFFSET,
};
use crate::task::TaskEntry;

// The switch saves integer registers only. Under the hard-float ABI
// s16–s31 are callee-saved as well and would leak between contexts.
#[cfg(target_abi = "eabihf")]
compile_error!("the Cortex-M4 port saves no FPU registers; build for thumbv7em-none-eabi");

// `bandos_switch` hard-codes the register list and these offsets
const _: () = assert!(REGISTER_FILE_WIDTH == 7);
const _: () = assert!(STACK_POINTER_OFFSET == 28);
const _: () = assert!(FRAME_POINTER_OFFSET == 32);
const _: () = assert!(RESUME_OFFSET == 36);

// ---------------------------------------------------------------------------
// Switch routine
// ---------------------------------------------------------------------------

global_asm!(
    ".section .text.bandos_switch,\"ax\",%progbits",
    ".global bandos_switch",
    ".type bandos_switch,%function",
    ".thumb_func",
    "bandos_switch:",
    // --- Save outgoing context into r0 ---
    "stmia r0, {{r4-r6, r8-r11}}",
    "mov r2, sp",
    "str r2, [r0, #28]",
    "str r7, [r0, #32]",
    "str lr, [r0, #36]",
    // --- Load incoming context from r1 ---
    "ldmia r1, {{r4-r6, r8-r11}}",
    "ldr r2, [r1, #28]",
    "mov sp, r2",
    "ldr r7, [r1, #32]",
    "ldr r2, [r1, #36]",
    "bx r2",
    "",
    ".section .text.bandos_task_start,\"ax\",%progbits",
    ".global bandos_task_start",
    ".type bandos_task_start,%function",
    ".thumb_func",
    "bandos_task_start:",
    "mov r0, r4",
    "bl {task_main}",
    "udf #0",
    task_main = sym task_main,
);

extern "C" {
    /// Save the executing context into `save` and continue from `load`.
    /// Returns when another switch loads `save` again.
    fn bandos_switch(save: *mut TaskContext, load: *const TaskContext);

    /// Thumb trampoline for first activations.
    fn bandos_task_start();
}

// ---------------------------------------------------------------------------
// Port state
// ---------------------------------------------------------------------------

/// Context of the driver loop while a task runs.
static mut KERNEL: TaskContext = TaskContext::FRESH;

/// Context of the task that most recently handed control back.
static mut HANDBACK: TaskContext = TaskContext::FRESH;

static HANDBACK_KIND: AtomicU8 = AtomicU8::new(Handback::Yielded as u8);

/// Set while a task owns the processor.
static IN_TASK: AtomicBool = AtomicBool::new(false);

/// Handle to the Cortex-M4 context-switch port.
///
/// The port state above is global, so exactly one handle may exist: the
/// one owned by the kernel's scheduler instance.
pub struct CortexM4 {
    _private: (),
}

impl CortexM4 {
    pub(crate) const fn new() -> Self {
        Self { _private: () }
    }
}

impl ContextSwitch for CortexM4 {
    fn save(&mut self, context: &mut TaskContext) {
        // Safety: HANDBACK is only written by `hand_back`, which cannot run
        // while the driver loop holds the processor.
        *context = unsafe { *addr_of!(HANDBACK) };
    }

    fn restore(&mut self, context: &mut TaskContext, launch: Launch) -> Handback {
        if context.is_fresh() {
            *context = TaskContext::first_activation(
                launch.entry,
                launch.stack_top,
                bandos_task_start as usize,
            );
        }

        IN_TASK.store(true, Ordering::Release);
        // Safety: `context` was either built above or captured by `save`
        // from a task that handed back and has not run since.
        unsafe {
            bandos_switch(addr_of_mut!(KERNEL), context);
        }
        IN_TASK.store(false, Ordering::Release);

        match HANDBACK_KIND.load(Ordering::Acquire) {
            0 => Handback::Yielded,
            _ => Handback::Returned,
        }
    }
}

// ---------------------------------------------------------------------------
// Task side
// ---------------------------------------------------------------------------

/// Give the processor back to the driver loop.
///
/// For `Yielded`, returns when the scheduler restores this task again. A
/// no-op when called from outside a task.
pub fn hand_back(kind: Handback) {
    if !IN_TASK.load(Ordering::Acquire) {
        return;
    }
    HANDBACK_KIND.store(kind as u8, Ordering::Release);
    unsafe {
        bandos_switch(addr_of_mut!(HANDBACK), addr_of!(KERNEL));
    }
}

/// Body of the first-activation trampoline. Runs `entry` on the task's own
/// stack; a returning entry ends the task.
extern "C" fn task_main(entry: TaskEntry) -> ! {
    entry();
    hand_back(Handback::Returned);
    // A terminated slot is never restored
    cortex_m::asm::udf()
}
