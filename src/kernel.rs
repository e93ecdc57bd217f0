//! # Kernel
//!
//! Boot sequence, the process-wide scheduler instance, and the task-side
//! API for BandOS.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         └─► kernel::boot(params, &TASKS)   ← no return
//!               ├─► USART2 + console + logger
//!               ├─► banner
//!               ├─► allocate the initial task set
//!               └─► driver loop: Scheduler::tick() forever
//! ```
//!
//! The scheduler is touched only by the driver loop. Tasks never reach it;
//! they give the processor back with [`yield_task`] or by returning.

use core::ptr::addr_of_mut;
use core::sync::atomic::{AtomicBool, Ordering};

use log::info;

use crate::arch::cortex_m4::{self, CortexM4};
use crate::console;
use crate::context::Handback;
use crate::kprintln;
use crate::scheduler::{Scheduler, Tick};
use crate::task::TaskEntry;
use crate::uart::Usart2;

/// The scheduler instance. Lives in static memory because the registry
/// carries every task's stack.
static mut SCHEDULER: Scheduler<CortexM4> = Scheduler::new(CortexM4::new());

static BOOTED: AtomicBool = AtomicBool::new(false);

/// Platform-defined values handed over by the boot path. Unused by the
/// scheduler; the Cortex-M reset path passes zeros.
#[derive(Debug, Clone, Copy, Default)]
pub struct BootParams {
    pub r0: u32,
    pub r1: u32,
    pub atags: u32,
}

/// One entry of the initial task set.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    pub name: &'static str,
    pub entry: TaskEntry,
    pub priority: u8,
    pub stack_size: usize,
}

/// Bring the system up and run the scheduler. **Does not return.**
///
/// # Panics
/// If called twice, or if an initial task is rejected by the registry.
pub fn boot(params: BootParams, tasks: &[TaskSpec]) -> ! {
    let _ = params;
    assert!(!BOOTED.swap(true, Ordering::AcqRel), "kernel booted twice");

    // Safety: first and only call, guarded above
    console::init(unsafe { Usart2::init() });
    console::init_logger();
    kprintln!("Hello, kernel World!");

    // Safety: BOOTED makes this the only reference, and tasks never touch it
    let scheduler = unsafe { &mut *addr_of_mut!(SCHEDULER) };

    for task in tasks {
        match scheduler.allocate(task.priority, Some(task.entry), task.stack_size) {
            Ok(slot) => info!("{} -> slot {} (priority {})", task.name, slot, task.priority),
            Err(e) => panic!("initial task {} rejected: {}", task.name, e),
        }
    }

    loop {
        if scheduler.tick() == Tick::Idle {
            cortex_m::asm::nop();
        }
    }
}

/// Give the processor back to the scheduler. Returns when this task is
/// selected again. A no-op outside task context.
#[inline]
pub fn yield_task() {
    cortex_m4::hand_back(Handback::Yielded);
}
