//! # BandOS Firmware
//!
//! Boots the kernel with two tasks that print their names on USART2:
//!
//! | Task    | Priority | Stack |
//! |---------|----------|-------|
//! | `task1` | 2        | 8 KiB |
//! | `task2` | 1        | 8 KiB |
//!
//! `task1` is created first but `task2` sits in a more urgent band, so the
//! first decision runs `task2`. Each task yields after printing, and the
//! scheduler alternates between them:
//!
//! ```text
//! Hello, kernel World!
//! task2
//! task1
//! task2
//! ...
//! ```

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod firmware {
    use cortex_m_rt::entry;
    use panic_halt as _;

    use bandos::kernel::{self, BootParams, TaskSpec};
    use bandos::kprintln;

    fn task1() {
        loop {
            kprintln!("task1");
            kernel::yield_task();
        }
    }

    fn task2() {
        loop {
            kprintln!("task2");
            kernel::yield_task();
        }
    }

    static TASKS: [TaskSpec; 2] = [
        TaskSpec { name: "task1", entry: task1, priority: 2, stack_size: 8 * 1024 },
        TaskSpec { name: "task2", entry: task2, priority: 1, stack_size: 8 * 1024 },
    ];

    #[entry]
    fn main() -> ! {
        kernel::boot(BootParams::default(), &TASKS)
    }
}

// Host builds only check the library; the firmware needs a Cortex-M target
#[cfg(not(all(target_arch = "arm", target_os = "none")))]
fn main() {}
