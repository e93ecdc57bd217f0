//! # BandOS — Priority-Band Operating System
//!
//! A minimal bare-metal task scheduler for ARM Cortex-M4 microcontrollers.
//!
//! ## Overview
//!
//! Tasks live in a fixed table of control blocks split into priority bands.
//! A driver loop repeatedly asks the scheduler for a decision; the scheduler
//! picks the first `Ready` task in priority-major order and transfers the
//! processor to it with a real context switch (stack and program counter).
//! The task runs until it yields or returns, which switches back into the
//! scheduler.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    Application Tasks                    │
//! ├────────────────────────────────────────────────────────┤
//! │            Kernel (kernel.rs)  · target only            │
//! │          boot() · driver loop · yield_task()            │
//! ├──────────────┬─────────────────────┬───────────────────┤
//! │  Scheduler   │  Task Registry      │  Console          │
//! │  scheduler.rs│  registry.rs        │  console.rs       │
//! │  ─ tick()    │  ─ allocate()       │  ─ ByteWrite/Read │
//! │  ─ select_   │  ─ slots()          │  ─ log backend    │
//! │    next()    │                     │                   │
//! ├──────────────┴─────────────────────┴───────────────────┤
//! │     Task Model (task.rs) · Context Seam (context.rs)     │
//! │    TCB · TaskState · TaskContext · ContextSwitch        │
//! ├────────────────────────────────────────────────────────┤
//! │     Arch Port (arch/cortex_m4.rs) · USART2 (uart.rs)    │
//! ├────────────────────────────────────────────────────────┤
//! │         ARM Cortex-M4 Hardware (Thumb-2)                │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Memory Model
//!
//! - **No heap**: all state is statically allocated
//! - **Fixed registry**: `PRIORITY_LEVELS × SLOTS_PER_PRIORITY` slots
//! - **Per-slot stack**: `MAX_STACK_SIZE` bytes each, owned by the registry
//!
//! The portable core builds on the host, where its unit tests run.
//! Hardware-facing modules are compiled only for bare-metal ARM.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod console;
pub mod context;
pub mod registry;
pub mod scheduler;
pub mod sync;
pub mod task;

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod arch;
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod kernel;
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod uart;
