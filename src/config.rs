//! # BandOS Configuration
//!
//! Compile-time constants governing the registry, the context switch, and
//! the diagnostic console. There is no runtime configuration surface.

use log::LevelFilter;

/// Number of priority bands. Priority `0` is the most urgent.
pub const PRIORITY_LEVELS: usize = 3;

/// Slots reserved for each priority band.
pub const SLOTS_PER_PRIORITY: usize = 2;

/// Total registry capacity. Slots are laid out priority-major.
pub const MAX_TASKS: usize = PRIORITY_LEVELS * SLOTS_PER_PRIORITY;

/// Largest private stack a task may reserve, in bytes. Every slot owns a
/// region of this size, so the registry costs `MAX_TASKS × MAX_STACK_SIZE`
/// bytes of RAM.
pub const MAX_STACK_SIZE: usize = 16 * 1024;

/// Smallest stack accepted by `allocate`. The first activation and the
/// deepest hand-back path must fit with room to spare.
pub const MIN_STACK_SIZE: usize = 256;

/// Number of general-purpose registers captured per context: the
/// callee-saved set r4–r6, r8–r11. The frame pointer (r7) and the stack
/// pointer are kept in their own fields.
///
/// Fixed by the Cortex-M4 port: its switch routine stores exactly this
/// register list at fixed offsets, and a compile-time check there rejects
/// any other value.
pub const REGISTER_FILE_WIDTH: usize = 7;

/// Stack alignment required by the AAPCS at public interfaces.
pub const STACK_ALIGN: usize = 8;

/// System clock frequency in Hz (STM32F4 HSI after reset).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// APB1 clock feeding USART2. Equal to the system clock with reset prescalers.
pub const APB1_CLOCK_HZ: u32 = SYSTEM_CLOCK_HZ;

/// Console baud rate.
pub const UART_BAUD: u32 = 115_200;

/// Maximum level emitted by the console logger.
pub const LOG_LEVEL: LevelFilter = LevelFilter::Info;
