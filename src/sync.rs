//! # Synchronization Primitives
//!
//! Interrupt-safe critical sections for the Cortex-M4. The scheduling core
//! needs none (it only runs from the driver loop); the console does,
//! because tasks and the driver loop both write to it.

use cortex_m::interrupt;

/// Execute a closure within a critical section (interrupts disabled).
///
/// Interrupts are disabled on entry and restored on exit. A port that
/// adds interrupt-driven preemption must run the scheduler's bookkeeping
/// and the save/restore pair of a switch inside one of these.
///
/// # Usage
/// ```ignore
/// sync::critical_section(|cs| {
///     CONSOLE.borrow(cs).borrow_mut();
/// });
/// ```
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&interrupt::CriticalSection) -> R,
{
    interrupt::free(f)
}
