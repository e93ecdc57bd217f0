//! # Diagnostic Console
//!
//! The text I/O collaborator seen by the rest of the system: a blocking
//! byte writer/reader pair, a [`core::fmt::Write`] adaptor over it, and the
//! `log` backend that prints records through it.
//!
//! Output uses `\r\n` line endings; `\n` is translated on the way out.

use core::fmt::{self, Write};

use log::{Log, Metadata, Record};

/// Blocking byte sink. Returns once the byte has been handed to the
/// transmitter.
pub trait ByteWrite {
    fn write_byte(&mut self, byte: u8);
}

/// Blocking byte source. Returns once a byte has been received.
pub trait ByteRead {
    fn read_byte(&mut self) -> u8;
}

/// Text adaptor over a byte device.
pub struct Console<D> {
    device: D,
}

impl<D> Console<D> {
    pub const fn new(device: D) -> Self {
        Self { device }
    }

    pub fn into_inner(self) -> D {
        self.device
    }
}

impl<D: ByteWrite> Console<D> {
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if b == b'\n' {
                self.device.write_byte(b'\r');
            }
            self.device.write_byte(b);
        }
    }
}

impl<D: ByteRead> Console<D> {
    pub fn read_byte(&mut self) -> u8 {
        self.device.read_byte()
    }
}

impl<D: ByteWrite> Write for Console<D> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}

/// Format a log record as one console line.
pub fn write_record(out: &mut impl Write, record: &Record) -> fmt::Result {
    writeln!(out, "[{:<5}] {}", record.level(), record.args())
}

// ---------------------------------------------------------------------------
// Global console (target only)
// ---------------------------------------------------------------------------

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod global {
    use core::cell::RefCell;
    use core::fmt::{self, Write};

    use cortex_m::interrupt::Mutex;

    use super::Console;
    use crate::sync;
    use crate::uart::Usart2;

    static CONSOLE: Mutex<RefCell<Option<Console<Usart2>>>> = Mutex::new(RefCell::new(None));

    /// Install the console device. Output before this call is dropped.
    pub fn init(device: Usart2) {
        sync::critical_section(|cs| {
            CONSOLE.borrow(cs).replace(Some(Console::new(device)));
        });
    }

    pub fn with<R>(f: impl FnOnce(&mut Console<Usart2>) -> R) -> Option<R> {
        sync::critical_section(|cs| CONSOLE.borrow(cs).borrow_mut().as_mut().map(f))
    }

    #[doc(hidden)]
    pub fn _print(args: fmt::Arguments) {
        let _ = with(|console| console.write_fmt(args));
    }
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use global::{_print, init, with};

/// Print to the console.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => ($crate::console::_print(format_args!($($arg)*)));
}

/// Print to the console, with a newline.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[macro_export]
macro_rules! kprintln {
    () => ($crate::kprint!("\n"));
    ($($arg:tt)*) => ($crate::kprint!("{}\n", format_args!($($arg)*)));
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

/// `log` backend writing to the global console.
pub struct Logger;

pub static LOGGER: Logger = Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        #[cfg(all(target_arch = "arm", target_os = "none"))]
        let _ = with(|console| write_record(console, record));
    }

    fn flush(&self) {}
}

/// Install [`LOGGER`] with the configured level. Later calls are ignored.
pub fn init_logger() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(crate::config::LOG_LEVEL);
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    extern crate std;

    use std::collections::VecDeque;
    use std::string::String;
    use std::vec::Vec;

    use log::Level;

    use super::*;

    #[derive(Default)]
    struct Loopback {
        sent: Vec<u8>,
        pending: VecDeque<u8>,
    }

    impl ByteWrite for Loopback {
        fn write_byte(&mut self, byte: u8) {
            self.sent.push(byte);
        }
    }

    impl ByteRead for Loopback {
        fn read_byte(&mut self) -> u8 {
            self.pending.pop_front().expect("no input queued")
        }
    }

    #[test]
    fn test_newline_translation() {
        let mut console = Console::new(Loopback::default());
        write!(console, "task{}\n", 1).unwrap();
        console.write_str("a\nb").unwrap();
        assert_eq!(console.into_inner().sent, b"task1\r\na\r\nb");
    }

    #[test]
    fn test_carriage_return_passes_through() {
        let mut console = Console::new(Loopback::default());
        console.write_bytes(b"x\ry");
        assert_eq!(console.into_inner().sent, b"x\ry");
    }

    #[test]
    fn test_read_passes_through() {
        let mut device = Loopback::default();
        device.pending.extend(b"\n?");
        let mut console = Console::new(device);
        assert_eq!(console.read_byte(), b'\n');
        assert_eq!(console.read_byte(), b'?');
    }

    #[test]
    fn test_record_format() {
        let mut out = String::new();
        write_record(
            &mut out,
            &Record::builder()
                .level(Level::Warn)
                .args(format_args!("slot {} suspended", 3))
                .build(),
        )
        .unwrap();
        assert_eq!(out, "[WARN ] slot 3 suspended\n");
    }
}
