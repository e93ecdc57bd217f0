//! # USART2 Driver
//!
//! Blocking polled driver for the STM32F4 USART2 on PA2 (TX) / PA3 (RX),
//! 8N1 at [`UART_BAUD`]. This is the only module that knows the UART's
//! register addresses.

use core::ptr::{read_volatile, write_volatile};

use crate::config::{APB1_CLOCK_HZ, UART_BAUD};
use crate::console::{ByteRead, ByteWrite};

// RCC
const RCC_AHB1ENR: *mut u32 = 0x4002_3830 as *mut u32;
const RCC_APB1ENR: *mut u32 = 0x4002_3840 as *mut u32;
const GPIOAEN: u32 = 1 << 0;
const USART2EN: u32 = 1 << 17;

// GPIOA
const GPIOA_MODER: *mut u32 = 0x4002_0000 as *mut u32;
const GPIOA_AFRL: *mut u32 = 0x4002_0020 as *mut u32;
const AF7_USART: u32 = 7;

// USART2
const USART2_BASE: usize = 0x4000_4400;
const SR: *mut u32 = USART2_BASE as *mut u32;
const DR: *mut u32 = (USART2_BASE + 0x04) as *mut u32;
const BRR: *mut u32 = (USART2_BASE + 0x08) as *mut u32;
const CR1: *mut u32 = (USART2_BASE + 0x0C) as *mut u32;

const SR_RXNE: u32 = 1 << 5;
const SR_TXE: u32 = 1 << 7;
const CR1_RE: u32 = 1 << 2;
const CR1_TE: u32 = 1 << 3;
const CR1_UE: u32 = 1 << 13;

/// Owned handle to USART2.
pub struct Usart2 {
    _private: (),
}

impl Usart2 {
    /// Enable clocks, route PA2/PA3 to the USART, and enable TX and RX.
    ///
    /// # Safety
    /// Takes the peripheral over unconditionally; call once.
    pub unsafe fn init() -> Self {
        let set = |reg: *mut u32, mask: u32, value: u32| {
            let v = read_volatile(reg);
            write_volatile(reg, (v & !mask) | value);
        };

        set(RCC_AHB1ENR, GPIOAEN, GPIOAEN);
        set(RCC_APB1ENR, USART2EN, USART2EN);

        // PA2, PA3: alternate function mode (0b10), AF7
        set(GPIOA_MODER, 0b1111 << 4, (0b10 << 4) | (0b10 << 6));
        set(GPIOA_AFRL, 0xFF << 8, (AF7_USART << 8) | (AF7_USART << 12));

        write_volatile(CR1, 0);
        // Divider rounded to nearest
        write_volatile(BRR, (APB1_CLOCK_HZ + UART_BAUD / 2) / UART_BAUD);
        write_volatile(CR1, CR1_UE | CR1_TE | CR1_RE);

        Self { _private: () }
    }
}

impl ByteWrite for Usart2 {
    fn write_byte(&mut self, byte: u8) {
        unsafe {
            while read_volatile(SR) & SR_TXE == 0 {}
            write_volatile(DR, byte as u32);
        }
    }
}

impl ByteRead for Usart2 {
    fn read_byte(&mut self) -> u8 {
        unsafe {
            while read_volatile(SR) & SR_RXNE == 0 {}
            read_volatile(DR) as u8
        }
    }
}
