//! Peripheral access crate for the AXI converter peripherals.
//!
//! The ADC capture path and the DAC output path are each exposed by the FPGA
//! fabric as a bank of three consecutive 32-bit registers. This crate
//! describes that bank as a [`RegisterBlock`] and lists the bit fields of each
//! peripheral in the [`adc`] and [`dac`] modules.
//!
//! All register accesses go through [`vcell::VolatileCell`], so they are never
//! cached, merged or elided by the compiler.

#![no_std]
#![warn(missing_docs)]

use vcell::VolatileCell;

/// Register bank of one converter peripheral.
///
/// The layout is the binary contract with the FPGA fabric: DATA at byte
/// offset 0, CTRL at 4 and PRESCALE at 8.
#[repr(C)]
pub struct RegisterBlock {
    data: Reg,
    ctrl: Reg,
    prescale: Reg,
}

const _: () = {
    assert!(core::mem::offset_of!(RegisterBlock, data) == RegisterBlock::DATA_OFFSET);
    assert!(core::mem::offset_of!(RegisterBlock, ctrl) == RegisterBlock::CTRL_OFFSET);
    assert!(core::mem::offset_of!(RegisterBlock, prescale) == RegisterBlock::PRESCALE_OFFSET);
    assert!(core::mem::size_of::<RegisterBlock>() == RegisterBlock::SIZE);
};

impl RegisterBlock {
    /// Byte offset of the DATA register.
    pub const DATA_OFFSET: usize = 0x0;
    /// Byte offset of the CTRL register.
    pub const CTRL_OFFSET: usize = 0x4;
    /// Byte offset of the PRESCALE register.
    pub const PRESCALE_OFFSET: usize = 0x8;
    /// Size in bytes of the register bank.
    pub const SIZE: usize = 0xc;

    /// Creates a register block in ordinary memory.
    ///
    /// This is useful to simulate a peripheral without hardware. Register
    /// blocks that correspond to the hardware are obtained by casting a
    /// pointer to the memory-mapped device region instead.
    pub const fn new(data: u32, ctrl: u32, prescale: u32) -> RegisterBlock {
        RegisterBlock {
            data: Reg::new(data),
            ctrl: Reg::new(ctrl),
            prescale: Reg::new(prescale),
        }
    }

    /// DATA register.
    ///
    /// For the ADC this holds the last captured sample. For the DAC it holds
    /// the manual output value.
    #[inline(always)]
    pub const fn data(&self) -> &Reg {
        &self.data
    }

    /// CTRL register.
    #[inline(always)]
    pub const fn ctrl(&self) -> &Reg {
        &self.ctrl
    }

    /// PRESCALE register.
    ///
    /// Clock divider applied to the 100 MHz fabric reference clock.
    #[inline(always)]
    pub const fn prescale(&self) -> &Reg {
        &self.prescale
    }
}

/// A 32-bit read-write register.
#[repr(transparent)]
pub struct Reg {
    register: VolatileCell<u32>,
}

impl Reg {
    const fn new(value: u32) -> Reg {
        Reg {
            register: VolatileCell::new(value),
        }
    }

    /// Reads the register.
    #[inline(always)]
    pub fn read(&self) -> u32 {
        self.register.get()
    }

    /// Writes the register.
    #[inline(always)]
    pub fn write(&self, value: u32) {
        self.register.set(value)
    }
}

/// ADC bit fields.
pub mod adc {
    /// DATA: signed 16-bit sample, two's complement.
    pub const DATA_SAMPLE_MASK: u32 = 0xffff;
    /// DATA: overflow flag bit.
    pub const DATA_OVERFLOW_BIT: u32 = 16;
    /// CTRL: output enable.
    pub const CTRL_OUTPUT_ENABLE: u32 = 1 << 0;
    /// CTRL: clock source, 0 = external (SMA), 1 = internal.
    pub const CTRL_CLOCK_SOURCE: u32 = 1 << 1;
}

/// DAC bit fields.
pub mod dac {
    /// DATA: 12-bit manual output value.
    pub const DATA_VALUE_MASK: u32 = 0x0fff;
    /// CTRL: mode, 0 = passthrough, 1 = manual.
    pub const CTRL_MODE: u32 = 1 << 0;
    /// CTRL: DAC 0 clock enable.
    pub const CTRL_DAC0_ENABLE: u32 = 1 << 1;
    /// CTRL: DAC 1 clock enable.
    pub const CTRL_DAC1_ENABLE: u32 = 1 << 2;
}
