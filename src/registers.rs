//! Converter register bank.
//!
//! This module gives access to the three registers of an ADC or DAC
//! peripheral. Registers can only be addressed through [`Register`], and every
//! access is a volatile access to the device.

use crate::console::Action;
use crate::devmem::{DevMem, Mapping};
use anyhow::{Context, Result};
use convctl_pac::RegisterBlock;

/// Default physical address of the ADC register bank.
pub const ADC_BASE_ADDRESS: u64 = 0x8003_0000;
/// Default physical address of the DAC register bank.
pub const DAC_BASE_ADDRESS: u64 = 0x8004_0000;

/// Frequency in MHz of the reference clock divided by the prescalers.
pub const REFERENCE_CLOCK_MHZ: f64 = 100.0;

/// Computes the clock frequency produced by a prescaler value.
///
/// The result is given in MHz. The divider always divides by at least 2, so
/// the function is defined for every prescaler value.
pub fn prescaler_frequency_mhz(prescaler: u32) -> f64 {
    REFERENCE_CLOCK_MHZ / (2.0 * (f64::from(prescaler) + 1.0))
}

/// Direction of a prescaler step.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PrescalerStep {
    /// Decrement the prescaler (higher clock frequency).
    Faster,
    /// Increment the prescaler (lower clock frequency).
    Slower,
}

/// Computes the prescaler write for a step.
///
/// Stepping faster stops at 0 without writing. Stepping slower has no upper
/// limit and wraps around from `u32::MAX` to 0.
pub fn prescaler_step(snapshot: &Snapshot, step: PrescalerStep) -> Action {
    let value = match step {
        PrescalerStep::Faster => match snapshot.prescale.checked_sub(1) {
            Some(value) => value,
            None => return Action::None,
        },
        PrescalerStep::Slower => snapshot.prescale.wrapping_add(1),
    };
    Action::Write {
        register: Register::Prescale,
        value,
    }
}

/// A register of the bank.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Register {
    /// DATA register (offset 0x0).
    Data,
    /// CTRL register (offset 0x4).
    Ctrl,
    /// PRESCALE register (offset 0x8).
    Prescale,
}

impl Register {
    /// Byte offset of the register in the bank.
    pub fn offset(self) -> usize {
        match self {
            Register::Data => RegisterBlock::DATA_OFFSET,
            Register::Ctrl => RegisterBlock::CTRL_OFFSET,
            Register::Prescale => RegisterBlock::PRESCALE_OFFSET,
        }
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        let name = match self {
            Register::Data => "DATA",
            Register::Ctrl => "CTRL",
            Register::Prescale => "PRESCALE",
        };
        write!(f, "{name}")
    }
}

/// Raw register values read in one cycle of the control loop.
///
/// A snapshot is only meaningful during the cycle in which it was taken. The
/// hardware keeps changing the registers after it has been read.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Snapshot {
    /// Value of the DATA register.
    pub data: u32,
    /// Value of the CTRL register.
    pub ctrl: u32,
    /// Value of the PRESCALE register.
    pub prescale: u32,
}

impl Snapshot {
    /// Gives the value that a register had in this snapshot.
    pub fn get(&self, register: Register) -> u32 {
        match register {
            Register::Data => self.data,
            Register::Ctrl => self.ctrl,
            Register::Prescale => self.prescale,
        }
    }
}

/// Access to a converter register bank.
pub trait RegisterSurface {
    /// Gives the register block that backs this surface.
    fn block(&self) -> &RegisterBlock;

    /// Reads a register.
    fn read(&self, register: Register) -> u32 {
        let block = self.block();
        match register {
            Register::Data => block.data().read(),
            Register::Ctrl => block.ctrl().read(),
            Register::Prescale => block.prescale().read(),
        }
    }

    /// Writes a register.
    fn write(&self, register: Register, value: u32) {
        let block = self.block();
        match register {
            Register::Data => block.data().write(value),
            Register::Ctrl => block.ctrl().write(value),
            Register::Prescale => block.prescale().write(value),
        }
    }

    /// Reads each of the three registers once.
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            data: self.read(Register::Data),
            ctrl: self.read(Register::Ctrl),
            prescale: self.read(Register::Prescale),
        }
    }
}

/// A register block in ordinary memory behaves as a simulated peripheral.
impl RegisterSurface for RegisterBlock {
    fn block(&self) -> &RegisterBlock {
        self
    }
}

/// Memory-mapped register bank.
///
/// This struct owns the mapping of the page that contains the register bank
/// of one peripheral. Dropping it unmaps the page.
#[derive(Debug)]
pub struct RegisterBank(Mapping);

impl RegisterBank {
    /// Maps the register bank found at a physical address.
    pub fn map(devmem: &DevMem, phys_addr: u64) -> Result<RegisterBank> {
        if phys_addr % 4 != 0 {
            anyhow::bail!("register bank address {phys_addr:#010x} is not 32-bit aligned");
        }
        let mapping = devmem
            .map_page(phys_addr, RegisterBlock::SIZE)
            .with_context(|| format!("failed to map register bank at {phys_addr:#010x}"))?;
        tracing::info!(
            "mapped register bank at physical address {:#010x} through {}",
            mapping.phys_addr(),
            devmem.path().display()
        );
        Ok(RegisterBank(mapping))
    }
}

impl std::ops::Deref for RegisterBank {
    type Target = RegisterBlock;
    fn deref(&self) -> &Self::Target {
        unsafe { &*(self.0.addr() as *const RegisterBlock) }
    }
}

impl RegisterSurface for RegisterBank {
    fn block(&self) -> &RegisterBlock {
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn offsets() {
        assert_eq!(Register::Data.offset(), 0);
        assert_eq!(Register::Ctrl.offset(), 4);
        assert_eq!(Register::Prescale.offset(), 8);
    }

    #[test]
    fn write_then_read() {
        let block = RegisterBlock::new(0, 0, 0);
        block.write(Register::Ctrl, 0x5);
        block.write(Register::Prescale, 99);
        assert_eq!(block.read(Register::Data), 0);
        assert_eq!(block.read(Register::Ctrl), 0x5);
        assert_eq!(block.read(Register::Prescale), 99);
    }

    #[test]
    fn snapshot_reads_all_registers() {
        let block = RegisterBlock::new(0x1_8000, 0x3, 7);
        let snapshot = block.snapshot();
        assert_eq!(
            snapshot,
            Snapshot {
                data: 0x1_8000,
                ctrl: 0x3,
                prescale: 7
            }
        );
        assert_eq!(snapshot.get(Register::Prescale), 7);
    }

    #[test]
    fn frequency() {
        assert_eq!(prescaler_frequency_mhz(0), 50.0);
        assert_eq!(prescaler_frequency_mhz(1), 25.0);
        assert_eq!(prescaler_frequency_mhz(99), 0.5);
        let slowest = prescaler_frequency_mhz(u32::MAX);
        assert!(slowest.is_finite() && slowest > 0.0);
    }

    #[test]
    fn prescaler_steps() {
        let at = |prescale| Snapshot {
            prescale,
            ..Snapshot::default()
        };
        let write = |value| Action::Write {
            register: Register::Prescale,
            value,
        };
        assert_eq!(prescaler_step(&at(5), PrescalerStep::Faster), write(4));
        assert_eq!(prescaler_step(&at(0), PrescalerStep::Faster), Action::None);
        assert_eq!(prescaler_step(&at(5), PrescalerStep::Slower), write(6));
        assert_eq!(prescaler_step(&at(u32::MAX), PrescalerStep::Slower), write(0));
    }

    #[tokio::test]
    async fn bank_over_file() {
        // MAP_SHARED of a regular file stands in for /dev/mem
        let path = std::env::temp_dir().join(format!("convctl-bank-{}", std::process::id()));
        let mut contents = vec![0u8; page_size::get()];
        for (offset, word) in [(0x10, 0x1234_5678u32), (0x14, 3), (0x18, 99)] {
            contents[offset..offset + 4].copy_from_slice(&word.to_ne_bytes());
        }
        std::fs::write(&path, &contents).unwrap();

        let mem = DevMem::open(&path).await.unwrap();
        let bank = RegisterBank::map(&mem, 0x10).unwrap();
        assert_eq!(
            bank.snapshot(),
            Snapshot {
                data: 0x1234_5678,
                ctrl: 3,
                prescale: 99
            }
        );
        bank.write(Register::Prescale, 7);
        assert_eq!(bank.read(Register::Prescale), 7);
        drop(bank);

        let contents = std::fs::read(&path).unwrap();
        assert_eq!(contents[0x18..0x1c], 7u32.to_ne_bytes());
        assert_eq!(contents[0x10..0x14], 0x1234_5678u32.to_ne_bytes());

        let err = RegisterBank::map(&mem, 0x11).unwrap_err();
        assert!(err.to_string().contains("not 32-bit aligned"));
        let last_word = page_size::get() as u64 - 8;
        assert!(RegisterBank::map(&mem, last_word).is_err());

        drop(mem);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn register_names() {
        assert_eq!(Register::Prescale.to_string(), "PRESCALE");
    }
}
