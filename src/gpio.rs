//! Bit-banged DAC writes over GPIO.
//!
//! The DAC channels can also be loaded through discrete GPIO lines: twelve
//! data lines carry the value and one latch line per channel commits it to the
//! DAC. The lines are accessed through the Linux GPIO character device
//! (`/dev/gpiochipN`).

use anyhow::{Context, Result};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::path::PathBuf;
use std::time::Duration;

/// Default GPIO chip (AXI GPIO of the fabric).
pub const DEFAULT_CHIP: &str = "gpiochip1";

/// Number of data lines.
pub const NUM_DATA_BITS: usize = 12;

/// Line offsets of the data lines, LSB first.
pub const DATA_LINES: [u32; NUM_DATA_BITS] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

/// Time that the lines are given to settle before and during the latch pulse.
pub const SETTLE_TIME: Duration = Duration::from_micros(100);

/// Largest value that can be written.
pub const MAX_VALUE: u16 = 4095;

/// DAC channel.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Channel {
    /// DAC 0.
    Dac0,
    /// DAC 1.
    Dac1,
}

impl Channel {
    /// Line offset of the latch line of the channel.
    pub fn latch_line(self) -> u32 {
        match self {
            Channel::Dac0 => 12,
            Channel::Dac1 => 13,
        }
    }

    fn number(self) -> u8 {
        match self {
            Channel::Dac0 => 0,
            Channel::Dac1 => 1,
        }
    }
}

/// A validated DAC write.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DacWrite {
    channel: Channel,
    value: u16,
}

impl DacWrite {
    /// Validates a channel number and a value.
    ///
    /// The channel must be 0 or 1 and the value must be in `0..=4095`.
    pub fn new(channel: i64, value: i64) -> Result<DacWrite> {
        let channel = match channel {
            0 => Channel::Dac0,
            1 => Channel::Dac1,
            _ => anyhow::bail!("channel must be 0 or 1"),
        };
        let value = u16::try_from(value)
            .ok()
            .filter(|&v| v <= MAX_VALUE)
            .ok_or_else(|| anyhow::anyhow!("value must be 0-{MAX_VALUE}"))?;
        Ok(DacWrite { channel, value })
    }

    /// Channel to write.
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Value to write.
    pub fn value(&self) -> u16 {
        self.value
    }

    /// Levels of the data lines, LSB first.
    pub fn data_levels(&self) -> [bool; NUM_DATA_BITS] {
        std::array::from_fn(|bit| (self.value >> bit) & 1 != 0)
    }
}

impl std::fmt::Display for DacWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "DAC channel {} with value {}",
            self.channel.number(),
            self.value
        )
    }
}

/// A group of GPIO output lines that are set together.
pub trait OutputLines {
    /// Sets the levels of the lines, in the order in which they were
    /// requested.
    fn set_levels(&mut self, levels: &[bool]) -> Result<()>;
}

/// Drives a value into a DAC channel.
///
/// Sets the data lines, waits for them to settle, and pulses the latch line
/// high and then low.
pub fn drive(
    data: &mut impl OutputLines,
    latch: &mut impl OutputLines,
    write: &DacWrite,
) -> Result<()> {
    data.set_levels(&write.data_levels())
        .context("failed to set DAC data lines")?;
    std::thread::sleep(SETTLE_TIME);
    latch
        .set_levels(&[true])
        .context("failed to raise DAC latch line")?;
    std::thread::sleep(SETTLE_TIME);
    latch
        .set_levels(&[false])
        .context("failed to lower DAC latch line")?;
    Ok(())
}

/// GPIO chip character device.
#[derive(Debug)]
pub struct GpioChip {
    path: PathBuf,
    file: std::fs::File,
}

/// Output lines requested from a [`GpioChip`].
///
/// Dropping this struct releases the lines.
#[derive(Debug)]
pub struct LineHandle {
    fd: OwnedFd,
    num_lines: usize,
}

impl GpioChip {
    /// Opens a GPIO chip by name.
    ///
    /// The name corresponds to the filename of the character device in `/dev`.
    pub fn open(name: &str) -> Result<GpioChip> {
        let path = PathBuf::from(format!("/dev/{name}"));
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Ok(GpioChip { path, file })
    }

    /// Requests lines as outputs.
    ///
    /// All the lines are driven low until they are set.
    pub fn request_outputs(&self, offsets: &[u32], consumer: &str) -> Result<LineHandle> {
        if offsets.is_empty() || offsets.len() > ioctl::GPIOHANDLES_MAX {
            anyhow::bail!("invalid number of GPIO lines: {}", offsets.len());
        }
        let mut request = ioctl::GpioHandleRequest {
            lineoffsets: [0; ioctl::GPIOHANDLES_MAX],
            flags: ioctl::GPIOHANDLE_REQUEST_OUTPUT,
            default_values: [0; ioctl::GPIOHANDLES_MAX],
            consumer_label: [0; 32],
            lines: offsets.len() as u32,
            fd: -1,
        };
        request.lineoffsets[..offsets.len()].copy_from_slice(offsets);
        // the label must stay NUL-terminated
        for (dst, &src) in request
            .consumer_label
            .iter_mut()
            .zip(consumer.as_bytes().iter().take(31))
        {
            *dst = src as libc::c_char;
        }
        let ret = unsafe { ioctl::gpio_get_linehandle(self.file.as_raw_fd(), &mut request) };
        ret.with_context(|| {
            format!(
                "failed to request lines {offsets:?} of {}",
                self.path.display()
            )
        })?;
        if request.fd < 0 {
            anyhow::bail!("kernel returned an invalid line handle");
        }
        Ok(LineHandle {
            fd: unsafe { OwnedFd::from_raw_fd(request.fd) },
            num_lines: offsets.len(),
        })
    }
}

impl OutputLines for LineHandle {
    fn set_levels(&mut self, levels: &[bool]) -> Result<()> {
        if levels.len() != self.num_lines {
            anyhow::bail!(
                "{} levels given for {} lines",
                levels.len(),
                self.num_lines
            );
        }
        let mut data = ioctl::GpioHandleData {
            values: [0; ioctl::GPIOHANDLES_MAX],
        };
        for (dst, &level) in data.values.iter_mut().zip(levels) {
            *dst = u8::from(level);
        }
        unsafe { ioctl::gpiohandle_set_line_values(self.fd.as_raw_fd(), &mut data) }?;
        Ok(())
    }
}

/// Writes a value into a DAC channel through the GPIO lines of a chip.
///
/// The lines are requested, driven and released again.
pub fn write_dac(chip_name: &str, write: &DacWrite) -> Result<()> {
    let chip = GpioChip::open(chip_name)?;
    let mut data = chip
        .request_outputs(&DATA_LINES, "dac-data")
        .context("failed to request DAC data lines")?;
    let mut latch = chip
        .request_outputs(&[write.channel().latch_line()], "dac-clk")
        .context("failed to request DAC latch line")?;
    tracing::info!(
        chip = chip_name,
        latch_line = write.channel().latch_line(),
        value = write.value(),
        "lines requested"
    );
    drive(&mut data, &mut latch, write)?;
    tracing::info!("latched {write}");
    Ok(())
}

mod ioctl {
    use nix::ioctl_readwrite;

    pub const GPIOHANDLES_MAX: usize = 64;
    pub const GPIOHANDLE_REQUEST_OUTPUT: u32 = 1 << 1;

    const GPIO_IOC_MAGIC: u8 = 0xb4;
    const GPIO_GET_LINEHANDLE: u8 = 0x03;
    const GPIOHANDLE_SET_LINE_VALUES: u8 = 0x09;

    #[repr(C)]
    pub struct GpioHandleRequest {
        pub lineoffsets: [u32; GPIOHANDLES_MAX],
        pub flags: u32,
        pub default_values: [u8; GPIOHANDLES_MAX],
        pub consumer_label: [libc::c_char; 32],
        pub lines: u32,
        pub fd: libc::c_int,
    }

    #[repr(C)]
    pub struct GpioHandleData {
        pub values: [u8; GPIOHANDLES_MAX],
    }

    ioctl_readwrite!(
        gpio_get_linehandle,
        GPIO_IOC_MAGIC,
        GPIO_GET_LINEHANDLE,
        GpioHandleRequest
    );
    ioctl_readwrite!(
        gpiohandle_set_line_values,
        GPIO_IOC_MAGIC,
        GPIOHANDLE_SET_LINE_VALUES,
        GpioHandleData
    );
}
