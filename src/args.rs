//! convctl CLI arguments.
//!
//! This module contains the definition of the CLI arguments for the convctl
//! application.

use crate::{devmem, gpio};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// convctl CLI arguments.
#[derive(Parser, Debug, Clone, Eq, PartialEq, Hash)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Write log messages to this file instead of standard error
    #[clap(long, global = true)]
    pub log_file: Option<PathBuf>,
    /// Program to run
    #[clap(subcommand)]
    pub command: Command,
}

/// convctl programs.
#[derive(Subcommand, Debug, Clone, Eq, PartialEq, Hash)]
pub enum Command {
    /// Interactive console for the ADC peripheral
    Adc(ConsoleArgs),
    /// Interactive console for the DAC peripheral
    Dac(ConsoleArgs),
    /// Write a value to a DAC channel by bit-banging GPIO lines
    GpioDac(GpioDacArgs),
}

/// Arguments of the ADC and DAC consoles.
#[derive(ClapArgs, Debug, Clone, Eq, PartialEq, Hash)]
pub struct ConsoleArgs {
    /// Device used to map physical memory
    #[clap(long, default_value = devmem::DEFAULT_DEVICE)]
    pub device: PathBuf,
    /// Physical address of the register bank, in decimal or 0x-prefixed hex
    /// [default: 0x80030000 for adc, 0x80040000 for dac]
    #[clap(long, value_parser = parse_address)]
    pub address: Option<u64>,
    /// Time between display updates in milliseconds [default: 200 for adc,
    /// 100 for dac]
    #[clap(long)]
    pub interval_ms: Option<u64>,
}

/// Arguments of the GPIO DAC tool.
#[derive(ClapArgs, Debug, Clone, Eq, PartialEq, Hash)]
pub struct GpioDacArgs {
    /// GPIO chip that drives the DAC lines
    #[clap(long, default_value = gpio::DEFAULT_CHIP)]
    pub chip: String,
    /// DAC channel (0 or 1)
    #[clap(allow_negative_numbers = true)]
    pub channel: i64,
    /// Value to write (0-4095)
    #[clap(allow_negative_numbers = true)]
    pub value: i64,
}

/// Parses a physical address given in decimal or in `0x`-prefixed hex.
pub fn parse_address(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => s.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid address {s:?}: {e}"))
}
