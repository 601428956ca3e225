//! convctl application.
//!
//! This module contains a top-level structure [`App`] that represents the
//! program selected on the command line together with the resources that it
//! has acquired.

use crate::{
    adc::Adc,
    args::{Args, Command, ConsoleArgs},
    console::{Console, Peripheral},
    dac::Dac,
    devmem::DevMem,
    gpio::{self, DacWrite},
    registers::{self, RegisterBank},
    terminal::Terminal,
};
use anyhow::Result;
use std::time::Duration;

/// convctl application.
///
/// For the consoles, the register bank is mapped and the terminal is taken
/// over when the application is created. They are released when the
/// application finishes or is dropped, terminal first.
#[derive(Debug)]
pub enum App {
    /// ADC console.
    Adc(Console<Adc, RegisterBank, Terminal>),
    /// DAC console.
    Dac(Console<Dac, RegisterBank, Terminal>),
    /// GPIO DAC write.
    GpioDac {
        /// Name of the GPIO chip.
        chip: String,
        /// Validated write.
        write: DacWrite,
    },
}

impl App {
    /// Creates a new application.
    ///
    /// Fails if the hardware cannot be accessed or the arguments are out of
    /// range. Nothing is written to the hardware in that case.
    #[tracing::instrument(name = "App::new", level = "debug")]
    pub async fn new(args: &Args) -> Result<App> {
        Ok(match &args.command {
            Command::Adc(args) => App::Adc(
                open_console(args, registers::ADC_BASE_ADDRESS, Duration::from_millis(200))
                    .await?,
            ),
            Command::Dac(args) => App::Dac(
                open_console(args, registers::DAC_BASE_ADDRESS, Duration::from_millis(100))
                    .await?,
            ),
            Command::GpioDac(args) => App::GpioDac {
                chip: args.chip.clone(),
                write: DacWrite::new(args.channel, args.value)?,
            },
        })
    }

    /// Runs the application.
    ///
    /// For the consoles, this returns when the operator quits.
    #[tracing::instrument(name = "App::run", level = "debug", skip_all)]
    pub async fn run(self) -> Result<()> {
        match self {
            App::Adc(console) => console.run().await,
            App::Dac(console) => console.run().await,
            App::GpioDac { chip, write } => {
                println!("Driving {write}");
                gpio::write_dac(&chip, &write)?;
                println!("Done.");
                Ok(())
            }
        }
    }
}

async fn open_console<P: Peripheral>(
    args: &ConsoleArgs,
    default_address: u64,
    default_interval: Duration,
) -> Result<Console<P, RegisterBank, Terminal>> {
    let address = args.address.unwrap_or(default_address);
    let interval = args
        .interval_ms
        .map_or(default_interval, Duration::from_millis);
    // the mapping stays valid after the device is closed
    let bank = RegisterBank::map(&DevMem::open(&args.device).await?, address)?;
    let terminal = Terminal::enter()?;
    Ok(Console::new(bank, terminal, interval))
}
