//! ADC console.
//!
//! Decoding, rendering and commands for the ADC capture peripheral (LTC2203).
//! The DATA register holds the last sample as a 16-bit two's complement value
//! that spans ±10 V full scale.

use crate::console::{Action, Key, Peripheral};
use crate::display::{bar_length, DisplayFrame, Style};
use crate::registers::{
    prescaler_frequency_mhz, prescaler_step, PrescalerStep, Register, Snapshot,
};
use convctl_pac::adc;

/// Full-scale voltage of the ADC input.
pub const FULL_SCALE_VOLTS: f64 = 10.0;

const FRAME_HEIGHT: usize = 22;

/// ADC clock source.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ClockSource {
    /// External clock from the SMA connector.
    External,
    /// Internal clock derived from the prescaler.
    Internal,
}

/// Decoded ADC registers.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AdcState {
    /// Last captured sample.
    pub sample: i16,
    /// Overflow flag.
    pub overflow: bool,
    /// Output enable.
    pub output_enable: bool,
    /// Clock source.
    pub clock_source: ClockSource,
    /// Clock prescaler.
    pub prescaler: u32,
    /// Sampling clock frequency in MHz.
    pub frequency_mhz: f64,
}

impl AdcState {
    /// Decodes the ADC registers.
    pub fn decode(snapshot: &Snapshot) -> AdcState {
        AdcState {
            sample: (snapshot.data & adc::DATA_SAMPLE_MASK) as u16 as i16,
            overflow: (snapshot.data >> adc::DATA_OVERFLOW_BIT) & 1 != 0,
            output_enable: snapshot.ctrl & adc::CTRL_OUTPUT_ENABLE != 0,
            clock_source: if snapshot.ctrl & adc::CTRL_CLOCK_SOURCE != 0 {
                ClockSource::Internal
            } else {
                ClockSource::External
            },
            prescaler: snapshot.prescale,
            frequency_mhz: prescaler_frequency_mhz(snapshot.prescale),
        }
    }

    /// Voltage corresponding to the sample.
    pub fn voltage(&self) -> f64 {
        f64::from(self.sample) / 32768.0 * FULL_SCALE_VOLTS
    }

    /// Length of the bar graph for the sample.
    ///
    /// The bar is empty at -10 V, half full at 0 V and full at +10 V.
    pub fn bar(&self) -> usize {
        bar_length(i64::from(self.sample) + 32768, 65535)
    }
}

/// ADC operator command.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AdcCommand {
    /// Toggle the output enable bit.
    ToggleOutputEnable,
    /// Toggle the clock source bit.
    ToggleClockSource,
    /// Decrement the prescaler (higher sampling clock).
    SpeedUp,
    /// Increment the prescaler (lower sampling clock).
    SlowDown,
    /// Leave the console.
    Quit,
}

/// ADC peripheral.
#[derive(Debug)]
pub struct Adc;

impl Peripheral for Adc {
    type State = AdcState;
    type Command = AdcCommand;
    const NAME: &'static str = "adc";

    fn decode(snapshot: &Snapshot) -> AdcState {
        AdcState::decode(snapshot)
    }

    fn render(state: &AdcState) -> DisplayFrame {
        let mut frame = DisplayFrame::new(FRAME_HEIGHT);
        frame.put_styled(
            0,
            0,
            "=== LTC2203 ADC CONTROLLER (2's COMPLEMENT) ===",
            Style::Bold,
        );

        frame.put(2, 2, "ADC VALUE:      [      ]  (        )");
        frame.put(2, 19, &format!("{:+06}", state.sample));
        frame.put(2, 29, &format!("{:+06.2} V", state.voltage()));
        frame.put(3, 2, "ADC OVERFLOW:   [    ]");
        if state.overflow {
            frame.put_styled(3, 19, "YES!", Style::Reverse);
        } else {
            frame.put(3, 19, "NO  ");
        }

        frame.put(5, 2, "-10V [");
        frame.put_bar(5, 8, state.bar());
        frame.put(5, 68, "] +10V");
        frame.put(6, 38, "^ 0V");

        frame.put(8, 0, "=== HARDWARE REGISTERS ===");
        frame.put(10, 2, "[O] Output Enable:   [   ]");
        frame.put(10, 24, if state.output_enable { "ON " } else { "OFF" });
        frame.put(11, 2, "[C] Clock Source:    [        ]");
        frame.put(
            11,
            24,
            match state.clock_source {
                ClockSource::Internal => "INT     ",
                ClockSource::External => "EXT(SMA)",
            },
        );
        frame.put(12, 2, "[P] Clock Prescaler: [          ]");
        frame.put(12, 24, &format!("{:<10}", state.prescaler));
        frame.put(13, 2, "    Calc. Frequency: [          ]");
        frame.put(
            13,
            24,
            &format!("{:<10}", format!("{:.2} MHz", state.frequency_mhz)),
        );

        frame.put(16, 0, "=== CONTROLS ===");
        frame.put(17, 2, "'o' : Toggle Output Enable");
        frame.put(18, 2, "'c' : Toggle Clock Source");
        frame.put(19, 2, "'+' : Increase Speed");
        frame.put(20, 2, "'-' : Decrease Speed");
        frame.put(21, 2, "'q' : Quit");
        frame
    }

    fn command(key: Key) -> Option<AdcCommand> {
        Some(match key {
            Key::Char('o') => AdcCommand::ToggleOutputEnable,
            Key::Char('c') => AdcCommand::ToggleClockSource,
            Key::Char('+') => AdcCommand::SpeedUp,
            Key::Char('-') => AdcCommand::SlowDown,
            Key::Char('q') => AdcCommand::Quit,
            _ => return None,
        })
    }

    fn dispatch(command: AdcCommand, snapshot: &Snapshot) -> Action {
        match command {
            AdcCommand::ToggleOutputEnable => Action::Write {
                register: Register::Ctrl,
                value: snapshot.ctrl ^ adc::CTRL_OUTPUT_ENABLE,
            },
            AdcCommand::ToggleClockSource => Action::Write {
                register: Register::Ctrl,
                value: snapshot.ctrl ^ adc::CTRL_CLOCK_SOURCE,
            },
            AdcCommand::SpeedUp => prescaler_step(snapshot, PrescalerStep::Faster),
            AdcCommand::SlowDown => prescaler_step(snapshot, PrescalerStep::Slower),
            AdcCommand::Quit => Action::Quit,
        }
    }
}
