//! DAC console.
//!
//! Decoding, rendering and commands for the DAC output peripheral (LTC1666).
//! In manual mode the DAC outputs the 12-bit value held in the DATA register;
//! in passthrough mode it outputs the datapath samples.

use crate::console::{Action, Key, Peripheral};
use crate::display::{bar_length, DisplayFrame, Style};
use crate::registers::{
    prescaler_frequency_mhz, prescaler_step, PrescalerStep, Register, Snapshot,
};
use convctl_pac::dac;

/// Largest manual value.
pub const MAX_VALUE: u16 = 4095;

/// Voltage estimated for [`MAX_VALUE`].
pub const FULL_SCALE_VOLTS: f64 = 10.0;

const COARSE_STEP: u16 = 100;
const FINE_STEP: u16 = 1;

const FRAME_HEIGHT: usize = 25;

/// DAC output mode.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Mode {
    /// Output the datapath samples.
    Passthrough,
    /// Output the value of the DATA register.
    Manual,
}

/// Decoded DAC registers.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DacState {
    /// Manual output value.
    pub manual_value: u16,
    /// Output mode.
    pub mode: Mode,
    /// DAC 0 clock enable.
    pub dac0_enable: bool,
    /// DAC 1 clock enable.
    pub dac1_enable: bool,
    /// Clock prescaler.
    pub prescaler: u32,
    /// DAC clock frequency in MHz.
    pub frequency_mhz: f64,
}

impl DacState {
    /// Decodes the DAC registers.
    pub fn decode(snapshot: &Snapshot) -> DacState {
        DacState {
            manual_value: (snapshot.data & dac::DATA_VALUE_MASK) as u16,
            mode: if snapshot.ctrl & dac::CTRL_MODE != 0 {
                Mode::Manual
            } else {
                Mode::Passthrough
            },
            dac0_enable: snapshot.ctrl & dac::CTRL_DAC0_ENABLE != 0,
            dac1_enable: snapshot.ctrl & dac::CTRL_DAC1_ENABLE != 0,
            prescaler: snapshot.prescale,
            frequency_mhz: prescaler_frequency_mhz(snapshot.prescale),
        }
    }

    /// Estimated output voltage for the manual value.
    pub fn voltage(&self) -> f64 {
        f64::from(self.manual_value) / f64::from(MAX_VALUE) * FULL_SCALE_VOLTS
    }

    /// Length of the bar graph for the manual value.
    pub fn bar(&self) -> usize {
        bar_length(i64::from(self.manual_value), i64::from(MAX_VALUE))
    }
}

/// DAC operator command.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DacCommand {
    /// Toggle between passthrough and manual mode.
    ToggleMode,
    /// Toggle the DAC 0 clock enable.
    ToggleDac0,
    /// Toggle the DAC 1 clock enable.
    ToggleDac1,
    /// Add 100 to the manual value.
    CoarseUp,
    /// Subtract 100 from the manual value.
    CoarseDown,
    /// Add 1 to the manual value.
    FineUp,
    /// Subtract 1 from the manual value.
    FineDown,
    /// Decrement the prescaler (higher DAC clock).
    SpeedUp,
    /// Increment the prescaler (lower DAC clock).
    SlowDown,
    /// Leave the console.
    Quit,
}

/// DAC peripheral.
#[derive(Debug)]
pub struct Dac;

impl Dac {
    fn write_value(value: u16) -> Action {
        Action::Write {
            register: Register::Data,
            value: u32::from(value),
        }
    }

    fn toggle_ctrl(snapshot: &Snapshot, mask: u32) -> Action {
        Action::Write {
            register: Register::Ctrl,
            value: snapshot.ctrl ^ mask,
        }
    }
}

impl Peripheral for Dac {
    type State = DacState;
    type Command = DacCommand;
    const NAME: &'static str = "dac";

    fn decode(snapshot: &Snapshot) -> DacState {
        DacState::decode(snapshot)
    }

    fn render(state: &DacState) -> DisplayFrame {
        fn on_off(frame: &mut DisplayFrame, row: usize, enabled: bool) {
            if enabled {
                frame.put_styled(row, 20, "ON   ", Style::Reverse);
            } else {
                frame.put(row, 20, "OFF  ");
            }
        }

        let mut frame = DisplayFrame::new(FRAME_HEIGHT);
        frame.put_styled(0, 0, "=== LTC1666 DAC CONTROLLER (AXI) ===", Style::Bold);

        frame.put(2, 2, "DAC SOURCE:      [             ]");
        frame.put(
            2,
            20,
            match state.mode {
                Mode::Manual => "MANUAL (REG0)",
                Mode::Passthrough => "PASSTHROUGH  ",
            },
        );
        frame.put(3, 2, "DAC 0 CLOCK:     [     ]");
        on_off(&mut frame, 3, state.dac0_enable);
        frame.put(4, 2, "DAC 1 CLOCK:     [     ]");
        on_off(&mut frame, 4, state.dac1_enable);

        frame.put(6, 0, "=== OUTPUT DATA ===");
        frame.put(7, 2, "MANUAL VALUE:    [    ] (0-4095)");
        frame.put(7, 20, &format!("{:04}", state.manual_value));
        frame.put(8, 2, "EST. VOLTAGE:    [       ] (0-10V Scale)");
        frame.put(8, 20, &format!("{:5.2} V", state.voltage()));

        frame.put(10, 2, "0 [");
        frame.put_bar(10, 5, state.bar());
        frame.put(10, 65, "] 4095");

        frame.put(13, 0, "=== TIMING ===");
        frame.put(14, 2, "[P] Prescaler:   [          ]");
        frame.put(14, 20, &format!("{:<10}", state.prescaler));
        frame.put(15, 2, "    Calc Freq:   [          ] MHz");
        frame.put(
            15,
            20,
            &format!("{:<10}", format!("{:.2}", state.frequency_mhz)),
        );

        frame.put(18, 0, "=== CONTROLS ===");
        frame.put(19, 2, "'m'       : Toggle Mode (Manual / Passthrough)");
        frame.put(20, 2, "'0' / '1' : Toggle DAC Channels");
        frame.put(21, 2, "UP/DOWN   : Adjust Value (+/- 100)");
        frame.put(22, 2, "LEFT/RIGHT: Fine Tune (+/- 1)");
        frame.put(23, 2, "']' / '[' : Adjust Speed");
        frame.put(24, 2, "'q'       : Quit");
        frame
    }

    fn command(key: Key) -> Option<DacCommand> {
        Some(match key {
            Key::Char('m') => DacCommand::ToggleMode,
            Key::Char('0') => DacCommand::ToggleDac0,
            Key::Char('1') => DacCommand::ToggleDac1,
            Key::Up => DacCommand::CoarseUp,
            Key::Down => DacCommand::CoarseDown,
            Key::Right => DacCommand::FineUp,
            Key::Left => DacCommand::FineDown,
            Key::Char('[') => DacCommand::SpeedUp,
            Key::Char(']') => DacCommand::SlowDown,
            Key::Char('q') => DacCommand::Quit,
            _ => return None,
        })
    }

    fn dispatch(command: DacCommand, snapshot: &Snapshot) -> Action {
        let value = DacState::decode(snapshot).manual_value;
        match command {
            DacCommand::ToggleMode => Dac::toggle_ctrl(snapshot, dac::CTRL_MODE),
            DacCommand::ToggleDac0 => Dac::toggle_ctrl(snapshot, dac::CTRL_DAC0_ENABLE),
            DacCommand::ToggleDac1 => Dac::toggle_ctrl(snapshot, dac::CTRL_DAC1_ENABLE),
            DacCommand::CoarseUp => Dac::write_value((value + COARSE_STEP).min(MAX_VALUE)),
            DacCommand::CoarseDown => Dac::write_value(value.saturating_sub(COARSE_STEP)),
            // fine steps at the range limits do not write anything
            DacCommand::FineUp if value < MAX_VALUE => Dac::write_value(value + FINE_STEP),
            DacCommand::FineDown if value > 0 => Dac::write_value(value - FINE_STEP),
            DacCommand::FineUp | DacCommand::FineDown => Action::None,
            DacCommand::SpeedUp => prescaler_step(snapshot, PrescalerStep::Faster),
            DacCommand::SlowDown => prescaler_step(snapshot, PrescalerStep::Slower),
            DacCommand::Quit => Action::Quit,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::console::{script::ScriptedScreen, Console};
    use crate::display::BAR_CELLS;
    use crate::registers::RegisterSurface;
    use convctl_pac::RegisterBlock;
    use std::time::Duration;

    fn snapshot(data: u32, ctrl: u32, prescale: u32) -> Snapshot {
        Snapshot {
            data,
            ctrl,
            prescale,
        }
    }

    fn data_write(command: DacCommand, data: u32) -> Action {
        Dac::dispatch(command, &snapshot(data, 0, 0))
    }

    #[test]
    fn decode() {
        let state = DacState::decode(&snapshot(0xffff_f123, 0b101, 1));
        assert_eq!(state.manual_value, 0x123);
        assert_eq!(state.mode, Mode::Manual);
        assert!(!state.dac0_enable);
        assert!(state.dac1_enable);
        assert_eq!(state.frequency_mhz, 25.0);
        let state = DacState::decode(&snapshot(0, 0b010, 0));
        assert_eq!(state.mode, Mode::Passthrough);
        assert!(state.dac0_enable);
        assert!(!state.dac1_enable);
    }

    #[test]
    fn voltage_and_bar() {
        let mut last_bar = 0;
        let mut last_voltage = -1.0;
        for value in 0..=MAX_VALUE {
            let state = DacState::decode(&snapshot(u32::from(value), 0, 0));
            let bar = state.bar();
            assert!(bar <= BAR_CELLS && bar >= last_bar);
            assert!(state.voltage() > last_voltage);
            last_bar = bar;
            last_voltage = state.voltage();
        }
        assert_eq!(DacState::decode(&snapshot(0, 0, 0)).bar(), 0);
        assert_eq!(DacState::decode(&snapshot(0xffff, 0, 0)).bar(), BAR_CELLS);
        assert_eq!(DacState::decode(&snapshot(0xfff, 0, 0)).voltage(), 10.0);
    }

    #[test]
    fn layout() {
        let state = DacState::decode(&snapshot(0x0fff_f123, 0b101, 1));
        let frame = Dac::render(&state);
        let rows = frame.rows();
        assert_eq!(rows.len(), FRAME_HEIGHT);
        assert_eq!(rows[0], "=== LTC1666 DAC CONTROLLER (AXI) ===");
        assert_eq!(rows[2], "  DAC SOURCE:      [MANUAL (REG0)]");
        assert_eq!(rows[3], "  DAC 0 CLOCK:     [OFF  ]");
        assert_eq!(rows[4], "  DAC 1 CLOCK:     [ON   ]");
        assert_eq!(rows[7], "  MANUAL VALUE:    [0291] (0-4095)");
        assert_eq!(rows[8], "  EST. VOLTAGE:    [ 0.71 V] (0-10V Scale)");
        assert_eq!(
            rows[10],
            format!("  0 [{}{}] 4095", "#".repeat(4), " ".repeat(56))
        );
        assert_eq!(rows[14], "  [P] Prescaler:   [1         ]");
        assert_eq!(rows[15], "      Calc Freq:   [25.00     ] MHz");
        assert_eq!(rows[24], "  'q'       : Quit");
        assert_eq!(frame.bar(), 4);

        let reversed: Vec<_> = frame
            .spans()
            .iter()
            .filter(|span| span.style == Style::Reverse)
            .map(|span| (span.row, frame.span_text(span)))
            .collect();
        assert_eq!(reversed, [(4, "ON   ".to_string())]);
    }

    #[test]
    fn layout_passthrough() {
        let frame = Dac::render(&DacState::decode(&snapshot(4095, 0b110, 0)));
        let rows = frame.rows();
        assert_eq!(rows[2], "  DAC SOURCE:      [PASSTHROUGH  ]");
        assert_eq!(rows[3], "  DAC 0 CLOCK:     [ON   ]");
        assert_eq!(rows[7], "  MANUAL VALUE:    [4095] (0-4095)");
        assert_eq!(rows[8], "  EST. VOLTAGE:    [10.00 V] (0-10V Scale)");
        assert_eq!(rows[10], format!("  0 [{}] 4095", "#".repeat(60)));
        assert_eq!(rows[15], "      Calc Freq:   [50.00     ] MHz");
    }

    #[test]
    fn render_is_deterministic() {
        let state = DacState::decode(&snapshot(2048, 0b111, 12345));
        assert_eq!(Dac::render(&state), Dac::render(&state));
    }

    #[test]
    fn keys() {
        assert_eq!(Dac::command(Key::Char('m')), Some(DacCommand::ToggleMode));
        assert_eq!(Dac::command(Key::Char('0')), Some(DacCommand::ToggleDac0));
        assert_eq!(Dac::command(Key::Char('1')), Some(DacCommand::ToggleDac1));
        assert_eq!(Dac::command(Key::Up), Some(DacCommand::CoarseUp));
        assert_eq!(Dac::command(Key::Down), Some(DacCommand::CoarseDown));
        assert_eq!(Dac::command(Key::Right), Some(DacCommand::FineUp));
        assert_eq!(Dac::command(Key::Left), Some(DacCommand::FineDown));
        assert_eq!(Dac::command(Key::Char('[')), Some(DacCommand::SpeedUp));
        assert_eq!(Dac::command(Key::Char(']')), Some(DacCommand::SlowDown));
        assert_eq!(Dac::command(Key::Char('q')), Some(DacCommand::Quit));
        assert_eq!(Dac::command(Key::Char('o')), None);
        assert_eq!(Dac::command(Key::Char('+')), None);
    }

    #[test]
    fn coarse_steps_clamp() {
        assert_eq!(data_write(DacCommand::CoarseUp, 4050), Dac::write_value(4095));
        assert_eq!(data_write(DacCommand::CoarseUp, 4095), Dac::write_value(4095));
        assert_eq!(data_write(DacCommand::CoarseUp, 100), Dac::write_value(200));
        assert_eq!(data_write(DacCommand::CoarseDown, 50), Dac::write_value(0));
        assert_eq!(data_write(DacCommand::CoarseDown, 250), Dac::write_value(150));
    }

    #[test]
    fn fine_steps_clamp() {
        assert_eq!(data_write(DacCommand::FineDown, 0), Action::None);
        assert_eq!(data_write(DacCommand::FineUp, 4095), Action::None);
        assert_eq!(data_write(DacCommand::FineUp, 0), Dac::write_value(1));
        assert_eq!(data_write(DacCommand::FineDown, 4095), Dac::write_value(4094));
    }

    #[test]
    fn steps_use_the_masked_value() {
        // bits above the 12-bit field are not part of the value
        assert_eq!(
            data_write(DacCommand::FineUp, 0xabc0_0010),
            Dac::write_value(0x11)
        );
    }

    #[test]
    fn toggles_are_involutions() {
        for command in [
            DacCommand::ToggleMode,
            DacCommand::ToggleDac0,
            DacCommand::ToggleDac1,
        ] {
            let Action::Write { register, value } = Dac::dispatch(command, &snapshot(0, 0b011, 0))
            else {
                panic!("toggle does not write");
            };
            assert_eq!(register, Register::Ctrl);
            assert_eq!(
                Dac::dispatch(command, &snapshot(0, value, 0)),
                Action::Write {
                    register: Register::Ctrl,
                    value: 0b011
                }
            );
        }
    }

    #[test]
    fn prescaler_steps() {
        assert_eq!(
            Dac::dispatch(DacCommand::SpeedUp, &snapshot(0, 0, 0)),
            Action::None
        );
        assert_eq!(
            Dac::dispatch(DacCommand::SlowDown, &snapshot(0, 0, 0)),
            Action::Write {
                register: Register::Prescale,
                value: 1
            }
        );
        assert_eq!(
            Dac::dispatch(DacCommand::SlowDown, &snapshot(0, 0, u32::MAX)),
            Action::Write {
                register: Register::Prescale,
                value: 0
            }
        );
    }

    #[test]
    fn console_session() {
        let block = RegisterBlock::new(4050, 0, 0);
        let screen = ScriptedScreen::new([
            Some(Key::Up),
            Some(Key::Right),
            Some(Key::Char('m')),
            Some(Key::Char('1')),
            Some(Key::Char(']')),
            Some(Key::Char(']')),
            Some(Key::Char('[')),
            None,
            Some(Key::Char('x')),
            Some(Key::Char('q')),
        ]);
        let mut console = Console::<Dac, _, _>::new(block, screen, Duration::ZERO);
        let mut cycles = 1;
        while console.cycle().unwrap() {
            cycles += 1;
        }
        assert_eq!(cycles, 10);
        let (block, screen) = console.into_parts();
        assert_eq!(
            block.snapshot(),
            Snapshot {
                data: 4095,
                ctrl: 0b101,
                prescale: 1
            }
        );
        assert_eq!(screen.frames[1].rows()[7], "  MANUAL VALUE:    [4095] (0-4095)");
    }

    #[test]
    fn unrecognized_keys_leave_registers_unchanged() {
        let keys = ['o', 'c', '+', '-', 'Q', 'x', 'M', '2', ' '];
        let block = RegisterBlock::new(0x0abc, 0b011, 42);
        let screen = ScriptedScreen::new(keys.iter().map(|&c| Some(Key::Char(c))));
        let mut console = Console::<Dac, _, _>::new(block, screen, Duration::ZERO);
        for _ in 0..keys.len() {
            assert!(console.cycle().unwrap());
        }
        let (block, screen) = console.into_parts();
        assert_eq!(
            block.snapshot(),
            Snapshot {
                data: 0x0abc,
                ctrl: 0b011,
                prescale: 42
            }
        );
        assert_eq!(screen.frames.len(), keys.len());
    }
}
