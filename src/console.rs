//! Register control loop.
//!
//! This module contains the control loop shared by the ADC and DAC consoles.
//! Each cycle of the loop reads the register bank once, decodes and renders
//! the values, polls for a key and dispatches at most one command, and then
//! sleeps for a fixed interval.

use crate::display::DisplayFrame;
use crate::registers::{Register, RegisterSurface, Snapshot};
use anyhow::Result;
use std::time::Duration;

/// Key pressed by the operator.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    /// Printable character.
    Char(char),
    /// Arrow up.
    Up,
    /// Arrow down.
    Down,
    /// Arrow left.
    Left,
    /// Arrow right.
    Right,
}

/// Effect of a command on the register bank.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Action {
    /// Nothing to do.
    None,
    /// Write a new value to a register.
    Write {
        /// Register to write.
        register: Register,
        /// Value to write.
        value: u32,
    },
    /// Leave the control loop.
    Quit,
}

/// Converter peripheral.
///
/// This trait contains the decoder, renderer and command dispatcher of one
/// kind of peripheral. All the functions are pure: the register bank is only
/// accessed by the [`Console`], which also logs the writes.
pub trait Peripheral {
    /// Decoded register values.
    type State;
    /// Operator command.
    type Command: std::fmt::Debug + Copy;

    /// Name of the peripheral, used in logs.
    const NAME: &'static str;

    /// Decodes the raw register values.
    fn decode(snapshot: &Snapshot) -> Self::State;

    /// Renders decoded values into a frame.
    fn render(state: &Self::State) -> DisplayFrame;

    /// Maps a key to a command.
    ///
    /// Returns `None` if the key has no meaning for this peripheral.
    fn command(key: Key) -> Option<Self::Command>;

    /// Computes the effect of a command.
    ///
    /// The `snapshot` must have been read in the same cycle in which the
    /// command is dispatched.
    fn dispatch(command: Self::Command, snapshot: &Snapshot) -> Action;
}

/// Display and keyboard of the console.
pub trait Screen {
    /// Draws a complete frame.
    fn draw(&mut self, frame: &DisplayFrame) -> Result<()>;

    /// Returns the next pending key without waiting.
    ///
    /// Returns `None` if no key is pending.
    fn poll_key(&mut self) -> Result<Option<Key>>;
}

/// Console control loop.
///
/// The console owns its register surface and its screen for its whole
/// lifetime. The screen is dropped before the register surface.
#[derive(Debug)]
pub struct Console<P, R, S> {
    screen: S,
    registers: R,
    interval: Duration,
    _peripheral: std::marker::PhantomData<P>,
}

impl<P: Peripheral, R: RegisterSurface, S: Screen> Console<P, R, S> {
    /// Creates a new console.
    ///
    /// The `interval` is the time that the control loop sleeps after each
    /// cycle.
    pub fn new(registers: R, screen: S, interval: Duration) -> Console<P, R, S> {
        Console {
            screen,
            registers,
            interval,
            _peripheral: std::marker::PhantomData,
        }
    }

    /// Runs one cycle of the control loop without sleeping.
    ///
    /// Returns `false` if the operator has quit.
    pub fn cycle(&mut self) -> Result<bool> {
        let snapshot = self.registers.snapshot();
        tracing::trace!(
            data = snapshot.data,
            ctrl = snapshot.ctrl,
            prescale = snapshot.prescale
        );
        let state = P::decode(&snapshot);
        self.screen.draw(&P::render(&state))?;

        let Some(key) = self.screen.poll_key()? else {
            return Ok(true);
        };
        let Some(command) = P::command(key) else {
            tracing::trace!(?key, "ignoring key");
            return Ok(true);
        };
        match P::dispatch(command, &snapshot) {
            Action::None => Ok(true),
            Action::Write { register, value } => {
                let old = snapshot.get(register);
                tracing::debug!(
                    ?command,
                    offset = register.offset(),
                    "writing {register}: {old:#010x} -> {value:#010x}"
                );
                if register == Register::Prescale && old == u32::MAX && value == 0 {
                    tracing::warn!("prescaler wrapped around to 0");
                }
                self.registers.write(register, value);
                Ok(true)
            }
            Action::Quit => Ok(false),
        }
    }

    /// Runs the control loop.
    ///
    /// This only returns when the operator quits or when the screen fails.
    #[tracing::instrument(name = "console", skip_all, fields(peripheral = P::NAME))]
    pub async fn run(mut self) -> Result<()> {
        tracing::info!(interval_ms = self.interval.as_millis(), "console started");
        while self.cycle()? {
            tokio::time::sleep(self.interval).await;
        }
        tracing::info!("console stopped");
        Ok(())
    }

    /// Gives back the register surface and the screen.
    pub fn into_parts(self) -> (R, S) {
        (self.registers, self.screen)
    }
}
