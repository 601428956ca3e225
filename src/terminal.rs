//! Full-screen terminal.
//!
//! This module implements the [`Screen`] of the consoles on top of
//! [crossterm](mod@crossterm). The terminal is switched to raw mode and to the
//! alternate screen while the [`Terminal`] exists, and restored when it is
//! dropped.

use crate::console::{Key, Screen};
use crate::display::{DisplayFrame, Style};
use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    style::{Attribute, Print, SetAttribute},
    terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{Stdout, Write};
use std::time::Duration;

/// Terminal screen.
#[derive(Debug)]
pub struct Terminal {
    out: Stdout,
}

impl Terminal {
    /// Takes over the terminal.
    ///
    /// Enables raw mode, enters the alternate screen and hides the cursor.
    pub fn enter() -> Result<Terminal> {
        crossterm::terminal::enable_raw_mode().context("failed to enable terminal raw mode")?;
        // from here on, Drop restores the terminal even if the rest fails
        let mut terminal = Terminal {
            out: std::io::stdout(),
        };
        crossterm::execute!(
            terminal.out,
            EnterAlternateScreen,
            Hide,
            Clear(ClearType::All)
        )
        .context("failed to set up terminal")?;
        Ok(terminal)
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = crossterm::execute!(
            self.out,
            SetAttribute(Attribute::Reset),
            Show,
            LeaveAlternateScreen
        );
        let _ = crossterm::terminal::disable_raw_mode();
    }
}

impl Screen for Terminal {
    fn draw(&mut self, frame: &DisplayFrame) -> Result<()> {
        for row in 0..frame.height() {
            crossterm::queue!(self.out, MoveTo(0, row as u16), Print(frame.row(row)))?;
        }
        for span in frame.spans() {
            let attribute = match span.style {
                Style::Bold => Attribute::Bold,
                Style::Reverse => Attribute::Reverse,
            };
            crossterm::queue!(
                self.out,
                MoveTo(span.col as u16, span.row as u16),
                SetAttribute(attribute),
                Print(frame.span_text(span)),
                SetAttribute(Attribute::Reset)
            )?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn poll_key(&mut self) -> Result<Option<Key>> {
        if !event::poll(Duration::ZERO)? {
            return Ok(None);
        }
        Ok(match event::read()? {
            Event::Key(event) => translate_key(event),
            _ => None,
        })
    }
}

/// Translates a terminal key event into a console key.
///
/// Only key presses are translated. Ctrl-C is translated as `q`.
fn translate_key(event: KeyEvent) -> Option<Key> {
    if event.kind != KeyEventKind::Press {
        return None;
    }
    match event.code {
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Key::Char('q'))
        }
        KeyCode::Char(c) => Some(Key::Char(c)),
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        KeyCode::Left => Some(Key::Left),
        KeyCode::Right => Some(Key::Right),
        _ => None,
    }
}
