//! convctl is an operator console for the AXI converter peripherals of the
//! FPGA fabric. It maps the register bank of the ADC capture path or of the
//! DAC output path, shows the decoded register values on a full-screen
//! terminal display that is updated continuously, and translates single-key
//! commands into register writes. It also includes a tool that loads a DAC
//! channel by bit-banging GPIO lines.

#![warn(missing_docs)]

pub mod adc;
pub mod app;
pub mod args;
pub mod console;
pub mod dac;
pub mod devmem;
pub mod display;
pub mod gpio;
pub mod registers;
pub mod terminal;
