//! Core traits for cycle-accurate emulation.
//!
//! Components are externally pumped: nothing here owns a clock. A CPU is
//! advanced one bus cycle at a time by whatever drives the machine (on a
//! TIA-based console, the video chip runs at three times the CPU rate and
//! steps the CPU between its own pixel cycles).

mod bus;
mod cpu;
mod rng;

pub use bus::{Bus, SimpleBus};
pub use cpu::Cpu;
pub use rng::{RandRng, Rng};
