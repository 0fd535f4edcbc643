//! Built-in unit generators.
//!
//! Units are organized into two categories:
//!
//! ## Sources ([`source`])
//!
//! Band-limited oscillators. Each accepts optional modulation on its inputs:
//! - [`Sine`] - Sine wave, no band-limiting needed
//! - [`Saw`] - Rising sawtooth with a PolyBLEP reset edge
//! - [`Triangle`] - Triangle with PolyBLAMP-rounded corners
//! - [`Pulse`] - Variable-width pulse with PolyBLEP on both edges
//!
//! Input 0 adds Hz to the base frequency, input 1 multiplies the amplitude,
//! and on [`Pulse`] input 2 is added to the pulse width.
//!
//! ## Effects ([`effect`])
//!
//! Process audio (inputs -> outputs):
//! - [`Gain`] - Volume control, clamped to `[0, MAX_GAIN]`
//!
//! # Parameters
//!
//! | Unit | Parameters | Unknown name on set / get |
//! |------|------------|---------------------------|
//! | oscillators | `frequency`, `amplitude`, `phase` | error / error |
//! | [`Pulse`] | + `pulse_width` | error / error |
//! | [`Gain`] | `gain` | ignored / `0.0` |

pub mod effect;
pub mod source;

// Re-export common types at the top level for convenience
pub use effect::{Gain, MAX_GAIN};
pub use source::{Pulse, Saw, Sine, Triangle};
