//! Modgraph - block-based modular synthesis
//!
//! A graph of named unit generators wired together by explicit port
//! connections and driven one audio block at a time.
//!
//! Design principles:
//! - Units are owned by the graph under a unique name; the graph never sees concrete types
//! - Every output port gets its own block buffer, reused across blocks
//! - Unconnected inputs arrive as [`Input::Absent`], never as a buffer of zeros
//! - Parameters live in atomics, so a control thread can write while audio renders
//! - Evaluation order is explicit ([`ProcessOrder`]); edges not yet evaluated in a
//!   pass carry the previous block (an implicit one-block delay)
//!
//! # Quick Start
//!
//! ```
//! use modgraph::{ModularSystem, nodes::{Gain, Saw, Sine}};
//!
//! let mut system = ModularSystem::new().with_sample_rate(48_000);
//!
//! // A slow sine wobbling the saw's frequency by +-5 Hz
//! system.add_module("lfo", Box::new(Sine::new(2.0).with_amplitude(5.0))).unwrap();
//! system.add_module("osc", Box::new(Saw::new(110.0))).unwrap();
//! system.add_module("master", Box::new(Gain::new(0.25))).unwrap();
//!
//! system.connect("lfo", 0, "osc", Saw::FM_INPUT).unwrap();
//! system.connect("osc", 0, "master", 0).unwrap();
//!
//! system.process(256);
//! assert_eq!(system.output("master", 0).unwrap().len(), 256);
//! ```
//!
//! # Feature flags
//!
//! - `cpal_sink`: enables [`CpalDevice`] for playing a [`Host`]'s ring buffer on a
//!   system audio device.

extern crate alloc;

mod error;
mod graph;
mod host;
mod node;
mod param;
pub mod nodes;

#[cfg(feature = "cpal_sink")]
mod device;

pub use error::{Error, PortKind, Result};
pub use graph::{Connection, ModularSystem, ProcessOrder};
pub use host::Host;
pub use node::{input_signal, port_name, Buffer, Input, UnitGenerator};
pub use param::{AtomicF32, ParamSpec, Params, Range};

#[cfg(feature = "cpal_sink")]
pub use device::{CpalDevice, CpalStream};

/// Sample rate units assume until [`ModularSystem::prepare`] is called.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Block size a [`Host`] renders unless configured otherwise.
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// Samples per chunk in the oscillators' batched renderer.
pub const LANES: usize = 8;

/// Most input ports a unit may declare.
pub const MAX_PORTS: usize = 16;
