//! Core unit generator trait and the per-port buffer types.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::ops::{Deref, DerefMut};

use crate::error::Result;
use crate::param::Params;

/// One input port as seen by [`UnitGenerator::process`].
///
/// An unconnected port is [`Input::Absent`], not a buffer of zeros. Units decide
/// what "no signal" means for them (an oscillator uses its base parameter, the
/// gain unit outputs silence).
#[derive(Clone, Copy, Debug, Default)]
pub enum Input<'a> {
    #[default]
    Absent,
    /// Read-only view of `num_frames` samples owned by an upstream unit.
    Signal(&'a [f32]),
}

impl<'a> Input<'a> {
    #[inline]
    pub fn signal(self) -> Option<&'a [f32]> {
        match self {
            Input::Absent => None,
            Input::Signal(samples) => Some(samples),
        }
    }

    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, Input::Absent)
    }
}

/// Signal on input `port`, trimmed to `num_frames`.
///
/// Returns `None` for an absent port, a port past the end of `inputs`, or a
/// signal shorter than the block.
#[inline]
pub fn input_signal<'a>(inputs: &[Input<'a>], port: usize, num_frames: usize) -> Option<&'a [f32]> {
    inputs
        .get(port)
        .and_then(|input| input.signal())
        .and_then(|samples| samples.get(..num_frames))
}

/// Output storage for a single port of a unit.
///
/// The graph owns one of these per declared output and reuses it from block to
/// block. Only a change of block size reallocates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Buffer(Vec<f32>);

impl Buffer {
    /// A zeroed buffer of `len` samples.
    pub fn new(len: usize) -> Self {
        Self(alloc::vec![0.0; len])
    }

    /// Grow or shrink to `len` samples. Contents are not guaranteed to survive.
    #[inline]
    pub fn resize(&mut self, len: usize) {
        if self.0.len() != len {
            self.0.resize(len, 0.0);
        }
    }

    #[inline]
    pub fn silence(&mut self) {
        self.0.iter_mut().for_each(|s| *s = 0.0);
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl Deref for Buffer {
    type Target = [f32];

    #[inline]
    fn deref(&self) -> &[f32] {
        &self.0
    }
}

impl DerefMut for Buffer {
    #[inline]
    fn deref_mut(&mut self) -> &mut [f32] {
        &mut self.0
    }
}

/// The core trait for audio processing units.
///
/// Units are built on their own, then handed to a
/// [`ModularSystem`](crate::ModularSystem) which owns them under a unique name.
/// Units can be:
/// - **Sources**: generate audio, optionally modulated by their inputs (oscillators)
/// - **Effects**: transform their inputs (gain)
///
/// # Parameters
///
/// Parameters are addressed by name and stored in atomics, so setters take
/// `&self`. A control thread holding a [`Params`] handle (see
/// [`params`](Self::params)) may write while the audio thread renders; a unit
/// reads each value once at the start of a block.
///
/// # Example
///
/// ```
/// use modgraph::{Buffer, Input, Result, UnitGenerator};
///
/// #[derive(Clone)]
/// struct Invert;
///
/// impl UnitGenerator for Invert {
///     fn process(&mut self, inputs: &[Input<'_>], outputs: &mut [Buffer], num_frames: usize) {
///         let Some(out) = outputs.first_mut() else { return };
///         match modgraph::input_signal(inputs, 0, num_frames) {
///             Some(input) => {
///                 for (o, i) in out[..num_frames].iter_mut().zip(input) {
///                     *o = -*i;
///                 }
///             }
///             None => out[..num_frames].iter_mut().for_each(|s| *s = 0.0),
///         }
///     }
///
///     fn num_inputs(&self) -> usize { 1 }
///     fn num_outputs(&self) -> usize { 1 }
///     fn input_name(&self, index: usize) -> Result<&'static str> {
///         modgraph::port_name(&["input"], modgraph::PortKind::Input, index)
///     }
///     fn output_name(&self, index: usize) -> Result<&'static str> {
///         modgraph::port_name(&["output"], modgraph::PortKind::Output, index)
///     }
///     fn set_parameter(&self, _name: &str, _value: f32) -> Result<()> { Ok(()) }
///     fn get_parameter(&self, _name: &str) -> Result<f32> { Ok(0.0) }
///     fn parameter_names(&self) -> Vec<&'static str> { Vec::new() }
///     fn name(&self) -> &'static str { "Invert" }
///     fn box_clone(&self) -> Box<dyn UnitGenerator> { Box::new(self.clone()) }
///     fn reset(&mut self) {}
/// }
/// ```
pub trait UnitGenerator: Send + 'static {
    /// Process one block.
    ///
    /// `inputs` has one entry per declared input port. `outputs` has one buffer
    /// per declared output port, each at least `num_frames` long; every one of
    /// them must be fully written. Zero frames or empty slices are a no-op.
    fn process(&mut self, inputs: &[Input<'_>], outputs: &mut [Buffer], num_frames: usize);

    /// Number of input ports. Constant for the unit's lifetime.
    fn num_inputs(&self) -> usize;

    /// Number of output ports. Constant for the unit's lifetime.
    fn num_outputs(&self) -> usize;

    fn input_name(&self, index: usize) -> Result<&'static str>;

    fn output_name(&self, index: usize) -> Result<&'static str>;

    /// Set a parameter. Each unit documents what happens for an unknown name.
    fn set_parameter(&self, name: &str, value: f32) -> Result<()>;

    /// Read a parameter. Each unit documents what happens for an unknown name.
    fn get_parameter(&self, name: &str) -> Result<f32>;

    /// The complete parameter set of this unit type, in a stable order.
    fn parameter_names(&self) -> Vec<&'static str>;

    /// A handle sharing this unit's parameter storage, for a control thread.
    fn params(&self) -> Option<Params> {
        None
    }

    /// Human-readable type name, e.g. "Sine Oscillator".
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        ""
    }

    /// An independent copy with identical parameters and internal state.
    fn box_clone(&self) -> Box<dyn UnitGenerator>;

    /// Restore internal state (phase, gain, ...) to its defaults.
    fn reset(&mut self);

    /// Called before processing starts at `sample_rate`.
    fn prepare(&mut self, _sample_rate: u32) {}
}

impl Clone for Box<dyn UnitGenerator> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Look up a port name in a fixed table, failing past the end.
pub fn port_name(names: &[&'static str], kind: crate::error::PortKind, index: usize) -> Result<&'static str> {
    names
        .get(index)
        .copied()
        .ok_or(crate::error::Error::PortOutOfRange {
            kind,
            index,
            count: names.len(),
        })
}
