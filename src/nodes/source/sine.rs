//! Sine wave oscillator

use alloc::boxed::Box;
use alloc::vec::Vec;

use delegate::delegate;

use crate::error::Result;
use crate::node::{Buffer, Input, UnitGenerator};
use crate::nodes::source::oscillator::{self, OscillatorCore, AMPLITUDE, OSCILLATOR_INPUTS, OSCILLATOR_PARAMS, PHASE};
use crate::param::Params;
use crate::LANES;

fn shape<const N: usize>(phase: [f32; N], _dt: [f32; N], _width: [f32; N]) -> [f32; N] {
    core::array::from_fn(|lane| phase[lane].sin())
}

/// A sine wave oscillator (mono source).
///
/// Needs no band-limiting. Inputs: [`Sine::FM_INPUT`] adds Hz to the base
/// frequency per sample, [`Sine::AM_INPUT`] scales the amplitude per sample.
///
/// ```
/// use modgraph::{Buffer, Input, UnitGenerator, nodes::Sine};
///
/// let mut sine = Sine::new(440.0);
/// let mut out = [Buffer::new(4)];
/// sine.process(&[Input::Absent, Input::Absent], &mut out, 4);
/// assert_eq!(out[0][0], 0.0);
/// ```
#[derive(Clone, Debug)]
pub struct Sine {
    core: OscillatorCore,
}

impl Sine {
    pub const FM_INPUT: usize = oscillator::FM_INPUT;
    pub const AM_INPUT: usize = oscillator::AM_INPUT;

    pub fn new(frequency: f32) -> Self {
        Self {
            core: OscillatorCore::new(&OSCILLATOR_PARAMS, &OSCILLATOR_INPUTS, frequency),
        }
    }

    pub fn with_amplitude(self, amplitude: f32) -> Self {
        self.core.store(AMPLITUDE, amplitude);
        self
    }

    /// Start phase in radians.
    pub fn with_phase(self, phase: f32) -> Self {
        self.core.store(PHASE, phase);
        self
    }

    delegate! {
        to self.core {
            pub fn frequency(&self) -> f32;
            pub fn amplitude(&self) -> f32;
            pub fn phase(&self) -> f32;
            pub fn sample_rate(&self) -> u32;
        }
    }

    /// The sample the oscillator would emit next without modulation.
    pub fn current_value(&self) -> f32 {
        self.core.current_value(shape::<1>)
    }

    /// One sample at a time. Produces the same output as `process`.
    pub fn process_scalar(&mut self, inputs: &[Input<'_>], outputs: &mut [Buffer], num_frames: usize) {
        self.core.process::<1, _>(inputs, outputs, num_frames, shape::<1>);
    }
}

impl Default for Sine {
    fn default() -> Self {
        Self::new(440.0)
    }
}

impl UnitGenerator for Sine {
    fn process(&mut self, inputs: &[Input<'_>], outputs: &mut [Buffer], num_frames: usize) {
        self.core.process::<LANES, _>(inputs, outputs, num_frames, shape::<LANES>);
    }

    delegate! {
        to self.core {
            fn num_inputs(&self) -> usize;
            fn num_outputs(&self) -> usize;
            fn input_name(&self, index: usize) -> Result<&'static str>;
            fn output_name(&self, index: usize) -> Result<&'static str>;
            fn set_parameter(&self, name: &str, value: f32) -> Result<()>;
            fn get_parameter(&self, name: &str) -> Result<f32>;
            fn parameter_names(&self) -> Vec<&'static str>;
            fn params(&self) -> Option<Params>;
            fn reset(&mut self);
            fn prepare(&mut self, sample_rate: u32);
        }
    }

    fn name(&self) -> &'static str {
        "Sine Oscillator"
    }

    fn description(&self) -> &'static str {
        "Pure sine tone with frequency and amplitude modulation inputs"
    }

    fn box_clone(&self) -> Box<dyn UnitGenerator> {
        Box::new(self.clone())
    }
}
