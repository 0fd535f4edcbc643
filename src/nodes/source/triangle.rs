//! Band-limited triangle oscillator

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::f32::consts::TAU;

use delegate::delegate;

use crate::error::Result;
use crate::node::{Buffer, Input, UnitGenerator};
use crate::nodes::source::blep;
use crate::nodes::source::oscillator::{self, OscillatorCore, AMPLITUDE, OSCILLATOR_INPUTS, OSCILLATOR_PARAMS, PHASE};
use crate::param::Params;
use crate::LANES;

fn shape<const N: usize>(phase: [f32; N], dt: [f32; N], _width: [f32; N]) -> [f32; N] {
    core::array::from_fn(|lane| blep::triangle(phase[lane] / TAU, dt[lane]))
}

/// A triangle wave peaking at phase 0 and bottoming out at phase π.
///
/// The waveform is continuous but its slope is not, so the two corners are
/// rounded with PolyBLAMP rather than PolyBLEP.
#[derive(Clone, Debug)]
pub struct Triangle {
    core: OscillatorCore,
}

impl Triangle {
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

    pub fn current_value(&self) -> f32 {
        self.core.current_value(shape::<1>)
    }

    pub fn process_scalar(&mut self, inputs: &[Input<'_>], outputs: &mut [Buffer], num_frames: usize) {
        self.core.process::<1, _>(inputs, outputs, num_frames, shape::<1>);
    }
}

impl Default for Triangle {
    fn default() -> Self {
        Self::new(440.0)
    }
}

impl UnitGenerator for Triangle {
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
        "Triangle Oscillator"
    }

    fn description(&self) -> &'static str {
        "Band-limited triangle wave"
    }

    fn box_clone(&self) -> Box<dyn UnitGenerator> {
        Box::new(self.clone())
    }
}
