//! Band-limited pulse oscillator with pulse-width modulation

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::f32::consts::TAU;

use delegate::delegate;

use crate::error::Result;
use crate::node::{Buffer, Input, UnitGenerator};
use crate::nodes::source::blep;
use crate::nodes::source::oscillator::{
    self, OscillatorCore, AMPLITUDE, PHASE, PULSE_INPUTS, PULSE_PARAMS, PULSE_WIDTH,
};
use crate::param::Params;
use crate::LANES;

fn shape<const N: usize>(phase: [f32; N], dt: [f32; N], width: [f32; N]) -> [f32; N] {
    core::array::from_fn(|lane| blep::pulse(phase[lane] / TAU, dt[lane], width[lane]))
}

/// A pulse wave: `+1` for the first `pulse_width` of each cycle, `-1` after.
///
/// Both edges get a PolyBLEP correction. The third input, [`Pulse::PWM_INPUT`],
/// is added to the base width per sample and the sum clamped to `[0, 1]`.
///
/// ```
/// use modgraph::{UnitGenerator, nodes::Pulse};
///
/// let pulse = Pulse::new(110.0).with_pulse_width(0.25);
/// pulse.set_parameter("pulse_width", 1.5).unwrap();
/// assert_eq!(pulse.get_parameter("pulse_width").unwrap(), 1.0);
/// ```
#[derive(Clone, Debug)]
pub struct Pulse {
    core: OscillatorCore,
}

impl Pulse {
    pub const FM_INPUT: usize = oscillator::FM_INPUT;
    pub const AM_INPUT: usize = oscillator::AM_INPUT;
    pub const PWM_INPUT: usize = oscillator::PWM_INPUT;

    pub fn new(frequency: f32) -> Self {
        Self {
            core: OscillatorCore::new(&PULSE_PARAMS, &PULSE_INPUTS, frequency),
        }
    }

    /// A pulse with a fixed width of one half.
    pub fn square(frequency: f32) -> Self {
        Self::new(frequency).with_pulse_width(0.5)
    }

    pub fn with_amplitude(self, amplitude: f32) -> Self {
        self.core.store(AMPLITUDE, amplitude);
        self
    }

    pub fn with_phase(self, phase: f32) -> Self {
        self.core.store(PHASE, phase);
        self
    }

    /// Clamped to `[0, 1]`.
    pub fn with_pulse_width(self, width: f32) -> Self {
        self.core.store(PULSE_WIDTH, width);
        self
    }

    delegate! {
        to self.core {
            pub fn frequency(&self) -> f32;
            pub fn amplitude(&self) -> f32;
            pub fn phase(&self) -> f32;
            pub fn sample_rate(&self) -> u32;
            pub fn pulse_width(&self) -> f32;
        }
    }

    pub fn current_value(&self) -> f32 {
        self.core.current_value(shape::<1>)
    }

    pub fn process_scalar(&mut self, inputs: &[Input<'_>], outputs: &mut [Buffer], num_frames: usize) {
        self.core.process::<1, _>(inputs, outputs, num_frames, shape::<1>);
    }
}

impl Default for Pulse {
    fn default() -> Self {
        Self::square(440.0)
    }
}

impl UnitGenerator for Pulse {
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
        "Pulse Oscillator"
    }

    fn description(&self) -> &'static str {
        "Band-limited pulse wave with pulse-width modulation"
    }

    fn box_clone(&self) -> Box<dyn UnitGenerator> {
        Box::new(self.clone())
    }
}
