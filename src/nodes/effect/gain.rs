//! Gain/volume control effect

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::error::{PortKind, Result};
use crate::node::{input_signal, port_name, Buffer, Input, UnitGenerator};
use crate::param::{ParamSpec, Params};

/// Upper bound of the gain parameter.
pub const MAX_GAIN: f32 = 10.0;

const GAIN: usize = 0;

static PARAMS: [ParamSpec; 1] = [ParamSpec::clamped("gain", 1.0, 0.0, MAX_GAIN)];
static INPUTS: [&str; 1] = ["input"];
static OUTPUTS: [&str; 1] = ["output"];

/// Multiplies its input by a gain clamped to `[0, 10]`.
///
/// Lenient about parameters: setting an unknown name is ignored and reading
/// one returns `0.0`. An unconnected input produces silence.
///
/// ```
/// use modgraph::{Buffer, Input, UnitGenerator, nodes::Gain};
///
/// let mut gain = Gain::new(2.0);
/// let input = [0.5f32; 4];
/// let mut out = [Buffer::new(4)];
/// gain.process(&[Input::Signal(&input)], &mut out, 4);
/// assert_eq!(out[0].as_slice(), &[1.0; 4]);
/// ```
#[derive(Debug)]
pub struct Gain {
    params: Params,
}

impl Gain {
    /// Create a new gain node with the specified gain value
    pub fn new(gain: f32) -> Self {
        let params = Params::new(&PARAMS);
        if gain.is_finite() {
            params.store(GAIN, gain);
        }
        Self { params }
    }

    #[inline]
    pub fn gain(&self) -> f32 {
        self.params.load(GAIN)
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Clone for Gain {
    fn clone(&self) -> Self {
        Self {
            params: self.params.detached(),
        }
    }
}

impl UnitGenerator for Gain {
    fn process(&mut self, inputs: &[Input<'_>], outputs: &mut [Buffer], num_frames: usize) {
        let Some(out) = outputs.first_mut() else {
            return;
        };
        debug_assert!(out.len() >= num_frames, "output buffer shorter than the block");
        let len = num_frames.min(out.len());
        let out = &mut out[..len];

        match input_signal(inputs, 0, len) {
            Some(input) => {
                let gain = self.gain();
                for (out_sample, &in_sample) in out.iter_mut().zip(input) {
                    *out_sample = in_sample * gain;
                }
            }
            None => out.iter_mut().for_each(|s| *s = 0.0),
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize {
        INPUTS.len()
    }

    #[inline]
    fn num_outputs(&self) -> usize {
        OUTPUTS.len()
    }

    fn input_name(&self, index: usize) -> Result<&'static str> {
        port_name(&INPUTS, PortKind::Input, index)
    }

    fn output_name(&self, index: usize) -> Result<&'static str> {
        port_name(&OUTPUTS, PortKind::Output, index)
    }

    fn set_parameter(&self, name: &str, value: f32) -> Result<()> {
        if name == PARAMS[GAIN].name && value.is_finite() {
            self.params.store(GAIN, value);
        }
        Ok(())
    }

    fn get_parameter(&self, name: &str) -> Result<f32> {
        Ok(self.params.get(name).unwrap_or(0.0))
    }

    fn parameter_names(&self) -> Vec<&'static str> {
        self.params.names()
    }

    fn params(&self) -> Option<Params> {
        Some(self.params.share())
    }

    fn name(&self) -> &'static str {
        "Gain"
    }

    fn description(&self) -> &'static str {
        "Scales its input by a gain between 0 and 10"
    }

    fn box_clone(&self) -> Box<dyn UnitGenerator> {
        Box::new(self.clone())
    }

    /// Gain back to unity.
    fn reset(&mut self) {
        self.params.reset_to_defaults();
    }
}
