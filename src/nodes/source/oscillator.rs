//! Shared oscillator machinery: parameters, modulation inputs, chunked renderer

use alloc::vec::Vec;
use core::f32::consts::TAU;

use itertools::izip;
use tracing::trace;

use crate::error::{Error, PortKind, Result};
use crate::node::{input_signal, port_name, Buffer, Input};
use crate::param::{ParamSpec, Params};
use crate::DEFAULT_SAMPLE_RATE;

pub(crate) const FREQUENCY: usize = 0;
pub(crate) const AMPLITUDE: usize = 1;
pub(crate) const PHASE: usize = 2;
pub(crate) const PULSE_WIDTH: usize = 3;

const FREQUENCY_SPEC: ParamSpec = ParamSpec::clamped("frequency", 440.0, f32::MIN_POSITIVE, f32::INFINITY);
const AMPLITUDE_SPEC: ParamSpec = ParamSpec::clamped("amplitude", 1.0, 0.0, f32::INFINITY);
const PHASE_SPEC: ParamSpec = ParamSpec::wrapped("phase", 0.0, TAU);

pub(crate) static OSCILLATOR_PARAMS: [ParamSpec; 3] = [FREQUENCY_SPEC, AMPLITUDE_SPEC, PHASE_SPEC];

pub(crate) static PULSE_PARAMS: [ParamSpec; 4] = [
    FREQUENCY_SPEC,
    AMPLITUDE_SPEC,
    PHASE_SPEC,
    ParamSpec::clamped("pulse_width", 0.5, 0.0, 1.0),
];

pub(crate) static OSCILLATOR_INPUTS: [&str; 2] = ["frequency_mod", "amplitude_mod"];
pub(crate) static PULSE_INPUTS: [&str; 3] = ["frequency_mod", "amplitude_mod", "pulse_width_mod"];
static OUTPUTS: [&str; 1] = ["output"];

/// Input port carrying frequency modulation, in Hz added to the base frequency.
pub const FM_INPUT: usize = 0;
/// Input port carrying amplitude modulation, multiplied with the base amplitude.
pub const AM_INPUT: usize = 1;
/// Input port carrying pulse-width modulation, added to the base width (pulse only).
pub const PWM_INPUT: usize = 2;

/// State shared by every oscillator: the parameter table and the sample rate.
///
/// Phase is stored as a parameter, so it can be set like any other. The
/// renderer writes it back once per block, unless it was set meanwhile.
#[derive(Debug)]
pub(crate) struct OscillatorCore {
    params: Params,
    inputs: &'static [&'static str],
    sample_rate: f32,
}

impl Clone for OscillatorCore {
    fn clone(&self) -> Self {
        Self {
            params: self.params.detached(),
            inputs: self.inputs,
            sample_rate: self.sample_rate,
        }
    }
}

impl OscillatorCore {
    pub fn new(specs: &'static [ParamSpec], inputs: &'static [&'static str], frequency: f32) -> Self {
        let params = Params::new(specs);
        params.store(FREQUENCY, frequency);
        Self {
            params,
            inputs,
            sample_rate: DEFAULT_SAMPLE_RATE as f32,
        }
    }

    pub fn store(&self, index: usize, value: f32) {
        // Non-finite values would poison the phase accumulator
        if value.is_finite() {
            self.params.store(index, value);
        }
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.params.load(FREQUENCY)
    }

    #[inline]
    pub fn amplitude(&self) -> f32 {
        self.params.load(AMPLITUDE)
    }

    #[inline]
    pub fn phase(&self) -> f32 {
        self.params.load(PHASE)
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate as u32
    }

    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    #[inline]
    pub fn num_outputs(&self) -> usize {
        OUTPUTS.len()
    }

    pub fn input_name(&self, index: usize) -> Result<&'static str> {
        port_name(self.inputs, PortKind::Input, index)
    }

    pub fn output_name(&self, index: usize) -> Result<&'static str> {
        port_name(&OUTPUTS, PortKind::Output, index)
    }

    /// Unknown names and non-finite values are errors.
    pub fn set_parameter(&self, name: &str, value: f32) -> Result<()> {
        self.params.set(name, value).map(|_| ())
    }

    /// Unknown names are errors.
    pub fn get_parameter(&self, name: &str) -> Result<f32> {
        self.params
            .get(name)
            .ok_or_else(|| Error::UnknownParameter(name.into()))
    }

    pub fn parameter_names(&self) -> Vec<&'static str> {
        self.params.names()
    }

    pub fn params(&self) -> Option<Params> {
        Some(self.params.share())
    }

    /// Phase back to zero. Frequency, amplitude and width are left alone.
    pub fn reset(&mut self) {
        self.params.store(PHASE, 0.0);
    }

    pub fn prepare(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate.max(1) as f32;
    }

    /// Base pulse width, `0.5` for oscillators without one.
    #[inline]
    pub fn pulse_width(&self) -> f32 {
        if self.params.len() > PULSE_WIDTH {
            self.params.load(PULSE_WIDTH)
        } else {
            0.5
        }
    }

    /// Value of `shape` at the stored phase with the base parameters, which is
    /// what the next sample will be if no modulation is connected.
    pub fn current_value<S>(&self, shape: S) -> f32
    where
        S: Fn([f32; 1], [f32; 1], [f32; 1]) -> [f32; 1],
    {
        let dt = self.frequency() * (1.0 / self.sample_rate);
        let [value] = shape([self.phase()], [dt], [self.pulse_width()]);
        self.amplitude() * value
    }

    /// Render one block into the first output, `N` samples per chunk.
    ///
    /// `shape` maps lane arrays of `(phase in radians, normalized increment,
    /// pulse width)` to samples.
    pub fn process<const N: usize, S>(
        &mut self,
        inputs: &[Input<'_>],
        outputs: &mut [Buffer],
        num_frames: usize,
        shape: S,
    ) where
        S: Fn([f32; N], [f32; N], [f32; N]) -> [f32; N],
    {
        let Some(out) = outputs.first_mut() else {
            return;
        };
        debug_assert!(out.len() >= num_frames, "output buffer shorter than the block");
        let len = num_frames.min(out.len());
        self.render::<N, S>(inputs, &mut out[..len], shape);
    }

    #[inline]
    fn render<const N: usize, S>(&mut self, inputs: &[Input<'_>], out: &mut [f32], shape: S)
    where
        S: Fn([f32; N], [f32; N], [f32; N]) -> [f32; N],
    {
        let num_frames = out.len();
        let fm = input_signal(inputs, FM_INPUT, num_frames);
        let am = input_signal(inputs, AM_INPUT, num_frames);
        let pwm = input_signal(inputs, PWM_INPUT, num_frames);

        // Parameters are read once per block
        let frequency = self.frequency();
        let amplitude = self.amplitude();
        let width = self.pulse_width();
        let start = self.phase();
        let mut phase = start;
        let inv_sample_rate = 1.0 / self.sample_rate;

        for (chunk_index, chunk) in out.chunks_mut(N).enumerate() {
            let offset = chunk_index * N;
            // Lanes past the end of a short chunk stay at zero and are not written
            let mut phases = [0.0f32; N];
            let mut dts = [0.0f32; N];
            let mut amps = [0.0f32; N];
            let mut widths = [0.0f32; N];

            // Phase accumulation is sequential, gather it first
            for lane in 0..chunk.len() {
                let i = offset + lane;
                let dt = (frequency + fm.map_or(0.0, |m| m[i])) * inv_sample_rate;
                phases[lane] = phase;
                dts[lane] = dt;
                amps[lane] = amplitude * am.map_or(1.0, |m| m[i]);
                widths[lane] = (width + pwm.map_or(0.0, |m| m[i])).clamp(0.0, 1.0);
                phase = wrap_phase(phase + dt * TAU);
            }

            let values = shape(phases, dts, widths);
            for (sample, value, amp) in izip!(chunk.iter_mut(), values, amps) {
                *sample = amp * value;
            }
        }

        self.commit_phase(start, phase);
    }

    /// Store the phase reached at block end, unless a control thread set a new
    /// one since `start` was read. Their value then starts the next block.
    fn commit_phase(&self, start: f32, end: f32) {
        if self.params.compare_exchange(PHASE, start, end).is_err() {
            trace!("phase set during a block, keeping the new value");
        }
    }
}

/// Wrap into `[0, 2π)`, for increments of any sign or size.
#[inline]
fn wrap_phase(phase: f32) -> f32 {
    if (0.0..TAU).contains(&phase) {
        phase
    } else if phase.is_finite() {
        PHASE_SPEC.range.apply(phase)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_in_both_directions() {
        assert_eq!(wrap_phase(1.0), 1.0);
        assert!((wrap_phase(TAU + 0.5) - 0.5).abs() < 1e-5);
        assert!((wrap_phase(-0.5) - (TAU - 0.5)).abs() < 1e-5);
        assert!((0.0..TAU).contains(&wrap_phase(10.0 * TAU + 0.25)));
        assert_eq!(wrap_phase(f32::NAN), 0.0);
    }

    #[test]
    fn non_finite_builder_values_are_ignored() {
        let core = OscillatorCore::new(&OSCILLATOR_PARAMS, &OSCILLATOR_INPUTS, 220.0);
        core.store(FREQUENCY, f32::INFINITY);
        assert_eq!(core.frequency(), 220.0);
    }

    #[test]
    fn block_end_phase_is_committed() {
        let core = OscillatorCore::new(&OSCILLATOR_PARAMS, &OSCILLATOR_INPUTS, 220.0);
        let start = core.phase();
        core.commit_phase(start, 2.0);
        assert_eq!(core.phase(), 2.0);
    }

    #[test]
    fn phase_set_during_a_block_survives_the_commit() {
        let core = OscillatorCore::new(&OSCILLATOR_PARAMS, &OSCILLATOR_INPUTS, 220.0);
        let control = core.params().unwrap();
        let start = core.phase();

        // A control thread lands its write between the block's read and commit
        control.set("phase", 1.0).unwrap();
        core.commit_phase(start, 2.0);
        assert_eq!(core.phase(), 1.0);
    }

    #[test]
    fn frequency_stays_positive() {
        let core = OscillatorCore::new(&OSCILLATOR_PARAMS, &OSCILLATOR_INPUTS, -5.0);
        assert!(core.frequency() > 0.0);
    }
}
