//! Band-limiting kernels and waveform shapes
//!
//! All shapes take the normalized phase `t` in `[0, 1)` and the normalized
//! per-sample increment `dt` (phase increment divided by 2π). Increments past
//! Nyquist are treated as Nyquist, negative increments (through-zero FM) by
//! their magnitude.
//!
//! Every kernel is branch-free: edge regions are selected with 0/1 masks, so
//! the shapes evaluate the same way in every lane of a chunk.

/// `1.0` where `condition` holds, `0.0` elsewhere.
#[inline(always)]
fn mask(condition: bool) -> f32 {
    f32::from(u8::from(condition))
}

/// `value` where `condition` holds, `0.0` elsewhere. Both sides are already
/// computed, so this lowers to a select rather than a jump.
#[inline(always)]
fn keep(condition: bool, value: f32) -> f32 {
    if condition {
        value
    } else {
        0.0
    }
}

/// Polynomial band-limited step residual for a unit upward step at `t = 0`.
///
/// Nonzero only within one sample of the discontinuity on either side.
#[inline]
pub fn poly_blep(t: f32, dt: f32) -> f32 {
    // With dt == 0 neither region holds, whatever the quotients are
    let dt = dt.abs().min(0.5);
    let head = t / dt;
    let tail = (t - 1.0) / dt;
    let after = 2.0 * head - head * head - 1.0;
    let before = tail * tail + 2.0 * tail + 1.0;
    keep(t < dt, after) + keep(t > 1.0 - dt, before)
}

/// Polynomial band-limited ramp residual (integrated [`poly_blep`]) for a unit
/// slope increase at `t = 0`, in samples.
#[inline]
pub fn poly_blamp(t: f32, dt: f32) -> f32 {
    let dt = dt.abs().min(0.5);
    let head = t / dt - 1.0;
    let tail = (t - 1.0) / dt + 1.0;
    let after = -head * head * head / 3.0;
    let before = tail * tail * tail / 3.0;
    keep(t < dt, after) + keep(t > 1.0 - dt, before)
}

#[inline]
pub fn naive_saw(t: f32) -> f32 {
    2.0 * t - 1.0
}

#[inline]
pub fn naive_triangle(t: f32) -> f32 {
    2.0 * (2.0 * t - 1.0).abs() - 1.0
}

#[inline]
pub fn naive_pulse(t: f32, width: f32) -> f32 {
    2.0 * mask(t < width) - 1.0
}

/// Rising ramp with a falling edge at `t = 0`.
#[inline]
pub fn saw(t: f32, dt: f32) -> f32 {
    naive_saw(t) - poly_blep(t, dt)
}

/// Peak at `t = 0`, trough at `t = 0.5`. The wave itself is continuous, so
/// the corners are smoothed with BLAMPs scaled by the slope change of 8.
#[inline]
pub fn triangle(t: f32, dt: f32) -> f32 {
    let dt = dt.abs().min(0.5);
    let half = wrap_unit(t + 0.5);
    naive_triangle(t) + 8.0 * dt * (poly_blamp(half, dt) - poly_blamp(t, dt))
}

/// High for `t < width`: a rising edge at `t = 0`, a falling edge at `t = width`.
#[inline]
pub fn pulse(t: f32, dt: f32, width: f32) -> f32 {
    naive_pulse(t, width) + poly_blep(t, dt) - poly_blep(wrap_unit(t - width), dt)
}

/// Fold `t` from `[-1, 2)` into `[0, 1)`.
#[inline(always)]
fn wrap_unit(t: f32) -> f32 {
    t + mask(t < 0.0) - mask(t >= 1.0)
}
