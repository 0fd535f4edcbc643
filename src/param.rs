//! Lock-free parameter storage shared between a control thread and the audio thread.

use alloc::string::ToString;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Error, Result};

/// An `f32` that can be read and written from different threads without locks.
///
/// Values are independent of each other, so relaxed ordering is enough: a store
/// is seen whole or not at all.
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Store `new` if the value is still bit-for-bit `current`.
    ///
    /// On failure the value found instead is returned and nothing is written.
    #[inline]
    pub fn compare_exchange(&self, current: f32, new: f32) -> core::result::Result<f32, f32> {
        self.0
            .compare_exchange(current.to_bits(), new.to_bits(), Ordering::Relaxed, Ordering::Relaxed)
            .map(f32::from_bits)
            .map_err(f32::from_bits)
    }
}

impl fmt::Debug for AtomicF32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.load(), f)
    }
}

/// How a parameter keeps incoming values inside its domain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Range {
    Clamp { min: f32, max: f32 },
    /// Wrapped into `[0, period)`.
    Wrap { period: f32 },
}

impl Range {
    #[inline]
    pub fn apply(self, value: f32) -> f32 {
        match self {
            Range::Clamp { min, max } => value.clamp(min, max),
            Range::Wrap { period } => {
                if (0.0..period).contains(&value) {
                    value
                } else {
                    let wrapped = value.rem_euclid(period);
                    // rem_euclid can round up to `period` for tiny negative values
                    if wrapped >= period {
                        0.0
                    } else {
                        wrapped
                    }
                }
            }
        }
    }
}

/// Static description of one parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: f32,
    pub range: Range,
}

impl ParamSpec {
    pub const fn clamped(name: &'static str, default: f32, min: f32, max: f32) -> Self {
        Self {
            name,
            default,
            range: Range::Clamp { min, max },
        }
    }

    pub const fn wrapped(name: &'static str, default: f32, period: f32) -> Self {
        Self {
            name,
            default,
            range: Range::Wrap { period },
        }
    }
}

/// The parameter table of one unit.
///
/// Deliberately not `Clone`: [`share`](Self::share) aliases the storage (for a
/// control thread) while [`detached`](Self::detached) copies it (for cloning a
/// unit). Picking one is always explicit.
///
/// ```
/// use modgraph::{ParamSpec, Params};
///
/// static SPECS: [ParamSpec; 1] = [ParamSpec::clamped("gain", 1.0, 0.0, 10.0)];
///
/// let params = Params::new(&SPECS);
/// let remote = params.share();
///
/// remote.set("gain", 12.0).unwrap();
/// assert_eq!(params.get("gain"), Some(10.0));
/// ```
pub struct Params {
    specs: &'static [ParamSpec],
    values: Arc<[AtomicF32]>,
}

impl Params {
    pub fn new(specs: &'static [ParamSpec]) -> Self {
        let values = specs.iter().map(|spec| AtomicF32::new(spec.default)).collect();
        Self { specs, values }
    }

    /// Another handle onto the same storage.
    pub fn share(&self) -> Params {
        Params {
            specs: self.specs,
            values: Arc::clone(&self.values),
        }
    }

    /// A copy of the current values with storage of its own.
    pub fn detached(&self) -> Params {
        let values = self.values.iter().map(|v| AtomicF32::new(v.load())).collect();
        Params {
            specs: self.specs,
            values,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.specs.iter().map(|spec| spec.name).collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.specs.iter().position(|spec| spec.name == name)
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.index_of(name).map(|index| self.load(index))
    }

    /// Store `value` under `name`, clamped or wrapped into its range.
    ///
    /// Returns the value actually stored.
    pub fn set(&self, name: &str, value: f32) -> Result<f32> {
        let index = self
            .index_of(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))?;
        if !value.is_finite() {
            return Err(Error::NonFiniteValue(name.to_string()));
        }
        Ok(self.store(index, value))
    }

    /// Read by position. Panics if `index >= len()`.
    #[inline]
    pub(crate) fn load(&self, index: usize) -> f32 {
        self.values[index].load()
    }

    /// Write by position, applying the parameter's range. Returns the stored value.
    #[inline]
    pub(crate) fn store(&self, index: usize, value: f32) -> f32 {
        let value = self.specs[index].range.apply(value);
        self.values[index].store(value);
        value
    }

    /// Write `new` by position only if the slot still holds `current`.
    /// No range is applied.
    #[inline]
    pub(crate) fn compare_exchange(&self, index: usize, current: f32, new: f32) -> core::result::Result<f32, f32> {
        self.values[index].compare_exchange(current, new)
    }

    pub fn reset_to_defaults(&self) {
        for (spec, value) in self.specs.iter().zip(self.values.iter()) {
            value.store(spec.default);
        }
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.specs.iter().zip(self.values.iter()).map(|(s, v)| (s.name, v.load())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;

    static SPECS: [ParamSpec; 2] = [
        ParamSpec::clamped("width", 0.5, 0.0, 1.0),
        ParamSpec::wrapped("phase", 0.0, TAU),
    ];

    #[test]
    fn clamps_and_wraps() {
        let params = Params::new(&SPECS);
        assert_eq!(params.set("width", 3.0).unwrap(), 1.0);
        assert_eq!(params.set("width", -1.0).unwrap(), 0.0);

        let stored = params.set("phase", TAU + 1.0).unwrap();
        assert!((stored - 1.0).abs() < 1e-5);
        let stored = params.set("phase", -1.0).unwrap();
        assert!((stored - (TAU - 1.0)).abs() < 1e-5);
        assert_eq!(params.set("phase", TAU).unwrap(), 0.0);
    }

    #[test]
    fn rejects_unknown_and_non_finite() {
        let params = Params::new(&SPECS);
        assert!(matches!(params.set("nope", 1.0), Err(Error::UnknownParameter(_))));
        assert!(matches!(params.set("width", f32::NAN), Err(Error::NonFiniteValue(_))));
        assert_eq!(params.get("width"), Some(0.5));
        assert_eq!(params.get("nope"), None);
    }

    #[test]
    fn shared_handles_alias_detached_copies_do_not() {
        let params = Params::new(&SPECS);
        let shared = params.share();
        let detached = params.detached();

        shared.set("width", 0.25).unwrap();
        assert_eq!(params.get("width"), Some(0.25));
        assert_eq!(detached.get("width"), Some(0.5));

        detached.set("width", 0.9).unwrap();
        assert_eq!(shared.get("width"), Some(0.25));
    }

    #[test]
    fn compare_exchange_only_replaces_the_expected_value() {
        let value = AtomicF32::new(1.0);
        assert_eq!(value.compare_exchange(1.0, 2.0), Ok(1.0));
        assert_eq!(value.load(), 2.0);

        assert_eq!(value.compare_exchange(1.0, 3.0), Err(2.0));
        assert_eq!(value.load(), 2.0);
    }

    #[test]
    fn positional_compare_exchange_loses_to_a_named_write() {
        let params = Params::new(&SPECS);
        let start = params.load(1);
        params.share().set("phase", 1.5).unwrap();
        assert!(params.compare_exchange(1, start, 3.0).is_err());
        assert_eq!(params.get("phase"), Some(1.5));
    }

    #[test]
    fn writes_from_another_thread_are_visible() {
        let params = Params::new(&SPECS);
        let remote = params.share();
        std::thread::spawn(move || {
            remote.set("width", 0.75).unwrap();
        })
        .join()
        .unwrap();
        assert_eq!(params.get("width"), Some(0.75));
    }
}
