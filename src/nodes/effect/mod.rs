mod gain;

pub use gain::{Gain, MAX_GAIN};
