pub mod blep;
mod oscillator;
mod pulse;
mod saw;
mod sine;
mod triangle;

pub use oscillator::{AM_INPUT, FM_INPUT, PWM_INPUT};
pub use pulse::Pulse;
pub use saw::Saw;
pub use sine::Sine;
pub use triangle::Triangle;
