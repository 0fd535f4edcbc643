//! Error types for graph construction and unit configuration.

use alloc::string::String;
use core::fmt;

use thiserror::Error;

/// Which side of a unit a port index refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortKind {
    Input,
    Output,
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortKind::Input => f.write_str("input"),
            PortKind::Output => f.write_str("output"),
        }
    }
}

/// Everything that can go wrong while assembling or configuring a graph.
///
/// None of these are produced by the block-processing path. A failed call
/// leaves the graph or unit exactly as it was.
#[derive(Debug, Error)]
pub enum Error {
    #[error("module name must not be empty")]
    EmptyName,

    #[error("module `{0}` already exists")]
    DuplicateModule(String),

    #[error("module `{0}` does not exist")]
    UnknownModule(String),

    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),

    #[error("parameter `{0}` must be a finite number")]
    NonFiniteValue(String),

    #[error("{kind} port {index} out of range ({count} ports)")]
    PortOutOfRange {
        kind: PortKind,
        index: usize,
        count: usize,
    },

    #[error("input {port} of `{module}` is already connected")]
    InputAlreadyConnected { module: String, port: usize },

    #[error("`{module}` declares {count} inputs, at most {max} are supported", max = crate::MAX_PORTS)]
    TooManyPorts { module: String, count: usize },

    #[cfg(feature = "cpal_sink")]
    #[error("no audio output device available")]
    NoDevice,

    #[cfg(feature = "cpal_sink")]
    #[error("unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[cfg(feature = "cpal_sink")]
    #[error("could not query the default stream config: {0}")]
    DefaultStreamConfig(#[from] cpal::DefaultStreamConfigError),

    #[cfg(feature = "cpal_sink")]
    #[error("could not build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[cfg(feature = "cpal_sink")]
    #[error("could not start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[cfg(feature = "cpal_sink")]
    #[error("could not pause output stream: {0}")]
    PauseStream(#[from] cpal::PauseStreamError),
}

pub type Result<T> = core::result::Result<T, Error>;
