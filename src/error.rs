//! Error type shared by the simulation library.
//!
//! Every variant is fatal for the run: configuration problems stop the
//! program before a body exists, and a failed compute pass halts the frame
//! loop instead of continuing with stale buffers.

use std::path::PathBuf;

use thiserror::Error;

use crate::simulation::compute::{BufferId, Kernel};

#[derive(Error, Debug)]
pub enum SimError {
    /// File could not be opened, read or written
    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// PNG decode/encode failure or an unusable pixel layout
    #[error("image error: {0}")]
    Image(String),

    /// Invalid scenario or runtime parameter
    #[error("configuration error: {0}")]
    Config(String),

    /// Scenario file is not valid YAML for `SimConfig`
    #[error("scenario parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A pass tried to write a buffer it also reads
    #[error("pass {kernel:?} reads and writes {buffer:?}")]
    Aliasing { kernel: Kernel, buffer: BufferId },

    /// Two grids that must share a shape do not
    #[error("dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

impl SimError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SimError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        SimError::Config(message.into())
    }
}

pub type SimResult<T> = Result<T, SimError>;
