use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, UpdaterErr>;

#[derive(Error, Debug)]
pub enum UpdaterErr {
    /// Every stage shells out to the system package tools, which require
    /// elevation themselves, so refuse to start without it.
    #[error("gentup must be run as root")]
    NotRoot,

    /// The config file exists but could not be parsed. A missing file is not
    /// an error; defaults apply instead.
    #[error("failed to parse {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    /// A collaborator exited non-zero. The pipeline stops at this stage
    /// boundary; later stages are never invoked.
    #[error("{stage} failed with exit code {code}")]
    ToolFailed { stage: &'static str, code: i32 },

    /// A collaborator was killed by a signal before reporting an exit code.
    #[error("{stage} was terminated by a signal")]
    ToolSignaled { stage: &'static str },

    /// Returned when a spawned child's stdout/stderr pipes could not be
    /// captured.
    #[error("spawn failed: child stdout/stderr not captured")]
    Spawn,

    /// The operator answered a yes/no prompt with something else. Treated as
    /// fatal rather than silently picking a default.
    #[error("invalid response {input:?}; expected y, yes, n or no")]
    InvalidResponse { input: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}
