//! Library backing the `gentup` host-maintenance orchestrator.
//!
//! The pipeline controller in [`pipeline`] drives a fixed sequence of
//! external package-management operations; everything else here exists to
//! support it: configuration resolution, the stage table, the streamed stage
//! executor, the intervention scan and the self-update guard. The external
//! tools are opaque collaborators; apart from the world-upgrade pre-check
//! only their exit codes are consumed.
//!
//! Concurrent invocations are unsupported: the package database is serialized
//! only by portage's own locking.

pub mod config;
pub mod error;
pub mod exec;
pub mod intervention;
pub mod pipeline;
pub mod prompt;
pub mod self_update;
pub mod stage;

pub use config::Config;
pub use config::ConfigOverrides;
pub use error::Result;
pub use error::UpdaterErr;
pub use pipeline::Pipeline;
pub use pipeline::PipelineOutcome;
pub use self_update::ExecutionContext;
pub use stage::StageKind;
pub use stage::Tools;
