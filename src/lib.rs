pub mod cli;
pub mod command;
pub mod converge;
pub mod executor;
pub mod logging;
pub mod model;
pub mod traits;

// Re-export common types for convenience
pub use command::ConvergeCommand;
pub use converge::{CancelToken, Convergence, Converger, MergeStats, PipelineError, ScanRule};
pub use executor::*;
pub use model::*;
pub use traits::*;
