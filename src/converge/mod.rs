//! Converge module - merges the Go files of one package into a single file.
//!
//! This module provides the building blocks of the merge pipeline:
//! - **Classifier**: line-level state machine via [`classifier::classify`]
//! - **Parser**: per-file partial documents via [`parser::parse_file`]
//! - **Scanner**: file selection via [`Scanner`] and [`ScanRule`]
//! - **Pipeline**: concurrent coordinator via [`Converger`]
//! - **Rendering**: source output and formatters via [`render::render`], [`Gofmt`]

pub mod classifier;
pub mod formatters;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod rules;
pub mod scanner;
pub mod signal;

// Re-export commonly used types
pub use classifier::{classify, ClassifierState, LineAction};
pub use formatters::{Gofmt, Passthrough, DEFAULT_FORMATTER};
pub use parser::{parse_file, parse_source, FileParser};
pub use pipeline::{Convergence, Converger, MergeStats, PipelineError};
pub use rules::{ExcludePattern, NameVerdict, ScanRule};
pub use scanner::Scanner;
pub use signal::CancelToken;
