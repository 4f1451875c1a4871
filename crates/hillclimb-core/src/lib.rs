//! hillclimb-core: Evaluation pipeline, score ledger, and output promotion.
//!
//! This crate defines the data model, the per-dataset evaluation worker and
//! the concurrent orchestrator that the rest of hillclimb builds on.

pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod mock;
pub mod model;
pub mod promote;
pub mod report;
pub mod traits;
pub mod worker;

pub use engine::{EngineConfig, NoopReporter, Orchestrator, ProgressReporter};
pub use error::{DatasetError, EvalError};
pub use model::{Dataset, DatasetPaths, EvaluationResult, ModelOutput, Score, Status};
pub use report::RunReport;
