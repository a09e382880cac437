pub mod cascade;
pub mod collaborators;
pub mod config;
pub mod constraints;
pub mod error;
pub mod math;
pub mod optimizer;
pub mod solver;
pub mod types;

pub use config::OptimizerConfig;
pub use error::{OptimizerError, SolverError};
pub use optimizer::{BlendedOptimizer, OptimizationRequest, OptimizationResult, WeightChange};

/// Standard result type for all optimizer operations.
pub type OptimizerResult<T> = Result<T, OptimizerError>;
