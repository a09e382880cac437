use thiserror::Error;

/// Errors raised while building constraints or running an optimization.
///
/// The four run-fatal variants carry the exact messages surfaced in
/// `OptimizationResult::error`.
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("No active securities")]
    NoActiveSecurities,

    #[error("No expected returns data")]
    NoExpectedReturns,

    #[error("Insufficient price history")]
    InsufficientPriceHistory,

    #[error("Both MV and HRP failed")]
    BothMethodsFailed,

    #[error("Risk model error: {0}")]
    RiskModel(String),

    #[error("Collaborator failure: {0}")]
    Collaborator(String),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Failure modes of the numerical primitives.
///
/// `Infeasible` is the expected outcome when a constraint set or objective
/// target cannot be met; the cascade treats it as "try the next strategy".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error("Infeasible: {0}")]
    Infeasible(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Numerical failure: {0}")]
    Numerical(String),
}

impl From<serde_json::Error> for OptimizerError {
    fn from(e: serde_json::Error) -> Self {
        OptimizerError::SerializationError(e.to_string())
    }
}
