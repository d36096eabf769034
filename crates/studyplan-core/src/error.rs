//! Error taxonomy for planner operations.

use thiserror::Error;

/// Errors surfaced by plan generation, re-optimization, and goal
/// lifecycle operations.
///
/// `NotFound` and `Validation` are caller-correctable and carry a
/// descriptive message. `Persistence` is deliberately opaque: it means
/// the transaction could not commit (nothing was partially applied) and
/// the detail belongs in the logs, not the response.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Goal, task, or student absent -- or present but not owned by the
    /// caller, which is indistinguishable by design.
    #[error("{0}")]
    NotFound(String),

    /// Caller-correctable input problem (date ordering, bad fields).
    #[error("{0}")]
    Validation(String),

    /// Candidate production failed and could not be recovered.
    #[error("plan generation failed: {0}")]
    Generation(String),

    /// Infrastructure failure; the batch was rolled back in full.
    #[error("storage failure")]
    Persistence(#[from] anyhow::Error),
}

impl PlanError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
