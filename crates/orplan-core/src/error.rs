use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlanError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("Malformed input for {entity}: {reason}")]
    MalformedInput { entity: String, reason: String },
    #[error("Missing cost for operation {operation} in room {room}")]
    MissingCost { room: String, operation: String },
    #[error("Missing average cost for operation {0}")]
    MissingAverageCost(String),
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
    #[error("Inconsistent solution at {variable}: {detail}")]
    InconsistentSolution { variable: String, detail: String },
    #[error("Solver error: {0}")]
    Solver(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl PlanError {
    pub(crate) fn malformed(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        PlanError::MalformedInput {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn inconsistent(variable: impl Into<String>, detail: impl Into<String>) -> Self {
        PlanError::InconsistentSolution {
            variable: variable.into(),
            detail: detail.into(),
        }
    }
}
