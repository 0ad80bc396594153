use thiserror::Error;

/// Errors raised by solver construction and integration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SolveError {
    #[error("\"{name}\" was given as a solver name, but no solver with that name is registered")]
    UnknownSolver { name: String },

    #[error("invalid solver config: {reason}")]
    InvalidConfig { reason: &'static str },

    #[error("integration exceeded the maximum of {max_steps} steps before reaching the end of the time span")]
    StepLimitExceeded { max_steps: usize },

    #[error(
        "the system is not compatible with adaptive step-size integration \
         and no fallback strategy is configured"
    )]
    AdaptiveIncompatible,

    #[error("the numerical stepper failed: {reason}")]
    Numerical { reason: String },
}
