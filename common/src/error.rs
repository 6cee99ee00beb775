use lin_reg::LinRegError;
use thiserror::Error;

use crate::GlmFit;

/// Convenience alias used throughout the workspace
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while fitting or evaluating an encoding model
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Malformed bins, timestamps, dimensions or parameters
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Well formed input that leaves the requested quantity undefined,
    /// e.g. no spikes at all or a target without variance
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// The normal equations cannot be solved
    #[error("singular matrix: {0}")]
    SingularMatrix(String),

    /// The iterative solver ran out of iterations.
    /// `fit` holds the best coefficients found, which remain usable.
    #[error("no convergence within {iterations} iterations (penalty strength {})", .fit.penalty_strength)]
    Convergence {
        /// Iterations spent on the selected candidate
        iterations: usize,
        /// Best available fit
        fit: Box<GlmFit>,
    },
}

impl From<LinRegError> for Error {
    fn from(e: LinRegError) -> Self {
        match e {
            LinRegError::Singular { .. } => Error::SingularMatrix(e.to_string()),
            LinRegError::Empty { .. } | LinRegError::DimensionMismatch { .. } => {
                Error::InvalidInput(e.to_string())
            }
        }
    }
}
