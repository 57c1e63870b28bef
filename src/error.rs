//! Error types for stress updates and tensor algebra.

use thiserror::Error;

/// Result type alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported to the caller of a stress update.
///
/// None of these are recovered internally. A failed point leaves the committed
/// history untouched, so the caller can cut its step and retry from there.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A tensor could not be inverted.
    #[error("singular tensor: {0}")]
    SingularTensor(String),

    /// The local Newton iteration ran out of iterations.
    #[error(
        "return mapping did not converge at qp {qp} after {iterations} iterations (residual: {residual:.3e})"
    )]
    ConvergenceFailure {
        qp: usize,
        iterations: usize,
        residual: f64,
    },

    /// The inputs of an update violate its preconditions.
    #[error("inadmissible input: {0}")]
    InadmissibleInput(String),

    /// A model or settings parameter is missing or out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
