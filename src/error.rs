//! Error types of the Laplacian inversion
use thiserror::Error;

/// Everything that can go wrong during construction or a solve.
///
/// Configuration and shape errors are raised before any communication,
/// pivot errors only after all processors agreed on the outcome.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or conflicting solver configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Array shape does not match the mesh partition
    #[error("shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Name of the offending input
        what: &'static str,
        /// Shape expected from the partition
        expected: Vec<usize>,
        /// Shape that was supplied
        actual: Vec<usize>,
    },

    /// Non-contiguous, overlapping or empty partition ranges
    #[error("invalid partition: {0}")]
    Partition(String),

    /// Zero or near-zero pivot during elimination, usually a singular DC mode
    #[error("degenerate pivot during tridiagonal elimination on rank {rank}")]
    DegeneratePivot {
        /// Lowest rank that hit the pivot
        rank: usize,
    },

    /// Failed message exchange, the whole processor group is unusable
    #[error("communication failure: {0}")]
    Communication(String),
}

/// Result type of this crate
pub type Result<T> = std::result::Result<T, Error>;
