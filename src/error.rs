//! Error types.

use core::fmt;

/// Error type.
///
/// Each variant carries a short static description of the failed check.
/// All errors are reported before any output is modified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The caller supplied an output or workspace buffer that is too
    /// small, or combined operands that do not belong together (e.g.
    /// field elements modulo two distinct primes).
    InvalidArgument(&'static str),

    /// A requested transformation is impossible: inversion of zero,
    /// inversion modulo a non-prime, or a representation change that
    /// the element configuration forbids.
    IllegalTransformation(&'static str),

    /// A point is not on its curve, or two points on distinct curves
    /// were combined.
    IllegalPoint(&'static str),

    /// Malformed input to a decoding function (wrong length, unknown
    /// format tag, out-of-range value).
    Decoding(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(s) => write!(f, "invalid argument: {}", s),
            Error::IllegalTransformation(s) => write!(f, "illegal transformation: {}", s),
            Error::IllegalPoint(s) => write!(f, "illegal point: {}", s),
            Error::Decoding(s) => write!(f, "decoding error: {}", s),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type.
pub type Result<T> = core::result::Result<T, Error>;
