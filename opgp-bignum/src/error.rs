use core::fmt;

/// Result type with the `opgp-bignum` crate's [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised by big-number operations.
///
/// Every variant is a caller contract violation; none of them is raised
/// based on the numeric value of a secret operand.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// Structurally invalid input: subtraction underflow, shift amount
    /// outside `0..=23`, zero divisor, integer out of range.
    InvalidArguments(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArguments(msg) => write!(f, "invalid arguments: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
