use core::fmt;

/// Result type with the `opgp-ecc` crate's [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised by curve operations.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// Malformed input: an out-of-range field element, a byte encoding that
    /// is not a curve point, a bad private key.
    InvalidArguments(&'static str),
    /// A capability mismatch, e.g. requesting a shared secret from a
    /// signature-only curve.
    Unsupported(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArguments(msg) => write!(f, "invalid arguments: {}", msg),
            Error::Unsupported(msg) => write!(f, "unsupported: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<opgp_bignum::Error> for Error {
    fn from(err: opgp_bignum::Error) -> Error {
        match err {
            opgp_bignum::Error::InvalidArguments(msg) => Error::InvalidArguments(msg),
        }
    }
}
