use core::fmt;

use crate::encrypted::CipherAlgorithm;

/// Result type with the `opgp-keywrap` crate's [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised by the key-wrap layer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// A caller contract violation: malformed constructor metadata, bad
    /// salt or count, out-of-range key material.
    InvalidArguments(&'static str),
    /// A capability mismatch: an algorithm this core does not provide.
    Unsupported(&'static str),
    /// Malformed wire data encountered while parsing an S2K block or MPI.
    Parse(&'static str),
    /// Required decryption metadata is missing or unusable.
    Decrypt(&'static str),
    /// Unlock was attempted on a passphrase-protected key without a
    /// passphrase; the caller should prompt and retry.
    MissingPassphrase,
    /// The checksum did not verify after decryption. Deliberately identical
    /// for a wrong passphrase and corrupted data, so failure tells an
    /// attacker nothing about which occurred.
    WrongPassphrase,
    /// A private operation was attempted on a locked key. Carries the
    /// wrapped key's algorithm so the caller can tell which key needs
    /// unlocking.
    LockedKey(CipherAlgorithm),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArguments(msg) => write!(f, "invalid arguments: {}", msg),
            Error::Unsupported(msg) => write!(f, "unsupported: {}", msg),
            Error::Parse(msg) => write!(f, "parse error: {}", msg),
            Error::Decrypt(msg) => write!(f, "decrypt error: {}", msg),
            Error::MissingPassphrase => write!(f, "a passphrase is required to unlock this key"),
            Error::WrongPassphrase => write!(f, "key checksum mismatch"),
            Error::LockedKey(algorithm) => write!(
                f,
                "operation not allowed on a locked {:?} key; unlock it first",
                algorithm
            ),
        }
    }
}

impl std::error::Error for Error {}

impl From<opgp_ecc::Error> for Error {
    fn from(err: opgp_ecc::Error) -> Error {
        match err {
            opgp_ecc::Error::InvalidArguments(msg) => Error::InvalidArguments(msg),
            opgp_ecc::Error::Unsupported(msg) => Error::Unsupported(msg),
        }
    }
}

impl From<opgp_bignum::Error> for Error {
    fn from(err: opgp_bignum::Error) -> Error {
        match err {
            opgp_bignum::Error::InvalidArguments(msg) => Error::InvalidArguments(msg),
        }
    }
}
