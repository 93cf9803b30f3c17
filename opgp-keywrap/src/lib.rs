//! Protection of OpenPGP private-key material at rest.
//!
//! [`S2k`] turns passphrases into symmetric keys (RFC 4880 section 3.7);
//! [`EncryptedCipher`] wraps an asymmetric cipher or signer so that signing
//! and decryption require an explicit unlock, verifying a checksum or
//! SHA-1 trailer against the recovered material and parsing it into the
//! wrapped cipher. Re-locking with a passphrase always upgrades to
//! S2K-SHA1 with AES-256.
//!
//! This crate owns no packet framing: the derivation-type octet, IV,
//! symmetric-algorithm octet, and S2K block are accepted and surfaced as
//! fields so the (external) packet layer can round-trip RFC 4880 section
//! 5.5.3 exactly.

mod encrypted;
mod error;
mod mpi;
mod s2k;
mod symmetric;

pub use crate::{
    encrypted::{
        numeric_checksum, CipherAlgorithm, EcdhCipher, EcdsaCipher, EddsaCipher, EncryptedCipher,
        KeyDerivationType, PrivateKeyMaterial, WrappedCipher, DEFAULT_CIPHER, DEFAULT_COUNT,
    },
    error::{Error, Result},
    mpi::Mpi,
    s2k::{HashAlgorithm, S2k, MAX_SALT_SIZE},
    symmetric::SymmetricAlgorithm,
};
