//! RFC 4880 section 3.7 string-to-key algorithms.

use digest::DynDigest;
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Hash algorithms by their OpenPGP identifiers (RFC 4880 section 9.4).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    /// The RFC 4880 algorithm octet.
    pub fn id(&self) -> u8 {
        match self {
            HashAlgorithm::Md5 => 1,
            HashAlgorithm::Sha1 => 2,
            HashAlgorithm::Sha256 => 8,
            HashAlgorithm::Sha512 => 10,
        }
    }

    /// Looks an algorithm up by its octet.
    pub fn from_id(id: u8) -> Result<HashAlgorithm> {
        match id {
            1 => Ok(HashAlgorithm::Md5),
            2 => Ok(HashAlgorithm::Sha1),
            8 => Ok(HashAlgorithm::Sha256),
            10 => Ok(HashAlgorithm::Sha512),
            _ => Err(Error::Unsupported("hash algorithm")),
        }
    }

    /// The digest length in bytes.
    pub fn digest_size(&self) -> usize {
        match self {
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// The internal block length in bytes.
    pub fn block_size(&self) -> usize {
        match self {
            HashAlgorithm::Sha512 => 128,
            _ => 64,
        }
    }

    /// A fresh incremental hasher.
    pub fn hasher(&self) -> Box<dyn DynDigest> {
        match self {
            HashAlgorithm::Md5 => Box::<Md5>::default(),
            HashAlgorithm::Sha1 => Box::<Sha1>::default(),
            HashAlgorithm::Sha256 => Box::<Sha256>::default(),
            HashAlgorithm::Sha512 => Box::<Sha512>::default(),
        }
    }

    /// One-shot digest.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        let mut hasher = self.hasher();
        hasher.update(data);
        hasher.finalize().to_vec()
    }
}

/// Maximum salt length on the wire.
pub const MAX_SALT_SIZE: usize = 8;

/// An S2K specifier: the hash, salt, and iteration count that turn a
/// passphrase into a symmetric key.
///
/// The GnuPG "dummy" extension (type 101, smartcard stubs) is not carried;
/// it marks key material held outside this core.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum S2k {
    /// Type 0: hash the passphrase directly.
    Simple { hash: HashAlgorithm },
    /// Type 1: hash salt then passphrase.
    Salted { hash: HashAlgorithm, salt: [u8; 8] },
    /// Type 3: hash the salted passphrase repeated out to a decoded byte
    /// count.
    Iterated {
        hash: HashAlgorithm,
        salt: [u8; 8],
        encoded_count: u8,
    },
}

/// The EXPBIAS constant of RFC 4880 section 3.7.1.3.
const EXPBIAS: u32 = 6;

impl S2k {
    /// The RFC 4880 type octet.
    pub fn type_id(&self) -> u8 {
        match self {
            S2k::Simple { .. } => 0,
            S2k::Salted { .. } => 1,
            S2k::Iterated { .. } => 3,
        }
    }

    /// The hash algorithm in use.
    pub fn hash(&self) -> HashAlgorithm {
        match self {
            S2k::Simple { hash } | S2k::Salted { hash, .. } | S2k::Iterated { hash, .. } => *hash,
        }
    }

    /// Decodes an encoded one-octet count into a byte count.
    pub fn decode_count(c: u8) -> usize {
        (16 + (c as usize & 15)) << ((c as u32 >> 4) + EXPBIAS)
    }

    /// Derives `length` bytes of key material from a passphrase. When one
    /// digest is not enough, further rounds prepend one more zero byte each
    /// and their outputs are concatenated.
    pub fn produce_key(&self, passphrase: &[u8], length: usize) -> Zeroizing<Vec<u8>> {
        match self {
            S2k::Simple { hash } => stretched(*hash, passphrase, length),
            S2k::Salted { hash, salt } => {
                let mut salted = Zeroizing::new(salt.to_vec());
                salted.extend_from_slice(passphrase);
                stretched(*hash, &salted, length)
            }
            S2k::Iterated {
                hash,
                salt,
                encoded_count,
            } => {
                let mut salted = Zeroizing::new(salt.to_vec());
                salted.extend_from_slice(passphrase);
                iterated(*hash, &salted, S2k::decode_count(*encoded_count), length)
            }
        }
    }

    /// Serializes to the wire form: type octet, hash octet, then salt and
    /// count as the type requires.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = vec![self.type_id(), self.hash().id()];
        match self {
            S2k::Simple { .. } => {}
            S2k::Salted { salt, .. } => out.extend_from_slice(salt),
            S2k::Iterated {
                salt,
                encoded_count,
                ..
            } => {
                out.extend_from_slice(salt);
                out.push(*encoded_count);
            }
        }
        out
    }

    /// Parses an S2K from the front of `bytes`, advancing the slice past
    /// what was consumed.
    pub fn parse(bytes: &mut &[u8]) -> Result<S2k> {
        let type_id = take(bytes, 1)?[0];
        let hash = HashAlgorithm::from_id(take(bytes, 1)?[0])?;
        match type_id {
            0 => Ok(S2k::Simple { hash }),
            1 => {
                let salt = salt8(take(bytes, MAX_SALT_SIZE)?)?;
                Ok(S2k::Salted { hash, salt })
            }
            3 => {
                let salt = salt8(take(bytes, MAX_SALT_SIZE)?)?;
                let encoded_count = take(bytes, 1)?[0];
                Ok(S2k::Iterated {
                    hash,
                    salt,
                    encoded_count,
                })
            }
            _ => Err(Error::Parse("invalid S2K type")),
        }
    }
}

fn take<'a>(bytes: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
    if bytes.len() < n {
        return Err(Error::Parse("invalid S2K packet"));
    }
    let (head, tail) = bytes.split_at(n);
    *bytes = tail;
    Ok(head)
}

fn salt8(bytes: &[u8]) -> Result<[u8; 8]> {
    bytes
        .try_into()
        .map_err(|_| Error::Parse("invalid S2K salt"))
}

/// Simple/salted stretching: round i hashes i zero bytes then the data.
fn stretched(hash: HashAlgorithm, data: &[u8], length: usize) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(Vec::with_capacity(length + hash.digest_size()));
    let mut zero_prepend = 0usize;
    while out.len() < length {
        let mut hasher = hash.hasher();
        hasher.update(&vec![0u8; zero_prepend]);
        hasher.update(data);
        out.extend_from_slice(&hasher.finalize());
        zero_prepend += 1;
    }
    out.truncate(length);
    out
}

/// Iterated stretching: each round hashes its zero preload and then the
/// salted passphrase repeated out to `count` bytes, the preload counting
/// toward the budget. The input is fed block-sized chunks of the repeated
/// stream.
fn iterated(
    hash: HashAlgorithm,
    salted: &[u8],
    count: usize,
    length: usize,
) -> Zeroizing<Vec<u8>> {
    let count = count.max(salted.len());
    let block_size = hash.block_size();
    let mut out = Zeroizing::new(Vec::with_capacity(length + hash.digest_size()));
    let mut zero_prepend = 0usize;
    while out.len() < length {
        let mut hasher = hash.hasher();
        let mut remaining = count;
        if zero_prepend > 0 {
            let size = block_size.min(remaining).saturating_sub(zero_prepend);
            let mut first = Zeroizing::new(vec![0u8; zero_prepend]);
            first.extend_from_slice(&stream_slice(salted, 0, size));
            hasher.update(&first);
            remaining -= size;
        }
        while remaining > 0 {
            let offset = (count - remaining) % salted.len();
            let size = block_size.min(remaining);
            hasher.update(&stream_slice(salted, offset, size));
            remaining -= size;
        }
        out.extend_from_slice(&hasher.finalize());
        zero_prepend += 1;
    }
    out.truncate(length);
    out
}

/// `size` bytes of the infinitely repeated `data`, starting at `offset`.
fn stream_slice(data: &[u8], offset: usize, size: usize) -> Zeroizing<Vec<u8>> {
    Zeroizing::new((0..size).map(|i| data[(offset + i) % data.len()]).collect())
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn hash_ids_round_trip() {
        for hash in [
            HashAlgorithm::Md5,
            HashAlgorithm::Sha1,
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha512,
        ] {
            assert_eq!(HashAlgorithm::from_id(hash.id()).unwrap(), hash);
        }
        assert!(HashAlgorithm::from_id(3).is_err());
    }

    #[test]
    fn md5_known_answer() {
        assert_eq!(
            HashAlgorithm::Md5.digest(b"abc"),
            hex!("900150983cd24fb0d6963f7d28e17f72")
        );
    }

    #[test]
    fn sha1_known_answer() {
        assert_eq!(
            HashAlgorithm::Sha1.digest(b"abc"),
            hex!("a9993e364706816aba3e25717850c26c9cd0d89d")
        );
    }

    #[test]
    fn decode_count_known_values() {
        assert_eq!(S2k::decode_count(0), 1024);
        assert_eq!(S2k::decode_count(96), 65536);
        assert_eq!(S2k::decode_count(255), 65011712);
    }

    #[test]
    fn simple_s2k_is_a_truncated_hash() {
        let s2k = S2k::Simple {
            hash: HashAlgorithm::Sha1,
        };
        let key = s2k.produce_key(b"hello", 16);
        assert_eq!(&key[..], &HashAlgorithm::Sha1.digest(b"hello")[..16]);
    }

    #[test]
    fn simple_s2k_extends_with_zero_preloads() {
        let s2k = S2k::Simple {
            hash: HashAlgorithm::Sha1,
        };
        let key = s2k.produce_key(b"hello", 32);
        assert_eq!(&key[..20], &HashAlgorithm::Sha1.digest(b"hello")[..]);
        assert_eq!(&key[20..32], &HashAlgorithm::Sha1.digest(b"\x00hello")[..12]);
    }

    #[test]
    fn salted_s2k_prepends_the_salt() {
        let s2k = S2k::Salted {
            hash: HashAlgorithm::Sha1,
            salt: *b"saltsalt",
        };
        let key = s2k.produce_key(b"pp", 20);
        assert_eq!(&key[..], &HashAlgorithm::Sha1.digest(b"saltsaltpp")[..]);
    }

    #[test]
    fn iterated_s2k_with_minimal_count_hashes_once() {
        // When the decoded count is smaller than the salted passphrase, it
        // is raised to its length, so one copy gets hashed.
        let s2k = S2k::Iterated {
            hash: HashAlgorithm::Sha1,
            salt: *b"saltsalt",
            encoded_count: 0, // 1024, still less than a 2000-byte passphrase
        };
        let long_passphrase = vec![0x61u8; 2000];
        let mut salted = b"saltsalt".to_vec();
        salted.extend_from_slice(&long_passphrase);
        let key = s2k.produce_key(&long_passphrase, 20);
        assert_eq!(&key[..], &HashAlgorithm::Sha1.digest(&salted)[..]);
    }

    #[test]
    fn iterated_s2k_is_deterministic_and_salt_sensitive() {
        let mk = |salt: [u8; 8]| S2k::Iterated {
            hash: HashAlgorithm::Sha1,
            salt,
            encoded_count: 96,
        };
        let a = mk(*b"AAAAAAAA").produce_key(b"passphrase", 32);
        let b = mk(*b"AAAAAAAA").produce_key(b"passphrase", 32);
        let c = mk(*b"BBBBBBBB").produce_key(b"passphrase", 32);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(&a[..], &mk(*b"AAAAAAAA").produce_key(b"other", 32)[..]);
    }

    #[test]
    fn serialize_parse_round_trip() {
        let specs = [
            S2k::Simple {
                hash: HashAlgorithm::Sha256,
            },
            S2k::Salted {
                hash: HashAlgorithm::Sha1,
                salt: *b"01234567",
            },
            S2k::Iterated {
                hash: HashAlgorithm::Sha1,
                salt: *b"76543210",
                encoded_count: 96,
            },
        ];
        for spec in specs {
            let wire = spec.serialize();
            let mut reader = &wire[..];
            assert_eq!(S2k::parse(&mut reader).unwrap(), spec);
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn parse_rejects_garbage() {
        // Unknown type.
        assert!(S2k::parse(&mut &[101u8, 2][..]).is_err());
        // Truncated salt.
        assert!(S2k::parse(&mut &[1u8, 2, 0, 1, 2][..]).is_err());
        // Missing count octet.
        assert!(S2k::parse(&mut &[3u8, 2, 0, 1, 2, 3, 4, 5, 6, 7][..]).is_err());
        // Bad hash id.
        assert!(S2k::parse(&mut &[0u8, 99][..]).is_err());
    }
}
