//! OpenPGP multiprecision integers (RFC 4880 section 3.2): a two-octet
//! big-endian bit count followed by the magnitude, big endian, with no
//! leading zero octets.

use opgp_bignum::BigNum;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{Error, Result};

/// A parsed MPI: the magnitude bytes in minimal big-endian form.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Mpi {
    bytes: Zeroizing<Vec<u8>>,
}

impl Mpi {
    /// Wraps magnitude bytes, normalizing away leading zeros.
    pub fn new(bytes: &[u8]) -> Mpi {
        let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
        Mpi {
            bytes: Zeroizing::new(bytes[start..].to_vec()),
        }
    }

    /// An MPI holding a number's value.
    pub fn from_bignum(value: &BigNum) -> Mpi {
        let bytes = value.to_bytes_be();
        // A zero BigNum encodes as one zero byte; the MPI form drops it.
        Mpi::new(&bytes)
    }

    /// The magnitude bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The magnitude left-padded to a fixed width (for fixed-size raw keys
    /// whose leading zeros the MPI form strips).
    pub fn to_padded_bytes(&self, width: usize) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(vec![0u8; width.saturating_sub(self.bytes.len())]);
        out.extend_from_slice(&self.bytes);
        out
    }

    /// The value as a number.
    pub fn to_bignum(&self) -> BigNum {
        BigNum::from_bytes_be(&self.bytes)
    }

    /// Parses an MPI from the front of `bytes`, advancing the slice.
    pub fn parse(bytes: &mut &[u8]) -> Result<Mpi> {
        if bytes.len() < 2 {
            return Err(Error::Parse("truncated MPI length"));
        }
        let bit_count = ((bytes[0] as usize) << 8) | bytes[1] as usize;
        let byte_count = (bit_count + 7) / 8;
        if bytes.len() < 2 + byte_count {
            return Err(Error::Parse("truncated MPI body"));
        }
        let body = &bytes[2..2 + byte_count];
        *bytes = &bytes[2 + byte_count..];
        Ok(Mpi::new(body))
    }

    /// Serializes to the wire form.
    pub fn serialize(&self) -> Vec<u8> {
        let bit_count = if self.bytes.is_empty() {
            0
        } else {
            BigNum::from_bytes_be(&self.bytes).bit_length()
        };
        let mut out = Vec::with_capacity(2 + self.bytes.len());
        out.push((bit_count >> 8) as u8);
        out.push((bit_count & 0xFF) as u8);
        out.extend_from_slice(&self.bytes);
        out
    }
}

impl Zeroize for Mpi {
    fn zeroize(&mut self) {
        self.bytes.zeroize();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() {
        let mpi = Mpi::new(&[0x01, 0x02, 0xff]);
        let wire = mpi.serialize();
        assert_eq!(wire, [0x00, 0x11, 0x01, 0x02, 0xff]);
        let mut reader = &wire[..];
        assert_eq!(Mpi::parse(&mut reader).unwrap(), mpi);
        assert!(reader.is_empty());
    }

    #[test]
    fn bit_count_reflects_the_top_byte() {
        assert_eq!(Mpi::new(&[0x01]).serialize(), [0x00, 0x01, 0x01]);
        assert_eq!(Mpi::new(&[0x80]).serialize(), [0x00, 0x08, 0x80]);
        assert_eq!(Mpi::new(&[0xff, 0x00]).serialize(), [0x00, 0x10, 0xff, 0x00]);
    }

    #[test]
    fn leading_zeros_are_normalized() {
        let mpi = Mpi::new(&[0x00, 0x00, 0x05]);
        assert_eq!(mpi.as_bytes(), [0x05]);
        assert_eq!(&mpi.to_padded_bytes(4)[..], [0x00, 0x00, 0x00, 0x05]);
    }

    #[test]
    fn zero_serializes_empty() {
        let mpi = Mpi::from_bignum(&BigNum::zero());
        assert_eq!(mpi.serialize(), [0x00, 0x00]);
        let mut reader = &[0x00u8, 0x00][..];
        assert_eq!(Mpi::parse(&mut reader).unwrap(), mpi);
    }

    #[test]
    fn truncation_is_an_error() {
        assert!(Mpi::parse(&mut &[0x00u8][..]).is_err());
        assert!(Mpi::parse(&mut &[0x00u8, 0x11, 0x01][..]).is_err());
    }

    #[test]
    fn consecutive_mpis_parse_in_sequence() {
        let mut wire = Mpi::new(&[0x03]).serialize();
        wire.extend(Mpi::new(&[0x04, 0x05]).serialize());
        let mut reader = &wire[..];
        assert_eq!(Mpi::parse(&mut reader).unwrap().as_bytes(), [0x03]);
        assert_eq!(Mpi::parse(&mut reader).unwrap().as_bytes(), [0x04, 0x05]);
        assert!(reader.is_empty());
    }
}
