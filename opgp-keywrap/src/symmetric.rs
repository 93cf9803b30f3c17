//! The symmetric wrap around secret-key material: the AES family in CFB
//! mode, keyed by the RFC 4880 section 9.2 algorithm octets.

use aes::{Aes128, Aes192, Aes256};
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};

use crate::error::{Error, Result};

type Aes128CfbEnc = cfb_mode::Encryptor<Aes128>;
type Aes128CfbDec = cfb_mode::Decryptor<Aes128>;
type Aes192CfbEnc = cfb_mode::Encryptor<Aes192>;
type Aes192CfbDec = cfb_mode::Decryptor<Aes192>;
type Aes256CfbEnc = cfb_mode::Encryptor<Aes256>;
type Aes256CfbDec = cfb_mode::Decryptor<Aes256>;

/// The symmetric algorithms this core wraps keys with.
///
/// Re-locking always writes AES-256; the rest of the family is accepted for
/// reading. The RFC 4880 legacy ciphers (IDEA, 3DES, CAST5, Blowfish,
/// Twofish) surface as [`Error::Unsupported`] on parse.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SymmetricAlgorithm {
    Aes128,
    Aes192,
    Aes256,
}

impl SymmetricAlgorithm {
    /// The RFC 4880 algorithm octet.
    pub fn id(&self) -> u8 {
        match self {
            SymmetricAlgorithm::Aes128 => 7,
            SymmetricAlgorithm::Aes192 => 8,
            SymmetricAlgorithm::Aes256 => 9,
        }
    }

    /// Looks an algorithm up by its octet.
    pub fn from_id(id: u8) -> Result<SymmetricAlgorithm> {
        match id {
            7 => Ok(SymmetricAlgorithm::Aes128),
            8 => Ok(SymmetricAlgorithm::Aes192),
            9 => Ok(SymmetricAlgorithm::Aes256),
            1..=4 | 10 => Err(Error::Unsupported("legacy symmetric algorithm")),
            _ => Err(Error::Parse("unknown symmetric algorithm")),
        }
    }

    /// The key length in bytes.
    pub fn key_size(&self) -> usize {
        match self {
            SymmetricAlgorithm::Aes128 => 16,
            SymmetricAlgorithm::Aes192 => 24,
            SymmetricAlgorithm::Aes256 => 32,
        }
    }

    /// The block (and IV) length in bytes.
    pub fn block_size(&self) -> usize {
        16
    }

    /// CFB-mode encryption; the output is the same length as the input,
    /// trailing partial blocks included.
    pub fn cfb_encrypt(&self, key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        let mut buf = data.to_vec();
        match self {
            SymmetricAlgorithm::Aes128 => Aes128CfbEnc::new_from_slices(key, iv)
                .map_err(|_| Error::Decrypt("bad key or IV length"))?
                .encrypt(&mut buf),
            SymmetricAlgorithm::Aes192 => Aes192CfbEnc::new_from_slices(key, iv)
                .map_err(|_| Error::Decrypt("bad key or IV length"))?
                .encrypt(&mut buf),
            SymmetricAlgorithm::Aes256 => Aes256CfbEnc::new_from_slices(key, iv)
                .map_err(|_| Error::Decrypt("bad key or IV length"))?
                .encrypt(&mut buf),
        }
        Ok(buf)
    }

    /// CFB-mode decryption.
    pub fn cfb_decrypt(&self, key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        let mut buf = data.to_vec();
        match self {
            SymmetricAlgorithm::Aes128 => Aes128CfbDec::new_from_slices(key, iv)
                .map_err(|_| Error::Decrypt("bad key or IV length"))?
                .decrypt(&mut buf),
            SymmetricAlgorithm::Aes192 => Aes192CfbDec::new_from_slices(key, iv)
                .map_err(|_| Error::Decrypt("bad key or IV length"))?
                .decrypt(&mut buf),
            SymmetricAlgorithm::Aes256 => Aes256CfbDec::new_from_slices(key, iv)
                .map_err(|_| Error::Decrypt("bad key or IV length"))?
                .decrypt(&mut buf),
        }
        Ok(buf)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn ids_round_trip() {
        for alg in [
            SymmetricAlgorithm::Aes128,
            SymmetricAlgorithm::Aes192,
            SymmetricAlgorithm::Aes256,
        ] {
            assert_eq!(SymmetricAlgorithm::from_id(alg.id()).unwrap(), alg);
        }
        assert_eq!(
            SymmetricAlgorithm::from_id(3).unwrap_err(),
            Error::Unsupported("legacy symmetric algorithm")
        );
        assert!(matches!(
            SymmetricAlgorithm::from_id(200).unwrap_err(),
            Error::Parse(_)
        ));
    }

    #[test]
    fn aes128_cfb_known_answer() {
        // NIST SP 800-38A F.3.13, CFB128-AES128, first block.
        let key = hex!("2b7e151628aed2a6abf7158809cf4f3c");
        let iv = hex!("000102030405060708090a0b0c0d0e0f");
        let plaintext = hex!("6bc1bee22e409f96e93d7e117393172a");
        let expected = hex!("3b3fd92eb72dad20333449f8e83cfb4a");
        let ciphertext = SymmetricAlgorithm::Aes128
            .cfb_encrypt(&key, &iv, &plaintext)
            .unwrap();
        assert_eq!(ciphertext, expected);
        let decrypted = SymmetricAlgorithm::Aes128
            .cfb_decrypt(&key, &iv, &ciphertext)
            .unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn partial_blocks_round_trip() {
        let key = [0x42u8; 32];
        let iv = [0x17u8; 16];
        let data = b"twenty-three byte input";
        assert_eq!(data.len(), 23);
        let ciphertext = SymmetricAlgorithm::Aes256
            .cfb_encrypt(&key, &iv, data)
            .unwrap();
        assert_eq!(ciphertext.len(), 23);
        let decrypted = SymmetricAlgorithm::Aes256
            .cfb_decrypt(&key, &iv, &ciphertext)
            .unwrap();
        assert_eq!(decrypted, data);
    }

    #[test]
    fn bad_iv_length_is_a_decrypt_error() {
        let err = SymmetricAlgorithm::Aes128
            .cfb_decrypt(&[0u8; 16], &[0u8; 5], b"data")
            .unwrap_err();
        assert!(matches!(err, Error::Decrypt(_)));
    }
}
