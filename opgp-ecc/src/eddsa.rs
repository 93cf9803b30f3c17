//! Ed25519 signatures (RFC 8032).

use std::sync::Arc;

use opgp_bignum::BigNum;
use sha2::{Digest, Sha512};
use zeroize::Zeroizing;

use crate::domain::{DomainParams, PrimeCurve};
use crate::edwards::{EdwardsCurve, EdwardsPoint};
use crate::error::{Error, Result};

/// An Ed25519 signer/verifier.
pub struct Eddsa {
    params: Arc<DomainParams>,
    public_key: Vec<u8>,
    public_point: EdwardsPoint,
    /// The clamped signing scalar, present only with a private key.
    scalar: Option<Zeroizing<BigNum>>,
    /// The nonce-derivation secret, the high half of the expanded key.
    prefix: Option<Zeroizing<Vec<u8>>>,
}

impl Eddsa {
    /// A signer from the 32-byte private seed.
    pub fn from_seed(seed: &[u8]) -> Result<Eddsa> {
        let params = DomainParams::from_curve(PrimeCurve::Ed25519);
        let (scalar, prefix) = params.expand_private_key(seed)?;
        let (_, g) = params.edwards()?;
        let public_point = g.multiply(&scalar);
        Ok(Eddsa {
            public_key: public_point.to_bytes(),
            public_point,
            scalar: Some(Zeroizing::new(scalar)),
            prefix: Some(prefix),
            params,
        })
    }

    /// A verifier for an existing 32-byte public key.
    pub fn from_public_key(public_key: &[u8]) -> Result<Eddsa> {
        let params = DomainParams::from_curve(PrimeCurve::Ed25519);
        let (curve, _) = params.edwards()?;
        let public_point = EdwardsCurve::point_from_bytes(curve, public_key)?;
        Ok(Eddsa {
            public_key: public_key.to_vec(),
            public_point,
            scalar: None,
            prefix: None,
            params,
        })
    }

    /// The 32-byte public key.
    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public_key
    }

    /// Returns true if signing material is present.
    pub fn has_private_key(&self) -> bool {
        self.scalar.is_some()
    }

    /// Installs a private seed after the fact (an unlocked key's material).
    /// The seed must expand to the verifier's public key.
    pub fn set_private_seed(&mut self, seed: &[u8]) -> Result<()> {
        let (scalar, prefix) = self.params.expand_private_key(seed)?;
        let (_, g) = self.params.edwards()?;
        let public_point = g.multiply(&scalar);
        if !public_point.is_equal(&self.public_point) {
            return Err(Error::InvalidArguments(
                "private seed does not match the public key",
            ));
        }
        self.scalar = Some(Zeroizing::new(scalar));
        self.prefix = Some(prefix);
        Ok(())
    }

    /// Signs a message; 64 bytes, R then S.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let scalar = self
            .scalar
            .as_ref()
            .ok_or(Error::InvalidArguments("no private key"))?;
        let prefix = self
            .prefix
            .as_ref()
            .ok_or(Error::InvalidArguments("no private key"))?;
        let n = self.params.order();
        let (_, g) = self.params.edwards()?;

        // r = H(prefix || M), as a little-endian integer mod n.
        let mut hasher = Sha512::new();
        hasher.update(prefix.as_slice());
        hasher.update(message);
        let r = n.residue(&le_bignum(&hasher.finalize()));
        let r_encoded = g.multiply(&r).to_bytes();

        // k = H(R || A || M) mod n.
        let mut hasher = Sha512::new();
        hasher.update(&r_encoded);
        hasher.update(&self.public_key);
        hasher.update(message);
        let k = n.residue(&le_bignum(&hasher.finalize()));

        // S = r + k a mod n.
        let a = n.residue(scalar);
        let s = n.mod_add(&r, &n.mod_multiply(&k, &a));

        let mut signature = r_encoded;
        let mut s_bytes = s.to_bytes_be();
        s_bytes.reverse();
        s_bytes.resize(32, 0);
        signature.extend_from_slice(&s_bytes);
        Ok(signature)
    }

    /// Verifies a 64-byte signature over a message.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        if signature.len() != 64 {
            return false;
        }
        let n = self.params.order();
        let (curve, g) = match self.params.edwards() {
            Ok(pair) => pair,
            Err(_) => return false,
        };
        let r_point = match EdwardsCurve::point_from_bytes(curve, &signature[..32]) {
            Ok(p) => p,
            Err(_) => return false,
        };
        let s = le_bignum(&signature[32..]);
        if s.is_greater_or_equal(n.value()) {
            return false;
        }
        let mut hasher = Sha512::new();
        hasher.update(&signature[..32]);
        hasher.update(&self.public_key);
        hasher.update(message);
        let k = n.residue(&le_bignum(&hasher.finalize()));
        // S B == R + k A.
        let lhs = g.multiply(&s);
        let rhs = r_point.add(&self.public_point.multiply(&k));
        lhs.is_equal(&rhs)
    }
}

/// A little-endian byte string as a BigNum.
fn le_bignum(le: &[u8]) -> BigNum {
    let mut be = le.to_vec();
    be.reverse();
    BigNum::from_bytes_be(&be)
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;

    // RFC 8032 section 7.1, test 1: empty message.
    const SEED1: [u8; 32] =
        hex!("9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60");
    const PUBLIC1: [u8; 32] =
        hex!("d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a");
    const SIG1: [u8; 64] = hex!(
        "e5564300c360ac729086e2cc806e828a84877f1eb8e5d974d873e06522490155"
        "5fb8821590a33bacc61e39701cf9b46bd25bf5f0595bbe24655141438e7a100b"
    );

    // RFC 8032 section 7.1, test 2: one-byte message 0x72.
    const SEED2: [u8; 32] =
        hex!("4ccd089b28ff96da9db6c346ec114e0f5b8a319f35aba624da8cf6ed4fb8a6fb");
    const PUBLIC2: [u8; 32] =
        hex!("3d4017c3e843895a92b70aa74d1b7ebc9c982ccf2ec4968cc0cd55f12af4660c");
    const SIG2: [u8; 64] = hex!(
        "92a009a9f0d4cab8720e820b5f642540a2b27b5416503f8fb3762223ebdb69da"
        "085ac1e43e15996e458f3613d0f11d8c387b2eaeb4302aeeb00d291612bb0c00"
    );

    #[test]
    fn rfc8032_test_1() {
        let signer = Eddsa::from_seed(&SEED1).unwrap();
        assert_eq!(signer.public_key_bytes(), PUBLIC1);
        assert_eq!(signer.sign(b"").unwrap(), SIG1);
        assert!(signer.verify(b"", &SIG1));
    }

    #[test]
    fn rfc8032_test_2() {
        let signer = Eddsa::from_seed(&SEED2).unwrap();
        assert_eq!(signer.public_key_bytes(), PUBLIC2);
        assert_eq!(signer.sign(&[0x72]).unwrap(), SIG2);
        assert!(signer.verify(&[0x72], &SIG2));
    }

    #[test]
    fn rejects_forgeries() {
        let signer = Eddsa::from_seed(&SEED1).unwrap();
        let mut bad = SIG1;
        bad[0] ^= 1;
        assert!(!signer.verify(b"", &bad));
        assert!(!signer.verify(b"x", &SIG1));
        assert!(!signer.verify(b"", &SIG1[..63]));
    }

    #[test]
    fn verifier_accepts_signers_output() {
        let signer = Eddsa::from_seed(&SEED2).unwrap();
        let verifier = Eddsa::from_public_key(&PUBLIC2).unwrap();
        assert!(!verifier.has_private_key());
        let sig = signer.sign(b"round trip").unwrap();
        assert!(verifier.verify(b"round trip", &sig));
        assert!(verifier.sign(b"round trip").is_err());
    }

    #[test]
    fn set_private_seed_checks_the_public_key() {
        let mut verifier = Eddsa::from_public_key(&PUBLIC1).unwrap();
        assert!(verifier.set_private_seed(&SEED2).is_err());
        verifier.set_private_seed(&SEED1).unwrap();
        assert_eq!(verifier.sign(b"").unwrap(), SIG1);
    }
}
