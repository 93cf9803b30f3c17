//! ECDSA over the NIST prime curves.

use std::sync::Arc;

use opgp_bignum::BigNum;
use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

use crate::domain::{DomainParams, PrimeCurve};
use crate::error::{Error, Result};
use crate::nist::{NistCurve, NistPoint};

/// An ECDSA signature, r and s in minimal big-endian form.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Signature {
    pub r: Vec<u8>,
    pub s: Vec<u8>,
}

/// An ECDSA signer/verifier bound to one curve and key.
pub struct Ecdsa {
    params: Arc<DomainParams>,
    public: NistPoint,
    private: Option<Zeroizing<BigNum>>,
}

impl Ecdsa {
    /// A verifier for an existing public key (in uncompressed or compressed
    /// wire encoding).
    pub fn from_public_key(curve: PrimeCurve, public_key: &[u8]) -> Result<Ecdsa> {
        let params = DomainParams::from_curve(curve);
        let (nist_curve, _) = params.nist()?;
        let public = NistCurve::point_from_bytes(nist_curve, public_key)?;
        Ok(Ecdsa {
            params,
            public,
            private: None,
        })
    }

    /// A signer for an existing private scalar, big endian. The public
    /// point is derived from it.
    pub fn from_private_key(curve: PrimeCurve, private_key: &[u8]) -> Result<Ecdsa> {
        let params = DomainParams::from_curve(curve);
        let scalar = BigNum::from_bytes_be(private_key);
        let (_, g) = params.nist()?;
        if scalar.is_equal(&BigNum::zero()) || scalar.is_greater_or_equal(params.order().value()) {
            return Err(Error::InvalidArguments("private key out of range"));
        }
        let public = g.multiply(&scalar);
        Ok(Ecdsa {
            params,
            public,
            private: Some(Zeroizing::new(scalar)),
        })
    }

    /// Generates a fresh key pair.
    pub fn generate(curve: PrimeCurve, rng: &mut (impl RngCore + CryptoRng)) -> Result<Ecdsa> {
        let params = DomainParams::from_curve(curve);
        params.nist()?;
        let pair = params.generate_key_pair(rng, None)?;
        let scalar = pair
            .private_key_bignum
            .ok_or(Error::InvalidArguments("key generation yielded no scalar"))?;
        let (nist_curve, _) = params.nist()?;
        let public = NistCurve::point_from_bytes(nist_curve, &pair.public_key)?;
        Ok(Ecdsa {
            params,
            public,
            private: Some(Zeroizing::new(scalar)),
        })
    }

    /// The domain parameters in use.
    pub fn params(&self) -> &Arc<DomainParams> {
        &self.params
    }

    /// The public key, uncompressed.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.public.to_bytes(false)
    }

    /// The private scalar in minimal big-endian form, if present.
    pub fn private_key_bytes(&self) -> Option<Zeroizing<Vec<u8>>> {
        self.private
            .as_ref()
            .map(|k| Zeroizing::new(k.to_bytes_be()))
    }

    /// Installs a private scalar after the fact (an unlocked key's
    /// material).
    pub fn set_private_key(&mut self, scalar: BigNum) -> Result<()> {
        if scalar.is_equal(&BigNum::zero())
            || scalar.is_greater_or_equal(self.params.order().value())
        {
            return Err(Error::InvalidArguments("private key out of range"));
        }
        self.private = Some(Zeroizing::new(scalar));
        Ok(())
    }

    /// Returns true if a private scalar is present.
    pub fn has_private_key(&self) -> bool {
        self.private.is_some()
    }

    /// Signs a message, hashing it with the curve's hash.
    pub fn sign(&self, message: &[u8], rng: &mut (impl RngCore + CryptoRng)) -> Result<Signature> {
        let digest = self.hash_with_truncation(message);
        // Retry on the (cosmically rare) zero r or s.
        loop {
            let k = self.generate_per_message_nonce(&digest, rng)?;
            if let Some(sig) = self.sign_with_nonce(&digest, &k)? {
                return Ok(sig);
            }
        }
    }

    /// Signs with a caller-chosen nonce; `None` means the nonce produced a
    /// zero r or s and must be redrawn.
    fn sign_with_nonce(&self, digest: &[u8], k: &BigNum) -> Result<Option<Signature>> {
        let private = self
            .private
            .as_ref()
            .ok_or(Error::InvalidArguments("no private key"))?;
        let n = self.params.order();
        if k.is_greater_or_equal(n.value()) || k.is_equal(&BigNum::zero()) {
            return Err(Error::InvalidArguments("invalid per-message nonce"));
        }
        let (_, g) = self.params.nist()?;
        // r = (kG).x mod n.
        let r = n.residue(g.multiply(k).get_x().to_bignum());
        if r.is_equal(&BigNum::zero()) {
            return Ok(None);
        }
        let e = n.residue(&BigNum::from_bytes_be(digest));
        let d = n.residue(private);
        // s = k^-1 (e + d r) mod n.
        let s = n.mod_add(&e, &n.mod_multiply(&d, &r));
        if s.is_equal(&BigNum::zero()) {
            return Ok(None);
        }
        let s = n.mod_multiply(&s, &n.mod_inverse(k));
        Ok(Some(Signature {
            r: r.to_bytes_be(),
            s: s.to_bytes_be(),
        }))
    }

    /// Verifies a signature over a message.
    pub fn verify(&self, message: &[u8], sig: &Signature) -> bool {
        let n = self.params.order();
        let r = BigNum::from_bytes_be(&sig.r);
        let s = BigNum::from_bytes_be(&sig.s);
        // r and s must be in [1, n - 1].
        if r.is_greater_or_equal(n.value())
            || r.is_equal(&BigNum::zero())
            || s.is_greater_or_equal(n.value())
            || s.is_equal(&BigNum::zero())
        {
            return false;
        }
        let g = match self.params.nist() {
            Ok((_, g)) => g,
            Err(_) => return false,
        };
        let e = n.residue(&BigNum::from_bytes_be(&self.hash_with_truncation(message)));
        let w = n.mod_inverse(&s);
        let u1 = n.mod_multiply(&e, &w);
        let u2 = n.mod_multiply(&r, &w);
        // X = u1 G + u2 Q = k G.
        let x_point = g.multiply(&u1).add(&self.public.multiply(&u2));
        if x_point.is_infinity() {
            return false;
        }
        let x = n.residue(x_point.get_x().to_bignum());
        x.is_equal(&r)
    }

    /// The curve's companion hash, truncated to the field width.
    fn hash_with_truncation(&self, message: &[u8]) -> Vec<u8> {
        let mut digest = match self.params.curve_name() {
            PrimeCurve::P384 => Sha384::digest(message).to_vec(),
            PrimeCurve::P521 => Sha512::digest(message).to_vec(),
            _ => Sha256::digest(message).to_vec(),
        };
        let field_size = (self.params.key_size_in_bits() + 7) / 8;
        digest.truncate(field_size);
        digest
    }

    /// Draws a per-message nonce in [1, n - 1]. The derivation folds a hash
    /// of the private key and the message digest in with the fresh random
    /// bytes (FIPS 186-4 B.5.2 style), bounding the damage of a weak RNG.
    fn generate_per_message_nonce(
        &self,
        digest: &[u8],
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<BigNum> {
        let private = self
            .private
            .as_ref()
            .ok_or(Error::InvalidArguments("no private key"))?;
        let n = self.params.order();
        let nonce_length = (self.params.key_size_in_bits() + 7) / 8;
        let excess_bits = (8 * nonce_length - self.params.key_size_in_bits()) as u32;
        // Pad the key bytes so their length does not leak.
        let mut key_bytes = Zeroizing::new(private.to_bytes_be());
        while key_bytes.len() < nonce_length {
            key_bytes.insert(0, 0);
        }
        let private_key_digest = Zeroizing::new(Sha512::digest(&*key_bytes).to_vec());
        loop {
            let mut random = Zeroizing::new(vec![0u8; nonce_length]);
            rng.fill_bytes(&mut random);
            let mut nonce_bytes = Zeroizing::new(Vec::with_capacity(nonce_length + 64));
            while nonce_bytes.len() < nonce_length {
                let mut hasher = Sha512::new();
                // The counter keeps successive 512-bit blocks distinct.
                hasher.update((nonce_bytes.len() as u32).to_be_bytes());
                hasher.update(&*private_key_digest);
                hasher.update(digest);
                hasher.update(&*random);
                nonce_bytes.extend_from_slice(&hasher.finalize());
            }
            nonce_bytes.truncate(nonce_length);
            nonce_bytes[0] >>= excess_bits;
            let k = BigNum::from_bytes_be(&nonce_bytes);
            if !k.is_equal(&BigNum::zero()) && !k.is_greater_or_equal(n.value()) {
                return Ok(k);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand_core::SeedableRng;

    fn rng() -> rand_chacha::ChaCha20Rng {
        rand_chacha::ChaCha20Rng::seed_from_u64(42)
    }

    #[test]
    fn sign_verify_round_trip() {
        let mut rng = rng();
        let signer = Ecdsa::generate(PrimeCurve::P256, &mut rng).unwrap();
        let message = b"attack at dawn";
        let sig = signer.sign(message, &mut rng).unwrap();
        assert!(signer.verify(message, &sig));
        assert!(!signer.verify(b"attack at dusk", &sig));
    }

    #[test]
    fn verifier_from_public_key_only() {
        let mut rng = rng();
        let signer = Ecdsa::generate(PrimeCurve::P256, &mut rng).unwrap();
        let sig = signer.sign(b"hello", &mut rng).unwrap();
        let verifier =
            Ecdsa::from_public_key(PrimeCurve::P256, &signer.public_key_bytes()).unwrap();
        assert!(!verifier.has_private_key());
        assert!(verifier.verify(b"hello", &sig));
        assert!(verifier.sign(b"hello", &mut rng).is_err());
    }

    #[test]
    fn tampered_signatures_fail() {
        let mut rng = rng();
        let signer = Ecdsa::generate(PrimeCurve::P384, &mut rng).unwrap();
        let mut sig = signer.sign(b"payload", &mut rng).unwrap();
        sig.s[0] ^= 1;
        assert!(!signer.verify(b"payload", &sig));
        // Out-of-range values are rejected before any arithmetic.
        let zero = Signature {
            r: vec![0],
            s: vec![1],
        };
        assert!(!signer.verify(b"payload", &zero));
    }

    #[test]
    fn signer_round_trips_through_private_key_bytes() {
        let mut rng = rng();
        let signer = Ecdsa::generate(PrimeCurve::P521, &mut rng).unwrap();
        let key = signer.private_key_bytes().unwrap();
        let restored = Ecdsa::from_private_key(PrimeCurve::P521, &key).unwrap();
        assert_eq!(restored.public_key_bytes(), signer.public_key_bytes());
        let sig = restored.sign(b"msg", &mut rng).unwrap();
        assert!(signer.verify(b"msg", &sig));
    }

    #[test]
    fn ecdsa_needs_a_nist_curve() {
        assert!(Ecdsa::from_public_key(PrimeCurve::Ed25519, &[0u8; 32]).is_err());
    }
}
