//! Elliptic-curve Diffie-Hellman over the DH-capable curves.

use std::sync::Arc;

use rand_core::{CryptoRng, RngCore};

use crate::domain::{DomainParams, KeyPair, PrimeCurve};
use crate::error::{Error, Result};

/// An ECDH context for one curve.
pub struct Ecdh {
    params: Arc<DomainParams>,
}

impl Ecdh {
    /// Creates a context. Ed25519 is signature-only and rejected here.
    pub fn new(curve: PrimeCurve) -> Result<Ecdh> {
        if curve == PrimeCurve::Ed25519 {
            return Err(Error::Unsupported("ECDH: cannot derive shared secret"));
        }
        Ok(Ecdh {
            params: DomainParams::from_curve(curve),
        })
    }

    /// The domain parameters in use.
    pub fn params(&self) -> &Arc<DomainParams> {
        &self.params
    }

    /// Generates a key pair on this curve.
    pub fn generate_key_pair(
        &self,
        rng: &mut (impl RngCore + CryptoRng),
        private_key: Option<&[u8]>,
    ) -> Result<KeyPair> {
        self.params.generate_key_pair(rng, private_key)
    }

    /// Derives the shared secret between the peer's public key and the
    /// local private key bytes.
    pub fn shared_secret(&self, peer_public_key: &[u8], private_key: &[u8]) -> Result<Vec<u8>> {
        let scalar = self.params.bignum_from_private_key(private_key);
        self.params.calculate_shared_secret(peer_public_key, &scalar)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand_core::SeedableRng;

    #[test]
    fn agreement_via_private_key_bytes() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(11);
        for curve in [PrimeCurve::P256, PrimeCurve::Curve25519] {
            let ecdh = Ecdh::new(curve).unwrap();
            let pair1 = ecdh.generate_key_pair(&mut rng, None).unwrap();
            let pair2 = ecdh.generate_key_pair(&mut rng, None).unwrap();
            let s1 = ecdh
                .shared_secret(&pair2.public_key, &pair1.private_key)
                .unwrap();
            let s2 = ecdh
                .shared_secret(&pair1.public_key, &pair2.private_key)
                .unwrap();
            assert_eq!(s1, s2);
        }
    }

    #[test]
    fn ed25519_is_rejected() {
        assert!(Ecdh::new(PrimeCurve::Ed25519).is_err());
    }
}
