//! Per-curve domain parameters: constants, base point, subgroup order, and
//! the key-generation and shared-secret operations built on them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use opgp_bignum::{BigNum, FastModulus, Modulus};
use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha512};
use zeroize::Zeroizing;

use crate::constants;
use crate::edwards::{EdwardsCurve, EdwardsPoint};
use crate::error::{Error, Result};
use crate::montgomery::{MontgomeryCurve, MontgomeryPoint};
use crate::nist::{pad_left, NistCurve, NistPoint};

/// The supported prime curves.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PrimeCurve {
    P256,
    P384,
    P521,
    Curve25519,
    Ed25519,
}

impl PrimeCurve {
    /// Every supported curve.
    pub const ALL: [PrimeCurve; 5] = [
        PrimeCurve::P256,
        PrimeCurve::P384,
        PrimeCurve::P521,
        PrimeCurve::Curve25519,
        PrimeCurve::Ed25519,
    ];

    /// The curve OID in RFC 6637 section 11 form: a one-byte length prefix
    /// followed by the DER OID bytes. The 25519 OIDs follow GnuPG.
    pub fn oid(&self) -> &'static [u8] {
        match self {
            PrimeCurve::P256 => &[0x08, 0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x03, 0x01, 0x07],
            PrimeCurve::P384 => &[0x05, 0x2B, 0x81, 0x04, 0x00, 0x22],
            PrimeCurve::P521 => &[0x05, 0x2B, 0x81, 0x04, 0x00, 0x23],
            PrimeCurve::Curve25519 => &[
                0x0A, 0x2B, 0x06, 0x01, 0x04, 0x01, 0x97, 0x55, 0x01, 0x05, 0x01,
            ],
            PrimeCurve::Ed25519 => &[0x09, 0x2B, 0x06, 0x01, 0x04, 0x01, 0xDA, 0x47, 0x0F, 0x01],
        }
    }

    /// Looks a curve up by its length-prefixed OID.
    pub fn from_oid(oid: &[u8]) -> Result<PrimeCurve> {
        PrimeCurve::ALL
            .into_iter()
            .find(|curve| curve.oid() == oid)
            .ok_or(Error::Unsupported("invalid curve OID"))
    }
}

/// A key pair produced by [`DomainParams::generate_key_pair`].
pub struct KeyPair {
    /// The private key bytes as supplied or drawn: big-endian for the NIST
    /// curves, the raw 32-byte string for the 25519 family.
    pub private_key: Zeroizing<Vec<u8>>,
    /// The public key in the curve's wire encoding.
    pub public_key: Vec<u8>,
    /// The effective private scalar; absent for Ed25519, whose scalar only
    /// exists inside the SHA-512 expansion.
    pub private_key_bignum: Option<BigNum>,
    /// Ed25519 only: the high half of the expanded key, the
    /// nonce-derivation secret for EdDSA signing.
    pub nonce_secret: Option<Zeroizing<Vec<u8>>>,
}

enum CurveOps {
    Nist {
        curve: Arc<NistCurve>,
        g: NistPoint,
    },
    Montgomery {
        curve: Arc<MontgomeryCurve>,
        g: MontgomeryPoint,
    },
    Edwards {
        curve: Arc<EdwardsCurve>,
        g: EdwardsPoint,
    },
}

/// Domain parameters for one curve: curve constants, base point (with its
/// fast-multiply table attached where the curve form supports one), and the
/// subgroup order.
///
/// Instances are memoized per curve name behind a process-wide get-or-create
/// registry; [`DomainParams::from_curve`] hands out shared references.
pub struct DomainParams {
    name: PrimeCurve,
    ops: CurveOps,
    n: Arc<Modulus>,
}

impl DomainParams {
    /// Obtains the domain parameters for a curve, constructing them on
    /// first use and reusing the shared instance thereafter.
    pub fn from_curve(name: PrimeCurve) -> Arc<DomainParams> {
        static REGISTRY: OnceLock<Mutex<HashMap<PrimeCurve, Arc<DomainParams>>>> = OnceLock::new();
        let registry = REGISTRY.get_or_init(|| Mutex::new(HashMap::new()));
        let mut map = registry.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(name)
            .or_insert_with(|| Arc::new(DomainParams::construct(name)))
            .clone()
    }

    fn construct(name: PrimeCurve) -> DomainParams {
        let (ops, n_bytes): (CurveOps, &[u8]) = match name {
            PrimeCurve::P256 => (
                Self::nist_ops(&constants::P256_Q, &constants::P256_B, &constants::P256_G),
                &constants::P256_N,
            ),
            PrimeCurve::P384 => (
                Self::nist_ops(&constants::P384_Q, &constants::P384_B, &constants::P384_G),
                &constants::P384_N,
            ),
            PrimeCurve::P521 => (
                Self::nist_ops(&constants::P521_Q, &constants::P521_B, &constants::P521_G),
                &constants::P521_N,
            ),
            PrimeCurve::Curve25519 => {
                let curve = MontgomeryCurve::new().expect("curve constants are valid");
                let g = MontgomeryCurve::base_point(&curve);
                (CurveOps::Montgomery { curve, g }, &constants::CURVE25519_N)
            }
            PrimeCurve::Ed25519 => {
                let curve = EdwardsCurve::new().expect("curve constants are valid");
                let g = EdwardsCurve::base_point(&curve).expect("curve constants are valid");
                g.initialize_for_fast_multiply();
                (CurveOps::Edwards { curve, g }, &constants::CURVE25519_N)
            }
        };
        let n = Modulus::new(n_bytes).expect("curve constants are valid");
        let fast = match name {
            PrimeCurve::Curve25519 | PrimeCurve::Ed25519 => FastModulus::power_of_base(n.value()),
            _ => FastModulus::high_ones(n.value()),
        }
        .expect("curve constants are valid");
        n.attach_fast_modulus(fast)
            .expect("freshly constructed modulus");
        let params = DomainParams {
            name,
            ops,
            n: Arc::new(n),
        };
        // Expensive sanity check: the base point times the subgroup order
        // must be the identity.
        #[cfg(debug_assertions)]
        params.check_base_point_order();
        params
    }

    fn nist_ops(q: &[u8], b: &[u8], g: &[u8]) -> CurveOps {
        let curve = NistCurve::new(q, b).expect("curve constants are valid");
        let g = NistCurve::point_from_bytes(&curve, g).expect("curve constants are valid");
        g.initialize_for_fast_multiply();
        CurveOps::Nist { curve, g }
    }

    #[cfg(debug_assertions)]
    fn check_base_point_order(&self) {
        let n = self.n.value();
        let ok = match &self.ops {
            CurveOps::Nist { g, .. } => g.multiply(n).is_identity(),
            CurveOps::Montgomery { g, .. } => g.multiply(n).is_identity(),
            CurveOps::Edwards { g, .. } => g.multiply(n).is_identity(),
        };
        assert!(ok, "base point times order is not the identity");
    }

    /// The curve these parameters describe.
    pub fn curve_name(&self) -> PrimeCurve {
        self.name
    }

    /// The subgroup order.
    pub fn order(&self) -> &Arc<Modulus> {
        &self.n
    }

    /// The curve's key size in bits.
    pub fn key_size_in_bits(&self) -> usize {
        match &self.ops {
            CurveOps::Nist { curve, .. } => curve.key_size_in_bits(),
            CurveOps::Montgomery { curve, .. } => curve.key_size_in_bits(),
            CurveOps::Edwards { curve, .. } => curve.key_size_in_bits(),
        }
    }

    fn field_size_in_bytes(&self) -> usize {
        (self.key_size_in_bits() + 7) / 8
    }

    pub(crate) fn nist(&self) -> Result<(&Arc<NistCurve>, &NistPoint)> {
        match &self.ops {
            CurveOps::Nist { curve, g } => Ok((curve, g)),
            _ => Err(Error::Unsupported("operation requires a NIST curve")),
        }
    }

    pub(crate) fn edwards(&self) -> Result<(&Arc<EdwardsCurve>, &EdwardsPoint)> {
        match &self.ops {
            CurveOps::Edwards { curve, g } => Ok((curve, g)),
            _ => Err(Error::Unsupported("operation requires Ed25519")),
        }
    }

    /// Generates a key pair, from the supplied private key bytes or from
    /// the given random source.
    pub fn generate_key_pair(
        &self,
        rng: &mut (impl RngCore + CryptoRng),
        private_key: Option<&[u8]>,
    ) -> Result<KeyPair> {
        match &self.ops {
            CurveOps::Nist { g, .. } => self.generate_nist(rng, private_key, g),
            CurveOps::Montgomery { g, .. } => self.generate_montgomery(rng, private_key, g),
            CurveOps::Edwards { g, .. } => self.generate_edwards(rng, private_key, g),
        }
    }

    /// Draws a random private scalar in [1, n - 1] by rejection sampling,
    /// per FIPS 186-4 B.4.2, and derives the public point.
    fn generate_nist(
        &self,
        rng: &mut (impl RngCore + CryptoRng),
        private_key: Option<&[u8]>,
        g: &NistPoint,
    ) -> Result<KeyPair> {
        let expected_len = self.field_size_in_bytes();
        let excess_bits = (8 * expected_len - self.key_size_in_bits()) as u32;
        let mut bytes;
        let multiplier = loop {
            match private_key {
                Some(supplied) => {
                    if supplied.len() != expected_len {
                        return Err(Error::InvalidArguments("bad private key length"));
                    }
                    bytes = Zeroizing::new(supplied.to_vec());
                    let candidate = BigNum::from_bytes_be(&bytes);
                    // A supplied key gets no second draw.
                    if candidate.is_equal(&BigNum::zero())
                        || candidate.is_greater_or_equal(self.n.value())
                    {
                        return Err(Error::InvalidArguments("bad private key"));
                    }
                    break candidate;
                }
                None => {
                    bytes = Zeroizing::new(vec![0u8; expected_len]);
                    rng.fill_bytes(&mut bytes);
                    // Trim excess bits in the high-order byte when the key
                    // size is not a multiple of 8.
                    bytes[0] >>= excess_bits;
                    let candidate = BigNum::from_bytes_be(&bytes);
                    if !candidate.is_equal(&BigNum::zero())
                        && !candidate.is_greater_or_equal(self.n.value())
                    {
                        break candidate;
                    }
                }
            }
        };
        let public = g.multiply(&multiplier);
        Ok(KeyPair {
            private_key: bytes,
            public_key: public.to_bytes(false),
            private_key_bignum: Some(multiplier),
            nonce_secret: None,
        })
    }

    /// Any 32 bytes are a valid Curve25519 private key; a copy is clamped
    /// before use as a little-endian scalar.
    fn generate_montgomery(
        &self,
        rng: &mut (impl RngCore + CryptoRng),
        private_key: Option<&[u8]>,
        g: &MontgomeryPoint,
    ) -> Result<KeyPair> {
        let bytes = self.private_key_32(rng, private_key)?;
        let mut clamped = Zeroizing::new(bytes.to_vec());
        clamp(&mut clamped);
        let multiplier = le_bignum(&clamped);
        let public = g.multiply(&multiplier);
        Ok(KeyPair {
            private_key: bytes,
            public_key: public.to_bytes(),
            private_key_bignum: Some(multiplier),
            nonce_secret: None,
        })
    }

    /// The Ed25519 private key is 32 random bytes, expanded through SHA-512
    /// into the signing scalar and the nonce-derivation secret.
    fn generate_edwards(
        &self,
        rng: &mut (impl RngCore + CryptoRng),
        private_key: Option<&[u8]>,
        g: &EdwardsPoint,
    ) -> Result<KeyPair> {
        let bytes = self.private_key_32(rng, private_key)?;
        let (multiplier, extra) = self.expand_private_key(&bytes)?;
        let public = g.multiply(&multiplier);
        Ok(KeyPair {
            private_key: bytes,
            public_key: public.to_bytes(),
            private_key_bignum: None,
            nonce_secret: Some(extra),
        })
    }

    fn private_key_32(
        &self,
        rng: &mut (impl RngCore + CryptoRng),
        private_key: Option<&[u8]>,
    ) -> Result<Zeroizing<Vec<u8>>> {
        match private_key {
            Some(supplied) => {
                if supplied.len() != 32 {
                    return Err(Error::InvalidArguments("private key length must be 32 bytes"));
                }
                Ok(Zeroizing::new(supplied.to_vec()))
            }
            None => {
                let mut bytes = Zeroizing::new(vec![0u8; 32]);
                rng.fill_bytes(&mut bytes);
                Ok(bytes)
            }
        }
    }

    /// Expands a 32-byte Ed25519 protokey into the clamped signing scalar
    /// and the 32-byte nonce-derivation secret.
    ///
    /// The clamp clears the cofactor (the low three bits) and pins the top
    /// bits, which also hardens incorrect scalar-multiplication
    /// implementations.
    pub fn expand_private_key(
        &self,
        private_key: &[u8],
    ) -> Result<(BigNum, Zeroizing<Vec<u8>>)> {
        self.edwards()?;
        let digest = Sha512::digest(private_key);
        let mut low = Zeroizing::new(digest[..32].to_vec());
        clamp(&mut low);
        let multiplier = le_bignum(&low);
        Ok((multiplier, Zeroizing::new(digest[32..].to_vec())))
    }

    /// Interprets private-key bytes as a scalar: big-endian for the NIST
    /// curves, little-endian for the 25519 family.
    pub fn bignum_from_private_key(&self, p: &[u8]) -> BigNum {
        match &self.ops {
            CurveOps::Nist { .. } => BigNum::from_bytes_be(p),
            _ => le_bignum(p),
        }
    }

    /// Derives the ECDH shared secret between a peer's public key (in wire
    /// encoding) and the local private scalar. The peer key is assumed to
    /// have been vetted as a reasonable public key.
    pub fn calculate_shared_secret(
        &self,
        peer_public_key: &[u8],
        my_private_key: &BigNum,
    ) -> Result<Vec<u8>> {
        match &self.ops {
            CurveOps::Nist { curve, .. } => {
                let peer = NistCurve::point_from_bytes(curve, peer_public_key)?;
                let s = peer.multiply(my_private_key);
                if s.is_infinity() {
                    // The peer key was our own key's inverse; a misuse or
                    // attack signal, never a valid agreement.
                    return Err(Error::InvalidArguments("ECDH: cannot derive shared secret"));
                }
                Ok(pad_left(
                    &s.get_x().to_bignum().to_bytes_be(),
                    self.field_size_in_bytes(),
                ))
            }
            CurveOps::Montgomery { curve, .. } => {
                let peer = MontgomeryCurve::point_from_bytes(curve, peer_public_key)?;
                // Re-clamp regardless of what the caller passed in.
                let mut p = Zeroizing::new(my_private_key.to_bytes_be());
                p.reverse();
                p.resize(32, 0);
                clamp(&mut p);
                let s = peer.multiply(&le_bignum(&p));
                Ok(s.to_bytes())
            }
            CurveOps::Edwards { .. } => {
                Err(Error::Unsupported("ECDH: cannot derive shared secret"))
            }
        }
    }
}

/// The X25519/Ed25519 scalar clamp: clear the low three bits, clear the top
/// bit, set the next-highest bit.
fn clamp(bytes: &mut [u8]) {
    bytes[0] &= !7;
    bytes[31] = (bytes[31] & 63) | 64;
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
    use rand_core::SeedableRng;

    fn rng() -> rand_chacha::ChaCha20Rng {
        rand_chacha::ChaCha20Rng::seed_from_u64(7)
    }

    #[test]
    fn oid_round_trip() {
        for curve in PrimeCurve::ALL {
            assert_eq!(PrimeCurve::from_oid(curve.oid()).unwrap(), curve);
        }
        assert!(PrimeCurve::from_oid(&[0x01, 0x02]).is_err());
    }

    #[test]
    fn from_curve_memoizes() {
        let a = DomainParams::from_curve(PrimeCurve::P256);
        let b = DomainParams::from_curve(PrimeCurve::P256);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn p256_key_pair_from_fixed_seed_matches_known_answer() {
        // The private scalar 3; the public key is the standard 3G.
        let params = DomainParams::from_curve(PrimeCurve::P256);
        let mut seed = [0u8; 32];
        seed[31] = 3;
        let pair = params.generate_key_pair(&mut rng(), Some(&seed)).unwrap();
        assert_eq!(
            pair.public_key,
            hex!(
                "045ecbe4d1a6330a44c8f7ef951d4bf165e6c6b721efada985fb41661bc6e7fd"
                "6c8734640c4998ff7e374b06ce1a64a2ecd82ab036384fb83d9a79b127a27d5032"
            )
        );
        assert!(pair.private_key_bignum.is_some());
    }

    #[test]
    fn nist_rejects_bad_supplied_keys() {
        let params = DomainParams::from_curve(PrimeCurve::P256);
        assert!(params.generate_key_pair(&mut rng(), Some(&[1, 2, 3])).is_err());
        assert!(params
            .generate_key_pair(&mut rng(), Some(&[0u8; 32]))
            .is_err());
        // The group order itself is out of range.
        assert!(params
            .generate_key_pair(&mut rng(), Some(&crate::constants::P256_N))
            .is_err());
    }

    #[test]
    fn nist_random_keys_are_valid(){
        let params = DomainParams::from_curve(PrimeCurve::P521);
        let mut rng = rng();
        let pair = params.generate_key_pair(&mut rng, None).unwrap();
        assert_eq!(pair.private_key.len(), 66);
        // The high-order byte was trimmed to the field size.
        assert!(pair.private_key[0] <= 1);
        assert_eq!(pair.public_key[0], 0x04);
        assert_eq!(pair.public_key.len(), 1 + 2 * 66);
    }

    #[test]
    fn x25519_rfc7748_vectors() {
        let params = DomainParams::from_curve(PrimeCurve::Curve25519);
        let alice_private =
            hex!("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a");
        let bob_private =
            hex!("5dab087e624a8a4b79e17f8b83800ee66f3bb1292618b6fd1c2f8b27ff88e0eb");
        let alice = params
            .generate_key_pair(&mut rng(), Some(&alice_private))
            .unwrap();
        let bob = params
            .generate_key_pair(&mut rng(), Some(&bob_private))
            .unwrap();
        assert_eq!(
            alice.public_key,
            hex!("8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a")
        );
        assert_eq!(
            bob.public_key,
            hex!("de9edb7d7b7dc1b4d35b61c2ece435373f8343c85b78674dadfc7e146f882b4f")
        );
        let shared =
            hex!("4a5d9d5ba4ce2de1728e3bf480350f25e07e21c947d19e3376f09b3c1e161742");
        let k1 = params
            .calculate_shared_secret(&bob.public_key, alice.private_key_bignum.as_ref().unwrap())
            .unwrap();
        let k2 = params
            .calculate_shared_secret(&alice.public_key, bob.private_key_bignum.as_ref().unwrap())
            .unwrap();
        assert_eq!(k1, shared);
        assert_eq!(k2, shared);
    }

    #[test]
    fn x25519_reclamps_unclamped_scalars() {
        // An unclamped scalar must behave as its clamped form.
        let params = DomainParams::from_curve(PrimeCurve::Curve25519);
        let mut raw = hex!("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a");
        let pair = params.generate_key_pair(&mut rng(), Some(&raw)).unwrap();
        // Flip clamped-away bits; the shared secret must be unchanged.
        raw[0] |= 7;
        let unclamped = params.bignum_from_private_key(&raw);
        let peer = DomainParams::from_curve(PrimeCurve::Curve25519)
            .generate_key_pair(&mut rng(), None)
            .unwrap();
        let a = params
            .calculate_shared_secret(&peer.public_key, &unclamped)
            .unwrap();
        let b = params
            .calculate_shared_secret(
                &peer.public_key,
                pair.private_key_bignum.as_ref().unwrap(),
            )
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn ecdh_agreement_on_every_dh_curve() {
        for name in [PrimeCurve::P256, PrimeCurve::P384, PrimeCurve::P521, PrimeCurve::Curve25519]
        {
            let params = DomainParams::from_curve(name);
            let mut rng = rng();
            let pair1 = params.generate_key_pair(&mut rng, None).unwrap();
            let pair2 = params.generate_key_pair(&mut rng, None).unwrap();
            let s1 = params
                .calculate_shared_secret(
                    &pair2.public_key,
                    pair1.private_key_bignum.as_ref().unwrap(),
                )
                .unwrap();
            let s2 = params
                .calculate_shared_secret(
                    &pair1.public_key,
                    pair2.private_key_bignum.as_ref().unwrap(),
                )
                .unwrap();
            assert_eq!(s1, s2, "disagreement on {:?}", name);
        }
    }

    #[test]
    fn ed25519_is_signature_only() {
        let params = DomainParams::from_curve(PrimeCurve::Ed25519);
        let pair = params.generate_key_pair(&mut rng(), None).unwrap();
        assert!(pair.nonce_secret.is_some());
        assert!(pair.private_key_bignum.is_none());
        let err = params
            .calculate_shared_secret(&pair.public_key, &BigNum::two())
            .unwrap_err();
        assert_eq!(err, Error::Unsupported("ECDH: cannot derive shared secret"));
    }

    #[test]
    fn ed25519_public_key_from_rfc8032_seed() {
        // RFC 8032 section 7.1, test 1.
        let params = DomainParams::from_curve(PrimeCurve::Ed25519);
        let seed = hex!("9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60");
        let pair = params.generate_key_pair(&mut rng(), Some(&seed)).unwrap();
        assert_eq!(
            pair.public_key,
            hex!("d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a")
        );
    }

    #[test]
    fn base_point_times_order_is_identity_everywhere() {
        for name in PrimeCurve::ALL {
            let params = DomainParams::from_curve(name);
            match &params.ops {
                CurveOps::Nist { g, .. } => assert!(g.multiply(params.n.value()).is_identity()),
                CurveOps::Montgomery { g, .. } => {
                    assert!(g.multiply(params.n.value()).is_identity())
                }
                CurveOps::Edwards { g, .. } => {
                    assert!(g.multiply(params.n.value()).is_identity())
                }
            }
        }
    }
}
