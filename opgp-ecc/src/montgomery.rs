//! X-only arithmetic on Curve25519, the Montgomery curve
//! y^2 = x^3 + 486662 x^2 + x over GF(2^255 - 19). Formulas follow the
//! original curve25519 paper; only the x coordinate is tracked, which is all
//! the Diffie-Hellman function needs.

use std::sync::{Arc, OnceLock};

use opgp_bignum::{BigNum, FastModulus, Modulus};
use subtle::Choice;

use crate::constants;
use crate::element::Element;
use crate::error::{Error, Result};

/// The Curve25519 Montgomery curve.
pub struct MontgomeryCurve {
    q: Arc<Modulus>,
    /// (A - 2) / 4 = 121665, the constant of the x-only doubling formula.
    a4: Element,
    a: Element,
    zero: Element,
    one: Element,
}

impl MontgomeryCurve {
    /// Builds the curve over 2^255 - 19.
    pub fn new() -> Result<Arc<MontgomeryCurve>> {
        let modulus = Modulus::new(&constants::CURVE25519_Q)?;
        modulus.attach_fast_modulus(FastModulus::curve25519_field(modulus.value()))?;
        let q = Arc::new(modulus);
        const A: u32 = 486662;
        Ok(Arc::new(MontgomeryCurve {
            a: Element::from_integer(q.clone(), A),
            a4: Element::from_integer(q.clone(), (A - 2) / 4),
            zero: Element::from_integer(q.clone(), 0),
            one: Element::from_integer(q.clone(), 1),
            q,
        }))
    }

    /// The field modulus.
    pub fn q(&self) -> &Arc<Modulus> {
        &self.q
    }

    /// The curve's key size in bits.
    pub fn key_size_in_bits(&self) -> usize {
        256
    }

    /// The base point, x = 9.
    pub fn base_point(curve: &Arc<MontgomeryCurve>) -> MontgomeryPoint {
        MontgomeryPoint::from_x(curve.clone(), Element::from_integer(curve.q.clone(), 9))
    }

    /// Decodes a point from 32 little-endian bytes. Values at or above the
    /// field prime are rejected.
    pub fn point_from_bytes(curve: &Arc<MontgomeryCurve>, p: &[u8]) -> Result<MontgomeryPoint> {
        if p.len() != 32 {
            return Err(Error::InvalidArguments("point length must be 32 bytes"));
        }
        let mut be = p.to_vec();
        be.reverse();
        let x = Element::new(curve.q.clone(), BigNum::from_bytes_be(&be))?;
        Ok(MontgomeryPoint::from_x(curve.clone(), x))
    }

    /// Returns true if both curves match.
    pub fn is_equal(&self, that: &MontgomeryCurve) -> bool {
        self.q.value().is_equal(that.q.value()) && self.a.is_equal(&that.a)
    }
}

/// An x-only point (x : z) on [`MontgomeryCurve`]; the affine x is x/z, and
/// infinity is the unique point with z = 0.
pub struct MontgomeryPoint {
    curve: Arc<MontgomeryCurve>,
    x: Element,
    z: Element,
    affine: OnceLock<Box<MontgomeryPoint>>,
}

impl Clone for MontgomeryPoint {
    fn clone(&self) -> MontgomeryPoint {
        MontgomeryPoint::new(self.curve.clone(), self.x.clone(), self.z.clone())
    }
}

impl MontgomeryPoint {
    fn new(curve: Arc<MontgomeryCurve>, x: Element, z: Element) -> MontgomeryPoint {
        debug_assert!(!(x.is_zero() && z.is_zero()), "(0, 0) is undefined");
        MontgomeryPoint {
            curve,
            x,
            z,
            affine: OnceLock::new(),
        }
    }

    fn from_x(curve: Arc<MontgomeryCurve>, x: Element) -> MontgomeryPoint {
        let one = curve.one.clone();
        MontgomeryPoint::new(curve, x, one)
    }

    /// The point at infinity.
    pub fn infinity(curve: &Arc<MontgomeryCurve>) -> MontgomeryPoint {
        MontgomeryPoint::new(curve.clone(), curve.one.clone(), curve.zero.clone())
    }

    /// Returns true if this is the point at infinity.
    pub fn is_infinity(&self) -> bool {
        self.z.is_equal(&self.curve.zero)
    }

    /// Infinity is the group identity.
    pub fn is_identity(&self) -> bool {
        self.is_infinity()
    }

    /// The affine x coordinate. The point must not be infinity.
    pub fn get_x(&self) -> Element {
        debug_assert!(!self.is_infinity());
        self.get_affine().x.clone()
    }

    /// The affine x coordinate, with infinity reading as zero.
    pub fn get_x0(&self) -> Element {
        if self.is_infinity() {
            return self.curve.zero.clone();
        }
        self.get_affine().x.clone()
    }

    fn get_affine(&self) -> &MontgomeryPoint {
        if self.z.is_equal(&self.curve.one) {
            return self;
        }
        self.affine.get_or_init(|| {
            let x = self.x.multiply(&self.z.inverse());
            Box::new(MontgomeryPoint::from_x(self.curve.clone(), x))
        })
    }

    /// Returns true if both points represent the same group element.
    pub fn is_equal(&self, that: &MontgomeryPoint) -> bool {
        if self.is_infinity() || that.is_infinity() {
            return self.is_infinity() == that.is_infinity();
        }
        self.x.multiply(&that.z).is_equal(&that.x.multiply(&self.z))
    }

    /// Encodes the affine x as 32 little-endian bytes, zero-padded;
    /// infinity encodes as zero.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut x = self.get_x0().to_bignum().to_bytes_be();
        x.reverse();
        x.resize(self.curve.key_size_in_bits() / 8, 0);
        x
    }

    /// Doubles this point.
    fn double(&self) -> MontgomeryPoint {
        let t1 = self.x.add(&self.z).square();
        let t2 = self.x.subtract(&self.z).square();
        let t3 = t1.subtract(&t2);
        let x_out = t1.multiply(&t2);
        let z_out = t3.multiply(&t1.add(&t3.multiply(&self.curve.a4)));
        MontgomeryPoint::new(self.curve.clone(), x_out, z_out)
    }

    /// Differential addition: `self + that`, given `delta = self - that`.
    /// `delta` must be neither infinity nor the zero point.
    fn add_differential(&self, that: &MontgomeryPoint, delta: &MontgomeryPoint) -> MontgomeryPoint {
        debug_assert!(!delta.x.is_zero());
        debug_assert!(!delta.z.is_zero());
        let t1 = self.x.subtract(&self.z).multiply(&that.x.add(&that.z));
        let t2 = self.x.add(&self.z).multiply(&that.x.subtract(&that.z));
        let x_out = t1.add(&t2).square().multiply(&delta.z);
        let z_out = t1.subtract(&t2).square().multiply(&delta.x);
        MontgomeryPoint::new(self.curve.clone(), x_out, z_out)
    }

    fn conditional_swap(a: &mut MontgomeryPoint, b: &mut MontgomeryPoint, choice: Choice) {
        Element::conditional_swap(&mut a.x, &mut b.x, choice);
        Element::conditional_swap(&mut a.z, &mut b.z, choice);
    }

    /// Scalar multiplication by Montgomery ladder: one differential
    /// addition and one doubling per scalar bit, with the two rungs
    /// conditionally swapped under a mask instead of branching on the bit.
    pub fn multiply(&self, k: &BigNum) -> MontgomeryPoint {
        // k > 0 and a finite, nonzero point in every real use; the edge
        // cases are handled for completeness.
        if self.is_infinity() || k.is_equal(&BigNum::zero()) {
            return MontgomeryPoint::infinity(&self.curve);
        }
        if self.x.is_zero() {
            // The zero point has order 2.
            return if k.is_odd() {
                self.clone()
            } else {
                MontgomeryPoint::infinity(&self.curve)
            };
        }
        // INVARIANT: with j the bits of k consumed so far,
        // m0 = j * self and m1 = (j + 1) * self.
        let mut m0 = self.clone();
        let mut m1 = self.double();
        for i in (0..k.bit_length().saturating_sub(1)).rev() {
            let bit = Choice::from(k.is_bit_set(i) as u8);
            MontgomeryPoint::conditional_swap(&mut m0, &mut m1, bit);
            // Now m0 is the rung to double; m0 + m1 always differs from the
            // two by self.
            let added = m0.add_differential(&m1, self);
            let doubled = m0.double();
            m0 = doubled;
            m1 = added;
            MontgomeryPoint::conditional_swap(&mut m0, &mut m1, bit);
        }
        m0
    }
}
