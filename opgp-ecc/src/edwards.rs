//! Points on Ed25519, the twisted Edwards curve -x^2 + y^2 = 1 + d x^2 y^2
//! over GF(2^255 - 19), in extended coordinates (x, y, t, z) with
//! x * y = z * t.
//!
//! The unified addition law has no doubling special case and no identity
//! special case, which is why this family's constant-time multiply needs no
//! infinity bookkeeping: the identity is an ordinary point.

use std::sync::{Arc, OnceLock};

use opgp_bignum::{BigNum, FastModulus, Modulus};
use subtle::Choice;

use crate::constants;
use crate::element::Element;
use crate::error::{Error, Result};
use crate::nist::pad_left;

/// The Ed25519 curve.
pub struct EdwardsCurve {
    q: Arc<Modulus>,
    /// d = -121665/121666.
    d: Element,
    /// 2d, used by the unified addition formula.
    d2: Element,
    zero: Element,
    one: Element,
    /// (q + 3) / 8; with q = 5 mod 8 a square root of e, when one exists,
    /// is e^this or that times sqrt(-1) (HAC 3.37).
    sqrt_power: BigNum,
    /// 2^((q - 1) / 4), a square root of -1.
    sqrt_minus_one: Element,
}

impl EdwardsCurve {
    /// Builds the curve over 2^255 - 19.
    pub fn new() -> Result<Arc<EdwardsCurve>> {
        let modulus = Modulus::new(&constants::CURVE25519_Q)?;
        modulus.attach_fast_modulus(FastModulus::curve25519_field(modulus.value()))?;
        let q = Arc::new(modulus);
        let d = Element::from_integer(q.clone(), 121665)
            .negate()
            .multiply(&Element::from_integer(q.clone(), 121666).inverse());
        let d2 = d.shift_left(1);
        let one_num = BigNum::one();
        let sqrt_power = q
            .value()
            .add(&BigNum::from_u32(3))
            .shift_right_unchecked(3)
            .drop_leading_zeros();
        let two = Element::from_integer(q.clone(), 2);
        let sqrt_minus_one = two.power(
            &q.value()
                .sub_if_greater_or_equal(&one_num)
                .shift_right_unchecked(2)
                .drop_leading_zeros(),
        );
        Ok(Arc::new(EdwardsCurve {
            zero: Element::from_integer(q.clone(), 0),
            one: Element::from_integer(q.clone(), 1),
            d,
            d2,
            sqrt_power,
            sqrt_minus_one,
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

    /// The base point: y = 4/5, x even.
    pub fn base_point(curve: &Arc<EdwardsCurve>) -> Result<EdwardsPoint> {
        let four = Element::from_integer(curve.q.clone(), 4);
        let five = Element::from_integer(curve.q.clone(), 5);
        Self::point_from_y(curve, four.multiply(&five.inverse()), 0)
    }

    /// Decodes a point from 32 little-endian bytes of y with x's parity in
    /// the top bit.
    pub fn point_from_bytes(curve: &Arc<EdwardsCurve>, p: &[u8]) -> Result<EdwardsPoint> {
        if p.len() != 32 {
            return Err(Error::InvalidArguments("point length must be 32 bytes"));
        }
        let mut be = p.to_vec();
        be.reverse();
        // Bit 255 is the parity bit, not part of the coordinate.
        let parity = (be[0] & 0x80) >> 7;
        be[0] &= 0x7F;
        let y = Element::new(curve.q.clone(), BigNum::from_bytes_be(&be))?;
        Self::point_from_y(curve, y, parity)
    }

    /// Recovers the point with the given y whose x has the requested parity.
    fn point_from_y(curve: &Arc<EdwardsCurve>, y: Element, parity: u8) -> Result<EdwardsPoint> {
        let yy = y.square();
        // x^2 (d y^2 + 1) == y^2 - 1.
        let xx = yy
            .subtract(&curve.one)
            .multiply(&yy.multiply(&curve.d).add(&curve.one).inverse());
        let mut x = xx.power(&curve.sqrt_power);
        if !x.multiply(&x).is_equal(&xx) {
            x = x.multiply(&curve.sqrt_minus_one);
            if !x.multiply(&x).is_equal(&xx) {
                return Err(Error::InvalidArguments("no point with this y coordinate"));
            }
        }
        if x.to_bignum().is_odd() != (parity == 1) {
            if x.is_zero() {
                return Err(Error::InvalidArguments(
                    "no odd point with this y coordinate",
                ));
            }
            x = x.negate();
        }
        Ok(EdwardsPoint::from_affine(curve.clone(), x, y))
    }

    /// Returns true if both curves match.
    pub fn is_equal(&self, that: &EdwardsCurve) -> bool {
        self.q.value().is_equal(that.q.value())
    }
}

/// A point on [`EdwardsCurve`] in extended coordinates. The affine point is
/// (x/z, y/z) and t maintains x * y = z * t.
pub struct EdwardsPoint {
    curve: Arc<EdwardsCurve>,
    x: Element,
    y: Element,
    t: Element,
    z: Element,
    affine: OnceLock<Box<EdwardsPoint>>,
    small_table: OnceLock<Vec<EdwardsPoint>>,
    fast_table: OnceLock<Vec<Vec<NielsPoint>>>,
}

impl Clone for EdwardsPoint {
    fn clone(&self) -> EdwardsPoint {
        EdwardsPoint::new_extended(
            self.curve.clone(),
            self.x.clone(),
            self.y.clone(),
            self.t.clone(),
            self.z.clone(),
        )
    }
}

impl EdwardsPoint {
    fn new_extended(
        curve: Arc<EdwardsCurve>,
        x: Element,
        y: Element,
        t: Element,
        z: Element,
    ) -> EdwardsPoint {
        EdwardsPoint {
            curve,
            x,
            y,
            t,
            z,
            affine: OnceLock::new(),
            small_table: OnceLock::new(),
            fast_table: OnceLock::new(),
        }
    }

    /// A point from affine coordinates.
    pub fn from_affine(curve: Arc<EdwardsCurve>, x: Element, y: Element) -> EdwardsPoint {
        let t = x.multiply(&y);
        let one = curve.one.clone();
        EdwardsPoint::new_extended(curve, x, y, t, one)
    }

    /// The additive identity, (0, 1).
    pub fn identity(curve: &Arc<EdwardsCurve>) -> EdwardsPoint {
        EdwardsPoint::from_affine(curve.clone(), curve.zero.clone(), curve.one.clone())
    }

    /// The degenerate all-zero sentinel. Unlike the NIST family the
    /// identity is an ordinary point; this value only arises from misuse.
    pub fn infinity(curve: &Arc<EdwardsCurve>) -> EdwardsPoint {
        EdwardsPoint::new_extended(
            curve.clone(),
            curve.zero.clone(),
            curve.zero.clone(),
            curve.zero.clone(),
            curve.zero.clone(),
        )
    }

    /// The curve this point lives on.
    pub fn curve(&self) -> &Arc<EdwardsCurve> {
        &self.curve
    }

    /// Returns true for the degenerate z = 0 sentinel.
    pub fn is_infinity(&self) -> bool {
        self.z.is_equal(&self.curve.zero)
    }

    /// Returns true if this is the additive identity (0, 1).
    pub fn is_identity(&self) -> bool {
        self.is_equal(&EdwardsPoint::identity(&self.curve))
    }

    /// The affine x coordinate.
    pub fn get_x(&self) -> Element {
        self.get_affine().x.clone()
    }

    /// The affine y coordinate.
    pub fn get_y(&self) -> Element {
        self.get_affine().y.clone()
    }

    fn get_affine(&self) -> &EdwardsPoint {
        if self.z.is_equal(&self.curve.one) {
            return self;
        }
        self.affine.get_or_init(|| {
            let z_inv = self.z.inverse();
            let x = self.x.multiply(&z_inv);
            let y = self.y.multiply(&z_inv);
            Box::new(EdwardsPoint::from_affine(self.curve.clone(), x, y))
        })
    }

    /// The negated point.
    pub fn negate(&self) -> EdwardsPoint {
        EdwardsPoint::new_extended(
            self.curve.clone(),
            self.x.negate(),
            self.y.clone(),
            self.t.negate(),
            self.z.clone(),
        )
    }

    /// Returns true if both points represent the same group element.
    pub fn is_equal(&self, that: &EdwardsPoint) -> bool {
        if self.is_infinity() || that.is_infinity() {
            return self.is_infinity() == that.is_infinity();
        }
        self.x.multiply(&that.z).is_equal(&that.x.multiply(&self.z))
            && self.y.multiply(&that.z).is_equal(&that.y.multiply(&self.z))
    }

    /// Encodes the point: 32 little-endian bytes of y, with x's parity
    /// folded into the top bit of the last byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        let x = self.get_x();
        let y = self.get_y();
        let mut result = pad_left(&y.to_bignum().to_bytes_be(), 32);
        result.reverse();
        if x.to_bignum().is_odd() {
            result[31] |= 0x80;
        }
        result
    }

    /// Adds two points with the unified extended-coordinate formula; valid
    /// for doubling and for the identity without special cases.
    pub fn add(&self, that: &EdwardsPoint) -> EdwardsPoint {
        debug_assert!(!self.is_infinity());
        debug_assert!(!that.is_infinity());
        let a = self.y.subtract(&self.x).multiply(&that.y.subtract(&that.x));
        let b = self.y.add(&self.x).multiply(&that.y.add(&that.x));
        let c = self.curve.d2.multiply(&self.t).multiply(&that.t);
        let d = self.z.multiply(&that.z).shift_left(1);
        let e = b.subtract(&a);
        let f = d.subtract(&c);
        let g = d.add(&c);
        let h = b.add(&a);
        EdwardsPoint::new_extended(
            self.curve.clone(),
            e.multiply(&f),
            g.multiply(&h),
            e.multiply(&h),
            f.multiply(&g),
        )
    }

    /// Doubles this point.
    fn double(&self) -> EdwardsPoint {
        self.add(self)
    }

    fn conditional_assign(&mut self, other: &EdwardsPoint, choice: Choice) {
        self.x.conditional_assign(&other.x, choice);
        self.y.conditional_assign(&other.y, choice);
        self.t.conditional_assign(&other.t, choice);
        self.z.conditional_assign(&other.z, choice);
    }

    /// Scalar multiplication: high-to-low signed-nybble, quadrupling
    /// between digits, with the same masked table scan as the NIST family.
    /// A zero digit is substituted with one for the table lookup and the
    /// resulting addition discarded under a mask, keeping both the lookup
    /// index and the add-or-skip decision branch-free; no infinity mask is
    /// needed because the identity is an ordinary point here.
    pub fn multiply(&self, k: &BigNum) -> EdwardsPoint {
        if let Some(table) = self.fast_table.get() {
            return self.fast_multiply(table, k);
        }

        // The receiver is normally the generator or a peer's public key, so
        // the small table is worth caching.
        let powers = self.small_table.get_or_init(|| {
            let mut powers = Vec::with_capacity(9);
            powers.push(EdwardsPoint::identity(&self.curve));
            powers.push(self.clone());
            for i in 2..9 {
                let next = powers[i - 1].add(self);
                powers.push(next);
            }
            powers
        });

        let nybbles = k
            .clone_with_size(self.curve.q.get_size())
            .to_signed_nybbles();
        let mut acc = EdwardsPoint::identity(&self.curve);
        for i in (0..nybbles.len()).rev() {
            acc = acc.double().double().double().double();
            let digit = nybbles[i];
            let (abs, nonzero, negative) = split_digit(digit);
            let mut multiplier = self.select_from_table(powers, abs);
            let negated = multiplier.negate();
            multiplier.conditional_assign(&negated, negative);
            let temp = acc.add(&multiplier);
            acc.conditional_assign(&temp, nonzero);
        }
        acc
    }

    /// Scalar multiplication against a per-nybble-position table of
    /// precomputed points.
    fn fast_multiply(&self, table: &[Vec<NielsPoint>], k: &BigNum) -> EdwardsPoint {
        let nybbles = k
            .clone_with_size(self.curve.q.get_size())
            .to_signed_nybbles();
        let mut acc = EdwardsPoint::identity(&self.curve);
        // Always table.len() additions, even for a short scalar.
        for (i, row) in table.iter().enumerate() {
            let digit = nybbles.get(i).copied().unwrap_or(0);
            let (abs, nonzero, negative) = split_digit(digit);
            let mut multiplier = NielsPoint::select_from_table(&self.curve, row, abs);
            multiplier.conditional_negate(negative);
            // The precomputed form must be the stationary operand.
            let temp = multiplier.add(&acc);
            acc.conditional_assign(&temp, nonzero);
        }
        acc
    }

    /// Assembles row[index] while touching every entry of the row in the
    /// same order regardless of the index. `index` must be in 1..=8.
    fn select_from_table(&self, row: &[EdwardsPoint], index: usize) -> EdwardsPoint {
        debug_assert!(index >= 1 && index < row.len());
        let size = self.curve.q.get_size();
        let mut x = BigNum::of_size(size);
        let mut y = BigNum::of_size(size);
        let mut t = BigNum::of_size(size);
        let mut z = BigNum::of_size(size);
        for (i, entry) in row.iter().enumerate().skip(1) {
            let hit = Choice::from((index == i) as u8);
            x.or_masked(entry.x.to_bignum(), hit);
            y.or_masked(entry.y.to_bignum(), hit);
            t.or_masked(entry.t.to_bignum(), hit);
            z.or_masked(entry.z.to_bignum(), hit);
        }
        let q = self.curve.q.clone();
        EdwardsPoint::new_extended(
            self.curve.clone(),
            Element::reduced(q.clone(), x),
            Element::reduced(q.clone(), y),
            Element::reduced(q.clone(), t),
            Element::reduced(q, z),
        )
    }

    /// Converts to the precomputed (y - x, y + x, 2dxy) form, valid only as
    /// the stationary operand of an addition.
    pub fn to_niels(&self) -> NielsPoint {
        let x = self.get_x();
        let y = self.get_y();
        NielsPoint {
            curve: self.curve.clone(),
            delta: y.subtract(&x),
            sum: y.add(&x),
            d2xy: x.multiply(&y).multiply(&self.curve.d2),
        }
    }

    /// Builds the full fast-multiply table in precomputed form: one row per
    /// nybble position, each row holding 1 through 8 times the point scaled
    /// by that position's power of 16. Expensive; meant to run once per
    /// well-known point.
    pub fn create_fast_multiply_table(&self) -> Vec<Vec<NielsPoint>> {
        let bits = self.curve.key_size_in_bits();
        let nybble_count = (bits + 1 + 3) / 4;
        let unsigned_nybble_count = (bits + 3) / 4;
        let mut table = Vec::with_capacity(nybble_count);
        let mut previous_eighth: Option<EdwardsPoint> = None;
        for power in 0..nybble_count {
            // row[i] = (i * 16^power) * self
            let mut row = Vec::with_capacity(9);
            row.push(EdwardsPoint::identity(&self.curve));
            let first = match &previous_eighth {
                None => self.clone(),
                Some(p) => p.double(),
            };
            row.push(first);
            if power != unsigned_nybble_count {
                for i in 2..=8 {
                    let next = row[i - 1].add(&row[1]);
                    row.push(next);
                }
                previous_eighth = Some(row[8].clone());
            }
            table.push(row.iter().map(EdwardsPoint::to_niels).collect());
        }
        table
    }

    /// Computes and attaches the fast-multiply table; explicit, never
    /// implicit. Attaching twice is a no-op.
    pub fn initialize_for_fast_multiply(&self) {
        if self.fast_table.get().is_some() {
            return;
        }
        let table = self.create_fast_multiply_table();
        debug_assert!(self.is_equal(&table[0][1].to_point()));
        let _ = self.fast_table.set(table);
    }

    /// Returns true if a fast-multiply table is attached.
    pub fn has_fast_multiply_table(&self) -> bool {
        self.fast_table.get().is_some()
    }

    /// Checks curve membership of the affine form:
    /// -x^2 + y^2 = 1 + d x^2 y^2.
    pub fn is_on_curve(&self) -> bool {
        if self.is_infinity() {
            return true;
        }
        let affine = self.get_affine();
        let x2 = affine.x.square();
        let y2 = affine.y.square();
        let left = y2.subtract(&x2);
        let right = self
            .curve
            .d
            .multiply(&x2)
            .multiply(&y2)
            .add(&self.curve.one);
        left.is_equal(&right)
    }
}

/// Splits a signed nybble into its lookup index and decision masks. A zero
/// digit looks up entry 1 and reports `nonzero` unset so the caller can
/// discard the contribution without branching.
fn split_digit(digit: i8) -> (usize, Choice, Choice) {
    let nonzero = Choice::from((digit != 0) as u8);
    let negative = Choice::from((digit < 0) as u8);
    let substituted = digit + (digit == 0) as i8;
    (substituted.unsigned_abs() as usize, nonzero, negative)
}

/// A precomputed point in the (y - x, y + x, 2dxy) representation of the
/// Ed25519 paper, saving two additions and two multiplications per point
/// addition. Valid only as the stationary operand; supports only selection,
/// negation, and addition.
pub struct NielsPoint {
    curve: Arc<EdwardsCurve>,
    /// y - x.
    delta: Element,
    /// y + x.
    sum: Element,
    /// 2 d x y.
    d2xy: Element,
}

impl Clone for NielsPoint {
    fn clone(&self) -> NielsPoint {
        NielsPoint {
            curve: self.curve.clone(),
            delta: self.delta.clone(),
            sum: self.sum.clone(),
            d2xy: self.d2xy.clone(),
        }
    }
}

impl NielsPoint {
    /// Converts back to an extended point.
    pub fn to_point(&self) -> EdwardsPoint {
        let x = self.sum.subtract(&self.delta).shift_right(1);
        let y = self.sum.add(&self.delta).shift_right(1);
        EdwardsPoint::from_affine(self.curve.clone(), x, y)
    }

    /// Negation swaps delta and sum and negates d2xy.
    pub fn negate(&self) -> NielsPoint {
        NielsPoint {
            curve: self.curve.clone(),
            delta: self.sum.clone(),
            sum: self.delta.clone(),
            d2xy: self.d2xy.negate(),
        }
    }

    fn conditional_negate(&mut self, choice: Choice) {
        Element::conditional_swap(&mut self.delta, &mut self.sum, choice);
        let negated = self.d2xy.negate();
        self.d2xy.conditional_assign(&negated, choice);
    }

    /// Adds an extended point to this precomputed point. This is the
    /// extended addition rewritten for the values available here: z is
    /// implicitly one and t * 2d is already computed.
    pub fn add(&self, that: &EdwardsPoint) -> EdwardsPoint {
        debug_assert!(!that.is_infinity());
        let a = self.delta.multiply(&that.y.subtract(&that.x));
        let b = self.sum.multiply(&that.y.add(&that.x));
        let c = self.d2xy.multiply(&that.t);
        let d = that.z.shift_left(1);
        let e = b.subtract(&a);
        let f = d.subtract(&c);
        let g = d.add(&c);
        let h = b.add(&a);
        EdwardsPoint::new_extended(
            self.curve.clone(),
            e.multiply(&f),
            g.multiply(&h),
            e.multiply(&h),
            f.multiply(&g),
        )
    }

    /// The masked scan over a table row; `index` must be in 1..=8.
    fn select_from_table(curve: &Arc<EdwardsCurve>, row: &[NielsPoint], index: usize) -> NielsPoint {
        debug_assert!(index >= 1 && index < row.len());
        let size = curve.q.get_size();
        let mut delta = BigNum::of_size(size);
        let mut sum = BigNum::of_size(size);
        let mut d2xy = BigNum::of_size(size);
        for (i, entry) in row.iter().enumerate().skip(1) {
            let hit = Choice::from((index == i) as u8);
            delta.or_masked(entry.delta.to_bignum(), hit);
            sum.or_masked(entry.sum.to_bignum(), hit);
            d2xy.or_masked(entry.d2xy.to_bignum(), hit);
        }
        let q = curve.q.clone();
        NielsPoint {
            curve: curve.clone(),
            delta: Element::reduced(q.clone(), delta),
            sum: Element::reduced(q.clone(), sum),
            d2xy: Element::reduced(q, d2xy),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;

    fn base() -> (Arc<EdwardsCurve>, EdwardsPoint) {
        let curve = EdwardsCurve::new().unwrap();
        let g = EdwardsCurve::base_point(&curve).unwrap();
        (curve, g)
    }

    #[test]
    fn base_point_has_standard_encoding() {
        let (_, g) = base();
        assert!(g.is_on_curve());
        assert_eq!(
            g.to_bytes(),
            hex!("5866666666666666666666666666666666666666666666666666666666666666")
        );
    }

    #[test]
    fn decode_round_trip() {
        let (curve, g) = base();
        let five_g = g.multiply(&BigNum::from_u32(5));
        let bytes = five_g.to_bytes();
        let decoded = EdwardsCurve::point_from_bytes(&curve, &bytes).unwrap();
        assert!(decoded.is_equal(&five_g));
        assert!(decoded.is_on_curve());
    }

    #[test]
    fn identity_is_neutral() {
        let (curve, g) = base();
        let id = EdwardsPoint::identity(&curve);
        assert!(id.is_identity());
        assert!(id.is_on_curve());
        assert!(g.add(&id).is_equal(&g));
        assert!(id.add(&g).is_equal(&g));
        assert!(g.add(&g.negate()).is_identity());
    }

    #[test]
    fn unified_addition_doubles() {
        let (_, g) = base();
        // The same formula serves addition and doubling.
        let two_g = g.add(&g);
        let four_g = two_g.add(&two_g);
        assert!(four_g.is_equal(&g.multiply(&BigNum::from_u32(4))));
    }

    #[test]
    fn multiply_matches_repeated_addition() {
        let (_, g) = base();
        let mut expected = g.clone();
        for _ in 0..6 {
            expected = expected.add(&g);
        }
        assert!(g.multiply(&BigNum::from_u32(7)).is_equal(&expected));
    }

    #[test]
    fn niels_round_trip() {
        let (_, g) = base();
        let three_g = g.multiply(&BigNum::from_u32(3));
        assert!(three_g.to_niels().to_point().is_equal(&three_g));
        // Negation in precomputed form matches negation of the point.
        assert!(three_g
            .to_niels()
            .negate()
            .to_point()
            .is_equal(&three_g.negate()));
    }

    #[test]
    fn fast_multiply_matches_slow_multiply() {
        let (curve, g) = base();
        let g_fast = EdwardsCurve::base_point(&curve).unwrap();
        g_fast.initialize_for_fast_multiply();
        assert!(g_fast.has_fast_multiply_table());

        let order = BigNum::from_bytes_be(&crate::constants::CURVE25519_N);
        let order_minus_1 = order.sub_if_greater_or_equal(&BigNum::one());
        let mid = BigNum::from_bytes_be(&hex!(
            "0b5d9c31b9f74c9fd9cf1d6347f4c27d2f7aa7a24c41235ff02d3e61b001cd6b"
        ));
        for k in [BigNum::one(), BigNum::two(), mid, order_minus_1] {
            assert!(g.multiply(&k).is_equal(&g_fast.multiply(&k)));
        }
    }

    #[test]
    fn group_law_distributes_over_scalars() {
        let (_, g) = base();
        let n = BigNum::from_bytes_be(&crate::constants::CURVE25519_N);
        let k1 = BigNum::from_bytes_be(&hex!("3344556677889911"));
        let k2 = BigNum::from_bytes_be(&hex!("aabbccddeeff0123"));
        let lhs = g.multiply(&k1).add(&g.multiply(&k2));
        let rhs = g.multiply(&k1.add(&k2).divmod(&n).unwrap().1);
        assert!(lhs.is_equal(&rhs));
    }

    #[test]
    fn multiply_by_order_is_identity() {
        let (_, g) = base();
        let n = BigNum::from_bytes_be(&crate::constants::CURVE25519_N);
        assert!(g.multiply(&n).is_identity());
    }
}
