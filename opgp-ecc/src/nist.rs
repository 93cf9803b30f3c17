//! Points on the NIST prime curves y^2 = x^3 - 3x + B, in Jacobian
//! projective coordinates. Addition and doubling use the explicit formulas
//! from the EFD (shortw-jacobian-3).

use std::sync::{Arc, OnceLock};

use opgp_bignum::{BigNum, FastModulus, Modulus};
use subtle::Choice;

use crate::element::Element;
use crate::error::{Error, Result};

/// A short-Weierstrass curve over a prime field with a = -3.
pub struct NistCurve {
    q: Arc<Modulus>,
    b: Element,
    zero: Element,
    one: Element,
    two: Element,
    three: Element,
    /// (q + 1) / 4; e^this is the square root of e when one exists, valid
    /// because every NIST field prime is 3 mod 4 (HAC 3.36).
    sqrt_power: BigNum,
    key_size_bits: usize,
}

impl NistCurve {
    /// Builds a curve from its field prime and B coefficient, both big
    /// endian.
    pub fn new(q_bytes: &[u8], b_bytes: &[u8]) -> Result<Arc<NistCurve>> {
        let modulus = Modulus::new(q_bytes)?;
        modulus.attach_fast_modulus(FastModulus::high_ones(modulus.value())?)?;
        let q = Arc::new(modulus);
        let key_size_bits = q.value().bit_length();
        let sqrt_power = q
            .value()
            .add(&BigNum::one())
            .shift_right_unchecked(2)
            .drop_leading_zeros();
        Ok(Arc::new(NistCurve {
            b: Element::new(q.clone(), BigNum::from_bytes_be(b_bytes))?,
            zero: Element::from_integer(q.clone(), 0),
            one: Element::from_integer(q.clone(), 1),
            two: Element::from_integer(q.clone(), 2),
            three: Element::from_integer(q.clone(), 3),
            sqrt_power,
            key_size_bits,
            q,
        }))
    }

    /// The field modulus.
    pub fn q(&self) -> &Arc<Modulus> {
        &self.q
    }

    /// The curve's key size in bits (the field prime's bit length).
    pub fn key_size_in_bits(&self) -> usize {
        self.key_size_bits
    }

    /// The byte width of a field element on the wire.
    pub fn field_size_in_bytes(&self) -> usize {
        (self.key_size_bits + 7) / 8
    }

    /// Returns true if both curves have the same field and B coefficient.
    pub fn is_equal(&self, that: &NistCurve) -> bool {
        self.q.value().is_equal(that.q.value()) && self.b.is_equal(&that.b)
    }

    /// Decodes a point from its uncompressed (`04 || X || Y`) or compressed
    /// (`02/03 || X`) encoding, verifying curve membership.
    pub fn point_from_bytes(curve: &Arc<NistCurve>, p: &[u8]) -> Result<NistPoint> {
        match p.first().copied() {
            Some(0x04) => {
                if p.len() % 2 != 1 {
                    return Err(Error::InvalidArguments(
                        "uncompressed point must have an odd number of bytes",
                    ));
                }
                let l = p.len() - 1;
                let x = Element::new(curve.q.clone(), BigNum::from_bytes_be(&p[1..l / 2 + 1]))?;
                let y = Element::new(curve.q.clone(), BigNum::from_bytes_be(&p[l / 2 + 1..]))?;
                let point = NistPoint::from_affine(curve.clone(), x, y);
                if !point.is_on_curve() {
                    return Err(Error::InvalidArguments("point must lie on the curve"));
                }
                Ok(point)
            }
            Some(parity @ (0x02 | 0x03)) => {
                let x = Element::new(curve.q.clone(), BigNum::from_bytes_be(&p[1..]))?;
                Self::point_from_x(curve, x, parity & 1)
            }
            _ => Err(Error::InvalidArguments("bad point encoding")),
        }
    }

    /// Recovers the point with the given x whose y has the requested parity.
    fn point_from_x(curve: &Arc<NistCurve>, x: Element, parity: u8) -> Result<NistPoint> {
        // y^2 = x^3 - 3x + B.
        let yy = x
            .square()
            .multiply(&x)
            .subtract(&x.add(&x).add(&x))
            .add(&curve.b);
        let mut y = yy.power(&curve.sqrt_power);
        if !y.square().is_equal(&yy) {
            return Err(Error::InvalidArguments("no point with this x coordinate"));
        }
        if y.to_bignum().is_odd() != (parity == 1) {
            if y.is_zero() {
                return Err(Error::InvalidArguments(
                    "no odd point with this x coordinate",
                ));
            }
            y = y.negate();
        }
        let point = NistPoint::from_affine(curve.clone(), x, y);
        debug_assert!(point.is_on_curve());
        Ok(point)
    }
}

/// A point on a [`NistCurve`] in Jacobian coordinates (x/z^2, y/z^3).
/// The point at infinity is the unique point with z = 0.
///
/// Points are immutable in effect: every operation returns a new point.
/// The affine form and the multiply tables are lazily computed write-once
/// caches; racing initializers at worst duplicate work.
pub struct NistPoint {
    curve: Arc<NistCurve>,
    x: Element,
    y: Element,
    z: Element,
    affine: OnceLock<Box<NistPoint>>,
    small_table: OnceLock<Vec<NistPoint>>,
    fast_table: OnceLock<Vec<Vec<NistPoint>>>,
}

impl Clone for NistPoint {
    fn clone(&self) -> NistPoint {
        NistPoint::new(
            self.curve.clone(),
            self.x.clone(),
            self.y.clone(),
            self.z.clone(),
        )
    }
}

impl NistPoint {
    fn new(curve: Arc<NistCurve>, x: Element, y: Element, z: Element) -> NistPoint {
        NistPoint {
            curve,
            x,
            y,
            z,
            affine: OnceLock::new(),
            small_table: OnceLock::new(),
            fast_table: OnceLock::new(),
        }
    }

    /// A point with affine coordinates (z = 1).
    pub fn from_affine(curve: Arc<NistCurve>, x: Element, y: Element) -> NistPoint {
        let one = curve.one.clone();
        NistPoint::new(curve, x, y, one)
    }

    /// The point at infinity.
    pub fn infinity(curve: &Arc<NistCurve>) -> NistPoint {
        NistPoint::new(
            curve.clone(),
            curve.one.clone(),
            curve.zero.clone(),
            curve.zero.clone(),
        )
    }

    /// The curve this point lives on.
    pub fn curve(&self) -> &Arc<NistCurve> {
        &self.curve
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

    /// The affine y coordinate. The point must not be infinity.
    pub fn get_y(&self) -> Element {
        debug_assert!(!self.is_infinity());
        self.get_affine().y.clone()
    }

    fn get_affine(&self) -> &NistPoint {
        if self.z.is_equal(&self.curve.one) {
            return self;
        }
        self.affine.get_or_init(|| {
            let z_inv = self.z.inverse();
            let z_inv2 = z_inv.square();
            let x = self.x.multiply(&z_inv2);
            let y = self.y.multiply(&z_inv2.multiply(&z_inv));
            Box::new(NistPoint::from_affine(self.curve.clone(), x, y))
        })
    }

    pub(crate) fn to_affine(&self) -> NistPoint {
        if self.is_infinity() {
            return self.clone();
        }
        self.get_affine().clone()
    }

    /// The negated point.
    pub fn negate(&self) -> NistPoint {
        NistPoint::new(
            self.curve.clone(),
            self.x.clone(),
            self.y.negate(),
            self.z.clone(),
        )
    }

    /// Returns true if both points represent the same group element.
    pub fn is_equal(&self, that: &NistPoint) -> bool {
        let z1z1 = self.z.square();
        let z2z2 = that.z.square();
        self.x.multiply(&z2z2).is_equal(&that.x.multiply(&z1z1))
            && self
                .y
                .multiply(&z2z2.multiply(&that.z))
                .is_equal(&that.y.multiply(&z1z1.multiply(&self.z)))
    }

    /// Encodes the point: uncompressed `04 || X || Y`, or `02/03 || X` with
    /// y's parity in the lead byte, each coordinate zero-padded to the field
    /// size.
    pub fn to_bytes(&self, compressed: bool) -> Vec<u8> {
        let field_size = self.curve.field_size_in_bytes();
        let x = pad_left(&self.get_x().to_bignum().to_bytes_be(), field_size);
        if compressed {
            let mut r = vec![0x02 + self.get_y().to_bignum().is_odd() as u8];
            r.extend_from_slice(&x);
            r
        } else {
            let y = pad_left(&self.get_y().to_bignum().to_bytes_be(), field_size);
            let mut r = vec![0x04];
            r.extend_from_slice(&x);
            r.extend_from_slice(&y);
            r
        }
    }

    /// Adds two points; the group operation.
    ///
    /// The same-x and same-point dispatch below compares coordinate values
    /// and therefore leaks timing; this method is only for adding public
    /// points. Scalar-driven accumulation uses the masked formulas in
    /// `multiply` instead.
    pub fn add(&self, that: &NistPoint) -> NistPoint {
        debug_assert!(self.curve.is_equal(&that.curve));
        if self.is_infinity() {
            return that.clone();
        }
        if that.is_infinity() {
            return self.clone();
        }
        let z1z1 = self.z.square();
        let z2z2 = that.z.square();
        if self.x.multiply(&z2z2).is_equal(&that.x.multiply(&z1z1)) {
            // Same x: either the same point or inverses.
            return if self
                .y
                .multiply(&z2z2.multiply(&that.z))
                .is_equal(&that.y.multiply(&z1z1.multiply(&self.z)))
            {
                self.double()
            } else {
                NistPoint::infinity(&self.curve)
            };
        }
        if self.z.is_equal(&that.z) {
            if self.z.is_equal(&self.curve.one) {
                return self.add_affine(that);
            }
            return self.add_same_z(that);
        } else if that.z.is_equal(&self.curve.one) {
            return self.add_mixed(that);
        }
        self.add_general(that)
    }

    /// General Jacobian addition (11M + 5S). Does not handle P + P,
    /// infinity + P, or P + infinity.
    fn add_general(&self, that: &NistPoint) -> NistPoint {
        let z1z1 = self.z.square();
        let z2z2 = that.z.square();
        let u1 = self.x.multiply(&z2z2);
        let u2 = that.x.multiply(&z1z1);
        let s1 = self.y.multiply(&that.z).multiply(&z2z2);
        let s2 = that.y.multiply(&self.z).multiply(&z1z1);
        let h = u2.subtract(&u1);
        let i = h.shift_left(1).square();
        let j = h.multiply(&i);
        let v = u1.multiply(&i);
        let r = s2.subtract(&s1).shift_left(1);
        let x3 = r.square().subtract(&j).subtract(&v.shift_left(1));
        let y3 = r
            .multiply(&v.subtract(&x3))
            .subtract(&s1.multiply(&j).shift_left(1));
        let z3 = self
            .z
            .add(&that.z)
            .square()
            .subtract(&z1z1)
            .subtract(&z2z2)
            .multiply(&h);
        NistPoint::new(self.curve.clone(), x3, y3, z3)
    }

    /// Doubles this point, using the affine-optimized formula when the
    /// affine form is already available (1M + 5S), else the general
    /// Jacobian doubling (3M + 5S).
    fn double(&self) -> NistPoint {
        if self.z.is_equal(&self.curve.one) {
            return self.double_affine();
        }
        if let Some(affine) = self.affine.get() {
            return affine.double_affine();
        }
        let delta = self.z.square();
        let alpha = self
            .curve
            .three
            .multiply(&self.x.subtract(&delta))
            .multiply(&self.x.add(&delta));
        let gamma = self.y.square();
        let beta = self.x.multiply(&gamma);
        let x3 = alpha.square().subtract(&beta.shift_left(3));
        let y3 = alpha
            .multiply(&beta.shift_left(2).subtract(&x3))
            .subtract(&gamma.square().shift_left(3));
        let z3 = self.y.add(&self.z).square().subtract(&gamma).subtract(&delta);
        NistPoint::new(self.curve.clone(), x3, y3, z3)
    }

    /// Doubling for z = 1 (1M + 5S).
    fn double_affine(&self) -> NistPoint {
        debug_assert!(self.z.is_equal(&self.curve.one));
        let xx = self.x.square();
        let yy = self.y.square();
        let yyyy = yy.square();
        let s = self
            .curve
            .two
            .multiply(&self.x.add(&yy).square().subtract(&xx).subtract(&yyyy));
        let m = self.curve.three.multiply(&xx.subtract(&self.curve.one));
        let t = m.square().subtract(&self.curve.two.multiply(&s));
        let x3 = t.clone();
        let y3 = m.multiply(&s.subtract(&t)).subtract(&yyyy.shift_left(3));
        let z3 = self.y.shift_left(1);
        NistPoint::new(self.curve.clone(), x3, y3, z3)
    }

    /// Addition when both operands have z = 1 (4M + 2S).
    fn add_affine(&self, that: &NistPoint) -> NistPoint {
        debug_assert!(self.z.is_equal(&self.curve.one));
        debug_assert!(that.z.is_equal(&self.curve.one));
        let h = that.x.subtract(&self.x);
        let hh = h.square();
        let i = hh.shift_left(2);
        let j = h.multiply(&i);
        let r = that.y.subtract(&self.y).shift_left(1);
        let v = self.x.multiply(&i);
        let x3 = r.square().subtract(&j).subtract(&v.shift_left(1));
        let y3 = r
            .multiply(&v.subtract(&x3))
            .subtract(&self.y.multiply(&j).shift_left(1));
        let z3 = h.shift_left(1);
        NistPoint::new(self.curve.clone(), x3, y3, z3)
    }

    /// Addition when both operands share a z coordinate (5M + 2S).
    fn add_same_z(&self, that: &NistPoint) -> NistPoint {
        debug_assert!(self.z.is_equal(&that.z));
        let a = that.x.subtract(&self.x).square();
        let b = self.x.multiply(&a);
        let c = that.x.multiply(&a);
        let d = that.y.subtract(&self.y).square();
        let x3 = d.subtract(&b).subtract(&c);
        let y3 = that
            .y
            .subtract(&self.y)
            .multiply(&b.subtract(&x3))
            .subtract(&self.y.multiply(&c.subtract(&b)));
        let z3 = self.z.multiply(&that.x.subtract(&self.x));
        NistPoint::new(self.curve.clone(), x3, y3, z3)
    }

    /// Mixed addition: `that` must have z = 1 (7M + 4S). Does not handle
    /// P + P, infinity + P, or P + infinity.
    fn add_mixed(&self, that: &NistPoint) -> NistPoint {
        let z1z1 = self.z.square();
        let u2 = that.x.multiply(&z1z1);
        let s2 = that.y.multiply(&self.z).multiply(&z1z1);
        let h = u2.subtract(&self.x);
        let hh = h.square();
        let i = hh.shift_left(2);
        let j = h.multiply(&i);
        let r = s2.subtract(&self.y).shift_left(1);
        let v = self.x.multiply(&i);
        let x3 = r.square().subtract(&j).subtract(&v.shift_left(1));
        let y3 = r
            .multiply(&v.subtract(&x3))
            .subtract(&self.y.multiply(&j).shift_left(1));
        let z3 = self.z.add(&h).square().subtract(&z1z1).subtract(&hh);
        NistPoint::new(self.curve.clone(), x3, y3, z3)
    }

    /// Scalar multiplication.
    ///
    /// With a fast-multiply table attached this walks one table row per
    /// nybble position. Otherwise it builds (and caches) the 1x-8x small
    /// table and performs a high-to-low signed-nybble multiplication,
    /// quadrupling between digits. Either way every table row is scanned
    /// with masked selects, a zero digit assembles the all-zero entry whose
    /// contribution the masks discard, and the accumulator's infinity
    /// status is itself tracked with a mask — "still infinity" must not be
    /// distinguishable by timing from "a real point".
    pub fn multiply(&self, k: &BigNum) -> NistPoint {
        if let Some(table) = self.fast_table.get() {
            return self.fast_multiply(table, k);
        }

        // The receiver is normally a generator or a peer's public key, so
        // the small table is worth caching for later multiplies.
        let powers = self.small_table.get_or_init(|| {
            let mut powers = Vec::with_capacity(9);
            powers.push(NistPoint::infinity(&self.curve));
            powers.push(self.clone());
            for i in 2..9 {
                let next = powers[i - 1].add(self);
                powers.push(next);
            }
            powers
        });

        // The scalar is sized to the group order, which for the NIST curves
        // has the same length as the field modulus.
        let nybbles = k
            .clone_with_size(self.curve.q.get_size())
            .to_signed_nybbles();
        let mut acc = NistPoint::infinity(&self.curve);
        let mut acc_is_infinity = Choice::from(1u8);
        for i in (0..nybbles.len()).rev() {
            acc = acc.double().double().double().double();
            let multiplier = self.select_from_table(powers, nybbles[i]);
            let temp = acc.add_general(&multiplier);
            self.accumulate(&mut acc, &mut acc_is_infinity, &multiplier, &temp, nybbles[i]);
        }
        acc
    }

    /// Scalar multiplication against a per-nybble-position table; no
    /// quadrupling needed.
    fn fast_multiply(&self, table: &[Vec<NistPoint>], k: &BigNum) -> NistPoint {
        let nybbles = k
            .clone_with_size(self.curve.q.get_size())
            .to_signed_nybbles();
        let mut acc = NistPoint::infinity(&self.curve);
        let mut acc_is_infinity = Choice::from(1u8);
        // Always perform table.len() additions, even when the scalar is
        // short.
        for (i, row) in table.iter().enumerate() {
            let nybble = nybbles.get(i).copied().unwrap_or(0);
            let multiplier = self.select_from_table(row, nybble);
            // k is below the group order, so acc != multiplier unless both
            // are infinity, which the masks below handle.
            let temp = acc.add_mixed(&multiplier);
            self.accumulate(&mut acc, &mut acc_is_infinity, &multiplier, &temp, nybble);
        }
        acc
    }

    /// The shared masked accumulation step: start the accumulator from the
    /// table point while it is still infinity, accept the sum only when the
    /// digit is nonzero, and update the infinity mask.
    fn accumulate(
        &self,
        acc: &mut NistPoint,
        acc_is_infinity: &mut Choice,
        multiplier: &NistPoint,
        temp: &NistPoint,
        nybble: i8,
    ) {
        acc.x.conditional_assign(&multiplier.x, *acc_is_infinity);
        acc.y.conditional_assign(&multiplier.y, *acc_is_infinity);
        acc.z.conditional_assign(&multiplier.z, *acc_is_infinity);
        let multiplier_is_infinity = Choice::from((nybble == 0) as u8);
        // Accept the addition result only if neither operand was infinity.
        let mask = !multiplier_is_infinity & !*acc_is_infinity;
        acc.x.conditional_assign(&temp.x, mask);
        acc.y.conditional_assign(&temp.y, mask);
        acc.z.conditional_assign(&temp.z, mask);
        *acc_is_infinity &= multiplier_is_infinity;
    }

    /// Assembles row[|index|] (negated when `index` is negative) while
    /// touching every entry of the row in the same order regardless of the
    /// index.
    fn select_from_table(&self, row: &[NistPoint], index: i8) -> NistPoint {
        let is_positive = Choice::from((index > 0) as u8);
        let abs_index = index.unsigned_abs() as usize;
        debug_assert!(abs_index < row.len());
        let size = self.curve.q.get_size();
        let mut x = BigNum::of_size(size);
        let mut y = BigNum::of_size(size);
        let mut z = BigNum::of_size(size);
        for (i, entry) in row.iter().enumerate().skip(1) {
            let hit = Choice::from((abs_index == i) as u8);
            x.or_masked(entry.x.to_bignum(), hit);
            y.or_masked(entry.y.to_bignum(), hit);
            z.or_masked(entry.z.to_bignum(), hit);
        }
        let q = self.curve.q.clone();
        let y = Element::reduced(q.clone(), y);
        let minus_y = y.negate();
        NistPoint::new(
            self.curve.clone(),
            Element::reduced(q.clone(), x),
            Element::select(&y, &minus_y, is_positive),
            Element::reduced(q, z),
        )
    }

    /// Builds the full fast-multiply table: one row per nybble position,
    /// each row holding 1 through 8 times the point scaled by that
    /// position's power of 16. Entries are normalized to affine form so the
    /// multiply loop can use mixed addition. This is expensive — O(curve
    /// bits) point operations plus an inversion per entry — and meant to run
    /// once per well-known point.
    pub fn create_fast_multiply_table(&self) -> Vec<Vec<NistPoint>> {
        let bits = self.curve.key_size_in_bits();
        // The sign bias can carry one extra bit.
        let nybble_count = (bits + 1 + 3) / 4;
        let unsigned_nybble_count = (bits + 3) / 4;
        let mut table: Vec<Vec<NistPoint>> = Vec::with_capacity(nybble_count);
        for power in 0..nybble_count {
            // row[i] = (i * 16^power) * self
            let mut row = Vec::with_capacity(9);
            row.push(NistPoint::infinity(&self.curve));
            let first = if power == 0 {
                self.clone()
            } else {
                table[power - 1][8].double()
            };
            row.push(first.to_affine());
            if power != unsigned_nybble_count {
                for i in 2..=8 {
                    let next = row[i - 1].add(&row[1]).to_affine();
                    row.push(next);
                }
            }
            // A row at unsigned_nybble_count holds only the 0/1 entries: the
            // extra digit exists solely for the signed-digit overflow.
            table.push(row);
        }
        table
    }

    /// Computes and attaches the fast-multiply table. A deliberate, explicit
    /// optimization step for points that will be multiplied repeatedly; it
    /// is never triggered implicitly. Attaching twice is a no-op.
    pub fn initialize_for_fast_multiply(&self) {
        if self.fast_table.get().is_some() {
            return;
        }
        let table = self.create_fast_multiply_table();
        debug_assert!(self.is_equal(&table[0][1]));
        let _ = self.fast_table.set(table);
    }

    /// Returns true if a fast-multiply table is attached.
    pub fn has_fast_multiply_table(&self) -> bool {
        self.fast_table.get().is_some()
    }

    /// Checks curve membership of the affine form; infinity counts as on
    /// the curve. Callers validate externally supplied points with this
    /// before doing arithmetic on them.
    pub fn is_on_curve(&self) -> bool {
        if self.is_infinity() {
            return true;
        }
        let affine = self.get_affine();
        // y^2 = x^3 - 3x + B.
        let left = affine.y.square();
        let x = &affine.x;
        let right = x
            .square()
            .multiply(x)
            .subtract(&x.add(x).add(x))
            .add(&self.curve.b);
        left.is_equal(&right)
    }
}

pub(crate) fn pad_left(bytes: &[u8], width: usize) -> Vec<u8> {
    let mut out = vec![0u8; width.saturating_sub(bytes.len())];
    out.extend_from_slice(bytes);
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::constants;

    fn p256() -> (Arc<NistCurve>, NistPoint) {
        let curve = NistCurve::new(&constants::P256_Q, &constants::P256_B).unwrap();
        let g = NistCurve::point_from_bytes(&curve, &constants::P256_G).unwrap();
        (curve, g)
    }

    // The standard small multiples of the P-256 base point.
    const P256_2G: [u8; 65] = hex_literal::hex!(
        "047cf27b188d034f7e8a52380304b51ac3c08969e277f21b35a60b48fc476699"
        "7807775510db8ed040293d9ac69f7430dbba7dade63ce982299e04b79d227873d1"
    );
    const P256_3G: [u8; 65] = hex_literal::hex!(
        "045ecbe4d1a6330a44c8f7ef951d4bf165e6c6b721efada985fb41661bc6e7fd"
        "6c8734640c4998ff7e374b06ce1a64a2ecd82ab036384fb83d9a79b127a27d5032"
    );

    #[test]
    fn generator_is_on_curve() {
        let (_, g) = p256();
        assert!(g.is_on_curve());
        assert!(!g.is_infinity());
    }

    #[test]
    fn doubling_matches_known_answer() {
        let (curve, g) = p256();
        let two_g = g.add(&g);
        assert!(two_g.is_on_curve());
        assert_eq!(two_g.to_bytes(false), P256_2G);
        let expected = NistCurve::point_from_bytes(&curve, &P256_2G).unwrap();
        assert!(two_g.is_equal(&expected));
    }

    #[test]
    fn addition_matches_known_answer() {
        let (_, g) = p256();
        let three_g = g.add(&g).add(&g);
        assert_eq!(three_g.to_bytes(false), P256_3G);
    }

    #[test]
    fn multiply_small_scalars() {
        let (_, g) = p256();
        assert_eq!(g.multiply(&BigNum::one()).to_bytes(false), g.to_bytes(false));
        assert_eq!(g.multiply(&BigNum::two()).to_bytes(false), P256_2G);
        assert_eq!(
            g.multiply(&BigNum::from_u32(3)).to_bytes(false),
            P256_3G
        );
    }

    #[test]
    fn add_inverse_is_infinity() {
        let (_, g) = p256();
        assert!(g.add(&g.negate()).is_infinity());
        let four_g = g.multiply(&BigNum::from_u32(4));
        assert!(four_g.add(&four_g.negate()).is_infinity());
    }

    #[test]
    fn infinity_is_neutral() {
        let (curve, g) = p256();
        let inf = NistPoint::infinity(&curve);
        assert!(inf.is_identity());
        assert!(inf.is_on_curve());
        assert!(g.add(&inf).is_equal(&g));
        assert!(inf.add(&g).is_equal(&g));
    }

    #[test]
    fn compressed_round_trip() {
        let (curve, g) = p256();
        let five_g = g.multiply(&BigNum::from_u32(5));
        let compressed = five_g.to_bytes(true);
        assert_eq!(compressed.len(), 33);
        let decoded = NistCurve::point_from_bytes(&curve, &compressed).unwrap();
        assert!(decoded.is_equal(&five_g));
    }

    #[test]
    fn rejects_off_curve_points() {
        let (curve, _) = p256();
        let mut bad = constants::P256_G;
        bad[64] ^= 1;
        assert!(NistCurve::point_from_bytes(&curve, &bad).is_err());
        assert!(NistCurve::point_from_bytes(&curve, &[0x05, 1, 2, 3]).is_err());
    }

    #[test]
    fn fast_multiply_matches_slow_multiply() {
        let (curve, g) = p256();
        let g_fast = NistCurve::point_from_bytes(&curve, &constants::P256_G).unwrap();
        g_fast.initialize_for_fast_multiply();
        assert!(g_fast.has_fast_multiply_table());

        let order_minus_1 = BigNum::from_bytes_be(&constants::P256_N)
            .sub_if_greater_or_equal(&BigNum::one());
        let mid = BigNum::from_bytes_be(&hex_literal::hex!(
            "7a24c41235ff02d3e61b001cd6b4b5d9c31b9f74c9fd9cf1d6347f4c27d2f7aa"
        ));
        for k in [BigNum::one(), BigNum::two(), mid, order_minus_1] {
            let slow = g.multiply(&k);
            let fast = g_fast.multiply(&k);
            assert!(slow.is_equal(&fast), "mismatch for {:?}", k);
        }
    }

    #[test]
    fn group_law_distributes_over_scalars() {
        let (_, g) = p256();
        let n = BigNum::from_bytes_be(&constants::P256_N);
        let k1 = BigNum::from_bytes_be(b"\x11\x22\x33\x44\x55\x66\x77\x88\x99\xaa");
        let k2 = BigNum::from_bytes_be(b"\x0f\x1e\x2d\x3c\x4b\x5a\x69\x78\x87\x96");
        let lhs = g.multiply(&k1).add(&g.multiply(&k2));
        let sum = k1.add(&k2).divmod(&n).unwrap().1;
        let rhs = g.multiply(&sum);
        assert!(lhs.is_equal(&rhs));
    }

    #[test]
    fn multiply_by_order_is_identity() {
        let (_, g) = p256();
        let n = BigNum::from_bytes_be(&constants::P256_N);
        assert!(g.multiply(&n).is_identity());
    }
}
