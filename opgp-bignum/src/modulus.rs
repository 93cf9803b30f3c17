use std::sync::OnceLock;

use crate::bignum::{BigNum, BASE, BASE_LEN, BASE_MASK};
use crate::error::{Error, Result};

/// An odd modulus with precomputed Montgomery state.
///
/// Reduction strategies: modular multiplication and exponentiation run on
/// Montgomery form (HAC 14.36); `residue` falls back to long division unless
/// a special-form [`FastModulus`] strategy has been attached.
pub struct Modulus {
    value: BigNum,
    /// -m^-1 mod 2^24, the reduction constant of HAC 14.32.
    inverse_modulus: u32,
    /// RR = (2^24)^(2n) mod m.
    rr: BigNum,
    /// R = (2^24)^n mod m.
    r: BigNum,
    fast: OnceLock<FastModulus>,
}

impl Modulus {
    /// Builds a modulus from big-endian bytes. The value must be odd (a
    /// requirement of Montgomery reduction) and greater than one.
    pub fn new(modulus: &[u8]) -> Result<Modulus> {
        Modulus::from_bignum(BigNum::from_bytes_be(modulus))
    }

    /// Builds a modulus from an existing number.
    pub fn from_bignum(value: BigNum) -> Result<Modulus> {
        let value = value.drop_leading_zeros();
        if value.is_even() || !BigNum::one().is_less(&value) {
            return Err(Error::InvalidArguments("modulus must be odd and > 1"));
        }
        let inverse_modulus = Modulus::compute_inverse_modulus(&value);
        let rr = Modulus::compute_rr(&value);
        let mut m = Modulus {
            value,
            inverse_modulus,
            rr,
            r: BigNum::zero(),
            fast: OnceLock::new(),
        };
        m.r = m.mont_mul_one(&m.rr);
        Ok(m)
    }

    /// The modulus value.
    pub fn value(&self) -> &BigNum {
        &self.value
    }

    /// The modulus limb capacity; every reduced result is sized to this.
    pub fn get_size(&self) -> usize {
        self.value.get_size()
    }

    /// Attaches a special-form reduction strategy. At most one strategy can
    /// ever be attached; the cell is write-once.
    pub fn attach_fast_modulus(&self, fast: FastModulus) -> Result<()> {
        self.fast
            .set(fast)
            .map_err(|_| Error::InvalidArguments("fast modulus already set"))
    }

    /// Calculates `value mod self`.
    pub fn residue(&self, value: &BigNum) -> BigNum {
        if let Some(fast) = self.fast.get() {
            return fast.residue(value);
        }
        value.divmod_internal(&self.value).1
    }

    /// Calculates `a + b mod self`. Both inputs must already be reduced.
    pub fn mod_add(&self, a: &BigNum, b: &BigNum) -> BigNum {
        debug_assert!(a.is_less(&self.value) && b.is_less(&self.value));
        a.add(b)
            .sub_if_greater_or_equal(&self.value)
            .clone_with_size(self.get_size())
    }

    /// Calculates `a - b mod self`. Both inputs must already be reduced.
    pub fn mod_subtract(&self, a: &BigNum, b: &BigNum) -> BigNum {
        debug_assert!(a.is_less(&self.value) && b.is_less(&self.value));
        a.add(&self.value)
            .sub_unchecked(b)
            .sub_if_greater_or_equal(&self.value)
            .clone_with_size(self.get_size())
    }

    /// Calculates `a * b mod self` with Montgomery reduction. Both inputs
    /// must already be reduced.
    pub fn mod_multiply(&self, a: &BigNum, b: &BigNum) -> BigNum {
        debug_assert!(a.is_less(&self.value) && b.is_less(&self.value));
        let br = self.mont_mul(b, &self.rr);
        self.mont_mul(a, &br)
    }

    /// Calculates `base ^ exp mod self` with a fixed 4-bit-window Montgomery
    /// ladder over the big-endian exponent bytes. `base` must be reduced.
    /// The work done depends only on the exponent's length, not its digits.
    pub fn mod_power(&self, base: &BigNum, exp: &BigNum) -> BigNum {
        self.mod_power_bytes(base, &exp.to_bytes_be())
    }

    /// [`Modulus::mod_power`] over an explicit big-endian exponent stream.
    pub fn mod_power_bytes(&self, base: &BigNum, exp: &[u8]) -> BigNum {
        let n = self.get_size();
        // base * R mod m.
        let base_r = self.mont_mul(base, &self.rr);
        // lookup[i] = base^i * R mod m.
        let mut lookup = Vec::with_capacity(16);
        lookup.push(self.r.clone());
        for i in 1..16 {
            let next = self.mont_mul(&base_r, &lookup[i - 1]);
            lookup.push(next);
        }

        let mut accu = self.r.clone();
        let mut tmp = BigNum::of_size(n);
        for &e in exp {
            // Four squarings, a window multiply, four squarings, a window
            // multiply; accu and tmp alternate as the destination.
            self.mont_mul_into(&accu, &accu, &mut tmp);
            self.mont_mul_into(&tmp, &tmp, &mut accu);
            self.mont_mul_into(&accu, &accu, &mut tmp);
            self.mont_mul_into(&tmp, &tmp, &mut accu);
            self.mont_mul_into(&accu, &lookup[(e >> 4) as usize], &mut tmp);
            self.mont_mul_into(&tmp, &tmp, &mut accu);
            self.mont_mul_into(&accu, &accu, &mut tmp);
            self.mont_mul_into(&tmp, &tmp, &mut accu);
            self.mont_mul_into(&accu, &accu, &mut tmp);
            self.mont_mul_into(&tmp, &lookup[(e & 15) as usize], &mut accu);
        }
        self.mont_mul_one(&accu)
    }

    /// Calculates `x^-1 mod self` by Fermat's little theorem; valid only for
    /// prime moduli. `x` must be reduced; the inverse of zero is zero.
    pub fn mod_inverse(&self, x: &BigNum) -> BigNum {
        debug_assert!(x.is_less(&self.value));
        // x^-1 = x^(m - 2) mod m.
        let exp = self.value.sub_unchecked(&BigNum::two());
        self.mod_power(x, &exp)
    }

    /// Montgomery multiplication: `a * b / R mod self` (HAC 14.36).
    fn mont_mul(&self, a: &BigNum, b: &BigNum) -> BigNum {
        let mut c = BigNum::of_size(self.get_size());
        self.mont_mul_into(a, b, &mut c);
        c
    }

    fn mont_mul_into(&self, a: &BigNum, b: &BigNum, c: &mut BigNum) {
        let n = self.get_size();
        {
            let limbs = c.limbs_mut();
            limbs.clear();
            limbs.resize(n, 0);
        }
        for i in 0..n {
            self.mont_mul_add(a.limb(i), b, c);
        }
        self.mont_normalize(c);
    }

    /// Calculates `(a * b + c) / 2^24 mod self` in place (HAC 14.32 inner
    /// step).
    fn mont_mul_add(&self, a: u32, b: &BigNum, c: &mut BigNum) {
        let m = self.value.limbs();
        let n = m.len();
        let c = c.limbs_mut();
        let mut acc: u64 = a as u64 * b.limb(0) as u64 + c[0] as u64;
        let u = ((acc & BASE_MASK as u64) * self.inverse_modulus as u64) & BASE_MASK as u64;
        acc += u * m[0] as u64;
        for i in 1..n {
            acc = (acc >> BASE_LEN) + a as u64 * b.limb(i) as u64 + c[i] as u64 + u * m[i] as u64;
            c[i - 1] = (acc & BASE_MASK as u64) as u32;
        }
        c[n - 1] = (acc >> BASE_LEN) as u32;
    }

    /// Calculates `c / 2^24 mod self` in place; `mont_mul_add` specialized
    /// for a == 0.
    fn mont_reduce(&self, c: &mut BigNum) {
        let m = self.value.limbs();
        let n = m.len();
        let c = c.limbs_mut();
        let mut acc: u64 = c[0] as u64;
        let u = ((acc & BASE_MASK as u64) * self.inverse_modulus as u64) & BASE_MASK as u64;
        acc += u * m[0] as u64;
        for i in 1..n {
            acc = (acc >> BASE_LEN) + c[i] as u64 + u * m[i] as u64;
            c[i - 1] = (acc & BASE_MASK as u64) as u32;
        }
        c[n - 1] = (acc >> BASE_LEN) as u32;
    }

    /// Demontgomerizes a number: divides by R = (2^24)^n one limb at a time.
    fn mont_mul_one(&self, b: &BigNum) -> BigNum {
        let n = self.get_size();
        let mut c = b.clone_with_size(n);
        for _ in 0..n {
            self.mont_reduce(&mut c);
        }
        self.mont_normalize(&mut c);
        c
    }

    /// Brings a Montgomery intermediate in `0 <= c < 2m` (whose high limb
    /// may hold up to 25 bits) back into canonical range with a masked
    /// conditional subtraction.
    fn mont_normalize(&self, c: &mut BigNum) {
        let m = self.value.limbs();
        let n = m.len();
        let c = c.limbs_mut();
        let mut acc: i64 = 0;
        for i in 0..n {
            acc += c[i] as i64 - m[i] as i64;
            c[i] = (acc & BASE_MASK as i64) as u32;
            acc >>= BASE_LEN;
        }
        let mask = acc >> BASE_LEN;
        let mut acc: i64 = 0;
        for i in 0..n {
            acc += c[i] as i64 + (m[i] as i64 & mask);
            c[i] = (acc & BASE_MASK as i64) as u32;
            acc >>= BASE_LEN;
        }
    }

    /// Computes -m^-1 mod 2^24, one bit at a time.
    fn compute_inverse_modulus(value: &BigNum) -> u32 {
        let mut b: u64 = 1;
        let first = value.limb(0) as u64;
        let mut c: u64 = 1;
        while c < BASE as u64 {
            if b * first & c != 0 {
                b |= c;
            }
            c <<= 1;
        }
        BASE - b as u32
    }

    /// Computes RR = (2^24)^(2n) mod m.
    fn compute_rr(value: &BigNum) -> BigNum {
        let n = value.get_size();
        let mut tmp = BigNum::of_size(2 * n + 1);
        tmp.limbs_mut()[2 * n] = 1;
        tmp.divmod_internal(value).1
    }
}

/// Special-form reduction strategies for `value mod m`.
///
/// A closed set of variants rather than an open interface: each supported
/// modulus shape is one arm, dispatched by construction.
pub enum FastModulus {
    /// Moduli whose 24 high-order bits are all ones (the NIST field primes
    /// and NIST group orders). The first quotient digit of each step is the
    /// leading dividend digit plus one, or one too large; a masked add-back
    /// repairs the overshoot.
    HighOnes {
        modulus: BigNum,
        shifted: BigNum,
        shift: u32,
    },
    /// Moduli whose high bits are a one followed by at least 24 zeros (the
    /// Curve25519/Ed25519 group order, 2^252 + delta).
    PowerOfBase {
        modulus: BigNum,
        shifted: BigNum,
        shift: u32,
    },
    /// The field prime 2^255 - 19: overflow limbs are multiplied by 19 and
    /// folded back down.
    Curve25519Field { modulus: BigNum },
}

impl FastModulus {
    /// Builds the strategy for a modulus whose top 24 bits are all set.
    pub fn high_ones(modulus: &BigNum) -> Result<FastModulus> {
        let n = modulus.bit_length();
        for i in (n - BASE_LEN as usize)..n {
            if !modulus.is_bit_set(i) {
                return Err(Error::InvalidArguments("modulus must start with 0xffffff"));
            }
        }
        let shift = ((n + BASE_LEN as usize - 1) / BASE_LEN as usize * BASE_LEN as usize - n) as u32;
        Ok(FastModulus::HighOnes {
            modulus: modulus.clone(),
            shifted: modulus.shl_small(shift).drop_leading_zeros(),
            shift,
        })
    }

    /// Builds the strategy for a modulus whose leading one is followed by at
    /// least 24 zero bits.
    pub fn power_of_base(modulus: &BigNum) -> Result<FastModulus> {
        let n = modulus.bit_length();
        for i in (n - BASE_LEN as usize - 1)..(n - 1) {
            if modulus.is_bit_set(i) {
                return Err(Error::InvalidArguments(
                    "modulus must start with a one and 24 zeros",
                ));
            }
        }
        // The smallest bit length >= n that is 1 mod 24.
        let expected = (n + BASE_LEN as usize - 2) / BASE_LEN as usize * BASE_LEN as usize + 1;
        let shift = (expected - n) as u32;
        Ok(FastModulus::PowerOfBase {
            modulus: modulus.clone(),
            shifted: modulus.shl_small(shift).drop_leading_zeros(),
            shift,
        })
    }

    /// Builds the folding strategy for the prime 2^255 - 19.
    pub fn curve25519_field(modulus: &BigNum) -> FastModulus {
        debug_assert_eq!(modulus.bit_length(), 255);
        FastModulus::Curve25519Field {
            modulus: modulus.clone(),
        }
    }

    /// Calculates `value mod m` for the fixed modulus.
    pub fn residue(&self, value: &BigNum) -> BigNum {
        match self {
            FastModulus::HighOnes {
                modulus,
                shifted,
                shift,
            } => Self::special_form_residue(value, modulus, shifted, *shift, true),
            FastModulus::PowerOfBase {
                modulus,
                shifted,
                shift,
            } => Self::special_form_residue(value, modulus, shifted, *shift, false),
            FastModulus::Curve25519Field { modulus } => Self::fold_25519(value, modulus),
        }
    }

    /// Shifted trial subtraction for both special forms; only the tentative
    /// quotient rule differs. The overshoot repair is a masked add-back, as
    /// in the general division.
    fn special_form_residue(
        value: &BigNum,
        modulus: &BigNum,
        shifted: &BigNum,
        shift: u32,
        high_ones: bool,
    ) -> BigNum {
        let divisor = shifted;
        let length = divisor.get_size();
        let mut dividend = value.shl_small(shift);
        {
            let limbs = dividend.limbs_mut();
            limbs.push(0);
        }
        let total = dividend.get_size();
        if total > length {
            for delta in (0..total - length).rev() {
                let qhat = if high_ones {
                    // The divisor's leading digit is b - 1, so the dividend's
                    // leading digit plus one is the digit or one too large.
                    (dividend.limb(length + delta) + 1).min(BASE_MASK)
                } else {
                    // The divisor's leading digits are 1, 0: either the top
                    // dividend digit is set (digit must be b - 1) or the
                    // digit below it is the answer or one too large.
                    debug_assert!(
                        dividend.limb(length + delta) == 0
                            || dividend.limb(length + delta - 1) == 0
                    );
                    (dividend.limb(length + delta) as u64 * BASE_MASK as u64
                        + dividend.limb(length + delta - 1) as u64)
                        .min(BASE_MASK as u64) as u32
                };
                let d = dividend.limbs_mut();
                let mut acc: i64 = 0;
                for i in 0..=length {
                    acc += d[i + delta] as i64 - divisor.limb(i) as i64 * qhat as i64;
                    d[i + delta] = (acc & BASE_MASK as i64) as u32;
                    acc = acc >> BASE_LEN;
                }
                debug_assert!(acc == 0 || acc == -1);
                let mask = acc;
                let mut acc: i64 = 0;
                for i in 0..=length {
                    acc += d[i + delta] as i64 + (divisor.limb(i) as i64 & mask);
                    d[i + delta] = (acc & BASE_MASK as i64) as u32;
                    acc >>= BASE_LEN;
                }
            }
        }
        dividend.shr_small(shift).clone_with_size(modulus.get_size())
    }

    /// Residue modulo 2^255 - 19: each limb above bit 255 satisfies
    /// `w * 2^(24i) == 19 * w * 2^(24(i-11)+9)`, so overflow folds back as a
    /// multiply-by-19 and a 9-bit shift, repeated until the value fits.
    fn fold_25519(value: &BigNum, modulus: &BigNum) -> BigNum {
        let mut v: Vec<u32> = value.limbs().to_vec();
        while v.len() > 11 || v.get(10).copied().unwrap_or(0) >= 1 << 15 {
            for i in (11..v.len()).rev() {
                let temp = v[i] as u64 * 19;
                v[i - 11] += ((temp & 0x7FFF) << 9) as u32;
                v[i - 10] += (temp >> 15) as u32;
            }
            v.resize(11, 0);
            // Bits 255.. of the top limb fold to the bottom the same way.
            v[0] += (v[10] >> 15) * 19;
            v[10] &= 0x7FFF;
            let mut u: u64 = 0;
            for limb in v.iter_mut().take(10) {
                u += *limb as u64;
                *limb = (u & BASE_MASK as u64) as u32;
                u >>= BASE_LEN;
            }
            v[10] += u as u32;
            while v.len() > 1 && *v.last().unwrap() == 0 {
                v.pop();
            }
        }
        let mut out = BigNum::from_limbs(v);
        if out.is_greater_or_equal(modulus) {
            // 2^255 - 19 <= out <= 2^255 - 1: subtracting the low limb of
            // the modulus and zeroing the rest is the full subtraction.
            let low = modulus.limb(0);
            let limbs = out.limbs_mut();
            let fixed = limbs[0] - low;
            limbs.clear();
            limbs.push(fixed);
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;

    // The NIST P-256 field prime.
    const P256_Q: [u8; 32] =
        hex!("ffffffff00000001000000000000000000000000ffffffffffffffffffffffff");
    // The NIST P-256 group order.
    const P256_N: [u8; 32] =
        hex!("ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551");
    // 2^255 - 19.
    const ED25519_Q: [u8; 32] =
        hex!("7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffed");
    // The Ed25519 group order, 2^252 + 27742317777372353535851937790883648493.
    const ED25519_N: [u8; 32] =
        hex!("1000000000000000000000000000000014def9dea2f79cd65812631a5cf5d3ed");

    fn big(bytes: &[u8]) -> BigNum {
        BigNum::from_bytes_be(bytes)
    }

    #[test]
    fn modulus_must_be_odd() {
        assert!(Modulus::new(&hex!("10")).is_err());
        assert!(Modulus::new(&hex!("01")).is_err());
        assert!(Modulus::new(&hex!("11")).is_ok());
    }

    #[test]
    fn mod_add_subtract() {
        let m = Modulus::new(&P256_Q).unwrap();
        let a = m.residue(&big(&hex!("deadbeefcafef00d1122334455667788")));
        let b = m.residue(&big(&hex!("0102030405060708090a0b0c0d0e0f10")));
        let sum = m.mod_add(&a, &b);
        assert_eq!(m.mod_subtract(&sum, &b), a.clone_with_size(m.get_size()));
        // Wrap-around: (m - 1) + 2 == 1.
        let m_minus_1 = m.value().sub_unchecked(&BigNum::one());
        assert_eq!(
            m.mod_add(&m_minus_1, &BigNum::two()),
            BigNum::one().clone_with_size(m.get_size())
        );
        assert_eq!(
            m.mod_subtract(&BigNum::zero(), &BigNum::one()),
            m_minus_1.clone_with_size(m.get_size())
        );
    }

    #[test]
    fn montgomery_multiply_matches_division() {
        let m = Modulus::new(&P256_Q).unwrap();
        let a = m.residue(&big(&hex!(
            "0bad5eedc0ffee000102030405060708090a0b0c0d0e0f101112131415161718"
        )));
        let b = m.residue(&big(&hex!(
            "00ffee0099aabbccddeeff0123456789aabbccddeeff001122334455667788aa"
        )));
        let product = m.mod_multiply(&a, &b);
        let expected = a.multiply(&b).divmod(m.value()).unwrap().1;
        assert_eq!(product, expected.clone_with_size(m.get_size()));
    }

    #[test]
    fn mod_power_small_cases() {
        let m = Modulus::new(&hex!("03e9")).unwrap(); // 1001 = 7 * 11 * 13
        let three = big(&hex!("03"));
        // 3^5 = 243.
        assert_eq!(
            m.mod_power(&three, &big(&hex!("05"))),
            big(&hex!("f3")).clone_with_size(m.get_size())
        );
        // x^0 = 1.
        assert_eq!(
            m.mod_power(&three, &BigNum::zero()),
            BigNum::one().clone_with_size(m.get_size())
        );
    }

    #[test]
    fn mod_inverse_round_trip() {
        let m = Modulus::new(&P256_N).unwrap();
        let x = m.residue(&big(&hex!(
            "0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f20"
        )));
        let inv = m.mod_inverse(&x);
        assert_eq!(
            m.mod_multiply(&x, &inv),
            BigNum::one().clone_with_size(m.get_size())
        );
    }

    #[test]
    fn high_ones_residue_matches_division() {
        let m = big(&P256_N);
        let fast = FastModulus::high_ones(&m).unwrap();
        let value = big(&hex!(
            "ffeeddccbbaa99887766554433221100ffeeddccbbaa998877665544332211000123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef"
        ));
        let expected = value.divmod(&m).unwrap().1;
        assert_eq!(fast.residue(&value), expected.clone_with_size(m.get_size()));
    }

    #[test]
    fn high_ones_rejects_wrong_shape() {
        assert!(FastModulus::high_ones(&big(&ED25519_N)).is_err());
    }

    #[test]
    fn power_of_base_residue_matches_division() {
        let m = big(&ED25519_N);
        let fast = FastModulus::power_of_base(&m).unwrap();
        let value = big(&hex!(
            "ffeeddccbbaa99887766554433221100ffeeddccbbaa998877665544332211000123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef"
        ));
        let expected = value.divmod(&m).unwrap().1;
        assert_eq!(fast.residue(&value), expected.clone_with_size(m.get_size()));
        // Values already in range come back unchanged.
        let small = big(&hex!("0102"));
        assert_eq!(fast.residue(&small), small.clone_with_size(m.get_size()));
    }

    #[test]
    fn power_of_base_rejects_wrong_shape() {
        assert!(FastModulus::power_of_base(&big(&P256_N)).is_err());
    }

    #[test]
    fn fold_25519_matches_division() {
        let m = big(&ED25519_Q);
        let fast = FastModulus::curve25519_field(&m);
        let value = big(&hex!(
            "7fcaffffffffffffffffffffffffffffffffffffffffffffffffffffffffffed0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef"
        ));
        let expected = value.divmod(&m).unwrap().1;
        assert_eq!(
            fast.residue(&value).drop_leading_zeros(),
            expected.drop_leading_zeros()
        );
        // The nineteen values in [2^255 - 19, 2^255 - 1] need the final
        // correction step.
        let edge = big(&hex!(
            "7ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff0"
        ));
        let expected = edge.divmod(&m).unwrap().1;
        assert_eq!(
            fast.residue(&edge).drop_leading_zeros(),
            expected.drop_leading_zeros()
        );
    }

    #[test]
    fn attach_fast_modulus_is_write_once() {
        let m = Modulus::new(&P256_N).unwrap();
        m.attach_fast_modulus(FastModulus::high_ones(m.value()).unwrap())
            .unwrap();
        assert!(m
            .attach_fast_modulus(FastModulus::high_ones(m.value()).unwrap())
            .is_err());
        // Residue still agrees with plain division once attached.
        let value = big(&P256_Q).multiply(&big(&hex!("abcdef")));
        assert_eq!(
            m.residue(&value).drop_leading_zeros(),
            value.divmod(m.value()).unwrap().1.drop_leading_zeros()
        );
    }
}
