use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use subtle::Choice;
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// The length in bits of the radix.
pub const BASE_LEN: u32 = 24;

/// Radix used by the limb representation.
pub const BASE: u32 = 1 << BASE_LEN;

/// Bit mask of the radix.
pub const BASE_MASK: u32 = BASE - 1;

/// A non-negative arbitrary-precision integer.
///
/// The value is a little-endian sequence of 24-bit limbs. A number has a
/// declared limb capacity ([`BigNum::get_size`]) distinct from its effective
/// bit length; redundant high zero limbs are legal and deliberate, since
/// fixed sizing is what keeps the constant-time primitives constant-time.
/// Intermediate results keep their leading zeros until
/// [`BigNum::drop_leading_zeros`] is called.
pub struct BigNum {
    limbs: Vec<u32>,
    bit_length: OnceLock<usize>,
}

impl BigNum {
    /// Creates a zero-valued number with a fixed limb capacity.
    pub fn of_size(n: usize) -> BigNum {
        BigNum::from_limbs(vec![0; n])
    }

    /// Creates a number from a little-endian array of 24-bit limbs, the
    /// internal format.
    pub fn from_limbs(limbs: Vec<u32>) -> BigNum {
        debug_assert!(limbs.iter().all(|&w| w <= BASE_MASK));
        BigNum {
            limbs,
            bit_length: OnceLock::new(),
        }
    }

    /// Creates a number from a big-endian byte sequence.
    pub fn from_bytes_be(input: &[u8]) -> BigNum {
        let mut limbs = Vec::with_capacity(input.len() / 3 + 1);
        let mut i = input.len() as isize;
        while i >= 0 {
            let b = |k: isize| -> u32 {
                if k >= 0 && (k as usize) < input.len() {
                    input[k as usize] as u32
                } else {
                    0
                }
            };
            limbs.push(b(i - 1) | (b(i - 2) << 8) | (b(i - 3) << 16));
            i -= 3;
        }
        BigNum::from_limbs(limbs)
    }

    /// Creates a number from an integer in `0..=2^48`.
    ///
    /// The ceiling is the largest value the limb machinery can absorb from a
    /// single native integer without widening.
    pub fn from_u64(value: u64) -> Result<BigNum> {
        if value > 1 << 48 {
            return Err(Error::InvalidArguments("integer out of range"));
        }
        let mut limbs = Vec::new();
        let mut v = value;
        loop {
            limbs.push((v & BASE_MASK as u64) as u32);
            v >>= BASE_LEN;
            if v == 0 {
                break;
            }
        }
        Ok(BigNum::from_limbs(limbs))
    }

    /// Creates a number from a 32-bit integer; the counterpart of
    /// [`BigNum::from_u64`] for values that are in range by construction.
    pub fn from_u32(value: u32) -> BigNum {
        let mut limbs = Vec::new();
        let mut v = value;
        loop {
            limbs.push(v & BASE_MASK);
            v >>= BASE_LEN;
            if v == 0 {
                break;
            }
        }
        BigNum::from_limbs(limbs)
    }

    /// The constant 0.
    pub fn zero() -> BigNum {
        BigNum::from_limbs(vec![0])
    }

    /// The constant 1.
    pub fn one() -> BigNum {
        BigNum::from_limbs(vec![1])
    }

    /// The constant 2.
    pub fn two() -> BigNum {
        BigNum::from_limbs(vec![2])
    }

    /// Selects conditionally, in constant time: returns `a` if `bit` is set,
    /// `b` otherwise. Every limb position up to the longer operand's length
    /// is touched regardless of `bit`.
    pub fn select(a: &BigNum, b: &BigNum, bit: Choice) -> BigNum {
        let mask = (bit.unwrap_u8() as u32).wrapping_neg();
        let max_len = a.limbs.len().max(b.limbs.len());
        let mut ret = BigNum::of_size(max_len);
        for i in 0..max_len {
            ret.limbs[i] = (mask & (a.limb(i) ^ b.limb(i))) ^ b.limb(i);
        }
        ret
    }

    /// The limb at `i`, with positions past the end reading as zero.
    #[inline]
    pub(crate) fn limb(&self, i: usize) -> u32 {
        self.limbs.get(i).copied().unwrap_or(0)
    }

    #[inline]
    pub(crate) fn limbs(&self) -> &[u32] {
        &self.limbs
    }

    #[inline]
    pub(crate) fn limbs_mut(&mut self) -> &mut Vec<u32> {
        self.bit_length = OnceLock::new();
        &mut self.limbs
    }

    /// The declared limb capacity.
    pub fn get_size(&self) -> usize {
        self.limbs.len()
    }

    /// Truncates to `n` limbs. `n` must not exceed the current size, and the
    /// dropped limbs must be redundant zeros for the value to be preserved.
    pub fn set_size(mut self, n: usize) -> BigNum {
        debug_assert!(n <= self.limbs.len(), "wrong size");
        self.limbs.truncate(n);
        self
    }

    /// Returns a copy resized to exactly `n` limbs, zero-padding or
    /// truncating as needed.
    pub fn clone_with_size(&self, n: usize) -> BigNum {
        let mut limbs = vec![0; n];
        for (i, limb) in limbs.iter_mut().enumerate() {
            *limb = self.limb(i);
        }
        BigNum::from_limbs(limbs)
    }

    /// Drops redundant high-order zero limbs, always leaving at least one.
    /// The scan runs over the full length regardless of content.
    pub fn drop_leading_zeros(mut self) -> BigNum {
        let mut j = 0usize;
        let mut z = 0u32;
        for i in (1..self.limbs.len()).rev() {
            z |= self.limbs[i];
            j += ((z == 0) & (self.limbs[i] == 0)) as usize;
        }
        let len = self.limbs.len();
        self.limbs.truncate(len - j);
        self
    }

    /// Converts to big-endian bytes, leading zero bytes stripped. The zero
    /// value encodes as a single `0x00`.
    pub fn to_bytes_be(&self) -> Vec<u8> {
        let mut r = Vec::with_capacity(3 * self.limbs.len());
        for &w in self.limbs.iter().rev() {
            r.push(((w >> 16) & 0xFF) as u8);
            r.push(((w >> 8) & 0xFF) as u8);
            r.push((w & 0xFF) as u8);
        }
        if r.is_empty() {
            return vec![0];
        }
        // Count leading zeros in a full pass.
        let mut n = 0usize;
        let mut z = 0u8;
        for &b in &r {
            z |= b;
            n += ((z == 0) & (b == 0)) as usize;
        }
        if z == 0 {
            n -= 1;
        }
        r.split_off(n)
    }

    /// Converts to a little-endian base-16 representation in which every
    /// digit lies in `[-7, 8]`, the form consumed by windowed scalar
    /// multiplication. Each 24-bit word is biased by 0x777777 as a whole and
    /// then 7 is subtracted from each resulting nybble, propagating the
    /// carry; the final carry (0 or 1) is appended as one extra digit.
    pub fn to_signed_nybbles(&self) -> Vec<i8> {
        let mut result = Vec::with_capacity(self.limbs.len() * 6 + 1);
        let mut carry: u32 = 0;
        for &word in &self.limbs {
            let value = word + carry + 0x777777;
            carry = value >> BASE_LEN;
            let mut offset = 0;
            while offset < BASE_LEN {
                result.push(((value >> offset) & 0xF) as i8 - 7);
                offset += 4;
            }
        }
        result.push(carry as i8);
        result
    }

    /// The length in bits, computed once and cached. The zero value reports
    /// a bit length of 1.
    pub fn bit_length(&self) -> usize {
        *self.bit_length.get_or_init(|| {
            let mut j = 0usize;
            let mut z = 0u32;
            for i in (1..self.limbs.len()).rev() {
                z |= self.limbs[i];
                j += ((z == 0) & (self.limbs[i] == 0)) as usize;
            }
            let len = self.limbs.len() - j;
            let mut nbits = len * BASE_LEN as usize;
            let mut msw = self.limbs[len - 1];
            // [0] and [1] have the same length.
            msw |= (msw == 0) as u32;
            while msw & (BASE >> 1) == 0 {
                msw <<= 1;
                nbits -= 1;
            }
            nbits
        })
    }

    /// Calculates `self + that`.
    pub fn add(&self, that: &BigNum) -> BigNum {
        let max_len = self.limbs.len().max(that.limbs.len());
        let mut sum = BigNum::of_size(max_len + 1);
        let mut accu: u32 = 0;
        for i in 0..max_len {
            accu += self.limb(i) + that.limb(i);
            sum.limbs[i] = accu & BASE_MASK;
            accu >>= BASE_LEN;
        }
        sum.limbs[max_len] = accu;
        sum
    }

    /// Calculates `self - that`; `that` must not exceed `self`.
    pub fn subtract(&self, that: &BigNum) -> Result<BigNum> {
        if !self.is_greater_or_equal(that) {
            return Err(Error::InvalidArguments("cannot subtract a larger number"));
        }
        Ok(self.sub_unchecked(that))
    }

    /// `self - that` without the range check; the caller must guarantee
    /// `self >= that`.
    pub(crate) fn sub_unchecked(&self, that: &BigNum) -> BigNum {
        debug_assert!(self.is_greater_or_equal(that));
        let mut result = self.clone();
        let mut accu: i64 = 0;
        for i in 0..result.limbs.len() {
            accu += result.limbs[i] as i64 - that.limb(i) as i64;
            result.limbs[i] = (accu & BASE_MASK as i64) as u32;
            accu >>= BASE_LEN;
        }
        result.bit_length = OnceLock::new();
        result
    }

    /// Subtracts conditionally, in constant time: returns `self - that` when
    /// `self >= that`, and (a copy of) `self` unchanged otherwise. Both
    /// outcomes perform the identical sequence of limb operations.
    pub fn sub_if_greater_or_equal(&self, that: &BigNum) -> BigNum {
        let max_len = self.limbs.len().max(that.limbs.len());
        let mut result = BigNum::of_size(max_len);
        let mut accu: i64 = 0;
        for i in 0..max_len {
            accu += self.limb(i) as i64 - that.limb(i) as i64;
            result.limbs[i] = (accu & BASE_MASK as i64) as u32;
            accu >>= BASE_LEN;
        }
        // accu is 0 when the subtraction held, -1 when it underflowed; in
        // the latter case add `that` back under the mask.
        let mask = accu;
        let mut accu: i64 = 0;
        for i in 0..max_len {
            accu += result.limbs[i] as i64 + (that.limb(i) as i64 & mask);
            result.limbs[i] = (accu & BASE_MASK as i64) as u32;
            accu >>= BASE_LEN;
        }
        result
    }

    /// Calculates `self * that`.
    pub fn multiply(&self, that: &BigNum) -> BigNum {
        let this_len = self.limbs.len();
        let that_len = that.limbs.len();
        let mut product = BigNum::of_size(this_len + that_len);
        for i in 0..this_len {
            let mut u: u64 = 0;
            for j in 0..that_len {
                let accu =
                    product.limbs[i + j] as u64 + self.limbs[i] as u64 * that.limbs[j] as u64 + u;
                u = accu >> BASE_LEN;
                product.limbs[i + j] = (accu & BASE_MASK as u64) as u32;
            }
            product.limbs[i + that_len] = u as u32;
        }
        product
    }

    /// Calculates `self * self`, exploiting the symmetry of the cross terms.
    pub fn square(&self) -> BigNum {
        let m = self.limbs.len();
        let mut product = BigNum::of_size(2 * m);
        for i in 0..m {
            let accu = product.limbs[i + i] as u64 + self.limbs[i] as u64 * self.limbs[i] as u64;
            let mut u = accu >> BASE_LEN;
            product.limbs[i + i] = (accu & BASE_MASK as u64) as u32;
            for j in (i + 1)..m {
                let accu =
                    product.limbs[i + j] as u64 + 2 * self.limbs[i] as u64 * self.limbs[j] as u64 + u;
                u = accu >> BASE_LEN;
                product.limbs[i + j] = (accu & BASE_MASK as u64) as u32;
            }
            product.limbs[i + m] = u as u32;
        }
        product
    }

    /// Calculates `self % that`.
    pub fn modulo(&self, that: &BigNum) -> Result<BigNum> {
        Ok(self.divmod(that)?.1)
    }

    /// Calculates `self / that`.
    pub fn div(&self, that: &BigNum) -> Result<BigNum> {
        Ok(self.divmod(that)?.0)
    }

    /// Calculates the quotient and remainder of `self / that` with a
    /// normalized long division (Knuth Algorithm D). The per-digit quotient
    /// correction is applied by masked add-back rather than a branch.
    pub fn divmod(&self, that: &BigNum) -> Result<(BigNum, BigNum)> {
        if that.compare_value(&BigNum::zero()) == Ordering::Equal {
            return Err(Error::InvalidArguments("division by zero"));
        }
        Ok(self.divmod_internal(that))
    }

    pub(crate) fn divmod_internal(&self, that: &BigNum) -> (BigNum, BigNum) {
        let bit_length = that.bit_length();
        // Divisor length without padding.
        let length = (bit_length + BASE_LEN as usize - 1) / BASE_LEN as usize;
        let shift = (length * BASE_LEN as usize - bit_length) as u32;
        // Shift the divisor so that its high bit is set, and the dividend by
        // the same amount.
        let divisor = that.shl_small(shift).drop_leading_zeros();
        let mut dividend = self.shl_small(shift);
        let mut quotient = BigNum::of_size(dividend.limbs.len() + 1);
        dividend.limbs.push(0);

        let total = dividend.limbs.len();
        if total > length {
            for delta in (0..total - length).rev() {
                // INVARIANT: dividend / (divisor * b^delta) < b, b = 2^24.
                // q is either the correct digit or one too large.
                let q = Self::calculate_quotient(&dividend, &divisor, delta);
                let mut accu: i64 = 0;
                quotient.limbs[delta] = q;
                for i in 0..=length {
                    accu += dividend.limbs[i + delta] as i64 - divisor.limb(i) as i64 * q as i64;
                    dividend.limbs[i + delta] = (accu & BASE_MASK as i64) as u32;
                    accu = accu >> BASE_LEN;
                }
                debug_assert!(accu == 0 || accu == -1);
                // If the subtraction went negative q was one too large; add
                // divisor * b^delta back and fix the digit, both under mask.
                let mask = accu;
                let mut accu: i64 = 0;
                quotient.limbs[delta] = (quotient.limbs[delta] as i64 + mask) as u32 & BASE_MASK;
                for i in 0..=length {
                    accu += dividend.limbs[i + delta] as i64 + (divisor.limb(i) as i64 & mask);
                    dividend.limbs[i + delta] = (accu & BASE_MASK as i64) as u32;
                    accu >>= BASE_LEN;
                }
                debug_assert_eq!(dividend.limbs[delta + length], 0);
            }
        }
        let remainder = dividend.shr_small(shift).clone_with_size(length);
        (quotient.drop_leading_zeros(), remainder)
    }

    /// Computes the tentative quotient digit for
    /// `dividend / (divisor << (24 * delta))`; the result is the correct
    /// digit or one larger (HAC 14.20 / Knuth D3, collapsed so that only
    /// the qhat-vs-qtilde distinction is made).
    fn calculate_quotient(dividend: &BigNum, divisor: &BigNum, delta: usize) -> u32 {
        let length = divisor.limbs.len();
        debug_assert!(dividend.limbs[length + delta] <= divisor.limbs[length - 1]);
        let numerator = dividend.limbs[length + delta] as u64 * BASE as u64
            + dividend.limbs[length + delta - 1] as u64;
        let denominator = divisor.limbs[length - 1] as u64;
        let qhat = numerator / denominator;
        let rhat = numerator - qhat * denominator;
        let v0 = if length >= 2 { divisor.limbs[length - 2] } else { 0 } as u64;
        let s0 = if length + delta >= 2 {
            dividend.limb(length + delta - 2)
        } else {
            0
        } as u64;
        let decrement1 = (qhat == BASE as u64) as u64;
        let decrement2 = (qhat * v0 > rhat * BASE as u64 + s0) as u64;
        (qhat - (decrement1 | decrement2)) as u32
    }

    /// Divides by a single-limb divisor.
    pub fn divmod_limb(&self, divisor: u32) -> Result<(BigNum, u32)> {
        if divisor == 0 || divisor >= BASE {
            return Err(Error::InvalidArguments("divisor out of range"));
        }
        let mut quotient = self.clone_with_size(self.limbs.len());
        let mut remainder: u64 = 0;
        for i in (0..quotient.limbs.len()).rev() {
            let tmp = remainder * BASE as u64 + quotient.limbs[i] as u64;
            quotient.limbs[i] = (tmp / divisor as u64) as u32;
            remainder = tmp % divisor as u64;
        }
        Ok((quotient, remainder as u32))
    }

    /// Returns true if `a < self < b`.
    pub fn is_between(&self, a: &BigNum, b: &BigNum) -> bool {
        self.compare_value(a) == Ordering::Greater && self.compare_value(b) == Ordering::Less
    }

    /// Returns true if `self == that`.
    pub fn is_equal(&self, that: &BigNum) -> bool {
        self.compare_value(that) == Ordering::Equal
    }

    /// Returns true if `self < that`.
    pub fn is_less(&self, that: &BigNum) -> bool {
        self.compare_value(that) == Ordering::Less
    }

    /// Returns true if `self >= that`.
    pub fn is_greater_or_equal(&self, that: &BigNum) -> bool {
        self.compare_value(that) != Ordering::Less
    }

    /// Compares two numbers with a branch-minimal scan from the most
    /// significant limb down; the running time does not depend on where the
    /// operands first differ.
    pub fn compare_value(&self, that: &BigNum) -> Ordering {
        let max_len = self.limbs.len().max(that.limbs.len());
        let mut greater = 0u32;
        let mut lesser = 0u32;
        let mut previous_lesser = 0u32;
        let mut previous_greater = 0u32;
        for i in (0..max_len).rev() {
            let x = self.limb(i);
            let y = that.limb(i);
            let lt = (x < y) as u32;
            let gt = (x > y) as u32;
            previous_lesser |= lt;
            greater |= gt & (previous_lesser ^ 1);
            previous_greater |= gt;
            lesser |= lt & (previous_greater ^ 1);
        }
        (greater as i32 - lesser as i32).cmp(&0)
    }

    /// Bitwise AND over the longer operand's length.
    pub fn and(&self, that: &BigNum) -> BigNum {
        self.bitwise(that, |x, y| x & y)
    }

    /// Bitwise OR over the longer operand's length.
    pub fn or(&self, that: &BigNum) -> BigNum {
        self.bitwise(that, |x, y| x | y)
    }

    /// Bitwise XOR over the longer operand's length.
    pub fn xor(&self, that: &BigNum) -> BigNum {
        self.bitwise(that, |x, y| x ^ y)
    }

    fn bitwise(&self, that: &BigNum, op: fn(u32, u32) -> u32) -> BigNum {
        let max_len = self.limbs.len().max(that.limbs.len());
        let mut result = BigNum::of_size(max_len);
        for i in 0..max_len {
            result.limbs[i] = op(self.limb(i), that.limb(i));
        }
        result
    }

    /// Two's-complement negation bounded to the current width.
    pub fn negate(&self) -> BigNum {
        let length = self.limbs.len();
        let mut result = BigNum::of_size(length);
        for i in 0..length {
            result.limbs[i] = !self.limbs[i] & BASE_MASK;
        }
        result.add(&BigNum::one())
    }

    /// Calculates `self << shift` for `shift` in `0..=23`. Wider shifts must
    /// be composed from limb-sized steps.
    pub fn shift_left(&self, shift: u32) -> Result<BigNum> {
        if shift > BASE_LEN - 1 {
            return Err(Error::InvalidArguments("illegal shift value"));
        }
        Ok(self.shl_small(shift).drop_leading_zeros())
    }

    /// Calculates `self >> shift` for `shift` in `0..=23`.
    pub fn shift_right(&self, shift: u32) -> Result<BigNum> {
        if shift > BASE_LEN - 1 {
            return Err(Error::InvalidArguments("illegal shift value"));
        }
        Ok(self.shr_small(shift))
    }

    /// `self << shift` without the range check; `shift` must be below the
    /// limb width. For callers whose shift amount is a constant.
    pub fn shift_left_unchecked(&self, shift: u32) -> BigNum {
        self.shl_small(shift)
    }

    /// `self >> shift` without the range check; `shift` must be below the
    /// limb width.
    pub fn shift_right_unchecked(&self, shift: u32) -> BigNum {
        self.shr_small(shift)
    }

    pub(crate) fn shl_small(&self, shift: u32) -> BigNum {
        debug_assert!(shift < BASE_LEN);
        let length = self.limbs.len();
        let mut result = BigNum::of_size(length + 1);
        let mask = (1u32 << shift) - 1;
        let xmask = (1u32 << (BASE_LEN - shift)) - 1;
        let mut carry = 0u32;
        for i in 0..length {
            // Mask before shifting so the intermediate stays inside 32 bits.
            result.limbs[i] = ((self.limbs[i] & xmask) << shift) + carry;
            carry = (self.limbs[i] >> (BASE_LEN - shift)) & mask;
        }
        result.limbs[length] = carry;
        result
    }

    pub(crate) fn shr_small(&self, shift: u32) -> BigNum {
        debug_assert!(shift < BASE_LEN);
        let length = self.limbs.len();
        let mut result = BigNum::of_size(length);
        let mask = (1u32 << shift) - 1;
        let mut carry = 0u32;
        for i in (0..length).rev() {
            result.limbs[i] = carry + (self.limbs[i] >> shift);
            carry = (self.limbs[i] & mask) << (BASE_LEN - shift);
        }
        result
    }

    /// Returns true if bit `n` of the little-endian representation is set;
    /// bits past the end read as clear.
    pub fn is_bit_set(&self, n: usize) -> bool {
        let i = n / BASE_LEN as usize;
        let j = n % BASE_LEN as usize;
        self.limb(i) & (1 << j) != 0
    }

    /// Returns true if the value is even.
    pub fn is_even(&self) -> bool {
        self.limb(0) & 1 == 0
    }

    /// Returns true if the value is odd.
    pub fn is_odd(&self) -> bool {
        self.limb(0) & 1 != 0
    }

    /// Replaces `self` with `other` when `choice` is set, touching every
    /// limb either way. The operands must have the same capacity.
    pub fn conditional_assign(&mut self, other: &BigNum, choice: Choice) {
        debug_assert_eq!(self.limbs.len(), other.limbs.len());
        let mask = (choice.unwrap_u8() as u32).wrapping_neg();
        for i in 0..self.limbs.len() {
            let tmp = mask & (self.limbs[i] ^ other.limb(i));
            self.limbs[i] ^= tmp;
        }
        self.bit_length = OnceLock::new();
    }

    /// Swaps two numbers when `choice` is set, in constant time. The
    /// operands must have the same capacity.
    pub fn conditional_swap(a: &mut BigNum, b: &mut BigNum, choice: Choice) {
        debug_assert_eq!(a.limbs.len(), b.limbs.len());
        let mask = (choice.unwrap_u8() as u32).wrapping_neg();
        for i in 0..a.limbs.len() {
            let tmp = mask & (a.limbs[i] ^ b.limbs[i]);
            a.limbs[i] ^= tmp;
            b.limbs[i] ^= tmp;
        }
        a.bit_length = OnceLock::new();
        b.bit_length = OnceLock::new();
    }

    /// ORs `other`'s limbs into `self` under a mask derived from `choice`.
    /// This is the constant-time table-scan accumulator: calling it once per
    /// table row with exactly one set `choice` assembles the selected entry
    /// while touching every row identically.
    pub fn or_masked(&mut self, other: &BigNum, choice: Choice) {
        let mask = (choice.unwrap_u8() as u32).wrapping_neg();
        for i in 0..self.limbs.len() {
            self.limbs[i] |= other.limb(i) & mask;
        }
        self.bit_length = OnceLock::new();
    }
}

impl Clone for BigNum {
    fn clone(&self) -> BigNum {
        BigNum::from_limbs(self.limbs.clone())
    }
}

impl PartialEq for BigNum {
    fn eq(&self, other: &BigNum) -> bool {
        self.is_equal(other)
    }
}

impl Eq for BigNum {}

impl fmt::Debug for BigNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BigNum(0x")?;
        for b in self.to_bytes_be() {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}

impl Zeroize for BigNum {
    fn zeroize(&mut self) {
        self.limbs.zeroize();
        self.bit_length = OnceLock::new();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;

    fn n(bytes: &[u8]) -> BigNum {
        BigNum::from_bytes_be(bytes)
    }

    #[test]
    fn bytes_round_trip() {
        let bytes = hex!("02ffee0099aabbccddeeff0123456789");
        assert_eq!(n(&bytes).to_bytes_be(), bytes);
    }

    #[test]
    fn bytes_round_trip_strips_leading_zeros() {
        let bytes = hex!("000000fe0099aabbccddeeff01234567");
        assert_eq!(n(&bytes).to_bytes_be(), bytes[3..]);
    }

    #[test]
    fn zero_encodes_as_one_byte() {
        assert_eq!(BigNum::zero().to_bytes_be(), [0]);
        assert_eq!(n(&[0, 0, 0, 0]).to_bytes_be(), [0]);
    }

    #[test]
    fn from_u64_rejects_out_of_range() {
        assert!(BigNum::from_u64(1 << 48).is_ok());
        assert!(BigNum::from_u64((1 << 48) + 1).is_err());
    }

    #[test]
    fn add_subtract_identity() {
        let a = n(&hex!("f2340aa1bbccdd0099aabbccddeeff0123456789"));
        let b = n(&hex!("00ffee0099aabbccddeeff01234567"));
        let sum = a.add(&b);
        assert_eq!(sum.subtract(&b).unwrap(), a);
        assert_eq!(sum.subtract(&a).unwrap().drop_leading_zeros(), b.drop_leading_zeros());
    }

    #[test]
    fn subtract_underflow_is_an_error() {
        let a = n(&hex!("0102"));
        let b = n(&hex!("0103"));
        assert!(a.subtract(&b).is_err());
        assert!(b.subtract(&a).is_ok());
    }

    #[test]
    fn sub_if_greater_or_equal_is_total() {
        let a = n(&hex!("0102"));
        let b = n(&hex!("0103"));
        assert_eq!(a.sub_if_greater_or_equal(&b), a);
        assert_eq!(b.sub_if_greater_or_equal(&a), BigNum::one());
        assert_eq!(a.sub_if_greater_or_equal(&a), BigNum::zero());
    }

    #[test]
    fn multiply_by_one() {
        let a = n(&hex!("deadbeefcafef00d0102030405060708"));
        assert_eq!(a.multiply(&BigNum::one()), a);
        assert_eq!(BigNum::one().multiply(&a), a);
    }

    #[test]
    fn multiply_matches_square() {
        let a = n(&hex!("0badc0ffee0ddf00deadbeefcafe1234567890"));
        assert_eq!(a.multiply(&a), a.square());
    }

    #[test]
    fn known_product() {
        // 0xffffffffffffffff * 0xffffffffffffffff
        let a = n(&hex!("ffffffffffffffff"));
        let expected = n(&hex!("fffffffffffffffe0000000000000001"));
        assert_eq!(a.square(), expected);
    }

    #[test]
    fn divmod_identity() {
        let a = n(&hex!("f234bbccdd0099aabbccddeeff0123456789aabbccddee"));
        let b = n(&hex!("0099aabbccddeeff01234567"));
        let (q, r) = a.divmod(&b).unwrap();
        assert!(r.is_less(&b));
        assert_eq!(q.multiply(&b).add(&r), a);
    }

    #[test]
    fn divmod_small_dividend() {
        let a = n(&hex!("05"));
        let b = n(&hex!("0099aabbccddeeff01234567"));
        let (q, r) = a.divmod(&b).unwrap();
        assert_eq!(q, BigNum::zero());
        assert_eq!(r, a);
    }

    #[test]
    fn divmod_by_zero_is_an_error() {
        assert!(n(&hex!("05")).divmod(&BigNum::zero()).is_err());
    }

    #[test]
    fn divmod_limb_matches_divmod() {
        let a = n(&hex!("f234bbccdd0099aabbccddeeff01234567"));
        let (q, r) = a.divmod_limb(1000).unwrap();
        let (q2, r2) = a.divmod(&BigNum::from_u64(1000).unwrap()).unwrap();
        assert_eq!(q.drop_leading_zeros(), q2);
        assert_eq!(BigNum::from_u64(r as u64).unwrap(), r2.drop_leading_zeros());
    }

    #[test]
    fn select_truth_table() {
        let a = n(&hex!("0102030405"));
        let b = n(&hex!("060708090a0b0c"));
        assert_eq!(BigNum::select(&a, &b, Choice::from(1)), a);
        assert_eq!(BigNum::select(&a, &b, Choice::from(0)), b);
        assert_eq!(BigNum::select(&b, &a, Choice::from(1)), b);
        assert_eq!(BigNum::select(&b, &a, Choice::from(0)), a);
    }

    #[test]
    fn compare_ignores_capacity() {
        let a = n(&hex!("0102"));
        let padded = a.clone_with_size(10);
        assert_eq!(a.compare_value(&padded), Ordering::Equal);
        assert_eq!(padded.compare_value(&a), Ordering::Equal);
        assert_eq!(a.compare_value(&n(&hex!("0103"))), Ordering::Less);
        assert_eq!(n(&hex!("ff0102")).compare_value(&a), Ordering::Greater);
    }

    #[test]
    fn is_between_bounds_are_exclusive() {
        let two = BigNum::two();
        assert!(two.is_between(&BigNum::one(), &n(&hex!("03"))));
        assert!(!two.is_between(&BigNum::two(), &n(&hex!("03"))));
        assert!(!two.is_between(&BigNum::one(), &BigNum::two()));
    }

    #[test]
    fn shifts() {
        let a = n(&hex!("0123456789abcdef"));
        let doubled = a.shift_left(1).unwrap();
        assert_eq!(doubled, a.add(&a).drop_leading_zeros());
        assert_eq!(doubled.shift_right(1).unwrap().drop_leading_zeros(), a);
        assert!(a.shift_left(24).is_err());
        assert!(a.shift_right(24).is_err());
        assert_eq!(a.shift_left(0).unwrap(), a);
    }

    #[test]
    fn bit_length() {
        assert_eq!(BigNum::zero().bit_length(), 1);
        assert_eq!(BigNum::one().bit_length(), 1);
        assert_eq!(BigNum::two().bit_length(), 2);
        assert_eq!(n(&hex!("80")).bit_length(), 8);
        assert_eq!(n(&hex!("0100")).bit_length(), 9);
        assert_eq!(n(&hex!("00000100")).bit_length(), 9);
    }

    #[test]
    fn bit_set_parity() {
        let a = n(&hex!("05"));
        assert!(a.is_bit_set(0));
        assert!(!a.is_bit_set(1));
        assert!(a.is_bit_set(2));
        assert!(!a.is_bit_set(1000));
        assert!(a.is_odd());
        assert!(!a.is_even());
        assert!(n(&hex!("04")).is_even());
    }

    #[test]
    fn signed_nybbles_reconstruct_value() {
        let a = n(&hex!("f234bbccdd0099aabbccddeeff0123456789"));
        let nybbles = a.to_signed_nybbles();
        // value = sum(nybbles[i] * 16^i), rebuilt high to low as v*16 + d.
        let sixteen = BigNum::from_u64(16).unwrap();
        let mut acc = BigNum::zero();
        for &d in nybbles.iter().rev() {
            acc = acc.multiply(&sixteen);
            if d >= 0 {
                acc = acc.add(&BigNum::from_u64(d as u64).unwrap());
            } else {
                acc = acc.subtract(&BigNum::from_u64((-d) as u64).unwrap()).unwrap();
            }
            acc = acc.drop_leading_zeros();
        }
        assert_eq!(acc, a);
        assert!(nybbles.iter().all(|&d| (-7..=8).contains(&d)));
    }

    #[test]
    fn negate_is_twos_complement() {
        let a = n(&hex!("000001"));
        let width = a.get_size() * BASE_LEN as usize;
        // -1 mod 2^width == 2^width - 1.
        let negated = a.negate();
        for i in 0..width {
            assert!(negated.is_bit_set(i), "bit {} clear", i);
        }
    }

    #[test]
    fn bitwise_ops() {
        let a = n(&hex!("0f0f0f"));
        let b = n(&hex!("3355ff"));
        assert_eq!(a.and(&b), n(&hex!("03050f")));
        assert_eq!(a.or(&b), n(&hex!("3f5fff")));
        assert_eq!(a.xor(&b), n(&hex!("3c5af0")));
    }

    #[test]
    fn conditional_swap() {
        let a0 = n(&hex!("010203")).clone_with_size(2);
        let b0 = n(&hex!("aabbccddeeff")).clone_with_size(2);
        let (mut a, mut b) = (a0.clone(), b0.clone());
        BigNum::conditional_swap(&mut a, &mut b, Choice::from(0));
        assert_eq!((&a, &b), (&a0, &b0));
        BigNum::conditional_swap(&mut a, &mut b, Choice::from(1));
        assert_eq!((&a, &b), (&b0, &a0));
    }

    #[test]
    fn from_u32_matches_from_u64() {
        for v in [0u32, 1, 0xFFFFFF, 0x1000000, u32::MAX] {
            assert_eq!(BigNum::from_u32(v), BigNum::from_u64(v as u64).unwrap());
        }
    }

    #[test]
    fn conditional_assign_and_or_masked() {
        let a = n(&hex!("010203")).clone_with_size(2);
        let b = n(&hex!("aabbccddeeff")).clone_with_size(2);
        let mut x = a.clone();
        x.conditional_assign(&b, Choice::from(0));
        assert_eq!(x, a);
        x.conditional_assign(&b, Choice::from(1));
        assert_eq!(x, b);

        let mut acc = BigNum::of_size(2);
        acc.or_masked(&a, Choice::from(0));
        assert_eq!(acc, BigNum::zero());
        acc.or_masked(&b, Choice::from(1));
        assert_eq!(acc, b);
    }
}
