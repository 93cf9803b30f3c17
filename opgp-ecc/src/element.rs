use std::sync::Arc;

use opgp_bignum::{BigNum, Modulus};
use subtle::Choice;
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// An element of a prime field.
///
/// The value is always reduced and always sized to the modulus limb count,
/// so that the masked-limb primitives below touch the same number of words
/// no matter which element they are given.
#[derive(Clone)]
pub struct Element {
    q: Arc<Modulus>,
    x: BigNum,
}

impl Element {
    /// Wraps a value as a field element. The value must be smaller than the
    /// modulus.
    pub fn new(q: Arc<Modulus>, x: BigNum) -> Result<Element> {
        if x.is_greater_or_equal(q.value()) {
            return Err(Error::InvalidArguments(
                "field element must be smaller than the modulus",
            ));
        }
        Ok(Element::reduced(q, x))
    }

    /// Wraps a value known to be reduced.
    pub(crate) fn reduced(q: Arc<Modulus>, x: BigNum) -> Element {
        debug_assert!(x.is_less(q.value()));
        let x = x.clone_with_size(q.get_size());
        Element { q, x }
    }

    /// Wraps an arbitrary value, reducing it first.
    pub(crate) fn from_residue(q: Arc<Modulus>, x: &BigNum) -> Element {
        let x = q.residue(x);
        Element::reduced(q, x)
    }

    /// The element for a small integer, reduced into the field.
    pub(crate) fn from_integer(q: Arc<Modulus>, value: u32) -> Element {
        Element::from_residue(q, &BigNum::from_u32(value))
    }

    /// The field modulus.
    pub fn modulus(&self) -> &Arc<Modulus> {
        &self.q
    }

    /// The element's value.
    pub fn to_bignum(&self) -> &BigNum {
        &self.x
    }

    /// `self + that`.
    pub fn add(&self, that: &Element) -> Element {
        debug_assert!(self.same_field(that));
        Element {
            q: self.q.clone(),
            x: self.q.mod_add(&self.x, &that.x),
        }
    }

    /// `self - that`.
    pub fn subtract(&self, that: &Element) -> Element {
        debug_assert!(self.same_field(that));
        Element {
            q: self.q.clone(),
            x: self.q.mod_subtract(&self.x, &that.x),
        }
    }

    /// `self * that`.
    pub fn multiply(&self, that: &Element) -> Element {
        debug_assert!(self.same_field(that));
        Element {
            q: self.q.clone(),
            x: self.q.mod_multiply(&self.x, &that.x),
        }
    }

    /// `self * self`.
    pub fn square(&self) -> Element {
        Element {
            q: self.q.clone(),
            x: self.q.mod_multiply(&self.x, &self.x),
        }
    }

    /// `self ^ power`.
    pub fn power(&self, power: &BigNum) -> Element {
        Element {
            q: self.q.clone(),
            x: self.q.mod_power(&self.x, power),
        }
    }

    /// The multiplicative inverse; the modulus must be prime. The inverse of
    /// zero is zero.
    pub fn inverse(&self) -> Element {
        Element {
            q: self.q.clone(),
            x: self.q.mod_inverse(&self.x),
        }
    }

    /// The additive inverse.
    pub fn negate(&self) -> Element {
        Element {
            q: self.q.clone(),
            x: self.q.mod_subtract(&BigNum::zero().clone_with_size(self.q.get_size()), &self.x),
        }
    }

    /// `self * 2^n`.
    pub fn shift_left(&self, n: u32) -> Element {
        let mut a = self.x.clone();
        for _ in 0..n {
            a = self.q.mod_add(&a, &a);
        }
        Element {
            q: self.q.clone(),
            x: a,
        }
    }

    /// `self / 2^n`: repeated exact halving, adding the (odd) modulus when
    /// the intermediate is odd.
    pub fn shift_right(&self, n: u32) -> Element {
        let mut a = self.x.clone();
        for _ in 0..n {
            if a.is_odd() {
                a = a.add(self.q.value());
            }
            a = a.shift_right_unchecked(1);
        }
        Element {
            q: self.q.clone(),
            x: a.clone_with_size(self.q.get_size()),
        }
    }

    /// Returns true if both elements hold the same value in the same field.
    pub fn is_equal(&self, that: &Element) -> bool {
        self.x.is_equal(&that.x) && self.q.value().is_equal(that.q.value())
    }

    /// Returns true if the element is zero.
    pub fn is_zero(&self) -> bool {
        self.x.is_equal(&BigNum::zero())
    }

    /// Replaces the value with `other`'s when `choice` is set, touching
    /// every limb either way.
    pub fn conditional_assign(&mut self, other: &Element, choice: Choice) {
        self.x.conditional_assign(&other.x, choice);
    }

    /// Swaps two elements when `choice` is set, in constant time.
    pub fn conditional_swap(a: &mut Element, b: &mut Element, choice: Choice) {
        BigNum::conditional_swap(&mut a.x, &mut b.x, choice);
    }

    /// Selects `a` when `bit` is set, `b` otherwise, in constant time.
    pub fn select(a: &Element, b: &Element, bit: Choice) -> Element {
        debug_assert!(a.same_field(b));
        Element {
            q: a.q.clone(),
            x: BigNum::select(&a.x, &b.x, bit),
        }
    }

    /// ORs `other`'s limbs into this element under a mask; the table-scan
    /// accumulator.
    pub(crate) fn or_masked(&mut self, other: &Element, choice: Choice) {
        self.x.or_masked(&other.x, choice);
    }

    fn same_field(&self, that: &Element) -> bool {
        Arc::ptr_eq(&self.q, &that.q) || self.q.value().is_equal(that.q.value())
    }
}

impl Zeroize for Element {
    fn zeroize(&mut self) {
        self.x.zeroize();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;

    fn field() -> Arc<Modulus> {
        // The P-256 field prime.
        Arc::new(
            Modulus::new(&hex!(
                "ffffffff00000001000000000000000000000000ffffffffffffffffffffffff"
            ))
            .unwrap(),
        )
    }

    fn elem(q: &Arc<Modulus>, v: u32) -> Element {
        Element::from_integer(q.clone(), v)
    }

    #[test]
    fn rejects_unreduced_values() {
        let q = field();
        assert!(Element::new(q.clone(), q.value().clone()).is_err());
        assert!(Element::new(q.clone(), BigNum::one()).is_ok());
    }

    #[test]
    fn field_arithmetic() {
        let q = field();
        let a = elem(&q, 1234567);
        let b = elem(&q, 89);
        assert!(a.add(&b).is_equal(&elem(&q, 1234656)));
        assert!(a.subtract(&b).is_equal(&elem(&q, 1234478)));
        assert!(b.square().is_equal(&elem(&q, 7921)));
        assert!(a.subtract(&a).is_zero());
        // a - b == -(b - a)
        assert!(a.subtract(&b).is_equal(&b.subtract(&a).negate()));
    }

    #[test]
    fn inverse_round_trip() {
        let q = field();
        let a = elem(&q, 1234567);
        assert!(a.multiply(&a.inverse()).is_equal(&elem(&q, 1)));
        assert!(elem(&q, 0).inverse().is_zero());
    }

    #[test]
    fn power_matches_repeated_multiplication() {
        let q = field();
        let a = elem(&q, 7);
        let mut expected = elem(&q, 1);
        for _ in 0..11 {
            expected = expected.multiply(&a);
        }
        assert!(a.power(&BigNum::from_u32(11)).is_equal(&expected));
    }

    #[test]
    fn shifts_are_exact() {
        let q = field();
        let a = elem(&q, 1234567);
        assert!(a.shift_left(3).is_equal(&elem(&q, 1234567 * 8)));
        assert!(a.shift_left(3).shift_right(3).is_equal(&a));
        // Halving an odd element still round-trips.
        let odd = elem(&q, 3);
        assert!(odd.shift_right(1).shift_left(1).is_equal(&odd));
    }

    #[test]
    fn constant_time_helpers() {
        let q = field();
        let a = elem(&q, 111);
        let b = elem(&q, 222);
        assert!(Element::select(&a, &b, Choice::from(1)).is_equal(&a));
        assert!(Element::select(&a, &b, Choice::from(0)).is_equal(&b));
        let (mut x, mut y) = (a.clone(), b.clone());
        Element::conditional_swap(&mut x, &mut y, Choice::from(1));
        assert!(x.is_equal(&b) && y.is_equal(&a));
        x.conditional_assign(&y, Choice::from(1));
        assert!(x.is_equal(&a));
    }
}
