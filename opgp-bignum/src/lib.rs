//! Arbitrary-precision non-negative integer arithmetic for OpenPGP ECC.
//!
//! Numbers are stored as little-endian sequences of 24-bit limbs. The narrow
//! radix keeps every limb product below 2^48, so schoolbook multiplication
//! and Montgomery reduction never overflow a 64-bit accumulator.
//!
//! These integers carry private scalars, so the comparison, selection, and
//! conditional-subtraction primitives are written without data-dependent
//! branches or early exits. Operations fail only on structurally invalid
//! input (underflow, out-of-range shift), never on the values of the
//! operands being compared.

mod bignum;
mod error;
mod modulus;

pub use crate::{
    bignum::{BigNum, BASE, BASE_LEN, BASE_MASK},
    error::{Error, Result},
    modulus::{FastModulus, Modulus},
};
pub use subtle;
