//! Elliptic-curve arithmetic for an OpenPGP core.
//!
//! Three point families share nothing but a data shape, so each gets its
//! own module rather than a common trait: short-Weierstrass Jacobian
//! arithmetic for the NIST prime curves ([`nist`]), an x-only Montgomery
//! ladder for Curve25519 ([`montgomery`]), and extended twisted-Edwards
//! arithmetic for Ed25519 ([`edwards`]). [`domain`] binds each curve's
//! constants, base point, and subgroup order together and implements key
//! generation and ECDH on top; [`ecdsa`] and [`eddsa`] implement the
//! signature schemes.
//!
//! Scalar multiplication is constant-time throughout: signed-nybble
//! windows with masked table scans on the NIST and Edwards paths, a
//! conditionally-swapped ladder on the Montgomery path. Point addition of
//! *public* points (`add`) is allowed to branch; anything driven by a
//! secret scalar is not.

mod constants;
mod domain;
mod ecdh;
mod ecdsa;
mod eddsa;
mod edwards;
mod element;
mod error;
mod montgomery;
mod nist;

pub use crate::{
    domain::{DomainParams, KeyPair, PrimeCurve},
    ecdh::Ecdh,
    ecdsa::{Ecdsa, Signature},
    eddsa::Eddsa,
    edwards::{EdwardsCurve, EdwardsPoint, NielsPoint},
    element::Element,
    error::{Error, Result},
    montgomery::{MontgomeryCurve, MontgomeryPoint},
    nist::{NistCurve, NistPoint},
};
