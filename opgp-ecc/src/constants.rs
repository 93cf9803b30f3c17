//! Domain constants for the supported curves.
//!
//! NIST values are from SP 800-186 (and the original NSA routines
//! document); the 25519 values are from RFC 7748. Base points for the NIST
//! curves are stored in their uncompressed wire encoding and decoded (and
//! thereby curve-checked) at domain construction.

use hex_literal::hex;

/// NIST P-256 field prime.
pub(crate) const P256_Q: [u8; 32] =
    hex!("ffffffff00000001000000000000000000000000ffffffffffffffffffffffff");

/// NIST P-256 curve coefficient B.
pub(crate) const P256_B: [u8; 32] =
    hex!("5ac635d8aa3a93e7b3ebbd55769886bc651d06b0cc53b0f63bce3c3e27d2604b");

/// NIST P-256 base point, uncompressed.
pub(crate) const P256_G: [u8; 65] = hex!(
    "046b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296"
    "4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5"
);

/// NIST P-256 group order.
pub(crate) const P256_N: [u8; 32] =
    hex!("ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551");

/// NIST P-384 field prime.
pub(crate) const P384_Q: [u8; 48] = hex!(
    "fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffe"
    "ffffffff0000000000000000ffffffff"
);

/// NIST P-384 curve coefficient B.
pub(crate) const P384_B: [u8; 48] = hex!(
    "b3312fa7e23ee7e4988e056be3f82d19181d9c6efe8141120314088f5013875a"
    "c656398d8a2ed19d2a85c8edd3ec2aef"
);

/// NIST P-384 base point, uncompressed.
pub(crate) const P384_G: [u8; 97] = hex!(
    "04aa87ca22be8b05378eb1c71ef320ad746e1d3b628ba79b9859f741e082542a38"
    "5502f25dbf55296c3a545e3872760ab73617de4a96262c6f5d9e98bf9292dc29"
    "f8f41dbd289a147ce9da3113b5f0b8c00a60b1ce1d7e819d7a431d7c90ea0e5f"
);

/// NIST P-384 group order.
pub(crate) const P384_N: [u8; 48] = hex!(
    "ffffffffffffffffffffffffffffffffffffffffffffffffc7634d81f4372ddf"
    "581a0db248b0a77aecec196accc52973"
);

/// NIST P-521 field prime, 2^521 - 1.
pub(crate) const P521_Q: [u8; 66] = hex!(
    "01ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
    "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
    "ffff"
);

/// NIST P-521 curve coefficient B.
pub(crate) const P521_B: [u8; 66] = hex!(
    "0051953eb9618e1c9a1f929a21a0b68540eea2da725b99b315f3b8b489918ef1"
    "09e156193951ec7e937b1652c0bd3bb1bf073573df883d2c34f1ef451fd46b50"
    "3f00"
);

/// NIST P-521 base point, uncompressed.
pub(crate) const P521_G: [u8; 133] = hex!(
    "0400c6858e06b70404e9cd9e3ecb662395b4429c648139053fb521f828af606b"
    "4d3dbaa14b5e77efe75928fe1dc127a2ffa8de3348b3c1856a429bf97e7e31c2"
    "e5bd66011839296a789a3bc0045c8a5fb42c7d1bd998f54449579b446817afbd"
    "17273e662c97ee72995ef42640c550b9013fad0761353c7086a272c24088be94"
    "769fd16650"
);

/// NIST P-521 group order.
pub(crate) const P521_N: [u8; 66] = hex!(
    "01ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
    "fffa51868783bf2f966b7fcc0148f709a5d03bb5c9b8899c47aebb6fb71e9138"
    "6409"
);

/// The 25519 field prime, 2^255 - 19. Shared by Curve25519 and Ed25519.
pub(crate) const CURVE25519_Q: [u8; 32] =
    hex!("7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffed");

/// The order of the 25519 base-point subgroup,
/// 2^252 + 27742317777372353535851937790883648493.
pub(crate) const CURVE25519_N: [u8; 32] =
    hex!("1000000000000000000000000000000014def9dea2f79cd65812631a5cf5d3ed");
