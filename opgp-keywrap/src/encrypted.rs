//! The encrypted-key-material wrapper: an asymmetric cipher or signer whose
//! private half is held encrypted at rest and must be unlocked (RFC 4880
//! section 5.5.3 string-to-key usage) before private operations work.

use opgp_ecc::{Ecdh, Ecdsa, Eddsa, PrimeCurve, Signature};
use rand_core::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::mpi::Mpi;
use crate::s2k::{HashAlgorithm, S2k};
use crate::symmetric::SymmetricAlgorithm;

/// Public-key algorithms by their OpenPGP identifiers (RFC 4880 section
/// 9.1); the identifier picks the private-key MPI layout.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CipherAlgorithm {
    Rsa,
    RsaEncrypt,
    RsaSign,
    Elgamal,
    Dsa,
    Ecdh,
    Ecdsa,
    Eddsa,
}

impl CipherAlgorithm {
    /// The RFC 4880 algorithm octet.
    pub fn id(&self) -> u8 {
        match self {
            CipherAlgorithm::Rsa => 1,
            CipherAlgorithm::RsaEncrypt => 2,
            CipherAlgorithm::RsaSign => 3,
            CipherAlgorithm::Elgamal => 16,
            CipherAlgorithm::Dsa => 17,
            CipherAlgorithm::Ecdh => 18,
            CipherAlgorithm::Ecdsa => 19,
            CipherAlgorithm::Eddsa => 22,
        }
    }

    /// Looks an algorithm up by its octet.
    pub fn from_id(id: u8) -> Result<CipherAlgorithm> {
        match id {
            1 => Ok(CipherAlgorithm::Rsa),
            2 => Ok(CipherAlgorithm::RsaEncrypt),
            3 => Ok(CipherAlgorithm::RsaSign),
            16 => Ok(CipherAlgorithm::Elgamal),
            17 => Ok(CipherAlgorithm::Dsa),
            18 => Ok(CipherAlgorithm::Ecdh),
            19 => Ok(CipherAlgorithm::Ecdsa),
            22 => Ok(CipherAlgorithm::Eddsa),
            _ => Err(Error::Parse("unknown public-key algorithm")),
        }
    }
}

/// The string-to-key usage octet of a secret-key packet (RFC 4880 section
/// 5.5.3), which selects both the key derivation and the trailer that
/// verifies the unwrap.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyDerivationType {
    /// 0: the key material is stored in the clear, two-byte checksum
    /// appended.
    Plaintext,
    /// 1: legacy; the symmetric key is the raw MD5 of the passphrase,
    /// two-byte checksum appended.
    Md5,
    /// 254: S2K derivation with a 20-byte SHA-1 trailer. Preferred; the
    /// additive checksum misses most bit flips, the digest does not.
    S2kSha1,
    /// 255: S2K derivation with the two-byte additive checksum.
    S2kChecksum,
}

impl KeyDerivationType {
    /// The usage octet.
    pub fn id(&self) -> u8 {
        match self {
            KeyDerivationType::Plaintext => 0,
            KeyDerivationType::Md5 => 1,
            KeyDerivationType::S2kSha1 => 254,
            KeyDerivationType::S2kChecksum => 255,
        }
    }

    /// Looks a derivation type up by its usage octet.
    pub fn from_id(id: u8) -> Result<KeyDerivationType> {
        match id {
            0 => Ok(KeyDerivationType::Plaintext),
            1 => Ok(KeyDerivationType::Md5),
            254 => Ok(KeyDerivationType::S2kSha1),
            255 => Ok(KeyDerivationType::S2kChecksum),
            _ => Err(Error::Parse("invalid key derivation type")),
        }
    }
}

/// The algorithm-specific private-key fields recovered from (or wrapped
/// into) the key material, as MPI sequences.
///
/// The RSA, DSA, and ElGamal layouts are parsed and re-serialized so such
/// packets survive a lock/unlock round trip, but no arithmetic for them
/// lives in this repository.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PrivateKeyMaterial {
    Rsa { d: Mpi, p: Mpi, q: Mpi, u: Mpi },
    Dsa { x: Mpi },
    Elgamal { x: Mpi },
    Ec { scalar: Mpi },
}

impl PrivateKeyMaterial {
    /// Parses the material for the given algorithm from decrypted key
    /// bytes.
    pub fn parse(algorithm: CipherAlgorithm, bytes: &[u8]) -> Result<PrivateKeyMaterial> {
        let mut reader = bytes;
        let material = match algorithm {
            CipherAlgorithm::Rsa | CipherAlgorithm::RsaEncrypt | CipherAlgorithm::RsaSign => {
                PrivateKeyMaterial::Rsa {
                    d: Mpi::parse(&mut reader)?,
                    p: Mpi::parse(&mut reader)?,
                    q: Mpi::parse(&mut reader)?,
                    u: Mpi::parse(&mut reader)?,
                }
            }
            CipherAlgorithm::Dsa => PrivateKeyMaterial::Dsa {
                x: Mpi::parse(&mut reader)?,
            },
            CipherAlgorithm::Elgamal => PrivateKeyMaterial::Elgamal {
                x: Mpi::parse(&mut reader)?,
            },
            CipherAlgorithm::Ecdh | CipherAlgorithm::Ecdsa | CipherAlgorithm::Eddsa => {
                PrivateKeyMaterial::Ec {
                    scalar: Mpi::parse(&mut reader)?,
                }
            }
        };
        Ok(material)
    }

    /// Serializes the material back to key bytes (without the checksum
    /// trailer).
    pub fn serialize(&self) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(Vec::new());
        match self {
            PrivateKeyMaterial::Rsa { d, p, q, u } => {
                for mpi in [d, p, q, u] {
                    out.extend_from_slice(&mpi.serialize());
                }
            }
            PrivateKeyMaterial::Dsa { x } | PrivateKeyMaterial::Elgamal { x } => {
                out.extend_from_slice(&x.serialize());
            }
            PrivateKeyMaterial::Ec { scalar } => {
                out.extend_from_slice(&scalar.serialize());
            }
        }
        out
    }
}

/// The cipher or signer wrapped by an [`EncryptedCipher`]: it always holds
/// the public key, and receives the private material on unlock.
///
/// The RNG arguments carry no cryptographic marker at this boundary; the
/// [`EncryptedCipher`] methods that supply them require `CryptoRng`.
pub trait WrappedCipher {
    /// The wrapped algorithm, which fixes the private-key MPI layout.
    fn algorithm(&self) -> CipherAlgorithm;
    /// Returns true once private material has been installed.
    fn has_private_key(&self) -> bool;
    /// Installs private material recovered by an unlock.
    fn install_private_key(&mut self, material: &PrivateKeyMaterial) -> Result<()>;
    /// Signs with the private key.
    fn sign(&self, rng: &mut dyn RngCore, data: &[u8]) -> Result<Vec<u8>>;
    /// Verifies with the public key.
    fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool>;
    /// Encrypts with the public key.
    fn encrypt(&self, rng: &mut dyn RngCore, data: &[u8]) -> Result<Vec<u8>>;
    /// Decrypts with the private key.
    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Restores the `CryptoRng` marker stripped at the `WrappedCipher`
/// boundary; only constructed from rngs that carried it.
struct TrustedRng<'a>(&'a mut dyn RngCore);

impl RngCore for TrustedRng<'_> {
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> core::result::Result<(), rand_core::Error> {
        self.0.try_fill_bytes(dest)
    }
}

impl CryptoRng for TrustedRng<'_> {}

/// The two-byte additive checksum of RFC 4880 section 5.5.3: the sum of all
/// key-material octets mod 65536.
pub fn numeric_checksum(data: &[u8]) -> [u8; 2] {
    let mut sum: u32 = 0;
    for &b in data {
        sum = (sum + b as u32) & 0xFFFF;
    }
    [(sum >> 8) as u8, sum as u8]
}

/// The encoded iteration count used when re-locking with a passphrase.
pub const DEFAULT_COUNT: u8 = 96;

/// The symmetric algorithm used when re-locking with a passphrase.
pub const DEFAULT_CIPHER: SymmetricAlgorithm = SymmetricAlgorithm::Aes256;

/// An asymmetric cipher whose private key material is protected at rest.
///
/// Sign and decrypt require an unlock; verify and encrypt only need the
/// public half and work in either state. Re-locking with a passphrase
/// always upgrades the wrapping to S2K-SHA1 + AES-256 with a fresh salt and
/// IV, whatever scheme the material arrived under.
///
/// Passphrase acquisition is the caller's asynchronous boundary: every
/// method here takes the passphrase synchronously and never blocks on user
/// input.
pub struct EncryptedCipher<C: WrappedCipher> {
    locked: bool,
    key_derivation: KeyDerivationType,
    s2k: Option<S2k>,
    iv: Option<Vec<u8>>,
    symmetric_algorithm: Option<SymmetricAlgorithm>,
    encrypted_key_data: Vec<u8>,
    key_bytes: Option<Zeroizing<Vec<u8>>>,
    cipher: C,
}

impl<C: WrappedCipher> EncryptedCipher<C> {
    /// Wraps serialized (possibly encrypted) key material. The metadata
    /// must match the derivation type: the S2K types require an S2K
    /// specifier, and everything non-plaintext requires an IV and a
    /// symmetric algorithm.
    pub fn new(
        encrypted_key_data: Vec<u8>,
        key_derivation: KeyDerivationType,
        cipher: C,
        symmetric_algorithm: Option<SymmetricAlgorithm>,
        iv: Option<Vec<u8>>,
        s2k: Option<S2k>,
    ) -> Result<EncryptedCipher<C>> {
        match key_derivation {
            KeyDerivationType::S2kSha1 | KeyDerivationType::S2kChecksum => {
                if s2k.is_none() {
                    return Err(Error::InvalidArguments("invalid S2K in encrypted cipher"));
                }
                if iv.is_none() || symmetric_algorithm.is_none() {
                    return Err(Error::InvalidArguments("invalid IV for encrypted cipher"));
                }
            }
            KeyDerivationType::Md5 => {
                if iv.is_none() || symmetric_algorithm.is_none() {
                    return Err(Error::InvalidArguments("invalid IV for encrypted cipher"));
                }
            }
            KeyDerivationType::Plaintext => {}
        }
        Ok(EncryptedCipher {
            locked: true,
            key_derivation,
            s2k,
            iv,
            symmetric_algorithm,
            encrypted_key_data,
            key_bytes: None,
            cipher,
        })
    }

    /// Wraps freshly generated material in the clear and unlocks it, ready
    /// for use or for locking under a passphrase.
    pub fn from_unlocked(cipher: C, material: &PrivateKeyMaterial) -> Result<EncryptedCipher<C>> {
        let key_bytes = material.serialize();
        let mut data = key_bytes.to_vec();
        data.extend_from_slice(&numeric_checksum(&key_bytes));
        let mut wrapped = EncryptedCipher::new(
            data,
            KeyDerivationType::Plaintext,
            cipher,
            None,
            None,
            None,
        )?;
        wrapped.unlock_key(None)?;
        Ok(wrapped)
    }

    /// The current derivation type.
    pub fn key_derivation_type(&self) -> KeyDerivationType {
        self.key_derivation
    }

    /// The key-wrap IV, when the material is encrypted.
    pub fn key_derivation_iv(&self) -> Option<&[u8]> {
        self.iv.as_deref()
    }

    /// The key-wrap symmetric algorithm, when the material is encrypted.
    pub fn key_derivation_algorithm(&self) -> Option<SymmetricAlgorithm> {
        self.symmetric_algorithm
    }

    /// The S2K specifier, when one is in use.
    pub fn key_derivation_s2k(&self) -> Option<&S2k> {
        self.s2k.as_ref()
    }

    /// The wrapped (possibly encrypted) key material as currently stored.
    pub fn encrypted_key_data(&self) -> &[u8] {
        &self.encrypted_key_data
    }

    /// Returns true while private operations are unavailable.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// The wrapped cipher's public surface.
    pub fn cipher(&self) -> &C {
        &self.cipher
    }

    /// Unlocks the key material. A no-op when already unlocked. Plaintext
    /// material is checksum-verified directly; anything else derives the
    /// symmetric key (S2K, or raw MD5 of the passphrase for the legacy
    /// type), CFB-decrypts, and verifies the trailer for its derivation
    /// type. A trailer mismatch reports [`Error::WrongPassphrase`] and
    /// leaves the state locked.
    pub fn unlock_key(&mut self, passphrase: Option<&[u8]>) -> Result<()> {
        if !self.locked {
            return Ok(());
        }
        if self.key_derivation == KeyDerivationType::Plaintext {
            let data = Zeroizing::new(self.encrypted_key_data.clone());
            return self.verify_and_install(&data);
        }
        let symmetric = self
            .symmetric_algorithm
            .ok_or(Error::Decrypt("missing encrypted key metadata"))?;
        let iv = self
            .iv
            .clone()
            .ok_or(Error::Decrypt("missing encrypted key metadata"))?;
        let key: Zeroizing<Vec<u8>> = match self.key_derivation {
            KeyDerivationType::S2kSha1 | KeyDerivationType::S2kChecksum => {
                let passphrase = passphrase.ok_or(Error::MissingPassphrase)?;
                let s2k = self
                    .s2k
                    .as_ref()
                    .ok_or(Error::Decrypt("missing encrypted key metadata"))?;
                s2k.produce_key(passphrase, symmetric.key_size())
            }
            KeyDerivationType::Md5 => {
                // No S2K: the key is simply the MD5 of the passphrase.
                let passphrase = passphrase.ok_or(Error::MissingPassphrase)?;
                Zeroizing::new(HashAlgorithm::Md5.digest(passphrase))
            }
            _ => return Err(Error::InvalidArguments("invalid key derivation type")),
        };
        let decrypted = Zeroizing::new(symmetric.cfb_decrypt(
            &key,
            &iv,
            &self.encrypted_key_data,
        )?);
        self.verify_and_install(&decrypted)
    }

    /// Verifies the trailer for the current derivation type, parses the
    /// recovered MPIs into the wrapped cipher, and transitions to unlocked.
    fn verify_and_install(&mut self, data: &[u8]) -> Result<()> {
        let trailer_len = match self.key_derivation {
            KeyDerivationType::S2kSha1 => 20,
            _ => 2,
        };
        if data.len() < trailer_len {
            return Err(Error::WrongPassphrase);
        }
        let (key, trailer) = data.split_at(data.len() - trailer_len);
        let expected: Vec<u8> = match self.key_derivation {
            KeyDerivationType::S2kSha1 => HashAlgorithm::Sha1.digest(key),
            _ => numeric_checksum(key).to_vec(),
        };
        if !bool::from(trailer.ct_eq(&expected)) {
            // Corrupt data and a wrong passphrase are indistinguishable by
            // design.
            return Err(Error::WrongPassphrase);
        }
        let material = PrivateKeyMaterial::parse(self.cipher.algorithm(), key)?;
        self.cipher.install_private_key(&material)?;
        self.locked = false;
        self.key_bytes = Some(Zeroizing::new(key.to_vec()));
        Ok(())
    }

    /// Re-wraps the currently decrypted key material and locks the cipher.
    /// Defined only as a snapshot of unlocked material: locking a locked
    /// key fails. Without a passphrase the material is stored in the clear
    /// with a checksum; with one, the wrapping is always upgraded to
    /// S2K-SHA1 + AES-256 with a fresh salt and IV.
    pub fn lock_key(
        &mut self,
        rng: &mut (impl RngCore + CryptoRng),
        passphrase: Option<&[u8]>,
    ) -> Result<()> {
        if self.locked {
            return Err(Error::LockedKey(self.cipher.algorithm()));
        }
        let key_bytes = self
            .key_bytes
            .take()
            .ok_or(Error::InvalidArguments("no decrypted key material"))?;
        match passphrase {
            None => {
                self.key_derivation = KeyDerivationType::Plaintext;
                self.iv = None;
                self.symmetric_algorithm = None;
                self.s2k = None;
                let mut data = key_bytes.to_vec();
                data.extend_from_slice(&numeric_checksum(&key_bytes));
                self.encrypted_key_data = data;
            }
            Some(passphrase) => {
                self.key_derivation = KeyDerivationType::S2kSha1;
                self.symmetric_algorithm = Some(DEFAULT_CIPHER);
                let mut salt = [0u8; 8];
                rng.fill_bytes(&mut salt);
                let mut iv = vec![0u8; DEFAULT_CIPHER.block_size()];
                rng.fill_bytes(&mut iv);
                let s2k = S2k::Iterated {
                    hash: HashAlgorithm::Sha1,
                    salt,
                    encoded_count: DEFAULT_COUNT,
                };
                let key = s2k.produce_key(passphrase, DEFAULT_CIPHER.key_size());
                let mut plain = Zeroizing::new(key_bytes.to_vec());
                plain.extend_from_slice(&HashAlgorithm::Sha1.digest(&key_bytes));
                self.encrypted_key_data = DEFAULT_CIPHER.cfb_encrypt(&key, &iv, &plain)?;
                self.iv = Some(iv);
                self.s2k = Some(s2k);
            }
        }
        self.locked = true;
        Ok(())
    }

    /// Signs with the wrapped key; fails with [`Error::LockedKey`] while
    /// locked.
    pub fn sign(&self, rng: &mut (impl RngCore + CryptoRng), data: &[u8]) -> Result<Vec<u8>> {
        if self.locked {
            return Err(Error::LockedKey(self.cipher.algorithm()));
        }
        self.cipher.sign(&mut TrustedRng(rng), data)
    }

    /// Decrypts with the wrapped key; fails with [`Error::LockedKey`] while
    /// locked.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if self.locked {
            return Err(Error::LockedKey(self.cipher.algorithm()));
        }
        self.cipher.decrypt(data)
    }

    /// Verifies with the public half; available regardless of lock state.
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool> {
        self.cipher.verify(data, signature)
    }

    /// Encrypts with the public half; available regardless of lock state.
    pub fn encrypt(&self, rng: &mut (impl RngCore + CryptoRng), data: &[u8]) -> Result<Vec<u8>> {
        self.cipher.encrypt(&mut TrustedRng(rng), data)
    }
}

/// An ECDSA signer/verifier as a wrappable cipher. Signatures are two MPIs,
/// r then s.
pub struct EcdsaCipher {
    ecdsa: Ecdsa,
}

impl EcdsaCipher {
    /// A verifier for an existing public key.
    pub fn new(curve: PrimeCurve, public_key: &[u8]) -> Result<EcdsaCipher> {
        Ok(EcdsaCipher {
            ecdsa: Ecdsa::from_public_key(curve, public_key)?,
        })
    }

    /// Generates a fresh signing key.
    pub fn generate(
        curve: PrimeCurve,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<EcdsaCipher> {
        Ok(EcdsaCipher {
            ecdsa: Ecdsa::generate(curve, rng)?,
        })
    }

    /// The public key bytes.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.ecdsa.public_key_bytes()
    }

    /// The private material for wrapping, when present.
    pub fn private_key_material(&self) -> Result<PrivateKeyMaterial> {
        let bytes = self
            .ecdsa
            .private_key_bytes()
            .ok_or(Error::InvalidArguments("no private key"))?;
        Ok(PrivateKeyMaterial::Ec {
            scalar: Mpi::new(&bytes),
        })
    }
}

impl WrappedCipher for EcdsaCipher {
    fn algorithm(&self) -> CipherAlgorithm {
        CipherAlgorithm::Ecdsa
    }

    fn has_private_key(&self) -> bool {
        self.ecdsa.has_private_key()
    }

    fn install_private_key(&mut self, material: &PrivateKeyMaterial) -> Result<()> {
        match material {
            PrivateKeyMaterial::Ec { scalar } => {
                self.ecdsa.set_private_key(scalar.to_bignum())?;
                Ok(())
            }
            _ => Err(Error::InvalidArguments("wrong key material for ECDSA")),
        }
    }

    fn sign(&self, rng: &mut dyn RngCore, data: &[u8]) -> Result<Vec<u8>> {
        let sig = self.ecdsa.sign(data, &mut TrustedRng(rng))?;
        let mut out = Mpi::new(&sig.r).serialize();
        out.extend_from_slice(&Mpi::new(&sig.s).serialize());
        Ok(out)
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool> {
        let mut reader = signature;
        let r = Mpi::parse(&mut reader)?;
        let s = Mpi::parse(&mut reader)?;
        Ok(self.ecdsa.verify(
            data,
            &Signature {
                r: r.as_bytes().to_vec(),
                s: s.as_bytes().to_vec(),
            },
        ))
    }

    fn encrypt(&self, _rng: &mut dyn RngCore, _data: &[u8]) -> Result<Vec<u8>> {
        Err(Error::Unsupported("ECDSA cannot encrypt"))
    }

    fn decrypt(&self, _data: &[u8]) -> Result<Vec<u8>> {
        Err(Error::Unsupported("ECDSA cannot decrypt"))
    }
}

/// An ECDH key-agreement key as a wrappable cipher. `decrypt` takes a peer
/// (ephemeral) public key in wire encoding and returns the raw shared
/// secret; the session-key KDF and key wrapping above it belong to the
/// packet layer.
pub struct EcdhCipher {
    ecdh: Ecdh,
    public_key: Vec<u8>,
    private_key: Option<Zeroizing<Vec<u8>>>,
}

impl EcdhCipher {
    /// A cipher for an existing public key.
    pub fn new(curve: PrimeCurve, public_key: &[u8]) -> Result<EcdhCipher> {
        Ok(EcdhCipher {
            ecdh: Ecdh::new(curve)?,
            public_key: public_key.to_vec(),
            private_key: None,
        })
    }

    /// Generates a fresh key pair.
    pub fn generate(
        curve: PrimeCurve,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<EcdhCipher> {
        let ecdh = Ecdh::new(curve)?;
        let pair = ecdh.generate_key_pair(rng, None)?;
        Ok(EcdhCipher {
            ecdh,
            public_key: pair.public_key,
            private_key: Some(pair.private_key),
        })
    }

    /// The public key bytes.
    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public_key
    }

    /// The private material for wrapping, when present.
    pub fn private_key_material(&self) -> Result<PrivateKeyMaterial> {
        let bytes = self
            .private_key
            .as_ref()
            .ok_or(Error::InvalidArguments("no private key"))?;
        Ok(PrivateKeyMaterial::Ec {
            scalar: Mpi::new(bytes),
        })
    }

    fn field_size(&self) -> usize {
        (self.ecdh.params().key_size_in_bits() + 7) / 8
    }
}

impl WrappedCipher for EcdhCipher {
    fn algorithm(&self) -> CipherAlgorithm {
        CipherAlgorithm::Ecdh
    }

    fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    fn install_private_key(&mut self, material: &PrivateKeyMaterial) -> Result<()> {
        match material {
            PrivateKeyMaterial::Ec { scalar } => {
                // The MPI form strips leading zeros; 25519 keys are raw
                // fixed-width strings and need them back.
                let bytes = match self.ecdh.params().curve_name() {
                    PrimeCurve::Curve25519 => scalar.to_padded_bytes(self.field_size()),
                    _ => Zeroizing::new(scalar.as_bytes().to_vec()),
                };
                self.private_key = Some(bytes);
                Ok(())
            }
            _ => Err(Error::InvalidArguments("wrong key material for ECDH")),
        }
    }

    fn sign(&self, _rng: &mut dyn RngCore, _data: &[u8]) -> Result<Vec<u8>> {
        Err(Error::Unsupported("ECDH cannot sign"))
    }

    fn verify(&self, _data: &[u8], _signature: &[u8]) -> Result<bool> {
        Err(Error::Unsupported("ECDH cannot verify"))
    }

    fn encrypt(&self, _rng: &mut dyn RngCore, _data: &[u8]) -> Result<Vec<u8>> {
        Err(Error::Unsupported(
            "ECDH encryption belongs to the packet layer",
        ))
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let private = self
            .private_key
            .as_ref()
            .ok_or(Error::InvalidArguments("no private key"))?;
        Ok(self.ecdh.shared_secret(data, private)?)
    }
}

/// An Ed25519 signer/verifier as a wrappable cipher. The wrapped private
/// material is the 32-byte seed.
pub struct EddsaCipher {
    eddsa: Eddsa,
}

impl EddsaCipher {
    /// A verifier for an existing 32-byte public key.
    pub fn new(public_key: &[u8]) -> Result<EddsaCipher> {
        Ok(EddsaCipher {
            eddsa: Eddsa::from_public_key(public_key)?,
        })
    }

    /// A signer from a 32-byte seed.
    pub fn from_seed(seed: &[u8]) -> Result<EddsaCipher> {
        Ok(EddsaCipher {
            eddsa: Eddsa::from_seed(seed)?,
        })
    }

    /// Generates a fresh signing key.
    pub fn generate(rng: &mut (impl RngCore + CryptoRng)) -> Result<EddsaCipher> {
        let mut seed = Zeroizing::new([0u8; 32]);
        rng.fill_bytes(&mut *seed);
        EddsaCipher::from_seed(&*seed)
    }

    /// The 32-byte public key.
    pub fn public_key_bytes(&self) -> &[u8] {
        self.eddsa.public_key_bytes()
    }

    /// The private material for wrapping: the seed as an MPI.
    pub fn private_key_material(seed: &[u8]) -> PrivateKeyMaterial {
        PrivateKeyMaterial::Ec {
            scalar: Mpi::new(seed),
        }
    }
}

impl WrappedCipher for EddsaCipher {
    fn algorithm(&self) -> CipherAlgorithm {
        CipherAlgorithm::Eddsa
    }

    fn has_private_key(&self) -> bool {
        self.eddsa.has_private_key()
    }

    fn install_private_key(&mut self, material: &PrivateKeyMaterial) -> Result<()> {
        match material {
            PrivateKeyMaterial::Ec { scalar } => {
                let seed = scalar.to_padded_bytes(32);
                self.eddsa.set_private_seed(&seed)?;
                Ok(())
            }
            _ => Err(Error::InvalidArguments("wrong key material for EdDSA")),
        }
    }

    fn sign(&self, _rng: &mut dyn RngCore, data: &[u8]) -> Result<Vec<u8>> {
        Ok(self.eddsa.sign(data)?)
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool> {
        Ok(self.eddsa.verify(data, signature))
    }

    fn encrypt(&self, _rng: &mut dyn RngCore, _data: &[u8]) -> Result<Vec<u8>> {
        Err(Error::Unsupported("EdDSA cannot encrypt"))
    }

    fn decrypt(&self, _data: &[u8]) -> Result<Vec<u8>> {
        Err(Error::Unsupported("EdDSA cannot decrypt"))
    }
}
