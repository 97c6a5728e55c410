//! Key packets.

use std::fmt;

use crate::crypto::hash::{self, Hash};
use crate::crypto::mpi::{PublicParams, SecretParams};
use crate::crypto::s2k::S2K;
use crate::crypto::symmetric::Cfb;
use crate::crypto::Password;
use crate::types::{HashAlgorithm, PublicKeyAlgorithm, SymmetricAlgorithm};
use crate::Error;
use crate::Fingerprint;
use crate::KeyID;
use crate::Packet;
use crate::Result;

/// Holds a public key or public subkey packet.
///
/// See [Section 5.5.2 of RFC 4880].  Whether a key is a primary key or
/// a subkey is a property of the packet tag, not of the body; the same
/// type serves both.
///
///   [Section 5.5.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.5.2
#[derive(PartialEq, Eq, Hash, Clone)]
pub struct Key {
    version: u8,
    /// When the key was created, seconds since the epoch.
    creation_time: u32,
    /// v3 keys: validity period in days, 0 meaning forever.
    days_valid: u16,
    pk_algo: PublicKeyAlgorithm,
    mpis: PublicParams,
}

impl Key {
    /// Creates a v4 key packet.
    pub fn new(creation_time: u32, pk_algo: PublicKeyAlgorithm,
               mpis: PublicParams) -> Self {
        Key {
            version: 4,
            creation_time,
            days_valid: 0,
            pk_algo,
            mpis,
        }
    }

    pub(crate) fn from_parts(version: u8, creation_time: u32,
                             days_valid: u16, pk_algo: PublicKeyAlgorithm,
                             mpis: PublicParams) -> Self {
        Key { version, creation_time, days_valid, pk_algo, mpis }
    }

    /// Returns the version of the key packet.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Returns the key's creation time, seconds since the epoch.
    pub fn creation_time(&self) -> u32 {
        self.creation_time
    }

    /// Returns the v3 validity period in days; 0 means the key does
    /// not expire.
    pub fn days_valid(&self) -> u16 {
        self.days_valid
    }

    /// Returns the public key algorithm.
    pub fn pk_algo(&self) -> PublicKeyAlgorithm {
        self.pk_algo
    }

    /// Returns the public key parameters.
    pub fn mpis(&self) -> &PublicParams {
        &self.mpis
    }

    /// The length of the public key packet body in octets.
    pub(crate) fn body_len(&self) -> usize {
        match self.version {
            3 => 1 + 4 + 2 + 1 + self.mpis.serialized_len(),
            _ => 1 + 4 + 1 + self.mpis.serialized_len(),
        }
    }

    /// Computes the key's v4 fingerprint.
    ///
    /// v3 keys have no 20-octet fingerprint; identifying them is the
    /// key ID's job.
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        if self.version != 4 {
            return Err(Error::InvalidOperation(
                format!("no v4 fingerprint for a v{} key", self.version))
                       .into());
        }

        let mut ctx = HashAlgorithm::SHA1.context()?;
        self.hash(&mut ctx);
        let mut digest = [0u8; 20];
        ctx.digest(&mut digest);
        Ok(Fingerprint::from_bytes(digest))
    }

    /// Computes the key's key ID.
    ///
    /// For v4 keys this is the low 8 octets of the fingerprint; for v3
    /// RSA keys, the low 8 octets of the modulus.
    pub fn keyid(&self) -> Result<KeyID> {
        if self.version == 4 {
            return Ok(self.fingerprint()?.keyid());
        }

        match &self.mpis {
            PublicParams::RSA { n, .. } => {
                let n = n.value();
                if n.len() < 8 {
                    return Err(Error::InvalidKey(
                        "v3 RSA modulus too short".into()).into());
                }
                let mut id = [0u8; 8];
                id.copy_from_slice(&n[n.len() - 8..]);
                Ok(KeyID::from_bytes(id))
            }
            _ => Err(Error::InvalidKey(
                "v3 keys must use RSA".into()).into()),
        }
    }
}

impl Hash for Key {
    /// Updates the hash with the fingerprint framing of the key: a
    /// `0x99` octet, the 16-bit body length, and the body.
    fn hash(&self, hash: &mut hash::Context) {
        let len = self.body_len();

        let mut header: Vec<u8> = Vec::with_capacity(9);
        header.push(0x99);
        header.push(((len >> 8) & 0xff) as u8);
        header.push((len & 0xff) as u8);

        header.push(self.version);
        header.extend_from_slice(&self.creation_time.to_be_bytes());
        if self.version == 3 {
            header.extend_from_slice(&self.days_valid.to_be_bytes());
        }
        header.push(self.pk_algo.into());

        hash.update(&header);
        self.mpis.hash(hash);
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Key")
            .field("version", &self.version)
            .field("creation_time", &self.creation_time)
            .field("pk_algo", &self.pk_algo)
            .field("mpis", &self.mpis)
            .finish()
    }
}

impl From<Key> for Packet {
    fn from(p: Key) -> Self {
        Packet::PublicKey(p)
    }
}

/// The secret material of a secret key packet.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
#[non_exhaustive]
pub enum SecretKeyMaterial {
    /// Unprotected secret parameters (S2K usage 0).
    ///
    /// The 16-bit additive checksum has been verified during parsing.
    Unencrypted {
        /// The secret parameters.
        mpis: SecretParams,
    },

    /// Passphrase-protected secret parameters (S2K usage 254/255).
    Encrypted {
        /// The raw S2K usage octet.
        s2k_usage: u8,
        /// Cipher protecting the parameters.
        algo: SymmetricAlgorithm,
        /// How the passphrase becomes the cipher key.
        s2k: S2K,
        /// CFB initialization vector.
        iv: Vec<u8>,
        /// The encrypted parameters plus their checksum.
        ciphertext: Vec<u8>,
    },

    /// Secret material in a form this crate does not understand.
    ///
    /// Kept unparsed; re-serialization reproduces it byte for byte.
    Unknown {
        /// The raw S2K usage octet.
        s2k_usage: u8,
        /// Everything after the usage octet.
        rest: Vec<u8>,
    },
}

/// Holds a secret key or secret subkey packet.
///
/// A secret key packet is the corresponding public key packet plus the
/// (possibly passphrase-protected) secret parameters (see [Section
/// 5.5.3 of RFC 4880]).
///
///   [Section 5.5.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.5.3
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct SecretKey {
    public: Key,
    secret: SecretKeyMaterial,
}

impl SecretKey {
    /// Creates a secret key packet with unprotected secret material.
    pub fn new(public: Key, mpis: SecretParams) -> Self {
        SecretKey {
            public,
            secret: SecretKeyMaterial::Unencrypted { mpis },
        }
    }

    pub(crate) fn from_parts(public: Key, secret: SecretKeyMaterial)
                             -> Self {
        SecretKey { public, secret }
    }

    /// Returns the public part.
    pub fn public(&self) -> &Key {
        &self.public
    }

    /// Returns the secret material.
    pub fn secret(&self) -> &SecretKeyMaterial {
        &self.secret
    }

    /// Returns the unprotected secret parameters, if available.
    pub fn unencrypted_secret(&self) -> Result<&SecretParams> {
        match &self.secret {
            SecretKeyMaterial::Unencrypted { mpis } => Ok(mpis),
            SecretKeyMaterial::Encrypted { .. } =>
                Err(Error::InvalidOperation(
                    "secret parameters are passphrase-protected".into())
                    .into()),
            SecretKeyMaterial::Unknown { .. } =>
                Err(Error::InvalidOperation(
                    "secret parameters were not understood".into()).into()),
        }
    }

    /// Decrypts passphrase-protected secret material in place.
    ///
    /// On success the secret material becomes `Unencrypted`.  A wrong
    /// passphrase fails the embedded checksum and reports
    /// [`Error::InvalidPassword`].
    pub fn decrypt(&mut self, password: &Password) -> Result<()> {
        use crate::parse::secret_params_from_bytes;

        let (s2k_usage, algo, s2k, iv, ciphertext) = match &self.secret {
            SecretKeyMaterial::Unencrypted { .. } => return Ok(()),
            SecretKeyMaterial::Unknown { .. } =>
                return Err(Error::InvalidOperation(
                    "secret parameters were not understood".into()).into()),
            SecretKeyMaterial::Encrypted {
                s2k_usage, algo, s2k, iv, ciphertext,
            } => (*s2k_usage, *algo, s2k.clone(), iv.clone(),
                  ciphertext.clone()),
        };

        let key = s2k.derive_key(password, algo.key_size()?)?;
        let mut plaintext = ciphertext;
        Cfb::with_iv(algo, &key, &iv)?.decrypt(&mut plaintext);

        let mpis = secret_params_from_bytes(
            self.public.pk_algo(), s2k_usage, &plaintext)
            .map_err(|_| Error::InvalidPassword)?;

        self.secret = SecretKeyMaterial::Unencrypted { mpis };
        Ok(())
    }
}

impl From<SecretKey> for Packet {
    fn from(p: SecretKey) -> Self {
        Packet::SecretKey(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::mpi::MPI;

    fn test_key() -> Key {
        // A fixed (tiny, test-only) RSA public key.
        Key::new(
            0x5c0ffee5,
            PublicKeyAlgorithm::RSAEncryptSign,
            PublicParams::RSA {
                e: MPI::new(&[0x01, 0x00, 0x01]),
                n: MPI::new(&(1..=128).collect::<Vec<u8>>()),
            })
    }

    #[test]
    fn v4_fingerprint_framing() {
        let key = test_key();

        // Body: version + time + algo + two MPIs.
        assert_eq!(key.body_len(), 1 + 4 + 1 + (2 + 128) + (2 + 3));

        // The fingerprint is the SHA-1 over 0x99, be16 length, body.
        let fp = key.fingerprint().unwrap();
        assert_eq!(fp.as_bytes().len(), 20);
        assert_eq!(key.keyid().unwrap(), fp.keyid());

        // Deterministic.
        assert_eq!(key.fingerprint().unwrap(), fp);
    }

    #[test]
    fn v3_keyid_is_low_modulus_octets() {
        let n: Vec<u8> = (1..=64).collect();
        let key = Key::from_parts(
            3, 0, 0,
            PublicKeyAlgorithm::RSAEncryptSign,
            PublicParams::RSA {
                e: MPI::new(&[3]),
                n: MPI::new(&n),
            });

        assert!(key.fingerprint().is_err());
        assert_eq!(key.keyid().unwrap().as_bytes(), &n[64 - 8..]);
    }
}
