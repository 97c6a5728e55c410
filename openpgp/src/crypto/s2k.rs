//! String-to-Key transformations.
//!
//! S2K specifiers turn a passphrase into a symmetric session key (see
//! [Section 3.7 of RFC 4880]).  They appear in symmetric-key encrypted
//! session key packets and in passphrase-protected secret keys.
//!
//!   [Section 3.7 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.7

use std::fmt;

use crate::crypto::Password;
use crate::crypto::SessionKey;
use crate::crypto::mem::Protected;
use crate::types::HashAlgorithm;
use crate::Error;
use crate::Result;

/// A string-to-key specifier.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[non_exhaustive]
pub enum S2K {
    /// Hashes the password directly.
    Simple {
        /// Hash used for key derivation.
        hash: HashAlgorithm,
    },

    /// Hashes the password with an 8-octet salt.
    Salted {
        /// Hash used for key derivation.
        hash: HashAlgorithm,
        /// Public salt value mixed into the password.
        salt: [u8; 8],
    },

    /// Repeatedly hashes the salted password.
    Iterated {
        /// Hash used for key derivation.
        hash: HashAlgorithm,
        /// Public salt value mixed into the password.
        salt: [u8; 8],
        /// Number of octets to hash, decoded from the count octet.
        hash_bytes: u32,
    },

    /// Private S2K specifier.
    Private(u8),

    /// Unknown S2K specifier.
    Unknown(u8),
}

impl Default for S2K {
    fn default() -> Self {
        S2K::Iterated {
            hash: HashAlgorithm::SHA256,
            salt: Default::default(),
            // The default count used by GnuPG.
            hash_bytes: 65536,
        }
    }
}

impl S2K {
    /// Generates a fresh salted default specifier.
    pub fn new_iterated() -> Result<Self> {
        use rand::RngCore;
        let mut salt = [0u8; 8];
        rand::rngs::OsRng.try_fill_bytes(&mut salt)?;
        Ok(S2K::Iterated {
            hash: HashAlgorithm::SHA256,
            salt,
            hash_bytes: 65536,
        })
    }

    /// Derives a key of the given size from a password.
    pub fn derive_key(&self, password: &Password, key_size: usize)
                      -> Result<SessionKey> {
        match self {
            S2K::Simple { hash }
            | S2K::Salted { hash, .. }
            | S2K::Iterated { hash, .. } => {
                let mut contexts = Vec::new();
                let digest_size = hash.digest_size()?;
                // If the digest is too short, several contexts run in
                // parallel, each preloaded with one more zero octet.
                let n = (key_size + digest_size - 1) / digest_size;
                for preload in 0..n {
                    let mut ctx = hash.context()?;
                    for _ in 0..preload {
                        ctx.update([0u8]);
                    }
                    contexts.push(ctx);
                }

                for ctx in contexts.iter_mut() {
                    match self {
                        S2K::Simple { .. } => {
                            ctx.update(&password[..]);
                        }
                        S2K::Salted { salt, .. } => {
                            ctx.update(salt);
                            ctx.update(&password[..]);
                        }
                        S2K::Iterated { salt, hash_bytes, .. } => {
                            let data_len = salt.len() + password.len();
                            // Always hash the whole salted password at
                            // least once, whatever the count says.
                            let mut todo =
                                std::cmp::max(*hash_bytes as usize, data_len);
                            while todo > 0 {
                                if todo < data_len {
                                    let mut data =
                                        Vec::with_capacity(data_len);
                                    data.extend_from_slice(salt);
                                    data.extend_from_slice(&password[..]);
                                    ctx.update(&data[..todo]);
                                    break;
                                }
                                ctx.update(salt);
                                ctx.update(&password[..]);
                                todo -= data_len;
                            }
                        }
                        _ => unreachable!(),
                    }
                }

                let mut key = Protected::new(key_size);
                let mut pos = 0;
                for ctx in contexts {
                    let n = std::cmp::min(digest_size, key_size - pos);
                    let digest = ctx.into_digest();
                    key[pos..pos + n].copy_from_slice(&digest[..n]);
                    pos += n;
                }

                Ok(key.into())
            }

            S2K::Private(u) | S2K::Unknown(u) =>
                Err(Error::MalformedPacket(
                    format!("unsupported S2K specifier {}", u)).into()),
        }
    }

    /// Decodes an iterated S2K count octet (see [Section 3.7.1.3 of
    /// RFC 4880]).
    ///
    ///   [Section 3.7.1.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.7.1.3
    pub fn decode_count(coded: u8) -> u32 {
        (16 + (coded as u32 & 15)) << ((coded >> 4) + 6)
    }

    /// Encodes an iterated S2K count as a count octet.
    ///
    /// Not every count is representable; the smallest representable
    /// count not less than `count` is chosen, or the maximum for
    /// counts beyond it.
    pub fn encode_count(count: u32) -> u8 {
        for coded in 0..=255u8 {
            if Self::decode_count(coded) >= count {
                return coded;
            }
        }
        255
    }
}

impl fmt::Display for S2K {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            S2K::Simple { hash } =>
                write!(f, "Simple S2K with {}", hash),
            S2K::Salted { hash, .. } =>
                write!(f, "Salted S2K with {}", hash),
            S2K::Iterated { hash, hash_bytes, .. } =>
                write!(f, "Iterated and salted S2K with {}, {} octets",
                       hash, hash_bytes),
            S2K::Private(u) => write!(f, "Private S2K type {}", u),
            S2K::Unknown(u) => write!(f, "Unknown S2K type {}", u),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_coding() {
        // The canonical examples from the RFC's coding formula.
        assert_eq!(S2K::decode_count(0), 1024);
        assert_eq!(S2K::decode_count(255), 65011712);
        // Coding roundtrip: decoding an encoded count never loses
        // octets.
        for &count in &[1024u32, 65536, 65537, 1000000, 65011712] {
            let coded = S2K::encode_count(count);
            assert!(S2K::decode_count(coded) >= count);
        }
    }

    #[test]
    fn derivation_is_deterministic() {
        let s2k = S2K::Iterated {
            hash: HashAlgorithm::SHA1,
            salt: *b"\x01\x02\x03\x04\x05\x06\x07\x08",
            hash_bytes: 65536,
        };
        let password: Password = "hunter2".into();

        let a = s2k.derive_key(&password, 16).unwrap();
        let b = s2k.derive_key(&password, 16).unwrap();
        assert_eq!(&a[..], &b[..]);

        // A different salt derives a different key.
        let other = S2K::Iterated {
            hash: HashAlgorithm::SHA1,
            salt: *b"\x08\x07\x06\x05\x04\x03\x02\x01",
            hash_bytes: 65536,
        };
        let c = other.derive_key(&password, 16).unwrap();
        assert!(&a[..] != &c[..]);
    }

    #[test]
    fn long_keys_use_multiple_contexts() {
        // A 32-byte key from a 20-byte digest exercises the preloaded
        // second context.
        let s2k = S2K::Salted {
            hash: HashAlgorithm::SHA1,
            salt: *b"saltsalt",
        };
        let key = s2k.derive_key(&"pw".into(), 32).unwrap();
        assert_eq!(key.len(), 32);
        // The two halves come from different contexts.
        assert!(key[..16] != key[16..]);
    }

    #[test]
    fn unknown_specifiers_do_not_derive() {
        assert!(S2K::Unknown(42).derive_key(&"pw".into(), 16).is_err());
    }
}
