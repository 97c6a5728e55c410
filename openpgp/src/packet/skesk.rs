use crate::crypto::s2k::S2K;
use crate::crypto::symmetric::Cfb;
use crate::crypto::{Password, SessionKey};
use crate::types::SymmetricAlgorithm;
use crate::Error;
use crate::Packet;
use crate::Result;

/// Holds a Symmetric-Key Encrypted Session Key packet.
///
/// Protects a message with a passphrase instead of (or in addition to)
/// recipient keys (see [Section 5.3 of RFC 4880]).  Without an
/// embedded ESK, the S2K-derived key *is* the session key.
///
///   [Section 5.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.3
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct SKESK {
    version: u8,
    sym_algo: SymmetricAlgorithm,
    s2k: S2K,
    /// The encrypted session key, if it differs from the derived key.
    esk: Option<Vec<u8>>,
}

impl SKESK {
    /// Creates a SKESK packet whose derived key doubles as the
    /// session key.
    pub fn new(sym_algo: SymmetricAlgorithm, s2k: S2K) -> Self {
        SKESK {
            version: 4,
            sym_algo,
            s2k,
            esk: None,
        }
    }

    /// Creates a SKESK packet wrapping an independent session key.
    pub fn with_session_key(sym_algo: SymmetricAlgorithm, s2k: S2K,
                            session_key: &SessionKey,
                            password: &Password) -> Result<Self> {
        let key = s2k.derive_key(password, sym_algo.key_size()?)?;

        let mut esk = Vec::with_capacity(1 + session_key.len());
        esk.push(sym_algo.into());
        esk.extend_from_slice(session_key);
        Cfb::new(sym_algo, &key)?.encrypt(&mut esk);

        Ok(SKESK {
            version: 4,
            sym_algo,
            s2k,
            esk: Some(esk),
        })
    }

    pub(crate) fn from_parts(version: u8, sym_algo: SymmetricAlgorithm,
                             s2k: S2K, esk: Option<Vec<u8>>) -> Self {
        SKESK { version, sym_algo, s2k, esk }
    }

    /// Returns the version octet.  Always 4.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Returns the symmetric algorithm the S2K-derived key is for.
    pub fn sym_algo(&self) -> SymmetricAlgorithm {
        self.sym_algo
    }

    /// Returns the S2K specifier.
    pub fn s2k(&self) -> &S2K {
        &self.s2k
    }

    /// Returns the encrypted session key, if any.
    pub fn esk(&self) -> Option<&[u8]> {
        self.esk.as_deref()
    }

    /// Recovers the session key from a passphrase.
    pub fn decrypt(&self, password: &Password)
                   -> Result<(SymmetricAlgorithm, SessionKey)> {
        let key = self.s2k.derive_key(password,
                                      self.sym_algo.key_size()?)?;

        match &self.esk {
            None => Ok((self.sym_algo, key)),
            Some(esk) => {
                let mut plain = esk.clone();
                Cfb::new(self.sym_algo, &key)?.decrypt(&mut plain);

                if plain.is_empty() {
                    return Err(Error::InvalidSessionKey(
                        "empty ESK".into()).into());
                }
                let algo: SymmetricAlgorithm = plain[0].into();
                if algo.key_size()? != plain.len() - 1 {
                    // The only check we have; a wrong passphrase
                    // usually trips it.
                    return Err(Error::InvalidPassword.into());
                }
                Ok((algo, plain[1..].to_vec().into()))
            }
        }
    }
}

impl From<SKESK> for Packet {
    fn from(p: SKESK) -> Self {
        Packet::SKESK(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_key_is_session_key() {
        let s2k = S2K::Iterated {
            hash: crate::types::HashAlgorithm::SHA1,
            salt: *b"12345678",
            hash_bytes: 65536,
        };
        let password: Password = "correct horse".into();

        let skesk = SKESK::new(SymmetricAlgorithm::AES128, s2k.clone());
        let (algo, key) = skesk.decrypt(&password).unwrap();
        assert_eq!(algo, SymmetricAlgorithm::AES128);
        assert_eq!(&key[..],
                   &s2k.derive_key(&password, 16).unwrap()[..]);
    }

    #[test]
    fn wrapped_session_key_roundtrip() {
        let s2k = S2K::Salted {
            hash: crate::types::HashAlgorithm::SHA256,
            salt: *b"abcdefgh",
        };
        let password: Password = "secret".into();
        let sk = SessionKey::new(32).unwrap();

        let skesk = SKESK::with_session_key(
            SymmetricAlgorithm::AES256, s2k, &sk, &password).unwrap();
        let (algo, sk2) = skesk.decrypt(&password).unwrap();
        assert_eq!(algo, SymmetricAlgorithm::AES256);
        assert_eq!(&sk2[..], &sk[..]);

        // A wrong passphrase is rejected with overwhelming
        // probability.
        assert!(skesk.decrypt(&"wrong".into()).is_err());
    }
}
