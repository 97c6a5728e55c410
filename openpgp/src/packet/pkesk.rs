use crate::crypto::asymmetric;
use crate::crypto::mpi::Ciphertext;
use crate::crypto::SessionKey;
use crate::packet::Key;
use crate::packet::SecretKey;
use crate::types::{PublicKeyAlgorithm, SymmetricAlgorithm};
use crate::Error;
use crate::KeyID;
use crate::Packet;
use crate::Result;

/// Holds a Public-Key Encrypted Session Key packet.
///
/// The session key of an encrypted message, wrapped to one recipient
/// key (see [Section 5.1 of RFC 4880]).
///
///   [Section 5.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.1
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct PKESK {
    version: u8,
    /// The recipient's key ID, or the wildcard for anonymous
    /// recipients.
    recipient: KeyID,
    pk_algo: PublicKeyAlgorithm,
    esk: Ciphertext,
}

impl PKESK {
    /// Creates a PKESK packet: wraps the session key to the given
    /// recipient key.
    pub fn new(algo: SymmetricAlgorithm, session_key: &SessionKey,
               recipient: &Key) -> Result<Self> {
        // The encoded payload: cipher octet, session key, and a
        // 16-bit additive checksum over the key octets.
        let checksum = session_key.iter()
            .fold(0u16, |acc, &b| acc.wrapping_add(b as u16));
        let mut payload = Vec::with_capacity(session_key.len() + 3);
        payload.push(algo.into());
        payload.extend_from_slice(session_key);
        payload.extend_from_slice(&checksum.to_be_bytes());

        let esk = asymmetric::encrypt(recipient.pk_algo(),
                                      recipient.mpis(), &payload);

        // The cleartext payload contains the session key.
        let payload: crate::crypto::Protected = payload.into();
        drop(payload);

        Ok(PKESK {
            version: 3,
            recipient: recipient.keyid()?,
            pk_algo: recipient.pk_algo(),
            esk: esk?,
        })
    }

    pub(crate) fn from_parts(version: u8, recipient: KeyID,
                             pk_algo: PublicKeyAlgorithm, esk: Ciphertext)
                             -> Self {
        PKESK { version, recipient, pk_algo, esk }
    }

    /// Returns the version octet.  Always 3.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Returns the recipient's key ID.
    pub fn recipient(&self) -> &KeyID {
        &self.recipient
    }

    /// Returns the public key algorithm.
    pub fn pk_algo(&self) -> PublicKeyAlgorithm {
        self.pk_algo
    }

    /// Returns the encrypted session key.
    pub fn esk(&self) -> &Ciphertext {
        &self.esk
    }

    /// Unwraps the session key using the recipient's secret key.
    pub fn decrypt(&self, secret: &SecretKey)
                   -> Result<(SymmetricAlgorithm, SessionKey)> {
        let mpis = secret.unencrypted_secret()?;
        let payload = asymmetric::decrypt(
            self.pk_algo, secret.public().mpis(), mpis, &self.esk)?;

        // cipher octet || session key || be16 checksum
        if payload.len() < 3 {
            return Err(Error::InvalidSessionKey(
                "payload too short".into()).into());
        }
        let algo: SymmetricAlgorithm = payload[0].into();
        let key = &payload[1..payload.len() - 2];
        let their_checksum =
            u16::from_be_bytes([payload[payload.len() - 2],
                                payload[payload.len() - 1]]);
        let our_checksum = key.iter()
            .fold(0u16, |acc, &b| acc.wrapping_add(b as u16));

        if our_checksum != their_checksum {
            return Err(Error::InvalidSessionKey(
                "checksum mismatch".into()).into());
        }
        if algo.key_size()? != key.len() {
            return Err(Error::InvalidSessionKey(
                format!("{} key of {} octets", algo, key.len())).into());
        }

        Ok((algo, key.to_vec().into()))
    }
}

impl From<PKESK> for Packet {
    fn from(p: PKESK) -> Self {
        Packet::PKESK(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::asymmetric::generate_rsa_key;

    #[test]
    fn wrap_unwrap_roundtrip() {
        let (public, secret) = generate_rsa_key(1024).unwrap();
        let key = Key::new(1234, PublicKeyAlgorithm::RSAEncryptSign,
                           public);
        let secret = SecretKey::new(key.clone(), secret);

        let algo = SymmetricAlgorithm::AES256;
        let sk = SessionKey::new(algo.key_size().unwrap()).unwrap();

        let pkesk = PKESK::new(algo, &sk, &key).unwrap();
        assert_eq!(pkesk.recipient(), &key.keyid().unwrap());

        let (algo2, sk2) = pkesk.decrypt(&secret).unwrap();
        assert_eq!(algo2, algo);
        assert_eq!(&sk2[..], &sk[..]);
    }
}
