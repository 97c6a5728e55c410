//! Keyring loading and lookup.
//!
//! A keyring file is a plain concatenation of OpenPGP packets: a
//! primary key packet followed by its user ids, user attributes,
//! subkeys and certifying signatures, then the next primary key, and
//! so on.  This module groups such a stream into key records and
//! answers substring lookups by user id.

use std::path::Path;

use layered_reader::BufferedReader;

use crate::packet::{Key, SecretKey, Signature, UserAttribute, UserID};
use crate::parse;
use crate::Error;
use crate::Fingerprint;
use crate::KeyID;
use crate::Packet;
use crate::Result;

/// One key with its associated packets.
///
/// A record bundles a primary key packet with everything up to the
/// next primary key: subkeys, user ids, user attributes, and
/// certifying signatures.
#[derive(Debug, Clone)]
pub struct KeyRecord {
    primary: Key,
    primary_secret: Option<SecretKey>,
    subkeys: Vec<Key>,
    secret_subkeys: Vec<SecretKey>,
    userids: Vec<UserID>,
    user_attributes: Vec<UserAttribute>,
    signatures: Vec<Signature>,
}

impl KeyRecord {
    fn new(primary: Key, primary_secret: Option<SecretKey>) -> Self {
        KeyRecord {
            primary,
            primary_secret,
            subkeys: Vec::new(),
            secret_subkeys: Vec::new(),
            userids: Vec::new(),
            user_attributes: Vec::new(),
            signatures: Vec::new(),
        }
    }

    /// Returns the primary key.
    pub fn primary(&self) -> &Key {
        &self.primary
    }

    /// Returns the primary secret key, if the keyring carried one.
    pub fn primary_secret(&self) -> Option<&SecretKey> {
        self.primary_secret.as_ref()
    }

    /// Returns the subkeys.
    pub fn subkeys(&self) -> &[Key] {
        &self.subkeys
    }

    /// Returns the secret subkeys, if the keyring carried any.
    pub fn secret_subkeys(&self) -> &[SecretKey] {
        &self.secret_subkeys
    }

    /// Returns the user ids.
    pub fn userids(&self) -> &[UserID] {
        &self.userids
    }

    /// Returns the user attributes.
    pub fn user_attributes(&self) -> &[UserAttribute] {
        &self.user_attributes
    }

    /// Returns the certifying signatures.
    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// Returns the primary key's fingerprint.
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        self.primary.fingerprint()
    }

    /// Returns the primary key's key ID.
    pub fn keyid(&self) -> Result<KeyID> {
        self.primary.keyid()
    }

    /// Whether any user id contains `needle`.
    pub fn has_userid(&self, needle: &str) -> bool {
        self.userids.iter().any(|uid| {
            String::from_utf8_lossy(uid.value()).contains(needle)
        })
    }

    /// Returns a key of this record usable for encryption: the first
    /// encryption-capable subkey, or the primary key.
    pub fn encryption_key(&self) -> Result<&Key> {
        self.subkeys.iter()
            .chain(std::iter::once(&self.primary))
            .find(|key| key.pk_algo().for_encryption())
            .ok_or_else(|| Error::InvalidKey(
                "no encryption-capable key in the record".into()).into())
    }

    /// Returns the secret key matching `keyid`, covering both the
    /// primary key and the subkeys.
    pub fn secret_by_keyid(&self, keyid: &KeyID) -> Option<&SecretKey> {
        self.primary_secret.iter()
            .chain(self.secret_subkeys.iter())
            .find(|sk| sk.public().keyid().ok().as_ref() == Some(keyid))
    }
}

/// An ordered sequence of key records.
#[derive(Debug, Clone, Default)]
pub struct Keyring {
    records: Vec<KeyRecord>,
}

impl Keyring {
    /// Reads a keyring from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_buffered_reader(
            Box::new(layered_reader::File::open(path)?))
    }

    /// Reads a keyring from a buffer.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_buffered_reader(
            Box::new(layered_reader::Memory::new(bytes)))
    }

    /// Reads a keyring from a reader.
    ///
    /// Both binary and armored keyrings are accepted.
    pub fn from_buffered_reader(reader: Box<dyn BufferedReader + '_>)
                                -> Result<Self> {
        Self::from_packets(parse::packets(reader)?)
    }

    /// Groups an already parsed packet sequence into key records.
    pub fn from_packets(packets: Vec<Packet>) -> Result<Self> {
        let mut records: Vec<KeyRecord> = Vec::new();

        for packet in packets {
            match packet {
                Packet::PublicKey(key) =>
                    records.push(KeyRecord::new(key, None)),
                Packet::SecretKey(key) => records.push(
                    KeyRecord::new(key.public().clone(), Some(key))),

                Packet::PublicSubkey(key) => {
                    let record = records.last_mut().ok_or_else(
                        || Error::MalformedMessage(
                            "subkey before any primary key".into()))?;
                    record.subkeys.push(key);
                }
                Packet::SecretSubkey(key) => {
                    let record = records.last_mut().ok_or_else(
                        || Error::MalformedMessage(
                            "subkey before any primary key".into()))?;
                    record.subkeys.push(key.public().clone());
                    record.secret_subkeys.push(key);
                }

                Packet::UserID(uid) => {
                    let record = records.last_mut().ok_or_else(
                        || Error::MalformedMessage(
                            "user id before any primary key".into()))?;
                    record.userids.push(uid);
                }
                Packet::UserAttribute(ua) => {
                    let record = records.last_mut().ok_or_else(
                        || Error::MalformedMessage(
                            "user attribute before any primary key"
                                .into()))?;
                    record.user_attributes.push(ua);
                }
                Packet::Signature(sig) => {
                    // Certifications and bindings; signatures in front
                    // of the first key would be detached signatures,
                    // which do not belong into a keyring.
                    let record = records.last_mut().ok_or_else(
                        || Error::MalformedMessage(
                            "signature before any primary key".into()))?;
                    record.signatures.push(sig);
                }

                // Trust packets and markers are local bookkeeping;
                // skip them.  Anything else does not belong here.
                Packet::Trust(_) | Packet::Marker(_) => {}
                p => return Err(Error::MalformedMessage(format!(
                    "stray {} in a keyring", p.tag())).into()),
            }
        }

        Ok(Keyring { records })
    }

    /// Returns the key records.
    pub fn records(&self) -> &[KeyRecord] {
        &self.records
    }

    /// Returns the first record one of whose user ids contains the
    /// given substring.
    pub fn find_by_userid(&self, needle: &str) -> Option<&KeyRecord> {
        self.records.iter().find(|r| r.has_userid(needle))
    }

    /// Returns the record owning the key with the given key ID,
    /// searching subkeys too.
    pub fn find_by_keyid(&self, keyid: &KeyID) -> Option<&KeyRecord> {
        self.records.iter().find(|r| {
            r.primary.keyid().ok().as_ref() == Some(keyid)
                || r.subkeys.iter().any(
                    |k| k.keyid().ok().as_ref() == Some(keyid))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::asymmetric::generate_rsa_key;
    use crate::serialize::Serialize;
    use crate::types::PublicKeyAlgorithm;

    fn test_record(uid: &str) -> (Vec<u8>, Key) {
        let (public, _) = generate_rsa_key(1024).unwrap();
        let key = Key::new(1000, PublicKeyAlgorithm::RSAEncryptSign,
                           public);

        let mut o = Vec::new();
        key.serialize(&mut o).unwrap();
        Packet::UserID(UserID::from(uid)).serialize(&mut o).unwrap();
        (o, key)
    }

    #[test]
    fn lookup_by_userid_substring() {
        let (mut o, alice) = test_record("Alice <alice@example.org>");
        let (bob_bytes, bob) = test_record("Bob <bob@example.org>");
        o.extend_from_slice(&bob_bytes);

        let keyring = Keyring::from_bytes(&o).unwrap();
        assert_eq!(keyring.records().len(), 2);

        let hit = keyring.find_by_userid("bob@").unwrap();
        assert_eq!(hit.primary(), &bob);
        let hit = keyring.find_by_userid("Alice").unwrap();
        assert_eq!(hit.primary(), &alice);
        assert!(keyring.find_by_userid("carol").is_none());

        // Lookup returns the *first* match.
        let hit = keyring.find_by_userid("example.org").unwrap();
        assert_eq!(hit.primary(), &alice);
    }

    #[test]
    fn stray_packets_are_rejected() {
        let mut o = Vec::new();
        Packet::UserID(UserID::from("no key")).serialize(&mut o)
            .unwrap();
        assert!(Keyring::from_bytes(&o).is_err());
    }
}
