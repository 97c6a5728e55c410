//! Signature subpackets.
//!
//! OpenPGP signature packets include a set of key-value attributes
//! called subpackets: when the signature was made, who made it,
//! algorithm preferences, and so on.  The full details are in [Section
//! 5.2.3.1 of RFC 4880].
//!
//! Subpackets can be marked critical.  An implementation that does not
//! understand a critical subpacket is required to reject the
//! signature; unknown non-critical subpackets are exposed raw and
//! ignored otherwise.
//!
//! [Section 5.2.3.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.3.1

use std::fmt;

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

use crate::types::{CompressionAlgorithm, HashAlgorithm,
                   PublicKeyAlgorithm, SymmetricAlgorithm};
use crate::Error;
use crate::Fingerprint;
use crate::KeyID;
use crate::Result;

/// The subpacket types specified by [Section 5.2.3.1 of RFC 4880].
///
/// [Section 5.2.3.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.3.1
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[non_exhaustive]
pub enum SubpacketTag {
    /// The time the signature was made.
    SignatureCreationTime,
    /// The validity period of the signature.
    SignatureExpirationTime,
    /// Whether other users may rely on a certification.
    ExportableCertification,
    /// The signer asserts the key is trustworthy at a given level.
    TrustSignature,
    /// Limits the scope of a trust signature.
    RegularExpression,
    /// The signature's revocability status.
    Revocable,
    /// The validity period of the key.
    KeyExpirationTime,
    /// Deprecated.
    PlaceholderForBackwardCompatibility,
    /// Symmetric algorithms the key holder prefers.
    PreferredSymmetricAlgorithms,
    /// Authorizes another key to revoke this key.
    RevocationKey,
    /// The OpenPGP key ID of the signing key.
    Issuer,
    /// A user-defined notation on the signature.
    NotationData,
    /// Hash algorithms the key holder prefers.
    PreferredHashAlgorithms,
    /// Compression algorithms the key holder prefers.
    PreferredCompressionAlgorithms,
    /// Key server handling preferences.
    KeyServerPreferences,
    /// The key holder's preferred key server.
    PreferredKeyServer,
    /// Marks the main user id of a key.
    PrimaryUserID,
    /// The policy the signature was issued under.
    PolicyURI,
    /// How the key may be used.
    KeyFlags,
    /// Which user id is responsible for the signing.
    SignersUserID,
    /// Why a key or certification was revoked.
    ReasonForRevocation,
    /// Advanced features the key holder's implementation supports.
    Features,
    /// Identifies a signature this signature refers to.
    SignatureTarget,
    /// An embedded complete signature packet body.
    EmbeddedSignature,
    /// Reserved subpacket tag.
    Reserved(u8),
    /// Private or user-defined subpacket tag (100 to 110).
    Private(u8),
    /// Unknown subpacket tag.
    Unknown(u8),
}

impl From<u8> for SubpacketTag {
    fn from(u: u8) -> Self {
        match u {
            2 => SubpacketTag::SignatureCreationTime,
            3 => SubpacketTag::SignatureExpirationTime,
            4 => SubpacketTag::ExportableCertification,
            5 => SubpacketTag::TrustSignature,
            6 => SubpacketTag::RegularExpression,
            7 => SubpacketTag::Revocable,
            9 => SubpacketTag::KeyExpirationTime,
            10 => SubpacketTag::PlaceholderForBackwardCompatibility,
            11 => SubpacketTag::PreferredSymmetricAlgorithms,
            12 => SubpacketTag::RevocationKey,
            16 => SubpacketTag::Issuer,
            20 => SubpacketTag::NotationData,
            21 => SubpacketTag::PreferredHashAlgorithms,
            22 => SubpacketTag::PreferredCompressionAlgorithms,
            23 => SubpacketTag::KeyServerPreferences,
            24 => SubpacketTag::PreferredKeyServer,
            25 => SubpacketTag::PrimaryUserID,
            26 => SubpacketTag::PolicyURI,
            27 => SubpacketTag::KeyFlags,
            28 => SubpacketTag::SignersUserID,
            29 => SubpacketTag::ReasonForRevocation,
            30 => SubpacketTag::Features,
            31 => SubpacketTag::SignatureTarget,
            32 => SubpacketTag::EmbeddedSignature,
            0 | 1 | 8 | 13 | 14 | 15 | 17 | 18 | 19 =>
                SubpacketTag::Reserved(u),
            100..=110 => SubpacketTag::Private(u),
            _ => SubpacketTag::Unknown(u),
        }
    }
}

impl From<SubpacketTag> for u8 {
    fn from(t: SubpacketTag) -> Self {
        match t {
            SubpacketTag::SignatureCreationTime => 2,
            SubpacketTag::SignatureExpirationTime => 3,
            SubpacketTag::ExportableCertification => 4,
            SubpacketTag::TrustSignature => 5,
            SubpacketTag::RegularExpression => 6,
            SubpacketTag::Revocable => 7,
            SubpacketTag::KeyExpirationTime => 9,
            SubpacketTag::PlaceholderForBackwardCompatibility => 10,
            SubpacketTag::PreferredSymmetricAlgorithms => 11,
            SubpacketTag::RevocationKey => 12,
            SubpacketTag::Issuer => 16,
            SubpacketTag::NotationData => 20,
            SubpacketTag::PreferredHashAlgorithms => 21,
            SubpacketTag::PreferredCompressionAlgorithms => 22,
            SubpacketTag::KeyServerPreferences => 23,
            SubpacketTag::PreferredKeyServer => 24,
            SubpacketTag::PrimaryUserID => 25,
            SubpacketTag::PolicyURI => 26,
            SubpacketTag::KeyFlags => 27,
            SubpacketTag::SignersUserID => 28,
            SubpacketTag::ReasonForRevocation => 29,
            SubpacketTag::Features => 30,
            SubpacketTag::SignatureTarget => 31,
            SubpacketTag::EmbeddedSignature => 32,
            SubpacketTag::Reserved(u) => u,
            SubpacketTag::Private(u) => u,
            SubpacketTag::Unknown(u) => u,
        }
    }
}

impl fmt::Display for SubpacketTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
impl Arbitrary for SubpacketTag {
    fn arbitrary(g: &mut Gen) -> Self {
        u8::arbitrary(g).into()
    }
}

/// The value of a signature subpacket.
///
/// Times are raw seconds-since-the-epoch or seconds-of-validity
/// values, exactly as on the wire.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
#[non_exhaustive]
pub enum SubpacketValue {
    /// The time the signature was made.
    SignatureCreationTime(u32),
    /// Seconds after the creation time at which the signature
    /// expires; 0 means never.
    SignatureExpirationTime(u32),
    /// Whether other users may rely on this certification.
    ExportableCertification(bool),
    /// Trust level and amount.
    TrustSignature {
        /// Trust depth.
        level: u8,
        /// Trust amount, 60 partial, 120 complete.
        amount: u8,
    },
    /// A regular expression limiting the scope of a trust signature.
    RegularExpression(Vec<u8>),
    /// Whether the signature is revocable.
    Revocable(bool),
    /// Seconds after the key's creation time at which it expires; 0
    /// means never.
    KeyExpirationTime(u32),
    /// Symmetric algorithm preference list.
    PreferredSymmetricAlgorithms(Vec<SymmetricAlgorithm>),
    /// A key authorized to revoke this key.
    RevocationKey {
        /// Class octet; bit 7 set, bit 6 for sensitive.
        class: u8,
        /// The revoker key's algorithm.
        pk_algo: PublicKeyAlgorithm,
        /// The revoker key's fingerprint.
        fingerprint: Fingerprint,
    },
    /// The key ID of the signing key.
    Issuer(KeyID),
    /// A user-defined notation.
    NotationData {
        /// Flag octets; bit 0x80000000 marks human-readable values.
        flags: [u8; 4],
        /// Notation name.
        name: Vec<u8>,
        /// Notation value.
        value: Vec<u8>,
    },
    /// Hash algorithm preference list.
    PreferredHashAlgorithms(Vec<HashAlgorithm>),
    /// Compression algorithm preference list.
    PreferredCompressionAlgorithms(Vec<CompressionAlgorithm>),
    /// Key server preference bits.
    KeyServerPreferences(Vec<u8>),
    /// URI of the key holder's preferred key server.
    PreferredKeyServer(Vec<u8>),
    /// Whether the user id is the primary one.
    PrimaryUserID(bool),
    /// URI of the policy the signature was issued under.
    PolicyURI(Vec<u8>),
    /// Key usage flag bits.
    KeyFlags(Vec<u8>),
    /// The user id responsible for the signing.
    SignersUserID(Vec<u8>),
    /// Why the key or certification was revoked.
    ReasonForRevocation {
        /// Machine-readable reason code.
        code: u8,
        /// Human-readable reason string.
        reason: Vec<u8>,
    },
    /// Feature flag bits.
    Features(Vec<u8>),
    /// The raw bytes of a subpacket this crate does not interpret:
    /// reserved, private/user-defined, or unknown tags.
    Raw {
        /// The subpacket's tag.
        tag: SubpacketTag,
        /// The subpacket's body.
        body: Vec<u8>,
    },
}

impl SubpacketValue {
    /// Returns the tag this value serializes under.
    pub fn tag(&self) -> SubpacketTag {
        use self::SubpacketValue::*;
        match self {
            SignatureCreationTime(_) => SubpacketTag::SignatureCreationTime,
            SignatureExpirationTime(_) =>
                SubpacketTag::SignatureExpirationTime,
            ExportableCertification(_) =>
                SubpacketTag::ExportableCertification,
            TrustSignature { .. } => SubpacketTag::TrustSignature,
            RegularExpression(_) => SubpacketTag::RegularExpression,
            Revocable(_) => SubpacketTag::Revocable,
            KeyExpirationTime(_) => SubpacketTag::KeyExpirationTime,
            PreferredSymmetricAlgorithms(_) =>
                SubpacketTag::PreferredSymmetricAlgorithms,
            RevocationKey { .. } => SubpacketTag::RevocationKey,
            Issuer(_) => SubpacketTag::Issuer,
            NotationData { .. } => SubpacketTag::NotationData,
            PreferredHashAlgorithms(_) =>
                SubpacketTag::PreferredHashAlgorithms,
            PreferredCompressionAlgorithms(_) =>
                SubpacketTag::PreferredCompressionAlgorithms,
            KeyServerPreferences(_) => SubpacketTag::KeyServerPreferences,
            PreferredKeyServer(_) => SubpacketTag::PreferredKeyServer,
            PrimaryUserID(_) => SubpacketTag::PrimaryUserID,
            PolicyURI(_) => SubpacketTag::PolicyURI,
            KeyFlags(_) => SubpacketTag::KeyFlags,
            SignersUserID(_) => SubpacketTag::SignersUserID,
            ReasonForRevocation { .. } => SubpacketTag::ReasonForRevocation,
            Features(_) => SubpacketTag::Features,
            Raw { tag, .. } => *tag,
        }
    }

    /// Parses a subpacket body.
    ///
    /// Tags this crate does not interpret come back as
    /// [`SubpacketValue::Raw`]; a body of the wrong shape for a known
    /// tag is a format error.
    pub fn parse(tag: SubpacketTag, body: &[u8]) -> Result<Self> {
        use self::SubpacketValue::*;

        fn be_u32(body: &[u8], tag: SubpacketTag) -> Result<u32> {
            let body: [u8; 4] = body.try_into().map_err(
                |_| Error::MalformedPacket(
                    format!("{} subpacket with {} octets",
                            tag, body.len())))?;
            Ok(u32::from_be_bytes(body))
        }

        fn flag(body: &[u8], tag: SubpacketTag) -> Result<bool> {
            if body.len() != 1 {
                return Err(Error::MalformedPacket(
                    format!("{} subpacket with {} octets",
                            tag, body.len())).into());
            }
            Ok(body[0] > 0)
        }

        Ok(match tag {
            SubpacketTag::SignatureCreationTime =>
                SignatureCreationTime(be_u32(body, tag)?),
            SubpacketTag::SignatureExpirationTime =>
                SignatureExpirationTime(be_u32(body, tag)?),
            SubpacketTag::ExportableCertification =>
                ExportableCertification(flag(body, tag)?),
            SubpacketTag::TrustSignature => {
                if body.len() != 2 {
                    return Err(Error::MalformedPacket(
                        format!("trust subpacket with {} octets",
                                body.len())).into());
                }
                TrustSignature { level: body[0], amount: body[1] }
            }
            SubpacketTag::RegularExpression => {
                // NUL terminated on the wire; the terminator is not
                // part of the expression.
                let end = body.iter().position(|&b| b == 0)
                    .unwrap_or(body.len());
                RegularExpression(body[..end].to_vec())
            }
            SubpacketTag::Revocable => Revocable(flag(body, tag)?),
            SubpacketTag::KeyExpirationTime =>
                KeyExpirationTime(be_u32(body, tag)?),
            SubpacketTag::PreferredSymmetricAlgorithms =>
                PreferredSymmetricAlgorithms(
                    body.iter().map(|&b| b.into()).collect()),
            SubpacketTag::RevocationKey => {
                if body.len() != 22 {
                    return Err(Error::MalformedPacket(
                        format!("revocation key subpacket with {} octets",
                                body.len())).into());
                }
                let mut fp = [0u8; 20];
                fp.copy_from_slice(&body[2..]);
                RevocationKey {
                    class: body[0],
                    pk_algo: body[1].into(),
                    fingerprint: Fingerprint::from_bytes(fp),
                }
            }
            SubpacketTag::Issuer => Issuer(KeyID::try_from(body)?),
            SubpacketTag::NotationData => {
                if body.len() < 8 {
                    return Err(Error::MalformedPacket(
                        "truncated notation data".into()).into());
                }
                let flags = [body[0], body[1], body[2], body[3]];
                let name_len =
                    u16::from_be_bytes([body[4], body[5]]) as usize;
                let value_len =
                    u16::from_be_bytes([body[6], body[7]]) as usize;
                if body.len() != 8 + name_len + value_len {
                    return Err(Error::MalformedPacket(
                        "bad notation data lengths".into()).into());
                }
                NotationData {
                    flags,
                    name: body[8..8 + name_len].to_vec(),
                    value: body[8 + name_len..].to_vec(),
                }
            }
            SubpacketTag::PreferredHashAlgorithms =>
                PreferredHashAlgorithms(
                    body.iter().map(|&b| b.into()).collect()),
            SubpacketTag::PreferredCompressionAlgorithms =>
                PreferredCompressionAlgorithms(
                    body.iter().map(|&b| b.into()).collect()),
            SubpacketTag::KeyServerPreferences =>
                KeyServerPreferences(body.to_vec()),
            SubpacketTag::PreferredKeyServer =>
                PreferredKeyServer(body.to_vec()),
            SubpacketTag::PrimaryUserID => PrimaryUserID(flag(body, tag)?),
            SubpacketTag::PolicyURI => PolicyURI(body.to_vec()),
            SubpacketTag::KeyFlags => KeyFlags(body.to_vec()),
            SubpacketTag::SignersUserID => SignersUserID(body.to_vec()),
            SubpacketTag::ReasonForRevocation => {
                if body.is_empty() {
                    return Err(Error::MalformedPacket(
                        "empty revocation reason".into()).into());
                }
                ReasonForRevocation {
                    code: body[0],
                    reason: body[1..].to_vec(),
                }
            }
            SubpacketTag::Features => Features(body.to_vec()),
            _ => Raw { tag, body: body.to_vec() },
        })
    }

    /// Serializes the subpacket body.
    pub fn body_to_vec(&self) -> Vec<u8> {
        use self::SubpacketValue::*;
        match self {
            SignatureCreationTime(t)
            | SignatureExpirationTime(t)
            | KeyExpirationTime(t) => t.to_be_bytes().to_vec(),
            ExportableCertification(v)
            | Revocable(v)
            | PrimaryUserID(v) => vec![*v as u8],
            TrustSignature { level, amount } => vec![*level, *amount],
            RegularExpression(re) => {
                let mut o = re.clone();
                o.push(0);
                o
            }
            PreferredSymmetricAlgorithms(algos) =>
                algos.iter().map(|&a| a.into()).collect(),
            RevocationKey { class, pk_algo, fingerprint } => {
                let mut o = Vec::with_capacity(22);
                o.push(*class);
                o.push((*pk_algo).into());
                o.extend_from_slice(fingerprint.as_bytes());
                o
            }
            Issuer(id) => id.as_bytes().to_vec(),
            NotationData { flags, name, value } => {
                let mut o = Vec::with_capacity(8 + name.len()
                                               + value.len());
                o.extend_from_slice(flags);
                o.extend_from_slice(&(name.len() as u16).to_be_bytes());
                o.extend_from_slice(&(value.len() as u16).to_be_bytes());
                o.extend_from_slice(name);
                o.extend_from_slice(value);
                o
            }
            PreferredHashAlgorithms(algos) =>
                algos.iter().map(|&a| a.into()).collect(),
            PreferredCompressionAlgorithms(algos) =>
                algos.iter().map(|&a| a.into()).collect(),
            KeyServerPreferences(v) | PreferredKeyServer(v)
            | PolicyURI(v) | KeyFlags(v) | SignersUserID(v)
            | Features(v) => v.clone(),
            ReasonForRevocation { code, reason } => {
                let mut o = Vec::with_capacity(1 + reason.len());
                o.push(*code);
                o.extend_from_slice(reason);
                o
            }
            Raw { body, .. } => body.clone(),
        }
    }
}

/// A signature subpacket: a value plus the criticality bit.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Subpacket {
    critical: bool,
    value: SubpacketValue,
}

impl Subpacket {
    /// Creates a non-critical subpacket.
    pub fn new(value: SubpacketValue) -> Self {
        Self::with_criticality(value, false)
    }

    /// Creates a subpacket with explicit criticality.
    pub fn with_criticality(value: SubpacketValue, critical: bool)
                            -> Self {
        Subpacket { critical, value }
    }

    /// Whether the critical bit is set.
    pub fn critical(&self) -> bool {
        self.critical
    }

    /// Returns the subpacket's tag.
    pub fn tag(&self) -> SubpacketTag {
        self.value.tag()
    }

    /// Returns the subpacket's value.
    pub fn value(&self) -> &SubpacketValue {
        &self.value
    }

    /// Serializes the subpacket: length, type octet, body.
    pub fn to_vec(&self) -> Vec<u8> {
        let body = self.value.body_to_vec();
        let mut o = Vec::with_capacity(body.len() + 6);

        // Length covers the type octet and the body.
        let len = body.len() as u32 + 1;
        if len < 192 {
            o.push(len as u8);
        } else if len < 16320 {
            let len = len - 192;
            o.push((len >> 8) as u8 + 192);
            o.push((len & 0xff) as u8);
        } else {
            o.push(255);
            o.extend_from_slice(&len.to_be_bytes());
        }

        let tag: u8 = self.tag().into();
        o.push(tag | if self.critical { 0x80 } else { 0 });
        o.extend_from_slice(&body);
        o
    }
}

/// A subpacket area: the hashed or unhashed region of a v4 signature.
///
/// The raw bytes are kept alongside the parsed subpackets: signature
/// verification must replay exactly the bytes that were hashed, not a
/// re-serialization of them.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Default)]
pub struct SubpacketArea {
    data: Vec<u8>,
    packets: Vec<Subpacket>,
}

impl SubpacketArea {
    /// Creates an area from subpackets, serializing them.
    pub fn from_subpackets(packets: Vec<Subpacket>) -> Self {
        let mut data = Vec::new();
        for sp in &packets {
            data.extend_from_slice(&sp.to_vec());
        }
        SubpacketArea { data, packets }
    }

    /// Creates an area from the parse results.
    pub(crate) fn from_parsed(data: Vec<u8>, packets: Vec<Subpacket>)
                              -> Self {
        SubpacketArea { data, packets }
    }

    /// Returns the raw bytes of the area.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Iterates over the subpackets.
    pub fn iter(&self) -> impl Iterator<Item = &Subpacket> {
        self.packets.iter()
    }

    /// Returns the last subpacket with the given tag, if any.
    ///
    /// Taking the last occurrence is the strategy [Section 5.2.4.1 of
    /// RFC 4880] recommends for conflicting subpackets.
    ///
    ///   [Section 5.2.4.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.4.1
    pub fn lookup(&self, tag: SubpacketTag) -> Option<&Subpacket> {
        self.packets.iter().rev().find(|sp| sp.tag() == tag)
    }

    /// Adds a subpacket to the area.
    ///
    /// Fails if the area would outgrow its 16-bit length field.
    pub fn add(&mut self, packet: Subpacket) -> Result<()> {
        let bytes = packet.to_vec();
        if self.data.len() + bytes.len() > u16::MAX as usize {
            return Err(Error::MalformedPacket(
                "subpacket area exceeds maximum size".into()).into());
        }
        self.data.extend_from_slice(&bytes);
        self.packets.push(packet);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    quickcheck::quickcheck! {
        fn tag_roundtrip(tag: SubpacketTag) -> bool {
            let val: u8 = tag.into();
            tag == SubpacketTag::from(val)
        }
    }

    quickcheck::quickcheck! {
        fn tag_classes(tag: SubpacketTag) -> bool {
            match tag {
                SubpacketTag::Reserved(u) =>
                    (u == 0 || u == 1 || u == 8
                     || u == 13 || u == 14 || u == 15
                     || u == 17 || u == 18 || u == 19),
                SubpacketTag::Private(u) => (100..=110).contains(&u),
                SubpacketTag::Unknown(u) =>
                    (u > 32 && u < 100) || u > 110,
                _ => true,
            }
        }
    }

    fn roundtrip_value(value: SubpacketValue) {
        let tag = value.tag();
        let body = value.body_to_vec();
        assert_eq!(SubpacketValue::parse(tag, &body).unwrap(), value);
    }

    #[test]
    fn value_roundtrips() {
        roundtrip_value(SubpacketValue::SignatureCreationTime(0x5c0ffee5));
        roundtrip_value(SubpacketValue::KeyExpirationTime(86400));
        roundtrip_value(SubpacketValue::Revocable(false));
        roundtrip_value(SubpacketValue::TrustSignature {
            level: 1, amount: 120,
        });
        roundtrip_value(SubpacketValue::RegularExpression(
            b"<[^>]+[@.]example\\.com>$".to_vec()));
        roundtrip_value(SubpacketValue::Issuer(
            KeyID::from_bytes(*b"\x01\x02\x03\x04\x05\x06\x07\x08")));
        roundtrip_value(SubpacketValue::PreferredSymmetricAlgorithms(
            vec![SymmetricAlgorithm::AES256, SymmetricAlgorithm::AES128]));
        roundtrip_value(SubpacketValue::NotationData {
            flags: [0x80, 0, 0, 0],
            name: b"mail@example.org".to_vec(),
            value: b"yes".to_vec(),
        });
        roundtrip_value(SubpacketValue::ReasonForRevocation {
            code: 3,
            reason: b"key retired".to_vec(),
        });
        roundtrip_value(SubpacketValue::RevocationKey {
            class: 0x80,
            pk_algo: PublicKeyAlgorithm::RSAEncryptSign,
            fingerprint: Fingerprint::from_bytes([7; 20]),
        });
        roundtrip_value(SubpacketValue::Raw {
            tag: SubpacketTag::Private(105),
            body: b"user defined".to_vec(),
        });
    }

    #[test]
    fn short_bodies_are_rejected() {
        assert!(SubpacketValue::parse(
            SubpacketTag::SignatureCreationTime, b"\x00\x00").is_err());
        assert!(SubpacketValue::parse(
            SubpacketTag::TrustSignature, b"\x01").is_err());
        assert!(SubpacketValue::parse(
            SubpacketTag::RevocationKey, b"\x80\x01").is_err());
        assert!(SubpacketValue::parse(
            SubpacketTag::NotationData, b"\x00\x00\x00").is_err());
    }

    #[test]
    fn area_lookup_returns_last() {
        let mut area = SubpacketArea::default();
        area.add(Subpacket::new(
            SubpacketValue::SignatureCreationTime(1))).unwrap();
        area.add(Subpacket::new(
            SubpacketValue::SignatureCreationTime(2))).unwrap();

        match area.lookup(SubpacketTag::SignatureCreationTime)
            .unwrap().value()
        {
            SubpacketValue::SignatureCreationTime(t) => assert_eq!(*t, 2),
            _ => unreachable!(),
        }
        assert!(area.lookup(SubpacketTag::Issuer).is_none());
    }

    #[test]
    fn critical_bit_is_serialized() {
        let sp = Subpacket::with_criticality(
            SubpacketValue::Issuer(KeyID::wildcard()), true);
        let bytes = sp.to_vec();
        // length, type | 0x80, 8 body octets
        assert_eq!(bytes.len(), 10);
        assert_eq!(bytes[0], 9);
        assert_eq!(bytes[1], 16 | 0x80);
    }
}
