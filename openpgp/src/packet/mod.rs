//! Packet-related types.
//!
//! OpenPGP data is a sequence of packets, each introduced by a Packet
//! Tag octet and a body length (see [Section 4 of RFC 4880]).  This
//! module defines the content tags, the two header framings, the five
//! body length encodings, and one struct per packet body.
//!
//!   [Section 4 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4

use std::fmt;

mod compressed_data;
mod key;
mod literal;
mod marker;
mod mdc;
mod one_pass_sig;
mod pkesk;
mod seip;
pub mod signature;
mod skesk;
mod trust;
mod unknown;
mod user_attribute;
mod userid;

pub use compressed_data::CompressedData;
pub use key::Key;
pub use key::SecretKey;
pub use key::SecretKeyMaterial;
pub use literal::Literal;
pub use marker::Marker;
pub use mdc::MDC;
pub use one_pass_sig::OnePassSig;
pub use pkesk::PKESK;
pub use seip::SED;
pub use seip::SEIP;
pub use signature::Signature;
pub use skesk::SKESK;
pub use trust::Trust;
pub use unknown::Unknown;
pub use user_attribute::UserAttribute;
pub use userid::UserID;

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

/// The content tags defined in [Section 4.3 of RFC 4880].
///
///   [Section 4.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.3
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum Tag {
    /// Reserved packet tag.  Must not appear on the wire.
    Reserved,
    /// Public-Key Encrypted Session Key Packet.
    PKESK,
    /// Signature Packet.
    Signature,
    /// Symmetric-Key Encrypted Session Key Packet.
    SKESK,
    /// One-Pass Signature Packet.
    OnePassSig,
    /// Secret Key Packet.
    SecretKey,
    /// Public Key Packet.
    PublicKey,
    /// Secret Subkey Packet.
    SecretSubkey,
    /// Compressed Data Packet.
    CompressedData,
    /// Symmetrically Encrypted Data Packet.
    SED,
    /// Marker Packet.
    Marker,
    /// Literal Data Packet.
    Literal,
    /// Trust Packet.
    Trust,
    /// User ID Packet.
    UserID,
    /// Public Subkey Packet.
    PublicSubkey,
    /// User Attribute Packet.
    UserAttribute,
    /// Symmetrically Encrypted and Integrity Protected Data Packet.
    SEIP,
    /// Modification Detection Code Packet.
    MDC,
    /// Private or experimental packet tag.
    Private(u8),
    /// Unknown packet tag.
    Unknown(u8),
}

impl From<u8> for Tag {
    fn from(u: u8) -> Self {
        use self::Tag::*;
        match u {
            0 => Reserved,
            1 => PKESK,
            2 => Signature,
            3 => SKESK,
            4 => OnePassSig,
            5 => SecretKey,
            6 => PublicKey,
            7 => SecretSubkey,
            8 => CompressedData,
            9 => SED,
            10 => Marker,
            11 => Literal,
            12 => Trust,
            13 => UserID,
            14 => PublicSubkey,
            17 => UserAttribute,
            18 => SEIP,
            19 => MDC,
            60..=63 => Private(u),
            u => Unknown(u),
        }
    }
}

impl From<Tag> for u8 {
    fn from(t: Tag) -> u8 {
        use self::Tag::*;
        match t {
            Reserved => 0,
            PKESK => 1,
            Signature => 2,
            SKESK => 3,
            OnePassSig => 4,
            SecretKey => 5,
            PublicKey => 6,
            SecretSubkey => 7,
            CompressedData => 8,
            SED => 9,
            Marker => 10,
            Literal => 11,
            Trust => 12,
            UserID => 13,
            PublicSubkey => 14,
            UserAttribute => 17,
            SEIP => 18,
            MDC => 19,
            Private(u) => u,
            Unknown(u) => u,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Tag::*;
        match *self {
            Reserved => f.write_str("Reserved - a packet tag MUST NOT have this value"),
            PKESK => f.write_str("Public-Key Encrypted Session Key Packet"),
            Signature => f.write_str("Signature Packet"),
            SKESK => f.write_str("Symmetric-Key Encrypted Session Key Packet"),
            OnePassSig => f.write_str("One-Pass Signature Packet"),
            SecretKey => f.write_str("Secret Key Packet"),
            PublicKey => f.write_str("Public Key Packet"),
            SecretSubkey => f.write_str("Secret Subkey Packet"),
            CompressedData => f.write_str("Compressed Data Packet"),
            SED => f.write_str("Symmetrically Encrypted Data Packet"),
            Marker => f.write_str("Marker Packet"),
            Literal => f.write_str("Literal Data Packet"),
            Trust => f.write_str("Trust Packet"),
            UserID => f.write_str("User ID Packet"),
            PublicSubkey => f.write_str("Public Subkey Packet"),
            UserAttribute => f.write_str("User Attribute Packet"),
            SEIP => f.write_str(
                "Symmetrically Encrypted and Integrity Protected Data Packet"),
            MDC => f.write_str("Modification Detection Code Packet"),
            Private(u) =>
                f.write_fmt(format_args!("Private/Experimental Packet {}", u)),
            Unknown(u) =>
                f.write_fmt(format_args!("Unknown Packet {}", u)),
        }
    }
}

impl Tag {
    /// Whether this packet's body may use partial length encoding.
    ///
    /// Only data packets stream; everything else must carry a definite
    /// length.
    pub fn streams(&self) -> bool {
        matches!(self, Tag::Literal | Tag::CompressedData
                 | Tag::SED | Tag::SEIP)
    }
}

#[cfg(test)]
impl Arbitrary for Tag {
    fn arbitrary(g: &mut Gen) -> Self {
        u8::arbitrary(g).into()
    }
}

/// The length type of an old format packet, [Section 4.2.1 of RFC
/// 4880].
///
///   [Section 4.2.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2.1
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PacketLengthType {
    /// One length octet; the header is 2 octets long.
    OneOctet,
    /// Two length octets; the header is 3 octets long.
    TwoOctets,
    /// Four length octets; the header is 5 octets long.
    FourOctets,
    /// No length; the packet extends to the end of the input.
    Indeterminate,
}

impl From<u8> for PacketLengthType {
    fn from(u: u8) -> Self {
        use self::PacketLengthType::*;
        match u & 3 {
            0 => OneOctet,
            1 => TwoOctets,
            2 => FourOctets,
            3 => Indeterminate,
            _ => unreachable!(),
        }
    }
}

impl From<PacketLengthType> for u8 {
    fn from(t: PacketLengthType) -> u8 {
        use self::PacketLengthType::*;
        match t {
            OneOctet => 0,
            TwoOctets => 1,
            FourOctets => 2,
            Indeterminate => 3,
        }
    }
}

/// A packet's body length.
///
/// New format packets have three definite encodings and a chunked
/// partial encoding; old format packets may also leave the length
/// indeterminate (see [Section 4.2 of RFC 4880]).
///
///   [Section 4.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyLength {
    /// A definite length.
    Full(u32),
    /// The length of the next chunk; more chunks follow.
    ///
    /// The value is always a power of two between 1 and 2^30.
    Partial(u32),
    /// The packet extends to the end of the input (old format only).
    Indeterminate,
}

/// A new format Cipher Type Byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CTBNew {
    tag: Tag,
}

impl CTBNew {
    /// Creates a new format CTB for the given tag.
    pub fn new(tag: Tag) -> Self {
        CTBNew { tag }
    }

    /// Returns the content tag.
    pub fn tag(&self) -> Tag {
        self.tag
    }
}

/// An old format Cipher Type Byte.
///
/// Old format headers can only encode tags below 16.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CTBOld {
    tag: Tag,
    length_type: PacketLengthType,
}

impl CTBOld {
    /// Creates an old format CTB for the given tag and body length.
    ///
    /// Fails if the tag or the length cannot be encoded in the old
    /// format.
    pub fn new(tag: Tag, length: BodyLength) -> crate::Result<Self> {
        let tag_value: u8 = tag.into();
        if tag_value > 15 {
            return Err(crate::Error::InvalidArgument(
                format!("old format CTB cannot encode tag {}", tag_value))
                       .into());
        }

        let length_type = match length {
            BodyLength::Full(l) if l <= 0xff => PacketLengthType::OneOctet,
            BodyLength::Full(l) if l <= 0xffff => PacketLengthType::TwoOctets,
            BodyLength::Full(_) => PacketLengthType::FourOctets,
            BodyLength::Indeterminate => PacketLengthType::Indeterminate,
            BodyLength::Partial(_) =>
                return Err(crate::Error::InvalidArgument(
                    "old format packets cannot be partial".into()).into()),
        };

        Ok(CTBOld { tag, length_type })
    }

    /// Reassembles a CTB decoded from the wire, preserving the length
    /// type that was actually used.
    pub(crate) fn from_parts(tag: Tag, length_type: PacketLengthType)
                             -> Self {
        CTBOld { tag, length_type }
    }

    /// Returns the content tag.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Returns the length type.
    pub fn length_type(&self) -> PacketLengthType {
        self.length_type
    }
}

/// A Cipher Type Byte in either format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CTB {
    /// New format.
    New(CTBNew),
    /// Old format.
    Old(CTBOld),
}

impl CTB {
    /// Creates a new format CTB for the given tag.
    pub fn new(tag: Tag) -> Self {
        CTB::New(CTBNew::new(tag))
    }

    /// Returns the content tag.
    pub fn tag(&self) -> Tag {
        match self {
            CTB::New(ctb) => ctb.tag(),
            CTB::Old(ctb) => ctb.tag(),
        }
    }
}

/// A packet header: the CTB and the body length.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Header {
    ctb: CTB,
    length: BodyLength,
}

impl Header {
    /// Creates a header.
    pub fn new(ctb: CTB, length: BodyLength) -> Self {
        Header { ctb, length }
    }

    /// Returns the CTB.
    pub fn ctb(&self) -> &CTB {
        &self.ctb
    }

    /// Returns the content tag.
    pub fn tag(&self) -> Tag {
        self.ctb.tag()
    }

    /// Returns the body length as declared by the header.
    ///
    /// For partial packets, this is only the first chunk's length.
    pub fn length(&self) -> &BodyLength {
        &self.length
    }

    /// Whether this header uses the new packet format.
    pub fn new_format(&self) -> bool {
        matches!(self.ctb, CTB::New(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    quickcheck::quickcheck! {
        fn tag_roundtrip(t: Tag) -> bool {
            let b: u8 = t.into();
            t == Tag::from(b)
        }
    }

    #[test]
    fn old_ctb_rejects_high_tags() {
        assert!(CTBOld::new(Tag::SEIP, BodyLength::Full(10)).is_err());
        assert!(CTBOld::new(Tag::Literal, BodyLength::Partial(512)).is_err());
        assert!(CTBOld::new(Tag::Literal, BodyLength::Full(10)).is_ok());
    }

    #[test]
    fn old_ctb_picks_smallest_length_type() {
        assert_eq!(CTBOld::new(Tag::Literal, BodyLength::Full(0xff))
                   .unwrap().length_type(),
                   PacketLengthType::OneOctet);
        assert_eq!(CTBOld::new(Tag::Literal, BodyLength::Full(0x100))
                   .unwrap().length_type(),
                   PacketLengthType::TwoOctets);
        assert_eq!(CTBOld::new(Tag::Literal, BodyLength::Full(0x10000))
                   .unwrap().length_type(),
                   PacketLengthType::FourOctets);
    }
}
