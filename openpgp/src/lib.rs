//! OpenPGP packet pipeline.
//!
//! This crate implements the core of an [RFC 4880] message-processing
//! library: a streaming packet parser that delivers typed events to a
//! consumer callback, and a stack of push-style writers for composing
//! outgoing messages (armoring, dash-escaping, hashing, symmetric
//! encryption, compression, literal-data framing).
//!
//!   [RFC 4880]: https://tools.ietf.org/html/rfc4880
//!
//! The main entry points are:
//!
//!   - [`parse::parse`], which consumes a reader stack and hands
//!     [`parse::Event`]s to a consumer callback;
//!   - [`serialize::stream`], whose writers stack in front of a sink
//!     and are finalized in LIFO order;
//!   - [`keyring::Keyring`], for loading concatenated key packets and
//!     looking up keys by user id.
//!
//! Key generation, trust evaluation, and user interaction are out of
//! scope; secret material that this crate does hold is zeroed on drop.

#![warn(missing_docs)]

use std::fmt as std_fmt;

pub mod armor;
pub mod cleartext;
pub mod crypto;
pub mod keyring;
pub mod packet;
pub mod parse;
pub mod serialize;
pub mod types;

pub(crate) mod fmt;

use crate::types::{
    CompressionAlgorithm,
    HashAlgorithm,
    PublicKeyAlgorithm,
    SignatureType,
    SymmetricAlgorithm,
};

/// Crate result specialization.
pub type Result<T> = ::std::result::Result<T, anyhow::Error>;

/// Errors returned by this crate.
///
/// Note: This enum cannot be exhaustively matched to allow future
/// extensions.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid operation.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A malformed packet.
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    /// A malformed MPI.
    #[error("Malformed MPI: {0}")]
    MalformedMPI(String),

    /// A malformed message.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Damaged ASCII armor.
    #[error("Malformed armor: {0}")]
    MalformedArmor(String),

    /// Unsupported packet type.
    #[error("Unsupported packet type.  Tag: {0}")]
    UnsupportedPacketType(packet::Tag),

    /// Unsupported hash algorithm identifier.
    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedHashAlgorithm(HashAlgorithm),

    /// Unsupported public key algorithm identifier.
    #[error("Unsupported public key algorithm: {0}")]
    UnsupportedPublicKeyAlgorithm(PublicKeyAlgorithm),

    /// Unsupported symmetric key algorithm.
    #[error("Unsupported symmetric algorithm: {0}")]
    UnsupportedSymmetricAlgorithm(SymmetricAlgorithm),

    /// Unsupported compression algorithm.
    #[error("Unsupported compression algorithm: {0}")]
    UnsupportedCompressionAlgorithm(CompressionAlgorithm),

    /// Unsupported signature type.
    #[error("Unsupported signature type: {0}")]
    UnsupportedSignatureType(SignatureType),

    /// Invalid password.
    #[error("Invalid password")]
    InvalidPassword,

    /// Invalid session key.
    #[error("Invalid session key: {0}")]
    InvalidSessionKey(String),

    /// Missing session key.
    #[error("Missing session key: {0}")]
    MissingSessionKey(String),

    /// Bad signature.
    #[error("Bad signature: {0}")]
    BadSignature(String),

    /// Message has been manipulated.
    #[error("Message has been manipulated")]
    ManipulatedMessage,

    /// A secret key checksum did not verify.
    #[error("Checksum mismatch")]
    ChecksumMismatch,

    /// Key not found.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// The key cannot be used for the requested operation.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The consumer requested a halt.
    #[error("Operation cancelled")]
    Cancelled,

    /// An I/O error, preserved in displayable form.
    ///
    /// Parser error events must be cloneable, which `std::io::Error`
    /// is not; the underlying error is reported through the usual
    /// `anyhow` chain instead.
    #[error("I/O error: {0}")]
    Io(String),
}

/// The coarse classification of an [`Error`].
///
/// Every error this crate produces falls into one of these kinds.
/// Parser error events carry the originating [`Error`]; this is the
/// closed taxonomy a consumer can dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An I/O error from the bottom of a pipeline.
    Io,
    /// Malformed input: bad length, bad MPI, bad packet tag, unknown
    /// critical subpacket.
    Format,
    /// An algorithm or packet type this crate does not implement.
    Unsupported,
    /// A cryptographic check failed: signature, MDC, checksum,
    /// session-key unwrapping.
    Crypto,
    /// Damaged ASCII armor: CRC-24, base64, or framing.
    Armor,
    /// A key was not found or cannot be used.
    Key,
    /// The consumer cancelled the operation.
    Cancelled,
}

impl Error {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            InvalidArgument(_) | InvalidOperation(_)
                | MalformedPacket(_) | MalformedMPI(_)
                | MalformedMessage(_)
                => ErrorKind::Format,
            MalformedArmor(_) => ErrorKind::Armor,
            UnsupportedPacketType(_)
                | UnsupportedHashAlgorithm(_)
                | UnsupportedPublicKeyAlgorithm(_)
                | UnsupportedSymmetricAlgorithm(_)
                | UnsupportedCompressionAlgorithm(_)
                | UnsupportedSignatureType(_)
                => ErrorKind::Unsupported,
            InvalidPassword | InvalidSessionKey(_) | BadSignature(_)
                | ManipulatedMessage | ChecksumMismatch
                => ErrorKind::Crypto,
            MissingSessionKey(_) | KeyNotFound(_) | InvalidKey(_)
                => ErrorKind::Key,
            Cancelled => ErrorKind::Cancelled,
            Io(_) => ErrorKind::Io,
            #[allow(unreachable_patterns)]
            _ => ErrorKind::Format,
        }
    }
}

impl ErrorKind {
    /// Classifies an error that travelled through `anyhow`.
    ///
    /// Errors of this crate that a reader layer had to squeeze into an
    /// `io::Error` are unwrapped and classified by their real kind.
    pub fn of(e: &anyhow::Error) -> ErrorKind {
        if let Some(e) = e.downcast_ref::<Error>() {
            e.kind()
        } else if let Some(io) = e.downcast_ref::<std::io::Error>() {
            Self::of_io(io)
        } else {
            ErrorKind::Format
        }
    }

    /// Classifies an `io::Error`, looking through wrapped errors of
    /// this crate.
    pub fn of_io(e: &std::io::Error) -> ErrorKind {
        if let Some(inner) = e.get_ref()
            .and_then(|i| i.downcast_ref::<Error>())
        {
            inner.kind()
        } else {
            ErrorKind::Io
        }
    }
}

/// The OpenPGP packets this crate understands.
///
/// The different OpenPGP packets are detailed in [Section 5 of RFC
/// 4880].  The `Unknown` packet allows dealing with packets that are
/// not understood: it is a binary blob that remembers its tag.
///
///   [Section 5 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
#[non_exhaustive]
pub enum Packet {
    /// Unknown packet.
    Unknown(packet::Unknown),
    /// Signature packet.
    Signature(packet::Signature),
    /// One pass signature packet.
    OnePassSig(packet::OnePassSig),
    /// Public key packet.
    PublicKey(packet::Key),
    /// Public subkey packet.
    PublicSubkey(packet::Key),
    /// Secret key packet.
    SecretKey(packet::SecretKey),
    /// Secret subkey packet.
    SecretSubkey(packet::SecretKey),
    /// Marker packet.
    Marker(packet::Marker),
    /// Trust packet.
    Trust(packet::Trust),
    /// User ID packet.
    UserID(packet::UserID),
    /// User attribute packet.
    UserAttribute(packet::UserAttribute),
    /// Literal data packet.
    Literal(packet::Literal),
    /// Compressed data packet.
    CompressedData(packet::CompressedData),
    /// Public key encrypted session key packet.
    PKESK(packet::PKESK),
    /// Symmetric key encrypted session key packet.
    SKESK(packet::SKESK),
    /// Symmetrically encrypted data packet, no integrity protection.
    SED(packet::SED),
    /// Symmetrically encrypted, integrity protected data packet.
    SEIP(packet::SEIP),
    /// Modification detection code packet.
    MDC(packet::MDC),
}

impl Packet {
    /// Returns the `Packet`'s corresponding OpenPGP tag.
    ///
    /// Tags are explained in [Section 4.3 of RFC 4880].
    ///
    ///   [Section 4.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.3
    pub fn tag(&self) -> packet::Tag {
        use crate::packet::Tag;
        match self {
            Packet::Unknown(p) => p.tag(),
            Packet::Signature(_) => Tag::Signature,
            Packet::OnePassSig(_) => Tag::OnePassSig,
            Packet::PublicKey(_) => Tag::PublicKey,
            Packet::PublicSubkey(_) => Tag::PublicSubkey,
            Packet::SecretKey(_) => Tag::SecretKey,
            Packet::SecretSubkey(_) => Tag::SecretSubkey,
            Packet::Marker(_) => Tag::Marker,
            Packet::Trust(_) => Tag::Trust,
            Packet::UserID(_) => Tag::UserID,
            Packet::UserAttribute(_) => Tag::UserAttribute,
            Packet::Literal(_) => Tag::Literal,
            Packet::CompressedData(_) => Tag::CompressedData,
            Packet::PKESK(_) => Tag::PKESK,
            Packet::SKESK(_) => Tag::SKESK,
            Packet::SED(_) => Tag::SED,
            Packet::SEIP(_) => Tag::SEIP,
            Packet::MDC(_) => Tag::MDC,
        }
    }

    /// Returns the parsed `Packet`'s corresponding OpenPGP tag.
    ///
    /// Like [`Packet::tag`], but returns `None` for packets that could
    /// not be parsed into their structured form.
    pub fn kind(&self) -> Option<packet::Tag> {
        match self {
            Packet::Unknown(_) => None,
            _ => Some(self.tag()),
        }
    }
}

/// Holds a v4 fingerprint.
///
/// A fingerprint uniquely identifies a public key: the SHA-1 hash over
/// `0x99`, the big-endian 16-bit body length, and the public key
/// packet body (see [Section 12.2 of RFC 4880]).
///
///   [Section 12.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-12.2
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Hash)]
pub struct Fingerprint([u8; 20]);

impl Fingerprint {
    /// Wraps raw fingerprint bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Fingerprint(bytes)
    }

    /// Returns the fingerprint as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the key ID: the low 8 octets of the fingerprint.
    pub fn keyid(&self) -> KeyID {
        let mut id = [0u8; 8];
        id.copy_from_slice(&self.0[12..]);
        KeyID::from_bytes(id)
    }
}

impl std_fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std_fmt::Formatter) -> std_fmt::Result {
        write!(f, "{}", crate::fmt::to_hex(&self.0))
    }
}

impl std_fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std_fmt::Formatter) -> std_fmt::Result {
        f.debug_tuple("Fingerprint")
            .field(&crate::fmt::to_hex(&self.0))
            .finish()
    }
}

/// Holds a key ID.
///
/// A key ID is a fingerprint fragment: the low 8 octets of a v4
/// fingerprint, or of the RSA modulus for v3 keys.  It identifies a
/// key, but is easy to forge.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct KeyID([u8; 8]);

impl KeyID {
    /// Wraps raw key ID bytes.
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        KeyID(bytes)
    }

    /// Returns the key ID as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The all-zero wildcard key ID, used by anonymous recipients.
    pub fn wildcard() -> Self {
        KeyID([0; 8])
    }
}

impl std_fmt::Display for KeyID {
    fn fmt(&self, f: &mut std_fmt::Formatter) -> std_fmt::Result {
        write!(f, "{}", crate::fmt::to_hex(&self.0))
    }
}

impl std_fmt::Debug for KeyID {
    fn fmt(&self, f: &mut std_fmt::Formatter) -> std_fmt::Result {
        f.debug_tuple("KeyID")
            .field(&crate::fmt::to_hex(&self.0))
            .finish()
    }
}

impl<'a> TryFrom<&'a [u8]> for KeyID {
    type Error = anyhow::Error;

    fn try_from(bytes: &'a [u8]) -> Result<Self> {
        let bytes: [u8; 8] = bytes.try_into().map_err(
            |_| Error::InvalidArgument(
                format!("expected 8 key ID octets, got {}", bytes.len())))?;
        Ok(KeyID(bytes))
    }
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn error_kinds() {
        assert_eq!(Error::MalformedPacket("x".into()).kind(),
                   ErrorKind::Format);
        assert_eq!(Error::MalformedArmor("x".into()).kind(),
                   ErrorKind::Armor);
        assert_eq!(Error::ManipulatedMessage.kind(), ErrorKind::Crypto);
        assert_eq!(Error::Cancelled.kind(), ErrorKind::Cancelled);

        let e: anyhow::Error = Error::ChecksumMismatch.into();
        assert_eq!(ErrorKind::of(&e), ErrorKind::Crypto);
        let e: anyhow::Error =
            std::io::Error::new(std::io::ErrorKind::Other, "io").into();
        assert_eq!(ErrorKind::of(&e), ErrorKind::Io);
    }

    #[test]
    fn keyid_from_fingerprint() {
        let fp = Fingerprint::from_bytes([
            0, 1, 2, 3, 4, 5, 6, 7, 8, 9,
            10, 11, 12, 13, 14, 15, 16, 17, 18, 19,
        ]);
        assert_eq!(fp.keyid().as_bytes(),
                   &[12, 13, 14, 15, 16, 17, 18, 19]);
    }
}
