use crate::Packet;

/// Holds a Symmetrically Encrypted Integrity Protected Data packet.
///
/// The body is a version octet followed by ciphertext; the decrypted
/// plaintext carries a trailing [MDC](super::MDC) packet (see [Section
/// 5.13 of RFC 4880]).  The ciphertext is streamed, not stored here.
///
///   [Section 5.13 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.13
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct SEIP {
    version: u8,
}

impl SEIP {
    pub(crate) fn new(version: u8) -> Self {
        SEIP { version }
    }

    /// Returns the version octet.  Always 1.
    pub fn version(&self) -> u8 {
        self.version
    }
}

impl Default for SEIP {
    fn default() -> Self {
        SEIP { version: 1 }
    }
}

impl From<SEIP> for Packet {
    fn from(p: SEIP) -> Self {
        Packet::SEIP(p)
    }
}

/// Holds a Symmetrically Encrypted Data packet.
///
/// The legacy encrypted data packet: no integrity protection, and the
/// CFB state resynchronizes after the random prefix (see [Section 5.7
/// of RFC 4880]).  The ciphertext is streamed, not stored here.
///
///   [Section 5.7 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.7
#[derive(PartialEq, Eq, Hash, Clone, Debug, Default)]
pub struct SED {}

impl From<SED> for Packet {
    fn from(p: SED) -> Self {
        Packet::SED(p)
    }
}
