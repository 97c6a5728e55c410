use crate::Packet;

/// Holds a Modification Detection Code packet.
///
/// The body is a SHA-1 digest over the plaintext of the enclosing
/// integrity protected data packet, including its prefix and this
/// packet's own header (see [Section 5.14 of RFC 4880]).
///
///   [Section 5.14 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.14
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct MDC {
    digest: [u8; 20],
}

impl MDC {
    /// Creates an MDC packet from a finalized hash.
    pub(crate) fn from_context(mut hash: crate::crypto::hash::Context)
                               -> Self {
        let mut digest = [0u8; 20];
        hash.digest(&mut digest);
        MDC { digest }
    }

    /// Returns the stored digest.
    pub fn digest(&self) -> &[u8] {
        &self.digest
    }
}

impl From<[u8; 20]> for MDC {
    fn from(digest: [u8; 20]) -> Self {
        MDC { digest }
    }
}

impl From<MDC> for Packet {
    fn from(p: MDC) -> Self {
        Packet::MDC(p)
    }
}
