use crate::Packet;

/// Holds a Marker packet.
///
/// The body is the literal string `PGP`; the packet must be ignored
/// when received (see [Section 5.8 of RFC 4880]).
///
///   [Section 5.8 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.8
#[derive(PartialEq, Eq, Hash, Clone, Debug, Default)]
pub struct Marker {}

impl Marker {
    /// The body of a marker packet.
    pub const BODY: &'static [u8] = b"PGP";
}

impl From<Marker> for Packet {
    fn from(p: Marker) -> Self {
        Packet::Marker(p)
    }
}
