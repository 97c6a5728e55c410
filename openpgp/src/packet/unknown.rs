use crate::packet::Tag;
use crate::Packet;

/// Holds an unknown packet.
///
/// Either the tag itself is unknown, or the body failed to parse.  The
/// raw body is kept so that the packet can be stored or re-emitted
/// unchanged.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct Unknown {
    tag: Tag,
    body: Vec<u8>,
}

impl Unknown {
    /// Creates a new unknown packet.
    pub fn new(tag: Tag, body: Vec<u8>) -> Self {
        Unknown { tag, body }
    }

    /// Returns the packet's tag.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Returns the raw body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl From<Unknown> for Packet {
    fn from(p: Unknown) -> Self {
        Packet::Unknown(p)
    }
}
