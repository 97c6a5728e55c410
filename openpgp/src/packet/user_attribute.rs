use std::fmt;

use crate::Packet;

/// Holds a User Attribute packet.
///
/// The body is a sequence of attribute subpackets; only images are
/// standardized.  The content is kept opaque (see [Section 5.12 of RFC
/// 4880]).
///
///   [Section 5.12 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.12
#[derive(PartialEq, Eq, Hash, Clone)]
pub struct UserAttribute {
    value: Vec<u8>,
}

impl From<Vec<u8>> for UserAttribute {
    fn from(u: Vec<u8>) -> Self {
        UserAttribute { value: u }
    }
}

impl fmt::Debug for UserAttribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("UserAttribute")
            .field("value", &crate::fmt::to_hex(&self.value))
            .finish()
    }
}

impl UserAttribute {
    /// Gets the user attribute packet's value.
    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

impl From<UserAttribute> for Packet {
    fn from(p: UserAttribute) -> Self {
        Packet::UserAttribute(p)
    }
}
