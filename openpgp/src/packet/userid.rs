use std::fmt;

use crate::Packet;

/// Holds a User ID packet.
///
/// The body is a free-form UTF-8 string; by convention an [RFC 2822]
/// mail name-addr (see [Section 5.11 of RFC 4880]).
///
///   [RFC 2822]: https://tools.ietf.org/html/rfc2822
///   [Section 5.11 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.11
#[derive(PartialEq, Eq, Hash, Clone)]
pub struct UserID {
    value: Vec<u8>,
}

impl From<Vec<u8>> for UserID {
    fn from(u: Vec<u8>) -> Self {
        UserID { value: u }
    }
}

impl From<&str> for UserID {
    fn from(u: &str) -> Self {
        u.as_bytes().to_vec().into()
    }
}

impl fmt::Display for UserID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.value))
    }
}

impl fmt::Debug for UserID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("UserID")
            .field("value", &String::from_utf8_lossy(&self.value))
            .finish()
    }
}

impl UserID {
    /// Gets the user ID packet's value.
    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

impl From<UserID> for Packet {
    fn from(p: UserID) -> Self {
        Packet::UserID(p)
    }
}
