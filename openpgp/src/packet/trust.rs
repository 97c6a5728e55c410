use crate::Packet;

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

/// Holds a Trust packet.
///
/// Trust packets carry implementation-local trust bookkeeping inside
/// keyring files; their content is not standardized and must not be
/// emitted to other implementations (see [Section 5.10 of RFC 4880]).
/// The pipeline does not interpret the body: it is carried from the
/// wire to the consumer, and back, untouched.
///
///   [Section 5.10 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.10
#[derive(PartialEq, Eq, Hash, Clone, Debug, Default)]
pub struct Trust(Vec<u8>);

impl Trust {
    /// Creates a trust packet with the given body.
    pub fn new(bytes: Vec<u8>) -> Self {
        Trust(bytes)
    }

    /// Returns the opaque body.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Trust> for Packet {
    fn from(p: Trust) -> Self {
        Packet::Trust(p)
    }
}

#[cfg(test)]
impl Arbitrary for Trust {
    fn arbitrary(g: &mut Gen) -> Self {
        Trust::new(Vec::<u8>::arbitrary(g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use crate::serialize::Serialize;

    quickcheck::quickcheck! {
        fn wire_roundtrip(p: Trust) -> bool {
            let mut o = Vec::new();
            Packet::Trust(p.clone()).serialize(&mut o).unwrap();

            let parsed = parse::packets(
                Box::new(layered_reader::Memory::new(&o))).unwrap();
            parsed == vec![Packet::Trust(p)]
        }
    }
}
