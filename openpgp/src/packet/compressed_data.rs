use crate::types::CompressionAlgorithm;
use crate::Packet;

/// Holds a Compressed Data packet.
///
/// The body is itself a stream of packets; the parser decompresses and
/// recurses into it rather than buffering it here (see [Section 5.6 of
/// RFC 4880]).
///
///   [Section 5.6 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.6
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct CompressedData {
    algo: CompressionAlgorithm,
}

impl CompressedData {
    /// Creates a new compressed data packet.
    pub fn new(algo: CompressionAlgorithm) -> Self {
        CompressedData { algo }
    }

    /// Returns the compression algorithm.
    pub fn algo(&self) -> CompressionAlgorithm {
        self.algo
    }
}

impl From<CompressedData> for Packet {
    fn from(p: CompressedData) -> Self {
        Packet::CompressedData(p)
    }
}
