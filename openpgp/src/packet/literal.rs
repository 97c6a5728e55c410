use std::fmt;

use crate::types::DataFormat;
use crate::Error;
use crate::Packet;
use crate::Result;

/// Holds a Literal Data packet.
///
/// The packet frames the actual message data: a format octet, an
/// optional file name, a date, and the body (see [Section 5.9 of RFC
/// 4880]).  When parsing, the body is streamed to the consumer in
/// chunks; the body stored here is only populated when a packet is
/// accumulated or built for serialization.
///
///   [Section 5.9 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.9
#[derive(PartialEq, Eq, Hash, Clone)]
pub struct Literal {
    format: DataFormat,
    /// At most 255 octets.
    filename: Option<Vec<u8>>,
    /// The date of the message, seconds since the epoch, or 0.
    date: u32,
    body: Vec<u8>,
}

impl Literal {
    /// Creates a new literal data packet with an empty body.
    pub fn new(format: DataFormat) -> Self {
        Literal {
            format,
            filename: None,
            date: 0,
            body: Vec::new(),
        }
    }

    /// Returns the format octet.
    pub fn format(&self) -> DataFormat {
        self.format
    }

    /// Returns the file name, if any.
    pub fn filename(&self) -> Option<&[u8]> {
        self.filename.as_deref()
    }

    /// Sets the file name.
    ///
    /// The wire format limits file names to 255 octets.
    pub fn set_filename(mut self, filename: &[u8]) -> Result<Self> {
        if filename.len() > 255 {
            return Err(Error::InvalidArgument(
                format!("filename too long: {} octets", filename.len()))
                       .into());
        }
        self.filename = if filename.is_empty() {
            None
        } else {
            Some(filename.to_vec())
        };
        Ok(self)
    }

    /// Returns the date field.
    pub fn date(&self) -> u32 {
        self.date
    }

    /// Sets the date field.
    pub fn set_date(mut self, date: u32) -> Self {
        self.date = date;
        self
    }

    /// Returns the body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Sets the body.
    pub fn set_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub(crate) fn append_body(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let filename = self.filename.as_ref()
            .map(|f| String::from_utf8_lossy(f).into_owned());
        f.debug_struct("Literal")
            .field("format", &self.format)
            .field("filename", &filename)
            .field("date", &self.date)
            .field("body", &format!("{} bytes", self.body.len()))
            .finish()
    }
}

impl From<Literal> for Packet {
    fn from(p: Literal) -> Self {
        Packet::Literal(p)
    }
}
