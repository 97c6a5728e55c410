//! ASCII Armor.
//!
//! This module deals with ASCII Armored data (see [Section 6 of RFC
//! 4880]): base64 under a framing header line, optional `Key: Value`
//! headers, and a CRC-24 checksum.  Multipart messages are not
//! supported.
//!
//!   [Section 6 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-6
//!
//! Both the reader and the writer allocate memory in the order of the
//! size of chunks read or written.

use std::cmp;
use std::fmt;
use std::io;
use std::io::{Read, Write};

use base64::engine::general_purpose::{
    STANDARD as BASE64, STANDARD_NO_PAD as BASE64_NO_PAD,
};
use base64::Engine as _;

use layered_reader::BufferedReader;

/// The encoded output stream must be represented in lines of no more
/// than 76 characters each (see [RFC 4880, section 6.3]).  GnuPG uses
/// 64.
///
///   [RFC 4880, section 6.3]: https://tools.ietf.org/html/rfc4880#section-6.3
pub(crate) const LINE_LENGTH: usize = 64;

const LINE_ENDING: &str = "\n";

/// Specifies the type of data (see [RFC 4880, section 6.2]).
///
/// [RFC 4880, section 6.2]: https://tools.ietf.org/html/rfc4880#section-6.2
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    /// A generic OpenPGP message: a sequence of packets.
    Message,
    /// A public key or a sequence of public key packets.
    PublicKey,
    /// A secret key or a sequence of secret key packets.
    SecretKey,
    /// A detached signature.
    Signature,
}

#[cfg(test)]
impl quickcheck::Arbitrary for Kind {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        use self::Kind::*;
        *g.choose(&[Message, PublicKey, SecretKey, Signature]).unwrap()
    }
}

impl Kind {
    fn blurb(&self) -> &str {
        match self {
            Kind::Message => "MESSAGE",
            Kind::PublicKey => "PUBLIC KEY BLOCK",
            Kind::SecretKey => "PRIVATE KEY BLOCK",
            Kind::Signature => "SIGNATURE",
        }
    }

    /// Returns the appropriate header line.
    pub fn begin(&self) -> String {
        format!("-----BEGIN PGP {}-----", self.blurb())
    }

    /// Returns the appropriate footer line.
    pub fn end(&self) -> String {
        format!("-----END PGP {}-----", self.blurb())
    }

    /// Detects the kind from a header line.
    pub(crate) fn detect_header(line: &str) -> Option<Self> {
        let rest = line.strip_prefix("-----BEGIN PGP ")?;
        let blurb = rest.strip_suffix("-----")?;
        Self::from_blurb(blurb)
    }

    /// Detects the kind from a footer line.
    pub(crate) fn detect_footer(line: &str) -> Option<Self> {
        let rest = line.strip_prefix("-----END PGP ")?;
        let blurb = rest.strip_suffix("-----")?;
        Self::from_blurb(blurb)
    }

    fn from_blurb(blurb: &str) -> Option<Self> {
        match blurb {
            "MESSAGE" => Some(Kind::Message),
            "PUBLIC KEY BLOCK" => Some(Kind::PublicKey),
            "PRIVATE KEY BLOCK" => Some(Kind::SecretKey),
            "SIGNATURE" => Some(Kind::Signature),
            _ => None,
        }
    }
}

/// A filter that applies ASCII Armor to the data written to it.
pub struct Writer<W: Write> {
    sink: W,
    kind: Kind,
    stash: Vec<u8>,
    column: usize,
    crc: CRC,
    header: Vec<u8>,
    dirty: bool,
}

impl<W: Write> Writer<W> {
    /// Constructs a new filter for the given type of data.
    pub fn new(inner: W, kind: Kind) -> io::Result<Self> {
        Self::with_headers(inner, kind, Option::<(&str, &str)>::None)
    }

    /// Constructs a new filter with additional `Key: Value` headers.
    pub fn with_headers<I, K, V>(inner: W, kind: Kind, headers: I)
                                 -> io::Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut w = Writer {
            sink: inner,
            kind,
            stash: Vec::<u8>::with_capacity(2),
            column: 0,
            crc: CRC::new(),
            header: Vec::with_capacity(128),
            dirty: false,
        };

        {
            let mut cur = io::Cursor::new(&mut w.header);
            write!(&mut cur, "{}{}", kind.begin(), LINE_ENDING)?;

            for h in headers {
                write!(&mut cur, "{}: {}{}", h.0.as_ref(), h.1.as_ref(),
                       LINE_ENDING)?;
            }

            // A blank line separates the headers from the body.
            write!(&mut cur, "{}", LINE_ENDING)?;
        }

        Ok(w)
    }

    /// Returns a reference to the inner writer.
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Returns a mutable reference to the inner writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    fn finalize_headers(&mut self) -> io::Result<()> {
        if !self.dirty {
            self.dirty = true;
            self.sink.write_all(&self.header)?;
            self.header = Vec::new();
        }
        Ok(())
    }

    /// Writes the checksum and footer, returning the sink.
    ///
    /// This must be called explicitly before the writer is dropped.
    pub fn finalize(mut self) -> io::Result<W> {
        if !self.dirty {
            // No data was written to us, don't emit anything.
            return Ok(self.sink);
        }
        self.finalize_armor()?;
        Ok(self.sink)
    }

    fn finalize_armor(&mut self) -> io::Result<()> {
        self.finalize_headers()?;

        // Write any stashed bytes, padded.
        if !self.stash.is_empty() {
            self.sink.write_all(BASE64.encode(&self.stash).as_bytes())?;
            self.column += 4;
        }

        assert!(self.column <= LINE_LENGTH);
        if self.column > 0 {
            write!(self.sink, "{}", LINE_ENDING)?;
        }

        // 24-bit CRC.
        let crc = self.crc.finalize();
        let bytes = &crc.to_be_bytes()[1..4];

        // CRC and footer.
        write!(self.sink, "={}{}{}{}",
               BASE64_NO_PAD.encode(bytes),
               LINE_ENDING, self.kind.end(), LINE_ENDING)?;

        self.dirty = false;
        Ok(())
    }

    /// Inserts a line break if necessary.
    fn linebreak(&mut self) -> io::Result<()> {
        assert!(self.column <= LINE_LENGTH);
        if self.column == LINE_LENGTH {
            write!(self.sink, "{}", LINE_ENDING)?;
            self.column = 0;
        }
        Ok(())
    }
}

impl<W: Write> Write for Writer<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.finalize_headers()?;

        // Update the CRC on the unencoded data.
        self.crc.update(buf);

        let mut input = buf;
        let mut written = 0;

        // First, fill and flush the stash, if any.
        assert!(self.stash.len() <= 3);
        if !self.stash.is_empty() {
            while self.stash.len() < 3 {
                if input.is_empty() {
                    // We exhausted the input.  Any stashed bytes are
                    // encoded when finalizing the writer.
                    return Ok(written);
                }
                self.stash.push(input[0]);
                input = &input[1..];
                written += 1;
            }

            self.sink.write_all(
                BASE64_NO_PAD.encode(&self.stash).as_bytes())?;
            self.column += 4;
            self.linebreak()?;
            self.stash.clear();
        }

        // Ensure that a multiple of 3 bytes is encoded, stash the
        // rest from the end of the input.
        while input.len() % 3 > 0 {
            self.stash.push(input[input.len() - 1]);
            input = &input[..input.len() - 1];
            written += 1;
        }
        // We popped values from the end of the input, fix the order.
        self.stash.reverse();
        assert!(self.stash.len() < 3);

        // Encode the whole blocks and fold them into lines.
        assert!(input.len() % 3 == 0);
        let encoded = BASE64_NO_PAD.encode(input);
        written += input.len();
        let mut enc = encoded.as_bytes();
        while !enc.is_empty() {
            let n = cmp::min(LINE_LENGTH - self.column, enc.len());
            self.sink.write_all(&enc[..n])?;
            enc = &enc[n..];
            self.column += n;
            self.linebreak()?;
        }

        assert_eq!(written, buf.len());
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

fn armor_error(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData,
                   crate::Error::MalformedArmor(msg.into()))
}

/// A filter that strips ASCII Armor from a stream of data.
///
/// The reader requires an intact armor frame: the header line (of the
/// expected kind, if one is given), a matching footer, and a valid
/// CRC-24 if a checksum line is present.
pub struct Reader<'a> {
    reader: layered_reader::Generic<IoReader<'a>>,
}

impl<'a> fmt::Debug for Reader<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("armor::Reader")
            .field("reader", self.reader.reader_ref())
            .finish()
    }
}

struct IoReader<'a> {
    source: Box<dyn BufferedReader + 'a>,
    expected: Option<Kind>,
    kind: Option<Kind>,
    buffer: Vec<u8>,
    // Base64 characters seen but not yet decoded; fewer than 4, or a
    // final padded group.
    pending: String,
    data_end: bool,
    crc: CRC,
    expect_crc: Option<u32>,
    headers: Vec<(String, String)>,
    initialized: bool,
    finalized: bool,
}

impl<'a> fmt::Debug for IoReader<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("armor::IoReader")
            .field("kind", &self.kind)
            .field("initialized", &self.initialized)
            .field("finalized", &self.finalized)
            .finish()
    }
}

impl<'a> Reader<'a> {
    /// Constructs a new filter for the given type of data.
    ///
    /// If `kind` is `None`, any of the known block types is accepted.
    pub fn new<R, K>(inner: R, kind: K) -> Self
    where
        R: io::Read + 'a,
        K: Into<Option<Kind>>,
    {
        Self::from_buffered_reader(
            Box::new(layered_reader::Generic::new(inner, None)), kind)
    }

    /// Creates a `Reader` from a buffer.
    pub fn from_bytes<K>(bytes: &'a [u8], kind: K) -> Self
    where
        K: Into<Option<Kind>>,
    {
        Self::from_buffered_reader(
            Box::new(layered_reader::Memory::new(bytes)), kind)
    }

    /// Creates a `Reader` from a `BufferedReader`.
    pub fn from_buffered_reader<K>(
        inner: Box<dyn BufferedReader + 'a>, kind: K) -> Self
    where
        K: Into<Option<Kind>>,
    {
        let io_reader = IoReader {
            source: inner,
            expected: kind.into(),
            kind: None,
            buffer: Vec::with_capacity(1024),
            pending: String::new(),
            data_end: false,
            crc: CRC::new(),
            expect_crc: None,
            headers: Vec::new(),
            initialized: false,
            finalized: false,
        };

        Reader {
            reader: layered_reader::Generic::new(io_reader, None),
        }
    }

    /// Returns the kind of data this reader is for.
    ///
    /// Returns `None` if the header has not been encountered yet; try
    /// reading some data first.
    pub fn kind(&self) -> Option<Kind> {
        self.reader.reader_ref().kind
    }

    /// Returns the armor headers.
    ///
    /// Each tuple is a key and a value; repeated keys are not
    /// combined.
    pub fn headers(&mut self) -> io::Result<&[(String, String)]> {
        self.reader.reader_mut().initialize()?;
        Ok(&self.reader.reader_ref().headers[..])
    }
}

impl<'a> IoReader<'a> {
    /// Reads the next line, without its line ending.  `None` on EOF.
    fn next_line(&mut self) -> io::Result<Option<String>> {
        let line = self.source.read_to(b'\n')?;
        if line.is_empty() {
            return Ok(None);
        }
        let n = line.len();
        let line = std::str::from_utf8(line)
            .map_err(|_| armor_error("armor is not valid UTF-8"))?
            .trim_end_matches(|c| c == '\r' || c == '\n')
            .to_string();
        self.source.consume(n);
        Ok(Some(line))
    }

    /// Consumes the header line and the `Key: Value` headers.
    fn initialize(&mut self) -> io::Result<()> {
        if self.initialized {
            return Ok(());
        }

        // Find the armor header line, skipping leading blank lines.
        loop {
            let line = self.next_line()?.ok_or_else(
                || armor_error("reached EOF looking for the armor \
                                header line"))?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let kind = Kind::detect_header(trimmed).ok_or_else(
                || armor_error(format!("expected an armor header line, \
                                        got {:?}", trimmed)))?;
            if let Some(expected) = self.expected {
                if kind != expected {
                    return Err(armor_error(format!(
                        "expected a {:?} block, got {:?}",
                        expected, kind)));
                }
            }
            self.kind = Some(kind);
            break;
        }

        // Key-value headers up to the separating blank line.
        loop {
            let line = self.next_line()?.ok_or_else(
                || armor_error("EOF in armor headers"))?;
            if line.trim().is_empty() {
                break;
            }

            match line.split_once(": ") {
                Some((key, value)) => self.headers.push(
                    (key.trim_start().to_string(), value.to_string())),
                None => return Err(armor_error(format!(
                    "expected a Key: Value header, got {:?}", line))),
            }
        }

        self.initialized = true;
        Ok(())
    }

    /// Decodes complete base64 groups from `self.pending`.
    fn decode_pending(&mut self, and_padding: bool) -> io::Result<()> {
        let take = if and_padding {
            self.pending.len()
        } else {
            self.pending.len() / 4 * 4
        };
        if take == 0 {
            return Ok(());
        }

        let chunk: String = self.pending.drain(..take).collect();
        let decoded = BASE64.decode(chunk.as_bytes())
            .map_err(|e| armor_error(format!("bad base64 data: {}", e)))?;
        self.crc.update(&decoded);
        self.buffer.extend_from_slice(&decoded);
        Ok(())
    }

    /// Processes one line of the armor body.
    fn process_line(&mut self) -> io::Result<()> {
        let line = self.next_line()?.ok_or_else(
            || armor_error("EOF before the armor footer"))?;
        let line = line.trim();

        if let Some(kind) = self.kind {
            if let Some(footer_kind) = Kind::detect_footer(line) {
                if footer_kind != kind {
                    return Err(armor_error(format!(
                        "footer does not match the header: {:?} vs {:?}",
                        kind, footer_kind)));
                }
                self.decode_pending(true)?;
                if let Some(expect) = self.expect_crc {
                    if self.crc.finalize() != expect {
                        return Err(armor_error("bad CRC sum"));
                    }
                }
                self.finalized = true;
                return Ok(());
            }
        }

        // The optional checksum line: '=' and four base64 characters.
        if let Some(crc) = line.strip_prefix('=') {
            if self.expect_crc.is_some() {
                return Err(armor_error("repeated checksum line"));
            }
            if self.pending.len() % 4 != 0 {
                return Err(armor_error("truncated base64 data"));
            }
            self.decode_pending(false)?;

            let crc = BASE64.decode(crc.as_bytes())
                .map_err(|e| armor_error(format!("bad CRC line: {}", e)))?;
            if crc.len() != 3 {
                return Err(armor_error("bad CRC line"));
            }
            self.expect_crc = Some(
                (crc[0] as u32) << 16 | (crc[1] as u32) << 8
                    | crc[2] as u32);
            self.data_end = true;
            return Ok(());
        }

        if self.data_end {
            return Err(armor_error("data after the armor body ended"));
        }

        for c in line.chars() {
            if c.is_ascii_whitespace() {
                continue;
            }
            if !(c.is_ascii_alphanumeric() || c == '+' || c == '/'
                 || c == '=') {
                return Err(armor_error(format!(
                    "invalid base64 character {:?}", c)));
            }
            self.pending.push(c);
            if c == '=' {
                self.data_end = true;
            }
        }

        if !self.data_end {
            // Keep at most a partial group pending.
            self.decode_pending(false)?;
        }
        Ok(())
    }
}

impl<'a> Read for IoReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.initialized {
            self.initialize()?;
        }

        if buf.is_empty() {
            return Ok(0);
        }

        while self.buffer.is_empty() && !self.finalized {
            self.process_line()?;
        }

        let n = cmp::min(buf.len(), self.buffer.len());
        buf[..n].copy_from_slice(&self.buffer[..n]);
        self.buffer.drain(..n);
        Ok(n)
    }
}

impl<'a> Read for Reader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl<'a> BufferedReader for Reader<'a> {
    fn buffer(&self) -> &[u8] {
        self.reader.buffer()
    }

    fn data(&mut self, amount: usize) -> io::Result<&[u8]> {
        self.reader.data(amount)
    }

    fn consume(&mut self, amount: usize) -> &[u8] {
        self.reader.consume(amount)
    }

    fn data_consume(&mut self, amount: usize) -> io::Result<&[u8]> {
        self.reader.data_consume(amount)
    }

    fn data_consume_hard(&mut self, amount: usize) -> io::Result<&[u8]> {
        self.reader.data_consume_hard(amount)
    }

    fn get_mut(&mut self) -> Option<&mut dyn BufferedReader> {
        Some(&mut self.reader.reader_mut().source)
    }

    fn get_ref(&self) -> Option<&dyn BufferedReader> {
        Some(&self.reader.reader_ref().source)
    }

    fn into_inner<'b>(self: Box<Self>)
                      -> Option<Box<dyn BufferedReader + 'b>>
        where Self: 'b
    {
        Some(self.reader.into_reader().source)
    }
}

const CRC24_INIT: u32 = 0xB704CE;
const CRC24_POLY: u32 = 0x1864CFB;

/// Computes the CRC-24, (see [RFC 4880, section 6.1]).
///
/// [RFC 4880, section 6.1]: https://tools.ietf.org/html/rfc4880#section-6.1
#[derive(Debug)]
pub(crate) struct CRC {
    n: u32,
}

impl CRC {
    pub(crate) fn new() -> Self {
        CRC { n: CRC24_INIT }
    }

    pub(crate) fn update(&mut self, buf: &[u8]) -> &Self {
        for octet in buf {
            self.n ^= (*octet as u32) << 16;
            for _ in 0..8 {
                self.n <<= 1;
                if self.n & 0x1000000 > 0 {
                    self.n ^= CRC24_POLY;
                }
            }
        }
        self
    }

    pub(crate) fn finalize(&self) -> u32 {
        self.n & 0xFFFFFF
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn crc() {
        let b = b"foobarbaz";
        let crcs = [
            0xb704ce,
            0x6d2804,
            0xa2d10d,
            0x4fc255,
            0x7aafca,
            0xc79c46,
            0x7334de,
            0x77dc72,
            0x000f65,
            0xf40d86,
        ];

        for len in 0..b.len() + 1 {
            assert_eq!(CRC::new().update(&b[..len]).finalize(), crcs[len]);
        }
    }

    #[test]
    fn enarmor_empty() {
        let mut w = Writer::new(Vec::new(), Kind::Message).unwrap();
        w.write(&[]).unwrap();
        let buf = w.finalize().unwrap();
        assert_eq!(
            &buf[..],
            &b"-----BEGIN PGP MESSAGE-----\n\
               \n\
               =twTO\n\
               -----END PGP MESSAGE-----\n"[..]);
    }

    #[test]
    fn drop_writer_unused() {
        // No armor frame shall be emitted if the writer was never
        // written to.
        assert!(Writer::new(Vec::new(), Kind::Message).unwrap()
                .finalize().unwrap().is_empty());
    }

    #[test]
    fn enarmor_known_vector() {
        let mut w = Writer::new(Vec::new(), Kind::Message).unwrap();
        w.write_all(b"Hello world!").unwrap();
        let buf = w.finalize().unwrap();
        assert_eq!(String::from_utf8_lossy(&buf),
                   "-----BEGIN PGP MESSAGE-----\n\
                    \n\
                    SGVsbG8gd29ybGQh\n\
                    =s4Gu\n\
                    -----END PGP MESSAGE-----\n");
    }

    #[test]
    fn roundtrip() {
        for size in [0usize, 1, 2, 3, 47, 48, 49, 64, 65, 1000] {
            let data: Vec<u8> = (0..size).map(|i| (i % 256) as u8)
                .collect();

            let mut w = Writer::with_headers(
                Vec::new(), Kind::Message,
                vec![("Comment", "roundtrip test")]).unwrap();
            w.write_all(&data).unwrap();
            // Force a frame even for the empty message.
            if data.is_empty() {
                w.write(&[]).unwrap();
            }
            let armored = w.finalize().unwrap();

            let mut r = Reader::new(io::Cursor::new(&armored),
                                    Kind::Message);
            let mut dearmored = Vec::new();
            r.read_to_end(&mut dearmored).unwrap();
            assert_eq!(dearmored, data, "size {}", size);
            assert_eq!(r.kind(), Some(Kind::Message));
        }
    }

    #[test]
    fn roundtrip_bytewise() {
        let data: Vec<u8> = (0..300usize).map(|i| (i % 256) as u8)
            .collect();

        let mut w = Writer::new(Vec::new(), Kind::Signature).unwrap();
        for b in &data {
            w.write(std::slice::from_ref(b)).unwrap();
        }
        let armored = w.finalize().unwrap();

        let mut r = Reader::new(io::Cursor::new(&armored),
                                Kind::Signature);
        let mut dearmored = Vec::new();
        r.read_to_end(&mut dearmored).unwrap();
        assert_eq!(dearmored, data);
    }

    #[test]
    fn dearmor_headers() {
        let input = "-----BEGIN PGP MESSAGE-----\n\
                     Version: test\n\
                     Comment: two headers\n\
                     \n\
                     SGVsbG8gd29ybGQh\n\
                     =s4Gu\n\
                     -----END PGP MESSAGE-----\n";
        let mut r = Reader::new(io::Cursor::new(input), None);
        assert_eq!(r.headers().unwrap(),
                   &[("Version".to_string(), "test".to_string()),
                     ("Comment".to_string(), "two headers".to_string())]);
        let mut content = String::new();
        r.read_to_string(&mut content).unwrap();
        assert_eq!(content, "Hello world!");
    }

    #[test]
    fn dearmor_wrong_kind() {
        let input = "-----BEGIN PGP SIGNATURE-----\n\
                     \n\
                     SGVsbG8gd29ybGQh\n\
                     =s4Gu\n\
                     -----END PGP SIGNATURE-----\n";
        let mut r = Reader::new(io::Cursor::new(input), Kind::Message);
        let mut buf = [0; 5];
        assert!(r.read(&mut buf).is_err());
    }

    #[test]
    fn dearmor_wrong_crc() {
        let input = "-----BEGIN PGP MESSAGE-----\n\
                     \n\
                     SGVsbG8gd29ybGQh\n\
                     =s4Gv\n\
                     -----END PGP MESSAGE-----\n";
        let mut r = Reader::new(io::Cursor::new(input), Kind::Message);
        let mut buf = Vec::new();
        assert!(r.read_to_end(&mut buf).is_err());
    }

    #[test]
    fn dearmor_mismatched_footer() {
        let input = "-----BEGIN PGP MESSAGE-----\n\
                     \n\
                     SGVsbG8gd29ybGQh\n\
                     =s4Gu\n\
                     -----END PGP SIGNATURE-----\n";
        let mut r = Reader::new(io::Cursor::new(input), None);
        let mut buf = Vec::new();
        assert!(r.read_to_end(&mut buf).is_err());
    }

    #[test]
    fn dearmor_binary_junk() {
        let mut r = Reader::new(
            io::Cursor::new(&b"\x8c\x0d\x04\x03"[..]), Kind::Message);
        let mut buf = [0; 5];
        assert!(r.read(&mut buf).is_err());
    }
}
