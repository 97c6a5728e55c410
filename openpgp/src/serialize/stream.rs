//! Streaming packet serialization.
//!
//! Messages are composed by stacking writers in front of a sink: an
//! [`Armorer`], an [`Encryptor`], a [`Compressor`], a [`Signer`], and
//! finally a [`LiteralWriter`] for the data itself.  Finalizing the
//! top of the stack with [`Stackable::into_inner`] unwinds one layer;
//! each layer flushes its framing when it is popped, so a stack must
//! be unwound in LIFO order.

use std::fmt;
use std::io::{self, Write};

use crate::armor;
use crate::cleartext;
use crate::cleartext::CanonicalHasher;
use crate::crypto::hash;
use crate::crypto::s2k::S2K;
use crate::crypto::{Password, SessionKey};
use crate::packet::signature::{DocumentHasher, SignatureBuilder};
use crate::packet::{BodyLength, CTB, Key, Literal, OnePassSig,
                    SecretKey, Tag, MDC, PKESK, SKESK};
use crate::types::{CompressionAlgorithm, DataFormat, HashAlgorithm,
                   SignatureType, SymmetricAlgorithm};
use crate::Error;
use crate::Result;

use super::partial_body::PartialBodyFilter;
use super::writer;
pub use super::writer::Stackable;

/// The streaming writers' cookie.
///
/// Tracks the nesting level, and marks the layers the stack machinery
/// must recognize while (un)winding.
#[derive(Debug)]
pub struct Cookie {
    level: usize,
    private: Private,
}

#[derive(Debug)]
enum Private {
    Nothing,
    Signer,
}

impl Cookie {
    fn new(level: usize) -> Self {
        Cookie {
            level,
            private: Private::Nothing,
        }
    }
}

/// A stack of streaming writers.
pub type Stack<'a> = writer::Stack<'a, Cookie>;

/// Wraps a `std::io::Write`r for use with the streaming subsystem.
pub fn wrap<'a, W: 'a + io::Write>(w: W) -> Stack<'a> {
    writer::Generic::new(w, Cookie::new(0))
}

/// Writes an arbitrary packet.
///
/// This writer can be used to construct arbitrary OpenPGP packets:
/// the tag is given up front, the body is whatever is written.  The
/// body is framed with partial length encoding, or a definite length
/// if it is short.
///
/// # Examples
///
/// ```
/// use openpgp_sdk::packet::Tag;
/// use openpgp_sdk::serialize::stream::{wrap, ArbitraryWriter, Stackable};
/// # use openpgp_sdk::Result;
/// # fn main() -> Result<()> {
/// let mut o = vec![];
/// {
///     let mut w = ArbitraryWriter::new(wrap(&mut o), Tag::Literal)?;
///     use std::io::Write;
///     w.write_all(b"t")?;                   // format
///     w.write_all(b"\x00")?;                // filename length
///     w.write_all(b"\x00\x00\x00\x00")?;    // date
///     w.write_all(b"Hello world.")?;        // body
///     Box::new(w).into_inner()?;
/// }
/// assert_eq!(b"\xcb\x12t\x00\x00\x00\x00\x00Hello world.", o.as_slice());
/// # Ok(())
/// # }
/// ```
pub struct ArbitraryWriter<'a> {
    inner: Stack<'a>,
}

impl<'a> ArbitraryWriter<'a> {
    /// Creates a new writer with the given tag.
    pub fn new(mut inner: Stack<'a>, tag: Tag) -> Result<Stack<'a>> {
        use crate::serialize::Serialize;
        let level = inner.cookie_ref().level + 1;
        CTB::new(tag).serialize(&mut inner)?;
        Ok(Box::new(ArbitraryWriter {
            inner: PartialBodyFilter::new(inner, Cookie::new(level)),
        }))
    }
}

impl<'a> fmt::Debug for ArbitraryWriter<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ArbitraryWriter")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<'a> Write for ArbitraryWriter<'a> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<'a> Stackable<'a, Cookie> for ArbitraryWriter<'a> {
    fn into_inner(self: Box<Self>) -> Result<Option<Stack<'a>>> {
        // Pop the partial body filter as well.
        Box::new(self.inner).into_inner()
    }

    fn pop(&mut self) -> Result<Option<Stack<'a>>> {
        Err(Error::InvalidOperation(
            "an arbitrary writer must be finalized, not popped"
                .into()).into())
    }

    fn mount(&mut self, _new: Stack<'a>) {
    }

    fn inner_ref(&self) -> Option<&dyn Stackable<'a, Cookie>> {
        self.inner.inner_ref()
    }

    fn inner_mut(&mut self) -> Option<&mut dyn Stackable<'a, Cookie>> {
        self.inner.inner_mut()
    }

    fn cookie_set(&mut self, cookie: Cookie) -> Cookie {
        self.inner.cookie_set(cookie)
    }

    fn cookie_ref(&self) -> &Cookie {
        self.inner.cookie_ref()
    }

    fn cookie_mut(&mut self) -> &mut Cookie {
        self.inner.cookie_mut()
    }
}

/// Signs a packet stream.
///
/// Writes a one-pass signature packet, tees the data stream into the
/// signature hash, and emits the matching signature packet when it is
/// popped off the stack.
pub struct Signer<'a> {
    // The underlying writer.
    //
    // Because this writer implements `Drop`, we cannot move the inner
    // writer out of it; it is wrapped in an `Option` so that it can be
    // `take()`n.
    //
    // Furthermore, the LiteralWriter will pop us off the stack, and
    // take our inner writer.  When that happens, only the hash is
    // updated.
    inner: Option<Stack<'a>>,
    builder: Option<SignatureBuilder>,
    signer_key: &'a SecretKey,
    hasher: Option<DocumentHasher>,
    cookie: Cookie,
}

impl<'a> Signer<'a> {
    /// Creates a signing writer.
    ///
    /// The one-pass signature packet announcing `signer_key` goes out
    /// immediately; the signature itself follows the data.
    pub fn new(mut inner: Stack<'a>, builder: SignatureBuilder,
               signer_key: &'a SecretKey) -> Result<Stack<'a>> {
        use crate::serialize::Serialize;

        let ops = OnePassSig::new(builder.sigtype())
            .set_hash_algo(builder.hash_algo())
            .set_pk_algo(signer_key.public().pk_algo())
            .set_issuer(signer_key.public().keyid()?)
            .set_last(true);
        ops.serialize(&mut inner)?;

        let hasher = DocumentHasher::new(
            builder.hash_algo().context()?,
            builder.sigtype() == SignatureType::Text);

        let level = inner.cookie_ref().level + 1;
        Ok(Box::new(Signer {
            inner: Some(inner),
            builder: Some(builder),
            signer_key,
            hasher: Some(hasher),
            cookie: Cookie {
                level,
                private: Private::Signer,
            },
        }))
    }

    fn emit_signature(&mut self) -> Result<()> {
        use crate::serialize::Serialize;

        if let (Some(builder), Some(hasher))
            = (self.builder.take(), self.hasher.take())
        {
            let sig = builder.sign_hash(self.signer_key,
                                        hasher.into_context())?;
            if let Some(w) = self.inner.as_mut() {
                sig.serialize(w)?;
            }
        }
        Ok(())
    }
}

impl<'a> Drop for Signer<'a> {
    fn drop(&mut self) {
        let _ = self.emit_signature();
    }
}

impl<'a> fmt::Debug for Signer<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Signer")
            .field("inner", &self.inner)
            .field("cookie", &self.cookie)
            .finish()
    }
}

impl<'a> Write for Signer<'a> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = match self.inner.as_mut() {
            Some(w) => w.write(buf),
            // When popped off the stack, we have no inner writer;
            // just hash the bytes.
            None => Ok(buf.len()),
        };

        if let Ok(amount) = written {
            if let Some(hasher) = self.hasher.as_mut() {
                hasher.update(&buf[..amount]);
            }
        }

        written
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_mut() {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> Stackable<'a, Cookie> for Signer<'a> {
    fn pop(&mut self) -> Result<Option<Stack<'a>>> {
        Ok(self.inner.take())
    }

    fn mount(&mut self, new: Stack<'a>) {
        self.inner = Some(new);
    }

    fn inner_mut(&mut self) -> Option<&mut dyn Stackable<'a, Cookie>> {
        self.inner.as_mut().map(|r| r as &mut dyn Stackable<'a, Cookie>)
    }

    fn inner_ref(&self) -> Option<&dyn Stackable<'a, Cookie>> {
        self.inner.as_ref().map(|r| r as &dyn Stackable<'a, Cookie>)
    }

    fn into_inner(mut self: Box<Self>) -> Result<Option<Stack<'a>>> {
        self.emit_signature()?;
        Ok(self.inner.take())
    }

    fn cookie_set(&mut self, cookie: Cookie) -> Cookie {
        std::mem::replace(&mut self.cookie, cookie)
    }

    fn cookie_ref(&self) -> &Cookie {
        &self.cookie
    }

    fn cookie_mut(&mut self) -> &mut Cookie {
        &mut self.cookie
    }
}

/// Writes a literal data packet.
///
/// The body is written using partial length encoding, or a definite
/// length if it is short.
pub struct LiteralWriter<'a> {
    inner: Stack<'a>,
    signature_writer: Option<Stack<'a>>,
}

impl<'a> LiteralWriter<'a> {
    /// Creates a new literal writer.
    pub fn new(mut inner: Stack<'a>, format: DataFormat,
               filename: Option<&[u8]>, date: u32) -> Result<Stack<'a>> {
        use crate::serialize::Serialize;

        let level = inner.cookie_ref().level + 1;

        let mut template = Literal::new(format).set_date(date);
        if let Some(f) = filename {
            template = template.set_filename(f)?;
        }

        // For historical reasons, signatures over literal data
        // packets only cover the body without metadata or framing.
        // Therefore, check whether the layer above is a signer, and if
        // so, pop it off the stack and stash it; body writes are teed
        // into it.
        let signer_above = matches!(
            inner.cookie_ref(),
            Cookie { private: Private::Signer, .. });

        let mut signature_writer = None;
        if signer_above {
            let stack = inner.pop()?
                .expect("a signer has an inner writer");
            signature_writer = Some(inner);
            inner = stack;
        }

        // Not hashed by the signature writer (see above).
        CTB::new(Tag::Literal).serialize(&mut inner)?;

        // Neither is any framing added by the partial body filter.
        let mut inner = PartialBodyFilter::new(inner, Cookie::new(level));

        // Nor the headers.
        template.serialize_headers(&mut inner)?;

        Ok(Box::new(Self {
            inner,
            signature_writer,
        }))
    }
}

impl<'a> fmt::Debug for LiteralWriter<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LiteralWriter")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<'a> Write for LiteralWriter<'a> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf);

        // Any successfully written bytes are hashed too.
        if let (Ok(amount), Some(sig))
            = (&written, self.signature_writer.as_mut())
        {
            sig.write_all(&buf[..*amount])?;
        }
        written
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<'a> Stackable<'a, Cookie> for LiteralWriter<'a> {
    fn into_inner(mut self: Box<Self>) -> Result<Option<Stack<'a>>> {
        let signer = self.signature_writer.take();
        let stack = self.inner
            .into_inner()? // Pop the PartialBodyFilter.
            .expect("the filter has an inner writer");

        if let Some(mut signer) = signer {
            // We stashed away a Signer.  Reattach it to the stack and
            // return it.
            signer.mount(stack);
            Ok(Some(signer))
        } else {
            Ok(Some(stack))
        }
    }

    fn pop(&mut self) -> Result<Option<Stack<'a>>> {
        Err(Error::InvalidOperation(
            "a literal writer must be finalized, not popped"
                .into()).into())
    }

    fn mount(&mut self, _new: Stack<'a>) {
    }

    fn inner_ref(&self) -> Option<&dyn Stackable<'a, Cookie>> {
        self.inner.inner_ref()
    }

    fn inner_mut(&mut self) -> Option<&mut dyn Stackable<'a, Cookie>> {
        self.inner.inner_mut()
    }

    fn cookie_set(&mut self, cookie: Cookie) -> Cookie {
        self.inner.cookie_set(cookie)
    }

    fn cookie_ref(&self) -> &Cookie {
        self.inner.cookie_ref()
    }

    fn cookie_mut(&mut self) -> &mut Cookie {
        self.inner.cookie_mut()
    }
}

/// Compresses a packet stream.
///
/// Writes a compressed data packet containing all packets written to
/// this writer.
pub struct Compressor<'a> {
    inner: Stack<'a>,
}

impl<'a> Compressor<'a> {
    /// Creates a new compressor using the given algorithm.
    pub fn new(mut inner: Stack<'a>, algo: CompressionAlgorithm)
               -> Result<Stack<'a>> {
        use crate::serialize::Serialize;

        let level = inner.cookie_ref().level + 1;

        // Packet header.
        CTB::new(Tag::CompressedData).serialize(&mut inner)?;

        let mut inner: Stack<'a>
            = PartialBodyFilter::new(inner, Cookie::new(level));

        // Compressed data header.
        inner.write_all(&[algo.into()])?;

        // Create an appropriate filter.
        let inner: Stack<'a> = match algo {
            CompressionAlgorithm::Uncompressed =>
                writer::Identity::new(inner, Cookie::new(level)),
            CompressionAlgorithm::Zip =>
                writer::ZIP::new(inner, Cookie::new(level)),
            CompressionAlgorithm::Zlib =>
                writer::ZLIB::new(inner, Cookie::new(level)),
            CompressionAlgorithm::BZip2 =>
                writer::BZ::new(inner, Cookie::new(level)),
            _ => return Err(
                Error::UnsupportedCompressionAlgorithm(algo).into()),
        };

        Ok(Box::new(Self { inner }))
    }
}

impl<'a> fmt::Debug for Compressor<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Compressor")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<'a> Write for Compressor<'a> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<'a> Stackable<'a, Cookie> for Compressor<'a> {
    fn into_inner(self: Box<Self>) -> Result<Option<Stack<'a>>> {
        // Pop the codec, then the partial body filter.
        Box::new(self.inner).into_inner()?
            .expect("the codec has an inner writer")
            .into_inner()
    }

    fn pop(&mut self) -> Result<Option<Stack<'a>>> {
        Err(Error::InvalidOperation(
            "a compressor must be finalized, not popped".into()).into())
    }

    fn mount(&mut self, _new: Stack<'a>) {
    }

    fn inner_ref(&self) -> Option<&dyn Stackable<'a, Cookie>> {
        self.inner.inner_ref()
    }

    fn inner_mut(&mut self) -> Option<&mut dyn Stackable<'a, Cookie>> {
        self.inner.inner_mut()
    }

    fn cookie_set(&mut self, cookie: Cookie) -> Cookie {
        self.inner.cookie_set(cookie)
    }

    fn cookie_ref(&self) -> &Cookie {
        self.inner.cookie_ref()
    }

    fn cookie_mut(&mut self) -> &mut Cookie {
        self.inner.cookie_mut()
    }
}

/// Encrypts a packet stream.
///
/// Writes the session key packets, then an integrity protected data
/// packet containing everything written to this writer.  The MDC
/// packet goes out when the encryptor is popped.
pub struct Encryptor<'a> {
    inner: Option<Stack<'a>>,
    // The MDC hash; covers the prefix and all plaintext.
    hash: hash::Context,
    cookie: Cookie,
}

impl<'a> Encryptor<'a> {
    /// Creates a new encryptor.
    ///
    /// The stream is encrypted with a fresh session key, which is
    /// wrapped to every recipient key and every password.
    pub fn new(mut inner: Stack<'a>, algo: SymmetricAlgorithm,
               recipients: &[&Key], passwords: &[&Password])
               -> Result<Stack<'a>> {
        use crate::serialize::Serialize;
        use rand::RngCore;

        if recipients.is_empty() && passwords.is_empty() {
            return Err(Error::InvalidArgument(
                "neither recipients nor passwords given".into()).into());
        }

        let level = inner.cookie_ref().level + 1;
        let sk = SessionKey::new(algo.key_size()?)?;

        for key in recipients {
            PKESK::new(algo, &sk, key)?.serialize(&mut inner)?;
        }
        for password in passwords {
            SKESK::with_session_key(algo, S2K::new_iterated()?, &sk,
                                    password)?
                .serialize(&mut inner)?;
        }

        // The SEIP packet.
        CTB::new(Tag::SEIP).serialize(&mut inner)?;
        let mut inner: Stack<'a>
            = PartialBodyFilter::new(inner, Cookie::new(level));
        inner.write_all(&[1])?; // Version.

        let encryptor = writer::Encryptor::new(
            inner, Cookie::new(level), algo, &sk)?;

        // The hash for the MDC must include the prefix; build the
        // object before writing it.
        let mut encryptor = Box::new(Self {
            inner: Some(encryptor),
            hash: HashAlgorithm::SHA1.context()?,
            cookie: Cookie::new(level),
        });

        // The random prefix, and the quick check repetition of its
        // last two octets.
        let mut prefix = vec![0u8; algo.block_size()?];
        rand::rngs::OsRng.try_fill_bytes(&mut prefix)?;
        encryptor.write_all(&prefix)?;
        encryptor.write_all(&prefix[prefix.len() - 2..])?;

        Ok(encryptor)
    }

    /// Emits the MDC packet and recovers the original writer.
    fn emit_mdc(&mut self) -> Result<Option<Stack<'a>>> {
        use crate::serialize::Serialize;

        if let Some(mut w) = self.inner.take() {
            // The MDC must be the last packet inside the encrypted
            // stream; its hash includes the MDC's own CTB and length
            // octet.
            let mut header = Vec::new();
            CTB::new(Tag::MDC).serialize(&mut header)?;
            BodyLength::Full(20).serialize(&mut header)?;
            self.hash.update(&header);

            let mdc = MDC::from_context(self.hash.clone());
            mdc.serialize(&mut w)?;

            // Now recover the original writer.  First, strip the
            // CFB encryptor.
            let w = w.into_inner()?
                .expect("the encryptor has an inner writer");
            // And the partial body filter.
            let w = w.into_inner()?
                .expect("the filter has an inner writer");

            Ok(Some(w))
        } else {
            Ok(None)
        }
    }
}

impl<'a> Drop for Encryptor<'a> {
    fn drop(&mut self) {
        let _ = self.emit_mdc();
    }
}

impl<'a> fmt::Debug for Encryptor<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Encryptor")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<'a> Write for Encryptor<'a> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = match self.inner.as_mut() {
            Some(w) => w.write(buf),
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe,
                                       "encryptor is closed")),
        };
        if let Ok(amount) = written {
            self.hash.update(&buf[..amount]);
        }
        written
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_mut() {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> Stackable<'a, Cookie> for Encryptor<'a> {
    fn into_inner(mut self: Box<Self>) -> Result<Option<Stack<'a>>> {
        self.emit_mdc()
    }

    fn pop(&mut self) -> Result<Option<Stack<'a>>> {
        Err(Error::InvalidOperation(
            "an encryptor must be finalized, not popped".into()).into())
    }

    fn mount(&mut self, _new: Stack<'a>) {
    }

    fn inner_ref(&self) -> Option<&dyn Stackable<'a, Cookie>> {
        self.inner.as_ref().map(|r| r as &dyn Stackable<'a, Cookie>)
    }

    fn inner_mut(&mut self) -> Option<&mut dyn Stackable<'a, Cookie>> {
        self.inner.as_mut().map(|r| r as &mut dyn Stackable<'a, Cookie>)
    }

    fn cookie_set(&mut self, cookie: Cookie) -> Cookie {
        std::mem::replace(&mut self.cookie, cookie)
    }

    fn cookie_ref(&self) -> &Cookie {
        &self.cookie
    }

    fn cookie_mut(&mut self) -> &mut Cookie {
        &mut self.cookie
    }
}

/// Applies ASCII armor to a packet stream.
pub struct Armorer<'a> {
    inner: Option<armor::Writer<Stack<'a>>>,
    cookie: Cookie,
}

impl<'a> Armorer<'a> {
    /// Creates a new armoring writer for the given kind of data.
    pub fn new(inner: Stack<'a>, kind: armor::Kind) -> Result<Stack<'a>> {
        Self::with_headers(inner, kind,
                           Option::<(String, String)>::None)
    }

    /// Creates a new armoring writer with `Key: Value` headers.
    pub fn with_headers<I, K, V>(inner: Stack<'a>, kind: armor::Kind,
                                 headers: I) -> Result<Stack<'a>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let level = inner.cookie_ref().level + 1;
        Ok(Box::new(Armorer {
            inner: Some(armor::Writer::with_headers(inner, kind,
                                                    headers)?),
            cookie: Cookie::new(level),
        }))
    }
}

impl<'a> fmt::Debug for Armorer<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Armorer").finish()
    }
}

impl<'a> Write for Armorer<'a> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.inner.as_mut() {
            Some(w) => w.write(buf),
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe,
                                       "armorer is closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_mut() {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> Stackable<'a, Cookie> for Armorer<'a> {
    fn into_inner(mut self: Box<Self>) -> Result<Option<Stack<'a>>> {
        match self.inner.take() {
            Some(w) => Ok(Some(w.finalize()?)),
            None => Ok(None),
        }
    }

    fn pop(&mut self) -> Result<Option<Stack<'a>>> {
        Err(Error::InvalidOperation(
            "an armorer must be finalized, not popped".into()).into())
    }

    fn mount(&mut self, _new: Stack<'a>) {
    }

    fn inner_ref(&self) -> Option<&dyn Stackable<'a, Cookie>> {
        None
    }

    fn inner_mut(&mut self) -> Option<&mut dyn Stackable<'a, Cookie>> {
        None
    }

    fn cookie_set(&mut self, cookie: Cookie) -> Cookie {
        std::mem::replace(&mut self.cookie, cookie)
    }

    fn cookie_ref(&self) -> &Cookie {
        &self.cookie
    }

    fn cookie_mut(&mut self) -> &mut Cookie {
        &mut self.cookie
    }
}

/// Writes a cleartext signed message.
///
/// Emits the `-----BEGIN PGP SIGNED MESSAGE-----` framing and the
/// `Hash:` header, dash-escapes the message, and hashes its canonical
/// text form.  Popping the writer signs the digest and appends the
/// armored signature block.
pub struct DashEscaper<'a> {
    inner: Option<Stack<'a>>,
    builder: Option<SignatureBuilder>,
    signer_key: &'a SecretKey,
    hasher: CanonicalHasher,
    // The current, still unterminated line.
    line: Vec<u8>,
    cookie: Cookie,
}

impl<'a> DashEscaper<'a> {
    /// Creates a new cleartext signing writer.
    pub fn new(mut inner: Stack<'a>, builder: SignatureBuilder,
               signer_key: &'a SecretKey) -> Result<Stack<'a>> {
        let hash_algo = builder.hash_algo();
        write!(inner, "{}\nHash: {}\n\n",
               cleartext::BEGIN, hash_algo.text_name()?)?;

        let level = inner.cookie_ref().level + 1;
        Ok(Box::new(DashEscaper {
            inner: Some(inner),
            builder: Some(builder),
            signer_key,
            hasher: CanonicalHasher::new(vec![hash_algo.context()?]),
            line: Vec::new(),
            cookie: Cookie::new(level),
        }))
    }

    fn flush_line(&mut self) -> Result<()> {
        let line = std::mem::take(&mut self.line);

        // Hash the pre-escape canonical form.
        self.hasher.update_line(&line);

        let inner = self.inner.as_mut().ok_or_else(
            || Error::InvalidOperation("writer is closed".into()))?;

        // Trailing whitespace is removed when the message is
        // generated, and dashes are escaped.
        let trimmed_len = line.iter().rev()
            .take_while(|&&b| b == b' ' || b == b'\t' || b == b'\r')
            .count();
        let line = &line[..line.len() - trimmed_len];
        if cleartext::needs_escape(line) {
            inner.write_all(b"- ")?;
        }
        inner.write_all(line)?;
        inner.write_all(b"\n")?;
        Ok(())
    }

    fn emit_signature(&mut self) -> Result<Option<Stack<'a>>> {
        use crate::serialize::Serialize;

        let builder = match self.builder.take() {
            Some(builder) => builder,
            None => return Ok(self.inner.take()),
        };

        if !self.line.is_empty() {
            // The final line was unterminated; its implicit line
            // ending is excluded from the hash.
            self.flush_line()?;
        }

        let ctx = self.hasher.context(builder.hash_algo())
            .expect("installed in new()")
            .clone();
        let sig = builder.sign_hash(self.signer_key, ctx)?;

        let inner = self.inner.take().ok_or_else(
            || Error::InvalidOperation("writer is closed".into()))?;
        let mut armorer =
            armor::Writer::new(inner, armor::Kind::Signature)?;
        sig.serialize(&mut armorer)?;
        Ok(Some(armorer.finalize()?))
    }
}

impl<'a> fmt::Debug for DashEscaper<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DashEscaper")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<'a> Write for DashEscaper<'a> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &b in buf {
            if b == b'\n' {
                self.flush_line().map_err(
                    |e| io::Error::new(io::ErrorKind::Other,
                                       e.to_string()))?;
            } else {
                self.line.push(b);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_mut() {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> Stackable<'a, Cookie> for DashEscaper<'a> {
    fn into_inner(mut self: Box<Self>) -> Result<Option<Stack<'a>>> {
        self.emit_signature()
    }

    fn pop(&mut self) -> Result<Option<Stack<'a>>> {
        Err(Error::InvalidOperation(
            "a dash escaper must be finalized, not popped".into()).into())
    }

    fn mount(&mut self, _new: Stack<'a>) {
    }

    fn inner_ref(&self) -> Option<&dyn Stackable<'a, Cookie>> {
        self.inner.as_ref().map(|r| r as &dyn Stackable<'a, Cookie>)
    }

    fn inner_mut(&mut self) -> Option<&mut dyn Stackable<'a, Cookie>> {
        self.inner.as_mut().map(|r| r as &mut dyn Stackable<'a, Cookie>)
    }

    fn cookie_set(&mut self, cookie: Cookie) -> Cookie {
        std::mem::replace(&mut self.cookie, cookie)
    }

    fn cookie_ref(&self) -> &Cookie {
        &self.cookie
    }

    fn cookie_mut(&mut self) -> &mut Cookie {
        &mut self.cookie
    }
}

/// Finalizes a whole stack, LIFO.
///
/// Every layer is popped and finalized even if an earlier one fails;
/// the first error is reported.
pub fn finalize(stack: Stack) -> Result<()> {
    let mut first_error = None;
    let mut current = Some(stack);

    while let Some(layer) = current.take() {
        match layer.into_inner() {
            Ok(next) => current = next,
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
                // The failed layer is gone; there is no deeper layer
                // left to release.
                break;
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parse;
    use crate::Packet;

    #[test]
    fn arbitrary() {
        let mut o = vec![];
        {
            let mut ustr = ArbitraryWriter::new(wrap(&mut o),
                                                Tag::Literal).unwrap();
            ustr.write_all(b"t").unwrap(); // format
            ustr.write_all(b"\x00").unwrap(); // filename length
            ustr.write_all(b"\x00\x00\x00\x00").unwrap(); // date
            ustr.write_all(b"Hello world.").unwrap(); // body
            finalize(ustr).unwrap();
        }

        let packets = parse::packets(
            Box::new(layered_reader::Memory::new(&o))).unwrap();
        assert_eq!(packets.len(), 1);
        match &packets[0] {
            Packet::Literal(l) => {
                assert_eq!(l.format(), crate::types::DataFormat::Text);
                assert_eq!(l.filename(), None);
                assert_eq!(l.date(), 0);
                assert_eq!(l.body(), b"Hello world.");
            }
            p => panic!("unexpected packet type {:?}", p),
        }
    }

    // Create a nesting structure, serialize the message, reparse it,
    // and make sure we get the same result.
    #[test]
    fn stream_0() {
        let mut o = vec![];
        {
            let c = Compressor::new(
                wrap(&mut o), CompressionAlgorithm::Zip).unwrap();
            let mut ls = LiteralWriter::new(c, DataFormat::Text,
                                            None, 0).unwrap();
            write!(ls, "one").unwrap();
            let c = Box::new(ls).into_inner().unwrap().unwrap();
            finalize(c).unwrap();
        }

        let packets = parse::packets(
            Box::new(layered_reader::Memory::new(&o))).unwrap();
        assert_eq!(packets.len(), 2);
        assert!(matches!(&packets[0], Packet::CompressedData(c)
                         if c.algo() == CompressionAlgorithm::Zip));
        assert!(matches!(&packets[1], Packet::Literal(l)
                         if l.body() == b"one"));
    }

    #[test]
    fn stream_big() {
        let zeros = vec![0u8; 4 * 1024];
        let mut o = vec![];
        {
            let c = Compressor::new(wrap(&mut o),
                                    CompressionAlgorithm::BZip2).unwrap();
            let mut ls = LiteralWriter::new(c, DataFormat::Text,
                                            None, 0).unwrap();
            // Write 4 megabytes of zeroes.
            for _ in 0..1024 {
                ls.write_all(&zeros).unwrap();
            }
            finalize(ls).unwrap();
        }
        assert!(o.len() < 4096);
    }
}
