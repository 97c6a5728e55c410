//! Packet parsing.
//!
//! The parser is callback driven: [`parse`] (or a configured
//! [`Parser`]) walks the packet stream and hands each [`Event`] to a
//! consumer function.  Event payloads are borrowed; a consumer that
//! wants to keep one beyond the call clones it.  The consumer's
//! [`Verdict`] decides whether parsing continues.
//!
//! Literal and compressed data bodies are streamed in chunks of at
//! most 8 KiB; no layer ever buffers an unbounded body.
//!
//! Malformed input local to one packet is reported through
//! [`Event::ErrorCode`] and parsing resumes at the next packet
//! boundary; errors that corrupt the stream itself (a clear packet tag
//! bit, damaged armor) end the parse.

mod mpis;

use std::io;
use std::io::Read;

use layered_reader::{BufferedReader, Bzip, Deflate, Generic, Limitor,
                     Zlib};

use crate::armor;
use crate::cleartext;
use crate::crypto::hash;
use crate::crypto::mpi::SecretParams;
use crate::crypto::s2k::S2K;
use crate::crypto::symmetric::{Cfb, Decryptor, MdcReader, MdcResult};
use crate::crypto::{Password, SessionKey};
use crate::packet::signature::subpacket::{Subpacket, SubpacketArea,
                                          SubpacketTag, SubpacketValue};
use crate::packet::signature::DocumentHasher;
use crate::packet::{BodyLength, CompressedData, CTB, CTBNew, CTBOld,
                    Header, Key, Literal, Marker, OnePassSig,
                    PacketLengthType, SecretKey, SecretKeyMaterial,
                    Signature, Tag, Unknown, UserAttribute, UserID,
                    MDC, PKESK, SED, SEIP, SKESK};
use crate::types::{CompressionAlgorithm, DataFormat, HashAlgorithm,
                   PublicKeyAlgorithm, SignatureType,
                   SymmetricAlgorithm};
use crate::Error;
use crate::KeyID;
use crate::Packet;
use crate::Result;

/// The maximum size of a streamed body chunk.
pub const BODY_CHUNK_SIZE: usize = 8192;

/// A parse event, delivered to the consumer callback.
///
/// Payloads are borrowed for the duration of one callback call; the
/// parser never retains them across events.
#[derive(Debug)]
#[non_exhaustive]
pub enum Event<'a> {
    /// A packet tag and body length have been decoded.  Always
    /// precedes the packet's body events.
    PacketHeader(&'a Header),

    /// A packet has been parsed in its entirety.
    ///
    /// Used for all packets without internal structure worth
    /// streaming: keys, user ids, session keys, markers, and the like.
    Packet(&'a Packet),

    /// The fixed fields and subpacket areas of a signature packet.
    SignatureHeader(&'a Signature),

    /// One signature subpacket.  Follows the signature header; the
    /// flag tells the areas apart.
    Subpacket {
        /// The subpacket.
        subpacket: &'a Subpacket,
        /// Whether it comes from the hashed area.
        hashed: bool,
    },

    /// The signature packet is complete.
    ///
    /// If a preceding one-pass signature packet (or a cleartext
    /// framing) let the parser hash the signed data on the fly,
    /// `computed` holds the document digest context; pass a clone to
    /// [`Signature::verify_digest`] to verify.
    SignatureFooter {
        /// The complete signature.
        sig: &'a Signature,
        /// The document digest, if the parser could compute it.
        computed: Option<&'a hash::Context>,
    },

    /// The header of a literal data packet.  Body chunks follow.
    LiteralHeader(&'a Literal),

    /// A chunk of a literal data packet's body, at most
    /// [`BODY_CHUNK_SIZE`] octets.
    LiteralBody(&'a [u8]),

    /// The header of a compressed data packet.  The decompressed
    /// content's packet events follow.
    CompressedHeader(&'a CompressedData),

    /// A streamed packet's body has ended.
    ///
    /// Emitted for literal data, compressed data, and encrypted data
    /// packets.
    PacketEnd,

    /// An armor header line and its `Key: Value` headers.
    ArmorHeader {
        /// The block type.
        kind: armor::Kind,
        /// The armor headers.
        headers: &'a [(String, String)],
    },

    /// The armor footer line was reached, checksum verified.
    ArmorTrailer {
        /// The block type.
        kind: armor::Kind,
    },

    /// The header of a cleartext signed message.
    CleartextHeader {
        /// The framing headers, including `Hash:`.
        headers: &'a [(String, String)],
    },

    /// A line of the cleartext message, unescaped.
    CleartextBody(&'a [u8]),

    /// The cleartext body has ended; the signature block follows.
    ///
    /// One digest context per announced hash algorithm, fed with the
    /// canonical text.
    CleartextTrailer {
        /// The digests over the canonical text.
        hashes: &'a [hash::Context],
    },

    /// A parse problem, in human-readable form only.
    Error(&'a str),

    /// A parse problem with a classifiable error value.
    ErrorCode(&'a Error),
}

/// The consumer's answer: keep going or stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Continue parsing.
    Continue,
    /// Stop parsing; the parser emits no further events.
    Finished,
}

/// Whether to expect ASCII armor around the packet stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dearmor {
    /// Look at the input: binary packets, an armored block, and the
    /// cleartext signature framing are all recognized.
    Auto,
    /// Require an armored block, optionally of a specific kind.
    Armored(Option<armor::Kind>),
    /// Require raw binary packets.
    None,
}

#[derive(PartialEq)]
enum Flow {
    Continue,
    Stop,
}

macro_rules! try_emit {
    ($ctx:expr, $event:expr) => {
        if let Flow::Stop = $ctx.emit($event)? {
            return Ok(Flow::Stop);
        }
    };
}

/// A configurable packet stream parser.
pub struct Parser<'a> {
    reader: Box<dyn BufferedReader + 'a>,
    dearmor: Dearmor,
    secret_keys: Vec<&'a SecretKey>,
    passwords: Vec<Password>,
    session_keys: Vec<(SymmetricAlgorithm, SessionKey)>,
}

impl<'a> Parser<'a> {
    /// Creates a parser reading from a `BufferedReader`.
    pub fn from_buffered_reader(reader: Box<dyn BufferedReader + 'a>)
                                -> Self {
        Parser {
            reader,
            dearmor: Dearmor::Auto,
            secret_keys: Vec::new(),
            passwords: Vec::new(),
            session_keys: Vec::new(),
        }
    }

    /// Creates a parser reading from an `io::Read`er.
    pub fn from_reader<R: io::Read + 'a>(reader: R) -> Self {
        Self::from_buffered_reader(Box::new(Generic::new(reader, None)))
    }

    /// Creates a parser reading from a buffer.
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self::from_buffered_reader(
            Box::new(layered_reader::Memory::new(bytes)))
    }

    /// Creates a parser reading from a file.
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        Ok(Self::from_buffered_reader(
            Box::new(layered_reader::File::open(path)?)))
    }

    /// Sets the armor handling; the default is [`Dearmor::Auto`].
    pub fn dearmor(mut self, dearmor: Dearmor) -> Self {
        self.dearmor = dearmor;
        self
    }

    /// Registers a secret key for unwrapping session keys from PKESK
    /// packets.
    pub fn add_secret_key(mut self, key: &'a SecretKey) -> Self {
        self.secret_keys.push(key);
        self
    }

    /// Registers a password for unwrapping session keys from SKESK
    /// packets.
    pub fn add_password(mut self, password: Password) -> Self {
        self.passwords.push(password);
        self
    }

    /// Registers a session key for decrypting encrypted data packets
    /// directly.
    pub fn add_session_key(mut self, algo: SymmetricAlgorithm,
                           key: SessionKey) -> Self {
        self.session_keys.push((algo, key));
        self
    }

    /// Parses the stream, delivering events to `callback`.
    ///
    /// Returns `Ok(())` both when the stream ends and when the
    /// consumer answers [`Verdict::Finished`].
    pub fn parse<F>(self, mut callback: F) -> Result<()>
    where
        F: FnMut(Event) -> Result<Verdict>,
    {
        let mut ctx = Context {
            callback: &mut callback,
            secret_keys: self.secret_keys,
            passwords: self.passwords,
            session_keys: self.session_keys,
            one_pass: Vec::new(),
            cleartext_digests: Vec::new(),
            seen_mdc: None,
        };

        // A stream-level error is reported as an event before it
        // surfaces to the caller.
        fn run(ctx: &mut Context, reader: &mut dyn BufferedReader)
               -> Result<()> {
            if let Err(e) = parse_stream(ctx, reader) {
                let err = to_crate_error(&e);
                let _ = ctx.emit(Event::ErrorCode(&err));
                return Err(e);
            }
            Ok(())
        }

        let mut reader = self.reader;
        match self.dearmor {
            Dearmor::None => {
                run(&mut ctx, &mut reader)?;
            }
            Dearmor::Armored(kind) => {
                parse_armored(&mut ctx, reader, kind)?;
            }
            Dearmor::Auto => {
                let head = reader.data(64)?;
                if head.is_empty() {
                    return Ok(());
                }
                if head[0] & 0x80 != 0 {
                    run(&mut ctx, &mut reader)?;
                } else {
                    let text = String::from_utf8_lossy(head).into_owned();
                    let line = text.lines().next().unwrap_or("").trim();
                    if line == cleartext::BEGIN {
                        parse_cleartext(&mut ctx, reader)?;
                    } else if line.starts_with("-----BEGIN PGP ") {
                        parse_armored(&mut ctx, reader, None)?;
                    } else {
                        ctx.emit(Event::Error(
                            "input is neither binary OpenPGP data nor \
                             an armored block"))?;
                    }
                }
            }
        }

        Ok(())
    }
}

/// Parses a packet stream, delivering events to `callback`.
///
/// This is [`Parser`] with the default configuration.
pub fn parse<'a, F>(reader: Box<dyn BufferedReader + 'a>, callback: F)
                    -> Result<()>
where
    F: FnMut(Event) -> Result<Verdict>,
{
    Parser::from_buffered_reader(reader).parse(callback)
}

/// Parses and accumulates a whole packet stream.
///
/// Streamed bodies are materialized: literal packets come back with
/// their body, compressed packets are followed by their decompressed
/// content's packets.  Any parse error aborts.
pub fn packets<'a>(reader: Box<dyn BufferedReader + 'a>)
                   -> Result<Vec<Packet>> {
    let mut out = Vec::new();
    let mut literal: Option<Literal> = None;

    parse(reader, |event| {
        match event {
            Event::Packet(p) => out.push(p.clone()),
            Event::SignatureFooter { sig, .. } =>
                out.push(Packet::Signature(sig.clone())),
            Event::CompressedHeader(c) =>
                out.push(Packet::CompressedData(c.clone())),
            Event::LiteralHeader(l) => literal = Some(l.clone()),
            Event::LiteralBody(chunk) => {
                if let Some(l) = literal.as_mut() {
                    l.append_body(chunk);
                }
            }
            Event::PacketEnd => {
                if let Some(l) = literal.take() {
                    out.push(Packet::Literal(l));
                }
            }
            Event::Error(msg) =>
                return Err(Error::MalformedMessage(msg.into()).into()),
            Event::ErrorCode(err) => return Err(err.clone().into()),
            _ => {}
        }
        Ok(Verdict::Continue)
    })?;

    Ok(out)
}

struct Context<'cb, 'k> {
    callback: &'cb mut dyn FnMut(Event) -> Result<Verdict>,
    secret_keys: Vec<&'k SecretKey>,
    passwords: Vec<Password>,
    session_keys: Vec<(SymmetricAlgorithm, SessionKey)>,
    // One entry per one-pass signature packet whose data is still
    // ahead of us, in order of appearance.
    one_pass: Vec<(OnePassSig, DocumentHasher)>,
    // Digests over a cleartext body, for the trailing signature block.
    cleartext_digests: Vec<hash::Context>,
    // The MDC packet most recently parsed inside the current
    // integrity protected packet.
    seen_mdc: Option<MDC>,
}

impl<'cb, 'k> Context<'cb, 'k> {
    fn emit(&mut self, event: Event) -> Result<Flow> {
        match (self.callback)(event)? {
            Verdict::Continue => Ok(Flow::Continue),
            Verdict::Finished => Ok(Flow::Stop),
        }
    }

    fn emit_error(&mut self, e: anyhow::Error) -> Result<Flow> {
        let err = to_crate_error(&e);
        self.emit(Event::ErrorCode(&err))
    }
}

fn to_crate_error(e: &anyhow::Error) -> Error {
    if let Some(err) = e.downcast_ref::<Error>() {
        err.clone()
    } else if let Some(io) = e.downcast_ref::<io::Error>() {
        if let Some(inner) = io.get_ref()
            .and_then(|i| i.downcast_ref::<Error>())
        {
            inner.clone()
        } else {
            Error::Io(io.to_string())
        }
    } else {
        Error::MalformedMessage(e.to_string())
    }
}

fn parse_armored<'a>(ctx: &mut Context, source: Box<dyn BufferedReader + 'a>,
                     kind: Option<armor::Kind>) -> Result<Flow> {
    let mut reader = armor::Reader::from_buffered_reader(source, kind);

    let headers = match reader.headers() {
        Ok(headers) => headers.to_vec(),
        Err(e) => return ctx.emit_error(e.into()),
    };
    let kind = reader.kind().expect("initialized by headers()");

    try_emit!(ctx, Event::ArmorHeader { kind, headers: &headers });

    let mut boxed: Box<dyn BufferedReader + 'a> = Box::new(reader);
    match parse_stream(ctx, &mut boxed) {
        Ok(Flow::Stop) => return Ok(Flow::Stop),
        Ok(Flow::Continue) => {}
        // Armor problems surface as errors from the reader.
        Err(e) => return ctx.emit_error(e),
    }

    try_emit!(ctx, Event::ArmorTrailer { kind });
    Ok(Flow::Continue)
}

fn parse_cleartext<'a>(ctx: &mut Context,
                       source: Box<dyn BufferedReader + 'a>)
                       -> Result<Flow> {
    let mut decoder = cleartext::Decoder::from_buffered_reader(source);
    if let Err(e) = decoder.read_header() {
        return ctx.emit_error(e);
    }

    let headers = decoder.headers().to_vec();
    try_emit!(ctx, Event::CleartextHeader { headers: &headers });

    loop {
        match decoder.next_line() {
            Ok(Some(line)) => {
                try_emit!(ctx, Event::CleartextBody(&line));
            }
            Ok(None) => break,
            Err(e) => return ctx.emit_error(e),
        }
    }

    try_emit!(ctx, Event::CleartextTrailer {
        hashes: decoder.contexts(),
    });
    ctx.cleartext_digests = decoder.contexts().to_vec();

    parse_armored(ctx, decoder.into_source(),
                  Some(armor::Kind::Signature))
}

fn parse_stream(ctx: &mut Context, reader: &mut dyn BufferedReader)
                -> Result<Flow> {
    loop {
        if reader.data(1)?.is_empty() {
            return Ok(Flow::Continue);
        }
        if parse_packet(ctx, reader)? == Flow::Stop {
            return Ok(Flow::Stop);
        }
    }
}

/// Decodes a new format body length (see [Section 4.2.2 of RFC
/// 4880]).
///
///   [Section 4.2.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2.2
fn body_length_new(reader: &mut dyn BufferedReader)
                   -> io::Result<BodyLength> {
    let b0 = reader.data_consume_hard(1)?[0];
    match b0 {
        0..=191 => Ok(BodyLength::Full(b0 as u32)),
        192..=223 => {
            let b1 = reader.data_consume_hard(1)?[0];
            Ok(BodyLength::Full(
                ((b0 as u32 - 192) << 8) + b1 as u32 + 192))
        }
        224..=254 => Ok(BodyLength::Partial(1u32 << (b0 & 0x1f))),
        255 => Ok(BodyLength::Full(reader.read_be_u32()?)),
    }
}

/// Decodes an old format body length (see [Section 4.2.1 of RFC
/// 4880]).
fn body_length_old(length_type: PacketLengthType,
                   reader: &mut dyn BufferedReader)
                   -> io::Result<BodyLength> {
    match length_type {
        PacketLengthType::OneOctet =>
            Ok(BodyLength::Full(reader.data_consume_hard(1)?[0] as u32)),
        PacketLengthType::TwoOctets =>
            Ok(BodyLength::Full(reader.read_be_u16()? as u32)),
        PacketLengthType::FourOctets =>
            Ok(BodyLength::Full(reader.read_be_u32()?)),
        PacketLengthType::Indeterminate =>
            Ok(BodyLength::Indeterminate),
    }
}

/// Pulls the chunks of a partial length body as one continuous
/// stream.
struct PartialBodyRead<'x> {
    source: &'x mut dyn BufferedReader,
    remaining: u32,
    last: bool,
}

impl<'x> PartialBodyRead<'x> {
    fn new(source: &'x mut dyn BufferedReader, first_chunk: u32) -> Self {
        PartialBodyRead {
            source,
            remaining: first_chunk,
            last: false,
        }
    }
}

impl<'x> io::Read for PartialBodyRead<'x> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.remaining == 0 {
            if self.last {
                return Ok(0);
            }
            match body_length_new(&mut self.source)? {
                BodyLength::Partial(n) => self.remaining = n,
                BodyLength::Full(n) => {
                    self.remaining = n;
                    self.last = true;
                }
                BodyLength::Indeterminate => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        Error::MalformedPacket(
                            "indeterminate partial chunk".into())));
                }
            }
            if self.remaining == 0 && self.last {
                return Ok(0);
            }
        }

        let want = std::cmp::min(buf.len(),
                                 self.remaining as usize);
        let data = self.source.data(want)?;
        if data.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "EOF inside a partial length chunk"));
        }
        let n = std::cmp::min(want, data.len());
        buf[..n].copy_from_slice(&data[..n]);
        self.source.consume(n);
        self.remaining -= n as u32;
        Ok(n)
    }
}

fn parse_packet(ctx: &mut Context, reader: &mut dyn BufferedReader)
                -> Result<Flow> {
    let ptag = reader.data_consume_hard(1)?[0];

    if ptag & 0x80 == 0 {
        // Bit 7 must always be set; the stream is not OpenPGP data.
        // This is fatal: without a trusted length, there is no next
        // packet boundary to resume at.
        return Err(Error::MalformedPacket(format!(
            "packet tag octet {:02x} lacks bit 7", ptag)).into());
    }

    let new_format = ptag & 0x40 != 0;
    let (ctb, length) = if new_format {
        let tag = Tag::from(ptag & 0x3f);
        let length = body_length_new(reader)?;
        (CTB::New(CTBNew::new(tag)), length)
    } else {
        let tag = Tag::from((ptag >> 2) & 0x0f);
        let length_type = PacketLengthType::from(ptag & 0x03);
        let length = body_length_old(length_type, reader)?;
        (CTB::Old(CTBOld::from_parts(tag, length_type)), length)
    };

    let header = Header::new(ctb, length);
    let tag = header.tag();

    if let Flow::Stop = ctx.emit(Event::PacketHeader(&header))? {
        return Ok(Flow::Stop);
    }

    if matches!(length, BodyLength::Partial(_)) && !tag.streams() {
        let err = Error::MalformedPacket(format!(
            "partial length on a non-streaming packet: {}", tag));
        ctx.emit(Event::ErrorCode(&err))?;
        // The chunked body can still be skipped cleanly.
        let mut body = body_reader(reader, &length);
        body.drop_eof()?;
        return Ok(Flow::Continue);
    }

    let mut body = body_reader(reader, &length);
    let flow = dispatch_body(ctx, &mut *body, tag);
    let flow = match flow {
        Ok(flow) => flow,
        Err(e) => {
            // The error is confined to this packet; skip to the next
            // packet boundary and carry on.
            ctx.emit_error(e)?
        }
    };
    body.drop_eof()?;

    Ok(flow)
}

fn body_reader<'x>(reader: &'x mut dyn BufferedReader,
                   length: &BodyLength)
                   -> Box<dyn BufferedReader + 'x> {
    match *length {
        BodyLength::Full(l) =>
            Box::new(Limitor::new(reader, l as u64)),
        BodyLength::Partial(l) =>
            Box::new(Generic::new(PartialBodyRead::new(reader, l), None)),
        BodyLength::Indeterminate => Box::new(reader),
    }
}

fn dispatch_body(ctx: &mut Context, body: &mut dyn BufferedReader,
                 tag: Tag) -> Result<Flow> {
    match tag {
        Tag::PublicKey | Tag::PublicSubkey => {
            let key = parse_key(body)?;
            let packet = if tag == Tag::PublicKey {
                Packet::PublicKey(key)
            } else {
                Packet::PublicSubkey(key)
            };
            ctx.emit(Event::Packet(&packet))
        }

        Tag::SecretKey | Tag::SecretSubkey => {
            let key = parse_secret_key(body)?;
            let packet = if tag == Tag::SecretKey {
                Packet::SecretKey(key)
            } else {
                Packet::SecretSubkey(key)
            };
            ctx.emit(Event::Packet(&packet))
        }

        Tag::UserID => {
            let packet = Packet::UserID(UserID::from(body.steal_eof()?));
            ctx.emit(Event::Packet(&packet))
        }

        Tag::UserAttribute => {
            let packet = Packet::UserAttribute(
                UserAttribute::from(body.steal_eof()?));
            ctx.emit(Event::Packet(&packet))
        }

        Tag::Trust => {
            let packet = Packet::Trust(
                crate::packet::Trust::new(body.steal_eof()?));
            ctx.emit(Event::Packet(&packet))
        }

        Tag::Marker => {
            let content = body.steal_eof()?;
            if content != Marker::BODY {
                return Err(Error::MalformedPacket(
                    "marker body is not \"PGP\"".into()).into());
            }
            let packet = Packet::Marker(Marker::default());
            ctx.emit(Event::Packet(&packet))
        }

        Tag::Signature => parse_signature(ctx, body),

        Tag::OnePassSig => {
            let ops = parse_one_pass_sig(body)?;
            if let Ok(hash_ctx) = ops.hash_algo().context() {
                ctx.one_pass.push((
                    ops.clone(),
                    DocumentHasher::new(
                        hash_ctx,
                        ops.sigtype() == SignatureType::Text)));
            }
            let packet = Packet::OnePassSig(ops);
            ctx.emit(Event::Packet(&packet))
        }

        Tag::PKESK => {
            let pkesk = parse_pkesk(body)?;
            // Opportunistically unwrap the session key for a later
            // encrypted data packet.
            for key in ctx.secret_keys.clone() {
                let matches = pkesk.recipient() == &KeyID::wildcard()
                    || key.public().keyid().ok().as_ref()
                        == Some(pkesk.recipient());
                if !matches {
                    continue;
                }
                if let Ok((algo, sk)) = pkesk.decrypt(key) {
                    ctx.session_keys.push((algo, sk));
                    break;
                }
            }
            let packet = Packet::PKESK(pkesk);
            ctx.emit(Event::Packet(&packet))
        }

        Tag::SKESK => {
            let skesk = parse_skesk(body)?;
            for password in ctx.passwords.clone() {
                if let Ok((algo, sk)) = skesk.decrypt(&password) {
                    ctx.session_keys.push((algo, sk));
                    break;
                }
            }
            let packet = Packet::SKESK(skesk);
            ctx.emit(Event::Packet(&packet))
        }

        Tag::Literal => parse_literal(ctx, body),

        Tag::CompressedData => parse_compressed(ctx, body),

        Tag::SEIP => parse_seip(ctx, body),

        Tag::SED => parse_sed(ctx, body),

        Tag::MDC => {
            let digest: [u8; 20] = body.steal(20)?[..].try_into()
                .expect("steal returns the requested amount");
            let mdc = MDC::from(digest);
            ctx.seen_mdc = Some(mdc.clone());
            let packet = Packet::MDC(mdc);
            ctx.emit(Event::Packet(&packet))
        }

        Tag::Reserved => Err(Error::MalformedPacket(
            "reserved packet tag 0".into()).into()),

        _ => {
            let packet = Packet::Unknown(
                Unknown::new(tag, body.steal_eof()?));
            ctx.emit(Event::Packet(&packet))
        }
    }
}

fn parse_key(body: &mut dyn BufferedReader) -> Result<Key> {
    let version = body.data_consume_hard(1)?[0];
    match version {
        3 => {
            let creation_time = body.read_be_u32()?;
            let days_valid = body.read_be_u16()?;
            let pk_algo: PublicKeyAlgorithm =
                body.data_consume_hard(1)?[0].into();
            let mpis = mpis::public_params(pk_algo, body)?;
            Ok(Key::from_parts(3, creation_time, days_valid, pk_algo,
                               mpis))
        }
        4 => {
            let creation_time = body.read_be_u32()?;
            let pk_algo: PublicKeyAlgorithm =
                body.data_consume_hard(1)?[0].into();
            let mpis = mpis::public_params(pk_algo, body)?;
            Ok(Key::from_parts(4, creation_time, 0, pk_algo, mpis))
        }
        _ => Err(Error::MalformedPacket(
            format!("unknown key packet version {}", version)).into()),
    }
}

/// Parses (and checksums) secret key parameters from decrypted or
/// never-encrypted bytes.
pub(crate) fn secret_params_from_bytes(algo: PublicKeyAlgorithm,
                                       s2k_usage: u8, bytes: &[u8])
                                       -> Result<SecretParams> {
    let mut bio = layered_reader::Memory::new(bytes);
    let mpis = mpis::secret_params(algo, &mut bio)?;

    match s2k_usage {
        254 => {
            // SHA-1 checksum over the parameters.
            let their_hash = bio.steal(20)?;
            let mut ctx = HashAlgorithm::SHA1.context()?;
            let mut buf = Vec::with_capacity(mpis.serialized_len());
            mpis.serialize(&mut buf)?;
            ctx.update(&buf);
            let mut our_hash = [0u8; 20];
            ctx.digest(&mut our_hash);
            if our_hash[..] != their_hash[..] {
                return Err(Error::ChecksumMismatch.into());
            }
        }
        _ => {
            // 16-bit additive checksum.
            let their_sum = bio.read_be_u16()
                .map_err(|_| Error::MalformedPacket(
                    "secret parameters lack their checksum".into()))?;
            if mpis.checksum()? != their_sum {
                return Err(Error::ChecksumMismatch.into());
            }
        }
    }

    if !bio.buffer().is_empty() {
        return Err(Error::MalformedPacket(
            "trailing junk after the secret parameters".into()).into());
    }

    Ok(mpis)
}

fn parse_secret_key(body: &mut dyn BufferedReader) -> Result<SecretKey> {
    let public = parse_key(body)?;
    let s2k_usage = body.data_consume_hard(1)?[0];

    let secret = match s2k_usage {
        0 => {
            let rest = body.steal_eof()?;
            let mpis = secret_params_from_bytes(
                public.pk_algo(), 0, &rest)?;
            SecretKeyMaterial::Unencrypted { mpis }
        }

        254 | 255 => {
            let algo: SymmetricAlgorithm =
                body.data_consume_hard(1)?[0].into();
            match parse_s2k(body)? {
                s2k @ (S2K::Simple { .. } | S2K::Salted { .. }
                       | S2K::Iterated { .. }) => {
                    let iv = body.steal(algo.block_size()?)?;
                    let ciphertext = body.steal_eof()?;
                    SecretKeyMaterial::Encrypted {
                        s2k_usage, algo, s2k, iv, ciphertext,
                    }
                }
                _ => {
                    // An unusable S2K specifier; keep the raw bytes.
                    let mut rest = vec![algo.into()];
                    rest.extend(body.steal_eof()?);
                    SecretKeyMaterial::Unknown { s2k_usage, rest }
                }
            }
        }

        _ => {
            // Legacy: the usage octet names the cipher directly, and
            // the passphrase is hashed with MD5.
            let algo: SymmetricAlgorithm = s2k_usage.into();
            if algo.is_supported() {
                let iv = body.steal(algo.block_size()?)?;
                let ciphertext = body.steal_eof()?;
                SecretKeyMaterial::Encrypted {
                    s2k_usage,
                    algo,
                    s2k: S2K::Simple { hash: HashAlgorithm::MD5 },
                    iv,
                    ciphertext,
                }
            } else {
                SecretKeyMaterial::Unknown {
                    s2k_usage,
                    rest: body.steal_eof()?,
                }
            }
        }
    };

    Ok(SecretKey::from_parts(public, secret))
}

pub(crate) fn parse_s2k(body: &mut dyn BufferedReader) -> Result<S2K> {
    let kind = body.data_consume_hard(1)?[0];
    match kind {
        0 => Ok(S2K::Simple {
            hash: body.data_consume_hard(1)?[0].into(),
        }),
        1 => {
            let hash = body.data_consume_hard(1)?[0].into();
            let salt: [u8; 8] = body.steal(8)?[..].try_into().unwrap();
            Ok(S2K::Salted { hash, salt })
        }
        3 => {
            let hash = body.data_consume_hard(1)?[0].into();
            let salt: [u8; 8] = body.steal(8)?[..].try_into().unwrap();
            let coded = body.data_consume_hard(1)?[0];
            Ok(S2K::Iterated {
                hash,
                salt,
                hash_bytes: S2K::decode_count(coded),
            })
        }
        100..=110 => Ok(S2K::Private(kind)),
        u => Ok(S2K::Unknown(u)),
    }
}

fn parse_subpacket_area(region: &[u8]) -> Result<SubpacketArea> {
    let mut packets = Vec::new();
    let mut rest = region;

    while !rest.is_empty() {
        // Subpacket length: one, two, or five octets.
        let (len, used) = match rest[0] {
            0..=191 => (rest[0] as usize, 1),
            192..=254 => {
                if rest.len() < 2 {
                    return Err(Error::MalformedPacket(
                        "truncated subpacket length".into()).into());
                }
                ((((rest[0] as usize - 192) << 8) + rest[1] as usize
                  + 192), 2)
            }
            255 => {
                if rest.len() < 5 {
                    return Err(Error::MalformedPacket(
                        "truncated subpacket length".into()).into());
                }
                (u32::from_be_bytes([rest[1], rest[2], rest[3], rest[4]])
                 as usize, 5)
            }
        };
        rest = &rest[used..];

        if len == 0 || rest.len() < len {
            return Err(Error::MalformedPacket(
                "subpacket overruns its area".into()).into());
        }

        let type_octet = rest[0];
        let critical = type_octet & 0x80 != 0;
        let tag = SubpacketTag::from(type_octet & 0x7f);
        let body = &rest[1..len];
        rest = &rest[len..];

        let value = SubpacketValue::parse(tag, body)?;

        // An unknown critical subpacket invalidates the signature for
        // us (see Section 5.2.3.1 of RFC 4880); unknown non-critical
        // ones are passed through raw.
        if critical
            && matches!(tag, SubpacketTag::Unknown(_)
                        | SubpacketTag::Reserved(_))
        {
            return Err(Error::MalformedPacket(format!(
                "unknown critical subpacket {}", u8::from(tag))).into());
        }

        packets.push(Subpacket::with_criticality(value, critical));
    }

    Ok(SubpacketArea::from_parsed(region.to_vec(), packets))
}

fn parse_signature(ctx: &mut Context, body: &mut dyn BufferedReader)
                   -> Result<Flow> {
    let version = body.data_consume_hard(1)?[0];

    let sig = match version {
        3 => {
            let len = body.data_consume_hard(1)?[0];
            if len != 5 {
                return Err(Error::MalformedPacket(format!(
                    "v3 hashed material is {} octets, not 5", len))
                           .into());
            }
            let sigtype: SignatureType =
                body.data_consume_hard(1)?[0].into();
            let creation_time = body.read_be_u32()?;
            let signer = KeyID::try_from(&body.steal(8)?[..])?;
            let pk_algo: PublicKeyAlgorithm =
                body.data_consume_hard(1)?[0].into();
            let hash_algo: HashAlgorithm =
                body.data_consume_hard(1)?[0].into();
            let hash_prefix: [u8; 2] =
                body.steal(2)?[..].try_into().unwrap();
            let mpis = mpis::signature_params(pk_algo, body)?;

            Signature::from_parts(3, sigtype, pk_algo, hash_algo,
                                  SubpacketArea::default(),
                                  SubpacketArea::default(),
                                  hash_prefix, mpis, creation_time,
                                  Some(signer))
        }

        4 => {
            let sigtype: SignatureType =
                body.data_consume_hard(1)?[0].into();
            let pk_algo: PublicKeyAlgorithm =
                body.data_consume_hard(1)?[0].into();
            let hash_algo: HashAlgorithm =
                body.data_consume_hard(1)?[0].into();

            let hashed_len = body.read_be_u16()? as usize;
            let hashed_area =
                parse_subpacket_area(&body.steal(hashed_len)?)?;

            let unhashed_len = body.read_be_u16()? as usize;
            let unhashed_area =
                parse_subpacket_area(&body.steal(unhashed_len)?)?;

            let hash_prefix: [u8; 2] =
                body.steal(2)?[..].try_into().unwrap();
            let mpis = mpis::signature_params(pk_algo, body)?;

            Signature::from_parts(4, sigtype, pk_algo, hash_algo,
                                  hashed_area, unhashed_area,
                                  hash_prefix, mpis, 0, None)
        }

        _ => return Err(Error::MalformedPacket(format!(
            "unknown signature packet version {}", version)).into()),
    };

    try_emit!(ctx, Event::SignatureHeader(&sig));
    for subpacket in sig.hashed_area().iter() {
        try_emit!(ctx, Event::Subpacket { subpacket, hashed: true });
    }
    for subpacket in sig.unhashed_area().iter() {
        try_emit!(ctx, Event::Subpacket { subpacket, hashed: false });
    }

    // If the signed data already streamed past us, we have its
    // digest: either from a one-pass signature packet, or from a
    // cleartext body.
    let computed: Option<hash::Context> =
        if !ctx.cleartext_digests.is_empty() {
            ctx.cleartext_digests.iter()
                .find(|c| c.algo() == sig.hash_algo())
                .cloned()
        } else if let Some((_ops, hasher)) = ctx.one_pass.pop() {
            let done = hasher.into_context();
            if done.algo() == sig.hash_algo() {
                Some(done)
            } else {
                None
            }
        } else {
            None
        };

    ctx.emit(Event::SignatureFooter {
        sig: &sig,
        computed: computed.as_ref(),
    })
}

fn parse_one_pass_sig(body: &mut dyn BufferedReader)
                      -> Result<OnePassSig> {
    let version = body.data_consume_hard(1)?[0];
    if version != 3 {
        return Err(Error::MalformedPacket(format!(
            "unknown one-pass signature version {}", version)).into());
    }

    let sigtype: SignatureType = body.data_consume_hard(1)?[0].into();
    let hash_algo: HashAlgorithm = body.data_consume_hard(1)?[0].into();
    let pk_algo: PublicKeyAlgorithm =
        body.data_consume_hard(1)?[0].into();
    let issuer = KeyID::try_from(&body.steal(8)?[..])?;
    let last = body.data_consume_hard(1)?[0];

    Ok(OnePassSig::from_parts(version, sigtype, hash_algo, pk_algo,
                              issuer, last))
}

fn parse_pkesk(body: &mut dyn BufferedReader) -> Result<PKESK> {
    let version = body.data_consume_hard(1)?[0];
    if version != 3 {
        return Err(Error::MalformedPacket(format!(
            "unknown PKESK version {}", version)).into());
    }

    let recipient = KeyID::try_from(&body.steal(8)?[..])?;
    let pk_algo: PublicKeyAlgorithm =
        body.data_consume_hard(1)?[0].into();
    let esk = mpis::ciphertext(pk_algo, body)?;

    Ok(PKESK::from_parts(version, recipient, pk_algo, esk))
}

fn parse_skesk(body: &mut dyn BufferedReader) -> Result<SKESK> {
    let version = body.data_consume_hard(1)?[0];
    if version != 4 {
        return Err(Error::MalformedPacket(format!(
            "unknown SKESK version {}", version)).into());
    }

    let sym_algo: SymmetricAlgorithm =
        body.data_consume_hard(1)?[0].into();
    let s2k = parse_s2k(body)?;
    if matches!(s2k, S2K::Private(_) | S2K::Unknown(_)) {
        return Err(Error::MalformedPacket(
            "unsupported S2K specifier in SKESK".into()).into());
    }

    let esk = body.steal_eof()?;
    let esk = if esk.is_empty() { None } else { Some(esk) };

    Ok(SKESK::from_parts(version, sym_algo, s2k, esk))
}

fn parse_literal(ctx: &mut Context, body: &mut dyn BufferedReader)
                 -> Result<Flow> {
    let format: DataFormat = body.data_consume_hard(1)?[0].into();
    let filename_len = body.data_consume_hard(1)?[0] as usize;
    let filename = body.steal(filename_len)?;
    let date = body.read_be_u32()?;

    let literal = Literal::new(format)
        .set_filename(&filename)?
        .set_date(date);
    try_emit!(ctx, Event::LiteralHeader(&literal));

    loop {
        let available = body.data(BODY_CHUNK_SIZE)?;
        if available.is_empty() {
            break;
        }
        let n = std::cmp::min(available.len(), BODY_CHUNK_SIZE);

        for (_, hasher) in ctx.one_pass.iter_mut() {
            hasher.update(&available[..n]);
        }

        let flow = ctx.emit(Event::LiteralBody(&body.buffer()[..n]))?;
        body.consume(n);
        if flow == Flow::Stop {
            return Ok(Flow::Stop);
        }
    }

    ctx.emit(Event::PacketEnd)
}

fn parse_compressed(ctx: &mut Context, body: &mut dyn BufferedReader)
                    -> Result<Flow> {
    let algo: CompressionAlgorithm =
        body.data_consume_hard(1)?[0].into();

    let packet = CompressedData::new(algo);
    try_emit!(ctx, Event::CompressedHeader(&packet));

    let mut inner: Box<dyn BufferedReader + '_> = match algo {
        CompressionAlgorithm::Uncompressed => Box::new(body),
        CompressionAlgorithm::Zip => Box::new(Deflate::new(body)),
        CompressionAlgorithm::Zlib => Box::new(Zlib::new(body)),
        CompressionAlgorithm::BZip2 => Box::new(Bzip::new(body)),
        _ => return Err(
            Error::UnsupportedCompressionAlgorithm(algo).into()),
    };

    if parse_stream(ctx, &mut inner)? == Flow::Stop {
        return Ok(Flow::Stop);
    }

    ctx.emit(Event::PacketEnd)
}

/// Tries the known session keys against an encrypted data packet's
/// quick check octets.
///
/// Nothing is consumed: candidate prefixes are decrypted out of
/// place.
fn select_session_key(ctx: &mut Context, body: &mut dyn BufferedReader)
                      -> Result<Option<(SymmetricAlgorithm, SessionKey)>> {
    for (algo, key) in &ctx.session_keys {
        let bs = match algo.block_size() {
            Ok(bs) => bs,
            Err(_) => continue,
        };
        let ct = body.data(bs + 2)?;
        if ct.len() < bs + 2 {
            continue;
        }

        let mut prefix = ct[..bs + 2].to_vec();
        Cfb::new(*algo, key)?.decrypt(&mut prefix);
        if prefix[bs - 2..bs] == prefix[bs..bs + 2] {
            return Ok(Some((*algo, key.clone())));
        }
    }
    Ok(None)
}

fn parse_seip(ctx: &mut Context, body: &mut dyn BufferedReader)
              -> Result<Flow> {
    let version = body.data_consume_hard(1)?[0];
    if version != 1 {
        return Err(Error::MalformedPacket(format!(
            "unknown SEIP version {}", version)).into());
    }

    let packet = Packet::SEIP(SEIP::new(version));
    try_emit!(ctx, Event::Packet(&packet));

    let selected = select_session_key(ctx, body)?;
    let (algo, key) = match selected {
        Some(chosen) => chosen,
        None => {
            if !ctx.session_keys.is_empty() {
                let err = Error::InvalidSessionKey(
                    "no session key passes the quick check".into());
                try_emit!(ctx, Event::ErrorCode(&err));
            }
            body.drop_eof()?;
            return ctx.emit(Event::PacketEnd);
        }
    };

    let bs = algo.block_size()?;
    let decryptor = Decryptor::new(algo, &key, &mut *body)?;

    // The MDC digest covers the prefix, the plaintext, and the MDC
    // packet's own header; the tee reader withholds only the trailing
    // digest octets.
    let mdc_result: MdcResult = Default::default();
    let tee = MdcReader::new(decryptor,
                             HashAlgorithm::SHA1.context()?,
                             mdc_result.clone());
    let mut plaintext: Box<dyn BufferedReader + '_> =
        Box::new(Generic::new(tee, None));

    // Skip the random prefix and its quick check repetition.
    plaintext.data_consume_hard(bs + 2)?;

    let saved_mdc = ctx.seen_mdc.take();
    let flow = parse_stream(ctx, &mut plaintext)?;
    plaintext.drop_eof()?;
    let inner_mdc = std::mem::replace(&mut ctx.seen_mdc, saved_mdc);

    if flow == Flow::Stop {
        return Ok(Flow::Stop);
    }

    let computed = *mdc_result.borrow();
    let intact = match (inner_mdc, computed) {
        (Some(mdc), Some(computed)) => mdc.digest() == &computed[..],
        _ => false,
    };
    if !intact {
        let err = Error::ManipulatedMessage;
        try_emit!(ctx, Event::ErrorCode(&err));
    }

    ctx.emit(Event::PacketEnd)
}

fn parse_sed(ctx: &mut Context, body: &mut dyn BufferedReader)
             -> Result<Flow> {
    let packet = Packet::SED(SED::default());
    try_emit!(ctx, Event::Packet(&packet));

    let selected = select_session_key(ctx, body)?;
    let (algo, key) = match selected {
        Some(chosen) => chosen,
        None => {
            if !ctx.session_keys.is_empty() {
                let err = Error::InvalidSessionKey(
                    "no session key passes the quick check".into());
                try_emit!(ctx, Event::ErrorCode(&err));
            }
            body.drop_eof()?;
            return ctx.emit(Event::PacketEnd);
        }
    };

    let bs = algo.block_size()?;
    let mut decryptor = Decryptor::new(algo, &key, &mut *body)?;

    // Read the prefix, then resynchronize the feedback register: this
    // packet uses the legacy CFB variant.
    let mut prefix = vec![0u8; bs + 2];
    decryptor.read_exact(&mut prefix)?;
    if prefix[bs - 2..bs] != prefix[bs..bs + 2] {
        return Err(Error::InvalidSessionKey(
            "quick check failed".into()).into());
    }
    decryptor.resync();

    let mut plaintext: Box<dyn BufferedReader + '_> =
        Box::new(Generic::new(decryptor, None));
    if parse_stream(ctx, &mut plaintext)? == Flow::Stop {
        return Ok(Flow::Stop);
    }

    ctx.emit(Event::PacketEnd)
}
