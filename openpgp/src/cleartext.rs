//! The cleartext signature framework.
//!
//! Cleartext signatures keep the signed text readable: the message is
//! framed by `-----BEGIN PGP SIGNED MESSAGE-----`, dash-escaped, and
//! followed by an armored signature block (see [Section 7 of RFC
//! 4880]).
//!
//! The writer side lives in
//! [`serialize::stream::DashEscaper`](crate::serialize::stream::DashEscaper);
//! this module holds the reader and the canonical-text hashing that
//! both sides share.
//!
//!   [Section 7 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-7

use layered_reader::BufferedReader;

use crate::crypto::hash;
use crate::types::HashAlgorithm;
use crate::Error;
use crate::Result;

/// The framing line opening a cleartext signed message.
pub const BEGIN: &str = "-----BEGIN PGP SIGNED MESSAGE-----";

/// The framing line opening the trailing signature block.
pub(crate) const BEGIN_SIGNATURE: &str = "-----BEGIN PGP SIGNATURE-----";

/// Whether a cleartext line must be dash-escaped.
///
/// Lines starting with a dash must be escaped; lines starting with
/// `From ` followed by a space should be, to survive mail systems.
pub(crate) fn needs_escape(line: &[u8]) -> bool {
    line.starts_with(b"-") || line.starts_with(b"From ")
}

/// Reverses dash-escaping for one line.
pub(crate) fn unescape(line: &[u8]) -> &[u8] {
    line.strip_prefix(b"- ").unwrap_or(line)
}

/// Hashes text in its canonical form.
///
/// Canonical text uses CRLF line endings and carries no trailing
/// spaces or tabs on any line.  The line ending that terminates the
/// final line is not part of the canonical form: each line ending is
/// hashed only once the next line proves it was not the last (the rule
/// of [Section 7.1 of RFC 4880]).
///
///   [Section 7.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-7.1
pub(crate) struct CanonicalHasher {
    contexts: Vec<hash::Context>,
    any_line: bool,
}

impl CanonicalHasher {
    pub(crate) fn new(contexts: Vec<hash::Context>) -> Self {
        CanonicalHasher {
            contexts,
            any_line: false,
        }
    }

    /// Feeds one line, given without its line ending.
    pub(crate) fn update_line(&mut self, line: &[u8]) {
        let trimmed_len = line.iter().rev()
            .take_while(|&&b| b == b' ' || b == b'\t' || b == b'\r')
            .count();
        let line = &line[..line.len() - trimmed_len];

        for ctx in self.contexts.iter_mut() {
            if self.any_line {
                ctx.update(b"\r\n");
            }
            ctx.update(line);
        }
        self.any_line = true;
    }

    /// Returns the context for the given algorithm, if present.
    pub(crate) fn context(&self, algo: HashAlgorithm)
                          -> Option<&hash::Context> {
        self.contexts.iter().find(|c| c.algo() == algo)
    }

    /// Returns all contexts.
    pub(crate) fn contexts(&self) -> &[hash::Context] {
        &self.contexts
    }
}

/// Decodes the cleartext part of a cleartext signed message.
///
/// After [`Decoder::read_header`], [`Decoder::next_line`] yields the
/// unescaped message lines while hashing the canonical text; once it
/// returns `None`, the underlying reader is positioned exactly at the
/// `-----BEGIN PGP SIGNATURE-----` line and the digest is available
/// via [`Decoder::context`].
pub struct Decoder<'a> {
    source: Box<dyn BufferedReader + 'a>,
    hasher: CanonicalHasher,
    hash_algos: Vec<HashAlgorithm>,
    headers: Vec<(String, String)>,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder; call [`Decoder::read_header`] next.
    pub fn from_buffered_reader(source: Box<dyn BufferedReader + 'a>)
                                -> Self {
        Decoder {
            source,
            hasher: CanonicalHasher::new(Vec::new()),
            hash_algos: Vec::new(),
            headers: Vec::new(),
        }
    }

    fn next_source_line(&mut self) -> Result<String> {
        let line = self.source.read_to(b'\n')?;
        if line.is_empty() {
            return Err(Error::MalformedMessage(
                "EOF inside a cleartext signed message".into()).into());
        }
        let n = line.len();
        let line = std::str::from_utf8(line)
            .map_err(|_| Error::MalformedMessage(
                "cleartext framing is not valid UTF-8".into()))?
            .trim_end_matches(|c| c == '\r' || c == '\n')
            .to_string();
        self.source.consume(n);
        Ok(line)
    }

    /// Consumes the framing header and the `Hash:` headers.
    ///
    /// Installs one hash context per announced algorithm; without a
    /// `Hash:` header, MD5 is implied per the RFC.
    pub fn read_header(&mut self) -> Result<()> {
        let first = self.next_source_line()?;
        if first.trim() != BEGIN {
            return Err(Error::MalformedMessage(format!(
                "expected {:?}, got {:?}", BEGIN, first)).into());
        }

        loop {
            let line = self.next_source_line()?;
            if line.trim().is_empty() {
                break;
            }

            let (key, value) = line.split_once(": ").ok_or_else(
                || Error::MalformedMessage(format!(
                    "expected a Key: Value header, got {:?}", line)))?;
            if key.trim() == "Hash" {
                for name in value.split(',') {
                    let name = name.trim();
                    if name.is_empty() {
                        continue;
                    }
                    let algo = HashAlgorithm::from_text_name(name)
                        .ok_or_else(|| Error::UnsupportedHashAlgorithm(
                            HashAlgorithm::Unknown(0)))?;
                    if !self.hash_algos.contains(&algo) {
                        self.hash_algos.push(algo);
                    }
                }
            }
            self.headers.push((key.trim().into(), value.into()));
        }

        if self.hash_algos.is_empty() {
            // RFC 4880, section 7: an omitted Hash header implies MD5.
            self.hash_algos.push(HashAlgorithm::MD5);
        }

        let mut contexts = Vec::new();
        for algo in &self.hash_algos {
            contexts.push(algo.context()?);
        }
        self.hasher = CanonicalHasher::new(contexts);
        Ok(())
    }

    /// Returns the framing headers.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns the announced hash algorithms.
    pub fn hash_algos(&self) -> &[HashAlgorithm] {
        &self.hash_algos
    }

    /// Returns the next unescaped message line including a `\n`, or
    /// `None` once the signature block is reached.
    pub fn next_line(&mut self) -> Result<Option<Vec<u8>>> {
        // Peek: the signature framing line must stay unconsumed so
        // that the armor reader finds it.
        let line = self.source.read_to(b'\n')?;
        if line.is_empty() {
            return Err(Error::MalformedMessage(
                "cleartext message lacks a signature block".into()).into());
        }
        let text = std::str::from_utf8(line).map_err(
            |_| Error::MalformedMessage(
                "cleartext body is not valid UTF-8".into()))?;
        if text.trim_end_matches(|c| c == '\r' || c == '\n').trim()
            == BEGIN_SIGNATURE
        {
            return Ok(None);
        }

        let n = line.len();
        let line = self.next_source_line()?;
        debug_assert!(n >= line.len());

        let unescaped = unescape(line.as_bytes());
        self.hasher.update_line(unescaped);

        let mut out = unescaped.to_vec();
        out.push(b'\n');
        Ok(Some(out))
    }

    /// Returns the hash context for the given algorithm.
    pub fn context(&self, algo: HashAlgorithm) -> Option<&hash::Context> {
        self.hasher.context(algo)
    }

    /// Returns the hash contexts over the canonical text.
    pub fn contexts(&self) -> &[hash::Context] {
        self.hasher.contexts()
    }

    /// Returns the underlying reader, positioned at the signature
    /// block.
    pub fn into_source(self) -> Box<dyn BufferedReader + 'a> {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaping_predicate() {
        assert!(needs_escape(b"- escaped"));
        assert!(needs_escape(b"-"));
        assert!(needs_escape(b"From here on"));
        assert!(!needs_escape(b"plain line"));
        assert!(!needs_escape(b"Fromage"));
        assert_eq!(unescape(b"- - text"), b"- text");
        assert_eq!(unescape(b"text"), b"text");
    }

    #[test]
    fn canonical_hashing_excludes_final_eol() {
        let mut a = CanonicalHasher::new(
            vec![HashAlgorithm::SHA256.context().unwrap()]);
        a.update_line(b"one");
        a.update_line(b"two");

        let mut reference = HashAlgorithm::SHA256.context().unwrap();
        reference.update(b"one\r\ntwo");

        assert_eq!(a.context(HashAlgorithm::SHA256).unwrap().clone()
                       .into_digest(),
                   reference.into_digest());
    }

    #[test]
    fn canonical_hashing_strips_trailing_whitespace() {
        let mut a = CanonicalHasher::new(
            vec![HashAlgorithm::SHA1.context().unwrap()]);
        a.update_line(b"one  \t");
        a.update_line(b"two\r");

        let mut b = CanonicalHasher::new(
            vec![HashAlgorithm::SHA1.context().unwrap()]);
        b.update_line(b"one");
        b.update_line(b"two");

        assert_eq!(a.context(HashAlgorithm::SHA1).unwrap().clone()
                       .into_digest(),
                   b.context(HashAlgorithm::SHA1).unwrap().clone()
                       .into_digest());
    }

    #[test]
    fn decoder_walks_the_framing() {
        let input = "-----BEGIN PGP SIGNED MESSAGE-----\n\
                     Hash: SHA256\n\
                     \n\
                     plain\n\
                     - - was dash escaped\n\
                     -----BEGIN PGP SIGNATURE-----\n";
        let mut d = Decoder::from_buffered_reader(
            Box::new(layered_reader::Memory::new(input.as_bytes())));
        d.read_header().unwrap();
        assert_eq!(d.hash_algos(), &[HashAlgorithm::SHA256]);

        assert_eq!(d.next_line().unwrap().unwrap(), b"plain\n");
        assert_eq!(d.next_line().unwrap().unwrap(),
                   b"- was dash escaped\n");
        assert!(d.next_line().unwrap().is_none());
        assert!(d.context(HashAlgorithm::SHA256).is_some());

        // The signature framing line is still there for the armor
        // reader.
        let mut source = d.into_source();
        let line = source.read_to(b'\n').unwrap();
        assert_eq!(line, BEGIN_SIGNATURE.as_bytes().iter().cloned()
                   .chain(std::iter::once(b'\n')).collect::<Vec<_>>());
    }
}
