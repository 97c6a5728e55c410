//! Signature packets and signature creation.
//!
//! See [Section 5.2 of RFC 4880].  Both v3 and v4 signatures are
//! supported: v3 signatures carry their creation time and issuer in
//! fixed fields, v4 signatures in subpacket areas.
//!
//!   [Section 5.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2

pub mod subpacket;

use std::fmt;

pub use subpacket::{Subpacket, SubpacketArea, SubpacketTag,
                    SubpacketValue};

use crate::crypto::asymmetric;
use crate::crypto::hash::{self, Hash};
use crate::crypto::mpi::SignatureParams;
use crate::packet::{Key, SecretKey};
use crate::types::{HashAlgorithm, PublicKeyAlgorithm, SignatureType};
use crate::Error;
use crate::KeyID;
use crate::Packet;
use crate::Result;

/// Holds a Signature packet.
#[derive(PartialEq, Eq, Hash, Clone)]
pub struct Signature {
    version: u8,
    sigtype: SignatureType,
    pk_algo: PublicKeyAlgorithm,
    hash_algo: HashAlgorithm,
    hashed_area: SubpacketArea,
    unhashed_area: SubpacketArea,
    /// The first two octets of the digest, for a quick reject.
    hash_prefix: [u8; 2],
    mpis: SignatureParams,
    /// v3 only: the creation time field.
    v3_creation_time: u32,
    /// v3 only: the issuer field.
    v3_signer: Option<KeyID>,
}

impl Signature {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(version: u8, sigtype: SignatureType,
                             pk_algo: PublicKeyAlgorithm,
                             hash_algo: HashAlgorithm,
                             hashed_area: SubpacketArea,
                             unhashed_area: SubpacketArea,
                             hash_prefix: [u8; 2],
                             mpis: SignatureParams,
                             v3_creation_time: u32,
                             v3_signer: Option<KeyID>) -> Self {
        Signature {
            version, sigtype, pk_algo, hash_algo,
            hashed_area, unhashed_area,
            hash_prefix, mpis, v3_creation_time, v3_signer,
        }
    }

    /// Returns the version of the signature packet.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Returns the signature type.
    pub fn sigtype(&self) -> SignatureType {
        self.sigtype
    }

    /// Returns the public key algorithm.
    pub fn pk_algo(&self) -> PublicKeyAlgorithm {
        self.pk_algo
    }

    /// Returns the hash algorithm.
    pub fn hash_algo(&self) -> HashAlgorithm {
        self.hash_algo
    }

    /// Returns the hashed subpacket area.
    pub fn hashed_area(&self) -> &SubpacketArea {
        &self.hashed_area
    }

    /// Returns the unhashed subpacket area.
    pub fn unhashed_area(&self) -> &SubpacketArea {
        &self.unhashed_area
    }

    /// Returns the two stored digest prefix octets.
    pub fn hash_prefix(&self) -> &[u8; 2] {
        &self.hash_prefix
    }

    /// Returns the signature parameters.
    pub fn mpis(&self) -> &SignatureParams {
        &self.mpis
    }

    /// Returns when the signature was made, seconds since the epoch.
    pub fn creation_time(&self) -> Option<u32> {
        if self.version == 3 {
            return Some(self.v3_creation_time);
        }
        match self.hashed_area
            .lookup(SubpacketTag::SignatureCreationTime)
            .map(|sp| sp.value())
        {
            Some(SubpacketValue::SignatureCreationTime(t)) => Some(*t),
            _ => None,
        }
    }

    /// Returns the signer's key ID.
    ///
    /// For v4 signatures, the hashed issuer subpacket is preferred
    /// over the unhashed one.
    pub fn issuer(&self) -> Option<KeyID> {
        if self.version == 3 {
            return self.v3_signer;
        }
        for area in [&self.hashed_area, &self.unhashed_area] {
            if let Some(SubpacketValue::Issuer(id))
                = area.lookup(SubpacketTag::Issuer).map(|sp| sp.value())
            {
                return Some(*id);
            }
        }
        None
    }

    /// Creates a fresh hash context for this signature's algorithm.
    pub fn hash_context(&self) -> Result<hash::Context> {
        self.hash_algo.context()
    }

    /// Verifies the signature against a finished document digest.
    ///
    /// `ctx` must have digested the signed data (canonicalized for
    /// text signatures); the signature fields and trailer are appended
    /// here.  Fails with a `crypto` kind error if the signature does
    /// not check out.
    pub fn verify_digest(&self, key: &Key, mut ctx: hash::Context)
                         -> Result<()> {
        if ctx.algo() != self.hash_algo {
            return Err(Error::InvalidArgument(
                format!("digest is {}, signature wants {}",
                        ctx.algo(), self.hash_algo)).into());
        }

        self.hash(&mut ctx);
        let digest = ctx.into_digest();

        if digest[..2] != self.hash_prefix[..] {
            return Err(Error::BadSignature(
                "digest prefix mismatch".into()).into());
        }

        asymmetric::verify(self.pk_algo, key.mpis(), self.hash_algo,
                           &digest, &self.mpis)
    }

    /// Verifies the signature over an in-core document.
    ///
    /// Text signatures are verified over the canonical form of the
    /// document.
    pub fn verify_document(&self, key: &Key, document: &[u8])
                           -> Result<()> {
        let mut ctx = self.hash_context()?;
        if self.sigtype == SignatureType::Text {
            ctx.update(canonicalize_text(document));
        } else {
            ctx.update(document);
        }
        self.verify_digest(key, ctx)
    }
}

impl Hash for Signature {
    /// Updates the hash with the signature fields that are covered by
    /// the digest, including the trailer.
    fn hash(&self, hash: &mut hash::Context) {
        if self.version == 3 {
            // v3: one octet of type, four octets of creation time.
            hash.update([u8::from(self.sigtype)]);
            hash.update(self.v3_creation_time.to_be_bytes());
            return;
        }

        // A version 4 signature hashes five fields, the hashed
        // subpacket area, and a trailer:
        //
        //   version      - 1 octet           \
        //   sigtype      - 1 octet            \
        //   pk_algo      - 1 octet             | covered by the digest
        //   hash_algo    - 1 octet            /
        //   hashed_len   - 2 octets, big endian
        //   hashed_area
        //   0x04 0xff
        //   amount       - 4 octets, big endian
        //
        // The amount counts the octets of this packet that were
        // hashed, i.e. 6 plus the hashed area.
        let hashed = self.hashed_area.data();

        let mut header = [0u8; 6];
        header[0] = self.version;
        header[1] = self.sigtype.into();
        header[2] = self.pk_algo.into();
        header[3] = self.hash_algo.into();
        header[4] = (hashed.len() >> 8) as u8;
        header[5] = hashed.len() as u8;

        hash.update(header);
        hash.update(hashed);

        let amount = 6 + hashed.len();
        let mut trailer = [0u8; 6];
        trailer[0] = 0x04;
        trailer[1] = 0xff;
        trailer[2..].copy_from_slice(&(amount as u32).to_be_bytes());
        hash.update(trailer);
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Signature")
            .field("version", &self.version)
            .field("sigtype", &self.sigtype)
            .field("pk_algo", &self.pk_algo)
            .field("hash_algo", &self.hash_algo)
            .field("hashed_area", &self.hashed_area)
            .field("unhashed_area", &self.unhashed_area)
            .field("hash_prefix",
                   &crate::fmt::to_hex(&self.hash_prefix))
            .field("mpis", &self.mpis)
            .finish()
    }
}

impl From<Signature> for Packet {
    fn from(p: Signature) -> Self {
        Packet::Signature(p)
    }
}

/// Builds a v4 signature packet.
///
/// The builder collects the signature type, hash algorithm and
/// subpackets; [`SignatureBuilder::sign_hash`] consumes it together
/// with a digest context and the signer's key, producing the final
/// [`Signature`].
#[derive(Debug, Clone)]
pub struct SignatureBuilder {
    sigtype: SignatureType,
    hash_algo: HashAlgorithm,
    hashed_area: SubpacketArea,
    unhashed_area: SubpacketArea,
}

impl SignatureBuilder {
    /// Creates a builder for the given signature type.
    pub fn new(sigtype: SignatureType) -> Self {
        SignatureBuilder {
            sigtype,
            hash_algo: HashAlgorithm::SHA256,
            hashed_area: SubpacketArea::default(),
            unhashed_area: SubpacketArea::default(),
        }
    }

    /// Returns the signature type.
    pub fn sigtype(&self) -> SignatureType {
        self.sigtype
    }

    /// Returns the hash algorithm.
    pub fn hash_algo(&self) -> HashAlgorithm {
        self.hash_algo
    }

    /// Sets the hash algorithm.
    pub fn set_hash_algo(mut self, algo: HashAlgorithm) -> Self {
        self.hash_algo = algo;
        self
    }

    /// Adds a creation time subpacket to the hashed area.
    pub fn set_creation_time(mut self, time: u32) -> Result<Self> {
        self.hashed_area.add(Subpacket::new(
            SubpacketValue::SignatureCreationTime(time)))?;
        Ok(self)
    }

    /// Adds an issuer subpacket to the hashed area.
    pub fn set_issuer(mut self, issuer: KeyID) -> Result<Self> {
        self.hashed_area.add(Subpacket::new(
            SubpacketValue::Issuer(issuer)))?;
        Ok(self)
    }

    /// Adds a subpacket to the hashed area.
    pub fn add_subpacket(mut self, subpacket: Subpacket) -> Result<Self> {
        self.hashed_area.add(subpacket)?;
        Ok(self)
    }

    /// Adds a subpacket to the unhashed area.
    pub fn add_unhashed_subpacket(mut self, subpacket: Subpacket)
                                  -> Result<Self> {
        self.unhashed_area.add(subpacket)?;
        Ok(self)
    }

    /// Returns the hashed subpacket area built so far.
    pub fn hashed_area(&self) -> &SubpacketArea {
        &self.hashed_area
    }

    /// Signs the digest in `ctx`, which must have been fed the signed
    /// document (canonicalized for text signatures).
    pub fn sign_hash(self, signer: &SecretKey, mut ctx: hash::Context)
                     -> Result<Signature> {
        if ctx.algo() != self.hash_algo {
            return Err(Error::InvalidArgument(
                format!("digest is {}, signature wants {}",
                        ctx.algo(), self.hash_algo)).into());
        }

        let pk_algo = signer.public().pk_algo();
        let hashed = self.hashed_area.data();

        let mut header = [0u8; 6];
        header[0] = 4;
        header[1] = self.sigtype.into();
        header[2] = pk_algo.into();
        header[3] = self.hash_algo.into();
        header[4] = (hashed.len() >> 8) as u8;
        header[5] = hashed.len() as u8;
        ctx.update(header);
        ctx.update(hashed);

        let amount = 6 + hashed.len();
        let mut trailer = [0u8; 6];
        trailer[0] = 0x04;
        trailer[1] = 0xff;
        trailer[2..].copy_from_slice(&(amount as u32).to_be_bytes());
        ctx.update(trailer);

        let digest = ctx.into_digest();
        let mpis = asymmetric::sign(pk_algo, signer.public().mpis(),
                                    signer.unencrypted_secret()?,
                                    self.hash_algo, &digest)?;

        Ok(Signature {
            version: 4,
            sigtype: self.sigtype,
            pk_algo,
            hash_algo: self.hash_algo,
            hashed_area: self.hashed_area,
            unhashed_area: self.unhashed_area,
            hash_prefix: [digest[0], digest[1]],
            mpis,
            v3_creation_time: 0,
            v3_signer: None,
        })
    }

    /// Signs an in-core document.
    pub fn sign_document(self, signer: &SecretKey, document: &[u8])
                         -> Result<Signature> {
        let mut ctx = self.hash_algo.context()?;
        if self.sigtype == SignatureType::Text {
            ctx.update(canonicalize_text(document));
        } else {
            ctx.update(document);
        }
        self.sign_hash(signer, ctx)
    }
}

/// Hashes a streamed document the way its signature type demands.
///
/// Binary documents are hashed as they are; text documents are hashed
/// in their canonical form, which this type produces incrementally so
/// that no layer has to buffer the document.
pub(crate) struct DocumentHasher {
    ctx: hash::Context,
    text: bool,
    // The current, still unterminated line.
    pending: Vec<u8>,
}

impl DocumentHasher {
    pub(crate) fn new(ctx: hash::Context, text: bool) -> Self {
        DocumentHasher {
            ctx,
            text,
            pending: Vec::new(),
        }
    }

    pub(crate) fn update(&mut self, data: &[u8]) {
        if !self.text {
            self.ctx.update(data);
            return;
        }

        for &b in data {
            if b == b'\n' {
                self.flush_line(true);
            } else {
                self.pending.push(b);
            }
        }
    }

    fn flush_line(&mut self, terminated: bool) {
        let trimmed_len = self.pending.iter().rev()
            .take_while(|&&b| b == b' ' || b == b'\t' || b == b'\r')
            .count();
        self.ctx.update(&self.pending[..self.pending.len() - trimmed_len]);
        if terminated {
            self.ctx.update(b"\r\n");
        }
        self.pending.clear();
    }

    /// Finishes canonicalization and returns the document context.
    pub(crate) fn into_context(mut self) -> hash::Context {
        if self.text && !self.pending.is_empty() {
            self.flush_line(false);
        }
        self.ctx
    }
}

/// Produces the canonical text form of a document: CRLF line endings,
/// trailing spaces and tabs stripped from every line.
pub(crate) fn canonicalize_text(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 32);
    for (i, line) in data.split(|&b| b == b'\n').enumerate() {
        if i > 0 {
            out.extend_from_slice(b"\r\n");
        }
        let trimmed_len = line.iter().rev()
            .take_while(|&&b| b == b' ' || b == b'\t' || b == b'\r')
            .count();
        out.extend_from_slice(&line[..line.len() - trimmed_len]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::asymmetric::{generate_dsa_key, generate_rsa_key};

    #[test]
    fn canonical_text() {
        assert_eq!(canonicalize_text(b"hello\n"), b"hello\r\n");
        assert_eq!(canonicalize_text(b"hello\r\n"), b"hello\r\n");
        assert_eq!(canonicalize_text(b"a  \nb\t\nc"), b"a\r\nb\r\nc");
        assert_eq!(canonicalize_text(b"abc\r\nxyz"), b"abc\r\nxyz");
        assert_eq!(canonicalize_text(b""), b"");
    }

    #[test]
    fn sign_verify_binary() {
        let (public, secret) = generate_rsa_key(1024).unwrap();
        let key = Key::new(1000, PublicKeyAlgorithm::RSAEncryptSign,
                           public);
        let signer = SecretKey::new(key.clone(), secret);

        let sig = SignatureBuilder::new(SignatureType::Binary)
            .set_hash_algo(HashAlgorithm::SHA256)
            .set_creation_time(1234567890).unwrap()
            .set_issuer(key.keyid().unwrap()).unwrap()
            .sign_document(&signer, b"a message").unwrap();

        assert_eq!(sig.version(), 4);
        assert_eq!(sig.issuer(), Some(key.keyid().unwrap()));
        assert_eq!(sig.creation_time(), Some(1234567890));

        sig.verify_document(&key, b"a message").unwrap();
        assert!(sig.verify_document(&key, b"a messagf").is_err());
    }

    #[test]
    fn text_signatures_ignore_line_endings() {
        let (public, secret) = generate_dsa_key().unwrap();
        let key = Key::new(1000, PublicKeyAlgorithm::DSA, public);
        let signer = SecretKey::new(key.clone(), secret);

        let sig = SignatureBuilder::new(SignatureType::Text)
            .set_hash_algo(HashAlgorithm::SHA1)
            .set_creation_time(1).unwrap()
            .sign_document(&signer, b"one\ntwo  \nthree").unwrap();

        sig.verify_document(&key, b"one\r\ntwo\r\nthree").unwrap();
        sig.verify_document(&key, b"one\ntwo\nthree").unwrap();
        assert!(sig.verify_document(&key, b"one\ntwo\nthree!").is_err());
    }
}
