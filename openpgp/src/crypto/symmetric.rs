//! Block ciphers in OpenPGP's CFB mode.
//!
//! OpenPGP runs its block ciphers in a CFB variant with an all-zero
//! initialization vector and a random block-size prefix whose last two
//! octets are repeated as a quick check (see [Section 13.9 of RFC
//! 4880]).  The legacy Symmetrically Encrypted Data packet additionally
//! "resynchronizes" the feedback register after the prefix; the
//! integrity protected packet does not.
//!
//!   [Section 13.9 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-13.9

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use cipher::generic_array::GenericArray;
use cipher::{BlockEncrypt, BlockSizeUser, KeyInit};

use crate::crypto::hash;
use crate::types::{HashAlgorithm, SymmetricAlgorithm};
use crate::Error;
use crate::Result;

/// A block permutation: the encrypt direction of a block cipher.
///
/// CFB mode only ever uses the forward permutation, so this is all a
/// cipher implementation needs to provide.
pub(crate) trait BlockCipher {
    /// The cipher's block size in bytes.
    fn block_size(&self) -> usize;

    /// Encrypts one block in place.
    fn encrypt_block(&self, block: &mut [u8]);
}

struct Ecb<C>(C);

impl<C> BlockCipher for Ecb<C>
where
    C: BlockEncrypt + BlockSizeUser,
{
    fn block_size(&self) -> usize {
        C::block_size()
    }

    fn encrypt_block(&self, block: &mut [u8]) {
        self.0.encrypt_block(GenericArray::from_mut_slice(block));
    }
}

impl SymmetricAlgorithm {
    /// Whether this crate supports this algorithm.
    pub fn is_supported(self) -> bool {
        use SymmetricAlgorithm::*;
        matches!(self, IDEA | TripleDES | CAST5 | Blowfish
                 | AES128 | AES192 | AES256 | Twofish)
    }

    pub(crate) fn make_cipher(self, key: &[u8])
                              -> Result<Box<dyn BlockCipher>> {
        use SymmetricAlgorithm::*;

        if key.len() != self.key_size()? {
            return Err(Error::InvalidSessionKey(
                format!("{}: expected {} key octets, got {}",
                        self, self.key_size()?, key.len())).into());
        }

        fn mk<C>(key: &[u8]) -> Result<Box<dyn BlockCipher>>
        where
            C: BlockEncrypt + BlockSizeUser + KeyInit + 'static,
        {
            Ok(Box::new(Ecb(C::new_from_slice(key).map_err(
                |_| Error::InvalidSessionKey("bad key length".into()))?)))
        }

        match self {
            IDEA => mk::<idea::Idea>(key),
            TripleDES => mk::<des::TdesEde3>(key),
            CAST5 => mk::<cast5::Cast5>(key),
            Blowfish => mk::<blowfish::Blowfish>(key),
            AES128 => mk::<aes::Aes128>(key),
            AES192 => mk::<aes::Aes192>(key),
            AES256 => mk::<aes::Aes256>(key),
            Twofish => mk::<twofish::Twofish>(key),
            _ => Err(Error::UnsupportedSymmetricAlgorithm(self).into()),
        }
    }
}

/// OpenPGP CFB state.
///
/// Encrypts or decrypts a byte stream; the same state type serves both
/// directions because CFB only uses the cipher's forward permutation.
pub struct Cfb {
    cipher: Box<dyn BlockCipher>,
    // The last block_size ciphertext octets, oldest first.  The
    // initial feedback register is all zeros.
    fr: Vec<u8>,
    // E(fr) as of the last refill.
    keystream: Vec<u8>,
    // Keystream octets consumed since the last refill.
    pos: usize,
}

impl Cfb {
    /// Creates a CFB state for the given algorithm and session key.
    ///
    /// The feedback register starts as all zeros, as OpenPGP encrypted
    /// data packets require.
    pub fn new(algo: SymmetricAlgorithm, key: &[u8]) -> Result<Self> {
        let bs = algo.block_size()?;
        Self::with_iv(algo, key, &vec![0u8; bs])
    }

    /// Creates a CFB state with an explicit initialization vector.
    ///
    /// Passphrase-protected secret keys store their IV in the packet
    /// instead of using the zero-IV-plus-random-prefix construction.
    pub fn with_iv(algo: SymmetricAlgorithm, key: &[u8], iv: &[u8])
                   -> Result<Self> {
        let cipher = algo.make_cipher(key)?;
        let bs = cipher.block_size();
        if iv.len() != bs {
            return Err(Error::InvalidArgument(
                format!("expected {} IV octets, got {}", bs, iv.len()))
                       .into());
        }
        let mut keystream = iv.to_vec();
        cipher.encrypt_block(&mut keystream);
        Ok(Cfb {
            cipher,
            fr: iv.to_vec(),
            keystream,
            pos: 0,
        })
    }

    /// The cipher's block size in bytes.
    pub fn block_size(&self) -> usize {
        self.fr.len()
    }

    fn refill(&mut self) {
        self.keystream.copy_from_slice(&self.fr);
        self.cipher.encrypt_block(&mut self.keystream);
        self.pos = 0;
    }

    fn step(&mut self, input: u8, decrypt: bool) -> u8 {
        if self.pos == self.fr.len() {
            self.refill();
        }

        let output = input ^ self.keystream[self.pos];
        let ciphertext = if decrypt { input } else { output };

        self.fr.rotate_left(1);
        *self.fr.last_mut().expect("block size is nonzero") = ciphertext;
        self.pos += 1;

        output
    }

    /// Encrypts a buffer in place.
    pub fn encrypt(&mut self, buf: &mut [u8]) {
        for b in buf {
            *b = self.step(*b, false);
        }
    }

    /// Decrypts a buffer in place.
    pub fn decrypt(&mut self, buf: &mut [u8]) {
        for b in buf {
            *b = self.step(*b, true);
        }
    }

    /// Resynchronizes the feedback register.
    ///
    /// The last block-size ciphertext octets become the new feedback
    /// register and the keystream restarts from a block boundary.
    /// Called after the block-size + 2 octet prefix of a legacy
    /// encrypted data packet.
    pub fn resync(&mut self) {
        self.refill();
    }
}

/// Encrypts a byte stream to an inner writer using OpenPGP CFB.
pub struct Encryptor<W: io::Write> {
    cfb: Cfb,
    inner: Option<W>,
}

impl<W: io::Write> Encryptor<W> {
    /// Creates an encryptor for the given algorithm and session key.
    pub fn new(algo: SymmetricAlgorithm, key: &[u8], sink: W)
               -> Result<Self> {
        Ok(Encryptor {
            cfb: Cfb::new(algo, key)?,
            inner: Some(sink),
        })
    }

    /// Finishes encryption and returns the sink.
    pub fn finish(&mut self) -> Result<W> {
        self.inner.take().ok_or_else(
            || Error::InvalidOperation("already finished".into()).into())
    }
}

impl<W: io::Write> io::Write for Encryptor<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let inner = self.inner.as_mut().ok_or_else(
            || io::Error::new(io::ErrorKind::BrokenPipe,
                              "encryptor already finished"))?;

        // CFB needs no buffering; encrypt a bounded chunk at a time.
        let mut ciphertext = buf.to_vec();
        self.cfb.encrypt(&mut ciphertext);
        inner.write_all(&ciphertext)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_mut() {
            Some(inner) => inner.flush(),
            None => Ok(()),
        }
    }
}

/// Decrypts a byte stream pulled from an inner reader.
pub struct Decryptor<R: io::Read> {
    cfb: Cfb,
    source: R,
}

impl<R: io::Read> Decryptor<R> {
    /// Creates a decryptor for the given algorithm and session key.
    pub fn new(algo: SymmetricAlgorithm, key: &[u8], source: R)
               -> Result<Self> {
        Ok(Decryptor {
            cfb: Cfb::new(algo, key)?,
            source,
        })
    }

    /// Resynchronizes the feedback register; see [`Cfb::resync`].
    pub fn resync(&mut self) {
        self.cfb.resync();
    }
}

impl<R: io::Read> io::Read for Decryptor<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.source.read(buf)?;
        self.cfb.decrypt(&mut buf[..n]);
        Ok(n)
    }
}

/// The result slot a [`MdcReader`] fills in at end of stream.
pub(crate) type MdcResult = Rc<RefCell<Option<[u8; 20]>>>;

/// Tees a decrypted SEIP plaintext stream into the MDC hash.
///
/// The final 20 octets of the stream are the MDC digest itself: they
/// are passed through to the caller, but withheld from the hash.  Once
/// the stream ends, the computed digest is published through the
/// shared result slot.
pub(crate) struct MdcReader<R: io::Read> {
    source: R,
    hash: hash::Context,
    // Unhashed tail of what we have seen so far; the last 20 octets of
    // the stream must never be hashed.
    holdback: Vec<u8>,
    // Hashed bytes not yet handed to the caller.
    ready: Vec<u8>,
    source_eof: bool,
    finalized: bool,
    result: MdcResult,
}

const MDC_DIGEST_SIZE: usize = 20;

impl<R: io::Read> MdcReader<R> {
    /// Creates a new MDC tee.
    ///
    /// `source` must yield the decrypted plaintext starting with the
    /// encryption prefix; everything up to the trailing digest is
    /// hashed, the prefix included.
    pub fn new(source: R, hash: hash::Context, result: MdcResult) -> Self {
        assert_eq!(hash.algo(), HashAlgorithm::SHA1);
        MdcReader {
            source,
            hash,
            holdback: Vec::with_capacity(2 * MDC_DIGEST_SIZE),
            ready: Vec::new(),
            source_eof: false,
            finalized: false,
            result,
        }
    }

    fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;

        if self.holdback.len() == MDC_DIGEST_SIZE {
            let mut computed = [0u8; MDC_DIGEST_SIZE];
            self.hash.digest(&mut computed);
            *self.result.borrow_mut() = Some(computed);
        }
        // A short stream cannot contain an MDC packet; leave the slot
        // empty and let the packet parser flag the manipulation.

        // The trailing octets still belong to the caller.
        self.ready.append(&mut self.holdback);
    }
}

impl<R: io::Read> io::Read for MdcReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.ready.is_empty() && !self.finalized {
            if self.source_eof {
                self.finalize();
                break;
            }

            let mut chunk = [0u8; 4096];
            let n = self.source.read(&mut chunk)?;
            if n == 0 {
                self.source_eof = true;
                continue;
            }

            self.holdback.extend_from_slice(&chunk[..n]);
            if self.holdback.len() > MDC_DIGEST_SIZE {
                let release = self.holdback.len() - MDC_DIGEST_SIZE;
                self.hash.update(&self.holdback[..release]);
                self.ready.extend(self.holdback.drain(..release));
            }
        }

        let n = std::cmp::min(buf.len(), self.ready.len());
        buf[..n].copy_from_slice(&self.ready[..n]);
        self.ready.drain(..n);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    const ALGOS: &[SymmetricAlgorithm] = &[
        SymmetricAlgorithm::IDEA,
        SymmetricAlgorithm::TripleDES,
        SymmetricAlgorithm::CAST5,
        SymmetricAlgorithm::Blowfish,
        SymmetricAlgorithm::AES128,
        SymmetricAlgorithm::AES192,
        SymmetricAlgorithm::AES256,
        SymmetricAlgorithm::Twofish,
    ];

    fn key_for(algo: SymmetricAlgorithm) -> Vec<u8> {
        (0..algo.key_size().unwrap() as u8).collect()
    }

    #[test]
    fn cfb_roundtrip() {
        for &algo in ALGOS {
            let key = key_for(algo);
            let plaintext: Vec<u8> =
                (0..1025u32).map(|i| (i % 255) as u8).collect();

            let mut buf = plaintext.clone();
            Cfb::new(algo, &key).unwrap().encrypt(&mut buf);
            assert!(buf != plaintext, "{} did not encrypt", algo);

            Cfb::new(algo, &key).unwrap().decrypt(&mut buf);
            assert_eq!(buf, plaintext, "{} roundtrip failed", algo);
        }
    }

    #[test]
    fn cfb_roundtrip_with_resync() {
        for &algo in ALGOS {
            let key = key_for(algo);
            let bs = algo.block_size().unwrap();
            let prefix: Vec<u8> = (0..bs as u8 + 2).collect();
            let body = b"the quick brown fox jumps over the lazy dog";

            let mut enc = Cfb::new(algo, &key).unwrap();
            let mut c_prefix = prefix.clone();
            enc.encrypt(&mut c_prefix);
            enc.resync();
            let mut c_body = body.to_vec();
            enc.encrypt(&mut c_body);

            let mut dec = Cfb::new(algo, &key).unwrap();
            let mut p_prefix = c_prefix.clone();
            dec.decrypt(&mut p_prefix);
            assert_eq!(p_prefix, prefix);
            dec.resync();
            let mut p_body = c_body.clone();
            dec.decrypt(&mut p_body);
            assert_eq!(&p_body[..], &body[..]);
        }
    }

    #[test]
    fn cfb_is_stateful_across_chunks() {
        let algo = SymmetricAlgorithm::AES256;
        let key = key_for(algo);
        let plaintext: Vec<u8> = (0..257u32).map(|i| i as u8).collect();

        // Encrypt in one go.
        let mut whole = plaintext.clone();
        Cfb::new(algo, &key).unwrap().encrypt(&mut whole);

        // Encrypt in awkwardly sized chunks.
        let mut chunked = plaintext.clone();
        let mut cfb = Cfb::new(algo, &key).unwrap();
        let mut rest = &mut chunked[..];
        for size in [1, 2, 3, 5, 7, 64, 100] {
            let (chunk, tail) = rest.split_at_mut(size);
            cfb.encrypt(chunk);
            rest = tail;
        }
        cfb.encrypt(rest);

        assert_eq!(whole, chunked);
    }

    #[test]
    fn encryptor_decryptor_roundtrip() {
        let algo = SymmetricAlgorithm::AES128;
        let key = key_for(algo);
        let plaintext: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8)
            .collect();

        let mut ciphertext = Vec::new();
        {
            let mut enc = Encryptor::new(algo, &key, &mut ciphertext)
                .unwrap();
            for chunk in plaintext.chunks(33) {
                enc.write_all(chunk).unwrap();
            }
            enc.finish().unwrap();
        }
        assert_eq!(ciphertext.len(), plaintext.len());

        let mut dec = Decryptor::new(algo, &key, &ciphertext[..]).unwrap();
        let mut recovered = Vec::new();
        dec.read_to_end(&mut recovered).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn mdc_reader_withholds_digest_from_hash() {
        // Plaintext stream whose last 20 bytes play the role of the
        // MDC digest.
        let body = b"some plaintext, including the mdc header \xd3\x14";
        let mut digest = [0u8; 20];
        let mut h = HashAlgorithm::SHA1.context().unwrap();
        h.update(&body[..]);
        h.digest(&mut digest);

        let mut stream = body.to_vec();
        stream.extend_from_slice(&digest);

        let result: MdcResult = Default::default();
        let mut reader = MdcReader::new(
            &stream[..],
            HashAlgorithm::SHA1.context().unwrap(),
            result.clone());

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, stream);
        assert_eq!(*result.borrow(), Some(digest));
    }
}
