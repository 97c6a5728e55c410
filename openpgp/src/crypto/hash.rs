//! Functionality to hash packets, and generate hashes.

use std::io;

use digest::Digest as _;
use digest::DynDigest;
use digest::InvalidBufferSize;

use crate::HashAlgorithm;
use crate::Error;
use crate::Result;

/// Adapts [`sha1collisiondetection::Sha1CD`] to [`DynDigest`].
///
/// `Sha1CD`'s `finalize`-family of methods consumes `self` and cannot
/// reset in place, so it does not satisfy the blanket `DynDigest` impl
/// for `FixedOutputReset` types.  This wrapper delegates to its
/// reset-preserving `finalize_reset_cd` instead.
#[derive(Clone)]
struct Sha1CDDigest(sha1collisiondetection::Sha1CD);

impl DynDigest for Sha1CDDigest {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize_into(self, buf: &mut [u8]) -> std::result::Result<(), InvalidBufferSize> {
        let mut this = self;
        DynDigest::finalize_into_reset(&mut this, buf)?;
        Ok(())
    }

    fn finalize_into_reset(&mut self, buf: &mut [u8])
                           -> std::result::Result<(), InvalidBufferSize> {
        if buf.len() != self.output_size() {
            return Err(InvalidBufferSize);
        }
        let mut digest = sha1collisiondetection::Output::default();
        let _ = self.0.finalize_into_dirty_cd(&mut digest);
        self.0.reset();
        buf.copy_from_slice(digest.as_ref());
        Ok(())
    }

    fn reset(&mut self) {
        self.0.reset();
    }

    fn output_size(&self) -> usize {
        20
    }

    fn box_clone(&self) -> Box<dyn DynDigest> {
        Box::new(self.clone())
    }
}

/// State of a hash function.
pub struct Context {
    algo: HashAlgorithm,
    ctx: Box<dyn DynDigest>,
}

impl Clone for Context {
    fn clone(&self) -> Self {
        Context {
            algo: self.algo,
            ctx: self.ctx.box_clone(),
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("hash::Context")
            .field("algo", &self.algo)
            .finish()
    }
}

impl Context {
    /// Returns the algorithm.
    pub fn algo(&self) -> HashAlgorithm {
        self.algo
    }

    /// Size of the digest in bytes.
    pub fn digest_size(&self) -> usize {
        self.ctx.output_size()
    }

    /// Writes data into the hash function.
    pub fn update<D: AsRef<[u8]>>(&mut self, data: D) {
        self.ctx.update(data.as_ref());
    }

    /// Finalizes the hash function and writes the digest into the
    /// provided slice.
    ///
    /// Resets the hash function context.  `digest` must be at least
    /// `self.digest_size()` bytes large, otherwise the digest is
    /// truncated.
    pub fn digest<D: AsMut<[u8]>>(&mut self, mut digest: D) {
        let d = self.ctx.finalize_reset();
        let digest = digest.as_mut();
        let n = std::cmp::min(digest.len(), d.len());
        digest[..n].copy_from_slice(&d[..n]);
    }

    /// Finalizes the hash function and returns the digest.
    pub fn into_digest(mut self) -> Vec<u8> {
        let mut d = vec![0u8; self.digest_size()];
        self.digest(&mut d);
        d
    }
}

impl io::Write for Context {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl HashAlgorithm {
    /// Whether this crate supports this algorithm.
    pub fn is_supported(self) -> bool {
        use HashAlgorithm::*;
        matches!(self,
                 MD5 | SHA1 | RipeMD | SHA256 | SHA384 | SHA512 | SHA224)
    }

    /// Creates a new hash context for this algorithm.
    ///
    /// # Errors
    ///
    /// Fails with `Error::UnsupportedHashAlgorithm` if this crate does
    /// not support the algorithm.  See
    /// [`HashAlgorithm::is_supported`].
    pub fn context(self) -> Result<Context> {
        use HashAlgorithm::*;

        let ctx: Box<dyn DynDigest> = match self {
            MD5 => Box::new(md5::Md5::new()),
            SHA1 => Box::new(Sha1CDDigest(sha1collisiondetection::Sha1CD::new())),
            RipeMD => Box::new(ripemd::Ripemd160::new()),
            SHA256 => Box::new(sha2::Sha256::new()),
            SHA384 => Box::new(sha2::Sha384::new()),
            SHA512 => Box::new(sha2::Sha512::new()),
            SHA224 => Box::new(sha2::Sha224::new()),
            _ => return Err(Error::UnsupportedHashAlgorithm(self).into()),
        };

        Ok(Context { algo: self, ctx })
    }

    /// Returns the size of the digest in bytes.
    pub fn digest_size(self) -> Result<usize> {
        use HashAlgorithm::*;
        match self {
            MD5 => Ok(16),
            SHA1 | RipeMD => Ok(20),
            SHA224 => Ok(28),
            SHA256 => Ok(32),
            SHA384 => Ok(48),
            SHA512 => Ok(64),
            _ => Err(Error::UnsupportedHashAlgorithm(self).into()),
        }
    }
}

/// Hashes OpenPGP packets and related types into a hash context.
pub trait Hash {
    /// Updates the given hash with this object.
    fn hash(&self, hash: &mut Context);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sha1_abc() {
        let mut ctx = HashAlgorithm::SHA1.context().unwrap();
        ctx.update(b"abc");
        let mut digest = [0u8; 20];
        ctx.digest(&mut digest);
        assert_eq!(&digest[..],
                   &[0xa9, 0x99, 0x3e, 0x36, 0x47, 0x06, 0x81, 0x6a,
                     0xba, 0x3e, 0x25, 0x71, 0x78, 0x50, 0xc2, 0x6c,
                     0x9c, 0xd0, 0xd8, 0x9d]);
    }

    #[test]
    fn sha256_empty() {
        let ctx = HashAlgorithm::SHA256.context().unwrap();
        assert_eq!(ctx.digest_size(), 32);
        let digest = ctx.into_digest();
        assert_eq!(&digest[..4], &[0xe3, 0xb0, 0xc4, 0x42]);
    }

    #[test]
    fn contexts_clone() {
        let mut a = HashAlgorithm::SHA256.context().unwrap();
        a.update(b"common prefix");
        let mut b = a.clone();

        a.update(b"x");
        b.update(b"x");

        assert_eq!(a.into_digest(), b.into_digest());
    }

    #[test]
    fn unsupported() {
        assert!(HashAlgorithm::Unknown(42).context().is_err());
        assert!(!HashAlgorithm::Private(100).is_supported());
    }
}
