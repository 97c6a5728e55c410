//! Cryptographic primitives.
//!
//! Thin, uniform wrappers over the cipher, digest and public key
//! crates: hash contexts with an init/update/finish contract, block
//! ciphers in OpenPGP's CFB mode, and the RSA/DSA/ElGamal operations
//! the packet layer needs.  Key material lives in buffers that are
//! zeroed on drop.

pub mod asymmetric;
pub mod hash;
pub(crate) mod mem;
pub mod mpi;
pub mod s2k;
pub mod symmetric;

pub use mem::Protected;

use crate::Result;

/// Holds a session key.
///
/// The session key is cleared when dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey(Protected);

impl SessionKey {
    /// Creates a new session key of `size` random bytes.
    pub fn new(size: usize) -> Result<Self> {
        use rand::RngCore;
        let mut sk = vec![0u8; size];
        rand::rngs::OsRng.try_fill_bytes(&mut sk)?;
        Ok(Self(sk.into()))
    }
}

impl std::ops::Deref for SessionKey {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for SessionKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for SessionKey {
    fn from(v: Vec<u8>) -> Self {
        SessionKey(v.into())
    }
}

impl From<Protected> for SessionKey {
    fn from(v: Protected) -> Self {
        SessionKey(v)
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if cfg!(debug_assertions) {
            write!(f, "SessionKey ({:?})", &self.0)
        } else {
            f.write_str("SessionKey (<Redacted>)")
        }
    }
}

/// Holds a password.
///
/// The password is cleared when dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(Protected);

impl std::ops::Deref for Password {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&str> for Password {
    fn from(s: &str) -> Self {
        Password(s.as_bytes().to_vec().into())
    }
}

impl From<String> for Password {
    fn from(s: String) -> Self {
        Password(s.into_bytes().into())
    }
}

impl From<Vec<u8>> for Password {
    fn from(v: Vec<u8>) -> Self {
        Password(v.into())
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if cfg!(debug_assertions) {
            write!(f, "Password ({:?})", &self.0)
        } else {
            f.write_str("Password (<Redacted>)")
        }
    }
}
