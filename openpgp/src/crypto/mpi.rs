//! Multiprecision integers and the algorithm-tagged parameter sets
//! built from them.
//!
//! An MPI is a big-endian integer prefixed by its length in bits (see
//! [Section 3.2 of RFC 4880]).  Key material, signatures and
//! public-key ciphertexts are tuples of MPIs whose shape depends on
//! the algorithm; the enums in this module keep that shape explicit.
//!
//!   [Section 3.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.2

use std::cmp::Ordering;
use std::fmt;
use std::io::Write;

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

use crate::crypto::hash::{self, Hash};
use crate::crypto::mem::{secure_cmp, Protected};
use crate::Result;

/// Holds a single MPI.
#[derive(Clone)]
pub struct MPI {
    /// Integer value as big-endian.
    value: Box<[u8]>,
}

impl From<Vec<u8>> for MPI {
    fn from(v: Vec<u8>) -> Self {
        Self::new(&v)
    }
}

impl MPI {
    /// Creates a new MPI.
    ///
    /// This function takes care of leading zeros.
    pub fn new(value: &[u8]) -> Self {
        let offset = value.iter().take_while(|&&b| b == 0).count();
        MPI {
            value: Vec::from(&value[offset..]).into_boxed_slice(),
        }
    }

    /// Returns the length of the MPI in bits.
    pub fn bits(&self) -> usize {
        self.value.len() * 8
            - self.value.first().map(|&b| b.leading_zeros() as usize)
                  .unwrap_or(0)
    }

    /// Returns the value of this MPI.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Returns the number of octets the wire representation takes:
    /// the two length octets plus the magnitude.
    pub fn serialized_len(&self) -> usize {
        2 + self.value.len()
    }

    /// Writes the MPI in wire format.
    pub fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        let len = self.bits() as u16;
        o.write_all(&len.to_be_bytes())?;
        o.write_all(&self.value)?;
        Ok(())
    }

    fn secure_memcmp(&self, other: &Self) -> Ordering {
        secure_cmp(&self.value, &other.value)
    }
}

impl fmt::Debug for MPI {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_fmt(format_args!(
            "{} bits: {}", self.bits(),
            crate::fmt::to_hex(&self.value)))
    }
}

impl Hash for MPI {
    fn hash(&self, hash: &mut hash::Context) {
        let len = self.bits() as u16;

        hash.update(len.to_be_bytes());
        hash.update(&self.value);
    }
}

#[cfg(test)]
impl Arbitrary for MPI {
    fn arbitrary(g: &mut Gen) -> Self {
        loop {
            let buf = <Vec<u8>>::arbitrary(g);

            if !buf.is_empty() && buf[0] != 0 {
                break MPI::new(&buf);
            }
        }
    }
}

impl PartialOrd for MPI {
    fn partial_cmp(&self, other: &MPI) -> Option<Ordering> {
        Some(self.secure_memcmp(other))
    }
}

impl Ord for MPI {
    fn cmp(&self, other: &MPI) -> Ordering {
        self.partial_cmp(other).unwrap()
    }
}

impl PartialEq for MPI {
    fn eq(&self, other: &MPI) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MPI {}

impl std::hash::Hash for MPI {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

/// Holds a single MPI containing secrets.
///
/// The memory is cleared when the object is dropped.
#[derive(Clone)]
pub struct ProtectedMPI {
    /// Integer value as big-endian.
    value: Protected,
}

impl From<Vec<u8>> for ProtectedMPI {
    fn from(m: Vec<u8>) -> Self {
        MPI::from(m).into()
    }
}

impl From<MPI> for ProtectedMPI {
    fn from(m: MPI) -> Self {
        ProtectedMPI {
            value: m.value.into(),
        }
    }
}

impl PartialEq for ProtectedMPI {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for ProtectedMPI {}

impl std::hash::Hash for ProtectedMPI {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl ProtectedMPI {
    /// Returns the length of the MPI in bits.
    pub fn bits(&self) -> usize {
        self.value.len() * 8
            - self.value.first().map(|&b| b.leading_zeros() as usize)
                  .unwrap_or(0)
    }

    /// Returns the value of this MPI.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Returns the number of octets the wire representation takes.
    pub fn serialized_len(&self) -> usize {
        2 + self.value.len()
    }

    /// Writes the MPI in wire format.
    pub fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        let len = self.bits() as u16;
        o.write_all(&len.to_be_bytes())?;
        o.write_all(&self.value)?;
        Ok(())
    }
}

impl fmt::Debug for ProtectedMPI {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if cfg!(debug_assertions) {
            f.write_fmt(format_args!(
                "{} bits: {}", self.bits(),
                crate::fmt::to_hex(self.value())))
        } else {
            f.write_str("<Redacted>")
        }
    }
}

/// Holds public key parameters.
///
/// Provides a typed and structured way of storing multiple MPIs in
/// key packets.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[non_exhaustive]
pub enum PublicParams {
    /// RSA public key.
    RSA {
        /// Public exponent.
        e: MPI,
        /// Public modulus N = pq.
        n: MPI,
    },

    /// NIST DSA public key.
    DSA {
        /// Prime of the ring Zp.
        p: MPI,
        /// Order of `g` in Zp.
        q: MPI,
        /// Public generator of Zp.
        g: MPI,
        /// Public key g^x mod p.
        y: MPI,
    },

    /// ElGamal public key.
    ElGamal {
        /// Prime of the ring Zp.
        p: MPI,
        /// Generator of Zp.
        g: MPI,
        /// Public key g^x mod p.
        y: MPI,
    },

    /// Unknown number of MPIs for an unknown algorithm.
    Unknown {
        /// The successfully parsed MPIs.
        mpis: Box<[MPI]>,
        /// Any data that failed to parse.
        rest: Box<[u8]>,
    },
}

impl PublicParams {
    /// Returns the length of the public key parameters in bits.
    ///
    /// For finite field crypto this is the size of the field.  Returns
    /// `None` for unknown parameter sets.
    pub fn bits(&self) -> Option<usize> {
        use self::PublicParams::*;
        match self {
            RSA { n, .. } => Some(n.bits()),
            DSA { p, .. } => Some(p.bits()),
            ElGamal { p, .. } => Some(p.bits()),
            Unknown { .. } => None,
        }
    }

    /// Returns the number of octets the wire representation takes.
    pub fn serialized_len(&self) -> usize {
        use self::PublicParams::*;
        match self {
            RSA { e, n } => n.serialized_len() + e.serialized_len(),
            DSA { p, q, g, y } =>
                p.serialized_len() + q.serialized_len()
                + g.serialized_len() + y.serialized_len(),
            ElGamal { p, g, y } =>
                p.serialized_len() + g.serialized_len() + y.serialized_len(),
            Unknown { mpis, rest } =>
                mpis.iter().map(|m| m.serialized_len()).sum::<usize>()
                + rest.len(),
        }
    }

    /// Writes the parameters in wire format.
    pub fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        use self::PublicParams::*;
        match self {
            RSA { e, n } => {
                n.serialize(o)?;
                e.serialize(o)?;
            }
            DSA { p, q, g, y } => {
                p.serialize(o)?;
                q.serialize(o)?;
                g.serialize(o)?;
                y.serialize(o)?;
            }
            ElGamal { p, g, y } => {
                p.serialize(o)?;
                g.serialize(o)?;
                y.serialize(o)?;
            }
            Unknown { mpis, rest } => {
                for m in mpis.iter() {
                    m.serialize(o)?;
                }
                o.write_all(rest)?;
            }
        }
        Ok(())
    }
}

impl Hash for PublicParams {
    fn hash(&self, hash: &mut hash::Context) {
        use self::PublicParams::*;
        match self {
            RSA { e, n } => {
                n.hash(hash);
                e.hash(hash);
            }
            DSA { p, q, g, y } => {
                p.hash(hash);
                q.hash(hash);
                g.hash(hash);
                y.hash(hash);
            }
            ElGamal { p, g, y } => {
                p.hash(hash);
                g.hash(hash);
                y.hash(hash);
            }
            Unknown { mpis, rest } => {
                for m in mpis.iter() {
                    m.hash(hash);
                }
                hash.update(rest);
            }
        }
    }
}

/// Holds secret key parameters.
///
/// The secret MPIs are cleared when the object is dropped.
#[derive(Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SecretParams {
    /// RSA secret key.
    RSA {
        /// Secret exponent, inverse of e in Phi(N).
        d: ProtectedMPI,
        /// Smaller secret prime.
        p: ProtectedMPI,
        /// Larger secret prime.
        q: ProtectedMPI,
        /// Inverse of p mod q.
        u: ProtectedMPI,
    },

    /// NIST DSA secret key.
    DSA {
        /// Secret key log_g(y) in Zp.
        x: ProtectedMPI,
    },

    /// ElGamal secret key.
    ElGamal {
        /// Secret key log_g(y) in Zp.
        x: ProtectedMPI,
    },

    /// Unknown number of MPIs for an unknown algorithm.
    Unknown {
        /// The successfully parsed MPIs.
        mpis: Box<[ProtectedMPI]>,
        /// Any data that failed to parse.
        rest: Protected,
    },
}

impl SecretParams {
    /// Returns the number of octets the wire representation takes.
    pub fn serialized_len(&self) -> usize {
        use self::SecretParams::*;
        match self {
            RSA { d, p, q, u } =>
                d.serialized_len() + p.serialized_len()
                + q.serialized_len() + u.serialized_len(),
            DSA { x } => x.serialized_len(),
            ElGamal { x } => x.serialized_len(),
            Unknown { mpis, rest } =>
                mpis.iter().map(|m| m.serialized_len()).sum::<usize>()
                + rest.len(),
        }
    }

    /// Writes the parameters in wire format.
    pub fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        use self::SecretParams::*;
        match self {
            RSA { d, p, q, u } => {
                d.serialize(o)?;
                p.serialize(o)?;
                q.serialize(o)?;
                u.serialize(o)?;
            }
            DSA { x } => x.serialize(o)?,
            ElGamal { x } => x.serialize(o)?,
            Unknown { mpis, rest } => {
                for m in mpis.iter() {
                    m.serialize(o)?;
                }
                o.write_all(rest)?;
            }
        }
        Ok(())
    }

    /// Computes the 16-bit additive checksum over the wire
    /// representation (see [Section 5.5.3 of RFC 4880]).
    ///
    ///   [Section 5.5.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.5.3
    pub fn checksum(&self) -> Result<u16> {
        let mut buf = Vec::with_capacity(self.serialized_len());
        self.serialize(&mut buf)?;
        Ok(buf.iter().fold(0u16, |acc, &b| acc.wrapping_add(b as u16)))
    }
}

impl fmt::Debug for SecretParams {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if cfg!(debug_assertions) {
            use self::SecretParams::*;
            match self {
                RSA { d, p, q, u } =>
                    write!(f, "RSA {{ d: {:?}, p: {:?}, q: {:?}, u: {:?} }}",
                           d, p, q, u),
                DSA { x } => write!(f, "DSA {{ x: {:?} }}", x),
                ElGamal { x } => write!(f, "ElGamal {{ x: {:?} }}", x),
                Unknown { mpis, rest } =>
                    write!(f, "Unknown {{ mpis: {:?}, rest: {:?} }}",
                           mpis, rest),
            }
        } else {
            f.write_str("<Redacted>")
        }
    }
}

/// Holds signature parameters.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[non_exhaustive]
pub enum SignatureParams {
    /// RSA signature.
    RSA {
        /// The signature m^d mod N.
        s: MPI,
    },

    /// NIST DSA signature.
    DSA {
        /// The parameter r.
        r: MPI,
        /// The parameter s.
        s: MPI,
    },

    /// ElGamal signature (deprecated).
    ElGamal {
        /// The parameter r.
        r: MPI,
        /// The parameter s.
        s: MPI,
    },

    /// Opaque parameters of an unknown algorithm.
    Unknown {
        /// The successfully parsed MPIs.
        mpis: Box<[MPI]>,
        /// Any data that failed to parse.
        rest: Box<[u8]>,
    },
}

impl SignatureParams {
    /// Returns the number of octets the wire representation takes.
    pub fn serialized_len(&self) -> usize {
        use self::SignatureParams::*;
        match self {
            RSA { s } => s.serialized_len(),
            DSA { r, s } | ElGamal { r, s } =>
                r.serialized_len() + s.serialized_len(),
            Unknown { mpis, rest } =>
                mpis.iter().map(|m| m.serialized_len()).sum::<usize>()
                + rest.len(),
        }
    }

    /// Writes the parameters in wire format.
    pub fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        use self::SignatureParams::*;
        match self {
            RSA { s } => s.serialize(o)?,
            DSA { r, s } | ElGamal { r, s } => {
                r.serialize(o)?;
                s.serialize(o)?;
            }
            Unknown { mpis, rest } => {
                for m in mpis.iter() {
                    m.serialize(o)?;
                }
                o.write_all(rest)?;
            }
        }
        Ok(())
    }
}

/// Holds a public key encrypted session key.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[non_exhaustive]
pub enum Ciphertext {
    /// RSA ciphertext.
    RSA {
        /// The ciphertext m^e mod N.
        c: MPI,
    },

    /// ElGamal ciphertext.
    ElGamal {
        /// The ephemeral key g^k mod p.
        e: MPI,
        /// The ciphertext m * y^k mod p.
        c: MPI,
    },

    /// Opaque ciphertext of an unknown algorithm.
    Unknown {
        /// The successfully parsed MPIs.
        mpis: Box<[MPI]>,
        /// Any data that failed to parse.
        rest: Box<[u8]>,
    },
}

impl Ciphertext {
    /// Returns the number of octets the wire representation takes.
    pub fn serialized_len(&self) -> usize {
        use self::Ciphertext::*;
        match self {
            RSA { c } => c.serialized_len(),
            ElGamal { e, c } => e.serialized_len() + c.serialized_len(),
            Unknown { mpis, rest } =>
                mpis.iter().map(|m| m.serialized_len()).sum::<usize>()
                + rest.len(),
        }
    }

    /// Writes the ciphertext in wire format.
    pub fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        use self::Ciphertext::*;
        match self {
            RSA { c } => c.serialize(o)?,
            ElGamal { e, c } => {
                e.serialize(o)?;
                c.serialize(o)?;
            }
            Unknown { mpis, rest } => {
                for m in mpis.iter() {
                    m.serialize(o)?;
                }
                o.write_all(rest)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_zeros_are_stripped() {
        let mpi = MPI::new(&[0, 0, 1, 0xff]);
        assert_eq!(mpi.value(), &[1, 0xff]);
        assert_eq!(mpi.bits(), 9);
    }

    #[test]
    fn serialize_is_length_prefixed() {
        let mpi = MPI::new(&[1, 0xff]);
        let mut buf = Vec::new();
        mpi.serialize(&mut buf).unwrap();
        assert_eq!(buf, b"\x00\x09\x01\xff");
        assert_eq!(mpi.serialized_len(), buf.len());
    }

    quickcheck::quickcheck! {
        fn bits_matches_leading_byte(m: MPI) -> bool {
            let bits = m.bits();
            let v = m.value();
            v.is_empty() && bits == 0
                || (v[0] != 0
                    && bits == (v.len() - 1) * 8
                        + (8 - v[0].leading_zeros() as usize))
        }
    }
}
