use crate::types::{HashAlgorithm, PublicKeyAlgorithm, SignatureType};
use crate::KeyID;
use crate::Packet;

/// Holds a One-Pass Signature packet.
///
/// Precedes the signed data and declares the signer and algorithms, so
/// that a streaming verifier can start hashing immediately instead of
/// buffering the message (see [Section 5.4 of RFC 4880]).
///
///   [Section 5.4 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.4
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct OnePassSig {
    version: u8,
    sigtype: SignatureType,
    hash_algo: HashAlgorithm,
    pk_algo: PublicKeyAlgorithm,
    issuer: KeyID,
    /// Zero if another one-pass signature packet follows; nonzero for
    /// the one belonging to the outermost signature.
    last: u8,
}

impl OnePassSig {
    /// Creates a new one-pass signature packet.
    pub fn new(sigtype: SignatureType) -> Self {
        OnePassSig {
            version: 3,
            sigtype,
            hash_algo: HashAlgorithm::Unknown(0),
            pk_algo: PublicKeyAlgorithm::Unknown(0),
            issuer: KeyID::wildcard(),
            last: 1,
        }
    }

    pub(crate) fn from_parts(version: u8, sigtype: SignatureType,
                             hash_algo: HashAlgorithm,
                             pk_algo: PublicKeyAlgorithm,
                             issuer: KeyID, last: u8) -> Self {
        OnePassSig { version, sigtype, hash_algo, pk_algo, issuer, last }
    }

    /// Returns the version octet.  Always 3.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Returns the signature type.
    pub fn sigtype(&self) -> SignatureType {
        self.sigtype
    }

    /// Returns the hash algorithm the signature uses.
    pub fn hash_algo(&self) -> HashAlgorithm {
        self.hash_algo
    }

    /// Sets the hash algorithm.
    pub fn set_hash_algo(mut self, algo: HashAlgorithm) -> Self {
        self.hash_algo = algo;
        self
    }

    /// Returns the public key algorithm of the signing key.
    pub fn pk_algo(&self) -> PublicKeyAlgorithm {
        self.pk_algo
    }

    /// Sets the public key algorithm.
    pub fn set_pk_algo(mut self, algo: PublicKeyAlgorithm) -> Self {
        self.pk_algo = algo;
        self
    }

    /// Returns the signer's key ID.
    pub fn issuer(&self) -> &KeyID {
        &self.issuer
    }

    /// Sets the signer's key ID.
    pub fn set_issuer(mut self, issuer: KeyID) -> Self {
        self.issuer = issuer;
        self
    }

    /// Returns the raw `last` octet.
    pub fn last_raw(&self) -> u8 {
        self.last
    }

    /// Whether this is the last one-pass signature packet before the
    /// data.
    pub fn last(&self) -> bool {
        self.last > 0
    }

    /// Sets the `last` flag.
    pub fn set_last(mut self, last: bool) -> Self {
        self.last = if last { 1 } else { 0 };
        self
    }
}

impl From<OnePassSig> for Packet {
    fn from(p: OnePassSig) -> Self {
        Packet::OnePassSig(p)
    }
}
