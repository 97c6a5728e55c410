//! Primitive types defined by the RFC.
//!
//! This module provides the algorithm identifiers and related
//! constants from [Section 9 of RFC 4880], each convertible to and
//! from its wire octet.  Unknown values are preserved, not rejected:
//! whether an algorithm is *usable* is a separate question answered by
//! the crypto layer.
//!
//!   [Section 9 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-9

use std::fmt;

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

/// The OpenPGP public key algorithms as defined in [Section 9.1 of RFC
/// 4880].
///
///   [Section 9.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-9.1
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum PublicKeyAlgorithm {
    /// RSA (Encrypt or Sign)
    RSAEncryptSign,
    /// RSA Encrypt-Only, deprecated in RFC 4880.
    #[deprecated(note = "use RSAEncryptSign")]
    RSAEncrypt,
    /// RSA Sign-Only, deprecated in RFC 4880.
    #[deprecated(note = "use RSAEncryptSign")]
    RSASign,
    /// ElGamal (Encrypt-Only)
    ElGamalEncrypt,
    /// DSA (Digital Signature Algorithm)
    DSA,
    /// ElGamal (Encrypt or Sign), deprecated in RFC 4880.
    #[deprecated(note = "use ElGamalEncrypt")]
    ElGamalEncryptSign,
    /// Private algorithm identifier.
    Private(u8),
    /// Unknown algorithm identifier.
    Unknown(u8),
}

#[allow(deprecated)]
impl From<u8> for PublicKeyAlgorithm {
    fn from(u: u8) -> Self {
        use self::PublicKeyAlgorithm::*;
        match u {
            1 => RSAEncryptSign,
            2 => RSAEncrypt,
            3 => RSASign,
            16 => ElGamalEncrypt,
            17 => DSA,
            20 => ElGamalEncryptSign,
            100..=110 => Private(u),
            u => Unknown(u),
        }
    }
}

#[allow(deprecated)]
impl From<PublicKeyAlgorithm> for u8 {
    fn from(p: PublicKeyAlgorithm) -> u8 {
        use self::PublicKeyAlgorithm::*;
        match p {
            RSAEncryptSign => 1,
            RSAEncrypt => 2,
            RSASign => 3,
            ElGamalEncrypt => 16,
            DSA => 17,
            ElGamalEncryptSign => 20,
            Private(u) => u,
            Unknown(u) => u,
        }
    }
}

#[allow(deprecated)]
impl fmt::Display for PublicKeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::PublicKeyAlgorithm::*;
        match *self {
            RSAEncryptSign => f.write_str("RSA (Encrypt or Sign)"),
            RSAEncrypt => f.write_str("RSA Encrypt-Only"),
            RSASign => f.write_str("RSA Sign-Only"),
            ElGamalEncrypt => f.write_str("ElGamal (Encrypt-Only)"),
            DSA => f.write_str("DSA (Digital Signature Algorithm)"),
            ElGamalEncryptSign => f.write_str("ElGamal (Encrypt or Sign)"),
            Private(u) =>
                f.write_fmt(format_args!("Private/Experimental algorithm {}", u)),
            Unknown(u) =>
                f.write_fmt(format_args!("Unknown algorithm {}", u)),
        }
    }
}

#[allow(deprecated)]
impl PublicKeyAlgorithm {
    /// Whether the algorithm can sign.
    pub fn for_signing(&self) -> bool {
        use self::PublicKeyAlgorithm::*;
        matches!(self, RSAEncryptSign | RSASign | DSA | ElGamalEncryptSign)
    }

    /// Whether the algorithm can encrypt.
    pub fn for_encryption(&self) -> bool {
        use self::PublicKeyAlgorithm::*;
        matches!(self, RSAEncryptSign | RSAEncrypt | ElGamalEncrypt
                 | ElGamalEncryptSign)
    }
}

#[cfg(test)]
impl Arbitrary for PublicKeyAlgorithm {
    fn arbitrary(g: &mut Gen) -> Self {
        u8::arbitrary(g).into()
    }
}

/// The OpenPGP symmetric key algorithms as defined in [Section 9.2 of
/// RFC 4880].
///
///   [Section 9.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-9.2
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum SymmetricAlgorithm {
    /// Plaintext or unencrypted data.
    Unencrypted,
    /// IDEA block cipher.
    IDEA,
    /// 3-key Triple-DES (EDE).
    TripleDES,
    /// CAST5 (aka CAST-128) with a 128-bit key.
    CAST5,
    /// Blowfish with a 128-bit key and 16 rounds.
    Blowfish,
    /// AES with a 128-bit key.
    AES128,
    /// AES with a 192-bit key.
    AES192,
    /// AES with a 256-bit key.
    AES256,
    /// Twofish with a 256-bit key.
    Twofish,
    /// Private algorithm identifier.
    Private(u8),
    /// Unknown algorithm identifier.
    Unknown(u8),
}

impl From<u8> for SymmetricAlgorithm {
    fn from(u: u8) -> Self {
        use self::SymmetricAlgorithm::*;
        match u {
            0 => Unencrypted,
            1 => IDEA,
            2 => TripleDES,
            3 => CAST5,
            4 => Blowfish,
            7 => AES128,
            8 => AES192,
            9 => AES256,
            10 => Twofish,
            100..=110 => Private(u),
            u => Unknown(u),
        }
    }
}

impl From<SymmetricAlgorithm> for u8 {
    fn from(s: SymmetricAlgorithm) -> u8 {
        use self::SymmetricAlgorithm::*;
        match s {
            Unencrypted => 0,
            IDEA => 1,
            TripleDES => 2,
            CAST5 => 3,
            Blowfish => 4,
            AES128 => 7,
            AES192 => 8,
            AES256 => 9,
            Twofish => 10,
            Private(u) => u,
            Unknown(u) => u,
        }
    }
}

impl fmt::Display for SymmetricAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::SymmetricAlgorithm::*;
        match *self {
            Unencrypted => f.write_str("Unencrypted"),
            IDEA => f.write_str("IDEA"),
            TripleDES => f.write_str("TripleDES (EDE)"),
            CAST5 => f.write_str("CAST5"),
            Blowfish => f.write_str("Blowfish"),
            AES128 => f.write_str("AES with 128-bit key"),
            AES192 => f.write_str("AES with 192-bit key"),
            AES256 => f.write_str("AES with 256-bit key"),
            Twofish => f.write_str("Twofish"),
            Private(u) =>
                f.write_fmt(format_args!("Private/Experimental algorithm {}", u)),
            Unknown(u) =>
                f.write_fmt(format_args!("Unknown algorithm {}", u)),
        }
    }
}

impl SymmetricAlgorithm {
    /// Length of the key in bytes.
    pub fn key_size(self) -> crate::Result<usize> {
        use self::SymmetricAlgorithm::*;
        match self {
            IDEA => Ok(16),
            TripleDES => Ok(24),
            CAST5 => Ok(16),
            // RFC 4880, section 9.2: Blowfish (128 bit key, 16 rounds)
            Blowfish => Ok(16),
            AES128 => Ok(16),
            AES192 => Ok(24),
            AES256 => Ok(32),
            Twofish => Ok(32),
            _ => Err(crate::Error::UnsupportedSymmetricAlgorithm(self).into()),
        }
    }

    /// Length of a block in bytes.
    pub fn block_size(self) -> crate::Result<usize> {
        use self::SymmetricAlgorithm::*;
        match self {
            IDEA => Ok(8),
            TripleDES => Ok(8),
            CAST5 => Ok(8),
            Blowfish => Ok(8),
            AES128 => Ok(16),
            AES192 => Ok(16),
            AES256 => Ok(16),
            Twofish => Ok(16),
            _ => Err(crate::Error::UnsupportedSymmetricAlgorithm(self).into()),
        }
    }
}

#[cfg(test)]
impl Arbitrary for SymmetricAlgorithm {
    fn arbitrary(g: &mut Gen) -> Self {
        u8::arbitrary(g).into()
    }
}

/// The OpenPGP hash algorithms as defined in [Section 9.4 of RFC
/// 4880].
///
///   [Section 9.4 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-9.4
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum HashAlgorithm {
    /// Rivest et al. message digest 5.
    MD5,
    /// NIST Secure Hash Algorithm (deprecated).
    SHA1,
    /// RIPEMD-160.
    RipeMD,
    /// 256-bit version of SHA2.
    SHA256,
    /// 384-bit version of SHA2.
    SHA384,
    /// 512-bit version of SHA2.
    SHA512,
    /// 224-bit version of SHA2.
    SHA224,
    /// Private hash algorithm identifier.
    Private(u8),
    /// Unknown hash algorithm identifier.
    Unknown(u8),
}

impl From<u8> for HashAlgorithm {
    fn from(u: u8) -> Self {
        use self::HashAlgorithm::*;
        match u {
            1 => MD5,
            2 => SHA1,
            3 => RipeMD,
            8 => SHA256,
            9 => SHA384,
            10 => SHA512,
            11 => SHA224,
            100..=110 => Private(u),
            u => Unknown(u),
        }
    }
}

impl From<HashAlgorithm> for u8 {
    fn from(h: HashAlgorithm) -> u8 {
        use self::HashAlgorithm::*;
        match h {
            MD5 => 1,
            SHA1 => 2,
            RipeMD => 3,
            SHA256 => 8,
            SHA384 => 9,
            SHA512 => 10,
            SHA224 => 11,
            Private(u) => u,
            Unknown(u) => u,
        }
    }
}

impl HashAlgorithm {
    /// The name used in armor `Hash:` headers (see [Section 6.2 of RFC
    /// 4880]).
    ///
    ///   [Section 6.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-6.2
    pub fn text_name(&self) -> crate::Result<&str> {
        use self::HashAlgorithm::*;
        match self {
            MD5 => Ok("MD5"),
            SHA1 => Ok("SHA1"),
            RipeMD => Ok("RIPEMD160"),
            SHA256 => Ok("SHA256"),
            SHA384 => Ok("SHA384"),
            SHA512 => Ok("SHA512"),
            SHA224 => Ok("SHA224"),
            _ => Err(crate::Error::UnsupportedHashAlgorithm(*self).into()),
        }
    }

    /// Looks a hash algorithm up by its armor header name.
    pub fn from_text_name(name: &str) -> Option<Self> {
        use self::HashAlgorithm::*;
        match name {
            "MD5" => Some(MD5),
            "SHA1" => Some(SHA1),
            "RIPEMD160" => Some(RipeMD),
            "SHA256" => Some(SHA256),
            "SHA384" => Some(SHA384),
            "SHA512" => Some(SHA512),
            "SHA224" => Some(SHA224),
            _ => None,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::HashAlgorithm::*;
        match *self {
            MD5 => f.write_str("MD5"),
            SHA1 => f.write_str("SHA1"),
            RipeMD => f.write_str("RipeMD160"),
            SHA256 => f.write_str("SHA256"),
            SHA384 => f.write_str("SHA384"),
            SHA512 => f.write_str("SHA512"),
            SHA224 => f.write_str("SHA224"),
            Private(u) =>
                f.write_fmt(format_args!("Private/Experimental algorithm {}", u)),
            Unknown(u) =>
                f.write_fmt(format_args!("Unknown algorithm {}", u)),
        }
    }
}

#[cfg(test)]
impl Arbitrary for HashAlgorithm {
    fn arbitrary(g: &mut Gen) -> Self {
        u8::arbitrary(g).into()
    }
}

/// The OpenPGP compression algorithms as defined in [Section 9.3 of
/// RFC 4880].
///
///   [Section 9.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-9.3
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum CompressionAlgorithm {
    /// Null compression.
    Uncompressed,
    /// DEFLATE.
    Zip,
    /// ZLIB.
    Zlib,
    /// bzip2.
    BZip2,
    /// Private compression algorithm identifier.
    Private(u8),
    /// Unknown compression algorithm identifier.
    Unknown(u8),
}

impl From<u8> for CompressionAlgorithm {
    fn from(u: u8) -> Self {
        use self::CompressionAlgorithm::*;
        match u {
            0 => Uncompressed,
            1 => Zip,
            2 => Zlib,
            3 => BZip2,
            100..=110 => Private(u),
            u => Unknown(u),
        }
    }
}

impl From<CompressionAlgorithm> for u8 {
    fn from(c: CompressionAlgorithm) -> u8 {
        use self::CompressionAlgorithm::*;
        match c {
            Uncompressed => 0,
            Zip => 1,
            Zlib => 2,
            BZip2 => 3,
            Private(u) => u,
            Unknown(u) => u,
        }
    }
}

impl fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::CompressionAlgorithm::*;
        match *self {
            Uncompressed => f.write_str("Uncompressed"),
            Zip => f.write_str("ZIP"),
            Zlib => f.write_str("ZLIB"),
            BZip2 => f.write_str("BZip2"),
            Private(u) =>
                f.write_fmt(format_args!("Private/Experimental algorithm {}", u)),
            Unknown(u) =>
                f.write_fmt(format_args!("Unknown algorithm {}", u)),
        }
    }
}

#[cfg(test)]
impl Arbitrary for CompressionAlgorithm {
    fn arbitrary(g: &mut Gen) -> Self {
        u8::arbitrary(g).into()
    }
}

/// The signature types as defined in [Section 5.2.1 of RFC 4880].
///
/// Different types give different meanings to a signature; most make
/// sense only in their intended location (a subkey binding has no
/// place on a user id).
///
///   [Section 5.2.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.1
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum SignatureType {
    /// Signature over a binary document.
    Binary,
    /// Signature over a canonical text document.
    Text,
    /// Standalone signature.
    Standalone,
    /// Generic certification of a user id and public key packet.
    GenericCertification,
    /// Persona certification of a user id and public key packet.
    PersonaCertification,
    /// Casual certification of a user id and public key packet.
    CasualCertification,
    /// Positive certification of a user id and public key packet.
    PositiveCertification,
    /// Subkey binding signature.
    SubkeyBinding,
    /// Primary key binding signature.
    PrimaryKeyBinding,
    /// Signature directly on a key.
    DirectKey,
    /// Key revocation signature.
    KeyRevocation,
    /// Subkey revocation signature.
    SubkeyRevocation,
    /// Certification revocation signature.
    CertificationRevocation,
    /// Timestamp signature.
    Timestamp,
    /// Third-party confirmation signature.
    Confirmation,
    /// Unknown signature type identifier.
    Unknown(u8),
}

impl From<u8> for SignatureType {
    fn from(u: u8) -> Self {
        use self::SignatureType::*;
        match u {
            0x00 => Binary,
            0x01 => Text,
            0x02 => Standalone,
            0x10 => GenericCertification,
            0x11 => PersonaCertification,
            0x12 => CasualCertification,
            0x13 => PositiveCertification,
            0x18 => SubkeyBinding,
            0x19 => PrimaryKeyBinding,
            0x1f => DirectKey,
            0x20 => KeyRevocation,
            0x28 => SubkeyRevocation,
            0x30 => CertificationRevocation,
            0x40 => Timestamp,
            0x50 => Confirmation,
            u => Unknown(u),
        }
    }
}

impl From<SignatureType> for u8 {
    fn from(t: SignatureType) -> u8 {
        use self::SignatureType::*;
        match t {
            Binary => 0x00,
            Text => 0x01,
            Standalone => 0x02,
            GenericCertification => 0x10,
            PersonaCertification => 0x11,
            CasualCertification => 0x12,
            PositiveCertification => 0x13,
            SubkeyBinding => 0x18,
            PrimaryKeyBinding => 0x19,
            DirectKey => 0x1f,
            KeyRevocation => 0x20,
            SubkeyRevocation => 0x28,
            CertificationRevocation => 0x30,
            Timestamp => 0x40,
            Confirmation => 0x50,
            Unknown(u) => u,
        }
    }
}

impl fmt::Display for SignatureType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::SignatureType::*;
        match *self {
            Binary => f.write_str("Binary"),
            Text => f.write_str("Text"),
            Standalone => f.write_str("Standalone"),
            GenericCertification => f.write_str("GenericCertification"),
            PersonaCertification => f.write_str("PersonaCertification"),
            CasualCertification => f.write_str("CasualCertification"),
            PositiveCertification => f.write_str("PositiveCertification"),
            SubkeyBinding => f.write_str("SubkeyBinding"),
            PrimaryKeyBinding => f.write_str("PrimaryKeyBinding"),
            DirectKey => f.write_str("DirectKey"),
            KeyRevocation => f.write_str("KeyRevocation"),
            SubkeyRevocation => f.write_str("SubkeyRevocation"),
            CertificationRevocation => f.write_str("CertificationRevocation"),
            Timestamp => f.write_str("Timestamp"),
            Confirmation => f.write_str("Confirmation"),
            Unknown(u) =>
                f.write_fmt(format_args!("Unknown signature type 0x{:x}", u)),
        }
    }
}

#[cfg(test)]
impl Arbitrary for SignatureType {
    fn arbitrary(g: &mut Gen) -> Self {
        u8::arbitrary(g).into()
    }
}

/// The format of a literal data packet body, [Section 5.9 of RFC
/// 4880].
///
///   [Section 5.9 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.9
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DataFormat {
    /// Binary data.
    Binary,
    /// Text data, line endings are CRLF on the wire.
    Text,
    /// Text data, UTF-8 encoded.
    Unicode,
    /// Unknown format specifier.
    Unknown(char),
}

impl Default for DataFormat {
    fn default() -> Self {
        DataFormat::Binary
    }
}

impl From<u8> for DataFormat {
    fn from(u: u8) -> Self {
        (u as char).into()
    }
}

impl From<char> for DataFormat {
    fn from(c: char) -> Self {
        use self::DataFormat::*;
        match c {
            'b' => Binary,
            't' => Text,
            'u' => Unicode,
            c => Unknown(c),
        }
    }
}

impl From<DataFormat> for u8 {
    fn from(d: DataFormat) -> u8 {
        char::from(d) as u8
    }
}

impl From<DataFormat> for char {
    fn from(d: DataFormat) -> char {
        use self::DataFormat::*;
        match d {
            Binary => 'b',
            Text => 't',
            Unicode => 'u',
            Unknown(c) => c,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    quickcheck::quickcheck! {
        fn pk_algo_roundtrip(a: PublicKeyAlgorithm) -> bool {
            let b: u8 = a.into();
            a == PublicKeyAlgorithm::from(b)
        }
    }

    quickcheck::quickcheck! {
        fn sym_algo_roundtrip(a: SymmetricAlgorithm) -> bool {
            let b: u8 = a.into();
            a == SymmetricAlgorithm::from(b)
        }
    }

    quickcheck::quickcheck! {
        fn hash_algo_roundtrip(a: HashAlgorithm) -> bool {
            let b: u8 = a.into();
            a == HashAlgorithm::from(b)
        }
    }

    quickcheck::quickcheck! {
        fn comp_algo_roundtrip(a: CompressionAlgorithm) -> bool {
            let b: u8 = a.into();
            a == CompressionAlgorithm::from(b)
        }
    }

    quickcheck::quickcheck! {
        fn sig_type_roundtrip(t: SignatureType) -> bool {
            let b: u8 = t.into();
            t == SignatureType::from(b)
        }
    }

    #[test]
    fn sym_algo_sizes() {
        assert_eq!(SymmetricAlgorithm::AES128.key_size().unwrap(), 16);
        assert_eq!(SymmetricAlgorithm::AES256.key_size().unwrap(), 32);
        assert_eq!(SymmetricAlgorithm::TripleDES.key_size().unwrap(), 24);
        assert_eq!(SymmetricAlgorithm::CAST5.block_size().unwrap(), 8);
        assert_eq!(SymmetricAlgorithm::Twofish.block_size().unwrap(), 16);
        assert!(SymmetricAlgorithm::Unencrypted.key_size().is_err());
    }

    #[test]
    fn hash_text_names() {
        assert_eq!(HashAlgorithm::SHA256.text_name().unwrap(), "SHA256");
        assert_eq!(HashAlgorithm::from_text_name("RIPEMD160"),
                   Some(HashAlgorithm::RipeMD));
        assert_eq!(HashAlgorithm::from_text_name("NONSUCH"), None);
    }
}
