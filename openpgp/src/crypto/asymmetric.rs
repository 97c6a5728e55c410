//! Public key operations: RSA, DSA, ElGamal.
//!
//! A thin facade over the `rsa` and `dsa` crates, plus an ElGamal
//! implementation on the bignum layer (there is no maintained ElGamal
//! crate).  All entry points speak [`mpi`](super::mpi) parameter sets;
//! algorithm dispatch happens here, so the packet layer never touches
//! a bignum.

use num_bigint_dig::{BigUint, ModInverse, RandBigInt};
use rand::rngs::OsRng;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use signature::hazmat::{PrehashSigner, PrehashVerifier};

use crate::crypto::mem::Protected;
use crate::crypto::mpi::{Ciphertext, MPI, PublicParams, SecretParams,
                         SignatureParams};
use crate::types::{HashAlgorithm, PublicKeyAlgorithm};
use crate::Error;
use crate::Result;

fn to_biguint(m: &MPI) -> BigUint {
    BigUint::from_bytes_be(m.value())
}

fn pkcs1v15_padding(hash_algo: HashAlgorithm) -> Result<Pkcs1v15Sign> {
    use HashAlgorithm::*;
    match hash_algo {
        MD5 => Ok(Pkcs1v15Sign::new::<md5::Md5>()),
        SHA1 => Ok(Pkcs1v15Sign::new::<sha1collisiondetection::Sha1CD>()),
        RipeMD => Ok(Pkcs1v15Sign::new::<ripemd::Ripemd160>()),
        SHA256 => Ok(Pkcs1v15Sign::new::<sha2::Sha256>()),
        SHA384 => Ok(Pkcs1v15Sign::new::<sha2::Sha384>()),
        SHA512 => Ok(Pkcs1v15Sign::new::<sha2::Sha512>()),
        SHA224 => Ok(Pkcs1v15Sign::new::<sha2::Sha224>()),
        _ => Err(Error::UnsupportedHashAlgorithm(hash_algo).into()),
    }
}

fn rsa_public(public: &PublicParams) -> Result<RsaPublicKey> {
    match public {
        PublicParams::RSA { e, n } =>
            Ok(RsaPublicKey::new(to_biguint(n), to_biguint(e))?),
        _ => Err(Error::InvalidKey("not an RSA key".into()).into()),
    }
}

fn rsa_private(public: &PublicParams, secret: &SecretParams)
               -> Result<RsaPrivateKey> {
    match (public, secret) {
        (PublicParams::RSA { e, n }, SecretParams::RSA { d, p, q, .. }) => {
            let key = RsaPrivateKey::from_components(
                to_biguint(n),
                to_biguint(e),
                BigUint::from_bytes_be(d.value()),
                vec![BigUint::from_bytes_be(p.value()),
                     BigUint::from_bytes_be(q.value())])?;
            Ok(key)
        }
        _ => Err(Error::InvalidKey("not an RSA key".into()).into()),
    }
}

fn dsa_verifying(public: &PublicParams) -> Result<dsa::VerifyingKey> {
    match public {
        PublicParams::DSA { p, q, g, y } => {
            let components = dsa::Components::from_components(
                to_biguint(p), to_biguint(q), to_biguint(g))?;
            Ok(dsa::VerifyingKey::from_components(
                components, to_biguint(y))?)
        }
        _ => Err(Error::InvalidKey("not a DSA key".into()).into()),
    }
}

/// Computes a signature over a digest.
pub fn sign(pk_algo: PublicKeyAlgorithm,
            public: &PublicParams, secret: &SecretParams,
            hash_algo: HashAlgorithm, digest: &[u8])
            -> Result<SignatureParams> {
    use PublicKeyAlgorithm::*;

    #[allow(deprecated)]
    match pk_algo {
        RSAEncryptSign | RSASign => {
            let key = rsa_private(public, secret)?;
            let sig = key.sign(pkcs1v15_padding(hash_algo)?, digest)?;
            Ok(SignatureParams::RSA { s: MPI::new(&sig) })
        }

        DSA => {
            let verifying = dsa_verifying(public)?;
            let x = match secret {
                SecretParams::DSA { x } =>
                    BigUint::from_bytes_be(x.value()),
                _ => return Err(Error::InvalidKey(
                    "not a DSA key".into()).into()),
            };
            let key = dsa::SigningKey::from_components(verifying, x)?;
            let sig = key.sign_prehash(digest)?;
            Ok(SignatureParams::DSA {
                r: MPI::new(&sig.r().to_bytes_be()),
                s: MPI::new(&sig.s().to_bytes_be()),
            })
        }

        _ => Err(Error::UnsupportedPublicKeyAlgorithm(pk_algo).into()),
    }
}

/// Verifies a signature over a digest.
///
/// A verification failure is reported as [`Error::BadSignature`].
pub fn verify(pk_algo: PublicKeyAlgorithm, public: &PublicParams,
              hash_algo: HashAlgorithm, digest: &[u8],
              sig: &SignatureParams)
              -> Result<()> {
    use PublicKeyAlgorithm::*;

    #[allow(deprecated)]
    match (pk_algo, sig) {
        (RSAEncryptSign, SignatureParams::RSA { s })
            | (RSASign, SignatureParams::RSA { s }) =>
        {
            let key = rsa_public(public)?;
            key.verify(pkcs1v15_padding(hash_algo)?, digest, s.value())
                .map_err(|_| Error::BadSignature(
                    "RSA verification failed".into()))?;
            Ok(())
        }

        (DSA, SignatureParams::DSA { r, s }) => {
            let key = dsa_verifying(public)?;
            let sig = dsa::Signature::from_components(
                to_biguint(r), to_biguint(s))?;
            key.verify_prehash(digest, &sig)
                .map_err(|_| Error::BadSignature(
                    "DSA verification failed".into()))?;
            Ok(())
        }

        (algo, _) if !algo.for_signing() =>
            Err(Error::UnsupportedPublicKeyAlgorithm(algo).into()),
        _ => Err(Error::BadSignature(
            "signature parameters do not match the key algorithm"
                .into()).into()),
    }
}

/// Encrypts a short payload (a session key) to a public key.
pub fn encrypt(pk_algo: PublicKeyAlgorithm, public: &PublicParams,
               payload: &[u8])
               -> Result<Ciphertext> {
    use PublicKeyAlgorithm::*;

    #[allow(deprecated)]
    match pk_algo {
        RSAEncryptSign | RSAEncrypt => {
            let key = rsa_public(public)?;
            let c = key.encrypt(&mut OsRng, Pkcs1v15Encrypt, payload)?;
            Ok(Ciphertext::RSA { c: MPI::new(&c) })
        }

        ElGamalEncrypt | ElGamalEncryptSign => match public {
            PublicParams::ElGamal { p, g, y } =>
                elgamal_encrypt(&to_biguint(p), &to_biguint(g),
                                &to_biguint(y), payload),
            _ => Err(Error::InvalidKey("not an ElGamal key".into()).into()),
        },

        _ => Err(Error::UnsupportedPublicKeyAlgorithm(pk_algo).into()),
    }
}

/// Decrypts a public key encrypted payload.
pub fn decrypt(pk_algo: PublicKeyAlgorithm,
               public: &PublicParams, secret: &SecretParams,
               ciphertext: &Ciphertext)
               -> Result<Protected> {
    use PublicKeyAlgorithm::*;

    #[allow(deprecated)]
    match (pk_algo, ciphertext) {
        (RSAEncryptSign, Ciphertext::RSA { c })
            | (RSAEncrypt, Ciphertext::RSA { c }) =>
        {
            let key = rsa_private(public, secret)?;
            let m = key.decrypt(Pkcs1v15Encrypt, c.value())
                .map_err(|_| Error::InvalidSessionKey(
                    "RSA decryption failed".into()))?;
            Ok(m.into())
        }

        (ElGamalEncrypt, Ciphertext::ElGamal { e, c })
            | (ElGamalEncryptSign, Ciphertext::ElGamal { e, c }) =>
        {
            let (p, x) = match (public, secret) {
                (PublicParams::ElGamal { p, .. },
                 SecretParams::ElGamal { x }) =>
                    (to_biguint(p), BigUint::from_bytes_be(x.value())),
                _ => return Err(Error::InvalidKey(
                    "not an ElGamal key".into()).into()),
            };
            elgamal_decrypt(&p, &x, &to_biguint(e), &to_biguint(c))
        }

        (algo, _) if !algo.for_encryption() =>
            Err(Error::UnsupportedPublicKeyAlgorithm(algo).into()),
        _ => Err(Error::InvalidSessionKey(
            "ciphertext does not match the key algorithm".into()).into()),
    }
}

/// EME-PKCS1-v1_5 encoding for a modulus of `k` octets (see [Section
/// 13.1.1 of RFC 4880]).
///
///   [Section 13.1.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-13.1.1
fn eme_pkcs1_encode(payload: &[u8], k: usize) -> Result<Vec<u8>> {
    if payload.len() + 11 > k {
        return Err(Error::InvalidArgument(
            "payload too large for the key".into()).into());
    }

    use rand::Rng;
    let mut em = Vec::with_capacity(k - 1);
    em.push(0x02);
    while em.len() < k - 2 - payload.len() {
        let b: u8 = OsRng.gen_range(1..=255);
        em.push(b);
    }
    em.push(0x00);
    em.extend_from_slice(payload);
    Ok(em)
}

fn eme_pkcs1_decode(em: &[u8]) -> Result<Protected> {
    // em lacks the leading 0x00 octet, which vanishes in the integer
    // representation.
    let bad = || Error::InvalidSessionKey("bad padding".into());

    if em.len() < 10 || em[0] != 0x02 {
        return Err(bad().into());
    }
    let zero = em.iter().position(|&b| b == 0).ok_or_else(bad)?;
    if zero < 9 {
        // The padding string must be at least 8 octets.
        return Err(bad().into());
    }
    Ok(em[zero + 1..].into())
}

fn elgamal_encrypt(p: &BigUint, g: &BigUint, y: &BigUint, payload: &[u8])
                   -> Result<Ciphertext> {
    let k_octets = (p.bits() + 7) / 8;
    let em = BigUint::from_bytes_be(&eme_pkcs1_encode(payload, k_octets)?);

    let one = BigUint::from(1u8);
    let two = BigUint::from(2u8);
    let k = OsRng.gen_biguint_below(&(p - &two)) + &one;

    let e = g.modpow(&k, p);
    let c = (em * y.modpow(&k, p)) % p;

    Ok(Ciphertext::ElGamal {
        e: MPI::new(&e.to_bytes_be()),
        c: MPI::new(&c.to_bytes_be()),
    })
}

fn elgamal_decrypt(p: &BigUint, x: &BigUint, e: &BigUint, c: &BigUint)
                   -> Result<Protected> {
    let two = BigUint::from(2u8);
    let s = e.modpow(x, p);
    // s^(p-2) is s^-1 mod p, p being prime.
    let m = (c * s.modpow(&(p - &two), p)) % p;

    eme_pkcs1_decode(&m.to_bytes_be())
}

/// Generates a throwaway RSA key.
///
/// Key generation proper is outside this crate's scope; this exists
/// for tests and demo programs.
pub fn generate_rsa_key(bits: usize)
                        -> Result<(PublicParams, SecretParams)> {
    let key = RsaPrivateKey::new(&mut OsRng, bits)?;
    let primes = key.primes();
    let (p, q) = (&primes[0], &primes[1]);
    let u = p.clone().mod_inverse(q)
        .and_then(|u| u.to_biguint())
        .ok_or_else(|| Error::InvalidKey("p is not invertible".into()))?;

    Ok((PublicParams::RSA {
            e: MPI::new(&key.e().to_bytes_be()),
            n: MPI::new(&key.n().to_bytes_be()),
        },
        SecretParams::RSA {
            d: MPI::new(&key.d().to_bytes_be()).into(),
            p: MPI::new(&p.to_bytes_be()).into(),
            q: MPI::new(&q.to_bytes_be()).into(),
            u: MPI::new(&u.to_bytes_be()).into(),
        }))
}

/// Generates a throwaway DSA key.
///
/// Key generation proper is outside this crate's scope; this exists
/// for tests and demo programs.
pub fn generate_dsa_key() -> Result<(PublicParams, SecretParams)> {
    let components = dsa::Components::generate(
        &mut OsRng, dsa::KeySize::DSA_1024_160);
    let (p, q, g) = (components.p(), components.q(), components.g());

    let one = BigUint::from(1u8);
    let x = OsRng.gen_biguint_below(&(q - &one)) + &one;
    let y = g.modpow(&x, p);

    Ok((PublicParams::DSA {
            p: MPI::new(&p.to_bytes_be()),
            q: MPI::new(&q.to_bytes_be()),
            g: MPI::new(&g.to_bytes_be()),
            y: MPI::new(&y.to_bytes_be()),
        },
        SecretParams::DSA {
            x: MPI::new(&x.to_bytes_be()).into(),
        }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsa_sign_verify() {
        let (public, secret) = generate_rsa_key(1024).unwrap();
        let digest = {
            let mut ctx = HashAlgorithm::SHA256.context().unwrap();
            ctx.update(b"data to sign");
            ctx.into_digest()
        };

        let sig = sign(PublicKeyAlgorithm::RSAEncryptSign,
                       &public, &secret,
                       HashAlgorithm::SHA256, &digest).unwrap();
        verify(PublicKeyAlgorithm::RSAEncryptSign, &public,
               HashAlgorithm::SHA256, &digest, &sig).unwrap();

        // A different digest must not verify.
        let mut wrong = digest.clone();
        wrong[0] ^= 1;
        assert!(verify(PublicKeyAlgorithm::RSAEncryptSign, &public,
                       HashAlgorithm::SHA256, &wrong, &sig).is_err());
    }

    #[test]
    fn dsa_sign_verify() {
        let (public, secret) = generate_dsa_key().unwrap();
        let digest = {
            let mut ctx = HashAlgorithm::SHA1.context().unwrap();
            ctx.update(b"data to sign");
            ctx.into_digest()
        };

        let sig = sign(PublicKeyAlgorithm::DSA, &public, &secret,
                       HashAlgorithm::SHA1, &digest).unwrap();
        verify(PublicKeyAlgorithm::DSA, &public,
               HashAlgorithm::SHA1, &digest, &sig).unwrap();

        let mut wrong = digest.clone();
        wrong[7] ^= 0x80;
        assert!(verify(PublicKeyAlgorithm::DSA, &public,
                       HashAlgorithm::SHA1, &wrong, &sig).is_err());
    }

    #[test]
    fn rsa_encrypt_decrypt() {
        let (public, secret) = generate_rsa_key(1024).unwrap();
        let payload = b"\x09session key material\x12\x34";

        let ct = encrypt(PublicKeyAlgorithm::RSAEncryptSign, &public,
                         payload).unwrap();
        let pt = decrypt(PublicKeyAlgorithm::RSAEncryptSign,
                         &public, &secret, &ct).unwrap();
        assert_eq!(&pt[..], &payload[..]);
    }

    #[test]
    fn elgamal_roundtrip() {
        // A small (insecure, test-only) safe prime group.
        let p = BigUint::parse_bytes(
            b"fca682ce8e12caba26efccf7110e526db078b05edecbcd1eb4a208f3\
              ae1617ae01f35b91a47e6df63413c5e12ed0899bcd132acd50d99151\
              bdc43ee737592e17", 16).unwrap();
        let g = BigUint::from(2u8);
        let x = BigUint::parse_bytes(b"123456789abcdef0123456789", 16)
            .unwrap();
        let y = g.modpow(&x, &p);

        let payload = b"\x09 sixteen bytes!!";
        let ct = elgamal_encrypt(&p, &g, &y, payload).unwrap();
        match &ct {
            Ciphertext::ElGamal { e, c } => {
                let pt = elgamal_decrypt(
                    &p, &x,
                    &BigUint::from_bytes_be(e.value()),
                    &BigUint::from_bytes_be(c.value())).unwrap();
                assert_eq!(&pt[..], &payload[..]);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn eme_pkcs1_roundtrip() {
        let payload = b"payload";
        let em = eme_pkcs1_encode(payload, 64).unwrap();
        assert_eq!(em.len(), 63);
        assert_eq!(em[0], 0x02);
        let out = eme_pkcs1_decode(&em).unwrap();
        assert_eq!(&out[..], &payload[..]);

        // Too large for the modulus.
        assert!(eme_pkcs1_encode(&[0; 60], 64).is_err());
    }
}
