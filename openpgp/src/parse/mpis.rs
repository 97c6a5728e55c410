//! Functions for parsing MPIs.

use layered_reader::BufferedReader;

use crate::crypto::mpi::{Ciphertext, MPI, PublicParams, SecretParams,
                         SignatureParams};
use crate::types::PublicKeyAlgorithm;
use crate::Error;
use crate::Result;

/// Parses a single MPI: a 16-bit big-endian bit count followed by the
/// magnitude (see [Section 3.2 of RFC 4880]).
///
/// MPIs whose declared bit length is inconsistent with their leading
/// octet are rejected.
///
///   [Section 3.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.2
pub(crate) fn mpi(bio: &mut dyn BufferedReader) -> Result<MPI> {
    let bits = bio.read_be_u16()? as usize;
    let len = (bits + 7) / 8;
    let value = bio.steal(len)?;

    let mpi = MPI::new(&value);
    if mpi.bits() != bits {
        return Err(Error::MalformedMPI(format!(
            "declared {} bits, but the value has {}",
            bits, mpi.bits())).into());
    }

    Ok(mpi)
}

/// Parses the public key parameters for `algo`.
pub(crate) fn public_params(algo: PublicKeyAlgorithm,
                            bio: &mut dyn BufferedReader)
                            -> Result<PublicParams> {
    use crate::PublicKeyAlgorithm::*;

    #[allow(deprecated)]
    match algo {
        RSAEncryptSign | RSAEncrypt | RSASign => {
            let n = mpi(bio)?;
            let e = mpi(bio)?;

            Ok(PublicParams::RSA { e, n })
        }

        DSA => {
            let p = mpi(bio)?;
            let q = mpi(bio)?;
            let g = mpi(bio)?;
            let y = mpi(bio)?;

            Ok(PublicParams::DSA { p, q, g, y })
        }

        ElGamalEncrypt | ElGamalEncryptSign => {
            let p = mpi(bio)?;
            let g = mpi(bio)?;
            let y = mpi(bio)?;

            Ok(PublicParams::ElGamal { p, g, y })
        }

        Unknown(_) | Private(_) => {
            let mut mpis = Vec::new();
            while let Ok(m) = mpi(bio) {
                mpis.push(m);
            }
            let rest = bio.steal_eof()?;

            Ok(PublicParams::Unknown {
                mpis: mpis.into_boxed_slice(),
                rest: rest.into_boxed_slice(),
            })
        }
    }
}

/// Parses the secret key parameters for `algo`.
///
/// The caller handles the trailing checksum; it is not part of the
/// parameters.
pub(crate) fn secret_params(algo: PublicKeyAlgorithm,
                            bio: &mut dyn BufferedReader)
                            -> Result<SecretParams> {
    use crate::PublicKeyAlgorithm::*;

    #[allow(deprecated)]
    match algo {
        RSAEncryptSign | RSAEncrypt | RSASign => {
            let d = mpi(bio)?;
            let p = mpi(bio)?;
            let q = mpi(bio)?;
            let u = mpi(bio)?;

            Ok(SecretParams::RSA {
                d: d.into(),
                p: p.into(),
                q: q.into(),
                u: u.into(),
            })
        }

        DSA => {
            let x = mpi(bio)?;

            Ok(SecretParams::DSA { x: x.into() })
        }

        ElGamalEncrypt | ElGamalEncryptSign => {
            let x = mpi(bio)?;

            Ok(SecretParams::ElGamal { x: x.into() })
        }

        Unknown(_) | Private(_) => {
            let mut mpis = Vec::new();
            while let Ok(m) = mpi(bio) {
                mpis.push(m.into());
            }
            let rest = bio.steal_eof()?;

            Ok(SecretParams::Unknown {
                mpis: mpis.into_boxed_slice(),
                rest: rest.into(),
            })
        }
    }
}

/// Parses the signature parameters for `algo`.
pub(crate) fn signature_params(algo: PublicKeyAlgorithm,
                               bio: &mut dyn BufferedReader)
                               -> Result<SignatureParams> {
    use crate::PublicKeyAlgorithm::*;

    #[allow(deprecated)]
    match algo {
        RSAEncryptSign | RSASign => {
            let s = mpi(bio)?;

            Ok(SignatureParams::RSA { s })
        }

        DSA => {
            let r = mpi(bio)?;
            let s = mpi(bio)?;

            Ok(SignatureParams::DSA { r, s })
        }

        ElGamalEncryptSign => {
            let r = mpi(bio)?;
            let s = mpi(bio)?;

            Ok(SignatureParams::ElGamal { r, s })
        }

        Unknown(_) | Private(_) => {
            let mut mpis = Vec::new();
            while let Ok(m) = mpi(bio) {
                mpis.push(m);
            }
            let rest = bio.steal_eof()?;

            Ok(SignatureParams::Unknown {
                mpis: mpis.into_boxed_slice(),
                rest: rest.into_boxed_slice(),
            })
        }

        RSAEncrypt | ElGamalEncrypt => Err(Error::InvalidArgument(
            format!("not a signature algorithm: {:?}", algo)).into()),
    }
}

/// Parses a public key encrypted session key for `algo`.
pub(crate) fn ciphertext(algo: PublicKeyAlgorithm,
                         bio: &mut dyn BufferedReader)
                         -> Result<Ciphertext> {
    use crate::PublicKeyAlgorithm::*;

    #[allow(deprecated)]
    match algo {
        RSAEncryptSign | RSAEncrypt => {
            let c = mpi(bio)?;

            Ok(Ciphertext::RSA { c })
        }

        ElGamalEncrypt | ElGamalEncryptSign => {
            let e = mpi(bio)?;
            let c = mpi(bio)?;

            Ok(Ciphertext::ElGamal { e, c })
        }

        Unknown(_) | Private(_) => {
            let mut mpis = Vec::new();
            while let Ok(m) = mpi(bio) {
                mpis.push(m);
            }
            let rest = bio.steal_eof()?;

            Ok(Ciphertext::Unknown {
                mpis: mpis.into_boxed_slice(),
                rest: rest.into_boxed_slice(),
            })
        }

        RSASign | DSA => Err(Error::InvalidArgument(
            format!("not an encryption algorithm: {:?}", algo)).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layered_reader::Memory;

    #[test]
    fn mpi_parsing() {
        // The number 511.
        let mut bio = Memory::new(b"\x00\x09\x01\xff");
        let m = mpi(&mut bio).unwrap();
        assert_eq!(m.bits(), 9);
        assert_eq!(m.value(), &[0x01, 0xff]);

        // The number 1, incorrectly encoded (the bit length should be
        // 1, not 2).
        let mut bio = Memory::new(b"\x00\x02\x01");
        assert!(mpi(&mut bio).is_err());

        // A leading zero octet is inconsistent with any bit length.
        let mut bio = Memory::new(b"\x00\x09\x00\xff");
        assert!(mpi(&mut bio).is_err());

        // Truncated value.
        let mut bio = Memory::new(b"\x00\x20\x01");
        assert!(mpi(&mut bio).is_err());
    }

    #[test]
    fn rsa_public_params() {
        let mut bio = Memory::new(b"\x00\x01\x01\x00\x02\x02");
        let params = public_params(
            PublicKeyAlgorithm::RSAEncryptSign, &mut bio).unwrap();

        match &params {
            PublicParams::RSA { n, e } => {
                assert_eq!(n.bits(), 1);
                assert_eq!(n.value(), &[1]);
                assert_eq!(e.bits(), 2);
                assert_eq!(e.value(), &[2]);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn dsa_signature_params() {
        let mut buf = Vec::new();
        MPI::new(&[0x17]).serialize(&mut buf).unwrap();
        MPI::new(&[0x2a, 0x01]).serialize(&mut buf).unwrap();

        let mut bio = Memory::new(&buf);
        let params = signature_params(
            PublicKeyAlgorithm::DSA, &mut bio).unwrap();
        match &params {
            SignatureParams::DSA { r, s } => {
                assert_eq!(r.value(), &[0x17]);
                assert_eq!(s.value(), &[0x2a, 0x01]);
            }
            _ => unreachable!(),
        }
    }
}
