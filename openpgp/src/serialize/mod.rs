//! Packet serialization.
//!
//! [`Serialize`] renders a packet in wire format, framing the body
//! with a new format header and a definite length.  Packets whose
//! bodies are streams (compressed data, encrypted data, and literal
//! data of unbounded size) are produced with the
//! [`stream`](self::stream) writers instead.

pub(crate) mod partial_body;
pub mod stream;
pub(crate) mod writer;

use std::io::Write;

use crate::crypto::s2k::S2K;
use crate::packet::{BodyLength, CTBNew, CTBOld, CTB, Marker,
                    OnePassSig, SecretKey, SecretKeyMaterial,
                    Signature, Tag, Key, Literal, Unknown, MDC, PKESK,
                    SKESK};
use crate::Error;
use crate::Packet;
use crate::Result;

/// Renders an object in OpenPGP wire format.
pub trait Serialize {
    /// Writes a serialized version of the object to `o`.
    fn serialize(&self, o: &mut dyn Write) -> Result<()>;
}

impl Serialize for CTBNew {
    fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        let tag: u8 = self.tag().into();
        o.write_all(&[0x80 | 0x40 | tag])?;
        Ok(())
    }
}

impl Serialize for CTBOld {
    fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        let tag: u8 = self.tag().into();
        let length_type: u8 = self.length_type().into();
        o.write_all(&[0x80 | (tag << 2) | length_type])?;
        Ok(())
    }
}

impl Serialize for CTB {
    fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        match self {
            CTB::New(ctb) => ctb.serialize(o),
            CTB::Old(ctb) => ctb.serialize(o),
        }
    }
}

impl Serialize for BodyLength {
    /// Emits the new format encoding of the length.
    ///
    /// Partial lengths must be a power of two between 1 and 2^30;
    /// indeterminate lengths exist only in the old format.
    fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        match self {
            BodyLength::Full(l) => {
                let l = *l;
                if l <= 191 {
                    o.write_all(&[l as u8])?;
                } else if l <= 8383 {
                    let v = l - 192;
                    o.write_all(&[(v >> 8) as u8 + 192, (v & 0xff) as u8])?;
                } else {
                    o.write_all(&[0xff])?;
                    o.write_all(&l.to_be_bytes())?;
                }
            }
            BodyLength::Partial(l) => {
                let l = *l;
                if l > 1 << 30 || !l.is_power_of_two() {
                    return Err(Error::InvalidArgument(
                        format!("partial length {} is not a power of \
                                 two", l)).into());
                }
                o.write_all(&[224 + l.trailing_zeros() as u8])?;
            }
            BodyLength::Indeterminate =>
                return Err(Error::InvalidArgument(
                    "indeterminate lengths cannot be encoded in the \
                     new format".into()).into()),
        }
        Ok(())
    }
}

/// Frames a body with a new format header and writes it out.
fn emit_packet(tag: Tag, body: &[u8], o: &mut dyn Write) -> Result<()> {
    CTB::new(tag).serialize(o)?;
    BodyLength::Full(body.len() as u32).serialize(o)?;
    o.write_all(body)?;
    Ok(())
}

impl Serialize for S2K {
    fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        match self {
            S2K::Simple { hash } => {
                o.write_all(&[0, (*hash).into()])?;
            }
            S2K::Salted { hash, salt } => {
                o.write_all(&[1, (*hash).into()])?;
                o.write_all(salt)?;
            }
            S2K::Iterated { hash, salt, hash_bytes } => {
                o.write_all(&[3, (*hash).into()])?;
                o.write_all(salt)?;
                o.write_all(&[S2K::encode_count(*hash_bytes)])?;
            }
            S2K::Private(u) | S2K::Unknown(u) =>
                return Err(Error::MalformedPacket(format!(
                    "S2K specifier {} cannot be serialized", u)).into()),
        }
        Ok(())
    }
}

impl Key {
    pub(crate) fn body(&self) -> Result<Vec<u8>> {
        let mut body = Vec::with_capacity(self.body_len());
        body.push(self.version());
        body.extend_from_slice(&self.creation_time().to_be_bytes());
        if self.version() == 3 {
            body.extend_from_slice(&self.days_valid().to_be_bytes());
        }
        body.push(self.pk_algo().into());
        self.mpis().serialize(&mut body)?;
        Ok(body)
    }
}

impl Serialize for Key {
    fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        emit_packet(Tag::PublicKey, &self.body()?, o)
    }
}

impl SecretKey {
    pub(crate) fn body(&self) -> Result<Vec<u8>> {
        let mut body = self.public().body()?;
        match self.secret() {
            SecretKeyMaterial::Unencrypted { mpis } => {
                body.push(0);
                mpis.serialize(&mut body)?;
                body.extend_from_slice(&mpis.checksum()?.to_be_bytes());
            }
            SecretKeyMaterial::Encrypted {
                s2k_usage, algo, s2k, iv, ciphertext,
            } => {
                body.push(*s2k_usage);
                if *s2k_usage == 254 || *s2k_usage == 255 {
                    body.push((*algo).into());
                    s2k.serialize(&mut body)?;
                }
                body.extend_from_slice(iv);
                body.extend_from_slice(ciphertext);
            }
            SecretKeyMaterial::Unknown { s2k_usage, rest } => {
                body.push(*s2k_usage);
                body.extend_from_slice(rest);
            }
        }
        Ok(body)
    }
}

impl Serialize for SecretKey {
    fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        emit_packet(Tag::SecretKey, &self.body()?, o)
    }
}

impl Signature {
    pub(crate) fn body(&self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        body.push(self.version());

        match self.version() {
            3 => {
                body.push(5);
                body.push(self.sigtype().into());
                body.extend_from_slice(
                    &self.creation_time().unwrap_or(0).to_be_bytes());
                let issuer = self.issuer().ok_or_else(
                    || Error::InvalidOperation(
                        "v3 signature lacks an issuer".into()))?;
                body.extend_from_slice(issuer.as_bytes());
                body.push(self.pk_algo().into());
                body.push(self.hash_algo().into());
                body.extend_from_slice(self.hash_prefix());
                self.mpis().serialize(&mut body)?;
            }
            4 => {
                body.push(self.sigtype().into());
                body.push(self.pk_algo().into());
                body.push(self.hash_algo().into());

                let hashed = self.hashed_area().data();
                body.extend_from_slice(
                    &(hashed.len() as u16).to_be_bytes());
                body.extend_from_slice(hashed);

                let unhashed = self.unhashed_area().data();
                body.extend_from_slice(
                    &(unhashed.len() as u16).to_be_bytes());
                body.extend_from_slice(unhashed);

                body.extend_from_slice(self.hash_prefix());
                self.mpis().serialize(&mut body)?;
            }
            v => return Err(Error::InvalidOperation(format!(
                "cannot serialize a v{} signature", v)).into()),
        }

        Ok(body)
    }
}

impl Serialize for Signature {
    fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        emit_packet(Tag::Signature, &self.body()?, o)
    }
}

impl OnePassSig {
    pub(crate) fn body(&self) -> Result<Vec<u8>> {
        let mut body = Vec::with_capacity(13);
        body.push(self.version());
        body.push(self.sigtype().into());
        body.push(self.hash_algo().into());
        body.push(self.pk_algo().into());
        body.extend_from_slice(self.issuer().as_bytes());
        body.push(self.last_raw());
        Ok(body)
    }
}

impl Serialize for OnePassSig {
    fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        emit_packet(Tag::OnePassSig, &self.body()?, o)
    }
}

impl PKESK {
    pub(crate) fn body(&self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        body.push(self.version());
        body.extend_from_slice(self.recipient().as_bytes());
        body.push(self.pk_algo().into());
        self.esk().serialize(&mut body)?;
        Ok(body)
    }
}

impl Serialize for PKESK {
    fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        emit_packet(Tag::PKESK, &self.body()?, o)
    }
}

impl SKESK {
    pub(crate) fn body(&self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        body.push(self.version());
        body.push(self.sym_algo().into());
        self.s2k().serialize(&mut body)?;
        if let Some(esk) = self.esk() {
            body.extend_from_slice(esk);
        }
        Ok(body)
    }
}

impl Serialize for SKESK {
    fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        emit_packet(Tag::SKESK, &self.body()?, o)
    }
}

impl Literal {
    /// Serializes the literal data header: format, file name, date.
    pub(crate) fn serialize_headers(&self, o: &mut dyn Write)
                                    -> Result<()> {
        let filename = self.filename().unwrap_or(b"");
        o.write_all(&[self.format().into(), filename.len() as u8])?;
        o.write_all(filename)?;
        o.write_all(&self.date().to_be_bytes())?;
        Ok(())
    }

    pub(crate) fn body_bytes(&self) -> Result<Vec<u8>> {
        let mut body = Vec::with_capacity(6 + self.body().len());
        self.serialize_headers(&mut body)?;
        body.extend_from_slice(self.body());
        Ok(body)
    }
}

impl Serialize for Literal {
    fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        emit_packet(Tag::Literal, &self.body_bytes()?, o)
    }
}

impl Serialize for Marker {
    fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        emit_packet(Tag::Marker, Marker::BODY, o)
    }
}

impl Serialize for MDC {
    fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        emit_packet(Tag::MDC, self.digest(), o)
    }
}

impl Serialize for Unknown {
    fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        emit_packet(self.tag(), self.body(), o)
    }
}

impl Serialize for Packet {
    fn serialize(&self, o: &mut dyn Write) -> Result<()> {
        match self {
            Packet::Unknown(p) => p.serialize(o),
            Packet::Signature(p) => p.serialize(o),
            Packet::OnePassSig(p) => p.serialize(o),
            Packet::PublicKey(p) =>
                emit_packet(Tag::PublicKey, &p.body()?, o),
            Packet::PublicSubkey(p) =>
                emit_packet(Tag::PublicSubkey, &p.body()?, o),
            Packet::SecretKey(p) =>
                emit_packet(Tag::SecretKey, &p.body()?, o),
            Packet::SecretSubkey(p) =>
                emit_packet(Tag::SecretSubkey, &p.body()?, o),
            Packet::Marker(p) => p.serialize(o),
            Packet::Trust(p) =>
                emit_packet(Tag::Trust, p.as_bytes(), o),
            Packet::UserID(p) =>
                emit_packet(Tag::UserID, p.value(), o),
            Packet::UserAttribute(p) =>
                emit_packet(Tag::UserAttribute, p.value(), o),
            Packet::Literal(p) => p.serialize(o),
            Packet::PKESK(p) => p.serialize(o),
            Packet::SKESK(p) => p.serialize(o),
            Packet::MDC(p) => p.serialize(o),
            Packet::CompressedData(_) | Packet::SED(_)
            | Packet::SEIP(_) =>
                Err(Error::InvalidOperation(format!(
                    "{} is produced by the streaming writers",
                    self.tag())).into()),
            #[allow(unreachable_patterns)]
            _ => Err(Error::InvalidOperation(
                format!("cannot serialize {}", self.tag())).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use crate::types::DataFormat;

    fn lengths_of(l: BodyLength) -> Vec<u8> {
        let mut o = Vec::new();
        l.serialize(&mut o).unwrap();
        o
    }

    #[test]
    fn new_format_lengths() {
        assert_eq!(lengths_of(BodyLength::Full(0)), [0]);
        assert_eq!(lengths_of(BodyLength::Full(191)), [191]);
        assert_eq!(lengths_of(BodyLength::Full(192)), [192, 0]);
        assert_eq!(lengths_of(BodyLength::Full(193)), [192, 1]);
        assert_eq!(lengths_of(BodyLength::Full(8383)), [223, 255]);
        assert_eq!(lengths_of(BodyLength::Full(8384)),
                   [255, 0, 0, 0x20, 0xc0]);
        assert_eq!(lengths_of(BodyLength::Partial(512)), [224 + 9]);
        assert_eq!(lengths_of(BodyLength::Partial(1)), [224]);

        assert!(BodyLength::Partial(100)
                .serialize(&mut Vec::new()).is_err());
        assert!(BodyLength::Indeterminate
                .serialize(&mut Vec::new()).is_err());
    }

    #[test]
    fn literal_packet_wire_format() {
        let lit = Literal::new(DataFormat::Text)
            .set_body(b"Hello world.".to_vec());
        let mut o = Vec::new();
        lit.serialize(&mut o).unwrap();
        assert_eq!(&o[..],
                   b"\xcb\x12t\x00\x00\x00\x00\x00Hello world.");
    }

    #[test]
    fn roundtrip_simple_packets() {
        let packets = vec![
            Packet::Marker(Marker::default()),
            Packet::UserID(crate::packet::UserID::from(
                "Alice <alice@example.org>")),
            Packet::Trust(crate::packet::Trust::new(
                vec![1, 2, 3, 255])),
            Packet::Literal(Literal::new(DataFormat::Binary)
                            .set_filename(b"file.bin").unwrap()
                            .set_date(1234)
                            .set_body(vec![0; 300])),
        ];

        let mut o = Vec::new();
        for p in &packets {
            p.serialize(&mut o).unwrap();
        }

        let parsed = parse::packets(
            Box::new(layered_reader::Memory::new(&o))).unwrap();
        assert_eq!(parsed, packets);
    }
}
