//! Damaged and hostile input must fail with the right error kinds.

use openpgp_sdk::crypto::asymmetric::generate_rsa_key;
use openpgp_sdk::crypto::mpi::PublicParams;
use openpgp_sdk::packet::signature::subpacket::{Subpacket,
                                                SubpacketTag,
                                                SubpacketValue};
use openpgp_sdk::packet::signature::SignatureBuilder;
use openpgp_sdk::packet::{Key, SecretKey, Tag};
use openpgp_sdk::parse::{Dearmor, Event, Parser, Verdict};
use openpgp_sdk::serialize::Serialize;
use openpgp_sdk::types::{HashAlgorithm, PublicKeyAlgorithm,
                         SignatureType};
use openpgp_sdk::{Error, ErrorKind, Packet};

fn rsa_pair() -> (Key, SecretKey) {
    let (public, secret) = generate_rsa_key(1024).unwrap();
    let key = Key::new(1_200_000_000,
                       PublicKeyAlgorithm::RSAEncryptSign, public);
    let signer = SecretKey::new(key.clone(), secret);
    (key, signer)
}

fn collect_events(input: &[u8])
                  -> (Vec<Tag>, Vec<Error>, Vec<Packet>) {
    let mut tags = Vec::new();
    let mut errors = Vec::new();
    let mut packets = Vec::new();

    let _ = Parser::from_bytes(input).parse(|event| {
        match event {
            Event::PacketHeader(h) => tags.push(h.tag()),
            Event::ErrorCode(e) => errors.push(e.clone()),
            Event::Packet(p) => packets.push(p.clone()),
            Event::SignatureFooter { sig, .. } =>
                packets.push(Packet::Signature(sig.clone())),
            _ => {}
        }
        Ok(Verdict::Continue)
    });

    (tags, errors, packets)
}

#[test]
fn unknown_noncritical_subpacket_surfaces_raw() {
    let (_, signer) = rsa_pair();

    let sig = SignatureBuilder::new(SignatureType::Binary)
        .set_hash_algo(HashAlgorithm::SHA256)
        .add_subpacket(Subpacket::new(SubpacketValue::Raw {
            tag: SubpacketTag::Unknown(77),
            body: b"mystery".to_vec(),
        })).unwrap()
        .sign_document(&signer, b"data").unwrap();

    let mut o = Vec::new();
    sig.serialize(&mut o).unwrap();

    let mut raw_seen = false;
    Parser::from_bytes(&o).parse(|event| {
        match event {
            Event::Subpacket { subpacket, hashed } => {
                assert!(hashed);
                assert!(!subpacket.critical());
                if let SubpacketValue::Raw { tag, body }
                    = subpacket.value()
                {
                    assert_eq!(*tag, SubpacketTag::Unknown(77));
                    assert_eq!(body, b"mystery");
                    raw_seen = true;
                }
            }
            Event::ErrorCode(e) => panic!("parse error: {}", e),
            _ => {}
        }
        Ok(Verdict::Continue)
    }).unwrap();

    assert!(raw_seen);
}

#[test]
fn unknown_critical_subpacket_is_a_format_error() {
    let (_, signer) = rsa_pair();

    let sig = SignatureBuilder::new(SignatureType::Binary)
        .set_hash_algo(HashAlgorithm::SHA256)
        .add_subpacket(Subpacket::with_criticality(
            SubpacketValue::Raw {
                tag: SubpacketTag::Unknown(77),
                body: b"mystery".to_vec(),
            }, true)).unwrap()
        .sign_document(&signer, b"data").unwrap();

    let mut o = Vec::new();
    sig.serialize(&mut o).unwrap();

    let (_, errors, packets) = collect_events(&o);
    assert!(packets.is_empty());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ErrorKind::Format);
}

#[test]
fn secret_key_checksum_tamper_is_a_crypto_error() {
    let (_, secret) = rsa_pair();

    let mut o = Vec::new();
    secret.serialize(&mut o).unwrap();

    // Sanity: the untampered packet parses.
    let (_, errors, packets) = collect_events(&o);
    assert!(errors.is_empty());
    assert_eq!(packets.len(), 1);

    // Zero the two trailing checksum octets (they sit at the very end
    // of the packet body).  If they were zero already, set them
    // instead.
    let n = o.len();
    if o[n - 2] == 0 && o[n - 1] == 0 {
        o[n - 2] = 0xff;
        o[n - 1] = 0xff;
    } else {
        o[n - 2] = 0;
        o[n - 1] = 0;
    }

    let (_, errors, packets) = collect_events(&o);
    assert!(packets.is_empty());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ErrorKind::Crypto);
    assert!(matches!(errors[0], Error::ChecksumMismatch));
}

#[test]
fn clear_tag_bit_halts_the_stream() {
    // 0x2a has bit 7 clear: not a packet tag.
    let mut reported = false;
    let result = Parser::from_bytes(&[0x2a, 0, 0])
        .dearmor(Dearmor::None)
        .parse(|event| {
            if let Event::ErrorCode(e) = event {
                assert_eq!(e.kind(), ErrorKind::Format);
                reported = true;
            }
            Ok(Verdict::Continue)
        });
    assert!(result.is_err());
    assert!(reported);
}

#[test]
fn inconsistent_mpi_is_a_format_error() {
    // A v4 RSA public key whose MPI announces 16 bits but leads with
    // a zero octet.
    let mut body = vec![4u8];
    body.extend_from_slice(&0u32.to_be_bytes());
    body.push(1); // RSA
    body.extend_from_slice(b"\x00\x10\x00\xff"); // broken n
    body.extend_from_slice(b"\x00\x02\x03"); // e

    let mut o = vec![0xc0 | u8::from(Tag::PublicKey),
                     body.len() as u8];
    o.extend_from_slice(&body);

    let (_, errors, packets) = collect_events(&o);
    assert!(packets.is_empty());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ErrorKind::Format);
}

#[test]
fn parsing_resumes_after_a_broken_packet() {
    // A broken marker packet followed by a healthy user id packet.
    let mut o = vec![0xc0 | u8::from(Tag::Marker), 3];
    o.extend_from_slice(b"NOT");
    o.extend_from_slice(&[0xc0 | u8::from(Tag::UserID), 3]);
    o.extend_from_slice(b"bob");

    let (tags, errors, packets) = collect_events(&o);
    assert_eq!(tags, [Tag::Marker, Tag::UserID]);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ErrorKind::Format);
    assert_eq!(packets.len(), 1);
    assert!(matches!(&packets[0], Packet::UserID(uid)
                     if uid.value() == b"bob"));
}

#[test]
fn protected_secret_key_decrypts_with_the_passphrase() {
    // Round trip through the wire format: protect, serialize, parse,
    // decrypt.
    use openpgp_sdk::crypto::s2k::S2K;
    use openpgp_sdk::crypto::symmetric::Cfb;
    use openpgp_sdk::types::SymmetricAlgorithm;

    let (_, secret) = rsa_pair();
    let password = "boulder".into();

    // Build the encrypted variant by hand: parameters plus SHA-1
    // checksum, CFB under an S2K-derived key (usage octet 254).
    let mpis = match secret.secret() {
        openpgp_sdk::packet::SecretKeyMaterial::Unencrypted { mpis } =>
            mpis.clone(),
        _ => unreachable!(),
    };
    let algo = SymmetricAlgorithm::AES128;
    let s2k = S2K::Iterated {
        hash: HashAlgorithm::SHA1,
        salt: *b"pepper!!",
        hash_bytes: 65536,
    };
    let key = s2k.derive_key(&password, 16).unwrap();

    let mut plaintext = Vec::new();
    mpis.serialize(&mut plaintext).unwrap();
    let mut ctx = HashAlgorithm::SHA1.context().unwrap();
    ctx.update(&plaintext);
    let mut digest = [0u8; 20];
    ctx.digest(&mut digest);
    plaintext.extend_from_slice(&digest);

    let iv = [7u8; 16];
    let mut ciphertext = plaintext;
    Cfb::with_iv(algo, &key, &iv).unwrap().encrypt(&mut ciphertext);

    // Recover the public key packet body by stripping the header off
    // a serialized public key packet.
    let mut serialized = Vec::new();
    secret.public().serialize(&mut serialized).unwrap();
    let header_len = match serialized[1] {
        0..=191 => 2,
        192..=223 => 3,
        _ => 6,
    };
    let mut body = serialized[header_len..].to_vec();
    body.push(254);
    body.push(algo.into());
    body.extend_from_slice(&[3, HashAlgorithm::SHA1.into()]);
    body.extend_from_slice(b"pepper!!");
    body.push(S2K::encode_count(65536));
    body.extend_from_slice(&iv);
    body.extend_from_slice(&ciphertext);

    let mut o = vec![0xc0 | u8::from(Tag::SecretKey)];
    openpgp_sdk::packet::BodyLength::Full(body.len() as u32)
        .serialize(&mut o).unwrap();
    o.extend_from_slice(&body);

    let (_, errors, packets) = collect_events(&o);
    assert!(errors.is_empty(), "{:?}", errors);
    let mut parsed = match &packets[..] {
        [Packet::SecretKey(k)] => k.clone(),
        p => panic!("unexpected packets {:?}", p),
    };

    // Wrong passphrase: the checksum rejects it.
    assert!(parsed.clone().decrypt(&"wrong".into()).is_err());

    parsed.decrypt(&password).unwrap();
    assert_eq!(parsed.unencrypted_secret().unwrap(), &mpis);
}

#[test]
fn unknown_public_key_algorithm_is_preserved() {
    // An unknown algorithm's parameters are kept as raw MPIs.
    let mut body = vec![4u8];
    body.extend_from_slice(&7u32.to_be_bytes());
    body.push(99); // unknown algorithm
    body.extend_from_slice(b"\x00\x08\xaa");

    let mut o = vec![0xc0 | u8::from(Tag::PublicKey),
                     body.len() as u8];
    o.extend_from_slice(&body);

    let (_, errors, packets) = collect_events(&o);
    assert!(errors.is_empty());
    match &packets[..] {
        [Packet::PublicKey(k)] => {
            assert_eq!(k.pk_algo(), PublicKeyAlgorithm::Unknown(99));
            assert!(matches!(k.mpis(),
                             PublicParams::Unknown { mpis, .. }
                             if mpis.len() == 1));
        }
        p => panic!("unexpected packets {:?}", p),
    }
}
