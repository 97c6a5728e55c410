//! End-to-end exercises of the writer stack and the parser.

use std::io::Write;

use openpgp_sdk::crypto::asymmetric::{generate_dsa_key,
                                      generate_rsa_key};
use openpgp_sdk::crypto::symmetric::Cfb;
use openpgp_sdk::crypto::SessionKey;
use openpgp_sdk::packet::signature::SignatureBuilder;
use openpgp_sdk::packet::{Key, SecretKey, Tag};
use openpgp_sdk::parse::{packets, Event, Parser, Verdict};
use openpgp_sdk::serialize::stream::{finalize, wrap, ArbitraryWriter,
                                     Armorer, Compressor, DashEscaper,
                                     Encryptor, LiteralWriter, Signer};
use openpgp_sdk::serialize::Serialize;
use openpgp_sdk::types::{CompressionAlgorithm, DataFormat,
                         HashAlgorithm, PublicKeyAlgorithm,
                         SignatureType, SymmetricAlgorithm};
use openpgp_sdk::{armor, ErrorKind, Packet};

fn rsa_pair() -> (Key, SecretKey) {
    let (public, secret) = generate_rsa_key(1024).unwrap();
    let key = Key::new(1_200_000_000,
                       PublicKeyAlgorithm::RSAEncryptSign, public);
    let signer = SecretKey::new(key.clone(), secret);
    (key, signer)
}

fn dsa_pair() -> (Key, SecretKey) {
    let (public, secret) = generate_dsa_key().unwrap();
    let key = Key::new(1_200_000_000, PublicKeyAlgorithm::DSA, public);
    let signer = SecretKey::new(key.clone(), secret);
    (key, signer)
}

#[test]
fn encrypt_decrypt_rsa() {
    let (key, secret) = rsa_pair();
    let message = b"hello\n";

    let mut o = Vec::new();
    {
        let e = Encryptor::new(wrap(&mut o), SymmetricAlgorithm::AES256,
                               &[&key], &[]).unwrap();
        let mut w = LiteralWriter::new(e, DataFormat::Binary, None, 0)
            .unwrap();
        w.write_all(message).unwrap();
        finalize(w).unwrap();
    }

    // The message structure is one PKESK for our key followed by a
    // SEIP packet.
    let mut tags = Vec::new();
    let mut body = Vec::new();
    let mut errors = Vec::new();
    Parser::from_bytes(&o)
        .add_secret_key(&secret)
        .parse(|event| {
            match event {
                Event::PacketHeader(h) => tags.push(h.tag()),
                Event::Packet(Packet::PKESK(p)) => {
                    assert_eq!(p.recipient(),
                               &key.keyid().unwrap());
                }
                Event::LiteralBody(chunk) =>
                    body.extend_from_slice(chunk),
                Event::ErrorCode(e) => errors.push(e.clone()),
                Event::Error(m) => panic!("parse error: {}", m),
                _ => {}
            }
            Ok(Verdict::Continue)
        }).unwrap();

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    assert_eq!(tags[..2], [Tag::PKESK, Tag::SEIP]);
    assert!(tags.contains(&Tag::Literal));
    assert!(tags.contains(&Tag::MDC));
    assert_eq!(body, message);
}

#[test]
fn encrypt_decrypt_password_and_compression() {
    let password = "correct horse battery staple";
    let message: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8)
        .collect();

    let mut o = Vec::new();
    {
        let e = Encryptor::new(wrap(&mut o), SymmetricAlgorithm::AES128,
                               &[], &[&password.into()]).unwrap();
        let c = Compressor::new(e, CompressionAlgorithm::Zlib).unwrap();
        let mut w = LiteralWriter::new(c, DataFormat::Binary,
                                       Some(b"data.bin"), 17).unwrap();
        w.write_all(&message).unwrap();
        finalize(w).unwrap();
    }

    let mut body = Vec::new();
    let mut saw_skesk = false;
    Parser::from_bytes(&o)
        .add_password(password.into())
        .parse(|event| {
            match event {
                Event::Packet(Packet::SKESK(_)) => saw_skesk = true,
                Event::LiteralHeader(l) => {
                    assert_eq!(l.filename(), Some(&b"data.bin"[..]));
                    assert_eq!(l.date(), 17);
                }
                Event::LiteralBody(chunk) =>
                    body.extend_from_slice(chunk),
                Event::ErrorCode(e) => panic!("parse error: {}", e),
                _ => {}
            }
            Ok(Verdict::Continue)
        }).unwrap();

    assert!(saw_skesk);
    assert_eq!(body, message);
}

#[test]
fn one_pass_sign_verify() {
    let (key, signer_key) = rsa_pair();
    let message = b"signed content, streamed";

    let mut o = Vec::new();
    {
        let builder = SignatureBuilder::new(SignatureType::Binary)
            .set_hash_algo(HashAlgorithm::SHA256)
            .set_creation_time(1_500_000_000).unwrap()
            .set_issuer(key.keyid().unwrap()).unwrap();
        let s = Signer::new(wrap(&mut o), builder, &signer_key).unwrap();
        let mut w = LiteralWriter::new(s, DataFormat::Binary, None, 0)
            .unwrap();
        w.write_all(message).unwrap();
        finalize(w).unwrap();
    }

    // [ one-pass-sig ][ literal ][ signature ], and the signature
    // verifies against the digest the parser computed on the fly.
    let mut verified = false;
    let mut tags = Vec::new();
    Parser::from_bytes(&o).parse(|event| {
        match event {
            Event::PacketHeader(h) => tags.push(h.tag()),
            Event::SignatureFooter { sig, computed } => {
                let computed = computed.expect(
                    "one-pass lets the parser hash the data");
                sig.verify_digest(&key, computed.clone()).unwrap();
                verified = true;
            }
            Event::ErrorCode(e) => panic!("parse error: {}", e),
            _ => {}
        }
        Ok(Verdict::Continue)
    }).unwrap();

    assert_eq!(tags, [Tag::OnePassSig, Tag::Literal, Tag::Signature]);
    assert!(verified);
}

#[test]
fn text_signature_is_line_ending_agnostic() {
    let (key, signer_key) = dsa_pair();

    let builder = SignatureBuilder::new(SignatureType::Text)
        .set_hash_algo(HashAlgorithm::SHA1)
        .set_creation_time(1).unwrap();
    let sig = builder.sign_document(&signer_key, b"line one\nline two")
        .unwrap();

    sig.verify_document(&key, b"line one\r\nline two").unwrap();
    sig.verify_document(&key, b"line one  \nline two").unwrap();
    assert!(sig.verify_document(&key, b"line one\nline 2").is_err());
}

#[test]
fn armored_roundtrip_with_events() {
    let message = b"armored payload";

    let mut o = Vec::new();
    {
        let a = Armorer::with_headers(wrap(&mut o), armor::Kind::Message,
                                      vec![("Comment", "round trip")])
            .unwrap();
        let mut w = LiteralWriter::new(a, DataFormat::Binary, None, 0)
            .unwrap();
        w.write_all(message).unwrap();
        finalize(w).unwrap();
    }

    let text = String::from_utf8(o.clone()).unwrap();
    assert!(text.starts_with("-----BEGIN PGP MESSAGE-----\n"));
    assert!(text.ends_with("-----END PGP MESSAGE-----\n"));

    let mut saw_header = false;
    let mut saw_trailer = false;
    let mut body = Vec::new();
    Parser::from_bytes(&o).parse(|event| {
        match event {
            Event::ArmorHeader { kind, headers } => {
                assert_eq!(kind, armor::Kind::Message);
                assert_eq!(headers,
                           &[("Comment".to_string(),
                              "round trip".to_string())]);
                saw_header = true;
            }
            Event::ArmorTrailer { kind } => {
                assert_eq!(kind, armor::Kind::Message);
                saw_trailer = true;
            }
            Event::LiteralBody(chunk) => body.extend_from_slice(chunk),
            Event::ErrorCode(e) => panic!("parse error: {}", e),
            _ => {}
        }
        Ok(Verdict::Continue)
    }).unwrap();

    assert!(saw_header && saw_trailer);
    assert_eq!(body, message);
}

#[test]
fn corrupted_armor_crc_is_an_armor_error() {
    let mut o = Vec::new();
    {
        let a = Armorer::new(wrap(&mut o), armor::Kind::Message).unwrap();
        let mut w = LiteralWriter::new(a, DataFormat::Binary, None, 0)
            .unwrap();
        w.write_all(b"checksummed").unwrap();
        finalize(w).unwrap();
    }

    // Flip one bit inside the checksum line.
    let text = String::from_utf8(o).unwrap();
    let crc_at = text.rfind("\n=").unwrap() + 2;
    let mut bytes = text.into_bytes();
    bytes[crc_at] ^= 0x01;

    let mut kinds = Vec::new();
    Parser::from_bytes(&bytes).parse(|event| {
        if let Event::ErrorCode(e) = event {
            kinds.push(e.kind());
        }
        Ok(Verdict::Continue)
    }).unwrap();

    assert!(kinds.contains(&ErrorKind::Armor),
            "expected an armor error, got {:?}", kinds);
}

#[test]
fn cleartext_sign_verify_and_tamper() {
    let (key, signer_key) = dsa_pair();
    let message = b"abc\r\nxyz";

    let mut o = Vec::new();
    {
        let builder = SignatureBuilder::new(SignatureType::Text)
            .set_hash_algo(HashAlgorithm::SHA1)
            .set_creation_time(1_500_000_000).unwrap()
            .set_issuer(key.keyid().unwrap()).unwrap();
        let mut w = DashEscaper::new(wrap(&mut o), builder, &signer_key)
            .unwrap();
        w.write_all(message).unwrap();
        finalize(w).unwrap();
    }

    let text = String::from_utf8(o.clone()).unwrap();
    assert!(text.starts_with("-----BEGIN PGP SIGNED MESSAGE-----\n"));
    assert!(text.ends_with("-----END PGP SIGNATURE-----\n"));

    // Parse and verify.
    let verify = |input: &[u8]| -> openpgp_sdk::Result<bool> {
        let mut result = Ok(false);
        let mut body = Vec::new();
        Parser::from_bytes(input).parse(|event| {
            match event {
                Event::CleartextBody(line) =>
                    body.extend_from_slice(line),
                Event::SignatureFooter { sig, computed } => {
                    let computed = computed.expect(
                        "cleartext digests are always available");
                    result = sig.verify_digest(&key, computed.clone())
                        .map(|_| true);
                }
                Event::ErrorCode(e) =>
                    result = Err(e.clone().into()),
                _ => {}
            }
            Ok(Verdict::Continue)
        })?;
        result
    };

    assert!(verify(&o).unwrap());

    // Tampering with a single body byte fails verification with a
    // crypto error.
    let mut tampered = o.clone();
    let body_at = text.find("\nabc").unwrap() + 1;
    tampered[body_at] = b'X';
    let e = verify(&tampered).unwrap_err();
    assert_eq!(ErrorKind::of(&e), ErrorKind::Crypto);
}

#[test]
fn partial_lengths_reassemble() {
    // A literal body written with chunks 512, 512, 173: 1197 body
    // octets in total, 6 of them the literal header fields.
    let mut packet = Vec::new();
    packet.push(0xc0 | u8::from(Tag::Literal));

    let data: Vec<u8> = (0..1191u32).map(|i| (i % 253) as u8).collect();
    let mut body = vec![b'b', 0, 0, 0, 0, 0];
    body.extend_from_slice(&data);
    assert_eq!(body.len(), 1197);

    packet.push(224 + 9); // partial, 512 octets
    packet.extend_from_slice(&body[..512]);
    packet.push(224 + 9); // partial, 512 octets
    packet.extend_from_slice(&body[512..1024]);
    packet.push(173); // definite tail
    packet.extend_from_slice(&body[1024..]);

    let parsed = packets(
        Box::new(layered_reader::Memory::new(&packet))).unwrap();
    assert_eq!(parsed.len(), 1);
    match &parsed[0] {
        Packet::Literal(l) => assert_eq!(l.body(), &data[..]),
        p => panic!("unexpected packet {:?}", p),
    }
}

#[test]
fn streamed_literal_roundtrip_sizes() {
    for size in [1usize, 100, 4095, 4096, 4097, 100_000] {
        let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();

        let mut o = Vec::new();
        {
            let mut w = LiteralWriter::new(wrap(&mut o),
                                           DataFormat::Binary,
                                           None, 0).unwrap();
            w.write_all(&data).unwrap();
            finalize(w).unwrap();
        }

        let parsed = packets(
            Box::new(layered_reader::Memory::new(&o))).unwrap();
        match &parsed[..] {
            [Packet::Literal(l)] =>
                assert_eq!(l.body(), &data[..], "size {}", size),
            p => panic!("unexpected packets {:?}", p),
        }
    }
}

#[test]
fn trust_packet_roundtrip() {
    // A trust packet as a keyring on disk would carry it: old format
    // framing, one-octet length, opaque body.
    let body = [0x06, 0x01, 0xfe, 0x00];
    let mut wire = vec![0x80 | (u8::from(Tag::Trust) << 2),
                       body.len() as u8];
    wire.extend_from_slice(&body);

    let parsed = packets(
        Box::new(layered_reader::Memory::new(&wire))).unwrap();
    let trust = match &parsed[..] {
        [Packet::Trust(t)] => {
            assert_eq!(t.as_bytes(), &body);
            t.clone()
        }
        p => panic!("unexpected packets {:?}", p),
    };

    // Re-emit (the writer uses new format framing) and parse again;
    // the body must survive both trips untouched.
    let mut o = Vec::new();
    Packet::Trust(trust).serialize(&mut o).unwrap();
    assert!(o != wire);
    let reparsed = packets(
        Box::new(layered_reader::Memory::new(&o))).unwrap();
    assert_eq!(reparsed, parsed);
}

#[test]
fn old_format_packets_parse() {
    // An old format user id packet: tag 13, one-octet length.
    let mut o = vec![0x80 | (13 << 2), 5];
    o.extend_from_slice(b"alice");

    let parsed = packets(
        Box::new(layered_reader::Memory::new(&o))).unwrap();
    match &parsed[..] {
        [Packet::UserID(uid)] => assert_eq!(uid.value(), b"alice"),
        p => panic!("unexpected packets {:?}", p),
    }
}

#[test]
fn legacy_sed_with_resync() {
    // Assemble a legacy symmetrically encrypted data packet by hand:
    // random prefix, quick check repetition, resync, then the
    // ciphertext of a literal packet.
    let algo = SymmetricAlgorithm::CAST5;
    let key: Vec<u8> = (1..=16).collect();
    let bs = algo.block_size().unwrap();

    let mut literal = Vec::new();
    openpgp_sdk::packet::Literal::new(DataFormat::Binary)
        .set_body(b"legacy".to_vec())
        .serialize(&mut literal).unwrap();

    let mut prefix: Vec<u8> = (10..10 + bs as u8).collect();
    prefix.extend_from_slice(&[10 + bs as u8 - 2, 10 + bs as u8 - 1]);

    let mut cfb = Cfb::new(algo, &key).unwrap();
    let mut ciphertext = prefix.clone();
    cfb.encrypt(&mut ciphertext);
    cfb.resync();
    let mut body = literal.clone();
    cfb.encrypt(&mut body);
    ciphertext.extend_from_slice(&body);

    let mut o = Vec::new();
    {
        let mut w = ArbitraryWriter::new(wrap(&mut o), Tag::SED)
            .unwrap();
        w.write_all(&ciphertext).unwrap();
        finalize(w).unwrap();
    }

    let mut body = Vec::new();
    let mut saw_sed = false;
    Parser::from_bytes(&o)
        .add_session_key(algo, SessionKey::from(key))
        .parse(|event| {
            match event {
                Event::Packet(Packet::SED(_)) => saw_sed = true,
                Event::LiteralBody(chunk) =>
                    body.extend_from_slice(chunk),
                Event::ErrorCode(e) => panic!("parse error: {}", e),
                _ => {}
            }
            Ok(Verdict::Continue)
        }).unwrap();

    assert!(saw_sed);
    assert_eq!(body, b"legacy");
}

#[test]
fn consumer_can_stop_early() {
    let mut o = Vec::new();
    for _ in 0..3 {
        let mut w = LiteralWriter::new(wrap(&mut o), DataFormat::Binary,
                                       None, 0).unwrap();
        w.write_all(b"x").unwrap();
        finalize(w).unwrap();
    }

    let mut headers = 0;
    Parser::from_bytes(&o).parse(|event| {
        if let Event::PacketHeader(_) = event {
            headers += 1;
            if headers == 2 {
                return Ok(Verdict::Finished);
            }
        }
        Ok(Verdict::Continue)
    }).unwrap();

    // The third packet was never visited.
    assert_eq!(headers, 2);
}
