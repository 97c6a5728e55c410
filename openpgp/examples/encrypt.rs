//! Encrypts stdin to the key matching a user id, writing the message
//! to stdout.

use std::env;
use std::io::{self, Read, Write};

use openpgp_sdk::keyring::Keyring;
use openpgp_sdk::serialize::stream::{finalize, wrap, Encryptor,
                                     LiteralWriter};
use openpgp_sdk::types::{DataFormat, SymmetricAlgorithm};
use openpgp_sdk::Result;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <keyfile> <user_id>", args[0]);
        std::process::exit(1);
    }

    let keyring = Keyring::from_file(&args[1])?;
    let record = keyring.find_by_userid(&args[2])
        .ok_or_else(|| anyhow::anyhow!("no key matches {:?}", args[2]))?;
    let key = record.encryption_key()?;

    let stdout = io::stdout();
    let encryptor = Encryptor::new(wrap(stdout.lock()),
                                   SymmetricAlgorithm::AES256,
                                   &[key], &[])?;
    let mut message = LiteralWriter::new(encryptor, DataFormat::Binary,
                                         None, 0)?;

    let mut buf = [0u8; 8192];
    let mut stdin = io::stdin();
    loop {
        let n = stdin.read(&mut buf)?;
        if n == 0 {
            break;
        }
        message.write_all(&buf[..n])?;
    }

    finalize(message)?;
    Ok(())
}
