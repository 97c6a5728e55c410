//! Signs an ASCII plaintext file with a secret key, producing a
//! dash-escaped message with an inline signature.

use std::env;
use std::fs;
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use openpgp_sdk::keyring::Keyring;
use openpgp_sdk::packet::signature::SignatureBuilder;
use openpgp_sdk::serialize::stream::{finalize, wrap, DashEscaper};
use openpgp_sdk::types::{HashAlgorithm, SignatureType};
use openpgp_sdk::Result;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 5 {
        eprintln!("Usage: {} <secret key file> <hash> <plaintext file> \
                   <signature file>", args[0]);
        std::process::exit(1);
    }

    let keyring = Keyring::from_file(&args[1])?;
    let signer = keyring.records().iter()
        .find_map(|r| r.primary_secret())
        .ok_or_else(|| anyhow::anyhow!("no secret key in {:?}",
                                       args[1]))?;

    let hash_algo = HashAlgorithm::from_text_name(&args[2])
        .ok_or_else(|| anyhow::anyhow!("unknown hash algorithm: {}",
                                       args[2]))?;

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?
        .as_secs() as u32;
    let builder = SignatureBuilder::new(SignatureType::Text)
        .set_hash_algo(hash_algo)
        .set_creation_time(now)?
        .set_issuer(signer.public().keyid()?)?;

    let sink = fs::File::create(&args[4])?;
    let mut message = DashEscaper::new(wrap(sink), builder, signer)?;
    message.write_all(&fs::read(&args[3])?)?;
    finalize(message)?;

    Ok(())
}
