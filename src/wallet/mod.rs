//! Keypair provisioning: base58 key files and seed-phrase derivation.
//!
//! Derived accounts follow the path `m/44'/501'/{index}'/0'`, the layout used
//! by the common Solana browser wallets, so index `0` of a phrase matches the
//! first account those wallets show.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, info};
use solana_sdk::{
    derivation_path::DerivationPath,
    signature::{Keypair, Signer},
    signer::keypair::{generate_seed_from_seed_phrase_and_passphrase, keypair_from_seed_and_derivation_path},
};

use crate::config::WalletConfig;
use crate::utils::error::{Error, Result};
use crate::utils::{read_json, write_json};

/// Word counts a BIP-39 mnemonic may have.
const MNEMONIC_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// Decode a base58 64-byte secret key.
pub fn keypair_from_base58(secret: &str) -> Result<Keypair> {
    let bytes = bs58::decode(secret.trim().trim_matches('"')).into_vec()?;
    Keypair::from_bytes(&bytes)
        .map_err(|e| Error::WalletError(format!("Keypair from_bytes error: {}", e)))
}

/// Base64 of the 32 public key bytes, as the authorize endpoint expects.
pub fn encoded_public_key(keypair: &Keypair) -> String {
    STANDARD.encode(keypair.pubkey().to_bytes())
}

/// Load every keypair from a JSON array of base58 secret keys, in file order.
///
/// One malformed entry fails the whole file.
pub fn load_keypairs<P: AsRef<Path>>(path: P) -> Result<Vec<Keypair>> {
    let secrets: Vec<String> = read_json(&path)?;
    let keypairs = secrets
        .iter()
        .enumerate()
        .map(|(i, secret)| {
            keypair_from_base58(secret).map_err(|e| {
                Error::WalletError(format!(
                    "entry {} of {}: {}",
                    i + 1,
                    path.as_ref().display(),
                    e
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    debug!("Loaded {} keypairs from {}", keypairs.len(), path.as_ref().display());
    Ok(keypairs)
}

/// Write the secret keys as a pretty JSON array of base58 strings.
pub fn save_secret_keys<P: AsRef<Path>>(path: P, keypairs: &[Keypair]) -> Result<()> {
    let secrets: Vec<String> = keypairs.iter().map(|k| k.to_base58_string()).collect();
    write_json(&path, &secrets)?;
    info!("Wrote {} secret keys to {}", secrets.len(), path.as_ref().display());
    Ok(())
}

/// Load the seed phrases file (JSON array of strings).
pub fn load_mnemonics<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    read_json(path)
}

/// Write empty JSON arrays for the key and mnemonic files that do not exist
/// yet. Returns the files created.
pub fn create_key_file_skeletons(config: &WalletConfig) -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    for path in [&config.private_keys_path, &config.mnemonics_path] {
        let path = PathBuf::from(path);
        if path.exists() {
            debug!("{} already exists, leaving it alone", path.display());
            continue;
        }
        write_json(&path, &Vec::<String>::new())?;
        created.push(path);
    }
    Ok(created)
}

/// Turn a seed phrase into its 64-byte BIP-39 seed.
pub fn seed_from_phrase(phrase: &str, passphrase: &str) -> Result<Vec<u8>> {
    let normalized = phrase.split_whitespace().collect::<Vec<_>>().join(" ");
    let words = normalized.split(' ').filter(|w| !w.is_empty()).count();
    if !MNEMONIC_WORD_COUNTS.contains(&words) {
        return Err(Error::WalletError(format!(
            "seed phrase has {} words, expected one of {:?}",
            words, MNEMONIC_WORD_COUNTS
        )));
    }
    Ok(generate_seed_from_seed_phrase_and_passphrase(&normalized, passphrase))
}

/// Derive the keypair at `m/44'/501'/{index}'/0'` from a BIP-39 seed.
pub fn derive_keypair(seed: &[u8], index: u32) -> Result<Keypair> {
    let path = DerivationPath::new_bip44(Some(index), Some(0));
    keypair_from_seed_and_derivation_path(seed, Some(path))
        .map_err(|e| Error::WalletError(format!("derivation at index {} failed: {}", index, e)))
}

/// Derive `count` keypairs for indices `0..count`, in index order.
pub fn derive_keypairs(phrase: &str, passphrase: &str, count: u32) -> Result<Vec<Keypair>> {
    let seed = seed_from_phrase(phrase, passphrase)?;
    (0..count).map(|index| derive_keypair(&seed, index)).collect()
}
