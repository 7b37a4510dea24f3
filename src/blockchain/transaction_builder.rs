use base64::{engine::general_purpose::STANDARD, Engine as _};
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    sanitize::Sanitize,
    signature::{Keypair, Signer},
    system_instruction,
    transaction::Transaction,
};

use crate::{Error, Result};

/// Decode a base64 wire transaction as served by the Odyssey API.
///
/// The result is sanitized, so signature slots match the header and every
/// account index is in range before anything signs it.
pub fn decode_transaction(encoded: &str) -> Result<Transaction> {
    let bytes = STANDARD.decode(encoded.trim())?;
    let transaction: Transaction = bincode::deserialize(&bytes)?;
    transaction
        .sanitize()
        .map_err(|e| Error::TransactionError(format!("malformed transaction: {}", e)))?;
    Ok(transaction)
}

/// Base64 wire encoding of a transaction.
pub fn encode_transaction(transaction: &Transaction) -> Result<String> {
    Ok(STANDARD.encode(bincode::serialize(transaction)?))
}

/// Decode a server-built template and add the account's signature, keeping
/// the template's blockhash and any signatures already present.
pub fn sign_template(encoded: &str, keypair: &Keypair) -> Result<Transaction> {
    let mut transaction = decode_transaction(encoded)?;
    let blockhash = transaction.message.recent_blockhash;
    transaction.try_partial_sign(&[keypair], blockhash)?;
    if !transaction.is_signed() {
        return Err(Error::TransactionError(format!(
            "template still needs signatures other than {}",
            keypair.pubkey()
        )));
    }
    Ok(transaction)
}

/// Signed system transfer from `from` to `to`.
pub fn build_transfer(from: &Keypair, to: &Pubkey, lamports: u64, blockhash: Hash) -> Transaction {
    let instruction = system_instruction::transfer(&from.pubkey(), to, lamports);
    Transaction::new_signed_with_payer(&[instruction], Some(&from.pubkey()), &[from], blockhash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::message::Message;

    fn template_for(payer: &Pubkey) -> String {
        let instruction = system_instruction::transfer(payer, &Pubkey::new_unique(), 1);
        let mut message = Message::new(&[instruction], Some(payer));
        message.recent_blockhash = Hash::new_unique();
        encode_transaction(&Transaction::new_unsigned(message)).unwrap()
    }

    #[test]
    fn test_sign_template() {
        let keypair = Keypair::new();
        let encoded = template_for(&keypair.pubkey());
        let original_blockhash = decode_transaction(&encoded).unwrap().message.recent_blockhash;

        let signed = sign_template(&encoded, &keypair).unwrap();
        assert!(signed.is_signed());
        assert_eq!(signed.message.recent_blockhash, original_blockhash);
        assert!(signed.verify().is_ok());
    }

    #[test]
    fn test_sign_template_for_other_wallet_fails() {
        let encoded = template_for(&Pubkey::new_unique());
        let err = sign_template(&encoded, &Keypair::new()).unwrap_err();
        assert!(matches!(err, Error::TransactionError(_)));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(decode_transaction("%%%"), Err(Error::TransactionError(_))));
        assert!(matches!(decode_transaction("AAAA"), Err(Error::TransactionError(_))));
    }

    #[test]
    fn test_template_missing_signature_slots_is_rejected() {
        let keypair = Keypair::new();
        let mut transaction = decode_transaction(&template_for(&keypair.pubkey())).unwrap();
        transaction.signatures.clear();
        let encoded = encode_transaction(&transaction).unwrap();

        assert!(matches!(decode_transaction(&encoded), Err(Error::TransactionError(_))));
        assert!(matches!(sign_template(&encoded, &keypair), Err(Error::TransactionError(_))));
    }

    #[test]
    fn test_build_transfer() {
        let from = Keypair::new();
        let to = Pubkey::new_unique();
        let transaction = build_transfer(&from, &to, 1_000_000, Hash::new_unique());

        assert!(transaction.is_signed());
        assert_eq!(transaction.message.account_keys[0], from.pubkey());
        assert!(transaction.message.account_keys.contains(&to));
        assert!(transaction.verify().is_ok());
    }
}
