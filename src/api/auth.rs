//! Wallet-signature login.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::debug;
use solana_sdk::signature::{Keypair, Signer};

use super::{AuthToken, OdysseyApi};
use crate::wallet::encoded_public_key;
use crate::Result;

/// Detached ed25519 signature over the challenge text, base64 encoded.
pub fn sign_challenge(keypair: &Keypair, challenge: &str) -> String {
    let signature = keypair.sign_message(challenge.as_bytes());
    STANDARD.encode(signature.as_ref())
}

/// Challenge, sign, exchange. Any failure aborts the login.
pub async fn login<A: OdysseyApi + ?Sized>(api: &A, keypair: &Keypair) -> Result<AuthToken> {
    let address = keypair.pubkey().to_string();
    let challenge = api.challenge(&address).await?;
    debug!("{} received login challenge", address);

    let signature = sign_challenge(keypair, &challenge);
    api.authorize(&address, &encoded_public_key(keypair), &signature).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockOdysseyApi;
    use crate::Error;
    use solana_sdk::signature::Signature;

    fn verifies(keypair_pubkey: &[u8], challenge: &str, signature_b64: &str) -> bool {
        let bytes = STANDARD.decode(signature_b64).unwrap();
        let signature = Signature::try_from(bytes.as_slice()).unwrap();
        signature.verify(keypair_pubkey, challenge.as_bytes())
    }

    #[test]
    fn test_sign_challenge_verifies() {
        let keypair = Keypair::new();
        let signature = sign_challenge(&keypair, "Sign in to Sonic");
        assert!(verifies(keypair.pubkey().as_ref(), "Sign in to Sonic", &signature));
        assert!(!verifies(keypair.pubkey().as_ref(), "something else", &signature));
    }

    #[tokio::test]
    async fn test_login_exchanges_signed_challenge() {
        let keypair = Keypair::new();
        let address = keypair.pubkey().to_string();
        let pubkey_bytes = keypair.pubkey().to_bytes();
        let encoded = encoded_public_key(&keypair);

        let mut api = MockOdysseyApi::new();
        let expected_address = address.clone();
        api.expect_challenge()
            .withf(move |wallet| wallet == expected_address)
            .times(1)
            .returning(|_| Ok("challenge-42".to_string()));
        api.expect_authorize().times(1).returning(move |addr, addr_encoded, signature| {
            assert_eq!(addr, address);
            assert_eq!(addr_encoded, encoded);
            assert!(verifies(&pubkey_bytes, "challenge-42", signature));
            Ok(AuthToken::new("token-1"))
        });

        let token = login(&api, &keypair).await.unwrap();
        assert_eq!(token.as_str(), "token-1");
    }

    #[tokio::test]
    async fn test_login_stops_when_challenge_fails() {
        let keypair = Keypair::new();
        let mut api = MockOdysseyApi::new();
        api.expect_challenge()
            .returning(|_| Err(Error::ApiError { status: 503, message: "maintenance".into() }));
        api.expect_authorize().never();

        let err = login(&api, &keypair).await.unwrap_err();
        assert_eq!(err.api_message(), Some("maintenance"));
    }
}
