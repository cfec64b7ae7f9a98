// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Donation reward payouts on the Aptos testnet.
//!
//! Transfers go through the fullnode REST API:
//! 1. Validate the recipient address
//! 2. Look up the sender (logged only) and the recipient (must exist)
//! 3. Encode a `0x1::aptos_account::transfer` call server-side
//! 4. Sign the signing message with the sender's Ed25519 key
//! 5. Submit and wait for the transaction by hash

use crate::config::Config;
use anyhow::Context;
use async_trait::async_trait;
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Octas per APT.
pub const OCTAS_PER_APT: f64 = 100_000_000.0;
const MAX_GAS_AMOUNT: u64 = 1000;
const GAS_UNIT_PRICE: u64 = 100;
const EXPIRATION_SECS: i64 = 600;
const TRANSFER_FUNCTION: &str = "0x1::aptos_account::transfer";
const COMMITTED_TRANSACTION: &str = "user_transaction";
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayoutError {
    #[error("Invalid recipient address")]
    InvalidAddress,

    #[error("Recipient account is not activated")]
    RecipientNotActivated,

    #[error("Payout failed: {0}")]
    PayoutFailed(String),
}

/// Sends a reward transfer and returns its transaction hash.
#[async_trait]
pub trait RewardPayout: Send + Sync {
    async fn send_reward(&self, address: &str, amount_apt: f64) -> Result<String, PayoutError>;
}

/// `0x` followed by exactly 64 hex digits.
pub fn is_valid_address(address: &str) -> bool {
    address
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Convert APT to octas, rounding to the nearest octa.
pub fn apt_to_octas(amount_apt: f64) -> u64 {
    (amount_apt * OCTAS_PER_APT).round() as u64
}

struct RewardSigner {
    address: String,
    key_pair: Ed25519KeyPair,
}

/// Aptos REST payout client.
#[derive(Clone)]
pub struct AptosRewardClient {
    http: reqwest::Client,
    node_url: String,
    /// `None` when no sender is configured; every payout then fails.
    signer: Option<Arc<RewardSigner>>,
}

impl AptosRewardClient {
    /// Build a client from configuration.
    ///
    /// A missing sender address or key disables payouts. A key that is
    /// present but unparseable is a startup error.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let signer = match (
            config.reward_sender_address.as_deref(),
            config.reward_sender_private_key.as_deref(),
        ) {
            (Some(address), Some(key)) => Some(build_signer(address, key)?),
            _ => {
                tracing::warn!("Reward sender not configured; donation rewards are disabled");
                None
            }
        };

        Self::new(&config.aptos_node_url, signer)
    }

    /// Build a client for an explicit sender.
    pub fn with_sender(node_url: &str, address: &str, private_key: &str) -> anyhow::Result<Self> {
        Self::new(node_url, Some(build_signer(address, private_key)?))
    }

    fn new(node_url: &str, signer: Option<RewardSigner>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed building Aptos HTTP client")?;

        Ok(Self {
            http,
            node_url: node_url.trim_end_matches('/').to_string(),
            signer: signer.map(Arc::new),
        })
    }

    async fn get_account(&self, address: &str) -> Result<Option<AccountInfo>, PayoutError> {
        let response = self
            .http
            .get(format!("{}/accounts/{}", self.node_url, address))
            .send()
            .await
            .map_err(failed)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_response_json(response).await.map(Some)
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, PayoutError> {
        let response = self
            .http
            .post(format!("{}{}", self.node_url, path))
            .json(body)
            .send()
            .await
            .map_err(failed)?;
        check_response_json(response).await
    }

    async fn wait_for_transaction(&self, hash: &str) -> Result<(), PayoutError> {
        let response = self
            .http
            .get(format!("{}/transactions/wait_by_hash/{}", self.node_url, hash))
            .send()
            .await
            .map_err(failed)?;
        let status: TransactionStatus = check_response_json(response).await?;

        // The long-poll can time out and hand back a still-pending transaction
        if status.kind != COMMITTED_TRANSACTION {
            tracing::warn!(hash, kind = %status.kind, "Reward transaction not committed");
            return Err(PayoutError::PayoutFailed(format!(
                "transaction {} not confirmed",
                hash
            )));
        }

        if status.success != Some(true) {
            return Err(PayoutError::PayoutFailed(format!(
                "transaction {} failed: {}",
                hash,
                status.vm_status.unwrap_or_default()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RewardPayout for AptosRewardClient {
    async fn send_reward(&self, address: &str, amount_apt: f64) -> Result<String, PayoutError> {
        if !is_valid_address(address) {
            return Err(PayoutError::InvalidAddress);
        }
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| PayoutError::PayoutFailed("reward sender not configured".to_string()))?;

        let sender = self
            .get_account(&signer.address)
            .await?
            .ok_or_else(|| PayoutError::PayoutFailed("sender account not found".to_string()))?;
        tracing::debug!(
            sender = %signer.address,
            sequence_number = %sender.sequence_number,
            "Reward sender account"
        );

        if self.get_account(address).await?.is_none() {
            return Err(PayoutError::RecipientNotActivated);
        }

        let octas = apt_to_octas(amount_apt);
        let expiration = chrono::Utc::now().timestamp() + EXPIRATION_SECS;
        let mut transaction = json!({
            "sender": signer.address,
            "sequence_number": sender.sequence_number,
            "max_gas_amount": MAX_GAS_AMOUNT.to_string(),
            "gas_unit_price": GAS_UNIT_PRICE.to_string(),
            "expiration_timestamp_secs": expiration.to_string(),
            "payload": {
                "type": "entry_function_payload",
                "function": TRANSFER_FUNCTION,
                "type_arguments": [],
                "arguments": [address, octas.to_string()],
            },
        });

        let signing_message: String = self
            .post_json("/transactions/encode_submission", &transaction)
            .await?;
        let message = hex::decode(signing_message.trim_start_matches("0x"))
            .map_err(|e| PayoutError::PayoutFailed(format!("bad signing message: {}", e)))?;
        let signature = signer.key_pair.sign(&message);

        transaction["signature"] = json!({
            "type": "ed25519_signature",
            "public_key": format!("0x{}", hex::encode(signer.key_pair.public_key().as_ref())),
            "signature": format!("0x{}", hex::encode(signature.as_ref())),
        });

        let pending: PendingTransaction = self.post_json("/transactions", &transaction).await?;
        self.wait_for_transaction(&pending.hash).await?;

        tracing::info!(
            recipient = %address,
            octas,
            hash = %pending.hash,
            "Reward transfer confirmed"
        );
        Ok(pending.hash)
    }
}

fn build_signer(address: &str, private_key: &str) -> anyhow::Result<RewardSigner> {
    if !is_valid_address(address) {
        anyhow::bail!("reward sender address is not a valid account address");
    }

    // Accept raw hex, 0x-prefixed hex and the `ed25519-priv-0x` form
    let hex_seed = private_key
        .trim()
        .trim_start_matches("ed25519-priv-")
        .trim_start_matches("0x");
    let seed = hex::decode(hex_seed).context("reward sender key is not hex")?;
    let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed)
        .map_err(|e| anyhow::anyhow!("reward sender key rejected: {}", e))?;

    Ok(RewardSigner {
        address: address.to_string(),
        key_pair,
    })
}

fn failed(err: reqwest::Error) -> PayoutError {
    PayoutError::PayoutFailed(err.to_string())
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, PayoutError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(PayoutError::PayoutFailed(format!("HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| PayoutError::PayoutFailed(format!("JSON parse error: {}", e)))
}

// ─── Aptos REST Types ────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AccountInfo {
    sequence_number: String,
}

#[derive(Debug, Deserialize)]
struct PendingTransaction {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct TransactionStatus {
    /// `user_transaction` once committed, `pending_transaction` before
    #[serde(rename = "type", default)]
    kind: String,
    success: Option<bool>,
    vm_status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const SENDER: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";
    const RECIPIENT: &str = "0x2222222222222222222222222222222222222222222222222222222222222222";
    const SEED: &str = "0101010101010101010101010101010101010101010101010101010101010101";

    fn client(server: &MockServer) -> AptosRewardClient {
        AptosRewardClient::with_sender(&server.url("/v1"), SENDER, SEED).unwrap()
    }

    #[test]
    fn test_is_valid_address() {
        assert!(is_valid_address(SENDER));
        assert!(is_valid_address(&format!("0x{}", "aB".repeat(32))));
        assert!(!is_valid_address("0x1234"));
        assert!(!is_valid_address(&"1".repeat(66)));
        assert!(!is_valid_address(&format!("0x{}", "g".repeat(64))));
    }

    #[test]
    fn test_apt_to_octas() {
        assert_eq!(apt_to_octas(0.01), 1_000_000);
        assert_eq!(apt_to_octas(1.0), 100_000_000);
    }

    #[test]
    fn test_key_formats_accepted() {
        assert!(build_signer(SENDER, SEED).is_ok());
        assert!(build_signer(SENDER, &format!("0x{}", SEED)).is_ok());
        assert!(build_signer(SENDER, &format!("ed25519-priv-0x{}", SEED)).is_ok());
        assert!(build_signer(SENDER, "zz").is_err());
        assert!(build_signer("0x1", SEED).is_err());
    }

    #[tokio::test]
    async fn test_invalid_address_makes_no_requests() {
        // Nothing listens on this port; any request would fail differently
        let client = AptosRewardClient::with_sender("http://127.0.0.1:1", SENDER, SEED).unwrap();

        let err = client.send_reward("0xnope", 0.01).await.unwrap_err();
        assert_eq!(err, PayoutError::InvalidAddress);
    }

    #[tokio::test]
    async fn test_unconfigured_sender_fails() {
        let config = Config::test_default();
        let client = AptosRewardClient::from_config(&config).unwrap();

        let err = client.send_reward(RECIPIENT, 0.01).await.unwrap_err();
        assert!(matches!(err, PayoutError::PayoutFailed(_)));
    }

    #[tokio::test]
    async fn test_recipient_not_activated() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/v1/accounts/{}", SENDER));
                then.status(200)
                    .json_body(json!({"sequence_number": "7", "authentication_key": SENDER}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/v1/accounts/{}", RECIPIENT));
                then.status(404)
                    .json_body(json!({"error_code": "account_not_found"}));
            })
            .await;

        let err = client(&server).send_reward(RECIPIENT, 0.01).await.unwrap_err();
        assert_eq!(err, PayoutError::RecipientNotActivated);
    }

    #[tokio::test]
    async fn test_successful_transfer_returns_hash() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/v1/accounts/{}", SENDER));
                then.status(200).json_body(json!({"sequence_number": "7"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/v1/accounts/{}", RECIPIENT));
                then.status(200).json_body(json!({"sequence_number": "0"}));
            })
            .await;
        let encode = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/transactions/encode_submission")
                    .body_includes(TRANSFER_FUNCTION)
                    .body_includes("\"1000000\"");
                then.status(200).json_body(json!("0xdeadbeef"));
            })
            .await;
        let submit = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/transactions")
                    .body_includes("ed25519_signature");
                then.status(202).json_body(json!({"hash": "0xfeed"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/transactions/wait_by_hash/0xfeed");
                then.status(200)
                    .json_body(json!({
                        "type": "user_transaction",
                        "success": true,
                        "vm_status": "Executed successfully"
                    }));
            })
            .await;

        let hash = client(&server).send_reward(RECIPIENT, 0.01).await.unwrap();

        assert_eq!(hash, "0xfeed");
        encode.assert_async().await;
        submit.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_vm_status_is_payout_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path_includes("/v1/accounts/");
                then.status(200).json_body(json!({"sequence_number": "1"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/transactions/encode_submission");
                then.status(200).json_body(json!("0x00"));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/transactions");
                then.status(202).json_body(json!({"hash": "0xbad"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/transactions/wait_by_hash/0xbad");
                then.status(200)
                    .json_body(json!({
                        "type": "user_transaction",
                        "success": false,
                        "vm_status": "INSUFFICIENT_BALANCE"
                    }));
            })
            .await;

        let err = client(&server).send_reward(RECIPIENT, 0.01).await.unwrap_err();
        assert!(matches!(err, PayoutError::PayoutFailed(msg) if msg.contains("INSUFFICIENT_BALANCE")));
    }

    #[tokio::test]
    async fn test_pending_transaction_is_not_confirmed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path_includes("/v1/accounts/");
                then.status(200).json_body(json!({"sequence_number": "1"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/transactions/encode_submission");
                then.status(200).json_body(json!("0x00"));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/transactions");
                then.status(202).json_body(json!({"hash": "0xpend"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/transactions/wait_by_hash/0xpend");
                then.status(200)
                    .json_body(json!({"type": "pending_transaction", "hash": "0xpend"}));
            })
            .await;

        let err = client(&server).send_reward(RECIPIENT, 0.01).await.unwrap_err();
        assert!(matches!(err, PayoutError::PayoutFailed(msg) if msg.contains("not confirmed")));
    }
}
