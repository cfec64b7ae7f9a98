// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Donation submission and reward workflow.
//!
//! A submission moves through these steps, stopping at the first failure:
//! 1. Validate the request (nothing persisted on failure)
//! 2. Resolve the reward wallet (nothing persisted on failure)
//! 3. Append the donation to the user's record
//! 4. Attempt exactly one reward payout; failure is logged, not returned

use crate::db::UserStore;
use crate::error::AppError;
use crate::models::{Donation, DonationItem, Unit};
use crate::services::reward::RewardPayout;
use crate::services::wallet::WalletResolver;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;

/// Shown in place of a transaction hash when no reward was sent.
pub const REWARD_NOT_SENT: &str = "Reward not sent";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DonationError {
    #[error("{0}")]
    InvalidDonationInput(String),

    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("User not found")]
    UserNotFound,

    #[error("Failed to save donation: {0}")]
    PersistenceError(String),
}

impl From<DonationError> for AppError {
    fn from(err: DonationError) -> Self {
        match err {
            DonationError::InvalidDonationInput(msg) => AppError::BadRequest(msg),
            DonationError::WalletNotConnected => AppError::BadRequest(err.to_string()),
            DonationError::UserNotFound => AppError::NotFound(err.to_string()),
            DonationError::PersistenceError(msg) => AppError::Database(msg),
        }
    }
}

/// Result of the reward step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewardOutcome {
    /// Transfer confirmed with this transaction hash
    Sent(String),
    /// No transfer happened; holds the reason
    NotSent(String),
}

impl RewardOutcome {
    pub fn transaction_hash(&self) -> Option<&str> {
        match self {
            RewardOutcome::Sent(hash) => Some(hash),
            RewardOutcome::NotSent(_) => None,
        }
    }

    /// Value reported to clients: the hash, or [`REWARD_NOT_SENT`].
    pub fn display_value(&self) -> &str {
        self.transaction_hash().unwrap_or(REWARD_NOT_SENT)
    }
}

// ─── Request Shape ───────────────────────────────────────────

/// Organisation reference; clients send either a number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NgoRef {
    Number(serde_json::Number),
    Text(String),
}

/// Quantity as sent by clients; numeric strings are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawQuantity {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDonationItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: Option<RawQuantity>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Body of `POST /api/donate`, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRequest {
    #[serde(default)]
    pub ngo_id: Option<NgoRef>,
    #[serde(default)]
    pub items: Option<Vec<RawDonationItem>>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDonation {
    pub ngo_id: String,
    pub items: Vec<DonationItem>,
    pub date: DateTime<Utc>,
}

fn invalid(msg: impl Into<String>) -> DonationError {
    DonationError::InvalidDonationInput(msg.into())
}

/// Check and coerce a raw request. Any bad item rejects the whole request.
pub fn validate(request: &DonationRequest) -> Result<ValidDonation, DonationError> {
    let ngo_id = match &request.ngo_id {
        Some(NgoRef::Number(n)) => n.to_string(),
        Some(NgoRef::Text(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return Err(invalid("ngoId is required")),
    };

    let raw_items = request
        .items
        .as_deref()
        .filter(|items| !items.is_empty())
        .ok_or_else(|| invalid("At least one item is required"))?;

    let items = raw_items
        .iter()
        .enumerate()
        .map(|(i, raw)| validate_item(i, raw))
        .collect::<Result<Vec<_>, _>>()?;

    let date = request
        .date
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| invalid("date is required"))?;
    let date = parse_date(date).ok_or_else(|| invalid(format!("Invalid date: {}", date)))?;

    Ok(ValidDonation {
        ngo_id,
        items,
        date,
    })
}

fn validate_item(index: usize, raw: &RawDonationItem) -> Result<DonationItem, DonationError> {
    let name = raw
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| invalid(format!("Item {} has no name", index + 1)))?;

    let quantity = match &raw.quantity {
        Some(RawQuantity::Number(q)) => Some(*q),
        Some(RawQuantity::Text(s)) => s.trim().parse::<f64>().ok(),
        None => None,
    }
    .filter(|q| q.is_finite() && *q > 0.0)
    .ok_or_else(|| invalid(format!("Item {} must have a positive quantity", index + 1)))?;

    let unit = match raw.unit.as_deref().map(str::trim) {
        None | Some("") => Unit::default(),
        Some(u) => Unit::parse(u)
            .ok_or_else(|| invalid(format!("Item {} has unknown unit '{}'", index + 1, u)))?,
    };

    Ok(DonationItem {
        name: name.to_string(),
        quantity,
        unit,
    })
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or RFC 3339.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ─── Workflow ────────────────────────────────────────────────

/// Outcome of a successful submission.
#[derive(Debug, Clone)]
pub struct DonationReceipt {
    pub donation: Donation,
    pub reward: RewardOutcome,
}

/// Orchestrates validation, persistence and the reward payout.
#[derive(Clone)]
pub struct DonationWorkflow {
    store: Arc<dyn UserStore>,
    wallets: Arc<dyn WalletResolver>,
    payout: Arc<dyn RewardPayout>,
    reward_amount_apt: f64,
}

impl DonationWorkflow {
    pub fn new(
        store: Arc<dyn UserStore>,
        wallets: Arc<dyn WalletResolver>,
        payout: Arc<dyn RewardPayout>,
        reward_amount_apt: f64,
    ) -> Self {
        Self {
            store,
            wallets,
            payout,
            reward_amount_apt,
        }
    }

    /// Submit a donation for `subject_id`.
    pub async fn submit(
        &self,
        subject_id: &str,
        request: DonationRequest,
    ) -> Result<DonationReceipt, DonationError> {
        let valid = validate(&request)?;
        let wallet = self
            .resolve_wallet(subject_id, request.wallet_address.as_deref())
            .await?;

        let now = Utc::now();
        let mut donation = Donation {
            id: uuid::Uuid::new_v4().to_string(),
            ngo_id: valid.ngo_id,
            items: valid.items,
            date: valid.date,
            created_at: now,
            reward_transaction_hash: None,
        };

        self.store
            .push_donation(subject_id, donation.clone())
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => DonationError::UserNotFound,
                other => DonationError::PersistenceError(other.to_string()),
            })?;

        tracing::info!(
            subject = subject_id,
            donation_id = %donation.id,
            ngo_id = %donation.ngo_id,
            items = donation.items.len(),
            "Donation recorded"
        );

        let reward = match self.payout.send_reward(&wallet, self.reward_amount_apt).await {
            Ok(hash) => {
                match self
                    .store
                    .set_donation_reward(subject_id, &donation.id, &hash)
                    .await
                {
                    Ok(()) => donation.reward_transaction_hash = Some(hash.clone()),
                    Err(e) => tracing::warn!(
                        donation_id = %donation.id,
                        hash = %hash,
                        error = %e,
                        "Failed to store reward hash (continuing)"
                    ),
                }
                RewardOutcome::Sent(hash)
            }
            Err(e) => {
                tracing::warn!(
                    donation_id = %donation.id,
                    error = %e,
                    "Reward payout failed (continuing)"
                );
                RewardOutcome::NotSent(e.to_string())
            }
        };

        Ok(DonationReceipt { donation, reward })
    }

    /// Supplied address first, then the user's connected wallet.
    async fn resolve_wallet(
        &self,
        subject_id: &str,
        supplied: Option<&str>,
    ) -> Result<String, DonationError> {
        if let Some(address) = supplied.map(str::trim).filter(|a| !a.is_empty()) {
            return Ok(address.to_string());
        }

        self.wallets
            .connected_wallet(subject_id)
            .await
            .map_err(|e| DonationError::PersistenceError(e.to_string()))?
            .ok_or(DonationError::WalletNotConnected)
    }

    /// Donations of `subject_id`, newest first.
    pub async fn history(&self, subject_id: &str) -> Result<Vec<Donation>, DonationError> {
        let user = self
            .store
            .get_user(subject_id)
            .await
            .map_err(|e| DonationError::PersistenceError(e.to_string()))?
            .ok_or(DonationError::UserNotFound)?;

        // Stable sort over reversed insertion order keeps ties newest first
        let mut donations = user.donations;
        donations.reverse();
        donations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(donations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;
    use crate::models::User;
    use crate::services::reward::PayoutError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WALLET: &str = "0x2222222222222222222222222222222222222222222222222222222222222222";

    struct FakePayout {
        result: Result<String, PayoutError>,
        calls: AtomicUsize,
    }

    impl FakePayout {
        fn new(result: Result<String, PayoutError>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RewardPayout for FakePayout {
        async fn send_reward(&self, _address: &str, _amount: f64) -> Result<String, PayoutError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    struct FixedWallet(Option<String>);

    #[async_trait]
    impl WalletResolver for FixedWallet {
        async fn connected_wallet(&self, _subject: &str) -> Result<Option<String>, AppError> {
            Ok(self.0.clone())
        }
    }

    async fn setup(
        payout: Arc<FakePayout>,
        wallet: Option<&str>,
    ) -> (MemoryDb, DonationWorkflow) {
        let db = MemoryDb::new();
        db.create_user_if_absent(User::from_claims("donor", None, None, None, Utc::now()))
            .await
            .unwrap();
        let workflow = DonationWorkflow::new(
            Arc::new(db.clone()),
            Arc::new(FixedWallet(wallet.map(str::to_string))),
            payout,
            0.01,
        );
        (db, workflow)
    }

    fn request(json: serde_json::Value) -> DonationRequest {
        serde_json::from_value(json).unwrap()
    }

    fn rice_request() -> DonationRequest {
        request(serde_json::json!({
            "ngoId": 42,
            "items": [{"name": "rice", "quantity": 2, "unit": "kg"}],
            "date": "2024-05-01",
            "walletAddress": WALLET
        }))
    }

    async fn stored_donations(db: &MemoryDb) -> Vec<Donation> {
        db.get_user("donor").await.unwrap().unwrap().donations
    }

    #[tokio::test]
    async fn test_successful_donation_with_reward() {
        let payout = FakePayout::new(Ok("0xfeed".to_string()));
        let (db, workflow) = setup(payout.clone(), None).await;

        let receipt = workflow.submit("donor", rice_request()).await.unwrap();

        assert_eq!(receipt.reward, RewardOutcome::Sent("0xfeed".to_string()));
        assert_eq!(receipt.donation.items[0].name, "rice");
        assert_eq!(receipt.donation.ngo_id, "42");
        assert_eq!(payout.calls.load(Ordering::SeqCst), 1);

        let stored = stored_donations(&db).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].reward_transaction_hash.as_deref(), Some("0xfeed"));
    }

    #[tokio::test]
    async fn test_payout_failure_still_persists() {
        let payout = FakePayout::new(Err(PayoutError::RecipientNotActivated));
        let (db, workflow) = setup(payout.clone(), None).await;

        let receipt = workflow.submit("donor", rice_request()).await.unwrap();

        assert!(matches!(receipt.reward, RewardOutcome::NotSent(_)));
        assert_eq!(receipt.reward.display_value(), REWARD_NOT_SENT);
        assert_eq!(payout.calls.load(Ordering::SeqCst), 1);

        let stored = stored_donations(&db).await;
        assert_eq!(stored.len(), 1);
        assert!(stored[0].reward_transaction_hash.is_none());
    }

    #[tokio::test]
    async fn test_no_wallet_persists_nothing() {
        let payout = FakePayout::new(Ok("0xfeed".to_string()));
        let (db, workflow) = setup(payout.clone(), None).await;
        let mut req = rice_request();
        req.wallet_address = None;

        let err = workflow.submit("donor", req).await.unwrap_err();

        assert_eq!(err, DonationError::WalletNotConnected);
        assert!(stored_donations(&db).await.is_empty());
        assert_eq!(payout.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_connected_wallet_is_used_when_none_supplied() {
        let payout = FakePayout::new(Ok("0xfeed".to_string()));
        let (db, workflow) = setup(payout, Some(WALLET)).await;
        let mut req = rice_request();
        req.wallet_address = Some("   ".to_string());

        let receipt = workflow.submit("donor", req).await.unwrap();

        assert_eq!(receipt.reward.transaction_hash(), Some("0xfeed"));
        assert_eq!(stored_donations(&db).await.len(), 1);
    }

    #[tokio::test]
    async fn test_non_positive_quantity_rejects_whole_request() {
        let payout = FakePayout::new(Ok("0xfeed".to_string()));
        let (db, workflow) = setup(payout.clone(), None).await;
        let req = request(serde_json::json!({
            "ngoId": 42,
            "items": [
                {"name": "rice", "quantity": 2, "unit": "kg"},
                {"name": "dal", "quantity": 0, "unit": "kg"}
            ],
            "date": "2024-05-01",
            "walletAddress": WALLET
        }));

        let err = workflow.submit("donor", req).await.unwrap_err();

        assert!(matches!(err, DonationError::InvalidDonationInput(_)));
        assert!(stored_donations(&db).await.is_empty());
        assert_eq!(payout.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let payout = FakePayout::new(Ok("0xfeed".to_string()));
        let (_db, workflow) = setup(payout.clone(), None).await;

        let err = workflow.submit("stranger", rice_request()).await.unwrap_err();

        assert_eq!(err, DonationError::UserNotFound);
        assert_eq!(payout.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_item_count_is_preserved() {
        let payout = FakePayout::new(Err(PayoutError::PayoutFailed("down".to_string())));
        let (db, workflow) = setup(payout, None).await;
        let req = request(serde_json::json!({
            "ngoId": "osm-7",
            "items": [
                {"name": "rice", "quantity": "1.5", "unit": "kg"},
                {"name": "bananas", "quantity": 12, "unit": "pieces"},
                {"name": "milk", "quantity": 2}
            ],
            "date": "2024-05-01T10:00:00Z",
            "walletAddress": WALLET
        }));

        let receipt = workflow.submit("donor", req).await.unwrap();

        assert_eq!(receipt.donation.items.len(), 3);
        assert_eq!(receipt.donation.items[0].quantity, 1.5);
        assert_eq!(receipt.donation.items[2].unit, Unit::Kg);
        assert_eq!(stored_donations(&db).await[0].items.len(), 3);
    }

    #[tokio::test]
    async fn test_history_is_newest_first() {
        let payout = FakePayout::new(Ok("0xfeed".to_string()));
        let (_db, workflow) = setup(payout, None).await;

        let first = workflow.submit("donor", rice_request()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = workflow.submit("donor", rice_request()).await.unwrap();

        let history = workflow.history("donor").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.donation.id);
        assert_eq!(history[1].id, first.donation.id);
    }

    #[test]
    fn test_validate_rejections() {
        let cases = [
            serde_json::json!({"items": [{"name": "rice", "quantity": 1}], "date": "2024-05-01"}),
            serde_json::json!({"ngoId": " ", "items": [{"name": "rice", "quantity": 1}], "date": "2024-05-01"}),
            serde_json::json!({"ngoId": 1, "items": [], "date": "2024-05-01"}),
            serde_json::json!({"ngoId": 1, "items": [{"name": "", "quantity": 1}], "date": "2024-05-01"}),
            serde_json::json!({"ngoId": 1, "items": [{"name": "rice", "quantity": -1}], "date": "2024-05-01"}),
            serde_json::json!({"ngoId": 1, "items": [{"name": "rice", "quantity": "lots"}], "date": "2024-05-01"}),
            serde_json::json!({"ngoId": 1, "items": [{"name": "rice", "quantity": 1, "unit": "lbs"}], "date": "2024-05-01"}),
            serde_json::json!({"ngoId": 1, "items": [{"name": "rice", "quantity": 1}]}),
            serde_json::json!({"ngoId": 1, "items": [{"name": "rice", "quantity": 1}], "date": "May 1st"}),
        ];

        for case in cases {
            let err = validate(&request(case.clone())).unwrap_err();
            assert!(
                matches!(err, DonationError::InvalidDonationInput(_)),
                "expected rejection for {}",
                case
            );
        }
    }

    #[test]
    fn test_error_status_mapping() {
        use axum::response::IntoResponse;

        let status = |e: DonationError| AppError::from(e).into_response().status().as_u16();
        assert_eq!(status(DonationError::InvalidDonationInput("x".into())), 400);
        assert_eq!(status(DonationError::WalletNotConnected), 400);
        assert_eq!(status(DonationError::UserNotFound), 404);
        assert_eq!(status(DonationError::PersistenceError("x".into())), 500);
    }
}
