// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Razorpay checkout: order creation and payment signature checks.

use crate::error::AppError;
use anyhow::Context;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const RAZORPAY_BASE_URL: &str = "https://api.razorpay.com/v1";
const CURRENCY: &str = "INR";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Order as returned by Razorpay (fields the frontend needs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub id: String,
    /// Amount in paise
    pub amount: u64,
    pub currency: String,
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Razorpay API client.
#[derive(Clone)]
pub struct PaymentService {
    http: reqwest::Client,
    base_url: String,
    key_id: Option<String>,
    key_secret: Option<String>,
}

impl PaymentService {
    pub fn new(key_id: Option<String>, key_secret: Option<String>) -> anyhow::Result<Self> {
        Self::with_base_url(RAZORPAY_BASE_URL, key_id, key_secret)
    }

    pub fn with_base_url(
        base_url: &str,
        key_id: Option<String>,
        key_secret: Option<String>,
    ) -> anyhow::Result<Self> {
        if key_id.is_none() || key_secret.is_none() {
            tracing::warn!("Razorpay API keys are not configured");
        }
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed building Razorpay HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id,
            key_secret,
        })
    }

    /// Public key id the checkout widget needs.
    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    /// Create an order for `amount` rupees.
    pub async fn create_order(&self, amount: f64) -> Result<PaymentOrder, AppError> {
        let paise = rupees_to_paise(amount)
            .ok_or_else(|| AppError::BadRequest("Invalid or missing amount".to_string()))?;
        let (Some(key_id), Some(key_secret)) = (&self.key_id, &self.key_secret) else {
            return Err(AppError::Upstream("Payments are not configured".to_string()));
        };

        let receipt = format!("receipt_order_{}", chrono::Utc::now().timestamp_millis());
        tracing::debug!(amount = paise, receipt = %receipt, "Creating Razorpay order");

        let response = self
            .http
            .post(format!("{}/orders", self.base_url))
            .basic_auth(key_id, Some(key_secret))
            .json(&serde_json::json!({
                "amount": paise,
                "currency": CURRENCY,
                "receipt": receipt,
            }))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Razorpay request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("Razorpay HTTP {}: {}", status, body)));
        }

        let order: PaymentOrder = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("JSON parse error: {}", e)))?;

        tracing::info!(order_id = %order.id, "Razorpay order created");
        Ok(order)
    }

    /// Check a checkout signature. False when no secret is configured.
    pub fn verify_payment(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        self.key_secret
            .as_deref()
            .is_some_and(|secret| verify_signature(secret, order_id, payment_id, signature))
    }
}

/// Rupees to paise. Rejects non-positive and non-finite amounts.
pub fn rupees_to_paise(amount: f64) -> Option<u64> {
    (amount.is_finite() && amount > 0.0).then(|| (amount * 100.0).round() as u64)
}

/// Hex HMAC-SHA256 of `order_id|payment_id`.
pub fn sign_checkout(secret: &str, order_id: &str, payment_id: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a checkout signature.
pub fn verify_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let Some(expected) = sign_checkout(secret, order_id, payment_id) else {
        return false;
    };
    let provided = signature.trim().to_ascii_lowercase();
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}
