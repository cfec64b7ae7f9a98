// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Donation submission and history routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Donation;
use crate::services::DonationRequest;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Donation routes (require authentication).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/donate", post(submit_donation))
        .route("/api/user-donations", get(get_user_donations))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationResponse {
    pub message: String,
    pub donation: Donation,
    /// Transaction hash, or "Reward not sent"
    pub reward_transaction_hash: String,
}

/// Record a donation and attempt the reward payout.
async fn submit_donation(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<DonationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DonationResponse>)> {
    let Json(request) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let receipt = state.donations.submit(user.subject_id(), request).await?;

    Ok((
        StatusCode::CREATED,
        Json(DonationResponse {
            message: "Donation successfully submitted".to_string(),
            reward_transaction_hash: receipt.reward.display_value().to_string(),
            donation: receipt.donation,
        }),
    ))
}

#[derive(Serialize)]
pub struct DonationHistoryResponse {
    pub donations: Vec<Donation>,
}

/// The caller's donations, newest first.
async fn get_user_donations(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DonationHistoryResponse>> {
    let donations = state.donations.history(user.subject_id()).await?;
    Ok(Json(DonationHistoryResponse { donations }))
}
