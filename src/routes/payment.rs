// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Razorpay checkout routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::services::payment::PaymentOrder;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Payment routes (require authentication).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/payment/order", post(create_order))
        .route("/api/payment/verify", post(verify_payment))
}

#[derive(Deserialize)]
struct OrderRequest {
    amount: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order: PaymentOrder,
    pub key_id: Option<String>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<OrderRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let amount = body
        .amount
        .ok_or_else(|| AppError::BadRequest("Invalid or missing amount".to_string()))?;

    let order = state.payments.create_order(amount).await?;
    tracing::info!(subject = user.subject_id(), order_id = %order.id, "Payment order created");

    Ok(Json(OrderResponse {
        order,
        key_id: state.payments.key_id().map(str::to_string),
    }))
}

#[derive(Deserialize, Validate)]
struct VerifyRequest {
    #[validate(length(min = 1))]
    #[serde(default)]
    razorpay_order_id: String,
    #[validate(length(min = 1))]
    #[serde(default)]
    razorpay_payment_id: String,
    #[validate(length(min = 1))]
    #[serde(default)]
    razorpay_signature: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub verified: bool,
}

/// Check the signature returned by the checkout widget.
async fn verify_payment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    body.validate()
        .map_err(|_| AppError::BadRequest("Missing payment verification fields".to_string()))?;

    let verified = state.payments.verify_payment(
        &body.razorpay_order_id,
        &body.razorpay_payment_id,
        &body.razorpay_signature,
    );
    if !verified {
        tracing::warn!(
            subject = user.subject_id(),
            order_id = %body.razorpay_order_id,
            "Payment signature mismatch"
        );
        return Err(AppError::BadRequest("Invalid payment signature".to_string()));
    }

    tracing::info!(
        subject = user.subject_id(),
        order_id = %body.razorpay_order_id,
        "Payment verified"
    );
    Ok(Json(VerifyResponse {
        success: true,
        verified: true,
    }))
}
