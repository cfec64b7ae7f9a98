// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/estimate", post(estimate_expiry))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EstimateRequest {
    #[serde(default)]
    fruit_name: String,
    #[serde(default)]
    freshness: String,
    #[serde(default)]
    image: String,
}

#[derive(Serialize)]
pub struct EstimateResponse {
    pub result: String,
}

/// Estimate remaining shelf life from a photo and a freshness label.
async fn estimate_expiry(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<EstimateRequest>, JsonRejection>,
) -> Result<Json<EstimateResponse>> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    if body.fruit_name.trim().is_empty() || body.image.trim().is_empty() {
        return Err(AppError::BadRequest(
            "fruitName and image are required".to_string(),
        ));
    }

    tracing::debug!(subject = user.subject_id(), fruit = %body.fruit_name, "Estimating expiry");
    let result = state
        .estimator
        .estimate(body.fruit_name.trim(), body.freshness.trim(), &body.image)
        .await?;

    Ok(Json(EstimateResponse { result }))
}
