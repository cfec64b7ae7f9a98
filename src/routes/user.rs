// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile, wallet and inventory routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Donation, Freshness, Product, SavedRecipe, User};
use crate::services::freshness::{
    self, ExpiryNotification, ExpiryStatus, InventoryFilter, InventorySummary,
};
use crate::services::reward::is_valid_address;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// User routes (require authentication).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/user/profile", get(get_profile))
        .route("/api/user/wallet", post(connect_wallet))
        .route("/api/user/save-product", post(save_product))
        .route("/api/user/inventory", get(get_inventory))
        .route("/api/user/notifications", get(get_notifications))
}

/// Load the caller's record or fail with 404.
pub(crate) async fn load_user(state: &AppState, user: &AuthUser) -> Result<User> {
    state
        .db
        .get_user(user.subject_id())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

// ─── Profile ─────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub id: String,
    pub name: String,
    pub email: String,
    pub picture: Option<String>,
    pub wallet_address: Option<String>,
    pub products: Vec<Product>,
    pub donations: Vec<Donation>,
    pub saved_recipes: Vec<SavedRecipe>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub success: bool,
    pub user_data: UserData,
}

/// Get the caller's profile, creating the record on first use.
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let identity = &user.identity;
    let stored = match state.db.get_user(&identity.subject_id).await? {
        Some(existing) => existing,
        None => {
            let fresh = User::from_claims(
                &identity.subject_id,
                identity.name.as_deref(),
                identity.email.as_deref(),
                identity.picture.as_deref(),
                Utc::now(),
            );
            state.db.create_user_if_absent(fresh).await?
        }
    };

    tracing::debug!(
        subject = %stored.subject_id,
        products = stored.products.len(),
        donations = stored.donations.len(),
        "Profile loaded"
    );

    Ok(Json(ProfileResponse {
        success: true,
        user_data: UserData {
            id: stored.subject_id,
            name: stored.name,
            email: stored.email,
            picture: stored.picture,
            wallet_address: stored.wallet_address,
            products: stored.products,
            donations: stored.donations,
            saved_recipes: stored.saved_recipes,
            created_at: stored.created_at,
        },
    }))
}

// ─── Wallet ──────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct WalletRequest {
    #[validate(length(min = 1, message = "walletAddress is required"))]
    wallet_address: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub success: bool,
    pub wallet_address: String,
}

/// Remember the wallet rewards should go to.
async fn connect_wallet(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<WalletRequest>, JsonRejection>,
) -> Result<Json<WalletResponse>> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    body.validate()?;
    let address = body.wallet_address.trim();
    if !is_valid_address(address) {
        return Err(AppError::BadRequest("Invalid wallet address".to_string()));
    }

    state
        .db
        .set_wallet_address(user.subject_id(), address)
        .await?;
    tracing::info!(subject = user.subject_id(), "Wallet connected");

    Ok(Json(WalletResponse {
        success: true,
        wallet_address: address.to_string(),
    }))
}

// ─── Products ────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct SaveProductRequest {
    #[validate(length(min = 1, message = "Product name is required"))]
    #[serde(default)]
    product_name: String,
    #[serde(default)]
    expiry_date: Option<String>,
    #[serde(default)]
    product_image: Option<String>,
    #[serde(default)]
    freshness: Option<String>,
    #[serde(default)]
    confidence: Option<String>,
    #[serde(default)]
    transaction_hash: Option<String>,
}

#[derive(Serialize)]
pub struct SaveProductResponse {
    pub success: bool,
    pub message: String,
    pub product: Product,
}

fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}

/// Save a scanned product to the caller's inventory.
async fn save_product(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<SaveProductRequest>, JsonRejection>,
) -> Result<Json<SaveProductResponse>> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let required = || AppError::BadRequest("Product name and expiry date are required".to_string());
    body.validate().map_err(|_| required())?;
    if body.product_name.trim().is_empty() {
        return Err(required());
    }
    let expiry_raw = body
        .expiry_date
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(required)?;
    let expiry_date = parse_expiry(expiry_raw)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid expiry date: {}", expiry_raw)))?;

    // 404 before doing any upload work
    load_user(&state, &user).await?;

    let product_image = state
        .assets
        .store_product_image(body.product_image.as_deref())
        .await;

    let now = Utc::now();
    let product = Product {
        id: uuid::Uuid::new_v4().to_string(),
        product_name: body.product_name.trim().to_lowercase(),
        product_image,
        expiry_date,
        freshness: body
            .freshness
            .as_deref()
            .map(Freshness::parse_label)
            .unwrap_or_default(),
        confidence: body
            .confidence
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "N/A".to_string()),
        is_expired: expiry_date < now,
        added_date: now,
        transaction_hash: body.transaction_hash.filter(|h| !h.trim().is_empty()),
    };

    state
        .db
        .push_product(user.subject_id(), product.clone())
        .await?;
    tracing::info!(
        subject = user.subject_id(),
        product = %product.product_name,
        "Product saved"
    );

    Ok(Json(SaveProductResponse {
        success: true,
        message: "Product saved successfully".to_string(),
        product,
    }))
}

// ─── Inventory ───────────────────────────────────────────────

#[derive(Deserialize)]
struct InventoryQuery {
    filter: Option<String>,
}

/// A product plus its status computed at request time.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    #[serde(flatten)]
    pub product: Product,
    pub status: ExpiryStatus,
    pub days_left: i64,
}

#[derive(Serialize)]
pub struct InventoryResponse {
    pub success: bool,
    pub products: Vec<InventoryItem>,
    pub summary: InventorySummary,
}

/// List inventory, optionally filtered, soonest expiry first.
async fn get_inventory(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<InventoryQuery>,
) -> Result<Json<InventoryResponse>> {
    let stored = load_user(&state, &user).await?;
    let now = Utc::now();
    let filter = query.filter.as_deref().and_then(InventoryFilter::parse);

    let products = freshness::filter_inventory(&stored.products, filter, now)
        .into_iter()
        .map(|p| InventoryItem {
            status: freshness::classify(p.expiry_date, now),
            days_left: freshness::days_left(p.expiry_date, now),
            product: p,
        })
        .collect();

    Ok(Json(InventoryResponse {
        success: true,
        products,
        summary: freshness::summarize(&stored.products, now),
    }))
}

// ─── Notifications ───────────────────────────────────────────

#[derive(Serialize)]
pub struct NotificationsResponse {
    pub success: bool,
    pub notifications: Vec<ExpiryNotification>,
}

/// Items expiring within three days.
async fn get_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<NotificationsResponse>> {
    let stored = load_user(&state, &user).await?;
    let notifications = freshness::expiring_soon(&stored.products, Utc::now());

    Ok(Json(NotificationsResponse {
        success: true,
        notifications,
    }))
}
