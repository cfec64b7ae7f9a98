// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! FreshTrack: food freshness tracking with donation rewards
//!
//! This crate provides the backend API for tracking scanned food items,
//! finding nearby donation sites, recording donations with a small token
//! reward, and suggesting recipes for items that are about to expire.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::UserStore;
use services::{
    AssetStore, DonationWorkflow, ExpiryEstimator, IdentityResolver, PaymentService,
    PlacesService, RecipeService, RewardPayout, StoredWalletResolver,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn UserStore>,
    pub identity: IdentityResolver,
    pub donations: DonationWorkflow,
    pub places: PlacesService,
    pub recipes: RecipeService,
    pub assets: AssetStore,
    pub payments: PaymentService,
    pub estimator: ExpiryEstimator,
}

impl AppState {
    /// Wire services from configuration around a store and a payout client.
    pub fn new(
        config: Config,
        db: Arc<dyn UserStore>,
        payout: Arc<dyn RewardPayout>,
    ) -> anyhow::Result<Self> {
        let wallets = Arc::new(StoredWalletResolver::new(db.clone()));
        let donations =
            DonationWorkflow::new(db.clone(), wallets, payout, config.reward_amount_apt);

        Ok(Self {
            identity: IdentityResolver::new(config.identity_jwt_secret.as_deref()),
            donations,
            places: PlacesService::new(config.overpass_url.clone())?,
            recipes: RecipeService::new(&config.gemini_model, config.gemini_api_key.clone())?,
            assets: AssetStore::new(
                config.cloudinary_cloud_name.clone(),
                config.cloudinary_upload_preset.clone(),
            )?,
            payments: PaymentService::new(
                config.razorpay_key_id.clone(),
                config.razorpay_key_secret.clone(),
            )?,
            estimator: ExpiryEstimator::new(config.groq_api_key.clone())?,
            db,
            config,
        })
    }
}
