// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Connected-wallet lookup.

use crate::db::UserStore;
use crate::error::AppError;
use async_trait::async_trait;
use std::sync::Arc;

/// Supplies the wallet a user has connected, if any.
#[async_trait]
pub trait WalletResolver: Send + Sync {
    async fn connected_wallet(&self, subject_id: &str) -> Result<Option<String>, AppError>;
}

/// Reads the wallet stored on the user record by `POST /api/user/wallet`.
#[derive(Clone)]
pub struct StoredWalletResolver {
    store: Arc<dyn UserStore>,
}

impl StoredWalletResolver {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl WalletResolver for StoredWalletResolver {
    async fn connected_wallet(&self, subject_id: &str) -> Result<Option<String>, AppError> {
        Ok(self
            .store
            .get_user(subject_id)
            .await?
            .and_then(|user| user.wallet_address)
            .filter(|address| !address.trim().is_empty()))
    }
}
