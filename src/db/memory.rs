// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory user store for tests and local runs without GCP.

use crate::db::{apply_donation_reward, UserStore};
use crate::error::AppError;
use crate::models::{Donation, Product, SavedRecipe, User};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// User documents held in a concurrent map, keyed by subject.
#[derive(Clone, Default)]
pub struct MemoryDb {
    users: Arc<DashMap<String, User>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Mutate one user under its shard lock.
    fn update_user<F>(&self, subject_id: &str, mutate: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut User) -> Result<(), AppError>,
    {
        let mut entry = self
            .users
            .get_mut(subject_id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", subject_id)))?;
        mutate(entry.value_mut())?;
        entry.updated_at = chrono::Utc::now();
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryDb {
    async fn get_user(&self, subject_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(subject_id).map(|u| u.value().clone()))
    }

    async fn create_user_if_absent(&self, user: User) -> Result<User, AppError> {
        let entry = self
            .users
            .entry(user.subject_id.clone())
            .or_insert(user);
        Ok(entry.value().clone())
    }

    async fn set_wallet_address(&self, subject_id: &str, address: &str) -> Result<(), AppError> {
        self.update_user(subject_id, |user| {
            user.wallet_address = Some(address.to_string());
            Ok(())
        })
    }

    async fn push_product(&self, subject_id: &str, product: Product) -> Result<(), AppError> {
        self.update_user(subject_id, |user| {
            user.products.push(product);
            Ok(())
        })
    }

    async fn push_donation(&self, subject_id: &str, donation: Donation) -> Result<(), AppError> {
        self.update_user(subject_id, |user| {
            user.donations.push(donation);
            Ok(())
        })
    }

    async fn set_donation_reward(
        &self,
        subject_id: &str,
        donation_id: &str,
        tx_hash: &str,
    ) -> Result<(), AppError> {
        self.update_user(subject_id, |user| {
            apply_donation_reward(user, donation_id, tx_hash)
        })
    }

    async fn push_recipe(&self, subject_id: &str, recipe: SavedRecipe) -> Result<(), AppError> {
        self.update_user(subject_id, |user| {
            user.saved_recipes.push(recipe);
            Ok(())
        })
    }
}
