// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore, with an in-memory stand-in).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{Donation, Product, SavedRecipe, User};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
}

/// Document id for a subject. Identity subjects may contain `|` or `/`.
pub fn user_doc_id(subject_id: &str) -> String {
    urlencoding::encode(subject_id).into_owned()
}

/// Persistence port for per-user documents.
///
/// Every mutation touches exactly one user document, so per-document
/// atomicity from the backing store is all the callers rely on.
/// Mutations on a missing user fail with `AppError::NotFound`.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get a user by identity subject.
    async fn get_user(&self, subject_id: &str) -> Result<Option<User>, AppError>;

    /// Insert `user` unless a record for its subject exists.
    /// Returns the stored record either way.
    async fn create_user_if_absent(&self, user: User) -> Result<User, AppError>;

    /// Remember the wallet the user connected.
    async fn set_wallet_address(&self, subject_id: &str, address: &str) -> Result<(), AppError>;

    /// Append a scanned product.
    async fn push_product(&self, subject_id: &str, product: Product) -> Result<(), AppError>;

    /// Append a donation record.
    async fn push_donation(&self, subject_id: &str, donation: Donation) -> Result<(), AppError>;

    /// Attach a reward transaction hash to an existing donation.
    async fn set_donation_reward(
        &self,
        subject_id: &str,
        donation_id: &str,
        tx_hash: &str,
    ) -> Result<(), AppError>;

    /// Append a saved recipe.
    async fn push_recipe(&self, subject_id: &str, recipe: SavedRecipe) -> Result<(), AppError>;
}

/// Apply a reward hash to the matching donation of a loaded user.
pub(crate) fn apply_donation_reward(
    user: &mut User,
    donation_id: &str,
    tx_hash: &str,
) -> Result<(), AppError> {
    let donation = user
        .donations
        .iter_mut()
        .find(|d| d.id == donation_id)
        .ok_or_else(|| AppError::NotFound(format!("Donation {} not found", donation_id)))?;
    donation.reward_transaction_hash = Some(tx_hash.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_doc_id_escapes_separators() {
        assert_eq!(user_doc_id("google-oauth2|123"), "google-oauth2%7C123");
        assert_eq!(user_doc_id("a/b"), "a%2Fb");
        assert_eq!(user_doc_id("plain"), "plain");
    }
}
