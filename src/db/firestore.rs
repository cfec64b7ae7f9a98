// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Each user is one document in `users`; products, donations and saved
//! recipes live inside it. Mutations are read-modify-write committed
//! through a Firestore transaction.

use crate::db::{apply_donation_reward, collections, user_doc_id, UserStore};
use crate::error::AppError;
use crate::models::{Donation, Product, SavedRecipe, User};
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::FirestoreConsistencySelector;

/// Commit attempts before a contended update gives up.
const MAX_TRANSACTION_ATTEMPTS: usize = 5;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client. Every operation returns a database error.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn read_user(&self, subject_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(&user_doc_id(subject_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Read a user, apply `mutate`, and commit the result in a transaction.
    ///
    /// The read goes through the transaction so a concurrent commit to the
    /// same document aborts this one; aborted attempts are retried with a
    /// fresh read, which is why `mutate` may run more than once.
    async fn update_user<F>(&self, subject_id: &str, mutate: F) -> Result<(), AppError>
    where
        F: Fn(&mut User) -> Result<(), AppError> + Send + Sync,
    {
        let client = self.get_client()?;
        let doc_id = user_doc_id(subject_id);
        let mut attempt = 1;

        loop {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
            let tx_db = client.clone_with_consistency_selector(
                FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
            );

            let read: Result<Option<User>, _> = tx_db
                .fluent()
                .select()
                .by_id_in(collections::USERS)
                .obj()
                .one(&doc_id)
                .await;
            let mut user = match read {
                Ok(Some(user)) => user,
                Ok(None) => {
                    let _ = transaction.rollback().await;
                    return Err(AppError::NotFound(format!("User {} not found", subject_id)));
                }
                Err(e) => {
                    let _ = transaction.rollback().await;
                    return Err(AppError::Database(e.to_string()));
                }
            };

            if let Err(e) = mutate(&mut user) {
                let _ = transaction.rollback().await;
                return Err(e);
            }
            user.updated_at = chrono::Utc::now();

            client
                .fluent()
                .update()
                .in_col(collections::USERS)
                .document_id(doc_id.clone())
                .object(&user)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add user to transaction: {}", e))
                })?;

            match transaction.commit().await {
                Ok(_) => return Ok(()),
                Err(e) if is_retryable(&e) && attempt < MAX_TRANSACTION_ATTEMPTS => {
                    tracing::warn!(
                        subject = subject_id,
                        attempt,
                        error = %e,
                        "User update contended, retrying"
                    );
                    attempt += 1;
                }
                Err(e) => {
                    return Err(AppError::Database(format!("Transaction commit failed: {}", e)))
                }
            }
        }
    }
}

/// Aborted (lost a conflict) and transient failures are worth another attempt.
fn is_retryable(err: &FirestoreError) -> bool {
    matches!(err, FirestoreError::DatabaseError(db_err) if db_err.retry_possible)
}

fn is_already_exists(err: &FirestoreError) -> bool {
    matches!(err, FirestoreError::DataConflictError(_))
}

#[async_trait]
impl UserStore for FirestoreDb {
    async fn get_user(&self, subject_id: &str) -> Result<Option<User>, AppError> {
        self.read_user(subject_id).await
    }

    async fn create_user_if_absent(&self, user: User) -> Result<User, AppError> {
        if let Some(existing) = self.read_user(&user.subject_id).await? {
            return Ok(existing);
        }

        let inserted: Result<User, _> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(user_doc_id(&user.subject_id))
            .object(&user)
            .execute()
            .await;

        match inserted {
            Ok(created) => {
                tracing::info!(subject = %created.subject_id, "Created user record");
                Ok(created)
            }
            // A concurrent first request created it between our read and insert
            Err(e) if is_already_exists(&e) => self
                .read_user(&user.subject_id)
                .await?
                .ok_or_else(|| AppError::Database(format!("User {} vanished", user.subject_id))),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    async fn set_wallet_address(&self, subject_id: &str, address: &str) -> Result<(), AppError> {
        let address = address.to_string();
        self.update_user(subject_id, move |user| {
            user.wallet_address = Some(address.clone());
            Ok(())
        })
        .await
    }

    async fn push_product(&self, subject_id: &str, product: Product) -> Result<(), AppError> {
        self.update_user(subject_id, move |user| {
            user.products.push(product.clone());
            Ok(())
        })
        .await
    }

    async fn push_donation(&self, subject_id: &str, donation: Donation) -> Result<(), AppError> {
        self.update_user(subject_id, move |user| {
            user.donations.push(donation.clone());
            Ok(())
        })
        .await
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
        .await
    }

    async fn push_recipe(&self, subject_id: &str, recipe: SavedRecipe) -> Result<(), AppError> {
        self.update_user(subject_id, move |user| {
            user.saved_recipes.push(recipe.clone());
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gcloud_sdk::tonic::Status;

    #[tokio::test]
    async fn test_offline_client_reports_database_error() {
        let db = FirestoreDb::new_mock();

        let err = db.get_user("civic-1").await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));

        let user = User::from_claims("civic-1", None, None, None, Utc::now());
        let err = db.create_user_if_absent(user).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[tokio::test]
    async fn test_offline_update_reports_database_error() {
        let db = FirestoreDb::new_mock();
        let err = db.set_wallet_address("civic-1", "0xabc").await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn test_aborted_commit_is_retried() {
        let aborted = FirestoreError::from(Status::aborted("transaction contention"));
        assert!(is_retryable(&aborted));

        let unavailable = FirestoreError::from(Status::unavailable("backend restarting"));
        assert!(is_retryable(&unavailable));

        let denied = FirestoreError::from(Status::permission_denied("no access"));
        assert!(!is_retryable(&denied));
    }

    #[test]
    fn test_already_exists_detected() {
        let exists = FirestoreError::from(Status::already_exists("users/civic-1"));
        assert!(is_already_exists(&exists));
        assert!(!is_retryable(&exists));

        let aborted = FirestoreError::from(Status::aborted("transaction contention"));
        assert!(!is_already_exists(&aborted));
    }
}
