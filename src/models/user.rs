// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use crate::models::{Donation, Product, SavedRecipe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name stored when the identity token carries none.
pub const DEFAULT_NAME: &str = "NA";
/// Email stored when the identity token carries none.
pub const DEFAULT_EMAIL: &str = "not_provided";

/// User document stored in Firestore.
///
/// Products, donations and saved recipes are embedded so that every
/// write for a user is a single-document update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Subject claim of the identity token (document key)
    pub subject_id: String,
    pub name: String,
    pub email: String,
    /// Profile picture URL
    pub picture: Option<String>,
    /// Last wallet the user connected, used when a donation omits one
    #[serde(default)]
    pub wallet_address: Option<String>,
    /// Scanned products, in insertion order
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub donations: Vec<Donation>,
    #[serde(default)]
    pub saved_recipes: Vec<SavedRecipe>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a fresh user record from identity claims.
    pub fn from_claims(
        subject_id: &str,
        name: Option<&str>,
        email: Option<&str>,
        picture: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            name: name
                .filter(|n| !n.is_empty())
                .unwrap_or(DEFAULT_NAME)
                .to_string(),
            email: email
                .filter(|e| !e.is_empty())
                .unwrap_or(DEFAULT_EMAIL)
                .to_string(),
            picture: picture.map(str::to_string),
            wallet_address: None,
            products: Vec::new(),
            donations: Vec::new(),
            saved_recipes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
