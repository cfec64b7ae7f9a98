// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Recipe models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A recipe parsed from a generated suggestion (not persisted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RecipeSuggestion {
    pub title: String,
    pub time: String,
    pub video: Option<String>,
    pub content: String,
}

/// A recipe the user chose to keep.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedRecipe {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Estimated time, free text
    pub time: String,
    pub video: Option<String>,
    pub ingredients: Vec<String>,
    pub saved_at: DateTime<Utc>,
}
