// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scanned product model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Image stored when a scan carries none.
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/400";

/// Freshness label attached to a scan by the classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Freshness {
    Fresh,
    Rotten,
    #[default]
    Unknown,
}

impl Freshness {
    /// Parse a label leniently; anything unrecognised is `Unknown`.
    pub fn parse_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "fresh" => Freshness::Fresh,
            "rotten" => Freshness::Rotten,
            _ => Freshness::Unknown,
        }
    }
}

/// A scanned food item in a user's inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    /// Lower-cased product name
    pub product_name: String,
    /// Hosted image URL
    pub product_image: String,
    pub expiry_date: DateTime<Utc>,
    #[serde(default)]
    pub freshness: Freshness,
    /// Model confidence, advisory only (e.g. "92%")
    pub confidence: String,
    /// Snapshot taken at insert time; never re-evaluated.
    /// Use `services::freshness::classify` for the live status.
    pub is_expired: bool,
    pub added_date: DateTime<Utc>,
    pub transaction_hash: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label() {
        assert_eq!(Freshness::parse_label("Fresh"), Freshness::Fresh);
        assert_eq!(Freshness::parse_label(" rotten "), Freshness::Rotten);
        assert_eq!(Freshness::parse_label("ripe"), Freshness::Unknown);
        assert_eq!(Freshness::parse_label(""), Freshness::Unknown);
    }

    #[test]
    fn test_freshness_serializes_as_label() {
        let json = serde_json::to_string(&Freshness::Rotten).unwrap();
        assert_eq!(json, "\"Rotten\"");
    }
}
