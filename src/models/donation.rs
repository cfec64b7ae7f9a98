// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Donation records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit a donated quantity is measured in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Kg,
    G,
    Pieces,
    Liters,
}

impl Unit {
    /// Parse one of the four allowed unit names.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "kg" => Some(Unit::Kg),
            "g" => Some(Unit::G),
            "pieces" => Some(Unit::Pieces),
            "liters" => Some(Unit::Liters),
            _ => None,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::Kg => "kg",
            Unit::G => "g",
            Unit::Pieces => "pieces",
            Unit::Liters => "liters",
        };
        f.write_str(s)
    }
}

/// A single donated item. `quantity` is always positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationItem {
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
}

/// A donation to an externally sourced organisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: String,
    /// Map-data element id of the receiving organisation (not validated)
    pub ngo_id: String,
    pub items: Vec<DonationItem>,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// `None` when the payout failed or was never attempted
    pub reward_transaction_hash: Option<String>,
}
