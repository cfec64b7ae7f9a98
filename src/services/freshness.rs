// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Freshness and expiry classification.
//!
//! All functions are pure over `(product, now)`; nothing here is cached.
//! Day counts round up, so an item expiring in 1.2 days has 2 days left.

use crate::models::{Freshness, Product};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound (inclusive) of the Danger bucket, in days left.
pub const DANGER_DAYS: i64 = 2;
/// Upper bound (inclusive) of the Good bucket, in days left.
pub const GOOD_DAYS: i64 = 5;
/// Window of the expiring-soon filter and notification feed.
pub const EXPIRING_WINDOW_DAYS: i64 = 3;

const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Live expiry status of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryStatus {
    Expired,
    Danger,
    Good,
    Fresh,
}

/// Whole days until `expiry`, rounded up. Negative once expired.
pub fn days_left(expiry: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let secs = (expiry - now).num_seconds();
    // ceil for positive values, truncation toward zero otherwise
    if secs > 0 {
        (secs + SECS_PER_DAY - 1) / SECS_PER_DAY
    } else {
        secs / SECS_PER_DAY
    }
}

/// Classify an expiry date against `now`. The freshness label plays no part.
pub fn classify(expiry: DateTime<Utc>, now: DateTime<Utc>) -> ExpiryStatus {
    if expiry < now {
        return ExpiryStatus::Expired;
    }

    match days_left(expiry, now) {
        d if d <= DANGER_DAYS => ExpiryStatus::Danger,
        d if d <= GOOD_DAYS => ExpiryStatus::Good,
        _ => ExpiryStatus::Fresh,
    }
}

// ─── Inventory Filters ───────────────────────────────────────

/// Inventory list filter accepted by the inventory endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryFilter {
    Expired,
    Expiring,
    Fresh,
}

impl InventoryFilter {
    /// Parse a query value. Unknown values mean "no filter".
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "expired" => Some(InventoryFilter::Expired),
            "expiring" => Some(InventoryFilter::Expiring),
            "fresh" => Some(InventoryFilter::Fresh),
            _ => None,
        }
    }

    pub fn matches(self, product: &Product, now: DateTime<Utc>) -> bool {
        match self {
            InventoryFilter::Expired => is_expired(product, now),
            InventoryFilter::Expiring => is_expiring_soon(product, now),
            InventoryFilter::Fresh => {
                product.expiry_date > now && product.freshness == Freshness::Fresh
            }
        }
    }
}

fn is_expired(product: &Product, now: DateTime<Utc>) -> bool {
    product.expiry_date < now
}

fn is_expiring_soon(product: &Product, now: DateTime<Utc>) -> bool {
    product.expiry_date >= now
        && product.expiry_date <= now + Duration::days(EXPIRING_WINDOW_DAYS)
}

/// Counts shown next to the inventory list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InventorySummary {
    pub total: usize,
    pub expired: usize,
    pub expiring: usize,
    pub fresh: usize,
}

pub fn summarize(products: &[Product], now: DateTime<Utc>) -> InventorySummary {
    let count = |filter: InventoryFilter| products.iter().filter(|p| filter.matches(p, now)).count();
    InventorySummary {
        total: products.len(),
        expired: count(InventoryFilter::Expired),
        expiring: count(InventoryFilter::Expiring),
        fresh: count(InventoryFilter::Fresh),
    }
}

/// Apply an optional filter and sort by expiry date, soonest first.
pub fn filter_inventory(
    products: &[Product],
    filter: Option<InventoryFilter>,
    now: DateTime<Utc>,
) -> Vec<Product> {
    let mut selected: Vec<Product> = products
        .iter()
        .filter(|p| filter.map_or(true, |f| f.matches(p, now)))
        .cloned()
        .collect();
    selected.sort_by_key(|p| p.expiry_date);
    selected
}

// ─── Expiring-Soon Feed ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Critical,
    Warning,
    Notice,
}

/// One entry of the expiring-soon notification feed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryNotification {
    pub product_id: String,
    pub name: String,
    pub image: String,
    pub expiry_date: DateTime<Utc>,
    pub days_left: i64,
    pub status: ExpiryStatus,
    pub urgency: Urgency,
}

/// Items expiring within the next three days, soonest first.
pub fn expiring_soon(products: &[Product], now: DateTime<Utc>) -> Vec<ExpiryNotification> {
    let horizon = now + Duration::days(EXPIRING_WINDOW_DAYS);
    let mut feed: Vec<ExpiryNotification> = products
        .iter()
        .filter(|p| p.expiry_date > now && p.expiry_date <= horizon)
        .map(|p| {
            let days = days_left(p.expiry_date, now);
            let urgency = match days {
                d if d <= 1 => Urgency::Critical,
                2 => Urgency::Warning,
                _ => Urgency::Notice,
            };
            ExpiryNotification {
                product_id: p.id.clone(),
                name: p.product_name.clone(),
                image: p.product_image.clone(),
                expiry_date: p.expiry_date,
                days_left: days,
                status: classify(p.expiry_date, now),
                urgency,
            }
        })
        .collect();

    feed.sort_by(|a, b| {
        a.days_left
            .cmp(&b.days_left)
            .then_with(|| a.expiry_date.cmp(&b.expiry_date))
    });
    feed
}
