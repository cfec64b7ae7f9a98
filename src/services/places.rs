// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Nearby donation-site lookup via the Overpass API.
//!
//! Handles:
//! - One Overpass query per enabled category, run concurrently
//! - Merge + dedupe by element id
//! - Category classification (old-age, then kitchen, then NGO)
//! - Haversine distance and ascending sort
//! - Cancellation of superseded searches

use crate::models::{Coordinate, Place, PlaceCategory};
use anyhow::Context;
use dashmap::DashMap;
use futures_util::future::try_join_all;
use geo::{Distance, Haversine};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default search radius in meters.
pub const DEFAULT_RADIUS_M: u32 = 15_000;
/// Largest radius a caller may request.
pub const MAX_RADIUS_M: u32 = 50_000;
const OVERPASS_TIMEOUT: Duration = Duration::from_secs(35);
const UNNAMED: &str = "Unnamed Location";

const OLD_AGE_NAME_HINTS: [&str; 4] = ["old age", "elderly", "senior citizen", "वृद्धाश्रम"];
const KITCHEN_NAME_HINTS: [&str; 6] = [
    "bhandar",
    "भंडार",
    "langar",
    "लंगर",
    "community kitchen",
    "food distribution",
];

/// Parameters of one nearby search.
#[derive(Debug, Clone)]
pub struct PlaceSearch {
    pub center: Coordinate,
    pub categories: Vec<PlaceCategory>,
    pub radius_m: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum PlacesError {
    #[error("search was superseded by a newer request")]
    Cancelled,

    #[error("Overpass request failed: {0}")]
    Upstream(String),
}

impl From<PlacesError> for crate::error::AppError {
    fn from(err: PlacesError) -> Self {
        match err {
            PlacesError::Cancelled => crate::error::AppError::Conflict(err.to_string()),
            PlacesError::Upstream(msg) => crate::error::AppError::Upstream(msg),
        }
    }
}

/// Handle for one registered search.
#[derive(Debug, Clone)]
pub struct SearchTicket {
    key: String,
    generation: u64,
    pub token: CancellationToken,
}

/// Overpass client plus the registry of in-flight searches.
#[derive(Clone)]
pub struct PlacesService {
    http: reqwest::Client,
    overpass_url: String,
    /// In-flight search per `(subject, view)` key.
    in_flight: Arc<DashMap<String, (u64, CancellationToken)>>,
    next_generation: Arc<AtomicU64>,
}

impl PlacesService {
    pub fn new(overpass_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(OVERPASS_TIMEOUT)
            .build()
            .context("failed building Overpass HTTP client")?;
        Ok(Self {
            http,
            overpass_url: overpass_url.into(),
            in_flight: Arc::new(DashMap::new()),
            next_generation: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Register a new search for `(subject, view)`, cancelling any older one.
    pub fn begin_search(&self, subject_id: &str, view: &str) -> SearchTicket {
        let key = format!("{}\u{1f}{}", subject_id, view);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        if let Some((_, previous)) = self
            .in_flight
            .insert(key.clone(), (generation, token.clone()))
        {
            tracing::debug!(subject = subject_id, view, "Cancelling superseded place search");
            previous.cancel();
        }

        SearchTicket {
            key,
            generation,
            token,
        }
    }

    /// Drop the registry entry if it still belongs to `ticket`.
    pub fn finish_search(&self, ticket: &SearchTicket) {
        self.in_flight
            .remove_if(&ticket.key, |_, (generation, _)| *generation == ticket.generation);
    }

    /// Number of searches currently registered.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Run a search. Results of a cancelled search are discarded.
    pub async fn search(
        &self,
        search: &PlaceSearch,
        cancel: &CancellationToken,
    ) -> Result<Vec<Place>, PlacesError> {
        if search.categories.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            lat = search.center.lat,
            lon = search.center.lon,
            categories = ?search.categories,
            radius_m = search.radius_m,
            "Searching nearby places"
        );

        let queries = search
            .categories
            .iter()
            .map(|c| self.run_query(build_query(*c, search.center, search.radius_m)));

        let responses = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PlacesError::Cancelled),
            res = try_join_all(queries) => res?,
        };

        if cancel.is_cancelled() {
            return Err(PlacesError::Cancelled);
        }

        let elements = responses.into_iter().flat_map(|r| r.elements);
        let places = collect_places(elements, search.center);
        tracing::debug!(count = places.len(), "Nearby places resolved");
        Ok(places)
    }

    async fn run_query(&self, query: String) -> Result<OverpassResponse, PlacesError> {
        let response = self
            .http
            .post(&self.overpass_url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(query)
            .send()
            .await
            .map_err(|e| PlacesError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(PlacesError::Upstream(format!("HTTP {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| PlacesError::Upstream(format!("JSON parse error: {}", e)))
    }
}

/// Overpass QL body for one category.
pub fn build_query(category: PlaceCategory, center: Coordinate, radius_m: u32) -> String {
    let around = format!("(around:{},{},{})", radius_m, center.lat, center.lon);
    let selectors: &[&str] = match category {
        PlaceCategory::Ngo => &[
            r#"node["office"="ngo"]"#,
            r#"node["office"="charity"]"#,
            r#"node["office"="non_profit"]"#,
            r#"node["amenity"="social_facility"]["social_facility"="outreach"]"#,
            r#"way["office"="ngo"]"#,
            r#"way["office"="charity"]"#,
            r#"relation["office"="ngo"]"#,
        ],
        PlaceCategory::OldAge => &[
            r#"node["amenity"="social_facility"]["social_facility"="senior"]"#,
            r#"node["amenity"="nursing_home"]"#,
            r#"node["healthcare"="residential_care"]"#,
            r#"node["name"~"old age|elderly|senior citizen|वृद्धाश्रम",i]"#,
            r#"way["amenity"="social_facility"]["social_facility"="senior"]"#,
            r#"way["amenity"="nursing_home"]"#,
        ],
        PlaceCategory::Kitchen => &[
            r#"node["amenity"="community_centre"]["community_centre"="food_bank"]"#,
            r#"node["amenity"="social_facility"]["social_facility"="food_bank"]"#,
            r#"node["name"~"bhandar|भंडार|langar|लंगर|community kitchen|food distribution",i]"#,
            r#"node["amenity"="place_of_worship"]["cuisine"]"#,
            r#"way["name"~"bhandar|भंडार|langar|लंगर",i]"#,
        ],
    };

    let body: String = selectors
        .iter()
        .map(|s| format!("  {}{};\n", s, around))
        .collect();
    format!("[out:json][timeout:30];\n(\n{});\nout center;\n", body)
}

// ─── Overpass Response ───────────────────────────────────────

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    id: u64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

impl OverpassElement {
    /// Node position, or the computed center of a way/relation.
    fn position(&self) -> Option<Coordinate> {
        match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lon), _) => Coordinate::new(lat, lon),
            (_, _, Some(c)) => Coordinate::new(c.lat, c.lon),
            _ => None,
        }
    }

    fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    fn tag_is(&self, key: &str, value: &str) -> bool {
        self.tag(key) == Some(value)
    }
}

/// Classify by fixed priority: old-age, then kitchen, then NGO.
fn classify_element(element: &OverpassElement, name: &str) -> PlaceCategory {
    let name = name.to_lowercase();
    let social = element.tag("social_facility");
    let is_social_facility = element.tag_is("amenity", "social_facility");

    let old_age = (is_social_facility && social == Some("senior"))
        || element.tag_is("amenity", "nursing_home")
        || element.tag_is("healthcare", "residential_care")
        || OLD_AGE_NAME_HINTS.iter().any(|h| name.contains(h));
    if old_age {
        return PlaceCategory::OldAge;
    }

    let kitchen = KITCHEN_NAME_HINTS.iter().any(|h| name.contains(h))
        || (is_social_facility && social == Some("food_bank"))
        || (element.tag_is("amenity", "community_centre")
            && element.tag_is("community_centre", "food_bank"));
    if kitchen {
        return PlaceCategory::Kitchen;
    }

    PlaceCategory::Ngo
}

/// Great-circle distance in kilometers, rounded to 2 decimals.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let meters = Haversine.distance(a.to_point(), b.to_point());
    (meters / 10.0).round() / 100.0
}

fn collect_places(
    elements: impl IntoIterator<Item = OverpassElement>,
    center: Coordinate,
) -> Vec<Place> {
    let mut seen = HashSet::new();
    let mut places: Vec<Place> = elements
        .into_iter()
        .filter(|el| seen.insert(el.id))
        .filter_map(|el| {
            let position = el.position()?;
            let name = el.tag("name").unwrap_or(UNNAMED).to_string();
            let category = classify_element(&el, &name);
            let address = el.tag("addr:full").or_else(|| el.tag("addr:street"));
            Some(Place {
                id: el.id,
                category,
                lat: position.lat,
                lon: position.lon,
                address: address.map(str::to_string),
                phone: el.tag("phone").map(str::to_string),
                website: el.tag("website").map(str::to_string),
                description: el.tag("description").map(str::to_string),
                distance_km: distance_km(center, position),
                name,
            })
        })
        .collect();

    places.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    places
}
