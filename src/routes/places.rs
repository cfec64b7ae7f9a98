// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Nearby donation-site search.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::place::to_feature_collection;
use crate::models::{Coordinate, Place, PlaceCategory};
use crate::services::places::{PlaceSearch, DEFAULT_RADIUS_M, MAX_RADIUS_M};
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_VIEW: &str = "default";

/// Place routes (require authentication).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/places/nearby", get(get_nearby))
}

#[derive(Debug, Deserialize)]
struct NearbyQuery {
    lat: Option<f64>,
    lon: Option<f64>,
    /// Category toggles; all enabled unless turned off
    ngo: Option<bool>,
    oldage: Option<bool>,
    kitchen: Option<bool>,
    /// Search radius in meters
    radius: Option<u32>,
    /// UI view issuing the search; a newer search for the same view wins
    view: Option<String>,
    /// `geojson` for a FeatureCollection
    format: Option<String>,
}

impl NearbyQuery {
    fn to_search(&self) -> Result<PlaceSearch> {
        let (Some(lat), Some(lon)) = (self.lat, self.lon) else {
            return Err(AppError::BadRequest("lat and lon are required".to_string()));
        };
        let center = Coordinate::new(lat, lon)
            .ok_or_else(|| AppError::BadRequest("Coordinates out of range".to_string()))?;

        let radius_m = self.radius.unwrap_or(DEFAULT_RADIUS_M);
        if radius_m == 0 || radius_m > MAX_RADIUS_M {
            return Err(AppError::BadRequest(format!(
                "radius must be between 1 and {} meters",
                MAX_RADIUS_M
            )));
        }

        let categories = PlaceCategory::ALL
            .into_iter()
            .filter(|c| {
                let flag = match c {
                    PlaceCategory::Ngo => self.ngo,
                    PlaceCategory::OldAge => self.oldage,
                    PlaceCategory::Kitchen => self.kitchen,
                };
                flag.unwrap_or(true)
            })
            .collect();

        Ok(PlaceSearch {
            center,
            categories,
            radius_m,
        })
    }
}

#[derive(Serialize)]
pub struct NearbyResponse {
    pub success: bool,
    pub places: Vec<Place>,
}

/// Find donation sites near a coordinate, nearest first.
async fn get_nearby(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<NearbyQuery>,
) -> Result<Response> {
    let search = query.to_search()?;
    let view = query
        .view
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_VIEW);

    let ticket = state.places.begin_search(user.subject_id(), view);
    let result = state.places.search(&search, &ticket.token).await;
    state.places.finish_search(&ticket);
    let places = result?;

    let geojson = query
        .format
        .as_deref()
        .is_some_and(|f| f.eq_ignore_ascii_case("geojson"));
    if geojson {
        return Ok(Json(to_feature_collection(&places)).into_response());
    }

    Ok(Json(NearbyResponse {
        success: true,
        places,
    })
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(lat: Option<f64>, lon: Option<f64>) -> NearbyQuery {
        NearbyQuery {
            lat,
            lon,
            ngo: None,
            oldage: None,
            kitchen: None,
            radius: None,
            view: None,
            format: None,
        }
    }

    #[test]
    fn test_defaults_enable_all_categories() {
        let search = query(Some(28.6), Some(77.2)).to_search().unwrap();
        assert_eq!(search.categories.len(), 3);
        assert_eq!(search.radius_m, DEFAULT_RADIUS_M);
    }

    #[test]
    fn test_category_toggles() {
        let mut q = query(Some(28.6), Some(77.2));
        q.ngo = Some(false);
        q.kitchen = Some(false);
        let search = q.to_search().unwrap();
        assert_eq!(search.categories, vec![PlaceCategory::OldAge]);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(query(None, Some(77.2)).to_search().is_err());
        assert!(query(Some(95.0), Some(77.2)).to_search().is_err());

        let mut q = query(Some(28.6), Some(77.2));
        q.radius = Some(MAX_RADIUS_M + 1);
        assert!(q.to_search().is_err());
    }
}
