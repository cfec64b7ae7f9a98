// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Donation site model and map rendering.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting values outside WGS84 bounds.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        valid.then_some(Self { lat, lon })
    }

    pub fn to_point(self) -> geo::Point<f64> {
        geo::Point::new(self.lon, self.lat)
    }
}

/// Kind of donation site. Declaration order is the classification priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum PlaceCategory {
    /// Old-age / senior care homes
    OldAge,
    /// Community kitchens, food banks, langars
    Kitchen,
    Ngo,
}

impl PlaceCategory {
    pub const ALL: [PlaceCategory; 3] = [
        PlaceCategory::OldAge,
        PlaceCategory::Kitchen,
        PlaceCategory::Ngo,
    ];
}

impl fmt::Display for PlaceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlaceCategory::OldAge => "oldage",
            PlaceCategory::Kitchen => "kitchen",
            PlaceCategory::Ngo => "ngo",
        };
        f.write_str(s)
    }
}

/// A candidate donation site near the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Place {
    /// Map-data element id
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub category: PlaceCategory,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    /// Great-circle distance from the query point, 2 decimals
    pub distance_km: f64,
}

impl Place {
    fn to_feature(&self) -> Feature {
        let mut properties = JsonObject::new();
        properties.insert("id".to_string(), self.id.into());
        properties.insert("name".to_string(), self.name.clone().into());
        properties.insert("category".to_string(), self.category.to_string().into());
        properties.insert("distance_km".to_string(), self.distance_km.into());
        for (key, value) in [
            ("address", &self.address),
            ("phone", &self.phone),
            ("website", &self.website),
        ] {
            if let Some(v) = value {
                properties.insert(key.to_string(), v.clone().into());
            }
        }

        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(vec![self.lon, self.lat]))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// Render places as a GeoJSON FeatureCollection for map display.
pub fn to_feature_collection(places: &[Place]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: places.iter().map(Place::to_feature).collect(),
        foreign_members: None,
    }
}
