// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod donation;
pub mod place;
pub mod product;
pub mod recipe;
pub mod user;

pub use donation::{Donation, DonationItem, Unit};
pub use place::{Coordinate, Place, PlaceCategory};
pub use product::{Freshness, Product};
pub use recipe::{RecipeSuggestion, SavedRecipe};
pub use user::User;
