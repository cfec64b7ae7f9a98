// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod assets;
pub mod donation;
pub mod estimate;
pub mod freshness;
pub mod identity;
pub mod payment;
pub mod places;
pub mod recipes;
pub mod reward;
pub mod wallet;

pub use assets::AssetStore;
pub use donation::{DonationError, DonationReceipt, DonationRequest, DonationWorkflow, RewardOutcome};
pub use estimate::ExpiryEstimator;
pub use identity::{Identity, IdentityError, IdentityResolver};
pub use payment::PaymentService;
pub use places::{PlaceSearch, PlacesError, PlacesService};
pub use recipes::RecipeService;
pub use reward::{AptosRewardClient, PayoutError, RewardPayout};
pub use wallet::{StoredWalletResolver, WalletResolver};
