// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Cloud Run injects secrets as environment variables, so everything is read
//! once at startup and kept in memory.

use std::env;

/// Default Overpass interpreter endpoint.
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
/// Aptos testnet fullnode REST endpoint.
pub const DEFAULT_APTOS_NODE_URL: &str = "https://fullnode.testnet.aptoslabs.com/v1";
/// Default reward per donation, in APT.
pub const DEFAULT_REWARD_AMOUNT_APT: f64 = 0.01;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Overpass API interpreter URL
    pub overpass_url: String,
    /// Aptos fullnode REST base URL
    pub aptos_node_url: String,
    /// Account that pays out donation rewards
    pub reward_sender_address: Option<String>,
    /// Reward per donation, in APT
    pub reward_amount_apt: f64,
    /// Gemini model used for recipe suggestions
    pub gemini_model: String,
    /// Cloudinary cloud name for product images
    pub cloudinary_cloud_name: Option<String>,
    /// Unsigned upload preset for product images
    pub cloudinary_upload_preset: Option<String>,
    /// Razorpay public key id
    pub razorpay_key_id: Option<String>,

    // --- Secrets ---
    /// HS256 key used to verify identity tokens. `None` means decode-only.
    pub identity_jwt_secret: Option<Vec<u8>>,
    /// Hex-encoded Ed25519 seed of the reward sender
    pub reward_sender_private_key: Option<String>,
    /// Gemini API key
    pub gemini_api_key: Option<String>,
    /// Groq API key (expiry estimation)
    pub groq_api_key: Option<String>,
    /// Razorpay key secret (order creation and signature checks)
    pub razorpay_key_secret: Option<String>,
}

impl Config {
    /// Config for tests: verified identity tokens, no external credentials.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
            aptos_node_url: DEFAULT_APTOS_NODE_URL.to_string(),
            reward_sender_address: None,
            reward_amount_apt: DEFAULT_REWARD_AMOUNT_APT,
            gemini_model: "gemini-2.0-flash".to_string(),
            cloudinary_cloud_name: None,
            cloudinary_upload_preset: None,
            razorpay_key_id: Some("rzp_test_key".to_string()),
            identity_jwt_secret: Some(b"test_jwt_key_32_bytes_minimum!!".to_vec()),
            reward_sender_private_key: None,
            gemini_api_key: None,
            groq_api_key: None,
            razorpay_key_secret: Some("test_razorpay_secret".to_string()),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honoured for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let reward_amount_apt = match env::var("REWARD_AMOUNT_APT") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v > 0.0)
                .ok_or(ConfigError::Invalid("REWARD_AMOUNT_APT"))?,
            Err(_) => DEFAULT_REWARD_AMOUNT_APT,
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .unwrap_or(4000),
            overpass_url: env::var("OVERPASS_URL")
                .unwrap_or_else(|_| DEFAULT_OVERPASS_URL.to_string()),
            aptos_node_url: env::var("APTOS_NODE_URL")
                .unwrap_or_else(|_| DEFAULT_APTOS_NODE_URL.to_string()),
            reward_sender_address: optional_var("APTOS_REWARD_SENDER_ADDRESS"),
            reward_amount_apt,
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            cloudinary_cloud_name: optional_var("CLOUDINARY_CLOUD_NAME"),
            cloudinary_upload_preset: optional_var("CLOUDINARY_UPLOAD_PRESET"),
            razorpay_key_id: optional_var("RAZORPAY_KEY_ID"),

            identity_jwt_secret: optional_var("IDENTITY_JWT_SECRET").map(String::into_bytes),
            reward_sender_private_key: optional_var("APTOS_REWARD_SENDER_PRIVATE_KEY"),
            gemini_api_key: optional_var("GEMINI_API_KEY"),
            groq_api_key: optional_var("GROQ_API_KEY"),
            razorpay_key_secret: optional_var("RAZORPAY_KEY_SECRET"),
        })
    }
}

/// Read a variable, treating unset and blank the same.
fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
