// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! FreshTrack API Server
//!
//! Tracks scanned food items and their freshness, and rewards donations of
//! surplus food to nearby NGOs with a small on-chain payout.

use anyhow::Context;
use freshtrack::{
    config::Config,
    db::{FirestoreDb, MemoryDb, UserStore},
    services::AptosRewardClient,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(port = config.port, "Starting FreshTrack API");

    let db: Arc<dyn UserStore> = if std::env::var_os("USE_MEMORY_STORE").is_some() {
        tracing::warn!("Using in-memory user store; data is lost on restart");
        Arc::new(MemoryDb::new())
    } else {
        let firestore = FirestoreDb::new(&config.gcp_project_id)
            .await
            .context("Failed to connect to Firestore")?;
        Arc::new(firestore)
    };

    let payout = Arc::new(
        AptosRewardClient::from_config(&config).context("Failed to initialize Aptos client")?,
    );

    let state = Arc::new(AppState::new(config.clone(), db, payout)?);
    let app = freshtrack::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("freshtrack=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
