// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Product image hosting on Cloudinary.

use crate::models::product::PLACEHOLDER_IMAGE;
use anyhow::Context;
use serde::Deserialize;
use std::time::Duration;

const CLOUDINARY_BASE_URL: &str = "https://api.cloudinary.com/v1_1";
const UPLOAD_FOLDER: &str = "food-inventory";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
struct CloudinaryTarget {
    cloud_name: String,
    upload_preset: String,
}

/// Uploads inline image payloads and returns hosted URLs.
#[derive(Clone)]
pub struct AssetStore {
    http: reqwest::Client,
    base_url: String,
    target: Option<CloudinaryTarget>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl AssetStore {
    /// `None` for either setting disables uploads; payloads are then kept inline.
    pub fn new(cloud_name: Option<String>, upload_preset: Option<String>) -> anyhow::Result<Self> {
        Self::with_base_url(CLOUDINARY_BASE_URL, cloud_name, upload_preset)
    }

    pub fn with_base_url(
        base_url: &str,
        cloud_name: Option<String>,
        upload_preset: Option<String>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed building Cloudinary HTTP client")?;

        let target = match (cloud_name, upload_preset) {
            (Some(cloud_name), Some(upload_preset)) => Some(CloudinaryTarget {
                cloud_name,
                upload_preset,
            }),
            _ => None,
        };

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            target,
        })
    }

    /// Resolve the image to store with a product.
    ///
    /// Empty input gets the placeholder. `data:image` payloads are uploaded;
    /// on upload failure the payload itself is kept. Anything else is
    /// assumed to already be a URL.
    pub async fn store_product_image(&self, image: Option<&str>) -> String {
        let Some(image) = image.map(str::trim).filter(|i| !i.is_empty()) else {
            return PLACEHOLDER_IMAGE.to_string();
        };
        if !image.starts_with("data:image") {
            return image.to_string();
        }

        match self.upload(image).await {
            Ok(url) => {
                tracing::info!(url = %url, "Product image uploaded");
                url
            }
            Err(e) => {
                tracing::warn!(error = %e, "Image upload failed (keeping inline payload)");
                image.to_string()
            }
        }
    }

    async fn upload(&self, data_uri: &str) -> anyhow::Result<String> {
        let target = self
            .target
            .as_ref()
            .context("image uploads are not configured")?;

        let response = self
            .http
            .post(format!("{}/{}/image/upload", self.base_url, target.cloud_name))
            .form(&[
                ("file", data_uri),
                ("upload_preset", target.upload_preset.as_str()),
                ("folder", UPLOAD_FOLDER),
            ])
            .send()
            .await
            .context("upload request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("upload returned HTTP {}", response.status());
        }

        let body: UploadResponse = response.json().await.context("bad upload response")?;
        Ok(body.secure_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    const PAYLOAD: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[tokio::test]
    async fn test_passthrough_and_placeholder() {
        let store = AssetStore::new(None, None).unwrap();

        assert_eq!(store.store_product_image(None).await, PLACEHOLDER_IMAGE);
        assert_eq!(store.store_product_image(Some("  ")).await, PLACEHOLDER_IMAGE);
        assert_eq!(
            store.store_product_image(Some("https://cdn/x.png")).await,
            "https://cdn/x.png"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_keeps_payload() {
        let store = AssetStore::new(None, None).unwrap();
        assert_eq!(store.store_product_image(Some(PAYLOAD)).await, PAYLOAD);
    }

    #[tokio::test]
    async fn test_upload_returns_secure_url() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/demo/image/upload")
                    .body_includes("upload_preset=unsigned")
                    .body_includes("folder=food-inventory");
                then.status(200)
                    .json_body(json!({"secure_url": "https://res.cloudinary.com/demo/a.png"}));
            })
            .await;

        let store = AssetStore::with_base_url(
            &server.base_url(),
            Some("demo".to_string()),
            Some("unsigned".to_string()),
        )
        .unwrap();

        let url = store.store_product_image(Some(PAYLOAD)).await;
        mock.assert_async().await;
        assert_eq!(url, "https://res.cloudinary.com/demo/a.png");
    }

    #[tokio::test]
    async fn test_upload_failure_keeps_payload() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(500);
            })
            .await;

        let store = AssetStore::with_base_url(
            &server.base_url(),
            Some("demo".to_string()),
            Some("unsigned".to_string()),
        )
        .unwrap();

        assert_eq!(store.store_product_image(Some(PAYLOAD)).await, PAYLOAD);
    }
}
