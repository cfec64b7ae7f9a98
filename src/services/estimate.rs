// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shelf-life estimates from a vision model hosted on Groq.

use crate::error::AppError;
use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
const SYSTEM_PROMPT: &str = "Given the image of a Fruit, its fresh or rotten and the name of \
the fruit, estimate a range of days it will take before it expires. Only output the number of \
days or the range or say 'Already expired'.";
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Groq chat-completions client.
#[derive(Clone)]
pub struct ExpiryEstimator {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ExpiryEstimator {
    pub fn new(api_key: Option<String>) -> anyhow::Result<Self> {
        Self::with_base_url(GROQ_BASE_URL, api_key)
    }

    pub fn with_base_url(base_url: &str, api_key: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed building Groq HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Estimate how long a fruit will keep, as free text ("3-5 days").
    pub async fn estimate(
        &self,
        fruit_name: &str,
        freshness: &str,
        image: &str,
    ) -> Result<String, AppError> {
        let image_url = image_data_uri(image)?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Upstream("Expiry estimation is not configured".to_string()))?;

        let body = json!({
            "model": MODEL,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": format!("{}\n{}", freshness, fruit_name) },
                        { "type": "image_url", "image_url": { "url": image_url } }
                    ]
                }
            ],
            "temperature": 0.7,
            "max_completion_tokens": 1024,
            "top_p": 1,
            "stream": false
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Groq request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::Upstream(format!("Groq returned HTTP {}", status)));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("JSON parse error: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| AppError::Upstream("Groq returned no estimate".to_string()))
    }
}

/// Normalise an image to a data URI; bare base64 is treated as JPEG.
fn image_data_uri(image: &str) -> Result<String, AppError> {
    let image = image.trim();
    let (uri, payload) = match image.strip_prefix("data:") {
        Some(rest) => {
            let (_, payload) = rest
                .split_once(";base64,")
                .ok_or_else(|| AppError::BadRequest("Image must be base64 encoded".to_string()))?;
            (image.to_string(), payload)
        }
        None => (format!("data:image/jpeg;base64,{}", image), image),
    };

    if payload.is_empty() || STANDARD.decode(payload).is_err() {
        return Err(AppError::BadRequest("Image is not valid base64".to_string()));
    }
    Ok(uri)
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}
