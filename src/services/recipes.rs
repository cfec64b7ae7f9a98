// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Recipe suggestions from the Gemini generative API.
//!
//! The model answers in loosely structured text; [`parse_recipes`] turns it
//! into records, dropping any preamble that is not a recipe.

use crate::error::AppError;
use crate::models::{RecipeSuggestion, SavedRecipe};
use anyhow::Context;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_TITLE: &str = "Indian Recipe";
const DEFAULT_TIME: &str = "Unknown";
const YOUTUBE_WATCH_PREFIX: &str = "https://www.youtube.com/watch?v=";
/// Number of saved recipes returned by the "recent" view.
pub const RECENT_RECIPES: usize = 3;

/// Gemini client for recipe suggestions.
#[derive(Clone)]
pub struct RecipeService {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl RecipeService {
    pub fn new(model: &str, api_key: Option<String>) -> anyhow::Result<Self> {
        Self::with_base_url(GEMINI_BASE_URL, model, api_key)
    }

    pub fn with_base_url(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed building Gemini HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    /// Ask the model for recipes using only `ingredients`.
    pub async fn suggest(&self, ingredients: &[String]) -> Result<Vec<RecipeSuggestion>, AppError> {
        if ingredients.is_empty() {
            return Err(AppError::BadRequest(
                "Please select at least one item".to_string(),
            ));
        }
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Upstream("Recipe generation is not configured".to_string()))?;

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(ingredients) }] }]
        });

        let response = self
            .http
            .post(url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::Upstream(format!("Gemini returned HTTP {}", status)));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("JSON parse error: {}", e)))?;

        let recipes = parse_recipes(&parsed.text());
        tracing::debug!(
            ingredients = ingredients.len(),
            recipes = recipes.len(),
            "Recipe suggestions generated"
        );
        Ok(recipes)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default()
    }
}

pub fn build_prompt(ingredients: &[String]) -> String {
    format!(
        "Give me 3 simple Indian recipes I can make using only these ingredients: {}. \
Include the following fields for each recipe: Title, Ingredients, Steps, Estimated Time, \
and a valid YouTube video link. Format them clearly as:
Title: ...
Ingredients:
- ...
Steps:
1. ...
Time: ...
YouTube: https://www.youtube.com/watch?v=...
Separate each recipe with two new lines.",
        ingredients.join(", ")
    )
}

// ─── Response Parsing ────────────────────────────────────────

/// Split model output into recipes.
///
/// Blocks start at each `Title:` (case-insensitive, followed by
/// whitespace). Blocks with neither `Ingredients:` nor `Steps:` are skipped.
pub fn parse_recipes(text: &str) -> Vec<RecipeSuggestion> {
    split_blocks(text)
        .into_iter()
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .filter_map(parse_block)
        .collect()
}

fn split_blocks(text: &str) -> Vec<&str> {
    let lower = text.to_ascii_lowercase();
    let mut starts: Vec<usize> = lower
        .match_indices("title:")
        .map(|(i, _)| i)
        .filter(|&i| {
            text[i + "title:".len()..]
                .chars()
                .next()
                .is_some_and(char::is_whitespace)
        })
        .collect();
    if starts.first() != Some(&0) {
        starts.insert(0, 0);
    }

    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(text.len());
            &text[start..end]
        })
        .collect()
}

fn parse_block(block: &str) -> Option<RecipeSuggestion> {
    let lower = block.to_ascii_lowercase();
    if !lower.contains("ingredients:") && !lower.contains("steps:") {
        return None;
    }

    let title = labeled_line(block, "title:");
    let time = labeled_line(block, "time:");
    let video = youtube_link(block);

    let mut content = block.to_string();
    for (matched, _) in [&title, &time, &video].into_iter().flatten() {
        content = content.replacen(matched.as_str(), "", 1);
    }

    let value_or = |found: &Option<(String, String)>, default: &str| {
        found
            .as_ref()
            .map(|(_, v)| v.clone())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string())
    };

    Some(RecipeSuggestion {
        title: value_or(&title, DEFAULT_TITLE),
        time: value_or(&time, DEFAULT_TIME),
        video: video.map(|(_, url)| url),
        content: content.trim().to_string(),
    })
}

/// First `label` (case-insensitive): returns the matched text from the
/// label through the end of its value line, and the value itself.
fn labeled_line(block: &str, label: &str) -> Option<(String, String)> {
    let start = block.to_ascii_lowercase().find(label)?;
    let after_label = start + label.len();
    let rest = &block[after_label..];
    let value_start = after_label + (rest.len() - rest.trim_start().len());
    let value_end = block[value_start..]
        .find('\n')
        .map_or(block.len(), |i| value_start + i);

    Some((
        block[start..value_end].to_string(),
        block[value_start..value_end].trim_end_matches('\r').to_string(),
    ))
}

/// `YouTube: https://www.youtube.com/watch?v=<id>`, matched text and URL.
fn youtube_link(block: &str) -> Option<(String, String)> {
    let lower = block.to_ascii_lowercase();
    lower.match_indices("youtube:").find_map(|(start, label)| {
        let after_label = start + label.len();
        let rest = &block[after_label..];
        let url_start = after_label + (rest.len() - rest.trim_start().len());

        let prefix_end = url_start + YOUTUBE_WATCH_PREFIX.len();
        if lower.get(url_start..prefix_end)? != YOUTUBE_WATCH_PREFIX {
            return None;
        }
        let id_len = block[prefix_end..]
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'-')
            .count();
        if id_len == 0 {
            return None;
        }

        let end = prefix_end + id_len;
        Some((
            block[start..end].to_string(),
            block[url_start..end].to_string(),
        ))
    })
}

/// The `limit` most recently saved recipes, newest first.
pub fn recent(recipes: &[SavedRecipe], limit: usize) -> Vec<SavedRecipe> {
    recipes.iter().rev().take(limit).cloned().collect()
}

/// All saved recipes, newest first.
pub fn newest_first(recipes: &[SavedRecipe]) -> Vec<SavedRecipe> {
    let mut all: Vec<SavedRecipe> = recipes.iter().rev().cloned().collect();
    all.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use httpmock::prelude::*;

    const SAMPLE: &str = "Sure! Here are three recipes.

Title: Aloo Jeera
Ingredients:
- potatoes
- cumin
Steps:
1. Boil potatoes.
2. Temper cumin.
Time: 20 minutes
YouTube: https://www.youtube.com/watch?v=abc_DEF-123

Title: Tomato Rice
Ingredients:
- rice
- tomatoes
Steps:
1. Cook rice.
Time: 30 mins
YouTube: https://youtu.be/xyz

title: Plain Note
Nothing to cook here.";

    #[test]
    fn test_parse_recipes() {
        let recipes = parse_recipes(SAMPLE);

        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes[0].title, "Aloo Jeera");
        assert_eq!(recipes[0].time, "20 minutes");
        assert_eq!(
            recipes[0].video.as_deref(),
            Some("https://www.youtube.com/watch?v=abc_DEF-123")
        );
        assert!(recipes[0].content.starts_with("Ingredients:"));
        assert!(!recipes[0].content.contains("Title:"));
        assert!(!recipes[0].content.contains("YouTube:"));

        assert_eq!(recipes[1].title, "Tomato Rice");
        assert_eq!(recipes[1].video, None);
        // Unmatched link stays in the content
        assert!(recipes[1].content.contains("youtu.be"));
    }

    #[test]
    fn test_defaults_when_fields_missing() {
        let recipes = parse_recipes("Ingredients:\n- eggs\nSteps:\n1. Fry.");

        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].title, DEFAULT_TITLE);
        assert_eq!(recipes[0].time, DEFAULT_TIME);
        assert_eq!(recipes[0].content, "Ingredients:\n- eggs\nSteps:\n1. Fry.");
    }

    #[test]
    fn test_non_recipe_text_is_empty() {
        assert!(parse_recipes("I cannot help with that.").is_empty());
        assert!(parse_recipes("").is_empty());
    }

    #[test]
    fn test_prompt_lists_ingredients() {
        let prompt = build_prompt(&["rice".to_string(), "dal".to_string()]);
        assert!(prompt.starts_with(
            "Give me 3 simple Indian recipes I can make using only these ingredients: rice, dal."
        ));
        assert!(prompt.contains("YouTube: https://www.youtube.com/watch?v=..."));
    }

    #[test]
    fn test_recent_and_newest_first() {
        let now = Utc::now();
        let saved: Vec<SavedRecipe> = (0..5)
            .map(|i| SavedRecipe {
                id: format!("r{}", i),
                title: format!("Recipe {}", i),
                content: String::new(),
                time: "10 mins".to_string(),
                video: None,
                ingredients: vec![],
                saved_at: now + ChronoDuration::minutes(i),
            })
            .collect();

        let ids: Vec<_> = recent(&saved, RECENT_RECIPES).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["r4", "r3", "r2"]);

        let all: Vec<_> = newest_first(&saved).into_iter().map(|r| r.id).collect();
        assert_eq!(all, vec!["r4", "r3", "r2", "r1", "r0"]);
    }

    #[tokio::test]
    async fn test_suggest_calls_gemini() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/gemini-test:generateContent")
                    .query_param("key", "k");
                then.status(200).json_body(json!({
                    "candidates": [{"content": {"parts": [{"text": SAMPLE}]}}]
                }));
            })
            .await;

        let service =
            RecipeService::with_base_url(&server.base_url(), "gemini-test", Some("k".into()))
                .unwrap();
        let recipes = service.suggest(&["potatoes".to_string()]).await.unwrap();

        mock.assert_async().await;
        assert_eq!(recipes.len(), 2);
    }

    #[tokio::test]
    async fn test_suggest_requires_items_and_key() {
        let service = RecipeService::new("gemini-test", None).unwrap();

        let err = service.suggest(&[]).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = service.suggest(&["rice".to_string()]).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
