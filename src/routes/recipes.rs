// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Recipe suggestion and saved-recipe routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{RecipeSuggestion, SavedRecipe};
use crate::routes::user::load_user;
use crate::services::recipes::{self, RECENT_RECIPES};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Recipe routes (require authentication).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/recipes/suggest", post(suggest_recipes))
        .route("/api/recipes/save", post(save_recipe))
        .route("/api/recipes/recent", get(get_recent_recipes))
        .route("/api/recipes", get(list_recipes))
        .route("/api/recipes/{id}", get(get_recipe))
}

// ─── Suggestions ─────────────────────────────────────────────

#[derive(Deserialize, Validate)]
struct SuggestRequest {
    #[validate(length(min = 1, message = "Please select at least one item"))]
    items: Vec<String>,
}

#[derive(Serialize)]
pub struct SuggestResponse {
    pub success: bool,
    pub recipes: Vec<RecipeSuggestion>,
}

/// Ask the model for recipes using the selected items.
async fn suggest_recipes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<SuggestRequest>, JsonRejection>,
) -> Result<Json<SuggestResponse>> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    body.validate()?;
    let items: Vec<String> = body
        .items
        .iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect();

    tracing::debug!(subject = user.subject_id(), items = items.len(), "Suggesting recipes");
    let recipes = state.recipes.suggest(&items).await?;

    Ok(Json(SuggestResponse {
        success: true,
        recipes,
    }))
}

// ─── Saved Recipes ───────────────────────────────────────────

#[derive(Deserialize)]
struct SaveRecipeRequest {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    time: String,
    #[serde(default)]
    video: Option<String>,
    ingredients: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct SaveRecipeResponse {
    pub success: bool,
    pub message: String,
    pub recipe: SavedRecipe,
}

#[derive(Serialize)]
pub struct RecipesResponse {
    pub success: bool,
    pub recipes: Vec<SavedRecipe>,
}

#[derive(Serialize)]
pub struct RecipeResponse {
    pub success: bool,
    pub recipe: SavedRecipe,
}

/// Save a suggested recipe.
async fn save_recipe(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<SaveRecipeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SaveRecipeResponse>)> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let complete = [&body.title, &body.content, &body.time]
        .iter()
        .all(|f| !f.trim().is_empty());
    let (true, Some(ingredients)) = (complete, body.ingredients) else {
        return Err(AppError::BadRequest("Missing required recipe data".to_string()));
    };

    let recipe = SavedRecipe {
        id: uuid::Uuid::new_v4().to_string(),
        title: body.title,
        content: body.content,
        time: body.time,
        video: body.video.filter(|v| !v.trim().is_empty()),
        ingredients,
        saved_at: Utc::now(),
    };

    state
        .db
        .push_recipe(user.subject_id(), recipe.clone())
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::NotFound("User not found".to_string()),
            other => other,
        })?;
    tracing::info!(subject = user.subject_id(), recipe_id = %recipe.id, "Recipe saved");

    Ok((
        StatusCode::CREATED,
        Json(SaveRecipeResponse {
            success: true,
            message: "Recipe saved successfully".to_string(),
            recipe,
        }),
    ))
}

/// The three most recently saved recipes.
async fn get_recent_recipes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<RecipesResponse>> {
    let stored = load_user(&state, &user).await?;
    Ok(Json(RecipesResponse {
        success: true,
        recipes: recipes::recent(&stored.saved_recipes, RECENT_RECIPES),
    }))
}

/// All saved recipes, newest first.
async fn list_recipes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<RecipesResponse>> {
    let stored = load_user(&state, &user).await?;
    Ok(Json(RecipesResponse {
        success: true,
        recipes: recipes::newest_first(&stored.saved_recipes),
    }))
}

async fn get_recipe(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<RecipeResponse>> {
    let stored = load_user(&state, &user).await?;
    let recipe = stored
        .saved_recipes
        .into_iter()
        .find(|r| r.id == id)
        .ok_or_else(|| AppError::NotFound("Recipe not found".to_string()))?;

    Ok(Json(RecipeResponse {
        success: true,
        recipe,
    }))
}
