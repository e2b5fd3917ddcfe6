//! Recipe list item and the list endpoints that serve it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recipe card as shown in every recipe list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooking_time_minutes: Option<u32>,
    #[serde(default)]
    pub likes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Server-side lists of recipes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeList {
    /// Everyone's recipes, newest first by default.
    HomeFeed,
    /// Full-text search results.
    Search { query: String },
    /// The signed-in user's bookmarks.
    Bookmarks,
    /// Recipes published by one user.
    UserRecipes { user_id: i64 },
}

impl RecipeList {
    /// Name used in logs and list events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::HomeFeed => "home_feed",
            Self::Search { .. } => "search",
            Self::Bookmarks => "bookmarks",
            Self::UserRecipes { .. } => "user_recipes",
        }
    }

    /// Path relative to the API root.
    pub fn path(&self) -> String {
        match self {
            Self::HomeFeed => "recipes".to_string(),
            Self::Search { .. } => "recipes/search".to_string(),
            Self::Bookmarks => "users/me/bookmarks".to_string(),
            Self::UserRecipes { user_id } => format!("users/{user_id}/recipes"),
        }
    }

    /// Query parameters sent in addition to `page`/`size`/`sort`.
    pub fn extra_query(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Search { query } => vec![("query", query.clone())],
            _ => Vec::new(),
        }
    }
}
