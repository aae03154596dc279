//! CMS pages (about, terms, delivery info, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use olfong_core::{MediaId, PageId, PageStatus};

/// A content page. `content` holds the editor's serialized document.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: PageId,
    pub title: String,
    pub title_is: String,
    pub slug: String,
    pub content: String,
    pub content_is: String,
    pub status: PageStatus,
    pub is_visible: bool,
    pub sort_order: i32,
    pub featured_image_id: Option<MediaId>,
    pub meta_title: Option<String>,
    pub meta_title_is: Option<String>,
    pub meta_description: Option<String>,
    pub meta_description_is: Option<String>,
    pub canonical_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    /// Whether the storefront may show this page.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.status == PageStatus::Published
    }
}

/// Body of `POST /api/pages`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInput {
    pub title: String,
    pub title_is: String,
    pub slug: String,
    pub content: String,
    pub content_is: String,
    pub status: Option<PageStatus>,
    pub is_visible: Option<bool>,
    pub sort_order: Option<i32>,
    pub featured_image_id: Option<MediaId>,
    pub meta_title: Option<String>,
    pub meta_title_is: Option<String>,
    pub meta_description: Option<String>,
    pub meta_description_is: Option<String>,
    pub canonical_url: Option<String>,
}

impl PageInput {
    /// Names of required fields that are blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("title", &self.title),
            ("titleIs", &self.title_is),
            ("slug", &self.slug),
            ("content", &self.content),
            ("contentIs", &self.content_is),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Body of `PUT /api/pages/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageUpdate {
    pub title: Option<String>,
    pub title_is: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub content_is: Option<String>,
    pub status: Option<PageStatus>,
    pub is_visible: Option<bool>,
    pub sort_order: Option<i32>,
    pub featured_image_id: Option<MediaId>,
    pub meta_title: Option<String>,
    pub meta_title_is: Option<String>,
    pub meta_description: Option<String>,
    pub meta_description_is: Option<String>,
    pub canonical_url: Option<String>,
}

/// One entry of `PUT /api/pages/reorder`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageOrder {
    pub id: PageId,
    pub sort_order: i32,
}
