//! Media library entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use olfong_core::{MediaCollection, MediaId, PageRequest, UserId};

use super::SortDirection;

/// A stored upload.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: MediaId,
    pub collection: MediaCollection,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    /// SHA-256 of the file contents, hex encoded.
    pub hash: String,
    pub url: String,
    /// Location on the server's disk.
    #[serde(skip_serializing)]
    pub path: String,
    pub alt: Option<String>,
    pub caption: Option<String>,
    pub description: Option<String>,
    pub uploaded_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Media {
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// A media row about to be inserted.
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub id: MediaId,
    pub collection: MediaCollection,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub hash: String,
    pub url: String,
    pub path: String,
    pub alt: Option<String>,
    pub caption: Option<String>,
    pub description: Option<String>,
    pub uploaded_by: Option<UserId>,
}

/// Body of `PUT /api/media/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaUpdate {
    pub alt: Option<String>,
    pub caption: Option<String>,
    pub description: Option<String>,
}

/// Sort keys for the media picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaSort {
    #[default]
    CreatedAt,
    OriginalName,
    Size,
}

impl MediaSort {
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::OriginalName => "original_name",
            Self::Size => "size",
        }
    }
}

/// Media list filters.
#[derive(Debug, Clone, Default)]
pub struct MediaFilter {
    pub collection: Option<MediaCollection>,
    pub search: Option<String>,
    pub sort_by: MediaSort,
    pub sort_order: SortDirection,
    pub page: PageRequest,
}
