//! Storefront banners.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use olfong_core::{BannerId, MediaId};

use crate::validation::{ValidationError, max_length, optional_url};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub id: BannerId,
    pub title: Option<String>,
    pub title_is: Option<String>,
    pub description: Option<String>,
    pub description_is: Option<String>,
    pub image_url: String,
    pub media_id: Option<MediaId>,
    pub alt: Option<String>,
    pub link: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/banners`. One of `imageUrl` or `mediaId` is required;
/// with a `mediaId` the image URL is taken from the media entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerInput {
    pub title: Option<String>,
    pub title_is: Option<String>,
    pub description: Option<String>,
    pub description_is: Option<String>,
    pub image_url: Option<String>,
    pub media_id: Option<MediaId>,
    pub alt: Option<String>,
    pub link: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

/// Body of `PUT /api/banners/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerUpdate {
    pub title: Option<String>,
    pub title_is: Option<String>,
    pub description: Option<String>,
    pub description_is: Option<String>,
    pub image_url: Option<String>,
    pub media_id: Option<MediaId>,
    pub alt: Option<String>,
    pub link: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

/// A banner link is either a site path (`/tilbod`) or an absolute URL.
fn check_link(link: Option<&str>) -> Result<(), ValidationError> {
    match link.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => Ok(()),
        other => optional_url("link", other),
    }
}

fn check_common(
    title: Option<&str>,
    title_is: Option<&str>,
    alt: Option<&str>,
    link: Option<&str>,
    sort_order: Option<i32>,
) -> Result<(), ValidationError> {
    max_length("title", title, 200)?;
    max_length("titleIs", title_is, 200)?;
    max_length("alt", alt, 300)?;
    check_link(link)?;
    if sort_order.is_some_and(|s| s < 0) {
        return Err(ValidationError::new("sortOrder must be 0 or greater"));
    }
    Ok(())
}

impl BannerInput {
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let has_url = self
            .image_url
            .as_deref()
            .is_some_and(|u| !u.trim().is_empty());
        if !has_url && self.media_id.is_none() {
            return Err(ValidationError::new("Image URL is required"));
        }
        optional_url("imageUrl", self.image_url.as_deref())?;
        check_common(
            self.title.as_deref(),
            self.title_is.as_deref(),
            self.alt.as_deref(),
            self.link.as_deref(),
            self.sort_order,
        )
    }
}

impl BannerUpdate {
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self
            .image_url
            .as_deref()
            .is_some_and(|u| u.trim().is_empty())
        {
            return Err(ValidationError::new("Image URL cannot be empty"));
        }
        optional_url("imageUrl", self.image_url.as_deref())?;
        check_common(
            self.title.as_deref(),
            self.title_is.as_deref(),
            self.alt.as_deref(),
            self.link.as_deref(),
            self.sort_order,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_image_is_required() {
        let err = BannerInput::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "Image URL is required");

        let with_media = BannerInput {
            media_id: Some(MediaId::generate()),
            ..BannerInput::default()
        };
        assert!(with_media.validate().is_ok());

        let with_url = BannerInput {
            image_url: Some("https://cdn.olfong.is/jol.jpg".to_string()),
            ..BannerInput::default()
        };
        assert!(with_url.validate().is_ok());
    }

    #[test]
    fn test_links() {
        let banner = |link: &str| BannerInput {
            image_url: Some("https://cdn.olfong.is/a.jpg".to_string()),
            link: Some(link.to_string()),
            ..BannerInput::default()
        };
        assert!(banner("/products?category=wine").validate().is_ok());
        assert!(banner("https://olfong.is/tilbod").validate().is_ok());
        assert!(banner("//evil.example/x").validate().is_err());
        assert!(banner("javascript:alert(1)").validate().is_err());
    }

    #[test]
    fn test_update_rules() {
        assert!(BannerUpdate::default().validate().is_ok());
        let blank = BannerUpdate {
            image_url: Some(" ".to_string()),
            ..BannerUpdate::default()
        };
        assert_eq!(
            blank.validate().unwrap_err().to_string(),
            "Image URL cannot be empty"
        );
        let negative = BannerUpdate {
            sort_order: Some(-1),
            ..BannerUpdate::default()
        };
        assert!(negative.validate().is_err());
    }
}
