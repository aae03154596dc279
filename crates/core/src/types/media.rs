//! Media library collections and their upload limits.

use serde::{Deserialize, Serialize};

const MIB: u64 = 1024 * 1024;

const IMAGES: &[&str] = &["image/jpeg", "image/png", "image/webp"];
const IMAGES_GIF: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];
const ANY: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "video/mp4",
];

/// A named bucket of uploaded files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "media_collection", rename_all = "snake_case")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaCollection {
    Products,
    Categories,
    Banners,
    Profile,
    Temp,
}

impl MediaCollection {
    pub const ALL: [Self; 5] = [
        Self::Products,
        Self::Categories,
        Self::Banners,
        Self::Profile,
        Self::Temp,
    ];

    /// Largest limit of any collection, used for the request body limit.
    pub const MAX_UPLOAD_BYTES: u64 = 10 * MIB;

    /// Maximum accepted file size in bytes.
    #[must_use]
    pub const fn max_size(self) -> u64 {
        match self {
            Self::Products => 5 * MIB,
            Self::Categories | Self::Profile => 2 * MIB,
            Self::Banners | Self::Temp => 10 * MIB,
        }
    }

    /// Accepted MIME types.
    #[must_use]
    pub const fn allowed_types(self) -> &'static [&'static str] {
        match self {
            Self::Products => IMAGES_GIF,
            Self::Categories | Self::Banners | Self::Profile => IMAGES,
            Self::Temp => ANY,
        }
    }

    #[must_use]
    pub fn accepts(self, mime: &str) -> bool {
        self.allowed_types().contains(&mime)
    }

    /// Directory name under the upload root.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Categories => "categories",
            Self::Banners => "banners",
            Self::Profile => "profile",
            Self::Temp => "temp",
        }
    }
}

impl std::fmt::Display for MediaCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.dir_name().to_ascii_uppercase())
    }
}

impl std::str::FromStr for MediaCollection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.dir_name() == lower)
            .ok_or_else(|| format!("invalid media collection: {s}"))
    }
}

/// File extension for a MIME type accepted by any collection.
#[must_use]
pub fn extension_for(mime: &str) -> Option<&'static str> {
    match mime {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "video/mp4" => Some("mp4"),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_limits() {
        assert_eq!(MediaCollection::Products.max_size(), 5 * MIB);
        assert_eq!(MediaCollection::Categories.max_size(), 2 * MIB);
        assert_eq!(MediaCollection::Banners.max_size(), 10 * MIB);
        assert!(
            MediaCollection::ALL
                .iter()
                .all(|c| c.max_size() <= MediaCollection::MAX_UPLOAD_BYTES)
        );
    }

    #[test]
    fn test_collection_types() {
        assert!(MediaCollection::Products.accepts("image/gif"));
        assert!(!MediaCollection::Categories.accepts("image/gif"));
        assert!(MediaCollection::Temp.accepts("video/mp4"));
        assert!(!MediaCollection::Banners.accepts("video/mp4"));
        assert!(!MediaCollection::Profile.accepts("application/pdf"));
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(
            "products".parse::<MediaCollection>().unwrap(),
            MediaCollection::Products
        );
        assert_eq!(MediaCollection::Banners.to_string(), "BANNERS");
        assert!("videos".parse::<MediaCollection>().is_err());
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("text/html"), None);
    }
}
