//! Input validation shared by the admin endpoints.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("Invalid regex"));

static HHMM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]?[0-9]|2[0-3]):[0-5][0-9]$").expect("Invalid regex"));

/// A rejected request field.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Derive a URL slug from a display name.
///
/// Icelandic letters are transliterated (`Ð` → `d`, `Þ` → `th`, `Æ` → `ae`,
/// accented vowels lose their accent), spaces become `-`, anything else
/// outside `[a-z0-9-]` is dropped.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().to_lowercase().chars() {
        match c {
            'a'..='z' | '0'..='9' => slug.push(c),
            'á' | 'à' | 'â' | 'ä' | 'å' => slug.push('a'),
            'é' | 'è' | 'ê' | 'ë' => slug.push('e'),
            'í' | 'ì' | 'î' | 'ï' => slug.push('i'),
            'ó' | 'ò' | 'ô' | 'ö' | 'ø' => slug.push('o'),
            'ú' | 'ù' | 'û' | 'ü' => slug.push('u'),
            'ý' | 'ÿ' => slug.push('y'),
            'ð' => slug.push('d'),
            'þ' => slug.push_str("th"),
            'æ' => slug.push_str("ae"),
            ' ' | '-' | '_' | '/' => {
                if !slug.is_empty() && !slug.ends_with('-') {
                    slug.push('-');
                }
            }
            _ => {}
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Check that `slug` only contains lowercase letters, digits and hyphens.
///
/// # Errors
///
/// Returns a `ValidationError` describing the allowed characters.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if SLUG_RE.is_match(slug) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "Slug can only contain lowercase letters, numbers, and hyphens",
        ))
    }
}

/// Whether `value` is a 24h `HH:MM` time.
#[must_use]
pub fn is_hhmm(value: &str) -> bool {
    HHMM_RE.is_match(value)
}

/// Check a trimmed, required string's length in characters.
///
/// # Errors
///
/// Returns a `ValidationError` naming `field` when out of range.
pub fn require_length(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if (min..=max).contains(&len) {
        Ok(())
    } else {
        Err(ValidationError(format!(
            "{field} must be between {min} and {max} characters"
        )))
    }
}

/// Check an optional string's maximum length in characters.
///
/// # Errors
///
/// Returns a `ValidationError` naming `field` when too long.
pub fn max_length(field: &str, value: Option<&str>, max: usize) -> Result<(), ValidationError> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError(format!(
            "{field} must be at most {max} characters"
        ))),
        _ => Ok(()),
    }
}

/// Check that an optional, non-empty value is an absolute http(s) URL.
///
/// # Errors
///
/// Returns a `ValidationError` naming `field` when the URL does not parse.
pub fn optional_url(field: &str, value: Option<&str>) -> Result<(), ValidationError> {
    let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(());
    };
    match url::Url::parse(v) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => Ok(()),
        _ => Err(ValidationError(format!("{field} must be a valid URL"))),
    }
}

/// Reject a blank required field.
///
/// # Errors
///
/// Returns `"{field} is required"`.
pub fn required(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError(format!("{field} is required")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Red Wine"), "red-wine");
        assert_eq!(slugify("TILBOÐIN"), "tilbodin");
        assert_eq!(slugify("Þjóðlegt  Öl!"), "thjodlegt-ol");
        assert_eq!(slugify("CIDER_RTD"), "cider-rtd");
        assert_eq!(slugify("  Bjór - Lager "), "bjor-lager");
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("red-wine-2024").is_ok());
        assert!(validate_slug("Red-Wine").is_err());
        assert!(validate_slug("tilboðin").is_err());
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn test_hhmm() {
        assert!(is_hhmm("09:30"));
        assert!(is_hhmm("9:30"));
        assert!(is_hhmm("23:59"));
        assert!(!is_hhmm("24:00"));
        assert!(!is_hhmm("12:60"));
        assert!(!is_hhmm("noon"));
    }

    #[test]
    fn test_lengths() {
        assert!(require_length("name", "ab", 2, 50).is_ok());
        assert_eq!(
            require_length("name", " a ", 2, 50),
            Err(ValidationError::new("name must be between 2 and 50 characters"))
        );
        assert!(max_length("apiKey", Some(&"k".repeat(501)), 500).is_err());
        assert!(max_length("apiKey", None, 500).is_ok());
    }

    #[test]
    fn test_optional_url() {
        assert!(optional_url("website", Some("https://valitor.is")).is_ok());
        assert!(optional_url("website", Some("")).is_ok());
        assert!(optional_url("website", None).is_ok());
        assert!(optional_url("website", Some("valitor.is")).is_err());
        assert!(optional_url("website", Some("ftp://valitor.is")).is_err());
    }
}
