//! Storefront languages.
//!
//! Every customer-facing record carries an English and an Icelandic variant of
//! its text fields (`name`/`name_is`, `description`/`description_is`, ...).

use serde::{Deserialize, Serialize};

/// A supported UI/content language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Icelandic, the storefront default.
    #[default]
    Is,
    /// English.
    En,
}

impl Locale {
    /// ISO 639-1 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Is => "is",
            Self::En => "en",
        }
    }

    /// Value for an `Accept-Language` header preferring this locale.
    #[must_use]
    pub const fn accept_language(self) -> &'static str {
        match self {
            Self::Is => "is-IS,is;q=0.9,en;q=0.8",
            Self::En => "en-US,en;q=0.9",
        }
    }

    /// Choose between an English and an Icelandic value.
    #[must_use]
    pub fn pick<T>(self, en: T, is: T) -> T {
        match self {
            Self::En => en,
            Self::Is => is,
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "is" | "is-is" => Ok(Self::Is),
            "en" | "en-us" | "en-gb" => Ok(Self::En),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("IS".parse::<Locale>().unwrap(), Locale::Is);
        assert_eq!("en-GB".parse::<Locale>().unwrap(), Locale::En);
        assert!("de".parse::<Locale>().is_err());
    }

    #[test]
    fn test_pick() {
        assert_eq!(Locale::En.pick("Beer", "Bjór"), "Beer");
        assert_eq!(Locale::Is.pick("Beer", "Bjór"), "Bjór");
    }

    #[test]
    fn test_default_is_icelandic() {
        assert_eq!(Locale::default(), Locale::Is);
        assert_eq!(Locale::default().to_string(), "is");
    }
}
