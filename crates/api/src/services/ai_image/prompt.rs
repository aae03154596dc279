//! Prompt text for product photo clean-up.

use serde::Deserialize;

/// Drop shadow added under the product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowStyle {
    Minimal,
    #[default]
    Soft,
    Dramatic,
}

impl ShadowStyle {
    /// Parse a preset name. Unknown names fall back to `Soft`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "minimal" => Self::Minimal,
            "dramatic" => Self::Dramatic,
            _ => Self::Soft,
        }
    }

    const fn description(self) -> &'static str {
        match self {
            Self::Minimal => "subtle minimal drop shadow barely visible",
            Self::Soft => "soft realistic drop shadow beneath the product for depth and dimension",
            Self::Dramatic => "strong dramatic shadow with defined edges for visual impact",
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Minimal => "Minimal Shadow",
            Self::Soft => "Soft Shadow (Recommended)",
            Self::Dramatic => "Dramatic Shadow",
        }
    }
}

pub const DEFAULT_BACKGROUND: &str = "#FFFFFF";

fn background_description(hex: &str) -> String {
    match hex.trim().to_ascii_uppercase().as_str() {
        "#FFFFFF" => "pure white".to_string(),
        "#F3F4F6" => "light gray".to_string(),
        "#FFF8F0" => "warm white with slight cream tone".to_string(),
        "#F0F9FF" => "cool white with slight blue tone".to_string(),
        _ => format!("custom color {}", hex.trim()),
    }
}

/// Generation options sent by the admin UI.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptOptions {
    pub shadow_style: Option<String>,
    pub background_color: Option<String>,
    pub custom_instructions: Option<String>,
}

impl PromptOptions {
    #[must_use]
    pub fn prompt(&self) -> String {
        build_prompt(
            self.shadow_style
                .as_deref()
                .map(ShadowStyle::from_name)
                .unwrap_or_default(),
            self.background_color
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or(DEFAULT_BACKGROUND),
            self.custom_instructions.as_deref().unwrap_or_default(),
        )
    }
}

/// Build the edit instruction for a product photo.
#[must_use]
pub fn build_prompt(shadow: ShadowStyle, background: &str, custom_instructions: &str) -> String {
    let base = format!(
        "Replace the background with a clean professional {} studio background.\n\
         Add a {}.\n\
         Keep the product in the exact same position, scale, and orientation.\n\
         Preserve all original product details, textures, colors, labels, and text that are printed on the product packaging itself.\n\
         Remove watermarks, website logos, brand overlays, and any text/logos that are NOT part of the original product packaging (such as photographer watermarks, retail site logos).\n\
         Enhance clarity and visibility of the product's own labels and text while removing external overlays.\n\
         Professional commercial product photography style with even studio lighting.\n\
         High quality, sharp focus, commercial e-commerce standard.",
        background_description(background),
        shadow.description(),
    );

    let custom = custom_instructions.trim();
    if custom.is_empty() {
        base
    } else {
        format!("{base}\n{custom}")
    }
}

/// One prompt per shadow preset, plus any custom prompts, for A/B comparison.
#[must_use]
pub fn variation_prompts(custom_prompts: &[String]) -> Vec<(String, String)> {
    [ShadowStyle::Minimal, ShadowStyle::Soft, ShadowStyle::Dramatic]
        .into_iter()
        .map(|style| {
            (
                style.label().to_string(),
                build_prompt(style, DEFAULT_BACKGROUND, ""),
            )
        })
        .chain(
            custom_prompts
                .iter()
                .filter(|p| !p.trim().is_empty())
                .enumerate()
                .map(|(i, p)| (format!("Custom {}", i + 1), p.trim().to_string())),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt() {
        let prompt = PromptOptions::default().prompt();
        assert!(prompt.starts_with(
            "Replace the background with a clean professional pure white studio background."
        ));
        assert!(prompt.contains("soft realistic drop shadow"));
        assert!(prompt.ends_with("commercial e-commerce standard."));
    }

    #[test]
    fn test_background_descriptions() {
        assert!(build_prompt(ShadowStyle::Soft, "#f3f4f6", "").contains("light gray studio"));
        assert!(build_prompt(ShadowStyle::Soft, "#123456", "").contains("custom color #123456"));
    }

    #[test]
    fn test_shadow_fallback() {
        assert_eq!(ShadowStyle::from_name("DRAMATIC"), ShadowStyle::Dramatic);
        assert_eq!(ShadowStyle::from_name("neon"), ShadowStyle::Soft);
    }

    #[test]
    fn test_custom_instructions_on_new_line() {
        let prompt = build_prompt(ShadowStyle::Minimal, "#FFFFFF", "  Make the bottle taller ");
        assert!(prompt.ends_with("standard.\nMake the bottle taller"));
        assert!(prompt.contains("barely visible"));

        let blank = build_prompt(ShadowStyle::Minimal, "#FFFFFF", "   ");
        assert!(blank.ends_with("standard."));
    }

    #[test]
    fn test_variation_prompts() {
        let prompts = variation_prompts(&["Blue backdrop".to_string(), " ".to_string()]);
        let names: Vec<_> = prompts.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Minimal Shadow",
                "Soft Shadow (Recommended)",
                "Dramatic Shadow",
                "Custom 1"
            ]
        );
        assert_eq!(prompts[3].1, "Blue backdrop");
    }
}
