//! Static ATVR lookup tables and the mapping onto Ölföng categories.

use serde::Serialize;

use olfong_core::Locale;

/// A labelled code in one of the ATVR catalog tables.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub code: &'static str,
    pub is: &'static str,
    pub en: &'static str,
}

/// Food pairing codes used in `foodcategory` links.
#[rustfmt::skip]
pub const FOOD_CATEGORIES: &[CatalogEntry] = &[
    CatalogEntry { code: "C", is: "Fiskur", en: "Fish" },
    CatalogEntry { code: "D", is: "Alifuglar", en: "Fowl" },
    CatalogEntry { code: "E", is: "Nautakjöt", en: "Beef" },
    CatalogEntry { code: "F", is: "Lambakjöt", en: "Lamb" },
    CatalogEntry { code: "G", is: "Svínakjöt", en: "Pork" },
    CatalogEntry { code: "H", is: "Villibráð", en: "Game" },
    CatalogEntry { code: "I", is: "Grænmetisréttir", en: "Vegetables" },
    CatalogEntry { code: "J", is: "Grillmat", en: "Barbeque food" },
    CatalogEntry { code: "M", is: "Pasta", en: "Pasta" },
    CatalogEntry { code: "R", is: "Reykt kjöt", en: "Smoked meat" },
    CatalogEntry { code: "S", is: "Pottréttir", en: "Casserole" },
    CatalogEntry { code: "2", is: "Pylsur", en: "Hot dogs" },
    CatalogEntry { code: "4", is: "Sushi", en: "Sushi" },
    CatalogEntry { code: "B", is: "Skelfisk", en: "Shellfish" },
    CatalogEntry { code: "Æ", is: "Hægt að panta", en: "Can be reserved" },
];

#[rustfmt::skip]
pub const PRODUCT_CATEGORIES: &[CatalogEntry] = &[
    CatalogEntry { code: "beer", is: "Bjór", en: "Beer" },
    CatalogEntry { code: "red-wine", is: "Rauðvín", en: "Red wine" },
    CatalogEntry { code: "white-wine", is: "Hvítvín", en: "White wine" },
    CatalogEntry { code: "strong", is: "Sterkt áfengi", en: "Spirits" },
    CatalogEntry { code: "cider", is: "Síder", en: "Cider" },
    CatalogEntry { code: "liqueur", is: "Líkjör", en: "Liqueur" },
    CatalogEntry { code: "rose-wine", is: "Rósavín", en: "Rosé wine" },
    CatalogEntry { code: "sparkling-wine", is: "Freyðivín", en: "Sparkling wine" },
    CatalogEntry { code: "dessert-wine", is: "Eftirréttavín", en: "Dessert wine" },
    CatalogEntry { code: "packaging", is: "Umbúðir", en: "Packaging" },
];

/// `{code, name}` as returned by the category list endpoints.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LabelledCode {
    pub code: &'static str,
    pub name: &'static str,
}

impl CatalogEntry {
    #[must_use]
    pub fn label(&self, locale: Locale) -> &'static str {
        locale.pick(self.en, self.is)
    }
}

/// Render a table for one language.
#[must_use]
pub fn labelled(table: &[CatalogEntry], locale: Locale) -> Vec<LabelledCode> {
    table
        .iter()
        .map(|entry| LabelledCode {
            code: entry.code,
            name: entry.label(locale),
        })
        .collect()
}

/// Look up a food pairing label by code.
#[must_use]
pub fn food_label(code: &str, locale: Locale) -> Option<&'static str> {
    FOOD_CATEGORIES
        .iter()
        .find(|entry| entry.code == code)
        .map(|entry| entry.label(locale))
}

/// Map an ATVR category name onto an Ölföng category name.
#[must_use]
pub fn internal_category_for(atvr_name: &str) -> String {
    let name = atvr_name.trim();
    match name {
        "" => "WINE".to_string(),
        "Bjór" | "Beer" => "BEERS".to_string(),
        "Rauðvín" | "Hvítvín" | "Rósavín" | "Freyðivín" | "Eftirréttavín" | "Red wine"
        | "White wine" | "Rosé wine" | "Sparkling wine" | "Dessert wine" => "WINE".to_string(),
        "Sterkt áfengi" | "Líkjör" | "Spirits" | "Liqueur" => "SPIRITS".to_string(),
        "Síder" | "Cider" => "CIDER_RTD".to_string(),
        other => other.to_uppercase(),
    }
}
