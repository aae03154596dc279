//! Regex extraction of products from ATVR catalog markup.
//!
//! The catalog is server-rendered HTML without structured data. Each field is
//! pulled out of either the raw markup (links, images) or a line-oriented text
//! rendering of it (prices, labels, keywords).

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

use olfong_core::Locale;

use super::AtvrProduct;
use super::catalog::food_label;

static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script>|<style\b.*?</style>|<!--.*?-->")
        .expect("Invalid regex")
});

static BLOCK_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)<br\s*/?>|</?(?:p|div|li|ul|ol|tr|td|th|h[1-6]|section|article|header|footer|dl|dt|dd|table)\b[^>]*>",
    )
    .expect("Invalid regex")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("Invalid regex"));

static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|\d+);").expect("Invalid regex"));

static INLINE_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").expect("Invalid regex"));

static LIST_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<li\b[^>]*>.*?</li>").expect("Invalid regex"));

static PRODUCT_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?href=["']([^"']*productID=(\d+)[^"']*)["'][^>]*>(.*?)</a>"#)
        .expect("Invalid regex")
});

static PRODUCT_ANCHOR_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a\b[^>]*?href=["'][^"']*productID="#).expect("Invalid regex")
});

static IMG_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*?\bsrc=["']([^"']+)["']"#).expect("Invalid regex")
});

static STYLE_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?href=["'][^"']*style=[^"']*["'][^>]*>(.*?)</a>"#)
        .expect("Invalid regex")
});

static CATEGORY_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?href=["'][^"']*category=[^"']*["'][^>]*>(.*?)</a>"#)
        .expect("Invalid regex")
});

static FOOD_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"foodcategory([A-Z0-9Æ]+)").expect("Invalid regex"));

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h[1-3]\b[^>]*>(.*?)</h[1-3]>").expect("Invalid regex"));

static PARAGRAPH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p>").expect("Invalid regex"));

static TRAILING_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(\d+\)$").expect("Invalid regex"));

static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d[\d.,]*)\s*kr").expect("Invalid regex"));

static VOLUME_ABV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*ml\s*(\d+(?:[.,]\d+)?)\s*%").expect("Invalid regex")
});

static VOLUME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*ml").expect("Invalid regex"));

static PRODUCER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:Framleiðandi|Producer|Framleitt af)[:\s]+(.+?)\s*$")
        .expect("Invalid regex")
});

static COUNTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:Upprunaland|Land|Country)[:\s]+(.+?)\s*$").expect("Invalid regex")
});

/// Category names as shown on the Icelandic site, with the phrases that
/// identify them in either language. Checked in order.
const CATEGORY_PATTERNS: &[(&str, &[&str])] = &[
    ("Rauðvín", &["Rauðvín", "Red wine"]),
    ("Hvítvín", &["Hvítvín", "White wine"]),
    ("Rósavín", &["Rósavín", "Rosé wine", "Rose wine"]),
    ("Freyðivín", &["Freyðivín", "Sparkling wine"]),
    ("Bjór", &["Bjór", "Beer"]),
    ("Sterkt áfengi", &["Sterkt áfengi", "Spirits"]),
    ("Líkjör", &["Líkjör", "Liqueur"]),
    ("Síder", &["Síder", "Cider"]),
    ("Eftirréttavín", &["Eftirréttavín", "Dessert wine"]),
    ("Umbúðir", &["Umbúðir", "Packaging"]),
];

const SPECIAL_ATTRIBUTES: &[&str] = &[
    "Lífrænt",
    "Organic",
    "Vegan",
    "Glútenlaust",
    "Gluten-free",
    "Kosher",
    "Náttúruvín",
    "Natural wine",
    "Sjálfbært",
    "Sustainable",
    "Án viðbætts súlfíts",
    "No added sulfites",
    "Bíódínamík",
    "Biodynamic",
    "Sanngjarnt",
    "Fair trade",
    "Léttgler",
    "Light glass",
];

/// `(availability, availability_is, phrases)` in priority order.
const AVAILABILITY: &[(&str, &str, &[&str])] = &[
    ("special-order", "Sérpöntun", &["Sérpöntun", "Special order"]),
    ("coming-soon", "Væntanlegt", &["Væntanlegt", "Coming soon"]),
    ("discontinued", "Vara hættir", &["Vara hættir", "Discontinued"]),
];

/// Render markup as trimmed, non-empty lines of text.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let without_scripts = SCRIPT_STYLE_RE.replace_all(html, " ");
    let with_breaks = BLOCK_TAG_RE.replace_all(&without_scripts, "\n");
    let bare = TAG_RE.replace_all(&with_breaks, " ");
    let decoded = decode_entities(&bare);

    decoded
        .lines()
        .map(|line| INLINE_SPACE_RE.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(text: &str) -> String {
    let numeric = NUMERIC_ENTITY_RE.replace_all(text, |caps: &regex::Captures<'_>| {
        let raw = &caps[1];
        let code = raw
            .strip_prefix('x')
            .map_or_else(|| raw.parse().ok(), |hex| u32::from_str_radix(hex, 16).ok());
        code.and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), String::from)
    });
    numeric
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn inline_text(fragment: &str) -> String {
    html_to_text(fragment).replace('\n', " ")
}

/// Resolve an `href`/`src` against the site's base URL.
fn absolutize(base_url: &str, link: &str) -> String {
    let link = decode_entities(link);
    if link.starts_with("http://") || link.starts_with("https://") {
        link
    } else if let Some(rest) = link.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            link.trim_start_matches('/')
        )
    }
}

/// Split a search results page into one markup fragment per product.
///
/// List items that link to a product are preferred. Without them the page is
/// cut at every product link.
#[must_use]
pub fn product_blocks(html: &str) -> Vec<&str> {
    let items: Vec<&str> = LIST_ITEM_RE
        .find_iter(html)
        .map(|m| m.as_str())
        .filter(|item| item.contains("productID="))
        .collect();
    if !items.is_empty() {
        return items;
    }

    let starts: Vec<usize> = PRODUCT_ANCHOR_START_RE
        .find_iter(html)
        .map(|m| m.start())
        .collect();
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(html.len());
            &html[start..end]
        })
        .collect()
}

/// Parse every product on a search results page. Products spread over
/// several fragments are folded together by ID.
#[must_use]
pub fn parse_search_results(html: &str, base_url: &str, locale: Locale) -> Vec<AtvrProduct> {
    let html = SCRIPT_STYLE_RE.replace_all(html, " ");
    let mut products: Vec<AtvrProduct> = Vec::new();
    for block in product_blocks(&html) {
        let Some(product) = parse_search_block(block, base_url, locale) else {
            continue;
        };
        match products
            .iter_mut()
            .find(|p| p.atvr_product_id == product.atvr_product_id)
        {
            Some(existing) => existing.absorb(product),
            None => products.push(product),
        }
    }
    products
}

/// Parse one search result fragment. Returns `None` without a product link.
#[must_use]
pub fn parse_search_block(block: &str, base_url: &str, locale: Locale) -> Option<AtvrProduct> {
    let mut links = PRODUCT_LINK_RE.captures_iter(block);
    let first = links.next()?;

    let mut product = AtvrProduct {
        atvr_product_id: first[2].to_string(),
        atvr_url: Some(absolutize(base_url, &first[1])),
        ..AtvrProduct::default()
    };

    let name = std::iter::once(first)
        .chain(links)
        .map(|caps| inline_text(&caps[3]))
        .find(|text| !text.is_empty());
    set_localized(&mut product.name, &mut product.name_is, name, locale);

    if let Some(src) = IMG_SRC_RE.captures(block).map(|caps| absolutize(base_url, &caps[1])) {
        product.atvr_image_url = Some(src);
    }

    let text = html_to_text(block);
    product.category = detect_category(&text).map(str::to_string);
    product.subcategories = subcategories(block, product.category.as_deref());
    fill_common(&mut product, block, &text);
    Some(product)
}

/// Parse a product detail page. Returns `None` when the page has no product
/// name, which is how the catalog renders unknown IDs.
#[must_use]
pub fn parse_detail(
    html: &str,
    product_id: &str,
    detail_url: &str,
    base_url: &str,
    locale: Locale,
) -> Option<AtvrProduct> {
    let name = HEADING_RE
        .captures_iter(html)
        .map(|caps| inline_text(&caps[1]))
        .find(|text| !text.is_empty())
        .map(|text| TRAILING_ID_RE.replace(&text, "").into_owned())?;

    let mut product = AtvrProduct {
        atvr_product_id: product_id.to_string(),
        atvr_url: Some(detail_url.to_string()),
        ..AtvrProduct::default()
    };
    set_localized(&mut product.name, &mut product.name_is, Some(name), locale);

    let description = PARAGRAPH_RE
        .captures_iter(html)
        .map(|caps| inline_text(&caps[1]))
        .find(|text| text.chars().count() > 10);
    set_localized(
        &mut product.description,
        &mut product.description_is,
        description,
        locale,
    );

    let image = IMG_SRC_RE
        .captures_iter(html)
        .map(|caps| caps[1].to_string())
        .find(|src| src.contains(product_id))
        .map(|src| absolutize(base_url, &src))
        .unwrap_or_else(|| {
            format!(
                "{}/images/products/{product_id}.jpg",
                base_url.trim_end_matches('/')
            )
        });
    product.atvr_image_url = Some(image);

    let text = html_to_text(html);
    product.category = CATEGORY_LINK_RE
        .captures_iter(html)
        .map(|caps| inline_text(&caps[1]))
        .find(|text| !text.is_empty())
        .or_else(|| detect_category(&text).map(str::to_string));
    product.subcategories = subcategories(html, product.category.as_deref());

    let producer = PRODUCER_RE.captures(&text).map(|caps| caps[1].to_string());
    set_localized(&mut product.producer, &mut product.producer_is, producer, locale);
    let country = COUNTRY_RE.captures(&text).map(|caps| caps[1].to_string());
    set_localized(&mut product.country, &mut product.country_is, country, locale);

    fill_common(&mut product, html, &text);
    Some(product)
}

/// Fields found the same way on result fragments and detail pages.
fn fill_common(product: &mut AtvrProduct, html: &str, text: &str) {
    product.price = extract_price(text);
    let (volume, alcohol) = extract_volume(text);
    product.volume = volume;
    product.alcohol_content = alcohol;

    let (en, is) = food_pairings(html);
    product.food_pairings = en;
    product.food_pairings_is = is;

    let attributes = special_attributes(text);
    product.special_attributes_is = attributes.clone();
    product.special_attributes = attributes;

    let (availability, availability_is) = availability(text);
    product.availability = Some(availability.to_string());
    product.availability_is = Some(availability_is.to_string());
}

fn set_localized(
    en: &mut Option<String>,
    is: &mut Option<String>,
    value: Option<String>,
    locale: Locale,
) {
    match locale {
        Locale::En => *en = value,
        Locale::Is => *is = value,
    }
}

/// The first category whose phrases appear in `text`, named in Icelandic.
#[must_use]
pub fn detect_category(text: &str) -> Option<&'static str> {
    CATEGORY_PATTERNS
        .iter()
        .find(|(_, phrases)| phrases.iter().any(|phrase| text.contains(phrase)))
        .map(|(name, _)| *name)
}

fn subcategories(html: &str, category: Option<&str>) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for caps in STYLE_LINK_RE.captures_iter(html) {
        let text = inline_text(&caps[1]);
        if text.chars().count() > 1 && Some(text.as_str()) != category && !found.contains(&text) {
            found.push(text);
        }
    }
    found
}

/// Parse a price as printed by the catalog, e.g. `2.999 kr.` or `1.234,50 kr`.
///
/// A `.` or `,` followed by exactly three digits is a thousands separator.
#[must_use]
pub fn parse_price(raw: &str) -> Option<Decimal> {
    let raw = raw.trim().trim_end_matches(['.', ',']);
    let normalized = match (raw.rfind('.'), raw.rfind(',')) {
        (Some(dot), Some(comma)) if dot < comma => raw.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => raw.replace(',', ""),
        (Some(dot), None) if raw.len() - dot - 1 == 3 => raw.replace('.', ""),
        (None, Some(comma)) if raw.len() - comma - 1 == 3 => raw.replace(',', ""),
        (None, Some(_)) => raw.replace(',', "."),
        _ => raw.to_string(),
    };
    normalized.parse().ok()
}

#[must_use]
pub fn extract_price(text: &str) -> Option<Decimal> {
    PRICE_RE
        .captures_iter(text)
        .find_map(|caps| parse_price(&caps[1]))
}

/// `("750 ml", Some(13.5))` from text like `750 ml 13,5%`.
#[must_use]
pub fn extract_volume(text: &str) -> (Option<String>, Option<Decimal>) {
    if let Some(caps) = VOLUME_ABV_RE.captures(text) {
        return (
            Some(format!("{} ml", &caps[1])),
            caps[2].replace(',', ".").parse().ok(),
        );
    }
    let volume = VOLUME_RE
        .captures(text)
        .map(|caps| format!("{} ml", &caps[1]));
    (volume, None)
}

/// English and Icelandic labels of the food pairing links, in page order.
#[must_use]
pub fn food_pairings(html: &str) -> (Vec<String>, Vec<String>) {
    let mut en = Vec::new();
    let mut is = Vec::new();
    for caps in FOOD_CODE_RE.captures_iter(html) {
        let code = &caps[1];
        if let (Some(label_en), Some(label_is)) =
            (food_label(code, Locale::En), food_label(code, Locale::Is))
            && !en.iter().any(|l| l == label_en)
        {
            en.push(label_en.to_string());
            is.push(label_is.to_string());
        }
    }
    (en, is)
}

#[must_use]
pub fn special_attributes(text: &str) -> Vec<String> {
    SPECIAL_ATTRIBUTES
        .iter()
        .filter(|indicator| text.contains(*indicator))
        .map(|indicator| (*indicator).to_string())
        .collect()
}

/// `(availability, availability_is)`; products are available unless marked.
#[must_use]
pub fn availability(text: &str) -> (&'static str, &'static str) {
    AVAILABILITY
        .iter()
        .find(|(_, _, phrases)| phrases.iter().any(|phrase| text.contains(phrase)))
        .map_or(("available", "Til ráðstöfunar"), |(en, is, _)| (*en, *is))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.vinbudin.is";

    const SEARCH_PAGE: &str = r#"
        <html><head><script>var results = [];</script></head>
        <body><ul class="results">
          <li class="product">
            <a href="/heim/vorur/stok-vara.aspx/?productID=01448"><img src="/Portaldata/1/Resources/vorumyndir/original/01448_r.jpg" /></a>
            <a href="/heim/vorur/stok-vara.aspx/?productID=01448">Egils Gull</a>
            <span>Bjór</span> <a href="/heim/vorur/vorur.aspx/?style=Lager">Lager</a>
            <div>500 ml 5,0%</div>
            <div class="price">429 kr.</div>
            <a href="/heim/vorur/vorur.aspx/?foodcategoryC">Fiskur</a>
            <a href="/heim/vorur/vorur.aspx/?foodcategoryE">Nautakjöt</a>
          </li>
          <li class="product">
            <a href="/heim/vorur/stok-vara.aspx/?productID=22617">Chateau Test &amp; Fils</a>
            <span>Rauðvín</span>
            <div>750 ml 13,5%</div>
            <div>2.999 kr.</div>
            <span>Lífrænt</span> <span>Sérpöntun</span>
          </li>
        </ul></body></html>
    "#;

    const DETAIL_PAGE: &str = r#"
        <html><body>
          <img src="/logo.png" />
          <h1>Chateau Test (22617)</h1>
          <p>Short</p>
          <p>Dark red wine with notes of cherry and oak.</p>
          <a href="/heim/vorur/vorur.aspx/?category=red-wine">Red wine</a>
          <dl><dt>Producer</dt><dd>Chateau Test SA</dd>
          <dt>Country</dt><dd>France</dd></dl>
          <div>750 ml 13,5%</div>
          <div>2.999 kr.</div>
        </body></html>
    "#;

    #[test]
    fn test_html_to_text() {
        let text = html_to_text("<div>A&nbsp;&amp;&#66;<script>x</script></div><p>  C <b>D</b> </p>");
        assert_eq!(text, "A &B\nC D");
    }

    #[test]
    fn test_product_blocks_prefers_list_items() {
        let blocks = product_blocks(SEARCH_PAGE);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].contains("01448"));
    }

    #[test]
    fn test_product_blocks_falls_back_to_links() {
        let html = r#"<div><a href="?productID=1">One</a> 100 kr</div><div><a href="?productID=2">Two</a></div>"#;
        let blocks = product_blocks(html);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].contains("100 kr"));
        assert!(!blocks[0].contains("Two"));
    }

    #[test]
    fn test_parse_search_results() {
        let products = parse_search_results(SEARCH_PAGE, BASE, Locale::Is);
        assert_eq!(products.len(), 2);

        let beer = &products[0];
        assert_eq!(beer.atvr_product_id, "01448");
        assert_eq!(beer.name_is.as_deref(), Some("Egils Gull"));
        assert_eq!(beer.name, None);
        assert_eq!(
            beer.atvr_url.as_deref(),
            Some("https://www.vinbudin.is/heim/vorur/stok-vara.aspx/?productID=01448")
        );
        assert_eq!(
            beer.atvr_image_url.as_deref(),
            Some("https://www.vinbudin.is/Portaldata/1/Resources/vorumyndir/original/01448_r.jpg")
        );
        assert_eq!(beer.category.as_deref(), Some("Bjór"));
        assert_eq!(beer.subcategories, vec!["Lager".to_string()]);
        assert_eq!(beer.volume.as_deref(), Some("500 ml"));
        assert_eq!(beer.alcohol_content, Some(Decimal::new(50, 1)));
        assert_eq!(beer.price, Some(Decimal::from(429)));
        assert_eq!(beer.food_pairings, vec!["Fish", "Beef"]);
        assert_eq!(beer.food_pairings_is, vec!["Fiskur", "Nautakjöt"]);
        assert_eq!(beer.availability.as_deref(), Some("available"));

        let wine = &products[1];
        assert_eq!(wine.name_is.as_deref(), Some("Chateau Test & Fils"));
        assert_eq!(wine.price, Some(Decimal::from(2999)));
        assert_eq!(wine.special_attributes, vec!["Lífrænt"]);
        assert_eq!(wine.availability.as_deref(), Some("special-order"));
        assert_eq!(wine.availability_is.as_deref(), Some("Sérpöntun"));
    }

    #[test]
    fn test_parse_detail() {
        let url = "https://www.vinbudin.is/english/desktopdefault.aspx/tabid-54/?productID=22617";
        let product =
            parse_detail(DETAIL_PAGE, "22617", url, "https://www.vinbudin.is/english", Locale::En)
                .unwrap();
        assert_eq!(product.name.as_deref(), Some("Chateau Test"));
        assert_eq!(product.name_is, None);
        assert_eq!(
            product.description.as_deref(),
            Some("Dark red wine with notes of cherry and oak.")
        );
        assert_eq!(product.category.as_deref(), Some("Red wine"));
        assert_eq!(product.producer.as_deref(), Some("Chateau Test SA"));
        assert_eq!(product.country.as_deref(), Some("France"));
        assert_eq!(product.atvr_url.as_deref(), Some(url));
        assert_eq!(
            product.atvr_image_url.as_deref(),
            Some("https://www.vinbudin.is/english/images/products/22617.jpg")
        );
    }

    #[test]
    fn test_parse_detail_without_heading() {
        assert!(parse_detail("<p>Nothing here at all</p>", "1", "u", BASE, Locale::Is).is_none());
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("429"), Some(Decimal::from(429)));
        assert_eq!(parse_price("2.999"), Some(Decimal::from(2999)));
        assert_eq!(parse_price("12.345."), Some(Decimal::from(12345)));
        assert_eq!(parse_price("1.234,50"), Some(Decimal::new(123_450, 2)));
        assert_eq!(parse_price("1,234.50"), Some(Decimal::new(123_450, 2)));
        assert_eq!(parse_price("99,5"), Some(Decimal::new(995, 1)));
        assert_eq!(parse_price("abc"), None);
    }

    #[test]
    fn test_extract_volume_without_abv() {
        assert_eq!(extract_volume("Flaska 330 ml"), (Some("330 ml".to_string()), None));
        assert_eq!(extract_volume("no volume"), (None, None));
    }

    #[test]
    fn test_detect_category_order() {
        assert_eq!(detect_category("Sparkling wine, Rosé wine"), Some("Rósavín"));
        assert_eq!(detect_category("Nothing"), None);
    }
}
