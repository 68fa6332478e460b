use crate::error::ExtractionError;
use crate::offer::Offer;
use crate::parsers::OfferExtractor;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

/// Product container selectors, most specific first
pub const DEFAULT_CONTAINER_SELECTORS: [&str; 5] = [
    "div.pod-4-grid",
    r#"div[class*="search-results"]"#,
    r#"div[class*="product"]"#,
    r#"article[class*="product"]"#,
    "div.grid-pod",
];

const NAME_TAGS: [&str; 4] = ["b", "h2", "h3", "span"];
const NAME_FALLBACK_TAGS: [&str; 3] = ["b", "h2", "h3"];
const NAME_CLASSES: [&str; 1] = ["name"];

const PRICE_TAGS: [&str; 2] = ["span", "div"];
const PRICE_CLASSES: [&str; 2] = ["price", "precio"];

const DISCOUNT_TAGS: [&str; 2] = ["span", "div"];
const DISCOUNT_CLASSES: [&str; 3] = ["discount", "descuento", "off"];

const UNNAMED: &str = "Sin nombre";
const NO_PRICE: &str = "N/A";

static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("Digit pattern should be valid"));

/// Extracts offers from a product-grid page using class-name heuristics
///
/// Container selectors are tried in order and the first one that matches
/// anything decides which elements are treated as products.
pub struct HtmlOfferExtractor {
    containers: Vec<(String, Selector)>,
}

impl Default for HtmlOfferExtractor {
    fn default() -> Self {
        Self::with_container_selectors(&DEFAULT_CONTAINER_SELECTORS)
    }
}

impl HtmlOfferExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor with a custom ordered list of container selectors
    ///
    /// Selectors that fail to parse are skipped with a warning.
    pub fn with_container_selectors(selectors: &[&str]) -> Self {
        let containers = selectors
            .iter()
            .filter_map(|css| match Selector::parse(css) {
                Ok(selector) => Some((css.to_string(), selector)),
                Err(e) => {
                    ::log::warn!("Ignoring invalid container selector {:?}: {}", css, e);
                    None
                }
            })
            .collect();
        Self { containers }
    }

    /// Returns the products matched by the first selector that matches anything
    fn find_products<'a>(&self, doc: &'a Html) -> Vec<ElementRef<'a>> {
        for (css, selector) in &self.containers {
            let products: Vec<_> = doc.select(selector).collect();
            if !products.is_empty() {
                ::log::debug!("Selector {:?} matched {} products", css, products.len());
                return products;
            }
        }
        ::log::debug!("No container selector matched");
        Vec::new()
    }
}

impl OfferExtractor for HtmlOfferExtractor {
    fn extract(&self, markup: &str, base_origin: &Url) -> Vec<Result<Offer, ExtractionError>> {
        let doc = Html::parse_document(markup);
        self.find_products(&doc)
            .into_iter()
            .map(|product| extract_offer(product, base_origin))
            .collect()
    }
}

/// Builds one offer from a product element
fn extract_offer(product: ElementRef<'_>, base_origin: &Url) -> Result<Offer, ExtractionError> {
    let discount_elem = find_by_class(product, &DISCOUNT_TAGS, &DISCOUNT_CLASSES)
        .ok_or(ExtractionError::MissingDiscount)?;
    let discount = parse_discount(&element_text(discount_elem))?;

    let name = find_by_class(product, &NAME_TAGS, &NAME_CLASSES)
        .or_else(|| find_by_tag(product, &NAME_FALLBACK_TAGS))
        .map(element_text)
        .unwrap_or_else(|| UNNAMED.to_string());

    let price = find_by_class(product, &PRICE_TAGS, &PRICE_CLASSES)
        .map(element_text)
        .unwrap_or_else(|| NO_PRICE.to_string());

    let link = match find_href(product) {
        Some(href) => resolve_link(href, base_origin)?,
        None => String::new(),
    };

    Ok(Offer::new(&name, &price, discount, &link))
}

/// First percentage number in a discount label such as "-70%" or "70% OFF"
pub fn parse_discount(text: &str) -> Result<u8, ExtractionError> {
    let digits = DIGITS
        .find(text)
        .ok_or_else(|| ExtractionError::UnparsableDiscount(text.to_string()))?;
    let value: u64 = digits
        .as_str()
        .parse()
        .map_err(|_| ExtractionError::UnparsableDiscount(text.to_string()))?;

    u8::try_from(value)
        .ok()
        .filter(|v| *v <= 100)
        .ok_or(ExtractionError::DiscountOutOfRange(value))
}

/// Resolves a possibly relative product link against the site origin
pub fn resolve_link(href: &str, base_origin: &Url) -> Result<String, ExtractionError> {
    let href = href.trim();
    if href.is_empty() {
        return Ok(String::new());
    }
    base_origin
        .join(href)
        .map(|url| url.to_string())
        .map_err(|source| ExtractionError::BadLink {
            href: href.to_string(),
            source,
        })
}

/// First descendant with one of `tags` whose class contains one of `keywords`
fn find_by_class<'a>(
    product: ElementRef<'a>,
    tags: &[&str],
    keywords: &[&str],
) -> Option<ElementRef<'a>> {
    descendants(product).find(|el| {
        tags.contains(&el.value().name())
            && el.value().attr("class").is_some_and(|class| {
                let class = class.to_lowercase();
                keywords.iter().any(|k| class.contains(k))
            })
    })
}

/// First descendant with one of `tags`
fn find_by_tag<'a>(product: ElementRef<'a>, tags: &[&str]) -> Option<ElementRef<'a>> {
    descendants(product).find(|el| tags.contains(&el.value().name()))
}

/// href of the first anchor inside the product
fn find_href<'a>(product: ElementRef<'a>) -> Option<&'a str> {
    descendants(product)
        .filter(|el| el.value().name() == "a")
        .find_map(|el| el.value().attr("href"))
}

/// Element descendants in document order, excluding the element itself
fn descendants<'a>(product: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    product.descendants().skip(1).filter_map(ElementRef::wrap)
}

/// Whitespace-normalized text content of an element
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
