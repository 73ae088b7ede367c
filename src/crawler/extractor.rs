//! Record extraction
//!
//! Pure functions over an already fetched document: enumerate containers,
//! resolve each field within them, and read navigation links.

use crate::crawler::{FetchedDocument, Record};
use crate::selector::{clean_text, resolve, visible_text, ClassSelector, FieldMap, SelectorSpec};
use crate::url::{absolutize, resolve_link};
use scraper::ElementRef;
use url::Url;

/// Attributes whose values are URLs and are made absolute on extraction
const URL_ATTRIBUTES: &[&str] = &["href", "src"];

/// A list-page record together with the detail page it links to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedItem {
    pub record: Record,
    pub detail_url: Option<Url>,
}

/// Extracts one record per container, in document order
///
/// # Arguments
///
/// * `document` - The fetched document
/// * `container_selector` - Selector for the repeating item
/// * `fields` - Fields resolved within each container
///
/// # Returns
///
/// One record per matching container. Zero containers is not an error and
/// yields an empty vector.
///
/// # Example
///
/// ```
/// use field_harvest::crawler::{extract, FetchedDocument};
/// use field_harvest::selector::{ClassSelector, FieldMap};
/// use url::Url;
///
/// let html = r#"<div class="company-card"><h2 class="name">Google</h2></div>"#;
/// let doc = FetchedDocument::parse(Url::parse("https://example.com/").unwrap(), html, false);
/// let container = ClassSelector::parse(".company-card").unwrap();
/// let fields = FieldMap::parse([("Name", ".name")]).unwrap();
///
/// let records = extract(&doc, &container, &fields);
/// assert_eq!(records[0].get("Name"), Some("Google"));
/// ```
pub fn extract(
    document: &FetchedDocument,
    container_selector: &ClassSelector,
    fields: &FieldMap,
) -> Vec<Record> {
    document
        .html
        .select(container_selector.selector())
        .map(|container| build_record(container, fields, &document.source_url))
        .collect()
}

/// Extracts records and, for each container, the detail link it carries
pub fn extract_items(
    document: &FetchedDocument,
    container_selector: &ClassSelector,
    fields: &FieldMap,
    detail_link_selector: Option<&ClassSelector>,
) -> Vec<ExtractedItem> {
    document
        .html
        .select(container_selector.selector())
        .map(|container| ExtractedItem {
            record: build_record(container, fields, &document.source_url),
            detail_url: detail_link_selector
                .and_then(|selector| container_link(container, selector, &document.source_url)),
        })
        .collect()
}

/// Extracts the fields of a detail page
///
/// Fields are resolved against the first container matching
/// `container_selector`, or against the whole document if none matches.
pub fn extract_detail(
    document: &FetchedDocument,
    container_selector: &ClassSelector,
    fields: &FieldMap,
) -> Record {
    let scope = document
        .html
        .select(container_selector.selector())
        .next()
        .unwrap_or_else(|| document.html.root_element());
    build_record(scope, fields, &document.source_url)
}

/// Resolves a navigation link anywhere in the document
///
/// Candidates are tried in document order; the first one carrying a
/// followable URL wins. `None` means navigation was not found.
pub fn find_link(document: &FetchedDocument, selector: &ClassSelector) -> Option<Url> {
    document
        .html
        .select(selector.selector())
        .find_map(|element| link_value(element, selector, &document.source_url))
}

fn build_record(container: ElementRef<'_>, fields: &FieldMap, base_url: &Url) -> Record {
    let mut record = Record::with_fields(fields);
    for (name, spec) in fields.iter() {
        let value = resolve(container, spec).map(|raw| match spec {
            SelectorSpec::Class(selector) if is_url_attribute(selector) => absolutize(&raw, base_url),
            _ => raw,
        });
        record.set(name, value);
    }
    record
}

/// The detail link of a container: the container itself if it matches,
/// else its first matching descendant with a followable URL
fn container_link(container: ElementRef<'_>, selector: &ClassSelector, base_url: &Url) -> Option<Url> {
    if selector.selector().matches(&container) {
        if let Some(url) = link_value(container, selector, base_url) {
            return Some(url);
        }
    }

    container
        .select(selector.selector())
        .find_map(|element| link_value(element, selector, base_url))
}

fn link_value(element: ElementRef<'_>, selector: &ClassSelector, base_url: &Url) -> Option<Url> {
    let raw = match selector.attribute() {
        Some(attr) => element.value().attr(attr)?.to_string(),
        None => clean_text(&visible_text(element)),
    };
    resolve_link(&raw, base_url)
}

fn is_url_attribute(selector: &ClassSelector) -> bool {
    selector
        .attribute()
        .map_or(false, |attr| URL_ATTRIBUTES.iter().any(|u| attr.eq_ignore_ascii_case(u)))
}
