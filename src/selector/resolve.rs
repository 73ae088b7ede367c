//! Pure selector resolution against a container element
//!
//! Resolution never fails: a selector that matches nothing yields `None`,
//! so one missing field cannot abort a page.

use crate::selector::{ClassSelector, SelectorSpec};
use scraper::ElementRef;

/// Elements whose text is never visible
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Resolves a selector against one container
///
/// # Arguments
///
/// * `container` - The container element to search within
/// * `spec` - How to locate the value
///
/// # Returns
///
/// * `Some(String)` - The resolved value (attribute value or cleaned text)
/// * `None` - Nothing matched
///
/// # Example
///
/// ```
/// use field_harvest::selector::{resolve, SelectorSpec};
/// use scraper::{Html, Selector};
///
/// let html = Html::parse_document(r#"<div class="card"><h2 class="name"> Google </h2></div>"#);
/// let card = html.select(&Selector::parse(".card").unwrap()).next().unwrap();
/// let spec = SelectorSpec::parse(".name").unwrap();
/// assert_eq!(resolve(card, &spec), Some("Google".to_string()));
/// ```
pub fn resolve(container: ElementRef<'_>, spec: &SelectorSpec) -> Option<String> {
    match spec {
        SelectorSpec::Class(selector) => resolve_class(container, selector),
        SelectorSpec::LabelMatch {
            label_text,
            value_tag,
        } => resolve_label(container, label_text, value_tag),
    }
}

fn resolve_class(container: ElementRef<'_>, selector: &ClassSelector) -> Option<String> {
    let element = container.select(selector.selector()).next()?;

    match selector.attribute() {
        Some(attr) => element.value().attr(attr).map(|v| v.trim().to_string()),
        None => Some(clean_text(&visible_text(element))),
    }
}

fn resolve_label(container: ElementRef<'_>, label_text: &str, value_tag: &str) -> Option<String> {
    // First element in document order whose whole text is the label
    let label = container
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|el| visible_text(*el).trim() == label_text)?;

    let scope = label.parent().and_then(ElementRef::wrap)?;

    let mut preceding: Option<ElementRef<'_>> = None;
    let mut past_label = false;

    for node in scope.descendants().skip(1) {
        if node.id() == label.id() {
            past_label = true;
            continue;
        }

        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };

        if !element.value().name().eq_ignore_ascii_case(value_tag) {
            continue;
        }

        if node.ancestors().any(|a| a.id() == label.id()) {
            continue;
        }

        if past_label {
            return Some(clean_text(&visible_text(element)));
        }

        if preceding.is_none() {
            preceding = Some(element);
        }
    }

    preceding.map(|element| clean_text(&visible_text(element)))
}

/// Concatenates the text of an element, skipping script and style content
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();

    for node in element.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };

        let hidden = node
            .ancestors()
            .take_while(|a| a.id() != element.id())
            .filter_map(|a| a.value().as_element())
            .any(|e| HIDDEN_TAGS.contains(&e.name()));

        if !hidden {
            text.push_str(fragment);
        }
    }

    text
}

/// Collapses whitespace runs into single spaces and trims the result
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
