use crate::selector::SelectorError;
use scraper::Selector;
use std::fmt;

/// Prefix that marks a label-based selector literal
pub const TEXT_MATCH_PREFIX: &str = "TEXT_MATCH:";

/// Describes how to find one field's value relative to a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorSpec {
    /// A structural selector evaluated against the container's descendants
    Class(ClassSelector),

    /// Locate the element whose text equals `label_text`, then the first
    /// `value_tag` element under that label's parent
    LabelMatch {
        label_text: String,
        value_tag: String,
    },
}

impl SelectorSpec {
    /// Parses a field selector literal
    ///
    /// # Arguments
    ///
    /// * `literal` - Either a CSS selector (with optional `@attr` suffix) or
    ///   a `TEXT_MATCH:<label>|<tag>` literal
    ///
    /// # Returns
    ///
    /// * `Ok(SelectorSpec)` - The parsed selector
    /// * `Err(SelectorError::InvalidSyntax)` - The literal is malformed
    pub fn parse(literal: &str) -> Result<Self, SelectorError> {
        let trimmed = literal.trim();

        match trimmed.strip_prefix(TEXT_MATCH_PREFIX) {
            Some(definition) => parse_label_match(trimmed, definition),
            None => ClassSelector::parse(trimmed).map(Self::Class),
        }
    }

    /// Convenience constructor for a label match
    pub fn label_match(label_text: impl Into<String>, value_tag: impl Into<String>) -> Self {
        Self::LabelMatch {
            label_text: label_text.into(),
            value_tag: value_tag.into(),
        }
    }
}

fn parse_label_match(literal: &str, definition: &str) -> Result<SelectorSpec, SelectorError> {
    let parts: Vec<&str> = definition.split('|').collect();
    if parts.len() != 2 {
        return Err(invalid(
            literal,
            format!(
                "expected exactly one '|' separating label and tag, found {}",
                parts.len() - 1
            ),
        ));
    }

    let label_text = parts[0].trim();
    let value_tag = parts[1].trim();

    if label_text.is_empty() {
        return Err(invalid(literal, "label text cannot be empty"));
    }

    if value_tag.is_empty() {
        return Err(invalid(literal, "value tag cannot be empty"));
    }

    if !value_tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(invalid(
            literal,
            format!("'{}' is not a tag name", value_tag),
        ));
    }

    Ok(SelectorSpec::label_match(label_text, value_tag))
}

impl fmt::Display for SelectorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(selector) => write!(f, "{}", selector),
            Self::LabelMatch {
                label_text,
                value_tag,
            } => write!(f, "{}{}|{}", TEXT_MATCH_PREFIX, label_text, value_tag),
        }
    }
}

/// A compiled structural selector with an optional attribute target
#[derive(Debug, Clone)]
pub struct ClassSelector {
    css: String,
    attribute: Option<String>,
    compiled: Selector,
}

impl ClassSelector {
    /// Parses `selector` or `selector@attr`
    ///
    /// The `@attr` suffix is only recognised after the last `]`, so attribute
    /// selectors whose values contain `@` are left intact.
    pub fn parse(literal: &str) -> Result<Self, SelectorError> {
        let (css, attribute) = split_attribute(literal.trim());

        if css.is_empty() {
            return Err(invalid(literal, "selector cannot be empty"));
        }

        let compiled = Selector::parse(css).map_err(|e| invalid(literal, e.to_string()))?;

        Ok(Self {
            css: css.to_string(),
            attribute: attribute.map(str::to_string),
            compiled,
        })
    }

    /// Parses a navigation selector, reading `default_attribute` unless the
    /// literal names its own
    pub fn parse_link(literal: &str, default_attribute: &str) -> Result<Self, SelectorError> {
        let mut selector = Self::parse(literal)?;
        if selector.attribute.is_none() {
            selector.attribute = Some(default_attribute.to_string());
        }
        Ok(selector)
    }

    /// The CSS part of the selector
    pub fn css(&self) -> &str {
        &self.css
    }

    /// The attribute to read, if any; `None` means visible text
    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// The compiled selector
    pub fn selector(&self) -> &Selector {
        &self.compiled
    }
}

impl PartialEq for ClassSelector {
    fn eq(&self, other: &Self) -> bool {
        self.css == other.css && self.attribute == other.attribute
    }
}

impl Eq for ClassSelector {}

impl fmt::Display for ClassSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attribute {
            Some(attr) => write!(f, "{}@{}", self.css, attr),
            None => write!(f, "{}", self.css),
        }
    }
}

fn split_attribute(literal: &str) -> (&str, Option<&str>) {
    let tail_start = literal.rfind(']').map(|i| i + 1).unwrap_or(0);

    if let Some(offset) = literal[tail_start..].rfind('@') {
        let at = tail_start + offset;
        let css = literal[..at].trim();
        let attr = &literal[at + 1..];
        if !css.is_empty() && is_attribute_name(attr) {
            return (css, Some(attr));
        }
    }

    (literal, None)
}

fn is_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

fn invalid(literal: &str, reason: impl Into<String>) -> SelectorError {
    SelectorError::InvalidSyntax {
        literal: literal.to_string(),
        reason: reason.into(),
    }
}
