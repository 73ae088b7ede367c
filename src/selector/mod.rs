//! Selector module for Field-Harvest
//!
//! This module holds the declarative description of where a field's value
//! lives inside a container, and the pure resolver that reads it.
//!
//! Two literal forms are accepted for a field:
//! - a structural (CSS) selector, optionally suffixed with `@attr`
//! - `TEXT_MATCH:<label text>|<value tag>`, which finds a value by the text
//!   of a neighbouring label
//!
//! # Example
//!
//! ```
//! use field_harvest::selector::SelectorSpec;
//!
//! let spec = SelectorSpec::parse("TEXT_MATCH:Founded:|span").unwrap();
//! assert_eq!(spec.to_string(), "TEXT_MATCH:Founded:|span");
//! ```

mod field_map;
mod resolve;
mod spec;

pub use field_map::FieldMap;
pub use resolve::{clean_text, resolve, visible_text};
pub use spec::{ClassSelector, SelectorSpec, TEXT_MATCH_PREFIX};

use thiserror::Error;

/// Errors raised while parsing selector literals
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("Invalid selector syntax in '{literal}': {reason}")]
    InvalidSyntax { literal: String, reason: String },

    #[error("Duplicate field name: {0}")]
    DuplicateField(String),
}
