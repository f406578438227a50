// src/services/detail_parser.rs

//! Detail page parsing.

use scraper::Html;

use crate::error::Result;
use crate::models::{DetailRules, FieldValues};
use crate::services::extract::{extract_fallback, extract_field, load_document};

/// Parse a detail page into field values.
///
/// A field whose selector matches nothing is simply absent from the result.
/// Fallback selectors are searched across the whole page, not only the
/// container.
pub fn parse_detail(content: &str, context: &str, rules: &DetailRules) -> Result<FieldValues> {
    let document = load_document(content, context)?;
    Ok(extract_detail(&document, context, rules))
}

pub fn extract_detail(document: &Html, context: &str, rules: &DetailRules) -> FieldValues {
    let scope = match &rules.container {
        Some(container) => match document.select(container).next() {
            Some(element) => element,
            None => {
                log::warn!("Detail container not found on {context}; using whole document");
                document.root_element()
            }
        },
        None => document.root_element(),
    };

    let mut values = FieldValues::new();
    for field in &rules.fields {
        let value = extract_field(field, scope)
            .or_else(|| extract_fallback(field, document.root_element()));
        match value {
            Some(value) => {
                values.insert(field.name.clone(), value);
            }
            None => log::debug!("Field '{}' not found on {context}", field.name),
        }
    }
    values
}
