//! Field extraction shared by the list and detail parsers.

use scraper::{ElementRef, Html};

use crate::error::{AppError, Result};
use crate::models::{CompiledField, DatePart, Extract};
use crate::utils::date::{DATE_FORMAT, parse_range};
use crate::utils::normalize_whitespace;

/// Parse page content into a document.
///
/// HTML parsing itself never fails; content is rejected only when it is
/// not markup at all (empty, or no tags).
pub fn load_document(content: &str, context: &str) -> Result<Html> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::parse(context, "empty document"));
    }
    if !trimmed.contains('<') {
        return Err(AppError::parse(context, "content is not markup"));
    }
    Ok(Html::parse_document(content))
}

/// Whitespace-normalized text of an element.
pub fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

/// Evaluate a field rule inside `scope`.
///
/// Elements are tried in document order; the first one that passes the
/// label check and yields a non-empty value wins. A miss returns `None`.
pub fn extract_field(field: &CompiledField, scope: ElementRef<'_>) -> Option<String> {
    scope
        .select(&field.selector)
        .find_map(|element| extract_from(field, element, true))
}

/// Evaluate the field's fallback selectors inside `scope`, in order.
///
/// A label is stripped when the text starts with it but is not required.
pub fn extract_fallback(field: &CompiledField, scope: ElementRef<'_>) -> Option<String> {
    field.fallback.iter().find_map(|selector| {
        scope
            .select(selector)
            .find_map(|element| extract_from(field, element, false))
    })
}

fn extract_from(
    field: &CompiledField,
    element: ElementRef<'_>,
    require_label: bool,
) -> Option<String> {
    let text = element_text(element);
    let unlabelled = match &field.label {
        Some(label) => match label.find(&text) {
            Some(found) => Some(text[found.end()..].trim().to_string()),
            None if require_label => return None,
            None => None,
        },
        None => None,
    };

    let raw = match &field.extract {
        Extract::Text => unlabelled.unwrap_or(text),
        Extract::Html => element.inner_html().trim().to_string(),
        Extract::Attr(name) => element.value().attr(name)?.trim().to_string(),
    };

    let value = match field.date {
        Some(part) => {
            let (start, end) = parse_range(&raw)?;
            let date = match part {
                DatePart::Start => start,
                DatePart::End => end,
            };
            date.format(DATE_FORMAT).to_string()
        }
        None => raw,
    };

    (!value.is_empty()).then_some(value)
}
