//! Attribute matching for worklist queries and subscription filters.
//!
//! `matches` is a pure function: no side effects, conjunctive over the
//! tags present in the query.

use regex::Regex;

use crate::dataset::Dataset;
use crate::tag::{tags, Tag};
use crate::time::parse_partial_datetime;
use crate::value::Element;

/// Tags that are code sequences regardless of their content.
const CODE_SEQUENCE_TAGS: &[Tag] = &[
    tags::SCHEDULED_WORKITEM_CODE_SEQUENCE,
    tags::SCHEDULED_STATION_NAME_CODE_SEQUENCE,
];

/// Match a query dataset against a record dataset.
///
/// Every tag present in the query must match; command-group and file-meta
/// tags in the query are skipped.
pub fn matches(query: &Dataset, record: &Dataset) -> bool {
    for (tag, query_element) in query.iter() {
        if tag.is_command_group() || tag.is_file_meta() {
            continue;
        }
        let Some(record_element) = record.get(tag) else {
            return false;
        };
        if !element_matches(tag, query_element, record_element) {
            return false;
        }
    }
    true
}

fn element_matches(tag: Tag, query: &Element, record: &Element) -> bool {
    if query.vr.is_datetime() {
        let query_value = query.first_str().unwrap_or("");
        let record_value = record.first_str().unwrap_or("");
        return match_datetime(query_value, record_value);
    }

    if query.vr.is_sequence() {
        let query_items: Vec<&Dataset> = query.items().collect();
        let record_items: Vec<&Dataset> = record.items().collect();

        if is_code_sequence(tag, &query_items) {
            return match_code_sequence(&query_items, &record_items);
        }

        // An empty query sequence matches any record sequence.
        if query_items.is_empty() {
            return true;
        }
        if record_items.is_empty() {
            return false;
        }
        return query_items
            .iter()
            .any(|qi| record_items.iter().any(|ri| matches(qi, ri)));
    }

    if query.vr.is_string() {
        let query_value = query.first_str().unwrap_or("");
        if query_value.is_empty() || query_value == "*" {
            return true;
        }
        let record_value = record.first_str().unwrap_or("");
        return match_text(query_value, record_value);
    }

    // Numeric and other values: direct equality.
    query.values == record.values
}

/// Match date/time values: universal match, wildcards, ranges with open
/// ends, then chronological equality with a string-compare fallback.
pub fn match_datetime(query: &str, record: &str) -> bool {
    if query.is_empty() || query == "*" {
        return true;
    }

    if query.contains('*') || query.contains('?') {
        return wildcard_regex(query).map(|re| re.is_match(record)).unwrap_or(false);
    }

    if query.contains('-') {
        let parts: Vec<&str> = query.split('-').collect();
        if parts.len() == 2 {
            let start = parse_partial_datetime(parts[0]);
            let end = parse_partial_datetime(parts[1]);
            let Some(value) = parse_partial_datetime(record) else {
                return false;
            };
            return match (start, end) {
                (Some(s), Some(e)) => s <= value && value <= e,
                (Some(s), None) => s <= value,
                (None, Some(e)) => value <= e,
                (None, None) => false,
            };
        }
    }

    match (parse_partial_datetime(query), parse_partial_datetime(record)) {
        (Some(q), Some(r)) => q == r,
        _ => query == record,
    }
}

/// String matching: `*`/`?` wildcards or exact equality.
fn match_text(query: &str, record: &str) -> bool {
    if query.contains('*') || query.contains('?') {
        return wildcard_regex(query).map(|re| re.is_match(record)).unwrap_or(false);
    }
    query == record
}

/// Compile a `*`/`?` wildcard pattern into an anchored regex, escaping
/// everything else literally.
fn wildcard_regex(pattern: &str) -> Option<Regex> {
    let mut expr = String::with_capacity(pattern.len() * 2 + 2);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            c if "\\.+()[]{}|^$".contains(c) => {
                expr.push('\\');
                expr.push(c);
            }
            c => expr.push(c),
        }
    }
    expr.push('$');
    Regex::new(&expr).ok()
}

/// Whether a query sequence is a code sequence: either a known code
/// sequence tag, or structurally detected by its first item carrying
/// CodeValue, CodingSchemeDesignator, and CodeMeaning.
fn is_code_sequence(tag: Tag, query_items: &[&Dataset]) -> bool {
    if CODE_SEQUENCE_TAGS.contains(&tag) {
        return true;
    }
    match query_items.first() {
        Some(item) => {
            item.contains(tags::CODE_VALUE)
                && item.contains(tags::CODING_SCHEME_DESIGNATOR)
                && item.contains(tags::CODE_MEANING)
        }
        None => false,
    }
}

/// Code sequence matching: every query item must find a record item with
/// equal CodeValue and CodingSchemeDesignator. Query items missing either
/// field are wildcards.
fn match_code_sequence(query_items: &[&Dataset], record_items: &[&Dataset]) -> bool {
    if query_items.is_empty() {
        return true;
    }
    if record_items.is_empty() {
        return false;
    }

    for query_item in query_items {
        let (Some(code), Some(scheme)) = (
            query_item.str_value(tags::CODE_VALUE),
            query_item.str_value(tags::CODING_SCHEME_DESIGNATOR),
        ) else {
            continue;
        };

        let found = record_items.iter().any(|item| {
            item.str_value(tags::CODE_VALUE) == Some(code)
                && item.str_value(tags::CODING_SCHEME_DESIGNATOR) == Some(scheme)
        });
        if !found {
            return false;
        }
    }
    true
}
