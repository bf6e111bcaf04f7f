//! Metadata lookups on raw submission XML.
//!
//! These run before a form is known, e.g. to detect duplicate or edited
//! submissions, so they take the XML alone and never build the nested dict.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::{parse_document, Element, Node};
use crate::error::{ParseError, Result};

static UUID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^uuid:(.*)").expect("uuid pattern is a valid regex"));

/// Trimmed text of `<meta><name>` (or the `orx:` forms) below the root.
///
/// Tag names compare case-insensitively. Only the first `meta` element and
/// its first matching child are consulted.
pub fn get_meta_value(xml: &str, name: &str) -> Result<Option<String>> {
    let doc = parse_document(xml)?;
    Ok(meta_value(doc.root(), name).map(str::to_string))
}

fn meta_value<'a>(root: &'a Element, name: &str) -> Option<&'a str> {
    let name = name.to_lowercase();
    let prefixed = format!("orx:{name}");

    let meta = root.child_elements().find(|el| {
        let tag = el.name().to_lowercase();
        tag == "meta" || tag == "orx:meta"
    })?;
    let field = meta.child_elements().find(|el| {
        let tag = el.name().to_lowercase();
        tag == name || tag == prefixed
    })?;
    field.first_text().map(str::trim)
}

/// The captured part of `uuid:<id>`; values without the prefix have no id.
fn uuid_only(value: &str) -> Option<String> {
    UUID_PATTERN
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// The submission's instance id, from `meta/instanceID` or, failing that,
/// an `instanceID` attribute on the root.
pub fn get_uuid_from_xml(xml: &str) -> Result<Option<String>> {
    let doc = parse_document(xml)?;
    let root = doc.root();

    if let Some(value) = meta_value(root, "instanceID").filter(|v| !v.is_empty()) {
        return Ok(uuid_only(value));
    }
    Ok(root
        .attribute("instanceID")
        .filter(|v| !v.is_empty())
        .and_then(uuid_only))
}

/// The id of the submission an edit replaces, from `meta/deprecatedID`.
pub fn get_deprecated_uuid_from_xml(xml: &str) -> Result<Option<String>> {
    let doc = parse_document(xml)?;
    Ok(meta_value(doc.root(), "deprecatedID").and_then(uuid_only))
}

/// The root `submissionDate` attribute.
///
/// Accepts RFC 3339 and the common ISO 8601 variants clients send. Values
/// without an offset are UTC.
pub fn get_submission_date_from_xml(xml: &str) -> Result<Option<DateTime<FixedOffset>>> {
    let doc = parse_document(xml)?;
    match doc.root().attribute("submissionDate") {
        Some(value) if !value.is_empty() => parse_submission_date(value).map(Some),
        _ => Ok(None),
    }
}

/// Like [`get_submission_date_from_xml`], but an unparseable date gives
/// `None`. Malformed XML is still an error.
pub fn submission_date_or_none(xml: &str) -> Result<Option<DateTime<FixedOffset>>> {
    match get_submission_date_from_xml(xml) {
        Err(ParseError::InvalidSubmissionDate { value, source }) => {
            debug!("ignoring submissionDate {value:?}: {source}");
            Ok(None)
        }
        other => other,
    }
}

fn parse_submission_date(value: &str) -> Result<DateTime<FixedOffset>> {
    let value = value.trim();
    let rfc3339_err = match DateTime::parse_from_rfc3339(value) {
        Ok(date) => return Ok(date),
        Err(e) => e,
    };

    for format in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(date) = DateTime::parse_from_str(value, format) {
            return Ok(date);
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc().into());
        }
    }
    if let Some(naive) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(naive.and_utc().into());
    }

    Err(ParseError::InvalidSubmissionDate {
        value: value.to_string(),
        source: rfc3339_err,
    })
}

/// The form id string of a submission.
///
/// The root `id` attribute, or for submissions wrapped in another element,
/// the `id` of the first child of a `data` element.
pub fn get_id_string_from_xml(xml: &str) -> Result<Option<String>> {
    let doc = parse_document(xml)?;
    let root = doc.root();

    if let Some(id) = root.attribute("id").filter(|id| !id.is_empty()) {
        return Ok(Some(id.to_string()));
    }

    let id = root
        .descendants()
        .into_iter()
        .filter(|el| el.name() == "data")
        .filter_map(|data| match data.children().first() {
            Some(Node::Element(first)) => first.attribute("id"),
            _ => None,
        })
        .find(|id| !id.is_empty());
    Ok(id.map(str::to_string))
}
