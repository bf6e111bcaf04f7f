//! Geopoint extraction from the nested dict.
//!
//! A geopoint answer is `"lat lng altitude accuracy"`. Only the first two
//! numbers are kept.

use log::trace;

use crate::value::{Dict, Value};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Recursively search `value` for every value stored under `key`.
///
/// A group yields its own entry first, then the matches found below each of
/// its values. Repeats are searched item by item.
pub fn values_matching_key<'a>(value: &'a Value, key: &str) -> Vec<&'a Value> {
    let mut results = Vec::new();
    collect_matching(value, key, &mut results);
    results
}

fn collect_matching<'a>(value: &'a Value, key: &str, out: &mut Vec<&'a Value>) {
    match value {
        Value::Group(dict) => collect_in_dict(dict, key, out),
        Value::Repeat(items) => {
            for item in items {
                collect_matching(item, key, out);
            }
        }
        Value::Text(_) => {}
    }
}

fn collect_in_dict<'a>(dict: &'a Dict, key: &str, out: &mut Vec<&'a Value>) {
    if let Some(found) = dict.get(key) {
        out.push(found);
    }
    for child in dict.values() {
        collect_matching(child, key, out);
    }
}

/// Extract the geopoints answered in `dict` for the given field xpaths.
///
/// Each xpath is relative to the submission root and is followed segment by
/// segment, through every item of a repeat, so only the declared field is
/// read. Returns `None` as soon as one answer fails to parse.
pub fn extract_geopoints(dict: &Dict, geo_xpaths: &[String]) -> Option<Vec<GeoPoint>> {
    let mut points = Vec::new();
    let mut matches = Vec::new();

    for xpath in geo_xpaths {
        let segments: Vec<&str> = xpath.split('/').filter(|s| !s.is_empty()).collect();
        matches.clear();
        for root in dict.values().filter_map(Value::as_group) {
            collect_at_path(root, &segments, &mut matches);
        }

        for answer in matches.iter().filter_map(|v| v.as_text()) {
            match parse_geopoint(answer) {
                Some(point) => points.push(point),
                None => {
                    trace!("unparseable geopoint {answer:?} for {xpath}");
                    return None;
                }
            }
        }
    }

    Some(points)
}

fn collect_at_path<'a>(dict: &'a Dict, segments: &[&str], out: &mut Vec<&'a Value>) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    if let Some(value) = dict.get(*first) {
        collect_below(value, rest, out);
    }
}

fn collect_below<'a>(value: &'a Value, rest: &[&str], out: &mut Vec<&'a Value>) {
    match value {
        Value::Repeat(items) => {
            for item in items {
                collect_below(item, rest, out);
            }
        }
        _ if rest.is_empty() => out.push(value),
        Value::Group(dict) => collect_at_path(dict, rest, out),
        Value::Text(_) => {}
    }
}

fn parse_geopoint(answer: &str) -> Option<GeoPoint> {
    let numbers = answer
        .split_whitespace()
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    match numbers.as_slice() {
        [latitude, longitude, ..] => Some(GeoPoint {
            latitude: *latitude,
            longitude: *longitude,
        }),
        _ => None,
    }
}
