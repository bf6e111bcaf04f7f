//! Dict flattening.
//!
//! Two layouts of the same nested dict:
//! - [`flatten_indexed`]: every leaf gets its own path; repeat iterations
//!   after the first carry a 1-based `[n]` suffix on the repeat segment.
//! - [`flatten_nested`]: a repeat yields once, as a list of per-iteration
//!   flat maps. This is the layout behind `to_flat_dict()`.
//!
//! Paths include the root tag; the `*_flat_dict` helpers drop it when
//! joining.

use crate::options::RepeatKeys;
use crate::value::{Dict, FlatDict, FlatValue, Value};

// ---------------------------------------------------------------------------
// Variant A: index-suffixed paths
// ---------------------------------------------------------------------------

/// Lazily yield `(path, text)` for every leaf of `dict`, below `prefix`.
pub fn flatten_indexed<'a>(dict: &'a Dict, prefix: Vec<String>) -> IndexedPaths<'a> {
    IndexedPaths {
        stack: vec![Frame::Fields {
            prefix,
            iter: dict.iter(),
        }],
    }
}

pub struct IndexedPaths<'a> {
    stack: Vec<Frame<'a>>,
}

enum Frame<'a> {
    Fields {
        prefix: Vec<String>,
        iter: std::slice::Iter<'a, (String, Value)>,
    },
    Items {
        prefix: Vec<String>,
        iter: std::iter::Enumerate<std::slice::Iter<'a, Value>>,
    },
}

enum Step<'a> {
    Descend(Vec<String>, &'a Value),
    Pop,
}

impl<'a> Iterator for IndexedPaths<'a> {
    type Item = (Vec<String>, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let step = match self.stack.last_mut()? {
                Frame::Fields { prefix, iter } => match iter.next() {
                    Some((key, value)) => {
                        let mut path = prefix.clone();
                        path.push(key.clone());
                        Step::Descend(path, value)
                    }
                    None => Step::Pop,
                },
                // A list item sits at the list's own path, suffixed from the
                // second item on.
                Frame::Items { prefix, iter } => match iter.next() {
                    Some((i, item)) => {
                        let mut path = prefix.clone();
                        if i > 0 {
                            if let Some(last) = path.last_mut() {
                                last.push_str(&format!("[{}]", i + 1));
                            }
                        }
                        Step::Descend(path, item)
                    }
                    None => Step::Pop,
                },
            };

            match step {
                Step::Pop => {
                    self.stack.pop();
                }
                Step::Descend(path, Value::Text(text)) => return Some((path, text.as_str())),
                Step::Descend(path, Value::Group(dict)) => self.stack.push(Frame::Fields {
                    prefix: path,
                    iter: dict.iter(),
                }),
                Step::Descend(path, Value::Repeat(items)) => self.stack.push(Frame::Items {
                    prefix: path,
                    iter: items.iter().enumerate(),
                }),
            }
        }
    }
}

/// Variant A joined into `path -> text`, with the root segment dropped.
pub fn indexed_flat_dict(dict: &Dict) -> Vec<(String, String)> {
    flatten_indexed(dict, Vec::new())
        .map(|(path, text)| (path[1..].join("/"), text.to_string()))
        .collect()
}

// ---------------------------------------------------------------------------
// Variant B: nested repeats
// ---------------------------------------------------------------------------

/// A flattened entry: (path_segments, value).
pub type FlatEntry = (Vec<String>, FlatValue);

/// Flatten `dict` below `prefix`, turning each repeat into a list of rows.
///
/// Row keys depend on `keys`: relative to the repeat, or the root-relative
/// path used by older stored data.
pub fn flatten_nested(dict: &Dict, prefix: &[String], keys: RepeatKeys) -> Vec<FlatEntry> {
    let mut entries = Vec::new();

    for (key, value) in dict {
        let mut new_prefix = prefix.to_vec();
        new_prefix.push(key.clone());

        match value {
            Value::Text(text) => entries.push((new_prefix, FlatValue::Text(text.clone()))),
            Value::Group(inner) => entries.extend(flatten_nested(inner, &new_prefix, keys)),
            Value::Repeat(items) => {
                let rows = items
                    .iter()
                    .map(|item| repeat_row(item, &new_prefix, keys))
                    .collect();
                entries.push((new_prefix, FlatValue::Repeat(rows)));
            }
        }
    }

    entries
}

/// Flatten one repeat iteration found at `repeat_path`.
fn repeat_row(item: &Value, repeat_path: &[String], keys: RepeatKeys) -> FlatDict {
    let value = match item {
        Value::Group(fields) => {
            // Relative rows restart from an empty prefix; absolute rows keep
            // the full path and drop the root when joining.
            let (prefix, skip) = match keys {
                RepeatKeys::Relative => (Vec::new(), 0),
                RepeatKeys::Absolute => (repeat_path.to_vec(), 1),
            };
            return flatten_nested(fields, &prefix, keys)
                .into_iter()
                .map(|(path, value)| (path[skip..].join("/"), value))
                .collect();
        }
        Value::Text(text) => FlatValue::Text(text.clone()),
        Value::Repeat(inner) => FlatValue::Repeat(
            inner
                .iter()
                .map(|i| repeat_row(i, repeat_path, keys))
                .collect(),
        ),
    };

    // Scalar items come from promoted duplicate leaves; they are keyed by the
    // repeat itself.
    let key = match keys {
        RepeatKeys::Relative => repeat_path.last().cloned().unwrap_or_default(),
        RepeatKeys::Absolute => repeat_path[1..].join("/"),
    };
    [(key, value)].into_iter().collect()
}

/// Variant B joined into a [`FlatDict`], with the root segment dropped.
pub fn nested_flat_dict(dict: &Dict, keys: RepeatKeys) -> FlatDict {
    flatten_nested(dict, &[], keys)
        .into_iter()
        .map(|(path, value)| (path[1..].join("/"), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::xml_node_to_dict;
    use crate::dom::parse_document;
    use std::collections::HashSet;

    fn dict_for(xml: &str, repeats: &[&str], encrypted: bool) -> Dict {
        let doc = parse_document(xml).unwrap();
        let repeats: HashSet<String> = repeats.iter().map(|s| s.to_string()).collect();
        xml_node_to_dict(doc.root(), &repeats, encrypted).unwrap()
    }

    const NEW_REPEATS: &str = r#"<new_repeats id="new_repeats">
  <info><age>80</age><name>Adam</name></info>
  <kids><kids_details><kids_age>50</kids_age><kids_name>Abel</kids_name></kids_details><kids_details><kids_age>20</kids_age><kids_name>Cain</kids_name></kids_details><has_kids>1</has_kids></kids>
  <web_browsers>chrome ie</web_browsers>
  <gps>-1.2627557 36.7926442 0.0 30.0</gps>
</new_repeats>"#;

    #[test]
    fn test_non_repeating_round_trip() {
        let dict = dict_for(
            "<data><a>1</a><g><b>2</b><h><c>3</c></h></g></data>",
            &[],
            false,
        );
        let flat = indexed_flat_dict(&dict);
        assert_eq!(
            flat,
            vec![
                ("a".to_string(), "1".to_string()),
                ("g/b".to_string(), "2".to_string()),
                ("g/h/c".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_indexed_suffixes_after_first_item() {
        let dict = dict_for(NEW_REPEATS, &["kids/kids_details"], false);
        let flat = indexed_flat_dict(&dict);
        let keys: Vec<&str> = flat.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "info/age",
                "info/name",
                "kids/kids_details/kids_age",
                "kids/kids_details/kids_name",
                "kids/kids_details[2]/kids_age",
                "kids/kids_details[2]/kids_name",
                "kids/has_kids",
                "web_browsers",
                "gps",
            ]
        );
        assert_eq!(flat[4].1, "20");
    }

    #[test]
    fn test_indexed_scalar_list() {
        let dict = dict_for("<data><v>a</v><v>b</v><v>c</v></data>", &[], false);
        let paths: Vec<Vec<String>> = flatten_indexed(&dict, Vec::new())
            .map(|(path, _)| path)
            .collect();
        assert_eq!(
            paths,
            vec![
                vec!["data".to_string(), "v".to_string()],
                vec!["data".to_string(), "v[2]".to_string()],
                vec!["data".to_string(), "v[3]".to_string()],
            ]
        );
    }

    #[test]
    fn test_indexed_is_lazy() {
        let dict = dict_for(NEW_REPEATS, &["kids/kids_details"], false);
        let first = flatten_indexed(&dict, Vec::new()).next().unwrap();
        assert_eq!(first.0, vec!["new_repeats", "info", "age"]);
        assert_eq!(first.1, "80");
    }

    #[test]
    fn test_nested_repeats_relative_keys() {
        let dict = dict_for(NEW_REPEATS, &["kids/kids_details"], false);
        let flat = nested_flat_dict(&dict, RepeatKeys::Relative);

        assert_eq!(flat.get("info/age"), Some(&FlatValue::from("80")));
        assert_eq!(flat.get("kids/has_kids"), Some(&FlatValue::from("1")));
        assert_eq!(
            flat.get("gps"),
            Some(&FlatValue::from("-1.2627557 36.7926442 0.0 30.0"))
        );

        let rows = flat.get("kids/kids_details").and_then(FlatValue::as_rows).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].keys().collect::<Vec<_>>(), vec!["kids_age", "kids_name"]);
        assert_eq!(rows[1].get("kids_name"), Some(&FlatValue::from("Cain")));
    }

    #[test]
    fn test_nested_repeats_absolute_keys() {
        let dict = dict_for(NEW_REPEATS, &["kids/kids_details"], false);
        let flat = nested_flat_dict(&dict, RepeatKeys::Absolute);

        let rows = flat.get("kids/kids_details").and_then(FlatValue::as_rows).unwrap();
        assert_eq!(
            rows[0].keys().collect::<Vec<_>>(),
            vec!["kids/kids_details/kids_age", "kids/kids_details/kids_name"]
        );
    }

    #[test]
    fn test_group_inside_repeat_row() {
        let dict = dict_for(
            "<data><r><g><a>1</a></g><b>2</b></r></data>",
            &["r"],
            false,
        );
        let flat = nested_flat_dict(&dict, RepeatKeys::Relative);
        let rows = flat.get("r").and_then(FlatValue::as_rows).unwrap();
        assert_eq!(rows[0].keys().collect::<Vec<_>>(), vec!["g/a", "b"]);
    }

    #[test]
    fn test_repeat_inside_repeat_nests_one_level_per_row() {
        let dict = dict_for(
            "<data><hh><name>A</name><member><age>3</age></member><member><age>4</age></member></hh></data>",
            &["hh", "hh/member"],
            false,
        );

        let flat = nested_flat_dict(&dict, RepeatKeys::Relative);
        let households = flat.get("hh").and_then(FlatValue::as_rows).unwrap();
        assert_eq!(households.len(), 1);
        let members = households[0].get("member").and_then(FlatValue::as_rows).unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[1].get("age"), Some(&FlatValue::from("4")));

        let flat = nested_flat_dict(&dict, RepeatKeys::Absolute);
        let households = flat.get("hh").and_then(FlatValue::as_rows).unwrap();
        let members = households[0].get("hh/member").and_then(FlatValue::as_rows).unwrap();
        assert_eq!(members[0].get("hh/member/age"), Some(&FlatValue::from("3")));
    }

    #[test]
    fn test_scalar_rows_keyed_by_repeat() {
        let dict = dict_for("<data><g><v>2</v><v>test</v></g></data>", &[], false);

        let flat = nested_flat_dict(&dict, RepeatKeys::Relative);
        let rows = flat.get("g/v").and_then(FlatValue::as_rows).unwrap();
        assert_eq!(rows[1].get("v"), Some(&FlatValue::from("test")));

        let flat = nested_flat_dict(&dict, RepeatKeys::Absolute);
        let rows = flat.get("g/v").and_then(FlatValue::as_rows).unwrap();
        assert_eq!(rows[0].get("g/v"), Some(&FlatValue::from("2")));
    }

    #[test]
    fn test_encrypted_media_flatten() {
        let xml = r#"<data id="tutorial_encrypted" encrypted="yes"><base64EncryptedKey>ZJTc</base64EncryptedKey>
<media><file>1483528430996.jpg.enc</file></media>
<media><file>1483528445767.jpg.enc</file></media>
<encryptedXmlFile>submission.xml.enc</encryptedXmlFile></data>"#;
        let dict = dict_for(xml, &[], true);
        let flat = nested_flat_dict(&dict, RepeatKeys::Relative);

        let media = flat.get("media").and_then(FlatValue::as_rows).unwrap();
        assert_eq!(media.len(), 2);
        assert_eq!(media[0].get("file"), Some(&FlatValue::from("1483528430996.jpg.enc")));
        assert_eq!(media[1].get("file"), Some(&FlatValue::from("1483528445767.jpg.enc")));
    }
}
