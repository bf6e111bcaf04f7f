//! Node-to-dict conversion.
//!
//! Walks the element tree children-first and decides, per child, whether it
//! is stored as a single value or accumulated into a list.

use std::collections::HashSet;

use crate::dom::{abbreviated_xpath, Element, Node};
use crate::value::{Dict, Value};

/// Repeat classification inputs, passed unchanged down the recursion.
#[derive(Debug, Clone, Copy)]
pub struct RepeatRules<'a> {
    /// Abbreviated xpaths the schema declares as repeats.
    pub repeats: &'a HashSet<String>,
    /// Encrypted forms list every attachment as a `media` element.
    pub encrypted: bool,
}

impl RepeatRules<'_> {
    pub fn is_repeat(&self, xpath: &str, name: &str) -> bool {
        self.repeats.contains(xpath) || (self.encrypted && name == "media")
    }
}

/// Convert an element into a single-entry dict `{name: value}`.
///
/// Returns `None` when the element carries no data.
pub fn xml_node_to_dict(
    element: &Element,
    repeats: &HashSet<String>,
    encrypted: bool,
) -> Option<Dict> {
    let rules = RepeatRules { repeats, encrypted };
    let value = node_value(element, &rules, &[])?;
    let mut dict = Dict::new();
    dict.insert(element.name(), value);
    Some(dict)
}

/// The value stored under an element's name. `ancestors` runs from the root
/// element down to the element's parent.
pub(crate) fn node_value(
    element: &Element,
    rules: &RepeatRules<'_>,
    ancestors: &[&str],
) -> Option<Value> {
    let children = element.children();
    match children {
        [] => return None,
        [Node::Text(text)] => return Some(Value::Text(text.clone())),
        _ => {}
    }
    if let Some(cdata) = children.iter().find_map(|c| match c {
        Node::CData(text) => Some(text),
        _ => None,
    }) {
        return Some(Value::Text(cdata.clone()));
    }

    let mut path: Vec<&str> = ancestors.to_vec();
    path.push(element.name());

    let mut value = Dict::new();
    for child in element.child_elements() {
        let Some(child_value) = node_value(child, rules, &path) else {
            continue;
        };
        let child_name = child.name();
        let child_xpath = abbreviated_xpath(&path, child_name);

        if rules.is_repeat(&child_xpath, child_name) {
            append(&mut value, child_name, child_value);
        } else if let Some(existing) = value.get_mut(child_name) {
            // Repeated without a declaration: aggregate anyway.
            push_promoted(existing, child_value);
        } else {
            value.insert(child_name, child_value);
        }
    }

    if value.is_empty() {
        None
    } else {
        Some(Value::Group(value))
    }
}

fn append(value: &mut Dict, name: &str, item: Value) {
    match value.get_mut(name) {
        Some(existing) => push_promoted(existing, item),
        None => {
            value.insert(name, Value::Repeat(vec![item]));
        }
    }
}

/// Append `item` to `existing`, first turning a single value into a list.
fn push_promoted(existing: &mut Value, item: Value) {
    match existing {
        Value::Repeat(items) => items.push(item),
        other => {
            let first = std::mem::replace(other, Value::Repeat(Vec::new()));
            *other = Value::Repeat(vec![first, item]);
        }
    }
}
