//! Attribute harvesting.
//!
//! Every attribute on every element is collected in document order. Names
//! collide when form builders copy a template attribute onto several tags;
//! the first occurrence wins and later ones are reported back.

use crate::dom::Element;
use crate::options::ParseOptions;
use crate::value::OrderedMap;

/// Submission attributes by name, in document order.
pub type AttributeMap = OrderedMap<String>;

/// An attribute dropped because an earlier element already declared its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeCollision {
    pub name: String,
    /// The dropped value.
    pub value: String,
    /// The element that carried the dropped attribute.
    pub element: String,
}

/// A single harvested attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlAttribute<'a> {
    pub name: &'a str,
    pub value: &'a str,
    pub element: &'a str,
}

/// Pre-order iterator over every attribute below and including `root`.
pub fn all_attributes(root: &Element) -> AllAttributes<'_> {
    AllAttributes {
        stack: vec![root],
        current: None,
    }
}

pub struct AllAttributes<'a> {
    stack: Vec<&'a Element>,
    current: Option<(&'a Element, std::slice::Iter<'a, (String, String)>)>,
}

impl<'a> Iterator for AllAttributes<'a> {
    type Item = XmlAttribute<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((element, attrs)) = &mut self.current {
                let element: &'a Element = *element;
                if let Some((name, value)) = attrs.next() {
                    return Some(XmlAttribute {
                        name,
                        value,
                        element: element.name(),
                    });
                }
            }
            let element = self.stack.pop()?;
            let mut kids: Vec<&Element> = element.child_elements().collect();
            kids.reverse();
            self.stack.extend(kids);
            self.current = Some((element, element.attributes().iter()));
        }
    }
}

/// Build the first-wins attribute map for a submission.
pub fn collect_attributes(
    root: &Element,
    options: &ParseOptions,
) -> (AttributeMap, Vec<AttributeCollision>) {
    let mut map = AttributeMap::new();
    let mut collisions = Vec::new();
    for attr in all_attributes(root) {
        if options.skip_entity_attributes && attr.element == "entity" {
            continue;
        }
        if map.contains_key(attr.name) {
            collisions.push(AttributeCollision {
                name: attr.name.to_string(),
                value: attr.value.to_string(),
                element: attr.element.to_string(),
            });
            continue;
        }
        map.insert(attr.name, attr.value.to_string());
    }
    (map, collisions)
}
