//! The submission parser facade.
//!
//! [`XFormInstanceParser`] runs the whole pipeline once at construction:
//! parse, convert the root to a nested dict, flatten it, and harvest the
//! attributes. Everything after that is a read-only view.

use log::{debug, trace};

use crate::attributes::{collect_attributes, AttributeCollision, AttributeMap};
use crate::convert::xml_node_to_dict;
use crate::dom::{parse_document, Element};
use crate::error::{ParseError, Result};
use crate::flatten::{indexed_flat_dict, nested_flat_dict};
use crate::geom::{extract_geopoints, GeoPoint};
use crate::options::ParseOptions;
use crate::schema::Schema;
use crate::value::{Dict, FlatDict, FlatValue};

/// Flat dict key holding the form id string.
pub const XFORM_ID_STRING: &str = "_xform_id_string";
/// Flat dict key holding the form version, when the submission has one.
pub const VERSION: &str = "_version";

#[derive(Debug, Clone)]
pub struct XFormInstanceParser {
    root: Element,
    dict: Dict,
    flat_dict: FlatDict,
    attributes: AttributeMap,
    collisions: Vec<AttributeCollision>,
}

impl XFormInstanceParser {
    /// Parse `xml` with the default options.
    pub fn new(xml: &str, schema: &impl Schema) -> Result<Self> {
        Self::with_options(xml, schema, ParseOptions::default())
    }

    pub fn with_options(xml: &str, schema: &impl Schema, options: ParseOptions) -> Result<Self> {
        let root = parse_document(xml)?.into_root();
        let repeats = schema.repeat_xpaths();
        let encrypted = schema.is_encrypted();
        trace!(
            "parsing <{}> with {} repeats, encrypted={encrypted}",
            root.name(),
            repeats.len()
        );

        let dict =
            xml_node_to_dict(&root, &repeats, encrypted).ok_or(ParseError::EmptyInstance)?;
        let flat_dict = nested_flat_dict(&dict, options.repeat_keys);

        let (attributes, collisions) = collect_attributes(&root, &options);
        for collision in &collisions {
            debug!(
                "Skipping duplicate attribute: {} with value {}",
                collision.name, collision.value
            );
        }

        Ok(XFormInstanceParser {
            root,
            dict,
            flat_dict,
            attributes,
            collisions,
        })
    }

    /// The nested dict, `{root_tag: {...}}`.
    pub fn to_dict(&self) -> &Dict {
        &self.dict
    }

    pub fn to_flat_dict(&self) -> &FlatDict {
        &self.flat_dict
    }

    /// Flat dict lookup by abbreviated xpath.
    pub fn get(&self, abbreviated_xpath: &str) -> Option<&FlatValue> {
        self.flat_dict.get(abbreviated_xpath)
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_node_name(&self) -> &str {
        self.root.name()
    }

    /// Every attribute in the submission, first occurrence of a name wins.
    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// Attributes dropped because their name was already taken.
    pub fn attribute_collisions(&self) -> &[AttributeCollision] {
        &self.collisions
    }

    /// The submission's form `id`. Every valid submission carries one.
    pub fn xform_id_string(&self) -> Result<&str> {
        self.attributes
            .get("id")
            .map(String::as_str)
            .ok_or(ParseError::MissingIdString)
    }

    pub fn version(&self) -> Option<&str> {
        self.attributes.get("version").map(String::as_str)
    }

    /// The flat dict plus the form id string and, when set, the version.
    ///
    /// This is the per-submission record handed to storage.
    pub fn flat_dict_with_attributes(&self) -> Result<FlatDict> {
        let mut result = self.flat_dict.clone();
        result.insert(XFORM_ID_STRING, FlatValue::from(self.xform_id_string()?));
        if let Some(version) = self.version().filter(|v| !v.is_empty()) {
            result.insert(VERSION, FlatValue::from(version));
        }
        Ok(result)
    }

    /// Flat view with one path per leaf, later repeat iterations suffixed
    /// `[n]`.
    pub fn indexed_flat_dict(&self) -> Vec<(String, String)> {
        indexed_flat_dict(&self.dict)
    }

    /// Geopoints answered for `geo_xpaths`; `None` when an answer does not
    /// parse.
    pub fn geopoints(&self, geo_xpaths: &[String]) -> Option<Vec<GeoPoint>> {
        extract_geopoints(&self.dict, geo_xpaths)
    }
}

pub fn xform_instance_to_dict(xml: &str, schema: &impl Schema) -> Result<Dict> {
    XFormInstanceParser::new(xml, schema).map(|parser| parser.dict)
}

pub fn xform_instance_to_flat_dict(xml: &str, schema: &impl Schema) -> Result<FlatDict> {
    XFormInstanceParser::new(xml, schema).map(|parser| parser.flat_dict)
}

/// Flat dict with the id string and version attached.
pub fn parse_xform_instance(xml: &str, schema: &impl Schema) -> Result<FlatDict> {
    XFormInstanceParser::new(xml, schema)?.flat_dict_with_attributes()
}
