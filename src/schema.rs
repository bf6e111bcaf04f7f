//! Form schema answers needed by the parser.
//!
//! The parser only asks two questions of a form: which abbreviated xpaths are
//! repeats, and whether submissions are encrypted. [`FormSchema`] answers
//! them, built by hand or read from an XForm definition.

use std::collections::{BTreeSet, HashSet};

use log::debug;

use crate::dom::{parse_document, Element};
use crate::error::Result;

/// What the parser needs to know about a form.
pub trait Schema {
    /// Abbreviated xpaths of every repeat in the form.
    fn repeat_xpaths(&self) -> HashSet<String>;

    fn is_encrypted(&self) -> bool;
}

impl<S: Schema + ?Sized> Schema for &S {
    fn repeat_xpaths(&self) -> HashSet<String> {
        (**self).repeat_xpaths()
    }

    fn is_encrypted(&self) -> bool {
        (**self).is_encrypted()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSchema {
    repeats: BTreeSet<String>,
    geopoints: Vec<String>,
    numeric: BTreeSet<String>,
    encrypted: bool,
    id_string: Option<String>,
    version: Option<String>,
}

impl FormSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repeat(mut self, xpath: impl Into<String>) -> Self {
        self.repeats.insert(xpath.into());
        self
    }

    pub fn with_repeats<I, S>(mut self, xpaths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.repeats.extend(xpaths.into_iter().map(Into::into));
        self
    }

    pub fn with_encrypted(mut self, encrypted: bool) -> Self {
        self.encrypted = encrypted;
        self
    }

    pub fn with_geopoint(mut self, xpath: impl Into<String>) -> Self {
        self.geopoints.push(xpath.into());
        self
    }

    pub fn with_numeric(mut self, xpath: impl Into<String>) -> Self {
        self.numeric.insert(xpath.into());
        self
    }

    /// Read a schema from an XForm definition.
    ///
    /// Repeats come from `<repeat nodeset>` in the body, field types from
    /// `<bind type>` in the model, and a `<submission base64RsaPublicKey>`
    /// marks the form as encrypted.
    pub fn from_xform(xform_xml: &str) -> Result<Self> {
        let doc = parse_document(xform_xml)?;
        let mut schema = FormSchema::new();

        for el in doc.root().descendants() {
            match el.local_name() {
                "repeat" => {
                    if let Some(xpath) = el.attribute("nodeset").and_then(abbreviate_nodeset) {
                        schema.repeats.insert(xpath);
                    }
                }
                "bind" => {
                    let Some(xpath) = el.attribute("nodeset").and_then(abbreviate_nodeset) else {
                        continue;
                    };
                    match el.attribute("type").map(local_type) {
                        Some("geopoint") => schema.geopoints.push(xpath),
                        Some("int" | "integer" | "decimal") => {
                            schema.numeric.insert(xpath);
                        }
                        _ => {}
                    }
                }
                "submission" => {
                    if el
                        .attribute("base64RsaPublicKey")
                        .is_some_and(|key| !key.trim().is_empty())
                    {
                        schema.encrypted = true;
                    }
                }
                "instance" if schema.id_string.is_none() && el.attribute("id").is_none() => {
                    if let Some(data) = el.child_elements().next() {
                        schema.read_instance_root(data);
                    }
                }
                _ => {}
            }
        }

        debug!(
            "read xform {:?}: {} repeats, {} geopoints, encrypted={}",
            schema.id_string,
            schema.repeats.len(),
            schema.geopoints.len(),
            schema.encrypted
        );
        Ok(schema)
    }

    fn read_instance_root(&mut self, data: &Element) {
        self.id_string = data.attribute("id").map(str::to_string);
        self.version = data.attribute("version").map(str::to_string);
    }

    /// Form id declared on the primary instance root.
    pub fn id_string(&self) -> Option<&str> {
        self.id_string.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Abbreviated xpaths of `geopoint` fields, in form order.
    pub fn geopoint_xpaths(&self) -> &[String] {
        &self.geopoints
    }

    /// Abbreviated xpaths of integer and decimal fields.
    pub fn numeric_xpaths(&self) -> HashSet<String> {
        self.numeric.iter().cloned().collect()
    }
}

impl Schema for FormSchema {
    fn repeat_xpaths(&self) -> HashSet<String> {
        self.repeats.iter().cloned().collect()
    }

    fn is_encrypted(&self) -> bool {
        self.encrypted
    }
}

/// `/data/kids/kids_details` -> `kids/kids_details`.
///
/// Relative nodesets are returned unchanged; the root nodeset itself has no
/// abbreviated form.
fn abbreviate_nodeset(nodeset: &str) -> Option<String> {
    let Some(absolute) = nodeset.strip_prefix('/') else {
        return (!nodeset.is_empty()).then(|| nodeset.to_string());
    };
    absolute
        .split_once('/')
        .map(|(_, rest)| rest.to_string())
        .filter(|rest| !rest.is_empty())
}

/// `xsd:int` -> `int`.
fn local_type(ty: &str) -> &str {
    ty.rsplit(':').next().unwrap_or(ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    const XFORM: &str = r#"<?xml version="1.0"?>
<h:html xmlns="http://www.w3.org/2002/xforms" xmlns:h="http://www.w3.org/1999/xhtml" xmlns:jr="http://openrosa.org/javarosa">
  <h:head>
    <h:title>new_repeats</h:title>
    <model>
      <instance>
        <new_repeats id="new_repeats" version="2012070514">
          <info><name/><age/></info>
          <kids><has_kids/><kids_details jr:template=""><kids_name/><kids_age/></kids_details></kids>
          <gps/>
          <meta><instanceID/></meta>
        </new_repeats>
      </instance>
      <instance id="choices"><root><item/></root></instance>
      <bind nodeset="/new_repeats/info/name" type="string"/>
      <bind nodeset="/new_repeats/info/age" type="int"/>
      <bind nodeset="/new_repeats/kids/kids_details/kids_age" type="decimal"/>
      <bind nodeset="/new_repeats/gps" type="geopoint"/>
      <submission method="post" base64RsaPublicKey="MIIBIjANBgkq"/>
    </model>
  </h:head>
  <h:body>
    <group ref="/new_repeats/kids">
      <repeat nodeset="/new_repeats/kids/kids_details">
        <input ref="/new_repeats/kids/kids_details/kids_name"/>
      </repeat>
    </group>
  </h:body>
</h:html>"#;

    #[test]
    fn test_from_xform() {
        let schema = FormSchema::from_xform(XFORM).unwrap();

        assert_eq!(
            schema.repeat_xpaths(),
            HashSet::from(["kids/kids_details".to_string()])
        );
        assert!(schema.is_encrypted());
        assert_eq!(schema.geopoint_xpaths(), &["gps".to_string()]);
        assert_eq!(
            schema.numeric_xpaths(),
            HashSet::from(["info/age".to_string(), "kids/kids_details/kids_age".to_string()])
        );
        assert_eq!(schema.id_string(), Some("new_repeats"));
        assert_eq!(schema.version(), Some("2012070514"));
    }

    #[test]
    fn test_unencrypted_xform() {
        let xform = r#"<h:html xmlns:h="x"><h:head><model><instance><data id="f"><a/></data></instance><submission method="post"/></model></h:head><h:body/></h:html>"#;
        let schema = FormSchema::from_xform(xform).unwrap();
        assert!(!schema.is_encrypted());
        assert!(schema.repeat_xpaths().is_empty());
        assert_eq!(schema.id_string(), Some("f"));
    }

    #[test]
    fn test_builder() {
        let schema = FormSchema::new()
            .with_repeats(["a", "a/b"])
            .with_repeat("c")
            .with_encrypted(true);
        assert_eq!(schema.repeat_xpaths().len(), 3);
        assert!(schema.is_encrypted());
    }

    #[test]
    fn test_abbreviate_nodeset() {
        assert_eq!(abbreviate_nodeset("/data/a/b"), Some("a/b".to_string()));
        assert_eq!(abbreviate_nodeset("/data/a"), Some("a".to_string()));
        assert_eq!(abbreviate_nodeset("/data"), None);
        assert_eq!(abbreviate_nodeset("a/b"), Some("a/b".to_string()));
        assert_eq!(abbreviate_nodeset(""), None);
    }

    #[test]
    fn test_schema_by_reference() {
        fn encrypted(schema: impl Schema) -> bool {
            schema.is_encrypted()
        }
        let schema = FormSchema::new().with_encrypted(true);
        assert!(encrypted(&schema));
    }
}
