//! Parser for ODK/XForms submission XML.
//!
//! A submission is parsed once into a nested dict that mirrors the XML tree
//! and a flat dict keyed by abbreviated xpath. Repeats declared by the form
//! schema always become lists.
//!
//! ```
//! use xform_instance::{FlatValue, FormSchema, XFormInstanceParser};
//!
//! let xml = r#"<data id="household"><name>Ann</name>
//!     <member><age>30</age></member><member><age>4</age></member></data>"#;
//! let schema = FormSchema::new().with_repeat("member");
//! let parser = XFormInstanceParser::new(xml, &schema)?;
//!
//! assert_eq!(parser.get("name"), Some(&FlatValue::from("Ann")));
//! let members = parser.get("member").and_then(FlatValue::as_rows).unwrap();
//! assert_eq!(members[1].get("age"), Some(&FlatValue::from("4")));
//! # Ok::<(), xform_instance::ParseError>(())
//! ```

pub mod attributes;
pub mod convert;
pub mod dom;
pub mod error;
pub mod flatten;
pub mod geom;
pub mod meta;
pub mod numeric;
pub mod options;
pub mod parser;
pub mod schema;
pub mod value;

#[cfg(feature = "python")]
mod python;

pub use attributes::{AttributeCollision, AttributeMap};
pub use error::{ParseError, Result};
pub use geom::GeoPoint;
pub use meta::{
    get_deprecated_uuid_from_xml, get_id_string_from_xml, get_meta_value,
    get_submission_date_from_xml, get_uuid_from_xml,
};
pub use numeric::{numeric_checker, numeric_converter, NumericValue};
pub use options::{ParseOptions, RepeatKeys};
pub use parser::{
    parse_xform_instance, xform_instance_to_dict, xform_instance_to_flat_dict,
    XFormInstanceParser, VERSION, XFORM_ID_STRING,
};
pub use schema::{FormSchema, Schema};
pub use value::{Dict, FlatDict, FlatValue, OrderedMap, Value};
