//! Python extension module, built with the `python` feature.
//!
//! ```python
//! from xform_instance import parse_submission
//!
//! result = parse_submission(xml, repeat_xpaths=["kids/kids_details"])
//! result["flat_dict"]["kids/kids_details"][0]["kids_age"]
//! ```

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::error::ParseError;
use crate::meta::{get_deprecated_uuid_from_xml, get_uuid_from_xml, submission_date_or_none};
use crate::options::ParseOptions;
use crate::parser::XFormInstanceParser;
use crate::schema::FormSchema;
use crate::value::{Dict, FlatDict, FlatValue, Value};

impl From<ParseError> for PyErr {
    fn from(err: ParseError) -> Self {
        PyValueError::new_err(err.to_string())
    }
}

fn value_to_py(py: Python<'_>, value: &Value) -> PyResult<PyObject> {
    match value {
        Value::Text(text) => Ok(text.to_object(py)),
        Value::Group(dict) => Ok(dict_to_py(py, dict)?.into_any().unbind()),
        Value::Repeat(items) => {
            let list = PyList::empty_bound(py);
            for item in items {
                list.append(value_to_py(py, item)?)?;
            }
            Ok(list.into_any().unbind())
        }
    }
}

fn dict_to_py<'py>(py: Python<'py>, dict: &Dict) -> PyResult<Bound<'py, PyDict>> {
    let out = PyDict::new_bound(py);
    for (key, value) in dict {
        out.set_item(key, value_to_py(py, value)?)?;
    }
    Ok(out)
}

fn flat_dict_to_py<'py>(py: Python<'py>, flat: &FlatDict) -> PyResult<Bound<'py, PyDict>> {
    let out = PyDict::new_bound(py);
    for (key, value) in flat {
        match value {
            FlatValue::Text(text) => out.set_item(key, text)?,
            FlatValue::Repeat(rows) => {
                let list = PyList::empty_bound(py);
                for row in rows {
                    list.append(flat_dict_to_py(py, row)?)?;
                }
                out.set_item(key, list)?;
            }
        }
    }
    Ok(out)
}

/// Parse a submission and return everything the host stores for it.
///
/// Raises `ValueError` on malformed or empty submissions. An unparseable
/// `submissionDate` comes back as `None`.
#[pyfunction]
#[pyo3(signature = (xml_str, repeat_xpaths = Vec::new(), encrypted = false, skip_entity_attributes = true))]
fn parse_submission<'py>(
    py: Python<'py>,
    xml_str: &str,
    repeat_xpaths: Vec<String>,
    encrypted: bool,
    skip_entity_attributes: bool,
) -> PyResult<Bound<'py, PyDict>> {
    let schema = FormSchema::new()
        .with_repeats(repeat_xpaths)
        .with_encrypted(encrypted);
    let options = ParseOptions::default().with_skip_entity_attributes(skip_entity_attributes);
    let parser = XFormInstanceParser::with_options(xml_str, &schema, options)?;

    let attributes = PyDict::new_bound(py);
    for (name, value) in parser.attributes() {
        attributes.set_item(name, value)?;
    }

    let result = PyDict::new_bound(py);
    result.set_item("dict", dict_to_py(py, parser.to_dict())?)?;
    result.set_item("flat_dict", flat_dict_to_py(py, parser.to_flat_dict())?)?;
    result.set_item("root_node_name", parser.root_node_name())?;
    result.set_item("attributes", attributes)?;
    result.set_item("uuid", get_uuid_from_xml(xml_str)?)?;
    result.set_item("deprecated_uuid", get_deprecated_uuid_from_xml(xml_str)?)?;
    result.set_item("submission_date", submission_date_or_none(xml_str)?)?;
    Ok(result)
}

#[pymodule]
fn xform_instance(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(parse_submission, m)?)?;
    Ok(())
}
