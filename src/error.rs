//! Errors raised while parsing a submission.
//!
//! Every variant is a terminal failure for that one submission; nothing is
//! retried. Duplicate attributes are not errors, see
//! [`AttributeCollision`](crate::AttributeCollision).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    /// The input is not well-formed XML.
    #[error("malformed XML: {0}")]
    MalformedXml(String),

    /// Well-formed input without a root element.
    #[error("XML string must have a survey element")]
    EmptyDocument,

    /// The root element converts to nothing: every leaf is empty.
    #[error("Empty instance")]
    EmptyInstance,

    /// The root element has no `id` attribute.
    #[error("submission is missing the required `id` attribute")]
    MissingIdString,

    /// The root `submissionDate` attribute is not a recognisable datetime.
    #[error("invalid submissionDate {value:?}: {source}")]
    InvalidSubmissionDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl From<quick_xml::Error> for ParseError {
    fn from(e: quick_xml::Error) -> Self {
        ParseError::MalformedXml(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ParseError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        ParseError::MalformedXml(e.to_string())
    }
}

impl From<std::str::Utf8Error> for ParseError {
    fn from(e: std::str::Utf8Error) -> Self {
        ParseError::MalformedXml(e.to_string())
    }
}

pub type Result<T, E = ParseError> = std::result::Result<T, E>;
