//! # Task parameters.
//!
//! [`Params`] holds either a structured parameter document or a plain string.
//! The two populated forms are mutually exclusive by construction; the enum
//! makes the invariant unrepresentable rather than checked.

use serde_json::Value;

use crate::error::FlumeError;

/// Parameters attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Params {
    /// No parameters.
    #[default]
    None,
    /// Plain-text parameters, passed to the engine verbatim.
    Text(String),
    /// Structured parameter document, serialized to compact JSON before
    /// being handed to the execution environment.
    Doc(Value),
}

impl Params {
    /// `true` if no parameters are set.
    pub fn is_none(&self) -> bool {
        matches!(self, Params::None)
    }

    /// Returns the plain-text form, if that is what this holds.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Params::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Normalizes into the single string form handed to the engine.
    ///
    /// `None` becomes the empty string; `Doc` is serialized to compact JSON.
    /// Serialization failure is a [`FlumeError::Runtime`]: the task is
    /// finalized as failed, the supplier is unaffected.
    pub fn normalize(&self) -> Result<String, FlumeError> {
        match self.normalize_opt()? {
            Some(s) => Ok(s),
            None => Ok(String::new()),
        }
    }

    /// Like [`Params::normalize`], but distinguishes "no parameters" from an
    /// empty string. Used by the wire encoder to omit the field entirely.
    pub(crate) fn normalize_opt(&self) -> Result<Option<String>, FlumeError> {
        match self {
            Params::None => Ok(None),
            Params::Text(s) => Ok(Some(s.clone())),
            Params::Doc(doc) => serde_json::to_string(doc).map(Some).map_err(|e| {
                FlumeError::runtime(format!("could not serialize parameter document: {e}"))
            }),
        }
    }
}

impl From<&str> for Params {
    fn from(s: &str) -> Self {
        Params::Text(s.to_string())
    }
}

impl From<String> for Params {
    fn from(s: String) -> Self {
        Params::Text(s)
    }
}
