//! Server → Client messages.

use crate::error::ServerError;
use crate::value::{Metadata, Value};

use super::sig;

/// A decoded response message.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// RECORD - one row of a streamed result
    Record(Vec<Value>),
    /// SUCCESS - the request completed
    Success(Metadata),
    /// FAILURE - the request failed
    Failure(Metadata),
    /// IGNORED - the request was skipped because of an earlier failure
    Ignored,
}

impl Response {
    /// Get the message signature byte.
    pub fn signature(&self) -> u8 {
        match self {
            Response::Record(_) => sig::RECORD,
            Response::Success(_) => sig::SUCCESS,
            Response::Failure(_) => sig::FAILURE,
            Response::Ignored => sig::IGNORED,
        }
    }

    /// Get message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Response::Record(_) => "RECORD",
            Response::Success(_) => "SUCCESS",
            Response::Failure(_) => "FAILURE",
            Response::Ignored => "IGNORED",
        }
    }

    /// Build a FAILURE response from a code and message.
    pub fn failure(code: &str, message: &str) -> Self {
        let mut meta = Metadata::new();
        meta.insert("code".to_string(), Value::from(code));
        meta.insert("message".to_string(), Value::from(message));
        Response::Failure(meta)
    }
}

/// Translate FAILURE metadata into a [`ServerError`].
///
/// Missing entries become empty strings, which classify as a database error.
pub fn server_error(meta: &Metadata) -> ServerError {
    let code = meta.get("code").and_then(Value::as_str).unwrap_or_default();
    let message = meta
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();
    ServerError::new(code, message)
}
