//! Client → Server messages.

use std::fmt;

use crate::value::{Metadata, Value};

use super::sig;

/// Credentials sent with INIT.
#[derive(Clone, PartialEq)]
pub struct AuthToken {
    /// Authentication scheme (`basic` or `none`)
    pub scheme: String,
    /// Principal (user name)
    pub principal: Option<String>,
    /// Credentials (password)
    pub credentials: Option<String>,
}

impl AuthToken {
    /// Basic user/password authentication.
    pub fn basic(principal: impl Into<String>, credentials: impl Into<String>) -> Self {
        Self {
            scheme: "basic".to_string(),
            principal: Some(principal.into()),
            credentials: Some(credentials.into()),
        }
    }

    /// No authentication.
    pub fn none() -> Self {
        Self {
            scheme: "none".to_string(),
            principal: None,
            credentials: None,
        }
    }

    /// Convert to the metadata map carried by INIT.
    pub fn to_metadata(&self) -> Metadata {
        let mut map = Metadata::new();
        map.insert("scheme".to_string(), Value::from(self.scheme.as_str()));
        if let Some(principal) = &self.principal {
            map.insert("principal".to_string(), Value::from(principal.as_str()));
        }
        if let Some(credentials) = &self.credentials {
            map.insert("credentials".to_string(), Value::from(credentials.as_str()));
        }
        map
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("scheme", &self.scheme)
            .field("principal", &self.principal)
            .field("credentials", &self.credentials.as_ref().map(|_| "***"))
            .finish()
    }
}

/// A request message.
///
/// Requests carry no correlation id: the Nth request sent is answered by
/// the Nth response received.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// INIT - handshake with client name and credentials
    Init {
        /// User agent reported to the server
        client_name: String,
        /// Credentials
        auth: AuthToken,
    },
    /// RUN - execute a statement
    Run {
        /// Statement text
        statement: String,
        /// Statement parameters
        parameters: Metadata,
    },
    /// PULL_ALL - stream all records of the last RUN
    PullAll,
    /// DISCARD_ALL - drop all records of the last RUN
    DiscardAll,
    /// RESET - abandon pending work and return to a ready state
    Reset,
    /// ACK_FAILURE - acknowledge a FAILURE so the server accepts new work
    AckFailure,
}

impl Request {
    /// Create a RUN message.
    pub fn run(statement: impl Into<String>, parameters: Metadata) -> Self {
        Request::Run {
            statement: statement.into(),
            parameters,
        }
    }

    /// Get the message signature byte.
    pub fn signature(&self) -> u8 {
        match self {
            Request::Init { .. } => sig::INIT,
            Request::Run { .. } => sig::RUN,
            Request::PullAll => sig::PULL_ALL,
            Request::DiscardAll => sig::DISCARD_ALL,
            Request::Reset => sig::RESET,
            Request::AckFailure => sig::ACK_FAILURE,
        }
    }

    /// Get message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Request::Init { .. } => "INIT",
            Request::Run { .. } => "RUN",
            Request::PullAll => "PULL_ALL",
            Request::DiscardAll => "DISCARD_ALL",
            Request::Reset => "RESET",
            Request::AckFailure => "ACK_FAILURE",
        }
    }

    /// Returns true if the SUCCESS answering this request carries field keys
    /// rather than a summary.
    pub fn is_run(&self) -> bool {
        matches!(self, Request::Run { .. })
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Run { statement, .. } => write!(f, "RUN `{statement}`"),
            _ => f.write_str(self.name()),
        }
    }
}
