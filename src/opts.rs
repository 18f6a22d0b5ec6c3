//! Connection options.

use url::Url;

use crate::error::Error;
use crate::protocol::AuthToken;

/// Default user agent sent with INIT.
pub const DEFAULT_USER_AGENT: &str = concat!("zero-bolt/", env!("CARGO_PKG_VERSION"));

/// Connection options for a Bolt server.
#[derive(Debug, Clone)]
pub struct Opts {
    /// Hostname or IP address.
    ///
    /// Default: `""`
    pub host: String,

    /// Port number of the Bolt listener.
    ///
    /// Default: `7687`
    pub port: u16,

    /// Username for authentication. Empty means no authentication.
    ///
    /// Default: `""`
    pub user: String,

    /// Password for authentication.
    ///
    /// Default: `None`
    pub password: Option<String>,

    /// Client name reported to the server during the handshake.
    ///
    /// Default: `None` (uses [`DEFAULT_USER_AGENT`])
    pub user_agent: Option<String>,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 7687,
            user: String::new(),
            password: None,
            user_agent: None,
        }
    }
}

impl Opts {
    /// Credentials for the INIT message.
    pub fn auth_token(&self) -> AuthToken {
        if self.user.is_empty() {
            AuthToken::none()
        } else {
            AuthToken::basic(
                self.user.as_str(),
                self.password.as_deref().unwrap_or_default(),
            )
        }
    }

    /// Client name for the INIT message.
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    /// `host:port`, used to label connection logs.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl TryFrom<&Url> for Opts {
    type Error = Error;

    /// Parse a Bolt connection URL.
    ///
    /// Format: `bolt://[user[:password]@]host[:port][?user_agent=value]`
    ///
    /// The `neo4j://` scheme is accepted as an alias.
    fn try_from(url: &Url) -> Result<Self, Self::Error> {
        if !["bolt", "neo4j"].contains(&url.scheme()) {
            return Err(Error::InvalidUsage(format!(
                "Invalid scheme: expected 'bolt://' or 'neo4j://', got '{}://'",
                url.scheme()
            )));
        }

        let mut opts = Opts {
            host: url.host_str().unwrap_or("localhost").to_string(),
            port: url.port().unwrap_or(7687),
            user: url.username().to_string(),
            password: url.password().map(|s| s.to_string()),
            ..Opts::default()
        };

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "user_agent" => {
                    if value.is_empty() {
                        return Err(Error::InvalidUsage("Invalid user_agent: empty".into()));
                    }
                    opts.user_agent = Some(value.to_string());
                }
                _ => {
                    return Err(Error::InvalidUsage(format!(
                        "Unknown connection parameter: {}",
                        key
                    )));
                }
            }
        }

        Ok(opts)
    }
}

impl TryFrom<&str> for Opts {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let url = Url::parse(s).map_err(|e| Error::InvalidUsage(format!("Invalid URL: {}", e)))?;
        Self::try_from(&url)
    }
}
