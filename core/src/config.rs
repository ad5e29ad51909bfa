//! Connection configuration shared by every call issued through one handler.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Header Keptn's API gateway reads the API token from.
pub const DEFAULT_AUTH_HEADER: &str = "x-token";

pub const ENV_ENDPOINT: &str = "KEPTN_ENDPOINT";
pub const ENV_API_TOKEN: &str = "KEPTN_API_TOKEN";
pub const ENV_AUTH_HEADER: &str = "KEPTN_AUTH_HEADER";
pub const ENV_SCHEME: &str = "KEPTN_SCHEME";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    Http,
    #[default]
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            _ => Err(ConfigError::InvalidScheme(s.to_string())),
        }
    }
}

/// Where to reach the Keptn API and how to authenticate against it.
///
/// The host is stored without its scheme; `base_url` joins the two back
/// together. Auth is attached to a request only when both the header name
/// and the token are non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    host: String,
    scheme: Scheme,
    auth_header: String,
    auth_token: String,
    timeout: Option<Duration>,
}

impl ClientConfig {
    /// Build a config for `base_url`. A leading `http://` or `https://` is
    /// stripped and picks the scheme; without one the scheme is `https`.
    pub fn new(base_url: &str) -> Self {
        let (scheme, rest) = if let Some(rest) = base_url.strip_prefix("http://") {
            (Scheme::Http, rest)
        } else if let Some(rest) = base_url.strip_prefix("https://") {
            (Scheme::Https, rest)
        } else {
            (Scheme::default(), base_url)
        };
        Self {
            host: rest.trim_end_matches('/').to_string(),
            scheme,
            auth_header: DEFAULT_AUTH_HEADER.to_string(),
            auth_token: String::new(),
            timeout: None,
        }
    }

    /// Read the config from `KEPTN_ENDPOINT`, `KEPTN_API_TOKEN`,
    /// `KEPTN_AUTH_HEADER` and `KEPTN_SCHEME`. Only the endpoint is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let endpoint = lookup(ENV_ENDPOINT)
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingVar(ENV_ENDPOINT))?;
        let mut config = Self::new(&endpoint);
        if let Some(scheme) = lookup(ENV_SCHEME).filter(|v| !v.is_empty()) {
            config.scheme = scheme.parse()?;
        }
        if let Some(header) = lookup(ENV_AUTH_HEADER).filter(|v| !v.is_empty()) {
            config.auth_header = header;
        }
        if let Some(token) = lookup(ENV_API_TOKEN) {
            config.auth_token = token;
        }
        Ok(config)
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_auth(mut self, header: impl Into<String>, token: impl Into<String>) -> Self {
        self.auth_header = header.into();
        self.auth_token = token.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = token.into();
        self
    }

    /// Overall per-request timeout applied by the default transport.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }

    /// The `(name, value)` auth header pair, if both parts are set.
    pub fn auth(&self) -> Option<(&str, &str)> {
        if self.auth_header.is_empty() || self.auth_token.is_empty() {
            return None;
        }
        Some((self.auth_header.as_str(), self.auth_token.as_str()))
    }
}

// Hand-written so the token never ends up in logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("scheme", &self.scheme)
            .field("auth_header", &self.auth_header)
            .field("auth_token", &if self.auth_token.is_empty() { "" } else { "***" })
            .field("timeout", &self.timeout)
            .finish()
    }
}
