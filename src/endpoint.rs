use std::fmt;

use thiserror::Error;

/// Path of the backend's live state socket.
pub const STATE_API_PATH: &str = "/api/v1/state";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("page origin {0:?} has no scheme (expected http:// or https://)")]
    MissingScheme(String),

    #[error("unsupported page scheme {0:?} (expected http or https)")]
    UnsupportedScheme(String),

    #[error("page origin {0:?} has no host")]
    MissingHost(String),
}

/// Websocket URL of the backend's state API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: String,
}

impl Endpoint {
    /// Derive the endpoint from the page the console is served from.
    ///
    /// `https` maps to `wss` and `http` to `ws`; the host (with port) is kept
    /// and any path, query or fragment on the origin is dropped.
    pub fn from_page_origin(origin: &str) -> Result<Self, EndpointError> {
        let origin = origin.trim();
        let (scheme, rest) = origin
            .split_once("://")
            .ok_or_else(|| EndpointError::MissingScheme(origin.to_string()))?;

        let socket_scheme = match scheme.to_ascii_lowercase().as_str() {
            "https" => "wss",
            "http" => "ws",
            _ => return Err(EndpointError::UnsupportedScheme(scheme.to_string())),
        };

        let host = rest
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default();
        if host.is_empty() {
            return Err(EndpointError::MissingHost(origin.to_string()));
        }

        Ok(Self {
            url: format!("{}://{}{}", socket_scheme, host, STATE_API_PATH),
        })
    }

    pub fn is_secure(&self) -> bool {
        self.url.starts_with("wss://")
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}
