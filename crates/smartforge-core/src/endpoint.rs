//! Field-bus endpoint addresses.
//!
//! Format: `scheme://host[:port]`, e.g. `opc.tcp://plc-01:4840`. A bare
//! `host[:port]` is accepted and given the [`DEFAULT_SCHEME`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scheme assumed when an address has none.
pub const DEFAULT_SCHEME: &str = "opc.tcp";

/// A parsed field-bus endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    scheme: String,
    host: String,
    port: Option<u16>,
}

impl Endpoint {
    /// An endpoint from already-validated parts.
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port,
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, authority) = match s.split_once("://") {
            Some((scheme, rest)) => (scheme, rest),
            None => (DEFAULT_SCHEME, s),
        };
        if scheme.is_empty() {
            return Err(EndpointParseError::EmptyScheme);
        }

        let authority = authority.trim_end_matches('/');
        if authority.contains('/') {
            return Err(EndpointParseError::UnexpectedPath(s.to_string()));
        }

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| EndpointParseError::InvalidPort(port.to_string()))?;
                (host, Some(port))
            }
            None => (authority, None),
        };
        if host.is_empty() {
            return Err(EndpointParseError::EmptyHost);
        }

        Ok(Self::new(scheme, host, port))
    }
}

impl TryFrom<String> for Endpoint {
    type Error = EndpointParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}

/// Error parsing an endpoint string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointParseError {
    #[error("endpoint scheme cannot be empty")]
    EmptyScheme,
    #[error("endpoint host cannot be empty")]
    EmptyHost,
    #[error("invalid endpoint port: {0}")]
    InvalidPort(String),
    #[error("endpoint must not contain a path, got: {0}")]
    UnexpectedPath(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full() {
        let ep: Endpoint = "opc.tcp://plc-01:4840".parse().unwrap();
        assert_eq!(ep.scheme(), "opc.tcp");
        assert_eq!(ep.host(), "plc-01");
        assert_eq!(ep.port(), Some(4840));
    }

    #[test]
    fn bare_host_gets_default_scheme() {
        let ep: Endpoint = "localhost:4840".parse().unwrap();
        assert_eq!(ep.scheme(), DEFAULT_SCHEME);
        assert_eq!(ep.to_string(), "opc.tcp://localhost:4840");

        let ep: Endpoint = "opc.tcp://server".parse().unwrap();
        assert_eq!(ep.port(), None);
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!("://host".parse::<Endpoint>(), Err(EndpointParseError::EmptyScheme));
        assert_eq!("opc.tcp://:4840".parse::<Endpoint>(), Err(EndpointParseError::EmptyHost));
        assert!(matches!(
            "opc.tcp://host:port".parse::<Endpoint>(),
            Err(EndpointParseError::InvalidPort(_))
        ));
        assert!(matches!(
            "opc.tcp://host/path".parse::<Endpoint>(),
            Err(EndpointParseError::UnexpectedPath(_))
        ));
    }

    #[test]
    fn roundtrip() {
        let ep = Endpoint::new("opc.tcp", "10.0.0.5", Some(48010));
        let ep2: Endpoint = ep.to_string().parse().unwrap();
        assert_eq!(ep, ep2);
    }
}
