//! Endpoint resolution.
//!
//! Turns a textual server address into a connected [`PipeStream`] and the
//! immutable [`Endpoint`] describing where it goes. Resolution happens once,
//! while a client is being constructed; there is no retry at this layer.
//!
//! # Address grammar
//!
//! ```text
//! tcp://host:port        ofi+tcp://host:port     na+tcp://host:port
//! unix:///path/to.sock   na+sm:///path/to.sock
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::net::TcpStream;

use super::PipeStream;
use crate::error::{ChronologError, Result};

/// Transport destination parsed from an address string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// TCP host and port, resolved with a DNS lookup.
    Tcp {
        /// Host name or IP literal.
        host: String,
        /// TCP port.
        port: u16,
    },
    /// Unix Domain Socket path.
    Unix(PathBuf),
}

/// A parsed, not yet resolved, server address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    raw: String,
    target: Target,
}

impl Address {
    /// Parse a server address.
    ///
    /// # Errors
    ///
    /// Returns [`ChronologError::Resolution`] for a missing scheme, an
    /// unsupported scheme, an empty destination or a missing/invalid port.
    ///
    /// # Example
    ///
    /// ```
    /// use chronolog_client::transport::{Address, Target};
    ///
    /// let addr = Address::parse("tcp://localhost:5555").unwrap();
    /// assert_eq!(
    ///     addr.target(),
    ///     &Target::Tcp { host: "localhost".into(), port: 5555 }
    /// );
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let (scheme, rest) = raw
            .split_once("://")
            .ok_or_else(|| ChronologError::resolution(raw, "missing `<protocol>://` prefix"))?;

        if rest.is_empty() {
            return Err(ChronologError::resolution(raw, "empty destination"));
        }

        let target = match scheme {
            "tcp" | "ofi+tcp" | "na+tcp" => parse_host_port(raw, rest)?,
            "unix" | "na+sm" => Target::Unix(PathBuf::from(rest)),
            other => {
                return Err(ChronologError::resolution(
                    raw,
                    format!("unsupported protocol `{}`", other),
                ))
            }
        };

        Ok(Self {
            raw: raw.to_string(),
            target,
        })
    }

    /// Address as supplied by the caller.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed destination.
    pub fn target(&self) -> &Target {
        &self.target
    }
}

fn parse_host_port(raw: &str, rest: &str) -> Result<Target> {
    let (host, port) = rest
        .rsplit_once(':')
        .ok_or_else(|| ChronologError::resolution(raw, "missing port"))?;

    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(ChronologError::resolution(raw, "empty host"));
    }

    let port = port
        .parse::<u16>()
        .map_err(|e| ChronologError::resolution(raw, format!("invalid port `{}`: {}", port, e)))?;

    Ok(Target::Tcp {
        host: host.to_string(),
        port,
    })
}

/// Resolved destination of one server process.
///
/// Immutable once built; a client holds exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    address: String,
    peer: Peer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Peer {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

impl Endpoint {
    /// Address the endpoint was resolved from.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Socket address of a TCP endpoint.
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        match &self.peer {
            Peer::Tcp(addr) => Some(*addr),
            Peer::Unix(_) => None,
        }
    }

    /// Endpoint for streams connected outside [`resolve`], in unit tests.
    #[cfg(test)]
    pub(crate) fn in_memory(name: &str) -> Self {
        Self {
            address: format!("unix://{}", name),
            peer: Peer::Unix(PathBuf::from(name)),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.peer {
            Peer::Tcp(addr) => write!(f, "tcp://{}", addr),
            Peer::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// Resolve `raw` and connect to it.
///
/// TCP addresses are looked up and tried in order; the first one that
/// accepts the connection becomes the endpoint.
///
/// # Errors
///
/// Returns [`ChronologError::Resolution`] if the address cannot be parsed,
/// looked up, or reached.
pub async fn resolve(raw: &str) -> Result<(Endpoint, PipeStream)> {
    let address = Address::parse(raw)?;

    match address.target() {
        Target::Tcp { host, port } => {
            let candidates = tokio::net::lookup_host((host.as_str(), *port))
                .await
                .map_err(|e| ChronologError::resolution(raw, format!("lookup failed: {}", e)))?;

            let mut last_error = None;
            for candidate in candidates {
                match TcpStream::connect(candidate).await {
                    Ok(stream) => {
                        let _ = stream.set_nodelay(true);
                        tracing::debug!("Resolved {} to {}", raw, candidate);
                        let endpoint = Endpoint {
                            address: address.as_str().to_string(),
                            peer: Peer::Tcp(candidate),
                        };
                        return Ok((endpoint, PipeStream::from(stream)));
                    }
                    Err(e) => {
                        tracing::debug!("Connect to {} failed: {}", candidate, e);
                        last_error = Some(e);
                    }
                }
            }

            Err(ChronologError::resolution(
                raw,
                match last_error {
                    Some(e) => format!("unreachable: {}", e),
                    None => "lookup returned no addresses".to_string(),
                },
            ))
        }

        #[cfg(unix)]
        Target::Unix(path) => {
            let stream = tokio::net::UnixStream::connect(path)
                .await
                .map_err(|e| ChronologError::resolution(raw, format!("unreachable: {}", e)))?;
            tracing::debug!("Resolved {} to {}", raw, path.display());
            let endpoint = Endpoint {
                address: address.as_str().to_string(),
                peer: Peer::Unix(path.clone()),
            };
            Ok((endpoint, PipeStream::from(stream)))
        }

        #[cfg(not(unix))]
        Target::Unix(_) => Err(ChronologError::resolution(
            raw,
            "unix sockets are not supported on this platform",
        )),
    }
}
