use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Result, TransportError};

/// Default port of the control request/reply endpoint.
pub const DEFAULT_REQUEST_PORT: u16 = 54388;
/// Default port of the feedback publisher.
pub const DEFAULT_FEEDBACK_PORT: u16 = 54389;
/// Default port of the video/data stream publisher.
pub const DEFAULT_STREAM_PORT: u16 = 54390;
/// Default port of the configuration request/reply endpoint.
pub const DEFAULT_CONFIG_PORT: u16 = 54398;

/// A transport address in URL form: `tcp://host:port` or `ipc:///path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    Tcp { host: String, port: u16 },
    Ipc(PathBuf),
}

impl Address {
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Address::Tcp {
            host: host.into(),
            port,
        }
    }

    pub fn ipc(path: impl Into<PathBuf>) -> Self {
        Address::Ipc(path.into())
    }

    /// Transport scheme name.
    pub fn scheme(&self) -> &'static str {
        match self {
            Address::Tcp { .. } => "tcp",
            Address::Ipc(_) => "ipc",
        }
    }
}

impl FromStr for Address {
    type Err = TransportError;

    fn from_str(input: &str) -> Result<Self> {
        let invalid = |reason| TransportError::InvalidAddress {
            address: input.to_string(),
            reason,
        };

        if let Some(rest) = input.strip_prefix("tcp://") {
            let (host, port) = rest.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
            let host = host
                .strip_prefix('[')
                .and_then(|h| h.strip_suffix(']'))
                .unwrap_or(host);
            if host.is_empty() {
                return Err(invalid("missing host"));
            }
            let port: u16 = port.parse().map_err(|_| invalid("invalid port"))?;
            return Ok(Address::tcp(host, port));
        }

        if let Some(path) = input.strip_prefix("ipc://") {
            if path.is_empty() {
                return Err(invalid("missing socket path"));
            }
            return Ok(Address::ipc(path));
        }

        Err(invalid("unsupported scheme (expected tcp:// or ipc://)"))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Tcp { host, port } if host.contains(':') => {
                write!(f, "tcp://[{host}]:{port}")
            }
            Address::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
            Address::Ipc(path) => write!(f, "ipc://{}", path.display()),
        }
    }
}

/// A robot reachable over the network: one host, four logical ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub request_port: u16,
    pub feedback_port: u16,
    pub stream_port: u16,
    pub config_port: u16,
}

impl Endpoint {
    /// Endpoint on `host` with the default port layout.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            request_port: DEFAULT_REQUEST_PORT,
            feedback_port: DEFAULT_FEEDBACK_PORT,
            stream_port: DEFAULT_STREAM_PORT,
            config_port: DEFAULT_CONFIG_PORT,
        }
    }

    pub fn request_address(&self) -> Address {
        Address::tcp(&self.host, self.request_port)
    }

    pub fn feedback_address(&self) -> Address {
        Address::tcp(&self.host, self.feedback_port)
    }

    pub fn stream_address(&self) -> Address {
        Address::tcp(&self.host, self.stream_port)
    }

    pub fn config_address(&self) -> Address {
        Address::tcp(&self.host, self.config_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tcp_address() {
        let addr: Address = "tcp://10.95.76.1:54388".parse().expect("tcp should parse");
        assert_eq!(addr, Address::tcp("10.95.76.1", 54388));
        assert_eq!(addr.to_string(), "tcp://10.95.76.1:54388");
    }

    #[test]
    fn parse_tcp_ipv6_address() {
        let addr: Address = "tcp://[::1]:9000".parse().expect("ipv6 should parse");
        assert_eq!(addr, Address::tcp("::1", 9000));
        assert_eq!(addr.to_string(), "tcp://[::1]:9000");
    }

    #[test]
    fn parse_ipc_address() {
        let addr: Address = "ipc:///tmp/farm_ng-amiga-hal"
            .parse()
            .expect("ipc should parse");
        assert_eq!(addr, Address::ipc("/tmp/farm_ng-amiga-hal"));
        assert_eq!(addr.to_string(), "ipc:///tmp/farm_ng-amiga-hal");
        assert_eq!(addr.scheme(), "ipc");
    }

    #[test]
    fn rejects_malformed_addresses() {
        for input in [
            "udp://host:1",
            "tcp://host",
            "tcp://:80",
            "tcp://host:notaport",
            "tcp://host:70000",
            "ipc://",
            "localhost:54388",
        ] {
            let result = input.parse::<Address>();
            assert!(
                matches!(result, Err(TransportError::InvalidAddress { .. })),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn endpoint_default_ports() {
        let endpoint = Endpoint::new("amiga.local");
        assert_eq!(
            endpoint.request_address().to_string(),
            "tcp://amiga.local:54388"
        );
        assert_eq!(
            endpoint.feedback_address().to_string(),
            "tcp://amiga.local:54389"
        );
        assert_eq!(
            endpoint.stream_address().to_string(),
            "tcp://amiga.local:54390"
        );
        assert_eq!(
            endpoint.config_address().to_string(),
            "tcp://amiga.local:54398"
        );
    }
}
