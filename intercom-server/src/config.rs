use std::net::{Ipv4Addr, SocketAddr};

/// Port the dashboard server has always listened on.
pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub listen_addr: SocketAddr,
    /// Reply `target-unavailable` to a `call` nobody received.
    /// When off, such calls are dropped silently.
    pub notify_unreachable: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            notify_unreachable: true,
        }
    }
}
