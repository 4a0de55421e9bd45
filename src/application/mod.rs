use std::net::SocketAddr;

use eyre::WrapErr;
use listenfd::ListenFd;
use tokio::net::TcpListener;
use tracing::info;

use crate::AnyResult;

pub const LISTEN_ADDR_VAR: &str = "LISTEN_ADDR";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
}

impl ServerConfig {
    pub fn from_env() -> AnyResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AnyResult<Self> {
        let raw = lookup(LISTEN_ADDR_VAR).unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = raw
            .parse::<SocketAddr>()
            .wrap_err_with(|| format!("invalid {LISTEN_ADDR_VAR}: {raw:?}"))?;

        Ok(Self { listen_addr })
    }

    /// Takes over a socket handed in by the supervisor, otherwise binds `listen_addr`.
    pub async fn bind(&self) -> AnyResult<TcpListener> {
        let mut fds = ListenFd::from_env();
        if let Some(inherited) = fds
            .take_tcp_listener(0)
            .wrap_err("failed to take inherited listener")?
        {
            inherited.set_nonblocking(true)?;
            info!("using inherited listener");
            return Ok(TcpListener::from_std(inherited)?);
        }

        TcpListener::bind(self.listen_addr)
            .await
            .wrap_err_with(|| format!("failed to bind {}", self.listen_addr))
    }
}
