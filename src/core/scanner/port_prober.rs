// src/core/scanner/port_prober.rs

use async_trait::async_trait;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::core::error::ScanError;
use crate::core::models::PortState;

/// Makes one TCP connect attempt against `ip:port`.
///
/// There are no retries: a single attempt per (host, port) is authoritative.
///
/// # Returns
/// `Open` when the handshake completes within `timeout`, `Closed` on refusal,
/// an unreachable route or timeout, and `ScanError::Transport` for any other
/// socket failure.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn probe(&self, ip: Ipv4Addr, port: u16, timeout: Duration) -> Result<PortState, ScanError>;
}

/// Plain tokio TCP connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn probe(&self, ip: Ipv4Addr, port: u16, limit: Duration) -> Result<PortState, ScanError> {
        let addr = SocketAddr::from((ip, port));
        // The stream (and the socket under it) is dropped on every path out of this match.
        match timeout(limit, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => {
                debug!(%ip, port, "Port open.");
                Ok(PortState::Open)
            }
            Ok(Err(e)) => classify_connect_error(port, e),
            Err(_elapsed) => {
                debug!(%ip, port, timeout_ms = limit.as_millis() as u64, "Connect timed out.");
                Ok(PortState::Closed)
            }
        }
    }
}

/// Refusals and unreachable routes are ordinary "closed" answers; anything
/// else is a local socket problem and becomes a transport error.
fn classify_connect_error(port: u16, e: std::io::Error) -> Result<PortState, ScanError> {
    match e.kind() {
        ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::TimedOut
        | ErrorKind::HostUnreachable
        | ErrorKind::NetworkUnreachable => {
            debug!(port, error = %e, "Port closed.");
            Ok(PortState::Closed)
        }
        _ => {
            warn!(port, error = %e, "Transport error while probing.");
            Err(ScanError::Transport {
                port,
                message: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn listening_port_is_open() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let state = TcpConnector
            .probe(Ipv4Addr::LOCALHOST, port, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(state, PortState::Open);
    }

    #[tokio::test]
    async fn released_port_is_closed() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let state = TcpConnector
            .probe(Ipv4Addr::LOCALHOST, port, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(state, PortState::Closed);
    }

    #[tokio::test]
    async fn unanswered_connect_is_closed_after_the_timeout() {
        // TEST-NET-1 is never routed, so the handshake cannot complete in time.
        let state = TcpConnector
            .probe(Ipv4Addr::new(192, 0, 2, 1), 80, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(state, PortState::Closed);
    }

    #[test]
    fn refusal_is_closed_but_permission_denied_is_transport() {
        let refused = std::io::Error::from(ErrorKind::ConnectionRefused);
        assert_eq!(classify_connect_error(80, refused).unwrap(), PortState::Closed);

        let denied = std::io::Error::from(ErrorKind::PermissionDenied);
        match classify_connect_error(81, denied) {
            Err(ScanError::Transport { port, .. }) => assert_eq!(port, 81),
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
