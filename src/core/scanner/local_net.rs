// src/core/scanner/local_net.rs

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::time::Duration;
use tracing::{debug, warn};

/// The address of the interface that would route off-host traffic.
///
/// Connecting a UDP socket sends nothing; it only makes the OS pick a
/// source address. Falls back to loopback when there is no route.
pub fn lan_ip() -> IpAddr {
    let probe = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect((Ipv4Addr::new(10, 255, 255, 255), 1))?;
        Ok(socket.local_addr()?.ip())
    };
    probe().unwrap_or_else(|e| {
        debug!(error = %e, "No routable interface, using loopback.");
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    })
}

/// Asks a plain-text echo service (ipify-style) for this host's public address.
pub async fn wan_ip(echo_url: &str, timeout: Duration) -> Option<Ipv4Addr> {
    let client = reqwest::Client::builder().timeout(timeout).build().ok()?;
    let body = match client.get(echo_url).send().await.and_then(|r| r.error_for_status()) {
        Ok(response) => response.text().await.ok()?,
        Err(e) => {
            warn!(url = echo_url, error = %e, "Could not fetch public IP.");
            return None;
        }
    };
    match body.trim().parse() {
        Ok(ip) => Some(ip),
        Err(_) => {
            warn!(url = echo_url, body = %body.trim(), "Public IP service returned garbage.");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lan_ip_is_never_unspecified() {
        assert!(!lan_ip().is_unspecified());
    }
}
