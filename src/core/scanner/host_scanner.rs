// src/core/scanner/host_scanner.rs

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::port_prober::{Connector, TcpConnector};
use crate::core::error::ScanError;
use crate::core::models::{HostOutcome, PortError, PortState, Target};

/// Turns a target name into an IPv4 address.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve_ipv4(&self, name: &str) -> Result<Ipv4Addr, ScanError>;
}

/// hickory-backed resolver with its answer cache disabled, so every scan
/// sees the current DDNS record.
pub struct DnsResolver {
    inner: TokioAsyncResolver,
}

impl DnsResolver {
    pub fn new() -> Self {
        let (config, mut opts) = hickory_resolver::system_conf::read_system_conf().unwrap_or_else(|e| {
            warn!(error = %e, "Could not read system resolver config, using default upstreams.");
            (ResolverConfig::default(), ResolverOpts::default())
        });
        opts.cache_size = 0;
        Self {
            inner: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

impl Default for DnsResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Resolver for DnsResolver {
    async fn resolve_ipv4(&self, name: &str) -> Result<Ipv4Addr, ScanError> {
        if let Ok(ip) = name.parse::<Ipv4Addr>() {
            return Ok(ip);
        }
        let fail = |reason: String| ScanError::DnsResolution {
            target: name.to_string(),
            reason,
        };
        if name.is_empty() {
            return Err(fail("empty host name".to_string()));
        }

        debug!(host = name, "Resolving host.");
        let lookup = self.inner.lookup_ip(name).await.map_err(|e| fail(e.to_string()))?;
        lookup
            .iter()
            .find_map(|ip| match ip {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .ok_or_else(|| fail("no IPv4 address in answer".to_string()))
    }
}

/// Resolves one target and probes it over an ordered port list.
#[derive(Clone)]
pub struct HostScanner {
    resolver: Arc<dyn Resolver>,
    connector: Arc<dyn Connector>,
}

impl HostScanner {
    pub fn new(resolver: Arc<dyn Resolver>, connector: Arc<dyn Connector>) -> Self {
        Self { resolver, connector }
    }

    /// Scanner wired to the system resolver and real TCP sockets.
    pub fn system() -> Self {
        Self::new(Arc::new(DnsResolver::new()), Arc::new(TcpConnector))
    }

    /// Resolves `target` and probes every port of `ports` once, in order.
    ///
    /// Never fails: every problem ends up in the returned outcome's status.
    ///
    /// # Arguments
    /// * `target` - The host name or literal IPv4 address to scan.
    /// * `ports` - Candidate ports, probed sequentially in list order.
    /// * `timeout` - Per-attempt connect timeout handed to the connector.
    ///
    /// # Returns
    /// A `HostOutcome` that is `DnsError` when resolution failed (nothing was
    /// probed), `OtherError` on any unexpected failure, and `Success` otherwise,
    /// with every port in exactly one of `open_ports` / `closed_ports`.
    pub async fn scan_host(&self, target: &Target, ports: &[u16], timeout: Duration) -> HostOutcome {
        info!(host = %target.name, ports = ports.len(), "Starting host scan.");

        // Resolve afresh on every call; DDNS records move.
        let ip = match self.resolver.resolve_ipv4(&target.name).await {
            Ok(ip) => ip,
            Err(ScanError::DnsResolution { reason, .. }) => {
                warn!(host = %target.name, %reason, "DNS resolution failed.");
                return HostOutcome::dns_error(target.clone(), format!("DNS resolution failed: {reason}"));
            }
            Err(e) => {
                warn!(host = %target.name, error = %e, "Unexpected resolver failure.");
                return HostOutcome::other_error(target.clone(), e.to_string());
            }
        };

        // Probe each candidate port once; a transport error only marks that port.
        let mut outcome = HostOutcome::success(target.clone(), ip);
        for &port in ports {
            match self.connector.probe(ip, port, timeout).await {
                Ok(PortState::Open) => {
                    outcome.open_ports.insert(port);
                }
                Ok(PortState::Closed) => {
                    outcome.closed_ports.insert(port);
                }
                // Keyed on the port we asked for, whatever the connector reports.
                Err(ScanError::Transport { message, .. }) => {
                    outcome.closed_ports.insert(port);
                    outcome.port_errors.push(PortError { port, message });
                }
                Err(e) => {
                    warn!(host = %target.name, port, error = %e, "Probe failed unexpectedly.");
                    let mut failed = HostOutcome::other_error(target.clone(), e.to_string());
                    failed.ip = Some(ip);
                    return failed;
                }
            }
        }

        info!(
            host = %target.name,
            %ip,
            open = outcome.open_ports.len(),
            closed = outcome.closed_ports.len(),
            "Host scan finished."
        );
        outcome
    }
}
