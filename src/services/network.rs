// Network health checks.
// Pings the router and an internet host and resolves a DNS name, all concurrently.

use std::net::IpAddr;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::warn;

use crate::config::Settings;
use crate::error::Result;

const PING_TIMEOUT_SECS: u64 = 2;
const DNS_TIMEOUT: Duration = Duration::from_secs(3);

static PING_LATENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"time[=<]([\d.]+)").expect("valid latency pattern"));

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PingResult {
    pub up: bool,
    pub latency_ms: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InternetPing {
    #[serde(flatten)]
    pub ping: PingResult,
    pub target: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DnsResult {
    pub ok: bool,
    pub resolved_ip: Option<String>,
    pub latency_ms: Option<f64>,
}

/// Snapshot served from the `network` cache entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkStatus {
    pub router: PingResult,
    pub internet_ping: InternetPing,
    pub dns: DnsResult,
}

/// Hosts to probe.
#[derive(Debug, Clone)]
pub struct NetworkChecker {
    router_ip: String,
    ping_target: String,
    dns_host: String,
}

impl NetworkChecker {
    pub fn new(
        router_ip: impl Into<String>,
        ping_target: impl Into<String>,
        dns_host: impl Into<String>,
    ) -> Self {
        Self {
            router_ip: router_ip.into(),
            ping_target: ping_target.into(),
            dns_host: dns_host.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.router_ip.clone(),
            settings.ping_target.clone(),
            settings.dns_check_host.clone(),
        )
    }

    /// Run every check concurrently. Individual failures show up as down, not as errors.
    pub async fn check_all(&self) -> Result<NetworkStatus> {
        let (router, internet, dns) = tokio::join!(
            ping(&self.router_ip),
            ping(&self.ping_target),
            dns_check(&self.dns_host),
        );

        Ok(NetworkStatus {
            router,
            internet_ping: InternetPing {
                ping: internet,
                target: self.ping_target.clone(),
            },
            dns,
        })
    }
}

/// Ping a host once with the system `ping` binary.
pub async fn ping(host: &str) -> PingResult {
    let child = Command::new("ping")
        .args(["-c", "1", "-W", &PING_TIMEOUT_SECS.to_string(), host])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output();

    let deadline = Duration::from_secs(PING_TIMEOUT_SECS + 2);
    match tokio::time::timeout(deadline, child).await {
        Ok(Ok(output)) if output.status.success() => PingResult {
            up: true,
            latency_ms: parse_latency(&String::from_utf8_lossy(&output.stdout)),
        },
        Ok(Ok(_)) => PingResult::default(),
        Ok(Err(e)) => {
            warn!(host, error = %e, "ping failed");
            PingResult::default()
        }
        Err(_) => {
            warn!(host, "ping timed out");
            PingResult::default()
        }
    }
}

/// Extract the round-trip time from `ping` output.
fn parse_latency(output: &str) -> Option<f64> {
    PING_LATENCY
        .captures(output)
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Resolve `host` to an IPv4 address through the system resolver.
pub async fn dns_check(host: &str) -> DnsResult {
    let started = Instant::now();
    let lookup = tokio::net::lookup_host((host, 0));

    match tokio::time::timeout(DNS_TIMEOUT, lookup).await {
        Ok(Ok(addrs)) => {
            let latency = started.elapsed().as_secs_f64() * 1000.0;
            let resolved_ip = addrs
                .map(|addr| addr.ip())
                .find(IpAddr::is_ipv4)
                .map(|ip| ip.to_string());
            match resolved_ip {
                Some(ip) => DnsResult {
                    ok: true,
                    resolved_ip: Some(ip),
                    latency_ms: Some((latency * 10.0).round() / 10.0),
                },
                None => {
                    warn!(host, "DNS check returned no IPv4 address");
                    DnsResult::default()
                }
            }
        }
        Ok(Err(e)) => {
            warn!(host, error = %e, "DNS check failed");
            DnsResult::default()
        }
        Err(_) => {
            warn!(host, "DNS check timed out");
            DnsResult::default()
        }
    }
}
