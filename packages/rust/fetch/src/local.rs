//! Local/private network detection for caller-supplied links.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::{Host, Url};

/// Decides whether a URL points into a local or private network.
#[async_trait]
pub trait LocalAddressCheck: Send + Sync {
    async fn is_local(&self, url: &Url) -> bool;
}

/// Check backed by the system resolver.
///
/// A host counts as local when it is a well-known local name, a literal
/// private address, or resolves to any private address. Failing to resolve
/// within a few seconds also counts as local.
#[derive(Debug, Clone, Copy, Default)]
pub struct DnsLocalCheck;

#[async_trait]
impl LocalAddressCheck for DnsLocalCheck {
    async fn is_local(&self, url: &Url) -> bool {
        // Block non-HTTP schemes
        match url.scheme() {
            "http" | "https" => {}
            _ => return true,
        }

        let domain = match url.host() {
            Some(Host::Ipv4(v4)) => return is_private_ip(&IpAddr::V4(v4)),
            Some(Host::Ipv6(v6)) => return is_private_ip(&IpAddr::V6(v6)),
            Some(Host::Domain(domain)) => domain.to_ascii_lowercase(),
            None => return true,
        };

        if domain == "localhost"
            || domain.ends_with(".localhost")
            || domain.ends_with(".local")
            || domain.ends_with(".internal")
        {
            return true;
        }

        let port = url.port_or_known_default().unwrap_or(80);
        resolves_local(
            &domain,
            tokio::net::lookup_host((domain.as_str(), port)),
            DNS_TIMEOUT,
        )
        .await
    }
}

/// Upper bound on a single host lookup.
const DNS_TIMEOUT: Duration = Duration::from_secs(3);

/// Await a host lookup and judge its addresses. Errors, timeouts, and empty
/// answers all count as local.
async fn resolves_local<F, I>(domain: &str, lookup: F, limit: Duration) -> bool
where
    F: Future<Output = io::Result<I>>,
    I: Iterator<Item = SocketAddr>,
{
    match tokio::time::timeout(limit, lookup).await {
        Ok(Ok(addrs)) => {
            let ips: Vec<IpAddr> = addrs.map(|a| a.ip()).collect();
            ips.is_empty() || ips.iter().any(is_private_ip)
        }
        Ok(Err(e)) => {
            debug!(%domain, error = %e, "host did not resolve, treating as local");
            true
        }
        Err(_) => {
            debug!(%domain, ?limit, "host lookup timed out, treating as local");
            true
        }
    }
}

/// Policy check on a raw link string: unparseable links count as local.
pub async fn is_link_local(check: &dyn LocalAddressCheck, link: &str) -> bool {
    match Url::parse(link) {
        Ok(url) => check.is_local(&url).await,
        Err(_) => true,
    }
}

/// Check if an IP is in a private/reserved range.
pub fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
                // 192.0.0.0/24
                || (v4.octets()[0] == 192 && v4.octets()[1] == 0 && v4.octets()[2] == 0)
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(mapped));
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 (unique local)
                || (first & 0xfe00) == 0xfc00
                // fe80::/10 (link-local)
                || (first & 0xffc0) == 0xfe80
        }
    }
}
