// ── Local source address ──
//
// Finds the address this host would use to reach the outside world,
// so routers can be told where to send port mappings and events.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;
use tracing::debug;

/// Public address used as routing target when probing the source IP.
pub const PUBLIC_TARGET_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8));

// Discard service; nothing is ever sent.
const PROBE_PORT: u16 = 9;

/// Address the OS would use as source towards `target`.
///
/// Connecting a UDP socket only consults the routing table, no packet
/// leaves the host. Returns `None` when there is no route.
pub async fn source_ip(target: IpAddr) -> Option<IpAddr> {
    let bind: SocketAddr = match target {
        IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        IpAddr::V6(_) => (std::net::Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let socket = UdpSocket::bind(bind).await.ok()?;
    if let Err(e) = socket.connect((target, PROBE_PORT)).await {
        debug!(target = %target, error = %e, "no route for source ip probe");
        return None;
    }
    let local = socket.local_addr().ok()?.ip();
    (!local.is_unspecified()).then_some(local)
}

/// The configured override, else the detected source address.
pub async fn resolve_local_ip(override_ip: Option<IpAddr>) -> Option<IpAddr> {
    if let Some(ip) = override_ip {
        return Some(ip);
    }
    source_ip(PUBLIC_TARGET_IP).await
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::{resolve_local_ip, source_ip};

    #[tokio::test]
    async fn override_wins() {
        let ip = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10));
        assert_eq!(resolve_local_ip(Some(ip)).await, Some(ip));
    }

    #[tokio::test]
    async fn loopback_target_resolves_to_loopback() {
        let ip = source_ip(IpAddr::V4(Ipv4Addr::LOCALHOST)).await;
        assert_eq!(ip, Some(IpAddr::V4(Ipv4Addr::LOCALHOST)));
    }
}
