//! Best-effort discovery of the address peers should use to reach this
//! machine. Only feeds the daemon's startup banner.

use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs, UdpSocket};

/// Learns the outbound interface address by "connecting" a UDP socket to a
/// non-routable peer. No packet is actually sent.
pub fn router_assigned_ip() -> Option<IpAddr> {
    let sock = UdpSocket::bind(("0.0.0.0", 0)).ok()?;
    sock.connect(("10.255.255.255", 1)).ok()?;
    Some(sock.local_addr().ok()?.ip())
}

/// Router-assigned address if one exists, otherwise whatever the machine
/// hostname resolves to, otherwise loopback.
pub fn display_ip() -> IpAddr {
    if let Some(ip) = router_assigned_ip() {
        return ip;
    }
    if let Ok(name) = hostname::get() {
        let host = name.to_string_lossy().into_owned();
        if let Ok(mut addrs) = (host.as_str(), 0u16).to_socket_addrs() {
            if let Some(addr) = addrs.next() {
                return addr.ip();
            }
        }
    }
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}
