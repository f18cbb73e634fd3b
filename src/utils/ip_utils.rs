use std::net::IpAddr;

/// IP utility functions for multiaddress construction and address checks

/// Multiaddress protocol component for an IP address
pub fn multiaddr_protocol(ip: &IpAddr) -> &'static str {
    match ip {
        IpAddr::V4(_) => "ip4",
        IpAddr::V6(_) => "ip6",
    }
}

/// Build a libp2p-style multiaddress, e.g. `/ip4/10.0.0.1/tcp/8000/p2p/16Uiu2...`
pub fn multiaddr(ip: &IpAddr, port: u16, peer_id: &str) -> String {
    format!("/{}/{}/tcp/{}/p2p/{}", multiaddr_protocol(ip), ip, port, peer_id)
}

/// Check if an IP address is private (RFC 1918 for IPv4, RFC 4193 for IPv6) or loopback
pub fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            ipv4.is_loopback() ||
            // 10.0.0.0/8
            octets[0] == 10 ||
            // 172.16.0.0/12
            (octets[0] == 172 && octets[1] >= 16 && octets[1] <= 31) ||
            // 192.168.0.0/16
            (octets[0] == 192 && octets[1] == 168)
        }
        IpAddr::V6(ipv6) => {
            let segments = ipv6.segments();
            // RFC 4193 Unique Local Addresses (fc00::/7)
            ipv6.is_loopback() || segments[0] & 0xfe00 == 0xfc00
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiaddr() {
        let v4: IpAddr = "10.0.0.1".parse().unwrap();
        assert_eq!(multiaddr(&v4, 8000, "16Uiu2HAmX"), "/ip4/10.0.0.1/tcp/8000/p2p/16Uiu2HAmX");

        let v6: IpAddr = "fd00::1".parse().unwrap();
        assert_eq!(multiaddr(&v6, 8001, "16Uiu2HAmY"), "/ip6/fd00::1/tcp/8001/p2p/16Uiu2HAmY");
    }

    #[test]
    fn test_is_private_ip() {
        let cases = [
            ("10.1.2.3", true),
            ("172.16.0.1", true),
            ("172.32.0.1", false),
            ("192.168.1.1", true),
            ("127.0.0.1", true),
            ("8.8.8.8", false),
            ("fd12::1", true),
            ("::1", true),
            ("2001:db8::1", false),
        ];
        for (ip, expected) in cases {
            let ip: IpAddr = ip.parse().unwrap();
            assert_eq!(is_private_ip(&ip), expected, "{}", ip);
        }
    }
}
