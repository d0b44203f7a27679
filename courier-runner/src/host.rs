//! Host identity reported at registration
//!
//! Both lookups are best effort: a runner that cannot work out its own name
//! or address still registers, with a clearly fake placeholder.

use std::net::UdpSocket;
use tracing::error;

const HOST_PREFIX: &str = "courier-";

/// Returns the host name to register under
pub fn host_name() -> String {
    match hostname::get() {
        Ok(name) => format_host(&name.to_string_lossy()),
        Err(e) => {
            error!("could not get host name, using a generated one: {}", e);
            format!("fake-host-{}", &uuid::Uuid::new_v4().simple().to_string()[..8])
        }
    }
}

/// Returns the preferred outbound IP of this machine
///
/// Connecting a UDP socket only selects a route; no packet is sent.
pub fn outbound_ip() -> String {
    let discover = || -> std::io::Result<String> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect("8.8.8.8:80")?;
        Ok(socket.local_addr()?.ip().to_string())
    };

    discover().unwrap_or_else(|e| {
        error!("could not figure out an IP, using a randomly generated IP: {}", e);
        format!("fake-{}", random_ipv4())
    })
}

fn format_host(name: &str) -> String {
    format!("{}{}", HOST_PREFIX, name.trim().replace(' ', "-"))
}

fn random_ipv4() -> String {
    let bytes = uuid::Uuid::new_v4().into_bytes();
    format!("{}.{}.{}.{}", bytes[0], bytes[1], bytes[2], bytes[3])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_host_replaces_spaces() {
        assert_eq!(format_host("my build box"), "courier-my-build-box");
        assert_eq!(format_host("node-1"), "courier-node-1");
    }

    #[test]
    fn test_host_name_is_prefixed() {
        let name = host_name();
        assert!(name.starts_with(HOST_PREFIX) || name.starts_with("fake-host-"));
        assert!(!name.contains(' '));
    }

    #[test]
    fn test_random_ipv4_shape() {
        let ip = random_ipv4();
        assert!(ip.parse::<std::net::Ipv4Addr>().is_ok());
    }

    #[test]
    fn test_outbound_ip_never_empty() {
        let ip = outbound_ip();
        assert!(!ip.is_empty());
    }
}
