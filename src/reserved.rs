/* src/reserved.rs */

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::{RealIpError, Result};

/// Address blocks that are never reported as a client's public address.
///
/// Loopback, private and link-local ranges for both families. The table is a
/// compile-time constant, so it is shared by every caller without locking.
pub const RESERVED_BLOCKS: [IpNet; 8] = [
    // localhost
    IpNet::V4(Ipv4Net::new_assert(Ipv4Addr::new(127, 0, 0, 0), 8)),
    // 24-bit block
    IpNet::V4(Ipv4Net::new_assert(Ipv4Addr::new(10, 0, 0, 0), 8)),
    // 20-bit block
    IpNet::V4(Ipv4Net::new_assert(Ipv4Addr::new(172, 16, 0, 0), 12)),
    // 16-bit block
    IpNet::V4(Ipv4Net::new_assert(Ipv4Addr::new(192, 168, 0, 0), 16)),
    // link local
    IpNet::V4(Ipv4Net::new_assert(Ipv4Addr::new(169, 254, 0, 0), 16)),
    // localhost IPv6
    IpNet::V6(Ipv6Net::new_assert(Ipv6Addr::LOCALHOST, 128)),
    // unique local IPv6
    IpNet::V6(Ipv6Net::new_assert(Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 7)),
    // link local IPv6
    IpNet::V6(Ipv6Net::new_assert(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 10)),
];

/// Check whether `address` lies inside one of the [`RESERVED_BLOCKS`].
///
/// `address` must be a bare IP literal: no port, no brackets and no
/// surrounding whitespace. IPv4-mapped IPv6 addresses are classified by their
/// embedded IPv4 address.
///
/// # Errors
///
/// Returns [`RealIpError::InvalidIpFormat`] when `address` does not parse.
/// Such a candidate is neither reserved nor public and should be skipped.
///
/// # Examples
///
/// ```rust
/// use realip::is_private_address;
///
/// assert_eq!(is_private_address("172.31.0.0"), Ok(true));
/// assert_eq!(is_private_address("172.32.0.0"), Ok(false));
/// assert!(is_private_address("not-an-ip").is_err());
/// ```
pub fn is_private_address(address: &str) -> Result<bool> {
    let ip = address
        .parse::<IpAddr>()
        .map_err(|_| RealIpError::InvalidIpFormat(address.to_string()))?;

    Ok(is_reserved_ip(&ip))
}

/// Check whether an already parsed address lies inside a reserved block.
pub fn is_reserved_ip(ip: &IpAddr) -> bool {
    let ip = match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(*ip, IpAddr::V4),
        IpAddr::V4(_) => *ip,
    };

    RESERVED_BLOCKS.iter().any(|block| block.contains(&ip))
}
