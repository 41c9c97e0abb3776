//! Identity octet extraction.
//!
//! Both routing modes reduce a client identity to a sequence of octets
//! before hashing. The mapping is total: every input has a defined octet
//! sequence, so routing never fails on an unusual identity.

use std::net::IpAddr;

/// Octets for a transport peer address (direct mode).
pub fn ip_octets(addr: IpAddr) -> Vec<u8> {
    match addr {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    }
}

/// Octets for a reported identity string, usually a forwarded-for value.
///
/// A value that parses as an IP address hashes by its address octets, so a
/// header identity and the equivalent peer address land on the same worker.
/// Anything else hashes by its raw bytes.
pub fn identity_octets(identity: &str) -> Vec<u8> {
    if let Ok(addr) = identity.trim().parse::<IpAddr>() {
        return ip_octets(addr);
    }
    identity.as_bytes().to_vec()
}
