//! Various helper functions, that are used by RADIUS Client to convert attribute values from and
//! into their wire representation


use crate::protocol::error::RadiusError;

use std::convert::TryInto;
use std::net::{ Ipv4Addr, Ipv6Addr };


/// Converts u32 into Vec<u8> (network byte order)
pub fn integer_to_bytes(integer: u32) -> Vec<u8> {
    integer.to_be_bytes().to_vec()
}

/// Converts 4 bytes (network byte order) into u32
pub fn bytes_to_integer(integer: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*integer)
}

/// Converts seconds since epoch into Vec<u8> (network byte order)
pub fn timestamp_to_bytes(timestamp: u32) -> Vec<u8> {
    integer_to_bytes(timestamp)
}

/// Converts 4 bytes (network byte order) into seconds since epoch
pub fn bytes_to_timestamp(timestamp: &[u8; 4]) -> u32 {
    bytes_to_integer(timestamp)
}

/// Converts IPv4 Address string into vector of bytes
///
/// Should be used for any Attribute of type **ipaddr** to ensure Attribute's value is correctly
/// encoded
pub fn ipv4_string_to_bytes(ipv4: &str) -> Result<Vec<u8>, RadiusError> {
    let address: Ipv4Addr = ipv4.parse()?;
    Ok(address.octets().to_vec())
}

/// Converts IPv4 bytes into IPv4 string
pub fn bytes_to_ipv4_string(ipv4: &[u8]) -> Result<String, RadiusError> {
    let octets: [u8; 4] = ipv4.try_into().map_err(|_| RadiusError::MalformedAttributeError { error: String::from("invalid IPv4 bytes") })?;
    Ok(Ipv4Addr::from(octets).to_string())
}

/// Converts IPv6 Address string into vector of bytes
///
/// Should be used for any Attribute of type **ipv6addr** or **ipv6prefix** to ensure Attribute's
/// value is correctly encoded. A string with a prefix length (`fc66::1/64`) produces the
/// ipv6prefix layout: reserved byte, prefix length, then the address
pub fn ipv6_string_to_bytes(ipv6: &str) -> Result<Vec<u8>, RadiusError> {
    let mut parsed_ipv6 = ipv6.splitn(2, '/');
    let address: Ipv6Addr = parsed_ipv6.next().unwrap_or_default().parse()?;

    match parsed_ipv6.next() {
        None         => Ok(address.octets().to_vec()),
        Some(prefix) => {
            let prefix_length = prefix.parse::<u8>()
                .ok()
                .filter(|length| *length <= 128)
                .ok_or_else(|| RadiusError::MalformedAttributeError { error: format!("invalid IPv6 prefix length: {}", prefix) })?;

            let mut bytes = Vec::with_capacity(18);
            bytes.push(0);
            bytes.push(prefix_length);
            bytes.extend_from_slice(&address.octets());
            Ok(bytes)
        }
    }
}

/// Converts IPv6 bytes (plain address or ipv6prefix layout) into IPv6 string
pub fn bytes_to_ipv6_string(ipv6: &[u8]) -> Result<String, RadiusError> {
    match ipv6.len() {
        16 => {
            let octets: [u8; 16] = ipv6.try_into().map_err(|_| RadiusError::MalformedAttributeError { error: String::from("invalid IPv6 bytes") })?;
            Ok(Ipv6Addr::from(octets).to_string())
        },
        18 => {
            let octets: [u8; 16] = ipv6[2..].try_into().map_err(|_| RadiusError::MalformedAttributeError { error: String::from("invalid IPv6 bytes") })?;
            Ok(format!("{}/{}", Ipv6Addr::from(octets), ipv6[1]))
        },
        _  => Err( RadiusError::MalformedAttributeError { error: String::from("invalid IPv6 bytes") } )
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_to_bytes() {
        assert_eq!(vec![0, 0, 39, 16], integer_to_bytes(10000));
        assert_eq!(10000, bytes_to_integer(&[0, 0, 39, 16]));
    }

    #[test]
    fn test_ipv4_string_to_bytes() {
        assert_eq!(vec![192, 168, 1, 10], ipv4_string_to_bytes("192.168.1.10").unwrap());
        assert_eq!("192.168.1.10",        bytes_to_ipv4_string(&[192, 168, 1, 10]).unwrap());
    }

    #[test]
    fn test_invalid_ipv4() {
        assert!(ipv4_string_to_bytes("192.168.1").is_err());
        assert!(bytes_to_ipv4_string(&[192, 168, 1]).is_err());
    }

    #[test]
    fn test_ipv6_to_bytes_wo_subnet() {
        let ipv6_bytes = ipv6_string_to_bytes("fc66::1").unwrap();
        assert_eq!(ipv6_bytes, vec![252, 102, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!("fc66::1", bytes_to_ipv6_string(&ipv6_bytes).unwrap());
    }

    #[test]
    fn test_ipv6_to_bytes_w_subnet() {
        let ipv6_bytes = ipv6_string_to_bytes("fc66::1/64").unwrap();
        assert_eq!(ipv6_bytes, vec![0, 64, 252, 102, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!("fc66::1/64", bytes_to_ipv6_string(&ipv6_bytes).unwrap());
    }

    #[test]
    fn test_ipv6_invalid_prefix() {
        assert!(ipv6_string_to_bytes("fc66::1/129").is_err());
        assert!(ipv6_string_to_bytes("fc66::1/abc").is_err());
        assert!(ipv6_string_to_bytes("fc66:::1").is_err());
    }
}
