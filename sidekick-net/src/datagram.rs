//! Parsed IPv4 datagrams, as handed off by the packet source (§4.5).
//!
//! The header fields kept here are exactly the ones the proxy aggregator
//! needs (`src`, `proto`); everything else in the IPv4 header is discarded
//! at parse time. Layout and field semantics follow
//! `examples/original_source/util/ipv4_datagram.hh`'s `IPv4Header::parse`
//! (IP options are not supported: `ihl` below 5 is a parse error).

use std::net::Ipv4Addr;
use thiserror::Error;

/// IP protocol number for UDP.
pub const IPPROTO_UDP: u8 = 17;

const ETH_HEADER_LEN: usize = 14;
const MIN_IP_HEADER_LEN: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ipv4Header {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub proto: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ipv4Datagram {
    pub header: Ipv4Header,
    pub payload: Vec<u8>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("frame too short for an Ethernet+IPv4 header: {got} bytes")]
    TooShort { got: usize },
    #[error("not an IPv4 packet (version {version})")]
    NotIpv4 { version: u8 },
    #[error("IPv4 header declares {declared} bytes but only {available} are present")]
    TruncatedHeader { declared: usize, available: usize },
}

/// Parses a captured link-layer frame (Ethernet + IPv4, no VLAN tag, no IP
/// options) into an [`Ipv4Datagram`]. Returns an error for anything the
/// proxy should drop rather than aggregate.
pub fn parse_ipv4_datagram(frame: &[u8]) -> Result<Ipv4Datagram, ParseError> {
    if frame.len() < ETH_HEADER_LEN + MIN_IP_HEADER_LEN {
        return Err(ParseError::TooShort { got: frame.len() });
    }
    let ip = &frame[ETH_HEADER_LEN..];
    let version = ip[0] >> 4;
    if version != 4 {
        return Err(ParseError::NotIpv4 { version });
    }
    let ihl = (ip[0] & 0x0f).max(5) as usize;
    let header_len = ihl * 4;
    if ip.len() < header_len {
        return Err(ParseError::TruncatedHeader {
            declared: header_len,
            available: ip.len(),
        });
    }
    let proto = ip[9];
    let src = Ipv4Addr::new(ip[12], ip[13], ip[14], ip[15]);
    let dst = Ipv4Addr::new(ip[16], ip[17], ip[18], ip[19]);
    let payload = ip[header_len..].to_vec();
    Ok(Ipv4Datagram {
        header: Ipv4Header { src, dst, proto },
        payload,
    })
}
