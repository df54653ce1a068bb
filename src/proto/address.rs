// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Socks5-like destination address field, unified across protocols.
//!
//! | Kind   | Length                          |
//! | ------ | -------------------------------- |
//! | V4     | 4 bytes, dotted-decimal          |
//! | Domain | 1-byte length prefix + N bytes   |
//! | V6     | 16 bytes, 8 colon-separated hex groups |
//!
//! Each protocol spells its address-type byte differently (VLESS: `1/2/3`,
//! Trojan/Shadowsocks: `1/3/4`), so callers map the raw atyp byte to an
//! [`AddressKind`] before calling [`decode`].
use bytes::Bytes;

use super::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    V4,
    Domain,
    V6,
}

/// Decode a unified address field from `buf`, returning the canonical host
/// string, the port, and the number of bytes the field occupied (address
/// bytes plus the trailing 2-byte port).
pub fn decode(buf: &[u8], kind: AddressKind) -> Result<(String, u16, usize), ProtocolError> {
    let (host, addr_len) = decode_host(buf, kind)?;
    let port_bytes = buf.get(addr_len..addr_len + 2).ok_or(ProtocolError)?;
    let port = u16::from_be_bytes([port_bytes[0], port_bytes[1]]);
    Ok((host, port, addr_len + 2))
}

/// Decode just the host portion of an address field, with no trailing port
/// byte — for protocols (VLESS) whose port precedes the address instead of
/// following it. Returns the canonical host string and the number of bytes
/// the address itself occupied.
pub fn decode_host(buf: &[u8], kind: AddressKind) -> Result<(String, usize), ProtocolError> {
    match kind {
        AddressKind::V4 => {
            let slice = buf.get(..4).ok_or(ProtocolError)?;
            let host = format!("{}.{}.{}.{}", slice[0], slice[1], slice[2], slice[3]);
            Ok((host, 4))
        }
        AddressKind::Domain => {
            let len = *buf.first().ok_or(ProtocolError)? as usize;
            if len == 0 {
                return Err(ProtocolError);
            }
            let slice = buf.get(1..1 + len).ok_or(ProtocolError)?;
            let host = std::str::from_utf8(slice).map_err(|_| ProtocolError)?.to_owned();
            Ok((host, 1 + len))
        }
        AddressKind::V6 => {
            let slice = buf.get(..16).ok_or(ProtocolError)?;
            let host = render_ipv6(slice);
            Ok((host, 16))
        }
    }
}

/// Render 16 raw bytes as 8 colon-separated 16-bit hex groups, lowercase, no
/// leading zeros, and no `::` compression (each group renders even if `0`).
fn render_ipv6(octets: &[u8]) -> String {
    octets
        .chunks(2)
        .map(|pair| format!("{:x}", u16::from_be_bytes([pair[0], pair[1]])))
        .collect::<Vec<_>>()
        .join(":")
}

/// Re-slice the tail of `buf` starting at `offset`, sharing the backing
/// allocation rather than copying.
pub fn tail(buf: &Bytes, offset: usize) -> Bytes {
    buf.slice(offset..)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_v4() {
        let buf = [10, 0, 0, 1, 0x01, 0xBB];
        let (host, port, len) = decode(&buf, AddressKind::V4).unwrap();
        assert_eq!(host, "10.0.0.1");
        assert_eq!(port, 443);
        assert_eq!(len, 6);
    }

    #[test]
    fn decodes_domain() {
        let mut buf = vec![11u8];
        buf.extend(b"example.com");
        buf.extend([0x01, 0xBB]);
        let (host, port, len) = decode(&buf, AddressKind::Domain).unwrap();
        assert_eq!(host, "example.com");
        assert_eq!(port, 443);
        assert_eq!(len, 1 + 11 + 2);
    }

    #[test]
    fn rejects_empty_domain() {
        let buf = [0u8, 0x01, 0xBB];
        assert!(decode(&buf, AddressKind::Domain).is_err());
    }

    #[test]
    fn decodes_v6_without_compression() {
        let mut buf = vec![0u8; 16];
        buf[14] = 0x00;
        buf[15] = 0x01;
        buf.extend([0x00, 0x35]);
        let (host, port, len) = decode(&buf, AddressKind::V6).unwrap();
        assert_eq!(host, "0:0:0:0:0:0:0:1");
        assert_eq!(port, 53);
        assert_eq!(len, 18);
    }

    #[test]
    fn rejects_short_buffer() {
        let buf = [0x01u8, 0x02, 0x03];
        assert!(decode(&buf, AddressKind::V4).is_err());
        assert!(decode(&buf, AddressKind::V6).is_err());
    }

    #[test]
    fn decode_host_consumes_no_port_bytes() {
        let mut buf = vec![11u8];
        buf.extend(b"example.com");
        buf.extend(b"trailing"); // not a port; decode_host must not touch it
        let (host, len) = decode_host(&buf, AddressKind::Domain).unwrap();
        assert_eq!(host, "example.com");
        assert_eq!(len, 1 + 11);
    }
}
