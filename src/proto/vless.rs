// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! VLESS request header (version 0 only).
//!
//! ```text
//! | ver:1 | uuid:16 | optLen:1 | opt:optLen | cmd:1 | port:2 BE | atyp:1 | addr:* | payload:* |
//! ```
//!
//! `cmd` is `1` for TCP connect, `2` for UDP associate. The server's reply
//! prepends a two-byte response prefix, `[ver, 0]`, to the first
//! outbound-to-client chunk.
use bytes::Bytes;

use super::address::{self, AddressKind};
use super::{Command, ProtocolError, TunnelHeader};

pub fn parse(buf: &Bytes) -> Result<TunnelHeader, ProtocolError> {
    let version = *buf.first().ok_or(ProtocolError)?;
    if version != 0x00 {
        return Err(ProtocolError);
    }

    let uuid = buf.get(1..17).ok_or(ProtocolError)?;
    if uuid.len() != 16 {
        return Err(ProtocolError);
    }

    let opt_len = *buf.get(17).ok_or(ProtocolError)? as usize;
    let mut offset = 18 + opt_len;

    let cmd_byte = *buf.get(offset).ok_or(ProtocolError)?;
    let command = match cmd_byte {
        0x01 => Command::Tcp,
        0x02 => Command::Udp,
        _ => return Err(ProtocolError),
    };
    offset += 1;

    let port_bytes = buf.get(offset..offset + 2).ok_or(ProtocolError)?;
    let port = u16::from_be_bytes([port_bytes[0], port_bytes[1]]);
    offset += 2;

    let atyp = *buf.get(offset).ok_or(ProtocolError)?;
    let kind = match atyp {
        0x01 => AddressKind::V4,
        0x02 => AddressKind::Domain,
        0x03 => AddressKind::V6,
        _ => return Err(ProtocolError),
    };
    offset += 1;

    // VLESS carries the port once, before atyp, with no trailing port after
    // the address field — unlike Trojan/Shadowsocks, which embed it there.
    let (host, addr_len) = address::decode_host(&buf[offset..], kind)?;
    offset += addr_len;

    Ok(TunnelHeader {
        host,
        port,
        command,
        payload: address::tail(buf, offset),
        response_prefix: Some(Bytes::copy_from_slice(&[version, 0])),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Bytes {
        let mut buf = vec![0x00u8];
        buf.extend([
            0x7b, 0x79, 0xe5, 0xe1, 0x0e, 0xb0, 0x4a, 0x88, 0x8b, 0x0f, 0x60, 0xeb, 0xf2, 0xa0,
            0xab, 0x1c,
        ]);
        buf.push(0x00); // opt len
        buf.push(0x01); // cmd: tcp
        buf.extend([0x01, 0xBB]); // port 443
        buf.push(0x02); // atyp domain
        buf.push(0x0b); // len 11
        buf.extend(b"example.com");
        buf.extend(b"GET / HTTP/1.1\r\n\r\n");
        Bytes::from(buf)
    }

    #[test]
    fn parses_domain_tcp() {
        let header = parse(&frame()).unwrap();
        assert_eq!(header.host, "example.com");
        assert_eq!(header.port, 443);
        assert_eq!(header.command, Command::Tcp);
        assert_eq!(&header.payload[..], b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(header.response_prefix.unwrap(), Bytes::from_static(&[0, 0]));
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut buf = frame().to_vec();
        buf[0] = 1;
        assert!(parse(&Bytes::from(buf)).is_err());
    }

    #[test]
    fn rejects_unknown_atyp() {
        let mut buf = frame().to_vec();
        buf[21] = 0x09; // opt_len=0 -> atyp at offset 21
        assert!(parse(&Bytes::from(buf)).is_err());
    }

    #[test]
    fn rejects_truncated_buffer() {
        let buf = frame();
        let short = buf.slice(..30);
        assert!(parse(&short).is_err());
    }

    #[test]
    fn parses_udp_command() {
        let mut buf = frame().to_vec();
        buf[18] = 0x02; // cmd byte, opt_len=0 -> offset 18
        let header = parse(&Bytes::from(buf)).unwrap();
        assert_eq!(header.command, Command::Udp);
        assert!(header.wants_udp_relay());
    }
}
