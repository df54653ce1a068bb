// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shadowsocks request header.
//!
//! ```text
//! | atyp:1 | addr:* | port:2 BE | payload:* |
//! ```
//!
//! There is no explicit command byte: the command is inferred as UDP when
//! the destination port is 53 (a DNS query), TCP otherwise. No response
//! prefix is sent. This is the detector's catch-all classification, so the
//! cipher suite itself is out of scope — the payload is forwarded opaquely.
use bytes::Bytes;

use super::address::{self, AddressKind};
use super::{Command, ProtocolError, TunnelHeader};

pub fn parse(buf: &Bytes) -> Result<TunnelHeader, ProtocolError> {
    let atyp = *buf.first().ok_or(ProtocolError)?;
    let kind = match atyp {
        0x01 => AddressKind::V4,
        0x03 => AddressKind::Domain,
        0x04 => AddressKind::V6,
        _ => return Err(ProtocolError),
    };

    let (host, port, addr_len) = address::decode(&buf[1..], kind)?;
    let offset = 1 + addr_len;

    let command = if port == 53 { Command::Udp } else { Command::Tcp };

    Ok(TunnelHeader {
        host,
        port,
        command,
        payload: address::tail(buf, offset),
        response_prefix: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_udp_from_dns_port() {
        let mut buf = vec![0x01u8, 1, 1, 1, 1, 0x00, 0x35];
        buf.extend([0xAAu8; 8]);
        let header = parse(&Bytes::from(buf)).unwrap();
        assert_eq!(header.host, "1.1.1.1");
        assert_eq!(header.command, Command::Udp);
        assert!(header.wants_udp_relay());
        assert_eq!(header.payload.len(), 8);
    }

    #[test]
    fn infers_tcp_for_other_ports() {
        let buf = vec![0x01u8, 1, 1, 1, 1, 0x01, 0xBB];
        let header = parse(&Bytes::from(buf)).unwrap();
        assert_eq!(header.command, Command::Tcp);
    }

    #[test]
    fn rejects_unknown_atyp() {
        let buf = vec![0x02u8, 1, 1, 1, 1, 0x01, 0xBB];
        assert!(parse(&Bytes::from(buf)).is_err());
    }
}
