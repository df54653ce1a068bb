// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Trojan request header.
//!
//! ```text
//! | hash_hex:56 | CRLF:2 | cmd:1 | atyp:1 | addr:* | port:2 BE | CRLF:2 | payload:* |
//! ```
//!
//! `cmd` is `1` for TCP connect, `3` for UDP associate. No response prefix
//! is sent. The 56-byte password hash is parsed but never verified against
//! any configured secret — treated purely as protocol framing (see the
//! crate's design notes on this non-goal).
use std::fmt::{self, Display, Formatter};

use super::address::{self, AddressKind};
use super::{Command, ProtocolError, TunnelHeader};

const CRLF: [u8; 2] = [0x0D, 0x0A];

/// SHA224 password digest, presented in the wire format as 56 lowercase hex
/// characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Password {
    pub raw: [u8; 28],
}

impl Password {
    pub fn from_hex(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let bytes = bytes.get(..56).ok_or(ProtocolError)?;
        let mut raw = [0u8; 28];
        for (i, slot) in raw.iter_mut().enumerate() {
            *slot = hex_byte(bytes[i * 2], bytes[i * 2 + 1])?;
        }
        Ok(Password { raw })
    }
}

impl Display for Password {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for b in self.raw {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

fn hex_byte(hi: u8, lo: u8) -> Result<u8, ProtocolError> {
    Ok(hex_nibble(hi)? << 4 | hex_nibble(lo)?)
}

fn hex_nibble(c: u8) -> Result<u8, ProtocolError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(ProtocolError),
    }
}

pub fn parse(buf: &bytes::Bytes) -> Result<TunnelHeader, ProtocolError> {
    let head = buf.get(..59).ok_or(ProtocolError)?;
    let _password = Password::from_hex(&head[..56])?;
    if head[56..58] != CRLF {
        return Err(ProtocolError);
    }
    let command = match head[58] {
        0x01 => Command::Tcp,
        0x03 => Command::Udp,
        _ => return Err(ProtocolError),
    };

    let atyp = *buf.get(59).ok_or(ProtocolError)?;
    let kind = match atyp {
        0x01 => AddressKind::V4,
        0x03 => AddressKind::Domain,
        0x04 => AddressKind::V6,
        _ => return Err(ProtocolError),
    };

    let (host, port, addr_len) = address::decode(&buf[60..], kind)?;
    let offset = 60 + addr_len;

    let trailer = buf.get(offset..offset + 2).ok_or(ProtocolError)?;
    if trailer != CRLF {
        return Err(ProtocolError);
    }
    let offset = offset + 2;

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
    use bytes::Bytes;

    fn frame() -> Bytes {
        let mut buf = vec![b'a'; 56];
        buf.extend(CRLF);
        buf.push(0x01); // cmd: tcp
        buf.push(0x01); // atyp: v4
        buf.extend([8, 8, 8, 8]);
        buf.extend([0x00, 0x35]); // port 53
        buf.extend(CRLF);
        buf.extend(b"query");
        Bytes::from(buf)
    }

    #[test]
    fn parses_ipv4_tcp() {
        let header = parse(&frame()).unwrap();
        assert_eq!(header.host, "8.8.8.8");
        assert_eq!(header.port, 53);
        assert_eq!(header.command, Command::Tcp);
        assert_eq!(&header.payload[..], b"query");
        assert!(header.response_prefix.is_none());
    }

    #[test]
    fn rejects_missing_first_crlf() {
        let mut buf = frame().to_vec();
        buf[56] = b'x';
        assert!(parse(&Bytes::from(buf)).is_err());
    }

    #[test]
    fn rejects_missing_second_crlf() {
        let mut buf = frame().to_vec();
        let len = buf.len();
        buf[len - 1 - 5] = b'x';
        assert!(parse(&Bytes::from(buf)).is_err());
    }

    #[test]
    fn rejects_unsupported_command() {
        let mut buf = frame().to_vec();
        buf[58] = 0x02;
        assert!(parse(&Bytes::from(buf)).is_err());
    }

    #[test]
    fn password_hash_is_accepted_without_verification() {
        let mut buf = frame().to_vec();
        buf[0] = b'b'; // a different password entirely, still valid hex
        assert!(parse(&Bytes::from(buf)).is_ok());
    }
}
