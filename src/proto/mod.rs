// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tunneling protocol auto-detection and header parsing.
//!
//! The first frame of a client's WebSocket byte stream is classified as one
//! of [`Protocol::Vless`], [`Protocol::Trojan`], or [`Protocol::Shadowsocks`]
//! by [`detect`], then handed to the matching parser in [`parse_vless`],
//! [`parse_trojan`], or [`parse_shadowsocks`]. All three parsers produce a
//! [`TunnelHeader`]: the destination, the command, the response prefix (if
//! any), and the residual payload that must reach the outbound verbatim.
use std::fmt::{self, Display, Formatter};

use bytes::Bytes;

mod address;
mod detect;
mod shadowsocks;
mod trojan;
mod vless;

pub use address::AddressKind;
pub use detect::{detect, Protocol};
pub use shadowsocks::parse as parse_shadowsocks;
pub use trojan::{parse as parse_trojan, Password};
pub use vless::parse as parse_vless;

/// Marker error: the buffer does not conform to the shape its protocol
/// requires (too short, bad CRLF anchor, unknown address type, unsupported
/// command). Carries no data; context is added by the caller when logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolError;

impl Display for ProtocolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("malformed protocol header")
    }
}

impl std::error::Error for ProtocolError {}

/// Relay command carried by the protocol header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Open a TCP connection to the destination.
    Tcp,
    /// Relay UDP datagrams to the destination via the UDP relay adapter.
    Udp,
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Command::Tcp => "tcp",
            Command::Udp => "udp",
        };
        f.write_str(s)
    }
}

/// The result of parsing a protocol header out of the first client frame.
///
/// `host`/`port` are the destination the client asked for; `payload` is the
/// slice of the original frame left over after the header (never including
/// the header bytes themselves); `response_prefix`, when present, must be
/// prepended to the first outbound-to-client chunk exactly once.
#[derive(Debug, Clone)]
pub struct TunnelHeader {
    pub host: String,
    pub port: u16,
    pub command: Command,
    pub payload: Bytes,
    pub response_prefix: Option<Bytes>,
}

impl TunnelHeader {
    /// `true` when this header should be routed through the UDP relay
    /// adapter: either the command explicitly says UDP, or (Shadowsocks has
    /// no command byte) the destination port is 53.
    pub fn wants_udp_relay(&self) -> bool {
        self.command == Command::Udp || self.port == 53
    }
}
