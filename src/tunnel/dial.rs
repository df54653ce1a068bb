// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outbound dialer (C5) and UDP relay adapter (C6).
//!
//! The UDP relay adapter never opens a UDP socket; it opens a TCP
//! connection to a fixed relay host and frames every payload as
//! `udp:HOST:PORT|PAYLOAD` (`SPEC_FULL.md` §4.6).
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Fixed UDP relay endpoint. Not configurable: the reference implementation
/// hardcodes a single operator-run gateway.
pub const UDP_RELAY_HOST: &str = "udp-relay.hobihaus.space";
pub const UDP_RELAY_PORT: u16 = 7300;

/// Open a TCP connection to `(host, port)` and write `payload` in one shot
/// before returning the connected stream, honoring the ordering guarantee
/// that the residual payload reaches the outbound before any later ingress
/// chunk (`SPEC_FULL.md` §5).
pub async fn dial_tcp(host: &str, port: u16, payload: &[u8]) -> std::io::Result<TcpStream> {
    let mut stream = TcpStream::connect((host, port)).await?;
    if !payload.is_empty() {
        stream.write_all(payload).await?;
    }
    Ok(stream)
}

/// Build the `udp:HOST:PORT|PAYLOAD` wire frame for one UDP datagram.
pub fn frame_udp_relay_message(dest_host: &str, dest_port: u16, payload: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(dest_host.len() + 16 + payload.len());
    framed.extend_from_slice(b"udp:");
    framed.extend_from_slice(dest_host.as_bytes());
    framed.push(b':');
    framed.extend_from_slice(dest_port.to_string().as_bytes());
    framed.push(b'|');
    framed.extend_from_slice(payload);
    framed
}

/// Dial the fixed UDP relay host and write one framed datagram. Per-message
/// model (`SPEC_FULL.md` §9): every UDP-framed WebSocket message gets its
/// own relay connection, rather than reusing one relay TCP connection
/// across the session's lifetime.
pub async fn dial_udp_relay(
    dest_host: &str,
    dest_port: u16,
    payload: &[u8],
) -> std::io::Result<TcpStream> {
    let framed = frame_udp_relay_message(dest_host, dest_port, payload);
    dial_tcp(UDP_RELAY_HOST, UDP_RELAY_PORT, &framed).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_udp_relay_message() {
        let framed = frame_udp_relay_message("1.1.1.1", 53, b"\x00\x01\x02");
        assert_eq!(framed, b"udp:1.1.1.1:53|\x00\x01\x02");
    }

    #[test]
    fn frames_domain_destination() {
        let framed = frame_udp_relay_message("example.com", 443, b"x");
        assert_eq!(framed, b"udp:example.com:443|x");
    }
}
