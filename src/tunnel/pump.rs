// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bidirectional pumps (C7): client-to-outbound (`ingress`) and
//! outbound-to-client (`egress`), including the single retry on an
//! empty-first-read outbound and the UDP relay's per-message loop.
use axum::extract::ws::Message;
use bytes::Bytes;
use futures_util::StreamExt;
use log::{debug, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;

use super::context::{Connection, WsStream};
use super::dial;
use crate::upstream::UpstreamEndpoint;

const READ_CHUNK: usize = 16 * 1024;

/// Splice a response prefix onto the front of one outbound-read chunk. The
/// prefix, when present, is consumed by the caller and must only ever be
/// passed once per connection (P2).
fn combine_chunk(prefix: Option<Bytes>, data: &[u8]) -> Vec<u8> {
    match prefix {
        Some(prefix) => {
            let mut combined = Vec::with_capacity(prefix.len() + data.len());
            combined.extend_from_slice(&prefix);
            combined.extend_from_slice(data);
            combined
        }
        None => data.to_vec(),
    }
}

/// Drive the client-to-outbound direction for a TCP-style session: every
/// subsequent WebSocket binary message is written to whatever stream
/// currently occupies the outbound slot. Returns once the client stream
/// ends or a write fails.
pub async fn ingress_pump(conn: &Connection, mut ws_stream: WsStream) {
    while let Some(msg) = ws_stream.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                debug!("ingress read error: {e}");
                break;
            }
        };
        let data = match msg {
            Message::Binary(b) => b,
            Message::Text(t) => t.into_bytes(),
            Message::Close(_) => break,
            _ => continue,
        };
        if data.is_empty() {
            continue;
        }

        let mut slot = conn.outbound.lock().await;
        let Some(writer) = slot.as_mut() else {
            continue;
        };
        if let Err(e) = writer.write_all(&data).await {
            debug!("ingress write error: {e}");
            break;
        }
    }
}

/// Drive the outbound-to-client direction for a TCP-style session. On a
/// zero-byte first read, and only when `retry_endpoint` is `Some`, redials
/// that endpoint with the same residual payload, installs the new write
/// half in the connection's outbound slot, and continues reading from the
/// new outbound without a response prefix on the second attempt
/// (`SPEC_FULL.md` §4.7, §5).
///
/// Returns the error that ended the session, if any; `Ok(())` is a clean
/// peer-initiated close.
pub async fn egress_pump(
    conn: &Connection,
    mut read_half: OwnedReadHalf,
    mut response_prefix: Option<Bytes>,
    residual_payload: Bytes,
    retry_endpoint: Option<UpstreamEndpoint>,
) -> std::io::Result<()> {
    let mut buf = vec![0u8; READ_CHUNK];
    let mut retry_endpoint = retry_endpoint;

    loop {
        let n = read_half.read(&mut buf).await?;
        if n == 0 {
            if !conn.has_incoming_data() {
                if let Some(endpoint) = retry_endpoint.take() {
                    warn!("outbound closed before any data, retrying via {endpoint}");
                    let stream =
                        dial::dial_tcp(&endpoint.host, endpoint.port, &residual_payload)
                            .await
                            .map_err(|e| {
                                warn!("retry dial to {endpoint} failed: {e}");
                                e
                            })?;
                    let (new_read, new_write) = stream.into_split();
                    *conn.outbound.lock().await = Some(new_write);
                    read_half = new_read;
                    continue;
                }
            }
            return Ok(());
        }

        conn.mark_incoming_data();
        let chunk = combine_chunk(response_prefix.take(), &buf[..n]);
        if conn.send_binary(chunk).await.is_err() {
            return Ok(());
        }
    }
}

/// Run one UDP-relay request/response round trip for a single datagram:
/// dial a fresh relay connection, write the framed request, read back one
/// response chunk, and forward it to the client. The relay connection is
/// discarded afterward; there is no persistent outbound slot for UDP
/// (`SPEC_FULL.md` §4.6, §9).
pub async fn relay_one_datagram(
    conn: &Connection,
    dest_host: &str,
    dest_port: u16,
    payload: &[u8],
    response_prefix: Option<Bytes>,
) -> std::io::Result<()> {
    let mut stream = dial::dial_udp_relay(dest_host, dest_port, payload).await?;
    let mut buf = vec![0u8; READ_CHUNK];
    let n = stream.read(&mut buf).await?;
    if n == 0 {
        return Ok(());
    }
    let chunk = combine_chunk(response_prefix, &buf[..n]);
    let _ = conn.send_binary(chunk).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_prefix_with_first_chunk_only() {
        let prefix = Some(Bytes::from_static(&[1, 2]));
        let combined = combine_chunk(prefix, &[3, 4, 5]);
        assert_eq!(combined, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn passes_through_without_prefix() {
        let combined = combine_chunk(None, &[9, 9]);
        assert_eq!(combined, vec![9, 9]);
    }
}
