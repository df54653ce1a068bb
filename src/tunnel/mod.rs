// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection lifecycle orchestration (C8): wires the frame buffer (C1),
//! protocol detection and parsing (C2/C3), upstream selection (C4), the
//! outbound dialer and UDP relay adapter (C5/C6), and the pumps (C7) into
//! one run per accepted WebSocket.
//!
//! State machine: `AwaitHeader -> Dialing -> Forwarding -> Closing`. Every
//! exit path, success or failure, funnels through [`Connection::close`]
//! exactly once.
pub mod context;
pub mod dial;
pub mod error;
pub mod pump;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use log::{error, info, warn};
use tokio::net::TcpStream;

use crate::frame;
use crate::proto::{self, Protocol, TunnelHeader};
use crate::upstream::{self, ProxyList, UpstreamEndpoint};
use context::Connection;
use error::TunnelError;

/// Everything the lifecycle needs that is not carried on the wire itself.
/// `resolved_endpoint` is the already-resolved path-supplied upstream
/// override, if the inbound path named one — resolution (including the
/// region-pool lookup that can fail with a plain HTTP 502) happens in
/// `http::ws::tunnel_entry` before the WebSocket upgrade, so by the time a
/// [`RouteContext`] exists the override can no longer fail.
pub struct RouteContext<'a> {
    pub resolved_endpoint: Option<UpstreamEndpoint>,
    pub proxy_list: &'a ProxyList,
}

/// Drive one accepted WebSocket end to end. The first protocol buffer
/// comes from `early_data` (the decoded `sec-websocket-protocol` carrier,
/// when the client sent one) or, absent that, the first WebSocket message.
/// Detects and parses the protocol header, resolves a dial target, pumps
/// bytes in both directions (with the one-shot retry), and always leaves
/// the socket closed exactly once.
pub async fn run(ws: WebSocket, route: RouteContext<'_>, early_data: Option<String>) {
    let (mut ws_sink, mut ws_stream) = ws.split();

    let first = if let Some(raw) = early_data {
        match frame::decode_early_data(&raw) {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                let err = TunnelError::from(e);
                log_outcome(&err);
                close_sink(&mut ws_sink, err.close_code()).await;
                return;
            }
        }
    } else {
        match ws_stream.next().await {
            Some(Ok(Message::Binary(b))) => Bytes::from(b),
            Some(Ok(Message::Text(t))) => Bytes::from(t.into_bytes()),
            _ => return,
        }
    };

    let protocol = proto::detect(&first);
    let header = match parse_header(protocol, &first) {
        Ok(h) => h,
        Err(e) => {
            log_outcome(&e);
            close_sink(&mut ws_sink, e.close_code()).await;
            return;
        }
    };

    let is_dns = protocol == Protocol::Shadowsocks && header.port == 53;
    let conn = Connection::new(ws_sink, protocol, is_dns);

    let result = if header.wants_udp_relay() {
        run_udp(&conn, header, ws_stream).await
    } else {
        run_tcp(&conn, header, ws_stream, &route).await
    };

    match result {
        Ok(()) => conn.close(1000, "done").await,
        Err(e) => {
            log_outcome(&e);
            conn.close(e.close_code(), "error").await;
        }
    }
}

/// Close the raw WebSocket sink directly, for the two failure paths that
/// precede a [`Connection`] existing (no protocol has been detected yet,
/// so there is nothing to build one around).
async fn close_sink(sink: &mut context::WsSink, code: u16) {
    let frame = CloseFrame {
        code,
        reason: "error".into(),
    };
    let _ = sink.send(Message::Close(Some(frame))).await;
    let _ = sink.close().await;
}

fn parse_header(protocol: Protocol, buf: &Bytes) -> Result<TunnelHeader, TunnelError> {
    let header = match protocol {
        Protocol::Vless => proto::parse_vless(buf)?,
        Protocol::Trojan => proto::parse_trojan(buf)?,
        Protocol::Shadowsocks => proto::parse_shadowsocks(buf)?,
    };
    Ok(header)
}

fn log_outcome(err: &TunnelError) {
    if err.is_benign() {
        return;
    }
    match err {
        TunnelError::HeaderMalformed(_) => warn!("rejecting connection: {err}"),
        _ => error!("connection ended: {err}"),
    }
}

/// Resolve the dial target and retry candidate. A path-supplied endpoint
/// overrides the header destination as the actual dial target; absent a
/// path override, the header destination is the fallback target and a
/// random pool endpoint becomes the retry candidate (`SPEC_FULL.md` §4.4,
/// §4.7 — resolved Open Question).
fn resolve_targets(
    header: &TunnelHeader,
    route: &RouteContext<'_>,
) -> (UpstreamEndpoint, Option<UpstreamEndpoint>) {
    match &route.resolved_endpoint {
        Some(endpoint) => (endpoint.clone(), None),
        None => {
            let target = UpstreamEndpoint {
                host: header.host.clone(),
                port: header.port,
            };
            let mut rng = rand::thread_rng();
            let retry = upstream::random_endpoint(route.proxy_list, &mut rng);
            (target, retry)
        }
    }
}

async fn run_tcp(
    conn: &Connection,
    header: TunnelHeader,
    ws_stream: context::WsStream,
    route: &RouteContext<'_>,
) -> Result<(), TunnelError> {
    let (target, mut retry_endpoint) = resolve_targets(&header, route);

    let stream: TcpStream = match dial::dial_tcp(&target.host, target.port, &header.payload).await
    {
        Ok(s) => {
            info!("dialed {target} ({})", header.command);
            s
        }
        Err(e) => match retry_endpoint.take() {
            Some(endpoint) => {
                warn!("primary dial to {target} failed: {e}, retrying via {endpoint}");
                dial::dial_tcp(&endpoint.host, endpoint.port, &header.payload)
                    .await
                    .map_err(TunnelError::DialFailed)?
            }
            None => return Err(TunnelError::DialFailed(e)),
        },
    };

    let (read_half, write_half) = stream.into_split();
    *conn.outbound.lock().await = Some(write_half);

    let egress = pump::egress_pump(
        conn,
        read_half,
        header.response_prefix.clone(),
        header.payload.clone(),
        retry_endpoint,
    );
    let ingress = pump::ingress_pump(conn, ws_stream);

    tokio::select! {
        res = egress => res.map_err(TunnelError::PumpBroken),
        _ = ingress => Ok(()),
        _ = conn.cancel.cancelled() => Ok(()),
    }
}

/// UDP command sessions treat the header's residual payload and every
/// subsequent WebSocket message as one datagram each, relayed to the same
/// header-parsed destination: a fresh relay connection per message,
/// matching the per-message continuity model (`SPEC_FULL.md` §9).
async fn run_udp(
    conn: &Connection,
    header: TunnelHeader,
    mut ws_stream: context::WsStream,
) -> Result<(), TunnelError> {
    let mut prefix = header.response_prefix.clone();
    if !header.payload.is_empty() {
        pump::relay_one_datagram(conn, &header.host, header.port, &header.payload, prefix.take())
            .await
            .map_err(TunnelError::DialFailed)?;
    }

    while let Some(msg) = ws_stream.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(_) => break,
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
        pump::relay_one_datagram(conn, &header.host, header.port, &data, prefix.take())
            .await
            .map_err(TunnelError::DialFailed)?;
    }
    Ok(())
}
