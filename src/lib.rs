// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Edge tunnel
//!
//! A WebSocket-terminating edge proxy that auto-detects one of several
//! tunneling protocols (VLESS, Trojan, Shadowsocks) from the first client
//! frame, extracts the intended destination, and relays the remaining
//! payload to either that destination, a region-selected upstream relay, or
//! a UDP-over-TCP gateway.
pub mod config;
pub mod frame;
pub mod http;
pub mod proto;
pub mod tunnel;
pub mod upstream;
