// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! First-frame protocol classification.
//!
//! Trojan is checked first: its fixed-offset CRLF + command byte is a
//! stronger structural anchor than the VLESS UUID shape check, which could
//! otherwise false-match inside an arbitrary Trojan password hash. Anything
//! that matches neither is treated as Shadowsocks, the catch-all with no
//! further validation of its own.
//!
//! The detector never consults the server's configured UUID — any
//! v4-shaped 16 bytes are accepted as a VLESS signature. See the crate's
//! design notes for why this is intentional, not a bug.
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Vless,
    Trojan,
    Shadowsocks,
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Protocol::Vless => "vless",
            Protocol::Trojan => "trojan",
            Protocol::Shadowsocks => "shadowsocks",
        };
        f.write_str(s)
    }
}

pub fn detect(buf: &[u8]) -> Protocol {
    if looks_like_trojan(buf) {
        Protocol::Trojan
    } else if buf.len() >= 17 && looks_like_uuid_v4(&buf[1..17]) {
        Protocol::Vless
    } else {
        Protocol::Shadowsocks
    }
}

fn looks_like_trojan(buf: &[u8]) -> bool {
    if buf.len() < 62 {
        return false;
    }
    buf[56] == 0x0D
        && buf[57] == 0x0A
        && matches!(buf[58], 0x01 | 0x03 | 0x7F)
        && matches!(buf[59], 0x01 | 0x03 | 0x04)
}

/// `bytes` must be exactly the 16 raw UUID bytes (not hex text). Checks the
/// version (high nibble of byte 6 is `4`) and variant (top two bits of byte
/// 8 are `10`) nibbles that a textual
/// `xxxxxxxx-xxxx-4xxx-[89ab]xxx-xxxxxxxxxxxx` pattern would require.
fn looks_like_uuid_v4(bytes: &[u8]) -> bool {
    bytes.len() == 16 && (bytes[6] >> 4) == 4 && (bytes[8] & 0xC0) == 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vless_uuid_bytes() -> Vec<u8> {
        // 7b79e5e1-0eb0-4a88-8b0f-60ebf2a0ab1c
        vec![
            0x7b, 0x79, 0xe5, 0xe1, 0x0e, 0xb0, 0x4a, 0x88, 0x8b, 0x0f, 0x60, 0xeb, 0xf2, 0xa0,
            0xab, 0x1c,
        ]
    }

    #[test]
    fn detects_vless_by_uuid_shape() {
        let mut buf = vec![0x00u8];
        buf.extend(vless_uuid_bytes());
        buf.extend([0u8; 10]);
        assert_eq!(detect(&buf), Protocol::Vless);
    }

    #[test]
    fn detects_trojan_by_crlf_anchor() {
        let mut buf = vec![b'a'; 56];
        buf.extend([0x0D, 0x0A, 0x01, 0x01, 0x08, 0x08]);
        assert_eq!(detect(&buf), Protocol::Trojan);
    }

    #[test]
    fn trojan_anchor_wins_over_uuid_shape() {
        // A 56-byte hash that happens to contain a v4-shaped run at [1,17)
        // must still classify as Trojan because of the stronger anchor.
        let mut buf = vec![0u8];
        buf.extend(vless_uuid_bytes());
        buf.extend([0u8; 39]);
        buf.extend([0x0D, 0x0A, 0x01, 0x01, 0x08, 0x08]);
        assert_eq!(buf.len(), 62);
        assert_eq!(detect(&buf), Protocol::Trojan);
    }

    #[test]
    fn falls_back_to_shadowsocks() {
        let buf = [0x01u8, 1, 2, 3, 4, 0x00, 0x35];
        assert_eq!(detect(&buf), Protocol::Shadowsocks);
    }

    #[test]
    fn short_buffer_is_shadowsocks() {
        assert_eq!(detect(&[0x01]), Protocol::Shadowsocks);
    }
}
