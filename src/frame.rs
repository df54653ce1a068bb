// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Frame buffer: materializes each inbound WebSocket message as a single
//! contiguous [`Bytes`] view, and decodes the early-data payload a client
//! may carry in the `sec-websocket-protocol` request header.
//!
//! One buffer is emitted per inbound message; buffers are never merged
//! across messages, so the first buffer must already contain the entire
//! protocol header (partial headers are a caller-side parse error, not
//! something this module retries across messages).
use base64::Engine;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid early-data payload")]
pub struct EarlyDataError;

/// Decode the `sec-websocket-protocol` early-data carrier: base64url,
/// padding-insensitive, with `-`/`_` in place of `+`/`/`.
pub fn decode_early_data(header_value: &str) -> Result<Vec<u8>, EarlyDataError> {
    let normalized: String = header_value
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();

    base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(normalized.trim_end_matches('='))
        .or_else(|_| base64::engine::general_purpose::STANDARD.decode(&normalized))
        .map_err(|_| EarlyDataError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_base64url_without_padding() {
        // "hello" -> "aGVsbG8="
        let encoded = "aGVsbG8"; // url-safe, no padding
        assert_eq!(decode_early_data(encoded).unwrap(), b"hello");
    }

    #[test]
    fn decodes_with_dash_underscore_alphabet() {
        let bytes = [0xFFu8, 0xFE, 0xFD];
        let std_b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
        let url_variant: String = std_b64
            .trim_end_matches('=')
            .chars()
            .map(|c| match c {
                '+' => '-',
                '/' => '_',
                c => c,
            })
            .collect();
        assert_eq!(decode_early_data(&url_variant).unwrap(), bytes);
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(decode_early_data("not valid base64!!!").is_err());
    }
}
