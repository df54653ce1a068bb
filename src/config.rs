// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Environment-sourced configuration: the external collaborator the tunnel
//! engine itself treats as opaque input (`SPEC_FULL.md` §1, §6).
use std::env;
use std::net::SocketAddr;

use log::LevelFilter;
use thiserror::Error;

use crate::upstream::ProxyList;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("{0} is not a well-formed v4 UUID")]
    InvalidUuid(&'static str),
    #[error("PROXY_LIST is not valid JSON: {0}")]
    InvalidProxyList(#[from] serde_json::Error),
    #[error("BIND_ADDR is not a valid socket address: {0}")]
    InvalidBindAddr(std::net::AddrParseError),
}

pub struct AppConfig {
    /// Configured server UUID. The tunnel engine never checks inbound VLESS
    /// UUIDs against this value (non-goal, `SPEC_FULL.md` §1); it exists so
    /// operators can wire up strict matching behind their own config flag.
    pub uuid: String,
    pub main_page_url: String,
    pub sub_page_url: String,
    pub link_page_url: String,
    pub converter_page_url: String,
    pub checker_page_url: String,
    pub proxy_list: ProxyList,
    pub bind_addr: SocketAddr,
    pub log_level: LevelFilter,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let uuid = required("UUID")?;
        if !is_well_formed_uuid(&uuid) {
            return Err(ConfigError::InvalidUuid("UUID"));
        }

        let proxy_list_raw = required("PROXY_LIST")?;
        let proxy_list: ProxyList = serde_json::from_str(&proxy_list_raw)?;

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_owned())
            .parse()
            .map_err(ConfigError::InvalidBindAddr)?;

        let log_level = env::var("LOG_LEVEL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(LevelFilter::Info);

        Ok(AppConfig {
            uuid,
            main_page_url: required("MAIN_PAGE_URL")?,
            sub_page_url: required("SUB_PAGE_URL")?,
            link_page_url: required("LINK_PAGE_URL")?,
            converter_page_url: required("CONVERTER_PAGE_URL")?,
            checker_page_url: required("CHECKER_PAGE_URL")?,
            proxy_list,
            bind_addr,
            log_level,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn is_well_formed_uuid(s: &str) -> bool {
    let bytes = s.as_bytes();
    let dashes = [8, 13, 18, 23];
    if bytes.len() != 36 {
        return false;
    }
    for (i, &b) in bytes.iter().enumerate() {
        if dashes.contains(&i) {
            if b != b'-' {
                return false;
            }
        } else if !b.is_ascii_hexdigit() {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_uuid() {
        assert!(is_well_formed_uuid("7b79e5e1-0eb0-4a88-8b0f-60ebf2a0ab1c"));
        assert!(is_well_formed_uuid("7B79E5E1-0EB0-4A88-8B0F-60EBF2A0AB1C"));
    }

    #[test]
    fn rejects_malformed_uuid() {
        assert!(!is_well_formed_uuid("not-a-uuid"));
        assert!(!is_well_formed_uuid("7b79e5e10eb04a888b0f60ebf2a0ab1c"));
        assert!(!is_well_formed_uuid(""));
    }
}
