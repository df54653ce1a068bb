// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Upstream selection: turn the tunnel route's path segment into a concrete
//! dial target.
//!
//! Two URL shapes are recognized (see `SPEC_FULL.md` §4.4 and §6):
//!
//! - `/<host>[-:=]<port>` — a direct endpoint.
//! - `/<REGION>(,<REGION>)*` — one region is chosen uniformly at random from
//!   the comma-joined list, then one `ip:port` is chosen uniformly at
//!   random from that region's configured pool.
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

use rand::seq::SliceRandom;
use rand::Rng;

/// `{ "CC": ["ip:port", ...], ... }`, as loaded from the `PROXY_LIST`
/// environment variable.
pub type ProxyList = HashMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamEndpoint {
    pub host: String,
    pub port: u16,
}

impl Display for UpstreamEndpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    #[error("region not configured")]
    UnknownRegion,
    #[error("region has no configured proxies")]
    RegionEmpty,
    #[error("malformed endpoint segment")]
    Malformed,
}

/// What the tunnel route's path segment, on its own, asks for. Resolving a
/// `Region` still requires the configured [`ProxyList`]; resolving `Direct`
/// does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSelector {
    /// `/<host>[-:=]<port>`
    Direct(UpstreamEndpoint),
    /// `/<REGION>(,<REGION>)*`
    Region(Vec<String>),
}

/// Parse a request path's single segment (no leading slash) into a
/// [`PathSelector`]. Returns `None` when the segment matches neither shape
/// (the caller should then treat the route as not-a-tunnel-entry, i.e. 404).
pub fn parse_path(segment: &str) -> Option<PathSelector> {
    if let Some(endpoint) = parse_direct(segment) {
        return Some(PathSelector::Direct(endpoint));
    }
    if let Some(regions) = parse_regions(segment) {
        return Some(PathSelector::Region(regions));
    }
    None
}

fn parse_direct(segment: &str) -> Option<UpstreamEndpoint> {
    let sep_pos = segment.rfind(['-', ':', '='])?;
    let (host, rest) = segment.split_at(sep_pos);
    let port_str = &rest[1..];
    if host.is_empty() {
        return None;
    }
    let port: u16 = port_str.parse().ok()?;
    Some(UpstreamEndpoint {
        host: host.to_owned(),
        port,
    })
}

fn parse_regions(segment: &str) -> Option<Vec<String>> {
    if segment.is_empty() {
        return None;
    }
    let codes: Vec<&str> = segment.split(',').collect();
    if codes
        .iter()
        .all(|c| c.len() == 2 && c.chars().all(|ch| ch.is_ascii_uppercase()))
    {
        Some(codes.into_iter().map(str::to_owned).collect())
    } else {
        None
    }
}

/// Resolve a [`PathSelector`] into a concrete endpoint, consulting
/// `proxy_list` and drawing randomness from `rng` for the `Region` case.
pub fn resolve(
    selector: &PathSelector,
    proxy_list: &ProxyList,
    rng: &mut impl Rng,
) -> Result<UpstreamEndpoint, UpstreamError> {
    match selector {
        PathSelector::Direct(endpoint) => Ok(endpoint.clone()),
        PathSelector::Region(codes) => {
            let code = codes.choose(rng).ok_or(UpstreamError::Malformed)?;
            let pool = proxy_list.get(code).ok_or(UpstreamError::UnknownRegion)?;
            let picked = pool.choose(rng).ok_or(UpstreamError::RegionEmpty)?;
            parse_direct(picked).ok_or(UpstreamError::Malformed)
        }
    }
}

/// Draw one endpoint uniformly at random from the entire configured pool
/// (a random region, then a random `ip:port` within it). Used to populate
/// the connection's single retry candidate (`SPEC_FULL.md` §4.7).
pub fn random_endpoint(
    proxy_list: &ProxyList,
    rng: &mut impl Rng,
) -> Option<UpstreamEndpoint> {
    let codes: Vec<&String> = proxy_list.keys().collect();
    let code = codes.choose(rng)?;
    let pool = proxy_list.get(*code)?;
    let picked = pool.choose(rng)?;
    parse_direct(picked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    fn proxy_list() -> ProxyList {
        let mut map = ProxyList::new();
        map.insert("SG".into(), vec!["203.0.113.5:443".into()]);
        map
    }

    #[test]
    fn parses_direct_with_dash() {
        let sel = parse_path("1.2.3.4-8080").unwrap();
        assert_eq!(
            sel,
            PathSelector::Direct(UpstreamEndpoint {
                host: "1.2.3.4".into(),
                port: 8080
            })
        );
    }

    #[test]
    fn parses_direct_with_colon_and_equals() {
        assert!(matches!(parse_path("host:443"), Some(PathSelector::Direct(_))));
        assert!(matches!(parse_path("host=443"), Some(PathSelector::Direct(_))));
    }

    #[test]
    fn parses_region_list() {
        let sel = parse_path("SG,JP").unwrap();
        assert_eq!(sel, PathSelector::Region(vec!["SG".into(), "JP".into()]));
    }

    #[test]
    fn rejects_garbage_segment() {
        assert_eq!(parse_path("not-a-valid-thing-!!"), None);
    }

    #[test]
    fn resolves_region_to_configured_endpoint() {
        let sel = PathSelector::Region(vec!["SG".into()]);
        let mut rng = StepRng::new(0, 1);
        let endpoint = resolve(&sel, &proxy_list(), &mut rng).unwrap();
        assert_eq!(endpoint.host, "203.0.113.5");
        assert_eq!(endpoint.port, 443);
    }

    #[test]
    fn unknown_region_is_an_error() {
        let sel = PathSelector::Region(vec!["ZZ".into()]);
        let mut rng = StepRng::new(0, 1);
        assert_eq!(
            resolve(&sel, &proxy_list(), &mut rng),
            Err(UpstreamError::UnknownRegion)
        );
    }

    #[test]
    fn empty_region_pool_is_an_error() {
        let mut list = proxy_list();
        list.insert("EU".into(), vec![]);
        let sel = PathSelector::Region(vec!["EU".into()]);
        let mut rng = StepRng::new(0, 1);
        assert_eq!(
            resolve(&sel, &list, &mut rng),
            Err(UpstreamError::RegionEmpty)
        );
    }
}
