//! URL merge helper and the HSTS preload query contract.

use std::collections::HashSet;
use url::Url;

/// The "boolean query" contract the send pipeline relies on. A real deployment
/// would back this with the Chromium HSTS preload database; no such crate is
/// available in this registry (see DESIGN.md), so [`StaticHstsPreloadList`] is the
/// default implementation and is swappable via `ClientBuilder::hsts_preload_list`.
pub trait HstsPreloadList: Send + Sync {
    fn is_preloaded(&self, host: &str) -> bool;
}

/// A small, hardcoded set of well-known always-HTTPS hosts.
pub struct StaticHstsPreloadList {
    hosts: HashSet<String>,
}

impl Default for StaticHstsPreloadList {
    fn default() -> Self {
        let hosts = [
            "example.com",
            "www.example.com",
            "accounts.google.com",
            "github.com",
            "www.github.com",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        Self { hosts }
    }
}

impl StaticHstsPreloadList {
    pub fn new(hosts: impl IntoIterator<Item = String>) -> Self {
        Self {
            hosts: hosts.into_iter().collect(),
        }
    }
}

impl HstsPreloadList for StaticHstsPreloadList {
    fn is_preloaded(&self, host: &str) -> bool {
        self.hosts.contains(host)
    }
}

/// Join `relative` against `base`, then upgrade `http` to `https` if the merged
/// host is in the HSTS preload list. Ported from
/// `httpx/client.py::BaseClient.merge_url`.
pub fn merge_url(base: &Url, relative: &str, hsts: &dyn HstsPreloadList) -> Result<Url, url::ParseError> {
    let mut url = base.join(relative)?;
    if url.scheme() == "http" {
        if let Some(host) = url.host_str() {
            if hsts.is_preloaded(host) {
                let _ = url.set_scheme("https");
            }
        }
    }
    Ok(url)
}
