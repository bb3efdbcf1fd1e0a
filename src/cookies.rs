//! Cookie jar.
//!
//! A minimal, in-memory, jar-like store over the `cookie` crate's value type,
//! keyed by `(domain, path, name)` so that `update_from`/`extract_from` behave
//! like a real multi-host jar rather than a single flat map. Persistent
//! (disk-backed) storage is a declared Non-goal (§1).

use crate::response::Response;
use cookie::Cookie;
use std::collections::HashMap;
use url::Url;

#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    // Keyed by (domain, path, name) so cookies scoped to different hosts/paths
    // with the same name don't clobber each other.
    entries: HashMap<(String, String, String), Cookie<'static>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key_for(domain: &str, cookie: &Cookie<'static>) -> (String, String, String) {
        (
            domain.to_ascii_lowercase(),
            cookie.path().unwrap_or("/").to_string(),
            cookie.name().to_string(),
        )
    }

    /// Insert a single cookie, scoped to `domain` unless the cookie specifies its
    /// own `Domain` attribute.
    pub fn insert(&mut self, domain: &str, cookie: Cookie<'static>) {
        let scope = cookie.domain().map(str::to_string).unwrap_or_else(|| domain.to_string());
        let key = Self::key_for(&scope, &cookie);
        self.entries.insert(key, cookie);
    }

    /// Merge another jar's entries on top of this one (later wins).
    pub fn update_from(&mut self, other: &CookieJar) {
        for (key, cookie) in &other.entries {
            self.entries.insert(key.clone(), cookie.clone());
        }
    }

    /// Merge a plain name/value map, scoped to `domain`.
    pub fn update_from_map(&mut self, domain: &str, map: &HashMap<String, String>) {
        for (name, value) in map {
            self.insert(domain, Cookie::new(name.clone(), value.clone()));
        }
    }

    /// Harvest `Set-Cookie` headers from a response into this jar, scoped to the
    /// response's host. This is the side-effecting `extract_cookies(response)`
    /// operation the send/redirect pipeline invokes exactly once per hop.
    pub fn extract_from(&mut self, response: &Response) {
        let Some(host) = response.url.host_str() else {
            return;
        };
        let host = host.to_string();
        for raw in response.headers.get_all(reqwest::header::SET_COOKIE) {
            let Ok(raw_str) = raw.to_str() else { continue };
            let Ok(cookie) = Cookie::parse(raw_str.to_string()) else {
                continue;
            };
            self.insert(&host, cookie);
        }
    }

    /// Build the `Cookie:` request header value applicable to `url`, or `None` if
    /// no stored cookie matches.
    pub fn header_value_for(&self, url: &Url) -> Option<String> {
        let host = url.host_str()?.to_ascii_lowercase();
        let path = url.path();
        let is_secure_context = url.scheme() == "https";
        let mut parts = Vec::new();
        for ((domain, cookie_path, _name), cookie) in &self.entries {
            if !domain_matches(&host, domain) {
                continue;
            }
            if !path.starts_with(cookie_path.as_str()) && cookie_path != "/" {
                continue;
            }
            if cookie.secure() == Some(true) && !is_secure_context {
                continue;
            }
            parts.push(format!("{}={}", cookie.name(), cookie.value()));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

fn domain_matches(host: &str, cookie_domain: &str) -> bool {
    host == cookie_domain || host.ends_with(&format!(".{cookie_domain}"))
}
