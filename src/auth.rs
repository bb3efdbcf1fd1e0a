//! Authentication.
//!
//! Models the source's dynamic-dispatch/duck-typed auth as an explicit sum type
//! plus a transform capability for anything beyond Basic, per SPEC_FULL.md §9.

use crate::request::PreparedRequest;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A transformation from a prepared request to a prepared request. Implementors
/// may perform network I/O (token refresh) before mutating the request.
#[async_trait]
pub trait AuthTransform: Send + Sync {
    async fn apply(&self, request: PreparedRequest) -> PreparedRequest;
}

/// Resolved authentication for a client/call.
#[derive(Clone)]
pub enum Auth {
    None,
    Basic { username: String, password: String },
    Custom(Arc<dyn AuthTransform>),
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::None => write!(f, "Auth::None"),
            Auth::Basic { username, .. } => {
                write!(f, "Auth::Basic {{ username: {username:?}, .. }}")
            }
            Auth::Custom(_) => write!(f, "Auth::Custom(..)"),
        }
    }
}

impl Auth {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Auth::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// A 2-tuple of credentials is promoted to Basic auth, per SPEC_FULL.md §4.
    pub fn from_tuple((username, password): (String, String)) -> Self {
        Auth::basic(username, password)
    }

    pub async fn apply(&self, mut request: PreparedRequest) -> PreparedRequest {
        match self {
            Auth::None => request,
            Auth::Basic { username, password } => {
                let token = BASE64.encode(format!("{username}:{password}"));
                if let Ok(value) = HeaderValue::from_str(&format!("Basic {token}")) {
                    request.headers.insert(AUTHORIZATION, value);
                }
                request
            }
            Auth::Custom(transform) => transform.apply(request).await,
        }
    }
}

/// Look up a `.netrc` entry for `authority` (host, optionally with `user@`
/// stripped by the caller), consulting `$NETRC` then `~/.netrc`/`~/_netrc`.
/// Mirrors httpx's `get_netrc_login`.
pub fn netrc_login(authority: &str) -> Option<(String, String)> {
    let path = netrc_path()?;
    let contents = std::fs::read_to_string(path).ok()?;
    let netrc = netrc_rs::Netrc::parse(contents, false).ok()?;
    netrc
        .machines
        .into_iter()
        .find(|m| m.name.as_deref() == Some(authority))
        .and_then(|m| Some((m.login?, m.password.unwrap_or_default())))
}

fn netrc_path() -> Option<std::path::PathBuf> {
    if let Ok(path) = std::env::var("NETRC") {
        return Some(std::path::PathBuf::from(path));
    }
    let home = std::env::var("HOME").ok()?;
    for name in [".netrc", "_netrc"] {
        let candidate = Path::new(&home).join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}
