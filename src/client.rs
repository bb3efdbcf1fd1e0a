//! Client context: merged, validated configuration shared by both the async
//! and sync surfaces. Grounded on `siumai-core/src/builder/mod.rs`'s
//! `BuilderBase`/`ProviderCore` split (base config inherited, effective
//! config derived and validated at `build()` time).

use crate::auth::Auth;
use crate::backend::TokioBackend;
use crate::cookies::CookieJar;
use crate::dispatch::{Dispatcher, HttpVersions, PoolLimits, ReqwestDispatcher};
use crate::error::Error;
use crate::url_ext::{merge_url, HstsPreloadList, StaticHstsPreloadList};
use reqwest::header::HeaderMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Immutable (after construction) client configuration, plus the one piece of
/// interior-mutable state: the cookie jar.
pub struct ClientContext {
    pub(crate) base_url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) cookies: Mutex<CookieJar>,
    pub(crate) auth: Auth,
    pub(crate) max_redirects: usize,
    pub(crate) trust_env: bool,
    pub(crate) dispatcher: Arc<dyn Dispatcher>,
    pub(crate) backend: Arc<TokioBackend>,
    pub(crate) hsts_preload_list: Arc<dyn HstsPreloadList>,
}

impl ClientContext {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Join a possibly-relative URL against the configured base, applying the
    /// HSTS preload upgrade.
    pub fn merge_url(&self, url: &str) -> Result<Url, Error> {
        Ok(merge_url(&self.base_url, url, self.hsts_preload_list.as_ref())?)
    }

    pub fn merge_headers(&self, per_call: &HeaderMap) -> HeaderMap {
        crate::headers::merge_or_identity(&self.headers, per_call)
    }

    /// A per-call view of the client's jar with `per_call` merged on top
    /// (later wins). Does not mutate the client's own jar; analogous to
    /// `merge_headers` rather than the mutating `extract_cookies`.
    pub fn merge_cookies(&self, per_call: &CookieJar) -> CookieJar {
        let mut merged = self.cookies.lock().unwrap().clone();
        merged.update_from(per_call);
        merged
    }

    pub fn cookie_header_for(&self, url: &Url) -> Option<String> {
        self.cookies.lock().unwrap().header_value_for(url)
    }

    pub fn extract_cookies(&self, response: &crate::response::Response) {
        self.cookies.lock().unwrap().extract_from(response);
    }

    pub async fn close(&self) -> Result<(), Error> {
        self.dispatcher.close().await
    }
}

/// Constructs a [`ClientContext`]. Mirrors `ProviderCore`'s consuming,
/// `Self`-returning configuration methods.
pub struct ClientBuilder {
    base_url: Option<Url>,
    headers: HeaderMap,
    cookies: CookieJar,
    auth: Auth,
    max_redirects: usize,
    trust_env: bool,
    verify: bool,
    cert: Option<(String, String)>,
    http_versions: HttpVersions,
    pool_limits: PoolLimits,
    timeout: Option<Duration>,
    dispatcher: Option<Arc<dyn Dispatcher>>,
    backend: Option<Arc<TokioBackend>>,
    hsts_preload_list: Option<Arc<dyn HstsPreloadList>>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            headers: HeaderMap::new(),
            cookies: CookieJar::new(),
            auth: Auth::None,
            max_redirects: 20,
            trust_env: true,
            verify: true,
            cert: None,
            http_versions: HttpVersions::default(),
            pool_limits: PoolLimits::default(),
            timeout: None,
            dispatcher: None,
            backend: None,
            hsts_preload_list: None,
        }
    }
}

impl ClientBuilder {
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn cookies(mut self, cookies: CookieJar) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn trust_env(mut self, trust_env: bool) -> Self {
        self.trust_env = trust_env;
        self
    }

    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Client certificate material as a PEM cert chain and a PEM private key,
    /// forwarded to the default dispatcher's TLS identity.
    pub fn cert(mut self, cert_pem: String, key_pem: String) -> Self {
        self.cert = Some((cert_pem, key_pem));
        self
    }

    /// HTTP version negotiation hint, forwarded to the default dispatcher.
    pub fn http_versions(mut self, http_versions: HttpVersions) -> Self {
        self.http_versions = http_versions;
        self
    }

    /// Connection-pool sizing, forwarded to the default dispatcher.
    pub fn pool_limits(mut self, pool_limits: PoolLimits) -> Self {
        self.pool_limits = pool_limits;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn backend(mut self, backend: Arc<TokioBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn hsts_preload_list(mut self, list: Arc<dyn HstsPreloadList>) -> Self {
        self.hsts_preload_list = Some(list);
        self
    }

    pub fn build(self) -> Result<ClientContext, Error> {
        let backend: Arc<TokioBackend> = match self.backend {
            Some(backend) => backend,
            None => Arc::new(TokioBackend::new().map_err(|_| Error::Closed)?),
        };
        let dispatcher = match self.dispatcher {
            Some(dispatcher) => dispatcher,
            None => Arc::new(ReqwestDispatcher::build(
                self.verify,
                self.cert,
                self.timeout,
                self.http_versions,
                self.pool_limits,
            )?),
        };
        // An absent base URL is stored as the empty string, which acts as a
        // join identity: joining any absolute URL against it returns that URL
        // unchanged (httpx's `merge_url` semantics when `base_url` is unset).
        let base_url = match self.base_url {
            Some(url) => url,
            None => Url::parse("relative:///").unwrap_or_else(|_| unreachable!()),
        };
        Ok(ClientContext {
            base_url,
            headers: self.headers,
            cookies: Mutex::new(self.cookies),
            auth: self.auth,
            max_redirects: self.max_redirects,
            trust_env: self.trust_env,
            dispatcher,
            backend,
            hsts_preload_list: self
                .hsts_preload_list
                .unwrap_or_else(|| Arc::new(StaticHstsPreloadList::default())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_builder_has_trust_env_true_and_max_redirects_twenty() {
        let builder = ClientBuilder::default();
        assert!(builder.trust_env);
        assert_eq!(builder.max_redirects, 20);
    }

    #[test]
    fn build_succeeds_with_only_defaults() {
        let ctx = ClientContext::builder().build().unwrap();
        assert_eq!(ctx.max_redirects, 20);
    }

    #[test]
    fn merge_url_joins_against_an_explicit_base() {
        let ctx = ClientContext::builder()
            .base_url(Url::parse("https://example.invalid/api/").unwrap())
            .build()
            .unwrap();
        let merged = ctx.merge_url("widgets/1").unwrap();
        assert_eq!(merged.as_str(), "https://example.invalid/api/widgets/1");
    }

    #[test]
    fn http_versions_and_pool_limits_are_accepted_by_build() {
        ClientContext::builder()
            .http_versions(HttpVersions::Http1Only)
            .pool_limits(PoolLimits {
                max_idle_per_host: Some(4),
                idle_timeout: Some(Duration::from_secs(30)),
            })
            .build()
            .unwrap();
    }
}
