//! A general-purpose async/sync HTTP client engine: client context, send
//! pipeline, redirect handling, and the dispatcher/concurrency abstractions
//! that let the sync surface ride on top of the async one.
//!
//! Mirrors `httpx/client.py`'s `AsyncClient`/`Client` split (see
//! `original_source/httpx/client.py`): one request-building/merge layer, one
//! send pipeline, two surfaces.

pub mod auth;
pub mod backend;
pub mod client;
pub mod cookies;
pub mod dispatch;
pub mod error;
pub mod headers;
pub mod redirect;
pub mod request;
pub mod response;
pub mod send;
pub mod sync;
pub mod url_ext;

pub use auth::Auth;
pub use client::{ClientBuilder, ClientContext};
pub use cookies::CookieJar;
pub use dispatch::{HttpVersions, PoolLimits};
pub use error::Error;
pub use request::{Body, FilePart, PreparedRequest};
pub use response::Response;
pub use sync::Client;

use reqwest::header::HeaderMap;
use reqwest::Method;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Per-call options accepted by [`AsyncClient::request`] and the verb
/// wrappers, mirroring `httpx`'s `AsyncClient.get`/`.post`/etc. keyword args.
///
/// `data`/`files`/`json` are convenience body builders layered over the
/// lower-level `body` field; at most one should be set. Precedence when more
/// than one is present, matching `httpx`'s `Request` construction: `json`,
/// then `files` (with `data` folded in as additional multipart fields), then
/// `data` alone as a form body, then the explicit `body`.
///
/// `verify`/`cert`/`timeout`/`trust_env` override the client's configured
/// defaults for this call only; `None` means "use the client's default".
#[derive(Default)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    pub body: Body,
    pub data: Option<HashMap<String, String>>,
    pub files: Option<Vec<(String, FilePart)>>,
    pub json: Option<serde_json::Value>,
    pub params: Option<Vec<(String, String)>>,
    pub cookies: Option<CookieJar>,
    pub stream: bool,
    pub auth: Option<Auth>,
    pub allow_redirects: Option<bool>,
    pub verify: Option<bool>,
    pub cert: Option<(String, String)>,
    pub timeout: Option<Duration>,
    pub trust_env: Option<bool>,
}

impl RequestOptions {
    fn resolve_body(self) -> Body {
        if let Some(json) = self.json {
            Body::Json(json)
        } else if let Some(files) = self.files {
            Body::Multipart {
                fields: self.data.unwrap_or_default(),
                files,
            }
        } else if let Some(data) = self.data {
            Body::Form(data)
        } else {
            self.body
        }
    }
}

/// The async client surface.
pub struct AsyncClient {
    ctx: Arc<ClientContext>,
}

impl AsyncClient {
    pub fn builder() -> ClientBuilder {
        ClientContext::builder()
    }

    pub fn new(ctx: ClientContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    pub async fn request(&self, method: Method, url: &str, opts: RequestOptions) -> Result<Response, Error> {
        let mut url = self.ctx.merge_url(url)?;
        if let Some(params) = &opts.params {
            url.query_pairs_mut().extend_pairs(params);
        }
        let headers = self.ctx.merge_headers(&opts.headers);
        let cookie_header = match &opts.cookies {
            Some(per_call) => self.ctx.merge_cookies(per_call).header_value_for(&url),
            None => self.ctx.cookie_header_for(&url),
        };

        let stream = opts.stream;
        let auth = opts.auth.clone();
        let allow_redirects = opts.allow_redirects;
        let dispatch = dispatch::DispatchOptions {
            verify: opts.verify,
            cert: opts.cert.clone(),
            timeout: opts.timeout,
        };
        let trust_env = opts.trust_env;
        let body = opts.resolve_body();

        let mut request = PreparedRequest::new(method, url);
        request.headers = headers;
        request.cookie_header = cookie_header;
        request.body = body;

        let send_opts = send::SendOptions {
            stream,
            auth,
            allow_redirects: allow_redirects.unwrap_or(true),
            dispatch,
            trust_env,
        };

        send::send(self.ctx.clone(), request, send_opts).await
    }

    pub async fn get(&self, url: &str, opts: RequestOptions) -> Result<Response, Error> {
        self.request(Method::GET, url, opts).await
    }

    pub async fn options(&self, url: &str, opts: RequestOptions) -> Result<Response, Error> {
        self.request(Method::OPTIONS, url, opts).await
    }

    /// `HEAD` defaults `allow_redirects = false`, unlike every other verb.
    pub async fn head(&self, url: &str, mut opts: RequestOptions) -> Result<Response, Error> {
        if opts.allow_redirects.is_none() {
            opts.allow_redirects = Some(false);
        }
        self.request(Method::HEAD, url, opts).await
    }

    pub async fn post(&self, url: &str, opts: RequestOptions) -> Result<Response, Error> {
        self.request(Method::POST, url, opts).await
    }

    pub async fn put(&self, url: &str, opts: RequestOptions) -> Result<Response, Error> {
        self.request(Method::PUT, url, opts).await
    }

    pub async fn patch(&self, url: &str, opts: RequestOptions) -> Result<Response, Error> {
        self.request(Method::PATCH, url, opts).await
    }

    pub async fn delete(&self, url: &str, opts: RequestOptions) -> Result<Response, Error> {
        self.request(Method::DELETE, url, opts).await
    }

    pub async fn close(&self) -> Result<(), Error> {
        self.ctx.close().await
    }
}
