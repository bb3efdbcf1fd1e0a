//! Error Handling Module
//!
//! A flat, `thiserror`-derived error enum for the whole crate, plus a handful of
//! constructor helpers so call sites read like `Error::invalid_url(url)` rather than
//! building variants by hand.

use crate::request::RequestHead;
use crate::response::ResponseHead;

/// The crate-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A merged URL's scheme was not `http` or `https`.
    #[error("invalid URL: scheme must be \"http\" or \"https\" (got {scheme:?})")]
    InvalidUrl { scheme: String },

    /// The redirect chain grew past `max_redirects`.
    #[error("too many redirects")]
    TooManyRedirects { last: Option<Box<ResponseHead>> },

    /// The current request URL already appears earlier in the redirect history.
    #[error("redirect loop detected")]
    RedirectLoop { last: Option<Box<ResponseHead>> },

    /// A redirect would require re-sending a request body that was a lazy stream.
    #[error("cannot redirect a streaming request body")]
    RedirectBodyUnavailable,

    /// A transport-level or HTTP-level failure surfaced by the dispatcher.
    #[error("HTTP request failed: {source}")]
    Http {
        #[source]
        source: reqwest::Error,
        /// The original, user-supplied request that triggered this error.
        request: Option<RequestHead>,
    },

    /// The URL string failed to parse.
    #[error("failed to parse URL: {0}")]
    Url(#[from] url::ParseError),

    /// A caller-supplied blocking body iterator (or a stream adapter reading
    /// one) failed.
    #[error("request body I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// An invalid header name or value was supplied.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Construction failed because an in-process application adapter had an
    /// unsupported parameter arity. Kept for API parity with the original design;
    /// this crate does not implement WSGI/ASGI adapters (see DESIGN.md).
    #[error("invalid application adapter: expected arity 2 or 3, got {0}")]
    InvalidAppAdapter(usize),

    /// The dispatcher (or client context) was used after `close()`.
    #[error("client is closed")]
    Closed,
}

impl Error {
    pub fn invalid_url(scheme: impl Into<String>) -> Self {
        Error::InvalidUrl {
            scheme: scheme.into(),
        }
    }

    pub fn too_many_redirects(last: Option<ResponseHead>) -> Self {
        Error::TooManyRedirects {
            last: last.map(Box::new),
        }
    }

    pub fn redirect_loop(last: Option<ResponseHead>) -> Self {
        Error::RedirectLoop {
            last: last.map(Box::new),
        }
    }

    pub fn http(source: reqwest::Error) -> Self {
        Error::Http {
            source,
            request: None,
        }
    }

    /// Attach the original user-supplied request to an HTTP-class error, matching
    /// the send pipeline's "attach original request and re-raise" contract.
    pub fn with_request(mut self, request: RequestHead) -> Self {
        if let Error::Http { request: slot, .. } = &mut self {
            *slot = Some(request);
        }
        self
    }

    /// True for the error kinds that originate from the dispatcher/transport rather
    /// than from request construction or redirect bookkeeping.
    pub fn is_http(&self) -> bool {
        matches!(self, Error::Http { .. })
    }
}
