//! Prepared requests.
//!
//! A single `PreparedRequest` type serves both the async and sync surfaces: a
//! sync-surface body is lifted into a `Body::Stream` (via
//! [`crate::backend::ConcurrencyBackend::iterate_in_threadpool`]) before it ever
//! reaches the send pipeline, so the pipeline itself only ever sees the async shape.

use bytes::Bytes;
use futures::stream::BoxStream;
use reqwest::header::HeaderMap;
use reqwest::Method;
use std::collections::HashMap;
use std::fmt;
use url::Url;

/// A lazy, boxed stream of body chunks, shared by request and response bodies.
pub type ByteStream = BoxStream<'static, Result<Bytes, crate::error::Error>>;

/// One part of a multipart body. Encoding (boundary generation, part headers)
/// is left entirely to `reqwest::multipart`, applied in `dispatch.rs`; this is
/// just the owned, cloneable data the core carries until then.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// The request body. `Json`/`Multipart` are the core's plumbing for the
/// `json`/`files`/`data` convenience parameters on `RequestOptions`; the actual
/// JSON/multipart encoding is `serde_json`'s and `reqwest::multipart`'s job,
/// applied at dispatch time.
#[derive(Default)]
pub enum Body {
    #[default]
    Empty,
    Bytes(Bytes),
    Text(String),
    Form(HashMap<String, String>),
    Json(serde_json::Value),
    Multipart {
        fields: HashMap<String, String>,
        files: Vec<(String, FilePart)>,
    },
    /// A lazily-produced body. Cannot be re-sent on redirect (see
    /// [`crate::error::Error::RedirectBodyUnavailable`]).
    Stream(ByteStream),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => write!(f, "Body::Empty"),
            Body::Bytes(b) => write!(f, "Body::Bytes({} bytes)", b.len()),
            Body::Text(t) => write!(f, "Body::Text({} chars)", t.len()),
            Body::Form(m) => write!(f, "Body::Form({} fields)", m.len()),
            Body::Json(_) => write!(f, "Body::Json(..)"),
            Body::Multipart { fields, files } => {
                write!(f, "Body::Multipart({} fields, {} files)", fields.len(), files.len())
            }
            Body::Stream(_) => write!(f, "Body::Stream(..)"),
        }
    }
}

impl Body {
    pub fn is_streaming(&self) -> bool {
        matches!(self, Body::Stream(_))
    }

    /// Best-effort byte view used when forwarding a body across a redirect whose
    /// method did not change. Streams have none (callers must check
    /// [`Body::is_streaming`] first); multipart bodies are re-sent as-is via
    /// `Body::clone` rather than through this path.
    pub fn as_bytes_owned(&self) -> Option<Bytes> {
        match self {
            Body::Empty => Some(Bytes::new()),
            Body::Bytes(b) => Some(b.clone()),
            Body::Text(t) => Some(Bytes::copy_from_slice(t.as_bytes())),
            Body::Json(v) => serde_json::to_vec(v).ok().map(Bytes::from),
            Body::Form(_) | Body::Multipart { .. } | Body::Stream(_) => None,
        }
    }
}

impl Clone for Body {
    /// Streaming bodies cannot be cloned; redirect carry-over checks
    /// `is_streaming()` before ever needing to duplicate a body, and the send
    /// pipeline never clones a request after it has already taken its stream.
    fn clone(&self) -> Self {
        match self {
            Body::Empty => Body::Empty,
            Body::Bytes(b) => Body::Bytes(b.clone()),
            Body::Text(t) => Body::Text(t.clone()),
            Body::Form(m) => Body::Form(m.clone()),
            Body::Json(v) => Body::Json(v.clone()),
            Body::Multipart { fields, files } => Body::Multipart {
                fields: fields.clone(),
                files: files.clone(),
            },
            Body::Stream(_) => Body::Empty,
        }
    }
}

/// A lightweight, cloneable snapshot of a request, attached to errors and used as
/// the redirect history's per-hop key (via `url`).
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub url: Url,
}

/// A fully prepared request, ready to be handed to a [`crate::dispatch::Dispatcher`].
#[derive(Debug)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// Cookie header value, already resolved by the client context's jar merge.
    pub cookie_header: Option<String>,
    pub body: Body,
}

impl PreparedRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            cookie_header: None,
            body: Body::Empty,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.body.is_streaming()
    }

    pub fn head(&self) -> RequestHead {
        RequestHead {
            method: self.method.clone(),
            url: self.url.clone(),
        }
    }
}
