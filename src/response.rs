//! Responses.

use crate::error::Error;
use crate::request::ByteStream;
use bytes::{Bytes, BytesMut};
use futures::future::BoxFuture;
use futures::StreamExt;
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Version};
use std::sync::Mutex;
use url::Url;

/// A lightweight, cloneable snapshot of a response, used for redirect history and
/// attached to `TooManyRedirects`/`RedirectLoop` errors.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// A closure that re-enters the redirect engine to produce the next hop. Boxed so
/// that `redirect.rs` can attach one without `Response` depending on the redirect
/// module's internal types.
pub type NextFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<Response, Error>> + Send>;

enum BodyState {
    /// Not yet read; the stream is still open for lazy consumption.
    Stream(ByteStream),
    /// Already materialized (either read by the caller, or the dispatcher handed
    /// back a fully-buffered body to begin with).
    Buffered(Bytes),
    /// `close()` has already released this body.
    Closed,
    /// The stream failed partway through a `read()`. Kept distinct from
    /// `Closed` so a repeat `read()` re-raises the failure instead of
    /// silently returning an empty, successful buffer.
    Errored(String),
}

/// An HTTP response. The body may be read (and cached) or closed exactly once.
pub struct Response {
    pub url: Url,
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    /// Every response the engine produced on this chain, in order, excluding `self`.
    pub history: Vec<ResponseHead>,
    body: Mutex<BodyState>,
    /// Present only on a terminal response that is itself a redirect, when
    /// `allow_redirects` was false.
    next: Mutex<Option<NextFn>>,
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("url", &self.url)
            .field("status", &self.status)
            .field("history_len", &self.history.len())
            .finish()
    }
}

impl Response {
    pub fn new(
        url: Url,
        status: StatusCode,
        version: Version,
        headers: HeaderMap,
        body: ByteStream,
    ) -> Self {
        Self {
            url,
            status,
            version,
            headers,
            history: Vec::new(),
            body: Mutex::new(BodyState::Stream(body)),
            next: Mutex::new(None),
        }
    }

    pub fn head(&self) -> ResponseHead {
        ResponseHead {
            url: self.url.clone(),
            status: self.status,
            headers: self.headers.clone(),
        }
    }

    /// True iff the status is a redirect status and a `Location` header is present.
    pub fn is_redirect(&self) -> bool {
        matches!(
            self.status.as_u16(),
            301 | 302 | 303 | 307 | 308
        ) && self.headers.contains_key(reqwest::header::LOCATION)
    }

    /// Attach the deferred-continuation capability (called only by `redirect.rs`).
    pub(crate) fn set_next(&self, next: NextFn) {
        *self.next.lock().unwrap() = Some(next);
    }

    /// Invoke the deferred redirect continuation, if this response carries one.
    /// Re-enters the redirect engine's precheck, so it can itself fail.
    pub async fn next(&self) -> Option<Result<Response, Error>> {
        let next = self.next.lock().unwrap().take()?;
        Some(next().await)
    }

    /// Materialize the body and cache it. Calling this more than once returns the
    /// cached bytes without re-reading the stream.
    pub async fn read(&self) -> Result<Bytes, Error> {
        let stream = {
            let mut guard = self.body.lock().unwrap();
            match &*guard {
                BodyState::Buffered(b) => return Ok(b.clone()),
                BodyState::Closed => return Ok(Bytes::new()),
                BodyState::Errored(message) => {
                    return Err(Error::Io(std::io::Error::other(message.clone())))
                }
                BodyState::Stream(_) => {
                    let BodyState::Stream(s) = std::mem::replace(&mut *guard, BodyState::Closed)
                    else {
                        unreachable!()
                    };
                    s
                }
            }
        };

        let mut stream = stream;
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => buf.extend_from_slice(&bytes),
                Err(err) => {
                    *self.body.lock().unwrap() = BodyState::Errored(err.to_string());
                    return Err(err);
                }
            }
        }
        let bytes = buf.freeze();
        *self.body.lock().unwrap() = BodyState::Buffered(bytes.clone());
        Ok(bytes)
    }

    /// Release the body stream. Idempotent: closing an already-closed response
    /// is a no-op, and closing an already-buffered one (the caller already
    /// called [`Response::read`]) leaves the cached bytes intact rather than
    /// discarding them.
    pub async fn close(&self) -> Result<(), Error> {
        let taken = {
            let mut guard = self.body.lock().unwrap();
            if matches!(&*guard, BodyState::Buffered(_) | BodyState::Closed) {
                return Ok(());
            }
            std::mem::replace(&mut *guard, BodyState::Closed)
        };
        if let BodyState::Stream(mut stream) = taken {
            // Drain and discard; propagate the first error encountered, if any,
            // but never mask a caller's in-flight error (callers that care about
            // read failures call `read()` first).
            while let Some(chunk) = stream.next().await {
                chunk?;
            }
        }
        Ok(())
    }

    /// Expose the response's lazy byte representation without consuming it via
    /// `read()`. This is the explicit capability that replaces httpx's private
    /// `_raw_content`/`_raw_stream` attribute probe (see DESIGN.md): the sync
    /// bridge calls this once, after `send(..., stream = true)`, to hand the body
    /// across the blocking/async boundary.
    pub fn into_raw_parts(self) -> (Url, StatusCode, Version, HeaderMap, Vec<ResponseHead>, ByteStream) {
        let body = match self.body.into_inner().unwrap() {
            BodyState::Stream(s) => s,
            BodyState::Buffered(b) => futures::stream::once(async move { Ok(b) }).boxed(),
            BodyState::Closed => futures::stream::empty().boxed(),
            BodyState::Errored(message) => {
                futures::stream::once(async move { Err(Error::Io(std::io::Error::other(message))) }).boxed()
            }
        };
        (self.url, self.status, self.version, self.headers, self.history, body)
    }
}
