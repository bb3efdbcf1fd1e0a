//! Redirect engine. Ported from
//! `httpx/client.py::BaseClient.send_handling_redirects`/`build_redirect_request`
//! (see `original_source/httpx/client.py`), generalized from Python's dynamic
//! request/response objects to this crate's `PreparedRequest`/`Response` pair.

use crate::client::ClientContext;
use crate::dispatch::DispatchOptions;
use crate::error::Error;
use crate::request::{Body, PreparedRequest};
use crate::response::{Response, ResponseHead};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::{HeaderMap, AUTHORIZATION, HOST, LOCATION};
use reqwest::{Method, StatusCode};
use std::sync::Arc;
use url::Url;

/// A snapshot of the request fields `build_redirect_request` needs, taken
/// before the request is consumed by the dispatcher (whose `send` takes the
/// request by value).
struct PriorRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    is_streaming: bool,
    body: Body,
}

impl PriorRequest {
    fn snapshot(request: &PreparedRequest) -> Self {
        Self {
            method: request.method.clone(),
            url: request.url.clone(),
            headers: request.headers.clone(),
            is_streaming: request.is_streaming(),
            body: request.body.clone(),
        }
    }
}

/// Drive one request through the redirect chain, returning the terminal
/// response. `history` accumulates every hop's head, in order.
///
/// Returns a boxed future rather than being declared `async fn`: the deferred
/// `next` continuation re-enters this function, and a plain `async fn` cannot
/// express that recursion (the compiler can't resolve the opaque future's
/// `Send`-ness against itself).
pub fn send_handling_redirects(
    ctx: Arc<ClientContext>,
    request: PreparedRequest,
    opts: DispatchOptions,
    allow_redirects: bool,
    history: Vec<ResponseHead>,
) -> BoxFuture<'static, Result<Response, Error>> {
    send_handling_redirects_inner(ctx, request, opts, allow_redirects, history).boxed()
}

async fn send_handling_redirects_inner(
    ctx: Arc<ClientContext>,
    mut request: PreparedRequest,
    opts: DispatchOptions,
    allow_redirects: bool,
    mut history: Vec<ResponseHead>,
) -> Result<Response, Error> {
    loop {
        let hop = history.len();
        precheck(&ctx, &request, &history)?;
        let prior = PriorRequest::snapshot(&request);

        tracing::debug!(hop, method = %prior.method, url = %prior.url, "dispatching hop");
        let mut response = ctx.dispatcher.send(request, &opts).await?;
        tracing::debug!(hop, status = %response.status, "received response");

        response.history = history.clone();
        ctx.extract_cookies(&response);
        history.push(response.head());

        if allow_redirects && response.is_redirect() {
            let next_request = build_redirect_request(&ctx, &prior, &response)?;
            tracing::debug!(hop, next_url = %next_request.url, "following redirect");
            response.close().await?;
            request = next_request;
            continue;
        }

        if response.is_redirect() {
            // `allow_redirects` was false: defer the continuation so a later
            // call to `response.next()` re-enters this same engine (and
            // therefore re-runs the precheck) instead of silently stopping.
            tracing::debug!(hop, "redirect deferred: allow_redirects is false");
            let rebuilt = build_redirect_request(&ctx, &prior, &response);
            let ctx_for_next = ctx.clone();
            let opts_for_next = opts.clone();
            let history_for_next = history.clone();
            response.set_next(Box::new(move || -> BoxFuture<'static, Result<Response, Error>> {
                async move {
                    let next_request = rebuilt?;
                    send_handling_redirects(ctx_for_next, next_request, opts_for_next, false, history_for_next)
                        .await
                }
                .boxed()
            }));
        }

        return Ok(response);
    }
}

fn precheck(ctx: &ClientContext, request: &PreparedRequest, history: &[ResponseHead]) -> Result<(), Error> {
    // Off-by-one preserved intentionally: `max_redirects = N` permits up to
    // `N + 1` total responses (see DESIGN.md).
    if history.len() > ctx.max_redirects {
        tracing::warn!(max_redirects = ctx.max_redirects, "too many redirects");
        return Err(Error::too_many_redirects(history.last().cloned()));
    }
    if history.iter().any(|h| h.url == request.url) {
        tracing::warn!(url = %request.url, "redirect loop detected");
        return Err(Error::redirect_loop(history.last().cloned()));
    }
    Ok(())
}

fn build_redirect_request(
    ctx: &ClientContext,
    prior: &PriorRequest,
    response: &Response,
) -> Result<PreparedRequest, Error> {
    let method = redirect_method(&prior.method, response.status);
    let url = redirect_url(&prior.url, response)?;
    let headers = redirect_headers(prior, &url);
    let body = redirect_body(prior, &method)?;

    Ok(PreparedRequest {
        method,
        cookie_header: ctx.cookie_header_for(&url),
        url,
        headers,
        body,
    })
}

fn redirect_method(prior_method: &Method, status: StatusCode) -> Method {
    // https://tools.ietf.org/html/rfc7231#section-6.4.4 plus the
    // browser-compatibility override of turning 302s (and 301 POSTs) into GETs.
    match status {
        StatusCode::SEE_OTHER if *prior_method != Method::HEAD => Method::GET,
        StatusCode::FOUND if *prior_method != Method::HEAD => Method::GET,
        StatusCode::MOVED_PERMANENTLY if *prior_method == Method::POST => Method::GET,
        _ => prior_method.clone(),
    }
}

fn redirect_url(prior_url: &Url, response: &Response) -> Result<Url, Error> {
    let location = response
        .headers
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::InvalidHeader("redirect response missing Location header".into()))?;

    // Facilitate relative `Location` headers (RFC 7231): parse standalone
    // first, falling back to a join against the request URL.
    let mut url = match Url::parse(location) {
        Ok(absolute) => absolute,
        Err(url::ParseError::RelativeUrlWithoutBase) => prior_url.join(location)?,
        Err(e) => return Err(Error::Url(e)),
    };

    // Attach the previous fragment if needed (RFC 7231 7.1.2).
    if let Some(fragment) = prior_url.fragment() {
        if url.fragment().is_none() {
            let fragment = fragment.to_string();
            url.set_fragment(Some(&fragment));
        }
    }

    Ok(url)
}

/// Strip `Authorization`/`host` when the redirect leaves the prior origin.
/// `HeaderMap::remove` on an absent key is a no-op, so same-origin redirects
/// are untouched.
fn redirect_headers(prior: &PriorRequest, new_url: &Url) -> HeaderMap {
    let mut headers = prior.headers.clone();
    let prior_origin = (
        prior.url.scheme(),
        prior.url.host_str(),
        prior.url.port_or_known_default(),
    );
    let new_origin = (new_url.scheme(), new_url.host_str(), new_url.port_or_known_default());
    if new_origin != prior_origin {
        headers.remove(AUTHORIZATION);
        headers.remove(HOST);
    }
    headers
}

fn redirect_body(prior: &PriorRequest, new_method: &Method) -> Result<Body, Error> {
    if *new_method != prior.method && *new_method == Method::GET {
        return Ok(Body::Empty);
    }
    if prior.is_streaming {
        return Err(Error::RedirectBodyUnavailable);
    }
    Ok(prior.body.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use reqwest::StatusCode;

    fn response_with_location(url: &str, status: StatusCode, location: &str) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, location.parse().unwrap());
        Response::new(
            Url::parse(url).unwrap(),
            status,
            reqwest::Version::HTTP_11,
            headers,
            futures::stream::empty().boxed(),
        )
    }

    #[test]
    fn post_301_becomes_get() {
        let prior = PriorRequest {
            method: Method::POST,
            url: Url::parse("https://example.com/a").unwrap(),
            headers: HeaderMap::new(),
            is_streaming: false,
            body: Body::Bytes(bytes::Bytes::from_static(b"hi")),
        };
        let response = response_with_location(
            "https://example.com/a",
            StatusCode::MOVED_PERMANENTLY,
            "/b",
        );
        let method = redirect_method(&prior.method, response.status);
        assert_eq!(method, Method::GET);
        let body = redirect_body(&prior, &method).unwrap();
        assert!(matches!(body, Body::Empty));
    }

    #[test]
    fn cross_origin_strips_auth_and_host() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer t".parse().unwrap());
        headers.insert(HOST, "example.com".parse().unwrap());
        let prior = PriorRequest {
            method: Method::GET,
            url: Url::parse("https://example.com/a").unwrap(),
            headers,
            is_streaming: false,
            body: Body::Empty,
        };
        let new_url = Url::parse("https://other.com/a").unwrap();
        let headers = redirect_headers(&prior, &new_url);
        assert!(headers.get(AUTHORIZATION).is_none());
        assert!(headers.get(HOST).is_none());
    }

    #[test]
    fn same_origin_preserves_auth() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer t".parse().unwrap());
        let prior = PriorRequest {
            method: Method::GET,
            url: Url::parse("https://example.com/a").unwrap(),
            headers,
            is_streaming: false,
            body: Body::Empty,
        };
        let new_url = Url::parse("https://example.com/b").unwrap();
        let headers = redirect_headers(&prior, &new_url);
        assert!(headers.get(AUTHORIZATION).is_some());
    }

    #[test]
    fn streaming_body_cannot_be_redirected_without_method_change() {
        let prior = PriorRequest {
            method: Method::PUT,
            url: Url::parse("https://example.com/a").unwrap(),
            headers: HeaderMap::new(),
            is_streaming: true,
            body: Body::Empty,
        };
        let err = redirect_body(&prior, &Method::PUT).unwrap_err();
        assert!(matches!(err, Error::RedirectBodyUnavailable));
    }

    #[test]
    fn relative_location_is_joined_against_the_prior_url() {
        let response = response_with_location(
            "https://example.com/a/b",
            StatusCode::FOUND,
            "../c",
        );
        let url = redirect_url(&Url::parse("https://example.com/a/b").unwrap(), &response).unwrap();
        assert_eq!(url.as_str(), "https://example.com/c");
    }
}
