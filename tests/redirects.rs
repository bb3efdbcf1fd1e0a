//! Integration tests for the redirect engine (`src/redirect.rs`), driven
//! through the public `AsyncClient` surface against real `wiremock` servers.

use futures::StreamExt;
use httpcore::{AsyncClient, Error, RequestOptions};
use reqwest::header::AUTHORIZATION;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> AsyncClient {
    AsyncClient::new(httpcore::ClientContext::builder().build().unwrap())
}

fn client_with_max_redirects(max_redirects: usize) -> AsyncClient {
    AsyncClient::new(
        httpcore::ClientContext::builder()
            .max_redirects(max_redirects)
            .build()
            .unwrap(),
    )
}

/// Scenario 2: `POST /1` receives a 301 to `/2`; the dispatcher sees a
/// bodyless `GET /2`, and the final response's history has length 1.
#[tokio::test]
async fn post_301_rewrites_to_a_bodyless_get_and_records_one_hop_of_history() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", format!("{}/2", server.uri())),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let opts = RequestOptions {
        body: httpcore::Body::Text("should be dropped".into()),
        ..Default::default()
    };
    let response = client()
        .post(&format!("{}/1", server.uri()), opts)
        .await
        .unwrap();

    assert_eq!(response.status, reqwest::StatusCode::OK);
    assert_eq!(response.history.len(), 1);

    let received = server.received_requests().await.unwrap();
    let hop2 = received.iter().find(|r| r.url.path() == "/2").unwrap();
    assert_eq!(hop2.method, reqwest::Method::GET);
    assert!(hop2.body.is_empty());
}

/// Scenario 3: a five-hop chain with `max_redirects = 4` raises
/// `TooManyRedirects`, with the last recorded response being hop 5's.
#[tokio::test]
async fn exceeding_max_redirects_fails_with_the_last_response_attached() {
    let server = MockServer::start().await;
    for hop in 1..=5 {
        Mock::given(method("GET"))
            .and(path(format!("/{hop}")))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", format!("{}/{}", server.uri(), hop + 1)),
            )
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/6"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = client_with_max_redirects(4)
        .get(&format!("{}/1", server.uri()), RequestOptions::default())
        .await
        .unwrap_err();

    match err {
        Error::TooManyRedirects { last: Some(last) } => {
            assert_eq!(last.url.path(), "/5");
        }
        other => panic!("expected TooManyRedirects with a last response, got {other:?}"),
    }
}

/// Scenario 4: a chain that returns to an already-visited URL raises
/// `RedirectLoop`.
#[tokio::test]
async fn a_chain_returning_to_an_earlier_url_is_a_redirect_loop() {
    let server_a = MockServer::start().await;
    let server_b = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{}/2", server_b.uri())),
        )
        .mount(&server_a)
        .await;
    Mock::given(method("GET"))
        .and(path("/2"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{}/1", server_a.uri())),
        )
        .mount(&server_b)
        .await;

    let err = client()
        .get(&format!("{}/1", server_a.uri()), RequestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RedirectLoop { .. }));
}

/// Scenario 5: a streamed request body cannot be replayed across a redirect.
#[tokio::test]
async fn a_streaming_body_cannot_survive_a_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1"))
        .respond_with(
            ResponseTemplate::new(307).insert_header("Location", format!("{}/2", server.uri())),
        )
        .mount(&server)
        .await;

    let stream = futures::stream::once(async { Ok(bytes::Bytes::from_static(b"chunk")) }).boxed();
    let opts = RequestOptions {
        body: httpcore::Body::Stream(stream),
        ..Default::default()
    };

    let err = client()
        .post(&format!("{}/1", server.uri()), opts)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RedirectBodyUnavailable));
}

/// Scenario 6: an `Authorization` header is stripped when a redirect leaves
/// the origin, and preserved when it stays within it.
#[tokio::test]
async fn authorization_is_stripped_cross_origin_and_kept_same_origin() {
    let server_a = MockServer::start().await;
    let server_c = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cross"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{}/2", server_c.uri())),
        )
        .mount(&server_a)
        .await;
    Mock::given(method("GET"))
        .and(path("/2"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server_c)
        .await;

    let mut opts = RequestOptions::default();
    opts.headers
        .insert(AUTHORIZATION, "Bearer T".parse().unwrap());
    client()
        .get(&format!("{}/cross", server_a.uri()), opts)
        .await
        .unwrap();

    let received = server_c.received_requests().await.unwrap();
    let hop2 = received.iter().find(|r| r.url.path() == "/2").unwrap();
    assert!(hop2.headers.get(AUTHORIZATION).is_none());

    Mock::given(method("GET"))
        .and(path("/same"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{}/same-2", server_a.uri())),
        )
        .mount(&server_a)
        .await;
    Mock::given(method("GET"))
        .and(path("/same-2"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server_a)
        .await;

    let mut opts = RequestOptions::default();
    opts.headers
        .insert(AUTHORIZATION, "Bearer T".parse().unwrap());
    client()
        .get(&format!("{}/same", server_a.uri()), opts)
        .await
        .unwrap();

    let received = server_a.received_requests().await.unwrap();
    let hop2 = received.iter().find(|r| r.url.path() == "/same-2").unwrap();
    assert!(hop2.headers.get(AUTHORIZATION).is_some());
}
