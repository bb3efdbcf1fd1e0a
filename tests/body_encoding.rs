//! Integration tests for the `data`/`files`/`json`/`params` convenience body
//! builders on `RequestOptions` (`lib.rs`'s `resolve_body`), exercised against
//! real `wiremock` servers so the actual wire encoding (`reqwest::Client::json`/
//! `::multipart`/`::form`, and the merged-URL query string) is verified, not
//! just the in-memory `Body` variant.

use httpcore::{AsyncClient, FilePart, RequestOptions};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> AsyncClient {
    AsyncClient::new(httpcore::ClientContext::builder().build().unwrap())
}

#[tokio::test]
async fn params_are_appended_to_the_merged_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "widgets"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let opts = RequestOptions {
        params: Some(vec![("q".into(), "widgets".into())]),
        ..Default::default()
    };
    client()
        .get(&format!("{}/search", server.uri()), opts)
        .await
        .unwrap();
}

#[tokio::test]
async fn json_option_is_sent_as_an_encoded_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/items"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "name": "widget", "qty": 3 })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let opts = RequestOptions {
        json: Some(json!({ "name": "widget", "qty": 3 })),
        ..Default::default()
    };
    let response = client()
        .post(&format!("{}/items", server.uri()), opts)
        .await
        .unwrap();
    assert_eq!(response.status, reqwest::StatusCode::CREATED);
}

#[tokio::test]
async fn data_option_is_sent_as_a_form_encoded_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let opts = RequestOptions {
        data: Some([("username".to_string(), "alice".to_string())].into_iter().collect()),
        ..Default::default()
    };
    client()
        .post(&format!("{}/login", server.uri()), opts)
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    let body = String::from_utf8(received[0].body.clone()).unwrap();
    assert_eq!(body, "username=alice");
}

#[tokio::test]
async fn files_option_is_sent_as_a_multipart_body_with_data_folded_in() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let opts = RequestOptions {
        data: Some([("caption".to_string(), "a photo".to_string())].into_iter().collect()),
        files: Some(vec![(
            "photo".to_string(),
            FilePart {
                filename: Some("cat.png".to_string()),
                content_type: Some("image/png".to_string()),
                bytes: bytes::Bytes::from_static(b"\x89PNG fake bytes"),
            },
        )]),
        ..Default::default()
    };
    client()
        .post(&format!("{}/upload", server.uri()), opts)
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    let content_type = received[0].headers.get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data"));
    let body = String::from_utf8_lossy(&received[0].body);
    assert!(body.contains("a photo"));
    assert!(body.contains("cat.png"));
    assert!(body.contains("image/png"));
}
