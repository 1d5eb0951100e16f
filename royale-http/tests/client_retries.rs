use royale_http::{Auth, HttpClient, HttpError, RequestOpts, StatusCode};
use serde_json::{Value, json};
use std::borrow::Cow;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpClient {
    HttpClient::new(&format!("{}/v1/", server.uri())).expect("valid base")
}

#[tokio::test]
async fn sends_bearer_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/cards"))
        .and(header("authorization", "Bearer tok123"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let got: Value = client_for(&server)
        .get_json(
            "cards",
            RequestOpts {
                auth: Some(Auth::Bearer(" 'tok123' ")),
                query: Some(vec![("limit", Cow::Borrowed("50"))]),
                ..Default::default()
            },
        )
        .await
        .expect("request succeeds");
    assert_eq!(got, json!({"items": []}));
}

#[tokio::test]
async fn retries_server_errors_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/globaltournaments"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/globaltournaments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [1]})))
        .expect(1)
        .mount(&server)
        .await;

    let got: Value = client_for(&server)
        .with_retries(1)
        .get_json("globaltournaments", RequestOpts::default())
        .await
        .expect("second attempt succeeds");
    assert_eq!(got["items"][0], 1);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/players/%23NOPE"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"reason": "notFound", "message": "Not found"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .with_retries(3)
        .get_json::<Value>("players/%23NOPE", RequestOpts::default())
        .await
        .expect_err("404 is an error");
    match err {
        HttpError::Api {
            status, message, ..
        } => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(message, "Not found");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn raw_keeps_status_and_body() {
    let server = MockServer::start().await;
    let body = r#"{"reason":"accessDenied"}"#;
    Mock::given(method("GET"))
        .and(path("/v1/cards"))
        .respond_with(
            ResponseTemplate::new(403).set_body_raw(body.as_bytes(), "application/json"),
        )
        .mount(&server)
        .await;

    let raw = client_for(&server)
        .get_raw("cards", RequestOpts::default())
        .await
        .expect("transport ok");
    assert_eq!(raw.status, StatusCode::FORBIDDEN);
    assert_eq!(&raw.body[..], body.as_bytes());
    assert_eq!(raw.content_type.as_deref(), Some("application/json"));
    assert_eq!(raw.error_message(), "accessDenied");
}

#[tokio::test]
async fn decode_error_carries_snippet() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/cards"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_json::<Value>("cards", RequestOpts::default())
        .await
        .expect_err("decode fails");
    assert!(matches!(err, HttpError::Decode(_, ref snip) if snip == "not json"));
}
