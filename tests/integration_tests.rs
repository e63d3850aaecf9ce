//! Integration tests using wiremock to simulate HTTP servers.

use httpchain::{body, Body, Client, Cookie, Decoder, Error, FormValues, Json, Text, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct UserAgent {
    #[serde(rename = "user-agent")]
    name: String,
}

/// Mounts a mock that answers `POST /echo` with the request body.
async fn echo_server() -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/echo"))
        .respond_with(|req: &Request| ResponseTemplate::new(200).set_body_bytes(req.body.clone()))
        .mount(&mock_server)
        .await;

    mock_server
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Returns a URL on a port nothing listens on.
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/", port)
}

#[tokio::test]
async fn test_post_pairs() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/post"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("a=1&b=x"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut client = Client::post(
        format!("{}/post", mock_server.uri()),
        body!["a", 1, "b", "x"],
    );
    assert!(client.error().is_none());

    let response = client.send().await.unwrap();

    assert_eq!(response.status().as_u16(), 201);
    assert_eq!(client.status_code(), 201);
}

#[tokio::test]
async fn test_post_empty_body() {
    let mock_server = echo_server().await;

    let mut client = Client::post(format!("{}/echo", mock_server.uri()), ());
    let response = client.send_and_decode(Text).await.unwrap();

    assert_eq!(response.data, "");
    assert_eq!(response.status.as_u16(), 200);
}

#[tokio::test]
async fn test_post_map() {
    let mock_server = echo_server().await;

    let map: HashMap<String, Value> = HashMap::from([
        ("test".to_string(), "value2".into()),
        ("test1".to_string(), 2.into()),
        ("test2".to_string(), true.into()),
        ("test3".to_string(), 2i64.into()),
        ("test4".to_string(), 'a'.into()),
        ("test5".to_string(), 20u64.into()),
        ("test6".to_string(), 2.344.into()),
    ]);

    let mut client = Client::post(format!("{}/echo", mock_server.uri()), map);
    let echoed = client.send_and_decode(Text).await.unwrap().data;

    assert_eq!(echoed.split('&').count(), 7);
    assert_eq!(
        echoed,
        "test=value2&test1=2&test2=true&test3=2&test4=a&test5=20&test6=2.344000"
    );
}

#[tokio::test]
async fn test_post_form_values() {
    let mock_server = echo_server().await;

    let mut values = FormValues::new();
    values.add("test", "value");
    values.add("test1", "1");

    let mut client = Client::post(format!("{}/echo", mock_server.uri()), values);
    let echoed = client.send_and_decode(Text).await.unwrap();

    assert_eq!(echoed.data, "test=value&test1=1");
}

#[tokio::test]
async fn test_post_stream_is_sent_verbatim() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/raw"))
        .respond_with(|req: &Request| {
            let content_type = req
                .headers
                .get("content-type")
                .map(|v| v.to_str().unwrap_or_default().to_string())
                .unwrap_or_default();
            ResponseTemplate::new(200).set_body_string(format!(
                "{}|{}",
                content_type,
                String::from_utf8_lossy(&req.body)
            ))
        })
        .mount(&mock_server)
        .await;

    let mut client = Client::post(
        format!("{}/raw", mock_server.uri()),
        Body::stream("test=value&test1=1"),
    );
    let echoed = client.send_and_decode(Text).await.unwrap();

    assert_eq!(echoed.data, "|test=value&test1=1");
}

#[tokio::test]
async fn test_one_shot_stream_cannot_be_resent() {
    let mock_server = echo_server().await;

    let chunks: Vec<Result<&'static str, std::io::Error>> = vec![Ok("chunk1,"), Ok("chunk2")];
    let stream = reqwest::Body::wrap_stream(futures_util::stream::iter(chunks));

    let mut client = Client::post(format!("{}/echo", mock_server.uri()), Body::from(stream));
    let echoed = client.send_and_decode(Text).await.unwrap();
    assert_eq!(echoed.data, "chunk1,chunk2");

    let result = client.send().await;
    assert!(matches!(result, Err(Error::BodyConsumed)));
    assert!(matches!(client.error(), Some(Error::BodyConsumed)));
}

#[tokio::test]
async fn test_invalid_bodies_fail_before_sending() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let url = format!("{}/post", mock_server.uri());

    let mut odd = Client::post(&url, body!["test", "test", "test"]);
    assert_eq!(
        odd.send().await.unwrap_err().to_string(),
        "parameters not correct, expected 4 parameter got 3"
    );

    let mut single = Client::post(&url, body!["test"]);
    assert_eq!(
        single.send().await.unwrap_err().to_string(),
        "parameters not correct string"
    );

    let map = HashMap::from([("test".to_string(), Value::from(1i16))]);
    let mut unsupported_map = Client::post(&url, map);
    assert_eq!(
        unsupported_map.send().await.unwrap_err().to_string(),
        "unsupported type for post i16"
    );

    let mut unsupported_pair = Client::post(&url, body!["test", 1i16]);
    assert!(matches!(
        unsupported_pair.send().await,
        Err(Error::UnsupportedValueType("i16"))
    ));
    assert_eq!(unsupported_pair.status_code(), -1);
}

#[tokio::test]
async fn test_status_codes_are_recorded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status/200"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/status/404"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .mount(&mock_server)
        .await;

    let mut ok = Client::get(format!("{}/status/200", mock_server.uri()));
    assert_eq!(ok.status_code(), -1);
    ok.send().await.unwrap();
    assert_eq!(ok.status_code(), 200);

    // A 4xx is a response, not an error.
    let mut missing = Client::get(format!("{}/status/404", mock_server.uri()));
    let response = missing.send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
    assert_eq!(missing.status_code(), 404);
    assert!(missing.error().is_none());
}

#[tokio::test]
async fn test_transport_error_is_sticky() {
    init_tracing();
    let mut client = Client::get(closed_port_url());

    let first = client.send().await.unwrap_err();
    assert!(matches!(first, Error::Network(_)));
    assert_eq!(client.status_code(), -1);
    assert!(client.status().is_none());

    let second = client.send().await.unwrap_err();
    assert_eq!(first.to_string(), second.to_string());

    let client = client.header("X-After-Failure", "1");
    assert!(matches!(client.error(), Some(Error::Network(_))));
    assert!(client.request().unwrap().headers.get("x-after-failure").is_none());
}

#[tokio::test]
async fn test_resend_same_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/posts/1"))
        .and(body_string("body=bar&id=255&title=foo&userId=255"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&mock_server)
        .await;

    let mut client = Client::put(
        format!("{}/posts/1", mock_server.uri()),
        body!["id", 255, "title", "foo", "body", "bar", "userId", 255],
    );

    assert_eq!(client.send().await.unwrap().status().as_u16(), 200);
    assert_eq!(client.send().await.unwrap().status().as_u16(), 200);
}

#[tokio::test]
async fn test_patch_and_delete() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/posts/1"))
        .and(body_string("title=httpchain"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/posts/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!("{}/posts/1", mock_server.uri());

    let mut patch = Client::patch(&url, body!["title", "httpchain"]);
    assert_eq!(patch.send().await.unwrap().status().as_u16(), 200);

    let mut delete = Client::delete(&url);
    assert_eq!(delete.send().await.unwrap().status().as_u16(), 204);
}

#[tokio::test]
async fn test_head_has_empty_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let mut client = Client::head(format!("{}/", mock_server.uri()));
    let response = client.send_and_decode(Text).await.unwrap();

    assert_eq!(response.data, "");
}

#[tokio::test]
async fn test_basic_auth() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/basic-auth/user/passwd"))
        .and(header("authorization", "Basic dXNlcjpwYXNzd2Q="))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/basic-auth/user/passwd"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let mut client = Client::get(format!("{}/basic-auth/user/passwd", mock_server.uri()))
        .basic_auth("user", "passwd");
    client.send().await.unwrap();
    assert_eq!(client.status_code(), 200);

    let mut anonymous = Client::get(format!("{}/basic-auth/user/passwd", mock_server.uri()));
    anonymous.send().await.unwrap();
    assert_eq!(anonymous.status_code(), 401);
}

#[tokio::test]
async fn test_cookies() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cookies"))
        .respond_with(|req: &Request| {
            let cookies: HashMap<String, String> = req
                .headers
                .get("cookie")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .split("; ")
                .filter_map(|pair| pair.split_once('='))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "cookies": cookies }))
        })
        .mount(&mock_server)
        .await;

    let cookie = Cookie::build(("test", "test"))
        .domain("www.example.com")
        .path("/")
        .build();

    let mut client = Client::get(format!("{}/cookies", mock_server.uri()))
        .cookie(cookie)
        .cookies([Cookie::new("other", "1")]);
    assert_eq!(client.request().unwrap().cookies().len(), 2);

    let body: serde_json::Value = client.send_and_decode(Json).await.unwrap().data;

    assert_eq!(body["cookies"]["test"], "test");
    assert_eq!(body["cookies"]["other"], "1");
}

#[tokio::test]
async fn test_user_agent_with_custom_decoder() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user-agent"))
        .respond_with(|req: &Request| {
            let agent = req
                .headers
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            ResponseTemplate::new(200).set_body_json(UserAgent { name: agent })
        })
        .mount(&mock_server)
        .await;

    let to_user_agent = |resp: reqwest::Response| async move {
        if resp.status().as_u16() != 200 {
            return Err(Error::TypeMismatch {
                expected: "status 200",
                found: resp.status().to_string(),
            });
        }
        Decoder::<UserAgent>::decode(Json, resp).await
    };

    let mut client =
        Client::get(format!("{}/user-agent", mock_server.uri())).user_agent("httpchain");
    let agent: UserAgent = client.send_and_decode(to_user_agent).await.unwrap().data;
    assert_eq!(agent.name, "httpchain");

    // Unknown path: the decoder's own error comes back unchanged.
    let mut client =
        Client::get(format!("{}/user-agen", mock_server.uri())).user_agent("httpchain");
    let err = client.send_and_decode(to_user_agent).await.unwrap_err();
    assert_eq!(err.to_string(), "expected status 200, got 404 Not Found");
    assert!(client.error().is_none());
}

#[tokio::test]
async fn test_decoder_skipped_after_failure() {
    let decoded = Arc::new(AtomicBool::new(false));
    let flag = decoded.clone();

    let mut client = Client::new().user_agent("httpchain");
    let result = client
        .send_and_decode(move |_resp: reqwest::Response| async move {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await;

    assert!(matches!(result, Err(Error::NoRequest)));
    assert!(!decoded.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_json_decode_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_string("invalid json"))
        .mount(&mock_server)
        .await;

    let mut client = Client::get(format!("{}/test", mock_server.uri()));
    let result = client.send_and_decode::<UserAgent, _>(Json).await;

    match result {
        Err(Error::DeserializationFailed {
            raw_response,
            serde_error,
            status,
        }) => {
            assert_eq!(status.as_u16(), 200);
            assert_eq!(raw_response, "invalid json");
            assert!(serde_error.contains("expected"));
        }
        _ => panic!("Expected DeserializationFailed, got {:?}", result),
    }

    // Decode errors are not stored; the request can be sent again.
    assert!(client.error().is_none());
    assert!(client.send().await.is_ok());
}

#[tokio::test]
async fn test_text_decode_uses_declared_charset() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/latin1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain; charset=iso-8859-1")
                .set_body_bytes(vec![b'c', b'a', b'f', 0xE9]),
        )
        .mount(&mock_server)
        .await;

    let mut client = Client::get(format!("{}/latin1", mock_server.uri()));
    let response = client.send_and_decode(Text).await.unwrap();

    assert_eq!(response.data, "café");
    assert!(client.error().is_none());
}

#[tokio::test]
async fn test_text_decode_replaces_invalid_utf8() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/binary"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'o', b'k', 0xff]))
        .mount(&mock_server)
        .await;

    let mut client = Client::get(format!("{}/binary", mock_server.uri()));
    let response = client.send_and_decode(Text).await.unwrap();

    assert_eq!(response.data, "ok\u{FFFD}");
}

#[tokio::test]
async fn test_redirect_not_followed() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/new"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("arrived"))
        .mount(&mock_server)
        .await;

    let mut client = Client::get(format!("{}/old", mock_server.uri())).follow_redirects(false);
    let response = client.send().await.unwrap();

    assert_eq!(response.status().as_u16(), 302);
    assert_eq!(response.headers().get("location").unwrap(), "/new");
    assert_eq!(client.status_code(), 302);
    assert!(client.error().is_none());

    let mut following = Client::get(format!("{}/old", mock_server.uri()));
    let response = following.send_and_decode(Text).await.unwrap();

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.data, "arrived");
}

#[tokio::test]
async fn test_injected_transport() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .and(header("x-from-transport", "yes"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut default_headers = http::HeaderMap::new();
    default_headers.insert("x-from-transport", http::HeaderValue::from_static("yes"));
    let transport = reqwest::Client::builder()
        .default_headers(default_headers)
        .build()
        .unwrap();

    let mut client = Client::get(format!("{}/test", mock_server.uri())).set_transport(transport);
    assert!(client.transport().is_some());

    client.send().await.unwrap();
    assert_eq!(client.status_code(), 200);
}

/// Mounts `GET /old` redirecting to `GET /new`, which answers "arrived".
async fn redirect_server() -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/new"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("arrived"))
        .mount(&mock_server)
        .await;

    mock_server
}

#[tokio::test]
async fn test_transport_refusing_redirect_is_not_sticky() {
    init_tracing();
    let mock_server = redirect_server().await;

    let transport = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::custom(|attempt| attempt.error("no redirect")))
        .build()
        .unwrap();

    let mut client = Client::get(format!("{}/old", mock_server.uri()))
        .set_transport(transport)
        .follow_redirects(false);

    let result = client.send().await;
    match result {
        Err(Error::Network(e)) => assert!(e.is_redirect()),
        other => panic!("expected a redirect error, got {:?}", other),
    }
    assert!(client.error().is_none());
    assert!(!client.is_failed());

    // The chain stays usable.
    let client = client.header("X-After", "1");
    assert!(client.error().is_none());
    assert_eq!(client.request().unwrap().headers.get("x-after").unwrap(), "1");
}

#[tokio::test]
async fn test_transport_refusing_redirect_is_sticky_when_following() {
    let mock_server = redirect_server().await;

    let transport = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::custom(|attempt| attempt.error("no redirect")))
        .build()
        .unwrap();

    let mut client = Client::get(format!("{}/old", mock_server.uri())).set_transport(transport);

    assert!(matches!(client.send().await, Err(Error::Network(_))));
    assert!(matches!(client.error(), Some(Error::Network(_))));
    assert_eq!(client.status_code(), -1);
}

#[tokio::test]
async fn test_injected_transport_keeps_its_redirect_policy() {
    init_tracing();
    let mock_server = redirect_server().await;

    let mut client = Client::get(format!("{}/old", mock_server.uri()))
        .set_transport(reqwest::Client::new())
        .follow_redirects(false);
    assert!(!client.follows_redirects());

    let response = client.send_and_decode(Text).await.unwrap();

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.data, "arrived");
    assert_eq!(client.status_code(), 200);
}
