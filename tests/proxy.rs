//! End-to-end tests: the proxy router driven with `tower::ServiceExt::oneshot`
//! against a mock upstream bound on a loopback port.

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use http_body_util::BodyExt;
use tokio::net::TcpListener;
use tower::ServiceExt;

use mirage::config::{Config, FetchConfig, ServerConfig, SolverConfig};
use mirage::proxy::rewrite::encode_component;
use mirage::proxy::{build_router, AppState};

const USAGE: &str = "Use /proxy?url=https://example.com";
const SELF_BASE: &str = "http://proxy.test";
const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52,
];

fn test_config() -> Config {
    Config {
        server: ServerConfig {
            port: 8080,
            host: "0.0.0.0".to_string(),
        },
        fetch: FetchConfig {
            timeout: 10,
            identifier: "Mirage Proxy".to_string(),
        },
        solver: SolverConfig {
            base_url: "https://solver.example".to_string(),
        },
    }
}

fn proxy_router() -> Router {
    build_router(AppState::new(test_config()).expect("app state"))
}

/// Bind a mock upstream on a random loopback port, returning its base URL
async fn spawn_upstream(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve upstream");
    });

    format!("http://{}", addr)
}

/// Drive one request through the proxy router
async fn send(router: Router, uri: &str) -> (StatusCode, HeaderMap, Vec<u8>) {
    let request = Request::builder()
        .uri(uri)
        .header(header::HOST, "proxy.test")
        .body(Body::empty())
        .expect("request");

    let response = router.oneshot(request).await.expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes()
        .to_vec();

    (status, headers, body)
}

#[tokio::test]
async fn missing_url_parameter_yields_usage_message() {
    let (status, _, body) = send(proxy_router(), "/proxy").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(String::from_utf8(body).unwrap(), USAGE);
}

#[tokio::test]
async fn root_path_yields_usage_message() {
    let (status, _, body) = send(proxy_router(), "/").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(String::from_utf8(body).unwrap(), USAGE);
}

#[tokio::test]
async fn malformed_target_yields_bad_request() {
    let (status, _, body) = send(proxy_router(), "/proxy?url=not-a-url").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8(body).unwrap().contains("not-a-url"));
}

#[tokio::test]
async fn html_response_is_rewritten() {
    let upstream = Router::new().route(
        "/",
        get(|| async {
            (
                [("content-type", "text/html")],
                r#"<html><head></head><body><a href="/x">go</a></body></html>"#,
            )
        }),
    );
    let target = spawn_upstream(upstream).await;

    let uri = format!("/proxy?url={}", encode_component(&target));
    let (status, headers, body) = send(proxy_router(), &uri).await;
    let body = String::from_utf8(body).unwrap();

    assert_eq!(status, StatusCode::OK);
    // Base tag sits right after the head opening tag.
    assert!(body.contains(&format!(r#"<head><base href="{}/">"#, target)));
    // The root-relative link routes back through the proxy.
    let expected_href = format!(
        r#"href="{}/proxy?url={}""#,
        SELF_BASE,
        encode_component(&format!("{}/x", target))
    );
    assert!(body.contains(&expected_href), "body was: {}", body);
    assert_eq!(headers.get("x-proxied-by").unwrap(), "Mirage Proxy");
}

#[tokio::test]
async fn blocked_status_redirects_to_solver() {
    let upstream = Router::new().route("/", get(|| async { StatusCode::FORBIDDEN }));
    let target = spawn_upstream(upstream).await;

    let uri = format!("/proxy?url={}", encode_component(&target));
    let (status, headers, _) = send(proxy_router(), &uri).await;

    assert_eq!(status, StatusCode::FOUND);
    let location = headers.get(header::LOCATION).unwrap().to_str().unwrap();
    assert!(location.starts_with("https://solver.example/?url="));
    assert_eq!(
        location,
        format!("https://solver.example/?url={}", encode_component(&target))
    );
}

#[tokio::test]
async fn rate_limited_status_redirects_to_solver() {
    let upstream = Router::new().route("/", get(|| async { StatusCode::TOO_MANY_REQUESTS }));
    let target = spawn_upstream(upstream).await;

    let uri = format!("/proxy?url={}", encode_component(&target));
    let (status, headers, _) = send(proxy_router(), &uri).await;

    assert_eq!(status, StatusCode::FOUND);
    assert!(headers.contains_key(header::LOCATION));
}

#[tokio::test]
async fn challenge_marker_overrides_success_status() {
    let upstream = Router::new().route(
        "/",
        get(|| async {
            (
                [("content-type", "text/html")],
                r#"<html><script src="https://www.google.com/recaptcha/api.js"></script></html>"#,
            )
        }),
    );
    let target = spawn_upstream(upstream).await;

    let uri = format!("/proxy?url={}", encode_component(&target));
    let (status, headers, _) = send(proxy_router(), &uri).await;

    assert_eq!(status, StatusCode::FOUND);
    let location = headers.get(header::LOCATION).unwrap().to_str().unwrap();
    assert!(location.starts_with("https://solver.example/?url="));
}

#[tokio::test]
async fn binary_body_passes_through_unchanged() {
    let upstream = Router::new().route(
        "/",
        get(|| async {
            (
                [
                    ("content-type", "image/png"),
                    ("x-frame-options", "DENY"),
                ],
                PNG_BYTES,
            )
        }),
    );
    let target = spawn_upstream(upstream).await;

    let uri = format!("/proxy?url={}", encode_component(&target));
    let (status, headers, body) = send(proxy_router(), &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, PNG_BYTES);
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "image/png");
    // Framing blockers stripped, permissive CORS added.
    assert!(!headers.contains_key("x-frame-options"));
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
}

#[tokio::test]
async fn non_html_text_passes_through_verbatim() {
    let upstream = Router::new().route(
        "/",
        get(|| async {
            (
                [
                    ("content-type", "text/plain"),
                    ("content-security-policy", "default-src 'self'"),
                ],
                "see https://example.com for details",
            )
        }),
    );
    let target = spawn_upstream(upstream).await;

    let uri = format!("/proxy?url={}", encode_component(&target));
    let (status, headers, body) = send(proxy_router(), &uri).await;

    assert_eq!(status, StatusCode::OK);
    // No rewriting outside HTML, even for text that mentions URLs.
    assert_eq!(
        String::from_utf8(body).unwrap(),
        "see https://example.com for details"
    );
    assert!(!headers.contains_key("content-security-policy"));
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
}

#[tokio::test]
async fn unreachable_upstream_yields_gateway_error() {
    // Grab a port that nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let uri = format!(
        "/proxy?url={}",
        encode_component(&format!("http://{}", addr))
    );
    let (status, _, body) = send(proxy_router(), &uri).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(String::from_utf8(body).unwrap().starts_with("Proxy failed: "));
}

#[tokio::test]
async fn upstream_status_is_mirrored() {
    let upstream = Router::new().route(
        "/",
        get(|| async {
            (
                StatusCode::NOT_FOUND,
                [("content-type", "text/html")],
                "<html><head></head><body>missing</body></html>",
            )
        }),
    );
    let target = spawn_upstream(upstream).await;

    let uri = format!("/proxy?url={}", encode_component(&target));
    let (status, headers, _) = send(proxy_router(), &uri).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
}
