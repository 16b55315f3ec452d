//! End-to-end tests of the middleware chain: session layers, error
//! normalization and routes working together.

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    routing::get as get_route,
    Router,
};
use leanweb_auth::{AuthBackend, SESSION_COOKIE, SIGNATURE_COOKIE};
use serde_json::json;

use common::*;

#[tokio::test]
async fn test_health_and_banner() {
    let app = TestApp::new();

    let response = app.send(get("/health", false).body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "OK");

    let response = app.send(get("/", false).body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.starts_with("Leanweb"));
}

#[test_log::test(tokio::test)]
async fn test_session_token_header_authenticates() {
    let app = TestApp::new();

    let request = with_token(get("/api/users/me", true), "tok-ada")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["objectId"], "u-ada");
    assert_eq!(body["username"], "ada");
    assert!(body.get("sessionToken").is_none());
    assert_eq!(app.resolver.calls(), 1);
}

#[tokio::test]
async fn test_anonymous_request_never_resolves() {
    let app = TestApp::new();

    let response = app.send(get("/health", true).body(Body::empty()).unwrap()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.resolver.calls(), 0);
}

#[tokio::test]
async fn test_unauthenticated_xhr_gets_json() {
    let app = TestApp::new();

    let response = app
        .send(get("/api/users/me", true).body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        json!({ "status": 401, "message": "Unauthorized" })
    );
}

#[tokio::test]
async fn test_unauthenticated_page_gets_error_view() {
    let app = TestApp::new();

    let response = app
        .send(get("/api/users/me", false).body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(content_type(&response).starts_with("text/html"));
    assert!(body_string(response).await.contains("<h1>Unauthorized</h1>"));
}

#[test_log::test(tokio::test)]
async fn test_rejected_session_token_is_server_error() {
    let app = TestApp::new();

    let request = with_token(get("/api/users/me", true), "expired")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({ "code": 211, "message": "Could not find user." })
    );
}

#[test_log::test(tokio::test)]
async fn test_login_sets_cookie_session() {
    let app = TestApp::new();

    let response = app
        .send(json_post(
            "/api/login",
            json!({ "username": "ada", "password": "secret" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies[0].starts_with(&format!("{}=", SESSION_COOKIE)));
    assert!(cookies[1].starts_with(&format!("{}=", SIGNATURE_COOKIE)));
    assert!(cookies.iter().all(|c| c.contains("Max-Age=432000")));
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));
    assert!(cookies.iter().all(|c| c.contains("SameSite=Lax")));
    assert!(cookies.iter().all(|c| !c.contains("Secure")));

    let cookie = cookie_header(&response);
    let body = body_json(response).await;
    assert_eq!(body["objectId"], "u-ada");
    assert_eq!(body["sessionToken"], "tok-ada");

    // The cookie alone authenticates the next request
    let request = get("/api/users/me", true)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).is_empty());
    assert_eq!(body_json(response).await["objectId"], "u-ada");
    assert_eq!(app.resolver.calls(), 2);
}

#[tokio::test]
async fn test_cookie_user_takes_precedence_over_header() {
    let app = TestApp::new();

    let login = app
        .send(json_post(
            "/api/login",
            json!({ "username": "ada", "password": "secret" }),
        ))
        .await;
    let cookie = cookie_header(&login);
    let calls_after_login = app.resolver.calls();

    let request = with_token(get("/api/users/me", true), "unknown-token")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    // Only the cookie session was resolved; the header was skipped
    assert_eq!(app.resolver.calls(), calls_after_login + 1);
}

#[tokio::test]
async fn test_tampered_cookie_is_cleared() {
    let app = TestApp::new();

    let request = get("/api/users/me", true)
        .header(
            header::COOKIE,
            format!("{}=eyJ4IjoxfQ; {}=00", SESSION_COOKIE, SIGNATURE_COOKIE),
        )
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    assert_eq!(app.resolver.calls(), 0);
}

#[test_log::test(tokio::test)]
async fn test_bad_credentials() {
    let app = TestApp::new();

    let response = app
        .send(json_post(
            "/api/login",
            json!({ "username": "ada", "password": "wrong" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(set_cookies(&response).is_empty());
    assert_eq!(
        body_json(response).await,
        json!({ "code": 210, "message": "The username and password mismatch." })
    );
}

#[tokio::test]
async fn test_incomplete_json_login_keeps_extractor_status() {
    let app = TestApp::new();

    let response = app
        .send(json_post("/api/login", json!({ "username": "ada" })))
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(content_type(&response).starts_with("application/json"));
    let body = body_json(response).await;
    assert_eq!(body["status"], 422);
    assert!(body["message"].as_str().unwrap().contains("password"));
    assert_eq!(app.resolver.calls(), 0);
}

#[tokio::test]
async fn test_login_with_unsupported_content_type_is_415() {
    let app = TestApp::new();

    let request = Request::builder()
        .method("POST")
        .uri("/api/login")
        .header("x-requested-with", "XMLHttpRequest")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("username=ada&password=secret"))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body_json(response).await["status"], 415);
    assert_eq!(app.resolver.calls(), 0);
}

#[tokio::test]
async fn test_incomplete_multipart_login_is_plain_text_400() {
    let app = TestApp::new();

    let body = "--leanweb-test\r\nContent-Disposition: form-data; name=\"username\"\r\n\r\nada\r\n\
                --leanweb-test--\r\n";
    let request = Request::builder()
        .method("POST")
        .uri("/api/login")
        .header("x-requested-with", "XMLHttpRequest")
        .header(
            header::CONTENT_TYPE,
            "multipart/form-data; boundary=leanweb-test",
        )
        .body(Body::from(body))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(content_type(&response).starts_with("text/plain"));
    assert_eq!(
        body_string(response).await,
        "username and password are required"
    );
}

#[tokio::test]
async fn test_urlencoded_login() {
    let app = TestApp::new();

    let request = Request::builder()
        .method("POST")
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=ada&password=secret"))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(set_cookies(&response).len(), 2);
}

fn multipart_login(extra_part: &str) -> Request<Body> {
    let boundary = "leanweb-test";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"username\"\r\n\r\nada\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"password\"\r\n\r\nsecret\r\n\
         {extra}--{b}--\r\n",
        b = boundary,
        extra = extra_part,
    );

    Request::builder()
        .method("POST")
        .uri("/api/login")
        .header("x-requested-with", "XMLHttpRequest")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_multipart_login() {
    let app = TestApp::new();

    let response = app.send(multipart_login("")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["objectId"], "u-ada");
}

#[tokio::test]
async fn test_multipart_file_is_rejected() {
    let app = TestApp::new();

    let file = "--leanweb-test\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"a.png\"\r\n\
                Content-Type: image/png\r\n\r\nPNG\r\n";
    let response = app.send(multipart_login(file)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({
            "status": 400,
            "code": "LIMIT_UNEXPECTED_FILE",
            "message": "Unexpected field",
            "field": "avatar"
        })
    );
    assert_eq!(app.resolver.calls(), 0);
}

#[tokio::test]
async fn test_logout_clears_cookies() {
    let app = TestApp::new();

    let login = app
        .send(json_post(
            "/api/login",
            json!({ "username": "ada", "password": "secret" }),
        ))
        .await;
    let cookie = cookie_header(&login);

    let request = Request::builder()
        .method("POST")
        .uri("/api/logout")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
}

#[tokio::test]
async fn test_unknown_route() {
    let app = TestApp::new();

    let response = app.send(get("/nope", true).body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        json!({ "status": 404, "message": "Not Found" })
    );

    let response = app.send(get("/nope", false).body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_string(response).await.contains("<h1>Not Found</h1>"));
}

#[tokio::test]
async fn test_wrong_method_is_normalized() {
    let app = TestApp::new();

    let response = app.send(get("/api/login", true).body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(content_type(&response).starts_with("application/json"));
    assert_eq!(
        body_json(response).await,
        json!({ "status": 405, "message": "Method Not Allowed" })
    );

    let response = app.send(get("/api/login", false).body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(content_type(&response).starts_with("text/html"));
    assert!(body_string(response)
        .await
        .contains("<h1>Method Not Allowed</h1>"));
}

#[tokio::test]
async fn test_production_redirects_plain_http() {
    let app = TestApp::with_env("production");

    let request = get("/api/users/me?x=1", false)
        .header(header::HOST, "app.example.com")
        .header("x-forwarded-proto", "http")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://app.example.com/api/users/me?x=1"
    );
}

#[tokio::test]
async fn test_production_cookies_are_secure() {
    let app = TestApp::with_env("production");

    let mut request = json_post(
        "/api/login",
        json!({ "username": "ada", "password": "secret" }),
    );
    request
        .headers_mut()
        .insert("x-forwarded-proto", "https".parse().unwrap());
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).iter().all(|c| c.contains("; Secure")));
}

#[test_log::test(tokio::test)]
async fn test_panicking_handler_becomes_500() {
    let resolver = test_resolver();
    let router = Router::new().route(
        "/explode",
        get_route(|| async {
            if true {
                panic!("kaboom");
            }
            "unreachable"
        }),
    );
    let app = leanweb_app::with_middleware(
        router,
        &test_config("development"),
        AuthBackend::from_resolver(resolver),
        Arc::new(leanweb_app::views::TemplateViews::builtin()),
    );

    let response = tower::ServiceExt::oneshot(app, get("/explode", true).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, json!({ "message": "kaboom" }));
}
