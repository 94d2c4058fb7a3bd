mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use common::{app, app_with, content_type, multipart_body, png, FailingRegressor};
use http_body_util::BodyExt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower::ServiceExt;

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn predict_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, content_type())
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_index_serves_upload_form() {
    let app = app(3.0);
    let response = app
        .router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains(r#"action="/predict""#));
    assert!(page.contains(r#"name="image""#));
    assert!(page.contains(r#"name="quantity""#));
    assert!(page.contains(r#"name="description""#));
}

#[tokio::test]
async fn test_predict_renders_prices() {
    let app = app(4.5);
    let image = png(64, 48);
    let body = multipart_body(&[
        ("image", Some("phone.png"), &image),
        ("quantity", None, b"3"),
        ("description", None, b"Brand New! iPhone 14."),
    ]);

    let response = app.router.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // exp(4.5) - 1 = 89.0171...
    let page = body_text(response).await;
    assert!(page.contains("$89.02"), "unit price missing");
    assert!(page.contains("$267.05"), "total missing");
    assert!(page.contains(r#"href="/""#));

    assert_eq!(app.metrics.predictions_served.load(Ordering::Relaxed), 1);
    assert_eq!(app.metrics.get_stage_stats().len(), 3);
}

#[tokio::test]
async fn test_low_prediction_clamped_to_one() {
    let app = app(-2.0);
    let image = png(10, 10);
    let body = multipart_body(&[("image", Some("a.png"), &image), ("quantity", None, b"2")]);

    let response = app.router.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("$1.00"));
    assert!(page.contains("$2.00"));
}

#[tokio::test]
async fn test_invalid_quantity_is_bad_request() {
    let image = png(10, 10);
    for quantity in ["0", "-1", "abc", "2.5", ""] {
        let app = app(3.0);
        let body = multipart_body(&[
            ("image", Some("a.png"), &image),
            ("quantity", None, quantity.as_bytes()),
        ]);
        let response = app.router.oneshot(predict_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "quantity {:?}", quantity);
        assert_eq!(
            app.metrics.get_errors_by_kind().get("invalid_quantity"),
            Some(&1)
        );
    }
}

#[tokio::test]
async fn test_missing_fields_are_bad_request() {
    let image = png(10, 10);

    let app = app(3.0);
    let body = multipart_body(&[("image", Some("a.png"), &image)]);
    let response = app.router.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let app = common::app(3.0);
    let body = multipart_body(&[("image", Some(""), b""), ("quantity", None, b"1")]);
    let response = app.router.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.metrics.get_errors_by_kind().get("missing_image"), Some(&1));
}

#[tokio::test]
async fn test_unsupported_image_format() {
    let app = app(3.0);
    let body = multipart_body(&[
        ("image", Some("notes.txt"), b"just some plain text, not an image"),
        ("quantity", None, b"1"),
    ]);
    let response = app.router.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_truncated_image_is_bad_request() {
    let app = app(3.0);
    let mut image = png(120, 90);
    image.truncate(image.len() / 2);
    let body = multipart_body(&[("image", Some("a.png"), &image), ("quantity", None, b"1")]);
    let response = app.router.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.metrics.get_errors_by_kind().get("malformed_image"), Some(&1));
}

#[tokio::test]
async fn test_inference_failure_is_server_error() {
    let app = app_with(Arc::new(FailingRegressor), 10 * 1024 * 1024);
    let image = png(10, 10);
    let body = multipart_body(&[("image", Some("a.png"), &image), ("quantity", None, b"1")]);

    let response = app.router.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let page = body_text(response).await;
    assert!(!page.contains("secret internal detail"));
    assert_eq!(app.metrics.inference_failures.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let app = app_with(Arc::new(common::ConstRegressor(3.0)), 1024);
    let image = vec![0u8; 8 * 1024];
    let body = multipart_body(&[("image", Some("big.png"), &image), ("quantity", None, b"1")]);

    let response = app.router.oneshot(predict_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_non_multipart_body_is_bad_request() {
    let app = app(3.0);
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("quantity=1"))
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let app = app(3.0);
    let request = Request::builder()
        .uri("/")
        .header(header::ORIGIN, "https://shop.example.com")
        .body(Body::empty())
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}
