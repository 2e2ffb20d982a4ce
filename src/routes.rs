use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::{
    any::Any,
    sync::Arc,
    time::{Duration, Instant},
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::{
    engine::UrlEngine,
    error::AppError,
    types::{DebugFeatures, PredictResponse, UrlRequest},
};

pub type AppState = Arc<UrlEngine>;

pub fn router(engine: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/predict", post(predict))
        .route("/debug_features", post(debug_features))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(panic_response))
                .layer(TimeoutLayer::new(request_timeout))
                // Browser extensions call from their own origin.
                .layer(CorsLayer::permissive()),
        )
        .with_state(engine)
}

/// A panic while scoring becomes the regular error response.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    AppError::ExtractionFailure(detail).into_response()
}

pub async fn ping() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

pub async fn predict(
    State(engine): State<AppState>,
    Json(request): Json<UrlRequest>,
) -> Result<Json<PredictResponse>, AppError> {
    let start = Instant::now();
    metrics::counter!("predict_requests_total").increment(1);

    let result = engine.predict(&request.url);

    let latency = start.elapsed().as_secs_f64() * 1000.0;
    metrics::histogram!("predict_duration_ms").record(latency);

    match &result {
        Ok(prediction) if prediction.whitelisted => {
            metrics::counter!("predict_whitelisted_total").increment(1)
        }
        Err(_) => metrics::counter!("predict_errors_total").increment(1),
        Ok(_) => {}
    }

    Ok(Json(result?.into()))
}

pub async fn debug_features(
    State(engine): State<AppState>,
    Json(request): Json<UrlRequest>,
) -> Result<Json<DebugFeatures>, AppError> {
    Ok(Json(engine.debug_features(&request.url)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::tests::{engine_with, loaded_engine},
        features::{ExtractedFeatures, Featurizer},
    };
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    fn app(engine: UrlEngine) -> Router {
        router(Arc::new(engine), Duration::from_secs(5))
    }

    async fn call(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_ping_without_model() {
        let (status, body) = call(app(engine_with(None)), Method::GET, "/ping", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_predict_without_model_is_an_error() {
        let (status, body) = call(
            app(engine_with(None)),
            Method::POST,
            "/predict",
            Some(json!({"url": "http://randomsite.xyz"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Model not loaded");
        assert_eq!(body["kind"], "model_unavailable");
    }

    #[tokio::test]
    async fn test_predict_whitelisted() {
        let (status, body) = call(
            app(engine_with(None)),
            Method::POST,
            "/predict",
            Some(json!({"url": "https://www.wikipedia.org/wiki/X"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "url": "https://www.wikipedia.org/wiki/X",
                "prediction": "SAFE",
                "whitelisted": true
            })
        );
    }

    #[tokio::test]
    async fn test_predict_classified() {
        let url = "http://paypal-login-update.verify-account.com/secure";
        let (status, body) = call(
            app(loaded_engine()),
            Method::POST,
            "/predict",
            Some(json!({ "url": url })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], url);
        assert_eq!(body["normalized"], "paypal-login-update.verify-account.com/secure");
        assert_eq!(body["prediction"], "PHISHING");
        assert!(body.get("whitelisted").is_none());

        let probabilities = body["probabilities"].as_object().unwrap();
        assert_eq!(probabilities.len(), 4);
        let total: f64 = probabilities.values().filter_map(Value::as_f64).sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_debug_features() {
        let (status, body) = call(
            app(engine_with(None)),
            Method::POST,
            "/debug_features",
            Some(json!({"url": "http://bit.ly/login"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"columns": ["sus_url", "short_url", "count-"], "values": [1.0, 1.0, 0.0]})
        );
    }

    struct Exploding;

    impl Featurizer for Exploding {
        fn extract(&self, _url: &str) -> Result<ExtractedFeatures, AppError> {
            panic!("featurizer exploded")
        }
    }

    #[tokio::test]
    async fn test_featurizer_panic_is_an_extraction_failure() {
        for uri in ["/debug_features", "/predict"] {
            let engine = loaded_engine().with_featurizer(Box::new(Exploding));
            let (status, body) = call(
                app(engine),
                Method::POST,
                uri,
                Some(json!({"url": "http://randomsite.xyz"})),
            )
            .await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);
            assert_eq!(body["kind"], "extraction_failure");
            assert_eq!(body["error"], "Feature extraction error: featurizer exploded");
        }
    }

    #[tokio::test]
    async fn test_cors_preflight_is_allowed() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/predict")
            .header(header::ORIGIN, "chrome-extension://abcdef")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = app(engine_with(None)).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
