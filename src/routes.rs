use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    config::EngineConfig,
    engine::DiagnosisEngine,
    error::{validation_error, AppError},
    metrics::Metrics,
    types::{PredictResponse, SymptomRequest, SymptomsResponse},
};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DiagnosisEngine>,
    pub metrics: Arc<Metrics>,
    pub config: EngineConfig,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/predict", post(predict))
        .route("/api/predict/batch", post(predict_batch))
        .route("/api/symptoms", get(symptoms))
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn predict(
    State(state): State<AppState>,
    Json(request): Json<SymptomRequest>,
) -> Result<Json<PredictResponse>, AppError> {
    let t0 = Instant::now();
    let result = state.engine.predict(&request);
    state.metrics.observe_request(t0.elapsed());

    match result {
        Ok(prediction) => {
            state.metrics.observe_prediction(&prediction.disease, prediction.unrecognized.len());
            Ok(Json(prediction.into()))
        }
        Err(e) => {
            state.metrics.inc_error();
            Err(e)
        }
    }
}

async fn predict_batch(
    State(state): State<AppState>,
    Json(requests): Json<Vec<SymptomRequest>>,
) -> Result<Json<Vec<PredictResponse>>, AppError> {
    if requests.len() > state.config.max_batch {
        state.metrics.inc_error();
        return Err(validation_error(&format!(
            "batch of {} exceeds the limit of {}",
            requests.len(),
            state.config.max_batch
        )));
    }

    let t0 = Instant::now();
    let result = state.engine.predict_batch(&requests);
    state.metrics.observe_request(t0.elapsed());

    let predictions = result.map_err(|e| {
        state.metrics.inc_error();
        e
    })?;
    info!("Scored batch of {}", predictions.len());

    Ok(Json(
        predictions
            .into_iter()
            .map(|p| {
                state.metrics.observe_prediction(&p.disease, p.unrecognized.len());
                PredictResponse::from(p)
            })
            .collect(),
    ))
}

async fn symptoms(State(state): State<AppState>) -> Json<SymptomsResponse> {
    Json(SymptomsResponse { symptoms: state.engine.schema().names().to_vec() })
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "features": state.engine.schema().len(),
        "classes": state.engine.classes().len(),
    }))
}

async fn metrics_endpoint(State(state): State<AppState>) -> String {
    state.metrics.format()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::LabelCodec;
    use crate::model::{LinearModel, LinearWeights};
    use crate::schema::FeatureSchema;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state(strict: bool) -> AppState {
        let schema = FeatureSchema::new(vec!["fever".into(), "cough".into(), "fatigue".into()]).unwrap();
        let model = LinearModel::from_weights(LinearWeights {
            coef: vec![
                vec![-1.0, 1.0, -0.5],
                vec![0.5, 0.5, 1.0],
                vec![1.5, 1.0, 0.0],
            ],
            intercept: vec![0.2, 0.0, -0.5],
            feature_order: None,
        })
        .unwrap();
        let codec = LabelCodec::new(vec!["Common Cold".into(), "Covid-19".into(), "Influenza".into()]).unwrap();
        let engine = DiagnosisEngine::new(schema, Arc::new(model), codec)
            .unwrap()
            .with_strict_symptoms(strict);
        let mut config = EngineConfig::from_lookup(|_| None);
        config.max_batch = 2;
        AppState { engine: Arc::new(engine), metrics: Arc::new(Metrics::new()), config }
    }

    async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, String) {
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn get_text(app: Router, uri: &str) -> (StatusCode, String) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_predict_object_form() {
        let app = router(state(false));
        let (status, body) = post_json(app, "/api/predict", r#"{"symptoms":["fever","cough"],"severity":"mild"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"predicted_disease":"Influenza"}"#);
    }

    #[tokio::test]
    async fn test_predict_list_form_matches_object_form() {
        let s = state(false);
        let (_, list) = post_json(router(s.clone()), "/api/predict", r#"["fever","cough"]"#).await;
        let (_, form) = post_json(router(s), "/api/predict", r#"{"symptoms":["fever","cough"]}"#).await;
        assert_eq!(list, form);
    }

    #[tokio::test]
    async fn test_predict_empty_is_not_an_error() {
        let (status, body) = post_json(router(state(false)), "/api/predict", "[]").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"predicted_disease":"Common Cold"}"#);

        let (status, _) = post_json(router(state(false)), "/api/predict", "{}").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_predict_reports_unrecognized() {
        let (status, body) = post_json(router(state(false)), "/api/predict", r#"["fever","zzz-unknown"]"#).await;
        assert_eq!(status, StatusCode::OK);
        let v: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["unrecognized_symptoms"], serde_json::json!(["zzz-unknown"]));
        assert!(v["predicted_disease"].is_string());
    }

    #[tokio::test]
    async fn test_predict_rejects_malformed_arrays() {
        for body in [r#"[["fever"],["cough"]]"#, "[null]", "42"] {
            let s = state(false);
            let (status, _) = post_json(router(s.clone()), "/api/predict", body).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{} accepted", body);
            let (_, text) = get_text(router(s), "/metrics").await;
            assert!(text.contains("requests 0\n"));
        }
    }

    #[tokio::test]
    async fn test_strict_mode_returns_422() {
        let (status, body) = post_json(router(state(true)), "/api/predict", r#"["fever","zzz-unknown"]"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.contains("zzz-unknown"));
    }

    #[tokio::test]
    async fn test_responses_are_deterministic() {
        let s = state(false);
        let (_, a) = post_json(router(s.clone()), "/api/predict", r#"["cough","fatigue","bogus"]"#).await;
        let (_, b) = post_json(router(s), "/api/predict", r#"["cough","fatigue","bogus"]"#).await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_batch_preserves_order_and_limit() {
        let s = state(false);
        let (status, body) = post_json(router(s.clone()), "/api/predict/batch", r#"[["fever","cough"], {"symptoms":[]}]"#).await;
        assert_eq!(status, StatusCode::OK);
        let v: Vec<PredictResponse> = serde_json::from_str(&body).unwrap();
        assert_eq!(v[0].predicted_disease, "Influenza");
        assert_eq!(v[1].predicted_disease, "Common Cold");

        let (status, _) = post_json(router(s), "/api/predict/batch", r#"[[],[],[]]"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_symptoms_and_health() {
        let s = state(false);
        let (status, body) = get_text(router(s.clone()), "/api/symptoms").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"symptoms":["fever","cough","fatigue"]}"#);

        let (status, body) = get_text(router(s), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let v: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["status"], "healthy");
        assert_eq!(v["features"], 3);
        assert_eq!(v["classes"], 3);
    }

    #[tokio::test]
    async fn test_metrics_track_predictions() {
        let s = state(false);
        post_json(router(s.clone()), "/api/predict", r#"["fever","cough"]"#).await;
        let (_, text) = get_text(router(s), "/metrics").await;
        assert!(text.contains("requests 1\n"));
        assert!(text.contains("predictions{disease=\"Influenza\"} 1\n"));
    }
}
