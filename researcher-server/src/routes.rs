//! HTTP route handlers for the research API.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use researcher::{MissionError, MissionOutcome, error_chain};

use crate::sse;
use crate::state::AppState;

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/research", post(sse::research_handler))
        .route("/report", post(report))
        .route("/ingest", post(ingest))
}

/// Body of `/research` and `/report`.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

impl QueryRequest {
    /// Trimmed query, rejecting blank input.
    pub fn validated(self) -> Result<String, ApiError> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(ApiError::bad_request("query must be non-empty"));
        }
        Ok(query.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub text: String,
    pub source: String,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub chunks: usize,
}

/// JSON error body with a status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiError {
    pub fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "error": message }),
        }
    }

    fn internal(message: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: json!({ "error": message }),
        }
    }

    /// 502: the reasoning model failed while writing the report.
    fn mission(err: &MissionError) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            body: json!({
                "error": error_chain(err),
                "progress": err.progress(),
            }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "operational",
        "system": "Deep Research v1",
    }))
}

/// POST /api/report - run a whole mission and return the outcome.
async fn report(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<MissionOutcome>, ApiError> {
    let query = request.validated()?;
    let researcher = state.researcher.clone();
    let result = tokio::task::spawn_blocking(move || researcher.run(&query, |_| {}))
        .await
        .map_err(|err| ApiError::internal(format!("mission task failed: {err}")))?;

    match result {
        Ok(outcome) => {
            info!(
                findings = outcome.findings.len(),
                transitions = outcome.transitions,
                "report complete"
            );
            Ok(Json(outcome))
        }
        Err(err) => {
            warn!(error = %error_chain(&err), "report failed");
            Err(ApiError::mission(&err))
        }
    }
}

/// POST /api/ingest - add text to the document store.
async fn ingest(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    if request.text.trim().is_empty() {
        return Err(ApiError::bad_request("text must be non-empty"));
    }
    let source = request.source.trim().to_string();
    if source.is_empty() {
        return Err(ApiError::bad_request("source must be non-empty"));
    }
    let researcher = state.researcher.clone();
    let text = request.text;
    let chunks = tokio::task::spawn_blocking(move || researcher.ingest(&text, &source))
        .await
        .map_err(|err| ApiError::internal(format!("ingest task failed: {err}")))?
        .map_err(|err| ApiError::internal(format!("{err:#}")))?;
    Ok(Json(IngestResponse { chunks }))
}

#[cfg(test)]
mod tests {
    use researcher::io::brain::BrainError;
    use researcher::test_support::{ScriptedBrain, plan_json, step};

    use super::*;
    use crate::state::scripted_state as app_state;

    fn query(text: &str) -> Json<QueryRequest> {
        Json(QueryRequest {
            query: text.to_string(),
        })
    }

    #[tokio::test]
    async fn health_reports_operational() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "operational");
        assert_eq!(body["system"], "Deep Research v1");
    }

    #[tokio::test]
    async fn report_returns_outcome() {
        let brain = ScriptedBrain::replying([plan_json(&[step(1, "web_search")]), "# Report".into()]);
        let state = app_state(brain);

        let Json(outcome) = report(State(state), query("  nvidia  "))
            .await
            .expect("report");
        assert_eq!(outcome.user_query, "nvidia");
        assert_eq!(outcome.final_answer, "# Report");
        assert_eq!(outcome.findings[0].content, "web hit");
    }

    #[tokio::test]
    async fn report_rejects_blank_query() {
        let state = app_state(ScriptedBrain::default());
        let err = report(State(state), query("   ")).await.expect_err("blank");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn report_synthesis_failure_is_bad_gateway_with_progress() {
        let brain = ScriptedBrain::new([
            Ok(plan_json(&[step(1, "web_search")])),
            Err(BrainError::Http("503 from provider".to_string())),
        ]);
        let state = app_state(brain);

        let err = report(State(state), query("q")).await.expect_err("fails");
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        let message = err.body["error"].as_str().expect("error message");
        assert!(message.contains("mission failed during synthesis"));
        assert!(message.contains("503 from provider"));
        assert_eq!(err.body["progress"]["cursor"], 1);
        assert_eq!(err.body["progress"]["findings"][0]["content"], "web hit");
    }

    #[tokio::test]
    async fn ingest_counts_chunks() {
        let state = app_state(ScriptedBrain::default());
        let request = IngestRequest {
            text: "Blackwell B200 ships in 2024.".to_string(),
            source: "memo".to_string(),
        };
        let Json(response) = ingest(State(state.clone()), Json(request))
            .await
            .expect("ingest");
        assert_eq!(response.chunks, 1);
        assert_eq!(state.researcher.store().len(), 1);
    }

    #[tokio::test]
    async fn ingest_rejects_missing_source() {
        let state = app_state(ScriptedBrain::default());
        let request = IngestRequest {
            text: "text".to_string(),
            source: " ".to_string(),
        };
        let err = ingest(State(state), Json(request)).await.expect_err("no source");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
