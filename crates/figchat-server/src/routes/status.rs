use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use figchat::models::tool::Tool;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    available: bool,
    server_url: String,
    timeout_ms: u64,
    retries: u32,
}

/// Reports whether the design server is reachable, running the handshake if needed
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let available = state.mcp.ensure_available().await;
    let config = state.mcp.config();

    Json(StatusResponse {
        available,
        server_url: config.server_url.clone(),
        timeout_ms: config.timeout.as_millis() as u64,
        retries: config.retries,
    })
}

async fn tools(State(state): State<AppState>) -> Json<Vec<Tool>> {
    Json(state.agent.tools())
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/tools", get(tools))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::reply::tests::{build_state, ScriptedProvider};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use figchat::mcp::McpClientConfig;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn get_json(state: AppState, uri: &str) -> (StatusCode, Value) {
        let response = routes(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_status_reports_available() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "initialize"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {}})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "notifications/initialized"})))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let state = build_state(
            ScriptedProvider::new(vec![]),
            McpClientConfig::new(server.uri()),
        );
        let (status, body) = get_json(state.clone(), "/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["available"], true);
        assert_eq!(body["serverUrl"], server.uri());
        assert_eq!(body["timeoutMs"], 60_000);
        assert_eq!(body["retries"], 3);

        // cached after the first handshake
        let (_, body) = get_json(state, "/status").await;
        assert_eq!(body["available"], true);
    }

    #[tokio::test]
    async fn test_status_reports_unavailable() {
        let state = build_state(
            ScriptedProvider::new(vec![]),
            McpClientConfig::new("http://127.0.0.1:1/mcp"),
        );
        let (status, body) = get_json(state, "/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["available"], false);
    }

    #[tokio::test]
    async fn test_tools_lists_catalog() {
        let state = build_state(
            ScriptedProvider::new(vec![]),
            McpClientConfig::new("http://127.0.0.1:1/mcp"),
        );
        let (status, body) = get_json(state, "/tools").await;
        assert_eq!(status, StatusCode::OK);

        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|tool| tool["name"].as_str())
            .collect();
        assert_eq!(names.len(), 8);
        assert!(names.contains(&"get_design_context"));
        assert!(names.contains(&"whoami"));
    }
}
