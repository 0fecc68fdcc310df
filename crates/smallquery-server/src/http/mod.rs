//! HTTP invocation host.
//!
//! Serves the functions under `POST /2015-03-31/functions/{name}/invocations`.
//! A function that raises answers `200 OK` with the
//! `x-amz-function-error: Unhandled` header and a `{"errorMessage": ...}`
//! body. Unknown function names answer `404 Not Found`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value as JsonValue};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use smallquery_common::protocol::{
    FUNCTION_ERROR_HEADER, LOG_RESULT_HEADER, LOG_TYPE_HEADER, UNHANDLED_FUNCTION_ERROR,
};
use smallquery_common::FunctionError;

use crate::config::ServerConfig;
use crate::functions::{Functions, InvocationLog};

#[derive(Clone)]
struct HostState {
    functions: Arc<Functions>,
    query_function: Arc<str>,
    upload_function: Arc<str>,
    log_tail_bytes: usize,
}

/// HTTP server exposing the functions.
pub struct HttpServer {
    state: HostState,
    addr: String,
}

impl HttpServer {
    /// Creates a server for `functions` using the names and address in
    /// `config`.
    pub fn new(functions: Arc<Functions>, config: &ServerConfig) -> Self {
        Self {
            state: HostState {
                functions,
                query_function: Arc::from(config.query_function.as_str()),
                upload_function: Arc::from(config.upload_function.as_str()),
                log_tail_bytes: config.log_tail_bytes,
            },
            addr: config.listen_addr(),
        }
    }

    /// Returns the router serving the invocation endpoint.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/2015-03-31/functions/{name}/invocations", post(invoke))
            .with_state(self.state.clone())
    }

    /// Binds the configured address and serves until the future is dropped.
    pub async fn serve(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(&self.addr).await?;
        self.serve_with_listener(listener).await
    }

    /// Serves on an already bound listener.
    pub async fn serve_with_listener(self, listener: TcpListener) -> std::io::Result<()> {
        let addr: SocketAddr = listener.local_addr()?;
        info!("SmallQuery function host listening on {}", addr);
        info!(
            "Functions: {}, {}",
            self.state.query_function, self.state.upload_function
        );
        axum::serve(listener, self.router()).await
    }
}

async fn invoke(
    State(state): State<HostState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let capture_log = headers
        .get(LOG_TYPE_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("Tail"));

    let event: JsonValue = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("rejecting invocation of {}: {}", name, e);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": format!("invalid request payload: {}", e) })),
            )
                .into_response();
        }
    };

    debug!("invoking {}", name);
    let mut log = InvocationLog::new();

    let outcome = if name == *state.query_function {
        match state.functions.run_query(&event, &mut log).await {
            Ok(response) => serde_json::to_value(response)
                .map_err(|e| FunctionError::new(e.to_string(), "EncodeError")),
            Err(e) => Err(FunctionError::new(e.to_string(), e.error_type())),
        }
    } else if name == *state.upload_function {
        let status = state.functions.upload_data(&event, &mut log).await;
        Ok(JsonValue::String(status.to_string()))
    } else {
        warn!("invocation of unknown function {}", name);
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": format!("Function not found: {}", name) })),
        )
            .into_response();
    };

    let mut response = match outcome {
        Ok(result) => Json(result).into_response(),
        Err(error) => {
            let mut response = Json(error).into_response();
            response.headers_mut().insert(
                FUNCTION_ERROR_HEADER,
                HeaderValue::from_static(UNHANDLED_FUNCTION_ERROR),
            );
            response
        }
    };

    if capture_log {
        let tail = BASE64.encode(log.tail(state.log_tail_bytes));
        match HeaderValue::from_str(&tail) {
            Ok(value) => {
                response.headers_mut().insert(LOG_RESULT_HEADER, value);
            }
            Err(e) => warn!("dropping log tail: {}", e),
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineHandle;
    use object_store::memory::InMemory;
    use smallquery_common::protocol::invocation_path;
    use smallquery_common::{DEFAULT_QUERY_FUNCTION, DEFAULT_UPLOAD_FUNCTION};

    async fn spawn() -> String {
        let functions = Arc::new(Functions::new(EngineHandle::new(), Arc::new(InMemory::new())));
        let server = HttpServer::new(functions, &ServerConfig::default());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(server.serve_with_listener(listener));
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_query_with_log_tail() {
        let base = spawn().await;
        let response = reqwest::Client::new()
            .post(format!("{}{}", base, invocation_path(DEFAULT_QUERY_FUNCTION)))
            .header(LOG_TYPE_HEADER, "Tail")
            .json(&json!({"query": "select 1 as one", "limit": 3}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert!(response.headers().get(FUNCTION_ERROR_HEADER).is_none());
        let tail = response.headers().get(LOG_RESULT_HEADER).unwrap().to_str().unwrap();
        let tail = String::from_utf8(BASE64.decode(tail).unwrap()).unwrap();
        assert_eq!(tail, "executing query: select 1 as one with row limit: 3");

        let body: JsonValue = response.json().await.unwrap();
        assert_eq!(body["results"], "[[1]]");
        assert_eq!(body["column_names"], json!(["one"]));
        assert!(body["query_ms"].is_number());
    }

    #[tokio::test]
    async fn test_function_error() {
        let base = spawn().await;
        let response = reqwest::Client::new()
            .post(format!("{}{}", base, invocation_path(DEFAULT_QUERY_FUNCTION)))
            .json(&json!({"limit": 3}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()[FUNCTION_ERROR_HEADER], UNHANDLED_FUNCTION_ERROR);
        assert!(response.headers().get(LOG_RESULT_HEADER).is_none());
        let body: JsonValue = response.json().await.unwrap();
        assert_eq!(body["errorType"], "ValidationError");
        assert!(body["errorMessage"].as_str().unwrap().contains("query"));
    }

    #[tokio::test]
    async fn test_upload_status_string() {
        let base = spawn().await;
        let response = reqwest::Client::new()
            .post(format!("{}{}", base, invocation_path(DEFAULT_UPLOAD_FUNCTION)))
            .json(&json!({"from_url": "not a url", "to_path": "uploads/x.csv"}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body: JsonValue = response.json().await.unwrap();
        assert_eq!(body, json!("error"));
    }

    #[tokio::test]
    async fn test_unknown_function() {
        let base = spawn().await;
        let response = reqwest::Client::new()
            .post(format!("{}{}", base, invocation_path("nope")))
            .json(&json!({}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_invalid_payload() {
        let base = spawn().await;
        let response = reqwest::Client::new()
            .post(format!("{}{}", base, invocation_path(DEFAULT_QUERY_FUNCTION)))
            .body("{not json")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
    }
}
