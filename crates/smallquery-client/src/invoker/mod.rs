//! Remote function invocation.
//!
//! [`RemoteInvoker`] is the seam between the client and whatever hosts the
//! query function. [`LambdaInvoker`] speaks the HTTP invocation protocol
//! described in [`smallquery_common::protocol`]. Every call is a single
//! attempt; failures are returned, never retried.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};
use url::Url;

use smallquery_common::protocol::{
    invocation_path, FUNCTION_ERROR_HEADER, INVOCATION_TYPE_HEADER, LOG_RESULT_HEADER,
    LOG_TYPE_HEADER,
};

use crate::error::InvocationError;

/// Raw response of a function invocation.
#[derive(Debug, Clone)]
pub struct InvokeResponse {
    /// HTTP status code.
    pub status: u16,
    /// Set when the function raised; the payload then carries the error.
    pub function_error: Option<String>,
    /// Decoded tail of the invocation log, when one was requested.
    pub log_tail: Option<String>,
    /// Function result as returned.
    pub payload: Bytes,
}

impl InvokeResponse {
    /// Returns true if the function raised.
    pub fn is_function_error(&self) -> bool {
        self.function_error.is_some()
    }
}

/// Performs one synchronous call to a named remote function.
#[async_trait]
pub trait RemoteInvoker: Send + Sync {
    /// Invokes `target` with `payload`.
    ///
    /// When `capture_log` is set the response carries the tail of the
    /// invocation log. The call blocks until a response arrives or the
    /// transport fails.
    async fn invoke(
        &self,
        target: &str,
        payload: &JsonValue,
        capture_log: bool,
    ) -> Result<InvokeResponse, InvocationError>;
}

/// Invokes functions over the HTTP invocation protocol.
#[derive(Debug, Clone)]
pub struct LambdaInvoker {
    http: reqwest::Client,
    endpoint: Url,
}

impl LambdaInvoker {
    /// Creates an invoker for the service at `endpoint`.
    pub fn new(endpoint: Url) -> Self {
        Self::with_client(endpoint, reqwest::Client::new())
    }

    /// Creates an invoker that reuses an existing HTTP client.
    pub fn with_client(endpoint: Url, http: reqwest::Client) -> Self {
        Self { http, endpoint }
    }

    /// Returns the service endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn invocation_url(&self, target: &str) -> String {
        format!(
            "{}{}",
            self.endpoint.as_str().trim_end_matches('/'),
            invocation_path(target)
        )
    }
}

#[async_trait]
impl RemoteInvoker for LambdaInvoker {
    async fn invoke(
        &self,
        target: &str,
        payload: &JsonValue,
        capture_log: bool,
    ) -> Result<InvokeResponse, InvocationError> {
        let body = serde_json::to_vec(payload).map_err(|source| InvocationError::Payload {
            target: target.to_string(),
            source,
        })?;

        debug!(function = target, bytes = body.len(), "invoking function");

        let response = self
            .http
            .post(self.invocation_url(target))
            .header(CONTENT_TYPE, "application/json")
            .header(INVOCATION_TYPE_HEADER, "RequestResponse")
            .header(LOG_TYPE_HEADER, if capture_log { "Tail" } else { "None" })
            .body(body)
            .send()
            .await
            .map_err(|source| InvocationError::Transport {
                target: target.to_string(),
                source,
            })?;

        let status = response.status();
        let headers = response.headers();
        let function_error = headers
            .get(FUNCTION_ERROR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let log_tail = headers
            .get(LOG_RESULT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|encoded| match general_purpose::STANDARD.decode(encoded) {
                Ok(raw) => Some(String::from_utf8_lossy(&raw).into_owned()),
                Err(err) => {
                    warn!(function = target, error = %err, "ignoring undecodable log tail");
                    None
                }
            });

        let payload = response
            .bytes()
            .await
            .map_err(|source| InvocationError::Transport {
                target: target.to_string(),
                source,
            })?;

        if !status.is_success() {
            return Err(InvocationError::Service {
                target: target.to_string(),
                status: status.as_u16(),
                message: String::from_utf8_lossy(&payload).into_owned(),
            });
        }

        debug!(
            function = target,
            status = status.as_u16(),
            function_error = function_error.as_deref().unwrap_or("none"),
            "function returned"
        );

        Ok(InvokeResponse {
            status: status.as_u16(),
            function_error,
            log_tail,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    const FUNCTION: &str = "smallquery-RunQueryFunction";

    fn invoker(server: &Server) -> LambdaInvoker {
        LambdaInvoker::new(Url::parse(&server.url()).unwrap())
    }

    #[tokio::test]
    async fn test_invoke_success_with_log_tail() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", invocation_path(FUNCTION).as_str())
            .match_header(INVOCATION_TYPE_HEADER, "RequestResponse")
            .match_header(LOG_TYPE_HEADER, "Tail")
            .match_body(Matcher::Json(json!({"query": "select 1", "limit": 10})))
            .with_status(200)
            .with_header(LOG_RESULT_HEADER, &general_purpose::STANDARD.encode("hello log"))
            .with_body(r#"{"results":"[[1]]","column_names":["one"],"query_ms":0.1}"#)
            .expect(1)
            .create_async()
            .await;

        let response = invoker(&server)
            .invoke(FUNCTION, &json!({"query": "select 1", "limit": 10}), true)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 200);
        assert!(!response.is_function_error());
        assert_eq!(response.log_tail.as_deref(), Some("hello log"));
        assert!(response.payload.starts_with(b"{\"results\""));
    }

    #[tokio::test]
    async fn test_invoke_function_error_is_not_transport_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", invocation_path(FUNCTION).as_str())
            .match_header(LOG_TYPE_HEADER, "None")
            .with_status(200)
            .with_header(FUNCTION_ERROR_HEADER, "Unhandled")
            .with_body(r#"{"errorMessage":"syntax error"}"#)
            .create_async()
            .await;

        let response = invoker(&server)
            .invoke(FUNCTION, &json!({"query": "selec"}), false)
            .await
            .unwrap();

        assert_eq!(response.function_error.as_deref(), Some("Unhandled"));
        assert!(response.log_tail.is_none());
    }

    #[tokio::test]
    async fn test_invoke_service_failure_names_target() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", invocation_path("missing").as_str())
            .with_status(404)
            .with_body("Function not found: missing")
            .create_async()
            .await;

        let err = invoker(&server)
            .invoke("missing", &json!({}), false)
            .await
            .unwrap_err();

        assert_eq!(err.target(), "missing");
        assert!(matches!(err, InvocationError::Service { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_invoke_unreachable_endpoint() {
        let invoker = LambdaInvoker::new(Url::parse("http://127.0.0.1:1").unwrap());
        let err = invoker.invoke(FUNCTION, &json!({}), false).await.unwrap_err();
        assert!(matches!(err, InvocationError::Transport { .. }));
        assert_eq!(err.target(), FUNCTION);
    }

    #[test]
    fn test_invocation_url() {
        let invoker = LambdaInvoker::new(Url::parse("http://localhost:3001/").unwrap());
        assert_eq!(
            invoker.invocation_url("f"),
            "http://localhost:3001/2015-03-31/functions/f/invocations"
        );
    }
}
