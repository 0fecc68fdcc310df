//! Client façade.
//!
//! Provides the main `Client` struct that ties resolution, invocation and
//! decoding together for the query and upload workflows.

use std::sync::Arc;

use tracing::{debug, info};
use url::Url;

use smallquery_common::store;
use smallquery_common::{
    FunctionError, QueryRequest, TableMapping, Upload, DEFAULT_QUERY_FUNCTION,
    DEFAULT_UPLOAD_FUNCTION,
};

use crate::codec::{self, ResultSet};
use crate::error::{ClientError, ClientResult, DecodeError, InvocationError, ResolutionError};
use crate::invoker::{InvokeResponse, LambdaInvoker, RemoteInvoker};
use crate::resolver::{MetadataStore, TableResolver};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the function invocation service.
    pub endpoint: String,
    /// Name of the query function.
    pub query_function: String,
    /// Name of the upload function.
    pub upload_function: String,
    /// URL of the data bucket holding uploads and the table mapping.
    pub bucket_url: Option<String>,
    /// Ask for the invocation log tail on every call.
    pub capture_log: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3001".to_string(),
            query_function: DEFAULT_QUERY_FUNCTION.to_string(),
            upload_function: DEFAULT_UPLOAD_FUNCTION.to_string(),
            bucket_url: None,
            capture_log: true,
        }
    }
}

impl ClientConfig {
    /// Creates a new client configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the invocation service endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the query function name.
    pub fn query_function(mut self, name: impl Into<String>) -> Self {
        self.query_function = name.into();
        self
    }

    /// Sets the upload function name.
    pub fn upload_function(mut self, name: impl Into<String>) -> Self {
        self.upload_function = name.into();
        self
    }

    /// Sets the data bucket URL.
    pub fn bucket_url(mut self, url: impl Into<String>) -> Self {
        self.bucket_url = Some(url.into());
        self
    }

    /// Enables or disables log tail capture.
    pub fn capture_log(mut self, capture_log: bool) -> Self {
        self.capture_log = capture_log;
        self
    }
}

/// Outcome of a successful query.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// The request as it was sent.
    pub request: QueryRequest,
    /// Decoded rows.
    pub result: ResultSet,
    /// Invocation log tail, if captured.
    pub log_tail: Option<String>,
}

/// Outcome of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// The request as it was sent.
    pub upload: Upload,
    /// Mapping registered for the upload, if a table name was given.
    pub mapping: Option<TableMapping>,
}

/// SmallQuery client.
pub struct Client {
    config: ClientConfig,
    invoker: Arc<dyn RemoteInvoker>,
    resolver: Option<TableResolver>,
}

impl Client {
    /// Creates a client that invokes functions over HTTP at the configured
    /// endpoint and keeps table metadata in the configured bucket.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            ClientError::InvalidConfig(format!("endpoint '{}': {}", config.endpoint, e))
        })?;

        let resolver = match &config.bucket_url {
            Some(url) => {
                let bucket = store::open(&store::parse_bucket_url(url)?)?;
                Some(TableResolver::new(MetadataStore::new(bucket)))
            }
            None => None,
        };

        Ok(Self::with_invoker(
            config,
            Arc::new(LambdaInvoker::new(endpoint)),
            resolver,
        ))
    }

    /// Creates a client from explicit parts.
    pub fn with_invoker(
        config: ClientConfig,
        invoker: Arc<dyn RemoteInvoker>,
        resolver: Option<TableResolver>,
    ) -> Self {
        Self {
            config,
            invoker,
            resolver,
        }
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Rewrites the friendly table name in `sql` using the current mapping.
    ///
    /// What to do on failure is up to the caller.
    pub async fn resolve(&self, sql: &str) -> Result<String, ResolutionError> {
        match &self.resolver {
            Some(resolver) => resolver.resolve(sql).await,
            None => Err(ResolutionError::NotConfigured),
        }
    }

    /// Submits a query and decodes its result.
    ///
    /// The SQL is sent as given; call [`resolve`](Self::resolve) first to
    /// substitute the friendly table name.
    pub async fn query(&self, sql: &str, limit: Option<i64>) -> ClientResult<QueryOutcome> {
        let request = QueryRequest::new(sql, limit)?;
        info!(limit = request.limit(), "submitting query");

        let response = self
            .invoker
            .invoke(
                &self.config.query_function,
                &request.to_json(),
                self.config.capture_log,
            )
            .await?;
        log_tail(&response);

        let result = codec::decode(&response.payload)?;
        debug!(
            rows = result.row_count(),
            query_ms = result.query_ms,
            "query returned"
        );

        Ok(QueryOutcome {
            request,
            result,
            log_tail: response.log_tail,
        })
    }

    /// Copies `from_url` into the data bucket at `to_path` and, when
    /// `table_name` is given, registers it as the active table.
    pub async fn upload(
        &self,
        from_url: &str,
        to_path: &str,
        table_name: Option<&str>,
    ) -> ClientResult<UploadOutcome> {
        let upload = Upload::new(from_url, to_path)?;

        let registration = match table_name {
            Some(name) => {
                let bucket_url = self.config.bucket_url.as_deref().ok_or_else(|| {
                    ClientError::InvalidConfig(
                        "a bucket url is required to register a table name".to_string(),
                    )
                })?;
                let bucket = store::parse_bucket_url(bucket_url)?;
                let resolver = self.resolver.as_ref().ok_or(ResolutionError::NotConfigured)?;
                Some((TableMapping::for_upload(name, &bucket, upload.to_path()), resolver))
            }
            None => None,
        };

        let target = &self.config.upload_function;
        let payload =
            serde_json::to_value(&upload).map_err(|source| InvocationError::Payload {
                target: target.clone(),
                source,
            })?;

        info!(from = upload.from_url(), to = upload.to_path(), "uploading data");
        let response = self.invoker.invoke(target, &payload, true).await?;
        log_tail(&response);

        if response.is_function_error() {
            let message = serde_json::from_slice::<FunctionError>(&response.payload)
                .map(|err| err.error_message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&response.payload).into_owned());
            return Err(DecodeError::Remote {
                message,
                error_type: None,
            }
            .into());
        }

        let status: String =
            serde_json::from_slice(&response.payload).map_err(DecodeError::Envelope)?;
        if status != "ok" {
            return Err(ClientError::UploadFailed {
                to_path: upload.to_path().to_string(),
            });
        }

        let mapping = match registration {
            Some((mapping, resolver)) => {
                resolver.metadata().write(&mapping).await?;
                info!(table = %mapping.table_name, path = %mapping.path, "registered table");
                Some(mapping)
            }
            None => None,
        };

        Ok(UploadOutcome { upload, mapping })
    }
}

fn log_tail(response: &InvokeResponse) {
    if let Some(tail) = &response.log_tail {
        debug!("invocation log:\n{}", tail);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use object_store::memory::InMemory;
    use serde_json::{json, Value as JsonValue};
    use smallquery_common::Value;

    /// Records every call and replays canned responses in order.
    struct Recorder {
        calls: Mutex<Vec<(String, JsonValue, bool)>>,
        responses: Mutex<Vec<InvokeResponse>>,
    }

    impl Recorder {
        fn replying(responses: Vec<InvokeResponse>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                responses: Mutex::new(responses),
            })
        }
    }

    #[async_trait]
    impl RemoteInvoker for Recorder {
        async fn invoke(
            &self,
            target: &str,
            payload: &JsonValue,
            capture_log: bool,
        ) -> Result<InvokeResponse, InvocationError> {
            self.calls
                .lock()
                .unwrap()
                .push((target.to_string(), payload.clone(), capture_log));
            Ok(self.responses.lock().unwrap().remove(0))
        }
    }

    fn ok(body: &str) -> InvokeResponse {
        InvokeResponse {
            status: 200,
            function_error: None,
            log_tail: None,
            payload: body.to_string().into(),
        }
    }

    fn memory_resolver() -> TableResolver {
        TableResolver::new(MetadataStore::new(Arc::new(InMemory::new())))
    }

    #[test]
    fn test_client_config() {
        let config = ClientConfig::new()
            .endpoint("http://example.com:9000")
            .query_function("q")
            .upload_function("u")
            .bucket_url("s3://bucket")
            .capture_log(false);

        assert_eq!(config.endpoint, "http://example.com:9000");
        assert_eq!(config.query_function, "q");
        assert_eq!(config.upload_function, "u");
        assert_eq!(config.bucket_url.as_deref(), Some("s3://bucket"));
        assert!(!config.capture_log);
    }

    #[test]
    fn test_invalid_endpoint() {
        let result = Client::new(ClientConfig::new().endpoint("not a url"));
        assert!(matches!(result, Err(ClientError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_query_clamps_limit_before_sending() {
        let recorder = Recorder::replying(vec![ok(
            r#"{"results":"[[1]]","column_names":["one"],"query_ms":0.42}"#,
        )]);
        let client = Client::with_invoker(ClientConfig::new(), recorder.clone(), None);

        let outcome = client.query("select 1", Some(5000)).await.unwrap();
        assert_eq!(outcome.request.limit(), 1000);
        assert_eq!(outcome.result.rows, vec![vec![Value::Integer(1)]]);
        assert_eq!(outcome.result.query_ms, 0.42);

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, DEFAULT_QUERY_FUNCTION);
        assert_eq!(calls[0].1, json!({"query": "select 1", "limit": 1000}));
        assert!(calls[0].2);
    }

    #[tokio::test]
    async fn test_query_validation_skips_invocation() {
        let recorder = Recorder::replying(vec![]);
        let client = Client::with_invoker(ClientConfig::new(), recorder.clone(), None);

        let err = client.query("", Some(10)).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(recorder.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_remote_failure() {
        let recorder = Recorder::replying(vec![InvokeResponse {
            function_error: Some("Unhandled".to_string()),
            ..ok(r#"{"errorMessage":"syntax error"}"#)
        }]);
        let client = Client::with_invoker(ClientConfig::new(), recorder, None);

        let err = client.query("selec 1", None).await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(ref e) if e.is_remote()));
        assert_eq!(err.to_string(), "query failed: syntax error");
    }

    #[tokio::test]
    async fn test_resolve_without_bucket() {
        let client = Client::with_invoker(ClientConfig::new(), Recorder::replying(vec![]), None);
        assert!(matches!(
            client.resolve("SELECT 1").await,
            Err(ResolutionError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_upload_registers_mapping() {
        let recorder = Recorder::replying(vec![ok(r#""ok""#)]);
        let resolver = memory_resolver();
        let client = Client::with_invoker(
            ClientConfig::new().bucket_url("s3://query-data"),
            recorder.clone(),
            Some(resolver.clone()),
        );

        let outcome = client
            .upload(
                "https://example.com/taxi.parquet",
                "uploads/taxi_2019_04.parquet",
                Some("taxi"),
            )
            .await
            .unwrap();

        let mapping = outcome.mapping.unwrap();
        assert_eq!(mapping.path, "'s3://query-data/uploads/taxi_2019_04.parquet'");
        assert_eq!(resolver.metadata().read().await.unwrap(), mapping);

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls[0].0, DEFAULT_UPLOAD_FUNCTION);
        assert_eq!(
            calls[0].1,
            json!({"from_url": "https://example.com/taxi.parquet", "to_path": "uploads/taxi_2019_04.parquet"})
        );

        drop(calls);
        assert_eq!(
            client.resolve("SELECT * FROM taxi;").await.unwrap(),
            "SELECT * FROM 's3://query-data/uploads/taxi_2019_04.parquet';"
        );
    }

    #[tokio::test]
    async fn test_upload_mapping_uses_encoded_bucket_url() {
        let recorder = Recorder::replying(vec![ok(r#""ok""#)]);
        let client = Client::with_invoker(
            ClientConfig::new().bucket_url("file:///srv/query data"),
            recorder,
            Some(memory_resolver()),
        );

        let outcome = client
            .upload("https://example.com/a.csv", "uploads/a.csv", Some("a"))
            .await
            .unwrap();
        assert_eq!(
            outcome.mapping.unwrap().path,
            "'file:///srv/query%20data/uploads/a.csv'"
        );
    }

    #[tokio::test]
    async fn test_upload_remote_error_keeps_mapping() {
        let recorder = Recorder::replying(vec![ok(r#""error""#)]);
        let resolver = memory_resolver();
        let client = Client::with_invoker(
            ClientConfig::new().bucket_url("s3://query-data"),
            recorder,
            Some(resolver.clone()),
        );

        let err = client
            .upload("https://example.com/a.csv", "uploads/a.csv", Some("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::UploadFailed { .. }));
        assert!(matches!(
            resolver.metadata().read().await,
            Err(ResolutionError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_upload_table_name_requires_bucket() {
        let recorder = Recorder::replying(vec![]);
        let client = Client::with_invoker(ClientConfig::new(), recorder.clone(), None);

        let err = client
            .upload("https://example.com/a.csv", "uploads/a.csv", Some("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfig(_)));
        assert!(recorder.calls.lock().unwrap().is_empty());
    }
}
