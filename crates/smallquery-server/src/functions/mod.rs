//! The query and upload functions.
//!
//! Both functions take the JSON event of one invocation. `run_query` returns
//! a [`QueryResponse`] or raises a [`HandlerError`]; `upload_data` never
//! raises and reports its outcome as the status string `"ok"` or `"error"`.
//!
//! Diagnostics written during an invocation go to tracing and to the
//! invocation's [`InvocationLog`], whose tail may be returned to the caller.

use std::sync::Arc;

use object_store::path::Path;
use object_store::{ObjectStore, WriteMultipart};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, info};

use smallquery_common::store::{self, StoreError};
use smallquery_common::{QueryRequest, QueryResponse, Upload, ValidationError};

use crate::codec::{self, EncodeError};
use crate::config::ServerConfig;
use crate::engine::{EngineError, EngineHandle};

/// Upload parts in flight before the download is paused.
const UPLOAD_CONCURRENCY: usize = 8;

/// Status returned by a successful upload.
pub const UPLOAD_OK: &str = "ok";
/// Status returned by a failed upload.
pub const UPLOAD_ERROR: &str = "error";

/// Failure of a query invocation.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The event was malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The engine rejected or failed the query.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The result could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl HandlerError {
    /// Error type reported alongside the message.
    pub fn error_type(&self) -> &'static str {
        match self {
            HandlerError::Validation(_) => "ValidationError",
            HandlerError::Engine(_) => "QueryError",
            HandlerError::Encode(_) => "EncodeError",
        }
    }
}

#[derive(Debug, Error)]
enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("invalid destination path: {0}")]
    Path(#[from] object_store::path::Error),

    #[error("write failed: {0}")]
    Store(#[from] object_store::Error),
}

/// Diagnostics captured during one invocation.
#[derive(Debug, Default)]
pub struct InvocationLog {
    lines: Vec<String>,
}

impl InvocationLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a line.
    pub fn record(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Returns the captured lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Returns at most the last `max_bytes` bytes of the log text.
    pub fn tail(&self, max_bytes: usize) -> String {
        let mut text = self.lines.join("\n");
        if text.len() > max_bytes {
            let mut start = text.len() - max_bytes;
            while !text.is_char_boundary(start) {
                start += 1;
            }
            text.drain(..start);
        }
        text
    }
}

/// The functions served by one process.
///
/// The engine session held here survives across invocations.
#[derive(Debug)]
pub struct Functions {
    engine: EngineHandle,
    data_store: Arc<dyn ObjectStore>,
    http: reqwest::Client,
}

impl Functions {
    /// Creates the functions over an engine and the data bucket store.
    pub fn new(engine: EngineHandle, data_store: Arc<dyn ObjectStore>) -> Self {
        Self {
            engine,
            data_store,
            http: reqwest::Client::new(),
        }
    }

    /// Creates the functions for the data bucket named in `config`.
    pub fn from_config(config: &ServerConfig) -> Result<Self, StoreError> {
        let url = store::parse_bucket_url(&config.data_url)?;
        let data_store = store::open(&url)?;
        let engine = EngineHandle::with_data_store(url, Arc::clone(&data_store));
        Ok(Self::new(engine, data_store))
    }

    /// Returns the engine handle.
    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    /// Returns the data bucket store.
    pub fn data_store(&self) -> &Arc<dyn ObjectStore> {
        &self.data_store
    }

    /// Runs the query described by `event`.
    pub async fn run_query(
        &self,
        event: &JsonValue,
        log: &mut InvocationLog,
    ) -> Result<QueryResponse, HandlerError> {
        let result = self.try_run_query(event, log).await;
        if let Err(e) = &result {
            error!("error running query: {}", e);
            log.record(format!("error running query: {}", e));
        }
        result
    }

    async fn try_run_query(
        &self,
        event: &JsonValue,
        log: &mut InvocationLog,
    ) -> Result<QueryResponse, HandlerError> {
        let request = QueryRequest::from_event(event)?;

        let line = format!(
            "executing query: {} with row limit: {}",
            request.sql(),
            request.limit()
        );
        info!("{}", line);
        log.record(line);

        let mut cursor = self.engine.execute(request.sql()).await?;
        let response = codec::encode(cursor.as_mut(), request.limit()).await?;
        Ok(response)
    }

    /// Copies the object at the event's `from_url` into the data bucket.
    ///
    /// Returns [`UPLOAD_OK`] or [`UPLOAD_ERROR`].
    pub async fn upload_data(&self, event: &JsonValue, log: &mut InvocationLog) -> &'static str {
        match self.try_upload(event).await {
            Ok((upload, bytes)) => {
                let line = format!(
                    "uploaded {} bytes from {} to {}",
                    bytes,
                    upload.from_url(),
                    upload.to_path()
                );
                info!("{}", line);
                log.record(line);
                UPLOAD_OK
            }
            Err(e) => {
                error!("error uploading data: {}", e);
                log.record(format!("error uploading data: {}", e));
                UPLOAD_ERROR
            }
        }
    }

    async fn try_upload(&self, event: &JsonValue) -> Result<(Upload, usize), UploadError> {
        let upload = Upload::from_event(event)?;
        let path = Path::parse(upload.to_path())?;

        let mut response = self
            .http
            .get(upload.from_url())
            .send()
            .await?
            .error_for_status()?;

        let multipart = self.data_store.put_multipart(&path).await?;
        let mut writer = WriteMultipart::new(multipart);

        let mut total = 0;
        let streamed: Result<(), UploadError> = async {
            while let Some(chunk) = response.chunk().await? {
                writer.wait_for_capacity(UPLOAD_CONCURRENCY).await?;
                writer.write(&chunk);
                total += chunk.len();
            }
            Ok(())
        }
        .await;

        match streamed {
            Ok(()) => {
                writer.finish().await?;
                Ok((upload, total))
            }
            Err(e) => {
                if let Err(abort) = writer.abort().await {
                    error!("failed to abort upload to {}: {}", path, abort);
                }
                Err(e)
            }
        }
    }
}
