//! Engine session handle and cursors.
//!
//! The analytical engine session is expensive to create, so it is owned by
//! an [`EngineHandle`] that creates it on first use and keeps it for every
//! later invocation served by the same process. [`EngineHandle::reset`]
//! drops it, which is how a cold start is simulated.
//!
//! Queries may reference storage locations inline as quoted URLs, e.g.
//! `SELECT * FROM 's3://bucket/uploads/taxi.parquet'`.

use std::sync::Arc;

use async_trait::async_trait;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::error::DataFusionError;
use datafusion::physical_plan::SendableRecordBatchStream;
use datafusion::prelude::SessionContext;
use datafusion::scalar::ScalarValue;
use futures::StreamExt;
use object_store::ObjectStore;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

/// Errors raised by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Planning or execution failed.
    #[error(transparent)]
    DataFusion(#[from] DataFusionError),
}

/// A forward-only cursor over the rows of an executed query.
#[async_trait]
pub trait Cursor: Send {
    /// Names of the result columns, in order.
    fn column_names(&self) -> Vec<String>;

    /// Fetches up to `limit` further rows.
    ///
    /// Returns fewer rows only when the result is exhausted.
    async fn fetch_many(&mut self, limit: usize) -> Result<Vec<Vec<ScalarValue>>, EngineError>;
}

/// Cursor over a DataFusion record batch stream.
struct StreamCursor {
    column_names: Vec<String>,
    stream: SendableRecordBatchStream,
    /// Partially consumed batch and the offset of its next row.
    pending: Option<(RecordBatch, usize)>,
}

#[async_trait]
impl Cursor for StreamCursor {
    fn column_names(&self) -> Vec<String> {
        self.column_names.clone()
    }

    async fn fetch_many(&mut self, limit: usize) -> Result<Vec<Vec<ScalarValue>>, EngineError> {
        let mut rows = Vec::with_capacity(limit.min(1024));

        while rows.len() < limit {
            let (batch, offset) = match self.pending.take() {
                Some(pending) => pending,
                None => match self.stream.next().await {
                    Some(batch) => (batch?, 0),
                    None => break,
                },
            };

            let end = batch.num_rows().min(offset + (limit - rows.len()));
            for row in offset..end {
                let mut values = Vec::with_capacity(batch.num_columns());
                for column in batch.columns() {
                    values.push(ScalarValue::try_from_array(column, row)?);
                }
                rows.push(values);
            }

            if end < batch.num_rows() {
                self.pending = Some((batch, end));
            }
        }

        Ok(rows)
    }
}

/// Owner of the engine session.
///
/// The session is created lazily and reused until [`reset`](Self::reset).
/// Queries run on a clone of the session outside the lock, so concurrent
/// invocations never wait on each other.
#[derive(Default)]
pub struct EngineHandle {
    data_store: Option<(Url, Arc<dyn ObjectStore>)>,
    session: Mutex<Option<SessionContext>>,
}

impl EngineHandle {
    /// Creates a handle with no data bucket registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a handle whose sessions can read the bucket at `url`.
    pub fn with_data_store(url: Url, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            data_store: Some((url, store)),
            session: Mutex::new(None),
        }
    }

    /// Returns true if a session is currently held.
    pub fn is_warm(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Returns the session, creating it on first use.
    pub fn session(&self) -> SessionContext {
        let mut guard = self.session.lock();
        if let Some(ctx) = guard.as_ref() {
            return ctx.clone();
        }

        let ctx = self.create_session();
        *guard = Some(ctx.clone());
        ctx
    }

    /// Drops the held session. The next query creates a fresh one.
    pub fn reset(&self) {
        if self.session.lock().take().is_some() {
            debug!("engine session dropped");
        }
    }

    /// Plans and starts executing `sql`.
    pub async fn execute(&self, sql: &str) -> Result<Box<dyn Cursor>, EngineError> {
        let ctx = self.session();
        let df = ctx.sql(sql).await?;
        let column_names = df
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect();
        let stream = df.execute_stream().await?;

        Ok(Box::new(StreamCursor {
            column_names,
            stream,
            pending: None,
        }))
    }

    fn create_session(&self) -> SessionContext {
        info!("creating engine session");
        let ctx = SessionContext::new().enable_url_table();

        // file:// locations are served by the engine's own local store
        if let Some((url, store)) = &self.data_store {
            if url.scheme() != "file" {
                ctx.register_object_store(url, Arc::clone(store));
            }
        }

        ctx
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("data_url", &self.data_store.as_ref().map(|(url, _)| url.as_str()))
            .field("warm", &self.is_warm())
            .finish()
    }
}
