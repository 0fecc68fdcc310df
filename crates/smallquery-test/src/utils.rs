//! Helpers for running a function host inside a test.

use std::sync::Arc;

use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use smallquery_client::{Client, ClientConfig, ClientResult};
use smallquery_server::{Functions, HttpServer, ServerConfig};

/// A function host serving on an ephemeral port over a temporary bucket.
pub struct TestHost {
    endpoint: String,
    bucket_url: String,
    functions: Arc<Functions>,
    handle: JoinHandle<()>,
    // Held so the bucket outlives the host.
    _bucket: TempDir,
}

impl TestHost {
    /// Starts a host whose data bucket is a fresh temporary directory.
    pub async fn start() -> std::io::Result<Self> {
        let bucket = TempDir::new()?;
        let bucket_url = format!("file://{}", bucket.path().display());

        let config = ServerConfig {
            data_url: bucket_url.clone(),
            ..ServerConfig::default()
        };
        let functions = Functions::from_config(&config)
            .map_err(std::io::Error::other)?;
        let functions = Arc::new(functions);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let endpoint = format!("http://{}", listener.local_addr()?);

        let server = HttpServer::new(Arc::clone(&functions), &config);
        let handle = tokio::spawn(async move {
            let _ = server.serve_with_listener(listener).await;
        });

        Ok(Self {
            endpoint,
            bucket_url,
            functions,
            handle,
            _bucket: bucket,
        })
    }

    /// Returns the invocation endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the data bucket URL shared by host and client.
    pub fn bucket_url(&self) -> &str {
        &self.bucket_url
    }

    /// Returns the functions served by the host.
    pub fn functions(&self) -> &Arc<Functions> {
        &self.functions
    }

    /// Returns a client configuration pointing at this host.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new()
            .endpoint(&self.endpoint)
            .bucket_url(&self.bucket_url)
    }

    /// Returns a client pointing at this host and its bucket.
    pub fn client(&self) -> ClientResult<Client> {
        Client::new(self.client_config())
    }
}

impl Drop for TestHost {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
