//! Friendly table name resolution.
//!
//! The data bucket holds one metadata object, the [`TableMapping`] of the
//! most recent upload. Before a query is submitted its friendly table name
//! is replaced by the quoted storage path from that mapping.

use std::sync::Arc;

use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use tracing::debug;

use smallquery_common::{TableMapping, METADATA_KEY};

use crate::error::ResolutionError;

/// Reads and writes the singleton table mapping.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    store: Arc<dyn ObjectStore>,
    key: Path,
}

impl MetadataStore {
    /// Creates a metadata store at the well-known key of `store`.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            key: Path::from(METADATA_KEY),
        }
    }

    /// Returns the key the mapping is stored under.
    pub fn key(&self) -> &Path {
        &self.key
    }

    /// Reads the current mapping.
    pub async fn read(&self) -> Result<TableMapping, ResolutionError> {
        let key = self.key.to_string();
        let object = self.store.get(&self.key).await.map_err(|err| match err {
            object_store::Error::NotFound { .. } => ResolutionError::NotFound { key: key.clone() },
            source => ResolutionError::Read {
                key: key.clone(),
                source,
            },
        })?;
        let bytes = object
            .bytes()
            .await
            .map_err(|source| ResolutionError::Read {
                key: key.clone(),
                source,
            })?;

        serde_json::from_slice(&bytes).map_err(|source| ResolutionError::Malformed { key, source })
    }

    /// Replaces the current mapping.
    pub async fn write(&self, mapping: &TableMapping) -> Result<(), object_store::Error> {
        let body = serde_json::to_vec(mapping).map_err(|err| object_store::Error::Generic {
            store: "metadata",
            source: Box::new(err),
        })?;
        self.store.put(&self.key, PutPayload::from(body)).await?;
        debug!(table = %mapping.table_name, path = %mapping.path, "table mapping written");
        Ok(())
    }
}

/// Rewrites queries using the mapping in a [`MetadataStore`].
#[derive(Debug, Clone)]
pub struct TableResolver {
    metadata: MetadataStore,
}

impl TableResolver {
    /// Creates a resolver backed by `metadata`.
    pub fn new(metadata: MetadataStore) -> Self {
        Self { metadata }
    }

    /// Returns the underlying metadata store.
    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Reads the mapping and rewrites `query` with it.
    ///
    /// The mapping is read on every call.
    pub async fn resolve(&self, query: &str) -> Result<String, ResolutionError> {
        let mapping = self.metadata.read().await?;
        let rewritten = rewrite_table_name(query, &mapping);
        if rewritten != query {
            debug!(table = %mapping.table_name, "resolved table name");
        }
        Ok(rewritten)
    }
}

/// Replaces whole-identifier occurrences of the mapped table name with its
/// path.
///
/// An occurrence only matches when the characters on both sides are not
/// identifier characters (alphanumeric or `_`), so `taxi` is rewritten in
/// `FROM taxi;` but not in `taxi_zones` or `mytaxi`. Matching is
/// case-sensitive. Single-quoted string literals are copied unchanged; an
/// unterminated literal runs to the end of the query.
pub fn rewrite_table_name(query: &str, mapping: &TableMapping) -> String {
    let name = mapping.table_name.as_str();
    if name.is_empty() {
        return query.to_string();
    }

    let mut out = String::with_capacity(query.len());
    let mut rest = query;

    while let Some(open) = rest.find('\'') {
        replace_identifier(&rest[..open], name, &mapping.path, &mut out);
        let end = rest[open + 1..]
            .find('\'')
            .map_or(rest.len(), |close| open + close + 2);
        out.push_str(&rest[open..end]);
        rest = &rest[end..];
    }

    replace_identifier(rest, name, &mapping.path, &mut out);
    out
}

/// Rewrites `name` in a stretch of SQL that holds no string literal.
fn replace_identifier(segment: &str, name: &str, path: &str, out: &mut String) {
    let mut rest = segment;
    let mut previous: Option<char> = None;

    while let Some(pos) = rest.find(name) {
        let before = rest[..pos].chars().next_back().or(if pos == 0 { previous } else { None });
        let after = rest[pos + name.len()..].chars().next();

        out.push_str(&rest[..pos]);
        if is_identifier_char(before) || is_identifier_char(after) {
            out.push_str(name);
        } else {
            out.push_str(path);
        }

        previous = name.chars().next_back();
        rest = &rest[pos + name.len()..];
    }

    out.push_str(rest);
}

fn is_identifier_char(c: Option<char>) -> bool {
    c.is_some_and(|c| c.is_alphanumeric() || c == '_')
}
