//! Gazette publisher
//!
//! The gazette is the public, append-only record of notable events. Publishing
//! is fire-and-forget: a failed append is logged and never fails the operation
//! that triggered it.

use agora_storage::{GazetteStore, QueryWindow};
use agora_types::{GazetteAppend, GazetteEntry};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::CivicResult;

/// Upper bound on a single gazette page
pub const MAX_GAZETTE_PAGE: usize = 100;

/// Sink for gazette entries.
#[async_trait]
pub trait GazettePublisher: Send + Sync {
    /// Append `entry`. Never reports failure to the caller.
    async fn publish(&self, entry: GazetteAppend);
}

/// Publisher that appends to a gazette store.
pub struct StoredGazette<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> StoredGazette<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S> GazettePublisher for StoredGazette<S>
where
    S: GazetteStore + ?Sized,
{
    async fn publish(&self, entry: GazetteAppend) {
        let entry_type = entry.entry_type;
        match self.store.append_gazette(entry).await {
            Ok(record) => {
                debug!(entry_id = %record.id, entry_type = %entry_type, "gazette entry published")
            }
            Err(e) => warn!(entry_type = %entry_type, error = %e, "gazette append failed"),
        }
    }
}

/// Read side of the gazette.
pub struct GazetteArchive<S: ?Sized> {
    store: Arc<S>,
}

impl<S> GazetteArchive<S>
where
    S: GazetteStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Most recent entries first. `limit` is clamped to `1..=MAX_GAZETTE_PAGE`.
    pub async fn recent(&self, limit: usize) -> CivicResult<Vec<GazetteEntry>> {
        let window = QueryWindow {
            limit: limit.clamp(1, MAX_GAZETTE_PAGE),
            offset: 0,
        };
        Ok(self.store.list_gazette(window).await?)
    }
}
