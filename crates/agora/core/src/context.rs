//! Shared collaborators for the workflow services

use agora_storage::CivicStorage;
use agora_types::{AgentId, CivicPolicy, GazetteAppend, GazetteEntryType, GazetteReference};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::warn;

use crate::clock::{Clock, SystemClock};
use crate::gazette::{GazettePublisher, StoredGazette};

/// Store, gazette, clock and policy shared by every service.
///
/// Built once at startup and cloned into each service; cloning is cheap.
#[derive(Clone)]
pub struct CivicContext {
    storage: Arc<dyn CivicStorage>,
    gazette: Arc<dyn GazettePublisher>,
    clock: Arc<dyn Clock>,
    policy: Arc<CivicPolicy>,
}

impl CivicContext {
    /// Context publishing to the store's own gazette on the wall clock.
    pub fn new(storage: Arc<dyn CivicStorage>, policy: CivicPolicy) -> Self {
        let gazette = Arc::new(StoredGazette::new(storage.clone()));
        Self {
            storage,
            gazette,
            clock: Arc::new(SystemClock),
            policy: Arc::new(policy),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_gazette(mut self, gazette: Arc<dyn GazettePublisher>) -> Self {
        self.gazette = gazette;
        self
    }

    pub fn storage(&self) -> &Arc<dyn CivicStorage> {
        &self.storage
    }

    pub fn policy(&self) -> &CivicPolicy {
        &self.policy
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Best-effort activity bump. Failures are logged, never returned.
    pub(crate) async fn reward(&self, agent_id: &AgentId, amount: u64, reason: &'static str) {
        if amount == 0 {
            return;
        }
        let delta = i64::try_from(amount).unwrap_or(i64::MAX);
        if let Err(e) = self.storage.adjust_activity(agent_id, delta).await {
            warn!(agent_id = %agent_id, reason, error = %e, "activity reward failed");
        }
    }

    pub(crate) async fn publish(
        &self,
        entry_type: GazetteEntryType,
        title: String,
        content: String,
        reference: Option<GazetteReference>,
    ) {
        self.gazette
            .publish(GazetteAppend {
                entry_type,
                title,
                content,
                reference,
                published_at: self.now(),
            })
            .await;
    }
}
