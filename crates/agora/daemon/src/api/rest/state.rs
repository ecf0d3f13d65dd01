//! Application state for API handlers

use agora_core::{
    AlignmentScorer, CivicContext, DeliberationService, GazetteArchive, IdentityLedger,
    LifecycleManager, MembershipManager,
};
use agora_storage::CivicStorage;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub identity: IdentityLedger,
    pub lifecycle: LifecycleManager,
    pub deliberation: DeliberationService,
    pub membership: MembershipManager,
    pub alignment: AlignmentScorer,
    pub gazette: Arc<GazetteArchive<dyn CivicStorage>>,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wire every service to one civic context.
    pub fn new(ctx: CivicContext) -> Self {
        Self {
            identity: IdentityLedger::new(ctx.clone()),
            lifecycle: LifecycleManager::new(ctx.clone()),
            deliberation: DeliberationService::new(ctx.clone()),
            membership: MembershipManager::new(ctx.clone()),
            alignment: AlignmentScorer::new(ctx.clone()),
            gazette: Arc::new(GazetteArchive::new(ctx.storage().clone())),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
        }
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let secs = (Utc::now() - self.started_at).num_seconds();

        if secs < 60 {
            format!("{secs}s")
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else if secs < 86400 {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        } else {
            format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
        }
    }
}
