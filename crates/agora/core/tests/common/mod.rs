#![allow(dead_code)]

pub mod faulty;

use agora_core::{
    AlignmentScorer, CivicContext, DeliberationService, FixedClock, GazetteArchive,
    IdentityLedger, LifecycleManager, MembershipManager,
};
use agora_storage::memory::InMemoryCivicStorage;
use agora_storage::AgentStore;
use agora_types::{Agent, CivicPolicy, GazetteEntry};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 15).unwrap()
}

pub struct Harness {
    pub storage: Arc<InMemoryCivicStorage>,
    pub clock: Arc<FixedClock>,
    pub identity: IdentityLedger,
    pub lifecycle: LifecycleManager,
    pub deliberation: DeliberationService,
    pub membership: MembershipManager,
    pub alignment: AlignmentScorer,
    pub gazette: GazetteArchive<InMemoryCivicStorage>,
}

impl Harness {
    pub fn new() -> Self {
        let storage = Arc::new(InMemoryCivicStorage::new());
        let clock = Arc::new(FixedClock::new(t0()));
        let ctx = CivicContext::new(storage.clone(), CivicPolicy::default()).with_clock(clock.clone());
        Self {
            identity: IdentityLedger::new(ctx.clone()),
            lifecycle: LifecycleManager::new(ctx.clone()),
            deliberation: DeliberationService::new(ctx.clone()),
            membership: MembershipManager::new(ctx.clone()),
            alignment: AlignmentScorer::new(ctx),
            gazette: GazetteArchive::new(storage.clone()),
            storage,
            clock,
        }
    }

    /// Register and verify an agent, then pin its activity score.
    pub async fn citizen(&self, name: &str, activity: u64) -> Agent {
        let registration = self.identity.register(name, None).await.unwrap();
        let proof = format!("https://x.com/{}/status/1", name.replace('-', "_"));
        let profile = self
            .identity
            .verify(&registration.claim_code, &proof)
            .await
            .unwrap();
        let delta = activity as i64 - profile.activity_score as i64;
        self.storage
            .adjust_activity(&registration.agent_id, delta)
            .await
            .unwrap();
        self.agent(&registration.agent_id).await
    }

    /// Register without verifying.
    pub async fn applicant(&self, name: &str) -> Agent {
        let registration = self.identity.register(name, None).await.unwrap();
        self.agent(&registration.agent_id).await
    }

    pub async fn agent(&self, id: &agora_types::AgentId) -> Agent {
        self.storage.get_agent(id).await.unwrap().unwrap()
    }

    pub async fn gazette(&self) -> Vec<GazetteEntry> {
        self.gazette.recent(100).await.unwrap()
    }
}
