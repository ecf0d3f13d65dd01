//! In-memory store with switchable failures

use agora_storage::memory::InMemoryCivicStorage;
use agora_storage::{
    AgentStore, BallotStore, BillStore, CommentStore, GazetteStore, PartyStore, QueryWindow,
    StorageError, StorageResult,
};
use agora_types::{
    Agent, AgentId, Bill, BillId, BillStatus, BillTransitionPatch, BillVote, Comment, CommentId,
    GazetteAppend, GazetteEntry, Party, PartyId, PartyMembership, PartyRecommendation,
    SenateBallot,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
pub struct FaultyStorage {
    pub inner: InMemoryCivicStorage,
    /// Upcoming agent inserts to reject as claim-code collisions
    pub claim_code_collisions: AtomicUsize,
    pub fail_activity: AtomicBool,
    pub fail_gazette: AtomicBool,
    pub gazette_attempts: AtomicUsize,
}

impl FaultyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collide_claim_codes(&self, times: usize) {
        self.claim_code_collisions.store(times, Ordering::SeqCst);
    }

    fn take_collision(&self) -> bool {
        self.claim_code_collisions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl AgentStore for FaultyStorage {
    async fn insert_agent(&self, agent: Agent) -> StorageResult<()> {
        if self.take_collision() {
            return Err(StorageError::DuplicateClaimCode);
        }
        self.inner.insert_agent(agent).await
    }

    async fn get_agent(&self, id: &AgentId) -> StorageResult<Option<Agent>> {
        self.inner.get_agent(id).await
    }

    async fn find_agent_by_credential(&self, digest: &str) -> StorageResult<Option<Agent>> {
        self.inner.find_agent_by_credential(digest).await
    }

    async fn find_agent_by_claim_code(&self, claim_code: &str) -> StorageResult<Option<Agent>> {
        self.inner.find_agent_by_claim_code(claim_code).await
    }

    async fn complete_verification(
        &self,
        id: &AgentId,
        claim_code: &str,
        social_handle: &str,
        reward: u64,
        verified_at: DateTime<Utc>,
    ) -> StorageResult<bool> {
        self.inner
            .complete_verification(id, claim_code, social_handle, reward, verified_at)
            .await
    }

    async fn adjust_activity(&self, id: &AgentId, delta: i64) -> StorageResult<u64> {
        if self.fail_activity.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("activity ledger offline".into()));
        }
        self.inner.adjust_activity(id, delta).await
    }

    async fn decay_activity(
        &self,
        percent: u8,
        stale_before: DateTime<Utc>,
        decayed_at: DateTime<Utc>,
    ) -> StorageResult<u64> {
        self.inner
            .decay_activity(percent, stale_before, decayed_at)
            .await
    }
}

#[async_trait]
impl BillStore for FaultyStorage {
    async fn insert_bill(&self, bill: Bill) -> StorageResult<()> {
        self.inner.insert_bill(bill).await
    }

    async fn get_bill(&self, id: &BillId) -> StorageResult<Option<Bill>> {
        self.inner.get_bill(id).await
    }

    async fn list_bills(
        &self,
        status: Option<BillStatus>,
        window: QueryWindow,
    ) -> StorageResult<Vec<Bill>> {
        self.inner.list_bills(status, window).await
    }

    async fn list_bills_due(&self, at: DateTime<Utc>) -> StorageResult<Vec<Bill>> {
        self.inner.list_bills_due(at).await
    }

    async fn transition_bill(
        &self,
        id: &BillId,
        expected_from: BillStatus,
        to: BillStatus,
        patch: BillTransitionPatch,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<bool> {
        self.inner
            .transition_bill(id, expected_from, to, patch, updated_at)
            .await
    }
}

#[async_trait]
impl BallotStore for FaultyStorage {
    async fn insert_vote(&self, vote: BillVote) -> StorageResult<()> {
        self.inner.insert_vote(vote).await
    }

    async fn list_votes(&self, bill_id: &BillId) -> StorageResult<Vec<BillVote>> {
        self.inner.list_votes(bill_id).await
    }

    async fn insert_senate_ballot(&self, ballot: SenateBallot) -> StorageResult<()> {
        self.inner.insert_senate_ballot(ballot).await
    }

    async fn list_senate_ballots(&self, bill_id: &BillId) -> StorageResult<Vec<SenateBallot>> {
        self.inner.list_senate_ballots(bill_id).await
    }
}

#[async_trait]
impl CommentStore for FaultyStorage {
    async fn insert_comment(&self, comment: Comment) -> StorageResult<()> {
        self.inner.insert_comment(comment).await
    }

    async fn get_comment(&self, id: &CommentId) -> StorageResult<Option<Comment>> {
        self.inner.get_comment(id).await
    }

    async fn list_comments(&self, bill_id: &BillId) -> StorageResult<Vec<Comment>> {
        self.inner.list_comments(bill_id).await
    }
}

#[async_trait]
impl PartyStore for FaultyStorage {
    async fn found_party(&self, party: Party) -> StorageResult<()> {
        self.inner.found_party(party).await
    }

    async fn get_party(&self, id: &PartyId) -> StorageResult<Option<Party>> {
        self.inner.get_party(id).await
    }

    async fn list_parties(&self) -> StorageResult<Vec<Party>> {
        self.inner.list_parties().await
    }

    async fn get_membership(&self, agent_id: &AgentId) -> StorageResult<Option<PartyMembership>> {
        self.inner.get_membership(agent_id).await
    }

    async fn list_members(&self, party_id: &PartyId) -> StorageResult<Vec<PartyMembership>> {
        self.inner.list_members(party_id).await
    }

    async fn join_party(&self, membership: PartyMembership) -> StorageResult<Party> {
        self.inner.join_party(membership).await
    }

    async fn remove_member(&self, agent_id: &AgentId, party_id: &PartyId) -> StorageResult<bool> {
        self.inner.remove_member(agent_id, party_id).await
    }

    async fn dissolve_party(
        &self,
        party_id: &PartyId,
        founder_id: &AgentId,
    ) -> StorageResult<bool> {
        self.inner.dissolve_party(party_id, founder_id).await
    }

    async fn upsert_recommendation(
        &self,
        recommendation: PartyRecommendation,
    ) -> StorageResult<()> {
        self.inner.upsert_recommendation(recommendation).await
    }

    async fn list_recommendations(
        &self,
        party_id: &PartyId,
    ) -> StorageResult<Vec<PartyRecommendation>> {
        self.inner.list_recommendations(party_id).await
    }
}

#[async_trait]
impl GazetteStore for FaultyStorage {
    async fn append_gazette(&self, entry: GazetteAppend) -> StorageResult<GazetteEntry> {
        self.gazette_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_gazette.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("gazette volume read-only".into()));
        }
        self.inner.append_gazette(entry).await
    }

    async fn list_gazette(&self, window: QueryWindow) -> StorageResult<Vec<GazetteEntry>> {
        self.inner.list_gazette(window).await
    }
}
