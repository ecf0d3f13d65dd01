use crate::StorageResult;
use agora_types::{
    Agent, AgentId, Bill, BillId, BillStatus, BillTransitionPatch, BillVote, Comment, CommentId,
    GazetteAppend, GazetteEntry, Party, PartyId, PartyMembership, PartyRecommendation,
    SenateBallot,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Generic query window for paged reads.
#[derive(Debug, Clone, Copy)]
pub struct QueryWindow {
    pub limit: usize,
    pub offset: usize,
}

impl Default for QueryWindow {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

/// Storage interface for agent identity and activity.
#[async_trait]
pub trait AgentStore: Send + Sync {
    /// Insert a newly registered agent. Fails with `Conflict` on a taken name
    /// and `DuplicateClaimCode` when the claim code is already stored.
    async fn insert_agent(&self, agent: Agent) -> StorageResult<()>;

    async fn get_agent(&self, id: &AgentId) -> StorageResult<Option<Agent>>;

    async fn find_agent_by_credential(&self, digest: &str) -> StorageResult<Option<Agent>>;

    async fn find_agent_by_claim_code(&self, claim_code: &str) -> StorageResult<Option<Agent>>;

    /// Consume `claim_code` by moving a pending agent to verified in one
    /// conditional update. Returns `false` when the agent is no longer pending
    /// or the code does not match.
    async fn complete_verification(
        &self,
        id: &AgentId,
        claim_code: &str,
        social_handle: &str,
        reward: u64,
        verified_at: DateTime<Utc>,
    ) -> StorageResult<bool>;

    /// Atomically add `delta` to the activity score, flooring at zero.
    /// Returns the new score.
    async fn adjust_activity(&self, id: &AgentId, delta: i64) -> StorageResult<u64>;

    /// Shave `percent` off every score last decayed (or created) at or before
    /// `stale_before`. Returns the number of agents touched.
    async fn decay_activity(
        &self,
        percent: u8,
        stale_before: DateTime<Utc>,
        decayed_at: DateTime<Utc>,
    ) -> StorageResult<u64>;
}

/// Storage interface for bills.
#[async_trait]
pub trait BillStore: Send + Sync {
    async fn insert_bill(&self, bill: Bill) -> StorageResult<()>;

    async fn get_bill(&self, id: &BillId) -> StorageResult<Option<Bill>>;

    /// List bills newest-first, optionally filtered by status.
    async fn list_bills(
        &self,
        status: Option<BillStatus>,
        window: QueryWindow,
    ) -> StorageResult<Vec<Bill>>;

    /// Bills in a voting phase whose window has closed at `at`, oldest first.
    async fn list_bills_due(&self, at: DateTime<Utc>) -> StorageResult<Vec<Bill>>;

    /// Move a bill from `expected_from` to `to`, applying `patch`, only if the
    /// stored status still equals `expected_from`. Returns whether this call
    /// performed the transition. `NotFound` if the bill does not exist.
    async fn transition_bill(
        &self,
        id: &BillId,
        expected_from: BillStatus,
        to: BillStatus,
        patch: BillTransitionPatch,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<bool>;
}

/// Storage interface for floor votes and senate ballots.
#[async_trait]
pub trait BallotStore: Send + Sync {
    /// Record a floor vote. `Conflict` if the agent already voted on the bill.
    async fn insert_vote(&self, vote: BillVote) -> StorageResult<()>;

    /// Floor votes for a bill in casting order.
    async fn list_votes(&self, bill_id: &BillId) -> StorageResult<Vec<BillVote>>;

    /// Record a senate ballot. `Conflict` on a second ballot by the same senator.
    async fn insert_senate_ballot(&self, ballot: SenateBallot) -> StorageResult<()>;

    async fn list_senate_ballots(&self, bill_id: &BillId) -> StorageResult<Vec<SenateBallot>>;
}

/// Storage interface for append-only deliberation.
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert_comment(&self, comment: Comment) -> StorageResult<()>;

    async fn get_comment(&self, id: &CommentId) -> StorageResult<Option<Comment>>;

    /// All comments on a bill ascending by creation time, ties broken by id.
    async fn list_comments(&self, bill_id: &BillId) -> StorageResult<Vec<Comment>>;
}

/// Storage interface for parties and the membership relation.
#[async_trait]
pub trait PartyStore: Send + Sync {
    /// Insert `party` with its founder as the sole member. `Conflict` if the
    /// founder already belongs to a party or the name is taken.
    async fn found_party(&self, party: Party) -> StorageResult<()>;

    async fn get_party(&self, id: &PartyId) -> StorageResult<Option<Party>>;

    async fn list_parties(&self) -> StorageResult<Vec<Party>>;

    async fn get_membership(&self, agent_id: &AgentId) -> StorageResult<Option<PartyMembership>>;

    async fn list_members(&self, party_id: &PartyId) -> StorageResult<Vec<PartyMembership>>;

    /// Insert the membership and increment the party counter atomically.
    /// `Conflict` if the agent holds any membership, `NotFound` if the party
    /// does not exist. Returns the party with its new count.
    async fn join_party(&self, membership: PartyMembership) -> StorageResult<Party>;

    /// Delete the membership and decrement the counter (floor zero)
    /// atomically. Returns `false` if no such membership existed.
    async fn remove_member(&self, agent_id: &AgentId, party_id: &PartyId) -> StorageResult<bool>;

    /// Delete the party, its memberships and its recommendations, only while
    /// `founder_id` founded it and it has at most one member. Returns whether
    /// the party was deleted.
    async fn dissolve_party(&self, party_id: &PartyId, founder_id: &AgentId)
        -> StorageResult<bool>;

    /// Insert or replace the recommendation for (party, bill).
    async fn upsert_recommendation(&self, recommendation: PartyRecommendation)
        -> StorageResult<()>;

    async fn list_recommendations(
        &self,
        party_id: &PartyId,
    ) -> StorageResult<Vec<PartyRecommendation>>;
}

/// Storage interface for the append-only gazette.
#[async_trait]
pub trait GazetteStore: Send + Sync {
    async fn append_gazette(&self, entry: GazetteAppend) -> StorageResult<GazetteEntry>;

    /// Read entries newest-first.
    async fn list_gazette(&self, window: QueryWindow) -> StorageResult<Vec<GazetteEntry>>;
}

/// Combined storage contract consumed by the workflow engine.
pub trait CivicStorage:
    AgentStore + BillStore + BallotStore + CommentStore + PartyStore + GazetteStore + Send + Sync
{
}

impl<T> CivicStorage for T where
    T: AgentStore + BillStore + BallotStore + CommentStore + PartyStore + GazetteStore + Send + Sync
{
}
