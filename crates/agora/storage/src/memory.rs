//! In-memory reference implementation for Agora storage traits.
//!
//! This adapter is deterministic and test-friendly. Every mutation runs inside
//! a single write-lock critical section, which gives it the same atomicity the
//! PostgreSQL adapter gets from conditional updates and constraints.
//! Production deployments should use the PostgreSQL adapter.

use crate::traits::{
    AgentStore, BallotStore, BillStore, CommentStore, GazetteStore, PartyStore, QueryWindow,
};
use crate::error::{decay_keep_percent, ensure_transition};
use crate::{StorageError, StorageResult};
use agora_types::{
    Agent, AgentId, Bill, BillId, BillStatus, BillTransitionPatch, BillVote, Comment, CommentId,
    GazetteAppend, GazetteEntry, GazetteEntryId, Party, PartyId, PartyMembership,
    PartyRecommendation, SenateBallot, VerificationStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct PartyTables {
    parties: HashMap<PartyId, Party>,
    // Keyed by agent: the map itself enforces single membership.
    memberships: HashMap<AgentId, PartyMembership>,
    recommendations: HashMap<(PartyId, BillId), PartyRecommendation>,
}

/// In-memory Agora storage adapter.
#[derive(Default)]
pub struct InMemoryCivicStorage {
    agents: RwLock<HashMap<AgentId, Agent>>,
    bills: RwLock<HashMap<BillId, Bill>>,
    votes: RwLock<Vec<BillVote>>,
    senate_ballots: RwLock<Vec<SenateBallot>>,
    comments: RwLock<Vec<Comment>>,
    parties: RwLock<PartyTables>,
    gazette: RwLock<Vec<GazetteEntry>>,
}

impl InMemoryCivicStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn read<'a, T>(lock: &'a RwLock<T>, name: &str) -> StorageResult<RwLockReadGuard<'a, T>> {
    lock.read()
        .map_err(|_| StorageError::Backend(format!("{name} lock poisoned")))
}

fn write<'a, T>(lock: &'a RwLock<T>, name: &str) -> StorageResult<RwLockWriteGuard<'a, T>> {
    lock.write()
        .map_err(|_| StorageError::Backend(format!("{name} lock poisoned")))
}

fn page<T: Clone>(items: impl Iterator<Item = T>, window: QueryWindow) -> Vec<T> {
    items.skip(window.offset).take(window.limit).collect()
}

#[async_trait]
impl AgentStore for InMemoryCivicStorage {
    async fn insert_agent(&self, agent: Agent) -> StorageResult<()> {
        let mut guard = write(&self.agents, "agents")?;
        if guard
            .values()
            .any(|existing| existing.name.eq_ignore_ascii_case(&agent.name))
        {
            return Err(StorageError::Conflict(format!(
                "agent name '{}' is taken",
                agent.name
            )));
        }
        if guard.contains_key(&agent.id) {
            return Err(StorageError::Conflict(format!(
                "agent {} already exists",
                agent.id
            )));
        }
        if agent.claim_code.is_some()
            && guard
                .values()
                .any(|existing| existing.claim_code == agent.claim_code)
        {
            return Err(StorageError::DuplicateClaimCode);
        }
        guard.insert(agent.id, agent);
        Ok(())
    }

    async fn get_agent(&self, id: &AgentId) -> StorageResult<Option<Agent>> {
        let guard = read(&self.agents, "agents")?;
        Ok(guard.get(id).cloned())
    }

    async fn find_agent_by_credential(&self, digest: &str) -> StorageResult<Option<Agent>> {
        let guard = read(&self.agents, "agents")?;
        Ok(guard
            .values()
            .find(|agent| agent.credential_digest == digest)
            .cloned())
    }

    async fn find_agent_by_claim_code(&self, claim_code: &str) -> StorageResult<Option<Agent>> {
        let guard = read(&self.agents, "agents")?;
        Ok(guard
            .values()
            .find(|agent| agent.claim_code.as_deref() == Some(claim_code))
            .cloned())
    }

    async fn complete_verification(
        &self,
        id: &AgentId,
        claim_code: &str,
        social_handle: &str,
        reward: u64,
        verified_at: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let mut guard = write(&self.agents, "agents")?;
        let agent = guard
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("agent {} not found", id)))?;

        if agent.status != VerificationStatus::Pending
            || agent.claim_code.as_deref() != Some(claim_code)
        {
            return Ok(false);
        }

        agent.status = VerificationStatus::Verified;
        agent.social_handle = Some(social_handle.to_string());
        agent.verified_at = Some(verified_at);
        agent.activity_score = agent.activity_score.saturating_add(reward);
        Ok(true)
    }

    async fn adjust_activity(&self, id: &AgentId, delta: i64) -> StorageResult<u64> {
        let mut guard = write(&self.agents, "agents")?;
        let agent = guard
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("agent {} not found", id)))?;

        agent.activity_score = if delta >= 0 {
            agent.activity_score.saturating_add(delta as u64)
        } else {
            agent.activity_score.saturating_sub(delta.unsigned_abs())
        };
        Ok(agent.activity_score)
    }

    async fn decay_activity(
        &self,
        percent: u8,
        stale_before: DateTime<Utc>,
        decayed_at: DateTime<Utc>,
    ) -> StorageResult<u64> {
        let keep = decay_keep_percent(percent)?;
        let mut guard = write(&self.agents, "agents")?;
        let mut touched = 0;
        for agent in guard.values_mut() {
            let last = agent.activity_decayed_at.unwrap_or(agent.created_at);
            if last <= stale_before {
                agent.activity_score = agent.activity_score * keep / 100;
                agent.activity_decayed_at = Some(decayed_at);
                touched += 1;
            }
        }
        Ok(touched)
    }
}

#[async_trait]
impl BillStore for InMemoryCivicStorage {
    async fn insert_bill(&self, bill: Bill) -> StorageResult<()> {
        let mut guard = write(&self.bills, "bills")?;
        if guard.contains_key(&bill.id) {
            return Err(StorageError::Conflict(format!(
                "bill {} already exists",
                bill.id
            )));
        }
        guard.insert(bill.id, bill);
        Ok(())
    }

    async fn get_bill(&self, id: &BillId) -> StorageResult<Option<Bill>> {
        let guard = read(&self.bills, "bills")?;
        Ok(guard.get(id).cloned())
    }

    async fn list_bills(
        &self,
        status: Option<BillStatus>,
        window: QueryWindow,
    ) -> StorageResult<Vec<Bill>> {
        let guard = read(&self.bills, "bills")?;
        let mut bills: Vec<Bill> = guard
            .values()
            .filter(|bill| status.map_or(true, |s| bill.status == s))
            .cloned()
            .collect();
        bills.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(page(bills.into_iter(), window))
    }

    async fn list_bills_due(&self, at: DateTime<Utc>) -> StorageResult<Vec<Bill>> {
        let guard = read(&self.bills, "bills")?;
        let mut due: Vec<Bill> = guard
            .values()
            .filter(|bill| {
                bill.active_window()
                    .map_or(false, |window| window.is_closed(at))
            })
            .cloned()
            .collect();
        due.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(due)
    }

    async fn transition_bill(
        &self,
        id: &BillId,
        expected_from: BillStatus,
        to: BillStatus,
        patch: BillTransitionPatch,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<bool> {
        ensure_transition(expected_from, to)?;
        let mut guard = write(&self.bills, "bills")?;
        let bill = guard
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("bill {} not found", id)))?;

        if bill.status != expected_from {
            return Ok(false);
        }

        bill.status = to;
        if let Some(window) = patch.house_window {
            bill.house_window = window;
        }
        if let Some(window) = patch.senate_window {
            bill.senate_window = Some(window);
        }
        if let Some(committee) = patch.committee {
            bill.committee = Some(committee);
        }
        bill.updated_at = updated_at;
        Ok(true)
    }
}

#[async_trait]
impl BallotStore for InMemoryCivicStorage {
    async fn insert_vote(&self, vote: BillVote) -> StorageResult<()> {
        let mut guard = write(&self.votes, "votes")?;
        if guard
            .iter()
            .any(|v| v.bill_id == vote.bill_id && v.agent_id == vote.agent_id)
        {
            return Err(StorageError::Conflict(format!(
                "agent {} already voted on bill {}",
                vote.agent_id, vote.bill_id
            )));
        }
        guard.push(vote);
        Ok(())
    }

    async fn list_votes(&self, bill_id: &BillId) -> StorageResult<Vec<BillVote>> {
        let guard = read(&self.votes, "votes")?;
        Ok(guard
            .iter()
            .filter(|v| &v.bill_id == bill_id)
            .cloned()
            .collect())
    }

    async fn insert_senate_ballot(&self, ballot: SenateBallot) -> StorageResult<()> {
        let mut guard = write(&self.senate_ballots, "senate ballots")?;
        if guard
            .iter()
            .any(|b| b.bill_id == ballot.bill_id && b.senator_id == ballot.senator_id)
        {
            return Err(StorageError::Conflict(format!(
                "senator {} already voted on bill {}",
                ballot.senator_id, ballot.bill_id
            )));
        }
        guard.push(ballot);
        Ok(())
    }

    async fn list_senate_ballots(&self, bill_id: &BillId) -> StorageResult<Vec<SenateBallot>> {
        let guard = read(&self.senate_ballots, "senate ballots")?;
        Ok(guard
            .iter()
            .filter(|b| &b.bill_id == bill_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CommentStore for InMemoryCivicStorage {
    async fn insert_comment(&self, comment: Comment) -> StorageResult<()> {
        let mut guard = write(&self.comments, "comments")?;
        if guard.iter().any(|c| c.id == comment.id) {
            return Err(StorageError::Conflict(format!(
                "comment {} already exists",
                comment.id
            )));
        }
        guard.push(comment);
        Ok(())
    }

    async fn get_comment(&self, id: &CommentId) -> StorageResult<Option<Comment>> {
        let guard = read(&self.comments, "comments")?;
        Ok(guard.iter().find(|c| &c.id == id).cloned())
    }

    async fn list_comments(&self, bill_id: &BillId) -> StorageResult<Vec<Comment>> {
        let guard = read(&self.comments, "comments")?;
        let mut comments: Vec<Comment> = guard
            .iter()
            .filter(|c| &c.bill_id == bill_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }
}

#[async_trait]
impl PartyStore for InMemoryCivicStorage {
    async fn found_party(&self, party: Party) -> StorageResult<()> {
        let mut guard = write(&self.parties, "parties")?;
        if guard.memberships.contains_key(&party.founder_id) {
            return Err(StorageError::Conflict(format!(
                "agent {} already belongs to a party",
                party.founder_id
            )));
        }
        if guard
            .parties
            .values()
            .any(|p| p.name.eq_ignore_ascii_case(&party.name))
        {
            return Err(StorageError::Conflict(format!(
                "party name '{}' is taken",
                party.name
            )));
        }

        guard.memberships.insert(
            party.founder_id,
            PartyMembership {
                agent_id: party.founder_id,
                party_id: party.id,
                joined_at: party.created_at,
            },
        );
        guard.parties.insert(
            party.id,
            Party {
                member_count: 1,
                ..party
            },
        );
        Ok(())
    }

    async fn get_party(&self, id: &PartyId) -> StorageResult<Option<Party>> {
        let guard = read(&self.parties, "parties")?;
        Ok(guard.parties.get(id).cloned())
    }

    async fn list_parties(&self) -> StorageResult<Vec<Party>> {
        let guard = read(&self.parties, "parties")?;
        let mut parties: Vec<Party> = guard.parties.values().cloned().collect();
        parties.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(parties)
    }

    async fn get_membership(&self, agent_id: &AgentId) -> StorageResult<Option<PartyMembership>> {
        let guard = read(&self.parties, "parties")?;
        Ok(guard.memberships.get(agent_id).cloned())
    }

    async fn list_members(&self, party_id: &PartyId) -> StorageResult<Vec<PartyMembership>> {
        let guard = read(&self.parties, "parties")?;
        let mut members: Vec<PartyMembership> = guard
            .memberships
            .values()
            .filter(|m| &m.party_id == party_id)
            .cloned()
            .collect();
        members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.agent_id.cmp(&b.agent_id)));
        Ok(members)
    }

    async fn join_party(&self, membership: PartyMembership) -> StorageResult<Party> {
        let mut guard = write(&self.parties, "parties")?;
        if guard.memberships.contains_key(&membership.agent_id) {
            return Err(StorageError::Conflict(format!(
                "agent {} already belongs to a party",
                membership.agent_id
            )));
        }

        let party = guard.parties.get_mut(&membership.party_id).ok_or_else(|| {
            StorageError::NotFound(format!("party {} not found", membership.party_id))
        })?;
        party.member_count += 1;
        let updated = party.clone();

        guard.memberships.insert(membership.agent_id, membership);
        Ok(updated)
    }

    async fn remove_member(&self, agent_id: &AgentId, party_id: &PartyId) -> StorageResult<bool> {
        let mut guard = write(&self.parties, "parties")?;
        match guard.memberships.get(agent_id) {
            Some(m) if &m.party_id == party_id => {}
            _ => return Ok(false),
        }

        guard.memberships.remove(agent_id);
        if let Some(party) = guard.parties.get_mut(party_id) {
            party.member_count = party.member_count.saturating_sub(1);
        }
        Ok(true)
    }

    async fn dissolve_party(
        &self,
        party_id: &PartyId,
        founder_id: &AgentId,
    ) -> StorageResult<bool> {
        let mut guard = write(&self.parties, "parties")?;
        let dissolvable = guard
            .parties
            .get(party_id)
            .map_or(false, |p| &p.founder_id == founder_id && p.member_count <= 1);
        if !dissolvable {
            return Ok(false);
        }

        guard.parties.remove(party_id);
        guard.memberships.retain(|_, m| &m.party_id != party_id);
        guard
            .recommendations
            .retain(|(party, _), _| party != party_id);
        Ok(true)
    }

    async fn upsert_recommendation(
        &self,
        recommendation: PartyRecommendation,
    ) -> StorageResult<()> {
        let mut guard = write(&self.parties, "parties")?;
        if !guard.parties.contains_key(&recommendation.party_id) {
            return Err(StorageError::NotFound(format!(
                "party {} not found",
                recommendation.party_id
            )));
        }
        guard.recommendations.insert(
            (recommendation.party_id, recommendation.bill_id),
            recommendation,
        );
        Ok(())
    }

    async fn list_recommendations(
        &self,
        party_id: &PartyId,
    ) -> StorageResult<Vec<PartyRecommendation>> {
        let guard = read(&self.parties, "parties")?;
        let mut recommendations: Vec<PartyRecommendation> = guard
            .recommendations
            .values()
            .filter(|r| &r.party_id == party_id)
            .cloned()
            .collect();
        recommendations.sort_by(|a, b| a.issued_at.cmp(&b.issued_at).then(a.bill_id.cmp(&b.bill_id)));
        Ok(recommendations)
    }
}

#[async_trait]
impl GazetteStore for InMemoryCivicStorage {
    async fn append_gazette(&self, entry: GazetteAppend) -> StorageResult<GazetteEntry> {
        let record = GazetteEntry {
            id: GazetteEntryId::generate(),
            entry_type: entry.entry_type,
            title: entry.title,
            content: entry.content,
            reference: entry.reference,
            published_at: entry.published_at,
        };
        let mut guard = write(&self.gazette, "gazette")?;
        guard.push(record.clone());
        Ok(record)
    }

    async fn list_gazette(&self, window: QueryWindow) -> StorageResult<Vec<GazetteEntry>> {
        let guard = read(&self.gazette, "gazette")?;
        Ok(page(guard.iter().rev().cloned(), window))
    }
}
