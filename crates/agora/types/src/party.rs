//! Parties, memberships and voting recommendations

use crate::bill::VoteValue;
use crate::ids::{AgentId, BillId, PartyId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A political party. `member_count` is a persisted counter kept in step with
/// the membership relation by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: PartyId,
    pub name: String,
    pub description: Option<String>,
    pub founder_id: AgentId,
    pub member_count: u64,
    pub created_at: DateTime<Utc>,
}

/// (agent, party) pair. An agent holds at most one membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyMembership {
    pub agent_id: AgentId,
    pub party_id: PartyId,
    pub joined_at: DateTime<Utc>,
}

/// A party's stated position on a bill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRecommendation {
    pub party_id: PartyId,
    pub bill_id: BillId,
    pub value: VoteValue,
    pub issued_at: DateTime<Utc>,
}
