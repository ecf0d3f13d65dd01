//! Party alignment scoring
//!
//! Unity is recomputed from recommendations and recorded floor votes on every
//! request; nothing is cached.

use agora_types::{AgentId, BillId, BillVote, PartyId, PartyRecommendation};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::context::CivicContext;
use crate::error::CivicResult;

/// How closely a party's members voted with its recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct UnityScore {
    /// Rounded percentage in `0..=100`
    pub score: u8,
    pub aligned: u64,
    pub total: u64,
}

/// Score member votes against recommendations.
///
/// Only votes by `members` on recommended bills count. A vote is aligned when
/// its value equals the recommendation.
pub fn unity_score(
    recommendations: &[PartyRecommendation],
    members: &HashSet<AgentId>,
    votes_by_bill: &HashMap<BillId, Vec<BillVote>>,
) -> UnityScore {
    let mut aligned = 0u64;
    let mut total = 0u64;
    for recommendation in recommendations {
        let Some(votes) = votes_by_bill.get(&recommendation.bill_id) else {
            continue;
        };
        for vote in votes.iter().filter(|v| members.contains(&v.agent_id)) {
            total += 1;
            if vote.value == recommendation.value {
                aligned += 1;
            }
        }
    }

    let score = if total == 0 {
        0
    } else {
        // Round half up in integer arithmetic.
        ((aligned * 200 + total) / (total * 2)).min(100) as u8
    };
    UnityScore {
        score,
        aligned,
        total,
    }
}

/// Loads a party's records and scores them.
#[derive(Clone)]
pub struct AlignmentScorer {
    ctx: CivicContext,
}

impl AlignmentScorer {
    pub fn new(ctx: CivicContext) -> Self {
        Self { ctx }
    }

    /// Unity for `party_id`. An unknown party scores zero.
    pub async fn score(&self, party_id: &PartyId) -> CivicResult<UnityScore> {
        let storage = self.ctx.storage();
        let recommendations = storage.list_recommendations(party_id).await?;
        if recommendations.is_empty() {
            return Ok(UnityScore::default());
        }

        let members: HashSet<AgentId> = storage
            .list_members(party_id)
            .await?
            .into_iter()
            .map(|m| m.agent_id)
            .collect();

        let mut votes_by_bill = HashMap::with_capacity(recommendations.len());
        for recommendation in &recommendations {
            let votes = storage.list_votes(&recommendation.bill_id).await?;
            votes_by_bill.insert(recommendation.bill_id, votes);
        }

        Ok(unity_score(&recommendations, &members, &votes_by_bill))
    }
}
