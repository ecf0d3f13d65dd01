//! Party membership
//!
//! An agent belongs to at most one party. The store enforces this with a
//! uniqueness constraint; the checks here only produce friendlier messages.

use agora_types::{
    Agent, AgentId, BillId, GazetteEntryType, GazetteReference, Party, PartyId, PartyMembership,
    PartyRecommendation, VoteValue,
};
use serde::Serialize;
use tracing::info;

use crate::context::CivicContext;
use crate::error::{CivicError, CivicResult};

const PARTY_NAME_MAX_LEN: usize = 64;

/// Result of leaving a party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeaveOutcome {
    pub party_id: PartyId,
    /// The departing agent was the founder and last member
    pub party_dissolved: bool,
}

#[derive(Clone)]
pub struct MembershipManager {
    ctx: CivicContext,
}

impl MembershipManager {
    pub fn new(ctx: CivicContext) -> Self {
        Self { ctx }
    }

    /// Found a party with `founder` as its first member.
    pub async fn found_party(
        &self,
        founder: &Agent,
        name: &str,
        description: Option<String>,
    ) -> CivicResult<Party> {
        if !founder.is_verified() {
            return Err(CivicError::forbidden("only verified agents may found a party"));
        }
        let name = name.trim();
        if name.is_empty() || name.chars().count() > PARTY_NAME_MAX_LEN {
            return Err(CivicError::invalid(format!(
                "party name must be 1-{PARTY_NAME_MAX_LEN} characters"
            )));
        }
        self.ensure_unaffiliated(&founder.id).await?;

        let party = Party {
            id: PartyId::generate(),
            name: name.to_string(),
            description: description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            founder_id: founder.id,
            member_count: 1,
            created_at: self.ctx.now(),
        };
        self.ctx.storage().found_party(party.clone()).await?;

        info!(party_id = %party.id, founder_id = %founder.id, name = %party.name, "party founded");
        self.ctx
            .publish(
                GazetteEntryType::PartyFounded,
                format!("New party: {}", party.name),
                format!("{} founded {}.", founder.name, party.name),
                Some(GazetteReference::new(party.id, "party")),
            )
            .await;
        Ok(party)
    }

    /// Join `party_id`. Returns the party with its updated member count.
    pub async fn join(&self, agent: &Agent, party_id: &PartyId) -> CivicResult<Party> {
        if !agent.is_verified() {
            return Err(CivicError::forbidden("only verified agents may join a party"));
        }
        self.ensure_unaffiliated(&agent.id).await?;

        let party = self
            .ctx
            .storage()
            .join_party(PartyMembership {
                agent_id: agent.id,
                party_id: *party_id,
                joined_at: self.ctx.now(),
            })
            .await
            .map_err(|e| match CivicError::from(e) {
                CivicError::Conflict(_) => CivicError::conflict("agent already belongs to a party"),
                CivicError::NotFound(_) => CivicError::not_found(format!("party {party_id} not found")),
                other => other,
            })?;

        info!(party_id = %party_id, agent_id = %agent.id, members = party.member_count, "party joined");
        Ok(party)
    }

    /// Leave the agent's current party.
    ///
    /// A founder may only leave as the last member, which dissolves the party.
    pub async fn leave(&self, agent: &Agent) -> CivicResult<LeaveOutcome> {
        let storage = self.ctx.storage();
        let membership = storage
            .get_membership(&agent.id)
            .await?
            .ok_or_else(|| CivicError::invalid("agent is not a member of any party"))?;
        let party_id = membership.party_id;
        let party = storage
            .get_party(&party_id)
            .await?
            .ok_or_else(|| CivicError::invalid("agent is not a member of any party"))?;

        if party.founder_id == agent.id {
            if party.member_count > 1 {
                return Err(CivicError::invalid(
                    "the founder cannot leave while the party has other members",
                ));
            }
            // Conditional on the count, so a concurrent join keeps the party alive.
            if !storage.dissolve_party(&party_id, &agent.id).await? {
                return Err(CivicError::invalid(
                    "the founder cannot leave while the party has other members",
                ));
            }

            info!(party_id = %party_id, founder_id = %agent.id, "party dissolved");
            self.ctx
                .publish(
                    GazetteEntryType::PartyDissolved,
                    format!("{} has dissolved", party.name),
                    format!("{} was dissolved when its founder left.", party.name),
                    Some(GazetteReference::new(party_id, "party")),
                )
                .await;
            return Ok(LeaveOutcome {
                party_id,
                party_dissolved: true,
            });
        }

        if !storage.remove_member(&agent.id, &party_id).await? {
            return Err(CivicError::invalid("agent is not a member of any party"));
        }
        info!(party_id = %party_id, agent_id = %agent.id, "party left");
        Ok(LeaveOutcome {
            party_id,
            party_dissolved: false,
        })
    }

    /// Record the party line on a bill. Founder only; re-issuing replaces it.
    pub async fn recommend(
        &self,
        agent: &Agent,
        party_id: &PartyId,
        bill_id: &BillId,
        value: VoteValue,
    ) -> CivicResult<PartyRecommendation> {
        let party = self.get_party(party_id).await?;
        if party.founder_id != agent.id {
            return Err(CivicError::forbidden(
                "only the party founder may issue recommendations",
            ));
        }
        let storage = self.ctx.storage();
        if storage.get_bill(bill_id).await?.is_none() {
            return Err(CivicError::not_found(format!("bill {bill_id} not found")));
        }

        let recommendation = PartyRecommendation {
            party_id: *party_id,
            bill_id: *bill_id,
            value,
            issued_at: self.ctx.now(),
        };
        storage.upsert_recommendation(recommendation.clone()).await?;
        info!(party_id = %party_id, bill_id = %bill_id, value = %value.as_str(), "recommendation issued");
        Ok(recommendation)
    }

    pub async fn get_party(&self, party_id: &PartyId) -> CivicResult<Party> {
        self.ctx
            .storage()
            .get_party(party_id)
            .await?
            .ok_or_else(|| CivicError::not_found(format!("party {party_id} not found")))
    }

    pub async fn list_parties(&self) -> CivicResult<Vec<Party>> {
        Ok(self.ctx.storage().list_parties().await?)
    }

    pub async fn members(&self, party_id: &PartyId) -> CivicResult<Vec<PartyMembership>> {
        self.get_party(party_id).await?;
        Ok(self.ctx.storage().list_members(party_id).await?)
    }

    pub async fn membership_of(&self, agent_id: &AgentId) -> CivicResult<Option<PartyMembership>> {
        Ok(self.ctx.storage().get_membership(agent_id).await?)
    }

    async fn ensure_unaffiliated(&self, agent_id: &AgentId) -> CivicResult<()> {
        if self.ctx.storage().get_membership(agent_id).await?.is_some() {
            return Err(CivicError::conflict("agent already belongs to a party"));
        }
        Ok(())
    }
}
