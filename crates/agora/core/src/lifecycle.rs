//! Bill lifecycle manager
//!
//! `house_voting -> senate_voting -> {enacted | vetoed | failed}`, with a
//! `committee_review` detour from the house floor. Every status change goes
//! through the store's conditional transition, so concurrent evaluations of the
//! same bill perform it exactly once.

use agora_storage::QueryWindow;
use agora_types::{
    Agent, Bill, BillId, BillStatus, BillTransitionPatch, BillVote, GazetteEntryType,
    GazetteReference, SenateBallot, VoteTally, VoteValue, VotingWindow, HOUSE_VOTING_HOURS,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::context::CivicContext;
use crate::error::{CivicError, CivicResult};

const TITLE_MAX_LEN: usize = 200;

/// Returned to the proposer of a new bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProposalReceipt {
    pub bill_id: BillId,
    pub house_voting_end: DateTime<Utc>,
}

/// What one evaluation did to a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EvaluationOutcome {
    pub bill_id: BillId,
    pub previous_status: BillStatus,
    pub status: BillStatus,
    /// This call performed the transition
    pub transitioned: bool,
}

impl EvaluationOutcome {
    fn unchanged(bill: &Bill) -> Self {
        Self {
            bill_id: bill.id,
            previous_status: bill.status,
            status: bill.status,
            transitioned: false,
        }
    }
}

/// Per-chamber vote counts for a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BillTally {
    pub bill_id: BillId,
    pub status: BillStatus,
    pub house: VoteTally,
    pub senate: VoteTally,
}

#[derive(Clone)]
pub struct LifecycleManager {
    ctx: CivicContext,
}

impl LifecycleManager {
    pub fn new(ctx: CivicContext) -> Self {
        Self { ctx }
    }

    /// Introduce a bill straight onto the house floor.
    ///
    /// The gazette entry and the proposer's reward are best-effort and never
    /// undo the insert.
    pub async fn propose(
        &self,
        proposer: &Agent,
        title: &str,
        summary: &str,
        full_text: &str,
    ) -> CivicResult<ProposalReceipt> {
        let policy = self.ctx.policy();
        if !proposer.is_verified() {
            return Err(CivicError::forbidden("only verified agents may propose bills"));
        }
        if proposer.activity_score < policy.proposal_min_activity {
            return Err(CivicError::forbidden(format!(
                "proposing requires an activity score of at least {}",
                policy.proposal_min_activity
            )));
        }

        let (title, summary, full_text) = (title.trim(), summary.trim(), full_text.trim());
        if title.is_empty() || summary.is_empty() || full_text.is_empty() {
            return Err(CivicError::invalid(
                "title, summary and full text are required",
            ));
        }
        if title.chars().count() > TITLE_MAX_LEN {
            return Err(CivicError::invalid(format!(
                "title must be at most {TITLE_MAX_LEN} characters"
            )));
        }

        let now = self.ctx.now();
        let house_window = VotingWindow::starting_at(now, HOUSE_VOTING_HOURS);
        let bill = Bill {
            id: BillId::generate(),
            title: title.to_string(),
            summary: summary.to_string(),
            full_text: full_text.to_string(),
            proposer_id: proposer.id,
            status: BillStatus::HouseVoting,
            house_window,
            committee: None,
            senate_window: None,
            created_at: now,
            updated_at: now,
        };
        let bill_id = bill.id;
        self.ctx.storage().insert_bill(bill).await?;

        info!(bill_id = %bill_id, proposer_id = %proposer.id, closes_at = %house_window.end, "bill proposed");
        self.ctx
            .publish(
                GazetteEntryType::BillProposed,
                format!("Bill proposed: {title}"),
                format!(
                    "{} proposed \"{title}\". {summary} House voting closes {}.",
                    proposer.name,
                    house_window.end.to_rfc3339()
                ),
                Some(GazetteReference::new(bill_id, "bill")),
            )
            .await;
        self.ctx
            .reward(&proposer.id, policy.proposal_reward, "proposal")
            .await;

        Ok(ProposalReceipt {
            bill_id,
            house_voting_end: house_window.end,
        })
    }

    /// Advance a bill whose voting window has closed.
    ///
    /// Idempotent. When `expected_status` is given and no longer matches, the
    /// call is treated as stale and changes nothing.
    pub async fn evaluate(
        &self,
        bill_id: &BillId,
        expected_status: Option<BillStatus>,
    ) -> CivicResult<EvaluationOutcome> {
        let bill = self.get_bill(bill_id).await?;
        if expected_status.map_or(false, |expected| expected != bill.status) {
            return Ok(EvaluationOutcome::unchanged(&bill));
        }

        let now = self.ctx.now();
        let policy = self.ctx.policy();
        let (to, patch) = match bill.status {
            BillStatus::HouseVoting if bill.house_window.is_closed(now) => {
                let tally = self.house_tally(bill_id).await?;
                if tally.total() >= policy.house_quorum && tally.passes(policy.pass_fraction) {
                    let senate_window = VotingWindow::starting_at(now, policy.senate_voting_hours);
                    (
                        BillStatus::SenateVoting,
                        BillTransitionPatch {
                            senate_window: Some(senate_window),
                            ..Default::default()
                        },
                    )
                } else {
                    (BillStatus::Failed, BillTransitionPatch::default())
                }
            }
            BillStatus::SenateVoting
                if bill.senate_window.map_or(false, |w| w.is_closed(now)) =>
            {
                let tally = self.senate_tally(bill_id).await?;
                let to = if tally.total() < policy.senate_quorum {
                    BillStatus::Failed
                } else if tally.passes(policy.pass_fraction) {
                    BillStatus::Enacted
                } else {
                    BillStatus::Vetoed
                };
                (to, BillTransitionPatch::default())
            }
            _ => return Ok(EvaluationOutcome::unchanged(&bill)),
        };

        let won = self
            .ctx
            .storage()
            .transition_bill(bill_id, bill.status, to, patch.clone(), now)
            .await?;
        if !won {
            let current = self.get_bill(bill_id).await?;
            return Ok(EvaluationOutcome {
                bill_id: *bill_id,
                previous_status: bill.status,
                status: current.status,
                transitioned: false,
            });
        }

        info!(bill_id = %bill_id, from = %bill.status, to = %to, "bill evaluated");
        self.announce_transition(&bill, to, &patch).await;
        Ok(EvaluationOutcome {
            bill_id: *bill_id,
            previous_status: bill.status,
            status: to,
            transitioned: true,
        })
    }

    /// Evaluate every bill whose open window has closed. Returns the
    /// transitions this call performed.
    pub async fn evaluate_due(&self) -> CivicResult<Vec<EvaluationOutcome>> {
        let due = self.ctx.storage().list_bills_due(self.ctx.now()).await?;
        let mut performed = Vec::new();
        for bill in due {
            match self.evaluate(&bill.id, Some(bill.status)).await {
                Ok(outcome) if outcome.transitioned => performed.push(outcome),
                Ok(_) => {}
                Err(e) => warn!(bill_id = %bill.id, error = %e, "scheduled evaluation failed"),
            }
        }
        Ok(performed)
    }

    /// Cast a floor vote while the house window is open.
    pub async fn cast_vote(
        &self,
        voter: &Agent,
        bill_id: &BillId,
        value: VoteValue,
    ) -> CivicResult<BillVote> {
        if !voter.is_verified() {
            return Err(CivicError::forbidden("only verified agents may vote"));
        }
        let bill = self.get_bill(bill_id).await?;
        let now = self.ctx.now();
        if bill.status != BillStatus::HouseVoting || !bill.house_window.is_open(now) {
            return Err(CivicError::conflict("house voting is not open for this bill"));
        }

        let vote = BillVote {
            bill_id: *bill_id,
            agent_id: voter.id,
            value,
            cast_at: now,
        };
        self.ctx
            .storage()
            .insert_vote(vote.clone())
            .await
            .map_err(|e| match CivicError::from(e) {
                CivicError::Conflict(_) => {
                    CivicError::conflict("agent has already voted on this bill")
                }
                other => other,
            })?;

        info!(bill_id = %bill_id, agent_id = %voter.id, value = %value.as_str(), "vote cast");
        self.ctx
            .reward(&voter.id, self.ctx.policy().vote_reward, "vote")
            .await;
        Ok(vote)
    }

    /// Cast a senate ballot while the senate window is open.
    pub async fn cast_senate_ballot(
        &self,
        senator: &Agent,
        bill_id: &BillId,
        value: VoteValue,
    ) -> CivicResult<SenateBallot> {
        let min_activity = self.ctx.policy().senate_min_activity;
        if !senator.is_verified() || senator.activity_score < min_activity {
            return Err(CivicError::forbidden(format!(
                "senate ballots require a verified agent with activity of at least {min_activity}"
            )));
        }
        let bill = self.get_bill(bill_id).await?;
        let now = self.ctx.now();
        let open = bill.status == BillStatus::SenateVoting
            && bill.senate_window.map_or(false, |w| w.is_open(now));
        if !open {
            return Err(CivicError::conflict("senate voting is not open for this bill"));
        }

        let ballot = SenateBallot {
            bill_id: *bill_id,
            senator_id: senator.id,
            value,
            cast_at: now,
        };
        self.ctx
            .storage()
            .insert_senate_ballot(ballot.clone())
            .await
            .map_err(|e| match CivicError::from(e) {
                CivicError::Conflict(_) => {
                    CivicError::conflict("senator has already voted on this bill")
                }
                other => other,
            })?;

        info!(bill_id = %bill_id, senator_id = %senator.id, value = %value.as_str(), "senate ballot cast");
        Ok(ballot)
    }

    /// Send a bill on the house floor to committee. Proposer only.
    pub async fn refer_to_committee(
        &self,
        agent: &Agent,
        bill_id: &BillId,
        committee: &str,
    ) -> CivicResult<Bill> {
        let committee = committee.trim();
        if committee.is_empty() {
            return Err(CivicError::invalid("committee name is required"));
        }
        let bill = self.get_bill(bill_id).await?;
        if bill.proposer_id != agent.id {
            return Err(CivicError::forbidden(
                "only the proposer may refer a bill to committee",
            ));
        }
        let now = self.ctx.now();
        if bill.status != BillStatus::HouseVoting || !bill.house_window.is_open(now) {
            return Err(CivicError::conflict(
                "only bills open for house voting can be referred",
            ));
        }

        let patch = BillTransitionPatch {
            committee: Some(committee.to_string()),
            ..Default::default()
        };
        let won = self
            .ctx
            .storage()
            .transition_bill(
                bill_id,
                BillStatus::HouseVoting,
                BillStatus::CommitteeReview,
                patch.clone(),
                now,
            )
            .await?;
        if !won {
            return Err(CivicError::conflict("bill changed status concurrently"));
        }

        info!(bill_id = %bill_id, committee = %committee, "bill referred to committee");
        self.announce_transition(&bill, BillStatus::CommitteeReview, &patch)
            .await;
        self.get_bill(bill_id).await
    }

    /// Bring a bill back from committee. A favorable report reopens house
    /// voting with a fresh window; otherwise the bill fails.
    pub async fn discharge_from_committee(
        &self,
        agent: &Agent,
        bill_id: &BillId,
        favorable: bool,
    ) -> CivicResult<Bill> {
        let bill = self.get_bill(bill_id).await?;
        if bill.proposer_id != agent.id {
            return Err(CivicError::forbidden(
                "only the proposer may discharge a bill from committee",
            ));
        }
        if bill.status != BillStatus::CommitteeReview {
            return Err(CivicError::conflict("bill is not in committee review"));
        }

        let now = self.ctx.now();
        let (to, patch) = if favorable {
            (
                BillStatus::HouseVoting,
                BillTransitionPatch {
                    house_window: Some(VotingWindow::starting_at(now, HOUSE_VOTING_HOURS)),
                    ..Default::default()
                },
            )
        } else {
            (BillStatus::Failed, BillTransitionPatch::default())
        };

        let won = self
            .ctx
            .storage()
            .transition_bill(bill_id, BillStatus::CommitteeReview, to, patch.clone(), now)
            .await?;
        if !won {
            return Err(CivicError::conflict("bill changed status concurrently"));
        }

        info!(bill_id = %bill_id, favorable, to = %to, "bill discharged from committee");
        self.announce_transition(&bill, to, &patch).await;
        self.get_bill(bill_id).await
    }

    pub async fn get_bill(&self, bill_id: &BillId) -> CivicResult<Bill> {
        self.ctx
            .storage()
            .get_bill(bill_id)
            .await?
            .ok_or_else(|| CivicError::not_found(format!("bill {bill_id} not found")))
    }

    pub async fn list_bills(
        &self,
        status: Option<BillStatus>,
        window: QueryWindow,
    ) -> CivicResult<Vec<Bill>> {
        Ok(self.ctx.storage().list_bills(status, window).await?)
    }

    pub async fn tally(&self, bill_id: &BillId) -> CivicResult<BillTally> {
        let bill = self.get_bill(bill_id).await?;
        Ok(BillTally {
            bill_id: bill.id,
            status: bill.status,
            house: self.house_tally(bill_id).await?,
            senate: self.senate_tally(bill_id).await?,
        })
    }

    async fn house_tally(&self, bill_id: &BillId) -> CivicResult<VoteTally> {
        let votes = self.ctx.storage().list_votes(bill_id).await?;
        Ok(VoteTally::from_values(votes.into_iter().map(|v| v.value)))
    }

    async fn senate_tally(&self, bill_id: &BillId) -> CivicResult<VoteTally> {
        let ballots = self.ctx.storage().list_senate_ballots(bill_id).await?;
        Ok(VoteTally::from_values(ballots.into_iter().map(|b| b.value)))
    }

    async fn announce_transition(&self, bill: &Bill, to: BillStatus, patch: &BillTransitionPatch) {
        let title = &bill.title;
        let (entry_type, headline, content) = match to {
            BillStatus::SenateVoting => (
                GazetteEntryType::BillAdvanced,
                format!("Bill advances to the Senate: {title}"),
                match patch.senate_window {
                    Some(window) => format!(
                        "\"{title}\" passed the house. Senate voting closes {}.",
                        window.end.to_rfc3339()
                    ),
                    None => format!("\"{title}\" passed the house."),
                },
            ),
            BillStatus::HouseVoting => (
                GazetteEntryType::BillAdvanced,
                format!("Bill returns to the floor: {title}"),
                match patch.house_window {
                    Some(window) => format!(
                        "\"{title}\" was reported favorably from committee. House voting closes {}.",
                        window.end.to_rfc3339()
                    ),
                    None => format!("\"{title}\" was reported favorably from committee."),
                },
            ),
            BillStatus::CommitteeReview => (
                GazetteEntryType::BillReferred,
                format!("Bill referred to committee: {title}"),
                format!(
                    "\"{title}\" was referred to the {} committee.",
                    patch.committee.as_deref().unwrap_or("designated")
                ),
            ),
            BillStatus::Enacted => (
                GazetteEntryType::BillEnacted,
                format!("Bill enacted: {title}"),
                format!("\"{title}\" passed the Senate and is now law."),
            ),
            BillStatus::Vetoed => (
                GazetteEntryType::BillVetoed,
                format!("Bill vetoed: {title}"),
                format!("\"{title}\" was rejected by the Senate."),
            ),
            BillStatus::Failed => (
                GazetteEntryType::BillFailed,
                format!("Bill failed: {title}"),
                format!("\"{title}\" did not secure enough support."),
            ),
        };

        self.ctx
            .publish(
                entry_type,
                headline,
                content,
                Some(GazetteReference::new(bill.id, "bill")),
            )
            .await;
    }
}
