//! Bills, voting windows and ballots

use crate::ids::{AgentId, BillId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a bill.
///
/// `house_voting -> senate_voting -> {enacted | vetoed | failed}`, with a
/// `committee_review` detour reachable from `house_voting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    HouseVoting,
    CommitteeReview,
    SenateVoting,
    Enacted,
    Vetoed,
    Failed,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HouseVoting => "house_voting",
            Self::CommitteeReview => "committee_review",
            Self::SenateVoting => "senate_voting",
            Self::Enacted => "enacted",
            Self::Vetoed => "vetoed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "house_voting" => Some(Self::HouseVoting),
            "committee_review" => Some(Self::CommitteeReview),
            "senate_voting" => Some(Self::SenateVoting),
            "enacted" => Some(Self::Enacted),
            "vetoed" => Some(Self::Vetoed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Enacted | Self::Vetoed | Self::Failed)
    }

    /// Whether the lifecycle permits moving from `self` to `next`
    pub fn can_transition_to(&self, next: BillStatus) -> bool {
        use BillStatus::*;
        matches!(
            (self, next),
            (HouseVoting, SenateVoting)
                | (HouseVoting, CommitteeReview)
                | (HouseVoting, Failed)
                | (CommitteeReview, HouseVoting)
                | (CommitteeReview, Failed)
                | (SenateVoting, Enacted)
                | (SenateVoting, Vetoed)
                | (SenateVoting, Failed)
        )
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open voting window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl VotingWindow {
    /// Window of `hours` starting at `start`. An end past the calendar's
    /// range saturates at its last instant.
    pub fn starting_at(start: DateTime<Utc>, hours: i64) -> Self {
        let end = chrono::Duration::try_hours(hours)
            .and_then(|span| start.checked_add_signed(span))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { start, end }
    }

    pub fn is_open(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }

    pub fn is_closed(&self, at: DateTime<Utc>) -> bool {
        at >= self.end
    }
}

/// A proposed piece of legislation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    pub id: BillId,
    pub title: String,
    pub summary: String,
    pub full_text: String,
    pub proposer_id: AgentId,
    pub status: BillStatus,
    pub house_window: VotingWindow,
    pub committee: Option<String>,
    pub senate_window: Option<VotingWindow>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    /// The window governing the bill's current phase, if it has one
    pub fn active_window(&self) -> Option<VotingWindow> {
        match self.status {
            BillStatus::HouseVoting => Some(self.house_window),
            BillStatus::SenateVoting => self.senate_window,
            _ => None,
        }
    }
}

/// Field updates applied together with a status transition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillTransitionPatch {
    pub house_window: Option<VotingWindow>,
    pub senate_window: Option<VotingWindow>,
    pub committee: Option<String>,
}

/// Value of a ballot or recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteValue {
    Yea,
    Nay,
    Abstain,
}

impl VoteValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yea => "yea",
            Self::Nay => "nay",
            Self::Abstain => "abstain",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "yea" => Some(Self::Yea),
            "nay" => Some(Self::Nay),
            "abstain" => Some(Self::Abstain),
            _ => None,
        }
    }
}

impl fmt::Display for VoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Floor vote cast during house voting. At most one per (bill, agent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillVote {
    pub bill_id: BillId,
    pub agent_id: AgentId,
    pub value: VoteValue,
    pub cast_at: DateTime<Utc>,
}

/// Ballot cast during senate voting. At most one per (bill, senator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenateBallot {
    pub bill_id: BillId,
    pub senator_id: AgentId,
    pub value: VoteValue,
    pub cast_at: DateTime<Utc>,
}

/// Counts of ballots in one chamber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub yea: u64,
    pub nay: u64,
    pub abstain: u64,
}

impl VoteTally {
    pub fn from_values<I: IntoIterator<Item = VoteValue>>(values: I) -> Self {
        let mut tally = Self::default();
        for value in values {
            tally.record(value);
        }
        tally
    }

    pub fn record(&mut self, value: VoteValue) {
        match value {
            VoteValue::Yea => self.yea += 1,
            VoteValue::Nay => self.nay += 1,
            VoteValue::Abstain => self.abstain += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.yea + self.nay + self.abstain
    }

    /// Whether yea strictly exceeds `fraction` of decisive (yea + nay) ballots
    pub fn passes(&self, fraction: f64) -> bool {
        let decisive = self.yea + self.nay;
        decisive > 0 && (self.yea as f64) > fraction * decisive as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_is_half_open() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let window = VotingWindow::starting_at(start, 48);
        assert_eq!((window.end - window.start).num_seconds(), 48 * 3600);
        assert!(window.is_open(start));
        assert!(!window.is_open(window.end));
        assert!(window.is_closed(window.end));
    }

    #[test]
    fn test_oversized_window_saturates() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        for hours in [i64::MAX, 3_000_000_000] {
            let window = VotingWindow::starting_at(start, hours);
            assert_eq!(window.end, DateTime::<Utc>::MAX_UTC);
            assert!(window.is_open(start));
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for status in [BillStatus::Enacted, BillStatus::Vetoed, BillStatus::Failed] {
            assert!(status.is_terminal());
            for next in [
                BillStatus::HouseVoting,
                BillStatus::CommitteeReview,
                BillStatus::SenateVoting,
                BillStatus::Enacted,
                BillStatus::Vetoed,
                BillStatus::Failed,
            ] {
                assert!(!status.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_committee_only_from_house() {
        assert!(BillStatus::HouseVoting.can_transition_to(BillStatus::CommitteeReview));
        assert!(!BillStatus::SenateVoting.can_transition_to(BillStatus::CommitteeReview));
    }

    #[test]
    fn test_status_serde_matches_as_str() {
        let json = serde_json::to_string(&BillStatus::CommitteeReview).unwrap();
        assert_eq!(json, "\"committee_review\"");
        assert_eq!(BillStatus::parse("senate_voting"), Some(BillStatus::SenateVoting));
    }

    #[test]
    fn test_tally_majority() {
        let tally = VoteTally::from_values([VoteValue::Yea, VoteValue::Yea, VoteValue::Nay]);
        assert!(tally.passes(0.5));
        let tied = VoteTally::from_values([VoteValue::Yea, VoteValue::Nay, VoteValue::Abstain]);
        assert!(!tied.passes(0.5));
        assert_eq!(tied.total(), 3);
        assert!(!VoteTally::default().passes(0.5));
    }
}
