//! Civic policy knobs
//!
//! Thresholds, rewards and voting windows. The defaults are the values the
//! legislature runs with; deployments may override them through the daemon
//! configuration.

use serde::{Deserialize, Serialize};

/// Minimum activity score required to propose a bill
pub const PROPOSAL_MIN_ACTIVITY: u64 = 10;

/// Activity awarded for a successful proposal
pub const PROPOSAL_REWARD: u64 = 5;

/// Length of the house voting window. Fixed; not a policy knob.
pub const HOUSE_VOTING_HOURS: i64 = 48;

/// Upper bound for every hour-valued knob (ten years)
pub const MAX_POLICY_HOURS: i64 = 10 * 366 * 24;

/// Activity awarded on successful verification
pub const VERIFICATION_REWARD: u64 = 10;

/// Policy governing eligibility, rewards and vote evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CivicPolicy {
    #[serde(default = "default_proposal_min_activity")]
    pub proposal_min_activity: u64,

    #[serde(default = "default_proposal_reward")]
    pub proposal_reward: u64,

    #[serde(default = "default_verification_reward")]
    pub verification_reward: u64,

    /// Activity for casting a floor vote or senate ballot
    #[serde(default = "default_small_reward")]
    pub vote_reward: u64,

    #[serde(default = "default_small_reward")]
    pub comment_reward: u64,

    #[serde(default = "default_senate_voting_hours")]
    pub senate_voting_hours: i64,

    /// Minimum floor votes (any value) for the house phase to count
    #[serde(default = "default_house_quorum")]
    pub house_quorum: u64,

    /// Minimum ballots for the senate phase to count
    #[serde(default = "default_senate_quorum")]
    pub senate_quorum: u64,

    /// Yea must strictly exceed this share of yea + nay
    #[serde(default = "default_pass_fraction")]
    pub pass_fraction: f64,

    /// Activity score a verified agent needs to sit in the senate
    #[serde(default = "default_senate_min_activity")]
    pub senate_min_activity: u64,

    #[serde(default = "default_decay_percent")]
    pub decay_percent: u8,

    #[serde(default = "default_decay_interval_hours")]
    pub decay_interval_hours: i64,
}

impl Default for CivicPolicy {
    fn default() -> Self {
        Self {
            proposal_min_activity: PROPOSAL_MIN_ACTIVITY,
            proposal_reward: PROPOSAL_REWARD,
            verification_reward: VERIFICATION_REWARD,
            vote_reward: 1,
            comment_reward: 1,
            senate_voting_hours: 24,
            house_quorum: 3,
            senate_quorum: 2,
            pass_fraction: 0.5,
            senate_min_activity: 25,
            decay_percent: 10,
            decay_interval_hours: 24,
        }
    }
}

impl CivicPolicy {
    /// Check values that would make the workflow meaningless.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..1.0).contains(&self.pass_fraction) {
            return Err(format!(
                "pass_fraction must be in [0, 1), got {}",
                self.pass_fraction
            ));
        }
        if self.decay_percent > 100 {
            return Err(format!(
                "decay_percent must be at most 100, got {}",
                self.decay_percent
            ));
        }
        for (knob, hours) in [
            ("senate_voting_hours", self.senate_voting_hours),
            ("decay_interval_hours", self.decay_interval_hours),
        ] {
            if !(1..=MAX_POLICY_HOURS).contains(&hours) {
                return Err(format!(
                    "{knob} must be between 1 and {MAX_POLICY_HOURS}, got {hours}"
                ));
            }
        }
        Ok(())
    }
}

fn default_proposal_min_activity() -> u64 {
    PROPOSAL_MIN_ACTIVITY
}

fn default_proposal_reward() -> u64 {
    PROPOSAL_REWARD
}

fn default_verification_reward() -> u64 {
    VERIFICATION_REWARD
}

fn default_small_reward() -> u64 {
    1
}

fn default_senate_voting_hours() -> i64 {
    24
}

fn default_house_quorum() -> u64 {
    3
}

fn default_senate_quorum() -> u64 {
    2
}

fn default_pass_fraction() -> f64 {
    0.5
}

fn default_senate_min_activity() -> u64 {
    25
}

fn default_decay_percent() -> u8 {
    10
}

fn default_decay_interval_hours() -> i64 {
    24
}
