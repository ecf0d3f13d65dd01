//! Agora core types
//!
//! Records shared by the storage adapters, the workflow engine and the REST
//! daemon: agents, bills, ballots, comments, parties and gazette entries.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]

pub mod agent;
pub mod bill;
pub mod comment;
pub mod gazette;
pub mod ids;
pub mod party;
pub mod policy;

pub use agent::{Agent, AgentProfile, VerificationStatus};
pub use bill::{
    Bill, BillStatus, BillTransitionPatch, BillVote, SenateBallot, VoteTally, VoteValue,
    VotingWindow,
};
pub use comment::{Comment, CommentNode, MAX_REPLY_DEPTH};
pub use gazette::{GazetteAppend, GazetteEntry, GazetteEntryType, GazetteReference};
pub use ids::{AgentId, BillId, CommentId, GazetteEntryId, ParseIdError, PartyId};
pub use party::{Party, PartyMembership, PartyRecommendation};
pub use policy::{CivicPolicy, HOUSE_VOTING_HOURS, MAX_POLICY_HOURS};
