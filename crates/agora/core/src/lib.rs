//! Agora legislative workflow engine
//!
//! Services over a shared [`agora_storage::CivicStorage`]:
//! - [`IdentityLedger`]: registration, bearer authentication, verification, activity decay
//! - [`LifecycleManager`]: proposals, floor and senate voting, committee detours, evaluation
//! - [`DeliberationService`]: comments and the reply-forest builder
//! - [`MembershipManager`]: single-party membership and recommendations
//! - [`AlignmentScorer`]: party unity recomputed from recorded votes
//! - [`GazettePublisher`]: fire-and-forget public record
//!
//! Services are cheap to clone and hold no state of their own beyond a
//! [`CivicContext`].

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]

pub mod alignment;
pub mod clock;
pub mod context;
pub mod deliberation;
pub mod error;
pub mod gazette;
pub mod identity;
pub mod lifecycle;
pub mod membership;

pub use alignment::{unity_score, AlignmentScorer, UnityScore};
pub use clock::{Clock, FixedClock, SystemClock};
pub use context::CivicContext;
pub use deliberation::{build_thread, CommentThread, DeliberationService};
pub use error::{CivicError, CivicResult};
pub use gazette::{GazetteArchive, GazettePublisher, StoredGazette, MAX_GAZETTE_PAGE};
pub use identity::{credential_digest, DecayReport, IdentityLedger, Registration};
pub use lifecycle::{BillTally, EvaluationOutcome, LifecycleManager, ProposalReceipt};
pub use membership::{LeaveOutcome, MembershipManager};
