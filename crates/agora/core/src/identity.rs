//! Identity & activity ledger
//!
//! Registration hands out a one-time bearer credential and a claim code. Only
//! the blake3 digest of the credential is stored. The claim code is redeemed
//! once, together with a social-media proof URL, to verify the agent.

use agora_types::{
    Agent, AgentId, AgentProfile, GazetteEntryType, GazetteReference, VerificationStatus,
};
use agora_storage::StorageError;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use crate::context::CivicContext;
use crate::error::{CivicError, CivicResult};

/// Prefix carried by every issued credential
pub const CREDENTIAL_PREFIX: &str = "agora_";

const NAME_MIN_LEN: usize = 3;
const NAME_MAX_LEN: usize = 32;
const DESCRIPTION_MAX_LEN: usize = 500;

const CLAIM_SUFFIX_LEN: usize = 6;
const CLAIM_CODE_ATTEMPTS: u32 = 5;

const CLAIM_WORDS: &[&str] = &[
    "anchor", "beacon", "coral", "current", "drift", "harbor", "kelp", "lagoon", "reef", "shoal",
    "tide", "wharf",
];
// No 0/O or 1/I, so codes survive being read aloud.
const CLAIM_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Returned once at registration; the credential is never shown again.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub agent_id: AgentId,
    pub name: String,
    pub credential: String,
    pub claim_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecayReport {
    pub agents_decayed: u64,
}

/// Agent registration, authentication, verification and activity upkeep.
#[derive(Clone)]
pub struct IdentityLedger {
    ctx: CivicContext,
}

impl IdentityLedger {
    pub fn new(ctx: CivicContext) -> Self {
        Self { ctx }
    }

    /// Register a new, unverified agent.
    pub async fn register(
        &self,
        name: &str,
        description: Option<String>,
    ) -> CivicResult<Registration> {
        let name = validate_agent_name(name)?;
        let description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if description
            .as_ref()
            .map_or(false, |d| d.chars().count() > DESCRIPTION_MAX_LEN)
        {
            return Err(CivicError::invalid(format!(
                "description must be at most {DESCRIPTION_MAX_LEN} characters"
            )));
        }

        let credential = issue_credential();
        let mut agent = Agent {
            id: AgentId::generate(),
            name: name.clone(),
            description,
            status: VerificationStatus::Pending,
            activity_score: 0,
            credential_digest: credential_digest(&credential),
            claim_code: None,
            social_handle: None,
            created_at: self.ctx.now(),
            verified_at: None,
            activity_decayed_at: None,
        };
        let agent_id = agent.id;

        let mut attempt = 1;
        let claim_code = loop {
            let claim_code = issue_claim_code();
            agent.claim_code = Some(claim_code.clone());
            match self.ctx.storage().insert_agent(agent.clone()).await {
                Ok(()) => break claim_code,
                Err(StorageError::DuplicateClaimCode) if attempt < CLAIM_CODE_ATTEMPTS => {
                    warn!(attempt, "claim code collision, reissuing");
                    attempt += 1;
                }
                Err(StorageError::Conflict(_)) => {
                    return Err(CivicError::conflict(format!(
                        "agent name '{name}' is already taken"
                    )))
                }
                Err(e) => return Err(e.into()),
            }
        };

        info!(agent_id = %agent_id, name = %name, "agent registered");
        Ok(Registration {
            agent_id,
            name,
            credential,
            claim_code,
        })
    }

    /// Resolve a bearer credential to its agent.
    pub async fn authenticate(&self, credential: &str) -> CivicResult<Agent> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(CivicError::Unauthenticated("missing credential".into()));
        }
        self.ctx
            .storage()
            .find_agent_by_credential(&credential_digest(credential))
            .await?
            .ok_or_else(|| CivicError::Unauthenticated("unknown credential".into()))
    }

    /// Redeem a claim code with a proof URL and mark the agent verified.
    pub async fn verify(&self, claim_code: &str, proof_url: &str) -> CivicResult<AgentProfile> {
        let handle = parse_proof_url(proof_url)?;
        let claim_code = claim_code.trim();
        if claim_code.is_empty() {
            return Err(CivicError::invalid("claim code is required"));
        }

        let agent = self
            .ctx
            .storage()
            .find_agent_by_claim_code(claim_code)
            .await?
            .ok_or_else(|| CivicError::not_found("unknown claim code"))?;
        if agent.is_verified() {
            return Err(CivicError::invalid("agent is already verified"));
        }

        let reward = self.ctx.policy().verification_reward;
        let won = self
            .ctx
            .storage()
            .complete_verification(&agent.id, claim_code, &handle, reward, self.ctx.now())
            .await?;
        if !won {
            return Err(CivicError::invalid("agent is already verified"));
        }

        info!(agent_id = %agent.id, handle = %handle, "agent verified");
        self.ctx
            .publish(
                GazetteEntryType::CitizenVerified,
                format!("{} is now a verified citizen", agent.name),
                format!("{} verified as @{}.", agent.name, handle),
                Some(GazetteReference::new(agent.id, "agent")),
            )
            .await;

        self.profile(&agent.id).await
    }

    /// Apply one decay step to every agent not decayed within the interval.
    pub async fn decay_activity(&self) -> CivicResult<DecayReport> {
        let policy = self.ctx.policy();
        let now = self.ctx.now();
        let stale_before = chrono::Duration::try_hours(policy.decay_interval_hours)
            .and_then(|interval| now.checked_sub_signed(interval))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let agents_decayed = self
            .ctx
            .storage()
            .decay_activity(policy.decay_percent, stale_before, now)
            .await?;

        info!(agents_decayed, percent = policy.decay_percent, "activity decay applied");
        Ok(DecayReport { agents_decayed })
    }

    pub async fn profile(&self, agent_id: &AgentId) -> CivicResult<AgentProfile> {
        self.ctx
            .storage()
            .get_agent(agent_id)
            .await?
            .map(|agent| agent.profile())
            .ok_or_else(|| CivicError::not_found(format!("agent {agent_id} not found")))
    }
}

/// Hex blake3 digest under which a credential is stored.
pub fn credential_digest(credential: &str) -> String {
    blake3::hash(credential.as_bytes()).to_hex().to_string()
}

fn issue_credential() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    format!("{CREDENTIAL_PREFIX}{}", hex::encode(bytes))
}

fn issue_claim_code() -> String {
    let mut rng = rand::thread_rng();
    let word = CLAIM_WORDS.choose(&mut rng).copied().unwrap_or("reef");
    let suffix: String = (0..CLAIM_SUFFIX_LEN)
        .map(|_| CLAIM_ALPHABET[rng.gen_range(0..CLAIM_ALPHABET.len())] as char)
        .collect();
    format!("{word}-{suffix}")
}

fn validate_agent_name(name: &str) -> CivicResult<String> {
    let name = name.trim();
    let len = name.chars().count();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
        return Err(CivicError::invalid(format!(
            "name must be {NAME_MIN_LEN}-{NAME_MAX_LEN} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(CivicError::invalid(
            "name may only contain letters, digits, '_' and '-'",
        ));
    }
    Ok(name.to_string())
}

/// Extract the handle from `https://{x.com|twitter.com}/<handle>/status/<id>`.
pub fn parse_proof_url(proof_url: &str) -> CivicResult<String> {
    let invalid = || CivicError::invalid("proof URL must link to a post on x.com or twitter.com");

    let url = Url::parse(proof_url.trim()).map_err(|_| invalid())?;
    if url.scheme() != "https" {
        return Err(invalid());
    }
    let host = url.host_str().ok_or_else(invalid)?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host != "x.com" && host != "twitter.com" {
        return Err(invalid());
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();
    match segments.as_slice() {
        [handle, "status", post_id]
            if is_valid_handle(handle)
                && !post_id.is_empty()
                && post_id.chars().all(|c| c.is_ascii_digit()) =>
        {
            Ok((*handle).to_string())
        }
        _ => Err(invalid()),
    }
}

fn is_valid_handle(handle: &str) -> bool {
    (1..=15).contains(&handle.len())
        && handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}
