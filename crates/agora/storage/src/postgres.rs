//! PostgreSQL adapter for Agora storage.
//!
//! Counters and lifecycle moves are single conditional statements so that
//! concurrent requests never lose an increment or apply a transition twice.
//! Multi-row changes (founding, joining, leaving a party) run in a
//! transaction.

use crate::traits::{
    AgentStore, BallotStore, BillStore, CommentStore, GazetteStore, PartyStore, QueryWindow,
};
use crate::error::{decay_keep_percent, ensure_transition};
use crate::{StorageError, StorageResult};
use agora_types::{
    Agent, AgentId, Bill, BillId, BillStatus, BillTransitionPatch, BillVote, Comment, CommentId,
    GazetteAppend, GazetteEntry, GazetteEntryId, GazetteEntryType, GazetteReference, Party,
    PartyId, PartyMembership, PartyRecommendation, SenateBallot, VerificationStatus, VoteValue,
    VotingWindow,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row};
use uuid::Uuid;

/// PostgreSQL-backed storage adapter.
#[derive(Clone)]
pub struct PostgresCivicStorage {
    pool: PgPool,
}

impl PostgresCivicStorage {
    /// Connect to PostgreSQL and initialize required schema.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        Self::connect_with_options(database_url, 10, 5).await
    }

    /// Connect with explicit pool parameters.
    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Backend(format!("failed to connect postgres: {e}")))?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create adapter from an existing pool.
    pub async fn from_pool(pool: PgPool) -> StorageResult<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> StorageResult<()> {
        let ddl = [
            r#"
            CREATE TABLE IF NOT EXISTS agora_agents (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                status TEXT NOT NULL,
                activity_score BIGINT NOT NULL DEFAULT 0 CHECK (activity_score >= 0),
                credential_digest TEXT NOT NULL UNIQUE,
                claim_code TEXT UNIQUE,
                social_handle TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                verified_at TIMESTAMPTZ,
                activity_decayed_at TIMESTAMPTZ
            )
            "#,
            "CREATE UNIQUE INDEX IF NOT EXISTS agora_agents_name_idx ON agora_agents (LOWER(name))",
            r#"
            CREATE TABLE IF NOT EXISTS agora_bills (
                id UUID PRIMARY KEY,
                title TEXT NOT NULL,
                summary TEXT NOT NULL,
                full_text TEXT NOT NULL,
                proposer_id UUID NOT NULL REFERENCES agora_agents(id),
                status TEXT NOT NULL,
                house_window_start TIMESTAMPTZ NOT NULL,
                house_window_end TIMESTAMPTZ NOT NULL,
                committee TEXT,
                senate_window_start TIMESTAMPTZ,
                senate_window_end TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS agora_bills_status_idx ON agora_bills (status, created_at DESC)",
            r#"
            CREATE TABLE IF NOT EXISTS agora_bill_votes (
                bill_id UUID NOT NULL REFERENCES agora_bills(id),
                agent_id UUID NOT NULL REFERENCES agora_agents(id),
                value TEXT NOT NULL,
                cast_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (bill_id, agent_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS agora_senate_ballots (
                bill_id UUID NOT NULL REFERENCES agora_bills(id),
                senator_id UUID NOT NULL REFERENCES agora_agents(id),
                value TEXT NOT NULL,
                cast_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (bill_id, senator_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS agora_comments (
                id UUID PRIMARY KEY,
                bill_id UUID NOT NULL REFERENCES agora_bills(id),
                author_id UUID NOT NULL REFERENCES agora_agents(id),
                text TEXT NOT NULL,
                reply_to UUID,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS agora_comments_bill_idx ON agora_comments (bill_id, created_at)",
            r#"
            CREATE TABLE IF NOT EXISTS agora_parties (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                founder_id UUID NOT NULL REFERENCES agora_agents(id),
                member_count BIGINT NOT NULL DEFAULT 0 CHECK (member_count >= 0),
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            "CREATE UNIQUE INDEX IF NOT EXISTS agora_parties_name_idx ON agora_parties (LOWER(name))",
            r#"
            CREATE TABLE IF NOT EXISTS agora_party_memberships (
                agent_id UUID PRIMARY KEY REFERENCES agora_agents(id),
                party_id UUID NOT NULL REFERENCES agora_parties(id) ON DELETE CASCADE,
                joined_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS agora_party_recommendations (
                party_id UUID NOT NULL REFERENCES agora_parties(id) ON DELETE CASCADE,
                bill_id UUID NOT NULL REFERENCES agora_bills(id),
                value TEXT NOT NULL,
                issued_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (party_id, bill_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS agora_gazette_entries (
                sequence BIGSERIAL PRIMARY KEY,
                id UUID NOT NULL UNIQUE,
                entry_type TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                reference JSONB,
                published_at TIMESTAMPTZ NOT NULL
            )
            "#,
        ];

        for stmt in ddl {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }

    async fn agent_exists(&self, id: &AgentId) -> StorageResult<bool> {
        let row = sqlx::query("SELECT 1 FROM agora_agents WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.is_some())
    }
}

const AGENT_COLUMNS: &str = "id, name, description, status, activity_score, credential_digest, \
     claim_code, social_handle, created_at, verified_at, activity_decayed_at";

const BILL_COLUMNS: &str = "id, title, summary, full_text, proposer_id, status, \
     house_window_start, house_window_end, committee, senate_window_start, senate_window_end, \
     created_at, updated_at";

const PARTY_COLUMNS: &str = "id, name, description, founder_id, member_count, created_at";

#[async_trait]
impl AgentStore for PostgresCivicStorage {
    async fn insert_agent(&self, agent: Agent) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO agora_agents
                (id, name, description, status, activity_score, credential_digest,
                 claim_code, social_handle, created_at, verified_at, activity_decayed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(*agent.id.as_uuid())
        .bind(&agent.name)
        .bind(&agent.description)
        .bind(agent.status.as_str())
        .bind(count_to_i64(agent.activity_score))
        .bind(&agent.credential_digest)
        .bind(&agent.claim_code)
        .bind(&agent.social_handle)
        .bind(agent.created_at)
        .bind(agent.verified_at)
        .bind(agent.activity_decayed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db)
                if db.is_unique_violation()
                    && db.constraint().map_or(false, |c| c.contains("claim_code")) =>
            {
                StorageError::DuplicateClaimCode
            }
            _ => db_error(e),
        })?;
        Ok(())
    }

    async fn get_agent(&self, id: &AgentId) -> StorageResult<Option<Agent>> {
        let row = sqlx::query(&format!(
            "SELECT {AGENT_COLUMNS} FROM agora_agents WHERE id = $1"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(agent_row_to_record).transpose()
    }

    async fn find_agent_by_credential(&self, digest: &str) -> StorageResult<Option<Agent>> {
        let row = sqlx::query(&format!(
            "SELECT {AGENT_COLUMNS} FROM agora_agents WHERE credential_digest = $1"
        ))
        .bind(digest)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(agent_row_to_record).transpose()
    }

    async fn find_agent_by_claim_code(&self, claim_code: &str) -> StorageResult<Option<Agent>> {
        let row = sqlx::query(&format!(
            "SELECT {AGENT_COLUMNS} FROM agora_agents WHERE claim_code = $1"
        ))
        .bind(claim_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(agent_row_to_record).transpose()
    }

    async fn complete_verification(
        &self,
        id: &AgentId,
        claim_code: &str,
        social_handle: &str,
        reward: u64,
        verified_at: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE agora_agents
               SET status = $1,
                   social_handle = $2,
                   verified_at = $3,
                   activity_score = activity_score + $4
             WHERE id = $5
               AND status = $6
               AND claim_code = $7
            "#,
        )
        .bind(VerificationStatus::Verified.as_str())
        .bind(social_handle)
        .bind(verified_at)
        .bind(count_to_i64(reward))
        .bind(*id.as_uuid())
        .bind(VerificationStatus::Pending.as_str())
        .bind(claim_code)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            if !self.agent_exists(id).await? {
                return Err(StorageError::NotFound(format!("agent {} not found", id)));
            }
            return Ok(false);
        }
        Ok(true)
    }

    async fn adjust_activity(&self, id: &AgentId, delta: i64) -> StorageResult<u64> {
        let row = sqlx::query(
            r#"
            UPDATE agora_agents
               SET activity_score = GREATEST(activity_score + $1, 0)
             WHERE id = $2
            RETURNING activity_score
            "#,
        )
        .bind(delta)
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| StorageError::NotFound(format!("agent {} not found", id)))?;

        let score: i64 = col(&row, "activity_score")?;
        Ok(score.max(0) as u64)
    }

    async fn decay_activity(
        &self,
        percent: u8,
        stale_before: DateTime<Utc>,
        decayed_at: DateTime<Utc>,
    ) -> StorageResult<u64> {
        let keep = decay_keep_percent(percent)? as i64;
        let result = sqlx::query(
            r#"
            UPDATE agora_agents
               SET activity_score = (activity_score * $1) / 100,
                   activity_decayed_at = $2
             WHERE COALESCE(activity_decayed_at, created_at) <= $3
            "#,
        )
        .bind(keep)
        .bind(decayed_at)
        .bind(stale_before)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl BillStore for PostgresCivicStorage {
    async fn insert_bill(&self, bill: Bill) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO agora_bills
                (id, title, summary, full_text, proposer_id, status,
                 house_window_start, house_window_end, committee,
                 senate_window_start, senate_window_end, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(*bill.id.as_uuid())
        .bind(&bill.title)
        .bind(&bill.summary)
        .bind(&bill.full_text)
        .bind(*bill.proposer_id.as_uuid())
        .bind(bill.status.as_str())
        .bind(bill.house_window.start)
        .bind(bill.house_window.end)
        .bind(&bill.committee)
        .bind(bill.senate_window.map(|w| w.start))
        .bind(bill.senate_window.map(|w| w.end))
        .bind(bill.created_at)
        .bind(bill.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn get_bill(&self, id: &BillId) -> StorageResult<Option<Bill>> {
        let row = sqlx::query(&format!("SELECT {BILL_COLUMNS} FROM agora_bills WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(bill_row_to_record).transpose()
    }

    async fn list_bills(
        &self,
        status: Option<BillStatus>,
        window: QueryWindow,
    ) -> StorageResult<Vec<Bill>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {BILL_COLUMNS}
              FROM agora_bills
             WHERE ($1::TEXT IS NULL OR status = $1)
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3
            "#
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(window.limit as i64)
        .bind(window.offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.into_iter().map(bill_row_to_record).collect()
    }

    async fn list_bills_due(&self, at: DateTime<Utc>) -> StorageResult<Vec<Bill>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {BILL_COLUMNS}
              FROM agora_bills
             WHERE (status = $1 AND house_window_end <= $3)
                OR (status = $2 AND senate_window_end <= $3)
             ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(BillStatus::HouseVoting.as_str())
        .bind(BillStatus::SenateVoting.as_str())
        .bind(at)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.into_iter().map(bill_row_to_record).collect()
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
        let result = sqlx::query(
            r#"
            UPDATE agora_bills
               SET status = $1,
                   house_window_start = COALESCE($2, house_window_start),
                   house_window_end = COALESCE($3, house_window_end),
                   senate_window_start = COALESCE($4, senate_window_start),
                   senate_window_end = COALESCE($5, senate_window_end),
                   committee = COALESCE($6, committee),
                   updated_at = $7
             WHERE id = $8
               AND status = $9
            "#,
        )
        .bind(to.as_str())
        .bind(patch.house_window.map(|w| w.start))
        .bind(patch.house_window.map(|w| w.end))
        .bind(patch.senate_window.map(|w| w.start))
        .bind(patch.senate_window.map(|w| w.end))
        .bind(patch.committee)
        .bind(updated_at)
        .bind(*id.as_uuid())
        .bind(expected_from.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            if self.get_bill(id).await?.is_none() {
                return Err(StorageError::NotFound(format!("bill {} not found", id)));
            }
            return Ok(false);
        }
        Ok(true)
    }
}

#[async_trait]
impl BallotStore for PostgresCivicStorage {
    async fn insert_vote(&self, vote: BillVote) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO agora_bill_votes (bill_id, agent_id, value, cast_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(*vote.bill_id.as_uuid())
        .bind(*vote.agent_id.as_uuid())
        .bind(vote.value.as_str())
        .bind(vote.cast_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn list_votes(&self, bill_id: &BillId) -> StorageResult<Vec<BillVote>> {
        let rows = sqlx::query(
            r#"
            SELECT bill_id, agent_id, value, cast_at
              FROM agora_bill_votes
             WHERE bill_id = $1
             ORDER BY cast_at ASC, agent_id ASC
            "#,
        )
        .bind(*bill_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(BillVote {
                    bill_id: BillId::from_uuid(col(&row, "bill_id")?),
                    agent_id: AgentId::from_uuid(col(&row, "agent_id")?),
                    value: vote_value(&row)?,
                    cast_at: col(&row, "cast_at")?,
                })
            })
            .collect()
    }

    async fn insert_senate_ballot(&self, ballot: SenateBallot) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO agora_senate_ballots (bill_id, senator_id, value, cast_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(*ballot.bill_id.as_uuid())
        .bind(*ballot.senator_id.as_uuid())
        .bind(ballot.value.as_str())
        .bind(ballot.cast_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn list_senate_ballots(&self, bill_id: &BillId) -> StorageResult<Vec<SenateBallot>> {
        let rows = sqlx::query(
            r#"
            SELECT bill_id, senator_id, value, cast_at
              FROM agora_senate_ballots
             WHERE bill_id = $1
             ORDER BY cast_at ASC, senator_id ASC
            "#,
        )
        .bind(*bill_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(SenateBallot {
                    bill_id: BillId::from_uuid(col(&row, "bill_id")?),
                    senator_id: AgentId::from_uuid(col(&row, "senator_id")?),
                    value: vote_value(&row)?,
                    cast_at: col(&row, "cast_at")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl CommentStore for PostgresCivicStorage {
    async fn insert_comment(&self, comment: Comment) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO agora_comments (id, bill_id, author_id, text, reply_to, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(*comment.id.as_uuid())
        .bind(*comment.bill_id.as_uuid())
        .bind(*comment.author_id.as_uuid())
        .bind(&comment.text)
        .bind(comment.reply_to.map(|id| *id.as_uuid()))
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn get_comment(&self, id: &CommentId) -> StorageResult<Option<Comment>> {
        let row = sqlx::query(
            "SELECT id, bill_id, author_id, text, reply_to, created_at FROM agora_comments WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(comment_row_to_record).transpose()
    }

    async fn list_comments(&self, bill_id: &BillId) -> StorageResult<Vec<Comment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, bill_id, author_id, text, reply_to, created_at
              FROM agora_comments
             WHERE bill_id = $1
             ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(*bill_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.into_iter().map(comment_row_to_record).collect()
    }
}

#[async_trait]
impl PartyStore for PostgresCivicStorage {
    async fn found_party(&self, party: Party) -> StorageResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO agora_parties (id, name, description, founder_id, member_count, created_at)
            VALUES ($1, $2, $3, $4, 1, $5)
            "#,
        )
        .bind(*party.id.as_uuid())
        .bind(&party.name)
        .bind(&party.description)
        .bind(*party.founder_id.as_uuid())
        .bind(party.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        sqlx::query(
            "INSERT INTO agora_party_memberships (agent_id, party_id, joined_at) VALUES ($1, $2, $3)",
        )
        .bind(*party.founder_id.as_uuid())
        .bind(*party.id.as_uuid())
        .bind(party.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn get_party(&self, id: &PartyId) -> StorageResult<Option<Party>> {
        let row = sqlx::query(&format!(
            "SELECT {PARTY_COLUMNS} FROM agora_parties WHERE id = $1"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(party_row_to_record).transpose()
    }

    async fn list_parties(&self) -> StorageResult<Vec<Party>> {
        let rows = sqlx::query(&format!(
            "SELECT {PARTY_COLUMNS} FROM agora_parties ORDER BY name ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.into_iter().map(party_row_to_record).collect()
    }

    async fn get_membership(&self, agent_id: &AgentId) -> StorageResult<Option<PartyMembership>> {
        let row = sqlx::query(
            "SELECT agent_id, party_id, joined_at FROM agora_party_memberships WHERE agent_id = $1",
        )
        .bind(*agent_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(membership_row_to_record).transpose()
    }

    async fn list_members(&self, party_id: &PartyId) -> StorageResult<Vec<PartyMembership>> {
        let rows = sqlx::query(
            r#"
            SELECT agent_id, party_id, joined_at
              FROM agora_party_memberships
             WHERE party_id = $1
             ORDER BY joined_at ASC, agent_id ASC
            "#,
        )
        .bind(*party_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.into_iter().map(membership_row_to_record).collect()
    }

    async fn join_party(&self, membership: PartyMembership) -> StorageResult<Party> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE agora_parties
               SET member_count = member_count + 1
             WHERE id = $1
            RETURNING {PARTY_COLUMNS}
            "#
        ))
        .bind(*membership.party_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?
        .ok_or_else(|| {
            StorageError::NotFound(format!("party {} not found", membership.party_id))
        })?;
        let party = party_row_to_record(row)?;

        // Rolls back the increment on drop when the agent already holds a membership.
        sqlx::query(
            "INSERT INTO agora_party_memberships (agent_id, party_id, joined_at) VALUES ($1, $2, $3)",
        )
        .bind(*membership.agent_id.as_uuid())
        .bind(*membership.party_id.as_uuid())
        .bind(membership.joined_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(party)
    }

    async fn remove_member(&self, agent_id: &AgentId, party_id: &PartyId) -> StorageResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let deleted = sqlx::query(
            "DELETE FROM agora_party_memberships WHERE agent_id = $1 AND party_id = $2",
        )
        .bind(*agent_id.as_uuid())
        .bind(*party_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        if deleted.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE agora_parties SET member_count = GREATEST(member_count - 1, 0) WHERE id = $1",
        )
        .bind(*party_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(true)
    }

    async fn dissolve_party(
        &self,
        party_id: &PartyId,
        founder_id: &AgentId,
    ) -> StorageResult<bool> {
        // Memberships and recommendations cascade.
        let result = sqlx::query(
            "DELETE FROM agora_parties WHERE id = $1 AND founder_id = $2 AND member_count <= 1",
        )
        .bind(*party_id.as_uuid())
        .bind(*founder_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_recommendation(
        &self,
        recommendation: PartyRecommendation,
    ) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO agora_party_recommendations (party_id, bill_id, value, issued_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (party_id, bill_id)
            DO UPDATE SET value = EXCLUDED.value, issued_at = EXCLUDED.issued_at
            "#,
        )
        .bind(*recommendation.party_id.as_uuid())
        .bind(*recommendation.bill_id.as_uuid())
        .bind(recommendation.value.as_str())
        .bind(recommendation.issued_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn list_recommendations(
        &self,
        party_id: &PartyId,
    ) -> StorageResult<Vec<PartyRecommendation>> {
        let rows = sqlx::query(
            r#"
            SELECT party_id, bill_id, value, issued_at
              FROM agora_party_recommendations
             WHERE party_id = $1
             ORDER BY issued_at ASC, bill_id ASC
            "#,
        )
        .bind(*party_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(PartyRecommendation {
                    party_id: PartyId::from_uuid(col(&row, "party_id")?),
                    bill_id: BillId::from_uuid(col(&row, "bill_id")?),
                    value: vote_value(&row)?,
                    issued_at: col(&row, "issued_at")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl GazetteStore for PostgresCivicStorage {
    async fn append_gazette(&self, entry: GazetteAppend) -> StorageResult<GazetteEntry> {
        let id = GazetteEntryId::generate();
        let reference_json = entry
            .reference
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO agora_gazette_entries (id, entry_type, title, content, reference, published_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(*id.as_uuid())
        .bind(entry.entry_type.as_str())
        .bind(&entry.title)
        .bind(&entry.content)
        .bind(reference_json)
        .bind(entry.published_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(GazetteEntry {
            id,
            entry_type: entry.entry_type,
            title: entry.title,
            content: entry.content,
            reference: entry.reference,
            published_at: entry.published_at,
        })
    }

    async fn list_gazette(&self, window: QueryWindow) -> StorageResult<Vec<GazetteEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, entry_type, title, content, reference, published_at
              FROM agora_gazette_entries
             ORDER BY sequence DESC
             LIMIT $1 OFFSET $2
            "#,
        )
        .bind(window.limit as i64)
        .bind(window.offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(gazette_row_to_record).collect()
    }
}

/// Map driver errors, surfacing constraint violations as domain errors.
fn db_error(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict(db.message().to_string());
        }
        if db.is_foreign_key_violation() {
            return StorageError::NotFound(db.message().to_string());
        }
    }
    StorageError::Backend(e.to_string())
}

fn col<'r, T>(row: &'r PgRow, name: &str) -> StorageResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StorageError::Backend(e.to_string()))
}

fn count_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn count_from_row(row: &PgRow, name: &str) -> StorageResult<u64> {
    let value: i64 = col(row, name)?;
    Ok(value.max(0) as u64)
}

fn vote_value(row: &PgRow) -> StorageResult<VoteValue> {
    let raw: String = col(row, "value")?;
    VoteValue::parse(&raw)
        .ok_or_else(|| StorageError::Serialization(format!("unknown vote value '{raw}'")))
}

fn agent_row_to_record(row: PgRow) -> StorageResult<Agent> {
    let status: String = col(&row, "status")?;
    Ok(Agent {
        id: AgentId::from_uuid(col(&row, "id")?),
        name: col(&row, "name")?,
        description: col(&row, "description")?,
        status: VerificationStatus::parse(&status).ok_or_else(|| {
            StorageError::Serialization(format!("unknown verification status '{status}'"))
        })?,
        activity_score: count_from_row(&row, "activity_score")?,
        credential_digest: col(&row, "credential_digest")?,
        claim_code: col(&row, "claim_code")?,
        social_handle: col(&row, "social_handle")?,
        created_at: col(&row, "created_at")?,
        verified_at: col(&row, "verified_at")?,
        activity_decayed_at: col(&row, "activity_decayed_at")?,
    })
}

fn bill_row_to_record(row: PgRow) -> StorageResult<Bill> {
    let status: String = col(&row, "status")?;
    let senate_start: Option<DateTime<Utc>> = col(&row, "senate_window_start")?;
    let senate_end: Option<DateTime<Utc>> = col(&row, "senate_window_end")?;

    Ok(Bill {
        id: BillId::from_uuid(col(&row, "id")?),
        title: col(&row, "title")?,
        summary: col(&row, "summary")?,
        full_text: col(&row, "full_text")?,
        proposer_id: AgentId::from_uuid(col(&row, "proposer_id")?),
        status: BillStatus::parse(&status)
            .ok_or_else(|| StorageError::Serialization(format!("unknown bill status '{status}'")))?,
        house_window: VotingWindow {
            start: col(&row, "house_window_start")?,
            end: col(&row, "house_window_end")?,
        },
        committee: col(&row, "committee")?,
        senate_window: senate_start
            .zip(senate_end)
            .map(|(start, end)| VotingWindow { start, end }),
        created_at: col(&row, "created_at")?,
        updated_at: col(&row, "updated_at")?,
    })
}

fn comment_row_to_record(row: PgRow) -> StorageResult<Comment> {
    let reply_to: Option<Uuid> = col(&row, "reply_to")?;
    Ok(Comment {
        id: CommentId::from_uuid(col(&row, "id")?),
        bill_id: BillId::from_uuid(col(&row, "bill_id")?),
        author_id: AgentId::from_uuid(col(&row, "author_id")?),
        text: col(&row, "text")?,
        reply_to: reply_to.map(CommentId::from_uuid),
        created_at: col(&row, "created_at")?,
    })
}

fn party_row_to_record(row: PgRow) -> StorageResult<Party> {
    Ok(Party {
        id: PartyId::from_uuid(col(&row, "id")?),
        name: col(&row, "name")?,
        description: col(&row, "description")?,
        founder_id: AgentId::from_uuid(col(&row, "founder_id")?),
        member_count: count_from_row(&row, "member_count")?,
        created_at: col(&row, "created_at")?,
    })
}

fn membership_row_to_record(row: PgRow) -> StorageResult<PartyMembership> {
    Ok(PartyMembership {
        agent_id: AgentId::from_uuid(col(&row, "agent_id")?),
        party_id: PartyId::from_uuid(col(&row, "party_id")?),
        joined_at: col(&row, "joined_at")?,
    })
}

fn gazette_row_to_record(row: PgRow) -> StorageResult<GazetteEntry> {
    let entry_type: String = col(&row, "entry_type")?;
    let reference_json: Option<serde_json::Value> = col(&row, "reference")?;
    let reference: Option<GazetteReference> = reference_json
        .map(|v| serde_json::from_value(v).map_err(|e| StorageError::Serialization(e.to_string())))
        .transpose()?;

    Ok(GazetteEntry {
        id: GazetteEntryId::from_uuid(col(&row, "id")?),
        entry_type: GazetteEntryType::parse(&entry_type).ok_or_else(|| {
            StorageError::Serialization(format!("unknown gazette entry type '{entry_type}'"))
        })?,
        title: col(&row, "title")?,
        content: col(&row, "content")?,
        reference,
        published_at: col(&row, "published_at")?,
    })
}
