//! Public gazette entries

use crate::ids::GazetteEntryId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of event recorded in the gazette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GazetteEntryType {
    BillProposed,
    BillAdvanced,
    BillReferred,
    BillEnacted,
    BillVetoed,
    BillFailed,
    CitizenVerified,
    PartyFounded,
    PartyDissolved,
}

impl GazetteEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BillProposed => "bill_proposed",
            Self::BillAdvanced => "bill_advanced",
            Self::BillReferred => "bill_referred",
            Self::BillEnacted => "bill_enacted",
            Self::BillVetoed => "bill_vetoed",
            Self::BillFailed => "bill_failed",
            Self::CitizenVerified => "citizen_verified",
            Self::PartyFounded => "party_founded",
            Self::PartyDissolved => "party_dissolved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        [
            Self::BillProposed,
            Self::BillAdvanced,
            Self::BillReferred,
            Self::BillEnacted,
            Self::BillVetoed,
            Self::BillFailed,
            Self::CitizenVerified,
            Self::PartyFounded,
            Self::PartyDissolved,
        ]
        .into_iter()
        .find(|kind| kind.as_str() == value)
    }
}

impl fmt::Display for GazetteEntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a gazette entry points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazetteReference {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl GazetteReference {
    pub fn new(id: impl fmt::Display, kind: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: kind.to_string(),
        }
    }
}

/// Entry to be appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GazetteAppend {
    pub entry_type: GazetteEntryType,
    pub title: String,
    pub content: String,
    pub reference: Option<GazetteReference>,
    pub published_at: DateTime<Utc>,
}

/// Immutable published entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazetteEntry {
    pub id: GazetteEntryId,
    pub entry_type: GazetteEntryType,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<GazetteReference>,
    pub published_at: DateTime<Utc>,
}
