use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::remote::Fields;

/// Append-only collections whose writes may be parked in the outbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxCollection {
    Journal,
    CheckIns,
}

impl OutboxCollection {
    /// Subcollection name under `users/{uid}`.
    pub fn subcollection(self) -> &'static str {
        match self {
            OutboxCollection::Journal => "journal",
            OutboxCollection::CheckIns => "checkins",
        }
    }
}

/// A remote append that could not be delivered yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingWrite {
    pub collection: OutboxCollection,
    pub fields: Fields,
    pub queued_at: DateTime<Utc>,
}
