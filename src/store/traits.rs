//! `Database` trait: the async persistence interface for challenges and
//! the pending-moderation queue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::bot::model::{ChallengeCard, ChallengeKind, ChallengeRequest, Side};
use crate::error::DatabaseError;

/// Moderation state of a pending challenge row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingStatus {
    /// Waiting for a moderator.
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for PendingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for PendingStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Unknown pending status: {}", s)),
        }
    }
}

/// A parsed challenge awaiting moderator action.
///
/// Carries both the display card and the structured request it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChallenge {
    pub card: ChallengeCard,
    pub request: ChallengeRequest,
    pub cast_hash: String,
    pub status: PendingStatus,
    pub created_at: DateTime<Utc>,
}

impl PendingChallenge {
    pub fn new(card: ChallengeCard, request: ChallengeRequest, cast_hash: impl Into<String>) -> Self {
        Self {
            card,
            request,
            cast_hash: cast_hash.into(),
            status: PendingStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn card_id(&self) -> &str {
        &self.card.id
    }
}

/// Fields for a new live challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChallenge {
    pub challenger: String,
    /// Empty for open challenges.
    pub opponent: String,
    pub kind: ChallengeKind,
    pub topic: String,
    pub amount: u64,
    pub side: Side,
    pub duration_hours: u32,
    pub bonus: Option<u64>,
}

impl From<&ChallengeRequest> for NewChallenge {
    fn from(request: &ChallengeRequest) -> Self {
        Self {
            challenger: request.challenger.clone(),
            opponent: request.opponent.clone().unwrap_or_default(),
            kind: request.kind,
            topic: request.topic.clone(),
            amount: request.amount,
            side: request.side,
            duration_hours: request.duration,
            bonus: request.bonus,
        }
    }
}

/// A live challenge row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub id: i64,
    pub challenger: String,
    pub opponent: String,
    pub kind: ChallengeKind,
    pub topic: String,
    pub amount: u64,
    pub is_yes: bool,
    pub status: String,
    pub yes_pool: u64,
    pub no_pool: u64,
    pub duration_hours: u32,
    pub bonus: Option<u64>,
    pub created_at: DateTime<Utc>,
}

/// Backend-agnostic persistence for challenges and pending challenges.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Challenges ──────────────────────────────────────────────────

    /// Insert a live challenge and return the stored row.
    async fn create_challenge(&self, challenge: &NewChallenge) -> Result<Challenge, DatabaseError>;

    /// Get a challenge by ID.
    async fn get_challenge(&self, id: i64) -> Result<Option<Challenge>, DatabaseError>;

    /// All challenges, oldest first.
    async fn list_challenges(&self) -> Result<Vec<Challenge>, DatabaseError>;

    // ── Pending challenges ──────────────────────────────────────────

    /// Insert a pending challenge. Fails if the card ID already exists.
    async fn insert_pending(&self, pending: &PendingChallenge) -> Result<(), DatabaseError>;

    /// Get a pending challenge by card ID.
    async fn get_pending(&self, card_id: &str) -> Result<Option<PendingChallenge>, DatabaseError>;

    /// All pending challenges ordered by creation time.
    async fn list_pending(&self) -> Result<Vec<PendingChallenge>, DatabaseError>;

    /// Delete a pending challenge. Returns whether a row was removed.
    async fn delete_pending(&self, card_id: &str) -> Result<bool, DatabaseError>;
}
