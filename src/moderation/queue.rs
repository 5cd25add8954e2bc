//! Moderation queue: parsed challenges wait here until a moderator
//! approves (they become live challenges) or rejects them.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::bot::model::CastOutcome;
use crate::error::ModerationError;
use crate::store::{Challenge, Database, NewChallenge, PendingChallenge, PendingStatus};

/// Outcome of a moderator decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approved(Challenge),
    Rejected,
}

/// Pending-challenge workflow over a [`Database`].
pub struct ModerationQueue {
    db: Arc<dyn Database>,
}

impl ModerationQueue {
    pub fn new(db: Arc<dyn Database>) -> Arc<Self> {
        Arc::new(Self { db })
    }

    /// Store the card from a processed cast for moderation.
    /// Returns `None` when the outcome carries no card.
    pub async fn submit(
        &self,
        outcome: &CastOutcome,
        cast_hash: &str,
    ) -> Result<Option<PendingChallenge>, ModerationError> {
        let (Some(card), Some(request)) = (&outcome.card, &outcome.request) else {
            return Ok(None);
        };

        let pending = PendingChallenge::new(card.clone(), request.clone(), cast_hash);
        self.db.insert_pending(&pending).await?;

        info!(
            card_id = %card.id,
            kind = %request.kind,
            challenger = %request.challenger,
            cast_hash = cast_hash,
            "Challenge queued for moderation"
        );
        Ok(Some(pending))
    }

    /// All pending challenges, oldest first.
    pub async fn pending(&self) -> Result<Vec<PendingChallenge>, ModerationError> {
        Ok(self.db.list_pending().await?)
    }

    pub async fn get(&self, card_id: &str) -> Result<PendingChallenge, ModerationError> {
        self.db
            .get_pending(card_id)
            .await?
            .ok_or_else(|| ModerationError::NotFound {
                card_id: card_id.to_string(),
            })
    }

    /// Apply a moderator decision.
    pub async fn decide(&self, card_id: &str, approved: bool) -> Result<Decision, ModerationError> {
        if approved {
            self.approve(card_id).await.map(Decision::Approved)
        } else {
            self.reject(card_id).await.map(|()| Decision::Rejected)
        }
    }

    /// Promote a pending challenge to a live one.
    ///
    /// The pending row is claimed by deleting it before the live row is
    /// written, so two concurrent approvals cannot both succeed.
    pub async fn approve(&self, card_id: &str) -> Result<Challenge, ModerationError> {
        let pending = self.get(card_id).await?;
        if pending.status != PendingStatus::Pending {
            warn!(card_id = card_id, status = %pending.status, "Cannot approve non-pending challenge");
            return Err(ModerationError::NotPending {
                card_id: card_id.to_string(),
                status: pending.status.to_string(),
            });
        }

        if !self.db.delete_pending(card_id).await? {
            debug!(card_id = card_id, "Pending challenge claimed by another decision");
            return Err(ModerationError::NotFound {
                card_id: card_id.to_string(),
            });
        }

        match self.db.create_challenge(&NewChallenge::from(&pending.request)).await {
            Ok(challenge) => {
                info!(
                    card_id = card_id,
                    challenge_id = challenge.id,
                    kind = %challenge.kind,
                    "Challenge approved"
                );
                Ok(challenge)
            }
            Err(e) => {
                error!(card_id = card_id, error = %e, "Failed to create live challenge; restoring pending row");
                if let Err(restore) = self.db.insert_pending(&pending).await {
                    error!(card_id = card_id, error = %restore, "Failed to restore pending challenge");
                }
                Err(e.into())
            }
        }
    }

    /// Drop a pending challenge.
    pub async fn reject(&self, card_id: &str) -> Result<(), ModerationError> {
        if self.db.delete_pending(card_id).await? {
            info!(card_id = card_id, "Challenge rejected");
            Ok(())
        } else {
            warn!(card_id = card_id, "Reject failed: pending challenge not found");
            Err(ModerationError::NotFound {
                card_id: card_id.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::model::{ChallengeCard, ChallengeKind, ChallengeRequest, Side, Terms};
    use crate::store::LibSqlBackend;

    async fn make_queue() -> (Arc<ModerationQueue>, Arc<dyn Database>) {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        (ModerationQueue::new(Arc::clone(&db)), db)
    }

    fn outcome(card_id: &str, request: ChallengeRequest) -> CastOutcome {
        let card = ChallengeCard {
            id: card_id.into(),
            title: "P2P Challenge: @bob vs @alice".into(),
            description: "rain\n@bob says YES / ₦100".into(),
            stake_amount: request.amount,
            time_limit: format!("{}h", request.duration),
            link: format!("https://bantabro.com/challenge/{card_id}"),
        };
        CastOutcome::reply("reply").with_card(card, request)
    }

    fn terms() -> Terms {
        Terms {
            side: Side::Yes,
            amount: 100,
            topic: "rain".into(),
            duration: 24,
        }
    }

    #[tokio::test]
    async fn submit_ignores_outcomes_without_card() {
        let (queue, _db) = make_queue().await;
        let stored = queue.submit(&CastOutcome::reply("help"), "0x1").await.unwrap();
        assert!(stored.is_none());
        assert!(queue.pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn approve_creates_challenge_from_structured_fields() {
        let (queue, db) = make_queue().await;
        let request = ChallengeRequest::p2p("@bob", "@alice", terms(), Some(5));
        queue.submit(&outcome("c1", request), "0x1").await.unwrap();

        let challenge = queue.approve("c1").await.unwrap();
        assert_eq!(challenge.challenger, "@bob");
        assert_eq!(challenge.opponent, "@alice");
        assert_eq!(challenge.kind, ChallengeKind::P2p);
        assert_eq!(challenge.topic, "rain");
        assert!(challenge.is_yes);
        assert_eq!(challenge.amount, 100);
        assert_eq!(challenge.bonus, Some(5));

        assert!(queue.pending().await.unwrap().is_empty());
        assert_eq!(db.list_challenges().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn approve_open_challenge_has_empty_opponent() {
        let (queue, _db) = make_queue().await;
        let request = ChallengeRequest::open("@trader", terms(), None);
        queue.submit(&outcome("c1", request), "0x1").await.unwrap();

        let challenge = queue.approve("c1").await.unwrap();
        assert_eq!(challenge.kind, ChallengeKind::Open);
        assert_eq!(challenge.opponent, "");
    }

    #[tokio::test]
    async fn cannot_approve_twice() {
        let (queue, db) = make_queue().await;
        let request = ChallengeRequest::squad("@captain", "@team", terms());
        queue.submit(&outcome("c1", request), "0x1").await.unwrap();

        queue.approve("c1").await.unwrap();
        let err = queue.approve("c1").await.unwrap_err();
        assert!(matches!(err, ModerationError::NotFound { .. }));
        assert_eq!(db.list_challenges().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reject_deletes_pending() {
        let (queue, db) = make_queue().await;
        let request = ChallengeRequest::p2p("@bob", "@alice", terms(), None);
        queue.submit(&outcome("c1", request), "0x1").await.unwrap();

        assert_eq!(queue.decide("c1", false).await.unwrap(), Decision::Rejected);
        assert!(queue.pending().await.unwrap().is_empty());
        assert!(db.list_challenges().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reject_unknown_card() {
        let (queue, _db) = make_queue().await;
        let err = queue.reject("missing").await.unwrap_err();
        assert!(matches!(err, ModerationError::NotFound { .. }));
    }

    #[tokio::test]
    async fn non_pending_rows_are_left_alone() {
        let (queue, db) = make_queue().await;
        let request = ChallengeRequest::p2p("@bob", "@alice", terms(), None);
        let o = outcome("c1", request);
        let mut pending = PendingChallenge::new(
            o.card.clone().unwrap(),
            o.request.clone().unwrap(),
            "0x1",
        );
        pending.status = PendingStatus::Rejected;
        db.insert_pending(&pending).await.unwrap();

        let err = queue.approve("c1").await.unwrap_err();
        assert!(matches!(err, ModerationError::NotPending { .. }));
        assert!(queue.get("c1").await.is_ok());
    }

    #[tokio::test]
    async fn decide_approve_returns_challenge() {
        let (queue, _db) = make_queue().await;
        let request = ChallengeRequest::p2p("@bob", "@alice", terms(), None);
        queue.submit(&outcome("c1", request), "0x1").await.unwrap();

        match queue.decide("c1", true).await.unwrap() {
            Decision::Approved(challenge) => assert_eq!(challenge.challenger, "@bob"),
            Decision::Rejected => panic!("Expected approval"),
        }
    }
}
