mod inmemory;
mod postgres;

pub use inmemory::InMemoryMessageRepo;
pub(crate) use postgres::record_check_in_query;
pub use postgres::PostgresMessageRepo;
use silent_guard_domain::{Message, ID};

#[async_trait::async_trait]
pub trait IMessageRepo: Send + Sync {
    async fn insert(&self, message: &Message) -> anyhow::Result<()>;
    /// Stores the message if the stored version still equals `message.version`
    /// and the message is not claimed by an evaluator. Returns `false` when
    /// either precondition failed. The stored version is incremented on success.
    async fn save(&self, message: &Message) -> anyhow::Result<bool>;
    async fn find(&self, message_id: &ID) -> Option<Message>;
    /// Every message owned by the user in creation order
    async fn find_by_user(&self, user_id: &ID) -> Vec<Message>;
    /// Same preconditions as `save`
    async fn delete(&self, message: &Message) -> anyhow::Result<bool>;
    /// Messages an evaluator running at `now` may try to claim
    async fn find_overdue(&self, now: i64, claim_timeout: i64) -> anyhow::Result<Vec<Message>>;
    /// Atomically marks the message as claimed if it still is claimable.
    /// At most one of several concurrent callers gets `Some`.
    async fn claim(&self, message_id: &ID, now: i64, claim_timeout: i64)
        -> anyhow::Result<Option<Message>>;
    /// Stores the outcome of a delivery attempt. Only succeeds while the stored
    /// claim still is the one taken at `claimed_at`. Check ins stored during
    /// the claim are kept, see `Message::released_onto`.
    async fn release(&self, message: &Message, claimed_at: i64) -> anyhow::Result<bool>;
    /// Restarts the clock of every active message of the user, including
    /// messages that are being delivered right now
    async fn record_check_in(&self, user_id: &ID, now: i64) -> anyhow::Result<Vec<Message>>;
    async fn find_due_for_check_in_request(
        &self,
        now: i64,
        window: i64,
    ) -> anyhow::Result<Vec<Message>>;
    async fn mark_check_in_requested(&self, message_ids: &[ID], now: i64) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{setup_test_context, SilentGuardContext};
    use silent_guard_domain::{FailedDelivery, MessageDraft, RetryPolicy, TriggerUnit, User, MILLIS_PER_HOUR};

    fn message(user_id: &ID, now: i64) -> Message {
        let content = MessageDraft {
            subject: Some("Subject".into()),
            content: Some("Content".into()),
            recipients: Some(vec!["a@x.com".into()]),
            number_to_trigger: Some(1),
            type_to_trigger: Some(TriggerUnit::Hours),
        }
        .validate()
        .unwrap();
        Message::new(*user_id, content, now)
    }

    async fn insert_user(ctx: &SilentGuardContext, subject: &str) -> ID {
        let user = User::new(subject.into(), format!("{}@x.com", subject), 0);
        ctx.repos.users.insert(&user).await.unwrap();
        user.id
    }

    #[tokio::test]
    async fn save_rejects_stale_versions() {
        let ctx = setup_test_context().await;
        let user_id = insert_user(&ctx, "owner").await;
        let mut message = message(&user_id, 0);
        ctx.repos.messages.insert(&message).await.unwrap();

        let stale = message.clone();
        message.subject = "Changed".into();
        assert!(ctx.repos.messages.save(&message).await.unwrap());
        assert!(!ctx.repos.messages.save(&stale).await.unwrap());

        let stored = ctx.repos.messages.find(&message.id).await.unwrap();
        assert_eq!(stored.subject, "Changed");
        assert_eq!(stored.version, message.version + 1);
    }

    #[tokio::test]
    async fn only_one_claim_succeeds() {
        let ctx = setup_test_context().await;
        let user_id = insert_user(&ctx, "owner").await;
        let message = message(&user_id, 0);
        ctx.repos.messages.insert(&message).await.unwrap();

        let now = message.next_reminder();
        let timeout = 10 * MILLIS_PER_HOUR;
        let overdue = ctx.repos.messages.find_overdue(now - 1, timeout).await.unwrap();
        assert_eq!(overdue.len(), 0);
        let overdue = ctx.repos.messages.find_overdue(now, timeout).await.unwrap();
        assert_eq!(overdue.len(), 1);

        let (first, second) = futures::join!(
            ctx.repos.messages.claim(&message.id, now, timeout),
            ctx.repos.messages.claim(&message.id, now, timeout)
        );
        let claims = vec![first.unwrap(), second.unwrap()];
        assert_eq!(claims.iter().filter(|c| c.is_some()).count(), 1);
        assert!(ctx
            .repos
            .messages
            .find_overdue(now, timeout)
            .await
            .unwrap()
            .is_empty());

        // Owner writes are rejected while claimed
        let stored = ctx.repos.messages.find(&message.id).await.unwrap();
        assert!(!ctx.repos.messages.save(&stored).await.unwrap());
        assert!(!ctx.repos.messages.delete(&stored).await.unwrap());

        // Abandoned claims can be taken over
        let later = now + timeout;
        assert!(ctx
            .repos
            .messages
            .claim(&message.id, later, timeout)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn check_in_only_touches_the_users_active_messages() {
        let ctx = setup_test_context().await;
        let user_id = insert_user(&ctx, "owner").await;
        let other_id = insert_user(&ctx, "other").await;
        let active = message(&user_id, 0);
        let mut inactive = message(&user_id, 0);
        inactive.active = false;
        let other = message(&other_id, 0);
        for m in &[&active, &inactive, &other] {
            ctx.repos.messages.insert(m).await.unwrap();
        }

        let updated = ctx.repos.messages.record_check_in(&user_id, 500).await.unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].id, active.id);
        assert_eq!(updated[0].last_check_in, Some(500));

        let other = ctx.repos.messages.find(&other.id).await.unwrap();
        assert_eq!(other.last_check_in, Some(0));
        let listed = ctx.repos.messages.find_by_user(&user_id).await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, active.id);
    }

    #[tokio::test]
    async fn check_in_during_a_claim_survives_the_failed_release() {
        let ctx = setup_test_context().await;
        let user_id = insert_user(&ctx, "owner").await;
        let message = message(&user_id, 0);
        ctx.repos.messages.insert(&message).await.unwrap();
        let policy = RetryPolicy {
            max_attempts: 1,
            backoff_millis: 1_000,
        };

        let now = message.next_reminder();
        let timeout = 10 * MILLIS_PER_HOUR;
        let mut claimed = ctx
            .repos
            .messages
            .claim(&message.id, now, timeout)
            .await
            .unwrap()
            .unwrap();

        let updated = ctx.repos.messages.record_check_in(&user_id, now + 1).await.unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].next_reminder(), now + 1 + MILLIS_PER_HOUR);

        let claimed_at = claimed.claimed_at.unwrap();
        assert_eq!(
            claimed.register_failed_delivery(now + 2, &policy),
            FailedDelivery::Exhausted
        );
        assert!(ctx.repos.messages.release(&claimed, claimed_at).await.unwrap());

        let stored = ctx.repos.messages.find(&message.id).await.unwrap();
        assert!(!stored.is_claimed());
        assert!(stored.active);
        assert!(!stored.needs_review);
        assert_eq!(stored.last_check_in, Some(now + 1));
        assert_eq!(stored.delivery_attempts, 0);
        assert_eq!(stored.next_attempt_at, None);
        assert!(ctx
            .repos
            .messages
            .find_overdue(now + 2, timeout)
            .await
            .unwrap()
            .is_empty());
    }
}
