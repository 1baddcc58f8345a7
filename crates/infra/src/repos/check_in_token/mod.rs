mod inmemory;
mod postgres;

pub use inmemory::InMemoryCheckInTokenRepo;
pub use postgres::PostgresCheckInTokenRepo;
use silent_guard_domain::{CheckInToken, Message};

/// A consumed token together with the check in it was redeemed for
#[derive(Debug, Clone)]
pub struct RedeemedToken {
    pub token: CheckInToken,
    /// Active messages of the owner after their clock was restarted
    pub messages: Vec<Message>,
}

#[async_trait::async_trait]
pub trait ICheckInTokenRepo: Send + Sync {
    async fn insert(&self, token: &CheckInToken) -> anyhow::Result<()>;
    /// Consumes the token if it is still usable at `now` and records a check in
    /// for its owner, on the user and on every active message. Either all of
    /// it is stored or none of it, a failed redeem leaves the token usable.
    /// Concurrent callers with the same token get `Some` at most once.
    async fn redeem(&self, token: &str, now: i64) -> anyhow::Result<Option<RedeemedToken>>;
    /// Removes tokens that expired before the given timestamp
    async fn delete_expired(&self, before: i64) -> anyhow::Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::{IMessageRepo, IUserRepo, InMemoryMessageRepo, InMemoryUserRepo};
    use crate::setup_test_context;
    use silent_guard_domain::{MessageDraft, TriggerUnit, User, ID};
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

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

    #[tokio::test]
    async fn tokens_are_redeemed_once() {
        let ctx = setup_test_context().await;
        let user = User::new("auth0|123".into(), "a@x.com".into(), 0);
        ctx.repos.users.insert(&user).await.unwrap();
        let active = message(&user.id, 0);
        ctx.repos.messages.insert(&active).await.unwrap();
        let token = CheckInToken::new(user.id, 0, 100);
        ctx.repos.check_in_tokens.insert(&token).await.unwrap();

        let (first, second) = futures::join!(
            ctx.repos.check_in_tokens.redeem(&token.token, 10),
            ctx.repos.check_in_tokens.redeem(&token.token, 10)
        );
        let redeemed = vec![first.unwrap(), second.unwrap()];
        assert_eq!(redeemed.iter().filter(|r| r.is_some()).count(), 1);
        let redeemed = redeemed.into_iter().flatten().next().unwrap();
        assert_eq!(redeemed.token.user_id, user.id);
        assert_eq!(redeemed.token.consumed_at, Some(10));
        assert_eq!(redeemed.messages.len(), 1);
        assert_eq!(redeemed.messages[0].last_check_in, Some(10));

        let stored = ctx.repos.users.find(&user.id).await.unwrap();
        assert_eq!(stored.last_check_in, Some(10));
        assert!(ctx
            .repos
            .check_in_tokens
            .redeem("unknown", 10)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn expired_tokens_are_rejected_and_removed() {
        let ctx = setup_test_context().await;
        let user = User::new("auth0|123".into(), "a@x.com".into(), 0);
        ctx.repos.users.insert(&user).await.unwrap();
        let token = CheckInToken::new(user.id, 0, 100);
        ctx.repos.check_in_tokens.insert(&token).await.unwrap();

        assert!(ctx
            .repos
            .check_in_tokens
            .redeem(&token.token, 100)
            .await
            .unwrap()
            .is_none());
        assert!(ctx.repos.users.find(&user.id).await.unwrap().last_check_in.is_none());
        assert_eq!(ctx.repos.check_in_tokens.delete_expired(101).await.unwrap(), 1);
    }

    /// Message storage whose check in writes fail while it is down
    struct FlakyMessageRepo {
        inner: InMemoryMessageRepo,
        down: AtomicBool,
    }

    #[async_trait::async_trait]
    impl IMessageRepo for FlakyMessageRepo {
        async fn insert(&self, message: &Message) -> anyhow::Result<()> {
            self.inner.insert(message).await
        }
        async fn save(&self, message: &Message) -> anyhow::Result<bool> {
            self.inner.save(message).await
        }
        async fn find(&self, message_id: &ID) -> Option<Message> {
            self.inner.find(message_id).await
        }
        async fn find_by_user(&self, user_id: &ID) -> Vec<Message> {
            self.inner.find_by_user(user_id).await
        }
        async fn delete(&self, message: &Message) -> anyhow::Result<bool> {
            self.inner.delete(message).await
        }
        async fn find_overdue(&self, now: i64, claim_timeout: i64) -> anyhow::Result<Vec<Message>> {
            self.inner.find_overdue(now, claim_timeout).await
        }
        async fn claim(
            &self,
            message_id: &ID,
            now: i64,
            claim_timeout: i64,
        ) -> anyhow::Result<Option<Message>> {
            self.inner.claim(message_id, now, claim_timeout).await
        }
        async fn release(&self, message: &Message, claimed_at: i64) -> anyhow::Result<bool> {
            self.inner.release(message, claimed_at).await
        }
        async fn record_check_in(&self, user_id: &ID, now: i64) -> anyhow::Result<Vec<Message>> {
            if self.down.load(Ordering::SeqCst) {
                anyhow::bail!("Connection refused");
            }
            self.inner.record_check_in(user_id, now).await
        }
        async fn find_due_for_check_in_request(
            &self,
            now: i64,
            window: i64,
        ) -> anyhow::Result<Vec<Message>> {
            self.inner.find_due_for_check_in_request(now, window).await
        }
        async fn mark_check_in_requested(&self, message_ids: &[ID], now: i64) -> anyhow::Result<()> {
            self.inner.mark_check_in_requested(message_ids, now).await
        }
    }

    #[tokio::test]
    async fn failed_redeem_leaves_no_partial_check_in() {
        let users: Arc<dyn IUserRepo> = Arc::new(InMemoryUserRepo::new());
        let messages = Arc::new(FlakyMessageRepo {
            inner: InMemoryMessageRepo::new(),
            down: AtomicBool::new(true),
        });
        let tokens = InMemoryCheckInTokenRepo::new(users.clone(), messages.clone());
        let user = User::new("auth0|123".into(), "a@x.com".into(), 0);
        users.insert(&user).await.unwrap();
        let active = message(&user.id, 0);
        messages.insert(&active).await.unwrap();
        let token = CheckInToken::new(user.id, 0, 100);
        tokens.insert(&token).await.unwrap();

        assert!(tokens.redeem(&token.token, 10).await.is_err());
        assert!(users.find(&user.id).await.unwrap().last_check_in.is_none());
        assert_eq!(messages.find(&active.id).await.unwrap().last_check_in, Some(0));

        // The owner can follow the same link again once storage is back
        messages.down.store(false, Ordering::SeqCst);
        let redeemed = tokens.redeem(&token.token, 20).await.unwrap().unwrap();
        assert_eq!(redeemed.messages[0].last_check_in, Some(20));
        assert_eq!(users.find(&user.id).await.unwrap().last_check_in, Some(20));
    }
}
