use super::{ICheckInTokenRepo, RedeemedToken};
use crate::repos::shared::inmemory_repo::*;
use crate::repos::{IMessageRepo, IUserRepo};
use silent_guard_domain::CheckInToken;
use std::sync::{Arc, Mutex};

pub struct InMemoryCheckInTokenRepo {
    tokens: Mutex<Vec<CheckInToken>>,
    users: Arc<dyn IUserRepo>,
    messages: Arc<dyn IMessageRepo>,
}

impl InMemoryCheckInTokenRepo {
    pub fn new(users: Arc<dyn IUserRepo>, messages: Arc<dyn IMessageRepo>) -> Self {
        Self {
            tokens: Mutex::new(vec![]),
            users,
            messages,
        }
    }

    fn restore(&self, token: &CheckInToken) {
        update_many(&self.tokens, |t| t.token == token.token, |t| t.consumed_at = None);
    }
}

#[async_trait::async_trait]
impl ICheckInTokenRepo for InMemoryCheckInTokenRepo {
    async fn insert(&self, token: &CheckInToken) -> anyhow::Result<()> {
        insert(token, &self.tokens);
        Ok(())
    }

    async fn redeem(&self, token: &str, now: i64) -> anyhow::Result<Option<RedeemedToken>> {
        let consumed = update_many(
            &self.tokens,
            |t| t.token == token && t.is_usable(now),
            |t| t.consume(now),
        );
        let token = match consumed.into_iter().next() {
            Some(token) => token,
            None => return Ok(None),
        };

        // The in-memory user repo never fails, so the messages go first
        let messages = match self.messages.record_check_in(&token.user_id, now).await {
            Ok(messages) => messages,
            Err(e) => {
                self.restore(&token);
                return Err(e);
            }
        };
        if let Err(e) = self.users.set_last_check_in(&token.user_id, now).await {
            self.restore(&token);
            return Err(e);
        }

        Ok(Some(RedeemedToken { token, messages }))
    }

    async fn delete_expired(&self, before: i64) -> anyhow::Result<u64> {
        let mut tokens = self.tokens.lock().unwrap();
        let count = tokens.len();
        tokens.retain(|t| t.expires_at >= before);
        Ok((count - tokens.len()) as u64)
    }
}
