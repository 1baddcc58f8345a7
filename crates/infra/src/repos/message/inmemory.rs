use super::IMessageRepo;
use crate::repos::shared::inmemory_repo::*;
use silent_guard_domain::{Message, ID};
use std::sync::Mutex;

pub struct InMemoryMessageRepo {
    messages: Mutex<Vec<Message>>,
}

impl InMemoryMessageRepo {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(vec![]),
        }
    }
}

#[async_trait::async_trait]
impl IMessageRepo for InMemoryMessageRepo {
    async fn insert(&self, message: &Message) -> anyhow::Result<()> {
        insert(message, &self.messages);
        Ok(())
    }

    async fn save(&self, message: &Message) -> anyhow::Result<bool> {
        let mut message = message.clone();
        let expected_version = message.version;
        message.version += 1;
        Ok(save_if(&message, &self.messages, |stored| {
            stored.version == expected_version && !stored.is_claimed()
        }))
    }

    async fn find(&self, message_id: &ID) -> Option<Message> {
        find(message_id, &self.messages)
    }

    async fn find_by_user(&self, user_id: &ID) -> Vec<Message> {
        find_by(&self.messages, |m| m.user_id == *user_id)
    }

    async fn delete(&self, message: &Message) -> anyhow::Result<bool> {
        let deleted = delete_if(&message.id, &self.messages, |stored| {
            stored.version == message.version && !stored.is_claimed()
        });
        Ok(deleted.is_some())
    }

    async fn find_overdue(&self, now: i64, claim_timeout: i64) -> anyhow::Result<Vec<Message>> {
        Ok(find_by(&self.messages, |m| m.is_claimable(now, claim_timeout)))
    }

    async fn claim(
        &self,
        message_id: &ID,
        now: i64,
        claim_timeout: i64,
    ) -> anyhow::Result<Option<Message>> {
        let claimed = update_many(
            &self.messages,
            |m| m.id == *message_id && m.is_claimable(now, claim_timeout),
            |m| {
                m.claim(now);
                m.version += 1;
            },
        );
        Ok(claimed.into_iter().next())
    }

    async fn release(&self, message: &Message, claimed_at: i64) -> anyhow::Result<bool> {
        let released = update_many(
            &self.messages,
            |m| m.id == message.id && m.claimed_at == Some(claimed_at),
            |m| {
                let mut released = message.released_onto(m);
                released.version += 1;
                *m = released;
            },
        );
        Ok(!released.is_empty())
    }

    async fn record_check_in(&self, user_id: &ID, now: i64) -> anyhow::Result<Vec<Message>> {
        Ok(update_many(
            &self.messages,
            |m| m.user_id == *user_id && m.active,
            |m| {
                m.check_in(now);
                m.version += 1;
            },
        ))
    }

    async fn find_due_for_check_in_request(
        &self,
        now: i64,
        window: i64,
    ) -> anyhow::Result<Vec<Message>> {
        Ok(find_by(&self.messages, |m| {
            m.needs_check_in_request(now, window)
        }))
    }

    async fn mark_check_in_requested(&self, message_ids: &[ID], now: i64) -> anyhow::Result<()> {
        update_many(
            &self.messages,
            |m| message_ids.contains(&m.id),
            |m| m.last_check_in_request = Some(now),
        );
        Ok(())
    }
}
