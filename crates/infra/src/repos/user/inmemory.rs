use super::IUserRepo;
use crate::repos::shared::inmemory_repo::*;
use silent_guard_domain::{User, ID};
use std::sync::Mutex;

pub struct InMemoryUserRepo {
    users: Mutex<Vec<User>>,
}

impl InMemoryUserRepo {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(vec![]),
        }
    }
}

#[async_trait::async_trait]
impl IUserRepo for InMemoryUserRepo {
    async fn insert(&self, user: &User) -> anyhow::Result<()> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.subject == user.subject) {
            anyhow::bail!("A user with subject: {} already exists", user.subject);
        }
        users.push(user.clone());
        Ok(())
    }

    async fn save(&self, user: &User) -> anyhow::Result<()> {
        save_if(user, &self.users, |_| true);
        Ok(())
    }

    async fn find(&self, user_id: &ID) -> Option<User> {
        find(user_id, &self.users)
    }

    async fn find_by_subject(&self, subject: &str) -> Option<User> {
        find_by(&self.users, |u| u.subject == subject).into_iter().next()
    }

    async fn set_last_check_in(&self, user_id: &ID, now: i64) -> anyhow::Result<()> {
        update_many(
            &self.users,
            |u| u.id == *user_id,
            |u| u.last_check_in = Some(u.last_check_in.map_or(now, |last| last.max(now))),
        );
        Ok(())
    }
}
