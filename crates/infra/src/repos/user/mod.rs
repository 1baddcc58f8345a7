mod inmemory;
mod postgres;

pub use inmemory::InMemoryUserRepo;
pub use postgres::PostgresUserRepo;
pub(crate) use postgres::set_last_check_in_query;
use silent_guard_domain::{User, ID};

#[async_trait::async_trait]
pub trait IUserRepo: Send + Sync {
    /// Fails if a user with the same subject already exists
    async fn insert(&self, user: &User) -> anyhow::Result<()>;
    async fn save(&self, user: &User) -> anyhow::Result<()>;
    async fn find(&self, user_id: &ID) -> Option<User>;
    async fn find_by_subject(&self, subject: &str) -> Option<User>;
    async fn set_last_check_in(&self, user_id: &ID, now: i64) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use crate::setup_test_context;
    use silent_guard_domain::User;

    #[tokio::test]
    async fn subjects_are_unique() {
        let ctx = setup_test_context().await;
        let user = User::new("auth0|123".into(), "a@x.com".into(), 0);
        ctx.repos.users.insert(&user).await.unwrap();
        let duplicate = User::new("auth0|123".into(), "b@x.com".into(), 0);
        assert!(ctx.repos.users.insert(&duplicate).await.is_err());

        let found = ctx.repos.users.find_by_subject("auth0|123").await.unwrap();
        assert_eq!(found.id, user.id);
        assert!(ctx.repos.users.find_by_subject("auth0|456").await.is_none());
    }

    #[tokio::test]
    async fn records_last_check_in() {
        let ctx = setup_test_context().await;
        let user = User::new("sub".into(), "a@x.com".into(), 0);
        ctx.repos.users.insert(&user).await.unwrap();
        ctx.repos.users.set_last_check_in(&user.id, 42).await.unwrap();
        let user = ctx.repos.users.find(&user.id).await.unwrap();
        assert_eq!(user.last_check_in, Some(42));
    }
}
