mod check_in_token;
mod message;
mod shared;
mod user;

pub use check_in_token::{ICheckInTokenRepo, RedeemedToken};
use check_in_token::{InMemoryCheckInTokenRepo, PostgresCheckInTokenRepo};
pub use message::IMessageRepo;
use message::{InMemoryMessageRepo, PostgresMessageRepo};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
pub use user::IUserRepo;
use user::{InMemoryUserRepo, PostgresUserRepo};

#[derive(Clone)]
pub struct Repos {
    pub messages: Arc<dyn IMessageRepo>,
    pub users: Arc<dyn IUserRepo>,
    pub check_in_tokens: Arc<dyn ICheckInTokenRepo>,
}

impl Repos {
    pub async fn create_postgres(
        connection_string: &str,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        info!("DB CHECKING CONNECTION ...");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await?;
        info!("DB CHECKING CONNECTION ... [done]");

        info!("DB RUNNING MIGRATIONS ...");
        sqlx::migrate!().run(&pool).await?;
        info!("DB RUNNING MIGRATIONS ... [done]");

        Ok(Self {
            messages: Arc::new(PostgresMessageRepo::new(pool.clone())),
            users: Arc::new(PostgresUserRepo::new(pool.clone())),
            check_in_tokens: Arc::new(PostgresCheckInTokenRepo::new(pool)),
        })
    }

    pub fn create_inmemory() -> Self {
        let messages: Arc<dyn IMessageRepo> = Arc::new(InMemoryMessageRepo::new());
        let users: Arc<dyn IUserRepo> = Arc::new(InMemoryUserRepo::new());
        Self {
            check_in_tokens: Arc::new(InMemoryCheckInTokenRepo::new(
                users.clone(),
                messages.clone(),
            )),
            messages,
            users,
        }
    }
}
