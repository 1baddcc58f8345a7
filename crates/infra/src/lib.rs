mod config;
mod repos;
mod services;
mod system;

pub use config::{parse_window, Config, IdentityProviderKey};
pub use repos::{ICheckInTokenRepo, IMessageRepo, IUserRepo, RedeemedToken, Repos};
pub use services::*;
use silent_guard_utils::create_random_secret;
use sqlx::{Connection, Executor, PgConnection};
use std::sync::Arc;
pub use system::{ISys, ManualSys, RealSys};
use tracing::info;
use url::Url;

#[derive(Clone)]
pub struct SilentGuardContext {
    pub repos: Repos,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
    pub delivery: Arc<dyn IDeliveryService>,
}

struct ContextParams {
    pub postgres_connection_string: String,
}

impl SilentGuardContext {
    fn create_inmemory() -> Self {
        Self {
            repos: Repos::create_inmemory(),
            config: Config::new(),
            sys: Arc::new(RealSys {}),
            delivery: delivery_from_env(),
        }
    }

    async fn create(params: ContextParams) -> Self {
        let repos = Repos::create_postgres(&params.postgres_connection_string)
            .await
            .expect("Postgres credentials must be set and valid");
        Self {
            repos,
            config: Config::new(),
            sys: Arc::new(RealSys {}),
            delivery: delivery_from_env(),
        }
    }
}

fn delivery_from_env() -> Arc<dyn IDeliveryService> {
    match MailgunConfig::from_env() {
        Some(config) => Arc::new(MailgunDeliveryService::new(config)),
        None => {
            info!("Mailgun is not configured. Emails are kept in an in-memory outbox.");
            Arc::new(InMemoryDeliveryService::new())
        }
    }
}

/// Context for tests. Uses a freshly created database when `DATABASE_URL` is
/// set so that tests running in parallel never see each others messages,
/// otherwise in-memory repositories. The outbox is always in-memory and tests
/// replace `sys` and `delivery` as they need.
pub async fn setup_test_context() -> SilentGuardContext {
    let repos = match std::env::var("DATABASE_URL") {
        Ok(connection_string) => create_test_database(&connection_string)
            .await
            .expect("Test database to be created"),
        Err(_) => Repos::create_inmemory(),
    };
    SilentGuardContext {
        repos,
        config: Config::new(),
        sys: Arc::new(RealSys {}),
        delivery: Arc::new(InMemoryDeliveryService::new()),
    }
}

async fn create_test_database(
    connection_string: &str,
) -> Result<Repos, Box<dyn std::error::Error>> {
    let database = format!(
        "silent_guard_test_{}",
        create_random_secret(16).to_lowercase()
    );
    let mut connection = PgConnection::connect(connection_string).await?;
    connection
        .execute(format!(r#"CREATE DATABASE "{}""#, database).as_str())
        .await?;
    connection.close().await?;

    let mut url = Url::parse(connection_string)?;
    url.set_path(&database);
    Repos::create_postgres(url.as_str()).await
}

/// Will setup the correct infra context given the environment
pub async fn setup_context() -> SilentGuardContext {
    const PSQL_CONNECTION_STRING: &str = "DATABASE_URL";

    match std::env::var(PSQL_CONNECTION_STRING) {
        Ok(postgres_connection_string) => {
            info!(
                "{} env var was provided. Going to use postgres.",
                PSQL_CONNECTION_STRING
            );
            SilentGuardContext::create(ContextParams {
                postgres_connection_string,
            })
            .await
        }
        Err(_) => {
            info!(
                "{} env var was not provided. Going to use inmemory infra.",
                PSQL_CONNECTION_STRING
            );
            SilentGuardContext::create_inmemory()
        }
    }
}
