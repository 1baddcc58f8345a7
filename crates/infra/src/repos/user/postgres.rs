use super::IUserRepo;
use silent_guard_domain::{User, ID};
use sqlx::{types::Uuid, Executor, FromRow, PgPool, Postgres};

pub struct PostgresUserRepo {
    pool: PgPool,
}

impl PostgresUserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRaw {
    user_uid: Uuid,
    subject: String,
    email: String,
    created: i64,
    last_check_in: Option<i64>,
}

impl From<UserRaw> for User {
    fn from(raw: UserRaw) -> Self {
        Self {
            id: raw.user_uid.into(),
            subject: raw.subject,
            email: raw.email,
            created: raw.created,
            last_check_in: raw.last_check_in,
        }
    }
}

pub(crate) async fn set_last_check_in_query<'c, E>(
    executor: E,
    user_id: &ID,
    now: i64,
) -> anyhow::Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        r#"
        UPDATE users
        SET last_check_in = GREATEST(COALESCE(last_check_in, $2), $2)
        WHERE user_uid = $1
        "#,
    )
    .bind(user_id.inner_ref())
    .bind(now)
    .execute(executor)
    .await?;

    Ok(())
}

#[async_trait::async_trait]
impl IUserRepo for PostgresUserRepo {
    async fn insert(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users(user_uid, subject, email, created, last_check_in)
            VALUES($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id.inner_ref())
        .bind(&user.subject)
        .bind(&user.email)
        .bind(user.created)
        .bind(user.last_check_in)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET email = $2, last_check_in = $3
            WHERE user_uid = $1
            "#,
        )
        .bind(user.id.inner_ref())
        .bind(&user.email)
        .bind(user.last_check_in)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, user_id: &ID) -> Option<User> {
        sqlx::query_as::<_, UserRaw>(
            r#"
            SELECT * FROM users AS u
            WHERE u.user_uid = $1
            "#,
        )
        .bind(user_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .ok()?
        .map(|user| user.into())
    }

    async fn find_by_subject(&self, subject: &str) -> Option<User> {
        sqlx::query_as::<_, UserRaw>(
            r#"
            SELECT * FROM users AS u
            WHERE u.subject = $1
            "#,
        )
        .bind(subject)
        .fetch_optional(&self.pool)
        .await
        .ok()?
        .map(|user| user.into())
    }

    async fn set_last_check_in(&self, user_id: &ID, now: i64) -> anyhow::Result<()> {
        set_last_check_in_query(&self.pool, user_id, now).await
    }
}
