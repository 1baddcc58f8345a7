use super::{ICheckInTokenRepo, RedeemedToken};
use crate::repos::message::record_check_in_query;
use crate::repos::user::set_last_check_in_query;
use silent_guard_domain::CheckInToken;
use sqlx::{types::Uuid, FromRow, PgPool};

pub struct PostgresCheckInTokenRepo {
    pool: PgPool,
}

impl PostgresCheckInTokenRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct CheckInTokenRaw {
    token: String,
    user_uid: Uuid,
    issued_at: i64,
    expires_at: i64,
    consumed_at: Option<i64>,
}

impl From<CheckInTokenRaw> for CheckInToken {
    fn from(raw: CheckInTokenRaw) -> Self {
        Self {
            token: raw.token,
            user_id: raw.user_uid.into(),
            issued_at: raw.issued_at,
            expires_at: raw.expires_at,
            consumed_at: raw.consumed_at,
        }
    }
}

#[async_trait::async_trait]
impl ICheckInTokenRepo for PostgresCheckInTokenRepo {
    async fn insert(&self, token: &CheckInToken) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO check_in_tokens(token, user_uid, issued_at, expires_at, consumed_at)
            VALUES($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&token.token)
        .bind(token.user_id.inner_ref())
        .bind(token.issued_at)
        .bind(token.expires_at)
        .bind(token.consumed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn redeem(&self, token: &str, now: i64) -> anyhow::Result<Option<RedeemedToken>> {
        // Dropping the transaction without commit rolls it back
        let mut tx = self.pool.begin().await?;
        let raw = sqlx::query_as::<_, CheckInTokenRaw>(
            r#"
            UPDATE check_in_tokens
            SET consumed_at = $2
            WHERE token = $1 AND consumed_at IS NULL AND expires_at > $2
            RETURNING *
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&mut tx)
        .await?;
        let token: CheckInToken = match raw {
            Some(raw) => raw.into(),
            None => return Ok(None),
        };

        set_last_check_in_query(&mut tx, &token.user_id, now).await?;
        let messages = record_check_in_query(&mut tx, &token.user_id, now).await?;
        tx.commit().await?;

        Ok(Some(RedeemedToken { token, messages }))
    }

    async fn delete_expired(&self, before: i64) -> anyhow::Result<u64> {
        let res = sqlx::query(
            r#"
            DELETE FROM check_in_tokens
            WHERE expires_at < $1
            "#,
        )
        .bind(before)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected())
    }
}
