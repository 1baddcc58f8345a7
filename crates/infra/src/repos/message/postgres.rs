use super::IMessageRepo;
use silent_guard_domain::{Message, TriggerConfig, TriggerUnit, ID};
use sqlx::{types::Uuid, Executor, FromRow, PgPool, Postgres};
use tracing::error;

pub struct PostgresMessageRepo {
    pool: PgPool,
}

impl PostgresMessageRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct MessageRaw {
    message_uid: Uuid,
    user_uid: Uuid,
    subject: String,
    content: String,
    recipients: Vec<String>,
    trigger_number: i64,
    trigger_unit: String,
    active: bool,
    created: i64,
    updated: i64,
    last_check_in: Option<i64>,
    last_check_in_request: Option<i64>,
    claimed_at: Option<i64>,
    fired_at: Option<i64>,
    delivery_attempts: i32,
    next_attempt_at: Option<i64>,
    needs_review: bool,
    version: i64,
}

impl TryFrom<MessageRaw> for Message {
    type Error = anyhow::Error;

    fn try_from(raw: MessageRaw) -> Result<Self, Self::Error> {
        let unit = raw.trigger_unit.parse::<TriggerUnit>()?;
        Ok(Message {
            id: raw.message_uid.into(),
            user_id: raw.user_uid.into(),
            subject: raw.subject,
            content: raw.content,
            recipients: raw.recipients,
            // Stored configs were validated on write
            trigger: TriggerConfig {
                number: raw.trigger_number,
                unit,
            },
            active: raw.active,
            created: raw.created,
            updated: raw.updated,
            last_check_in: raw.last_check_in,
            last_check_in_request: raw.last_check_in_request,
            claimed_at: raw.claimed_at,
            fired_at: raw.fired_at,
            delivery_attempts: raw.delivery_attempts,
            next_attempt_at: raw.next_attempt_at,
            needs_review: raw.needs_review,
            version: raw.version,
        })
    }
}

fn into_messages(raws: Vec<MessageRaw>) -> Vec<Message> {
    raws.into_iter()
        .filter_map(|raw| {
            let message_uid = raw.message_uid;
            match Message::try_from(raw) {
                Ok(message) => Some(message),
                Err(e) => {
                    error!("Unable to read stored message {}: {:?}", message_uid, e);
                    None
                }
            }
        })
        .collect()
}

macro_rules! anchor_sql {
    () => {
        "COALESCE(m.last_check_in, m.created)"
    };
}

macro_rules! next_reminder_sql {
    () => {
        concat!(
            anchor_sql!(),
            " + m.trigger_number * CASE m.trigger_unit \
                WHEN 'DAYS' THEN 86400000 \
                WHEN 'HOURS' THEN 3600000 \
                ELSE 60000 END"
        )
    };
}

/// Binds: $1 = now, $2 = claim timeout
macro_rules! claimable_sql {
    () => {
        concat!(
            "m.active AND NOT m.needs_review AND (",
            next_reminder_sql!(),
            ") <= $1 \
            AND (m.next_attempt_at IS NULL OR m.next_attempt_at <= $1) \
            AND (m.claimed_at IS NULL OR m.claimed_at <= $1 - $2)"
        )
    };
}

/// A failed attempt gives way to a check in stored during the claim.
/// Binds: $9 = whether the claim delivered, $10 = last check in seen by the claim
macro_rules! superseded_sql {
    () => {
        "(NOT $9 AND m.last_check_in IS DISTINCT FROM $10)"
    };
}

/// Restarts the clock of the user's active messages, claimed ones included.
/// Takes any executor so that it can run inside a check in transaction.
pub(crate) async fn record_check_in_query<'c, E>(
    executor: E,
    user_id: &ID,
    now: i64,
) -> anyhow::Result<Vec<Message>>
where
    E: Executor<'c, Database = Postgres>,
{
    let raws = sqlx::query_as::<_, MessageRaw>(
        r#"
        UPDATE messages AS m
        SET last_check_in = $2,
            delivery_attempts = 0,
            next_attempt_at = NULL,
            updated = $2,
            version = m.version + 1
        WHERE m.user_uid = $1 AND m.active
        RETURNING *
        "#,
    )
    .bind(user_id.inner_ref())
    .bind(now)
    .fetch_all(executor)
    .await?;

    Ok(into_messages(raws))
}

#[async_trait::async_trait]
impl IMessageRepo for PostgresMessageRepo {
    async fn insert(&self, message: &Message) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO messages(
                message_uid, user_uid, subject, content, recipients,
                trigger_number, trigger_unit, active, created, updated,
                last_check_in, last_check_in_request, claimed_at, fired_at,
                delivery_attempts, next_attempt_at, needs_review, version
            )
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(message.id.inner_ref())
        .bind(message.user_id.inner_ref())
        .bind(&message.subject)
        .bind(&message.content)
        .bind(&message.recipients)
        .bind(message.trigger.number)
        .bind(message.trigger.unit.as_str())
        .bind(message.active)
        .bind(message.created)
        .bind(message.updated)
        .bind(message.last_check_in)
        .bind(message.last_check_in_request)
        .bind(message.claimed_at)
        .bind(message.fired_at)
        .bind(message.delivery_attempts)
        .bind(message.next_attempt_at)
        .bind(message.needs_review)
        .bind(message.version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save(&self, message: &Message) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE messages
            SET subject = $3,
                content = $4,
                recipients = $5,
                trigger_number = $6,
                trigger_unit = $7,
                active = $8,
                updated = $9,
                last_check_in = $10,
                last_check_in_request = $11,
                fired_at = $12,
                delivery_attempts = $13,
                next_attempt_at = $14,
                needs_review = $15,
                version = version + 1
            WHERE message_uid = $1 AND version = $2 AND claimed_at IS NULL
            "#,
        )
        .bind(message.id.inner_ref())
        .bind(message.version)
        .bind(&message.subject)
        .bind(&message.content)
        .bind(&message.recipients)
        .bind(message.trigger.number)
        .bind(message.trigger.unit.as_str())
        .bind(message.active)
        .bind(message.updated)
        .bind(message.last_check_in)
        .bind(message.last_check_in_request)
        .bind(message.fired_at)
        .bind(message.delivery_attempts)
        .bind(message.next_attempt_at)
        .bind(message.needs_review)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() == 1)
    }

    async fn find(&self, message_id: &ID) -> Option<Message> {
        let raw = sqlx::query_as::<_, MessageRaw>(
            r#"
            SELECT * FROM messages AS m
            WHERE m.message_uid = $1
            "#,
        )
        .bind(message_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .ok()??;
        into_messages(vec![raw]).pop()
    }

    async fn find_by_user(&self, user_id: &ID) -> Vec<Message> {
        let raws = sqlx::query_as::<_, MessageRaw>(
            r#"
            SELECT * FROM messages AS m
            WHERE m.user_uid = $1
            ORDER BY m.seq
            "#,
        )
        .bind(user_id.inner_ref())
        .fetch_all(&self.pool)
        .await
        .unwrap_or_default();
        into_messages(raws)
    }

    async fn delete(&self, message: &Message) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            DELETE FROM messages
            WHERE message_uid = $1 AND version = $2 AND claimed_at IS NULL
            "#,
        )
        .bind(message.id.inner_ref())
        .bind(message.version)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() == 1)
    }

    async fn find_overdue(&self, now: i64, claim_timeout: i64) -> anyhow::Result<Vec<Message>> {
        let raws = sqlx::query_as::<_, MessageRaw>(concat!(
            "SELECT * FROM messages AS m WHERE ",
            claimable_sql!(),
            " ORDER BY m.seq"
        ))
        .bind(now)
        .bind(claim_timeout)
        .fetch_all(&self.pool)
        .await?;
        Ok(into_messages(raws))
    }

    async fn claim(
        &self,
        message_id: &ID,
        now: i64,
        claim_timeout: i64,
    ) -> anyhow::Result<Option<Message>> {
        let raw = sqlx::query_as::<_, MessageRaw>(concat!(
            "UPDATE messages AS m SET claimed_at = $1, version = m.version + 1 \
            WHERE m.message_uid = $3 AND ",
            claimable_sql!(),
            " RETURNING *"
        ))
        .bind(now)
        .bind(claim_timeout)
        .bind(message_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?;

        match raw {
            Some(raw) => Ok(Some(Message::try_from(raw)?)),
            None => Ok(None),
        }
    }

    async fn release(&self, message: &Message, claimed_at: i64) -> anyhow::Result<bool> {
        let res = sqlx::query(concat!(
            "UPDATE messages AS m \
            SET active = CASE WHEN ",
            superseded_sql!(),
            " THEN TRUE ELSE $3 END, \
                updated = $4, \
                claimed_at = NULL, \
                fired_at = $5, \
                delivery_attempts = CASE WHEN ",
            superseded_sql!(),
            " THEN 0 ELSE $6 END, \
                next_attempt_at = CASE WHEN ",
            superseded_sql!(),
            " THEN NULL ELSE $7 END, \
                needs_review = CASE WHEN ",
            superseded_sql!(),
            " THEN FALSE ELSE $8 END, \
                version = m.version + 1 \
            WHERE m.message_uid = $1 AND m.claimed_at = $2"
        ))
        .bind(message.id.inner_ref())
        .bind(claimed_at)
        .bind(message.active)
        .bind(message.updated)
        .bind(message.fired_at)
        .bind(message.delivery_attempts)
        .bind(message.next_attempt_at)
        .bind(message.needs_review)
        .bind(message.is_fired())
        .bind(message.last_check_in)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() == 1)
    }

    async fn record_check_in(&self, user_id: &ID, now: i64) -> anyhow::Result<Vec<Message>> {
        record_check_in_query(&self.pool, user_id, now).await
    }

    async fn find_due_for_check_in_request(
        &self,
        now: i64,
        window: i64,
    ) -> anyhow::Result<Vec<Message>> {
        let raws = sqlx::query_as::<_, MessageRaw>(concat!(
            "SELECT * FROM messages AS m \
            WHERE m.active AND NOT m.needs_review AND m.claimed_at IS NULL \
            AND (m.last_check_in_request IS NULL OR m.last_check_in_request < ",
            anchor_sql!(),
            ") AND GREATEST(",
            anchor_sql!(),
            ", ",
            next_reminder_sql!(),
            " - $2) <= $1 ORDER BY m.seq"
        ))
        .bind(now)
        .bind(window)
        .fetch_all(&self.pool)
        .await?;
        Ok(into_messages(raws))
    }

    async fn mark_check_in_requested(&self, message_ids: &[ID], now: i64) -> anyhow::Result<()> {
        let ids = message_ids
            .iter()
            .map(|id| *id.inner_ref())
            .collect::<Vec<_>>();
        sqlx::query(
            r#"
            UPDATE messages
            SET last_check_in_request = $2
            WHERE message_uid = ANY($1)
            "#,
        )
        .bind(&ids)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
