mod create_message;
mod delete_message;
mod get_messages;
mod set_message_active;
mod update_message;

use actix_web::web;
use create_message::create_message_controller;
use delete_message::delete_message_controller;
use get_messages::get_messages_controller;
use set_message_active::set_message_active_controller;
use silent_guard_api_structs::MessageBody;
use silent_guard_domain::{FieldIssue, MessageDraft, TriggerUnit, ValidationError};
use update_message::update_message_controller;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/messages", web::get().to(get_messages_controller));
    cfg.route("/messages", web::post().to(create_message_controller));
    cfg.route(
        "/messages/{message_id}",
        web::put().to(update_message_controller),
    );
    cfg.route(
        "/messages/{message_id}",
        web::delete().to(delete_message_controller),
    );
    cfg.route(
        "/messages/{message_id}/active",
        web::put().to(set_message_active_controller),
    );
}

/// An unknown `typeToTrigger` is rejected up front. Treating it as missing
/// would make an update silently keep the current unit.
fn parse_message_body(body: MessageBody) -> Result<MessageDraft, ValidationError> {
    let type_to_trigger = match body.type_to_trigger {
        Some(unit) => match unit.trim().parse::<TriggerUnit>() {
            Ok(unit) => Some(unit),
            Err(_) => {
                return Err(ValidationError::new(vec![FieldIssue::new(
                    "typeToTrigger",
                    format!("{} is not one of DAYS, HOURS or MINUTES", unit),
                )]))
            }
        },
        None => None,
    };

    Ok(MessageDraft {
        subject: body.subject,
        content: body.content,
        recipients: body.recipients,
        number_to_trigger: body.number_to_trigger,
        type_to_trigger,
    })
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use silent_guard_domain::{
        Message, MessageDraft, RetryPolicy, TriggerUnit, User, ID, MILLIS_PER_DAY,
        MILLIS_PER_MINUTE,
    };
    use silent_guard_infra::{setup_test_context, IMessageRepo, ManualSys, SilentGuardContext};
    use std::{sync::Arc, time::Duration};

    pub struct TestContext {
        pub ctx: SilentGuardContext,
        pub sys: Arc<ManualSys>,
        pub user: User,
    }

    pub async fn setup() -> TestContext {
        let mut ctx = setup_test_context().await;
        let sys = Arc::new(ManualSys::new(1_000_000));
        ctx.sys = sys.clone();
        ctx.config.check_in_window = MILLIS_PER_DAY;
        ctx.config.claim_timeout = 10 * MILLIS_PER_MINUTE;
        ctx.config.delivery_timeout = Duration::from_secs(1);
        ctx.config.retry_policy = RetryPolicy {
            max_attempts: 3,
            backoff_millis: MILLIS_PER_MINUTE,
        };
        let user = User::new("auth0|owner".into(), "owner@x.com".into(), 0);
        ctx.repos.users.insert(&user).await.unwrap();
        TestContext { ctx, sys, user }
    }

    pub fn draft() -> MessageDraft {
        MessageDraft {
            subject: Some("My will".into()),
            content: Some("The keys are under the mat".into()),
            recipients: Some(vec!["a@x.com".into(), "b@y.org".into()]),
            number_to_trigger: Some(7),
            type_to_trigger: Some(TriggerUnit::Days),
        }
    }

    pub async fn insert_message(ctx: &SilentGuardContext, user: &User) -> Message {
        let now = ctx.sys.get_timestamp_millis();
        let message = Message::new(user.id, draft().validate().unwrap(), now);
        ctx.repos.messages.insert(&message).await.unwrap();
        message
    }

    /// Message storage that is down
    pub struct UnavailableMessageRepo;

    #[async_trait::async_trait]
    impl IMessageRepo for UnavailableMessageRepo {
        async fn insert(&self, _: &Message) -> anyhow::Result<()> {
            anyhow::bail!("Connection refused")
        }
        async fn save(&self, _: &Message) -> anyhow::Result<bool> {
            anyhow::bail!("Connection refused")
        }
        async fn find(&self, _: &ID) -> Option<Message> {
            None
        }
        async fn find_by_user(&self, _: &ID) -> Vec<Message> {
            vec![]
        }
        async fn delete(&self, _: &Message) -> anyhow::Result<bool> {
            anyhow::bail!("Connection refused")
        }
        async fn find_overdue(&self, _: i64, _: i64) -> anyhow::Result<Vec<Message>> {
            anyhow::bail!("Connection refused")
        }
        async fn claim(&self, _: &ID, _: i64, _: i64) -> anyhow::Result<Option<Message>> {
            anyhow::bail!("Connection refused")
        }
        async fn release(&self, _: &Message, _: i64) -> anyhow::Result<bool> {
            anyhow::bail!("Connection refused")
        }
        async fn record_check_in(&self, _: &ID, _: i64) -> anyhow::Result<Vec<Message>> {
            anyhow::bail!("Connection refused")
        }
        async fn find_due_for_check_in_request(
            &self,
            _: i64,
            _: i64,
        ) -> anyhow::Result<Vec<Message>> {
            anyhow::bail!("Connection refused")
        }
        async fn mark_check_in_requested(&self, _: &[ID], _: i64) -> anyhow::Result<()> {
            anyhow::bail!("Connection refused")
        }
    }
}
