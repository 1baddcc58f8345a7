use super::parse_message_body;
use crate::error::SilentGuardError;
use crate::shared::{
    auth::protect_route,
    usecase::{execute, UseCase},
};
use actix_web::{web, HttpRequest, HttpResponse};
use silent_guard_api_structs::update_message::*;
use silent_guard_domain::{Message, MessageDraft, ValidationError, ID};
use silent_guard_infra::SilentGuardContext;

pub async fn update_message_controller(
    http_req: HttpRequest,
    path: web::Path<PathParams>,
    body: web::Json<RequestBody>,
    ctx: web::Data<SilentGuardContext>,
) -> Result<HttpResponse, SilentGuardError> {
    let user = protect_route(&http_req, &ctx).await?;

    let body = body.into_inner();
    let active = body.active;
    let patch = parse_message_body(body).map_err(UseCaseError::InvalidMessage)?;
    let usecase = UpdateMessageUseCase {
        user_id: user.id,
        message_id: path.message_id,
        patch,
        active,
    };

    execute(usecase, &ctx)
        .await
        .map(|message| {
            HttpResponse::Ok().json(APIResponse::new(message, ctx.sys.get_timestamp_millis()))
        })
        .map_err(SilentGuardError::from)
}

/// Missing fields of the patch keep their current value
#[derive(Debug)]
pub struct UpdateMessageUseCase {
    pub user_id: ID,
    pub message_id: ID,
    pub patch: MessageDraft,
    /// Same semantics as setting the message active on its own
    pub active: Option<bool>,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    NotFound(ID),
    InvalidMessage(ValidationError),
    Conflict(ID),
    StorageError,
}

impl From<UseCaseError> for SilentGuardError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotFound(id) => {
                Self::NotFound(format!("The message with id: {}, was not found.", id))
            }
            UseCaseError::InvalidMessage(e) => Self::BadClientData(e.to_string()),
            UseCaseError::Conflict(id) => Self::Conflict(format!(
                "The message with id: {} is being delivered or was modified concurrently. Try again.",
                id
            )),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for UpdateMessageUseCase {
    type Response = Message;

    type Error = UseCaseError;

    const NAME: &'static str = "UpdateMessage";

    async fn execute(&mut self, ctx: &SilentGuardContext) -> Result<Self::Response, Self::Error> {
        let mut message = match ctx.repos.messages.find(&self.message_id).await {
            Some(message) if message.user_id == self.user_id => message,
            _ => return Err(UseCaseError::NotFound(self.message_id)),
        };
        if message.is_claimed() {
            return Err(UseCaseError::Conflict(message.id));
        }

        let now = ctx.sys.get_timestamp_millis();
        message
            .apply(self.patch.clone(), now)
            .map_err(UseCaseError::InvalidMessage)?;
        if let Some(active) = self.active {
            message.set_active(active, now);
        }

        let saved = ctx
            .repos
            .messages
            .save(&message)
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        if !saved {
            return Err(UseCaseError::Conflict(message.id));
        }
        message.version += 1;

        Ok(message)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::message::test_helpers::{insert_message, setup, TestContext};
    use silent_guard_domain::{TriggerUnit, MILLIS_PER_HOUR};
    use silent_guard_infra::ISys;

    #[actix_web::test]
    async fn updates_fields_and_restarts_clock_on_trigger_change() {
        let TestContext { ctx, sys, user } = setup().await;
        let message = insert_message(&ctx, &user).await;
        let now = sys.advance(5_000);

        let mut usecase = UpdateMessageUseCase {
            user_id: user.id,
            message_id: message.id,
            patch: MessageDraft {
                subject: Some("Updated".into()),
                number_to_trigger: Some(3),
                type_to_trigger: Some(TriggerUnit::Hours),
                ..Default::default()
            },
            active: None,
        };
        let updated = usecase.execute(&ctx).await.unwrap();
        assert_eq!(updated.subject, "Updated");
        assert_eq!(updated.content, message.content);
        assert_eq!(updated.next_reminder(), now + 3 * MILLIS_PER_HOUR);

        let stored = ctx.repos.messages.find(&message.id).await.unwrap();
        assert_eq!(stored, updated);
    }

    #[actix_web::test]
    async fn rejects_invalid_patch_without_changes() {
        let TestContext { ctx, sys: _, user } = setup().await;
        let message = insert_message(&ctx, &user).await;

        let mut usecase = UpdateMessageUseCase {
            user_id: user.id,
            message_id: message.id,
            patch: MessageDraft {
                recipients: Some(vec!["nope".into()]),
                ..Default::default()
            },
            active: None,
        };
        assert!(matches!(
            usecase.execute(&ctx).await,
            Err(UseCaseError::InvalidMessage(_))
        ));
        assert_eq!(ctx.repos.messages.find(&message.id).await.unwrap(), message);
    }

    #[actix_web::test]
    async fn hides_messages_of_other_users() {
        let TestContext { ctx, sys: _, user } = setup().await;
        let message = insert_message(&ctx, &user).await;

        let mut usecase = UpdateMessageUseCase {
            user_id: ID::default(),
            message_id: message.id,
            patch: Default::default(),
            active: None,
        };
        assert_eq!(
            usecase.execute(&ctx).await.unwrap_err(),
            UseCaseError::NotFound(message.id)
        );
    }

    #[actix_web::test]
    async fn rejects_updates_while_delivering() {
        let TestContext { ctx, sys, user } = setup().await;
        let message = insert_message(&ctx, &user).await;
        let now = sys.advance(message.trigger.duration_millis());
        ctx.repos
            .messages
            .claim(&message.id, now, ctx.config.claim_timeout)
            .await
            .unwrap()
            .unwrap();

        let mut usecase = UpdateMessageUseCase {
            user_id: user.id,
            message_id: message.id,
            patch: MessageDraft {
                subject: Some("Too late".into()),
                ..Default::default()
            },
            active: None,
        };
        assert_eq!(
            usecase.execute(&ctx).await.unwrap_err(),
            UseCaseError::Conflict(message.id)
        );
    }

    #[actix_web::test]
    async fn patch_can_deactivate_and_rearm() {
        let TestContext { ctx, sys, user } = setup().await;
        let message = insert_message(&ctx, &user).await;
        sys.advance(MILLIS_PER_HOUR);

        let mut pause = UpdateMessageUseCase {
            user_id: user.id,
            message_id: message.id,
            patch: Default::default(),
            active: Some(false),
        };
        let paused = pause.execute(&ctx).await.unwrap();
        assert!(!paused.active);

        let now = sys.advance(30 * MILLIS_PER_HOUR);
        let mut rearm = UpdateMessageUseCase {
            user_id: user.id,
            message_id: message.id,
            patch: MessageDraft {
                content: Some("New content".into()),
                ..Default::default()
            },
            active: Some(true),
        };
        let rearmed = rearm.execute(&ctx).await.unwrap();
        assert!(rearmed.active);
        assert_eq!(rearmed.content, "New content");
        assert_eq!(rearmed.last_check_in, Some(now));
        assert_eq!(rearmed.next_reminder(), now + message.trigger.duration_millis());
    }
}
