use crate::error::SilentGuardError;
use crate::shared::{
    auth::protect_route,
    usecase::{execute, UseCase},
};
use actix_web::{web, HttpRequest, HttpResponse};
use silent_guard_api_structs::delete_message::*;
use silent_guard_domain::{Message, ID};
use silent_guard_infra::SilentGuardContext;

pub async fn delete_message_controller(
    http_req: HttpRequest,
    path: web::Path<PathParams>,
    ctx: web::Data<SilentGuardContext>,
) -> Result<HttpResponse, SilentGuardError> {
    let user = protect_route(&http_req, &ctx).await?;

    let usecase = DeleteMessageUseCase {
        user_id: user.id,
        message_id: path.message_id,
    };

    execute(usecase, &ctx)
        .await
        .map(|message| {
            HttpResponse::Ok().json(APIResponse::new(message, ctx.sys.get_timestamp_millis()))
        })
        .map_err(SilentGuardError::from)
}

#[derive(Debug)]
pub struct DeleteMessageUseCase {
    pub user_id: ID,
    pub message_id: ID,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    NotFound(ID),
    Conflict(ID),
    StorageError,
}

impl From<UseCaseError> for SilentGuardError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotFound(id) => {
                Self::NotFound(format!("The message with id: {}, was not found.", id))
            }
            UseCaseError::Conflict(id) => Self::Conflict(format!(
                "The message with id: {} is being delivered or was modified concurrently. Try again.",
                id
            )),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for DeleteMessageUseCase {
    type Response = Message;

    type Error = UseCaseError;

    const NAME: &'static str = "DeleteMessage";

    async fn execute(&mut self, ctx: &SilentGuardContext) -> Result<Self::Response, Self::Error> {
        let message = match ctx.repos.messages.find(&self.message_id).await {
            Some(message) if message.user_id == self.user_id => message,
            _ => return Err(UseCaseError::NotFound(self.message_id)),
        };

        let deleted = ctx
            .repos
            .messages
            .delete(&message)
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        if !deleted {
            return Err(UseCaseError::Conflict(message.id));
        }

        Ok(message)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::message::test_helpers::{insert_message, setup, TestContext};

    #[actix_web::test]
    async fn deleted_message_is_never_evaluated_again() {
        let TestContext { ctx, sys, user } = setup().await;
        let message = insert_message(&ctx, &user).await;

        let mut usecase = DeleteMessageUseCase {
            user_id: user.id,
            message_id: message.id,
        };
        usecase.execute(&ctx).await.unwrap();

        let now = sys.advance(message.trigger.duration_millis());
        assert!(ctx.repos.messages.find(&message.id).await.is_none());
        assert!(ctx
            .repos
            .messages
            .find_overdue(now, ctx.config.claim_timeout)
            .await
            .unwrap()
            .is_empty());

        // Deleting again is a not found
        assert_eq!(
            usecase.execute(&ctx).await.unwrap_err(),
            UseCaseError::NotFound(message.id)
        );
    }

    #[actix_web::test]
    async fn hides_messages_of_other_users() {
        let TestContext { ctx, sys: _, user } = setup().await;
        let message = insert_message(&ctx, &user).await;

        let mut usecase = DeleteMessageUseCase {
            user_id: ID::default(),
            message_id: message.id,
        };
        assert_eq!(
            usecase.execute(&ctx).await.unwrap_err(),
            UseCaseError::NotFound(message.id)
        );
        assert!(ctx.repos.messages.find(&message.id).await.is_some());
    }
}
