use crate::error::SilentGuardError;
use crate::shared::{
    auth::protect_route,
    usecase::{execute, UseCase},
};
use actix_web::{web, HttpRequest, HttpResponse};
use silent_guard_api_structs::set_message_active::*;
use silent_guard_domain::{Message, ID};
use silent_guard_infra::SilentGuardContext;
use tracing::info;

pub async fn set_message_active_controller(
    http_req: HttpRequest,
    path: web::Path<PathParams>,
    body: web::Json<RequestBody>,
    ctx: web::Data<SilentGuardContext>,
) -> Result<HttpResponse, SilentGuardError> {
    let user = protect_route(&http_req, &ctx).await?;

    let usecase = SetMessageActiveUseCase {
        user_id: user.id,
        message_id: path.message_id,
        active: body.active,
    };

    execute(usecase, &ctx)
        .await
        .map(|message| {
            HttpResponse::Ok().json(APIResponse::new(message, ctx.sys.get_timestamp_millis()))
        })
        .map_err(SilentGuardError::from)
}

#[derive(Debug)]
pub struct SetMessageActiveUseCase {
    pub user_id: ID,
    pub message_id: ID,
    pub active: bool,
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
impl UseCase for SetMessageActiveUseCase {
    type Response = Message;

    type Error = UseCaseError;

    const NAME: &'static str = "SetMessageActive";

    async fn execute(&mut self, ctx: &SilentGuardContext) -> Result<Self::Response, Self::Error> {
        let mut message = match ctx.repos.messages.find(&self.message_id).await {
            Some(message) if message.user_id == self.user_id => message,
            _ => return Err(UseCaseError::NotFound(self.message_id)),
        };
        if message.is_claimed() {
            return Err(UseCaseError::Conflict(message.id));
        }

        if !message.set_active(self.active, ctx.sys.get_timestamp_millis()) {
            return Ok(message);
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
        if message.active {
            info!(
                "Message: {} was re-armed, next reminder at: {}",
                message.id,
                message.next_reminder()
            );
        }

        Ok(message)
    }
}
