use super::parse_message_body;
use crate::error::SilentGuardError;
use crate::shared::{
    auth::protect_route,
    usecase::{execute, UseCase},
};
use actix_web::{web, HttpRequest, HttpResponse};
use silent_guard_api_structs::create_message::*;
use silent_guard_domain::{Message, MessageDraft, ValidationError, ID};
use silent_guard_infra::SilentGuardContext;

pub async fn create_message_controller(
    http_req: HttpRequest,
    body: web::Json<RequestBody>,
    ctx: web::Data<SilentGuardContext>,
) -> Result<HttpResponse, SilentGuardError> {
    let user = protect_route(&http_req, &ctx).await?;

    let draft = parse_message_body(body.0).map_err(UseCaseError::InvalidMessage)?;
    let usecase = CreateMessageUseCase {
        user_id: user.id,
        draft,
    };

    execute(usecase, &ctx)
        .await
        .map(|message| {
            HttpResponse::Created().json(APIResponse::new(message, ctx.sys.get_timestamp_millis()))
        })
        .map_err(SilentGuardError::from)
}

#[derive(Debug)]
pub struct CreateMessageUseCase {
    pub user_id: ID,
    pub draft: MessageDraft,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    InvalidMessage(ValidationError),
    StorageError,
}

impl From<UseCaseError> for SilentGuardError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::InvalidMessage(e) => Self::BadClientData(e.to_string()),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for CreateMessageUseCase {
    type Response = Message;

    type Error = UseCaseError;

    const NAME: &'static str = "CreateMessage";

    async fn execute(&mut self, ctx: &SilentGuardContext) -> Result<Self::Response, Self::Error> {
        let content = self
            .draft
            .clone()
            .validate()
            .map_err(UseCaseError::InvalidMessage)?;

        let message = Message::new(self.user_id, content, ctx.sys.get_timestamp_millis());
        ctx.repos
            .messages
            .insert(&message)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        Ok(message)
    }
}
