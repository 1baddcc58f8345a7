use crate::error::SilentGuardError;
use crate::shared::usecase::{execute, UseCase};
use actix_web::{web, HttpResponse};
use silent_guard_api_structs::confirm_check_in::*;
use silent_guard_infra::{RedeemedToken, SilentGuardContext};
use tracing::{error, info};

/// Does not require a session, the confirmation token is the credential
pub async fn check_in_controller(
    path: web::Path<PathParams>,
    ctx: web::Data<SilentGuardContext>,
) -> Result<HttpResponse, SilentGuardError> {
    let usecase = CheckInUseCase {
        token: path.into_inner().token,
    };

    execute(usecase, &ctx)
        .await
        .map(|res| {
            HttpResponse::Ok().json(APIResponse {
                last_check_in: res.last_check_in,
                next_reminder: res.next_reminder,
            })
        })
        .map_err(SilentGuardError::from)
}

pub struct CheckInUseCase {
    pub token: String,
}

// The token is a credential and is kept out of the logs
impl std::fmt::Debug for CheckInUseCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckInUseCase").finish()
    }
}

#[derive(Debug, PartialEq)]
pub struct CheckInResult {
    pub last_check_in: i64,
    /// Earliest deadline among the active messages of the user
    pub next_reminder: Option<i64>,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    InvalidToken,
    StorageError,
}

impl From<UseCaseError> for SilentGuardError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::InvalidToken => Self::BadClientData(
                "Check in failed. The confirmation link is invalid, expired or already used."
                    .into(),
            ),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for CheckInUseCase {
    type Response = CheckInResult;

    type Error = UseCaseError;

    const NAME: &'static str = "CheckIn";

    async fn execute(&mut self, ctx: &SilentGuardContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.get_timestamp_millis();
        let RedeemedToken { token, messages } = ctx
            .repos
            .check_in_tokens
            .redeem(&self.token, now)
            .await
            .map_err(|e| {
                error!("Unable to redeem a check in token: {:?}", e);
                UseCaseError::StorageError
            })?
            .ok_or(UseCaseError::InvalidToken)?;
        info!(
            "User: {} checked in, {} active message(s) were re-armed",
            token.user_id,
            messages.len()
        );

        Ok(CheckInResult {
            last_check_in: now,
            next_reminder: messages.iter().map(|m| m.next_reminder()).min(),
        })
    }
}
