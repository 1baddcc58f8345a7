use super::{send_check_in_request, SendCheckInRequestError};
use crate::error::SilentGuardError;
use crate::shared::{
    auth::protect_route,
    usecase::{execute, UseCase},
};
use actix_web::{web, HttpRequest, HttpResponse};
use silent_guard_domain::User;
use silent_guard_infra::SilentGuardContext;

pub async fn request_check_in_link_controller(
    http_req: HttpRequest,
    ctx: web::Data<SilentGuardContext>,
) -> Result<HttpResponse, SilentGuardError> {
    let user = protect_route(&http_req, &ctx).await?;

    let usecase = RequestCheckInLinkUseCase { user };

    execute(usecase, &ctx)
        .await
        .map(|_| HttpResponse::NoContent().finish())
        .map_err(SilentGuardError::from)
}

/// Emails the user a confirmation link they can use to check in right away
#[derive(Debug)]
pub struct RequestCheckInLinkUseCase {
    pub user: User,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    StorageError,
    DeliveryFailed,
}

impl From<SendCheckInRequestError> for UseCaseError {
    fn from(e: SendCheckInRequestError) -> Self {
        match e {
            SendCheckInRequestError::StorageError => Self::StorageError,
            SendCheckInRequestError::DeliveryFailed => Self::DeliveryFailed,
        }
    }
}

impl From<UseCaseError> for SilentGuardError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::StorageError | UseCaseError::DeliveryFailed => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for RequestCheckInLinkUseCase {
    type Response = ();

    type Error = UseCaseError;

    const NAME: &'static str = "RequestCheckInLink";

    async fn execute(&mut self, ctx: &SilentGuardContext) -> Result<Self::Response, Self::Error> {
        send_check_in_request(&self.user, ctx.config.check_in_window, ctx).await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::check_in::test_helpers::last_confirmation_token;
    use crate::message::test_helpers::{setup, TestContext};
    use silent_guard_infra::InMemoryDeliveryService;
    use std::sync::Arc;

    #[actix_web::test]
    async fn sends_a_usable_confirmation_link() {
        let TestContext { mut ctx, sys, user } = setup().await;
        let outbox = Arc::new(InMemoryDeliveryService::new());
        ctx.delivery = outbox.clone();

        let mut usecase = RequestCheckInLinkUseCase { user: user.clone() };
        usecase.execute(&ctx).await.unwrap();

        let requests = outbox.sent_check_in_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].to, user.email);
        assert!(requests[0]
            .link
            .starts_with(ctx.config.check_in_base_url.as_str()));
        assert_eq!(requests[0].time_to_respond, "1 day");

        let token = last_confirmation_token(&outbox).unwrap();
        let redeemed = ctx
            .repos
            .check_in_tokens
            .redeem(&token, sys.advance(1))
            .await
            .unwrap();
        assert_eq!(redeemed.unwrap().token.user_id, user.id);
    }

    #[actix_web::test]
    async fn reports_failed_delivery() {
        let TestContext { mut ctx, sys: _, user } = setup().await;
        let outbox = Arc::new(InMemoryDeliveryService::new());
        outbox.fail_next(1);
        ctx.delivery = outbox.clone();

        let mut usecase = RequestCheckInLinkUseCase { user };
        assert_eq!(
            usecase.execute(&ctx).await.unwrap_err(),
            UseCaseError::DeliveryFailed
        );
    }
}
