use crate::error::SilentGuardError;
use crate::shared::{
    auth::protect_route,
    usecase::{execute, UseCase},
};
use actix_web::{web, HttpRequest, HttpResponse};
use silent_guard_api_structs::get_messages::*;
use silent_guard_domain::{Message, ID};
use silent_guard_infra::SilentGuardContext;

pub async fn get_messages_controller(
    http_req: HttpRequest,
    ctx: web::Data<SilentGuardContext>,
) -> Result<HttpResponse, SilentGuardError> {
    let user = protect_route(&http_req, &ctx).await?;

    let usecase = GetMessagesUseCase { user_id: user.id };

    execute(usecase, &ctx)
        .await
        .map(|messages| {
            HttpResponse::Ok().json(APIResponse::new(messages, ctx.sys.get_timestamp_millis()))
        })
        .map_err(SilentGuardError::from)
}

#[derive(Debug)]
pub struct GetMessagesUseCase {
    pub user_id: ID,
}

#[derive(Debug)]
pub enum UseCaseError {}

impl From<UseCaseError> for SilentGuardError {
    fn from(e: UseCaseError) -> Self {
        match e {}
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for GetMessagesUseCase {
    type Response = Vec<Message>;

    type Error = UseCaseError;

    const NAME: &'static str = "GetMessages";

    async fn execute(&mut self, ctx: &SilentGuardContext) -> Result<Self::Response, Self::Error> {
        Ok(ctx.repos.messages.find_by_user(&self.user_id).await)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::message::test_helpers::{insert_message, setup, TestContext};
    use silent_guard_domain::User;

    #[actix_web::test]
    async fn lists_only_own_messages_in_creation_order() {
        let TestContext { ctx, sys, user } = setup().await;
        let first = insert_message(&ctx, &user).await;
        sys.advance(10);
        let second = insert_message(&ctx, &user).await;

        let other = User::new("auth0|other".into(), "other@x.com".into(), 0);
        ctx.repos.users.insert(&other).await.unwrap();
        insert_message(&ctx, &other).await;

        let mut usecase = GetMessagesUseCase { user_id: user.id };
        let messages = usecase.execute(&ctx).await.unwrap();
        assert_eq!(
            messages.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
    }
}
