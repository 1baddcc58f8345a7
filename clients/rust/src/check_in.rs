use crate::base::{APIResponse, BaseClient};
use reqwest::StatusCode;
use silent_guard_api_structs::*;
use std::sync::Arc;

#[derive(Clone)]
pub struct CheckInClient {
    base: Arc<BaseClient>,
}

impl CheckInClient {
    pub(crate) fn new(base: Arc<BaseClient>) -> Self {
        Self { base }
    }

    pub async fn get_last(&self) -> APIResponse<get_last_check_in::APIResponse> {
        self.base.get("me/check-in".into(), StatusCode::OK).await
    }

    /// Asks the server to email a confirmation link to the current user
    pub async fn request_link(&self) -> APIResponse<()> {
        self.base
            .post_no_content("me/check-in".into(), StatusCode::NO_CONTENT)
            .await
    }

    /// Checks in with the token of a confirmation link. Needs no bearer token.
    pub async fn confirm(&self, token: &str) -> APIResponse<confirm_check_in::APIResponse> {
        self.base
            .put(
                (),
                format!("confirmation/check-in/{}", token),
                StatusCode::OK,
            )
            .await
    }
}
