use crate::base::{APIResponse, BaseClient};
use reqwest::StatusCode;
use silent_guard_api_structs::*;
use silent_guard_domain::{TriggerUnit, ID};
use std::sync::Arc;

#[derive(Clone)]
pub struct MessageClient {
    base: Arc<BaseClient>,
}

pub struct CreateMessageInput {
    pub subject: String,
    pub content: String,
    pub recipients: Vec<String>,
    pub number_to_trigger: i64,
    pub type_to_trigger: TriggerUnit,
}

/// Fields left as `None` keep their current value
#[derive(Default)]
pub struct UpdateMessageInput {
    pub message_id: ID,
    pub subject: Option<String>,
    pub content: Option<String>,
    pub recipients: Option<Vec<String>>,
    pub number_to_trigger: Option<i64>,
    pub type_to_trigger: Option<TriggerUnit>,
    pub active: Option<bool>,
}

impl MessageClient {
    pub(crate) fn new(base: Arc<BaseClient>) -> Self {
        Self { base }
    }

    pub async fn create(
        &self,
        input: CreateMessageInput,
    ) -> APIResponse<create_message::APIResponse> {
        let body = create_message::RequestBody {
            subject: Some(input.subject),
            content: Some(input.content),
            recipients: Some(input.recipients),
            number_to_trigger: Some(input.number_to_trigger),
            type_to_trigger: Some(input.type_to_trigger.to_string()),
            active: None,
        };
        self.base
            .post(body, "messages".into(), StatusCode::CREATED)
            .await
    }

    /// Sends the body as is, without requiring any of the fields
    pub async fn create_raw(
        &self,
        body: MessageBody,
    ) -> APIResponse<create_message::APIResponse> {
        self.base
            .post(body, "messages".into(), StatusCode::CREATED)
            .await
    }

    pub async fn list(&self) -> APIResponse<get_messages::APIResponse> {
        self.base.get("messages".into(), StatusCode::OK).await
    }

    pub async fn update(
        &self,
        input: UpdateMessageInput,
    ) -> APIResponse<update_message::APIResponse> {
        let body = update_message::RequestBody {
            subject: input.subject,
            content: input.content,
            recipients: input.recipients,
            number_to_trigger: input.number_to_trigger,
            type_to_trigger: input.type_to_trigger.map(|unit| unit.to_string()),
            active: input.active,
        };
        self.base
            .put(
                body,
                format!("messages/{}", input.message_id),
                StatusCode::OK,
            )
            .await
    }

    pub async fn set_active(
        &self,
        message_id: ID,
        active: bool,
    ) -> APIResponse<set_message_active::APIResponse> {
        let body = set_message_active::RequestBody { active };
        self.base
            .put(
                body,
                format!("messages/{}/active", message_id),
                StatusCode::OK,
            )
            .await
    }

    pub async fn delete(&self, message_id: ID) -> APIResponse<delete_message::APIResponse> {
        self.base
            .delete(format!("messages/{}", message_id), StatusCode::OK)
            .await
    }
}
