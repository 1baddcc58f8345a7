use crate::dtos::MessageDTO;
use serde::{Deserialize, Serialize};
use silent_guard_domain::{Message, ID};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: MessageDTO,
}

impl MessageResponse {
    pub fn new(message: Message, now: i64) -> Self {
        Self {
            message: MessageDTO::new(message, now),
        }
    }
}

/// Fields of a message as submitted by its owner. Every field is optional
/// so that missing fields are reported together with the other validation
/// problems instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipients: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_to_trigger: Option<i64>,
    /// One of `DAYS`, `HOURS` or `MINUTES`, case insensitive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_to_trigger: Option<String>,
    /// Only used when updating. New messages are always active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MessagePathParams {
    pub message_id: ID,
}

pub mod create_message {
    use super::*;

    pub type RequestBody = MessageBody;

    pub type APIResponse = MessageResponse;
}

pub mod get_messages {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub messages: Vec<MessageDTO>,
    }

    impl APIResponse {
        pub fn new(messages: Vec<Message>, now: i64) -> Self {
            Self {
                messages: messages
                    .into_iter()
                    .map(|m| MessageDTO::new(m, now))
                    .collect(),
            }
        }
    }
}

pub mod update_message {
    use super::*;

    pub type PathParams = MessagePathParams;

    pub type RequestBody = MessageBody;

    pub type APIResponse = MessageResponse;
}

pub mod set_message_active {
    use super::*;

    pub type PathParams = MessagePathParams;

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub active: bool,
    }

    pub type APIResponse = MessageResponse;
}

pub mod delete_message {
    use super::*;

    pub type PathParams = MessagePathParams;

    pub type APIResponse = MessageResponse;
}
