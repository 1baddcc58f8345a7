use serde::{Deserialize, Serialize};
use silent_guard_domain::{Message, MessageState, TriggerUnit, ID};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDTO {
    pub id: ID,
    pub subject: String,
    pub content: String,
    pub recipients: Vec<String>,
    pub number_to_trigger: i64,
    pub type_to_trigger: TriggerUnit,
    pub active: bool,
    pub state: MessageState,
    pub created: i64,
    pub updated: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check_in: Option<i64>,
    /// Only present while the message is active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_reminder: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fired_at: Option<i64>,
    pub needs_review: bool,
}

impl MessageDTO {
    pub fn new(message: Message, now: i64) -> Self {
        let next_reminder = if message.active {
            Some(message.next_reminder())
        } else {
            None
        };
        Self {
            id: message.id,
            state: message.state(now),
            next_reminder,
            last_check_in: message.last_check_in,
            number_to_trigger: message.trigger.number,
            type_to_trigger: message.trigger.unit,
            subject: message.subject,
            content: message.content,
            recipients: message.recipients,
            active: message.active,
            created: message.created,
            updated: message.updated,
            fired_at: message.fired_at,
            needs_review: message.needs_review,
        }
    }
}
