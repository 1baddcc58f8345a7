use crate::message::Message;

/// What the delivery collaborator sends to the recipients of a fired `Message`
#[derive(Debug, Clone, PartialEq)]
pub struct ContentEnvelope {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl From<&Message> for ContentEnvelope {
    fn from(message: &Message) -> Self {
        Self {
            recipients: message.recipients.clone(),
            subject: message.subject.clone(),
            body: message.content.clone(),
        }
    }
}

/// Asks a user to prove they are alive by following `link`
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInRequest {
    pub to: String,
    pub link: String,
    /// Human readable time left before the link expires
    pub time_to_respond: String,
}
