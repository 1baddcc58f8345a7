mod inmemory;
mod mailgun;

pub use inmemory::{InMemoryDeliveryService, SentMail};
pub use mailgun::{MailgunConfig, MailgunDeliveryService};
use silent_guard_domain::{CheckInRequest, ContentEnvelope};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Unable to reach the email provider: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("The email provider rejected the email with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("The email could not be sent: {0}")]
    Unavailable(String),
}

/// Sends emails on behalf of the engine. Implementations must not retry,
/// retries are scheduled by the caller.
#[async_trait::async_trait]
pub trait IDeliveryService: Send + Sync {
    /// Delivers the content of a fired message to all of its recipients
    async fn send_content(&self, envelope: &ContentEnvelope) -> Result<(), DeliveryError>;
    async fn send_check_in_request(&self, request: &CheckInRequest) -> Result<(), DeliveryError>;
}
