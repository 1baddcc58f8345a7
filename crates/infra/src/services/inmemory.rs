use super::{mailgun::check_in_request_text, DeliveryError, IDeliveryService};
use silent_guard_domain::{CheckInRequest, ContentEnvelope};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub enum SentMail {
    Content(ContentEnvelope),
    CheckInRequest(CheckInRequest),
}

/// Keeps every sent email in an outbox instead of sending it. Used when no
/// email provider is configured and in tests, where it can also simulate a
/// failing or slow provider.
#[derive(Default)]
pub struct InMemoryDeliveryService {
    outbox: Mutex<Vec<SentMail>>,
    failures_left: AtomicUsize,
    latency: Mutex<Option<Duration>>,
}

impl InMemoryDeliveryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.outbox.lock().unwrap().clone()
    }

    pub fn sent_content(&self) -> Vec<ContentEnvelope> {
        self.sent()
            .into_iter()
            .filter_map(|mail| match mail {
                SentMail::Content(envelope) => Some(envelope),
                _ => None,
            })
            .collect()
    }

    pub fn sent_check_in_requests(&self) -> Vec<CheckInRequest> {
        self.sent()
            .into_iter()
            .filter_map(|mail| match mail {
                SentMail::CheckInRequest(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    /// The next `count` sends fail
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Every send sleeps this long before completing
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap() = latency;
    }

    async fn deliver(&self, mail: SentMail) -> Result<(), DeliveryError> {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DeliveryError::Unavailable("Simulated failure".into()));
        }

        self.outbox.lock().unwrap().push(mail);
        Ok(())
    }
}

#[async_trait::async_trait]
impl IDeliveryService for InMemoryDeliveryService {
    async fn send_content(&self, envelope: &ContentEnvelope) -> Result<(), DeliveryError> {
        info!(
            "Outbox: {} to {}",
            envelope.subject,
            envelope.recipients.join(", ")
        );
        self.deliver(SentMail::Content(envelope.clone())).await
    }

    async fn send_check_in_request(&self, request: &CheckInRequest) -> Result<(), DeliveryError> {
        info!(
            "Outbox: check in request to {}\n{}",
            request.to,
            check_in_request_text(request)
        );
        self.deliver(SentMail::CheckInRequest(request.clone())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> ContentEnvelope {
        ContentEnvelope {
            recipients: vec!["a@x.com".into()],
            subject: "Subject".into(),
            body: "Body".into(),
        }
    }

    #[tokio::test]
    async fn simulated_failures_are_not_stored() {
        let delivery = InMemoryDeliveryService::new();
        delivery.fail_next(1);
        assert!(delivery.send_content(&envelope()).await.is_err());
        assert!(delivery.send_content(&envelope()).await.is_ok());
        assert_eq!(delivery.sent_content(), vec![envelope()]);
    }
}
