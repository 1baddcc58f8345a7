use super::{DeliveryError, IDeliveryService};
use reqwest::Client;
use serde::Deserialize;
use silent_guard_domain::{CheckInRequest, ContentEnvelope};
use tracing::{debug, info};

const MAILGUN_API_BASE: &str = "https://api.mailgun.net/v3";
const CHECK_IN_SUBJECT: &str = "Please confirm you are still there";

#[derive(Debug, Clone)]
pub struct MailgunConfig {
    pub api_key: String,
    pub domain: String,
    pub sender: String,
}

impl MailgunConfig {
    /// Reads `MAILGUN_API_KEY`, `MAILGUN_DOMAIN` and `MAILGUN_SENDER`.
    /// Returns `None` unless all of them are set.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("MAILGUN_API_KEY").ok()?;
        let domain = std::env::var("MAILGUN_DOMAIN").ok()?;
        let sender = std::env::var("MAILGUN_SENDER").ok()?;
        Some(Self {
            api_key,
            domain,
            sender,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MailgunResponse {
    id: Option<String>,
}

pub struct MailgunDeliveryService {
    client: Client,
    config: MailgunConfig,
}

impl MailgunDeliveryService {
    pub fn new(config: MailgunConfig) -> Self {
        info!("Sending emails with Mailgun from domain: {}", config.domain);
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        text: &str,
    ) -> Result<(), DeliveryError> {
        let (to, cc) = match recipients.split_first() {
            Some(split) => split,
            None => return Err(DeliveryError::Unavailable("No recipients".into())),
        };
        let cc = cc.join(",");
        let html = text_to_html(text);

        let mut params = vec![
            ("from", self.config.sender.as_str()),
            ("to", to.as_str()),
            ("subject", subject),
            ("text", text),
            ("html", html.as_str()),
        ];
        if !cc.is_empty() {
            params.push(("cc", cc.as_str()));
        }

        let res = self
            .client
            .post(format!("{}/{}/messages", MAILGUN_API_BASE, self.config.domain))
            .basic_auth("api", Some(&self.config.api_key))
            .form(&params)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        let res = res.json::<MailgunResponse>().await?;
        debug!("Mailgun accepted email with id: {:?}", res.id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl IDeliveryService for MailgunDeliveryService {
    async fn send_content(&self, envelope: &ContentEnvelope) -> Result<(), DeliveryError> {
        self.send(&envelope.recipients, &envelope.subject, &envelope.body)
            .await
    }

    async fn send_check_in_request(&self, request: &CheckInRequest) -> Result<(), DeliveryError> {
        self.send(
            std::slice::from_ref(&request.to),
            CHECK_IN_SUBJECT,
            &check_in_request_text(request),
        )
        .await
    }
}

pub(crate) fn check_in_request_text(request: &CheckInRequest) -> String {
    format!(
        "Hi!\n\nYour messages will be delivered to their recipients unless you check in. \
        Follow the link below to confirm that you are still there:\n\n{}\n\n\
        You have {} to respond.",
        request.link, request.time_to_respond
    )
}

/// Html part of an email with the same content as the plain `text` part
fn text_to_html(text: &str) -> String {
    let mut html = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => html.push_str("&amp;"),
            '<' => html.push_str("&lt;"),
            '>' => html.push_str("&gt;"),
            '"' => html.push_str("&quot;"),
            '\n' => html.push_str("<br>\n"),
            '\r' => {}
            c => html.push(c),
        }
    }
    format!("<html><body><p>{}</p></body></html>", html)
}
