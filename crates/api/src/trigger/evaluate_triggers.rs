use crate::shared::usecase::UseCase;
use actix_web::rt::time::timeout;
use futures::future::join_all;
use silent_guard_domain::{ContentEnvelope, FailedDelivery, Message};
use silent_guard_infra::SilentGuardContext;
use tracing::{debug, error, info, warn};

/// Delivers every message whose deadline has passed without a check in.
///
/// Several evaluators may run at the same time, in this process or in others
/// sharing the same storage. A message is only delivered by the evaluator
/// that wins the atomic claim on it, losing the claim is a silent skip.
#[derive(Debug)]
pub struct EvaluateTriggersUseCase {}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct EvaluationReport {
    pub delivered: usize,
    /// Failed and scheduled for another attempt
    pub retried: usize,
    /// Failed too many times and parked for review
    pub failed: usize,
    /// Claimed by another evaluator
    pub skipped: usize,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    StorageError,
}

enum Outcome {
    Delivered,
    Retried,
    Failed,
    Skipped,
}

async fn evaluate(candidate: Message, now: i64, ctx: &SilentGuardContext) -> Outcome {
    let claim_timeout = ctx.config.claim_timeout;
    let mut message = match ctx.repos.messages.claim(&candidate.id, now, claim_timeout).await {
        Ok(Some(message)) => message,
        Ok(None) => {
            debug!("Message: {} was claimed by another evaluator", candidate.id);
            return Outcome::Skipped;
        }
        Err(e) => {
            error!("Unable to claim message: {}. Error: {:?}", candidate.id, e);
            return Outcome::Skipped;
        }
    };
    debug!("Claimed message: {}", message.id);

    let envelope = ContentEnvelope::from(&message);
    let delivery = timeout(
        ctx.config.delivery_timeout,
        ctx.delivery.send_content(&envelope),
    )
    .await;
    let finished_at = ctx.sys.get_timestamp_millis();

    let outcome = match delivery {
        Ok(Ok(())) => {
            message.mark_fired(finished_at);
            info!(
                "Delivered message: {} to {} recipient(s)",
                message.id,
                message.recipients.len()
            );
            Outcome::Delivered
        }
        Ok(Err(e)) => register_failure(&mut message, finished_at, &e.to_string(), ctx),
        Err(_) => register_failure(&mut message, finished_at, "delivery timed out", ctx),
    };

    match ctx.repos.messages.release(&message, now).await {
        Ok(true) => {}
        Ok(false) => warn!(
            "The claim on message: {} expired before the delivery outcome was stored",
            message.id
        ),
        Err(e) => error!(
            "Unable to store the delivery outcome of message: {}. Error: {:?}",
            message.id, e
        ),
    }

    outcome
}

fn register_failure(
    message: &mut Message,
    now: i64,
    reason: &str,
    ctx: &SilentGuardContext,
) -> Outcome {
    match message.register_failed_delivery(now, &ctx.config.retry_policy) {
        FailedDelivery::RetryAt(retry_at) => {
            warn!(
                "Delivery attempt {} of message: {} failed: {}. Retrying at: {}",
                message.delivery_attempts, message.id, reason, retry_at
            );
            Outcome::Retried
        }
        FailedDelivery::Exhausted => {
            error!(
                "Delivery of message: {} failed {} times, last error: {}. The message needs review.",
                message.id, message.delivery_attempts, reason
            );
            Outcome::Failed
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for EvaluateTriggersUseCase {
    type Response = EvaluationReport;

    type Error = UseCaseError;

    const NAME: &'static str = "EvaluateTriggers";

    async fn execute(&mut self, ctx: &SilentGuardContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.get_timestamp_millis();
        let candidates = ctx
            .repos
            .messages
            .find_overdue(now, ctx.config.claim_timeout)
            .await
            .map_err(|e| {
                error!("Unable to load overdue messages: {:?}", e);
                UseCaseError::StorageError
            })?;

        let outcomes = join_all(
            candidates
                .into_iter()
                .map(|candidate| evaluate(candidate, now, ctx)),
        )
        .await;

        let mut report = EvaluationReport::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Delivered => report.delivered += 1,
                Outcome::Retried => report.retried += 1,
                Outcome::Failed => report.failed += 1,
                Outcome::Skipped => report.skipped += 1,
            }
        }
        if report != EvaluationReport::default() {
            info!("Trigger evaluation finished: {:?}", report);
        }

        Ok(report)
    }
}
