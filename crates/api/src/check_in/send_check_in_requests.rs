use super::send_check_in_request;
use crate::shared::usecase::UseCase;
use silent_guard_domain::{Message, ID};
use silent_guard_infra::SilentGuardContext;
use std::collections::HashMap;
use tracing::{error, info, warn};

/// Asks the owners of messages that are approaching their deadline to check in.
/// Each owner gets at most one email per tick regardless of how many of their
/// messages are due.
#[derive(Debug)]
pub struct SendCheckInRequestsUseCase {}

#[derive(Debug, Default, PartialEq)]
pub struct CheckInRequestsReport {
    pub requested: usize,
    pub failed: usize,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    StorageError,
}

fn group_by_owner(messages: Vec<Message>) -> Vec<(ID, Vec<Message>)> {
    let mut owners: Vec<ID> = Vec::new();
    let mut grouped: HashMap<ID, Vec<Message>> = HashMap::new();
    for message in messages {
        if !grouped.contains_key(&message.user_id) {
            owners.push(message.user_id);
        }
        grouped.entry(message.user_id).or_default().push(message);
    }
    owners
        .into_iter()
        .filter_map(|owner| grouped.remove(&owner).map(|messages| (owner, messages)))
        .collect()
}

#[async_trait::async_trait(?Send)]
impl UseCase for SendCheckInRequestsUseCase {
    type Response = CheckInRequestsReport;

    type Error = UseCaseError;

    const NAME: &'static str = "SendCheckInRequests";

    async fn execute(&mut self, ctx: &SilentGuardContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.get_timestamp_millis();
        let due = ctx
            .repos
            .messages
            .find_due_for_check_in_request(now, ctx.config.check_in_window)
            .await
            .map_err(|e| {
                error!("Unable to load messages due for a check in request: {:?}", e);
                UseCaseError::StorageError
            })?;

        let mut report = CheckInRequestsReport::default();
        for (owner, messages) in group_by_owner(due) {
            let user = match ctx.repos.users.find(&owner).await {
                Some(user) => user,
                None => {
                    warn!("Owner: {} of {} message(s) was not found", owner, messages.len());
                    continue;
                }
            };

            let earliest_deadline = messages
                .iter()
                .map(|m| m.next_reminder())
                .min()
                .unwrap_or(now);
            // Unmarked messages are picked up again on the next tick
            if send_check_in_request(&user, (earliest_deadline - now).max(0), ctx)
                .await
                .is_err()
            {
                report.failed += 1;
                continue;
            }

            let message_ids = messages.iter().map(|m| m.id).collect::<Vec<_>>();
            if let Err(e) = ctx
                .repos
                .messages
                .mark_check_in_requested(&message_ids, now)
                .await
            {
                error!(
                    "Unable to mark check in requests as sent for user: {}. Error: {:?}",
                    owner, e
                );
            }
            report.requested += 1;
        }

        if report.requested > 0 || report.failed > 0 {
            info!(
                "Check in requests sent: {}, failed: {}",
                report.requested, report.failed
            );
        }
        Ok(report)
    }
}
