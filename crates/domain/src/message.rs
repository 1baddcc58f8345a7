use crate::{
    shared::entity::{Entity, ID},
    validation::{validate_email, FieldIssue, ValidationError},
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

pub const MILLIS_PER_MINUTE: i64 = 1000 * 60;
pub const MILLIS_PER_HOUR: i64 = MILLIS_PER_MINUTE * 60;
pub const MILLIS_PER_DAY: i64 = MILLIS_PER_HOUR * 24;

/// Longest trigger duration a `Message` can be configured with, in days
pub const MAX_TRIGGER_DAYS: i64 = 365;
pub const MAX_SUBJECT_LENGTH: usize = 300;
pub const MAX_RECIPIENTS: usize = 50;

/// Unit of the trigger duration of a `Message`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerUnit {
    Days,
    Hours,
    Minutes,
}

impl TriggerUnit {
    pub fn millis(&self) -> i64 {
        match self {
            Self::Days => MILLIS_PER_DAY,
            Self::Hours => MILLIS_PER_HOUR,
            Self::Minutes => MILLIS_PER_MINUTE,
        }
    }

    /// Largest allowed `numberToTrigger` for this unit. All units
    /// share the same upper bound of `MAX_TRIGGER_DAYS`.
    pub fn max_number(&self) -> i64 {
        MAX_TRIGGER_DAYS * MILLIS_PER_DAY / self.millis()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Days => "DAYS",
            Self::Hours => "HOURS",
            Self::Minutes => "MINUTES",
        }
    }
}

impl Display for TriggerUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("Invalid trigger unit: {0}")]
pub struct InvalidTriggerUnitError(String);

impl FromStr for TriggerUnit {
    type Err = InvalidTriggerUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DAYS" => Ok(Self::Days),
            "HOURS" => Ok(Self::Hours),
            "MINUTES" => Ok(Self::Minutes),
            _ => Err(InvalidTriggerUnitError(s.to_string())),
        }
    }
}

/// How long a `Message` waits after the last check in before it is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerConfig {
    pub number: i64,
    pub unit: TriggerUnit,
}

impl TriggerConfig {
    pub fn new(number: i64, unit: TriggerUnit) -> Result<Self, String> {
        if number < 1 || number > unit.max_number() {
            return Err(format!(
                "must be between 1 and {} when the trigger type is {}",
                unit.max_number(),
                unit
            ));
        }
        Ok(Self { number, unit })
    }

    pub fn duration_millis(&self) -> i64 {
        self.number * self.unit.millis()
    }
}

/// User submitted fields of a `Message`. Used both for creating a new
/// `Message` where every field is required, and as a patch for updating
/// an existing one where missing fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageDraft {
    pub subject: Option<String>,
    pub content: Option<String>,
    pub recipients: Option<Vec<String>>,
    pub number_to_trigger: Option<i64>,
    pub type_to_trigger: Option<TriggerUnit>,
}

/// The validated content of a `Message`
#[derive(Debug, Clone, PartialEq)]
pub struct MessageContent {
    pub subject: String,
    pub content: String,
    pub recipients: Vec<String>,
    pub trigger: TriggerConfig,
}

impl MessageDraft {
    pub fn validate(self) -> Result<MessageContent, ValidationError> {
        let mut issues = Vec::new();

        let subject = self.subject.unwrap_or_default().trim().to_string();
        if subject.is_empty() {
            issues.push(FieldIssue::new("subject", "must not be empty"));
        } else if subject.chars().count() > MAX_SUBJECT_LENGTH {
            issues.push(FieldIssue::new(
                "subject",
                format!("must be at most {} characters", MAX_SUBJECT_LENGTH),
            ));
        }

        let content = self.content.unwrap_or_default();
        if content.trim().is_empty() {
            issues.push(FieldIssue::new("content", "must not be empty"));
        }

        let recipients = match normalize_recipients(self.recipients.unwrap_or_default()) {
            Ok(recipients) => recipients,
            Err(message) => {
                issues.push(FieldIssue::new("recipients", message));
                Vec::new()
            }
        };

        let trigger = match (self.number_to_trigger, self.type_to_trigger) {
            (Some(number), Some(unit)) => match TriggerConfig::new(number, unit) {
                Ok(trigger) => Some(trigger),
                Err(message) => {
                    issues.push(FieldIssue::new("numberToTrigger", message));
                    None
                }
            },
            (number, unit) => {
                if number.is_none() {
                    issues.push(FieldIssue::new("numberToTrigger", "must be provided"));
                }
                if unit.is_none() {
                    issues.push(FieldIssue::new(
                        "typeToTrigger",
                        "must be one of DAYS, HOURS or MINUTES",
                    ));
                }
                None
            }
        };

        match trigger {
            Some(trigger) if issues.is_empty() => Ok(MessageContent {
                subject,
                content,
                recipients,
                trigger,
            }),
            _ => Err(ValidationError::new(issues)),
        }
    }

    /// Fills every field missing in this patch with the current value of `message`
    fn merged_onto(self, message: &Message) -> Self {
        Self {
            subject: self.subject.or_else(|| Some(message.subject.clone())),
            content: self.content.or_else(|| Some(message.content.clone())),
            recipients: self.recipients.or_else(|| Some(message.recipients.clone())),
            number_to_trigger: self.number_to_trigger.or(Some(message.trigger.number)),
            type_to_trigger: self.type_to_trigger.or(Some(message.trigger.unit)),
        }
    }
}

/// Trims every address, drops duplicates (case insensitive, first one wins)
/// and validates the remaining ones.
fn normalize_recipients(recipients: Vec<String>) -> Result<Vec<String>, String> {
    let mut normalized: Vec<String> = Vec::with_capacity(recipients.len());
    for recipient in recipients {
        let recipient = recipient.trim();
        if recipient.is_empty() {
            continue;
        }
        validate_email(recipient)?;
        if !normalized
            .iter()
            .any(|r| r.eq_ignore_ascii_case(recipient))
        {
            normalized.push(recipient.to_string());
        }
    }

    if normalized.is_empty() {
        return Err("must contain at least one email address".into());
    }
    if normalized.len() > MAX_RECIPIENTS {
        return Err(format!(
            "must contain at most {} email addresses",
            MAX_RECIPIENTS
        ));
    }
    Ok(normalized)
}

/// Where a `Message` is in its lifecycle at a given point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageState {
    /// Active and the next reminder is in the future
    Armed,
    /// Active and the next reminder has passed, waiting for the evaluator
    Overdue,
    /// Claimed by the evaluator and currently being delivered
    Delivering,
    /// Delivered and deactivated until the owner re-arms it
    Fired,
    /// Delivery failed too many times, deactivated for manual review
    NeedsReview,
    /// Deactivated by the owner
    Inactive,
}

/// Bounded retries with exponential backoff for failed deliveries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: i32,
    pub backoff_millis: i64,
}

impl RetryPolicy {
    /// Delay before the next attempt after `attempt` failed attempts
    pub fn backoff_after(&self, attempt: i32) -> i64 {
        let exponent = (attempt.max(1) - 1).min(16) as u32;
        self.backoff_millis.saturating_mul(2_i64.pow(exponent))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedDelivery {
    RetryAt(i64),
    Exhausted,
}

/// A message the user wants delivered to its recipients if they stop
/// checking in. The delivery deadline is never stored, it is always
/// derived from the last check in and the trigger duration.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: ID,
    pub user_id: ID,
    pub subject: String,
    pub content: String,
    pub recipients: Vec<String>,
    pub trigger: TriggerConfig,
    pub active: bool,
    pub created: i64,
    pub updated: i64,
    /// `None` means the clock runs from `created`
    pub last_check_in: Option<i64>,
    /// When the owner was last asked to check in for this message
    pub last_check_in_request: Option<i64>,
    /// Set while an evaluator is delivering this message
    pub claimed_at: Option<i64>,
    pub fired_at: Option<i64>,
    pub delivery_attempts: i32,
    pub next_attempt_at: Option<i64>,
    pub needs_review: bool,
    /// Incremented by the storage layer on every write
    pub version: i64,
}

impl Message {
    pub fn new(user_id: ID, content: MessageContent, now: i64) -> Self {
        Self {
            id: Default::default(),
            user_id,
            subject: content.subject,
            content: content.content,
            recipients: content.recipients,
            trigger: content.trigger,
            active: true,
            created: now,
            updated: now,
            // Seeding the check in gives a full trigger duration of grace
            last_check_in: Some(now),
            last_check_in_request: None,
            claimed_at: None,
            fired_at: None,
            delivery_attempts: 0,
            next_attempt_at: None,
            needs_review: false,
            version: 0,
        }
    }

    /// Start of the current trigger cycle
    pub fn anchor(&self) -> i64 {
        self.last_check_in.unwrap_or(self.created)
    }

    pub fn next_reminder(&self) -> i64 {
        self.anchor() + self.trigger.duration_millis()
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed_at.is_some()
    }

    pub fn is_overdue(&self, now: i64) -> bool {
        self.active && !self.needs_review && self.next_reminder() <= now
    }

    /// Whether an evaluator running at `now` may claim this message.
    /// Claims older than `claim_timeout` are considered abandoned.
    pub fn is_claimable(&self, now: i64, claim_timeout: i64) -> bool {
        let backoff_elapsed = self.next_attempt_at.map(|at| at <= now).unwrap_or(true);
        let unclaimed = self
            .claimed_at
            .map(|claimed_at| claimed_at <= now - claim_timeout)
            .unwrap_or(true);
        self.is_overdue(now) && backoff_elapsed && unclaimed
    }

    /// When the owner should be sent a check in link for the current cycle
    pub fn check_in_request_at(&self, window: i64) -> i64 {
        std::cmp::max(self.anchor(), self.next_reminder() - window)
    }

    pub fn needs_check_in_request(&self, now: i64, window: i64) -> bool {
        let requested_this_cycle = self
            .last_check_in_request
            .map(|requested| requested >= self.anchor())
            .unwrap_or(false);
        self.active
            && !self.needs_review
            && !self.is_claimed()
            && !requested_this_cycle
            && self.check_in_request_at(window) <= now
    }

    pub fn state(&self, now: i64) -> MessageState {
        if self.is_claimed() {
            MessageState::Delivering
        } else if self.needs_review {
            MessageState::NeedsReview
        } else if !self.active && self.fired_at.is_some() {
            MessageState::Fired
        } else if !self.active {
            MessageState::Inactive
        } else if self.is_overdue(now) {
            MessageState::Overdue
        } else {
            MessageState::Armed
        }
    }

    /// Applies a patch and re-validates the merged result. Changing the
    /// trigger configuration restarts the clock of this message.
    pub fn apply(&mut self, patch: MessageDraft, now: i64) -> Result<(), ValidationError> {
        let content = patch.merged_onto(self).validate()?;
        let trigger_changed = content.trigger != self.trigger;

        self.subject = content.subject;
        self.content = content.content;
        self.recipients = content.recipients;
        self.trigger = content.trigger;
        if trigger_changed {
            self.last_check_in = Some(now);
        }
        self.updated = now;
        Ok(())
    }

    /// Returns `true` if the active state changed. Reactivating re-arms
    /// the message so that its next reminder is a full duration away.
    pub fn set_active(&mut self, active: bool, now: i64) -> bool {
        if self.active == active {
            return false;
        }
        if active {
            self.rearm(now);
        } else {
            self.active = false;
        }
        self.updated = now;
        true
    }

    fn rearm(&mut self, now: i64) {
        self.active = true;
        self.last_check_in = Some(now);
        self.last_check_in_request = None;
        self.delivery_attempts = 0;
        self.next_attempt_at = None;
        self.needs_review = false;
    }

    /// Starts a new cycle. Failed attempts of the previous cycle do not count
    /// against the retry budget of the new one.
    pub fn check_in(&mut self, now: i64) {
        self.last_check_in = Some(now);
        self.delivery_attempts = 0;
        self.next_attempt_at = None;
        self.updated = now;
    }

    pub fn claim(&mut self, now: i64) {
        self.claimed_at = Some(now);
    }

    pub fn mark_fired(&mut self, now: i64) {
        self.active = false;
        self.fired_at = Some(now);
        self.claimed_at = None;
        self.delivery_attempts = 0;
        self.next_attempt_at = None;
        self.updated = now;
    }

    /// Delivered by the last claim, as opposed to failed or parked for review
    pub fn is_fired(&self) -> bool {
        !self.active && !self.needs_review && self.fired_at.is_some()
    }

    /// Whether the outcome of a claim on this message must give way to a
    /// check in stored while the delivery was in flight.
    pub fn superseded_by_check_in(&self, stored_last_check_in: Option<i64>) -> bool {
        !self.is_fired() && stored_last_check_in != self.last_check_in
    }

    /// Merges the outcome of a claim onto the currently `stored` message.
    /// The check in state of the stored message always wins, and a failed
    /// attempt is discarded if the owner checked in meanwhile.
    pub fn released_onto(&self, stored: &Message) -> Message {
        let mut released = Message {
            last_check_in: stored.last_check_in,
            last_check_in_request: stored.last_check_in_request,
            version: stored.version,
            ..self.clone()
        };
        released.claimed_at = None;
        if self.superseded_by_check_in(stored.last_check_in) {
            released.active = true;
            released.needs_review = false;
            released.delivery_attempts = 0;
            released.next_attempt_at = None;
        }
        released
    }

    /// Releases the claim after a failed delivery and either schedules the
    /// next attempt or, when the policy is exhausted, parks the message for review.
    pub fn register_failed_delivery(&mut self, now: i64, policy: &RetryPolicy) -> FailedDelivery {
        self.claimed_at = None;
        self.delivery_attempts += 1;
        self.updated = now;
        if self.delivery_attempts >= policy.max_attempts {
            self.active = false;
            self.needs_review = true;
            self.next_attempt_at = None;
            FailedDelivery::Exhausted
        } else {
            let retry_at = now + policy.backoff_after(self.delivery_attempts);
            self.next_attempt_at = Some(retry_at);
            FailedDelivery::RetryAt(retry_at)
        }
    }
}

impl Entity<ID> for Message {
    fn id(&self) -> ID {
        self.id
    }
}
