mod check_in;
mod date;
mod delivery;
mod message;
mod shared;
mod user;
mod validation;

pub use check_in::{check_in_link, CheckInToken};
pub use date::format_duration;
pub use delivery::{CheckInRequest, ContentEnvelope};
pub use message::{
    FailedDelivery, Message, MessageContent, MessageDraft, MessageState, RetryPolicy,
    TriggerConfig, TriggerUnit, MAX_RECIPIENTS, MAX_SUBJECT_LENGTH, MAX_TRIGGER_DAYS,
    MILLIS_PER_DAY, MILLIS_PER_HOUR, MILLIS_PER_MINUTE,
};
pub use shared::entity::{Entity, ID};
pub use user::User;
pub use validation::{validate_email, FieldIssue, ValidationError};
