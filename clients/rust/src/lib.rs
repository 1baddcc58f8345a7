mod base;
mod check_in;
mod message;
mod status;
mod user;

pub(crate) use base::BaseClient;
pub use base::{APIError, APIErrorVariant, APIResponse};
use check_in::CheckInClient;
use message::MessageClient;
pub use message::{CreateMessageInput, UpdateMessageInput};
pub use silent_guard_api_structs::dtos::*;
pub use silent_guard_api_structs::MessageBody;
pub use silent_guard_domain::{MessageState, TriggerUnit, ID};
use status::StatusClient;
use std::sync::Arc;
use user::UserClient;

pub use silent_guard_api_structs::dtos::MessageDTO as Message;
pub use silent_guard_api_structs::dtos::UserDTO as User;

/// Silent Guard Server SDK
///
/// The SDK contains methods for interacting with the Silent Guard server
/// API on behalf of a single user.
#[derive(Clone)]
pub struct SilentGuardSDK {
    pub check_in: CheckInClient,
    pub message: MessageClient,
    pub status: StatusClient,
    pub user: UserClient,
}

impl SilentGuardSDK {
    /// Client for the endpoints that need no authentication
    pub fn new(address: String) -> Self {
        Self::create(BaseClient::new(address))
    }

    /// Client authenticated with a bearer token issued by the identity provider
    pub fn with_token<T: Into<String>>(address: String, token: T) -> Self {
        let mut base = BaseClient::new(address);
        base.set_bearer_token(token.into());
        Self::create(base)
    }

    fn create(base: BaseClient) -> Self {
        let base = Arc::new(base);
        Self {
            check_in: CheckInClient::new(base.clone()),
            message: MessageClient::new(base.clone()),
            status: StatusClient::new(base.clone()),
            user: UserClient::new(base),
        }
    }
}
