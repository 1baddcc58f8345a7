use serde::{Deserialize, Serialize};
use silent_guard_domain::{User, ID};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDTO {
    pub id: ID,
    pub email: String,
    pub created: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check_in: Option<i64>,
}

impl UserDTO {
    pub fn new(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created: user.created,
            last_check_in: user.last_check_in,
        }
    }
}
