use serde::{Deserialize, Serialize};

pub mod get_last_check_in {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub last_check_in: Option<i64>,
    }
}

pub mod request_check_in_link {
    /// Responds with `204 No Content` once the link has been sent
    pub type APIResponse = ();
}

pub mod confirm_check_in {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    pub struct PathParams {
        pub token: String,
    }

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub last_check_in: i64,
        /// Earliest deadline among the active messages of the user
        pub next_reminder: Option<i64>,
    }
}
