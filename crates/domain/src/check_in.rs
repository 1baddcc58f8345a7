use crate::shared::entity::ID;
use silent_guard_utils::create_random_secret;
use url::Url;

const TOKEN_LEN: usize = 48;

/// Single use credential that lets a user check in without a session.
/// It is delivered out of band as part of a confirmation link.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInToken {
    pub token: String,
    pub user_id: ID,
    pub issued_at: i64,
    pub expires_at: i64,
    pub consumed_at: Option<i64>,
}

impl CheckInToken {
    pub fn new(user_id: ID, now: i64, ttl_millis: i64) -> Self {
        Self {
            token: create_random_secret(TOKEN_LEN),
            user_id,
            issued_at: now,
            expires_at: now + ttl_millis,
            consumed_at: None,
        }
    }

    pub fn is_usable(&self, now: i64) -> bool {
        self.consumed_at.is_none() && now < self.expires_at
    }

    pub fn consume(&mut self, now: i64) {
        self.consumed_at = Some(now);
    }
}

/// Builds the link the user follows to check in, e.g. `https://app.example?confirmation=<token>`
pub fn check_in_link(base_url: &Url, token: &CheckInToken) -> String {
    let mut link = base_url.clone();
    link.query_pairs_mut()
        .append_pair("confirmation", &token.token);
    link.to_string()
}
