use crate::shared::entity::{Entity, ID};

/// A person known to the identity provider. The `last_check_in` is the
/// single source of truth for when the user last proved they are alive.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: ID,
    /// Subject identifier issued by the identity provider
    pub subject: String,
    pub email: String,
    pub created: i64,
    pub last_check_in: Option<i64>,
}

impl User {
    pub fn new(subject: String, email: String, now: i64) -> Self {
        Self {
            id: Default::default(),
            subject,
            email,
            created: now,
            last_check_in: None,
        }
    }
}

impl Entity<ID> for User {
    fn id(&self) -> ID {
        self.id
    }
}
