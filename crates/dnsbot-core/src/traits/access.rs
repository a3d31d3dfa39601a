//! Access gate
//!
//! The gate runs in front of the engine. The engine itself assumes every
//! message it sees comes from an allowed identity.

use crate::model::UserId;
use std::collections::HashSet;

/// Predicate deciding whether a user may issue commands
pub trait AccessPolicy: Send + Sync {
    fn is_allowed(&self, user: UserId) -> bool;
}

/// Whitelist of user ids
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    users: HashSet<UserId>,
}

impl AllowList {
    pub fn new(users: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            users: users.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl AccessPolicy for AllowList {
    fn is_allowed(&self, user: UserId) -> bool {
        self.users.contains(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_admits_only_listed_users() {
        let policy = AllowList::new([UserId(42), UserId(7)]);

        assert!(policy.is_allowed(UserId(42)));
        assert!(policy.is_allowed(UserId(7)));
        assert!(!policy.is_allowed(UserId(1)));
        assert_eq!(policy.len(), 2);
    }

    #[test]
    fn empty_allow_list_admits_nobody() {
        let policy = AllowList::default();
        assert!(policy.is_empty());
        assert!(!policy.is_allowed(UserId(42)));
    }
}
