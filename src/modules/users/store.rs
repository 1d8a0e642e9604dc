//! Account records, unique by username.

use shelf_db::{Record, RecordId, StoreError, Table};

use super::models::User;

pub struct UserStore {
    users: Table<User>,
}

impl UserStore {
    pub fn new() -> Self {
        Self {
            users: Table::new(),
        }
    }

    /// Insert a new account; usernames are unique across the store.
    pub fn create(&self, user: User) -> Result<Record<User>, StoreError> {
        self.users.try_insert(user, "username", |existing, candidate| {
            existing.username == candidate.username
        })
    }

    pub fn get(&self, id: RecordId) -> Option<Record<User>> {
        self.users.get(id)
    }

    pub fn find_by_username(&self, username: &str) -> Option<Record<User>> {
        self.users.find(|user| user.username == username)
    }

    pub fn count(&self) -> usize {
        self.users.len()
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}
