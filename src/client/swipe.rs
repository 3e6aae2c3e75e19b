use tracing::warn;

use crate::db::User;

use super::Api;

/// The swipe stub: a cursor going round the user list. Likes and skips
/// only move the cursor.
#[derive(Debug, Default)]
pub struct SwipeDeck {
    users: Vec<User>,
    index: usize,
}

impl SwipeDeck {
    pub fn with_users(users: Vec<User>) -> Self {
        Self { users, index: 0 }
    }

    pub async fn refresh(&mut self, api: &Api) {
        match api.list_users().await {
            Ok(users) => {
                self.users = users;
                if self.index >= self.users.len() {
                    self.index = 0;
                }
            }
            Err(e) => warn!("Failed to fetch users: {e:#}"),
        }
    }

    pub fn current(&self) -> Option<&User> {
        self.users.get(self.index)
    }

    pub fn like(&mut self) {
        self.advance();
    }

    pub fn skip(&mut self) {
        self.advance();
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn advance(&mut self) {
        if self.users.is_empty() {
            return;
        }
        self.index = (self.index + 1) % self.users.len();
    }
}
