//! Per pull request comment counters for the read-comments tracker

use std::sync::Arc;

use serde_json::Value;

use super::{set_one, KeyValueStore, StoreError};

/// Storage key for the last seen comment count of a pull request
pub fn comment_count_key(owner: &str, repo: &str, number: u64) -> String {
    format!("pr-comments-{}-{}-{}", owner, repo, number)
}

/// Last seen comment counts, kept in the unsynced local area
#[derive(Clone)]
pub struct CommentCounts {
    store: Arc<dyn KeyValueStore>,
}

impl CommentCounts {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn get(&self, owner: &str, repo: &str, number: u64) -> Result<Option<u64>, StoreError> {
        let value = self.store.get(&comment_count_key(owner, repo, number))?;
        Ok(value.as_ref().and_then(Value::as_u64))
    }

    pub fn record(&self, owner: &str, repo: &str, number: u64, count: u64) -> Result<(), StoreError> {
        set_one(
            self.store.as_ref(),
            &comment_count_key(owner, repo, number),
            Value::from(count),
        )
    }

    /// Number of comments added since the last recorded visit
    pub fn unread(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        current: u64,
    ) -> Result<u64, StoreError> {
        Ok(match self.get(owner, repo, number)? {
            Some(seen) => current.saturating_sub(seen),
            None => current,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StorageArea};

    #[test]
    fn test_key_shape() {
        assert_eq!(
            comment_count_key("facebook", "react", 42),
            "pr-comments-facebook-react-42"
        );
    }

    #[test]
    fn test_unread_counts() {
        let counts = CommentCounts::new(Arc::new(MemoryStore::new(StorageArea::Local)));
        assert_eq!(counts.unread("o", "r", 1, 5).unwrap(), 5);

        counts.record("o", "r", 1, 3).unwrap();
        assert_eq!(counts.get("o", "r", 1).unwrap(), Some(3));
        assert_eq!(counts.unread("o", "r", 1, 5).unwrap(), 2);
        assert_eq!(counts.unread("o", "r", 1, 1).unwrap(), 0);
    }
}
