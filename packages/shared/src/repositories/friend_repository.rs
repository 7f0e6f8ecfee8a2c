use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::{types::AttributeValue, Client};
use parking_lot::Mutex;

use crate::models::friend::FriendStatus;
use crate::repositories::errors::friend_repository_errors::FriendRepositoryError;

/// Read-only view of the friend graph.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FriendRepository: Send + Sync {
    /// Status of `from_user_id` towards `to_user_id`. Fails when both are the same user.
    async fn friend_status(
        &self,
        from_user_id: &str,
        to_user_id: &str,
    ) -> Result<FriendStatus, FriendRepositoryError>;
}

/// Friendships table: one item per directed pair, keyed by `user_id` and
/// `other_user_id`, carrying a `status` attribute. A missing item means the
/// users are not related.
pub struct DynamoDbFriendRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbFriendRepository {
    pub fn new(client: Client, table_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
        }
    }
}

#[async_trait]
impl FriendRepository for DynamoDbFriendRepository {
    async fn friend_status(
        &self,
        from_user_id: &str,
        to_user_id: &str,
    ) -> Result<FriendStatus, FriendRepositoryError> {
        if from_user_id == to_user_id {
            return Err(FriendRepositoryError::SameUser);
        }

        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("user_id", AttributeValue::S(from_user_id.to_string()))
            .key("other_user_id", AttributeValue::S(to_user_id.to_string()))
            .send()
            .await
            .map_err(|e| FriendRepositoryError::DynamoDb(e.to_string()))?;

        let Some(item) = result.item else {
            return Ok(FriendStatus::NotFriends);
        };

        let status = item
            .get("status")
            .and_then(|value| value.as_s().ok())
            .ok_or_else(|| {
                FriendRepositoryError::Serialization("Missing status attribute".to_string())
            })?;

        Ok(FriendStatus::from_stored(status))
    }
}

#[derive(Default)]
pub struct InMemoryFriendRepository {
    statuses: Mutex<HashMap<(String, String), FriendStatus>>,
}

impl InMemoryFriendRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a friendship in both directions.
    pub fn add_friends(&self, user_a: &str, user_b: &str) {
        let mut statuses = self.statuses.lock();
        statuses.insert((user_a.to_string(), user_b.to_string()), FriendStatus::Friends);
        statuses.insert((user_b.to_string(), user_a.to_string()), FriendStatus::Friends);
    }

    /// Records a pending request from `from` to `to`.
    pub fn add_request(&self, from: &str, to: &str) {
        let mut statuses = self.statuses.lock();
        statuses.insert((from.to_string(), to.to_string()), FriendStatus::FriendRequestSent);
        statuses.insert((to.to_string(), from.to_string()), FriendStatus::FriendRequestReceived);
    }
}

#[async_trait]
impl FriendRepository for InMemoryFriendRepository {
    async fn friend_status(
        &self,
        from_user_id: &str,
        to_user_id: &str,
    ) -> Result<FriendStatus, FriendRepositoryError> {
        if from_user_id == to_user_id {
            return Err(FriendRepositoryError::SameUser);
        }

        Ok(self
            .statuses
            .lock()
            .get(&(from_user_id.to_string(), to_user_id.to_string()))
            .copied()
            .unwrap_or(FriendStatus::NotFriends))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_friend_status_lookup() {
        let repository = InMemoryFriendRepository::new();
        repository.add_friends("alice", "bob");
        repository.add_request("alice", "carol");

        assert_eq!(
            repository.friend_status("bob", "alice").await.unwrap(),
            FriendStatus::Friends
        );
        assert_eq!(
            repository.friend_status("alice", "carol").await.unwrap(),
            FriendStatus::FriendRequestSent
        );
        assert_eq!(
            repository.friend_status("carol", "alice").await.unwrap(),
            FriendStatus::FriendRequestReceived
        );
        assert_eq!(
            repository.friend_status("bob", "carol").await.unwrap(),
            FriendStatus::NotFriends
        );
    }

    #[tokio::test]
    async fn test_friend_status_with_self_fails() {
        let repository = InMemoryFriendRepository::new();

        let result = repository.friend_status("alice", "alice").await;

        assert!(matches!(result, Err(FriendRepositoryError::SameUser)));
    }
}
