use serde::{Deserialize, Serialize};

/// Relationship of one user towards another, as reported by the friend graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendStatus {
    Friends,
    NotFriends,
    FriendRequestSent,
    FriendRequestReceived,
}

impl FriendStatus {
    /// Parses the stored representation. Unknown values are treated as no relation.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "friends" => FriendStatus::Friends,
            "friend_request_sent" => FriendStatus::FriendRequestSent,
            "friend_request_received" => FriendStatus::FriendRequestReceived,
            _ => FriendStatus::NotFriends,
        }
    }
}
