#[derive(Debug)]
pub enum FriendRepositoryError {
    SameUser,
    Serialization(String),
    DynamoDb(String),
}

impl std::fmt::Display for FriendRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FriendRepositoryError::SameUser => {
                write!(f, "Cannot look up friend status of a user with themselves")
            }
            FriendRepositoryError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            FriendRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
        }
    }
}

impl std::error::Error for FriendRepositoryError {}
