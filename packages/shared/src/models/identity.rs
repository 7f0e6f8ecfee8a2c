use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Who a participant is. Registered users and anonymous sessions are compared
/// by their underlying key; `Placeholder` stands for the not-yet-known second
/// player of a link game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "user_type", rename_all = "snake_case")]
pub enum Identity {
    Registered { id: String, username: String },
    Anonymous { session_key: String },
    Placeholder,
}

impl Identity {
    pub fn registered(id: &str, username: &str) -> Self {
        Identity::Registered {
            id: id.to_string(),
            username: username.to_string(),
        }
    }

    pub fn anonymous(session_key: &str) -> Self {
        Identity::Anonymous {
            session_key: session_key.to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Identity::Placeholder)
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Identity::Registered { username, .. } => Some(username),
            _ => None,
        }
    }

    /// Reference stored with a completed game. `None` for a placeholder.
    pub fn player_ref(&self) -> Option<PlayerRef> {
        match self {
            Identity::Registered { id, username } => Some(PlayerRef::Registered {
                user_id: id.clone(),
                username: username.clone(),
            }),
            Identity::Anonymous { session_key } => Some(PlayerRef::Anonymous {
                session_key: session_key.clone(),
            }),
            Identity::Placeholder => None,
        }
    }

    fn key(&self) -> (u8, &str) {
        match self {
            Identity::Registered { id, .. } => (0, id),
            Identity::Anonymous { session_key } => (1, session_key),
            Identity::Placeholder => (2, ""),
        }
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Identity {}

impl Hash for Identity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identity::Registered { username, .. } => write!(f, "{}", username),
            Identity::Anonymous { session_key } => write!(f, "anonymous:{}", session_key),
            Identity::Placeholder => write!(f, "<placeholder>"),
        }
    }
}

/// Player reference as written to the completed-games store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "user_type", rename_all = "snake_case")]
pub enum PlayerRef {
    Registered { user_id: String, username: String },
    Anonymous { session_key: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registered_equality_uses_id_only() {
        let a = Identity::registered("user-1", "alice");
        let renamed = Identity::registered("user-1", "alice2");
        let other = Identity::registered("user-2", "alice");

        assert_eq!(a, renamed);
        assert_ne!(a, other);
    }

    #[test]
    fn test_anonymous_and_registered_never_equal() {
        let registered = Identity::registered("abc", "abc");
        let anonymous = Identity::anonymous("abc");

        assert_ne!(registered, anonymous);

        let set: HashSet<Identity> = [registered, anonymous].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_player_ref() {
        assert_eq!(
            Identity::registered("u1", "alice").player_ref(),
            Some(PlayerRef::Registered {
                user_id: "u1".to_string(),
                username: "alice".to_string()
            })
        );
        assert_eq!(Identity::Placeholder.player_ref(), None);
    }

    #[test]
    fn test_identity_serialization() {
        let serialized = serde_json::to_string(&Identity::anonymous("s1")).unwrap();
        assert_eq!(serialized, r#"{"user_type":"anonymous","session_key":"s1"}"#);
    }
}
