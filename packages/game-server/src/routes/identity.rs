use serde::Deserialize;
use shared::models::identity::Identity;
use uuid::Uuid;

/// Caller identity as passed in the query string. Authentication happens in
/// front of this service.
#[derive(Debug, Default, Deserialize)]
pub struct IdentityParams {
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub session_key: Option<String>,
}

impl IdentityParams {
    /// Registered when both `user_id` and `username` are present, otherwise
    /// the given anonymous session, otherwise a fresh anonymous session.
    pub fn into_identity(self) -> Identity {
        match (self.user_id, self.username, self.session_key) {
            (Some(id), Some(username), _) if !id.is_empty() && !username.is_empty() => {
                Identity::Registered { id, username }
            }
            (_, _, Some(session_key)) if !session_key.is_empty() => {
                Identity::Anonymous { session_key }
            }
            _ => Identity::Anonymous {
                session_key: Uuid::new_v4().to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_identity() {
        let params = IdentityParams {
            user_id: Some("u1".to_string()),
            username: Some("alice".to_string()),
            session_key: Some("ignored".to_string()),
        };

        assert_eq!(params.into_identity(), Identity::registered("u1", "alice"));
    }

    #[test]
    fn test_anonymous_identity() {
        let params = IdentityParams {
            user_id: Some("u1".to_string()),
            session_key: Some("s1".to_string()),
            ..Default::default()
        };

        assert_eq!(params.into_identity(), Identity::anonymous("s1"));
    }

    #[test]
    fn test_fresh_session_for_unknown_callers() {
        let first = IdentityParams::default().into_identity();
        let second = IdentityParams::default().into_identity();

        assert!(matches!(first, Identity::Anonymous { .. }));
        assert_ne!(first, second);
    }
}
