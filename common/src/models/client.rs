// common/src/models/client.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::store::ContextScope;

/// One browser talking to the web server. Each client context owns its own
/// `current-*` keys in the store, the way each browser owns its local storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientContext {
    /// Unique client identifier
    pub client_id: Uuid,
    /// Secure token carried in the client cookie
    pub context_token: String,
    /// Timestamp when the context was created
    pub created_at: DateTime<Utc>,
    /// Timestamp of last client activity
    pub last_active: DateTime<Utc>,
}

impl ClientContext {
    pub fn new(client_id: Uuid, context_token: String) -> Self {
        let now = Utc::now();
        Self {
            client_id,
            context_token,
            created_at: now,
            last_active: now,
        }
    }

    /// Update activity timestamp
    pub fn update_activity(&mut self) {
        self.last_active = Utc::now();
    }

    /// Check if the context has been idle longer than the TTL
    pub fn is_expired(&self, ttl_seconds: i64) -> bool {
        let age = Utc::now().signed_duration_since(self.last_active);
        age.num_seconds() > ttl_seconds
    }

    pub fn scope(&self) -> ContextScope {
        ContextScope::Client(self.client_id)
    }
}

/// Result of client context lookups
#[derive(Debug, Clone)]
pub enum ContextResult {
    Success(ClientContext),
    NotFound,
    Expired,
}

/// Response body for client API endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientContextResponse {
    pub client_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub new_client: bool,
    // The context token travels only in the cookie
}

impl From<&ClientContext> for ClientContextResponse {
    fn from(context: &ClientContext) -> Self {
        Self {
            client_id: context.client_id,
            created_at: context.created_at,
            new_client: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiry() {
        let mut context = ClientContext::new(Uuid::new_v4(), "token".into());
        assert!(!context.is_expired(60));

        context.last_active = Utc::now() - Duration::seconds(120);
        assert!(context.is_expired(60));

        context.update_activity();
        assert!(!context.is_expired(60));
    }

    #[test]
    fn test_scope_is_per_client() {
        let a = ClientContext::new(Uuid::new_v4(), "a".into());
        let b = ClientContext::new(Uuid::new_v4(), "b".into());
        assert_ne!(a.scope().current_session_key(), b.scope().current_session_key());
    }
}
