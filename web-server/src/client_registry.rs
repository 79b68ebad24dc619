// web-server/src/client_registry.rs
use actix::{Actor, Context, Handler, Message, AsyncContext, MessageResult};
use chrono::Utc;
use common::models::client::{ClientContext, ContextResult};
use common::store::{SharedStore, WriteOp};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use crate::utils::token::create_session_token;

// Default context TTL in seconds (24 hours)
const DEFAULT_CONTEXT_TTL: i64 = 86400;

/// Actor message: Register a new browser context
#[derive(Message)]
#[rtype(result = "(Uuid, String)")]
pub struct RegisterClient;

/// Actor message: Get a client context by cookie token
#[derive(Message)]
#[rtype(result = "ContextResult")]
pub struct GetClientContext {
    pub context_token: String,
}

/// Actor message: Get a client context by client ID
#[derive(Message)]
#[rtype(result = "ContextResult")]
pub struct GetClientContextById {
    pub client_id: Uuid,
}

/// Actor message: Drop a client context and everything stored under its scope
#[derive(Message)]
#[rtype(result = "bool")]
pub struct InvalidateClientContext {
    pub context_token: String,
}

/// Actor message: Clean up expired contexts
#[derive(Message)]
#[rtype(result = "usize")]
pub struct CleanupExpiredContexts;

/// Actor message: Get registry metrics
#[derive(Message)]
#[rtype(result = "RegistryMetrics")]
pub struct GetRegistryMetrics;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryMetrics {
    pub total_contexts: usize,
    pub expired_count: usize,
    pub avg_context_age_seconds: f64,
}

/// ClientRegistryActor tracks one context per browser. The contexts' session
/// data lives in the shared store under `client-{id}/`; the registry removes
/// it when a context expires or is invalidated.
pub struct ClientRegistryActor {
    // Map from context token to context
    contexts: Arc<DashMap<String, ClientContext>>,
    // Map from client ID to context token
    client_lookup: Arc<DashMap<Uuid, String>>,
    store: SharedStore,
    // Context TTL in seconds
    context_ttl: i64,
    // Cleanup interval in seconds
    cleanup_interval: u64,
    metrics: RegistryMetrics,
}

impl ClientRegistryActor {
    pub fn new(store: SharedStore) -> Self {
        Self {
            contexts: Arc::new(DashMap::new()),
            client_lookup: Arc::new(DashMap::new()),
            store,
            context_ttl: DEFAULT_CONTEXT_TTL,
            cleanup_interval: 3600, // Run cleanup every hour
            metrics: RegistryMetrics::default(),
        }
    }

    pub fn with_ttl(mut self, ttl_seconds: i64) -> Self {
        self.context_ttl = ttl_seconds;
        self
    }

    pub fn with_cleanup_interval(mut self, interval_seconds: u64) -> Self {
        self.cleanup_interval = interval_seconds.max(1);
        self
    }

    fn update_metrics(&mut self) {
        let now = Utc::now();
        let total = self.contexts.len();
        let age_sum: f64 = self
            .contexts
            .iter()
            .map(|entry| now.signed_duration_since(entry.value().created_at).num_seconds() as f64)
            .sum();

        self.metrics.total_contexts = total;
        self.metrics.avg_context_age_seconds = if total > 0 { age_sum / total as f64 } else { 0.0 };
    }

    /// Delete every key stored under the context's scope
    fn purge_scope(&self, context: &ClientContext) {
        let prefix = context.scope().prefix();
        let result = self.store.keys_with_prefix(&prefix).and_then(|keys| {
            if keys.is_empty() {
                return Ok(0);
            }
            let count = keys.len();
            self.store.write_batch(keys.into_iter().map(WriteOp::delete).collect())?;
            Ok(count)
        });

        match result {
            Ok(0) => {}
            Ok(count) => tracing::debug!("Removed {} stored keys for client {}", count, context.client_id),
            Err(e) => tracing::error!("Failed to clear stored data for client {}: {}", context.client_id, e),
        }
    }

    fn remove_context(&mut self, token: &str) -> Option<ClientContext> {
        let (_, context) = self.contexts.remove(token)?;
        self.client_lookup.remove(&context.client_id);
        self.purge_scope(&context);
        Some(context)
    }

    /// Look up a context by token, refreshing its activity. An expired
    /// context is removed on the spot.
    fn touch(&mut self, token: &str) -> ContextResult {
        let expired = match self.contexts.get_mut(token) {
            Some(mut entry) => {
                let context = entry.value_mut();
                if context.is_expired(self.context_ttl) {
                    true
                } else {
                    context.update_activity();
                    tracing::debug!("Retrieved context for client: {}", context.client_id);
                    return ContextResult::Success(context.clone());
                }
            }
            None => false,
        };

        if expired {
            if let Some(context) = self.remove_context(token) {
                tracing::debug!("Context expired: {}", context.client_id);
                self.metrics.expired_count += 1;
            }
            ContextResult::Expired
        } else {
            ContextResult::NotFound
        }
    }

    /// Remove expired contexts and update metrics
    fn cleanup_contexts(&mut self) -> usize {
        let expired_tokens: Vec<String> = self
            .contexts
            .iter()
            .filter(|entry| entry.value().is_expired(self.context_ttl))
            .map(|entry| entry.key().clone())
            .collect();

        let mut expired_count = 0;
        for token in expired_tokens {
            if self.remove_context(&token).is_some() {
                expired_count += 1;
            }
        }

        self.metrics.expired_count += expired_count;
        self.update_metrics();

        expired_count
    }
}

impl Actor for ClientRegistryActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("ClientRegistryActor started with TTL: {}s", self.context_ttl);

        // Schedule periodic context cleanup
        ctx.run_interval(Duration::from_secs(self.cleanup_interval), |act, _ctx| {
            let expired_count = act.cleanup_contexts();
            if expired_count > 0 {
                tracing::info!("Cleaned up {} expired client contexts", expired_count);
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(
            "ClientRegistryActor stopped. Final metrics: {} contexts, {} expired during lifetime",
            self.metrics.total_contexts,
            self.metrics.expired_count
        );
    }
}

impl Handler<RegisterClient> for ClientRegistryActor {
    type Result = MessageResult<RegisterClient>;

    fn handle(&mut self, _msg: RegisterClient, _ctx: &mut Self::Context) -> Self::Result {
        let client_id = Uuid::new_v4();
        let context_token = create_session_token();

        let context = ClientContext::new(client_id, context_token.clone());
        self.contexts.insert(context_token.clone(), context);
        self.client_lookup.insert(client_id, context_token.clone());
        self.metrics.total_contexts = self.contexts.len();

        tracing::info!("Registered new client context: {}", client_id);

        MessageResult((client_id, context_token))
    }
}

impl Handler<GetClientContext> for ClientRegistryActor {
    type Result = MessageResult<GetClientContext>;

    fn handle(&mut self, msg: GetClientContext, _ctx: &mut Self::Context) -> Self::Result {
        let result = self.touch(&msg.context_token);
        if matches!(result, ContextResult::NotFound) {
            tracing::debug!("Context not found for presented token");
        }
        MessageResult(result)
    }
}

impl Handler<GetClientContextById> for ClientRegistryActor {
    type Result = MessageResult<GetClientContextById>;

    fn handle(&mut self, msg: GetClientContextById, _ctx: &mut Self::Context) -> Self::Result {
        let token = self.client_lookup.get(&msg.client_id).map(|entry| entry.value().clone());
        let result = match token {
            Some(token) => self.touch(&token),
            None => {
                tracing::debug!("Context not found for client ID: {}", msg.client_id);
                ContextResult::NotFound
            }
        };
        MessageResult(result)
    }
}

impl Handler<InvalidateClientContext> for ClientRegistryActor {
    type Result = MessageResult<InvalidateClientContext>;

    fn handle(&mut self, msg: InvalidateClientContext, _ctx: &mut Self::Context) -> Self::Result {
        let result = match self.remove_context(&msg.context_token) {
            Some(context) => {
                self.metrics.total_contexts = self.contexts.len();
                tracing::info!("Invalidated context for client: {}", context.client_id);
                true
            }
            None => false,
        };
        MessageResult(result)
    }
}

impl Handler<CleanupExpiredContexts> for ClientRegistryActor {
    type Result = MessageResult<CleanupExpiredContexts>;

    fn handle(&mut self, _msg: CleanupExpiredContexts, _ctx: &mut Self::Context) -> Self::Result {
        let expired_count = self.cleanup_contexts();
        tracing::info!("Cleaned up {} expired client contexts", expired_count);
        MessageResult(expired_count)
    }
}

impl Handler<GetRegistryMetrics> for ClientRegistryActor {
    type Result = MessageResult<GetRegistryMetrics>;

    fn handle(&mut self, _msg: GetRegistryMetrics, _ctx: &mut Self::Context) -> Self::Result {
        self.update_metrics();
        MessageResult(self.metrics.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::store::{ContextScope, KeyValueStore, MemoryStore};

    fn store() -> SharedStore {
        Arc::new(MemoryStore::new())
    }

    #[actix_web::test]
    async fn test_register_and_lookup() {
        let registry = ClientRegistryActor::new(store()).start();
        let (client_id, token) = registry.send(RegisterClient).await.unwrap();

        match registry.send(GetClientContext { context_token: token }).await.unwrap() {
            ContextResult::Success(context) => assert_eq!(context.client_id, client_id),
            other => panic!("unexpected {:?}", other),
        }
        match registry.send(GetClientContextById { client_id }).await.unwrap() {
            ContextResult::Success(context) => assert_eq!(context.client_id, client_id),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[actix_web::test]
    async fn test_invalidate_clears_scoped_keys() {
        let store = store();
        let registry = ClientRegistryActor::new(store.clone()).start();
        let (client_id, token) = registry.send(RegisterClient).await.unwrap();

        let scope = ContextScope::Client(client_id);
        store.set(&scope.current_session_key(), "{}".into()).unwrap();
        store.set("wallet-collection", "[]".into()).unwrap();

        assert!(registry.send(InvalidateClientContext { context_token: token.clone() }).await.unwrap());
        assert!(!registry.send(InvalidateClientContext { context_token: token }).await.unwrap());

        assert!(store.get(&scope.current_session_key()).unwrap().is_none());
        assert!(store.get("wallet-collection").unwrap().is_some());
    }

    #[actix_web::test]
    async fn test_expired_contexts_are_cleaned_up() {
        let store = store();
        let registry = ClientRegistryActor::new(store.clone()).with_ttl(-1).start();
        let (client_id, token) = registry.send(RegisterClient).await.unwrap();
        store
            .set(&ContextScope::Client(client_id).current_wallet_key(), "{}".into())
            .unwrap();

        assert_eq!(registry.send(CleanupExpiredContexts).await.unwrap(), 1);
        assert!(store.keys_with_prefix("client-").unwrap().is_empty());
        assert!(matches!(
            registry.send(GetClientContext { context_token: token }).await.unwrap(),
            ContextResult::NotFound
        ));

        let metrics = registry.send(GetRegistryMetrics).await.unwrap();
        assert_eq!(metrics.total_contexts, 0);
        assert_eq!(metrics.expired_count, 1);
    }

    #[actix_web::test]
    async fn test_expired_lookup_reports_expired() {
        let registry = ClientRegistryActor::new(store()).with_ttl(-1).start();
        let (client_id, _) = registry.send(RegisterClient).await.unwrap();
        assert!(matches!(
            registry.send(GetClientContextById { client_id }).await.unwrap(),
            ContextResult::Expired
        ));
    }
}
