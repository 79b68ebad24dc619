// web-server/src/state.rs
use actix::Addr;
use actix_web::{http::header, web, HttpRequest};
use common::models::client::{ClientContext, ContextResult};
use common::{validate_jwt_token, Config, LockTable, SharedStore, Vanguard};
use std::sync::Arc;

use crate::client_registry::{ClientRegistryActor, GetClientContext, GetClientContextById};
use crate::error::ApiError;

/// Shared by every worker. One store and one lock table serve all client
/// contexts; each request gets its own [`Vanguard`] bound to its scope.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub locks: Arc<LockTable>,
    pub config: Arc<Config>,
    pub registry: Addr<ClientRegistryActor>,
}

impl AppState {
    pub fn new(store: SharedStore, config: Config, registry: Addr<ClientRegistryActor>) -> Self {
        Self {
            store,
            locks: Arc::new(LockTable::new()),
            config: Arc::new(config),
            registry,
        }
    }

    pub fn vanguard(&self, context: &ClientContext) -> Vanguard {
        Vanguard::new(self.store.clone(), self.locks.clone(), &self.config, context.scope())
    }

    pub fn jwt_secret(&self) -> &[u8] {
        self.config.security.jwt_secret.as_bytes()
    }

    /// Identify the calling browser: the context cookie first, then a
    /// bearer token issued at login.
    pub async fn lookup_client(&self, req: &HttpRequest) -> Result<ContextResult, ApiError> {
        if let Some(cookie) = req.cookie(&self.config.session.cookie_name) {
            let context_token = cookie.value().to_string();
            return Ok(self.registry.send(GetClientContext { context_token }).await?);
        }

        if let Some(token) = bearer_token(req) {
            let (client_id, wallet) = match validate_jwt_token(token, self.jwt_secret()) {
                Ok(claims) => claims,
                Err(e) => {
                    tracing::warn!("Rejected bearer token: {}", e);
                    return Ok(ContextResult::NotFound);
                }
            };
            let context = match self.registry.send(GetClientContextById { client_id }).await? {
                ContextResult::Success(context) => context,
                other => return Ok(other),
            };
            return self.bind_token_wallet(context, wallet).await;
        }

        Ok(ContextResult::NotFound)
    }

    // A token is only good while its wallet is the one logged in on the context
    async fn bind_token_wallet(&self, context: ClientContext, wallet: String) -> Result<ContextResult, ApiError> {
        let sessions = self.vanguard(&context).sessions().clone();
        let session = blocking(move || sessions.current_session()).await?;

        match session {
            Some(session) if session.is_authenticated && session.wallet_address == wallet => {
                Ok(ContextResult::Success(context))
            }
            _ => {
                tracing::warn!(
                    "Bearer token for {} no longer matches the session of client {}",
                    wallet,
                    context.client_id
                );
                Ok(ContextResult::NotFound)
            }
        }
    }

    pub async fn require_client(&self, req: &HttpRequest) -> Result<ClientContext, ApiError> {
        match self.lookup_client(req).await? {
            ContextResult::Success(context) => Ok(context),
            ContextResult::Expired => Err(ApiError::ClientExpired),
            ContextResult::NotFound => Err(ApiError::NoClient),
        }
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Run a library call on the blocking pool; Argon2 and file I/O stay off
/// the async workers.
pub async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> common::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(web::block(f).await??)
}
