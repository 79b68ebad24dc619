// web-server/src/api/sessions.rs
use actix_web::{get, post, delete, web, HttpRequest, HttpResponse, cookie::{Cookie, SameSite}};
use actix_web::cookie::time::Duration as CookieDuration;
use common::models::client::{ClientContextResponse, ContextResult};
use serde_json::json;
use uuid::Uuid;

use crate::client_registry::{GetRegistryMetrics, RegisterClient, InvalidateClientContext};
use crate::error::ApiError;
use crate::state::AppState;

pub(crate) fn context_cookie(name: &str, value: String, max_age_seconds: i64) -> Cookie<'static> {
    Cookie::build(name.to_string(), value)
        .path("/")
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::seconds(max_age_seconds))
        .finish()
}

#[get("/")]
pub async fn api_index() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "name": "ChainVanguard API",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// Create a new client context or return the existing one
#[post("/client")]
pub async fn create_client(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    match state.lookup_client(&req).await? {
        ContextResult::Success(context) => {
            tracing::info!("Returning existing client context: {}", context.client_id);
            return Ok(HttpResponse::Ok().json(ClientContextResponse::from(&context)));
        }
        ContextResult::Expired => tracing::info!("Client context expired, creating new client"),
        ContextResult::NotFound => tracing::debug!("No client context presented, creating new client"),
    }

    let (client_id, context_token) = state.registry.send(RegisterClient).await?;
    let session = &state.config.session;
    let cookie = context_cookie(&session.cookie_name, context_token, session.ttl_seconds);

    Ok(HttpResponse::Ok().cookie(cookie).json(ClientContextResponse {
        client_id,
        created_at: chrono::Utc::now(),
        new_client: true,
    }))
}

// Get client context information; only the owning client may read it
#[get("/client/{client_id}")]
pub async fn get_client_info(
    path: web::Path<String>,
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let client_id = Uuid::parse_str(&path.into_inner())
        .map_err(|_| ApiError::BadRequest("Invalid client ID format".to_string()))?;

    let context = state.require_client(&req).await?;
    if context.client_id != client_id {
        tracing::warn!("Client ID mismatch: requested {}, context has {}", client_id, context.client_id);
        return Err(ApiError::Forbidden);
    }

    Ok(HttpResponse::Ok().json(ClientContextResponse::from(&context)))
}

// Drop the client context together with its session data
#[delete("/client/session")]
pub async fn invalidate_session(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let cookie_name = &state.config.session.cookie_name;
    let context_token = req
        .cookie(cookie_name)
        .map(|c| c.value().to_string())
        .ok_or_else(|| ApiError::BadRequest("No client cookie found".to_string()))?;

    if !state.registry.send(InvalidateClientContext { context_token }).await? {
        tracing::info!("Attempt to invalidate unknown client context");
        return Ok(HttpResponse::NotFound().json(json!({
            "error": "Client context not found",
            "code": "no_client"
        })));
    }

    Ok(HttpResponse::Ok()
        .cookie(context_cookie(cookie_name, String::new(), 0))
        .json(json!({
            "status": "success",
            "message": "Client context invalidated"
        })))
}

// Context counts for operators
#[get("/registry/metrics")]
pub async fn registry_metrics(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let metrics = state.registry.send(GetRegistryMetrics).await?;
    Ok(HttpResponse::Ok().json(metrics))
}
