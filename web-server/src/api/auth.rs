// web-server/src/api/auth.rs
use actix_web::{post, web, HttpRequest, HttpResponse};
use common::models::UserSession;
use common::{generate_jwt_token, AuthState, RegistrationForm};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::{blocking, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub wallet_id: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRegistrationRequest {
    pub wallet_id: String,
    pub password: String,
    #[serde(default)]
    pub backup_confirmed: bool,
}

/// Session plus where the router sends the user next, and a bearer token
/// for clients that can't keep the cookie
fn session_response(state: &AppState, client_id: &Uuid, session: &UserSession) -> Result<HttpResponse, ApiError> {
    let token = generate_jwt_token(client_id, &session.wallet_address, state.jwt_secret())
        .map_err(|e| ApiError::Internal(format!("token generation failed: {}", e)))?;
    let redirect = AuthState::from_session(Some(session)).target().path();

    Ok(HttpResponse::Ok().json(json!({
        "session": session,
        "token": token,
        "redirect": redirect,
    })))
}

// Validate the form and create the wallet; the phrase is shown once
#[post("/register")]
pub async fn register(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Json<RegistrationForm>,
) -> Result<HttpResponse, ApiError> {
    let context = state.require_client(&req).await?;
    let app = state.vanguard(&context);
    let form = form.into_inner();

    let pending = blocking(move || app.begin_registration(&form)).await?;
    Ok(HttpResponse::Created().json(pending))
}

#[post("/register/complete")]
pub async fn complete_registration(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CompleteRegistrationRequest>,
) -> Result<HttpResponse, ApiError> {
    let context = state.require_client(&req).await?;
    let app = state.vanguard(&context);
    let body = body.into_inner();

    let session = blocking(move || {
        app.complete_registration(&body.wallet_id, &body.password, body.backup_confirmed)
    })
    .await?;

    tracing::info!("Registration completed for client {}", context.client_id);
    session_response(&state, &context.client_id, &session)
}

#[post("/auth/login")]
pub async fn login(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let context = state.require_client(&req).await?;
    let app = state.vanguard(&context);
    let body = body.into_inner();

    let session = blocking(move || app.authenticate(&body.wallet_id, &body.password)).await?;
    session_response(&state, &context.client_id, &session)
}

#[post("/auth/logout")]
pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let context = state.require_client(&req).await?;
    let app = state.vanguard(&context);

    blocking(move || app.logout()).await?;
    Ok(HttpResponse::Ok().json(json!({ "redirect": AuthState::Unauthenticated.target().path() })))
}
