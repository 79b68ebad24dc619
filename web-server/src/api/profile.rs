// web-server/src/api/profile.rs
use actix_web::{get, patch, put, web, HttpRequest, HttpResponse};
use common::models::{ProfileUpdate, Role, UserSession};
use common::{AuthState, GateDecision};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::state::{blocking, AppState};

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct ShellQuery {
    pub path: String,
}

fn updated_or_no_content(session: Option<UserSession>) -> HttpResponse {
    match session {
        Some(session) => HttpResponse::Ok().json(session),
        // Nothing to update without a session
        None => HttpResponse::NoContent().finish(),
    }
}

// Rehydrated session and the router's current target
#[get("/session")]
pub async fn current_session(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let context = state.require_client(&req).await?;
    let app = state.vanguard(&context);

    let session = blocking(move || app.sessions().current_session()).await?;
    let auth = AuthState::from_session(session.as_ref());

    Ok(HttpResponse::Ok().json(json!({
        "authenticated": auth.is_authenticated(),
        "session": session,
        "redirect": auth.target().path(),
    })))
}

#[put("/session/role")]
pub async fn set_role(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<RoleRequest>,
) -> Result<HttpResponse, ApiError> {
    let context = state.require_client(&req).await?;
    let app = state.vanguard(&context);
    let role = body.role;

    let session = blocking(move || app.sessions().set_user_role(role)).await?;
    Ok(updated_or_no_content(session))
}

#[patch("/session/profile")]
pub async fn update_profile(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, ApiError> {
    let context = state.require_client(&req).await?;
    let app = state.vanguard(&context);
    let update = body.into_inner();

    let session = blocking(move || app.sessions().update_profile(&update)).await?;
    Ok(updated_or_no_content(session))
}

// Gate decision for a dashboard path, for clients rendering the shell themselves
#[get("/shell")]
pub async fn shell(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<ShellQuery>,
) -> Result<HttpResponse, ApiError> {
    let context = state.require_client(&req).await?;
    let app = state.vanguard(&context);
    let path = query.into_inner().path;

    let body = match blocking(move || app.gate(&path)).await? {
        GateDecision::Render(view) => json!({ "status": "render", "view": view }),
        GateDecision::Redirect(route) => json!({ "status": "redirect", "location": route.path() }),
        GateDecision::Loading => json!({ "status": "loading" }),
    };
    Ok(HttpResponse::Ok().json(body))
}
