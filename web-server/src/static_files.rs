// web-server/src/static_files.rs
use actix_web::{http::header, web, Error, HttpRequest, HttpResponse};
use actix_files::{Files, NamedFile};
use common::models::client::ContextResult;
use common::models::Role;
use common::router::{LOGIN_PATH, REGISTER_PATH, ROLE_SELECTION_PATH};
use common::{GateDecision, Route, StaticFilesConfig};
use std::path::PathBuf;

use crate::state::{blocking, AppState};

fn index_path(config: &StaticFilesConfig) -> PathBuf {
    PathBuf::from(&config.path).join(&config.index)
}

fn see_other(route: Route) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, route.path()))
        .finish()
}

async fn serve_index(req: &HttpRequest, state: &AppState) -> Result<HttpResponse, Error> {
    let file = NamedFile::open(index_path(&state.config.static_files))?;
    Ok(file.into_response(req))
}

// Login, register and role selection need no session
async fn public_page(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    serve_index(&req, &state).await
}

// `/` goes wherever the router says
async fn root(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let context = match state.lookup_client(&req).await? {
        ContextResult::Success(context) => context,
        _ => return Ok(see_other(Route::Login)),
    };
    let app = state.vanguard(&context);
    let route = blocking(move || app.route()).await?;
    Ok(see_other(route))
}

// Dashboard pages render only when the gate allows it
async fn dashboard_page(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let context = match state.lookup_client(&req).await? {
        ContextResult::Success(context) => context,
        _ => {
            tracing::debug!("Unidentified client on {}, redirecting to login", req.path());
            return Ok(see_other(Route::Login));
        }
    };

    let app = state.vanguard(&context);
    let path = req.path().to_string();
    match blocking(move || app.gate(&path)).await? {
        GateDecision::Render(_) => serve_index(&req, &state).await,
        GateDecision::Redirect(route) => Ok(see_other(route)),
        // The server resolves the session before answering
        GateDecision::Loading => serve_index(&req, &state).await,
    }
}

// SPA fallback for unmatched routes
async fn spa_index(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    if req.path().starts_with("/api/") {
        return Ok(HttpResponse::NotFound().finish());
    }
    serve_index(&req, &state).await
}

/// Page routes, static assets and the SPA fallback. Register after the API.
pub fn configure(cfg: &mut web::ServiceConfig, config: &StaticFilesConfig) {
    cfg.route("/", web::get().to(root));

    for path in [LOGIN_PATH, REGISTER_PATH, ROLE_SELECTION_PATH] {
        cfg.route(path, web::get().to(public_page));
    }

    for role in Role::ALL {
        let root = role.dashboard_path();
        cfg.route(root, web::get().to(dashboard_page))
            .route(&format!("{}/{{tail:.*}}", root), web::get().to(dashboard_page));
    }

    cfg.service(
        Files::new("/", &config.path)
            .index_file(&config.index)
            .prefer_utf8(true)
            .use_etag(true)
            .use_last_modified(true)
    )
    .default_service(web::route().to(spa_index));
}
