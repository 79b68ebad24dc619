// web-server/src/api/wallets.rs
use actix_web::{get, post, put, web, HttpRequest, HttpResponse};
use common::models::{WalletMetadata, WalletSummary};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::state::{blocking, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverRequest {
    pub phrase: String,
    pub new_password: String,
    pub confirm_password: String,
}

// Wallets known to this deployment, without key material
#[get("/wallets")]
pub async fn list_wallets(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let context = state.require_client(&req).await?;
    let app = state.vanguard(&context);

    let wallets = blocking(move || app.wallets().get_all_wallets()).await?;
    let summaries: Vec<WalletSummary> = wallets.iter().map(WalletSummary::from).collect();
    Ok(HttpResponse::Ok().json(summaries))
}

// A fresh phrase, not bound to any wallet
#[get("/wallets/phrase")]
pub async fn generate_phrase(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let context = state.require_client(&req).await?;
    let phrase = state.vanguard(&context).wallets().generate_recovery_phrase()?;
    Ok(HttpResponse::Ok().json(json!({ "words": phrase.words() })))
}

#[post("/wallets/recover")]
pub async fn recover_wallet(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<RecoverRequest>,
) -> Result<HttpResponse, ApiError> {
    let context = state.require_client(&req).await?;
    let app = state.vanguard(&context);
    let body = body.into_inner();

    let wallet = blocking(move || app.recover(&body.phrase, &body.new_password, &body.confirm_password)).await?;
    Ok(HttpResponse::Ok().json(WalletSummary::from(&wallet)))
}

#[get("/wallets/{wallet_id}/metadata")]
pub async fn get_metadata(
    path: web::Path<String>,
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let context = state.require_client(&req).await?;
    let app = state.vanguard(&context);
    let wallet_id = path.into_inner();

    let metadata = blocking(move || app.wallets().wallet_metadata(&wallet_id)).await?;
    Ok(HttpResponse::Ok().json(metadata))
}

#[put("/wallets/{wallet_id}/metadata")]
pub async fn update_metadata(
    path: web::Path<String>,
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<WalletMetadata>,
) -> Result<HttpResponse, ApiError> {
    let context = state.require_client(&req).await?;
    let app = state.vanguard(&context);
    let wallet_id = path.into_inner();
    let metadata = body.into_inner();

    let updated = blocking(move || app.wallets().update_wallet_metadata(&wallet_id, metadata)).await?;
    Ok(HttpResponse::Ok().json(updated))
}
