// web-server/src/api/mod.rs
pub mod auth;
pub mod profile;
pub mod sessions;
pub mod wallets;

pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(
        actix_web::web::scope("/api")
            .service(sessions::api_index)
            .service(sessions::create_client)
            .service(sessions::get_client_info)
            .service(sessions::invalidate_session)
            .service(sessions::registry_metrics)
            .service(wallets::list_wallets)
            .service(wallets::generate_phrase)
            .service(wallets::recover_wallet)
            .service(wallets::get_metadata)
            .service(wallets::update_metadata)
            .service(auth::register)
            .service(auth::complete_registration)
            .service(auth::login)
            .service(auth::logout)
            .service(profile::current_session)
            .service(profile::set_role)
            .service(profile::update_profile)
            .service(profile::shell)
    );
}
