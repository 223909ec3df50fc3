use std::path::Path;

use actix_files::Files;
use actix_web::web;
use log::warn;

use crate::web::{handlers, middleware};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(middleware::json_config())
        .route("/config", web::get().to(handlers::config))
        .route("/favicon.ico", web::get().to(handlers::favicon))
        .route("/status", web::get().to(handlers::status))
        .route("/test-supabase", web::get().to(handlers::test_store))
        .route("/chat", web::post().to(handlers::chat));
}

/// Mounts the front-end at `/`. Must be registered after the API routes.
pub fn static_files(cfg: &mut web::ServiceConfig, public_dir: &str) {
    if Path::new(public_dir).is_dir() {
        cfg.service(Files::new("/", public_dir).index_file("index.html"));
    } else {
        warn!("Static directory {} not found; serving API routes only", public_dir);
    }
}
