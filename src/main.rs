mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod utils;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::{Logger, NormalizePath};
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use log::info;

use crate::config::AppConfig;
use crate::db::{EmployeeStore, PgEmployeeStore, PgUserStore, UserStore};
use crate::utils::upload::UploadStore;

fn cors_policy(origins: Option<&[String]>) -> Cors {
    match origins {
        None => Cors::permissive(),
        Some(origins) => origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allow_any_method()
            .allow_any_header()
            .max_age(3600),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;

    let pool = db::create_pool(&config)
        .await
        .context("Failed to connect to the database")?;
    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let uploads = UploadStore::init(&config.upload_dir, config.upload_max_bytes)
        .await
        .with_context(|| format!("Failed to create {}", config.upload_dir.display()))?;

    let employees: Arc<dyn EmployeeStore> = Arc::new(PgEmployeeStore::new(pool.clone()));
    let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
    let employees = web::Data::from(employees);
    let users = web::Data::from(users);
    let uploads = web::Data::new(uploads);
    let jwt = web::Data::new(config.jwt.clone());
    let cors_origins = config.cors_origins.clone();

    info!("Starting server at {}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(cors_policy(cors_origins.as_deref()))
            .wrap(NormalizePath::trim())
            .wrap(Logger::default())
            .app_data(employees.clone())
            .app_data(users.clone())
            .app_data(uploads.clone())
            .app_data(jwt.clone())
            .configure(handlers::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    pool.close().await;
    info!("Server stopped, database pool closed");
    Ok(())
}
