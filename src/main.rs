use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use dotenvy::dotenv;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod jobs;
mod model;
mod models;
mod notify;
mod routes;
mod service;
mod store;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::notify::MySqlNotifier;
use crate::service::{AttendanceService, CorrectionService, DailyBatchProcessor, PayrollService};
use crate::store::mysql::{MySqlAttendanceStore, MySqlDirectory, MySqlPayrollStore};
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env().context("Invalid configuration")?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config).await?;

    let policy = config.shift_policy();
    let attendance_store = Arc::new(MySqlAttendanceStore::new(pool.clone()));
    let directory = Arc::new(MySqlDirectory::new(pool.clone(), config.directory_cache_ttl));
    let notifier = Arc::new(MySqlNotifier::new(pool.clone()));

    let attendance = Data::new(AttendanceService::new(
        attendance_store.clone(),
        directory.clone(),
        notifier.clone(),
        policy,
    ));
    let corrections = Data::new(CorrectionService::new(
        attendance_store.clone(),
        notifier.clone(),
        policy,
    ));
    let payroll = Data::new(PayrollService::new(
        Arc::new(MySqlPayrollStore::new(pool.clone())),
        attendance_store.clone(),
        directory.clone(),
        notifier.clone(),
        config.payroll_working_days,
    ));
    let batch = Arc::new(DailyBatchProcessor::new(
        attendance_store.clone(),
        policy,
        config.daily_batch_max,
    ));

    if config.daily_batch_enabled {
        actix_web::rt::spawn(jobs::daily_attendance::run_scheduler(
            batch.clone(),
            config.clone(),
        ));
    } else {
        info!("Daily attendance batch timer disabled");
    }

    let batch = Data::from(batch);
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(attendance.clone())
            .app_data(corrections.clone())
            .app_data(payroll.clone())
            .app_data(batch.clone())
            // Configure protected routes and the device webhook with rate limiting
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
