use actix_web::{
    middleware::{NormalizePath, TrailingSlash},
    web::{Data, JsonConfig},
    App, HttpServer,
};
use tracing::level_filters::LevelFilter;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter, FmtSubscriber};

pub mod api;
pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod guard;
pub mod id;
pub mod message;
pub mod service;
pub mod stats;
pub mod store;
pub mod subscription;
pub mod topic;

use config::Config;
use service::Service;

/// Boots the broker and serves until the process is stopped.
pub async fn run(config: Config) -> eyre::Result<()> {
    #[cfg(debug_assertions)]
    FmtSubscriber::builder()
        .pretty()
        .with_env_filter(
            EnvFilter::builder()
                .with_env_var("FANOUT_LOG")
                .with_default_directive(LevelFilter::INFO.into())
                .from_env()?,
        )
        .finish()
        .try_init()?;

    #[cfg(not(debug_assertions))]
    FmtSubscriber::builder()
        .json()
        .with_env_filter(
            EnvFilter::builder()
                .with_env_var("FANOUT_LOG")
                .with_default_directive(LevelFilter::INFO.into())
                .from_env()?,
        )
        .finish()
        .try_init()?;

    let service = Service::open_with(config.clone())?;
    let data = Data::new(service);

    tracing::info!(host = config.host(), port = config.port(), "broker listening");

    HttpServer::new(move || {
        let json_cfg = JsonConfig::default().content_type_required(false);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(NormalizePath::new(TrailingSlash::Trim))
            .service(api::topic::service())
            .service(api::subscription::service())
            .service(api::stats::service())
            .app_data(json_cfg)
            .app_data(data.clone())
    })
    .bind((config.host().to_owned(), config.port()))?
    .run()
    .await?;

    Ok(())
}
