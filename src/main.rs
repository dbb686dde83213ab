use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use waste_payments::config::{AppConfig, LedgerBackend};
use waste_payments::domain::settings::PaymentSettings;
use waste_payments::http::middleware::rate_limit::{enforce, RateLimitState};
use waste_payments::http::routes;
use waste_payments::repo::ledger_repo::LedgerStore;
use waste_payments::repo::memory_ledger_repo::MemoryLedgerRepo;
use waste_payments::repo::pg_ledger_repo::PgLedgerRepo;
use waste_payments::repo::settings_repo::{PgSettingsRepo, SettingsSource, StaticSettings};
use waste_payments::repo::special_requests_repo::{
    MemorySpecialRequests, PgSpecialRequestsRepo, SpecialRequestDirectory,
};
use waste_payments::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let (pool, store, settings, special_requests): (
        Option<sqlx::PgPool>,
        Arc<dyn LedgerStore>,
        Arc<dyn SettingsSource>,
        Arc<dyn SpecialRequestDirectory>,
    ) = match cfg.ledger_backend {
        LedgerBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&cfg.database_url)
                .await?;

            sqlx::migrate!("./migrations").run(&pool).await?;

            (
                Some(pool.clone()),
                Arc::new(PgLedgerRepo { pool: pool.clone() }) as Arc<dyn LedgerStore>,
                Arc::new(PgSettingsRepo { pool: pool.clone() }) as Arc<dyn SettingsSource>,
                Arc::new(PgSpecialRequestsRepo { pool }) as Arc<dyn SpecialRequestDirectory>,
            )
        }
        LedgerBackend::Memory => {
            tracing::warn!("running on the in-memory ledger; state is lost on restart");
            (
                None,
                Arc::new(MemoryLedgerRepo::new()) as Arc<dyn LedgerStore>,
                Arc::new(StaticSettings::new(PaymentSettings::default())) as Arc<dyn SettingsSource>,
                Arc::new(MemorySpecialRequests::new()) as Arc<dyn SpecialRequestDirectory>,
            )
        }
    };

    let state = AppState::assemble(
        store,
        settings,
        special_requests,
        cfg.gateway.clone(),
        pool,
        redis::Client::open(cfg.redis_url.clone())?,
        cfg.stale_pending_hours,
    );

    let api_limit = RateLimitState {
        redis_client: redis::Client::open(cfg.redis_url.clone())?,
        max_per_minute: cfg.rate_limit_per_minute,
        bucket: "api",
    };
    let callback_limit = RateLimitState {
        redis_client: redis::Client::open(cfg.redis_url.clone())?,
        max_per_minute: cfg.rate_limit_per_minute,
        bucket: "callback",
    };

    let app = Router::new()
        .merge(
            routes::api_routes()
                .merge(routes::admin_routes(cfg.internal_api_key.clone()))
                .layer(from_fn_with_state(api_limit, enforce)),
        )
        .merge(routes::callback_routes().layer(from_fn_with_state(callback_limit, enforce)))
        .merge(routes::ops_routes())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(
        backend = ?cfg.ledger_backend,
        product_code = %cfg.gateway.product_code,
        "listening on {}",
        cfg.bind_addr
    );
    axum::serve(listener, app).await?;
    Ok(())
}
