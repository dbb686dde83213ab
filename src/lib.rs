use std::sync::Arc;

pub mod config;
pub mod domain {
    pub mod invoice;
    pub mod ledger;
    pub mod payment;
    pub mod settings;
}
pub mod error;
pub mod gateways;
pub mod http {
    pub mod errors;
    pub mod identity;
    pub mod routes;
    pub mod handlers {
        pub mod admin;
        pub mod callbacks;
        pub mod ops;
        pub mod payments;
    }
    pub mod middleware {
        pub mod admin_auth;
        pub mod rate_limit;
    }
}
pub mod repo {
    pub mod ledger_repo;
    pub mod memory_ledger_repo;
    pub mod pg_ledger_repo;
    pub mod settings_repo;
    pub mod special_requests_repo;
}
pub mod service {
    pub mod callback_handler;
    pub mod invoice_issuer;
    pub mod ledger;
    pub mod reconciliation;
    pub mod redirect_builder;
    pub mod statistics;
}

use config::GatewayConfig;
use repo::ledger_repo::LedgerStore;
use repo::settings_repo::SettingsSource;
use repo::special_requests_repo::SpecialRequestDirectory;
use service::callback_handler::GatewayCallbackHandler;
use service::invoice_issuer::InvoiceIssuer;
use service::ledger::Ledger;
use service::reconciliation::ReconciliationAuthority;
use service::redirect_builder::SignedRedirectBuilder;
use service::statistics::StatisticsProjector;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub redirects: SignedRedirectBuilder,
    pub callbacks: GatewayCallbackHandler,
    pub invoices: InvoiceIssuer,
    pub reconciliation: ReconciliationAuthority,
    pub statistics: StatisticsProjector,
    /// `None` when running on the in-memory ledger.
    pub pool: Option<sqlx::PgPool>,
    pub redis_client: redis::Client,
    pub stale_pending_hours: i64,
}

impl AppState {
    /// Wires every component around one shared ledger store.
    pub fn assemble(
        store: Arc<dyn LedgerStore>,
        settings: Arc<dyn SettingsSource>,
        special_requests: Arc<dyn SpecialRequestDirectory>,
        gateway: GatewayConfig,
        pool: Option<sqlx::PgPool>,
        redis_client: redis::Client,
        stale_pending_hours: i64,
    ) -> Self {
        let ledger = Ledger {
            store: store.clone(),
            settings,
            special_requests,
        };
        let redirects = SignedRedirectBuilder::new(gateway);

        Self {
            callbacks: GatewayCallbackHandler {
                ledger: ledger.clone(),
                redirects: redirects.clone(),
            },
            invoices: InvoiceIssuer {
                ledger: ledger.clone(),
            },
            reconciliation: ReconciliationAuthority {
                ledger: ledger.clone(),
            },
            statistics: StatisticsProjector { store },
            ledger,
            redirects,
            pool,
            redis_client,
            stale_pending_hours,
        }
    }
}
