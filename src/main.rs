use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use humanizer_ledger::adapters::ai::{DisabledRewriter, OpenAIConfig, OpenAIRewriter};
use humanizer_ledger::adapters::auth::JwtSessionValidator;
use humanizer_ledger::adapters::http::{build_router, AuthState, BillingAppState};
use humanizer_ledger::adapters::mpesa::{DarajaConfig, DarajaPushAdapter};
use humanizer_ledger::adapters::postgres::{
    PostgresEntitlementRepository, PostgresPaymentAttemptRepository,
};
use humanizer_ledger::adapters::stripe::{StripeCheckoutAdapter, StripeConfig};
use humanizer_ledger::application::billing::ExpireStalePaymentsHandler;
use humanizer_ledger::config::AppConfig;
use humanizer_ledger::domain::billing::{Plan, PlanCatalog};
use humanizer_ledger::domain::foundation::Timestamp;
use humanizer_ledger::ports::{PaymentAttemptRepository, TextRewriter};

/// Attempts examined per sweep tick.
const SWEEP_BATCH_SIZE: u32 = 100;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    let production = config.is_production();
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .with(production.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!production).then(|| tracing_subscriber::fmt::layer()))
        .init();

    tracing::info!(
        environment = ?config.server.environment,
        "Starting humanizer ledger"
    );

    let pool = config.database.connect().await?;
    if config.database.run_migrations {
        tracing::info!("Running migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let payments = &config.payments;
    let attempts: Arc<dyn PaymentAttemptRepository> =
        Arc::new(PostgresPaymentAttemptRepository::new(pool.clone()));
    let entitlements = Arc::new(PostgresEntitlementRepository::new(pool));

    let push_provider = Arc::new(DarajaPushAdapter::new(DarajaConfig::from_settings(
        &payments.mpesa,
        payments.provider_timeout(),
    ))?);
    let card_provider = Arc::new(StripeCheckoutAdapter::new(StripeConfig::from_settings(
        &payments.stripe,
        payments.provider_timeout(),
    ))?);

    let rewriter: Arc<dyn TextRewriter> = match OpenAIConfig::from_settings(&config.ai) {
        Some(ai) => Arc::new(OpenAIRewriter::new(ai)?),
        None => {
            tracing::warn!("No language model key configured; humanize requests will fail");
            Arc::new(DisabledRewriter)
        }
    };

    let catalog = PlanCatalog::new(vec![Plan::premium(
        payments.premium_credit_grant,
        payments.mpesa.premium_amount,
        payments.stripe.premium_price_id.clone(),
    )]);

    spawn_stale_sweep(
        ExpireStalePaymentsHandler::new(attempts.clone(), payments.pending_ttl(), SWEEP_BATCH_SIZE),
        payments.sweep_interval(),
    );

    let state = BillingAppState {
        entitlements,
        attempts,
        push_provider,
        card_provider,
        rewriter,
        catalog: Arc::new(catalog),
        callback_token: payments.mpesa.callback_token.as_str().into(),
        rewrite_timeout: config.ai.timeout(),
    };
    let auth: AuthState = Arc::new(JwtSessionValidator::from_config(&config.auth));

    let app = build_router(state, auth, &config.server);

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Runs the stale payment sweep on a fixed interval.
fn spawn_stale_sweep(handler: ExpireStalePaymentsHandler, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = handler.handle(Timestamp::now()).await {
                tracing::error!(error = %e, "Stale payment sweep failed");
            }
        }
    });
}
