// =============================================================================
// Codegate Signal Bot — Main Entry Point
// =============================================================================
//
// Chat bot that hands out EMA / RSI trade signals for Binance spot pairs to
// users holding a valid, time-limited access code.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod access;
mod analysis;
mod api;
mod app_state;
mod binance;
mod bot;
mod indicators;
mod runtime_config;
mod signal;
mod telegram;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::access::SystemClock;
use crate::app_state::AppState;
use crate::binance::BinanceClient;
use crate::runtime_config::RuntimeConfig;
use crate::telegram::TelegramClient;

const CONFIG_PATH: &str = "bot_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Codegate Signal Bot starting up");

    let mut config = RuntimeConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_env(|key| std::env::var(key).ok());
    config.sanitize();

    if config.admin_user_ids.is_empty() {
        warn!("No admin user ids configured — nobody can issue access codes from chat");
    }
    info!(
        menu_symbols = ?config.menu_symbols,
        interval = %config.default_interval,
        strategy = %config.default_strategy,
        "Configuration ready"
    );

    let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
        .context("TELEGRAM_BOT_TOKEN must be set")?;
    let admin_token = std::env::var("BOT_ADMIN_TOKEN").ok();

    // ── 2. Clients & shared state ────────────────────────────────────────
    let market = BinanceClient::new()?;
    let telegram = TelegramClient::new(bot_token, config.poll_timeout_secs)?;
    let state = Arc::new(AppState::new(
        config,
        Arc::new(SystemClock),
        market,
        admin_token,
    ));

    // ── 3. Access expiry sweep ───────────────────────────────────────────
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let period = tokio::time::Duration::from_secs(sweep_state.config.sweep_interval_secs);
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let report = sweep_state.access.sweep_expired();
            if report.revoked_users > 0 || report.purged_codes > 0 {
                info!(
                    revoked_users = report.revoked_users,
                    purged_codes = report.purged_codes,
                    "access expiry sweep"
                );
            }
        }
    });

    // ── 4. Admin API ─────────────────────────────────────────────────────
    if state.config.api_enabled {
        let api_state = state.clone();
        let bind_addr = state.config.api_bind_addr.clone();
        if state.admin_token.is_none() {
            warn!("BOT_ADMIN_TOKEN is not set — admin API will reject authenticated requests");
        }

        tokio::spawn(async move {
            let app = api::rest::router(api_state);
            let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
                Ok(l) => l,
                Err(e) => {
                    error!(addr = %bind_addr, error = %e, "Failed to bind admin API");
                    return;
                }
            };
            info!(addr = %bind_addr, "Admin API listening");
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "Admin API server failed");
            }
        });
    }

    // ── 5. Chat polling loop ─────────────────────────────────────────────
    let bot_state = state.clone();
    tokio::spawn(bot::run_polling(bot_state, telegram));

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 6. Shutdown ──────────────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping");

    info!(
        uptime_secs = state.uptime_secs(),
        "Codegate Signal Bot shut down complete."
    );
    Ok(())
}
