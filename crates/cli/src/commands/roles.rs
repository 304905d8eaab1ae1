//! Manual subscriber-role changes for support.
//!
//! Runs the same reconciliation as the payment webhooks: granting to an
//! email with no account records a pending payment.
//!
//! # Usage
//!
//! ```bash
//! bv-cli roles grant ana@example.com
//! bv-cli roles revoke ana@example.com
//! ```
//!
//! Reads the portal's configuration (`IDENTITY_URL`, `IDENTITY_ADMIN_TOKEN`,
//! `PORTAL_DATABASE_URL`, ...).

use bookvision_core::Email;
use bookvision_portal::{config::PortalConfig, db, state::AppState, storage::BlobStore};

use super::CliError;

const MANUAL_STATUS: &str = "manual";

async fn state() -> Result<AppState, CliError> {
    let config = PortalConfig::from_env()?;
    let store = match &config.database_url {
        Some(url) => BlobStore::postgres(db::create_pool(url).await?),
        None => {
            tracing::warn!("No database configured; pending payments will not persist");
            BlobStore::memory()
        }
    };
    Ok(AppState::new(config, store)?)
}

/// Give `email` the subscriber role.
pub async fn grant(email: &str) -> Result<(), CliError> {
    let email = Email::parse(email)?;
    let outcome = state()
        .await?
        .entitlements()
        .grant(&email, MANUAL_STATUS)
        .await?;
    tracing::info!("grant {}: {}", email, outcome.as_str());
    Ok(())
}

/// Take the subscriber role away from `email`.
pub async fn revoke(email: &str) -> Result<(), CliError> {
    let email = Email::parse(email)?;
    let outcome = state()
        .await?
        .entitlements()
        .revoke(&email, MANUAL_STATUS)
        .await?;
    tracing::info!("revoke {}: {}", email, outcome.as_str());
    Ok(())
}
