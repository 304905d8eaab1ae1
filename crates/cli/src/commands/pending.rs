//! Inspect payments that arrived before their payer signed up.
//!
//! # Usage
//!
//! ```bash
//! bv-cli pending list
//! bv-cli pending show ana@example.com
//! bv-cli pending clear ana@example.com
//! ```

use bookvision_core::{Email, PendingPayment};
use bookvision_portal::{db, services::PendingPayments, storage::BlobStore};

use super::{CliError, database_url};

async fn open() -> Result<PendingPayments, CliError> {
    let url = database_url()?;
    let pool = db::create_pool(&url).await?;
    Ok(PendingPayments::new(BlobStore::postgres(pool)))
}

fn describe(payment: &PendingPayment) -> String {
    let at = payment
        .recorded_at()
        .map_or_else(|| payment.timestamp.to_string(), |at| at.to_rfc3339());
    format!(
        "{}\tstatus={}\tpaid={}\trecorded={at}",
        payment.email, payment.status, payment.paid
    )
}

/// Print every pending payment.
#[allow(clippy::print_stdout)]
pub async fn list() -> Result<(), CliError> {
    let payments = open().await?.list().await?;

    if payments.is_empty() {
        println!("No pending payments.");
    }
    for payment in &payments {
        println!("{}", describe(payment));
    }
    Ok(())
}

/// Print the pending payment for one email.
#[allow(clippy::print_stdout)]
pub async fn show(email: &str) -> Result<(), CliError> {
    let email = Email::parse(email)?;
    let payment = open().await?.get(&email).await?;

    match payment {
        Some(payment) => println!("{}", describe(&payment)),
        None => println!("No pending payment for {email}."),
    }
    Ok(())
}

/// Delete the pending payment for one email.
pub async fn clear(email: &str) -> Result<(), CliError> {
    let email = Email::parse(email)?;
    if open().await?.remove(&email).await? {
        tracing::info!("Removed pending payment for {}", email);
    } else {
        tracing::warn!("No pending payment for {}", email);
    }
    Ok(())
}
