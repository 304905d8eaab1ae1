//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! bv-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `PORTAL_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! Migrations live in `crates/portal/migrations/` and are embedded in the
//! portal crate.

use bookvision_portal::db;

use super::{CliError, database_url};

/// Run the portal migrations.
pub async fn run() -> Result<(), CliError> {
    let url = database_url()?;

    tracing::info!("Connecting to portal database...");
    let pool = db::create_pool(&url).await?;

    tracing::info!("Running portal migrations...");
    db::MIGRATOR.run(&pool).await?;

    tracing::info!("Portal migrations complete!");
    Ok(())
}
