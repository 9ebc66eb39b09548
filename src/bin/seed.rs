//! Loads the sample companies, accounts and jobs into the configured store.
//!
//! Safe to run repeatedly: nothing is written if the seed admin exists.

use anyhow::Context;
use jobboard::{
    auth::PasswordHasher,
    config::AppConfig,
    store::{self, seed},
    telemetry,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init();

    let config = AppConfig::from_env()?;
    let store = store::connect(&config).await.context("failed to open the store")?;

    info!("Starting database seed...");
    let report = seed::seed(store.as_ref(), &PasswordHasher::new()).await?;
    if report.is_empty() {
        info!("seed data already present, nothing to do");
    } else {
        info!(
            "Created {} companies, {} users and {} jobs",
            report.companies, report.users, report.jobs
        );
    }
    Ok(())
}
