/// Create the approved super-admin account
///
/// Reads SUPER_ADMIN_EMAIL / SUPER_ADMIN_PASSWORD (and optionally
/// SUPER_ADMIN_PHONE) from the environment. Safe to run repeatedly.
use anyhow::{Context, Result};
use owode_agent::{agent::AgentManager, db, ServerConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "owode_agent=info".into()),
        )
        .init();

    let config = ServerConfig::from_env().context("failed to load configuration")?;

    let email = config
        .admin
        .super_admin_email
        .clone()
        .context("SUPER_ADMIN_EMAIL must be set")?;
    let password = config
        .admin
        .super_admin_password
        .clone()
        .context("SUPER_ADMIN_PASSWORD must be set")?;
    let phone = std::env::var("SUPER_ADMIN_PHONE").unwrap_or_else(|_| "+10000000000".to_string());

    let pool = db::create_pool(&config.storage.database_path, db::DatabaseOptions::default())
        .await
        .context("failed to open database")?;
    db::run_migrations(&pool)
        .await
        .context("failed to run migrations")?;

    let manager = AgentManager::new(pool, Arc::new(config));
    let (admin, created) = manager
        .ensure_super_admin(&email, &password, &phone)
        .await
        .context("failed to create super admin")?;

    if created {
        println!("Super admin created: {} ({})", admin.email, admin.id);
    } else {
        println!("Super admin already exists: {} ({})", admin.email, admin.id);
    }

    Ok(())
}
