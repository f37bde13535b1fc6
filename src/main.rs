/// Owode Agent server entry point
use owode_agent::{config::LoggingConfig, server, AppContext, AppResult, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.default_directives().into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let config = ServerConfig::from_env()?;
    init_logging(&config.logging);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting Owode Agent server");

    let ctx = AppContext::new(config).await?;

    // Seed the super-admin when credentials are configured
    if let (Some(email), Some(password)) = (
        ctx.config.admin.super_admin_email.clone(),
        ctx.config.admin.super_admin_password.clone(),
    ) {
        let (admin, created) = ctx
            .agent_manager
            .ensure_super_admin(&email, &password, "+10000000000")
            .await?;
        if created {
            tracing::info!(agent_id = %admin.id, "super admin account created");
        }
    }

    server::serve(ctx).await
}
