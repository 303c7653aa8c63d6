use anyhow::Context;
use feels_relay::config::RelayConfig;
use feels_relay::context::AppContext;
use feels_relay::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("  Required: RELAY_ADMIN_ID, RELAY_RECIPIENT_ID, RELAY_BOT_USERNAME,");
            eprintln!("            RELAY_BOT_API_KEY, RELAY_WEBHOOK_USER, RELAY_WEBHOOK_PASS");
            std::process::exit(1);
        }
    };

    eprintln!("Feels Relay v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Platform API: {}", config.api_url);
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!(
        "   Batch limits: {} per recipient, {} per batch",
        config.limits.per_recipient, config.limits.per_batch
    );
    match config.webhook_url.as_deref() {
        Some(url) => eprintln!("   Webhook: {url}"),
        None => eprintln!("   Webhook: not configured"),
    }

    let port = config.port;
    let ctx = AppContext::connect(config)
        .await
        .context("starting relay")?;
    let app = server::router(ctx);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .with_context(|| format!("binding port {port}"))?;
    tracing::info!(port, "Relay server listening");
    eprintln!("   Listening: http://0.0.0.0:{port}\n");

    axum::serve(listener, app).await?;
    Ok(())
}
