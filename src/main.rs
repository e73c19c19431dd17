use std::sync::Arc;

use anyhow::Context;

use dm_autoresponder::channels::InstagramSender;
use dm_autoresponder::config::ResponderConfig;
use dm_autoresponder::pipeline::{MessageProcessor, RulesEngine};
use dm_autoresponder::webhook::{WebhookState, webhook_routes};

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

    let config = ResponderConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        eprintln!("  export PAGE_ACCESS_TOKEN=... VERIFY_TOKEN=...");
        std::process::exit(1);
    });

    eprintln!("📨 DM Auto-Responder v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Rules: {}", config.rules_path.display());
    eprintln!("   Send endpoint: {}", config.graph_api_url);
    eprintln!("   Webhook: http://0.0.0.0:{}/webhook\n", config.port);

    // ── Rules ───────────────────────────────────────────────────────────
    let rules = Arc::new(RulesEngine::load_or_empty(&config.rules_path));
    if rules.is_empty() {
        tracing::warn!("No rules loaded; every message gets the fallback reply");
    }

    // ── Outbound ────────────────────────────────────────────────────────
    let sender = Arc::new(InstagramSender::new(&config)?);
    let processor = Arc::new(MessageProcessor::new(
        rules,
        sender,
        config.fallback_reply.clone(),
    ));

    // ── HTTP ────────────────────────────────────────────────────────────
    let app = webhook_routes(WebhookState {
        processor,
        verify_token: config.verify_token.clone(),
        webhook_object: config.webhook_object.clone(),
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Webhook server started");
    axum::serve(listener, app).await?;

    Ok(())
}
