use std::sync::Arc;

use bantabro::bot::notifier::TelegramNotifier;
use bantabro::bot::processor::CastProcessor;
use bantabro::config::BotConfig;
use bantabro::console::Console;
use bantabro::moderation::ModerationQueue;
use bantabro::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = BotConfig::from_env()?;

    eprintln!("🎯 Bantabro v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Trigger: {}", config.trigger);
    eprintln!("   App URL: {}", config.app_url);

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = match LibSqlBackend::new_local(&config.db_path).await {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            eprintln!(
                "Error: Failed to open database at {}: {}",
                config.db_path.display(),
                e
            );
            std::process::exit(1);
        }
    };
    eprintln!("   Database: {}", config.db_path.display());

    // ── Pipeline ─────────────────────────────────────────────────────────
    let notifier = TelegramNotifier::new(&config);
    if notifier.is_configured() {
        eprintln!("   Alerts: telegram");
    } else {
        eprintln!("   Alerts: disabled (TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID not set)");
    }
    let processor = Arc::new(CastProcessor::new(&config, Arc::new(notifier))?);
    let queue = ModerationQueue::new(Arc::clone(&db));

    eprintln!("   Type a cast and press Enter. /help for commands, /quit to exit.\n");

    Console::new(processor, queue, db).run().await?;

    eprintln!("Goodbye.");
    Ok(())
}
