use std::sync::Arc;

use tracing::{info, warn};

use panelbot_core::{backup::FsBackupProducer, config::Config, session::BotSession};
use panelbot_storage::SqliteRepository;
use panelbot_telegram::TelegramTransport;

#[tokio::main]
async fn main() -> Result<(), panelbot_core::Error> {
    panelbot_core::logging::init("panelbot")?;

    let cfg = Config::load()?;
    let repo = Arc::new(SqliteRepository::open(&cfg.database_path.to_string_lossy()).await?);
    let producer = Arc::new(FsBackupProducer::new(&cfg));

    let session = BotSession::new(repo, producer, Arc::new(TelegramTransport::new()));
    if !session.start().await? {
        warn!("bot not started; enable it and set a token in the panel settings");
    }

    tokio::signal::ctrl_c()
        .await
        .map_err(panelbot_core::Error::Io)?;
    info!("shutdown signal received");
    session.stop().await;

    Ok(())
}
