//! Bot session lifecycle.
//!
//! A session binds the chat transport with the currently configured token,
//! wires the command router, and runs the backup scheduler alongside it.
//! Settings changes take effect through `restart()`.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::{
    ports::{BackupProducer, BoundTransport, ChatTransport, PanelRepository},
    router::CommandRouter,
    scheduler::BackupScheduler,
    settings::BotSettings,
    Result,
};

struct ActiveSession {
    bound: Box<dyn BoundTransport>,
    scheduler: BackupScheduler,
}

pub struct BotSession {
    repo: Arc<dyn PanelRepository>,
    producer: Arc<dyn BackupProducer>,
    transport: Arc<dyn ChatTransport>,
    state: Mutex<Option<ActiveSession>>,
}

impl BotSession {
    pub fn new(
        repo: Arc<dyn PanelRepository>,
        producer: Arc<dyn BackupProducer>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            repo,
            producer,
            transport,
            state: Mutex::new(None),
        }
    }

    /// Start (or restart) the bot from the current settings snapshot.
    ///
    /// Returns `Ok(false)` when the bot is disabled, no token is configured,
    /// or any startup step fails after binding; a failed start always unwinds
    /// to a fully stopped state.
    pub async fn start(&self) -> Result<bool> {
        self.stop().await;

        let settings = BotSettings::fetch(self.repo.as_ref()).await?;
        if !settings.enabled {
            info!("bot is disabled in settings; not starting");
            return Ok(false);
        }
        let Some(token) = settings.token() else {
            warn!("bot is enabled but no token is configured; not starting");
            return Ok(false);
        };

        let mut bound = match self.transport.bind(token).await {
            Ok(b) => b,
            Err(e) => {
                error!("failed to bind chat transport: {e}");
                return Ok(false);
            }
        };

        let messenger = bound.messenger();
        let router = Arc::new(CommandRouter::new(
            self.repo.clone(),
            self.producer.clone(),
            messenger.clone(),
        ));

        // Updates queued while the bot was offline are stale; drop them.
        if let Err(e) = bound.start_receiving(router, true).await {
            error!("failed to start receiving updates: {e}");
            if let Err(e) = bound.stop_receiving().await {
                warn!("transport teardown after failed start: {e}");
            }
            return Ok(false);
        }

        let scheduler =
            BackupScheduler::new(self.repo.clone(), self.producer.clone(), messenger);
        if let Err(e) = scheduler.start().await {
            error!("failed to start backup scheduler: {e}");
            if let Err(e) = bound.stop_receiving().await {
                warn!("transport teardown after failed start: {e}");
            }
            return Ok(false);
        }

        *self.state.lock().await = Some(ActiveSession { bound, scheduler });
        info!("bot session started");
        Ok(true)
    }

    /// Tear down the active session, if any. Scheduler first so no backup
    /// cycle runs against a dead transport. Idempotent.
    pub async fn stop(&self) {
        let active = self.state.lock().await.take();
        if let Some(mut active) = active {
            active.scheduler.stop().await;
            if let Err(e) = active.bound.stop_receiving().await {
                warn!("failed to stop receiving updates: {e}");
            }
            info!("bot session stopped");
        }
    }

    pub async fn restart(&self) -> Result<bool> {
        self.start().await
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.is_some()
    }
}
