//! Automatic backup scheduler.
//!
//! One cancellable loop that re-reads the settings snapshot every cycle,
//! sleeps the configured interval, produces a backup, and delivers it to
//! every admin. A cycle failure is logged and the loop continues; only
//! cancellation ends it.

use std::{path::Path, sync::Arc, time::Duration};

use tokio::{sync::Mutex, task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    domain::ChatId,
    ports::{BackupProducer, MessengerPort, PanelRepository},
    settings::BotSettings,
    Result,
};

/// Re-check cadence while backups are disabled or unconfigured. Keeps the
/// latency to an operator re-enabling them bounded without a notify channel.
pub const FALLBACK_SLEEP: Duration = Duration::from_secs(60);

struct SchedulerCtx {
    repo: Arc<dyn PanelRepository>,
    producer: Arc<dyn BackupProducer>,
    messenger: Arc<dyn MessengerPort>,
}

struct TaskEntry {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct BackupScheduler {
    ctx: Arc<SchedulerCtx>,
    state: Mutex<Option<TaskEntry>>,
}

impl BackupScheduler {
    pub fn new(
        repo: Arc<dyn PanelRepository>,
        producer: Arc<dyn BackupProducer>,
        messenger: Arc<dyn MessengerPort>,
    ) -> Self {
        Self {
            ctx: Arc::new(SchedulerCtx {
                repo,
                producer,
                messenger,
            }),
            state: Mutex::new(None),
        }
    }

    /// (Re)start the loop. Any previous task is cancelled and awaited first.
    /// A task is only spawned when backups are enabled and at least one admin
    /// is configured at this moment; otherwise the next explicit restart
    /// (after a settings change) spawns one.
    pub async fn start(&self) -> Result<bool> {
        self.stop().await;

        let settings = BotSettings::fetch(self.ctx.repo.as_ref()).await?;
        if !settings.backup_enabled || settings.admin_ids.is_empty() {
            info!("automatic backups disabled or no admins configured; scheduler not started");
            return Ok(false);
        }

        let cancel = CancellationToken::new();
        let ctx = self.ctx.clone();
        let token = cancel.clone();
        let handle = tokio::spawn(async move { run_loop(ctx, token).await });

        *self.state.lock().await = Some(TaskEntry { cancel, handle });
        info!(
            interval = settings.backup_interval,
            unit = ?settings.backup_interval_unit,
            "automatic backup scheduler started"
        );
        Ok(true)
    }

    /// Cancel the loop and wait for the task to finish. Idempotent.
    pub async fn stop(&self) {
        let entry = self.state.lock().await.take();
        if let Some(entry) = entry {
            entry.cancel.cancel();
            if let Err(e) = entry.handle.await {
                warn!("backup scheduler task ended abnormally: {e}");
            }
            info!("automatic backup scheduler stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.state
            .lock()
            .await
            .as_ref()
            .map(|t| !t.handle.is_finished())
            .unwrap_or(false)
    }
}

async fn run_loop(ctx: Arc<SchedulerCtx>, cancel: CancellationToken) {
    loop {
        let settings = match BotSettings::fetch(ctx.repo.as_ref()).await {
            Ok(s) => s,
            Err(e) => {
                error!("failed to load bot settings: {e}");
                if sleep_or_cancelled(&cancel, FALLBACK_SLEEP).await {
                    return;
                }
                continue;
            }
        };

        if !settings.backup_enabled || settings.admin_ids.is_empty() {
            if sleep_or_cancelled(&cancel, FALLBACK_SLEEP).await {
                return;
            }
            continue;
        }

        if sleep_or_cancelled(&cancel, settings.interval_duration()).await {
            return;
        }

        // The operator may have toggled backups off while we slept.
        let settings = match BotSettings::fetch(ctx.repo.as_ref()).await {
            Ok(s) => s,
            Err(e) => {
                error!("failed to reload bot settings: {e}");
                continue;
            }
        };
        if !settings.backup_enabled {
            continue;
        }

        if let Err(e) = run_cycle(&ctx, &settings.admin_ids).await {
            error!("automatic backup cycle failed: {e}");
        }
    }
}

/// True when cancelled; false when the sleep ran to completion.
async fn sleep_or_cancelled(cancel: &CancellationToken, dur: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = sleep(dur) => false,
    }
}

async fn run_cycle(ctx: &SchedulerCtx, admin_ids: &[String]) -> Result<()> {
    let artifact = ctx.producer.produce().await?;
    let file_name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "panel_backup.zip".to_string());
    let caption = format!(
        "Automatic backup - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    dispatch_artifact(
        ctx.messenger.as_ref(),
        admin_ids,
        &artifact,
        &file_name,
        Some(&caption),
    )
    .await;

    // The artifact is create-use-destroy; delete it no matter how delivery went.
    if let Err(e) = tokio::fs::remove_file(&artifact).await {
        warn!("failed to remove backup artifact: {e}");
    }

    info!("automatic backup cycle complete");
    Ok(())
}

/// Deliver the artifact to each recipient independently; one failed delivery
/// never blocks the others.
pub(crate) async fn dispatch_artifact(
    messenger: &dyn MessengerPort,
    admin_ids: &[String],
    file: &Path,
    file_name: &str,
    caption: Option<&str>,
) {
    for admin in admin_ids {
        let Ok(raw) = admin.parse::<i64>() else {
            warn!(admin = %admin, "admin id is not a numeric chat id; skipping");
            continue;
        };
        if let Err(e) = messenger
            .send_document(ChatId(raw), file, file_name, caption)
            .await
        {
            error!(admin = %admin, "failed to deliver backup: {e}");
        }
    }
}
