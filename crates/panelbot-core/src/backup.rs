//! Backup artifact production.
//!
//! Stages the configured sources into a fresh directory, compresses the lot
//! into a timestamped zip, and removes the staging directory again. A failed
//! run leaves neither a staging directory nor a partial archive behind.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use chrono::Local;

use crate::{archive::create_zip, config::Config, errors::Error, ports::BackupProducer, Result};

/// File extensions picked up from the data directory (non-recursive).
const CONFIG_EXTENSIONS: &[&str] = &["json", "yaml", "toml"];

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Paths to include in a backup. Every source is optional; sources that do
/// not exist on disk are skipped silently.
#[derive(Clone, Debug, Default)]
pub struct BackupSources {
    pub database_file: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    pub compose_file: Option<PathBuf>,
    pub certs_dir: Option<PathBuf>,
    pub node_cert: Option<PathBuf>,
    pub node_key: Option<PathBuf>,
    pub server_cert: Option<PathBuf>,
    pub server_key: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

#[derive(Clone)]
pub struct FsBackupProducer {
    sources: BackupSources,
    staging_parent: PathBuf,
    output_dir: PathBuf,
}

impl FsBackupProducer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            sources: cfg.backup_sources(),
            staging_parent: cfg.backup_staging_dir.clone(),
            output_dir: cfg.backup_output_dir.clone(),
        }
    }

    pub fn with_sources(
        sources: BackupSources,
        staging_parent: PathBuf,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            sources,
            staging_parent,
            output_dir,
        }
    }

    /// Stage, compress, clean up. Blocking; run via `produce()` on async
    /// callers.
    pub fn produce_blocking(&self) -> Result<PathBuf> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        // Each invocation owns its staging directory exclusively; a concurrent
        // manual /backup must not race the scheduler's cycle.
        let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
        let staging = self
            .staging_parent
            .join(format!("staging_{}_{}", std::process::id(), seq));

        let result = self.stage_and_zip(&staging, &timestamp);
        let _ = fs::remove_dir_all(&staging);
        result
    }

    fn stage_and_zip(&self, staging: &Path, timestamp: &str) -> Result<PathBuf> {
        fs::create_dir_all(staging)?;
        self.stage(staging)?;

        fs::create_dir_all(&self.output_dir)?;
        let archive = self
            .output_dir
            .join(format!("panel_backup_{timestamp}.zip"));

        if let Err(e) = create_zip(staging, &archive) {
            let _ = fs::remove_file(&archive);
            return Err(e);
        }

        Ok(archive)
    }

    fn stage(&self, staging: &Path) -> Result<()> {
        copy_file_if_exists(&self.sources.database_file, staging, "panel.db")?;
        copy_file_if_exists(&self.sources.env_file, staging, ".env")?;
        copy_file_if_exists(&self.sources.compose_file, staging, "docker-compose.yml")?;

        if let Some(dir) = existing_dir(&self.sources.certs_dir) {
            copy_dir_recursive(dir, &staging.join("certs"))?;
        }

        copy_cert(&self.sources.node_cert, staging, "node_certs", "ca.crt")?;
        copy_cert(&self.sources.node_key, staging, "node_certs", "ca.key")?;
        copy_cert(&self.sources.server_cert, staging, "server_certs", "ca-server.crt")?;
        copy_cert(&self.sources.server_key, staging, "server_certs", "ca-server.key")?;

        if let Some(dir) = existing_dir(&self.sources.data_dir) {
            stage_config_files(dir, &staging.join("data"))?;
        }

        Ok(())
    }
}

#[async_trait]
impl BackupProducer for FsBackupProducer {
    async fn produce(&self) -> Result<PathBuf> {
        let producer = self.clone();
        tokio::task::spawn_blocking(move || producer.produce_blocking())
            .await
            .map_err(|e| Error::Backup(format!("backup task failed: {e}")))?
    }
}

fn copy_file_if_exists(src: &Option<PathBuf>, staging: &Path, target: &str) -> Result<()> {
    let Some(src) = src else {
        return Ok(());
    };
    if !src.is_file() {
        return Ok(());
    }
    fs::copy(src, staging.join(target))?;
    Ok(())
}

/// Cert/key paths may be configured relative to the working directory.
fn copy_cert(src: &Option<PathBuf>, staging: &Path, subdir: &str, target: &str) -> Result<()> {
    let Some(src) = src else {
        return Ok(());
    };
    let src = resolve_cwd(src)?;
    if !src.is_file() {
        return Ok(());
    }
    let dir = staging.join(subdir);
    fs::create_dir_all(&dir)?;
    fs::copy(&src, dir.join(target))?;
    Ok(())
}

fn resolve_cwd(p: &Path) -> Result<PathBuf> {
    if p.is_absolute() {
        return Ok(p.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(p))
}

fn existing_dir(p: &Option<PathBuf>) -> Option<&Path> {
    p.as_deref().filter(|p| p.is_dir())
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let path = entry.path();
        let target = dest.join(entry.file_name());
        if path.is_dir() {
            copy_dir_recursive(&path, &target)?;
        } else {
            fs::copy(&path, &target)?;
        }
    }
    Ok(())
}

fn stage_config_files(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let keep = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| CONFIG_EXTENSIONS.contains(&e))
            .unwrap_or(false);
        if keep {
            fs::copy(&path, dest.join(entry.file_name()))?;
        }
    }
    Ok(())
}
