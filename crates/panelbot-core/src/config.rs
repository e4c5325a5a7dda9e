use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{backup::BackupSources, Result};

/// Static (non-operator) configuration, loaded from the environment.
///
/// Operator-tunable settings (bot token, admin list, backup schedule) live in
/// the panel database and are read through the `PanelRepository` port; see
/// `settings::BotSettings`.
#[derive(Clone, Debug)]
pub struct Config {
    /// The panel's SQLite database; both the repository source and the first
    /// backup input.
    pub database_path: PathBuf,
    pub data_dir: PathBuf,
    pub env_file: PathBuf,
    pub compose_file: PathBuf,
    pub certs_dir: PathBuf,
    pub node_cert_path: PathBuf,
    pub node_key_path: PathBuf,
    pub server_cert_path: PathBuf,
    pub server_key_path: PathBuf,

    /// Parent under which each backup gets a fresh staging directory.
    pub backup_staging_dir: PathBuf,
    pub backup_output_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let data_dir = env_path("PANEL_DATA_DIR").unwrap_or_else(|| PathBuf::from("./data"));
        let database_path =
            env_path("PANEL_DATABASE_PATH").unwrap_or_else(|| data_dir.join("panel.db"));
        let env_file = env_path("PANEL_ENV_FILE").unwrap_or_else(|| PathBuf::from(".env"));
        let compose_file =
            env_path("PANEL_COMPOSE_FILE").unwrap_or_else(|| PathBuf::from("docker-compose.yml"));
        let certs_dir = env_path("PANEL_CERTS_DIR").unwrap_or_else(|| PathBuf::from("./certs"));

        let node_cert_path = env_path("NODE_CERT_PATH").unwrap_or_else(|| certs_dir.join("ca.crt"));
        let node_key_path = env_path("NODE_KEY_PATH").unwrap_or_else(|| certs_dir.join("ca.key"));
        let server_cert_path =
            env_path("NODE_SERVER_CERT_PATH").unwrap_or_else(|| certs_dir.join("ca-server.crt"));
        let server_key_path =
            env_path("NODE_SERVER_KEY_PATH").unwrap_or_else(|| certs_dir.join("ca-server.key"));

        let backup_staging_dir = env_path("BACKUP_STAGING_DIR")
            .unwrap_or_else(|| PathBuf::from("/tmp/panelbot_backup"));
        let backup_output_dir =
            env_path("BACKUP_OUTPUT_DIR").unwrap_or_else(|| PathBuf::from("/tmp"));

        fs::create_dir_all(&data_dir)?;

        Ok(Self {
            database_path,
            data_dir,
            env_file,
            compose_file,
            certs_dir,
            node_cert_path,
            node_key_path,
            server_cert_path,
            server_key_path,
            backup_staging_dir,
            backup_output_dir,
        })
    }

    pub fn backup_sources(&self) -> BackupSources {
        BackupSources {
            database_file: Some(self.database_path.clone()),
            env_file: Some(self.env_file.clone()),
            compose_file: Some(self.compose_file.clone()),
            certs_dir: Some(self.certs_dir.clone()),
            node_cert: Some(self.node_cert_path.clone()),
            node_key: Some(self.node_key_path.clone()),
            server_cert: Some(self.server_cert_path.clone()),
            server_key: Some(self.server_key_path.clone()),
            data_dir: Some(self.data_dir.clone()),
        }
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}
