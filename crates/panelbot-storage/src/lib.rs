//! SQLite-backed panel repository.
//!
//! Reads the same database the web panel writes. The bot only consumes
//! nodes, tunnels, and the settings row; writes exist for the settings
//! endpoint and for seeding in tests.

use async_trait::async_trait;
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use tracing::info;

use panelbot_core::{
    domain::{Node, NodeMetadata, ResourceStatus, Tunnel},
    ports::PanelRepository,
    Error, Result,
};

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Open (creating the file and schema when missing) the panel database.
    pub async fn open(database_path: &str) -> Result<Self> {
        info!(path = %database_path, "opening panel database");

        let options = SqliteConnectOptions::new()
            .create_if_missing(true)
            .filename(database_path);
        let pool = SqlitePool::connect_with(options).await.map_err(db_err)?;

        let repo = Self { pool };
        repo.init().await?;
        Ok(repo)
    }

    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'inactive',
                metadata TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tunnels (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                core TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'inactive'
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    /// Write a settings value; the web panel normally owns this table.
    pub async fn upsert_setting(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn upsert_node(&self, node: &Node) -> Result<()> {
        let metadata = serde_json::json!({
            "role": node.metadata.role,
            "ip_address": node.metadata.ip_address,
        });
        sqlx::query(
            "INSERT INTO nodes (id, name, status, metadata) VALUES (?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
             name = excluded.name, status = excluded.status, metadata = excluded.metadata",
        )
        .bind(&node.id)
        .bind(&node.name)
        .bind(node.status.as_str())
        .bind(metadata.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn upsert_tunnel(&self, tunnel: &Tunnel) -> Result<()> {
        sqlx::query(
            "INSERT INTO tunnels (id, name, core, status) VALUES (?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
             name = excluded.name, core = excluded.core, status = excluded.status",
        )
        .bind(&tunnel.id)
        .bind(&tunnel.name)
        .bind(&tunnel.core)
        .bind(tunnel.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl PanelRepository for SqliteRepository {
    async fn get_setting(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        let Some((raw,)) = row else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let rows: Vec<(String, String, String, Option<String>)> =
            sqlx::query_as("SELECT id, name, status, metadata FROM nodes ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(rows.into_iter().map(node_from_row).collect())
    }

    async fn list_tunnels(&self) -> Result<Vec<Tunnel>> {
        let rows: Vec<(String, String, String, String)> =
            sqlx::query_as("SELECT id, name, core, status FROM tunnels ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(rows.into_iter().map(tunnel_from_row).collect())
    }

    async fn get_node(&self, id: &str) -> Result<Option<Node>> {
        let row: Option<(String, String, String, Option<String>)> =
            sqlx::query_as("SELECT id, name, status, metadata FROM nodes WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(row.map(node_from_row))
    }

    async fn get_tunnel(&self, id: &str) -> Result<Option<Tunnel>> {
        let row: Option<(String, String, String, String)> =
            sqlx::query_as("SELECT id, name, core, status FROM tunnels WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(row.map(tunnel_from_row))
    }
}

fn node_from_row((id, name, status, metadata): (String, String, String, Option<String>)) -> Node {
    // Metadata is a free-form JSON blob owned by the panel; tolerate garbage.
    let metadata = metadata
        .as_deref()
        .and_then(|raw| serde_json::from_str::<NodeMetadata>(raw).ok())
        .unwrap_or_default();
    Node {
        id,
        name,
        status: ResourceStatus::parse(&status),
        metadata,
    }
}

fn tunnel_from_row((id, name, core, status): (String, String, String, String)) -> Tunnel {
    Tunnel {
        id,
        name,
        core,
        status: ResourceStatus::parse(&status),
    }
}

fn db_err(e: sqlx::Error) -> Error {
    Error::Storage(e.to_string())
}
