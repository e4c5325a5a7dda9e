use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef, Node, Tunnel},
    router::CommandRouter,
    Result,
};

/// Inline keyboard (callback buttons), laid out as rows.
#[derive(Clone, Debug, Default)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

impl InlineKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, buttons: Vec<InlineButton>) -> Self {
        self.rows.push(buttons);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read-only view of the panel database.
///
/// The repository provides its own consistency: a write done by the web panel
/// is visible to the next fetch here.
#[async_trait]
pub trait PanelRepository: Send + Sync {
    async fn get_setting(&self, key: &str) -> Result<Option<serde_json::Value>>;
    async fn list_nodes(&self) -> Result<Vec<Node>>;
    async fn list_tunnels(&self) -> Result<Vec<Tunnel>>;
    async fn get_node(&self, id: &str) -> Result<Option<Node>>;
    async fn get_tunnel(&self, id: &str) -> Result<Option<Tunnel>>;
}

/// Outbound messaging port.
///
/// Telegram is the first implementation; the shape is kept small enough that
/// another chat backend could fit behind it.
#[async_trait]
pub trait MessengerPort: Send + Sync {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<MessageRef>;

    async fn edit_text(
        &self,
        msg: MessageRef,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<()>;

    async fn send_document(
        &self,
        chat_id: ChatId,
        file: &Path,
        file_name: &str,
        caption: Option<&str>,
    ) -> Result<()>;

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}

/// Produces a backup artifact on demand and returns its path.
///
/// The artifact is ephemeral: callers transmit it and then delete it.
#[async_trait]
pub trait BackupProducer: Send + Sync {
    async fn produce(&self) -> Result<PathBuf>;
}

/// Binds a credential token to the chat backend.
///
/// `bind` validates the token; a bad credential fails here, before any
/// receiving starts.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn bind(&self, token: &str) -> Result<Box<dyn BoundTransport>>;
}

/// A bound transport: owns the update-receiving loop for one session.
#[async_trait]
pub trait BoundTransport: Send + Sync {
    fn messenger(&self) -> Arc<dyn MessengerPort>;

    /// Begin receiving updates, routing them through `router`. With
    /// `drop_pending`, updates queued before this moment are discarded.
    async fn start_receiving(
        &mut self,
        router: Arc<CommandRouter>,
        drop_pending: bool,
    ) -> Result<()>;

    async fn stop_receiving(&mut self) -> Result<()>;
}
