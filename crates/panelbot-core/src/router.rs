//! Command and callback dispatch.
//!
//! The router is resolved once per session bind and invoked for every inbound
//! update. Every path authorizes the sender against a fresh settings snapshot
//! before touching the repository or the backup producer.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::{
    domain::{ChatId, MessageRef, Node, Tunnel, UserId},
    ports::{BackupProducer, InlineButton, InlineKeyboard, MessengerPort, PanelRepository},
    security::is_authorized,
    settings::BotSettings,
    Result,
};

const ACCESS_DENIED: &str = "❌ Access denied. You are not an admin.";

/// Lists cap buttons so the keyboard stays usable on large fleets.
const TUNNEL_LIST_LIMIT: usize = 10;
const TUNNEL_BUTTON_LIMIT: usize = 5;

/// An inbound slash command, already stripped to its bare name.
#[derive(Clone, Debug)]
pub struct CommandUpdate {
    pub chat_id: ChatId,
    pub user_id: Option<UserId>,
    pub command: String,
}

/// An inbound callback-button press.
#[derive(Clone, Debug)]
pub struct CallbackUpdate {
    pub callback_id: String,
    pub user_id: UserId,
    /// The message carrying the pressed keyboard, when still available.
    pub message: Option<MessageRef>,
    pub data: String,
}

pub struct CommandRouter {
    repo: Arc<dyn PanelRepository>,
    producer: Arc<dyn BackupProducer>,
    messenger: Arc<dyn MessengerPort>,
}

impl CommandRouter {
    pub fn new(
        repo: Arc<dyn PanelRepository>,
        producer: Arc<dyn BackupProducer>,
        messenger: Arc<dyn MessengerPort>,
    ) -> Self {
        Self {
            repo,
            producer,
            messenger,
        }
    }

    pub async fn handle_command(&self, update: CommandUpdate) -> Result<()> {
        if !self.authorize(update.user_id).await? {
            self.messenger
                .send_text(update.chat_id, ACCESS_DENIED, None)
                .await?;
            return Ok(());
        }

        match update.command.as_str() {
            "start" => self.cmd_start(update.chat_id).await,
            "help" => self.cmd_help(update.chat_id).await,
            "nodes" => self.cmd_nodes(update.chat_id).await,
            "tunnels" => self.cmd_tunnels(update.chat_id).await,
            "status" => self.cmd_status(update.chat_id).await,
            "backup" => self.cmd_backup(update.chat_id).await,
            other => {
                info!(command = %other, "ignoring unknown command");
                Ok(())
            }
        }
    }

    pub async fn handle_callback(&self, update: CallbackUpdate) -> Result<()> {
        // Acknowledge immediately so the client stops its spinner.
        self.messenger
            .answer_callback(&update.callback_id, None)
            .await?;

        let Some(msg) = update.message else {
            warn!("callback without an originating message; ignoring");
            return Ok(());
        };

        if !self.authorize(Some(update.user_id)).await? {
            self.messenger.edit_text(msg, ACCESS_DENIED, None).await?;
            return Ok(());
        }

        if let Some(node_id) = update.data.strip_prefix("node_info_") {
            return self.show_node(msg, node_id).await;
        }
        if let Some(tunnel_id) = update.data.strip_prefix("tunnel_info_") {
            return self.show_tunnel(msg, tunnel_id).await;
        }

        match update.data.as_str() {
            "cmd_nodes" => self.edit_nodes(msg).await,
            "cmd_tunnels" => self.edit_tunnels(msg).await,
            "cmd_status" => self.edit_status(msg).await,
            "cmd_backup" => self.callback_backup(msg).await,
            other => {
                info!(data = %other, "ignoring unknown callback data");
                Ok(())
            }
        }
    }

    async fn authorize(&self, user_id: Option<UserId>) -> Result<bool> {
        let settings = BotSettings::fetch(self.repo.as_ref()).await?;
        Ok(is_authorized(user_id, &settings.admin_ids))
    }

    async fn cmd_start(&self, chat_id: ChatId) -> Result<()> {
        self.messenger
            .send_text(
                chat_id,
                "👋 Welcome to the panel bot!\n\nUse /help to see available commands.",
                None,
            )
            .await?;
        Ok(())
    }

    async fn cmd_help(&self, chat_id: ChatId) -> Result<()> {
        let text = "📋 Available Commands:\n\n\
            /nodes - List all nodes\n\
            /tunnels - List all tunnels\n\
            /status - Show panel status\n\
            /backup - Create and send backup\n\n\
            Use buttons in messages to interact with nodes and tunnels.";
        self.messenger.send_text(chat_id, text, None).await?;
        Ok(())
    }

    async fn cmd_nodes(&self, chat_id: ChatId) -> Result<()> {
        let nodes = self.repo.list_nodes().await?;
        if nodes.is_empty() {
            self.messenger
                .send_text(chat_id, "📭 No nodes found.", None)
                .await?;
            return Ok(());
        }
        self.messenger
            .send_text(chat_id, &nodes_text(&nodes), Some(nodes_keyboard(&nodes, false)))
            .await?;
        Ok(())
    }

    async fn cmd_tunnels(&self, chat_id: ChatId) -> Result<()> {
        let tunnels = self.repo.list_tunnels().await?;
        if tunnels.is_empty() {
            self.messenger
                .send_text(chat_id, "📭 No tunnels found.", None)
                .await?;
            return Ok(());
        }
        self.messenger
            .send_text(
                chat_id,
                &tunnels_text(&tunnels),
                Some(tunnels_keyboard(&tunnels, false)),
            )
            .await?;
        Ok(())
    }

    async fn cmd_status(&self, chat_id: ChatId) -> Result<()> {
        let text = self.status_text().await?;
        self.messenger
            .send_text(chat_id, &text, Some(status_keyboard()))
            .await?;
        Ok(())
    }

    async fn cmd_backup(&self, chat_id: ChatId) -> Result<()> {
        self.messenger
            .send_text(chat_id, "📦 Creating backup...", None)
            .await?;

        match self.producer.produce().await {
            Ok(artifact) => {
                let name = artifact
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "panel_backup.zip".to_string());
                let sent = self
                    .messenger
                    .send_document(
                        chat_id,
                        &artifact,
                        &name,
                        Some("✅ Backup created successfully"),
                    )
                    .await;
                if let Err(e) = tokio::fs::remove_file(&artifact).await {
                    warn!("failed to remove backup artifact: {e}");
                }
                sent?;
            }
            Err(e) => {
                error!("manual backup failed: {e}");
                self.messenger
                    .send_text(chat_id, &format!("❌ Error creating backup: {e}"), None)
                    .await?;
            }
        }
        Ok(())
    }

    async fn show_node(&self, msg: MessageRef, node_id: &str) -> Result<()> {
        let Some(node) = self.repo.get_node(node_id).await? else {
            self.messenger
                .edit_text(msg, "❌ Node not found.", None)
                .await?;
            return Ok(());
        };
        let kb = InlineKeyboard::new().row(vec![InlineButton::new(
            "🔙 Back to Nodes",
            "cmd_nodes",
        )]);
        self.messenger
            .edit_text(msg, &node_detail_text(&node), Some(kb))
            .await?;
        Ok(())
    }

    async fn show_tunnel(&self, msg: MessageRef, tunnel_id: &str) -> Result<()> {
        let Some(tunnel) = self.repo.get_tunnel(tunnel_id).await? else {
            self.messenger
                .edit_text(msg, "❌ Tunnel not found.", None)
                .await?;
            return Ok(());
        };
        let kb = InlineKeyboard::new().row(vec![InlineButton::new(
            "🔙 Back to Tunnels",
            "cmd_tunnels",
        )]);
        self.messenger
            .edit_text(msg, &tunnel_detail_text(&tunnel), Some(kb))
            .await?;
        Ok(())
    }

    async fn edit_nodes(&self, msg: MessageRef) -> Result<()> {
        let nodes = self.repo.list_nodes().await?;
        if nodes.is_empty() {
            self.messenger
                .edit_text(msg, "📭 No nodes found.", None)
                .await?;
            return Ok(());
        }
        self.messenger
            .edit_text(msg, &nodes_text(&nodes), Some(nodes_keyboard(&nodes, true)))
            .await?;
        Ok(())
    }

    async fn edit_tunnels(&self, msg: MessageRef) -> Result<()> {
        let tunnels = self.repo.list_tunnels().await?;
        if tunnels.is_empty() {
            self.messenger
                .edit_text(msg, "📭 No tunnels found.", None)
                .await?;
            return Ok(());
        }
        self.messenger
            .edit_text(
                msg,
                &tunnels_text(&tunnels),
                Some(tunnels_keyboard(&tunnels, true)),
            )
            .await?;
        Ok(())
    }

    async fn edit_status(&self, msg: MessageRef) -> Result<()> {
        let text = self.status_text().await?;
        self.messenger
            .edit_text(msg, &text, Some(status_keyboard()))
            .await?;
        Ok(())
    }

    async fn callback_backup(&self, msg: MessageRef) -> Result<()> {
        self.messenger
            .edit_text(msg, "📦 Creating backup...", None)
            .await?;

        match self.producer.produce().await {
            Ok(artifact) => {
                let name = artifact
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "panel_backup.zip".to_string());
                let sent = self
                    .messenger
                    .send_document(
                        msg.chat_id,
                        &artifact,
                        &name,
                        Some("✅ Backup created successfully"),
                    )
                    .await;
                if let Err(e) = tokio::fs::remove_file(&artifact).await {
                    warn!("failed to remove backup artifact: {e}");
                }
                let final_text = match &sent {
                    Ok(()) => "✅ Backup created and sent successfully!".to_string(),
                    Err(e) => format!("❌ Error creating backup: {e}"),
                };
                self.messenger.edit_text(msg, &final_text, None).await?;
                sent?;
            }
            Err(e) => {
                error!("manual backup failed: {e}");
                self.messenger
                    .edit_text(msg, &format!("❌ Error creating backup: {e}"), None)
                    .await?;
            }
        }
        Ok(())
    }

    async fn status_text(&self) -> Result<String> {
        let nodes = self.repo.list_nodes().await?;
        let tunnels = self.repo.list_tunnels().await?;
        let active_nodes = nodes.iter().filter(|n| n.status.is_active()).count();
        let active_tunnels = tunnels.iter().filter(|t| t.status.is_active()).count();
        Ok(format!(
            "📊 Panel Status:\n\n🖥️ Nodes: {active_nodes}/{} active\n🔗 Tunnels: {active_tunnels}/{} active\n",
            nodes.len(),
            tunnels.len()
        ))
    }
}

fn status_dot(active: bool) -> &'static str {
    if active {
        "🟢"
    } else {
        "🔴"
    }
}

fn short_id(id: &str) -> String {
    let prefix: String = id.chars().take(8).collect();
    format!("{prefix}...")
}

fn nodes_text(nodes: &[Node]) -> String {
    let mut text = String::from("🖥️ Nodes:\n\n");
    for node in nodes {
        text.push_str(&format!(
            "{} {} ({})\n   ID: {}\n\n",
            status_dot(node.status.is_active()),
            node.name,
            node.role(),
            short_id(&node.id)
        ));
    }
    text
}

fn nodes_keyboard(nodes: &[Node], back_to_status: bool) -> InlineKeyboard {
    let mut kb = InlineKeyboard::new();
    for node in nodes {
        kb = kb.row(vec![InlineButton::new(
            format!("📊 {}", node.name),
            format!("node_info_{}", node.id),
        )]);
    }
    if back_to_status {
        kb = kb.row(vec![InlineButton::new("🔙 Back to Status", "cmd_status")]);
    }
    kb
}

fn tunnels_text(tunnels: &[Tunnel]) -> String {
    let mut text = format!("🔗 Tunnels ({}):\n\n", tunnels.len());
    for tunnel in tunnels.iter().take(TUNNEL_LIST_LIMIT) {
        text.push_str(&format!(
            "{} {} ({})\n",
            status_dot(tunnel.status.is_active()),
            tunnel.name,
            tunnel.core
        ));
    }
    if tunnels.len() > TUNNEL_LIST_LIMIT {
        text.push_str(&format!(
            "\n... and {} more",
            tunnels.len() - TUNNEL_LIST_LIMIT
        ));
    }
    text
}

fn tunnels_keyboard(tunnels: &[Tunnel], back_to_status: bool) -> InlineKeyboard {
    let mut kb = InlineKeyboard::new();
    for tunnel in tunnels.iter().take(TUNNEL_BUTTON_LIMIT) {
        kb = kb.row(vec![InlineButton::new(
            format!("🔗 {}", tunnel.name),
            format!("tunnel_info_{}", tunnel.id),
        )]);
    }
    if back_to_status {
        kb = kb.row(vec![InlineButton::new("🔙 Back to Status", "cmd_status")]);
    }
    kb
}

fn node_detail_text(node: &Node) -> String {
    format!(
        "🖥️ Node: {}\n\n📋 ID: {}\n🌐 Role: {}\n📍 IP: {}\n📊 Status: {}\n",
        node.name,
        node.id,
        node.role(),
        node.ip(),
        node.status.as_str()
    )
}

fn tunnel_detail_text(tunnel: &Tunnel) -> String {
    format!(
        "🔗 Tunnel: {}\n\n📋 ID: {}\n🔧 Core: {}\n📊 Status: {}\n",
        tunnel.name, tunnel.id, tunnel.core, tunnel.status.as_str()
    )
}

fn status_keyboard() -> InlineKeyboard {
    InlineKeyboard::new()
        .row(vec![
            InlineButton::new("🖥️ View Nodes", "cmd_nodes"),
            InlineButton::new("🔗 View Tunnels", "cmd_tunnels"),
        ])
        .row(vec![
            InlineButton::new("📦 Create Backup", "cmd_backup"),
            InlineButton::new("🔄 Refresh", "cmd_status"),
        ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::domain::{MessageId, NodeMetadata, ResourceStatus};
    use crate::Error;

    struct FakeRepo {
        nodes: Vec<Node>,
        tunnels: Vec<Tunnel>,
        settings: serde_json::Value,
    }

    impl FakeRepo {
        fn new() -> Self {
            Self {
                nodes: vec![],
                tunnels: vec![],
                settings: serde_json::json!({
                    "enabled": true,
                    "bot_token": "123:abc",
                    "admin_ids": ["10"]
                }),
            }
        }
    }

    #[async_trait]
    impl PanelRepository for FakeRepo {
        async fn get_setting(&self, _key: &str) -> Result<Option<serde_json::Value>> {
            Ok(Some(self.settings.clone()))
        }
        async fn list_nodes(&self) -> Result<Vec<Node>> {
            Ok(self.nodes.clone())
        }
        async fn list_tunnels(&self) -> Result<Vec<Tunnel>> {
            Ok(self.tunnels.clone())
        }
        async fn get_node(&self, id: &str) -> Result<Option<Node>> {
            Ok(self.nodes.iter().find(|n| n.id == id).cloned())
        }
        async fn get_tunnel(&self, id: &str) -> Result<Option<Tunnel>> {
            Ok(self.tunnels.iter().find(|t| t.id == id).cloned())
        }
    }

    #[derive(Debug, PartialEq)]
    enum Sent {
        Text {
            chat: i64,
            text: String,
            buttons: usize,
        },
        Edit {
            text: String,
            buttons: usize,
        },
        Document {
            chat: i64,
            file_name: String,
        },
        Answer,
    }

    #[derive(Default)]
    struct SpyMessenger {
        log: Mutex<Vec<Sent>>,
    }

    impl SpyMessenger {
        fn log(&self) -> Vec<Sent> {
            std::mem::take(&mut self.log.lock().unwrap())
        }
    }

    fn button_count(kb: &Option<InlineKeyboard>) -> usize {
        kb.as_ref()
            .map(|k| k.rows.iter().map(|r| r.len()).sum())
            .unwrap_or(0)
    }

    #[async_trait]
    impl MessengerPort for SpyMessenger {
        async fn send_text(
            &self,
            chat_id: ChatId,
            text: &str,
            keyboard: Option<InlineKeyboard>,
        ) -> Result<MessageRef> {
            self.log.lock().unwrap().push(Sent::Text {
                chat: chat_id.0,
                text: text.to_string(),
                buttons: button_count(&keyboard),
            });
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(1),
            })
        }
        async fn edit_text(
            &self,
            _msg: MessageRef,
            text: &str,
            keyboard: Option<InlineKeyboard>,
        ) -> Result<()> {
            self.log.lock().unwrap().push(Sent::Edit {
                text: text.to_string(),
                buttons: button_count(&keyboard),
            });
            Ok(())
        }
        async fn send_document(
            &self,
            chat_id: ChatId,
            _file: &Path,
            file_name: &str,
            _caption: Option<&str>,
        ) -> Result<()> {
            self.log.lock().unwrap().push(Sent::Document {
                chat: chat_id.0,
                file_name: file_name.to_string(),
            });
            Ok(())
        }
        async fn answer_callback(&self, _callback_id: &str, _text: Option<&str>) -> Result<()> {
            self.log.lock().unwrap().push(Sent::Answer);
            Ok(())
        }
    }

    struct FileProducer {
        dir: PathBuf,
        fail: bool,
    }

    #[async_trait]
    impl BackupProducer for FileProducer {
        async fn produce(&self) -> Result<PathBuf> {
            if self.fail {
                return Err(Error::Backup("disk full".to_string()));
            }
            std::fs::create_dir_all(&self.dir).unwrap();
            let path = self.dir.join("panel_backup_20250101_000000.zip");
            std::fs::write(&path, b"zip").unwrap();
            Ok(path)
        }
    }

    fn node(id: &str, name: &str, active: bool) -> Node {
        Node {
            id: id.to_string(),
            name: name.to_string(),
            status: if active {
                ResourceStatus::Active
            } else {
                ResourceStatus::Inactive
            },
            metadata: NodeMetadata {
                role: Some("edge".to_string()),
                ip_address: Some("10.0.0.1".to_string()),
            },
        }
    }

    fn tunnel(id: &str, name: &str, active: bool) -> Tunnel {
        Tunnel {
            id: id.to_string(),
            name: name.to_string(),
            core: "wireguard".to_string(),
            status: if active {
                ResourceStatus::Active
            } else {
                ResourceStatus::Inactive
            },
        }
    }

    fn router_with(repo: FakeRepo, fail_backup: bool) -> (CommandRouter, Arc<SpyMessenger>) {
        let messenger = Arc::new(SpyMessenger::default());
        let producer = Arc::new(FileProducer {
            dir: PathBuf::from(format!(
                "/tmp/panelbot-router-{}-{:p}",
                std::process::id(),
                &messenger
            )),
            fail: fail_backup,
        });
        (
            CommandRouter::new(Arc::new(repo), producer, messenger.clone()),
            messenger,
        )
    }

    fn cmd(command: &str) -> CommandUpdate {
        CommandUpdate {
            chat_id: ChatId(10),
            user_id: Some(UserId(10)),
            command: command.to_string(),
        }
    }

    fn callback(data: &str) -> CallbackUpdate {
        CallbackUpdate {
            callback_id: "cb1".to_string(),
            user_id: UserId(10),
            message: Some(MessageRef {
                chat_id: ChatId(10),
                message_id: MessageId(5),
            }),
            data: data.to_string(),
        }
    }

    #[tokio::test]
    async fn unauthorized_sender_is_denied() {
        let (router, messenger) = router_with(FakeRepo::new(), false);
        let update = CommandUpdate {
            chat_id: ChatId(99),
            user_id: Some(UserId(99)),
            command: "nodes".to_string(),
        };
        router.handle_command(update).await.unwrap();

        assert_eq!(
            messenger.log(),
            vec![Sent::Text {
                chat: 99,
                text: ACCESS_DENIED.to_string(),
                buttons: 0
            }]
        );
    }

    #[tokio::test]
    async fn empty_node_list_has_no_keyboard() {
        let (router, messenger) = router_with(FakeRepo::new(), false);
        router.handle_command(cmd("nodes")).await.unwrap();

        let log = messenger.log();
        assert_eq!(log.len(), 1);
        assert!(matches!(&log[0], Sent::Text { text, buttons: 0, .. } if text.contains("No nodes")));
    }

    #[tokio::test]
    async fn nodes_list_has_a_button_per_node() {
        let mut repo = FakeRepo::new();
        repo.nodes = vec![node("aaaabbbbcccc", "edge-1", true), node("dddd", "edge-2", false)];
        let (router, messenger) = router_with(repo, false);
        router.handle_command(cmd("nodes")).await.unwrap();

        let log = messenger.log();
        let Sent::Text { text, buttons, .. } = &log[0] else {
            panic!("expected text send, got {:?}", log[0]);
        };
        assert!(text.contains("🟢 edge-1 (edge)"));
        assert!(text.contains("🔴 edge-2 (edge)"));
        assert!(text.contains("ID: aaaabbbb..."));
        assert_eq!(*buttons, 2);
    }

    #[tokio::test]
    async fn long_tunnel_list_is_truncated() {
        let mut repo = FakeRepo::new();
        repo.tunnels = (0..12)
            .map(|i| tunnel(&format!("t{i}"), &format!("tun-{i}"), true))
            .collect();
        let (router, messenger) = router_with(repo, false);
        router.handle_command(cmd("tunnels")).await.unwrap();

        let log = messenger.log();
        let Sent::Text { text, buttons, .. } = &log[0] else {
            panic!("expected text send, got {:?}", log[0]);
        };
        assert!(text.starts_with("🔗 Tunnels (12):"));
        assert!(text.contains("... and 2 more"));
        assert!(!text.contains("tun-11"));
        assert_eq!(*buttons, TUNNEL_BUTTON_LIMIT);
    }

    #[tokio::test]
    async fn status_counts_active_resources() {
        let mut repo = FakeRepo::new();
        repo.nodes = vec![node("a", "n1", true), node("b", "n2", false)];
        repo.tunnels = vec![tunnel("t", "t1", true)];
        let (router, messenger) = router_with(repo, false);
        router.handle_command(cmd("status")).await.unwrap();

        let log = messenger.log();
        let Sent::Text { text, buttons, .. } = &log[0] else {
            panic!("expected text send, got {:?}", log[0]);
        };
        assert!(text.contains("Nodes: 1/2 active"));
        assert!(text.contains("Tunnels: 1/1 active"));
        assert_eq!(*buttons, 4);
    }

    #[tokio::test]
    async fn backup_command_sends_document_and_deletes_artifact() {
        let messenger = Arc::new(SpyMessenger::default());
        let dir = PathBuf::from(format!("/tmp/panelbot-router-del-{}", std::process::id()));
        let producer = Arc::new(FileProducer {
            dir: dir.clone(),
            fail: false,
        });
        let router = CommandRouter::new(Arc::new(FakeRepo::new()), producer, messenger.clone());
        router.handle_command(cmd("backup")).await.unwrap();

        let log = messenger.log();
        assert!(matches!(&log[0], Sent::Text { text, .. } if text.contains("Creating backup")));
        let Sent::Document { chat, file_name } = &log[1] else {
            panic!("expected document send, got {:?}", log[1]);
        };
        assert_eq!(*chat, 10);
        assert_eq!(file_name, "panel_backup_20250101_000000.zip");
        assert!(!dir.join("panel_backup_20250101_000000.zip").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn backup_failure_reports_error_text() {
        let (router, messenger) = router_with(FakeRepo::new(), true);
        router.handle_command(cmd("backup")).await.unwrap();

        let log = messenger.log();
        assert!(matches!(&log[1], Sent::Text { text, .. } if text.contains("Error creating backup")));
    }

    #[tokio::test]
    async fn unknown_command_is_ignored() {
        let (router, messenger) = router_with(FakeRepo::new(), false);
        router.handle_command(cmd("reboot")).await.unwrap();
        assert!(messenger.log().is_empty());
    }

    #[tokio::test]
    async fn node_info_callback_edits_with_detail() {
        let mut repo = FakeRepo::new();
        repo.nodes = vec![node("abc", "edge-1", true)];
        let (router, messenger) = router_with(repo, false);
        router.handle_callback(callback("node_info_abc")).await.unwrap();

        let log = messenger.log();
        assert_eq!(log[0], Sent::Answer);
        let Sent::Edit { text, buttons } = &log[1] else {
            panic!("expected edit, got {:?}", log[1]);
        };
        assert!(text.contains("Node: edge-1"));
        assert!(text.contains("IP: 10.0.0.1"));
        assert_eq!(*buttons, 1);
    }

    #[tokio::test]
    async fn unknown_node_id_yields_not_found() {
        let (router, messenger) = router_with(FakeRepo::new(), false);
        router
            .handle_callback(callback("node_info_missing"))
            .await
            .unwrap();

        let log = messenger.log();
        assert!(matches!(&log[1], Sent::Edit { text, .. } if text.contains("Node not found")));
    }

    #[tokio::test]
    async fn status_callback_edits_in_place() {
        let (router, messenger) = router_with(FakeRepo::new(), false);
        router.handle_callback(callback("cmd_status")).await.unwrap();

        let log = messenger.log();
        assert_eq!(log[0], Sent::Answer);
        assert!(matches!(&log[1], Sent::Edit { text, buttons: 4 } if text.contains("Panel Status")));
    }

    #[tokio::test]
    async fn backup_callback_edits_progress_then_final_status() {
        let (router, messenger) = router_with(FakeRepo::new(), false);
        router.handle_callback(callback("cmd_backup")).await.unwrap();

        let log = messenger.log();
        assert_eq!(log[0], Sent::Answer);
        assert!(matches!(&log[1], Sent::Edit { text, .. } if text.contains("Creating backup")));
        assert!(matches!(&log[2], Sent::Document { .. }));
        assert!(matches!(&log[3], Sent::Edit { text, .. } if text.contains("sent successfully")));
    }

    #[tokio::test]
    async fn callback_list_views_append_back_button() {
        let mut repo = FakeRepo::new();
        repo.nodes = vec![node("abc", "edge-1", true)];
        let (router, messenger) = router_with(repo, false);
        router.handle_callback(callback("cmd_nodes")).await.unwrap();

        let log = messenger.log();
        // One button per node plus the back-to-status row.
        assert!(matches!(&log[1], Sent::Edit { buttons: 2, .. }));
    }
}
