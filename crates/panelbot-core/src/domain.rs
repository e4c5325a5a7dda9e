use serde::Deserialize;

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Liveness of a node or tunnel as recorded by the panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceStatus {
    Active,
    Inactive,
}

impl ResourceStatus {
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("active") {
            Self::Active
        } else {
            Self::Inactive
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Extra node attributes stored as a JSON blob in the panel database.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NodeMetadata {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub status: ResourceStatus,
    pub metadata: NodeMetadata,
}

impl Node {
    pub fn role(&self) -> &str {
        self.metadata.role.as_deref().unwrap_or("unknown")
    }

    pub fn ip(&self) -> &str {
        self.metadata.ip_address.as_deref().unwrap_or("N/A")
    }
}

#[derive(Clone, Debug)]
pub struct Tunnel {
    pub id: String,
    pub name: String,
    /// The proxy engine the tunnel runs on.
    pub core: String,
    pub status: ResourceStatus,
}
