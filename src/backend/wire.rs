//! Wire types for the platform's HTTP and websocket APIs.
//!
//! Deserialization happens here only; the rest of the crate works with
//! domain types and never sees raw JSON.

use serde::{Deserialize, Serialize};

use crate::domain::{
    directory::{ChannelSummary, ServerDirectory, ServerSummary},
    dm_list::{DmConversation, OtherUser},
    events::RealtimeEvent,
    message::{Message, UserIdentity},
};

#[derive(Debug, Clone, Deserialize)]
pub struct MessageWire {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    #[serde(default)]
    pub avatar_url: String,
    pub content: String,
    pub timestamp: i64,
}

impl MessageWire {
    pub fn into_message(self) -> Message {
        Message {
            id: self.id,
            author_id: self.author_id,
            author_name: self.author_name,
            avatar_url: self.avatar_url,
            content: self.content,
            timestamp_seconds: self.timestamp,
            pending: false,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SendMessageWire<'a> {
    pub content: &'a str,
}

/// History responses arrive wrapped, not as bare arrays.
#[derive(Debug, Deserialize)]
pub struct MessagesEnvelope {
    pub messages: Vec<MessageWire>,
}

#[derive(Debug, Deserialize)]
pub struct DmsEnvelope {
    pub dms: Vec<DmConversationWire>,
}

#[derive(Debug, Deserialize)]
pub struct DirectoryWire {
    pub servers: Vec<ServerWire>,
}

#[derive(Debug, Deserialize)]
pub struct ServerWire {
    pub id: String,
    pub name: String,
    pub channels: Vec<ChannelWire>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelWire {
    pub id: String,
    pub name: String,
}

impl DirectoryWire {
    pub fn into_directory(self) -> ServerDirectory {
        ServerDirectory::new(
            self.servers
                .into_iter()
                .map(|server| ServerSummary {
                    id: server.id,
                    name: server.name,
                    channels: server
                        .channels
                        .into_iter()
                        .map(|channel| ChannelSummary {
                            id: channel.id,
                            name: channel.name,
                        })
                        .collect(),
                })
                .collect(),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct IdentityWire {
    pub id: String,
    pub username: String,
}

impl IdentityWire {
    pub fn into_identity(self) -> UserIdentity {
        UserIdentity {
            id: self.id,
            username: self.username,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DmConversationWire {
    pub id: String,
    pub other_user: OtherUserWire,
}

#[derive(Debug, Deserialize)]
pub struct OtherUserWire {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub avatar_url: String,
}

impl DmConversationWire {
    pub fn into_conversation(self) -> DmConversation {
        DmConversation {
            id: self.id,
            other_user: OtherUser {
                id: self.other_user.id,
                username: self.other_user.username,
                avatar_url: self.other_user.avatar_url,
            },
        }
    }
}

/// Push event frames, tagged by `kind`. Unknown kinds fail to parse and are
/// skipped by the monitor, so new server-side events never break the client.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventWire {
    ChannelMessage {
        server_id: String,
        channel_id: String,
        message: MessageWire,
    },
    DmMessage {
        dm_id: String,
        message: MessageWire,
    },
}

impl EventWire {
    pub fn into_event(self) -> RealtimeEvent {
        match self {
            Self::ChannelMessage {
                server_id,
                channel_id,
                message,
            } => RealtimeEvent::ChannelMessage {
                server_id,
                channel_id,
                message: message.into_message(),
            },
            Self::DmMessage { dm_id, message } => RealtimeEvent::DmMessage {
                dm_id,
                message: message.into_message(),
            },
        }
    }
}
