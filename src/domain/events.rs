use super::message::Message;

/// Server-pushed event, consumed once by the realtime bridge and discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeEvent {
    ChannelMessage {
        server_id: String,
        channel_id: String,
        message: Message,
    },
    DmMessage {
        dm_id: String,
        message: Message,
    },
}

/// Health of the persistent push subscription, surfaced in the UI header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}
