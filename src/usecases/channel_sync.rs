use crate::domain::{
    message::{Message, UserIdentity},
    stream::{MessageStream, SendRejected},
};

use super::contracts::ChannelMessagesApi;

/// Result of an outgoing send, surfaced to the UI as a transient notice on
/// failure. An empty input is silently ignored, matching the composer's
/// behavior rather than treating it as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    Ignored,
    Failed,
}

/// Synchronizes the message history of the active text channel.
///
/// Channels have no polling fallback: history is fetched on entry and kept
/// fresh through push events; the next entry re-fetches in full.
#[derive(Debug, Default)]
pub struct ChannelMessageSync {
    stream: Option<MessageStream>,
}

impl ChannelMessageSync {
    pub fn stream(&self) -> Option<&MessageStream> {
        self.stream.as_ref()
    }

    /// Loads the channel's history, replacing any previous stream state.
    pub async fn enter<A: ChannelMessagesApi>(
        &mut self,
        api: &A,
        channel_id: &str,
        identity: Option<&UserIdentity>,
    ) {
        let mut stream = MessageStream::new(channel_id, identity.map(|user| user.id.clone()));
        let ticket = stream.begin_fetch();

        match api.list_channel_messages(channel_id).await {
            Ok(messages) => {
                stream.apply_fetch(&ticket, messages);
            }
            Err(error) => {
                tracing::warn!(channel_id, error = ?error, "channel history fetch failed");
                stream.fail_fetch(&ticket);
            }
        }

        self.stream = Some(stream);
    }

    /// Tears the stream down when the channel view is left; any in-flight
    /// response for it becomes stale and is dropped on arrival.
    pub fn leave(&mut self) {
        self.stream = None;
    }

    /// Optimistically appends and transmits an outgoing message.
    pub async fn send<A: ChannelMessagesApi>(
        &mut self,
        api: &A,
        identity: Option<&UserIdentity>,
        text: &str,
        now_seconds: i64,
    ) -> SendOutcome {
        let Some(stream) = self.stream.as_mut() else {
            return SendOutcome::Ignored;
        };
        let channel_id = stream.owner_id().to_owned();

        let (author_id, author_name) = match identity {
            Some(user) => (user.id.clone(), user.username.clone()),
            None => (String::new(), "You".to_owned()),
        };

        let optimistic =
            match stream.begin_send(text, &author_id, &author_name, "", now_seconds) {
                Ok(message) => message,
                Err(SendRejected::EmptyMessage) => return SendOutcome::Ignored,
                Err(SendRejected::SendInFlight) => {
                    tracing::debug!(channel_id, "send ignored while another is in flight");
                    return SendOutcome::Ignored;
                }
            };

        match api.post_channel_message(&channel_id, &optimistic.content).await {
            Ok(canonical) => {
                stream.confirm_send(&optimistic.id, canonical);
                SendOutcome::Sent
            }
            Err(error) => {
                tracing::warn!(channel_id, error = ?error, "channel send failed; rolling back");
                stream.fail_send(&optimistic.id);
                SendOutcome::Failed
            }
        }
    }

    /// Appends a push-delivered message if it belongs to the active stream.
    pub fn apply_live(&mut self, channel_id: &str, message: Message) {
        if let Some(stream) = self.stream.as_mut() {
            if stream.owner_id() == channel_id {
                stream.append_live(message);
            }
        }
    }
}
