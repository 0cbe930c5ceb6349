use async_trait::async_trait;

use crate::domain::{
    directory::ServerDirectory,
    dm_list::DmConversation,
    message::{Message, UserIdentity},
};

/// Transport-level failure of a backend call.
///
/// Everything here is recoverable from the client's point of view: the worst
/// outcome is a stale or empty view that the next navigation refreshes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Network failure, timeout, or 5xx.
    Unavailable,
    /// The requested channel or conversation does not exist.
    NotFound,
    /// Response did not match the wire contract.
    InvalidData,
}

#[async_trait]
pub trait ChannelMessagesApi {
    async fn list_channel_messages(&self, channel_id: &str) -> Result<Vec<Message>, BackendError>;

    async fn post_channel_message(
        &self,
        channel_id: &str,
        text: &str,
    ) -> Result<Message, BackendError>;
}

#[async_trait]
pub trait DmApi {
    async fn list_dms(&self) -> Result<Vec<DmConversation>, BackendError>;

    async fn list_dm_messages(&self, dm_id: &str) -> Result<Vec<Message>, BackendError>;

    async fn send_dm_message(&self, dm_id: &str, text: &str) -> Result<Message, BackendError>;
}

#[async_trait]
pub trait DirectoryApi {
    async fn load_directory(&self) -> Result<ServerDirectory, BackendError>;
}

#[async_trait]
pub trait IdentityApi {
    async fn current_user(&self) -> Result<UserIdentity, BackendError>;
}
