use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use crate::{
    domain::{
        directory::ServerDirectory,
        dm_list::DmConversation,
        message::{Message, UserIdentity},
    },
    infra::config::ApiConfig,
    usecases::contracts::{
        BackendError, ChannelMessagesApi, DirectoryApi, DmApi, IdentityApi,
    },
};

use super::wire::{
    DirectoryWire, DmConversationWire, DmsEnvelope, IdentityWire, MessageWire, MessagesEnvelope,
    SendMessageWire,
};

/// HTTP adapter for the platform API. One instance is shared by every
/// usecase; reqwest pools connections internally.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("invalid api base_url: {}", config.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("api base_url must be an http(s) url: {}", config.base_url);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .context("failed to build http client")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds an endpoint url from individual path segments, so ids with
    /// reserved characters are percent-encoded instead of splitting the
    /// path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                tracing::error!(base_url = %self.base_url, "api base_url has no path segments");
                BackendError::InvalidData
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        segments: &[&str],
    ) -> Result<T, BackendError> {
        let url = self.endpoint(segments)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;
        decode_json(response).await
    }

    async fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, BackendError> {
        let url = self.endpoint(segments)?;
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        decode_json(response).await
    }
}

fn map_transport_error(error: reqwest::Error) -> BackendError {
    tracing::warn!(error = %error, "api request failed");
    BackendError::Unavailable
}

fn map_status(status: StatusCode) -> BackendError {
    if status == StatusCode::NOT_FOUND {
        BackendError::NotFound
    } else {
        BackendError::Unavailable
    }
}

async fn decode_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, BackendError> {
    let status = response.status();
    if !status.is_success() {
        tracing::warn!(status = %status, "api responded with error status");
        return Err(map_status(status));
    }

    response.json::<T>().await.map_err(|error| {
        tracing::warn!(error = %error, "api response did not match the wire contract");
        BackendError::InvalidData
    })
}

#[async_trait]
impl ChannelMessagesApi for HttpBackend {
    async fn list_channel_messages(&self, channel_id: &str) -> Result<Vec<Message>, BackendError> {
        let envelope: MessagesEnvelope = self
            .get_json(&["api", "channels", channel_id, "messages"])
            .await?;
        Ok(envelope
            .messages
            .into_iter()
            .map(MessageWire::into_message)
            .collect())
    }

    async fn post_channel_message(
        &self,
        channel_id: &str,
        text: &str,
    ) -> Result<Message, BackendError> {
        let wire: MessageWire = self
            .post_json(
                &["api", "channels", channel_id, "messages"],
                &SendMessageWire { content: text },
            )
            .await?;
        Ok(wire.into_message())
    }
}

#[async_trait]
impl DmApi for HttpBackend {
    async fn list_dms(&self) -> Result<Vec<DmConversation>, BackendError> {
        let envelope: DmsEnvelope = self.get_json(&["api", "dms"]).await?;
        Ok(envelope
            .dms
            .into_iter()
            .map(DmConversationWire::into_conversation)
            .collect())
    }

    async fn list_dm_messages(&self, dm_id: &str) -> Result<Vec<Message>, BackendError> {
        let envelope: MessagesEnvelope =
            self.get_json(&["api", "dms", dm_id, "messages"]).await?;
        Ok(envelope
            .messages
            .into_iter()
            .map(MessageWire::into_message)
            .collect())
    }

    async fn send_dm_message(&self, dm_id: &str, text: &str) -> Result<Message, BackendError> {
        let wire: MessageWire = self
            .post_json(
                &["api", "dms", dm_id, "messages"],
                &SendMessageWire { content: text },
            )
            .await?;
        Ok(wire.into_message())
    }
}

#[async_trait]
impl DirectoryApi for HttpBackend {
    async fn load_directory(&self) -> Result<ServerDirectory, BackendError> {
        let wire: DirectoryWire = self.get_json(&["api", "directory"]).await?;
        Ok(wire.into_directory())
    }
}

#[async_trait]
impl IdentityApi for HttpBackend {
    async fn current_user(&self) -> Result<UserIdentity, BackendError> {
        let wire: IdentityWire = self.get_json(&["api", "me"]).await?;
        Ok(wire.into_identity())
    }
}
