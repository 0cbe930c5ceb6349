use std::time::{Duration, Instant};

use chrono::Utc;

use crate::domain::{
    directory::ServerDirectory,
    dm_list::DmListState,
    events::{ConnectionStatus, RealtimeEvent},
    message::{Message, UserIdentity},
    navigation::{NavTarget, NavigationState},
    stream::{FetchOutcome, FetchTicket, MessageStream},
};

use super::{
    bridge::RealtimeEventBridge,
    channel_sync::{ChannelMessageSync, SendOutcome},
    contracts::{BackendError, ChannelMessagesApi, DirectoryApi, DmApi, IdentityApi},
    dm_sync::{DmMessageSync, DmPollRequest},
};

const SEND_FAILED_NOTICE: &str = "Message failed to send";

/// Owns navigation and message-view state for the whole dashboard session.
///
/// All mutations funnel through here, so the shared message view is only
/// ever written by the sync component matching the current navigation
/// target. Collaborators are injected, which keeps every piece testable
/// against in-memory stubs.
pub struct ViewController<A> {
    api: A,
    nav: NavigationState,
    directory: ServerDirectory,
    identity: Option<UserIdentity>,
    channel_sync: ChannelMessageSync,
    dm_sync: DmMessageSync,
    dm_list: DmListState,
    connection: ConnectionStatus,
    notice: Option<String>,
}

impl<A> ViewController<A>
where
    A: ChannelMessagesApi + DmApi + DirectoryApi + IdentityApi,
{
    pub fn new(api: A, poll_interval: Duration) -> Self {
        Self {
            api,
            nav: NavigationState::new(""),
            directory: ServerDirectory::default(),
            identity: None,
            channel_sync: ChannelMessageSync::default(),
            dm_sync: DmMessageSync::new(poll_interval),
            dm_list: DmListState::default(),
            connection: ConnectionStatus::Connecting,
            notice: None,
        }
    }

    /// Startup sequence: directory, identity, DM sidebar, then the default
    /// channel of the first server. Each piece degrades independently; a
    /// failed call leaves a recoverable empty view, never a crash.
    pub async fn initialize(&mut self) {
        match self.api.load_directory().await {
            Ok(directory) => self.directory = directory,
            Err(error) => {
                tracing::warn!(error = ?error, "server directory unavailable at startup");
            }
        }

        match self.api.current_user().await {
            Ok(identity) => self.identity = Some(identity),
            Err(error) => {
                // Known degradation: without an identity every message
                // classifies as "other".
                tracing::warn!(error = ?error, "current user unavailable; own/other classification degraded");
            }
        }

        match self.api.list_dms().await {
            Ok(conversations) => self.dm_list.set_ready(conversations),
            Err(error) => {
                tracing::warn!(error = ?error, "DM list unavailable at startup");
                self.dm_list.set_error();
            }
        }

        let first_server = self.directory.servers().first().map(|s| s.id.clone());
        if let Some(server_id) = first_server {
            self.select_server(&server_id).await;
        }
    }

    pub async fn select_server(&mut self, server_id: &str) {
        if self.directory.server(server_id).is_none() {
            tracing::warn!(server_id, "ignoring navigation to unknown server");
            return;
        }

        self.nav.select_server(server_id);
        self.dm_sync.leave();
        self.channel_sync.leave();

        if let Some(channel) = self.directory.first_channel(server_id) {
            let channel_id = channel.id.clone();
            self.select_channel(&channel_id).await;
        }
    }

    pub async fn select_channel(&mut self, channel_id: &str) {
        let server_id = self.nav.current_server_id().to_owned();
        if !self.directory.has_channel(&server_id, channel_id) {
            tracing::warn!(server_id, channel_id, "ignoring navigation to unknown channel");
            return;
        }

        self.nav.select_channel(channel_id);
        self.dm_sync.leave();
        self.channel_sync
            .enter(&self.api, channel_id, self.identity.as_ref())
            .await;
    }

    pub async fn select_dm(&mut self, dm_id: &str) {
        let entered = self
            .dm_sync
            .enter(
                &self.api,
                &mut self.dm_list,
                dm_id,
                self.identity.as_ref(),
                Instant::now(),
            )
            .await;
        if !entered {
            return;
        }

        self.nav.select_dm(dm_id);
        self.channel_sync.leave();
    }

    /// Sends the composer text to whichever view is active.
    pub async fn compose(&mut self, text: &str) -> SendOutcome {
        let now_seconds = Utc::now().timestamp();

        let outcome = match self.nav.target() {
            NavTarget::Channel { .. } => {
                self.channel_sync
                    .send(&self.api, self.identity.as_ref(), text, now_seconds)
                    .await
            }
            NavTarget::Dm { .. } => {
                self.dm_sync
                    .send(&self.api, self.identity.as_ref(), text, now_seconds)
                    .await
            }
            NavTarget::None => SendOutcome::Ignored,
        };

        if outcome == SendOutcome::Failed {
            self.notice = Some(SEND_FAILED_NOTICE.to_owned());
        }
        outcome
    }

    /// First half of the DM polling fallback: decides whether a poll is due
    /// and issues the fetch request. The caller runs the network fetch with
    /// the controller unlocked and hands the result to `finish_dm_poll`.
    pub fn begin_dm_poll(&mut self, now: Instant) -> Option<DmPollRequest> {
        if matches!(self.nav.target(), NavTarget::Dm { .. }) {
            self.dm_sync.begin_poll(now)
        } else {
            None
        }
    }

    /// Second half of the DM polling fallback. Responses that raced a
    /// navigation change are rejected by their ticket.
    pub fn finish_dm_poll(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<Message>, BackendError>,
    ) -> Option<FetchOutcome> {
        self.dm_sync.finish_poll(ticket, result)
    }

    pub fn on_realtime(&mut self, event: RealtimeEvent) {
        RealtimeEventBridge::route(
            &self.nav,
            &mut self.channel_sync,
            &mut self.dm_sync,
            &mut self.dm_list,
            self.identity.as_ref(),
            event,
        );
    }

    pub fn set_connection_status(&mut self, status: ConnectionStatus) {
        if self.connection == status {
            return;
        }
        self.connection = status;

        self.notice = Some(match status {
            ConnectionStatus::Connected => "Connected to server".to_owned(),
            ConnectionStatus::Disconnected => "Connection lost".to_owned(),
            ConnectionStatus::Connecting => "Connecting…".to_owned(),
        });
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection
    }

    /// One-shot transient notice for the UI (toast equivalent).
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    pub fn nav(&self) -> &NavigationState {
        &self.nav
    }

    pub fn directory(&self) -> &ServerDirectory {
        &self.directory
    }

    pub fn dm_list(&self) -> &DmListState {
        &self.dm_list
    }

    pub fn identity(&self) -> Option<&UserIdentity> {
        self.identity.as_ref()
    }

    /// The stream backing the shared message view. Exactly one sync
    /// component provides it, decided solely by the navigation target.
    pub fn active_stream(&self) -> Option<&MessageStream> {
        match self.nav.target() {
            NavTarget::Channel { .. } => self.channel_sync.stream(),
            NavTarget::Dm { .. } => self.dm_sync.stream(),
            NavTarget::None => None,
        }
    }

    /// Cache token for the rendered transcript: changes iff the visible
    /// content may have changed.
    pub fn view_token(&self) -> String {
        match self.active_stream() {
            Some(stream) => format!("{}:{}", stream.owner_id(), stream.revision()),
            None => "none".to_owned(),
        }
    }

    /// Heading for the message view: `#channel` or `@username`.
    pub fn view_title(&self) -> String {
        match self.nav.target() {
            NavTarget::Channel {
                server_id,
                channel_id,
            } => self
                .directory
                .server(&server_id)
                .and_then(|server| server.channels.iter().find(|c| c.id == channel_id))
                .map(|channel| format!("#{}", channel.name))
                .unwrap_or_default(),
            NavTarget::Dm { .. } => self
                .dm_sync
                .conversation()
                .map(|conversation| format!("@{}", conversation.other_user.username))
                .unwrap_or_default(),
            NavTarget::None => String::new(),
        }
    }
}
