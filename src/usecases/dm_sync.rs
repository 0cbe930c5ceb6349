use std::time::{Duration, Instant};

use crate::domain::{
    dm_list::{DmConversation, DmListState},
    message::{Message, UserIdentity},
    stream::{FetchOutcome, FetchTicket, MessageStream, SendRejected, StreamUiState},
};

use super::{
    channel_sync::SendOutcome,
    contracts::{BackendError, DmApi},
};

/// Lifecycle of the DM view while a conversation is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmSyncPhase {
    Idle,
    Fetching,
    Displaying,
}

/// A poll the caller has committed to running. The network fetch happens on
/// the caller's side, outside any lock guarding this component; the ticket
/// makes the response safe to apply later, whatever happened in between.
#[derive(Debug)]
pub struct DmPollRequest {
    pub dm_id: String,
    pub ticket: FetchTicket,
}

/// Synchronizes the open one-to-one conversation.
///
/// DMs are kept live through two redundant paths: push events for latency
/// and a fixed-interval poll as the liveness fallback. Both paths funnel
/// into the same `MessageStream` so reconciliation rules apply uniformly.
/// The poll is split into `begin_poll`/`finish_poll` so the caller can run
/// the fetch without holding its state lock. Switching away tears the
/// stream down, which is also the cancellation point for the poll loop;
/// late responses for the old conversation are rejected by their fetch
/// tickets.
#[derive(Debug)]
pub struct DmMessageSync {
    stream: Option<MessageStream>,
    conversation: Option<DmConversation>,
    poll_interval: Duration,
    last_synced_at: Option<Instant>,
}

impl DmMessageSync {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            stream: None,
            conversation: None,
            poll_interval,
            last_synced_at: None,
        }
    }

    pub fn phase(&self) -> DmSyncPhase {
        match self.stream.as_ref().map(MessageStream::ui_state) {
            None => DmSyncPhase::Idle,
            Some(StreamUiState::Loading) => DmSyncPhase::Fetching,
            Some(_) => DmSyncPhase::Displaying,
        }
    }

    pub fn stream(&self) -> Option<&MessageStream> {
        self.stream.as_ref()
    }

    pub fn conversation(&self) -> Option<&DmConversation> {
        self.conversation.as_ref()
    }

    /// Opens a conversation: resolves the other party from the DM list
    /// (fetching the list first if it has not been loaded), then loads the
    /// message history. Returns `false` for an unknown conversation id,
    /// leaving the previous view untouched.
    pub async fn enter<A: DmApi>(
        &mut self,
        api: &A,
        dm_list: &mut DmListState,
        dm_id: &str,
        identity: Option<&UserIdentity>,
        now: Instant,
    ) -> bool {
        if !dm_list.is_loaded() {
            match api.list_dms().await {
                Ok(conversations) => dm_list.set_ready(conversations),
                Err(error) => {
                    tracing::warn!(error = ?error, "DM list fetch failed");
                    dm_list.set_error();
                }
            }
        }

        let Some(conversation) = dm_list.find(dm_id).cloned() else {
            tracing::warn!(dm_id, "ignoring navigation to unknown DM");
            return false;
        };
        dm_list.mark_read(dm_id);
        self.conversation = Some(conversation);

        let mut stream = MessageStream::new(dm_id, identity.map(|user| user.id.clone()));
        let ticket = stream.begin_fetch();
        match api.list_dm_messages(dm_id).await {
            Ok(messages) => {
                stream.apply_fetch(&ticket, messages);
            }
            Err(error) => {
                tracing::warn!(dm_id, error = ?error, "DM history fetch failed");
                stream.fail_fetch(&ticket);
            }
        }

        self.stream = Some(stream);
        self.last_synced_at = Some(now);
        true
    }

    /// Cancellation point: closing the conversation stops the poll loop and
    /// invalidates any in-flight fetch for it.
    pub fn leave(&mut self) {
        self.stream = None;
        self.conversation = None;
        self.last_synced_at = None;
    }

    pub fn poll_due(&self, now: Instant) -> bool {
        if self.phase() == DmSyncPhase::Idle {
            return false;
        }

        match self.last_synced_at {
            Some(last) => now.duration_since(last) >= self.poll_interval,
            None => true,
        }
    }

    /// Starts a liveness poll if one is due, handing the caller the fetch to
    /// run. Issuing the ticket and stamping the sync time happen here, so a
    /// concurrent `leave` or conversation switch invalidates the request.
    pub fn begin_poll(&mut self, now: Instant) -> Option<DmPollRequest> {
        if !self.poll_due(now) {
            return None;
        }
        let stream = self.stream.as_mut()?;

        let dm_id = stream.owner_id().to_owned();
        let ticket = stream.begin_fetch();
        self.last_synced_at = Some(now);
        Some(DmPollRequest { dm_id, ticket })
    }

    /// Reconciles a completed poll fetch. Identical canonical data leaves
    /// the rendered view untouched; a response whose ticket no longer
    /// matches the live stream is discarded.
    pub fn finish_poll(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<Message>, BackendError>,
    ) -> Option<FetchOutcome> {
        match result {
            Ok(messages) => {
                let outcome = match self.stream.as_mut() {
                    Some(stream) => stream.apply_fetch(ticket, messages),
                    // Switched away while the poll was in flight.
                    None => FetchOutcome::Stale,
                };
                if outcome == FetchOutcome::Stale {
                    tracing::debug!("discarding stale DM poll response");
                }
                Some(outcome)
            }
            Err(error) => {
                tracing::debug!(error = ?error, "DM poll failed; keeping last view");
                if let Some(stream) = self.stream.as_mut() {
                    stream.fail_fetch(ticket);
                }
                None
            }
        }
    }

    /// Optimistically appends and transmits an outgoing DM.
    pub async fn send<A: DmApi>(
        &mut self,
        api: &A,
        identity: Option<&UserIdentity>,
        text: &str,
        now_seconds: i64,
    ) -> SendOutcome {
        let Some(stream) = self.stream.as_mut() else {
            return SendOutcome::Ignored;
        };
        let dm_id = stream.owner_id().to_owned();

        let (author_id, author_name) = match identity {
            Some(user) => (user.id.clone(), user.username.clone()),
            None => (String::new(), "You".to_owned()),
        };

        let optimistic = match stream.begin_send(text, &author_id, &author_name, "", now_seconds)
        {
            Ok(message) => message,
            Err(SendRejected::EmptyMessage) => return SendOutcome::Ignored,
            Err(SendRejected::SendInFlight) => {
                tracing::debug!(dm_id, "DM send ignored while another is in flight");
                return SendOutcome::Ignored;
            }
        };

        match api.send_dm_message(&dm_id, &optimistic.content).await {
            Ok(canonical) => {
                stream.confirm_send(&optimistic.id, canonical);
                SendOutcome::Sent
            }
            Err(error) => {
                tracing::warn!(dm_id, error = ?error, "DM send failed; rolling back");
                stream.fail_send(&optimistic.id);
                SendOutcome::Failed
            }
        }
    }

    /// Appends a push-delivered message if it belongs to the open stream.
    pub fn apply_live(&mut self, dm_id: &str, message: Message) {
        if let Some(stream) = self.stream.as_mut() {
            if stream.owner_id() == dm_id {
                stream.append_live(message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::{domain::dm_list::OtherUser, usecases::contracts::BackendError};

    const POLL_INTERVAL: Duration = Duration::from_secs(3);

    struct StubDmApi {
        dms: Result<Vec<DmConversation>, BackendError>,
        history: Mutex<Result<Vec<Message>, BackendError>>,
        send_result: Result<Message, BackendError>,
        list_dms_calls: Mutex<u32>,
    }

    impl StubDmApi {
        fn new(history: Result<Vec<Message>, BackendError>) -> Self {
            Self {
                dms: Ok(vec![conversation("dm-1", "alice")]),
                history: Mutex::new(history),
                send_result: Ok(message("srv-1", "me", "hello")),
                list_dms_calls: Mutex::new(0),
            }
        }

        fn set_history(&self, history: Result<Vec<Message>, BackendError>) {
            *self.history.lock().expect("history lock") = history;
        }
    }

    #[async_trait]
    impl DmApi for StubDmApi {
        async fn list_dms(&self) -> Result<Vec<DmConversation>, BackendError> {
            *self.list_dms_calls.lock().expect("calls lock") += 1;
            self.dms.clone()
        }

        async fn list_dm_messages(&self, _dm_id: &str) -> Result<Vec<Message>, BackendError> {
            self.history.lock().expect("history lock").clone()
        }

        async fn send_dm_message(&self, _dm_id: &str, _text: &str) -> Result<Message, BackendError> {
            self.send_result.clone()
        }
    }

    fn conversation(id: &str, username: &str) -> DmConversation {
        DmConversation {
            id: id.to_owned(),
            other_user: OtherUser {
                id: format!("u-{username}"),
                username: username.to_owned(),
                avatar_url: String::new(),
            },
        }
    }

    fn message(id: &str, author_id: &str, content: &str) -> Message {
        Message {
            id: id.to_owned(),
            author_id: author_id.to_owned(),
            author_name: author_id.to_uppercase(),
            avatar_url: String::new(),
            content: content.to_owned(),
            timestamp_seconds: 1_700_000_000,
            pending: false,
        }
    }

    fn identity() -> UserIdentity {
        UserIdentity {
            id: "me".to_owned(),
            username: "Me".to_owned(),
        }
    }

    #[tokio::test]
    async fn enter_fetches_dm_list_when_absent_and_resolves_conversation() {
        let api = StubDmApi::new(Ok(vec![message("m1", "u-alice", "hey")]));
        let mut sync = DmMessageSync::new(POLL_INTERVAL);
        let mut dm_list = DmListState::default();

        let entered = sync
            .enter(&api, &mut dm_list, "dm-1", Some(&identity()), Instant::now())
            .await;

        assert!(entered);
        assert_eq!(*api.list_dms_calls.lock().expect("calls lock"), 1);
        assert_eq!(
            sync.conversation().map(|c| c.other_user.username.as_str()),
            Some("alice")
        );
        assert_eq!(sync.phase(), DmSyncPhase::Displaying);
        assert_eq!(sync.stream().expect("stream").messages().len(), 1);
    }

    #[tokio::test]
    async fn enter_reuses_already_loaded_dm_list() {
        let api = StubDmApi::new(Ok(vec![]));
        let mut sync = DmMessageSync::new(POLL_INTERVAL);
        let mut dm_list = DmListState::default();
        dm_list.set_ready(vec![conversation("dm-1", "alice")]);

        sync.enter(&api, &mut dm_list, "dm-1", Some(&identity()), Instant::now())
            .await;

        assert_eq!(*api.list_dms_calls.lock().expect("calls lock"), 0);
    }

    #[tokio::test]
    async fn entering_unknown_dm_is_a_no_op() {
        let api = StubDmApi::new(Ok(vec![]));
        let mut sync = DmMessageSync::new(POLL_INTERVAL);
        let mut dm_list = DmListState::default();

        let entered = sync
            .enter(&api, &mut dm_list, "dm-404", Some(&identity()), Instant::now())
            .await;

        assert!(!entered);
        assert_eq!(sync.phase(), DmSyncPhase::Idle);
    }

    #[tokio::test]
    async fn poll_is_due_only_after_the_configured_interval() {
        let api = StubDmApi::new(Ok(vec![]));
        let mut sync = DmMessageSync::new(POLL_INTERVAL);
        let mut dm_list = DmListState::default();
        let t0 = Instant::now();
        sync.enter(&api, &mut dm_list, "dm-1", Some(&identity()), t0)
            .await;

        assert!(!sync.poll_due(t0 + Duration::from_secs(1)));
        assert!(sync.poll_due(t0 + Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn poll_with_identical_data_reports_unchanged() {
        let api = StubDmApi::new(Ok(vec![message("m1", "u-alice", "hey")]));
        let mut sync = DmMessageSync::new(POLL_INTERVAL);
        let mut dm_list = DmListState::default();
        let t0 = Instant::now();
        sync.enter(&api, &mut dm_list, "dm-1", Some(&identity()), t0)
            .await;
        let revision = sync.stream().expect("stream").revision();

        let request = sync.begin_poll(t0 + POLL_INTERVAL).expect("poll due");
        let outcome = sync.finish_poll(
            &request.ticket,
            api.list_dm_messages(&request.dm_id).await,
        );

        assert_eq!(outcome, Some(FetchOutcome::Unchanged));
        assert_eq!(sync.stream().expect("stream").revision(), revision);
    }

    #[tokio::test]
    async fn poll_rebuilds_when_new_messages_arrived() {
        let api = StubDmApi::new(Ok(vec![message("m1", "u-alice", "hey")]));
        let mut sync = DmMessageSync::new(POLL_INTERVAL);
        let mut dm_list = DmListState::default();
        let t0 = Instant::now();
        sync.enter(&api, &mut dm_list, "dm-1", Some(&identity()), t0)
            .await;
        api.set_history(Ok(vec![
            message("m1", "u-alice", "hey"),
            message("m2", "u-alice", "you there?"),
        ]));

        let request = sync.begin_poll(t0 + POLL_INTERVAL).expect("poll due");
        let outcome = sync.finish_poll(
            &request.ticket,
            api.list_dm_messages(&request.dm_id).await,
        );

        assert_eq!(outcome, Some(FetchOutcome::Rebuilt));
        assert_eq!(sync.stream().expect("stream").messages().len(), 2);
    }

    #[tokio::test]
    async fn leaving_cancels_the_poll_loop() {
        let api = StubDmApi::new(Ok(vec![]));
        let mut sync = DmMessageSync::new(POLL_INTERVAL);
        let mut dm_list = DmListState::default();
        let t0 = Instant::now();
        sync.enter(&api, &mut dm_list, "dm-1", Some(&identity()), t0)
            .await;

        sync.leave();

        assert_eq!(sync.phase(), DmSyncPhase::Idle);
        assert!(!sync.poll_due(t0 + Duration::from_secs(60)));
        assert!(sync.begin_poll(t0 + Duration::from_secs(60)).is_none());
    }

    #[tokio::test]
    async fn poll_response_arriving_after_leave_is_discarded() {
        let api = StubDmApi::new(Ok(vec![]));
        let mut sync = DmMessageSync::new(POLL_INTERVAL);
        let mut dm_list = DmListState::default();
        let t0 = Instant::now();
        sync.enter(&api, &mut dm_list, "dm-1", Some(&identity()), t0)
            .await;

        let request = sync.begin_poll(t0 + POLL_INTERVAL).expect("poll due");
        sync.leave();

        let late = sync.finish_poll(
            &request.ticket,
            Ok(vec![message("m9", "u-alice", "too late")]),
        );

        assert_eq!(late, Some(FetchOutcome::Stale));
        assert!(sync.stream().is_none());
    }

    #[tokio::test]
    async fn poll_response_for_the_previous_conversation_is_discarded() {
        let mut api = StubDmApi::new(Ok(vec![]));
        api.dms = Ok(vec![conversation("dm-1", "alice"), conversation("dm-2", "bob")]);
        let mut sync = DmMessageSync::new(POLL_INTERVAL);
        let mut dm_list = DmListState::default();
        let t0 = Instant::now();
        sync.enter(&api, &mut dm_list, "dm-1", Some(&identity()), t0)
            .await;

        let request = sync.begin_poll(t0 + POLL_INTERVAL).expect("poll due");
        sync.enter(&api, &mut dm_list, "dm-2", Some(&identity()), t0)
            .await;

        let late = sync.finish_poll(
            &request.ticket,
            Ok(vec![message("m9", "u-alice", "for alice")]),
        );

        assert_eq!(late, Some(FetchOutcome::Stale));
        assert!(sync.stream().expect("stream").messages().is_empty());
        assert_eq!(sync.stream().expect("stream").owner_id(), "dm-2");
    }

    #[tokio::test]
    async fn send_confirms_optimistic_bubble_with_canonical_copy() {
        let api = StubDmApi::new(Ok(vec![]));
        let mut sync = DmMessageSync::new(POLL_INTERVAL);
        let mut dm_list = DmListState::default();
        sync.enter(&api, &mut dm_list, "dm-1", Some(&identity()), Instant::now())
            .await;

        let outcome = sync.send(&api, Some(&identity()), "hello", 10).await;

        assert_eq!(outcome, SendOutcome::Sent);
        let stream = sync.stream().expect("stream");
        assert_eq!(stream.messages().len(), 1);
        assert_eq!(stream.messages()[0].id, "srv-1");
        assert!(!stream.messages()[0].pending);
    }

    #[tokio::test]
    async fn poll_after_confirmed_send_does_not_duplicate_the_echo() {
        let api = StubDmApi::new(Ok(vec![]));
        let mut sync = DmMessageSync::new(POLL_INTERVAL);
        let mut dm_list = DmListState::default();
        let t0 = Instant::now();
        sync.enter(&api, &mut dm_list, "dm-1", Some(&identity()), t0)
            .await;
        sync.send(&api, Some(&identity()), "hello", 10).await;
        api.set_history(Ok(vec![message("srv-1", "me", "hello")]));

        let request = sync.begin_poll(t0 + POLL_INTERVAL).expect("poll due");
        let outcome = sync.finish_poll(
            &request.ticket,
            api.list_dm_messages(&request.dm_id).await,
        );

        assert_eq!(outcome, Some(FetchOutcome::Unchanged));
        assert_eq!(sync.stream().expect("stream").messages().len(), 1);
    }

    #[tokio::test]
    async fn failed_send_leaves_no_partial_state() {
        let mut api = StubDmApi::new(Ok(vec![]));
        api.send_result = Err(BackendError::Unavailable);
        let mut sync = DmMessageSync::new(POLL_INTERVAL);
        let mut dm_list = DmListState::default();
        sync.enter(&api, &mut dm_list, "dm-1", Some(&identity()), Instant::now())
            .await;

        let outcome = sync.send(&api, Some(&identity()), "hello", 10).await;

        assert_eq!(outcome, SendOutcome::Failed);
        assert!(sync.stream().expect("stream").messages().is_empty());
        assert!(!sync.stream().expect("stream").has_pending_send());
    }

    #[tokio::test]
    async fn live_message_for_other_conversation_is_ignored() {
        let api = StubDmApi::new(Ok(vec![]));
        let mut sync = DmMessageSync::new(POLL_INTERVAL);
        let mut dm_list = DmListState::default();
        sync.enter(&api, &mut dm_list, "dm-1", Some(&identity()), Instant::now())
            .await;

        sync.apply_live("dm-2", message("m5", "u-bob", "wrong door"));
        assert!(sync.stream().expect("stream").messages().is_empty());

        sync.apply_live("dm-1", message("m6", "u-alice", "hi"));
        assert_eq!(sync.stream().expect("stream").messages().len(), 1);
    }
}
