use super::message::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamUiState {
    Loading,
    Ready,
    Error,
}

/// Freshness token for one history fetch against one stream.
///
/// Responses may resolve out of issue order; a ticket is only applicable
/// while it belongs to the live stream and no later ticket has already been
/// applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    owner_id: String,
    seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Superseded by a newer fetch or issued for a torn-down stream.
    Stale,
    /// Canonical data matches what is already displayed; skip re-render.
    Unchanged,
    /// Displayed list was rebuilt from the canonical set.
    Rebuilt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendRejected {
    EmptyMessage,
    SendInFlight,
}

/// Ordered message list for one channel or DM conversation.
///
/// Insertion order is chronological. Confirmed messages mirror the server's
/// canonical history; at most one optimistic (`pending`) message exists at a
/// time while its send is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageStream {
    owner_id: String,
    ui_state: StreamUiState,
    messages: Vec<Message>,
    issued_seq: u64,
    applied_seq: u64,
    next_local_id: u64,
    in_flight_send: Option<String>,
    local_author_id: Option<String>,
    revision: u64,
}

impl MessageStream {
    pub fn new(owner_id: impl Into<String>, local_author_id: Option<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            ui_state: StreamUiState::Loading,
            messages: Vec::new(),
            issued_seq: 0,
            applied_seq: 0,
            next_local_id: 0,
            in_flight_send: None,
            local_author_id,
            revision: 0,
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn ui_state(&self) -> StreamUiState {
        self.ui_state
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Bumped on every visible mutation; stable revision means the rendered
    /// view can be reused as-is.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn has_pending_send(&self) -> bool {
        self.in_flight_send.is_some()
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued_seq += 1;
        FetchTicket {
            owner_id: self.owner_id.clone(),
            seq: self.issued_seq,
        }
    }

    /// Applies a fetched canonical history under the ticket's freshness rules.
    pub fn apply_fetch(&mut self, ticket: &FetchTicket, fetched: Vec<Message>) -> FetchOutcome {
        if self.is_stale(ticket) {
            return FetchOutcome::Stale;
        }
        self.applied_seq = ticket.seq;

        if self.ui_state == StreamUiState::Ready && self.confirmed_ids_match(&fetched) {
            return FetchOutcome::Unchanged;
        }

        let retained_pending = self.retained_pending_after(&fetched);
        if retained_pending.is_empty() {
            self.in_flight_send = None;
        }

        self.messages = fetched;
        self.messages.extend(retained_pending);
        self.ui_state = StreamUiState::Ready;
        self.revision += 1;
        FetchOutcome::Rebuilt
    }

    /// Marks a failed fetch. A failure during the initial load surfaces the
    /// error state; a failed background poll keeps the last good view.
    pub fn fail_fetch(&mut self, ticket: &FetchTicket) {
        if self.is_stale(ticket) {
            return;
        }
        self.applied_seq = ticket.seq;

        if self.ui_state != StreamUiState::Ready {
            self.ui_state = StreamUiState::Error;
            self.revision += 1;
        }
    }

    /// Appends an optimistic message for an outgoing send.
    pub fn begin_send(
        &mut self,
        content: &str,
        author_id: &str,
        author_name: &str,
        avatar_url: &str,
        timestamp_seconds: i64,
    ) -> Result<Message, SendRejected> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SendRejected::EmptyMessage);
        }
        if self.in_flight_send.is_some() {
            return Err(SendRejected::SendInFlight);
        }

        self.next_local_id += 1;
        let temp_id = format!("local-{}", self.next_local_id);
        let message = Message {
            id: temp_id.clone(),
            author_id: author_id.to_owned(),
            author_name: author_name.to_owned(),
            avatar_url: avatar_url.to_owned(),
            content: content.to_owned(),
            timestamp_seconds,
            pending: true,
        };

        self.messages.push(message.clone());
        self.in_flight_send = Some(temp_id);
        self.revision += 1;
        Ok(message)
    }

    /// Replaces the optimistic message with the server's canonical copy.
    ///
    /// If the canonical copy already arrived through a fetch or push event,
    /// the temporary bubble is dropped instead so the message never shows
    /// twice.
    pub fn confirm_send(&mut self, temp_id: &str, canonical: Message) {
        if self.in_flight_send.as_deref() == Some(temp_id) {
            self.in_flight_send = None;
        }

        let Some(index) = self.messages.iter().position(|m| m.id == temp_id) else {
            // Temp already collapsed into a fetched echo. With duplicate
            // text that echo can be an older message with a different id, so
            // the canonical copy still has to land, deduplicated by id.
            if !self.messages.iter().any(|m| m.id == canonical.id) {
                self.messages.push(Message {
                    pending: false,
                    ..canonical
                });
                self.revision += 1;
            }
            return;
        };

        let already_present = self
            .messages
            .iter()
            .any(|m| m.id == canonical.id && !m.pending);
        if already_present {
            self.messages.remove(index);
        } else {
            self.messages[index] = Message {
                pending: false,
                ..canonical
            };
        }
        self.revision += 1;
    }

    /// Rolls back a failed optimistic send, leaving no partial state.
    pub fn fail_send(&mut self, temp_id: &str) {
        if self.in_flight_send.as_deref() == Some(temp_id) {
            self.in_flight_send = None;
        }

        let before = self.messages.len();
        self.messages.retain(|m| m.id != temp_id);
        if self.messages.len() != before {
            self.revision += 1;
        }
    }

    /// Appends a push-delivered message, deduplicated by id.
    pub fn append_live(&mut self, message: Message) {
        if self.messages.iter().any(|m| m.id == message.id) {
            return;
        }

        self.messages.push(message);
        self.ui_state = StreamUiState::Ready;
        self.revision += 1;
    }

    fn is_stale(&self, ticket: &FetchTicket) -> bool {
        ticket.owner_id != self.owner_id || ticket.seq <= self.applied_seq
    }

    fn confirmed_ids_match(&self, fetched: &[Message]) -> bool {
        let confirmed = self.messages.iter().filter(|m| !m.pending);
        confirmed.map(|m| m.id.as_str()).eq(fetched.iter().map(|m| m.id.as_str()))
    }

    /// Pending messages that survive a rebuild: everything still awaiting
    /// confirmation, except optimistic copies whose server echo is already in
    /// the canonical set.
    fn retained_pending_after(&self, fetched: &[Message]) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| m.pending)
            .filter(|pending| {
                let echoed = fetched.iter().any(|canonical| {
                    Some(canonical.author_id.as_str()) == self.local_author_id.as_deref()
                        && canonical.content == pending.content
                });
                !echoed
            })
            .cloned()
            .collect()
    }
}
