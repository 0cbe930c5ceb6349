use super::message::Message;

/// The remote party of a one-to-one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtherUser {
    pub id: String,
    pub username: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmConversation {
    pub id: String,
    pub other_user: OtherUser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DmListUiState {
    Loading,
    Ready,
    Empty,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmEntry {
    pub conversation: DmConversation,
    pub preview: Option<String>,
    pub last_activity_seconds: Option<i64>,
    pub unread: u32,
}

/// Sidebar list of DM conversations, ordered by recency.
///
/// New activity moves a conversation to the top and refreshes its preview
/// even while that conversation is not open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmListState {
    ui_state: DmListUiState,
    entries: Vec<DmEntry>,
}

impl Default for DmListState {
    fn default() -> Self {
        Self {
            ui_state: DmListUiState::Loading,
            entries: Vec::new(),
        }
    }
}

impl DmListState {
    pub fn ui_state(&self) -> &DmListUiState {
        &self.ui_state
    }

    pub fn entries(&self) -> &[DmEntry] {
        &self.entries
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.ui_state, DmListUiState::Ready | DmListUiState::Empty)
    }

    pub fn find(&self, dm_id: &str) -> Option<&DmConversation> {
        self.entries
            .iter()
            .find(|entry| entry.conversation.id == dm_id)
            .map(|entry| &entry.conversation)
    }

    pub fn set_ready(&mut self, conversations: Vec<DmConversation>) {
        if conversations.is_empty() {
            self.ui_state = DmListUiState::Empty;
            self.entries.clear();
            return;
        }

        self.ui_state = DmListUiState::Ready;
        self.entries = conversations
            .into_iter()
            .map(|conversation| DmEntry {
                conversation,
                preview: None,
                last_activity_seconds: None,
                unread: 0,
            })
            .collect();
    }

    pub fn set_error(&mut self) {
        self.ui_state = DmListUiState::Error;
        self.entries.clear();
    }

    /// Records fresh activity in a conversation: bumps it to the top of the
    /// list, refreshes the preview, and counts unread unless the conversation
    /// is currently open.
    pub fn note_activity(&mut self, dm_id: &str, message: &Message, is_open: bool) {
        let Some(index) = self
            .entries
            .iter()
            .position(|entry| entry.conversation.id == dm_id)
        else {
            return;
        };

        let mut entry = self.entries.remove(index);
        entry.preview = Some(message.preview());
        entry.last_activity_seconds = Some(message.timestamp_seconds);
        if is_open {
            entry.unread = 0;
        } else {
            entry.unread += 1;
        }
        self.entries.insert(0, entry);
    }

    pub fn mark_read(&mut self, dm_id: &str) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| entry.conversation.id == dm_id)
        {
            entry.unread = 0;
        }
    }
}
