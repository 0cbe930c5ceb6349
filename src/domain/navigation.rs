/// The single navigation target the shared message view follows.
///
/// Exactly one of channel / DM is meaningful at a time: selecting a channel
/// clears the active DM and vice versa, which is what guarantees that only
/// one sync component writes into the message view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    current_server_id: String,
    current_channel_id: Option<String>,
    active_dm_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavTarget {
    None,
    Channel { server_id: String, channel_id: String },
    Dm { dm_id: String },
}

impl NavigationState {
    pub fn new(initial_server_id: impl Into<String>) -> Self {
        Self {
            current_server_id: initial_server_id.into(),
            current_channel_id: None,
            active_dm_id: None,
        }
    }

    pub fn current_server_id(&self) -> &str {
        &self.current_server_id
    }

    pub fn current_channel_id(&self) -> Option<&str> {
        self.current_channel_id.as_deref()
    }

    pub fn active_dm_id(&self) -> Option<&str> {
        self.active_dm_id.as_deref()
    }

    pub fn select_server(&mut self, server_id: impl Into<String>) {
        self.current_server_id = server_id.into();
        self.current_channel_id = None;
        self.active_dm_id = None;
    }

    pub fn select_channel(&mut self, channel_id: impl Into<String>) {
        self.current_channel_id = Some(channel_id.into());
        self.active_dm_id = None;
    }

    pub fn select_dm(&mut self, dm_id: impl Into<String>) {
        self.active_dm_id = Some(dm_id.into());
        self.current_channel_id = None;
    }

    pub fn target(&self) -> NavTarget {
        if let Some(dm_id) = &self.active_dm_id {
            return NavTarget::Dm {
                dm_id: dm_id.clone(),
            };
        }

        if let Some(channel_id) = &self.current_channel_id {
            return NavTarget::Channel {
                server_id: self.current_server_id.clone(),
                channel_id: channel_id.clone(),
            };
        }

        NavTarget::None
    }

    pub fn is_channel_active(&self, server_id: &str, channel_id: &str) -> bool {
        self.active_dm_id.is_none()
            && self.current_server_id == server_id
            && self.current_channel_id.as_deref() == Some(channel_id)
    }

    pub fn is_dm_active(&self, dm_id: &str) -> bool {
        self.active_dm_id.as_deref() == Some(dm_id)
    }
}
