/// Servers and their channel lists, as loaded from the backend at startup.
///
/// Navigation targets are validated against this directory: selecting an
/// unknown server or channel is a logged no-op, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerDirectory {
    servers: Vec<ServerSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSummary {
    pub id: String,
    pub name: String,
    pub channels: Vec<ChannelSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSummary {
    pub id: String,
    pub name: String,
}

impl ServerDirectory {
    pub fn new(servers: Vec<ServerSummary>) -> Self {
        Self { servers }
    }

    pub fn servers(&self) -> &[ServerSummary] {
        &self.servers
    }

    pub fn server(&self, server_id: &str) -> Option<&ServerSummary> {
        self.servers.iter().find(|server| server.id == server_id)
    }

    pub fn has_channel(&self, server_id: &str, channel_id: &str) -> bool {
        self.server(server_id)
            .is_some_and(|server| server.channels.iter().any(|c| c.id == channel_id))
    }

    /// Default channel opened when a server is selected.
    pub fn first_channel(&self, server_id: &str) -> Option<&ChannelSummary> {
        self.server(server_id)?.channels.first()
    }
}
