use crate::domain::{
    dm_list::DmListState,
    events::RealtimeEvent,
    message::UserIdentity,
    navigation::NavigationState,
};

use super::{channel_sync::ChannelMessageSync, dm_sync::DmMessageSync};

/// Routes server-pushed events into the view that is currently on screen.
///
/// Events for targets that are not active are dropped without buffering:
/// the next `enter` re-fetches full history anyway. Own DM messages are
/// also dropped, since the optimistic bubble already shows them.
pub struct RealtimeEventBridge;

impl RealtimeEventBridge {
    pub fn route(
        nav: &NavigationState,
        channel_sync: &mut ChannelMessageSync,
        dm_sync: &mut DmMessageSync,
        dm_list: &mut DmListState,
        identity: Option<&UserIdentity>,
        event: RealtimeEvent,
    ) {
        match event {
            RealtimeEvent::ChannelMessage {
                server_id,
                channel_id,
                message,
            } => {
                if nav.is_channel_active(&server_id, &channel_id) {
                    channel_sync.apply_live(&channel_id, message);
                } else {
                    tracing::debug!(server_id, channel_id, "dropping event for inactive channel");
                }
            }
            RealtimeEvent::DmMessage { dm_id, message } => {
                let is_open = nav.is_dm_active(&dm_id);
                // The sidebar reflects new activity even for closed
                // conversations.
                dm_list.note_activity(&dm_id, &message, is_open);

                if is_open && !message.is_own(identity) {
                    dm_sync.apply_live(&dm_id, message);
                }
            }
        }
    }
}
