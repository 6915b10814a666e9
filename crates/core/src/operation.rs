use std::sync::Arc;

use lounge_session::RoomId;

use crate::state::{Member, Message};

/// Pending display update derived from one session event. Consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    SessionConnected,
    MessageArrived {
        room_id: RoomId,
        /// Append sequence of `message` within its room's log.
        seq: u64,
        message: Arc<Message>,
    },
    PresenceChanged {
        room_id: RoomId,
        is_join: bool,
        member: Member,
    },
}
