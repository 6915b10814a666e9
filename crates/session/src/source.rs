use super::error::SessionResult;
use super::hooks::Hook;
use super::ids::{MessageId, RoomId};
use super::types::{MessageRecord, RoomSnapshot};

/// Live connection to a chat service that reports domain events through hooks.
///
/// `run` pumps events on the calling thread until the session ends. Every other
/// method may be called from any thread while `run` is blocked.
pub trait SessionSource: Send + Sync {
    fn register(&self, hook: Hook);
    fn run(&self) -> SessionResult<()>;
    /// Asks the pump to stop. Safe to call repeatedly and after `run` returned.
    fn disconnect(&self);
    fn is_alive(&self) -> bool;
    fn say(&self, room_id: &RoomId, text: &str) -> SessionResult<()>;
    /// Returns messages strictly older than `before`, oldest first.
    fn fetch_archives(
        &self,
        room_id: &RoomId,
        before: &MessageId,
    ) -> SessionResult<Vec<MessageRecord>>;
    fn rooms(&self) -> Vec<RoomSnapshot>;
}
