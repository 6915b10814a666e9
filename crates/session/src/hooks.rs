use std::fmt;
use std::sync::Arc;

use super::error::SessionError;
use super::ids::RoomId;
use super::types::{MemberRecord, MessageRecord, RoomSnapshot};

pub type ConnectedHook = Arc<dyn Fn(&[RoomSnapshot]) + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(&SessionError) + Send + Sync>;
pub type MessageHook = Arc<dyn Fn(&RoomId, &MessageRecord) + Send + Sync>;
pub type PresenceHook = Arc<dyn Fn(&RoomId, &MemberRecord) + Send + Sync>;

/// Session event kinds a hook can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Error,
    Message,
    Join,
    Leave,
}

/// One callback bound to a single event kind.
#[derive(Clone)]
pub enum Hook {
    Connected(ConnectedHook),
    Error(ErrorHook),
    Message(MessageHook),
    Join(PresenceHook),
    Leave(PresenceHook),
}

impl Hook {
    pub fn connected(hook: impl Fn(&[RoomSnapshot]) + Send + Sync + 'static) -> Self {
        Self::Connected(Arc::new(hook))
    }

    pub fn error(hook: impl Fn(&SessionError) + Send + Sync + 'static) -> Self {
        Self::Error(Arc::new(hook))
    }

    pub fn message(hook: impl Fn(&RoomId, &MessageRecord) + Send + Sync + 'static) -> Self {
        Self::Message(Arc::new(hook))
    }

    pub fn join(hook: impl Fn(&RoomId, &MemberRecord) + Send + Sync + 'static) -> Self {
        Self::Join(Arc::new(hook))
    }

    pub fn leave(hook: impl Fn(&RoomId, &MemberRecord) + Send + Sync + 'static) -> Self {
        Self::Leave(Arc::new(hook))
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Connected(_) => EventKind::Connected,
            Self::Error(_) => EventKind::Error,
            Self::Message(_) => EventKind::Message,
            Self::Join(_) => EventKind::Join,
            Self::Leave(_) => EventKind::Leave,
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_tuple("Hook").field(&self.kind()).finish()
    }
}

/// Ordered handler lists keyed by event kind.
///
/// Handlers fire in registration order. The registry is cheap to clone, so a
/// source can snapshot it under its own lock and dispatch without holding it.
#[derive(Clone, Default)]
pub struct HookRegistry {
    connected: Vec<ConnectedHook>,
    error: Vec<ErrorHook>,
    message: Vec<MessageHook>,
    join: Vec<PresenceHook>,
    leave: Vec<PresenceHook>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Hook) {
        match hook {
            Hook::Connected(hook) => self.connected.push(hook),
            Hook::Error(hook) => self.error.push(hook),
            Hook::Message(hook) => self.message.push(hook),
            Hook::Join(hook) => self.join.push(hook),
            Hook::Leave(hook) => self.leave.push(hook),
        }
    }

    pub fn count(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::Connected => self.connected.len(),
            EventKind::Error => self.error.len(),
            EventKind::Message => self.message.len(),
            EventKind::Join => self.join.len(),
            EventKind::Leave => self.leave.len(),
        }
    }

    pub fn emit_connected(&self, rooms: &[RoomSnapshot]) {
        for hook in &self.connected {
            hook(rooms);
        }
    }

    pub fn emit_error(&self, error: &SessionError) {
        for hook in &self.error {
            hook(error);
        }
    }

    pub fn emit_message(&self, room_id: &RoomId, message: &MessageRecord) {
        for hook in &self.message {
            hook(room_id, message);
        }
    }

    pub fn emit_presence(&self, is_join: bool, room_id: &RoomId, member: &MemberRecord) {
        let hooks = if is_join { &self.join } else { &self.leave };
        for hook in hooks {
            hook(room_id, member);
        }
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HookRegistry")
            .field("connected", &self.connected.len())
            .field("error", &self.error.len())
            .field("message", &self.message.len())
            .field("join", &self.join.len())
            .field("leave", &self.leave.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn handlers_fire_in_registration_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();

        for label in ["first", "second"] {
            let calls = Arc::clone(&calls);
            registry.register(Hook::join(move |room_id, member| {
                calls
                    .lock()
                    .unwrap()
                    .push(format!("{label}:{room_id}:{}", member.id));
            }));
        }

        registry.emit_presence(true, &RoomId::new("r1"), &MemberRecord::new("alice", "Alice"));
        registry.emit_presence(false, &RoomId::new("r1"), &MemberRecord::new("bob", "Bob"));

        assert_eq!(
            *calls.lock().unwrap(),
            vec!["first:r1:alice".to_string(), "second:r1:alice".to_string()]
        );
        assert_eq!(registry.count(EventKind::Join), 2);
        assert_eq!(registry.count(EventKind::Leave), 0);
    }
}
