//! Session hook callbacks. They run on the observer thread, only touch shared
//! state and the operation queue, and never write to a view.

use std::sync::Arc;

use lounge_session::{
    Hook, MemberRecord, MessageRecord, RoomId, RoomSnapshot, SessionError, SessionSource,
};

use crate::notify::Notifier;
use crate::operation::Operation;
use crate::queue::OperationQueue;
use crate::state::{Message, SharedState};

pub const CONNECTED_NOTICE: &str = "connected";

pub struct SessionIngest {
    shared: Arc<SharedState>,
    queue: Arc<OperationQueue>,
    notifier: Arc<dyn Notifier>,
    initial_room: Option<RoomId>,
}

impl SessionIngest {
    pub fn new(
        shared: Arc<SharedState>,
        queue: Arc<OperationQueue>,
        notifier: Arc<dyn Notifier>,
        initial_room: Option<RoomId>,
    ) -> Self {
        Self {
            shared,
            queue,
            notifier,
            initial_room,
        }
    }

    /// Binds one handler per event kind on `source`.
    pub fn register(self: &Arc<Self>, source: &dyn SessionSource) {
        let ingest = Arc::clone(self);
        source.register(Hook::connected(move |rooms| ingest.on_connected(rooms)));

        let ingest = Arc::clone(self);
        source.register(Hook::error(move |error| ingest.on_error(error)));

        let ingest = Arc::clone(self);
        source.register(Hook::message(move |room_id, message| {
            ingest.on_message(room_id, message)
        }));

        let ingest = Arc::clone(self);
        source.register(Hook::join(move |room_id, member| {
            ingest.on_presence(true, room_id, member)
        }));

        let ingest = Arc::clone(self);
        source.register(Hook::leave(move |room_id, member| {
            ingest.on_presence(false, room_id, member)
        }));
    }

    pub fn on_connected(&self, rooms: &[RoomSnapshot]) {
        let current = {
            let mut state = self.shared.write();
            state.load_snapshot(rooms);

            self.initial_room
                .as_ref()
                .filter(|room_id| state.contains(room_id))
                .cloned()
                .or_else(|| state.room_at(0).map(|room| room.id.clone()))
        };

        tracing::info!(
            room_count = rooms.len(),
            current_room = ?current,
            "session connected"
        );
        self.shared.current_room().set(current);
        self.queue.push(Operation::SessionConnected);
        self.notifier.notify_info(CONNECTED_NOTICE);
    }

    pub fn on_error(&self, error: &SessionError) {
        self.notifier.notify_error(&error.to_string());
    }

    pub fn on_message(&self, room_id: &RoomId, record: &MessageRecord) {
        // The queue push happens under the state lock so append order and queue order agree.
        let mut state = self.shared.write();
        let Some(room) = state.room_mut(room_id) else {
            tracing::warn!(
                room_id = %room_id,
                message_id = %record.id,
                "dropping message for unknown room"
            );
            return;
        };

        let message = room.log.append(Message::from(record.clone()));
        if self.shared.current_room().is(room_id) {
            self.queue.push(Operation::MessageArrived {
                room_id: room_id.clone(),
                seq: room.log.appended(),
                message,
            });
        }
    }

    pub fn on_presence(&self, is_join: bool, room_id: &RoomId, record: &MemberRecord) {
        let mut state = self.shared.write();
        let Some(room) = state.room_mut(room_id) else {
            tracing::warn!(
                room_id = %room_id,
                member_id = %record.id,
                is_join,
                "dropping presence change for unknown room"
            );
            return;
        };

        let member = room.set_presence(record, is_join);
        if self.shared.current_room().is(room_id) {
            self.queue.push(Operation::PresenceChanged {
                room_id: room_id.clone(),
                is_join,
                member,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct Notices(Mutex<Vec<String>>);

    impl Notifier for Notices {
        fn notify_error(&self, message: &str) {
            self.0.lock().push(format!("error: {message}"));
        }

        fn notify_info(&self, message: &str) {
            self.0.lock().push(format!("info: {message}"));
        }
    }

    fn ingest(initial_room: Option<&str>) -> (SessionIngest, Arc<Notices>) {
        let notices = Arc::new(Notices::default());
        let ingest = SessionIngest::new(
            Arc::new(SharedState::new()),
            Arc::new(OperationQueue::new()),
            notices.clone(),
            initial_room.map(RoomId::new),
        );
        (ingest, notices)
    }

    fn rooms() -> Vec<RoomSnapshot> {
        vec![RoomSnapshot::new("r1", "One"), RoomSnapshot::new("r2", "Two")]
    }

    #[test]
    fn connect_selects_first_room_unless_configured() {
        let (first, notices) = ingest(None);
        first.on_connected(&rooms());
        assert_eq!(first.shared.current_room().get(), Some(RoomId::new("r1")));
        assert_eq!(first.queue.drain_all(), vec![Operation::SessionConnected]);
        assert_eq!(*notices.0.lock(), vec!["info: connected".to_string()]);

        let (configured, _) = ingest(Some("r2"));
        configured.on_connected(&rooms());
        assert_eq!(
            configured.shared.current_room().get(),
            Some(RoomId::new("r2"))
        );

        let (unknown, _) = ingest(Some("nowhere"));
        unknown.on_connected(&rooms());
        assert_eq!(unknown.shared.current_room().get(), Some(RoomId::new("r1")));
    }

    #[test]
    fn reconnect_defaults_to_the_first_listed_room() {
        let (ingest, _) = ingest(None);
        ingest.on_connected(&rooms());

        let mut reordered = rooms();
        reordered.reverse();
        ingest.on_connected(&reordered);

        let state = ingest.shared.read();
        assert_eq!(state.room_at(0).map(|room| room.id.clone()), Some(RoomId::new("r1")));
        assert_eq!(ingest.shared.current_room().get(), Some(RoomId::new("r1")));
    }

    #[test]
    fn events_for_unknown_rooms_are_dropped() {
        let (ingest, notices) = ingest(None);
        ingest.on_connected(&rooms());
        ingest.queue.drain_all();

        ingest.on_message(
            &RoomId::new("ghost"),
            &MessageRecord::new("m1", "amy", "Amy", "boo", Utc::now()),
        );
        ingest.on_presence(true, &RoomId::new("ghost"), &MemberRecord::new("amy", "Amy"));

        assert!(ingest.queue.is_empty());
        assert!(ingest.shared.read().room(&RoomId::new("ghost")).is_none());
        assert_eq!(notices.0.lock().len(), 1);
    }

    #[test]
    fn errors_go_to_the_notifier_only() {
        let (ingest, notices) = ingest(None);

        ingest.on_error(&SessionError::ConnectionLost {
            stage: "test",
            details: "socket closed".to_string(),
        });

        assert!(ingest.queue.is_empty());
        assert_eq!(
            *notices.0.lock(),
            vec!["error: connection lost: socket closed".to_string()]
        );
    }
}
