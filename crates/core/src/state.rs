use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use lounge_session::{MemberId, MemberRecord, MessageId, MessageRecord, RoomId, RoomSnapshot};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Distinguishes authored messages from synthetic pagination boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Normal,
    Boundary,
}

/// Immutable log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub kind: MessageKind,
    pub speaker_id: MemberId,
    pub nickname: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates the boundary entry placed between fetched archives and the known log.
    pub fn boundary(timestamp: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::boundary(),
            kind: MessageKind::Boundary,
            speaker_id: MemberId::new("-1"),
            nickname: "-".to_string(),
            text: "-".to_string(),
            timestamp,
        }
    }

    pub fn is_boundary(&self) -> bool {
        self.kind == MessageKind::Boundary
    }
}

impl From<MessageRecord> for Message {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: record.id,
            kind: MessageKind::Normal,
            speaker_id: record.speaker_id,
            nickname: record.nickname,
            text: record.text,
            timestamp: record.timestamp,
        }
    }
}

/// Per-room history in chronological order.
///
/// Entries are only ever appended, or prefixed with an archive page followed by
/// one boundary entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLog {
    entries: Vec<Arc<Message>>,
    // Count of appended entries; archive prepends leave it alone.
    appended: u64,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<MessageRecord>) -> Self {
        let entries: Vec<_> = records
            .into_iter()
            .map(|record| Arc::new(Message::from(record)))
            .collect();
        Self {
            appended: entries.len() as u64,
            entries,
        }
    }

    pub fn append(&mut self, message: Message) -> Arc<Message> {
        let message = Arc::new(message);
        self.entries.push(Arc::clone(&message));
        self.appended += 1;
        message
    }

    /// Sequence number of the most recent append.
    pub fn appended(&self) -> u64 {
        self.appended
    }

    /// Turns `[existing...]` into `[archives..., boundary, existing...]`.
    pub fn prepend_archives(&mut self, archives: Vec<Message>, boundary: Message) {
        debug_assert!(boundary.is_boundary(), "archive seam must be a boundary entry");

        let mut entries = Vec::with_capacity(archives.len() + 1 + self.entries.len());
        entries.extend(archives.into_iter().map(Arc::new));
        entries.push(Arc::new(boundary));
        entries.append(&mut self.entries);
        self.entries = entries;
    }

    /// Oldest authored message, used as the anchor for archive requests.
    pub fn oldest(&self) -> Option<&Message> {
        self.entries
            .iter()
            .map(Arc::as_ref)
            .find(|message| !message.is_boundary())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().map(Arc::as_ref)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|message| message.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub is_owner: bool,
    pub is_present: bool,
}

impl From<MemberRecord> for Member {
    fn from(record: MemberRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            is_owner: record.is_owner,
            is_present: record.is_present,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    members: IndexMap<MemberId, Member>,
    pub log: MessageLog,
}

impl Room {
    pub fn new(id: RoomId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            members: IndexMap::new(),
            log: MessageLog::new(),
        }
    }

    pub fn from_snapshot(snapshot: RoomSnapshot) -> Self {
        let mut room = Self::new(snapshot.id, snapshot.name);
        for record in snapshot.members {
            room.members.insert(record.id.clone(), Member::from(record));
        }
        room.log = MessageLog::from_records(snapshot.backlog);
        room
    }

    /// Flips presence in place; a member seen for the first time joins the end of the roster.
    pub fn set_presence(&mut self, record: &MemberRecord, is_present: bool) -> Member {
        let member = self
            .members
            .entry(record.id.clone())
            .or_insert_with(|| Member::from(record.clone()));
        member.is_present = is_present;
        member.clone()
    }

    pub fn member(&self, id: &MemberId) -> Option<&Member> {
        self.members.get(id)
    }

    /// Members in first-seen order.
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    /// Present members first, then absent ones, each group in first-seen order.
    pub fn members_by_presence(&self) -> Vec<&Member> {
        let (mut present, absent): (Vec<_>, Vec<_>) =
            self.members.values().partition(|member| member.is_present);
        present.extend(absent);
        present
    }

    pub fn present_count(&self) -> usize {
        self.members.values().filter(|member| member.is_present).count()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// Every room known to the session, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatState {
    rooms: IndexMap<RoomId, Room>,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an initial room snapshot. Rooms already known keep their position.
    pub fn load_snapshot(&mut self, snapshots: &[RoomSnapshot]) {
        for snapshot in snapshots {
            let room = Room::from_snapshot(snapshot.clone());
            self.rooms.insert(room.id.clone(), room);
        }
    }

    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn room_mut(&mut self, id: &RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(id)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn room_at(&self, index: usize) -> Option<&Room> {
        self.rooms.get_index(index).map(|(_, room)| room)
    }

    pub fn position(&self, id: &RoomId) -> Option<usize> {
        self.rooms.get_index_of(id)
    }

    pub fn contains(&self, id: &RoomId) -> bool {
        self.rooms.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

/// Room selected for display.
///
/// Written by the consumer (and by the connect hook); read lock-free by hook
/// callbacks on the observer thread, which tolerate one poll cycle of staleness.
#[derive(Debug, Default)]
pub struct CurrentRoom {
    inner: ArcSwapOption<RoomId>,
}

impl CurrentRoom {
    pub fn get(&self) -> Option<RoomId> {
        self.inner.load_full().map(|id| id.as_ref().clone())
    }

    pub fn set(&self, id: Option<RoomId>) {
        self.inner.store(id.map(Arc::new));
    }

    pub fn is(&self, id: &RoomId) -> bool {
        self.inner
            .load()
            .as_deref()
            .is_some_and(|current| current == id)
    }
}

/// State shared between the observer thread and the consumer.
#[derive(Debug, Default)]
pub struct SharedState {
    chat: RwLock<ChatState>,
    current_room: CurrentRoom,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, ChatState> {
        self.chat.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, ChatState> {
        self.chat.write()
    }

    pub fn current_room(&self) -> &CurrentRoom {
        &self.current_room
    }
}
