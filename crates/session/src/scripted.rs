use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use tokio::sync::mpsc;

use super::error::{AlreadyRunningSnafu, ApiSnafu, ClosedSnafu, SessionResult, UnknownRoomSnafu};
use super::hooks::{Hook, HookRegistry};
use super::ids::{MessageId, RoomId};
use super::source::SessionSource;
use super::types::{MemberRecord, MessageRecord, RoomSnapshot};

pub const DEFAULT_ARCHIVE_PAGE_SIZE: usize = 30;

/// One event replayed by [`ScriptedSession`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    Connected {
        rooms: Vec<RoomSnapshot>,
    },
    Message {
        room_id: RoomId,
        message: MessageRecord,
    },
    Join {
        room_id: RoomId,
        member: MemberRecord,
    },
    Leave {
        room_id: RoomId,
        member: MemberRecord,
    },
    /// Reported through the error hooks; the pump keeps running.
    Error {
        detail: String,
    },
    /// Ends the pump with an error.
    Fail {
        detail: String,
    },
    End,
}

/// Serialized form of a scripted session: the event feed plus older history per room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionScript {
    #[serde(default)]
    pub events: Vec<ScriptEvent>,
    /// Oldest first. Served page by page by `fetch_archives`.
    #[serde(default)]
    pub archives: HashMap<RoomId, Vec<MessageRecord>>,
}

impl SessionScript {
    pub fn from_json_str(raw: &str) -> Result<Self, ScriptError> {
        serde_json::from_str(raw).context(ParseScriptSnafu {
            stage: "parse-session-script",
        })
    }

    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let raw = std::fs::read_to_string(path).context(ReadScriptSnafu {
            stage: "read-session-script",
            path: path.to_path_buf(),
        })?;
        Self::from_json_str(&raw)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ScriptError {
    #[snafu(display("failed to read session script at {path:?} on `{stage}`: {source}"))]
    ReadScript {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to parse session script on `{stage}`: {source}"))]
    ParseScript {
        stage: &'static str,
        source: serde_json::Error,
    },
}

/// In-memory [`SessionSource`] that replays scripted events.
///
/// Events queued with [`ScriptedSession::push_event`] are delivered by `run` in
/// order on the pumping thread. Without a trailing [`ScriptEvent::End`] the pump
/// keeps waiting for more events until `disconnect` is called.
pub struct ScriptedSession {
    hooks: RwLock<HookRegistry>,
    events_tx: mpsc::UnboundedSender<ScriptEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<ScriptEvent>>>,
    alive: AtomicBool,
    closing: AtomicBool,
    rooms: RwLock<Vec<RoomSnapshot>>,
    archives: Mutex<HashMap<RoomId, Vec<MessageRecord>>>,
    archive_page_size: usize,
    sent: Mutex<Vec<(RoomId, String)>>,
}

impl ScriptedSession {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            hooks: RwLock::new(HookRegistry::new()),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            alive: AtomicBool::new(true),
            closing: AtomicBool::new(false),
            rooms: RwLock::new(Vec::new()),
            archives: Mutex::new(HashMap::new()),
            archive_page_size: DEFAULT_ARCHIVE_PAGE_SIZE,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn from_script(script: SessionScript) -> Self {
        let session = Self::new();
        *session.archives.lock() = script.archives;
        for event in script.events {
            session.push_event(event);
        }
        session
    }

    pub fn with_archive_page_size(mut self, page_size: usize) -> Self {
        self.archive_page_size = page_size.max(1);
        self
    }

    pub fn with_archives(self, room_id: impl Into<RoomId>, history: Vec<MessageRecord>) -> Self {
        self.archives.lock().insert(room_id.into(), history);
        self
    }

    /// Queues an event for the pump. Returns false once the pump is gone.
    pub fn push_event(&self, event: ScriptEvent) -> bool {
        self.events_tx.send(event).is_ok()
    }

    /// Messages sent through `say`, in call order.
    pub fn sent_messages(&self) -> Vec<(RoomId, String)> {
        self.sent.lock().clone()
    }

    fn dispatch(&self, event: ScriptEvent) -> SessionResult<()> {
        // Handlers run without the registry lock so they may call back into the session.
        let hooks = self.hooks.read().clone();

        match event {
            ScriptEvent::Connected { rooms } => {
                *self.rooms.write() = rooms.clone();
                hooks.emit_connected(&rooms);
            }
            ScriptEvent::Message { room_id, message } => {
                hooks.emit_message(&room_id, &message);
            }
            ScriptEvent::Join { room_id, member } => {
                self.record_presence(&room_id, &member, true);
                hooks.emit_presence(true, &room_id, &member);
            }
            ScriptEvent::Leave { room_id, member } => {
                self.record_presence(&room_id, &member, false);
                hooks.emit_presence(false, &room_id, &member);
            }
            ScriptEvent::Error { detail } => {
                let error = ApiSnafu {
                    stage: "scripted-error-event",
                    detail,
                }
                .build();
                hooks.emit_error(&error);
            }
            ScriptEvent::Fail { detail } => {
                return ApiSnafu {
                    stage: "scripted-fail-event",
                    detail,
                }
                .fail();
            }
            ScriptEvent::End => {}
        }

        Ok(())
    }

    fn record_presence(&self, room_id: &RoomId, member: &MemberRecord, is_present: bool) {
        let mut rooms = self.rooms.write();
        let Some(room) = rooms.iter_mut().find(|room| &room.id == room_id) else {
            return;
        };

        match room.members.iter_mut().find(|known| known.id == member.id) {
            Some(known) => known.is_present = is_present,
            None => room.members.push(member.clone().present(is_present)),
        }
    }

    fn ensure_known_room(&self, room_id: &RoomId, stage: &'static str) -> SessionResult<()> {
        let rooms = self.rooms.read();
        if rooms.is_empty() || rooms.iter().any(|room| &room.id == room_id) {
            return Ok(());
        }

        UnknownRoomSnafu {
            stage,
            room_id: room_id.clone(),
        }
        .fail()
    }
}

impl Default for ScriptedSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionSource for ScriptedSession {
    fn register(&self, hook: Hook) {
        self.hooks.write().register(hook);
    }

    fn run(&self) -> SessionResult<()> {
        let Some(mut events_rx) = self.events_rx.lock().take() else {
            return AlreadyRunningSnafu {
                stage: "scripted-run",
            }
            .fail();
        };

        let result = loop {
            if self.closing.load(Ordering::Acquire) {
                break Ok(());
            }

            match events_rx.blocking_recv() {
                None | Some(ScriptEvent::End) => break Ok(()),
                Some(_) if self.closing.load(Ordering::Acquire) => break Ok(()),
                Some(event) => {
                    if let Err(error) = self.dispatch(event) {
                        break Err(error);
                    }
                }
            }
        };

        self.alive.store(false, Ordering::Release);
        tracing::debug!(ok = result.is_ok(), "scripted session pump finished");
        result
    }

    fn disconnect(&self) {
        if self.closing.swap(true, Ordering::AcqRel) {
            return;
        }

        self.alive.store(false, Ordering::Release);
        // Wake a blocked pump; the receiver may already be gone.
        let _ = self.events_tx.send(ScriptEvent::End);
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn say(&self, room_id: &RoomId, text: &str) -> SessionResult<()> {
        if !self.is_alive() {
            return ClosedSnafu {
                stage: "scripted-say",
            }
            .fail();
        }
        self.ensure_known_room(room_id, "scripted-say")?;

        self.sent.lock().push((room_id.clone(), text.to_string()));
        Ok(())
    }

    fn fetch_archives(
        &self,
        room_id: &RoomId,
        before: &MessageId,
    ) -> SessionResult<Vec<MessageRecord>> {
        self.ensure_known_room(room_id, "scripted-fetch-archives")?;

        let archives = self.archives.lock();
        let Some(history) = archives.get(room_id) else {
            return Ok(Vec::new());
        };

        // An anchor outside the stored history is newer than all of it.
        let end = history
            .iter()
            .position(|message| &message.id == before)
            .unwrap_or(history.len());
        let start = end.saturating_sub(self.archive_page_size);
        Ok(history[start..end].to_vec())
    }

    fn rooms(&self) -> Vec<RoomSnapshot> {
        self.rooms.read().clone()
    }
}
