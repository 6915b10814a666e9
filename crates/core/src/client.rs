use std::sync::Arc;

use chrono::Utc;
use lounge_session::{MemberId, RoomId, SessionSource};
use snafu::ensure;

use crate::error::{AlreadyStartedSnafu, CoreResult};
use crate::hooks::SessionIngest;
use crate::notify::Notifier;
use crate::observer::{Observer, ObserverExit, ObserverHandle};
use crate::operation::Operation;
use crate::queue::OperationQueue;
use crate::render::{Renderer, empty_room_views, presence_banner, rooms_view};
use crate::settings::LoungeSettings;
use crate::state::{Message, SharedState};
use crate::view::ViewAdapter;

/// Consumer-side entry point.
///
/// Owns the view and the render cursor, so every method here must be called
/// from the host's display context. Session events reach it only through
/// [`ChatClient::process_queue`].
pub struct ChatClient<V: ViewAdapter> {
    source: Arc<dyn SessionSource>,
    shared: Arc<SharedState>,
    queue: Arc<OperationQueue>,
    notifier: Arc<dyn Notifier>,
    initial_room: Option<RoomId>,
    renderer: Renderer,
    view: V,
    observer: Option<ObserverHandle>,
    started: bool,
    torn_down: bool,
}

impl<V: ViewAdapter> ChatClient<V> {
    pub fn new(
        source: Arc<dyn SessionSource>,
        view: V,
        notifier: Arc<dyn Notifier>,
        settings: &LoungeSettings,
    ) -> Self {
        Self {
            source,
            shared: Arc::new(SharedState::new()),
            queue: Arc::new(OperationQueue::new()),
            notifier,
            initial_room: settings.initial_room.clone().map(RoomId::from),
            renderer: Renderer::new(settings.render.clone()),
            view,
            observer: None,
            started: false,
            torn_down: false,
        }
    }

    /// Registers the session hooks and starts the observer thread.
    pub fn start(&mut self) -> CoreResult<()> {
        ensure!(
            !self.started,
            AlreadyStartedSnafu {
                stage: "client-start",
            }
        );

        let ingest = Arc::new(SessionIngest::new(
            Arc::clone(&self.shared),
            Arc::clone(&self.queue),
            Arc::clone(&self.notifier),
            self.initial_room.clone(),
        ));
        ingest.register(self.source.as_ref());

        self.observer = Some(Observer::spawn(
            Arc::clone(&self.source),
            Arc::clone(&self.notifier),
        )?);
        self.started = true;
        tracing::info!("chat client started");
        Ok(())
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn shared(&self) -> &SharedState {
        &self.shared
    }

    pub fn pending_operations(&self) -> usize {
        self.queue.len()
    }

    pub fn current_room(&self) -> Option<RoomId> {
        self.shared.current_room().get()
    }

    pub fn last_speaker(&self) -> Option<&MemberId> {
        self.renderer.last_speaker()
    }

    pub fn observer_finished(&self) -> bool {
        self.observer
            .as_ref()
            .is_none_or(|observer| observer.is_finished())
    }

    /// Waits for the observer thread without asking the session to stop.
    pub fn join_observer(&mut self) -> CoreResult<Option<ObserverExit>> {
        match self.observer.as_mut() {
            Some(observer) => observer.join(),
            None => Ok(None),
        }
    }

    /// Applies every queued operation in order. Returns how many were applied.
    pub fn process_queue(&mut self) -> usize {
        if self.queue.is_empty() {
            return 0;
        }

        let operations = self.queue.drain_all();
        let applied = operations.len();
        for operation in operations {
            self.apply(operation);
        }
        applied
    }

    fn apply(&mut self, operation: Operation) {
        match operation {
            Operation::SessionConnected => self.render_all(),
            Operation::MessageArrived {
                room_id,
                seq,
                message,
            } => {
                // A full render that ran after the append already shows this entry.
                if !self.shared.current_room().is(&room_id)
                    || self.renderer.covers(&room_id, seq)
                {
                    tracing::trace!(room_id = %room_id, seq, "message already displayed");
                    return;
                }

                let ops = self.renderer.message(&message);
                self.renderer.mark_rendered(&room_id, seq);
                self.view.apply(&ops);
            }
            Operation::PresenceChanged {
                room_id,
                is_join,
                member,
            } => {
                if !self.shared.current_room().is(&room_id) {
                    return;
                }

                self.view.apply(&[presence_banner(is_join, &member)]);
                self.render_members();
            }
        }
    }

    /// Rebuilds all three surfaces from the current state.
    pub fn render_all(&mut self) {
        let current = self.shared.current_room().get();
        let ops = {
            let state = self.shared.read();
            let mut ops = Vec::new();

            match current.as_ref().and_then(|room_id| state.room(room_id)) {
                Some(room) => {
                    ops.extend(self.renderer.messages_view(room));
                    ops.extend(rooms_view(&state, Some(&room.id)));
                    ops.extend(self.renderer.members_view(room));
                }
                None => {
                    debug_assert!(current.is_none(), "current room {current:?} is not known");
                    self.renderer.forget_rendered();
                    ops.extend(empty_room_views());
                    ops.extend(rooms_view(&state, None));
                }
            }
            ops
        };

        self.view.apply(&ops);
    }

    fn render_messages(&mut self) {
        let Some(room_id) = self.shared.current_room().get() else {
            return;
        };

        let ops = {
            let state = self.shared.read();
            let Some(room) = state.room(&room_id) else {
                debug_assert!(false, "current room {room_id} is not known");
                return;
            };
            self.renderer.messages_view(room)
        };
        self.view.apply(&ops);
    }

    fn render_members(&mut self) {
        let Some(room_id) = self.shared.current_room().get() else {
            return;
        };

        let ops = {
            let state = self.shared.read();
            let Some(room) = state.room(&room_id) else {
                debug_assert!(false, "current room {room_id} is not known");
                return;
            };
            self.renderer.members_view(room)
        };
        self.view.apply(&ops);
    }

    /// Switches the displayed room. Unknown or already selected rooms are ignored.
    pub fn select_room(&mut self, room_id: &RoomId) {
        if !self.shared.read().contains(room_id) {
            tracing::debug!(room_id = %room_id, "ignoring selection of unknown room");
            return;
        }
        if self.shared.current_room().is(room_id) {
            return;
        }

        self.shared.current_room().set(Some(room_id.clone()));
        self.renderer.reset_speaker();
        self.render_all();
    }

    /// Moves the selection through the room list, wrapping at both ends.
    pub fn select_room_by_offset(&mut self, offset: isize) {
        let target = {
            let state = self.shared.read();
            if state.is_empty() {
                return;
            }
            let Some(position) = self
                .shared
                .current_room()
                .get()
                .and_then(|room_id| state.position(&room_id))
            else {
                return;
            };

            // Reduce before adding so extreme offsets cannot overflow.
            let room_count = state.len() as isize;
            let step = offset.rem_euclid(room_count);
            let next = ((position as isize + step) % room_count) as usize;
            state.room_at(next).map(|room| room.id.clone())
        };

        if let Some(target) = target {
            self.select_room(&target);
        }
    }

    /// Room shown on 1-based line `line` of the rooms surface.
    pub fn room_id_by_line(&self, line: usize) -> Option<RoomId> {
        let index = line.checked_sub(1)?;
        self.shared
            .read()
            .room_at(index)
            .map(|room| room.id.clone())
    }

    pub fn select_room_by_line(&mut self, line: usize) {
        if let Some(room_id) = self.room_id_by_line(line) {
            self.select_room(&room_id);
        }
    }

    /// Member shown on 1-based line `line` of the members surface.
    pub fn member_id_by_line(&self, line: usize) -> Option<MemberId> {
        let index = line.checked_sub(1)?;
        let room_id = self.shared.current_room().get()?;
        let state = self.shared.read();
        state
            .room(&room_id)?
            .members_by_presence()
            .get(index)
            .map(|member| member.id.clone())
    }

    /// Sends `text` to the current room. Without a selected room this does nothing.
    pub fn say(&self, text: &str) {
        let Some(room_id) = self.shared.current_room().get() else {
            tracing::debug!("no room selected, dropping outgoing message");
            return;
        };

        if let Err(error) = self.source.say(&room_id, text) {
            tracing::warn!(room_id = %room_id, error = %error, "failed to send message");
            self.notifier.notify_error(&error.to_string());
        }
    }

    /// Prepends the page of messages older than the current log, then a boundary.
    pub fn fetch_archives(&mut self) {
        let Some(room_id) = self.shared.current_room().get() else {
            return;
        };
        let anchor = self
            .shared
            .read()
            .room(&room_id)
            .and_then(|room| room.log.oldest())
            .map(|message| message.id.clone());
        let Some(anchor) = anchor else {
            tracing::debug!(room_id = %room_id, "message log is empty, nothing to page from");
            return;
        };

        let records = match self.source.fetch_archives(&room_id, &anchor) {
            Ok(records) => records,
            Err(error) => {
                tracing::warn!(room_id = %room_id, error = %error, "failed to fetch archives");
                self.notifier.notify_error(&error.to_string());
                return;
            }
        };
        if records.is_empty() {
            tracing::debug!(room_id = %room_id, anchor = %anchor, "no older messages");
            return;
        }

        let fetched = records.len();
        {
            let mut state = self.shared.write();
            let Some(room) = state.room_mut(&room_id) else {
                return;
            };
            room.log.prepend_archives(
                records.into_iter().map(Message::from).collect(),
                Message::boundary(Utc::now()),
            );
        }

        tracing::debug!(room_id = %room_id, fetched, "prepended archives");
        self.render_messages();
    }

    /// Stops the session pump and joins the observer. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        // A source may still be connecting and report itself not alive while its
        // pump is blocked, so the stop request is sent unconditionally.
        self.source.disconnect();

        if let Some(mut observer) = self.observer.take() {
            match observer.join() {
                Ok(exit) => tracing::debug!(exit = ?exit, "session observer joined"),
                Err(error) => tracing::error!(error = %error, "session observer ended abnormally"),
            }
        }
    }
}

impl<V: ViewAdapter> Drop for ChatClient<V> {
    fn drop(&mut self) {
        self.teardown();
    }
}
