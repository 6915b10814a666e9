//! Turns state and single events into ordered display instructions.
//!
//! Everything here is pure apart from the [`Renderer`]'s last-speaker cursor,
//! which decides whether a message needs a fresh header line.

use lounge_session::{MemberId, RoomId};

use crate::settings::RenderSettings;
use crate::state::{ChatState, Member, Message, Room};

pub const ARCHIVES_DELIMITER: &str = "--------------------";
pub const CURRENT_ROOM_MARK: &str = " *";
pub const OWNER_MARK: &str = "(owner)";
pub const PRESENT_SUFFIX: &str = " +";
pub const ABSENT_SUFFIX: &str = " -";

/// One of the three independent display surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Messages,
    Members,
    Rooms,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayOp {
    Clear(Surface),
    AppendLine(Surface, String),
    SetStatus(Surface, String),
}

impl DisplayOp {
    pub fn surface(&self) -> Surface {
        match self {
            Self::Clear(surface) | Self::AppendLine(surface, _) | Self::SetStatus(surface, _) => {
                *surface
            }
        }
    }
}

/// Consumer-side render cursor.
///
/// Tracks the last rendered speaker and how far into the displayed room's log
/// the messages surface already reaches.
#[derive(Debug, Clone)]
pub struct Renderer {
    settings: RenderSettings,
    last_speaker: Option<MemberId>,
    rendered: Option<(RoomId, u64)>,
}

impl Renderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            last_speaker: None,
            rendered: None,
        }
    }

    pub fn last_speaker(&self) -> Option<&MemberId> {
        self.last_speaker.as_ref()
    }

    pub fn reset_speaker(&mut self) {
        self.last_speaker = None;
    }

    /// True when the entry appended as `seq` in `room_id` is already on screen.
    pub fn covers(&self, room_id: &RoomId, seq: u64) -> bool {
        self.rendered
            .as_ref()
            .is_some_and(|(rendered_room, rendered_seq)| {
                rendered_room == room_id && seq <= *rendered_seq
            })
    }

    pub fn mark_rendered(&mut self, room_id: &RoomId, seq: u64) {
        let seq = match &self.rendered {
            Some((rendered_room, rendered_seq)) if rendered_room == room_id => seq.max(*rendered_seq),
            _ => seq,
        };
        self.rendered = Some((room_id.clone(), seq));
    }

    pub fn forget_rendered(&mut self) {
        self.rendered = None;
        self.last_speaker = None;
    }

    /// Lines for one message appended to the messages surface.
    ///
    /// A header is emitted only when the speaker differs from the previous
    /// rendered message. Boundaries print the delimiter and clear the cursor.
    pub fn message(&mut self, message: &Message) -> Vec<DisplayOp> {
        if message.is_boundary() {
            self.last_speaker = None;
            return vec![append(Surface::Messages, ARCHIVES_DELIMITER)];
        }

        let mut ops = Vec::new();
        if self.last_speaker.as_ref() != Some(&message.speaker_id) {
            ops.push(append(Surface::Messages, self.header(message)));
            self.last_speaker = Some(message.speaker_id.clone());
        }

        // Display surfaces take single lines, so every embedded break becomes its own row.
        for segment in message.text.split('\n') {
            let segment = segment.strip_suffix('\r').unwrap_or(segment);
            ops.push(append(
                Surface::Messages,
                format!("{}{segment}", self.settings.indent),
            ));
        }

        ops
    }

    /// Rebuilds the messages surface from a room's full log.
    pub fn messages_view(&mut self, room: &Room) -> Vec<DisplayOp> {
        self.last_speaker = None;
        self.rendered = Some((room.id.clone(), room.log.appended()));

        let mut ops = vec![
            DisplayOp::Clear(Surface::Messages),
            append(Surface::Messages, self.settings.archive_prompt.clone()),
        ];
        for message in room.log.iter() {
            ops.extend(self.message(message));
        }
        ops.push(DisplayOp::SetStatus(
            Surface::Messages,
            format!("{} ({})", self.settings.messages_title, room.name),
        ));
        ops
    }

    /// Rebuilds the members surface: present members first, then absent.
    pub fn members_view(&self, room: &Room) -> Vec<DisplayOp> {
        let mut ops = vec![DisplayOp::Clear(Surface::Members)];
        ops.extend(
            room.members_by_presence()
                .into_iter()
                .map(|member| append(Surface::Members, member_line(member))),
        );
        ops.push(DisplayOp::SetStatus(
            Surface::Members,
            format!(
                "{} ({}/{})",
                self.settings.members_title,
                room.present_count(),
                room.member_count()
            ),
        ));
        ops
    }

    fn header(&self, message: &Message) -> String {
        format!(
            "{} ({}):",
            message.nickname,
            message.timestamp.format(&self.settings.timestamp_format)
        )
    }
}

/// Rebuilds the rooms surface, marking the current room.
pub fn rooms_view(state: &ChatState, current: Option<&RoomId>) -> Vec<DisplayOp> {
    let mut ops = vec![DisplayOp::Clear(Surface::Rooms)];
    ops.extend(state.rooms().map(|room| {
        let mark = if current == Some(&room.id) {
            CURRENT_ROOM_MARK
        } else {
            ""
        };
        append(Surface::Rooms, format!("{}{mark}", room.name))
    }));
    ops
}

/// Clears the room-scoped surfaces when no room is selected.
pub fn empty_room_views() -> Vec<DisplayOp> {
    vec![
        DisplayOp::Clear(Surface::Messages),
        DisplayOp::Clear(Surface::Members),
    ]
}

pub fn presence_banner(is_join: bool, member: &Member) -> DisplayOp {
    let text = if is_join {
        format!("-- {} is now online", member.name)
    } else {
        format!("-- {} is now offline", member.name)
    };
    append(Surface::Messages, text)
}

pub fn member_line(member: &Member) -> String {
    let owner = if member.is_owner { OWNER_MARK } else { "" };
    let presence = if member.is_present {
        PRESENT_SUFFIX
    } else {
        ABSENT_SUFFIX
    };
    format!("{}{owner}{presence}", member.name)
}

fn append(surface: Surface, text: impl Into<String>) -> DisplayOp {
    DisplayOp::AppendLine(surface, text.into())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use lounge_session::{MemberRecord, MessageRecord, RoomSnapshot};
    use proptest::prelude::*;

    use super::*;

    fn said(id: &str, speaker: &str, text: &str) -> Message {
        Message::from(MessageRecord::new(
            id,
            speaker,
            speaker.to_uppercase(),
            text,
            Utc.with_ymd_and_hms(2024, 5, 4, 13, 7, 9).unwrap(),
        ))
    }

    fn lines(ops: &[DisplayOp]) -> Vec<&str> {
        ops.iter()
            .filter_map(|op| match op {
                DisplayOp::AppendLine(_, text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn same_speaker_gets_one_header() {
        let mut renderer = Renderer::new(RenderSettings::default());

        let first = renderer.message(&said("m1", "amy", "hi"));
        let second = renderer.message(&said("m2", "amy", "there"));

        assert_eq!(lines(&first), vec!["AMY (Sat May  4 13:07:09 2024):", " hi"]);
        assert_eq!(lines(&second), vec![" there"]);
        assert_eq!(renderer.last_speaker(), Some(&MemberId::new("amy")));
    }

    #[test]
    fn boundary_forces_a_fresh_header_for_the_same_speaker() {
        let mut renderer = Renderer::new(RenderSettings::default());

        renderer.message(&said("m1", "amy", "hi"));
        let boundary = renderer.message(&Message::boundary(Utc::now()));
        let after = renderer.message(&said("m2", "amy", "again"));

        assert_eq!(lines(&boundary), vec![ARCHIVES_DELIMITER]);
        assert_eq!(lines(&after).len(), 2);
        assert!(lines(&after)[0].starts_with("AMY ("));
    }

    #[test]
    fn multiline_bodies_keep_every_segment() {
        let mut renderer = Renderer::new(RenderSettings {
            indent: "  ".to_string(),
            ..RenderSettings::default()
        });

        let ops = renderer.message(&said("m1", "amy", "one\r\n\nthree\n"));

        assert_eq!(&lines(&ops)[1..], &["  one", "  ", "  three", "  "]);
    }

    #[test]
    fn messages_view_starts_with_prompt_and_resets_cursor() {
        let mut renderer = Renderer::new(RenderSettings::default());
        renderer.message(&said("m0", "amy", "before"));

        let mut room = Room::new(RoomId::new("r1"), "Lobby");
        room.log.append(said("m1", "amy", "hi"));

        let ops = renderer.messages_view(&room);

        assert_eq!(ops[0], DisplayOp::Clear(Surface::Messages));
        assert_eq!(lines(&ops)[0], crate::settings::DEFAULT_ARCHIVE_PROMPT);
        assert!(lines(&ops)[1].starts_with("AMY ("));
        assert_eq!(
            ops.last(),
            Some(&DisplayOp::SetStatus(
                Surface::Messages,
                "lounge-messages (Lobby)".to_string()
            ))
        );
    }

    #[test]
    fn full_render_covers_everything_appended_so_far() {
        let mut renderer = Renderer::new(RenderSettings::default());
        let mut room = Room::new(RoomId::new("r1"), "Lobby");
        room.log.append(said("m1", "amy", "hi"));
        room.log.append(said("m2", "amy", "there"));

        renderer.messages_view(&room);

        assert!(renderer.covers(&RoomId::new("r1"), 2));
        assert!(!renderer.covers(&RoomId::new("r1"), 3));
        assert!(!renderer.covers(&RoomId::new("r2"), 1));

        renderer.mark_rendered(&RoomId::new("r1"), 3);
        assert!(renderer.covers(&RoomId::new("r1"), 3));
        renderer.forget_rendered();
        assert!(!renderer.covers(&RoomId::new("r1"), 1));
    }

    #[test]
    fn members_view_lists_present_before_absent() {
        let room = Room::from_snapshot(
            RoomSnapshot::new("r1", "Lobby")
                .with_member(MemberRecord::new("a", "Ann"))
                .with_member(MemberRecord::new("b", "Ben").owner().present(true))
                .with_member(MemberRecord::new("c", "Cid").present(true)),
        );

        let ops = Renderer::new(RenderSettings::default()).members_view(&room);

        assert_eq!(lines(&ops), vec!["Ben(owner) +", "Cid +", "Ann -"]);
        assert_eq!(
            ops.last(),
            Some(&DisplayOp::SetStatus(
                Surface::Members,
                "lounge-members (2/3)".to_string()
            ))
        );
    }

    #[test]
    fn rooms_view_marks_only_the_current_room() {
        let mut state = ChatState::new();
        state.load_snapshot(&[
            RoomSnapshot::new("r1", "Lobby"),
            RoomSnapshot::new("r2", "Dev"),
        ]);

        let ops = rooms_view(&state, Some(&RoomId::new("r2")));

        assert_eq!(lines(&ops), vec!["Lobby", "Dev *"]);
        assert!(ops.iter().all(|op| op.surface() == Surface::Rooms));
    }

    proptest! {
        #[test]
        fn presence_changes_keep_members_partitioned(
            changes in proptest::collection::vec((0usize..6, any::<bool>()), 0..40)
        ) {
            let mut room = Room::from_snapshot(
                RoomSnapshot::new("r1", "Lobby")
                    .with_member(MemberRecord::new("m0", "M0").present(true))
                    .with_member(MemberRecord::new("m1", "M1")),
            );
            let mut first_seen = vec![("M0".to_string(), true), ("M1".to_string(), false)];

            for (index, is_join) in changes {
                let name = format!("M{index}");
                room.set_presence(&MemberRecord::new(format!("m{index}"), name.clone()), is_join);
                match first_seen.iter_mut().find(|(known, _)| *known == name) {
                    Some((_, present)) => *present = is_join,
                    None => first_seen.push((name, is_join)),
                }
            }

            let ops = Renderer::new(RenderSettings::default()).members_view(&room);

            let present = first_seen.iter().filter(|(_, present)| *present);
            let absent = first_seen.iter().filter(|(_, present)| !*present);
            let expected: Vec<String> = present
                .map(|(name, _)| format!("{name}{PRESENT_SUFFIX}"))
                .chain(absent.map(|(name, _)| format!("{name}{ABSENT_SUFFIX}")))
                .collect();
            prop_assert_eq!(lines(&ops), expected);

            let present_count = first_seen.iter().filter(|(_, present)| *present).count();
            prop_assert!(room.present_count() <= room.member_count());
            prop_assert_eq!(room.present_count(), present_count);
            prop_assert_eq!(room.member_count(), first_seen.len());
            prop_assert_eq!(
                ops.last(),
                Some(&DisplayOp::SetStatus(
                    Surface::Members,
                    format!("lounge-members ({present_count}/{})", first_seen.len())
                ))
            );
        }
    }
}
