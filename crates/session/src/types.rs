use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{MemberId, MessageId, RoomId};

/// Message as decoded from the chat service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: MessageId,
    pub speaker_id: MemberId,
    pub nickname: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl MessageRecord {
    pub fn new(
        id: impl Into<MessageId>,
        speaker_id: impl Into<MemberId>,
        nickname: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            speaker_id: speaker_id.into(),
            nickname: nickname.into(),
            text: text.into(),
            timestamp,
        }
    }
}

/// Room member as reported on roster load and presence changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub id: MemberId,
    pub name: String,
    #[serde(default)]
    pub is_owner: bool,
    #[serde(default)]
    pub is_present: bool,
}

impl MemberRecord {
    pub fn new(id: impl Into<MemberId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_owner: false,
            is_present: false,
        }
    }

    pub fn owner(mut self) -> Self {
        self.is_owner = true;
        self
    }

    pub fn present(mut self, is_present: bool) -> Self {
        self.is_present = is_present;
        self
    }
}

/// One room of the initial session snapshot, including the roster and backlog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub name: String,
    #[serde(default)]
    pub members: Vec<MemberRecord>,
    #[serde(default)]
    pub backlog: Vec<MessageRecord>,
}

impl RoomSnapshot {
    pub fn new(id: impl Into<RoomId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            members: Vec::new(),
            backlog: Vec::new(),
        }
    }

    pub fn with_member(mut self, member: MemberRecord) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_backlog(mut self, backlog: Vec<MessageRecord>) -> Self {
        self.backlog = backlog;
        self
    }
}
