#![deny(unsafe_code)]

//! Boundary of the chat service connection: identifiers, decoded records, the
//! hook registry, and the [`SessionSource`] contract the client core drives.

pub mod error;
pub mod hooks;
pub mod ids;
pub mod scripted;
pub mod source;
pub mod types;

pub use error::{SessionError, SessionResult};
pub use hooks::{EventKind, Hook, HookRegistry};
pub use ids::{BOUNDARY_MESSAGE_ID, MemberId, MessageId, RoomId};
pub use scripted::{ScriptError, ScriptEvent, ScriptedSession, SessionScript};
pub use source::SessionSource;
pub use types::{MemberRecord, MessageRecord, RoomSnapshot};
