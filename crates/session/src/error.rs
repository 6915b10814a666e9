use snafu::Snafu;

use super::ids::RoomId;

#[derive(Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SessionError {
    #[snafu(display("authentication failed for '{user}'"))]
    Authentication { stage: &'static str, user: String },
    #[snafu(display("connection lost: {details}"))]
    ConnectionLost {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("{detail}"))]
    Api { stage: &'static str, detail: String },
    #[snafu(display("room '{room_id}' is not part of this session"))]
    UnknownRoom {
        stage: &'static str,
        room_id: RoomId,
    },
    #[snafu(display("session is not alive"))]
    Closed { stage: &'static str },
    #[snafu(display("session pump is already running"))]
    AlreadyRunning { stage: &'static str },
}

pub type SessionResult<T> = Result<T, SessionError>;
