use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

// All session-side identifiers are opaque strings handed out by the chat service.
macro_rules! define_session_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_session_id!(RoomId);
define_session_id!(MemberId);
define_session_id!(MessageId);

/// Id carried by synthetic boundary entries; never issued by the service.
pub const BOUNDARY_MESSAGE_ID: &str = "-1";

impl MessageId {
    pub fn boundary() -> Self {
        Self::new(BOUNDARY_MESSAGE_ID)
    }
}
