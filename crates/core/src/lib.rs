#![deny(unsafe_code)]

//! Client core for a multi-room chat session.
//!
//! A session's blocking event pump runs on an observer thread and feeds shared
//! room state plus a queue of pending display operations. The host drains that
//! queue from its own display context through [`ChatClient::process_queue`],
//! which is the only place views are written.

pub mod client;
pub mod error;
pub mod hooks;
pub mod notify;
pub mod observer;
pub mod operation;
pub mod queue;
pub mod render;
pub mod settings;
pub mod state;
pub mod view;

pub use client::ChatClient;
pub use error::{CoreError, CoreResult};
pub use hooks::{CONNECTED_NOTICE, SessionIngest};
pub use notify::{Notifier, TracingNotifier};
pub use observer::{Observer, ObserverExit, ObserverHandle};
pub use operation::Operation;
pub use queue::OperationQueue;
pub use render::{DisplayOp, Renderer, Surface};
pub use settings::{LoungeSettings, RenderSettings, SettingsError, SettingsStore};
pub use state::{ChatState, CurrentRoom, Member, Message, MessageKind, MessageLog, Room, SharedState};
pub use view::{BufferView, SurfaceBuffer, ViewAdapter};
