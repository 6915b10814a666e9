use std::sync::Arc;
use std::thread::JoinHandle;

use lounge_session::{SessionError, SessionSource};
use snafu::ResultExt;

use crate::error::{CoreResult, ObserverPanickedSnafu, SpawnObserverSnafu};
use crate::notify::Notifier;

pub const OBSERVER_THREAD_NAME: &str = "lounge-session-observer";

/// How the session pump ended.
#[derive(Debug, Clone)]
pub enum ObserverExit {
    Finished,
    Failed(SessionError),
}

/// Drives a session's blocking event pump on its own thread.
pub struct Observer;

impl Observer {
    pub fn spawn(
        source: Arc<dyn SessionSource>,
        notifier: Arc<dyn Notifier>,
    ) -> CoreResult<ObserverHandle> {
        let worker = std::thread::Builder::new()
            .name(OBSERVER_THREAD_NAME.to_string())
            .spawn(move || Self::run(source.as_ref(), notifier.as_ref()))
            .context(SpawnObserverSnafu {
                stage: "observer-spawn-thread",
            })?;

        Ok(ObserverHandle {
            worker: Some(worker),
        })
    }

    /// Blocks until the pump returns. A failure is reported once and never retried.
    pub fn run(source: &dyn SessionSource, notifier: &dyn Notifier) -> ObserverExit {
        tracing::debug!("session observer started");

        match source.run() {
            Ok(()) => {
                tracing::debug!("session observer finished");
                ObserverExit::Finished
            }
            Err(error) => {
                tracing::warn!(error = %error, "session pump failed");
                notifier.notify_error(&error.to_string());
                ObserverExit::Failed(error)
            }
        }
    }
}

/// Owned handle to the observer thread.
#[derive(Debug)]
pub struct ObserverHandle {
    worker: Option<JoinHandle<ObserverExit>>,
}

impl ObserverHandle {
    pub fn is_finished(&self) -> bool {
        self.worker
            .as_ref()
            .is_none_or(|worker| worker.is_finished())
    }

    /// Waits for the thread. Returns `None` when it was already joined.
    pub fn join(&mut self) -> CoreResult<Option<ObserverExit>> {
        let Some(worker) = self.worker.take() else {
            return Ok(None);
        };

        match worker.join() {
            Ok(exit) => Ok(Some(exit)),
            Err(_) => ObserverPanickedSnafu {
                stage: "observer-join",
            }
            .fail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use lounge_session::{ScriptEvent, ScriptedSession};
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct Errors(Mutex<Vec<String>>);

    impl Notifier for Errors {
        fn notify_error(&self, message: &str) {
            self.0.lock().push(message.to_string());
        }
    }

    #[test]
    fn fatal_pump_error_is_reported_once_verbatim() {
        let session = Arc::new(ScriptedSession::new());
        session.push_event(ScriptEvent::Fail {
            detail: "auth token expired".to_string(),
        });
        let errors = Arc::new(Errors::default());

        let mut handle = Observer::spawn(session, errors.clone()).unwrap();
        let exit = handle.join().unwrap();

        assert!(matches!(exit, Some(ObserverExit::Failed(_))));
        assert_eq!(*errors.0.lock(), vec!["auth token expired".to_string()]);
        assert!(handle.is_finished());
        assert!(handle.join().unwrap().is_none());
    }

    #[test]
    fn normal_end_is_silent() {
        let session = Arc::new(ScriptedSession::new());
        session.push_event(ScriptEvent::End);
        let errors = Arc::new(Errors::default());

        let exit = Observer::run(session.as_ref(), errors.as_ref());

        assert!(matches!(exit, ObserverExit::Finished));
        assert!(errors.0.lock().is_empty());
    }
}
