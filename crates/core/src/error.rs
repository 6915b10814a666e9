use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CoreError {
    #[snafu(display("failed to spawn session observer thread on `{stage}`: {source}"))]
    SpawnObserver {
        stage: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("session observer thread panicked on `{stage}`"))]
    ObserverPanicked { stage: &'static str },
    #[snafu(display("chat client was already started"))]
    AlreadyStarted { stage: &'static str },
}

pub type CoreResult<T> = Result<T, CoreError>;
