use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use lounge_core::{BufferView, ChatClient, SettingsStore, Surface, TracingNotifier};
use lounge_session::{ScriptedSession, SessionScript, SessionSource};
use snafu::{OptionExt, ResultExt, Whatever};
use tracing_subscriber::EnvFilter;

/// Replays a recorded session script through the client core and prints the
/// resulting surfaces.
///
/// Usage: `lounge <session-script.json> [--archives]`
#[tokio::main]
async fn main() -> Result<(), Whatever> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let script_path = args
        .next()
        .map(PathBuf::from)
        .whatever_context("usage: lounge <session-script.json> [--archives]")?;
    let fetch_archives = args.any(|arg| arg == "--archives");

    let store = SettingsStore::load();
    let settings = store.settings();
    tracing::debug!(config_path = ?store.config_path(), "settings loaded");

    let script = SessionScript::load(&script_path)
        .with_whatever_context(|_| format!("could not load {}", script_path.display()))?;
    let source: Arc<dyn SessionSource> = Arc::new(ScriptedSession::from_script(script));

    let mut client = ChatClient::new(
        source,
        BufferView::new(),
        Arc::new(TracingNotifier),
        &settings,
    );
    client
        .start()
        .whatever_context("could not start the chat client")?;

    let mut ticker = tokio::time::interval(Duration::from_millis(settings.poll_interval_ms));
    loop {
        ticker.tick().await;
        let applied = client.process_queue();
        if applied > 0 {
            tracing::debug!(applied, "drained operation queue");
        }
        if client.observer_finished() && client.pending_operations() == 0 {
            break;
        }
    }

    if fetch_archives {
        client.fetch_archives();
    }
    client.teardown();

    print_surface(&client, Surface::Rooms, "rooms");
    print_surface(&client, Surface::Members, "members");
    print_surface(&client, Surface::Messages, "messages");
    Ok(())
}

fn print_surface(client: &ChatClient<BufferView>, surface: Surface, label: &str) {
    let view = client.view();
    let status = view.status(surface);
    println!("== {label} {status}");
    for line in view.lines(surface) {
        println!("{line}");
    }
    println!();
}
