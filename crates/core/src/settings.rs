use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use tempfile::NamedTempFile;

pub const SETTINGS_DIRECTORY_NAME: &str = "lounge";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const SETTINGS_ENV_PREFIX: &str = "LOUNGE_";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
pub const MIN_POLL_INTERVAL_MS: u64 = 10;
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Y";
pub const DEFAULT_ARCHIVE_PROMPT: &str = "[Read more from archives...]";
pub const DEFAULT_MESSAGES_TITLE: &str = "lounge-messages";
pub const DEFAULT_MEMBERS_TITLE: &str = "lounge-members";

/// Text conventions used when turning state into display lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    #[serde(default = "default_indent")]
    pub indent: String,
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
    #[serde(default = "default_archive_prompt")]
    pub archive_prompt: String,
    #[serde(default = "default_messages_title")]
    pub messages_title: String,
    #[serde(default = "default_members_title")]
    pub members_title: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            indent: default_indent(),
            timestamp_format: default_timestamp_format(),
            archive_prompt: default_archive_prompt(),
            messages_title: default_messages_title(),
            members_title: default_members_title(),
        }
    }
}

impl RenderSettings {
    pub fn normalized(mut self) -> Self {
        // Indent is kept verbatim, whitespace is the whole point of it.
        self.timestamp_format = non_blank_or(self.timestamp_format, default_timestamp_format);
        self.archive_prompt = non_blank_or(self.archive_prompt, default_archive_prompt);
        self.messages_title = non_blank_or(self.messages_title, default_messages_title);
        self.members_title = non_blank_or(self.members_title, default_members_title);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoungeSettings {
    /// How often the host is expected to call `process_queue`.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Room selected after connecting, when the session knows it.
    #[serde(default)]
    pub initial_room: Option<String>,
    #[serde(default)]
    pub render: RenderSettings,
}

impl Default for LoungeSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            initial_room: None,
            render: RenderSettings::default(),
        }
    }
}

impl LoungeSettings {
    pub fn normalized(mut self) -> Self {
        self.poll_interval_ms = self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS);
        self.initial_room = self
            .initial_room
            .map(|room| room.trim().to_string())
            .filter(|room| !room.is_empty());
        self.render = self.render.normalized();
        self
    }
}

pub struct SettingsStore {
    settings: Arc<ArcSwap<LoungeSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".lounge"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from_disk(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> Arc<LoungeSettings> {
        self.settings.load_full()
    }

    pub fn update(&self, settings: LoungeSettings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        self.persist(&normalized_settings)?;
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    fn load_from_disk(path: &Path) -> LoungeSettings {
        let mut figment = Figment::from(Serialized::defaults(LoungeSettings::default()));
        if path.exists() {
            figment = figment.merge(Json::file(path));
        } else {
            tracing::info!(path = ?path, "settings file not found, using defaults");
        }
        // `LOUNGE_RENDER__INDENT` style keys reach nested tables.
        figment = figment.merge(Env::prefixed(SETTINGS_ENV_PREFIX).split("__"));

        match figment.extract::<LoungeSettings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(path = ?path, error = %error, "failed to parse settings, using defaults");
                LoungeSettings::default()
            }
        }
    }

    /// Stages the JSON next to the target file, then swaps it in.
    fn persist(&self, settings: &LoungeSettings) -> Result<(), SettingsError> {
        let directory = self
            .config_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(directory).context(ConfigDirectorySnafu {
            stage: "lounge-settings-directory",
            directory: directory.to_path_buf(),
        })?;

        let mut staged = NamedTempFile::new_in(directory).context(StoreSettingsSnafu {
            stage: "lounge-settings-stage",
            path: self.config_path.clone(),
        })?;
        serde_json::to_writer_pretty(&mut staged, settings).context(EncodeSettingsSnafu {
            stage: "lounge-settings-encode",
        })?;
        staged
            .persist(&self.config_path)
            .map_err(|error| error.error)
            .context(StoreSettingsSnafu {
                stage: "lounge-settings-swap",
                path: self.config_path.clone(),
            })?;

        tracing::info!(
            path = ?self.config_path,
            poll_interval_ms = settings.poll_interval_ms,
            initial_room = ?settings.initial_room,
            "lounge settings saved"
        );
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("cannot prepare lounge config directory {directory:?} on `{stage}`: {source}"))]
    ConfigDirectory {
        stage: &'static str,
        directory: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("cannot encode lounge settings as JSON on `{stage}`: {source}"))]
    EncodeSettings {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("cannot store lounge settings at {path:?} on `{stage}`: {source}"))]
    StoreSettings {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

fn non_blank_or(value: String, fallback: fn() -> String) -> String {
    if value.trim().is_empty() {
        fallback()
    } else {
        value
    }
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_indent() -> String {
    " ".to_string()
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

fn default_archive_prompt() -> String {
    DEFAULT_ARCHIVE_PROMPT.to_string()
}

fn default_messages_title() -> String {
    DEFAULT_MESSAGES_TITLE.to_string()
}

fn default_members_title() -> String {
    DEFAULT_MEMBERS_TITLE.to_string()
}
