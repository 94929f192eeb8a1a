//! Configuration for tunino
//!
//! Settings are JSON files merged in order (`settings.json`, then the
//! optional `.secrets.json`), narrowed to the active environment section,
//! then overridden by `TUNINO_*` environment variables. The result is
//! validated once and handed to every worker as an immutable [`Config`].

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ::config::{Environment, File, FileFormat, Source, Value};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tunino_hardware::{InputChannel, TagId};

use crate::tracks::{self, TagToTrackMap};

/// Files read when none are given on the command line
pub const DEFAULT_SETTINGS_FILES: [&str; 2] = ["settings.json", ".secrets.json"];

/// Environment section used when `TUNINO_ENV` is not set
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Prefix of environment variables that override settings keys
/// (`TUNINO_INITIAL_VOLUME` overrides `initial_volume`)
pub const ENV_PREFIX: &str = "TUNINO";

const ENVIRONMENT_VAR: &str = "TUNINO_ENV";
const DEFAULT_SECTION: &str = "default";

/// MPD drops idle clients after `connection_timeout`, 60 seconds by default
const MPD_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("None of the settings files exist: {0:?}")]
    NoSettings(Vec<PathBuf>),

    #[error("Failed to load settings: {0}")]
    Load(#[source] ::config::ConfigError),

    #[error("Invalid settings: {0}")]
    Settings(#[source] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Worker timing
///
/// Read from the `timings` settings object; each field is given in
/// milliseconds with an `_ms` suffix, e.g. `"volume_debounce_ms": 200`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Pause after a play/pause press
    #[serde(rename = "play_pause_debounce_ms", deserialize_with = "millis")]
    pub play_pause_debounce: Duration,

    /// Pause after a volume press; short so holding the button ramps
    #[serde(rename = "volume_debounce_ms", deserialize_with = "millis")]
    pub volume_debounce: Duration,

    /// Pause after handling a tag
    #[serde(rename = "tag_debounce_ms", deserialize_with = "millis")]
    pub tag_debounce: Duration,

    /// Pause after the power button is released early
    #[serde(rename = "power_off_rearm_ms", deserialize_with = "millis")]
    pub power_off_rearm: Duration,

    /// How often the held power button is sampled
    #[serde(rename = "hold_poll_interval_ms", deserialize_with = "millis")]
    pub hold_poll_interval: Duration,

    /// How long the power button must be held
    #[serde(rename = "long_press_threshold_ms", deserialize_with = "millis")]
    pub long_press_threshold: Duration,

    /// Time given to the shutdown chime before power is cut
    #[serde(rename = "shutdown_grace_ms", deserialize_with = "millis")]
    pub shutdown_grace: Duration,

    /// Interval between MPD keepalive probes
    #[serde(rename = "keepalive_interval_ms", deserialize_with = "millis")]
    pub keepalive_interval: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            play_pause_debounce: Duration::from_secs(1),
            volume_debounce: Duration::from_millis(200),
            tag_debounce: Duration::from_secs(1),
            power_off_rearm: Duration::from_secs(1),
            hold_poll_interval: Duration::from_secs(1),
            long_press_threshold: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(3),
            keepalive_interval: Duration::from_secs(50),
        }
    }
}

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

/// Tag ids may be written as JSON numbers or strings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Number(u64),
    Text(String),
}

impl From<&TagValue> for TagId {
    fn from(value: &TagValue) -> Self {
        match value {
            TagValue::Number(n) => TagId::from(*n),
            TagValue::Text(s) => TagId::new(s.as_str()),
        }
    }
}

/// Everything read from the settings files
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub play_pause_button_pin: u8,
    pub volume_up_button_pin: u8,
    pub volume_down_button_pin: u8,
    pub poweroff_button_pin: u8,

    /// Volume change per press, applied as +step and -step
    #[serde(default = "default_volume_step")]
    pub volume_step: u8,

    /// Volume applied when the MPD connection is first opened
    pub initial_volume: u8,

    /// ALSA device the chimes are played on
    #[serde(default = "default_sound_device")]
    pub sound_device: String,

    /// Gain passed to `sox -v`
    #[serde(default = "default_sound_volume")]
    pub sound_volume: f32,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Tag name -> tag id
    #[serde(default)]
    pub rfid_map: HashMap<String, TagValue>,

    #[serde(default = "default_mpd_host")]
    pub mpd_host: String,

    #[serde(default = "default_mpd_port")]
    pub mpd_port: u16,

    /// Directory holding the chime WAV files; a relative path is resolved
    /// against the directory of the first settings file found
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,

    /// `mpd.conf` to read `music_directory` from
    #[serde(default = "default_mpd_conf")]
    pub mpd_conf: PathBuf,

    /// Skips reading `mpd.conf` when set
    #[serde(default)]
    pub music_directory: Option<PathBuf>,

    /// Program and arguments run to power the device off
    #[serde(default = "default_poweroff_command")]
    pub poweroff_command: Vec<String>,

    #[serde(default)]
    pub timings: Timings,
}

fn default_volume_step() -> u8 {
    5
}

fn default_sound_device() -> String {
    "default".to_string()
}

fn default_sound_volume() -> f32 {
    1.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_mpd_host() -> String {
    "localhost".to_string()
}

fn default_mpd_port() -> u16 {
    6600
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}

fn default_mpd_conf() -> PathBuf {
    PathBuf::from("/etc/mpd.conf")
}

fn default_poweroff_command() -> Vec<String> {
    vec!["poweroff".to_string()]
}

impl Settings {
    pub fn play_pause_channel(&self) -> InputChannel {
        InputChannel::new(self.play_pause_button_pin)
    }

    pub fn volume_up_channel(&self) -> InputChannel {
        InputChannel::new(self.volume_up_button_pin)
    }

    pub fn volume_down_channel(&self) -> InputChannel {
        InputChannel::new(self.volume_down_button_pin)
    }

    pub fn poweroff_channel(&self) -> InputChannel {
        InputChannel::new(self.poweroff_button_pin)
    }

    /// Tag name -> tag id, normalised
    pub fn named_tags(&self) -> HashMap<String, TagId> {
        self.rfid_map
            .iter()
            .map(|(name, value)| (name.clone(), TagId::from(value)))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let pins = [
            ("play_pause_button_pin", self.play_pause_button_pin),
            ("volume_up_button_pin", self.volume_up_button_pin),
            ("volume_down_button_pin", self.volume_down_button_pin),
            ("poweroff_button_pin", self.poweroff_button_pin),
        ];
        let mut seen = HashSet::new();
        for (name, pin) in pins {
            if !seen.insert(pin) {
                return Err(ConfigError::Invalid(format!("{} reuses GPIO{}", name, pin)));
            }
        }

        if self.initial_volume > 100 {
            return Err(ConfigError::Invalid(format!(
                "initial_volume {} is out of range [0, 100]",
                self.initial_volume
            )));
        }
        if self.volume_step == 0 || self.volume_step > 100 {
            return Err(ConfigError::Invalid(format!(
                "volume_step {} is out of range [1, 100]",
                self.volume_step
            )));
        }
        if !self.sound_volume.is_finite() || self.sound_volume <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "sound_volume {} must be a positive number",
                self.sound_volume
            )));
        }
        if self.poweroff_command.is_empty() {
            return Err(ConfigError::Invalid("poweroff_command is empty".to_string()));
        }

        let timings = &self.timings;
        if timings.keepalive_interval.is_zero() || timings.keepalive_interval >= MPD_IDLE_TIMEOUT {
            return Err(ConfigError::Invalid(format!(
                "keepalive interval {:?} must be between 0 and MPD's idle timeout ({:?})",
                timings.keepalive_interval, MPD_IDLE_TIMEOUT
            )));
        }
        if timings.hold_poll_interval.is_zero() {
            return Err(ConfigError::Invalid("hold poll interval must be positive".to_string()));
        }
        Ok(())
    }
}

/// Validated settings plus the resolved tag map
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub tracks: TagToTrackMap,
}

/// Builds a [`Config`] from files, environment section and overrides
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    files: Vec<PathBuf>,
    environment: String,
    mpd_conf: Option<PathBuf>,
    overrides: Option<::config::Map<String, String>>,
}

impl ConfigLoader {
    /// Default files, environment from `TUNINO_ENV`, overrides from `TUNINO_*`
    pub fn new() -> Self {
        let environment =
            std::env::var(ENVIRONMENT_VAR).unwrap_or_else(|_| DEFAULT_ENVIRONMENT.to_string());
        Self {
            files: DEFAULT_SETTINGS_FILES.iter().map(PathBuf::from).collect(),
            environment,
            mpd_conf: None,
            overrides: None,
        }
    }

    pub fn with_files(mut self, files: Vec<PathBuf>) -> Self {
        self.files = files;
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_mpd_conf(mut self, mpd_conf: impl Into<PathBuf>) -> Self {
        self.mpd_conf = Some(mpd_conf.into());
        self
    }

    /// Read overrides from these (`TUNINO_KEY`, value) pairs instead of the
    /// process environment
    pub fn with_overrides(mut self, overrides: Vec<(String, String)>) -> Self {
        self.overrides = Some(overrides.into_iter().collect());
        self
    }

    /// Layer the settings files, narrow to the environment, apply overrides,
    /// then validate
    ///
    /// Precedence, lowest first: top-level keys of the files, the `default`
    /// section, the active environment section, `TUNINO_*` variables.
    pub fn load_settings(&self) -> Result<Settings, ConfigError> {
        let Some(first) = self.files.iter().find(|path| path.is_file()) else {
            return Err(ConfigError::NoSettings(self.files.clone()));
        };
        let base_dir = settings_dir(first);

        let files = self
            .files
            .iter()
            .fold(::config::Config::builder(), |builder, path| {
                builder.add_source(File::from(path.as_path()).format(FileFormat::Json).required(false))
            })
            .build()
            .map_err(ConfigError::Load)?;

        let mut layered = ::config::Config::builder().add_source(files.clone());
        for name in [DEFAULT_SECTION, self.environment.as_str()] {
            if let Ok(table) = files.get_table(name) {
                tracing::debug!("Using settings section {}", name);
                layered = layered.add_source(Section(table));
            }
        }
        layered = layered.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(self.overrides.clone()),
        );

        let mut settings: Settings = layered
            .build()
            .map_err(ConfigError::Load)?
            .try_deserialize()
            .map_err(ConfigError::Settings)?;
        if settings.assets_dir.is_relative() {
            settings.assets_dir = base_dir.join(&settings.assets_dir);
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings and the tag map
    pub fn load(&self) -> Result<Config, ConfigError> {
        let settings = self.load_settings()?;

        let music_dir = match &settings.music_directory {
            Some(dir) => dir.clone(),
            None => {
                let mpd_conf = self.mpd_conf.as_ref().unwrap_or(&settings.mpd_conf);
                tracks::music_directory(mpd_conf)?
            }
        };
        let songs = tracks::load_song_map(&music_dir)?;
        let tracks = TagToTrackMap::from_named(&settings.named_tags(), &songs);
        tracing::info!(
            "Loaded {} tag mappings from {}",
            tracks.len(),
            music_dir.join(tracks::SONG_MAP_FILE).display()
        );

        Ok(Config { settings, tracks })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// One table of an already built configuration, layered as its own source
#[derive(Debug, Clone)]
struct Section(::config::Map<String, Value>);

impl Source for Section {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<::config::Map<String, Value>, ::config::ConfigError> {
        Ok(self.0.clone())
    }
}

/// Directory relative paths in the settings are resolved against
fn settings_dir(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .ok()
        .and_then(|path| path.parent().map(Path::to_path_buf))
        .unwrap_or_default()
}
