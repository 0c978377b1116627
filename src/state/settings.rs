/// Station configuration
///
/// Settings are serialized to JSON in the user's config directory and
/// loaded at startup; a missing file means defaults. Everything an
/// operator might tune lives here: frame source, scan timing, badge
/// style, and the outbound notifier credentials.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::badge::synthesize::StyleOptions;

/// Credentials and template selection for the outbound email notifier
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NotifierSettings {
    /// Send endpoint (an EmailJS-compatible REST API)
    pub endpoint: String,
    pub service_id: String,
    /// Template used when a badge URL is attached
    pub template_id_badge: String,
    /// Template used when the volunteer kept their own badge
    pub template_id_plain: String,
    pub public_key: String,
}

/// All station settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Settings {
    /// Directory the external capture process writes frames into
    pub spool_dir: PathBuf,
    /// Frame polling rate (frames per second)
    pub fps: u32,
    /// Frames are downscaled to fit this square before detection
    pub detection_size: u32,
    /// Delay after a processed scan before new scans are accepted
    pub cooldown_ms: u64,
    /// Badge rendering style, also used for the station banner
    pub style: StyleOptions,
    /// Departments ensured to exist on startup, so a fresh station can
    /// register volunteers before any admin tooling has run
    pub seed_departments: Vec<String>,
    /// Outbound notifier; None disables registration emails
    pub notifier: Option<NotifierSettings>,
    /// Override for the catalog database location
    pub db_path: Option<PathBuf>,
}

impl Default for Settings {
    /// Default station settings (reference behavior)
    fn default() -> Self {
        Self {
            spool_dir: default_spool_dir(),
            fps: 10,
            detection_size: 250,
            cooldown_ms: 1000,
            style: StyleOptions::default(),
            seed_departments: vec![
                "Musik".to_string(),
                "Usher".to_string(),
                "Media".to_string(),
                "Konsumsi".to_string(),
            ],
            notifier: None,
            db_path: None,
        }
    }
}

impl Settings {
    /// Load settings from the default config path.
    /// Missing file = defaults; unreadable file = defaults with a warning.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from an explicit path
    pub fn load_from(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => settings,
                Err(e) => {
                    eprintln!("⚠️  Invalid config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Persist settings to an explicit path
    pub fn save_to(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json().expect("settings serialize"))
    }

    /// Where the config file lives:
    /// ~/.config/qr-checkin/config.json on Linux
    pub fn config_path() -> PathBuf {
        let mut path = dirs::config_dir()
            .or_else(dirs::home_dir)
            .expect("Could not determine config directory");
        path.push("qr-checkin");
        path.push("config.json");
        path
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The cooldown as a Duration
    pub fn cooldown(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.cooldown_ms)
    }

    /// Interval between frame polls
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(1000 / u64::from(self.fps.max(1)))
    }
}

/// Default frame spool location:
/// ~/.cache/qr-checkin/frames on Linux
fn default_spool_dir() -> PathBuf {
    let mut path = dirs::cache_dir()
        .or_else(dirs::home_dir)
        .expect("Could not determine cache directory");
    path.push("qr-checkin");
    path.push("frames");
    path
}
