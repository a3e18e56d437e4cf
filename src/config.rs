use std::path::{Path, PathBuf};

use crate::models::{Escaping, DEFAULT_PROFILE_URL};

const DEFAULT_PORT: u16 = 3000;

/// Runtime settings, read once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub port: u16,
    pub open_browser: bool,
    pub escaping: Escaping,
    pub profile_url: String,
}

impl Config {
    /// The first CLI argument wins over `DKP_ROOT` for the data root.
    pub fn from_env() -> Self {
        let root = std::env::args()
            .nth(1)
            .or_else(|| std::env::var("DKP_ROOT").ok())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            root,
            port: std::env::var("DKP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            open_browser: env_flag("DKP_OPEN_BROWSER"),
            escaping: if env_flag("DKP_ESCAPE_REPORTS") {
                Escaping::Escape
            } else {
                Escaping::Raw
            },
            profile_url: std::env::var("DKP_PROFILE_URL")
                .unwrap_or_else(|_| DEFAULT_PROFILE_URL.to_string()),
        }
    }

    pub fn layout(&self) -> Layout {
        Layout::new(&self.root)
    }
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(false)
}

/// On-disk locations, all relative to the data root
#[derive(Debug, Clone)]
pub struct Layout {
    /// Inbound drop location for a new roll-up
    pub source_file: PathBuf,
    /// Standings export
    pub standings_file: PathBuf,
    pub rollups_dir: PathBuf,
    pub combined_log: PathBuf,
    pub public_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub uploads_dir: PathBuf,
}

impl Layout {
    pub fn new(root: &Path) -> Self {
        let uploads_dir = root.join("uploads");
        let rollups_dir = uploads_dir.join("rollups");
        Self {
            source_file: root.join("source").join("rollup.html"),
            standings_file: uploads_dir.join("QDKP.html"),
            combined_log: rollups_dir.join("combined_rollup.html"),
            rollups_dir,
            public_dir: root.join("public"),
            assets_dir: root.join("assets"),
            uploads_dir,
        }
    }

    pub fn index_file(&self) -> PathBuf {
        self.public_dir.join("index.html")
    }
}
