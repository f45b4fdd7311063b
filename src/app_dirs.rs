use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("setwise");
            Some(state_dir.join("sessions.db"))
        } else {
            ProjectDirs::from("", "", "setwise")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("sessions.db"))
        }
    }

    /// User-authored templates live next to the config file
    pub fn templates_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "setwise").map(|pd| pd.config_dir().join("templates"))
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "setwise").map(|pd| pd.config_dir().join("config.json"))
    }
}
