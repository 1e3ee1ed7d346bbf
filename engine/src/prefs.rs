//! Persisted presentation preference.
//!
//! One key/value pair: the theme. Read once at startup, written on every
//! change. An absent or unreadable file means the default (dark); preference
//! loading never blocks startup.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use quill_types::Theme;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Preferences {
    #[serde(default)]
    theme: Theme,
}

#[must_use]
pub fn load_theme(path: &Path) -> Theme {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(%e, path = %path.display(), "Could not read preferences");
            }
            return Theme::default();
        }
    };
    match toml::from_str::<Preferences>(&raw) {
        Ok(prefs) => prefs.theme,
        Err(e) => {
            tracing::warn!(%e, path = %path.display(), "Malformed preferences file");
            Theme::default()
        }
    }
}

pub fn save_theme(path: &Path, theme: Theme) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string(&Preferences { theme }).map_err(io::Error::other)?;
    fs::write(path, body)
}
