use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use crate::storage::write_atomic;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::warn;

pub(crate) const LOW_POWER_FPS: u32 = 12;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) fps_cap: u32,
    pub(crate) enable_color: bool,
    pub(crate) reduced_motion: bool,
    pub(crate) low_power: bool,
    pub(crate) content_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps_cap: 30,
            enable_color: true,
            reduced_motion: false,
            low_power: false,
            content_path: None,
        }
    }
}

impl Settings {
    pub(crate) fn effective_fps(&self) -> u32 {
        let fps = self.fps_cap.clamp(10, 240);
        if self.low_power {
            fps.min(LOW_POWER_FPS)
        } else {
            fps
        }
    }
}

pub(crate) struct Paths {
    pub(crate) data_dir: PathBuf,
    pub(crate) settings_path: PathBuf,
    pub(crate) log_path: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "helpdesk-hero", "Tiny Helpdesk Hero")
        .context("could not resolve project directories")?;
    let dir = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&dir).with_context(|| format!("could not create {}", dir.display()))?;
    Ok(Paths {
        settings_path: dir.join("settings.json"),
        log_path: dir.join("helpdesk-hero.log"),
        data_dir: dir,
    })
}

// A missing file is a first run; a corrupt one is logged and replaced on exit.
pub(crate) fn load_settings(path: &Path) -> Settings {
    let Ok(raw) = fs::read_to_string(path) else {
        return Settings::default();
    };
    serde_json::from_str(&raw).unwrap_or_else(|err| {
        warn!(%err, path = %path.display(), "ignoring unreadable settings");
        Settings::default()
    })
}

pub(crate) fn save_settings(path: &Path, s: &Settings) -> Result<()> {
    write_atomic(path, &serde_json::to_vec_pretty(s)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_power_caps_the_frame_rate() {
        let mut s = Settings::default();
        assert_eq!(s.effective_fps(), 30);
        s.low_power = true;
        assert_eq!(s.effective_fps(), LOW_POWER_FPS);
        s.fps_cap = 1;
        s.low_power = false;
        assert_eq!(s.effective_fps(), 10);
    }

    #[test]
    fn partial_settings_files_fill_in_defaults() {
        let s: Settings = serde_json::from_str(r#"{"reduced_motion": true}"#).expect("json");
        assert!(s.reduced_motion);
        assert_eq!(s.fps_cap, Settings::default().fps_cap);
    }

    #[test]
    fn saved_settings_replace_the_old_file_and_corrupt_files_fall_back() {
        let dir = std::env::temp_dir().join(format!("helpdesk-hero-settings-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("settings.json");

        assert_eq!(load_settings(&path), Settings::default(), "first run");

        fs::write(&path, "{ not json").expect("write corrupt file");
        assert_eq!(load_settings(&path), Settings::default());

        let s = Settings {
            reduced_motion: true,
            fps_cap: 60,
            ..Settings::default()
        };
        save_settings(&path, &s).expect("save over corrupt file");
        assert_eq!(load_settings(&path), s);
        assert!(!path.with_extension("json.tmp").exists(), "temp file renamed away");

        let _ = fs::remove_dir_all(&dir);
    }
}
