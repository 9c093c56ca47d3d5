mod accessibility;
mod achievements;
mod app;
mod config;
mod content;
mod conversation;
mod cues;
mod deck;
mod game;
mod input;
mod model;
mod render;
mod storage;
mod ui;
mod validate;

use anyhow::Result;
use clap::Parser;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "helpdesk-hero")]
#[command(about = "Tiny Helpdesk Hero: talk callers through their tech trouble")]
pub(crate) struct Cli {
    /// Content file to play instead of the built-in calls
    #[arg(long)]
    content: Option<PathBuf>,

    /// Check the content file, print any issues and exit
    #[arg(long, default_value_t = false)]
    validate: bool,

    /// Snap animations to their end state
    #[arg(long, default_value_t = false)]
    reduced_motion: bool,

    /// Lower the frame rate and stop idle animation
    #[arg(long, default_value_t = false)]
    low_power: bool,

    /// No colors
    #[arg(long, default_value_t = false)]
    mono: bool,

    /// Frame rate cap (10-240)
    #[arg(long)]
    fps: Option<u32>,
}

impl Cli {
    pub(crate) fn apply_to(&self, s: &mut config::Settings) {
        if let Some(path) = &self.content {
            s.content_path = Some(path.clone());
        }
        if let Some(fps) = self.fps {
            s.fps_cap = fps;
        }
        s.reduced_motion |= self.reduced_motion;
        s.low_power |= self.low_power;
        if self.mono {
            s.enable_color = false;
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

// The game owns the screen, so logs go to a file.
fn init_file_logging(path: &Path) {
    let Ok(file) = OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.validate {
        init_stderr_logging();
        return app::validate_only(cli.content.as_deref());
    }

    let paths = config::project_paths()?;
    init_file_logging(&paths.log_path);
    app::run(&cli, paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    #[test]
    fn flags_override_persisted_settings() {
        let cli = Cli::try_parse_from([
            "helpdesk-hero",
            "--content",
            "calls.json",
            "--mono",
            "--low-power",
            "--fps",
            "60",
        ])
        .expect("valid flags");
        let mut s = Settings::default();
        cli.apply_to(&mut s);
        assert_eq!(s.content_path, Some(PathBuf::from("calls.json")));
        assert!(!s.enable_color);
        assert!(s.low_power);
        assert!(!s.reduced_motion, "unset flags leave settings alone");
        assert_eq!(s.fps_cap, 60);
    }

    #[test]
    fn persisted_reduced_motion_survives_without_the_flag() {
        let cli = Cli::try_parse_from(["helpdesk-hero"]).expect("no flags");
        let mut s = Settings {
            reduced_motion: true,
            ..Settings::default()
        };
        cli.apply_to(&mut s);
        assert!(s.reduced_motion);
        assert!(s.enable_color);
    }
}
