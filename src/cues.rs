use std::io::{self, Write};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Cue {
    CorrectAnswer,
    IncorrectAnswer,
    AchievementUnlocked,
}

impl Cue {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Cue::CorrectAnswer => "correct-answer",
            Cue::IncorrectAnswer => "incorrect-answer",
            Cue::AchievementUnlocked => "achievement-unlocked",
        }
    }
}

pub(crate) trait CueSink {
    fn fire(&mut self, cue: Cue);
}

#[derive(Default)]
pub(crate) struct CuePorts {
    pub(crate) audio: Option<Box<dyn CueSink>>,
    pub(crate) haptics: Option<Box<dyn CueSink>>,
}

impl CuePorts {
    pub(crate) fn play(&mut self, cue: Cue, haptics_enabled: bool) {
        debug!(cue = cue.name(), "cue");
        if let Some(audio) = self.audio.as_mut() {
            audio.fire(cue);
        }
        if haptics_enabled {
            if let Some(haptics) = self.haptics.as_mut() {
                haptics.fire(cue);
            }
        }
    }
}

pub(crate) struct TerminalBell;

impl CueSink for TerminalBell {
    fn fire(&mut self, cue: Cue) {
        if cue == Cue::AchievementUnlocked {
            let mut out = io::stdout();
            let _ = out.write_all(b"\x07");
            let _ = out.flush();
        }
    }
}
