use crate::accessibility::{AccessibilityStore, EnvMediaQueries, EnvPorts};
use crate::config::{load_settings, save_settings, Paths, Settings};
use crate::content::ContentBundle;
use crate::cues::{CuePorts, TerminalBell};
use crate::deck::generate_call_deck;
use crate::game::{Game, GameOptions, UiAction};
use crate::input::{collect_input_nonblocking, map_event_to_action};
use crate::render::{draw_frame, Palette, Terminal};
use crate::storage::FileStorage;
use crate::ui::Size;
use crate::validate::validate_content;
use crate::Cli;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub(crate) struct App {
    persisted: Settings,
    settings: Settings,
    paths: Paths,
    game: Game,
    term: Terminal,
}

pub(crate) fn load_content(path: Option<&Path>) -> anyhow::Result<ContentBundle> {
    match path {
        Some(p) => ContentBundle::load(p),
        None => ContentBundle::builtin(),
    }
}

pub(crate) fn validate_only(path: Option<&Path>) -> anyhow::Result<()> {
    let bundle = load_content(path)?;
    match validate_content(&bundle) {
        Ok(()) => {
            println!(
                "content ok: {} personas, {} problems, {} twists, {} seeds",
                bundle.personas.len(),
                bundle.problems.len(),
                bundle.twists.len(),
                bundle.seeds.len()
            );
            Ok(())
        }
        Err(err) => {
            for issue in &err.issues {
                eprintln!("  {issue}");
            }
            Err(err.into())
        }
    }
}

pub(crate) fn run(cli: &Cli, paths: Paths) -> anyhow::Result<()> {
    let mut app = App::init(cli, paths)?;
    let result = app.run();
    let finished = app.finish();
    result.and(finished)
}

impl App {
    fn init(cli: &Cli, paths: Paths) -> anyhow::Result<Self> {
        let persisted = load_settings(&paths.settings_path);
        let mut settings = persisted.clone();
        cli.apply_to(&mut settings);
        if std::env::var_os("NO_COLOR").is_some() {
            settings.enable_color = false;
        }

        let bundle = load_content(settings.content_path.as_deref())?;
        // Gameplay tolerates bad entries; the gate is `--validate`.
        if let Err(err) = validate_content(&bundle) {
            warn!(%err, "playing content that does not validate");
            for issue in &err.issues {
                warn!(path = %issue.path, "{}", issue.message);
            }
        }
        let deck = generate_call_deck(&bundle, None);
        info!(calls = deck.len(), "deck ready");

        let store = AccessibilityStore::new(EnvPorts {
            media: Some(Box::new(EnvMediaQueries::from_env())),
            storage: Some(Box::new(FileStorage::new(&paths.data_dir))),
        });
        let cues = CuePorts {
            audio: Some(Box::new(TerminalBell)),
            haptics: None,
        };
        let game = Game::new(
            deck,
            store,
            cues,
            GameOptions {
                reduced_motion: settings.reduced_motion,
                low_power: settings.low_power,
            },
        );

        let term = Terminal::begin()?;

        Ok(Self {
            persisted,
            settings,
            paths,
            game,
            term,
        })
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let fps = self.settings.effective_fps();
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);

        let mut last_frame = Instant::now();
        let mut full_redraw = true;

        while !self.game.should_quit() {
            if self.term.resize_if_needed()? {
                full_redraw = true;
            }

            // input
            let scene = self.game.scene();
            let actions: Vec<UiAction> = collect_input_nonblocking(frame_dt)?
                .into_iter()
                .filter_map(|ev| map_event_to_action(scene, ev))
                .collect();

            let now = Instant::now();
            let dt = now.saturating_duration_since(last_frame);
            last_frame = now;

            let size = Size {
                cols: self.term.cols,
                rows: self.term.rows,
            };
            self.game.frame(actions, dt.as_secs_f32(), size);

            // render
            self.render_frame(full_redraw)?;
            full_redraw = false;

            // frame cap
            spin_sleep(frame_dt, now);
        }
        Ok(())
    }

    fn render_frame(&mut self, full: bool) -> anyhow::Result<()> {
        let snap = self.game.snapshot();
        let pal = Palette::pick(&snap.accessibility, self.settings.enable_color);
        draw_frame(&mut self.term.cur, &snap, &pal);
        self.term.present(!full)
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        let state = self.game.conversation_state();
        info!(
            score = state.empathy_score,
            answered = state.current_index,
            calls = state.call_count,
            "session ended"
        );
        self.game.shutdown();
        self.term.end()?;

        let reduced = self.game.options().reduced_motion;
        if reduced != self.settings.reduced_motion {
            self.persisted.reduced_motion = reduced;
        }
        save_settings(&self.paths.settings_path, &self.persisted)?;
        Ok(())
    }
}

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn builtin_content_is_the_default() {
        let bundle = load_content(None).expect("builtin");
        assert_eq!(generate_call_deck(&bundle, None).len(), bundle.seeds.len());
    }

    #[test]
    fn validate_gate_fails_on_bad_content() {
        let dir = std::env::temp_dir().join(format!("helpdesk-hero-validate-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("bad.json");
        fs::write(&path, r#"{"personas":[{"id":"","name":"x","mood":"y","opener":"o","empathyWin":"w","empathyFail":"f"}]}"#)
            .expect("write content");

        let err = validate_only(Some(&path)).expect_err("blank id must fail");
        assert!(err.to_string().contains("content validation failed"), "{err}");
        assert!(validate_only(None).is_ok(), "built-in content validates");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_field_is_a_validation_issue_and_still_playable() {
        let dir = std::env::temp_dir().join(format!("helpdesk-hero-nameless-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("nameless.json");
        fs::write(
            &path,
            r#"{"personas":[{"id":"nameless","mood":"m","opener":"o","empathyWin":"w","empathyFail":"f"}],"seeds":[{"persona":"nameless","problem":"p"}]}"#,
        )
        .expect("write content");

        let err = validate_only(Some(&path)).expect_err("missing name must fail the gate");
        assert!(err.to_string().contains("content validation failed"), "{err}");

        let bundle = load_content(Some(&path)).expect("loads despite the missing name");
        assert!(generate_call_deck(&bundle, None).is_empty());

        let _ = fs::remove_dir_all(&dir);
    }
}
