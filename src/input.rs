use crate::game::UiAction;
use crate::model::Scene;
use crate::ui::Point;
use crossterm::event::{
    self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};
use std::time::Duration;

const MAX_EVENTS_PER_FRAME: usize = 32;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum InputEvent {
    Key { key: KeyCode, mods: KeyModifiers },
    Press(Point),
    Move(Point),
}

pub(crate) fn collect_input_nonblocking(max_frame_time: Duration) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();

    // poll with a tiny timeout so we stay responsive
    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        let ev = match event::read()? {
            Event::Key(k) if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat => {
                Some(InputEvent::Key {
                    key: k.code,
                    mods: k.modifiers,
                })
            }
            Event::Mouse(m) => {
                let at = Point {
                    col: m.column,
                    row: m.row,
                };
                match m.kind {
                    MouseEventKind::Down(MouseButton::Left) => Some(InputEvent::Press(at)),
                    MouseEventKind::Moved | MouseEventKind::Drag(_) => Some(InputEvent::Move(at)),
                    _ => None,
                }
            }
            _ => None,
        };
        if let Some(ev) = ev {
            out.push(ev);
            if out.len() >= MAX_EVENTS_PER_FRAME {
                break;
            }
        }
    }
    Ok(out)
}

pub(crate) fn map_event_to_action(scene: Scene, ev: InputEvent) -> Option<UiAction> {
    let (key, mods) = match ev {
        InputEvent::Press(p) => return Some(UiAction::PointerPress(p)),
        InputEvent::Move(p) => return Some(UiAction::PointerMove(p)),
        InputEvent::Key { key, mods } => (key, mods),
    };

    // Global
    if matches!(key, KeyCode::Char('c') | KeyCode::Char('C'))
        && mods.contains(KeyModifiers::CONTROL)
    {
        return Some(UiAction::Quit);
    }
    match key {
        KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?') => {
            return Some(UiAction::HelpToggle)
        }
        KeyCode::Char('q') | KeyCode::Char('Q') => return Some(UiAction::Quit),
        _ => {}
    }

    match scene {
        Scene::Desk => match key {
            KeyCode::Up | KeyCode::Char('k') | KeyCode::BackTab => Some(UiAction::FocusMove(-1)),
            KeyCode::Down | KeyCode::Char('j') => Some(UiAction::FocusMove(1)),
            KeyCode::Enter | KeyCode::Char(' ') => Some(UiAction::Activate),
            KeyCode::Char(ch @ '1'..='9') => {
                let index = ch.to_digit(10).map(|d| d as usize - 1)?;
                Some(UiAction::ChooseOption(index))
            }
            KeyCode::Char('a') | KeyCode::Char('A') => Some(UiAction::ToggleAchievements),
            KeyCode::Char('r') | KeyCode::Char('R') | KeyCode::Char('n') | KeyCode::Char('N') => {
                Some(UiAction::Restart)
            }
            KeyCode::Tab | KeyCode::Char('s') | KeyCode::Char('S') => Some(UiAction::SettingsOpen),
            _ => None,
        },
        Scene::Settings => match key {
            KeyCode::Up => Some(UiAction::SettingsMove(-1)),
            KeyCode::Down => Some(UiAction::SettingsMove(1)),
            KeyCode::Left | KeyCode::Char('-') => Some(UiAction::SettingsAdjust(-1)),
            KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('=') => {
                Some(UiAction::SettingsAdjust(1))
            }
            KeyCode::Enter | KeyCode::Char(' ') => Some(UiAction::SettingsActivate),
            KeyCode::Esc | KeyCode::Tab => Some(UiAction::Back),
            _ => None,
        },
        Scene::Help => match key {
            KeyCode::Esc | KeyCode::Enter => Some(UiAction::Back),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> InputEvent {
        InputEvent::Key {
            key: code,
            mods: KeyModifiers::NONE,
        }
    }

    #[test]
    fn digits_pick_options_by_position() {
        assert_eq!(
            map_event_to_action(Scene::Desk, key(KeyCode::Char('1'))),
            Some(UiAction::ChooseOption(0))
        );
        assert_eq!(
            map_event_to_action(Scene::Desk, key(KeyCode::Char('3'))),
            Some(UiAction::ChooseOption(2))
        );
        assert_eq!(map_event_to_action(Scene::Desk, key(KeyCode::Char('0'))), None);
    }

    #[test]
    fn arrows_mean_different_things_per_scene() {
        assert_eq!(
            map_event_to_action(Scene::Desk, key(KeyCode::Down)),
            Some(UiAction::FocusMove(1))
        );
        assert_eq!(
            map_event_to_action(Scene::Settings, key(KeyCode::Down)),
            Some(UiAction::SettingsMove(1))
        );
        assert_eq!(
            map_event_to_action(Scene::Settings, key(KeyCode::Left)),
            Some(UiAction::SettingsAdjust(-1))
        );
        assert_eq!(map_event_to_action(Scene::Help, key(KeyCode::Down)), None);
    }

    #[test]
    fn quit_and_help_work_everywhere() {
        for scene in [Scene::Desk, Scene::Settings, Scene::Help] {
            assert_eq!(
                map_event_to_action(scene, key(KeyCode::Char('q'))),
                Some(UiAction::Quit)
            );
            assert_eq!(
                map_event_to_action(scene, key(KeyCode::Char('h'))),
                Some(UiAction::HelpToggle)
            );
        }
        let ctrl_c = InputEvent::Key {
            key: KeyCode::Char('c'),
            mods: KeyModifiers::CONTROL,
        };
        assert_eq!(map_event_to_action(Scene::Desk, ctrl_c), Some(UiAction::Quit));
    }

    #[test]
    fn mouse_events_pass_through_as_pointer_actions() {
        let p = Point { col: 4, row: 9 };
        assert_eq!(
            map_event_to_action(Scene::Desk, InputEvent::Press(p)),
            Some(UiAction::PointerPress(p))
        );
        assert_eq!(
            map_event_to_action(Scene::Settings, InputEvent::Move(p)),
            Some(UiAction::PointerMove(p))
        );
    }
}
