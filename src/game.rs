use crate::accessibility::{
    AccessibilityState, AccessibilityStore, SubscriptionId, FONT_SCALE_MAX, FONT_SCALE_MIN,
};
use crate::achievements::{AchievementEngine, AchievementsView};
use crate::conversation::{ConversationEngine, ConversationState, Selection};
use crate::cues::{Cue, CuePorts};
use crate::model::{Call, Scene};
use crate::ui::{FocusTarget, Point, Pulse, Size, UiState};
use std::cell::Cell;
use std::rc::Rc;
use tracing::info;

const FONT_SCALE_STEP: f32 = 0.25;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum UiAction {
    FocusMove(i32),
    Activate,
    ChooseOption(usize),
    PointerPress(Point),
    PointerMove(Point),
    ToggleAchievements,
    Restart,
    HelpToggle,
    SettingsOpen,
    SettingsMove(i32),
    SettingsAdjust(i32),
    SettingsActivate,
    Back,
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    AwaitingInput,
    ShiftComplete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SettingItem {
    TextSize,
    DyslexiaFont,
    HighContrast,
    FollowSystemContrast,
    Haptics,
    ReducedMotion,
}

pub(crate) const SETTING_ITEMS: [SettingItem; 6] = [
    SettingItem::TextSize,
    SettingItem::DyslexiaFont,
    SettingItem::HighContrast,
    SettingItem::FollowSystemContrast,
    SettingItem::Haptics,
    SettingItem::ReducedMotion,
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct GameOptions {
    pub(crate) reduced_motion: bool,
    pub(crate) low_power: bool,
}

pub(crate) struct FrameSnapshot<'a> {
    pub(crate) scene: Scene,
    pub(crate) empathy_score: u32,
    pub(crate) current_index: usize,
    pub(crate) call_count: usize,
    pub(crate) is_complete: bool,
    pub(crate) streak: u32,
    pub(crate) call: Option<&'a Call>,
    pub(crate) last_selection: Option<&'a Selection>,
    pub(crate) achievements: AchievementsView,
    pub(crate) accessibility: AccessibilityState,
    pub(crate) ui: &'a UiState,
    pub(crate) settings_cursor: usize,
    pub(crate) options: GameOptions,
    pub(crate) clock: f32,
}

pub(crate) struct Game {
    scene: Scene,
    conversation: ConversationEngine,
    achievements: AchievementEngine,
    accessibility: AccessibilityStore,
    ui: UiState,
    cues: CuePorts,
    last_selection: Option<Selection>,
    options: GameOptions,
    settings_cursor: usize,
    settings_watch: Option<(SubscriptionId, Rc<Cell<u32>>)>,
    should_quit: bool,
    clock: f32,
}

impl Game {
    pub(crate) fn new(
        deck: Vec<Call>,
        accessibility: AccessibilityStore,
        cues: CuePorts,
        options: GameOptions,
    ) -> Self {
        let conversation = ConversationEngine::new(deck);
        let mut achievements = AchievementEngine::new();
        achievements.start_shift(conversation.call_count());
        info!(calls = conversation.call_count(), "shift started");
        Self {
            scene: Scene::Desk,
            conversation,
            achievements,
            accessibility,
            ui: UiState::new(),
            cues,
            last_selection: None,
            options,
            settings_cursor: 0,
            settings_watch: None,
            should_quit: false,
            clock: 0.0,
        }
    }

    pub(crate) fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub(crate) fn scene(&self) -> Scene {
        self.scene
    }

    pub(crate) fn options(&self) -> GameOptions {
        self.options
    }

    pub(crate) fn phase(&self) -> Phase {
        if self.conversation.state().is_complete {
            Phase::ShiftComplete
        } else {
            Phase::AwaitingInput
        }
    }

    pub(crate) fn conversation_state(&self) -> ConversationState {
        self.conversation.state()
    }

    fn motion_reduced(&self) -> bool {
        self.options.reduced_motion || self.options.low_power
    }

    pub(crate) fn frame(&mut self, actions: impl IntoIterator<Item = UiAction>, dt: f32, size: Size) {
        self.accessibility.pump_system_changes();
        self.relayout(size);

        for action in actions {
            if self.should_quit {
                break;
            }
            self.apply(action);
            self.relayout(size);
        }

        self.ui.tick(dt, self.motion_reduced());
        self.relayout(size);
        if !self.options.low_power {
            self.clock += dt.max(0.0);
        }
    }

    fn relayout(&mut self, size: Size) {
        let a11y = self.accessibility.state();
        self.ui.relayout(size, self.conversation.current_call(), &a11y);
    }

    pub(crate) fn apply(&mut self, action: UiAction) {
        match action {
            UiAction::Quit => self.should_quit = true,
            UiAction::HelpToggle => {
                let next = match self.scene {
                    Scene::Help => Scene::Desk,
                    _ => Scene::Help,
                };
                self.set_scene(next);
            }
            UiAction::SettingsOpen => self.set_scene(Scene::Settings),
            UiAction::Back => self.set_scene(Scene::Desk),
            UiAction::SettingsMove(delta) => {
                let len = SETTING_ITEMS.len() as i32;
                self.settings_cursor = (self.settings_cursor as i32 + delta).rem_euclid(len) as usize;
            }
            UiAction::SettingsAdjust(delta) => self.adjust_setting(delta),
            UiAction::SettingsActivate => self.adjust_setting(0),
            UiAction::PointerMove(p) => self.ui.note_pointer(p),
            _ if self.scene != Scene::Desk => {}
            UiAction::PointerPress(p) => self.press(p),
            UiAction::FocusMove(delta) => self.ui.move_focus(delta),
            UiAction::Activate => self.activate(),
            UiAction::ChooseOption(index) => {
                self.ui.set_focus(index);
                self.select_option(index);
            }
            UiAction::ToggleAchievements => self.ui.toggle_achievements(),
            UiAction::Restart => {
                self.restart();
            }
        }
    }

    fn set_scene(&mut self, next: Scene) {
        if next == self.scene {
            return;
        }
        if next == Scene::Settings {
            self.settings_cursor = 0;
            let changes = Rc::new(Cell::new(0u32));
            let counter = Rc::clone(&changes);
            let id = self
                .accessibility
                .subscribe(move |_| counter.set(counter.get() + 1));
            self.settings_watch = Some((id, changes));
        } else if let Some((id, changes)) = self.settings_watch.take() {
            self.accessibility.unsubscribe(id);
            info!(changes = changes.get(), "settings closed");
        }
        self.scene = next;
    }

    fn press(&mut self, p: Point) {
        self.ui.note_pointer(p);
        self.ui.note_touch();
        if self.phase() == Phase::ShiftComplete {
            self.restart();
            return;
        }
        if self.ui.achievements_toggle_at_point(p) {
            self.ui.toggle_achievements();
            return;
        }
        let index = self.ui.option_index_at_point(p);
        if index >= 0 {
            self.select_option(index as usize);
        }
    }

    fn activate(&mut self) {
        if self.phase() == Phase::ShiftComplete {
            self.restart();
            return;
        }
        match self.ui.focused() {
            Some(FocusTarget::Option(i)) => {
                self.select_option(i);
            }
            Some(FocusTarget::AchievementsStub) => self.ui.toggle_achievements(),
            None => {}
        }
    }

    // The conversation engine accepts any index; the range check lives here.
    fn select_option(&mut self, index: usize) -> bool {
        let state = self.conversation.state();
        if state.call_count == 0 || state.is_complete {
            return false;
        }
        let Some(option_count) = self.conversation.current_call().map(|c| c.options.len()) else {
            return false;
        };
        if index >= option_count {
            return false;
        }

        let selection = self.conversation.choose_option(index as i64);
        if !selection.advanced {
            return false;
        }

        let reduced = self.motion_reduced();
        let haptics = self.accessibility.state().haptics_enabled;

        self.achievements.record_selection(&selection);
        if selection.correct {
            self.cues.play(Cue::CorrectAnswer, haptics);
            self.ui.trigger(Pulse::EmpathyGain, reduced);
        } else {
            self.cues.play(Cue::IncorrectAnswer, haptics);
        }
        self.ui.trigger(Pulse::CallTransition, reduced);
        self.last_selection = Some(selection);

        let after = self.conversation.state();
        if after.is_complete {
            let unlocked = self
                .achievements
                .complete_shift(after.empathy_score, after.call_count);
            info!(
                score = after.empathy_score,
                calls = after.call_count,
                unlocked_total = self.achievements.unlocked_ids().len(),
                "shift complete"
            );
            if !unlocked.is_empty() {
                self.ui.show_unlocks(&unlocked, reduced);
                self.cues.play(Cue::AchievementUnlocked, haptics);
            }
        }
        true
    }

    fn restart(&mut self) -> bool {
        if self.phase() != Phase::ShiftComplete {
            return false;
        }
        self.conversation.reset();
        self.achievements.start_shift(self.conversation.call_count());
        self.last_selection = None;
        self.ui.trigger(Pulse::CallTransition, self.motion_reduced());
        info!(calls = self.conversation.call_count(), "shift restarted");
        true
    }

    fn adjust_setting(&mut self, delta: i32) {
        let Some(item) = SETTING_ITEMS.get(self.settings_cursor).copied() else {
            return;
        };
        let a11y = self.accessibility.state();
        match item {
            SettingItem::TextSize => {
                let next = if delta == 0 {
                    let stepped = a11y.font_scale + FONT_SCALE_STEP;
                    if stepped > FONT_SCALE_MAX + f32::EPSILON {
                        FONT_SCALE_MIN
                    } else {
                        stepped
                    }
                } else {
                    a11y.font_scale + FONT_SCALE_STEP * delta.signum() as f32
                };
                self.accessibility.set_font_scale(next);
            }
            SettingItem::DyslexiaFont => self
                .accessibility
                .set_dyslexia_friendly(!a11y.dyslexia_friendly),
            SettingItem::HighContrast => self.accessibility.set_high_contrast(!a11y.high_contrast),
            SettingItem::FollowSystemContrast => {
                if a11y.follow_system_contrast {
                    self.accessibility.set_high_contrast(a11y.high_contrast);
                } else {
                    self.accessibility.reset_high_contrast_to_system();
                }
            }
            SettingItem::Haptics => self
                .accessibility
                .set_haptics_enabled(!a11y.haptics_enabled),
            SettingItem::ReducedMotion => {
                self.options.reduced_motion = !self.options.reduced_motion;
            }
        }
    }

    pub(crate) fn snapshot(&self) -> FrameSnapshot<'_> {
        let state = self.conversation.state();
        FrameSnapshot {
            scene: self.scene,
            empathy_score: state.empathy_score,
            current_index: state.current_index,
            call_count: state.call_count,
            is_complete: state.is_complete,
            streak: self
                .achievements
                .shift_stats()
                .map(|s| s.current_streak)
                .unwrap_or(0),
            call: self.conversation.current_call(),
            last_selection: self.last_selection.as_ref(),
            achievements: self.achievements.state(),
            accessibility: self.accessibility.state(),
            ui: &self.ui,
            settings_cursor: self.settings_cursor,
            options: self.options,
            clock: self.clock,
        }
    }

    pub(crate) fn shutdown(&mut self) {
        self.accessibility.dispose();
    }
}
