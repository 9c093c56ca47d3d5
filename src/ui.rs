use crate::accessibility::AccessibilityState;
use crate::model::Call;
use std::collections::HashMap;

// Cells count as 8x16 px against the width breakpoints.
pub(crate) const CELL_PX_W: u32 = 8;
const COMPACT_MAX_PX: u32 = 480;
const MEDIUM_MAX_PX: u32 = 900;

const PANEL_GRACE_SECS: f32 = 6.0;
const TOUCH_EXTENSION_SECS: f32 = 4.0;
const TOUCH_WINDOW_SECS: f32 = 1.5;
const KEYBOARD_EXTENSION_SECS: f32 = 1.0;
const KEYBOARD_EXTENSION_CAP_SECS: f32 = 10.0;
const TOAST_SECS: f32 = 4.0;

const HOVER_RATE: f32 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Size {
    pub(crate) cols: u16,
    pub(crate) rows: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Point {
    pub(crate) col: u16,
    pub(crate) row: u16,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Rect {
    pub(crate) x: u16,
    pub(crate) y: u16,
    pub(crate) w: u16,
    pub(crate) h: u16,
}

impl Rect {
    pub(crate) fn contains(&self, p: Point) -> bool {
        p.col >= self.x
            && p.row >= self.y
            && (p.col as u32) < self.x as u32 + self.w as u32
            && (p.row as u32) < self.y as u32 + self.h as u32
    }

    pub(crate) fn bottom(&self) -> u16 {
        self.y.saturating_add(self.h)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Breakpoint {
    Compact,
    Medium,
    Desktop,
}

impl Breakpoint {
    pub(crate) fn for_cols(cols: u16) -> Self {
        let px = cols as u32 * CELL_PX_W;
        if px <= COMPACT_MAX_PX {
            Breakpoint::Compact
        } else if px <= MEDIUM_MAX_PX {
            Breakpoint::Medium
        } else {
            Breakpoint::Desktop
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PanelPlacement {
    Bottom,
    Side,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Spacing {
    margin_x: u16,
    desk_rows: u16,
    prompt_gap: u16,
    option_gap: u16,
    option_padding: u16,
    side_panel_cols: u16,
    bottom_panel_rows: u16,
}

impl Spacing {
    fn for_breakpoint(bp: Breakpoint) -> Self {
        match bp {
            Breakpoint::Compact => Spacing {
                margin_x: 1,
                desk_rows: 0,
                prompt_gap: 1,
                option_gap: 0,
                option_padding: 0,
                side_panel_cols: 0,
                bottom_panel_rows: 7,
            },
            Breakpoint::Medium => Spacing {
                margin_x: 2,
                desk_rows: 5,
                prompt_gap: 1,
                option_gap: 1,
                option_padding: 0,
                side_panel_cols: 30,
                bottom_panel_rows: 0,
            },
            Breakpoint::Desktop => Spacing {
                margin_x: 4,
                desk_rows: 7,
                prompt_gap: 2,
                option_gap: 1,
                option_padding: 1,
                side_panel_cols: 36,
                bottom_panel_rows: 0,
            },
        }
    }

    fn adjusted(mut self, a11y: &AccessibilityState) -> Self {
        let extra = ((a11y.font_scale - 1.0) * 2.0).round().max(0.0) as u16;
        self.option_padding += extra;
        self.prompt_gap += extra.min(1);
        if a11y.dyslexia_friendly {
            self.option_gap += 1;
        }
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct OptionSlot {
    pub(crate) key: String,
    pub(crate) rect: Rect,
    pub(crate) lines: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Layout {
    pub(crate) size: Size,
    pub(crate) breakpoint: Breakpoint,
    pub(crate) placement: PanelPlacement,
    pub(crate) content: Rect,
    pub(crate) desk: Rect,
    pub(crate) prompt: Rect,
    pub(crate) prompt_lines: Vec<String>,
    pub(crate) options: Vec<OptionSlot>,
    pub(crate) panel: Option<Rect>,
    pub(crate) stub: Option<Rect>,
    pub(crate) stub_focusable: bool,
}

impl Layout {
    fn empty() -> Self {
        Self {
            size: Size { cols: 0, rows: 0 },
            breakpoint: Breakpoint::Compact,
            placement: PanelPlacement::Bottom,
            content: Rect::default(),
            desk: Rect::default(),
            prompt: Rect::default(),
            prompt_lines: Vec::new(),
            options: Vec::new(),
            panel: None,
            stub: None,
            stub_focusable: false,
        }
    }

    pub(crate) fn compute(
        size: Size,
        call: Option<&Call>,
        a11y: &AccessibilityState,
        panel_visible: bool,
    ) -> Self {
        let breakpoint = Breakpoint::for_cols(size.cols);
        let placement = match breakpoint {
            Breakpoint::Compact => PanelPlacement::Bottom,
            _ => PanelPlacement::Side,
        };
        let sp = Spacing::for_breakpoint(breakpoint).adjusted(a11y);

        let side_cols = if placement == PanelPlacement::Side && panel_visible {
            sp.side_panel_cols.min(size.cols / 2)
        } else {
            0
        };
        let content_w = size
            .cols
            .saturating_sub(sp.margin_x * 2)
            .saturating_sub(side_cols);
        let content = Rect {
            x: sp.margin_x,
            y: 1,
            w: content_w,
            h: size.rows.saturating_sub(2),
        };

        let desk = Rect {
            x: content.x,
            y: content.y,
            w: content.w,
            h: sp.desk_rows.min(content.h),
        };

        let prompt_lines = call
            .map(|c| compose_prompt_lines(c, content.w as usize))
            .unwrap_or_default();
        let prompt = Rect {
            x: content.x,
            y: desk.bottom() + u16::from(desk.h > 0),
            w: content.w,
            h: prompt_lines.len() as u16,
        };

        let text_w = (content.w as usize).saturating_sub(4).max(1);
        let mut y = prompt.bottom() + sp.prompt_gap;
        let mut options = Vec::new();
        if let Some(call) = call {
            for opt in &call.options {
                let lines = wrap(&opt.text, text_w);
                let h = lines.len() as u16 + sp.option_padding;
                options.push(OptionSlot {
                    key: opt.id.clone(),
                    rect: Rect {
                        x: content.x,
                        y,
                        w: content.w,
                        h,
                    },
                    lines,
                });
                y = y.saturating_add(h + sp.option_gap);
            }
        }

        let footer_row = size.rows.saturating_sub(1);
        let (panel, stub) = match placement {
            PanelPlacement::Bottom => {
                let h = sp.bottom_panel_rows.min(footer_row);
                if panel_visible {
                    let panel = Rect {
                        x: 0,
                        y: footer_row.saturating_sub(h),
                        w: size.cols,
                        h,
                    };
                    (Some(panel), None)
                } else {
                    let stub = Rect {
                        x: sp.margin_x,
                        y: footer_row.saturating_sub(1),
                        w: 22u16.min(size.cols.saturating_sub(sp.margin_x)),
                        h: 1,
                    };
                    (None, Some(stub))
                }
            }
            PanelPlacement::Side => {
                if panel_visible {
                    let panel = Rect {
                        x: size.cols.saturating_sub(side_cols),
                        y: 1,
                        w: side_cols,
                        h: size.rows.saturating_sub(2),
                    };
                    (Some(panel), None)
                } else {
                    let w = 20u16.min(size.cols);
                    let stub = Rect {
                        x: size.cols.saturating_sub(w),
                        y: 1,
                        w,
                        h: 1,
                    };
                    (None, Some(stub))
                }
            }
        };

        Self {
            size,
            breakpoint,
            placement,
            content,
            desk,
            prompt,
            prompt_lines,
            options,
            panel,
            stub,
            stub_focusable: placement == PanelPlacement::Bottom && !panel_visible,
        }
    }

    pub(crate) fn panel_toggle(&self) -> Option<Rect> {
        self.stub.or_else(|| {
            self.panel.map(|p| Rect {
                x: p.x,
                y: p.y,
                w: p.w,
                h: 1u16.min(p.h),
            })
        })
    }
}

fn compose_prompt_lines(call: &Call, width: usize) -> Vec<String> {
    let mut lines = vec![format!("{} ({})", call.persona.name, call.persona.mood)];
    if let Some(t) = &call.twist {
        lines.extend(wrap(&format!("» {}", t.prompt_modifier), width));
    }
    lines.extend(wrap(&call.prompt, width));
    lines
}

pub(crate) fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0usize;
    for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();
        while chars.len() > width {
            if line_len > 0 {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
            }
            let rest = chars.split_off(width);
            lines.push(chars.into_iter().collect());
            chars = rest;
        }
        let wlen = chars.len();
        if wlen == 0 {
            continue;
        }
        if line_len > 0 && line_len + 1 + wlen > width {
            lines.push(std::mem::take(&mut line));
            line_len = 0;
        }
        if line_len > 0 {
            line.push(' ');
            line_len += 1;
        }
        line.extend(chars);
        line_len += wlen;
    }
    if line_len > 0 || lines.is_empty() {
        lines.push(line);
    }
    lines
}

/* -----------------------------
   Animated scalars
------------------------------ */

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Pulse {
    EmpathyGain,
    CallTransition,
    AchievementUnlock,
}

impl Pulse {
    const ALL: [Pulse; 3] = [
        Pulse::EmpathyGain,
        Pulse::CallTransition,
        Pulse::AchievementUnlock,
    ];

    fn slot(self) -> usize {
        match self {
            Pulse::EmpathyGain => 0,
            Pulse::CallTransition => 1,
            Pulse::AchievementUnlock => 2,
        }
    }

    fn duration_secs(self) -> f32 {
        match self {
            Pulse::EmpathyGain => 0.6,
            Pulse::CallTransition => 0.4,
            Pulse::AchievementUnlock => 1.2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FocusTarget {
    Option(usize),
    AchievementsStub,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Toast {
    pub(crate) achievement_id: &'static str,
    pub(crate) remaining: f32,
}

#[derive(Clone, Debug)]
struct PanelState {
    placement: Option<PanelPlacement>,
    visible: bool,
    timer: f32,
    touch_timer: f32,
    side_visible: bool,
}

impl PanelState {
    fn new() -> Self {
        Self {
            placement: None,
            visible: true,
            timer: PANEL_GRACE_SECS,
            touch_timer: 0.0,
            side_visible: true,
        }
    }

    fn is_visible(&self, placement: PanelPlacement) -> bool {
        match placement {
            PanelPlacement::Bottom => self.visible,
            PanelPlacement::Side => self.side_visible,
        }
    }

    fn enter(&mut self, placement: PanelPlacement) {
        if self.placement != Some(placement) {
            self.placement = Some(placement);
            if placement == PanelPlacement::Bottom {
                self.visible = true;
                self.timer = PANEL_GRACE_SECS;
                self.touch_timer = 0.0;
            }
        }
    }

    fn reveal(&mut self) {
        self.visible = true;
        self.timer = self.timer.max(PANEL_GRACE_SECS);
    }

    fn note_touch(&mut self) {
        self.touch_timer = TOUCH_WINDOW_SECS;
        if self.visible {
            self.timer = self.timer.max(TOUCH_EXTENSION_SECS);
        }
    }

    fn note_keyboard(&mut self) {
        if self.visible && self.timer < KEYBOARD_EXTENSION_CAP_SECS {
            self.timer = (self.timer + KEYBOARD_EXTENSION_SECS).min(KEYBOARD_EXTENSION_CAP_SECS);
        }
    }

    fn toggle(&mut self) {
        match self.placement {
            Some(PanelPlacement::Side) => self.side_visible = !self.side_visible,
            _ => {
                self.visible = !self.visible;
                if self.visible {
                    self.timer = PANEL_GRACE_SECS;
                } else {
                    self.timer = 0.0;
                    self.touch_timer = 0.0;
                }
            }
        }
    }

    fn tick(&mut self, dt: f32) {
        self.touch_timer = (self.touch_timer - dt).max(0.0);
        if self.placement != Some(PanelPlacement::Bottom) || !self.visible {
            return;
        }
        self.timer = (self.timer - dt).max(0.0);
        if self.timer <= 0.0 && self.touch_timer <= 0.0 {
            self.visible = false;
        }
    }
}

pub(crate) struct UiState {
    layout: Layout,
    pointer: Option<Point>,
    hover: HashMap<String, f32>,
    pulses: [f32; 3],
    focus_index: usize,
    focus_call_id: Option<String>,
    panel: PanelState,
    toasts: Vec<Toast>,
}

impl UiState {
    pub(crate) fn new() -> Self {
        Self {
            layout: Layout::empty(),
            pointer: None,
            hover: HashMap::new(),
            pulses: [0.0; 3],
            focus_index: 0,
            focus_call_id: None,
            panel: PanelState::new(),
            toasts: Vec::new(),
        }
    }

    pub(crate) fn layout(&self) -> &Layout {
        &self.layout
    }

    pub(crate) fn relayout(&mut self, size: Size, call: Option<&Call>, a11y: &AccessibilityState) {
        let placement = match Breakpoint::for_cols(size.cols) {
            Breakpoint::Compact => PanelPlacement::Bottom,
            _ => PanelPlacement::Side,
        };
        self.panel.enter(placement);
        let visible = self.panel.is_visible(placement);
        self.layout = Layout::compute(size, call, a11y, visible);
        self.sync_focus(call.map(|c| c.id.as_str()));
    }

    fn focus_stops(&self) -> usize {
        self.layout.options.len() + usize::from(self.layout.stub_focusable)
    }

    fn sync_focus(&mut self, call_id: Option<&str>) {
        if self.focus_call_id.as_deref() != call_id {
            self.focus_call_id = call_id.map(str::to_string);
            self.focus_index = 0;
        }
        let stops = self.focus_stops();
        if stops == 0 {
            self.focus_index = 0;
        } else if self.focus_index >= stops {
            self.focus_index = stops - 1;
        }
    }

    pub(crate) fn focus_index(&self) -> usize {
        self.focus_index
    }

    pub(crate) fn focused(&self) -> Option<FocusTarget> {
        let options = self.layout.options.len();
        if self.focus_index < options {
            Some(FocusTarget::Option(self.focus_index))
        } else if self.layout.stub_focusable && self.focus_index == options {
            Some(FocusTarget::AchievementsStub)
        } else {
            None
        }
    }

    pub(crate) fn move_focus(&mut self, delta: i32) {
        let stops = self.focus_stops() as i32;
        if stops == 0 {
            return;
        }
        let next = (self.focus_index as i32 + delta).rem_euclid(stops);
        self.focus_index = next as usize;
        self.panel.note_keyboard();
    }

    pub(crate) fn set_focus(&mut self, index: usize) {
        if index < self.focus_stops() {
            self.focus_index = index;
            self.panel.note_keyboard();
        }
    }

    // -1 on a miss. A hit opens the touch window that keeps the panel up.
    pub(crate) fn option_index_at_point(&mut self, point: Point) -> i32 {
        if self.layout.panel.is_some_and(|p| {
            self.layout.placement == PanelPlacement::Bottom && p.contains(point)
        }) {
            return -1;
        }
        match self
            .layout
            .options
            .iter()
            .position(|slot| slot.rect.contains(point))
        {
            Some(i) => {
                self.panel.note_touch();
                i as i32
            }
            None => -1,
        }
    }

    pub(crate) fn achievements_toggle_at_point(&self, point: Point) -> bool {
        self.layout.panel_toggle().is_some_and(|r| r.contains(point))
    }

    pub(crate) fn note_pointer(&mut self, point: Point) {
        self.pointer = Some(point);
    }

    pub(crate) fn note_touch(&mut self) {
        self.panel.note_touch();
    }

    pub(crate) fn toggle_achievements(&mut self) {
        self.panel.toggle();
    }

    pub(crate) fn achievements_visible(&self) -> bool {
        self.layout.panel.is_some()
    }

    pub(crate) fn hovered_key(&self) -> Option<&str> {
        let p = self.pointer?;
        self.layout
            .options
            .iter()
            .find(|slot| slot.rect.contains(p))
            .map(|slot| slot.key.as_str())
    }

    pub(crate) fn hover(&self, key: &str) -> f32 {
        self.hover.get(key).copied().unwrap_or(0.0)
    }

    pub(crate) fn trigger(&mut self, pulse: Pulse, reduced_motion: bool) {
        self.pulses[pulse.slot()] = if reduced_motion { 0.0 } else { 1.0 };
    }

    pub(crate) fn pulse(&self, pulse: Pulse) -> f32 {
        self.pulses[pulse.slot()]
    }

    pub(crate) fn show_unlocks(&mut self, ids: &[&'static str], reduced_motion: bool) {
        if ids.is_empty() {
            return;
        }
        for id in ids {
            self.toasts.push(Toast {
                achievement_id: *id,
                remaining: TOAST_SECS,
            });
        }
        self.trigger(Pulse::AchievementUnlock, reduced_motion);
        self.panel.reveal();
    }

    pub(crate) fn toasts(&self) -> &[Toast] {
        &self.toasts
    }

    pub(crate) fn tick(&mut self, dt: f32, reduced_motion: bool) {
        let dt = dt.max(0.0);

        let hovered = self.hovered_key().map(str::to_string);
        if let Some(key) = &hovered {
            self.hover.entry(key.clone()).or_insert(0.0);
        }
        for (key, value) in self.hover.iter_mut() {
            let target = if hovered.as_deref() == Some(key.as_str()) { 1.0 } else { 0.0 };
            *value = if reduced_motion {
                target
            } else if target > *value {
                (*value + HOVER_RATE * dt).min(target)
            } else {
                (*value - HOVER_RATE * dt).max(target)
            };
        }
        self.hover
            .retain(|key, value| *value > 0.0 || hovered.as_deref() == Some(key.as_str()));

        for pulse in Pulse::ALL {
            let slot = &mut self.pulses[pulse.slot()];
            *slot = if reduced_motion {
                0.0
            } else {
                (*slot - dt / pulse.duration_secs()).clamp(0.0, 1.0)
            };
        }

        for toast in self.toasts.iter_mut() {
            toast.remaining -= dt;
        }
        self.toasts.retain(|t| t.remaining > 0.0);

        self.panel.tick(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentBundle;
    use crate::deck::generate_call_deck;

    fn calls() -> Vec<Call> {
        let bundle = ContentBundle::builtin().expect("builtin content");
        generate_call_deck(&bundle, None)
    }

    fn a11y() -> AccessibilityState {
        AccessibilityState::default()
    }

    const COMPACT: Size = Size { cols: 50, rows: 40 };
    const MEDIUM: Size = Size { cols: 100, rows: 40 };
    const DESKTOP: Size = Size { cols: 160, rows: 50 };

    #[test]
    fn breakpoints_follow_pixel_widths() {
        assert_eq!(Breakpoint::for_cols(60), Breakpoint::Compact);
        assert_eq!(Breakpoint::for_cols(61), Breakpoint::Medium);
        assert_eq!(Breakpoint::for_cols(112), Breakpoint::Medium);
        assert_eq!(Breakpoint::for_cols(113), Breakpoint::Desktop);
    }

    #[test]
    fn wrap_respects_width_and_splits_long_words() {
        assert_eq!(wrap("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("", 5), vec![""]);
        assert!(wrap("Reset display scaling to the recommended value", 12)
            .iter()
            .all(|l| l.chars().count() <= 12));
    }

    #[test]
    fn hit_testing_uses_the_current_layout() {
        let deck = calls();
        let mut ui = UiState::new();
        for size in [COMPACT, MEDIUM, DESKTOP] {
            ui.relayout(size, deck.first(), &a11y());
            let slots = ui.layout().options.clone();
            assert_eq!(slots.len(), deck[0].options.len());
            for (i, slot) in slots.iter().enumerate() {
                let inside = Point {
                    col: slot.rect.x + 1,
                    row: slot.rect.y,
                };
                assert_eq!(ui.option_index_at_point(inside), i as i32, "{size:?}");
            }
            let above = Point {
                col: slots[0].rect.x,
                row: slots[0].rect.y - 1,
            };
            assert_eq!(ui.option_index_at_point(above), -1);
        }
    }

    #[test]
    fn resize_replaces_geometry() {
        let deck = calls();
        let mut ui = UiState::new();
        ui.relayout(DESKTOP, deck.first(), &a11y());
        let wide = ui.layout().clone();
        ui.relayout(COMPACT, deck.first(), &a11y());
        let narrow = ui.layout().clone();
        ui.relayout(COMPACT, deck.first(), &a11y());

        assert_ne!(wide.options[0].rect, narrow.options[0].rect);
        assert_eq!(narrow.size, COMPACT);
        assert_eq!(ui.layout(), &narrow, "same inputs, same layout");
        assert_eq!(narrow.placement, PanelPlacement::Bottom);
        assert_eq!(wide.placement, PanelPlacement::Side);
    }

    #[test]
    fn larger_text_spreads_options_apart() {
        let deck = calls();
        let small = Layout::compute(MEDIUM, deck.first(), &a11y(), true);
        let big = Layout::compute(
            MEDIUM,
            deck.first(),
            &AccessibilityState {
                font_scale: 1.75,
                dyslexia_friendly: true,
                ..a11y()
            },
            true,
        );
        let gap = |l: &Layout| l.options[1].rect.y - l.options[0].rect.bottom();
        assert!(big.options[0].rect.h > small.options[0].rect.h);
        assert!(gap(&big) > gap(&small));
    }

    #[test]
    fn focus_resets_on_new_call_and_clamps_on_shrink() {
        let deck = calls();
        let mut ui = UiState::new();
        ui.relayout(MEDIUM, deck.first(), &a11y());
        ui.move_focus(2);
        assert_eq!(ui.focus_index(), 2);

        let mut shrunk = deck[0].clone();
        shrunk.options.truncate(2);
        ui.relayout(MEDIUM, Some(&shrunk), &a11y());
        assert_eq!(ui.focus_index(), 1, "clamped to the last option");

        ui.relayout(MEDIUM, deck.get(1), &a11y());
        assert_eq!(ui.focus_index(), 0, "new call starts at the top");

        ui.move_focus(-1);
        assert_eq!(ui.focus_index(), deck[1].options.len() - 1, "wraps around");
    }

    #[test]
    fn hidden_bottom_panel_adds_a_focus_stop() {
        let deck = calls();
        let mut ui = UiState::new();
        ui.relayout(COMPACT, deck.first(), &a11y());
        assert!(ui.achievements_visible());
        let options = deck[0].options.len();

        ui.tick(PANEL_GRACE_SECS + 0.1, false);
        ui.relayout(COMPACT, deck.first(), &a11y());
        assert!(!ui.achievements_visible());
        ui.set_focus(options);
        assert_eq!(ui.focused(), Some(FocusTarget::AchievementsStub));

        ui.toggle_achievements();
        ui.relayout(COMPACT, deck.first(), &a11y());
        assert!(ui.achievements_visible());
        assert_eq!(ui.focus_index(), options - 1, "stub stop disappears");
    }

    #[test]
    fn bottom_panel_stays_while_touched_then_hides() {
        let deck = calls();
        let mut ui = UiState::new();
        ui.relayout(COMPACT, deck.first(), &a11y());

        ui.tick(PANEL_GRACE_SECS - 1.0, false);
        let slot = ui.layout().options[0].rect;
        let hit = ui.option_index_at_point(Point {
            col: slot.x,
            row: slot.y,
        });
        assert_eq!(hit, 0);

        ui.tick(2.0, false);
        ui.relayout(COMPACT, deck.first(), &a11y());
        assert!(ui.achievements_visible(), "touch extended the timer");

        ui.tick(TOUCH_EXTENSION_SECS, false);
        ui.relayout(COMPACT, deck.first(), &a11y());
        assert!(!ui.achievements_visible());
    }

    #[test]
    fn keyboard_extension_is_capped() {
        let deck = calls();
        let mut ui = UiState::new();
        ui.relayout(COMPACT, deck.first(), &a11y());
        for _ in 0..50 {
            ui.move_focus(1);
        }
        ui.tick(KEYBOARD_EXTENSION_CAP_SECS - 0.5, false);
        ui.relayout(COMPACT, deck.first(), &a11y());
        assert!(ui.achievements_visible());
        ui.tick(1.0, false);
        ui.relayout(COMPACT, deck.first(), &a11y());
        assert!(!ui.achievements_visible());
    }

    #[test]
    fn side_panel_never_auto_hides() {
        let deck = calls();
        let mut ui = UiState::new();
        ui.relayout(DESKTOP, deck.first(), &a11y());
        ui.tick(60.0, false);
        ui.relayout(DESKTOP, deck.first(), &a11y());
        assert!(ui.achievements_visible());

        ui.toggle_achievements();
        ui.relayout(DESKTOP, deck.first(), &a11y());
        assert!(!ui.achievements_visible());
        assert!(!ui.layout().stub_focusable);
    }

    #[test]
    fn pulses_decay_and_freeze_under_reduced_motion() {
        let mut ui = UiState::new();
        ui.trigger(Pulse::EmpathyGain, false);
        assert_eq!(ui.pulse(Pulse::EmpathyGain), 1.0);
        ui.tick(0.3, false);
        let mid = ui.pulse(Pulse::EmpathyGain);
        assert!(mid > 0.0 && mid < 1.0);
        ui.tick(1.0, false);
        assert_eq!(ui.pulse(Pulse::EmpathyGain), 0.0);

        ui.trigger(Pulse::CallTransition, true);
        assert_eq!(ui.pulse(Pulse::CallTransition), 0.0);
    }

    #[test]
    fn hover_eases_in_or_snaps() {
        let deck = calls();
        let mut ui = UiState::new();
        ui.relayout(MEDIUM, deck.first(), &a11y());
        let slot = ui.layout().options[1].clone();
        ui.note_pointer(Point {
            col: slot.rect.x,
            row: slot.rect.y,
        });

        ui.tick(0.05, false);
        let eased = ui.hover(&slot.key);
        assert!(eased > 0.0 && eased < 1.0);

        ui.tick(0.0, true);
        assert_eq!(ui.hover(&slot.key), 1.0);

        ui.note_pointer(Point { col: 0, row: 0 });
        ui.tick(0.0, true);
        assert_eq!(ui.hover(&slot.key), 0.0);
    }

    #[test]
    fn unlock_toasts_expire() {
        let mut ui = UiState::new();
        ui.show_unlocks(&["first-shift", "hot-streak"], false);
        assert_eq!(ui.toasts().len(), 2);
        assert_eq!(ui.pulse(Pulse::AchievementUnlock), 1.0);
        ui.tick(TOAST_SECS + 0.01, false);
        assert!(ui.toasts().is_empty());
    }
}
