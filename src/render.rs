use crate::accessibility::AccessibilityState;
use crate::achievements::{definition, AchievementsView};
use crate::game::{FrameSnapshot, SettingItem, SETTING_ITEMS};
use crate::model::Scene;
use crate::ui::{wrap, FocusTarget, PanelPlacement, Pulse, Rect};
use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{
        Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
    },
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
    pub(crate) bold: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
            bold: false,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
    pub(crate) fn clear(&mut self, fg: Color, bg: Color) {
        for c in &mut self.cells {
            *c = Cell {
                ch: ' ',
                fg,
                bg,
                bold: false,
            };
        }
    }
    fn fill(&mut self, r: Rect, bg: Color) {
        for y in r.y..r.bottom().min(self.h) {
            for x in r.x..r.x.saturating_add(r.w).min(self.w) {
                let i = self.idx(x, y);
                self.cells[i].ch = ' ';
                self.cells[i].bg = bg;
            }
        }
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            DisableMouseCapture,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        Ok(true)
    }

    pub(crate) fn present(&mut self, diff_only: bool) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;
        let mut last_bold = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if diff_only && c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_bold != Some(c.bold) {
                    let attr = if c.bold {
                        Attribute::Bold
                    } else {
                        Attribute::NormalIntensity
                    };
                    queue!(self.out, SetAttribute(attr))?;
                    last_bold = Some(c.bold);
                    // NormalIntensity can reset colors on some terminals
                    last_fg = None;
                    last_bg = None;
                }
                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(
            self.out,
            SetAttribute(Attribute::Reset),
            ResetColor,
            EndSynchronizedUpdate
        )?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

/* -----------------------------
   Palettes
------------------------------ */

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Palette {
    pub(crate) bg: Color,
    pub(crate) fg: Color,
    pub(crate) dim: Color,
    pub(crate) accent: Color,
    pub(crate) good: Color,
    pub(crate) bad: Color,
    pub(crate) focus_fg: Color,
    pub(crate) focus_bg: Color,
    pub(crate) hover_bg: Color,
    pub(crate) panel_bg: Color,
}

impl Palette {
    pub(crate) fn pick(a11y: &AccessibilityState, enable_color: bool) -> Self {
        if !enable_color {
            Self::mono()
        } else if a11y.high_contrast {
            Self::high_contrast()
        } else {
            Self::normal()
        }
    }

    fn normal() -> Self {
        Self {
            bg: Color::Rgb { r: 18, g: 20, b: 32 },
            fg: Color::Rgb { r: 222, g: 226, b: 240 },
            dim: Color::Rgb { r: 130, g: 136, b: 160 },
            accent: Color::Rgb { r: 120, g: 200, b: 255 },
            good: Color::Rgb { r: 130, g: 230, b: 160 },
            bad: Color::Rgb { r: 255, g: 140, b: 140 },
            focus_fg: Color::Rgb { r: 18, g: 20, b: 32 },
            focus_bg: Color::Rgb { r: 120, g: 200, b: 255 },
            hover_bg: Color::Rgb { r: 44, g: 50, b: 76 },
            panel_bg: Color::Rgb { r: 28, g: 31, b: 48 },
        }
    }

    fn high_contrast() -> Self {
        Self {
            bg: Color::Black,
            fg: Color::White,
            dim: Color::White,
            accent: Color::Yellow,
            good: Color::Green,
            bad: Color::Red,
            focus_fg: Color::Black,
            focus_bg: Color::Yellow,
            hover_bg: Color::DarkGrey,
            panel_bg: Color::Black,
        }
    }

    fn mono() -> Self {
        Self {
            bg: Color::Black,
            fg: Color::White,
            dim: Color::White,
            accent: Color::White,
            good: Color::White,
            bad: Color::White,
            focus_fg: Color::Black,
            focus_bg: Color::White,
            hover_bg: Color::Black,
            panel_bg: Color::Black,
        }
    }
}

/* -----------------------------
   Text helpers
------------------------------ */

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    put(buf, x, y, s, u16::MAX, fg, bg, false);
}

fn put(buf: &mut CellBuffer, x: u16, y: u16, s: &str, max_w: u16, fg: Color, bg: Color, bold: bool) {
    for (i, ch) in s.chars().take(max_w as usize).enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(xx, y, Cell { ch, fg, bg, bold });
    }
}

fn bar(value01: f32, width: usize) -> String {
    let v = value01.clamp(0.0, 1.0);
    let fill = (v * width as f32 + 0.5) as usize;
    let mut s = String::new();
    s.push('[');
    for i in 0..width {
        s.push(if i < fill { '█' } else { '·' });
    }
    s.push(']');
    s
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

/* -----------------------------
   Frame
------------------------------ */

pub(crate) fn draw_frame(buf: &mut CellBuffer, snap: &FrameSnapshot<'_>, pal: &Palette) {
    buf.clear(pal.fg, pal.bg);

    draw_header(buf, snap, pal);
    draw_desk(buf, snap, pal);
    if snap.is_complete {
        draw_summary(buf, snap, pal);
    } else {
        draw_call(buf, snap, pal);
    }
    draw_achievements(buf, snap, pal);
    draw_toasts(buf, snap, pal);
    draw_footer(buf, snap.scene, snap.is_complete, pal);

    match snap.scene {
        Scene::Desk => {}
        Scene::Settings => draw_settings(buf, snap, pal),
        Scene::Help => draw_help(buf, pal),
    }
}

fn draw_header(buf: &mut CellBuffer, snap: &FrameSnapshot<'_>, pal: &Palette) {
    let shown = if snap.is_complete {
        snap.call_count
    } else {
        (snap.current_index + 1).min(snap.call_count)
    };
    let title = "Tiny Helpdesk Hero";
    put(buf, 1, 0, title, buf.w, pal.accent, pal.bg, true);

    let calls = format!("Call {shown}/{}", snap.call_count);
    let x = title.chars().count() as u16 + 4;
    put(buf, x, 0, &calls, buf.w, pal.fg, pal.bg, false);

    let glow = snap.ui.pulse(Pulse::EmpathyGain) > 0.0;
    let empathy = format!("Empathy {}", snap.empathy_score);
    let ex = x + calls.chars().count() as u16 + 3;
    let fg = if glow { pal.good } else { pal.fg };
    put(buf, ex, 0, &empathy, buf.w, fg, pal.bg, glow);

    if snap.streak >= 2 && !snap.is_complete {
        let streak = format!("Streak {}", snap.streak);
        let sx = ex + empathy.chars().count() as u16 + 3;
        put(buf, sx, 0, &streak, buf.w, pal.accent, pal.bg, false);
    }
}

const DESK_ART: [&str; 7] = [
    "   .------------------.   ",
    "   |  HELPDESK  #42   |   ",
    "   |  > _             |   ",
    "   '-------.  .-------'   ",
    "  _________|__|_________  ",
    " /______________________\\ ",
    "   ||                 ||  ",
];
const CURSOR_ROW: usize = 2;

fn draw_desk(buf: &mut CellBuffer, snap: &FrameSnapshot<'_>, pal: &Palette) {
    let desk = snap.ui.layout().desk;
    if desk.h == 0 {
        return;
    }
    let art_w = DESK_ART[0].chars().count() as u16;
    let x0 = desk.x + desk.w.saturating_sub(art_w) / 2;
    let blink_off = !snap.options.low_power && (snap.clock * 2.0) as u32 % 2 == 1;

    for (row, line) in DESK_ART.iter().take(desk.h as usize).enumerate() {
        let text = if row == CURSOR_ROW && blink_off {
            line.replacen('_', " ", 1)
        } else {
            (*line).to_string()
        };
        put(buf, x0, desk.y + row as u16, &text, desk.w, pal.dim, pal.bg, false);
    }

    let ringing = snap.ui.pulse(Pulse::CallTransition) > 0.0;
    let phone = if ringing { "☎ ring ring" } else { "☎" };
    let px = x0 + art_w + 1;
    if px < desk.x + desk.w {
        let fg = if ringing { pal.accent } else { pal.dim };
        put(buf, px, desk.y + 4u16.min(desk.h - 1), phone, desk.x + desk.w - px, fg, pal.bg, ringing);
    }
}

fn draw_call(buf: &mut CellBuffer, snap: &FrameSnapshot<'_>, pal: &Palette) {
    let layout = snap.ui.layout();
    let prompt = layout.prompt;
    for (i, line) in layout.prompt_lines.iter().enumerate() {
        let (fg, bold) = if i == 0 {
            (pal.accent, true)
        } else if line.starts_with('»') {
            (pal.dim, false)
        } else {
            (pal.fg, false)
        };
        put(buf, prompt.x, prompt.y + i as u16, line, prompt.w, fg, pal.bg, bold);
    }

    let focused = snap.ui.focused();
    let hovered = snap.ui.hovered_key();
    for (i, slot) in layout.options.iter().enumerate() {
        let is_focused = focused == Some(FocusTarget::Option(i));
        let hover = snap.ui.hover(&slot.key);
        let (fg, bg) = if is_focused {
            (pal.focus_fg, pal.focus_bg)
        } else if hover > 0.5 || (hover > 0.0 && hovered == Some(slot.key.as_str())) {
            (pal.fg, pal.hover_bg)
        } else {
            (pal.fg, pal.bg)
        };
        buf.fill(slot.rect, bg);
        let marker = if is_focused { '›' } else { ' ' };
        for (row, line) in slot.lines.iter().enumerate() {
            let label = if row == 0 {
                format!("{marker}{}. {line}", i + 1)
            } else {
                format!("    {line}")
            };
            put(buf, slot.rect.x, slot.rect.y + row as u16, &label, slot.rect.w, fg, bg, is_focused);
        }
    }

    if let Some(last) = snap.last_selection {
        let below = layout
            .options
            .last()
            .map(|s| s.rect.bottom() + 1)
            .unwrap_or(prompt.bottom() + 1);
        let Some(prev) = last.call.as_ref() else {
            return;
        };
        let (text, fg) = if last.correct {
            (&prev.empathy_win, pal.good)
        } else {
            (&prev.empathy_fail, pal.bad)
        };
        for (row, line) in wrap(text, prompt.w as usize).iter().take(2).enumerate() {
            put(buf, prompt.x, below + row as u16, line, prompt.w, fg, pal.bg, false);
        }
    }
}

fn draw_summary(buf: &mut CellBuffer, snap: &FrameSnapshot<'_>, pal: &Palette) {
    let layout = snap.ui.layout();
    let area = layout.content;
    let mut y = layout.prompt.y;

    put(buf, area.x, y, "Shift complete", area.w, pal.accent, pal.bg, true);
    y += 2;

    let ratio = if snap.call_count == 0 {
        0.0
    } else {
        snap.empathy_score as f32 / snap.call_count as f32
    };
    let score = format!(
        "Empathy {} / {}  {}",
        snap.empathy_score,
        snap.call_count,
        bar(ratio, 12)
    );
    put(buf, area.x, y, &score, area.w, pal.fg, pal.bg, false);
    y += 1;

    if let Some(prev) = snap.last_selection.and_then(|s| s.call.as_ref().map(|c| (s.correct, c))) {
        let (text, fg) = if prev.0 {
            (&prev.1.empathy_win, pal.good)
        } else {
            (&prev.1.empathy_fail, pal.bad)
        };
        for line in wrap(text, area.w as usize).iter().take(2) {
            y += 1;
            put(buf, area.x, y, line, area.w, fg, pal.bg, false);
        }
        y += 1;
    }

    let recent = &snap.achievements.recent_unlocks;
    if !recent.is_empty() {
        y += 1;
        put(buf, area.x, y, "New this shift:", area.w, pal.accent, pal.bg, false);
        for id in recent {
            if let Some(def) = definition(id) {
                y += 1;
                let line = format!("  ★ {}: {}", def.title, def.flavor);
                put(buf, area.x, y, &line, area.w, pal.fg, pal.bg, false);
            }
        }
    }

    y += 2;
    let again = if snap.call_count == 0 {
        "No calls on the board today."
    } else {
        "Press Enter, r or click to start another shift."
    };
    put(buf, area.x, y, again, area.w, pal.dim, pal.bg, false);
}

fn draw_achievements(buf: &mut CellBuffer, snap: &FrameSnapshot<'_>, pal: &Palette) {
    let layout = snap.ui.layout();
    let view = &snap.achievements;
    let header = format!("Achievements {}/{}", view.unlocked_count, view.total);

    if !snap.ui.achievements_visible() {
        let Some(stub) = layout.stub else {
            return;
        };
        let focused = snap.ui.focused() == Some(FocusTarget::AchievementsStub);
        let (fg, bg) = if focused {
            (pal.focus_fg, pal.focus_bg)
        } else {
            (pal.accent, pal.bg)
        };
        buf.fill(stub, bg);
        put(buf, stub.x, stub.y, &format!("▸ {header} (a)"), stub.w, fg, bg, focused);
        return;
    }

    let Some(panel) = layout.panel else {
        return;
    };
    buf.fill(panel, pal.panel_bg);
    let inner_x = panel.x + 1;
    let inner_w = panel.w.saturating_sub(2);
    let glow = snap.ui.pulse(Pulse::AchievementUnlock) > 0.0;
    let toggle = if layout.placement == PanelPlacement::Bottom {
        "▾"
    } else {
        "▸"
    };
    put(
        buf,
        inner_x,
        panel.y,
        &format!("{toggle} {header} (a)"),
        inner_w,
        pal.accent,
        pal.panel_bg,
        glow,
    );

    let mut y = panel.y + 1;
    let last_row = panel.bottom();
    for entry in &view.entries {
        if y >= last_row {
            break;
        }
        let (mark, fg) = if entry.unlocked {
            ("[x]", pal.good)
        } else {
            ("[ ]", pal.dim)
        };
        let line = format!("{mark} {}", entry.def.title);
        put(buf, inner_x, y, &line, inner_w, fg, pal.panel_bg, false);
        y += 1;
        if layout.placement == PanelPlacement::Side && y < last_row {
            put(buf, inner_x + 4, y, entry.def.description, inner_w.saturating_sub(4), pal.dim, pal.panel_bg, false);
            y += 1;
        }
    }

    if layout.placement == PanelPlacement::Side && y + 1 < last_row {
        draw_lifetime(buf, view, inner_x, y + 1, inner_w, pal);
    }
}

fn draw_lifetime(buf: &mut CellBuffer, view: &AchievementsView, x: u16, y: u16, w: u16, pal: &Palette) {
    let l = &view.lifetime;
    let line = format!(
        "Shifts {}  Best streak {}  Helped {}",
        l.total_shifts, l.best_streak_ever, l.total_correct
    );
    put(buf, x, y, &line, w, pal.dim, pal.panel_bg, false);
}

fn draw_toasts(buf: &mut CellBuffer, snap: &FrameSnapshot<'_>, pal: &Palette) {
    for (i, toast) in snap.ui.toasts().iter().enumerate() {
        let Some(def) = definition(toast.achievement_id) else {
            continue;
        };
        let text = format!(" ★ Unlocked: {} ", def.title);
        let w = text.chars().count() as u16;
        let x = buf.w.saturating_sub(w + 1);
        let y = 1 + i as u16;
        put(buf, x, y, &text, w, pal.focus_fg, pal.accent, true);
    }
}

fn draw_footer(buf: &mut CellBuffer, scene: Scene, complete: bool, pal: &Palette) {
    let help = match scene {
        Scene::Desk if complete => "enter/r new shift | a achievements | tab settings | h help | q quit",
        Scene::Desk => "↑↓ focus | enter answer | 1-3 pick | a achievements | tab settings | h help | q quit",
        Scene::Settings => "↑↓ select | ←→ adjust | enter toggle | esc back",
        Scene::Help => "esc back | h close | q quit",
    };
    draw_text(buf, 1, buf.h.saturating_sub(1), help, pal.dim, pal.bg);
}

fn overlay_box(buf: &mut CellBuffer, w: u16, h: u16, pal: &Palette) -> Rect {
    let w = w.min(buf.w.saturating_sub(2));
    let h = h.min(buf.h.saturating_sub(2));
    let r = Rect {
        x: (buf.w.saturating_sub(w)) / 2,
        y: (buf.h.saturating_sub(h)) / 2,
        w,
        h,
    };
    buf.fill(r, pal.panel_bg);
    r
}

/* -----------------------------
   Settings UI
------------------------------ */

fn setting_line(item: SettingItem, snap: &FrameSnapshot<'_>) -> String {
    let a = &snap.accessibility;
    match item {
        SettingItem::TextSize => format!("Text size: {:.2}x", a.font_scale),
        SettingItem::DyslexiaFont => format!("Dyslexia-friendly spacing: {}", on_off(a.dyslexia_friendly)),
        SettingItem::HighContrast => format!("High contrast: {}", on_off(a.high_contrast)),
        SettingItem::FollowSystemContrast => {
            format!("Follow system contrast: {}", on_off(a.follow_system_contrast))
        }
        SettingItem::Haptics => format!("Haptics: {}", on_off(a.haptics_enabled)),
        SettingItem::ReducedMotion => format!("Reduced motion: {}", on_off(snap.options.reduced_motion)),
    }
}

pub(crate) fn draw_settings(buf: &mut CellBuffer, snap: &FrameSnapshot<'_>, pal: &Palette) {
    let area = overlay_box(buf, 44, SETTING_ITEMS.len() as u16 + 4, pal);
    put(buf, area.x + 2, area.y + 1, "Settings", area.w, pal.accent, pal.panel_bg, true);

    for (i, item) in SETTING_ITEMS.iter().enumerate() {
        let selected = i == snap.settings_cursor;
        let line = format!(
            "{} {}",
            if selected { ">" } else { " " },
            setting_line(*item, snap)
        );
        let (fg, bg) = if selected {
            (pal.focus_fg, pal.focus_bg)
        } else {
            (pal.fg, pal.panel_bg)
        };
        put(
            buf,
            area.x + 1,
            area.y + 3 + i as u16,
            &line,
            area.w.saturating_sub(2),
            fg,
            bg,
            selected,
        );
    }
}

const HELP_LINES: [&str; 9] = [
    "Callers ring in one after another.",
    "Pick the reply that actually helps.",
    "Right answers raise your empathy score.",
    "",
    "↑↓ or j/k move focus, enter answers.",
    "1-3 answer directly, or click a reply.",
    "a shows or hides achievements.",
    "tab opens settings, r starts a new shift",
    "once the last call is done.",
];

fn draw_help(buf: &mut CellBuffer, pal: &Palette) {
    let area = overlay_box(buf, 46, HELP_LINES.len() as u16 + 4, pal);
    put(buf, area.x + 2, area.y + 1, "How to play", area.w, pal.accent, pal.panel_bg, true);
    for (i, line) in HELP_LINES.iter().enumerate() {
        put(
            buf,
            area.x + 2,
            area.y + 3 + i as u16,
            line,
            area.w.saturating_sub(4),
            pal.fg,
            pal.panel_bg,
            false,
        );
    }
}
