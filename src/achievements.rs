use crate::conversation::Selection;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct AchievementDef {
    pub(crate) id: &'static str,
    pub(crate) title: &'static str,
    pub(crate) description: &'static str,
    pub(crate) flavor: &'static str,
}

pub(crate) const FIRST_SHIFT: &str = "first-shift";
pub(crate) const PERFECT_SHIFT: &str = "perfect-shift";
pub(crate) const HOT_STREAK: &str = "hot-streak";
pub(crate) const META_MOMENT: &str = "meta-moment";
pub(crate) const COMEBACK_KID: &str = "comeback-kid";
pub(crate) const RESILIENT_REP: &str = "resilient-rep";

const META_TWIST_ID: &str = "meta-humor";
const HOT_STREAK_LENGTH: u32 = 3;
const RESILIENT_MISSES: u32 = 2;

pub(crate) const ACHIEVEMENTS: [AchievementDef; 6] = [
    AchievementDef {
        id: FIRST_SHIFT,
        title: "First Shift",
        description: "Finish your first helpdesk shift.",
        flavor: "The headset fits. Mostly.",
    },
    AchievementDef {
        id: PERFECT_SHIFT,
        title: "Perfect Shift",
        description: "Resolve every call in a shift without a single miss.",
        flavor: "Somewhere, a ticket queue weeps with joy.",
    },
    AchievementDef {
        id: HOT_STREAK,
        title: "Hot Streak",
        description: "Answer three calls in a row correctly.",
        flavor: "Your keyboard is smoking. Please don't touch it.",
    },
    AchievementDef {
        id: META_MOMENT,
        title: "Meta Moment",
        description: "Take a call that knows it is in a game.",
        flavor: "You are a tiny hero. Allegedly.",
    },
    AchievementDef {
        id: COMEBACK_KID,
        title: "Comeback Kid",
        description: "Stumble once and still resolve at least half of the shift.",
        flavor: "Turned it off and on again. Yourself.",
    },
    AchievementDef {
        id: RESILIENT_REP,
        title: "Resilient Rep",
        description: "Miss two calls in a row, then win someone back.",
        flavor: "Deep breath. Next caller.",
    },
];

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ShiftStats {
    pub(crate) call_count: usize,
    pub(crate) total_correct: u32,
    pub(crate) total_incorrect: u32,
    pub(crate) current_streak: u32,
    pub(crate) best_streak: u32,
    pub(crate) consecutive_misses: u32,
    pub(crate) max_consecutive_misses: u32,
    pub(crate) had_incorrect: bool,
    pub(crate) encountered_twists: BTreeSet<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LifetimeStats {
    pub(crate) total_shifts: u32,
    pub(crate) total_correct: u32,
    pub(crate) total_incorrect: u32,
    pub(crate) best_streak_ever: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UnlockRecord {
    pub(crate) unlocked_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AchievementEntry {
    #[serde(flatten)]
    pub(crate) def: AchievementDef,
    pub(crate) unlocked: bool,
    pub(crate) unlocked_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AchievementsView {
    pub(crate) total: usize,
    pub(crate) unlocked_count: usize,
    pub(crate) entries: Vec<AchievementEntry>,
    pub(crate) recent_unlocks: Vec<&'static str>,
    pub(crate) lifetime: LifetimeStats,
}

#[derive(Default)]
pub(crate) struct AchievementEngine {
    shift: Option<ShiftStats>,
    lifetime: LifetimeStats,
    unlocked: BTreeMap<&'static str, UnlockRecord>,
    recent_unlocks: Vec<&'static str>,
}

impl AchievementEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn start_shift(&mut self, call_count: usize) {
        self.shift = Some(ShiftStats {
            call_count,
            ..ShiftStats::default()
        });
        self.recent_unlocks.clear();
    }

    pub(crate) fn shift_stats(&self) -> Option<&ShiftStats> {
        self.shift.as_ref()
    }

    pub(crate) fn record_selection(&mut self, selection: &Selection) {
        let stats = self.shift.get_or_insert_with(ShiftStats::default);

        if selection.correct {
            stats.total_correct += 1;
            stats.current_streak += 1;
            stats.best_streak = stats.best_streak.max(stats.current_streak);
            stats.consecutive_misses = 0;
        } else {
            stats.total_incorrect += 1;
            stats.current_streak = 0;
            stats.consecutive_misses += 1;
            stats.max_consecutive_misses =
                stats.max_consecutive_misses.max(stats.consecutive_misses);
            stats.had_incorrect = true;
        }

        if let Some(twist) = selection.call.as_ref().and_then(|c| c.twist_id()) {
            stats.encountered_twists.insert(twist.to_string());
        }
    }

    /// Folds the shift into lifetime totals and returns ids unlocked by it,
    /// in definition order. Ids unlocked earlier are never reported again.
    pub(crate) fn complete_shift(&mut self, empathy_score: u32, call_count: usize) -> Vec<&'static str> {
        let stats = self.shift.take().unwrap_or_default();

        self.lifetime.total_shifts += 1;
        self.lifetime.total_correct += stats.total_correct;
        self.lifetime.total_incorrect += stats.total_incorrect;
        self.lifetime.best_streak_ever = self.lifetime.best_streak_ever.max(stats.best_streak);

        let score = empathy_score as usize;
        let earned = [
            (FIRST_SHIFT, true),
            (
                PERFECT_SHIFT,
                call_count > 0 && score == call_count && stats.total_incorrect == 0,
            ),
            (HOT_STREAK, stats.best_streak >= HOT_STREAK_LENGTH),
            (META_MOMENT, stats.encountered_twists.contains(META_TWIST_ID)),
            (
                COMEBACK_KID,
                stats.had_incorrect && score >= call_count.div_ceil(2),
            ),
            (
                RESILIENT_REP,
                stats.max_consecutive_misses >= RESILIENT_MISSES && empathy_score > 0,
            ),
        ];

        let now = Utc::now();
        let mut fresh = Vec::new();
        for (id, condition) in earned {
            if condition && !self.unlocked.contains_key(id) {
                self.unlocked.insert(id, UnlockRecord { unlocked_at: now });
                fresh.push(id);
            }
        }
        if !fresh.is_empty() {
            info!(unlocked = ?fresh, "achievements unlocked");
        }
        self.recent_unlocks = fresh.clone();
        fresh
    }

    pub(crate) fn unlocked_ids(&self) -> Vec<&'static str> {
        ACHIEVEMENTS
            .iter()
            .map(|d| d.id)
            .filter(|id| self.unlocked.contains_key(id))
            .collect()
    }

    pub(crate) fn state(&self) -> AchievementsView {
        let entries: Vec<AchievementEntry> = ACHIEVEMENTS
            .iter()
            .map(|def| {
                let record = self.unlocked.get(def.id);
                AchievementEntry {
                    def: *def,
                    unlocked: record.is_some(),
                    unlocked_at: record.map(|r| r.unlocked_at),
                }
            })
            .collect();
        AchievementsView {
            total: entries.len(),
            unlocked_count: self.unlocked.len(),
            entries,
            recent_unlocks: self.recent_unlocks.clone(),
            lifetime: self.lifetime.clone(),
        }
    }
}

pub(crate) fn definition(id: &str) -> Option<&'static AchievementDef> {
    ACHIEVEMENTS.iter().find(|d| d.id == id)
}
