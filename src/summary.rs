use std::collections::BTreeMap;
use strum::IntoEnumIterator;

use crate::models::{Entries, Goal, GoalCategory, Mood, ReflectionPrompt, Reflections};

/// Mood counts for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoodStats {
    pub counts: BTreeMap<Mood, usize>,
    pub tracked_days: usize,
}

impl MoodStats {
    pub fn count(&self, mood: Mood) -> usize {
        self.counts.get(&mood).copied().unwrap_or(0)
    }

    /// Share of tracked days with `mood`, 0.0 when nothing was tracked
    pub fn share(&self, mood: Mood) -> f64 {
        if self.tracked_days == 0 {
            0.0
        } else {
            self.count(mood) as f64 / self.tracked_days as f64
        }
    }
}

pub fn mood_stats(entries: &Entries, year: i32, month: u32) -> MoodStats {
    let mut counts: BTreeMap<Mood, usize> = Mood::iter().map(|m| (m, 0)).collect();
    let mut tracked_days = 0;

    for (date, entry) in entries {
        if date.year() != year || date.month() != month {
            continue;
        }
        if let Some(mood) = entry.mood {
            *counts.entry(mood).or_insert(0) += 1;
            tracked_days += 1;
        }
    }

    MoodStats { counts, tracked_days }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            0
        } else {
            ((self.done * 100) / self.total) as u32
        }
    }
}

pub fn goal_progress(goals: &[Goal]) -> Progress {
    Progress {
        done: goals.iter().filter(|g| g.completed).count(),
        total: goals.len(),
    }
}

/// Goals grouped by category in vocabulary order, skipping empty categories.
pub fn goals_by_category(goals: &[Goal]) -> Vec<(GoalCategory, Vec<&Goal>)> {
    GoalCategory::iter()
        .map(|category| {
            let members: Vec<&Goal> = goals.iter().filter(|g| g.category == category).collect();
            (category, members)
        })
        .filter(|(_, members)| !members.is_empty())
        .collect()
}

/// How many of the prompts have a non-blank answer.
pub fn reflection_progress(reflections: &Reflections) -> Progress {
    Progress {
        done: reflections.values().filter(|text| !text.trim().is_empty()).count(),
        total: ReflectionPrompt::iter().count(),
    }
}
