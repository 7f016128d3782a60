//! Optimistic view state with background persistence.
//!
//! A front end calls `Session` methods in response to user actions. Each call
//! updates the in-memory state right away and hands a [`PersistIntent`] to a
//! spawned task; the caller never waits on storage, and storage failures only
//! reach the log. Text edits go through a [`Debouncer`] so typing produces one
//! write per field once the user pauses.
//!
//! All action methods spawn tasks and must be called inside a tokio runtime.

use log::{debug, error, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::debounce::Debouncer;
use crate::journal::{JournalError, JournalService, SyncStatus};
use crate::models::{
    DateKey, DayEntry, Entries, EntryField, EntryPatch, Goal, GoalCategory, GoalId, GoalUpdate, Mood,
    ReflectionPrompt, Reflections,
};

/// A write the view wants persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistIntent {
    SaveEntry { date: DateKey, patch: EntryPatch },
    AddGoal { year: i32, goal: Goal },
    /// `goal` already has `update` applied
    UpdateGoal { year: i32, goal: Goal, update: GoalUpdate },
    DeleteGoal { year: i32, id: GoalId },
    SaveReflection { year: i32, prompt: ReflectionPrompt, content: String },
    SaveMonthNotes { year: i32, month: u32, text: String },
}

impl PersistIntent {
    pub async fn execute(self, journal: &JournalService) -> Result<SyncStatus, JournalError> {
        match self {
            PersistIntent::SaveEntry { date, patch } => journal.save_entry(date, &patch).await,
            PersistIntent::AddGoal { year, goal } => journal.add_goal(year, &goal).await,
            PersistIntent::UpdateGoal { year, goal, update } => {
                journal.replace_goal(year, &goal, &update).await
            }
            PersistIntent::DeleteGoal { year, id } => journal.delete_goal(year, id).await,
            PersistIntent::SaveReflection { year, prompt, content } => {
                journal.save_reflection(year, prompt, &content).await
            }
            PersistIntent::SaveMonthNotes { year, month, text } => {
                journal.save_month_notes(year, month, &text)?;
                Ok(SyncStatus::LocalOnly)
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            PersistIntent::SaveEntry { date, .. } => format!("save entry {}", date),
            PersistIntent::AddGoal { year, goal } => format!("add goal {} ({})", goal.id, year),
            PersistIntent::UpdateGoal { year, goal, .. } => {
                format!("update goal {} ({})", goal.id, year)
            }
            PersistIntent::DeleteGoal { year, id } => format!("delete goal {} ({})", id, year),
            PersistIntent::SaveReflection { year, prompt, .. } => {
                format!("save reflection {} ({})", prompt, year)
            }
            PersistIntent::SaveMonthNotes { year, month, .. } => {
                format!("save planner notes {}-{:02}", year, month)
            }
        }
    }
}

/// Identifies one editable text field for debouncing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EditKey {
    Entry(DateKey, EntryField),
    Reflection(i32, ReflectionPrompt),
    MonthNotes(i32, u32),
}

#[derive(Debug, Default)]
struct ViewState {
    entries: Entries,
    goals: HashMap<i32, Vec<Goal>>,
    reflections: HashMap<i32, Reflections>,
    month_notes: HashMap<(i32, u32), String>,
}

pub struct Session {
    journal: Arc<JournalService>,
    state: Mutex<ViewState>,
    debouncer: Debouncer<EditKey>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
    pub fn new(journal: Arc<JournalService>, debounce: Duration) -> Self {
        Self {
            journal,
            state: Mutex::new(ViewState::default()),
            debouncer: Debouncer::new(debounce),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    /// A session using the configured debounce delay
    pub fn from_config(journal: Arc<JournalService>, config: &Config) -> Self {
        Self::new(journal, config.debounce())
    }

    pub fn journal(&self) -> &Arc<JournalService> {
        &self.journal
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    pub async fn load_entries(&self) -> Result<(), JournalError> {
        let entries = self.journal.fetch_entries().await?;
        lock(&self.state).entries = entries;
        Ok(())
    }

    pub async fn load_goals(&self, year: i32) -> Result<(), JournalError> {
        let goals = self.journal.fetch_goals(year).await?;
        lock(&self.state).goals.insert(year, goals);
        Ok(())
    }

    pub async fn load_reflections(&self, year: i32) -> Result<(), JournalError> {
        let reflections = self.journal.fetch_reflections(year).await?;
        lock(&self.state).reflections.insert(year, reflections);
        Ok(())
    }

    pub fn load_month_notes(&self, year: i32, month: u32) -> Result<String, JournalError> {
        let text = self.journal.month_notes(year, month)?;
        lock(&self.state).month_notes.insert((year, month), text.clone());
        Ok(text)
    }

    // ------------------------------------------------------------------
    // Current view state
    // ------------------------------------------------------------------

    pub fn entries(&self) -> Entries {
        lock(&self.state).entries.clone()
    }

    pub fn entry(&self, date: DateKey) -> DayEntry {
        lock(&self.state).entries.get(&date).cloned().unwrap_or_default()
    }

    pub fn goals(&self, year: i32) -> Vec<Goal> {
        lock(&self.state).goals.get(&year).cloned().unwrap_or_default()
    }

    pub fn reflections(&self, year: i32) -> Reflections {
        lock(&self.state).reflections.get(&year).cloned().unwrap_or_default()
    }

    pub fn month_notes(&self, year: i32, month: u32) -> String {
        lock(&self.state)
            .month_notes
            .get(&(year, month))
            .cloned()
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Merge `patch` into the day and persist it.
    pub fn save_day(&self, date: DateKey, patch: EntryPatch) {
        lock(&self.state).entries.entry(date).or_default().apply(&patch);
        self.dispatch(PersistIntent::SaveEntry { date, patch });
    }

    /// Pick a mood for the day; picking the current mood again clears it.
    /// Returns the day's mood afterwards.
    pub fn select_mood(&self, date: DateKey, mood: Mood) -> Option<Mood> {
        let selected = {
            let mut state = lock(&self.state);
            let entry = state.entries.entry(date).or_default();
            entry.mood = if entry.mood == Some(mood) { None } else { Some(mood) };
            entry.mood
        };
        self.dispatch(PersistIntent::SaveEntry {
            date,
            patch: EntryPatch::new().mood(selected),
        });
        selected
    }

    /// Typing into one of the day's text fields.
    pub fn edit_entry_field(&self, date: DateKey, field: EntryField, text: String) {
        let patch = EntryPatch::new().text(field, Some(text));
        lock(&self.state).entries.entry(date).or_default().apply(&patch);
        self.dispatch_debounced(
            EditKey::Entry(date, field),
            PersistIntent::SaveEntry { date, patch },
        );
    }

    pub fn add_goal(&self, year: i32, text: String, category: GoalCategory) -> Goal {
        let goal = Goal::new(text, category);
        lock(&self.state)
            .goals
            .entry(year)
            .or_default()
            .push(goal.clone());
        self.dispatch(PersistIntent::AddGoal {
            year,
            goal: goal.clone(),
        });
        goal
    }

    /// Flip a goal's completed flag. Returns the new flag, or `None` for an unknown goal.
    pub fn toggle_goal(&self, year: i32, id: GoalId) -> Option<bool> {
        let (goal, update) = {
            let mut state = lock(&self.state);
            let goal = state.goals.get_mut(&year)?.iter_mut().find(|g| g.id == id)?;
            let update = GoalUpdate::completed(!goal.completed);
            goal.apply(&update);
            (goal.clone(), update)
        };
        let completed = goal.completed;
        self.dispatch(PersistIntent::UpdateGoal { year, goal, update });
        Some(completed)
    }

    pub fn delete_goal(&self, year: i32, id: GoalId) {
        if let Some(goals) = lock(&self.state).goals.get_mut(&year) {
            goals.retain(|g| g.id != id);
        }
        self.dispatch(PersistIntent::DeleteGoal { year, id });
    }

    /// Typing into a reflection prompt.
    pub fn edit_reflection(&self, year: i32, prompt: ReflectionPrompt, text: String) {
        lock(&self.state)
            .reflections
            .entry(year)
            .or_default()
            .insert(prompt, text.clone());
        self.dispatch_debounced(
            EditKey::Reflection(year, prompt),
            PersistIntent::SaveReflection {
                year,
                prompt,
                content: text,
            },
        );
    }

    /// Typing into a month's planner notes.
    pub fn edit_month_notes(&self, year: i32, month: u32, text: String) {
        lock(&self.state)
            .month_notes
            .insert((year, month), text.clone());
        self.dispatch_debounced(
            EditKey::MonthNotes(year, month),
            PersistIntent::SaveMonthNotes { year, month, text },
        );
    }

    // ------------------------------------------------------------------
    // Persistence plumbing
    // ------------------------------------------------------------------

    /// Run `intent` on a background task. The outcome is only logged.
    pub fn dispatch(&self, intent: PersistIntent) {
        let handle = tokio::spawn(run_intent(Arc::clone(&self.journal), intent));
        self.track(handle);
    }

    fn dispatch_debounced(&self, key: EditKey, intent: PersistIntent) {
        let handle = self
            .debouncer
            .schedule(key, run_intent(Arc::clone(&self.journal), intent));
        self.track(handle);
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut in_flight = lock(&self.in_flight);
        in_flight.retain(|h| !h.is_finished());
        in_flight.push(handle);
    }

    /// Number of text edits still waiting out their debounce delay
    pub fn pending_edits(&self) -> usize {
        self.debouncer.pending()
    }

    /// Wait until every dispatched and debounced write has finished.
    pub async fn settle(&self) {
        loop {
            let handles = std::mem::take(&mut *lock(&self.in_flight));
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    error!("Persistence task did not complete: {}", e);
                }
            }
        }
    }
}

async fn run_intent(journal: Arc<JournalService>, intent: PersistIntent) {
    let action = intent.describe();
    match intent.execute(&journal).await {
        Ok(SyncStatus::RemoteFailed) => warn!("{}: stored locally only", action),
        Ok(status) => debug!("{}: {:?}", action, status),
        Err(e) => error!("Failed to {}: {}", action, e),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
