//! Journal persistence facade.
//!
//! Every record kind is written to the local store first, so the local store
//! is always a complete mirror of what this session wrote. When a remote table
//! store is configured it is tried as well: reads prefer it and fall back to
//! the local mirror on error, writes report its outcome through [`SyncStatus`]
//! but never fail because of it.
//!
//! Daily entries are merged field by field; goals and reflections are replaced
//! whole at their key. Each record kind lives in one local JSON document, so
//! every read-modify-write of a document holds the service's write lock.

use chrono::Utc;
use log::{debug, error, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::database::{DatabaseError, LocalStore};
use crate::models::{
    DateKey, DayEntry, Entries, EntryPatch, Goal, GoalId, GoalUpdate, ReflectionPrompt, Reflections,
};
use crate::remote::{EntryRow, GoalRow, ReflectionRow, RemoteError, RemoteTables, RestTables};
use crate::utils;

pub const ENTRIES_KEY: &str = "journal-data";

pub fn goals_key(year: i32) -> String {
    format!("journal-goals-{}", year)
}

pub fn reflections_key(year: i32) -> String {
    format!("journal-reflections-{}", year)
}

pub fn month_notes_key(year: i32, month: u32) -> String {
    format!("planner-notes-{}", utils::month_key(year, month))
}

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("Local store error: {0}")]
    Local(#[from] DatabaseError),
    #[error("Failed to encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid month {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },
    #[error("Remote setup failed: {0}")]
    Remote(#[from] RemoteError),
}

/// Where a write ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No remote is configured; the local store is the only copy
    LocalOnly,
    /// Written locally and remotely
    Synced,
    /// Written locally; the remote write failed and was logged
    RemoteFailed,
}

pub struct JournalService {
    local: Arc<dyn LocalStore>,
    remote: Option<Arc<dyn RemoteTables>>,
    write_lock: Mutex<()>,
}

impl JournalService {
    pub fn new(local: Arc<dyn LocalStore>, remote: Option<Arc<dyn RemoteTables>>) -> Self {
        Self {
            local,
            remote,
            write_lock: Mutex::new(()),
        }
    }

    /// Build the service from configuration. The remote leg exists only when
    /// both url and key are configured and `use_remote` is set.
    pub fn from_config(
        config: &Config,
        local: Arc<dyn LocalStore>,
        use_remote: bool,
    ) -> Result<Self, JournalError> {
        let remote = match config.remote_settings() {
            Some(settings) if use_remote => {
                debug!("remote table store configured at {}", settings.url);
                Some(Arc::new(RestTables::new(settings)?) as Arc<dyn RemoteTables>)
            }
            _ => {
                debug!("no remote table store; using local storage only");
                None
            }
        };
        Ok(Self::new(local, remote))
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    // ------------------------------------------------------------------
    // Daily entries
    // ------------------------------------------------------------------

    /// All daily entries. Remote rows win when the remote answers; the local
    /// mirror supplies each day's planner note, which the remote does not store.
    pub async fn fetch_entries(&self) -> Result<Entries, JournalError> {
        if let Some(remote) = &self.remote {
            match remote.fetch_entries().await {
                Ok(rows) => {
                    let local = self.read_local_lenient::<Entries>(ENTRIES_KEY);
                    return Ok(entries_from_rows(rows, &local));
                }
                Err(e) => error!("Error fetching journal entries, using local store: {}", e),
            }
        }
        self.read_local(ENTRIES_KEY)
    }

    pub async fn fetch_entry(&self, date: DateKey) -> Result<Option<DayEntry>, JournalError> {
        Ok(self.fetch_entries().await?.remove(&date))
    }

    /// Merge `patch` into the entry for `date` and persist the merged entry.
    ///
    /// With a remote, the merge starts from the remote row when one exists, so
    /// fields missing from the local mirror are not overwritten with null. The
    /// local entry is the base when the remote has no row or cannot be read.
    pub async fn save_entry(&self, date: DateKey, patch: &EntryPatch) -> Result<SyncStatus, JournalError> {
        let remote_base = match &self.remote {
            Some(remote) => match remote.fetch_entry(date).await {
                Ok(row) => row.map(|row| row.into_entry().1),
                Err(e) => {
                    error!("Error fetching journal entry {}, merging into local copy: {}", date, e);
                    None
                }
            },
            None => None,
        };

        let merged = {
            let _guard = self.write_lock.lock().await;
            let mut entries: Entries = self.read_local(ENTRIES_KEY)?;
            let entry = entries.entry(date).or_default();
            if let Some(mut base) = remote_base {
                base.planner_note = entry.planner_note.take();
                *entry = base;
            }
            entry.apply(patch);
            let merged = entry.clone();
            self.write_local(ENTRIES_KEY, &entries)?;
            merged
        };

        let Some(remote) = &self.remote else {
            return Ok(SyncStatus::LocalOnly);
        };
        let row = EntryRow::from_entry(date, &merged, Utc::now());
        Ok(report(
            remote.upsert_entry(&row).await,
            &format!("saving journal entry {}", date),
        ))
    }

    // ------------------------------------------------------------------
    // Goals
    // ------------------------------------------------------------------

    /// Goals for `year`: creation order when remote, insertion order when local.
    pub async fn fetch_goals(&self, year: i32) -> Result<Vec<Goal>, JournalError> {
        if let Some(remote) = &self.remote {
            match remote.fetch_goals(year).await {
                Ok(rows) => return Ok(rows.into_iter().map(GoalRow::into_goal).collect()),
                Err(e) => error!("Error fetching goals for {}, using local store: {}", year, e),
            }
        }
        self.read_local(&goals_key(year))
    }

    /// Store a goal under `year`. A goal with the same id is replaced in place.
    pub async fn add_goal(&self, year: i32, goal: &Goal) -> Result<SyncStatus, JournalError> {
        self.put_goal_local(year, goal).await?;

        let Some(remote) = &self.remote else {
            return Ok(SyncStatus::LocalOnly);
        };
        Ok(report(
            remote.insert_goal(&GoalRow::from_goal(year, goal)).await,
            &format!("adding goal {}", goal.id),
        ))
    }

    /// Apply a partial update. A goal missing from the local mirror is looked
    /// up remotely and mirrored with the update applied.
    pub async fn update_goal(
        &self,
        year: i32,
        id: GoalId,
        update: &GoalUpdate,
    ) -> Result<SyncStatus, JournalError> {
        let found = {
            let _guard = self.write_lock.lock().await;
            let key = goals_key(year);
            let mut goals: Vec<Goal> = self.read_local(&key)?;
            match goals.iter_mut().find(|g| g.id == id) {
                Some(goal) => {
                    goal.apply(update);
                    self.write_local(&key, &goals)?;
                    true
                }
                None => false,
            }
        };

        let Some(remote) = &self.remote else {
            return Ok(SyncStatus::LocalOnly);
        };
        if !found {
            match remote.fetch_goals(year).await {
                Ok(rows) => {
                    if let Some(mut goal) = rows.into_iter().map(GoalRow::into_goal).find(|g| g.id == id) {
                        goal.apply(update);
                        self.put_goal_local(year, &goal).await?;
                    }
                }
                Err(e) => error!("Error fetching goal {} to mirror locally: {}", id, e),
            }
        }
        Ok(report(
            remote.update_goal(id, update).await,
            &format!("updating goal {}", id),
        ))
    }

    /// Store `goal`, already carrying `update`, whole in the local mirror and
    /// send `update` to the remote. Used when the caller holds the full goal,
    /// so the change survives locally even if the goal was only known remotely.
    pub async fn replace_goal(
        &self,
        year: i32,
        goal: &Goal,
        update: &GoalUpdate,
    ) -> Result<SyncStatus, JournalError> {
        self.put_goal_local(year, goal).await?;

        let Some(remote) = &self.remote else {
            return Ok(SyncStatus::LocalOnly);
        };
        Ok(report(
            remote.update_goal(goal.id, update).await,
            &format!("updating goal {}", goal.id),
        ))
    }

    /// Flip a goal's completed flag. Returns the updated goal, or `None` if no
    /// goal with `id` exists for `year`.
    pub async fn toggle_goal(&self, year: i32, id: GoalId) -> Result<Option<Goal>, JournalError> {
        let goals = self.fetch_goals(year).await?;
        let Some(mut goal) = goals.into_iter().find(|g| g.id == id) else {
            return Ok(None);
        };
        let update = GoalUpdate::completed(!goal.completed);
        goal.apply(&update);

        self.replace_goal(year, &goal, &update).await?;
        Ok(Some(goal))
    }

    /// Remove a goal. Removing an unknown id succeeds.
    pub async fn delete_goal(&self, year: i32, id: GoalId) -> Result<SyncStatus, JournalError> {
        {
            let _guard = self.write_lock.lock().await;
            let key = goals_key(year);
            let mut goals: Vec<Goal> = self.read_local(&key)?;
            let before = goals.len();
            goals.retain(|g| g.id != id);
            if goals.len() != before {
                self.write_local(&key, &goals)?;
            }
        }

        let Some(remote) = &self.remote else {
            return Ok(SyncStatus::LocalOnly);
        };
        Ok(report(
            remote.delete_goal(id).await,
            &format!("deleting goal {}", id),
        ))
    }

    async fn put_goal_local(&self, year: i32, goal: &Goal) -> Result<(), JournalError> {
        let _guard = self.write_lock.lock().await;
        let key = goals_key(year);
        let mut goals: Vec<Goal> = self.read_local(&key)?;
        match goals.iter_mut().find(|g| g.id == goal.id) {
            Some(existing) => *existing = goal.clone(),
            None => goals.push(goal.clone()),
        }
        self.write_local(&key, &goals)
    }

    // ------------------------------------------------------------------
    // Reflections
    // ------------------------------------------------------------------

    pub async fn fetch_reflections(&self, year: i32) -> Result<Reflections, JournalError> {
        if let Some(remote) = &self.remote {
            match remote.fetch_reflections(year).await {
                Ok(rows) => {
                    return Ok(rows
                        .into_iter()
                        .map(|row| (row.prompt_id, row.content))
                        .collect());
                }
                Err(e) => error!("Error fetching reflections for {}, using local store: {}", year, e),
            }
        }
        self.read_local(&reflections_key(year))
    }

    /// Overwrite the reflection for (`year`, `prompt`).
    pub async fn save_reflection(
        &self,
        year: i32,
        prompt: ReflectionPrompt,
        content: &str,
    ) -> Result<SyncStatus, JournalError> {
        {
            let _guard = self.write_lock.lock().await;
            let key = reflections_key(year);
            let mut reflections: Reflections = self.read_local(&key)?;
            reflections.insert(prompt, content.to_string());
            self.write_local(&key, &reflections)?;
        }

        let Some(remote) = &self.remote else {
            return Ok(SyncStatus::LocalOnly);
        };
        let row = ReflectionRow {
            year,
            prompt_id: prompt,
            content: content.to_string(),
            updated_at: Some(Utc::now()),
        };
        Ok(report(
            remote.upsert_reflections(std::slice::from_ref(&row)).await,
            &format!("saving reflection {} for {}", prompt, year),
        ))
    }

    /// Replace the whole year's reflections locally and upsert every prompt remotely.
    pub async fn save_all_reflections(
        &self,
        year: i32,
        reflections: &Reflections,
    ) -> Result<SyncStatus, JournalError> {
        {
            let _guard = self.write_lock.lock().await;
            self.write_local(&reflections_key(year), reflections)?;
        }

        let Some(remote) = &self.remote else {
            return Ok(SyncStatus::LocalOnly);
        };
        if reflections.is_empty() {
            return Ok(SyncStatus::Synced);
        }
        let now = Utc::now();
        let rows: Vec<ReflectionRow> = reflections
            .iter()
            .map(|(prompt, content)| ReflectionRow {
                year,
                prompt_id: *prompt,
                content: content.clone(),
                updated_at: Some(now),
            })
            .collect();
        Ok(report(
            remote.upsert_reflections(&rows).await,
            &format!("saving reflections for {}", year),
        ))
    }

    // ------------------------------------------------------------------
    // Monthly planner notes (local only)
    // ------------------------------------------------------------------

    pub fn month_notes(&self, year: i32, month: u32) -> Result<String, JournalError> {
        let key = checked_month_key(year, month)?;
        Ok(self.local.get(&key)?.unwrap_or_default())
    }

    pub fn save_month_notes(&self, year: i32, month: u32, text: &str) -> Result<(), JournalError> {
        let key = checked_month_key(year, month)?;
        self.local.set(&key, text)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Local store helpers
    // ------------------------------------------------------------------

    /// Read a JSON document; unparseable content is treated as absent.
    fn read_local<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, JournalError> {
        let Some(raw) = self.local.get(key)? else {
            return Ok(T::default());
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("Ignoring unreadable local value for {}: {}", key, e);
                Ok(T::default())
            }
        }
    }

    /// Like `read_local`, but an unavailable store also reads as empty.
    fn read_local_lenient<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        self.read_local(key).unwrap_or_else(|e| {
            warn!("Local store unavailable while reading {}: {}", key, e);
            T::default()
        })
    }

    fn write_local<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), JournalError> {
        let raw = serde_json::to_string(value).map_err(|source| JournalError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.local.set(key, &raw)?;
        Ok(())
    }
}

fn checked_month_key(year: i32, month: u32) -> Result<String, JournalError> {
    if utils::days_in_month(year, month).is_none() {
        return Err(JournalError::InvalidMonth { year, month });
    }
    Ok(month_notes_key(year, month))
}

fn report(result: Result<(), RemoteError>, action: &str) -> SyncStatus {
    match result {
        Ok(()) => SyncStatus::Synced,
        Err(e) => {
            error!("Error {}, kept in local store only: {}", action, e);
            SyncStatus::RemoteFailed
        }
    }
}

fn entries_from_rows(rows: Vec<EntryRow>, local: &Entries) -> Entries {
    rows.into_iter()
        .map(|row| {
            let (date, mut entry) = row.into_entry();
            entry.planner_note = local.get(&date).and_then(|e| e.planner_note.clone());
            (date, entry)
        })
        .collect()
}
