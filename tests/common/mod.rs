#![allow(dead_code)]

use async_trait::async_trait;
use daybook::remote::{EntryRow, GoalRow, ReflectionRow, RemoteError, RemoteTables};
use daybook::models::{DateKey, GoalId, GoalUpdate, ReflectionPrompt};
use daybook::{Database, JournalService};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Tables {
    entries: BTreeMap<DateKey, EntryRow>,
    goals: Vec<GoalRow>,
    reflections: BTreeMap<(i32, ReflectionPrompt), ReflectionRow>,
}

/// In-process stand-in for the hosted tables. Can be switched into a mode
/// where every call fails, and records every successful write.
#[derive(Default)]
pub struct FakeRemote {
    tables: Mutex<Tables>,
    failing: AtomicBool,
    writes: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let remote = Self::new();
        remote.set_failing(true);
        remote
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Descriptions of the writes that reached the tables, in order
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    /// Put a row in place without recording a write, as if another device wrote it
    pub fn seed_entry(&self, row: EntryRow) {
        self.tables.lock().unwrap().entries.insert(row.date_key, row);
    }

    pub fn seed_goal(&self, row: GoalRow) {
        self.tables.lock().unwrap().goals.push(row);
    }

    pub fn entry_row(&self, date: DateKey) -> Option<EntryRow> {
        self.tables.lock().unwrap().entries.get(&date).cloned()
    }

    pub fn goal_rows(&self) -> Vec<GoalRow> {
        self.tables.lock().unwrap().goals.clone()
    }

    pub fn reflection_row(&self, year: i32, prompt: ReflectionPrompt) -> Option<ReflectionRow> {
        self.tables.lock().unwrap().reflections.get(&(year, prompt)).cloned()
    }

    fn guard(&self, table: &'static str) -> Result<(), RemoteError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::Status {
                table,
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn record(&self, write: String) {
        self.writes.lock().unwrap().push(write);
    }
}

#[async_trait]
impl RemoteTables for FakeRemote {
    async fn fetch_entries(&self) -> Result<Vec<EntryRow>, RemoteError> {
        self.guard("journal_entries")?;
        Ok(self.tables.lock().unwrap().entries.values().cloned().collect())
    }

    async fn fetch_entry(&self, date_key: DateKey) -> Result<Option<EntryRow>, RemoteError> {
        self.guard("journal_entries")?;
        Ok(self.tables.lock().unwrap().entries.get(&date_key).cloned())
    }

    async fn upsert_entry(&self, row: &EntryRow) -> Result<(), RemoteError> {
        self.guard("journal_entries")?;
        self.tables.lock().unwrap().entries.insert(row.date_key, row.clone());
        self.record(format!("entry {}", row.date_key));
        Ok(())
    }

    async fn fetch_goals(&self, year: i32) -> Result<Vec<GoalRow>, RemoteError> {
        self.guard("goals")?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.goals.iter().filter(|g| g.year == year).cloned().collect())
    }

    async fn insert_goal(&self, row: &GoalRow) -> Result<(), RemoteError> {
        self.guard("goals")?;
        let mut tables = self.tables.lock().unwrap();
        if tables.goals.iter().any(|g| g.id == row.id) {
            return Err(RemoteError::Status {
                table: "goals",
                status: 409,
                body: "duplicate key".to_string(),
            });
        }
        tables.goals.push(row.clone());
        drop(tables);
        self.record(format!("insert goal {}", row.id));
        Ok(())
    }

    async fn update_goal(&self, id: GoalId, update: &GoalUpdate) -> Result<(), RemoteError> {
        self.guard("goals")?;
        let mut tables = self.tables.lock().unwrap();
        if let Some(row) = tables.goals.iter_mut().find(|g| g.id == id) {
            if let Some(text) = &update.text {
                row.text = text.clone();
            }
            if let Some(category) = update.category {
                row.category = category;
            }
            if let Some(completed) = update.completed {
                row.completed = completed;
            }
        }
        drop(tables);
        self.record(format!("update goal {}", id));
        Ok(())
    }

    async fn delete_goal(&self, id: GoalId) -> Result<(), RemoteError> {
        self.guard("goals")?;
        self.tables.lock().unwrap().goals.retain(|g| g.id != id);
        self.record(format!("delete goal {}", id));
        Ok(())
    }

    async fn fetch_reflections(&self, year: i32) -> Result<Vec<ReflectionRow>, RemoteError> {
        self.guard("reflections")?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .reflections
            .values()
            .filter(|r| r.year == year)
            .cloned()
            .collect())
    }

    async fn upsert_reflections(&self, rows: &[ReflectionRow]) -> Result<(), RemoteError> {
        self.guard("reflections")?;
        let mut tables = self.tables.lock().unwrap();
        for row in rows {
            tables.reflections.insert((row.year, row.prompt_id), row.clone());
        }
        drop(tables);
        for row in rows {
            self.record(format!("reflection {} {}", row.year, row.prompt_id));
        }
        Ok(())
    }
}

pub fn local_journal() -> (Arc<Database>, JournalService) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let journal = JournalService::new(db.clone(), None);
    (db, journal)
}

pub fn remote_journal(remote: Arc<FakeRemote>) -> (Arc<Database>, JournalService) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let journal = JournalService::new(db.clone(), Some(remote as Arc<dyn RemoteTables>));
    (db, journal)
}

pub fn date(raw: &str) -> DateKey {
    raw.parse().unwrap()
}
