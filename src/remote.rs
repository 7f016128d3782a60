//! Remote table storage.
//!
//! Three tables mirror the journal's record kinds: `journal_entries` (one row
//! per day), `goals` (one row per goal) and `reflections` (one row per year and
//! prompt). [`RestTables`] talks to them through a PostgREST-style HTTP API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RemoteSettings;
use crate::models::{DateKey, DayEntry, Goal, GoalCategory, GoalId, GoalUpdate, Mood, ReflectionPrompt};

pub const ENTRIES_TABLE: &str = "journal_entries";
pub const GOALS_TABLE: &str = "goals";
pub const REFLECTIONS_TABLE: &str = "reflections";

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Table {table} responded with {status}: {body}")]
    Status {
        table: &'static str,
        status: u16,
        body: String,
    },
    #[error("Invalid remote configuration: {0}")]
    Config(String),
}

/// A row of the `journal_entries` table. The planner note is not stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRow {
    pub date_key: DateKey,
    pub notes: Option<String>,
    pub gratitude: Option<String>,
    pub goals: Option<String>,
    pub mood: Option<Mood>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl EntryRow {
    /// Build the row written for a day. Blank text is sent as null.
    pub fn from_entry(date_key: DateKey, entry: &DayEntry, updated_at: DateTime<Utc>) -> Self {
        Self {
            date_key,
            notes: non_blank(&entry.notes),
            gratitude: non_blank(&entry.gratitude),
            goals: non_blank(&entry.goals),
            mood: entry.mood,
            updated_at: Some(updated_at),
        }
    }

    pub fn into_entry(self) -> (DateKey, DayEntry) {
        let entry = DayEntry {
            notes: self.notes,
            gratitude: self.gratitude,
            goals: self.goals,
            mood: self.mood,
            planner_note: None,
        };
        (self.date_key, entry)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalRow {
    pub id: GoalId,
    pub year: i32,
    pub text: String,
    pub category: GoalCategory,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl GoalRow {
    pub fn from_goal(year: i32, goal: &Goal) -> Self {
        Self {
            id: goal.id,
            year,
            text: goal.text.clone(),
            category: goal.category,
            completed: goal.completed,
            created_at: None,
        }
    }

    pub fn into_goal(self) -> Goal {
        Goal {
            id: self.id,
            text: self.text,
            category: self.category,
            completed: self.completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectionRow {
    pub year: i32,
    pub prompt_id: ReflectionPrompt,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn non_blank(text: &Option<String>) -> Option<String> {
    text.as_ref().filter(|t| !t.is_empty()).cloned()
}

/// Operations the journal needs from the hosted table store.
#[async_trait]
pub trait RemoteTables: Send + Sync {
    async fn fetch_entries(&self) -> Result<Vec<EntryRow>, RemoteError>;

    /// The row for one day, `None` if the day has no row
    async fn fetch_entry(&self, date_key: DateKey) -> Result<Option<EntryRow>, RemoteError>;

    /// Insert or update the row for `row.date_key`
    async fn upsert_entry(&self, row: &EntryRow) -> Result<(), RemoteError>;

    /// Goals for one year, oldest first
    async fn fetch_goals(&self, year: i32) -> Result<Vec<GoalRow>, RemoteError>;

    async fn insert_goal(&self, row: &GoalRow) -> Result<(), RemoteError>;

    async fn update_goal(&self, id: GoalId, update: &GoalUpdate) -> Result<(), RemoteError>;

    /// Deleting an id with no row is not an error
    async fn delete_goal(&self, id: GoalId) -> Result<(), RemoteError>;

    async fn fetch_reflections(&self, year: i32) -> Result<Vec<ReflectionRow>, RemoteError>;

    /// Insert or update rows keyed on (year, prompt_id)
    async fn upsert_reflections(&self, rows: &[ReflectionRow]) -> Result<(), RemoteError>;
}

/// PostgREST client for the journal tables.
pub struct RestTables {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestTables {
    pub fn new(settings: &RemoteSettings) -> Result<Self, RemoteError> {
        let base_url = settings.url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(RemoteError::Config(format!(
                "remote url must start with http:// or https://, got '{}'",
                settings.url
            )));
        }
        if settings.api_key.trim().is_empty() {
            return Err(RemoteError::Config("remote api key is empty".to_string()));
        }

        Ok(Self {
            client: Client::new(),
            base_url,
            api_key: settings.api_key.trim().to_string(),
        })
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn upsert(&self, table: &str, on_conflict: &str) -> RequestBuilder {
        self.request(Method::POST, table)
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
    }

    async fn check(table: &'static str, response: Response) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            table,
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RemoteTables for RestTables {
    async fn fetch_entries(&self) -> Result<Vec<EntryRow>, RemoteError> {
        let response = self
            .request(Method::GET, ENTRIES_TABLE)
            .query(&[("select", "*")])
            .send()
            .await?;
        Ok(Self::check(ENTRIES_TABLE, response).await?.json().await?)
    }

    async fn fetch_entry(&self, date_key: DateKey) -> Result<Option<EntryRow>, RemoteError> {
        let response = self
            .request(Method::GET, ENTRIES_TABLE)
            .query(&[
                ("select", "*".to_string()),
                ("date_key", format!("eq.{}", date_key)),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;
        let rows: Vec<EntryRow> = Self::check(ENTRIES_TABLE, response).await?.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_entry(&self, row: &EntryRow) -> Result<(), RemoteError> {
        let response = self
            .upsert(ENTRIES_TABLE, "date_key")
            .json(row)
            .send()
            .await?;
        Self::check(ENTRIES_TABLE, response).await?;
        Ok(())
    }

    async fn fetch_goals(&self, year: i32) -> Result<Vec<GoalRow>, RemoteError> {
        let response = self
            .request(Method::GET, GOALS_TABLE)
            .query(&[
                ("select", "*".to_string()),
                ("year", format!("eq.{}", year)),
                ("order", "created_at.asc".to_string()),
            ])
            .send()
            .await?;
        Ok(Self::check(GOALS_TABLE, response).await?.json().await?)
    }

    async fn insert_goal(&self, row: &GoalRow) -> Result<(), RemoteError> {
        let response = self
            .request(Method::POST, GOALS_TABLE)
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        Self::check(GOALS_TABLE, response).await?;
        Ok(())
    }

    async fn update_goal(&self, id: GoalId, update: &GoalUpdate) -> Result<(), RemoteError> {
        let response = self
            .request(Method::PATCH, GOALS_TABLE)
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=minimal")
            .json(update)
            .send()
            .await?;
        Self::check(GOALS_TABLE, response).await?;
        Ok(())
    }

    async fn delete_goal(&self, id: GoalId) -> Result<(), RemoteError> {
        let response = self
            .request(Method::DELETE, GOALS_TABLE)
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;
        Self::check(GOALS_TABLE, response).await?;
        Ok(())
    }

    async fn fetch_reflections(&self, year: i32) -> Result<Vec<ReflectionRow>, RemoteError> {
        let response = self
            .request(Method::GET, REFLECTIONS_TABLE)
            .query(&[("select", "*".to_string()), ("year", format!("eq.{}", year))])
            .send()
            .await?;
        Ok(Self::check(REFLECTIONS_TABLE, response).await?.json().await?)
    }

    async fn upsert_reflections(&self, rows: &[ReflectionRow]) -> Result<(), RemoteError> {
        let response = self
            .upsert(REFLECTIONS_TABLE, "year,prompt_id")
            .json(rows)
            .send()
            .await?;
        Self::check(REFLECTIONS_TABLE, response).await?;
        Ok(())
    }
}
