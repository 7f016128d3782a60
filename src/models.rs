use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::utils;

/// How the day felt, from best to worst.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mood {
    Amazing,
    Good,
    Okay,
    Meh,
    Bad,
}

impl Mood {
    pub fn label(self) -> &'static str {
        match self {
            Mood::Amazing => "Amazing",
            Mood::Good => "Good",
            Mood::Okay => "Okay",
            Mood::Meh => "Meh",
            Mood::Bad => "Bad",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Default, Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GoalCategory {
    #[default]
    Personal,
    Career,
    Health,
    Relationships,
    Learning,
    Other,
}

impl GoalCategory {
    pub fn label(self) -> &'static str {
        match self {
            GoalCategory::Personal => "Personal",
            GoalCategory::Career => "Career",
            GoalCategory::Health => "Health",
            GoalCategory::Relationships => "Relationships",
            GoalCategory::Learning => "Learning",
            GoalCategory::Other => "Other",
        }
    }
}

/// The fixed set of year-end reflection prompts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReflectionPrompt {
    Proudest,
    Learned,
    Grateful,
    Challenges,
    Growth,
    Joy,
}

impl ReflectionPrompt {
    pub fn label(self) -> &'static str {
        match self {
            ReflectionPrompt::Proudest => "Proudest Moment",
            ReflectionPrompt::Learned => "Lessons Learned",
            ReflectionPrompt::Grateful => "Gratitude",
            ReflectionPrompt::Challenges => "Challenges Overcome",
            ReflectionPrompt::Growth => "Personal Growth",
            ReflectionPrompt::Joy => "Moments of Joy",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            ReflectionPrompt::Proudest => "What was your proudest achievement this year?",
            ReflectionPrompt::Learned => "What important lessons did you learn?",
            ReflectionPrompt::Grateful => "What are you most grateful for from this year?",
            ReflectionPrompt::Challenges => "What challenges did you face and overcome?",
            ReflectionPrompt::Growth => "How did you grow as a person?",
            ReflectionPrompt::Joy => "What moments brought you the most joy?",
        }
    }
}

/// Calendar day used as the primary key of a daily entry, rendered `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Today on the local calendar (not UTC)
    pub fn today() -> Self {
        Self(utils::today())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for DateKey {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        utils::parse_date(s).map(Self)
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One day's journal page. Every field is optional; a missing record means no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayEntry {
    pub notes: Option<String>,
    pub gratitude: Option<String>,
    pub goals: Option<String>,
    pub mood: Option<Mood>,
    pub planner_note: Option<String>,
}

impl DayEntry {
    /// Merge a patch into this entry. Omitted fields are kept, explicit nulls clear.
    pub fn apply(&mut self, patch: &EntryPatch) {
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
        if let Some(gratitude) = &patch.gratitude {
            self.gratitude = gratitude.clone();
        }
        if let Some(goals) = &patch.goals {
            self.goals = goals.clone();
        }
        if let Some(mood) = patch.mood {
            self.mood = mood;
        }
        if let Some(planner_note) = &patch.planner_note {
            self.planner_note = planner_note.clone();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_none()
            && self.gratitude.is_none()
            && self.goals.is_none()
            && self.mood.is_none()
            && self.planner_note.is_none()
    }

    pub fn text(&self, field: EntryField) -> Option<&str> {
        match field {
            EntryField::Notes => self.notes.as_deref(),
            EntryField::Gratitude => self.gratitude.as_deref(),
            EntryField::Goals => self.goals.as_deref(),
            EntryField::PlannerNote => self.planner_note.as_deref(),
        }
    }
}

/// All daily entries keyed by date.
pub type Entries = BTreeMap<DateKey, DayEntry>;

/// The free-text fields of a daily entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum EntryField {
    Notes,
    Gratitude,
    Goals,
    PlannerNote,
}

/// A partial write to a daily entry.
///
/// Each field is tri-state: `None` leaves the stored value untouched,
/// `Some(None)` writes null and `Some(Some(v))` writes `v`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPatch {
    pub notes: Option<Option<String>>,
    pub gratitude: Option<Option<String>>,
    pub goals: Option<Option<String>>,
    pub mood: Option<Option<Mood>>,
    pub planner_note: Option<Option<String>>,
}

impl EntryPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = Some(notes);
        self
    }

    pub fn gratitude(mut self, gratitude: Option<String>) -> Self {
        self.gratitude = Some(gratitude);
        self
    }

    pub fn goals(mut self, goals: Option<String>) -> Self {
        self.goals = Some(goals);
        self
    }

    pub fn mood(mut self, mood: Option<Mood>) -> Self {
        self.mood = Some(mood);
        self
    }

    pub fn planner_note(mut self, planner_note: Option<String>) -> Self {
        self.planner_note = Some(planner_note);
        self
    }

    pub fn text(self, field: EntryField, value: Option<String>) -> Self {
        match field {
            EntryField::Notes => self.notes(value),
            EntryField::Gratitude => self.gratitude(value),
            EntryField::Goals => self.goals(value),
            EntryField::PlannerNote => self.planner_note(value),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Time-ordered identifier assigned when a goal is created.
pub type GoalId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub text: String,
    pub category: GoalCategory,
    pub completed: bool,
}

impl Goal {
    pub fn new(text: String, category: GoalCategory) -> Self {
        Self {
            id: Uuid::now_v7(),
            text,
            category,
            completed: false,
        }
    }

    pub fn apply(&mut self, update: &GoalUpdate) {
        if let Some(text) = &update.text {
            self.text = text.clone();
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(completed) = update.completed {
            self.completed = completed;
        }
    }
}

/// Partial update of a goal; serialised as the body of a remote PATCH.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GoalUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<GoalCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl GoalUpdate {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }
}

/// One year's reflections keyed by prompt.
pub type Reflections = BTreeMap<ReflectionPrompt, String>;

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> DayEntry {
        DayEntry {
            notes: Some("walked the dog".to_string()),
            gratitude: Some("sunshine".to_string()),
            goals: None,
            mood: Some(Mood::Good),
            planner_note: Some("dentist".to_string()),
        }
    }

    #[test]
    fn patch_keeps_omitted_fields() {
        let mut day = entry();
        day.apply(&EntryPatch::new().goals(Some("finish chapter".to_string())));

        assert_eq!(day.notes.as_deref(), Some("walked the dog"));
        assert_eq!(day.goals.as_deref(), Some("finish chapter"));
        assert_eq!(day.mood, Some(Mood::Good));
    }

    #[test]
    fn patch_writes_explicit_nulls() {
        let mut day = entry();
        day.apply(&EntryPatch::new().mood(None).gratitude(None));

        assert_eq!(day.mood, None);
        assert_eq!(day.gratitude, None);
        assert_eq!(day.planner_note.as_deref(), Some("dentist"));
    }

    #[test]
    fn day_entry_json_matches_stored_shape() {
        let json = serde_json::to_value(entry()).unwrap();
        assert_eq!(json["mood"], "good");
        assert_eq!(json["plannerNote"], "dentist");

        let parsed: DayEntry = serde_json::from_str(r#"{"notes":"hi"}"#).unwrap();
        assert_eq!(parsed.notes.as_deref(), Some("hi"));
        assert!(parsed.mood.is_none());
    }

    #[test]
    fn date_keys_are_map_keys_in_json() {
        let mut entries = Entries::new();
        entries.insert("2024-03-09".parse().unwrap(), entry());

        let json = serde_json::to_string(&entries).unwrap();
        assert!(json.starts_with(r#"{"2024-03-09":"#));

        let back: Entries = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entries);
    }

    #[test]
    fn vocabularies_parse_lowercase() {
        assert_eq!("meh".parse::<Mood>().unwrap(), Mood::Meh);
        assert_eq!("relationships".parse::<GoalCategory>().unwrap(), GoalCategory::Relationships);
        assert_eq!("joy".parse::<ReflectionPrompt>().unwrap(), ReflectionPrompt::Joy);
        assert!("great".parse::<Mood>().is_err());
        assert_eq!(EntryField::PlannerNote.as_ref(), "planner-note");
    }

    #[test]
    fn goal_update_only_serialises_present_fields() {
        let body = serde_json::to_value(GoalUpdate::completed(true)).unwrap();
        assert_eq!(body, serde_json::json!({ "completed": true }));
    }

    #[test]
    fn new_goals_get_distinct_ids() {
        let a = Goal::new("run a 10k".to_string(), GoalCategory::Health);
        let b = Goal::new("run a 10k".to_string(), GoalCategory::Health);
        assert_ne!(a.id, b.id);
        assert!(!a.completed);
    }
}
