pub mod cli;
pub mod config;
pub mod database;
pub mod debounce;
pub mod journal;
pub mod logging;
pub mod models;
pub mod remote;
pub mod session;
pub mod summary;
pub mod utils;

pub use config::Config;
pub use database::{Database, LocalStore};
pub use journal::{JournalService, SyncStatus};
pub use models::{DateKey, DayEntry, EntryField, EntryPatch, Goal, GoalCategory, Mood, ReflectionPrompt};
pub use session::Session;
pub use utils::Profile;
