use chrono::Datelike;
use clap::{Parser, Subcommand};
use strum::IntoEnumIterator;
use thiserror::Error;

use crate::journal::{JournalError, JournalService, SyncStatus};
use crate::models::{DateKey, DayEntry, EntryField, EntryPatch, Goal, GoalCategory, Mood, ReflectionPrompt};
use crate::summary;
use crate::utils::{self, parse_month};

#[derive(Parser)]
#[command(name = "daybook")]
#[command(about = "Daily notes, moods, yearly goals and reflections")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    /// Ignore any configured remote table store
    #[arg(long)]
    pub local_only: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a day's entry (default if no subcommand)
    Day {
        /// Date (YYYY-MM-DD), today if omitted
        date: Option<DateKey>,
    },
    /// Write fields of a day's entry; fields not given are kept, "" clears one
    Write {
        /// Date (YYYY-MM-DD), today if omitted
        #[arg(long)]
        date: Option<DateKey>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        gratitude: Option<String>,
        /// Goals for the day
        #[arg(long)]
        goals: Option<String>,
        /// Planner note shown in the month view
        #[arg(long)]
        planner: Option<String>,
        /// amazing, good, okay, meh or bad
        #[arg(long)]
        mood: Option<Mood>,
        #[arg(long, conflicts_with = "mood")]
        clear_mood: bool,
    },
    /// Set the day's mood; choosing the current mood again clears it
    Mood {
        /// amazing, good, okay, meh or bad
        mood: Mood,
        /// Date (YYYY-MM-DD), today if omitted
        #[arg(long)]
        date: Option<DateKey>,
    },
    /// Month overview with mood statistics and planner notes
    Month {
        /// Month (YYYY-MM), current month if omitted
        month: Option<String>,
        /// Replace the month's planner notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Manage yearly goals
    Goal {
        #[command(subcommand)]
        action: GoalCommand,
    },
    /// Year-end reflections; lists all prompts unless one is given
    Reflect {
        /// Year reflected on, last year if omitted
        #[arg(long)]
        year: Option<i32>,
        /// proudest, learned, grateful, challenges, growth or joy
        prompt: Option<ReflectionPrompt>,
        /// New answer for the prompt
        content: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum GoalCommand {
    /// Add a goal
    Add {
        text: String,
        /// personal, career, health, relationships, learning or other
        #[arg(long, default_value = "personal")]
        category: GoalCategory,
        /// Year, current year if omitted
        #[arg(long)]
        year: Option<i32>,
    },
    /// List goals by category
    List {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Mark a goal done or not done
    Toggle {
        /// Any unique part of the goal id
        id: String,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Delete a goal
    Delete {
        /// Any unique part of the goal id
        id: String,
        #[arg(long)]
        year: Option<i32>,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Journal error: {0}")]
    JournalError(#[from] JournalError),
    #[error("Invalid month '{0}', expected YYYY-MM")]
    MonthParseError(String),
    #[error("No goal matching '{0}'")]
    GoalNotFound(String),
    #[error("'{0}' matches more than one goal; use more of the id")]
    AmbiguousGoal(String),
}

/// Dispatch a parsed command
pub async fn run(command: Option<Commands>, journal: &JournalService) -> Result<(), CliError> {
    match command.unwrap_or(Commands::Day { date: None }) {
        Commands::Day { date } => handle_day(date.unwrap_or_else(DateKey::today), journal).await,
        Commands::Write {
            date,
            notes,
            gratitude,
            goals,
            planner,
            mood,
            clear_mood,
        } => {
            let mut patch = EntryPatch::new();
            for (field, value) in [
                (EntryField::Notes, notes),
                (EntryField::Gratitude, gratitude),
                (EntryField::Goals, goals),
                (EntryField::PlannerNote, planner),
            ] {
                if let Some(text) = value {
                    patch = patch.text(field, Some(text).filter(|t| !t.is_empty()));
                }
            }
            if mood.is_some() || clear_mood {
                patch = patch.mood(mood);
            }
            handle_write(date.unwrap_or_else(DateKey::today), patch, journal).await
        }
        Commands::Mood { mood, date } => {
            handle_mood(date.unwrap_or_else(DateKey::today), mood, journal).await
        }
        Commands::Month { month, notes } => {
            let (year, month) = match month {
                Some(raw) => parse_month(&raw).ok_or(CliError::MonthParseError(raw))?,
                None => {
                    let today = utils::today();
                    (today.year(), today.month())
                }
            };
            handle_month(year, month, notes, journal).await
        }
        Commands::Goal { action } => match action {
            GoalCommand::Add { text, category, year } => {
                handle_add_goal(year.unwrap_or_else(utils::current_year), text, category, journal).await
            }
            GoalCommand::List { year } => {
                handle_list_goals(year.unwrap_or_else(utils::current_year), journal).await
            }
            GoalCommand::Toggle { id, year } => {
                handle_toggle_goal(year.unwrap_or_else(utils::current_year), &id, journal).await
            }
            GoalCommand::Delete { id, year } => {
                handle_delete_goal(year.unwrap_or_else(utils::current_year), &id, journal).await
            }
        },
        Commands::Reflect { year, prompt, content } => {
            let year = year.unwrap_or_else(|| utils::current_year() - 1);
            handle_reflect(year, prompt, content, journal).await
        }
    }
}

fn sync_note(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::LocalOnly => "",
        SyncStatus::Synced => " (synced)",
        SyncStatus::RemoteFailed => " (saved locally; remote sync failed)",
    }
}

/// Handle the day command
pub async fn handle_day(date: DateKey, journal: &JournalService) -> Result<(), CliError> {
    let entry = journal.fetch_entry(date).await?.unwrap_or_default();
    print!("{}", format_day(date, &entry));
    Ok(())
}

pub fn format_day(date: DateKey, entry: &DayEntry) -> String {
    let mut out = format!("{}\n", date.date().format("%A, %B %-d, %Y"));
    if entry.is_empty() {
        out.push_str("No entry yet.\n");
        return out;
    }
    if let Some(mood) = entry.mood {
        out.push_str(&format!("Mood:      {}\n", mood.label()));
    }
    let fields = [
        ("Gratitude", EntryField::Gratitude),
        ("Goals", EntryField::Goals),
        ("Notes", EntryField::Notes),
        ("Planner", EntryField::PlannerNote),
    ];
    for (label, field) in fields {
        if let Some(text) = entry.text(field).filter(|t| !t.is_empty()) {
            out.push_str(&format!("{:<10} {}\n", format!("{}:", label), text));
        }
    }
    out
}

/// Handle the write command
pub async fn handle_write(date: DateKey, patch: EntryPatch, journal: &JournalService) -> Result<(), CliError> {
    if patch.is_empty() {
        println!("Nothing to write for {}", date);
        return Ok(());
    }
    let status = journal.save_entry(date, &patch).await?;
    println!("Entry for {} saved{}", date, sync_note(status));
    Ok(())
}

/// Handle the mood command
pub async fn handle_mood(date: DateKey, mood: Mood, journal: &JournalService) -> Result<(), CliError> {
    let current = journal.fetch_entry(date).await?.and_then(|e| e.mood);
    let selected = if current == Some(mood) { None } else { Some(mood) };

    let status = journal.save_entry(date, &EntryPatch::new().mood(selected)).await?;
    match selected {
        Some(mood) => println!("Mood for {} set to {}{}", date, mood.label(), sync_note(status)),
        None => println!("Mood for {} cleared{}", date, sync_note(status)),
    }
    Ok(())
}

/// Handle the month command
pub async fn handle_month(
    year: i32,
    month: u32,
    notes: Option<String>,
    journal: &JournalService,
) -> Result<(), CliError> {
    if let Some(text) = notes {
        journal.save_month_notes(year, month, &text)?;
    }

    let entries = journal.fetch_entries().await?;
    let stats = summary::mood_stats(&entries, year, month);

    println!("{}", utils::month_key(year, month));
    println!("Moods tracked on {} day(s)", stats.tracked_days);
    for mood in Mood::iter() {
        let count = stats.count(mood);
        let bar = "#".repeat((stats.share(mood) * 20.0).round() as usize);
        println!("  {:<8} {:>3}  {}", mood.label(), count, bar);
    }

    let planner: Vec<(DateKey, &str)> = entries
        .iter()
        .filter(|(date, _)| date.year() == year && date.month() == month)
        .filter_map(|(date, e)| e.planner_note.as_deref().filter(|n| !n.is_empty()).map(|n| (*date, n)))
        .collect();
    if !planner.is_empty() {
        println!("Planner:");
        for (date, note) in planner {
            println!("  {}  {}", date.date().format("%d"), note);
        }
    }

    let month_notes = journal.month_notes(year, month)?;
    if !month_notes.is_empty() {
        println!("Notes:\n{}", month_notes);
    }
    Ok(())
}

/// Find the one goal whose id contains `fragment`
pub fn resolve_goal(goals: Vec<Goal>, fragment: &str) -> Result<Goal, CliError> {
    let needle = fragment.trim().to_lowercase();
    let mut matches = goals
        .into_iter()
        .filter(|g| !needle.is_empty() && g.id.to_string().contains(&needle));
    match (matches.next(), matches.next()) {
        (Some(goal), None) => Ok(goal),
        (Some(_), Some(_)) => Err(CliError::AmbiguousGoal(fragment.to_string())),
        (None, _) => Err(CliError::GoalNotFound(fragment.to_string())),
    }
}

/// Last 12 hex digits of the id; the simple form is always 32 ASCII hex digits
fn short_id(goal: &Goal) -> String {
    goal.id.simple().to_string()[20..].to_string()
}

/// Handle the goal add command
pub async fn handle_add_goal(
    year: i32,
    text: String,
    category: GoalCategory,
    journal: &JournalService,
) -> Result<(), CliError> {
    let goal = Goal::new(text, category);
    let status = journal.add_goal(year, &goal).await?;
    println!("Goal added for {} (ID: {}){}", year, short_id(&goal), sync_note(status));
    Ok(())
}

/// Handle the goal list command
pub async fn handle_list_goals(year: i32, journal: &JournalService) -> Result<(), CliError> {
    let goals = journal.fetch_goals(year).await?;
    if goals.is_empty() {
        println!("No goals yet for {}.", year);
        return Ok(());
    }

    let progress = summary::goal_progress(&goals);
    println!(
        "{}: {} of {} goals achieved ({}%)",
        year,
        progress.done,
        progress.total,
        progress.percent()
    );
    for (category, members) in summary::goals_by_category(&goals) {
        let done = members.iter().filter(|g| g.completed).count();
        println!("{} {}/{}", category.label(), done, members.len());
        for goal in members {
            let mark = if goal.completed { "x" } else { " " };
            println!("  [{}] {}  ({})", mark, goal.text, short_id(goal));
        }
    }
    Ok(())
}

/// Handle the goal toggle command
pub async fn handle_toggle_goal(year: i32, id: &str, journal: &JournalService) -> Result<(), CliError> {
    let goal = resolve_goal(journal.fetch_goals(year).await?, id)?;
    let toggled = journal
        .toggle_goal(year, goal.id)
        .await?
        .ok_or_else(|| CliError::GoalNotFound(id.to_string()))?;
    let state = if toggled.completed { "done" } else { "not done" };
    println!("'{}' marked {}", toggled.text, state);
    Ok(())
}

/// Handle the goal delete command
pub async fn handle_delete_goal(year: i32, id: &str, journal: &JournalService) -> Result<(), CliError> {
    let goal = resolve_goal(journal.fetch_goals(year).await?, id)?;
    let status = journal.delete_goal(year, goal.id).await?;
    println!("Deleted '{}'{}", goal.text, sync_note(status));
    Ok(())
}

/// Handle the reflect command
pub async fn handle_reflect(
    year: i32,
    prompt: Option<ReflectionPrompt>,
    content: Option<String>,
    journal: &JournalService,
) -> Result<(), CliError> {
    if let (Some(prompt), Some(content)) = (prompt, &content) {
        let status = journal.save_reflection(year, prompt, content).await?;
        println!("{} for {} saved{}", prompt.label(), year, sync_note(status));
        return Ok(());
    }

    let reflections = journal.fetch_reflections(year).await?;
    let prompts: Vec<ReflectionPrompt> = match prompt {
        Some(prompt) => vec![prompt],
        None => {
            let progress = summary::reflection_progress(&reflections);
            println!("{}: {} of {} reflections", year, progress.done, progress.total);
            ReflectionPrompt::iter().collect()
        }
    };
    for prompt in prompts {
        println!("\n{}", prompt.label());
        match reflections.get(&prompt).filter(|t| !t.trim().is_empty()) {
            Some(text) => println!("  {}", text),
            None => println!("  ({})", prompt.placeholder()),
        }
    }
    Ok(())
}
