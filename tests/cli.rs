mod common;

use common::{date, local_journal};
use daybook::cli::{self, Cli, CliError};
use clap::Parser;
use daybook::{EntryPatch, GoalCategory, Mood, ReflectionPrompt};

#[tokio::test]
async fn mood_command_toggles() {
    let (_db, journal) = local_journal();
    let day = date("2024-10-01");

    cli::handle_mood(day, Mood::Meh, &journal).await.unwrap();
    assert_eq!(journal.fetch_entry(day).await.unwrap().unwrap().mood, Some(Mood::Meh));

    cli::handle_mood(day, Mood::Meh, &journal).await.unwrap();
    assert_eq!(journal.fetch_entry(day).await.unwrap().unwrap().mood, None);
}

#[tokio::test]
async fn write_command_merges_and_clears() {
    let (_db, journal) = local_journal();

    let first = Cli::try_parse_from([
        "daybook", "write", "--date", "2024-10-02", "--notes", "rainy", "--gratitude", "soup",
    ])
    .unwrap();
    cli::run(first.command, &journal).await.unwrap();

    let second = Cli::try_parse_from(["daybook", "write", "--date", "2024-10-02", "--notes", ""]).unwrap();
    cli::run(second.command, &journal).await.unwrap();

    let entry = journal.fetch_entry(date("2024-10-02")).await.unwrap().unwrap();
    assert_eq!(entry.notes, None);
    assert_eq!(entry.gratitude.as_deref(), Some("soup"));
}

#[tokio::test]
async fn goal_commands_find_goals_by_id_fragment() {
    let (_db, journal) = local_journal();
    cli::handle_add_goal(2024, "Hike the ridge".to_string(), GoalCategory::Health, &journal)
        .await
        .unwrap();
    let goal = journal.fetch_goals(2024).await.unwrap().remove(0);
    let fragment = goal.id.simple().to_string()[20..].to_string();

    cli::handle_toggle_goal(2024, &fragment, &journal).await.unwrap();
    assert!(journal.fetch_goals(2024).await.unwrap()[0].completed);

    assert!(matches!(
        cli::handle_delete_goal(2024, "no-such-goal", &journal).await,
        Err(CliError::GoalNotFound(_))
    ));
    cli::handle_delete_goal(2024, &fragment, &journal).await.unwrap();
    assert!(journal.fetch_goals(2024).await.unwrap().is_empty());
}

#[tokio::test]
async fn reflect_command_saves_one_prompt() {
    let (_db, journal) = local_journal();
    let parsed = Cli::try_parse_from(["daybook", "reflect", "--year", "2023", "joy", "first snow"]).unwrap();
    cli::run(parsed.command, &journal).await.unwrap();

    assert_eq!(
        journal.fetch_reflections(2023).await.unwrap()[&ReflectionPrompt::Joy],
        "first snow"
    );
}

#[tokio::test]
async fn month_command_stores_notes_and_rejects_bad_months() {
    let (_db, journal) = local_journal();
    journal
        .save_entry(date("2024-11-05"), &EntryPatch::new().planner_note(Some("vote".to_string())))
        .await
        .unwrap();

    let parsed = Cli::try_parse_from(["daybook", "month", "2024-11", "--notes", "budget review"]).unwrap();
    cli::run(parsed.command, &journal).await.unwrap();
    assert_eq!(journal.month_notes(2024, 11).unwrap(), "budget review");

    let bad = Cli::try_parse_from(["daybook", "month", "2024-13"]).unwrap();
    assert!(matches!(
        cli::run(bad.command, &journal).await,
        Err(CliError::MonthParseError(_))
    ));
    assert!(Cli::try_parse_from(["daybook"]).unwrap().command.is_none());
}
