mod common;

use common::{FakeRemote, date, local_journal, remote_journal};
use daybook::remote::GoalRow;
use daybook::{Config, EntryField, EntryPatch, Goal, GoalCategory, Mood, ReflectionPrompt, Session};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const DEBOUNCE: Duration = Duration::from_millis(500);

fn session_with_remote() -> (Arc<FakeRemote>, Session) {
    let remote = FakeRemote::new();
    let (_db, journal) = remote_journal(remote.clone());
    (remote, Session::new(Arc::new(journal), DEBOUNCE))
}

#[tokio::test(start_paused = true)]
async fn rapid_reflection_edits_write_once() {
    let (remote, session) = session_with_remote();

    for text in ["G", "Gr", "Gro", "Grow", "Growth"] {
        session.edit_reflection(2024, ReflectionPrompt::Growth, text.to_string());
        sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(session.reflections(2024)[&ReflectionPrompt::Growth], "Growth");
    assert!(remote.writes().is_empty());

    session.settle().await;

    assert_eq!(remote.writes(), vec!["reflection 2024 growth".to_string()]);
    assert_eq!(remote.reflection_row(2024, ReflectionPrompt::Growth).unwrap().content, "Growth");
    assert_eq!(session.pending_edits(), 0);
}

#[tokio::test(start_paused = true)]
async fn rapid_entry_edits_write_the_last_value() {
    let (remote, session) = session_with_remote();
    let day = date("2024-03-09");

    for text in ["t", "te", "tea", "tea ", "tea and toast"] {
        session.edit_entry_field(day, EntryField::Notes, text.to_string());
    }
    assert_eq!(session.entry(day).notes.as_deref(), Some("tea and toast"));
    assert_eq!(session.pending_edits(), 1);

    session.settle().await;

    assert_eq!(remote.writes().len(), 1);
    let stored = session.journal().fetch_entry(day).await.unwrap().unwrap();
    assert_eq!(stored.notes.as_deref(), Some("tea and toast"));
}

#[tokio::test(start_paused = true)]
async fn fields_are_debounced_separately() {
    let (remote, session) = session_with_remote();
    let day = date("2024-03-10");

    session.edit_entry_field(day, EntryField::Gratitude, "rain".to_string());
    session.edit_entry_field(day, EntryField::Goals, "fix the bike".to_string());
    session.settle().await;

    assert_eq!(remote.writes().len(), 2);
    let stored = session.journal().fetch_entry(day).await.unwrap().unwrap();
    assert_eq!(stored.gratitude.as_deref(), Some("rain"));
    assert_eq!(stored.goals.as_deref(), Some("fix the bike"));
}

#[tokio::test]
async fn selecting_the_same_mood_clears_it() {
    let (_db, journal) = local_journal();
    let session = Session::new(Arc::new(journal), DEBOUNCE);
    let day = date("2024-04-01");

    assert_eq!(session.select_mood(day, Mood::Good), Some(Mood::Good));
    assert_eq!(session.select_mood(day, Mood::Bad), Some(Mood::Bad));
    assert_eq!(session.select_mood(day, Mood::Bad), None);
    assert_eq!(session.entry(day).mood, None);

    session.settle().await;
    let stored = session.journal().fetch_entry(day).await.unwrap().unwrap();
    assert_eq!(stored.mood, None);
}

#[tokio::test]
async fn goal_actions_update_the_view_before_storage() {
    let (remote, session) = session_with_remote();

    let goal = session.add_goal(2024, "Cook every Sunday".to_string(), GoalCategory::Health);
    assert_eq!(session.goals(2024), vec![goal.clone()]);
    assert_eq!(session.toggle_goal(2024, goal.id), Some(true));
    assert!(session.goals(2024)[0].completed);

    let stray = Goal::new("not loaded".to_string(), GoalCategory::Other);
    assert_eq!(session.toggle_goal(2024, stray.id), None);

    session.settle().await;
    let stored = session.journal().fetch_goals(2024).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].completed);

    session.delete_goal(2024, goal.id);
    assert!(session.goals(2024).is_empty());
    session.settle().await;
    assert!(remote.goal_rows().is_empty());
}

#[tokio::test(start_paused = true)]
async fn month_notes_are_debounced_and_local() {
    let (remote, session) = session_with_remote();

    session.edit_month_notes(2024, 8, "pack".to_string());
    session.edit_month_notes(2024, 8, "pack for the coast".to_string());
    assert_eq!(session.month_notes(2024, 8), "pack for the coast");

    session.settle().await;
    assert_eq!(session.journal().month_notes(2024, 8).unwrap(), "pack for the coast");
    assert!(remote.writes().is_empty());
}

#[tokio::test]
async fn remote_failures_never_reach_the_view() {
    let remote = FakeRemote::failing();
    let (_db, journal) = remote_journal(remote);
    let session = Session::new(Arc::new(journal), DEBOUNCE);
    let day = date("2024-09-09");

    session.save_day(day, EntryPatch::new().notes(Some("offline".to_string())));
    session.settle().await;

    assert_eq!(session.entry(day).notes.as_deref(), Some("offline"));
    let stored = session.journal().fetch_entry(day).await.unwrap().unwrap();
    assert_eq!(stored.notes.as_deref(), Some("offline"));
}

#[tokio::test]
async fn loading_pulls_stored_state_into_the_view() {
    let (_db, journal) = local_journal();
    journal
        .save_entry(date("2024-01-01"), &EntryPatch::new().mood(Some(Mood::Amazing)))
        .await
        .unwrap();
    journal
        .save_reflection(2023, ReflectionPrompt::Learned, "slow down")
        .await
        .unwrap();
    journal.save_month_notes(2024, 1, "new year plans").unwrap();

    let session = Session::new(Arc::new(journal), DEBOUNCE);
    assert!(session.entries().is_empty());

    session.load_entries().await.unwrap();
    session.load_goals(2024).await.unwrap();
    session.load_reflections(2023).await.unwrap();
    assert_eq!(session.load_month_notes(2024, 1).unwrap(), "new year plans");

    assert_eq!(session.entry(date("2024-01-01")).mood, Some(Mood::Amazing));
    assert!(session.goals(2024).is_empty());
    assert_eq!(session.reflections(2023)[&ReflectionPrompt::Learned], "slow down");
    assert_eq!(session.month_notes(2024, 1), "new year plans");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_day_saves_keep_every_day() {
    for _ in 0..20 {
        let (_db, journal) = local_journal();
        let session = Session::new(Arc::new(journal), DEBOUNCE);

        for day in 1..=20 {
            session.save_day(
                date(&format!("2024-02-{:02}", day)),
                EntryPatch::new().mood(Some(Mood::Okay)),
            );
        }
        session.settle().await;

        assert_eq!(session.journal().fetch_entries().await.unwrap().len(), 20);
    }
}

#[tokio::test]
async fn toggling_a_remote_goal_survives_an_outage() {
    let remote = FakeRemote::new();
    let (_db, journal) = remote_journal(remote.clone());
    let goal = Goal::new("Learn the cello".to_string(), GoalCategory::Learning);
    remote.seed_goal(GoalRow::from_goal(2024, &goal));

    let session = Session::new(Arc::new(journal), DEBOUNCE);
    session.load_goals(2024).await.unwrap();
    remote.set_failing(true);

    assert_eq!(session.toggle_goal(2024, goal.id), Some(true));
    session.settle().await;

    let stored = session.journal().fetch_goals(2024).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, goal.id);
    assert!(stored[0].completed);
}

#[tokio::test(start_paused = true)]
async fn configured_debounce_delay_is_used() {
    let remote = FakeRemote::new();
    let (_db, journal) = remote_journal(remote.clone());
    let config = Config {
        debounce_ms: 200,
        ..Config::default()
    };
    let session = Session::from_config(Arc::new(journal), &config);

    session.edit_reflection(2024, ReflectionPrompt::Joy, "the lake".to_string());
    sleep(Duration::from_millis(150)).await;
    assert!(remote.writes().is_empty());

    sleep(Duration::from_millis(100)).await;
    assert_eq!(remote.writes(), vec!["reflection 2024 joy".to_string()]);
    session.settle().await;
}
