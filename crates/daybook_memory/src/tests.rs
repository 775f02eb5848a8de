use crate::sqlite::SqliteStore;
use chrono::{NaiveDate, NaiveDateTime};
use daybook_core::{
    ConversationRepository, DiaryEdit, DiaryRepository, InsertOutcome, MemoryRepository, Mood,
    NewDiaryEntry, UserDirectory, UserId,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(d: NaiveDate, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    d.and_hms_opt(h, mi, s).unwrap()
}

async fn store_with_user(name: &str) -> (SqliteStore, UserId) {
    let store = SqliteStore::in_memory().await.expect("Failed to open store");
    let user = store.create_user(name).await.expect("Failed to create user");
    (store, user)
}

#[tokio::test]
async fn test_turns_for_day_filters_and_orders() {
    let (store, user) = store_with_user("alice").await;
    let d = day(2024, 3, 1);

    store.append_turn(user, "evening", "ok", at(d, 21, 0, 0)).await.unwrap();
    store.append_turn(user, "morning", "ok", at(d, 8, 0, 0)).await.unwrap();
    // Edges of the neighbouring days
    store
        .append_turn(user, "yesterday", "ok", at(day(2024, 2, 29), 23, 59, 59))
        .await
        .unwrap();
    store
        .append_turn(user, "tomorrow", "ok", at(day(2024, 3, 2), 0, 0, 0))
        .await
        .unwrap();

    let turns = store.turns_for_day(user, d).await.unwrap();
    let messages: Vec<_> = turns.iter().map(|t| t.user_message.as_str()).collect();
    assert_eq!(messages, vec!["morning", "evening"]);
    assert!(turns.iter().all(|t| t.day() == d));
}

#[tokio::test]
async fn test_turns_are_scoped_per_user() {
    let (store, alice) = store_with_user("alice").await;
    let bob = store.create_user("bob").await.unwrap();
    let d = day(2024, 3, 1);

    store.append_turn(alice, "hi from alice", "hey", at(d, 10, 0, 0)).await.unwrap();
    store.append_turn(bob, "hi from bob", "hey", at(d, 10, 0, 0)).await.unwrap();

    let turns = store.turns_for_day(bob, d).await.unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].user_message, "hi from bob");
}

#[tokio::test]
async fn test_delete_turn_requires_owner() {
    let (store, alice) = store_with_user("alice").await;
    let bob = store.create_user("bob").await.unwrap();
    let d = day(2024, 3, 1);

    let turn = store.append_turn(alice, "secret", "ok", at(d, 9, 0, 0)).await.unwrap();

    assert!(!store.delete_turn(bob, turn.id).await.unwrap());
    assert!(store.delete_turn(alice, turn.id).await.unwrap());
    assert!(store.turns_for_day(alice, d).await.unwrap().is_empty());
    assert!(!store.delete_turn(alice, turn.id).await.unwrap());
}

#[tokio::test]
async fn test_insert_entry_then_existing() {
    let (store, user) = store_with_user("alice").await;
    let d = day(2024, 3, 1);

    let first = NewDiaryEntry::for_day(user, d, "A Quiet Day", "Dear diary...", Mood::Peaceful);
    let outcome = store.insert_entry(&first).await.unwrap();
    assert!(outcome.is_created());
    let created = outcome.into_entry();
    assert_eq!(created.title.as_deref(), Some("A Quiet Day"));
    assert_eq!(created.mood_emoji, "😌");
    assert_eq!(created.day(), d);

    let second = NewDiaryEntry::for_day(user, d, "Other", "Something else", Mood::Negative);
    match store.insert_entry(&second).await.unwrap() {
        InsertOutcome::Existing(existing) => {
            assert_eq!(existing.id, created.id);
            assert_eq!(existing.body, "Dear diary...");
            assert_eq!(existing.mood, Mood::Peaceful);
        }
        InsertOutcome::Created(_) => panic!("second insert for the same day must not create"),
    }

    assert_eq!(store.list_entries(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_entry_for_day_roundtrip() {
    let (store, user) = store_with_user("alice").await;
    let d = day(2024, 3, 1);

    assert!(store.entry_for_day(user, d).await.unwrap().is_none());

    let entry = NewDiaryEntry::for_day(user, d, "Title", "Body", Mood::Grateful);
    store.insert_entry(&entry).await.unwrap();

    let found = store.entry_for_day(user, d).await.unwrap().expect("entry stored");
    assert_eq!(found.created_at, at(d, 23, 59, 59));
    assert_eq!(found.mood, Mood::Grateful);
    assert!(store.entry_for_day(user, day(2024, 3, 2)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_entries_newest_first() {
    let (store, user) = store_with_user("alice").await;
    for d in [day(2024, 3, 2), day(2024, 3, 1), day(2024, 3, 3)] {
        let entry = NewDiaryEntry::for_day(user, d, "t", "b", Mood::Neutral);
        store.insert_entry(&entry).await.unwrap();
    }

    let days: Vec<_> = store
        .list_entries(user)
        .await
        .unwrap()
        .iter()
        .map(|e| e.day())
        .collect();
    assert_eq!(days, vec![day(2024, 3, 3), day(2024, 3, 2), day(2024, 3, 1)]);
}

#[tokio::test]
async fn test_update_entry_and_ownership() {
    let (store, alice) = store_with_user("alice").await;
    let bob = store.create_user("bob").await.unwrap();
    let d = day(2024, 3, 1);

    let entry = store
        .insert_entry(&NewDiaryEntry::for_day(alice, d, "Old", "old body", Mood::Negative))
        .await
        .unwrap()
        .into_entry();

    let edit = DiaryEdit {
        title: Some("New".to_string()),
        body: "new body".to_string(),
        mood: Some(Mood::Excited),
    };
    assert!(store.update_entry(bob, entry.id, &edit).await.unwrap().is_none());

    let updated = store
        .update_entry(alice, entry.id, &edit)
        .await
        .unwrap()
        .expect("owner can edit");
    assert_eq!(updated.title.as_deref(), Some("New"));
    assert_eq!(updated.body, "new body");
    assert_eq!(updated.mood, Mood::Excited);
    assert_eq!(updated.mood_emoji, "🤩");
    // The day an entry belongs to never moves
    assert_eq!(updated.created_at, entry.created_at);
}

#[tokio::test]
async fn test_update_without_mood_resets_to_neutral() {
    let (store, user) = store_with_user("alice").await;
    let entry = store
        .insert_entry(&NewDiaryEntry::for_day(user, day(2024, 3, 1), "t", "b", Mood::Angry))
        .await
        .unwrap()
        .into_entry();

    let edit = DiaryEdit {
        body: "calmer now".to_string(),
        ..Default::default()
    };
    let updated = store.update_entry(user, entry.id, &edit).await.unwrap().unwrap();
    assert_eq!(updated.mood, Mood::Neutral);
    assert_eq!(updated.mood_emoji, "😐");
    assert!(updated.title.is_none());
}

#[tokio::test]
async fn test_delete_entry_frees_the_day() {
    let (store, user) = store_with_user("alice").await;
    let d = day(2024, 3, 1);

    let entry = store
        .insert_entry(&NewDiaryEntry::for_day(user, d, "t", "b", Mood::Neutral))
        .await
        .unwrap()
        .into_entry();
    assert!(store.get_entry(user, entry.id).await.unwrap().is_some());
    assert!(store.delete_entry(user, entry.id).await.unwrap());
    assert!(store.get_entry(user, entry.id).await.unwrap().is_none());

    let again = store
        .insert_entry(&NewDiaryEntry::for_day(user, d, "t2", "b2", Mood::Positive))
        .await
        .unwrap();
    assert!(again.is_created());
}

#[tokio::test]
async fn test_fact_dedup_is_exact() {
    let (store, user) = store_with_user("alice").await;
    let now = at(day(2024, 3, 1), 12, 0, 0);

    assert!(!store.fact_exists(user, "Has a dog named Max").await.unwrap());
    let fact = store
        .insert_fact(user, "Has a dog named Max", now)
        .await
        .unwrap()
        .expect("first insert stores");
    assert_eq!(fact.fact, "Has a dog named Max");
    assert!(store.fact_exists(user, "Has a dog named Max").await.unwrap());

    // Exact duplicate is rejected by the store itself
    assert!(store.insert_fact(user, "Has a dog named Max", now).await.unwrap().is_none());
    // Case differs: a different fact
    assert!(store.insert_fact(user, "has a dog named max", now).await.unwrap().is_some());

    assert_eq!(store.list_facts(user).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_same_fact_for_different_users() {
    let (store, alice) = store_with_user("alice").await;
    let bob = store.create_user("bob").await.unwrap();
    let now = at(day(2024, 3, 1), 12, 0, 0);

    assert!(store.insert_fact(alice, "Lives in Lisbon", now).await.unwrap().is_some());
    assert!(store.insert_fact(bob, "Lives in Lisbon", now).await.unwrap().is_some());
    assert!(!store.fact_exists(bob, "Lives in Berlin").await.unwrap());
}

#[tokio::test]
async fn test_list_users_and_find() {
    let store = SqliteStore::in_memory().await.unwrap();
    assert!(store.list_users().await.unwrap().is_empty());

    let a = store.create_user("alice").await.unwrap();
    let b = store.create_user("bob").await.unwrap();
    assert_eq!(store.list_users().await.unwrap(), vec![a, b]);
    assert_eq!(store.find_user("bob").await.unwrap(), Some(b));
    assert_eq!(store.find_user("carol").await.unwrap(), None);

    // Usernames are unique
    assert!(store.create_user("alice").await.is_err());
}

#[tokio::test]
async fn test_unknown_stored_mood_reads_as_neutral_glyph() {
    let (store, user) = store_with_user("alice").await;
    let d = day(2024, 3, 1);
    let entry = NewDiaryEntry::for_day(user, d, "t", "body", Mood::Excited);
    let id = store.insert_entry(&entry).await.unwrap().into_entry().id;

    sqlx::query("UPDATE diary_entries SET mood = 'ecstatic' WHERE id = ?")
        .bind(id)
        .execute(store.pool())
        .await
        .unwrap();

    let read = store.entry_for_day(user, d).await.unwrap().unwrap();
    assert_eq!(read.mood, Mood::Neutral);
    assert_eq!(read.mood_emoji, Mood::Neutral.emoji());
}

#[tokio::test]
async fn test_foreign_keys_enforced() {
    let store = SqliteStore::in_memory().await.unwrap();
    let ghost = UserId(999);
    let result = store
        .append_turn(ghost, "hello", "hi", at(day(2024, 3, 1), 9, 0, 0))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_close_rejects_further_calls() {
    let (store, user) = store_with_user("alice").await;
    store.close().await;
    assert!(store.list_entries(user).await.is_err());
}
