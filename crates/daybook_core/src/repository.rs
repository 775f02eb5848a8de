//! Persistence contracts.
//!
//! Engines and the scheduler only ever see these traits. Implementations own
//! the uniqueness guarantees: at most one diary entry per `(user, day)` and
//! no duplicate fact text per user. A check performed by the caller before an
//! insert is an optimisation, never the guarantee.

use crate::model::{
    ConversationTurn, DiaryEdit, DiaryEntry, InsertOutcome, MemoryFact, NewDiaryEntry, UserId,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn append_turn(
        &self,
        user: UserId,
        user_message: &str,
        ai_response: &str,
        at: NaiveDateTime,
    ) -> Result<ConversationTurn>;

    /// Turns whose `created_at` falls on `day`, oldest first.
    async fn turns_for_day(&self, user: UserId, day: NaiveDate) -> Result<Vec<ConversationTurn>>;

    /// Returns `false` when the turn does not exist or belongs to another user.
    async fn delete_turn(&self, user: UserId, turn_id: i64) -> Result<bool>;
}

#[async_trait]
pub trait DiaryRepository: Send + Sync {
    async fn entry_for_day(&self, user: UserId, day: NaiveDate) -> Result<Option<DiaryEntry>>;

    /// Atomic single-row insert. Losing the `(user, day)` race is not an
    /// error: the surviving row comes back as [`InsertOutcome::Existing`].
    async fn insert_entry(&self, entry: &NewDiaryEntry) -> Result<InsertOutcome>;

    async fn get_entry(&self, user: UserId, entry_id: i64) -> Result<Option<DiaryEntry>>;

    /// Newest first.
    async fn list_entries(&self, user: UserId) -> Result<Vec<DiaryEntry>>;

    async fn update_entry(
        &self,
        user: UserId,
        entry_id: i64,
        edit: &DiaryEdit,
    ) -> Result<Option<DiaryEntry>>;

    async fn delete_entry(&self, user: UserId, entry_id: i64) -> Result<bool>;
}

#[async_trait]
pub trait MemoryRepository: Send + Sync {
    /// Exact, byte-for-byte comparison.
    async fn fact_exists(&self, user: UserId, fact: &str) -> Result<bool>;

    /// `None` when the store already holds this exact fact for `user`.
    async fn insert_fact(
        &self,
        user: UserId,
        fact: &str,
        at: NaiveDateTime,
    ) -> Result<Option<MemoryFact>>;

    /// Oldest first.
    async fn list_facts(&self, user: UserId) -> Result<Vec<MemoryFact>>;
}

/// Enumerates every known user. Owned by the authentication layer.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_users(&self) -> Result<Vec<UserId>>;
}
