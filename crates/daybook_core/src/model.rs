//! Records shared by the repositories and the engines.

use crate::mood::Mood;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque user identifier, owned by the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// One user message and the assistant's reply. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: i64,
    pub user_id: UserId,
    pub user_message: String,
    pub ai_response: String,
    pub created_at: NaiveDateTime,
}

impl ConversationTurn {
    pub fn day(&self) -> NaiveDate {
        self.created_at.date()
    }
}

/// All turns of one user-day, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayConversations {
    pub day: NaiveDate,
    pub turns: Vec<ConversationTurn>,
}

impl DayConversations {
    pub fn new(day: NaiveDate, turns: Vec<ConversationTurn>) -> Self {
        Self { day, turns }
    }

    pub fn count(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// User-authored messages only; assistant replies are never source material.
    pub fn user_messages(&self) -> Vec<&str> {
        self.turns.iter().map(|t| t.user_message.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: i64,
    pub user_id: UserId,
    pub title: Option<String>,
    pub body: String,
    pub mood: Mood,
    pub mood_emoji: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl DiaryEntry {
    /// The calendar day this entry is attributed to.
    pub fn day(&self) -> NaiveDate {
        self.created_at.date()
    }
}

/// Insert payload for a diary entry. `day` is the uniqueness key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDiaryEntry {
    pub user_id: UserId,
    pub day: NaiveDate,
    pub title: String,
    pub body: String,
    pub mood: Mood,
    pub created_at: NaiveDateTime,
}

impl NewDiaryEntry {
    /// Builds an entry pinned to the last second of `day`.
    pub fn for_day(
        user_id: UserId,
        day: NaiveDate,
        title: impl Into<String>,
        body: impl Into<String>,
        mood: Mood,
    ) -> Self {
        Self {
            user_id,
            day,
            title: title.into(),
            body: body.into(),
            mood,
            created_at: end_of_day(day),
        }
    }
}

/// Explicit edit of an existing entry. The entry's day never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DiaryEdit {
    pub title: Option<String>,
    pub body: String,
    /// Missing mood resets to neutral.
    pub mood: Option<Mood>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Created(DiaryEntry),
    /// The `(user, day)` slot was already taken; carries the surviving row.
    Existing(DiaryEntry),
}

impl InsertOutcome {
    pub fn entry(&self) -> &DiaryEntry {
        match self {
            InsertOutcome::Created(e) | InsertOutcome::Existing(e) => e,
        }
    }

    pub fn into_entry(self) -> DiaryEntry {
        match self {
            InsertOutcome::Created(e) | InsertOutcome::Existing(e) => e,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, InsertOutcome::Created(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryFact {
    pub id: i64,
    pub user_id: UserId,
    pub fact: String,
    pub created_at: NaiveDateTime,
}

/// Last second of `day`. Entries generated late or during backfill are
/// attributed to this instant, not to the time the job ran.
pub fn end_of_day(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default())
}
