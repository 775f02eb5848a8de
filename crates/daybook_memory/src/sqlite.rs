use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use daybook_core::{
    ConversationRepository, ConversationTurn, DiaryEdit, DiaryEntry, DiaryRepository,
    InsertOutcome, MemoryFact, MemoryRepository, Mood, NewDiaryEntry, UserDirectory, UserId,
};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

/// Storage format for timestamps. Lexicographic order matches time order.
const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DAY_FORMAT: &str = "%Y-%m-%d";

const SCHEMA: &[(&str, &str)] = &[
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT UNIQUE NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    ),
    (
        "conversations",
        r#"
        CREATE TABLE IF NOT EXISTS conversations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            user_message TEXT NOT NULL,
            ai_response TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
        );
        "#,
    ),
    (
        "conversations user/date index",
        "CREATE INDEX IF NOT EXISTS idx_conversations_user_date ON conversations (user_id, created_at)",
    ),
    // One entry per user-day is enforced here, not by callers.
    (
        "diary_entries",
        r#"
        CREATE TABLE IF NOT EXISTS diary_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            entry_day TEXT NOT NULL,
            title TEXT DEFAULT NULL,
            body TEXT NOT NULL,
            mood TEXT NOT NULL DEFAULT 'neutral',
            mood_emoji TEXT NOT NULL DEFAULT '😐',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (user_id, entry_day),
            FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
        );
        "#,
    ),
    (
        "memory_facts",
        r#"
        CREATE TABLE IF NOT EXISTS memory_facts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            fact TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (user_id, fact),
            FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
        );
        "#,
    ),
];

/// SQLite implementation of every repository contract.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (or create) a database file and apply the schema.
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePoolOptions::new()
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON").execute(conn).await?;
                    Ok(())
                })
            })
            .connect(&db_url)
            .await
            .context("Failed to connect to SQLite database")?;

        let store = Self { pool };
        store.migrate().await?;
        tracing::info!(path = %db_path.as_ref().display(), "SQLite store ready");
        Ok(store)
    }

    /// Private in-memory database, mainly for tests.
    ///
    /// Pinned to a single connection that never expires: every connection to
    /// `:memory:` would otherwise see its own empty database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON").execute(conn).await?;
                    Ok(())
                })
            })
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory SQLite database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Schema creation is all-or-nothing.
    async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (name, sql) in SCHEMA {
            sqlx::query(sql)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to create {name}"))?;
        }
        tx.commit().await.context("Failed to commit schema")?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Drain and close the pool. Further calls fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Register a user. Account management lives elsewhere; this exists so
    /// the foreign keys have something to point at.
    pub async fn create_user(&self, username: &str) -> Result<UserId> {
        let result = sqlx::query("INSERT INTO users (username, created_at) VALUES (?, ?)")
            .bind(username)
            .bind(format_ts(Local::now().naive_local()))
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to create user {username}"))?;
        Ok(UserId(result.last_insert_rowid()))
    }

    pub async fn find_user(&self, username: &str) -> Result<Option<UserId>> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to look up user")?;
        Ok(id.map(UserId))
    }
}

// =============================================================================
// Conversations
// =============================================================================

#[async_trait]
impl ConversationRepository for SqliteStore {
    async fn append_turn(
        &self,
        user: UserId,
        user_message: &str,
        ai_response: &str,
        at: NaiveDateTime,
    ) -> Result<ConversationTurn> {
        let result = sqlx::query(
            "INSERT INTO conversations (user_id, user_message, ai_response, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user.0)
        .bind(user_message)
        .bind(ai_response)
        .bind(format_ts(at))
        .execute(&self.pool)
        .await
        .context("Failed to store conversation turn")?;

        Ok(ConversationTurn {
            id: result.last_insert_rowid(),
            user_id: user,
            user_message: user_message.to_string(),
            ai_response: ai_response.to_string(),
            created_at: at,
        })
    }

    async fn turns_for_day(&self, user: UserId, day: NaiveDate) -> Result<Vec<ConversationTurn>> {
        let (start, end) = day_bounds(day);
        let rows = sqlx::query(
            "SELECT id, user_id, user_message, ai_response, created_at \
             FROM conversations \
             WHERE user_id = ? AND created_at >= ? AND created_at < ? \
             ORDER BY created_at ASC, id ASC",
        )
        .bind(user.0)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query conversations by day")?;

        rows.iter().map(turn_from_row).collect()
    }

    async fn delete_turn(&self, user: UserId, turn_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = ? AND user_id = ?")
            .bind(turn_id)
            .bind(user.0)
            .execute(&self.pool)
            .await
            .context("Failed to delete conversation turn")?;
        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Diary entries
// =============================================================================

const ENTRY_COLUMNS: &str =
    "id, user_id, title, body, mood, mood_emoji, created_at, updated_at FROM diary_entries";

#[async_trait]
impl DiaryRepository for SqliteStore {
    async fn entry_for_day(&self, user: UserId, day: NaiveDate) -> Result<Option<DiaryEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} WHERE user_id = ? AND entry_day = ?"
        ))
        .bind(user.0)
        .bind(day.format(DAY_FORMAT).to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query diary entry by day")?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn insert_entry(&self, entry: &NewDiaryEntry) -> Result<InsertOutcome> {
        let created_at = format_ts(entry.created_at);
        let result = sqlx::query(
            "INSERT INTO diary_entries \
             (user_id, entry_day, title, body, mood, mood_emoji, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (user_id, entry_day) DO NOTHING",
        )
        .bind(entry.user_id.0)
        .bind(entry.day.format(DAY_FORMAT).to_string())
        .bind(&entry.title)
        .bind(&entry.body)
        .bind(entry.mood.as_str())
        .bind(entry.mood.emoji())
        .bind(&created_at)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .context("Failed to insert diary entry")?;

        if result.rows_affected() == 1 {
            return Ok(InsertOutcome::Created(DiaryEntry {
                id: result.last_insert_rowid(),
                user_id: entry.user_id,
                title: Some(entry.title.clone()),
                body: entry.body.clone(),
                mood: entry.mood,
                mood_emoji: entry.mood.emoji().to_string(),
                created_at: entry.created_at,
                updated_at: entry.created_at,
            }));
        }

        tracing::debug!(
            user_id = %entry.user_id,
            day = %entry.day,
            "Diary insert rejected by uniqueness constraint"
        );
        match self.entry_for_day(entry.user_id, entry.day).await? {
            Some(existing) => Ok(InsertOutcome::Existing(existing)),
            None => anyhow::bail!(
                "diary entry for user {} on {} conflicted but is no longer present",
                entry.user_id,
                entry.day
            ),
        }
    }

    async fn get_entry(&self, user: UserId, entry_id: i64) -> Result<Option<DiaryEntry>> {
        let row = sqlx::query(&format!("SELECT {ENTRY_COLUMNS} WHERE id = ? AND user_id = ?"))
            .bind(entry_id)
            .bind(user.0)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to query diary entry")?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn list_entries(&self, user: UserId) -> Result<Vec<DiaryEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} WHERE user_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(user.0)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list diary entries")?;

        rows.iter().map(entry_from_row).collect()
    }

    async fn update_entry(
        &self,
        user: UserId,
        entry_id: i64,
        edit: &DiaryEdit,
    ) -> Result<Option<DiaryEntry>> {
        let mood = edit.mood.unwrap_or_default();
        let result = sqlx::query(
            "UPDATE diary_entries \
             SET title = ?, body = ?, mood = ?, mood_emoji = ?, updated_at = ? \
             WHERE id = ? AND user_id = ?",
        )
        .bind(edit.title.as_deref())
        .bind(&edit.body)
        .bind(mood.as_str())
        .bind(mood.emoji())
        .bind(format_ts(Local::now().naive_local()))
        .bind(entry_id)
        .bind(user.0)
        .execute(&self.pool)
        .await
        .context("Failed to update diary entry")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_entry(user, entry_id).await
    }

    async fn delete_entry(&self, user: UserId, entry_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM diary_entries WHERE id = ? AND user_id = ?")
            .bind(entry_id)
            .bind(user.0)
            .execute(&self.pool)
            .await
            .context("Failed to delete diary entry")?;
        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Memory facts
// =============================================================================

#[async_trait]
impl MemoryRepository for SqliteStore {
    async fn fact_exists(&self, user: UserId, fact: &str) -> Result<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM memory_facts WHERE user_id = ? AND fact = ?")
                .bind(user.0)
                .bind(fact)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to query memory fact")?;
        Ok(found.is_some())
    }

    async fn insert_fact(
        &self,
        user: UserId,
        fact: &str,
        at: NaiveDateTime,
    ) -> Result<Option<MemoryFact>> {
        let result = sqlx::query(
            "INSERT INTO memory_facts (user_id, fact, created_at) VALUES (?, ?, ?) \
             ON CONFLICT (user_id, fact) DO NOTHING",
        )
        .bind(user.0)
        .bind(fact)
        .bind(format_ts(at))
        .execute(&self.pool)
        .await
        .context("Failed to insert memory fact")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(MemoryFact {
            id: result.last_insert_rowid(),
            user_id: user,
            fact: fact.to_string(),
            created_at: at,
        }))
    }

    async fn list_facts(&self, user: UserId) -> Result<Vec<MemoryFact>> {
        let rows = sqlx::query(
            "SELECT id, user_id, fact, created_at FROM memory_facts \
             WHERE user_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(user.0)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list memory facts")?;

        rows.iter()
            .map(|row| {
                Ok(MemoryFact {
                    id: row.try_get("id")?,
                    user_id: UserId(row.try_get("user_id")?),
                    fact: row.try_get("fact")?,
                    created_at: parse_ts(&row.try_get::<String, _>("created_at")?)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl UserDirectory for SqliteStore {
    async fn list_users(&self) -> Result<Vec<UserId>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list users")?;
        Ok(ids.into_iter().map(UserId).collect())
    }
}

// =============================================================================
// Row mapping
// =============================================================================

fn format_ts(ts: NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

fn parse_ts(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TS_FORMAT)
        .with_context(|| format!("Invalid stored timestamp `{raw}`"))
}

/// Half-open `[day 00:00, next day 00:00)` in storage format.
fn day_bounds(day: NaiveDate) -> (String, String) {
    let start = day.and_time(NaiveTime::default());
    (format_ts(start), format_ts(start + Duration::days(1)))
}

fn turn_from_row(row: &SqliteRow) -> Result<ConversationTurn> {
    Ok(ConversationTurn {
        id: row.try_get("id")?,
        user_id: UserId(row.try_get("user_id")?),
        user_message: row.try_get("user_message")?,
        ai_response: row.try_get("ai_response")?,
        created_at: parse_ts(&row.try_get::<String, _>("created_at")?)?,
    })
}

fn entry_from_row(row: &SqliteRow) -> Result<DiaryEntry> {
    let mood_tag: String = row.try_get("mood")?;
    let (mood, mood_emoji) = match mood_tag.parse::<Mood>() {
        Ok(mood) => (mood, row.try_get::<String, _>("mood_emoji")?),
        Err(_) => {
            tracing::warn!("Unknown stored mood `{}`, reading as neutral", mood_tag);
            (Mood::Neutral, Mood::Neutral.emoji().to_string())
        }
    };

    Ok(DiaryEntry {
        id: row.try_get("id")?,
        user_id: UserId(row.try_get("user_id")?),
        title: row.try_get("title")?,
        body: row.try_get("body")?,
        mood,
        mood_emoji,
        created_at: parse_ts(&row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_ts(&row.try_get::<String, _>("updated_at")?)?,
    })
}
