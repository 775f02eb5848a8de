//! Diary synthesis: one narrative entry per user per day.
//!
//! Pipeline: idempotency check, aggregate the day's turns, generate the
//! narrative, classify mood, generate a title, persist. Only the narrative is
//! essential; mood and title degrade to configured fallbacks.

use crate::llm::{GenerationError, TextGenerator};
use crate::prompts;
use chrono::NaiveDate;
use daybook_core::{
    ConversationRepository, DayConversations, DiaryEntry, DiaryRepository, FallbackConfig,
    InsertOutcome, Mood, NewDiaryEntry, UserId,
};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutcome {
    Created(DiaryEntry),
    /// An entry for this day was already there; nothing was generated.
    Existing(DiaryEntry),
    Skipped(SkippedReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkippedReason {
    NoConversations,
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("narrative generation failed: {0}")]
    Narrative(#[source] GenerationError),
    #[error("narrative generation returned no text")]
    EmptyNarrative,
    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

pub struct DiarySynthesizer {
    conversations: Arc<dyn ConversationRepository>,
    diary: Arc<dyn DiaryRepository>,
    generator: Arc<dyn TextGenerator>,
    fallbacks: FallbackConfig,
}

impl DiarySynthesizer {
    pub fn new(
        conversations: Arc<dyn ConversationRepository>,
        diary: Arc<dyn DiaryRepository>,
        generator: Arc<dyn TextGenerator>,
        fallbacks: FallbackConfig,
    ) -> Self {
        Self {
            conversations,
            diary,
            generator,
            fallbacks,
        }
    }

    /// Produce the entry for `(user, day)` if it does not exist yet.
    ///
    /// Safe to call any number of times, concurrently included: the store's
    /// uniqueness constraint decides the winner and every caller gets the
    /// surviving row back.
    pub async fn synthesize(
        &self,
        user: UserId,
        day: NaiveDate,
    ) -> Result<SynthesisOutcome, SynthesisError> {
        if let Some(existing) = self.diary.entry_for_day(user, day).await? {
            tracing::debug!(user_id = %user, %day, "Diary entry already present");
            return Ok(SynthesisOutcome::Existing(existing));
        }

        let turns = self.conversations.turns_for_day(user, day).await?;
        let conversations = DayConversations::new(day, turns);
        if conversations.is_empty() {
            tracing::debug!(user_id = %user, %day, "No conversations, skipping");
            return Ok(SynthesisOutcome::Skipped(SkippedReason::NoConversations));
        }

        let narrative = self.generate_narrative(&conversations).await?;
        let mood = self.classify_mood(&narrative).await;
        let title = self.generate_title(&narrative).await;

        let entry = NewDiaryEntry::for_day(user, day, title, narrative, mood);
        match self.diary.insert_entry(&entry).await? {
            InsertOutcome::Created(created) => {
                tracing::info!(
                    user_id = %user,
                    day = %conversations.day,
                    entry_id = created.id,
                    mood = %created.mood,
                    turns = conversations.count(),
                    "Diary entry created"
                );
                Ok(SynthesisOutcome::Created(created))
            }
            InsertOutcome::Existing(existing) => {
                tracing::info!(user_id = %user, %day, "Lost diary insert race, keeping existing entry");
                Ok(SynthesisOutcome::Existing(existing))
            }
        }
    }

    async fn generate_narrative(
        &self,
        conversations: &DayConversations,
    ) -> Result<String, SynthesisError> {
        let prompt = prompts::narrative_prompt(&conversations.user_messages());
        let narrative = self
            .generator
            .generate(&prompt)
            .await
            .map_err(SynthesisError::Narrative)?;

        let narrative = narrative.trim();
        if narrative.is_empty() {
            return Err(SynthesisError::EmptyNarrative);
        }
        Ok(narrative.to_string())
    }

    /// Never fails: unusable output or a failed call yields the default mood.
    pub async fn classify_mood(&self, narrative: &str) -> Mood {
        let fallback = self.fallbacks.default_mood;
        match self.generator.generate(&prompts::mood_prompt(narrative)).await {
            Ok(raw) => {
                let mood = Mood::from_model_output(&raw, fallback);
                tracing::debug!(raw = raw.trim(), %mood, "Mood classified");
                mood
            }
            Err(e) => {
                tracing::warn!("Mood classification failed (non-fatal): {}", e);
                fallback
            }
        }
    }

    /// Never fails: empty output or a failed call yields the default title.
    pub async fn generate_title(&self, narrative: &str) -> String {
        match self.generator.generate(&prompts::title_prompt(narrative)).await {
            Ok(raw) => clean_title(&raw).unwrap_or_else(|| self.fallbacks.default_title.clone()),
            Err(e) => {
                tracing::warn!("Title generation failed (non-fatal): {}", e);
                self.fallbacks.default_title.clone()
            }
        }
    }
}

/// First non-empty line, without a `Title:` label or wrapping quotes.
fn clean_title(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = line
        .strip_prefix("Title:")
        .or_else(|| line.strip_prefix("title:"))
        .unwrap_or(line)
        .trim();
    let line = line
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '*' | '“' | '”'))
        .trim();
    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}
