//! Memory extraction: after each conversational turn, ask for one durable
//! fact about the user and store it unless it is already known.
//!
//! Best-effort. A failed call or store never reaches the chat path; the turn
//! simply yields no fact.

use crate::llm::TextGenerator;
use crate::prompts;
use anyhow::{Context, Result};
use daybook_core::{Clock, FallbackConfig, MemoryFact, MemoryRepository, SystemClock, UserId};
use std::sync::Arc;

pub struct MemoryExtractor {
    memory: Arc<dyn MemoryRepository>,
    generator: Arc<dyn TextGenerator>,
    sentinel: String,
    clock: Arc<dyn Clock>,
}

impl MemoryExtractor {
    pub fn new(
        memory: Arc<dyn MemoryRepository>,
        generator: Arc<dyn TextGenerator>,
        fallbacks: &FallbackConfig,
    ) -> Self {
        Self {
            memory,
            generator,
            sentinel: fallbacks.none_sentinel.clone(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the newly stored fact, or `None` when the turn held nothing
    /// new or anything went wrong.
    pub async fn extract_and_store(
        &self,
        user: UserId,
        user_message: &str,
        ai_response: &str,
    ) -> Option<MemoryFact> {
        match self.extract_inner(user, user_message, ai_response).await {
            Ok(fact) => fact,
            Err(e) => {
                tracing::warn!(user_id = %user, "Memory extraction failed (non-fatal): {:#}", e);
                None
            }
        }
    }

    async fn extract_inner(
        &self,
        user: UserId,
        user_message: &str,
        ai_response: &str,
    ) -> Result<Option<MemoryFact>> {
        let prompt = prompts::extraction_prompt(user_message, ai_response, &self.sentinel);
        let raw = self
            .generator
            .generate(&prompt)
            .await
            .context("Extraction call failed")?;

        if is_none_sentinel(&raw, &self.sentinel) {
            tracing::debug!(user_id = %user, "Nothing worth remembering in this turn");
            return Ok(None);
        }
        let Some(fact) = clean_fact(&raw) else {
            return Ok(None);
        };

        if self.memory.fact_exists(user, &fact).await? {
            tracing::debug!(user_id = %user, "Fact already known");
            return Ok(None);
        }

        let stored = self.memory.insert_fact(user, &fact, self.clock.now()).await?;
        if let Some(stored) = &stored {
            tracing::info!(user_id = %user, fact_id = stored.id, "Stored memory fact");
        }
        Ok(stored)
    }
}

/// Empty output, the sentinel itself, or any output mentioning it in any case.
fn is_none_sentinel(raw: &str, sentinel: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty()
        || trimmed == sentinel
        || trimmed.to_lowercase().contains(&sentinel.to_lowercase())
}

/// First non-empty line with a `Fact:` label, list markers and wrapping
/// quotes removed.
fn clean_fact(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = line
        .strip_prefix("Fact:")
        .or_else(|| line.strip_prefix("fact:"))
        .unwrap_or(line)
        .trim();
    let line = strip_list_marker(line);
    let line = line
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '“' | '”'))
        .trim();
    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

fn strip_list_marker(line: &str) -> &str {
    for marker in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest.trim_start();
        }
    }
    // Numbered: "1. " / "2) "
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return rest.trim_start();
        }
    }
    line
}
