//! Mood vocabulary
//!
//! A closed, versioned set of mood tags, each paired with one display glyph.
//! Classifier output is untrusted text and is only ever turned into a `Mood`
//! through [`Mood::from_model_output`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bumped whenever a tag or glyph is added, removed or changed.
pub const MOOD_VOCABULARY_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    VeryPositive,
    Positive,
    #[default]
    Neutral,
    Negative,
    VeryNegative,
    Anxious,
    Angry,
    Excited,
    Grateful,
    Tired,
    Confused,
    Hopeful,
    Proud,
    Loved,
    Peaceful,
}

impl Mood {
    pub const ALL: [Mood; 15] = [
        Mood::VeryPositive,
        Mood::Positive,
        Mood::Neutral,
        Mood::Negative,
        Mood::VeryNegative,
        Mood::Anxious,
        Mood::Angry,
        Mood::Excited,
        Mood::Grateful,
        Mood::Tired,
        Mood::Confused,
        Mood::Hopeful,
        Mood::Proud,
        Mood::Loved,
        Mood::Peaceful,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::VeryPositive => "very_positive",
            Mood::Positive => "positive",
            Mood::Neutral => "neutral",
            Mood::Negative => "negative",
            Mood::VeryNegative => "very_negative",
            Mood::Anxious => "anxious",
            Mood::Angry => "angry",
            Mood::Excited => "excited",
            Mood::Grateful => "grateful",
            Mood::Tired => "tired",
            Mood::Confused => "confused",
            Mood::Hopeful => "hopeful",
            Mood::Proud => "proud",
            Mood::Loved => "loved",
            Mood::Peaceful => "peaceful",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Mood::VeryPositive => "😄",
            Mood::Positive => "🙂",
            Mood::Neutral => "😐",
            Mood::Negative => "😔",
            Mood::VeryNegative => "😢",
            Mood::Anxious => "😰",
            Mood::Angry => "😠",
            Mood::Excited => "🤩",
            Mood::Grateful => "🙏",
            Mood::Tired => "😴",
            Mood::Confused => "🤔",
            Mood::Hopeful => "🌟",
            Mood::Proud => "💪",
            Mood::Loved => "❤️",
            Mood::Peaceful => "😌",
        }
    }

    /// Read-only `(tag, glyph)` pairs for display layers.
    pub fn vocabulary() -> Vec<MoodGlyph> {
        Self::ALL
            .iter()
            .map(|m| MoodGlyph {
                mood: m.as_str(),
                emoji: m.emoji(),
            })
            .collect()
    }

    /// Validate raw classifier output against the vocabulary.
    ///
    /// Accepts a single tag with surrounding whitespace, quotes, backticks or
    /// trailing punctuation. Anything else resolves to `fallback`.
    pub fn from_model_output(raw: &str, fallback: Mood) -> Mood {
        let cleaned = raw
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
            .trim_end_matches(['.', '!', ','])
            .trim()
            .to_ascii_lowercase();
        cleaned.parse().unwrap_or(fallback)
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mood tag: {0}")]
pub struct UnknownMood(pub String);

impl FromStr for Mood {
    type Err = UnknownMood;

    /// Exact tag match; no case folding.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMood(s.to_string()))
    }
}

/// One entry of the published vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoodGlyph {
    pub mood: &'static str,
    pub emoji: &'static str,
}
