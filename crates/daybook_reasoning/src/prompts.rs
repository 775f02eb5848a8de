//! Prompt templates for the diary and memory pipelines.
//!
//! Only user-authored text goes into the narrative prompt; assistant replies
//! are excluded so the diary reads as the user's own voice.

use daybook_core::Mood;

/// Title prompts only see this many characters of the narrative.
pub const TITLE_EXCERPT_CHARS: usize = 500;

const NARRATIVE_GUIDELINES: &str = r#"IMPORTANT GUIDELINES:
1. Write in first person as if the person wrote it themselves.
2. Focus ONLY on the actual experiences, thoughts, and feelings expressed.
3. DO NOT mention any AI, chatbot, or conversation with an assistant.
4. DO NOT exaggerate or embellish beyond what's actually expressed.
5. Make it sound like a natural diary entry a person would write.
6. Keep it between 200-300 words and make it feel personal and reflective.
7. Only include topics and feelings that were actually mentioned.
8. Maintain a consistent tone throughout the entry."#;

/// Narrative prompt over the day's user messages, in order.
pub fn narrative_prompt(user_messages: &[&str]) -> String {
    format!(
        "Write an authentic personal diary entry based on these thoughts and experiences:\n{}\n\n{}\n\nDiary entry:",
        user_messages.join("\n"),
        NARRATIVE_GUIDELINES
    )
}

pub fn mood_prompt(narrative: &str) -> String {
    let tags = Mood::ALL
        .iter()
        .map(|m| format!("\"{}\"", m.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Analyze the following diary entry and determine the overall mood.\n\
         Return ONLY one of these values:\n{tags}\n\n\
         Choose the mood that best represents the emotional state in the text.\n\n\
         Diary entry: \"{narrative}\"\n\nMood:"
    )
}

pub fn title_prompt(narrative: &str) -> String {
    format!(
        "Generate a short, engaging title (5-7 words) for this diary entry.\n\
         The title should capture the main theme or emotion of the entry.\n\n\
         Diary entry: \"{}...\"\n\nTitle:",
        truncate_chars(narrative, TITLE_EXCERPT_CHARS)
    )
}

/// Single-turn prompt asking for one durable fact or the sentinel.
pub fn extraction_prompt(user_message: &str, ai_response: &str, sentinel: &str) -> String {
    format!(
        "You maintain long-term notes about a user. Read this single exchange and \
         extract at most ONE durable fact about the user worth remembering in future \
         conversations (name, relationships, pets, job, places, lasting preferences, \
         ongoing goals).\n\n\
         Rules:\n\
         1. Only state what the user explicitly said. Do not guess.\n\
         2. Ignore greetings, small talk and passing moods.\n\
         3. Reply with one short sentence and nothing else.\n\
         4. If there is nothing worth remembering, reply with exactly: {sentinel}\n\n\
         User: \"{user_message}\"\n\
         Assistant: \"{ai_response}\"\n\n\
         Fact:"
    )
}

/// Longest prefix of at most `max` chars, never splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
