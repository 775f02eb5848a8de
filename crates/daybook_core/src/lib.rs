pub mod clock;
pub mod config;
pub mod model;
pub mod mood;
pub mod repository;

pub use clock::{Clock, DailyTime, ManualClock, SystemClock};
pub use config::{
    DaybookConfig, FallbackConfig, LlmConfig, LoggingConfig, SchedulerConfig, StorageConfig,
};
pub use model::{
    end_of_day, ConversationTurn, DayConversations, DiaryEdit, DiaryEntry, InsertOutcome,
    MemoryFact, NewDiaryEntry, UserId,
};
pub use mood::{Mood, MoodGlyph, MOOD_VOCABULARY_VERSION};
pub use repository::{ConversationRepository, DiaryRepository, MemoryRepository, UserDirectory};
