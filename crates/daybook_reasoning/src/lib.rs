pub mod diary;
pub mod extraction;
pub mod llm;
pub mod prompts;
pub mod providers;
pub mod scheduler;
pub mod ticker;

pub use diary::{DiarySynthesizer, SkippedReason, SynthesisError, SynthesisOutcome};
pub use extraction::MemoryExtractor;
pub use llm::{GenerationError, TextGenerator};
pub use scheduler::{DiaryScheduler, RunReport, SchedulerState};
pub use ticker::schedule_daily;
