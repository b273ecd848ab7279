pub mod badges;
pub mod clients;
pub mod config;
pub mod core;
pub mod decode;
pub mod domain;
pub mod error;
pub mod evaluator;
pub mod fallback;
pub mod generator;
pub mod json_utils;
pub mod progress;
pub mod prompts;
pub mod store;
pub mod tutor;

// Convenient re-exports
pub use crate::core::{LowLevelClient, ModelClient, RetryPolicy};
pub use domain::{AiFeedback, AnswerValue, LessonData, Level, Question, SectionData, Skill};
pub use evaluator::AnswerEvaluator;
pub use generator::{RequestTokens, SectionGenerator};
pub use json_utils::parse_recovering;
pub use progress::User;
pub use tutor::Tutor;
