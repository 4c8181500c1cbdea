pub mod difficulty;
pub mod loaders;
pub mod question;
pub mod submission;

pub use difficulty::Difficulty;
pub use loaders::{load_answer_sheet};
pub use question::{EvaluationPackage, GeneratedQuestion, OptionSet, QuestionSpec, QuestionType};
pub use submission::{AnswerSheet, AnswerSubmission, EssayFeedback, GradingResult};
