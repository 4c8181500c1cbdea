pub mod corpus_service;
pub mod marker_grammar;
pub mod response_archive;
pub mod response_parser;
pub mod run_poller;
pub mod scoring;

pub use corpus_service::{CorpusService, UnitResources};
pub use marker_grammar::MARKER_GRAMMAR_VERSION;
pub use response_archive::ResponseArchive;
pub use response_parser::{parse_generation_response, parse_grading_reply, validate_questions, GradingReply};
pub use run_poller::{run_to_completion, PollSettings, RunOutcome};
