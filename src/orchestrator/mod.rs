pub mod batch_processor;
pub mod evaluation_service;

pub use batch_processor::{BatchProcessor, BatchReport, GenerationRequest, RequestOutcome};
pub use evaluation_service::EvaluationService;
