pub mod generation_session;
pub mod grading_flow;
pub mod session_ctx;

pub use generation_session::{GenerationSession, SessionOptions};
pub use grading_flow::GradingFlow;
pub use session_ctx::SessionCtx;
