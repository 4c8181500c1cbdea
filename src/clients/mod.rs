pub mod assistant_gateway;
pub mod openai_gateway;

pub use assistant_gateway::{AssistantGateway, ConversationHandle, RunHandle, RunStatus};
pub use openai_gateway::OpenAiGateway;
