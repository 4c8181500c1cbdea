//! # Assessment Pipeline
//!
//! 基于远程助手（OpenAI Assistants + Vector Stores）的评测生成与批改核心
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 远程助手网关，只做一对一委托
//! - `AssistantGateway` - 网关 trait，核心流程只依赖它
//! - `OpenAiGateway` - 基于 async-openai 的实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `marker_grammar` - 提示词与解析器共享的标记语法
//! - `response_parser` - 回复解析与严格校验
//! - `run_poller` - 运行轮询（超时、取消）
//! - `scoring` - 本地分数计算
//! - `corpus_service` - 单元资源的创建与清理
//! - `ResponseArchive` - 被拒回复归档
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次请求"的完整流程
//! - `SessionCtx` - 上下文封装（assistant_id + 请求索引）
//! - `GenerationSession` - 出题流程（运行 → 校验 → 重试 / 换会话）
//! - `GradingFlow` - 批改流程（客观题本地判分，论述题远程打分）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/evaluation_service` - 对外接口，按助手加锁
//! - `orchestrator/batch_processor` - 批量出题，管理并发
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{AssistantGateway, ConversationHandle, OpenAiGateway, RunHandle, RunStatus};
pub use config::Config;
pub use error::{
    AppError, AppResult, CleanupReport, GenerationError, GradingError, PartialCleanupError, RemoteError,
    ResourceKind,
};
pub use models::{
    AnswerSubmission, Difficulty, EvaluationPackage, GeneratedQuestion, GradingResult, QuestionSpec,
    QuestionType,
};
pub use orchestrator::{BatchProcessor, EvaluationService, GenerationRequest};
pub use services::{CorpusService, UnitResources, MARKER_GRAMMAR_VERSION};
pub use workflow::{GenerationSession, GradingFlow, SessionCtx, SessionOptions};
