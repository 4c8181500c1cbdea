//! 远程助手网关
//!
//! 核心流程只通过这个 trait 访问远程助手 / 向量库。所有操作都是计费、限流的远程调用，
//! 调用方不能在没有退避的紧循环里调用。

use std::fmt;

use async_trait::async_trait;

use crate::error::RemoteResult;

/// 远程会话（thread）句柄，由单个会话流程独占
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationHandle(String);

impl ConversationHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 一次运行的句柄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    pub conversation: ConversationHandle,
    pub run_id: String,
}

/// 运行状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Pending,
    Completed,
    /// 失败，附带远程状态名
    Failed(String),
}

/// 远程助手网关
#[async_trait]
pub trait AssistantGateway: Send + Sync {
    /// 创建助手，返回 assistant_id
    async fn create_assistant(&self, name: &str) -> RemoteResult<String>;

    /// 把知识库绑定到助手（幂等）
    async fn bind_corpus(&self, assistant_id: &str, corpus_id: &str) -> RemoteResult<()>;

    /// 创建知识库（向量库），返回 corpus_id
    async fn create_corpus(&self, name: &str) -> RemoteResult<String>;

    /// 上传文件并加入知识库，返回 file_id
    async fn attach_file(&self, corpus_id: &str, filename: &str, bytes: Vec<u8>) -> RemoteResult<String>;

    /// 以初始提示词创建新会话
    async fn create_conversation(&self, initial_prompt: &str) -> RemoteResult<ConversationHandle>;

    /// 向会话追加一条用户消息
    async fn append_message(&self, conversation: &ConversationHandle, text: &str) -> RemoteResult<()>;

    /// 在会话上启动一次运行
    async fn run(&self, conversation: &ConversationHandle, assistant_id: &str) -> RemoteResult<RunHandle>;

    /// 查询运行状态（不阻塞）
    async fn poll(&self, run: &RunHandle) -> RemoteResult<RunStatus>;

    /// 最近一条助手回复的文本，助手尚未回复时为空
    async fn latest_response_text(&self, conversation: &ConversationHandle) -> RemoteResult<String>;

    async fn delete_assistant(&self, assistant_id: &str) -> RemoteResult<()>;

    async fn delete_corpus(&self, corpus_id: &str) -> RemoteResult<()>;

    async fn delete_file(&self, file_id: &str) -> RemoteResult<()>;
}
