//! OpenAI Assistants 网关
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 调用 Assistants / Vector Stores / Files API
//! - 使用带超时的 `reqwest` 客户端，避免单个请求无限挂起
//! - 兼容 OpenAI API 的服务可通过 `openai_api_base` 切换

#![allow(deprecated)]

use async_openai::{
    config::OpenAIConfig,
    traits::RequestOptionsBuilder,
    types::assistants::{
        AssistantToolFileSearchResources, AssistantTools, AssistantToolsFileSearch,
        CreateAssistantRequestArgs, CreateMessageRequestArgs, CreateRunRequestArgs,
        CreateThreadRequestArgs, MessageContent, MessageRole, ModifyAssistantRequestArgs,
        RunStatus as OpenAiRunStatus,
    },
    types::files::{CreateFileRequestArgs, FileInput, FilePurpose},
    types::vectorstores::{CreateVectorStoreFileRequestArgs, CreateVectorStoreRequestArgs},
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::clients::assistant_gateway::{AssistantGateway, ConversationHandle, RunHandle, RunStatus};
use crate::config::Config;
use crate::error::{RemoteError, RemoteResult};

/// 基于 async-openai 的远程助手网关
///
/// 职责：
/// - 只做远程调用的一对一委托
/// - 不重试、不解析题目
/// - 由调用方显式构造并注入，没有全局客户端
pub struct OpenAiGateway {
    client: Client<OpenAIConfig>,
    model_name: String,
    instructions: String,
}

impl OpenAiGateway {
    /// 创建新的网关
    pub fn new(config: &Config) -> RemoteResult<Self> {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(&config.openai_api_base);

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|source| RemoteError::Http {
                operation: "build_http_client",
                source,
            })?;

        let client = Client::with_config(openai_config).with_http_client(http_client);

        Ok(Self {
            client,
            model_name: config.assistant_model.clone(),
            instructions: config.assistant_instructions.clone(),
        })
    }
}

fn api_err(operation: &'static str) -> impl FnOnce(async_openai::error::OpenAIError) -> RemoteError {
    move |e| {
        warn!("OpenAI API 调用失败 ({}): {}", operation, e);
        RemoteError::api(operation, e)
    }
}

fn ensure_deleted(operation: &'static str, id: &str, deleted: bool) -> RemoteResult<()> {
    if deleted {
        Ok(())
    } else {
        Err(RemoteError::Rejected {
            operation,
            message: format!("{} 未被删除", id),
        })
    }
}

fn map_run_status(status: &OpenAiRunStatus) -> RunStatus {
    match status {
        OpenAiRunStatus::Queued
        | OpenAiRunStatus::InProgress
        | OpenAiRunStatus::RequiresAction
        | OpenAiRunStatus::Cancelling => RunStatus::Pending,
        OpenAiRunStatus::Completed => RunStatus::Completed,
        OpenAiRunStatus::Failed => RunStatus::Failed("failed".to_string()),
        OpenAiRunStatus::Cancelled => RunStatus::Failed("cancelled".to_string()),
        OpenAiRunStatus::Expired => RunStatus::Failed("expired".to_string()),
        OpenAiRunStatus::Incomplete => RunStatus::Failed("incomplete".to_string()),
    }
}

#[async_trait]
impl AssistantGateway for OpenAiGateway {
    async fn create_assistant(&self, name: &str) -> RemoteResult<String> {
        debug!("创建助手: {}，模型: {}", name, self.model_name);

        let request = CreateAssistantRequestArgs::default()
            .name(name)
            .instructions(self.instructions.as_str())
            .model(self.model_name.as_str())
            .tools(vec![
                AssistantTools::CodeInterpreter,
                AssistantTools::FileSearch(AssistantToolsFileSearch::default()),
            ])
            .build()
            .map_err(api_err("create_assistant"))?;

        let assistant = self
            .client
            .assistants()
            .create(request)
            .await
            .map_err(api_err("create_assistant"))?;

        Ok(assistant.id)
    }

    async fn bind_corpus(&self, assistant_id: &str, corpus_id: &str) -> RemoteResult<()> {
        debug!("绑定知识库 {} → 助手 {}", corpus_id, assistant_id);

        let request = ModifyAssistantRequestArgs::default()
            .tool_resources(AssistantToolFileSearchResources {
                vector_store_ids: vec![corpus_id.to_string()],
            })
            .build()
            .map_err(api_err("bind_corpus"))?;

        self.client
            .assistants()
            .update(assistant_id, request)
            .await
            .map_err(api_err("bind_corpus"))?;

        Ok(())
    }

    async fn create_corpus(&self, name: &str) -> RemoteResult<String> {
        let request = CreateVectorStoreRequestArgs::default()
            .name(name)
            .build()
            .map_err(api_err("create_corpus"))?;

        let store = self
            .client
            .vector_stores()
            .create(request)
            .await
            .map_err(api_err("create_corpus"))?;

        debug!("已创建向量库: {}", store.id);
        Ok(store.id)
    }

    async fn attach_file(&self, corpus_id: &str, filename: &str, bytes: Vec<u8>) -> RemoteResult<String> {
        debug!("上传文件 {} ({} 字节) → 向量库 {}", filename, bytes.len(), corpus_id);

        let request = CreateFileRequestArgs::default()
            .file(FileInput::from_vec_u8(filename.to_string(), bytes))
            .purpose(FilePurpose::Assistants)
            .build()
            .map_err(api_err("upload_file"))?;

        let file = self
            .client
            .files()
            .create(request)
            .await
            .map_err(api_err("upload_file"))?;

        let attach = CreateVectorStoreFileRequestArgs::default()
            .file_id(file.id.as_str())
            .build()
            .map_err(api_err("attach_file"))?;

        self.client
            .vector_stores()
            .files(corpus_id)
            .create(attach)
            .await
            .map_err(api_err("attach_file"))?;

        Ok(file.id)
    }

    async fn create_conversation(&self, initial_prompt: &str) -> RemoteResult<ConversationHandle> {
        debug!("创建会话，提示词长度: {} 字符", initial_prompt.len());

        let message = CreateMessageRequestArgs::default()
            .role(MessageRole::User)
            .content(initial_prompt)
            .build()
            .map_err(api_err("create_conversation"))?;

        let request = CreateThreadRequestArgs::default()
            .messages(vec![message])
            .build()
            .map_err(api_err("create_conversation"))?;

        let thread = self
            .client
            .threads()
            .create(request)
            .await
            .map_err(api_err("create_conversation"))?;

        Ok(ConversationHandle::new(thread.id))
    }

    async fn append_message(&self, conversation: &ConversationHandle, text: &str) -> RemoteResult<()> {
        let request = CreateMessageRequestArgs::default()
            .role(MessageRole::User)
            .content(text)
            .build()
            .map_err(api_err("append_message"))?;

        self.client
            .threads()
            .messages(conversation.id())
            .create(request)
            .await
            .map_err(api_err("append_message"))?;

        Ok(())
    }

    async fn run(&self, conversation: &ConversationHandle, assistant_id: &str) -> RemoteResult<RunHandle> {
        let request = CreateRunRequestArgs::default()
            .assistant_id(assistant_id)
            .build()
            .map_err(api_err("run"))?;

        let run = self
            .client
            .threads()
            .runs(conversation.id())
            .create(request)
            .await
            .map_err(api_err("run"))?;

        debug!("会话 {} 启动运行 {}", conversation, run.id);

        Ok(RunHandle {
            conversation: conversation.clone(),
            run_id: run.id,
        })
    }

    async fn poll(&self, run: &RunHandle) -> RemoteResult<RunStatus> {
        let object = self
            .client
            .threads()
            .runs(run.conversation.id())
            .retrieve(&run.run_id)
            .await
            .map_err(api_err("poll"))?;

        let status = map_run_status(&object.status);
        if let (RunStatus::Failed(_), Some(last_error)) = (&status, &object.last_error) {
            warn!("运行 {} 失败: {}", run.run_id, last_error.message);
        }
        Ok(status)
    }

    async fn latest_response_text(&self, conversation: &ConversationHandle) -> RemoteResult<String> {
        let messages = self
            .client
            .threads()
            .messages(conversation.id())
            .query(&[("order", "desc"), ("limit", "20")])
            .map_err(api_err("list_messages"))?
            .list()
            .await
            .map_err(api_err("list_messages"))?;

        // 只取助手消息，避免把自己发送的提示词当成回复
        let text = messages
            .data
            .iter()
            .find(|m| m.role == MessageRole::Assistant)
            .map(|m| {
                m.content
                    .iter()
                    .filter_map(|c| match c {
                        MessageContent::Text(t) => Some(t.text.value.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        debug!("会话 {} 最新回复长度: {} 字符", conversation, text.len());
        Ok(text)
    }

    async fn delete_assistant(&self, assistant_id: &str) -> RemoteResult<()> {
        let response = self
            .client
            .assistants()
            .delete(assistant_id)
            .await
            .map_err(api_err("delete_assistant"))?;
        ensure_deleted("delete_assistant", assistant_id, response.deleted)
    }

    async fn delete_corpus(&self, corpus_id: &str) -> RemoteResult<()> {
        let response = self
            .client
            .vector_stores()
            .delete(corpus_id)
            .await
            .map_err(api_err("delete_corpus"))?;
        ensure_deleted("delete_corpus", corpus_id, response.deleted)
    }

    async fn delete_file(&self, file_id: &str) -> RemoteResult<()> {
        let response = self
            .client
            .files()
            .delete(file_id)
            .await
            .map_err(api_err("delete_file"))?;
        ensure_deleted("delete_file", file_id, response.deleted)
    }
}
