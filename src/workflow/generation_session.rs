//! 出题会话 - 流程层
//!
//! 核心职责：定义"一次出题请求"的完整流程
//!
//! 流程顺序：
//! 1. 构建提示词并创建会话
//! 2. 运行助手 → 轮询到结束 → 读取回复
//! 3. 回复含题目标记 → 解析、校验并返回
//! 4. 否则在同一会话中追加提示词；同一会话失败次数达到上限后换新会话
//! 5. 总次数用尽 → `GenerationError::Failed`

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::clients::{AssistantGateway, ConversationHandle};
use crate::config::Config;
use crate::error::GenerationError;
use crate::models::{EvaluationPackage, QuestionSpec};
use crate::services::marker_grammar::{self, build_generation_prompt, has_question_marker};
use crate::services::response_parser::{parse_generation_response, validate_questions};
use crate::services::run_poller::{run_to_completion, PollSettings, RunOutcome};
use crate::services::ResponseArchive;
use crate::utils::logging::truncate_text;
use crate::workflow::session_ctx::SessionCtx;

/// 出题会话参数
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// 总尝试次数
    pub max_attempts: u32,
    /// 同一会话内的尝试次数上限
    pub max_thread_attempts: u32,
    pub poll: PollSettings,
    pub cancel: CancellationToken,
    /// 被拒回复归档（可选）
    pub archive: Option<ResponseArchive>,
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            max_thread_attempts: config.max_thread_attempts.max(1),
            poll: PollSettings::from_config(config),
            cancel: CancellationToken::new(),
            archive: config.rejected_log_file.as_ref().map(ResponseArchive::with_path),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// 出题会话
///
/// - 每次调用独占自己的会话句柄和计数器
/// - 不持有任何远程资源
/// - 远程错误不重试，直接返回
pub struct GenerationSession<'a, G: ?Sized> {
    gateway: &'a G,
    options: &'a SessionOptions,
}

impl<'a, G> GenerationSession<'a, G>
where
    G: AssistantGateway + ?Sized,
{
    pub fn new(gateway: &'a G, options: &'a SessionOptions) -> Self {
        Self { gateway, options }
    }

    /// 运行出题流程，成功时返回评测包和最后使用的会话
    pub async fn run(
        &self,
        ctx: &SessionCtx,
        spec: &QuestionSpec,
    ) -> Result<(EvaluationPackage, ConversationHandle), GenerationError> {
        if spec.total() == 0 {
            return Err(GenerationError::EmptyRequest);
        }

        let prompt = build_generation_prompt(spec);
        info!("{} 📝 开始出题: {}", ctx, marker_grammar::describe_request(spec));
        debug!("{} 提示词长度: {} 字符", ctx, prompt.len());

        let mut conversation: Option<ConversationHandle> = None;
        let mut thread_attempts = 0u32;

        for attempt in 0..self.options.max_attempts {
            if self.options.cancel.is_cancelled() {
                warn!("{} ⏹️ 出题已取消", ctx);
                return Err(GenerationError::Cancelled);
            }

            let current = match conversation.take() {
                Some(existing) if thread_attempts < self.options.max_thread_attempts => existing,
                _ => {
                    thread_attempts = 0;
                    let created = self.gateway.create_conversation(&prompt).await?;
                    debug!("{} 新建会话 {}", ctx, created);
                    created
                }
            };

            info!(
                "{} 🤖 第 {}/{} 次尝试 (会话 {})",
                ctx,
                attempt + 1,
                self.options.max_attempts,
                current
            );

            let outcome = run_to_completion(
                self.gateway,
                &current,
                &ctx.assistant_id,
                self.options.poll,
                &self.options.cancel,
            )
            .await?;
            if outcome == RunOutcome::Cancelled {
                warn!("{} ⏹️ 出题已取消", ctx);
                return Err(GenerationError::Cancelled);
            }

            let response = self.gateway.latest_response_text(&current).await?;

            if has_question_marker(&response) {
                let package = validate_questions(parse_generation_response(&response));
                info!(
                    "{} ✅ 第 {} 次尝试成功: '{}'，共 {} 道题",
                    ctx,
                    attempt + 1,
                    package.name,
                    package.questions.len()
                );
                return Ok((package, current));
            }

            warn!(
                "{} ⚠️ 回复中没有题目标记: {}",
                ctx,
                truncate_text(response.trim(), 80)
            );
            self.archive_rejected(ctx, &current, attempt, &response);

            self.gateway.append_message(&current, &prompt).await?;
            thread_attempts += 1;
            conversation = Some(current);
        }

        error!(
            "{} ❌ 尝试 {} 次后仍未生成合法题目",
            ctx, self.options.max_attempts
        );
        Err(GenerationError::Failed {
            attempts: self.options.max_attempts,
        })
    }

    fn archive_rejected(&self, ctx: &SessionCtx, conversation: &ConversationHandle, attempt: u32, response: &str) {
        if let Some(archive) = &self.options.archive {
            if let Err(e) = archive.record(&ctx.assistant_id, conversation.id(), attempt, response) {
                warn!("{} 写入归档失败 {}: {:#}", ctx, archive.path().display(), e);
            }
        }
    }
}
