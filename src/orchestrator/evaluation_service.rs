//! 评测服务 - 编排层
//!
//! ## 职责
//!
//! 对调用方暴露两个操作：生成评测、批改作答。
//!
//! - 持有注入的网关，不创建全局客户端
//! - 同一助手同一时间只允许一个会话驱动（按助手加锁，空闲的锁会被回收）
//! - 每次调用使用自己的取消令牌，`cancel_all` 只影响当时已派生的令牌
//! - 向下委托 workflow 完成单次流程

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::clients::{AssistantGateway, ConversationHandle};
use crate::config::Config;
use crate::error::{GenerationError, GradingError};
use crate::models::{AnswerSubmission, EvaluationPackage, GradingResult, QuestionSpec};
use crate::workflow::{GenerationSession, GradingFlow, SessionCtx, SessionOptions};

/// 评测服务
pub struct EvaluationService<G: ?Sized> {
    gateway: Arc<G>,
    options: SessionOptions,
    default_essay_weight: f64,
    assistant_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    /// 当前一代的根令牌，每次调用派生子令牌
    root_cancel: StdMutex<CancellationToken>,
}

impl<G> EvaluationService<G>
where
    G: AssistantGateway + ?Sized,
{
    pub fn new(gateway: Arc<G>, config: &Config) -> Self {
        Self::with_options(gateway, SessionOptions::from_config(config), config.essay_weight)
    }

    pub fn with_options(gateway: Arc<G>, options: SessionOptions, default_essay_weight: f64) -> Self {
        let root_cancel = StdMutex::new(options.cancel.clone());
        Self {
            gateway,
            options,
            default_essay_weight,
            assistant_locks: Mutex::new(HashMap::new()),
            root_cancel,
        }
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// 配置的论述题权重
    pub fn default_essay_weight(&self) -> f64 {
        self.default_essay_weight
    }

    /// 为一次调用派生取消令牌，`cancel_all` 会取消它
    pub fn cancellation_token(&self) -> CancellationToken {
        self.root_cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .child_token()
    }

    /// 取消当前正在运行的会话，之后启动的会话不受影响
    pub fn cancel_all(&self) {
        let mut root = self.root_cancel.lock().unwrap_or_else(PoisonError::into_inner);
        root.cancel();
        *root = CancellationToken::new();
    }

    /// 当前登记的助手锁数量
    pub async fn tracked_assistants(&self) -> usize {
        self.assistant_locks.lock().await.len()
    }

    /// 持有助手锁执行 `task`，结束后回收空闲的锁
    async fn with_assistant_lock<T>(&self, assistant_id: &str, task: impl Future<Output = T>) -> T {
        let lock = {
            let mut locks = self.assistant_locks.lock().await;
            locks
                .entry(assistant_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let result = {
            let _guard = lock.lock().await;
            debug!("[{}] 已获得助手锁", assistant_id);
            task.await
        };
        drop(lock);

        let mut locks = self.assistant_locks.lock().await;
        if locks
            .get(assistant_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(assistant_id);
        }
        result
    }

    fn options_with(&self, cancel: CancellationToken) -> SessionOptions {
        self.options.clone().with_cancel(cancel)
    }

    /// 生成评测
    pub async fn generate_evaluation(
        &self,
        assistant_id: &str,
        spec: QuestionSpec,
    ) -> Result<EvaluationPackage, GenerationError> {
        let ctx = SessionCtx::new(assistant_id, 1);
        self.generate_with_conversation(&ctx, &spec)
            .await
            .map(|(package, _)| package)
    }

    /// 生成评测，同时返回最后使用的会话
    pub async fn generate_with_conversation(
        &self,
        ctx: &SessionCtx,
        spec: &QuestionSpec,
    ) -> Result<(EvaluationPackage, ConversationHandle), GenerationError> {
        self.generate_with_cancel(ctx, spec, self.cancellation_token()).await
    }

    /// 使用调用方的取消令牌生成评测
    pub async fn generate_with_cancel(
        &self,
        ctx: &SessionCtx,
        spec: &QuestionSpec,
        cancel: CancellationToken,
    ) -> Result<(EvaluationPackage, ConversationHandle), GenerationError> {
        if spec.total() == 0 {
            return Err(GenerationError::EmptyRequest);
        }

        let options = self.options_with(cancel);
        self.with_assistant_lock(&ctx.assistant_id, async {
            GenerationSession::new(self.gateway.as_ref(), &options)
                .run(ctx, spec)
                .await
        })
        .await
    }

    /// 批改作答
    pub async fn grade_submission(
        &self,
        assistant_id: &str,
        answers: &[AnswerSubmission],
        essay_weight: f64,
    ) -> Result<GradingResult, GradingError> {
        self.grade_with_cancel(assistant_id, answers, essay_weight, self.cancellation_token())
            .await
    }

    /// 使用调用方的取消令牌批改作答
    pub async fn grade_with_cancel(
        &self,
        assistant_id: &str,
        answers: &[AnswerSubmission],
        essay_weight: f64,
        cancel: CancellationToken,
    ) -> Result<GradingResult, GradingError> {
        self.with_assistant_lock(assistant_id, async {
            GradingFlow::new(self.gateway.as_ref(), self.options.poll)
                .with_cancel(cancel)
                .run(assistant_id, answers, essay_weight)
                .await
        })
        .await
    }
}
