//! 批量出题处理器 - 编排层
//!
//! ## 职责
//!
//! 并发执行多个出题请求，并汇总成功 / 失败统计。
//!
//! ## 设计特点
//!
//! - **并发控制**：使用 Semaphore 限制同时运行的会话数量
//! - **任务隔离**：每个请求在独立的 tokio 任务中运行
//! - **向下委托**：单个请求交给 `EvaluationService` 处理

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::clients::AssistantGateway;
use crate::error::GenerationError;
use crate::models::{EvaluationPackage, QuestionSpec};
use crate::orchestrator::evaluation_service::EvaluationService;
use crate::utils::logging;
use crate::workflow::SessionCtx;

/// 单个出题请求
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub assistant_id: String,
    pub spec: QuestionSpec,
}

impl GenerationRequest {
    pub fn new(assistant_id: impl Into<String>, spec: QuestionSpec) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            spec,
        }
    }
}

/// 单个请求的结果
#[derive(Debug)]
pub struct RequestOutcome {
    /// 请求索引（从1开始）
    pub index: usize,
    pub assistant_id: String,
    pub result: Result<EvaluationPackage, GenerationError>,
}

/// 批量处理统计
#[derive(Debug, Default)]
pub struct BatchReport {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
    /// 按请求顺序排列
    pub outcomes: Vec<RequestOutcome>,
}

/// 批量出题处理器
pub struct BatchProcessor<G: ?Sized> {
    service: Arc<EvaluationService<G>>,
    max_concurrent: usize,
}

impl<G> BatchProcessor<G>
where
    G: AssistantGateway + ?Sized + 'static,
{
    pub fn new(service: Arc<EvaluationService<G>>, max_concurrent: usize) -> Self {
        Self {
            service,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// 并发处理所有请求
    pub async fn process_all(&self, requests: Vec<GenerationRequest>) -> BatchReport {
        let total = requests.len();
        logging::log_batch_start(total, self.max_concurrent);

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(total);

        for (idx, request) in requests.into_iter().enumerate() {
            let index = idx + 1;
            let service = Arc::clone(&self.service);
            let semaphore = Arc::clone(&semaphore);
            let assistant_id = request.assistant_id.clone();

            let handle = tokio::spawn(async move {
                // Semaphore 不会被关闭，acquire 只会成功
                let _permit = semaphore.acquire_owned().await;
                let ctx = SessionCtx::new(request.assistant_id, index);
                let result = service
                    .generate_with_conversation(&ctx, &request.spec)
                    .await
                    .map(|(package, _)| package);
                if let Err(e) = &result {
                    error!("{} ❌ 出题失败: {}", ctx, e);
                }
                result
            });
            handles.push((index, assistant_id, handle));
        }

        let mut report = BatchReport {
            total,
            ..Default::default()
        };

        for (index, assistant_id, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Err(GenerationError::Cancelled),
                Err(e) => {
                    error!("[请求#{}] 任务执行失败: {}", index, e);
                    Err(GenerationError::TaskAborted(e.to_string()))
                }
            };
            if result.is_ok() {
                report.success += 1;
            } else {
                report.failed += 1;
            }
            report.outcomes.push(RequestOutcome {
                index,
                assistant_id,
                result,
            });
        }

        info!("✓ 批量出题完成: 成功 {}/{}", report.success, report.total);
        logging::print_final_stats(report.success, report.failed, report.total);

        report
    }
}
