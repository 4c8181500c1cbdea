//! 运行轮询 - 业务能力层
//!
//! 启动一次运行并协作式地等待它结束。轮询间隔内只做 `tokio::time::sleep`，
//! 不会阻塞工作线程。

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::clients::{AssistantGateway, ConversationHandle, RunStatus};
use crate::config::Config;
use crate::error::{RemoteError, RemoteResult};

/// 轮询参数
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    /// 单次运行的最长等待时间
    pub timeout: Duration,
}

impl PollSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.poll_interval(),
            timeout: config.poll_timeout(),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// 运行结束的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// 等待期间收到取消信号
    Cancelled,
}

/// 启动运行并等待完成
///
/// - 远程状态为失败时返回 `RemoteError::RunFailed`
/// - 超过 `settings.timeout` 返回 `RemoteError::Timeout`
/// - 取消后立即停止轮询，不再发出任何请求
pub async fn run_to_completion<G>(
    gateway: &G,
    conversation: &ConversationHandle,
    assistant_id: &str,
    settings: PollSettings,
    cancel: &CancellationToken,
) -> RemoteResult<RunOutcome>
where
    G: AssistantGateway + ?Sized,
{
    if cancel.is_cancelled() {
        return Ok(RunOutcome::Cancelled);
    }

    let run = gateway.run(conversation, assistant_id).await?;
    let started = Instant::now();
    let mut polls = 0u32;

    loop {
        polls += 1;
        match gateway.poll(&run).await? {
            RunStatus::Completed => {
                debug!("运行 {} 完成，轮询 {} 次，耗时 {:?}", run.run_id, polls, started.elapsed());
                return Ok(RunOutcome::Completed);
            }
            RunStatus::Failed(status) => {
                return Err(RemoteError::RunFailed {
                    run_id: run.run_id,
                    status,
                });
            }
            RunStatus::Pending => {}
        }

        let waited = started.elapsed();
        if waited >= settings.timeout {
            return Err(RemoteError::timeout("poll_run", waited));
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("运行 {} 等待期间被取消", run.run_id);
                return Ok(RunOutcome::Cancelled);
            }
            _ = sleep(settings.interval) => {}
        }
    }
}
