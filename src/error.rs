use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_openai::error::OpenAIError;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 远程助手调用错误
    #[error("远程错误: {0}")]
    Remote(#[from] RemoteError),
    /// 题目生成错误
    #[error("生成错误: {0}")]
    Generation(#[from] GenerationError),
    /// 评分错误
    #[error("评分错误: {0}")]
    Grading(#[from] GradingError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 远程助手 / 向量库调用错误
///
/// 核心流程不会重试这类错误，直接向上传播。
#[derive(Debug, Error)]
pub enum RemoteError {
    /// API 返回错误
    #[error("API调用失败 ({operation}): {source}")]
    Api {
        operation: &'static str,
        #[source]
        source: OpenAIError,
    },
    /// HTTP 客户端构建或传输失败
    #[error("HTTP错误 ({operation}): {source}")]
    Http {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// 运行结束但状态为失败
    #[error("运行 {run_id} 失败，最终状态: {status}")]
    RunFailed { run_id: String, status: String },
    /// 等待超时
    #[error("等待超时 ({operation})，已等待 {waited:?}")]
    Timeout {
        operation: &'static str,
        waited: Duration,
    },
    /// 请求参数无效
    #[error("请求参数无效 ({operation}): {message}")]
    InvalidRequest {
        operation: &'static str,
        message: String,
    },
    /// 远程接受了请求但拒绝执行
    #[error("远程拒绝 ({operation}): {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },
}

/// 题目生成错误
#[derive(Debug, Error)]
pub enum GenerationError {
    /// 请求的题目总数为 0
    #[error("请求的题目数量为 0")]
    EmptyRequest,
    /// 在重试预算内始终没有得到结构合法的输出
    #[error("尝试 {attempts} 次后仍未生成合法题目")]
    Failed { attempts: u32 },
    /// 远程调用失败
    #[error(transparent)]
    Remote(#[from] RemoteError),
    /// 会话被取消
    #[error("生成会话已取消")]
    Cancelled,
    /// 后台任务异常退出
    #[error("出题任务异常退出: {0}")]
    TaskAborted(String),
}

/// 评分错误
#[derive(Debug, Error)]
pub enum GradingError {
    /// 论述题评分时远程调用失败
    #[error("论述题 {question_id} 评分失败: {source}")]
    Remote {
        question_id: String,
        #[source]
        source: RemoteError,
    },
    /// 评分被取消
    #[error("评分已取消")]
    Cancelled,
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: &'static str,
    },
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({path}): {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 远程资源类型（用于清理报告）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    Assistant,
    Corpus,
    File,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Assistant => write!(f, "assistant"),
            ResourceKind::Corpus => write!(f, "vector_store"),
            ResourceKind::File => write!(f, "file"),
        }
    }
}

/// 删除远程资源失败（非致命）
#[derive(Debug, Error)]
#[error("删除 {resource} {id} 失败: {source}")]
pub struct PartialCleanupError {
    pub resource: ResourceKind,
    pub id: String,
    #[source]
    pub source: RemoteError,
}

/// 清理报告
///
/// 汇总删除流程中的所有失败，与主流程的成功结果一起返回，不会中断主流程。
#[derive(Debug, Default)]
pub struct CleanupReport {
    errors: BTreeMap<ResourceKind, Vec<PartialCleanupError>>,
}

impl CleanupReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次删除结果，失败时收集错误
    pub fn record<T>(&mut self, resource: ResourceKind, id: &str, result: Result<T, RemoteError>) {
        if let Err(source) = result {
            tracing::warn!("⚠️ 删除 {} {} 失败: {}", resource, id, source);
            self.errors
                .entry(resource)
                .or_default()
                .push(PartialCleanupError {
                    resource,
                    id: id.to_string(),
                    source,
                });
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    pub fn errors_for(&self, resource: ResourceKind) -> &[PartialCleanupError] {
        self.errors.get(&resource).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn errors(&self) -> &BTreeMap<ResourceKind, Vec<PartialCleanupError>> {
        &self.errors
    }
}

// ========== 便捷构造函数 ==========

impl RemoteError {
    /// 包装 async-openai 错误
    pub fn api(operation: &'static str, source: OpenAIError) -> Self {
        match source {
            OpenAIError::InvalidArgument(message) => RemoteError::InvalidRequest { operation, message },
            source => RemoteError::Api { operation, source },
        }
    }

    /// 创建超时错误
    pub fn timeout(operation: &'static str, waited: Duration) -> Self {
        RemoteError::Timeout { operation, waited }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 远程调用结果类型
pub type RemoteResult<T> = Result<T, RemoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_report_collects_failures_by_kind() {
        let mut report = CleanupReport::new();
        report.record(ResourceKind::File, "file-1", Ok::<(), RemoteError>(()));
        report.record(
            ResourceKind::File,
            "file-2",
            Err::<(), _>(RemoteError::timeout("delete_file", Duration::from_secs(1))),
        );
        report.record(
            ResourceKind::Assistant,
            "asst-1",
            Err::<(), _>(RemoteError::RunFailed {
                run_id: "r".into(),
                status: "failed".into(),
            }),
        );

        assert!(!report.is_clean());
        assert_eq!(report.error_count(), 2);
        assert_eq!(report.errors_for(ResourceKind::File).len(), 1);
        assert_eq!(report.errors_for(ResourceKind::File)[0].id, "file-2");
        assert!(report.errors_for(ResourceKind::Corpus).is_empty());
    }

    #[test]
    fn test_invalid_argument_maps_to_invalid_request() {
        let err = RemoteError::api("run", OpenAIError::InvalidArgument("bad".into()));
        assert!(matches!(err, RemoteError::InvalidRequest { operation: "run", .. }));
    }
}
