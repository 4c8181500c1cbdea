//! 回复归档服务 - 业务能力层
//!
//! 只负责把结构不合法的回复追加写入归档文件，不关心重试流程

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::utils::logging::truncate_text;

/// 归档中保留的回复最大字符数
const PREVIEW_CHARS: usize = 2000;

/// 一条归档记录（JSON Lines 格式）
#[derive(Debug, Serialize)]
struct RejectedResponse<'a> {
    timestamp: String,
    assistant_id: &'a str,
    conversation_id: &'a str,
    attempt: u32,
    preview: String,
}

/// 被拒回复归档
///
/// 职责：
/// - 每条记录一行 JSON
/// - 只追加，不读取
#[derive(Debug, Clone)]
pub struct ResponseArchive {
    path: PathBuf,
}

impl ResponseArchive {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条被拒回复
    pub fn record(&self, assistant_id: &str, conversation_id: &str, attempt: u32, response: &str) -> Result<()> {
        debug!(
            "归档被拒回复: 助手 {} | 会话 {} | 第 {} 次 | 长度: {}",
            assistant_id,
            conversation_id,
            attempt,
            response.len()
        );

        let entry = RejectedResponse {
            timestamp: chrono::Local::now().to_rfc3339(),
            assistant_id,
            conversation_id,
            attempt,
            preview: truncate_text(response, PREVIEW_CHARS),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("无法打开归档文件: {}", self.path.display()))?;
        file.write_all(line.as_bytes())?;

        Ok(())
    }
}
