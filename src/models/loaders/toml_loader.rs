use crate::models::submission::AnswerSheet;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载作答表
pub async fn load_answer_sheet(toml_file_path: &Path) -> Result<AnswerSheet> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    parse_answer_sheet(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))
}

/// 解析作答表内容
pub fn parse_answer_sheet(content: &str) -> Result<AnswerSheet> {
    let sheet: AnswerSheet = toml::from_str(content)?;

    if let Some(weight) = sheet.essay_weight {
        if !(weight.is_finite() && weight > 0.0) {
            anyhow::bail!("论述题权重必须为正数: {}", weight);
        }
    }

    Ok(sheet)
}
